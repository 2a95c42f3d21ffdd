//! In-Memory Retained Tree
//!
//! [`MemoryTree`] keeps live nodes in an arena and records every mutation
//! applied to it. Tests use the log to check that the reconciler writes only
//! what changed, and [`Snapshot`]s to compare two live trees structurally.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};

use super::tree::{Namespace, RetainedTree};
use super::vnode::Handler;

/// Handle to a node in a [`MemoryTree`].
///
/// Slots of discarded nodes are reused; a handle to a discarded node keeps
/// its old generation and no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LiveId {
    index: u32,
    generation: u32,
}

impl LiveId {
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for LiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

/// One recorded tree operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Mutation {
    Create { node: LiveId },
    SetText { node: LiveId, text: String },
    SetAttribute { node: LiveId, name: String, value: String },
    RemoveAttribute { node: LiveId, name: String },
    AddListener { node: LiveId, event: String },
    RemoveListener { node: LiveId, event: String },
    Insert { parent: LiveId, child: LiveId, before: Option<LiveId> },
    /// Several children appended in one batch.
    Append { parent: LiveId, children: Vec<LiveId> },
    Remove { parent: LiveId, child: LiveId },
    Replace { parent: LiveId, new: LiveId, old: LiveId },
}

impl Mutation {
    /// Whether this mutation touched an attribute or listener.
    pub fn is_prop_write(&self) -> bool {
        matches!(
            self,
            Mutation::SetAttribute { .. }
                | Mutation::RemoveAttribute { .. }
                | Mutation::AddListener { .. }
                | Mutation::RemoveListener { .. }
        )
    }
}

/// Structural picture of a live subtree.
///
/// Attribute order and listener identity are not part of the picture: two
/// subtrees that render the same are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Snapshot {
    Element {
        tag: String,
        namespace: Namespace,
        attributes: BTreeMap<String, String>,
        listeners: Vec<String>,
        children: Vec<Snapshot>,
    },
    Text {
        text: String,
    },
    Placeholder,
    Fragment {
        children: Vec<Snapshot>,
    },
    ShadowRoot {
        children: Vec<Snapshot>,
    },
}

enum NodeData {
    Element {
        tag: String,
        namespace: Namespace,
        attributes: IndexMap<String, String>,
        listeners: Vec<(String, Handler)>,
        shadow: Option<LiveId>,
    },
    Text(String),
    Placeholder,
    Fragment,
    ShadowRoot {
        host: LiveId,
    },
}

struct MemoryNode {
    data: NodeData,
    parent: Option<LiveId>,
    children: Vec<LiveId>,
}

impl MemoryNode {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }

    fn is_container(&self) -> bool {
        matches!(
            self.data,
            NodeData::Element { .. } | NodeData::Fragment | NodeData::ShadowRoot { .. }
        )
    }
}

#[derive(Default)]
struct Slot {
    generation: u32,
    node: Option<MemoryNode>,
}

/// An arena-backed [`RetainedTree`] with a mutation log.
#[derive(Default)]
pub struct MemoryTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    log: Vec<Mutation>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutations recorded since creation or the last [`take_mutations`](Self::take_mutations).
    pub fn mutations(&self) -> &[Mutation] {
        &self.log
    }

    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.log)
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, node: LiveId) -> bool {
        self.get(node).is_ok()
    }

    pub fn tag(&self, node: LiveId) -> Option<&str> {
        match &self.get(node).ok()?.data {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Content of a text node.
    pub fn text(&self, node: LiveId) -> Option<&str> {
        match &self.get(node).ok()?.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn children(&self, node: LiveId) -> &[LiveId] {
        self.get(node).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    /// All text below `node`, in document order.
    pub fn text_content(&self, node: LiveId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: LiveId, out: &mut String) {
        let Ok(entry) = self.get(node) else {
            return;
        };
        if let NodeData::Text(text) = &entry.data {
            out.push_str(text);
        }
        for &child in &entry.children {
            self.collect_text(child, out);
        }
    }

    /// Structural picture of the subtree at `node`.
    pub fn snapshot(&self, node: LiveId) -> Result<Snapshot> {
        let entry = self.get(node)?;
        let children = || {
            entry
                .children
                .iter()
                .map(|&child| self.snapshot(child))
                .collect::<Result<Vec<_>>>()
        };
        Ok(match &entry.data {
            NodeData::Element {
                tag,
                namespace,
                attributes,
                listeners,
                ..
            } => {
                let mut events: Vec<String> = listeners.iter().map(|(event, _)| event.clone()).collect();
                events.sort();
                Snapshot::Element {
                    tag: tag.clone(),
                    namespace: *namespace,
                    attributes: attributes
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect(),
                    listeners: events,
                    children: children()?,
                }
            }
            NodeData::Text(text) => Snapshot::Text { text: text.clone() },
            NodeData::Placeholder => Snapshot::Placeholder,
            NodeData::Fragment => Snapshot::Fragment {
                children: children()?,
            },
            NodeData::ShadowRoot { .. } => Snapshot::ShadowRoot {
                children: children()?,
            },
        })
    }

    /// Render the subtree as indented text, one node per line.
    pub fn dump(&self, node: LiveId) -> String {
        let mut out = String::new();
        self.dump_node(&mut out, node, 0);
        out
    }

    fn dump_node(&self, out: &mut String, node: LiveId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Ok(entry) = self.get(node) else {
            out.push_str(&format!("{indent}[{node}] (missing)\n"));
            return;
        };
        match &entry.data {
            NodeData::Element { tag, attributes, .. } => {
                out.push_str(&format!("{indent}[{node}] <{tag}"));
                for (name, value) in attributes {
                    out.push_str(&format!(" {name}={value:?}"));
                }
                out.push_str(">\n");
            }
            NodeData::Text(text) => out.push_str(&format!("{indent}[{node}] {text:?}\n")),
            NodeData::Placeholder => out.push_str(&format!("{indent}[{node}] <!---->\n")),
            NodeData::Fragment => out.push_str(&format!("{indent}[{node}] #fragment\n")),
            NodeData::ShadowRoot { .. } => out.push_str(&format!("{indent}[{node}] #shadow-root\n")),
        }
        for &child in &entry.children {
            self.dump_node(out, child, depth + 1);
        }
    }

    // ------------------------------------------------------------------
    // Arena
    // ------------------------------------------------------------------

    fn get(&self, node: LiveId) -> Result<&MemoryNode> {
        self.slots
            .get(node.index())
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or_else(|| Error::MissingNode(node.to_string()))
    }

    fn get_mut(&mut self, node: LiveId) -> Result<&mut MemoryNode> {
        self.slots
            .get_mut(node.index())
            .filter(|slot| slot.generation == node.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or_else(|| Error::MissingNode(node.to_string()))
    }

    fn create(&mut self, data: NodeData) -> LiveId {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(MemoryNode::new(data));
                LiveId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(MemoryNode::new(data)),
                });
                LiveId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.log.push(Mutation::Create { node: id });
        id
    }

    fn container(&self, node: LiveId) -> Result<&MemoryNode> {
        let entry = self.get(node)?;
        if entry.is_container() {
            Ok(entry)
        } else {
            Err(Error::NotAContainer(node.to_string()))
        }
    }

    fn position(&self, parent: LiveId, child: LiveId) -> Result<usize> {
        self.get(parent)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| Error::NotAChild {
                parent: parent.to_string(),
                child: child.to_string(),
            })
    }

    /// Unhook `child` from whatever holds it, keeping the node alive.
    fn detach(&mut self, child: LiveId) -> Result<()> {
        if let Some(parent) = self.get(child)?.parent {
            let index = self.position(parent, child)?;
            self.get_mut(parent)?.children.remove(index);
            self.get_mut(child)?.parent = None;
        }
        Ok(())
    }

    /// Free a detached subtree, including any shadow root below it.
    fn discard(&mut self, node: LiveId) {
        let mut work = vec![node];
        while let Some(current) = work.pop() {
            let Some(slot) = self
                .slots
                .get_mut(current.index())
                .filter(|slot| slot.generation == current.generation && slot.node.is_some())
            else {
                continue;
            };
            let Some(entry) = slot.node.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);
            if let NodeData::Element {
                shadow: Some(root), ..
            } = entry.data
            {
                work.push(root);
            }
            work.extend(entry.children);
        }
    }

    fn ensure_insertable(&self, parent: LiveId, child: LiveId) -> Result<()> {
        self.container(parent)?;
        if parent == child || matches!(self.get(child)?.data, NodeData::ShadowRoot { .. }) {
            return Err(Error::NotAContainer(child.to_string()));
        }
        Ok(())
    }

    fn element_mut(&mut self, node: LiveId) -> Result<(&mut IndexMap<String, String>, &mut Vec<(String, Handler)>)> {
        match &mut self.get_mut(node)?.data {
            NodeData::Element {
                attributes,
                listeners,
                ..
            } => Ok((attributes, listeners)),
            _ => Err(Error::NotAnElement(node.to_string())),
        }
    }
}

impl RetainedTree for MemoryTree {
    type Node = LiveId;

    fn create_element(&mut self, tag: &str, namespace: Namespace) -> Result<LiveId> {
        Ok(self.create(NodeData::Element {
            tag: tag.to_string(),
            namespace,
            attributes: IndexMap::new(),
            listeners: Vec::new(),
            shadow: None,
        }))
    }

    fn create_text(&mut self, text: &str) -> Result<LiveId> {
        Ok(self.create(NodeData::Text(text.to_string())))
    }

    fn create_placeholder(&mut self) -> Result<LiveId> {
        Ok(self.create(NodeData::Placeholder))
    }

    fn create_fragment(&mut self) -> Result<LiveId> {
        Ok(self.create(NodeData::Fragment))
    }

    fn namespace(&self, node: &LiveId) -> Option<Namespace> {
        match self.get(*node).ok()?.data {
            NodeData::Element { namespace, .. } => Some(namespace),
            _ => None,
        }
    }

    fn set_text(&mut self, node: &LiveId, text: &str) -> Result<()> {
        match &mut self.get_mut(*node)?.data {
            NodeData::Text(current) => {
                *current = text.to_string();
            }
            _ => return Err(Error::NotText(node.to_string())),
        }
        self.log.push(Mutation::SetText {
            node: *node,
            text: text.to_string(),
        });
        Ok(())
    }

    fn attribute(&self, node: &LiveId, name: &str) -> Option<String> {
        match &self.get(*node).ok()?.data {
            NodeData::Element { attributes, .. } => attributes.get(name).cloned(),
            _ => None,
        }
    }

    fn set_attribute(&mut self, node: &LiveId, name: &str, value: &str) -> Result<()> {
        let (attributes, _) = self.element_mut(*node)?;
        attributes.insert(name.to_string(), value.to_string());
        self.log.push(Mutation::SetAttribute {
            node: *node,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_attribute(&mut self, node: &LiveId, name: &str) -> Result<()> {
        let (attributes, _) = self.element_mut(*node)?;
        attributes.shift_remove(name);
        self.log.push(Mutation::RemoveAttribute {
            node: *node,
            name: name.to_string(),
        });
        Ok(())
    }

    fn add_listener(&mut self, node: &LiveId, event: &str, handler: Handler) -> Result<()> {
        let (_, listeners) = self.element_mut(*node)?;
        listeners.push((event.to_string(), handler));
        self.log.push(Mutation::AddListener {
            node: *node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn remove_listener(&mut self, node: &LiveId, event: &str, handler: &Handler) -> Result<()> {
        let (_, listeners) = self.element_mut(*node)?;
        if let Some(index) = listeners
            .iter()
            .position(|(name, existing)| name == event && Rc::ptr_eq(existing, handler))
        {
            listeners.remove(index);
        }
        self.log.push(Mutation::RemoveListener {
            node: *node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn listeners(&self, node: &LiveId, event: &str) -> Vec<Handler> {
        match self.get(*node).map(|entry| &entry.data) {
            Ok(NodeData::Element { listeners, .. }) => listeners
                .iter()
                .filter(|(name, _)| name == event)
                .map(|(_, handler)| Rc::clone(handler))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn insert_before(&mut self, parent: &LiveId, child: &LiveId, reference: Option<&LiveId>) -> Result<()> {
        let (parent, child) = (*parent, *child);
        self.ensure_insertable(parent, child)?;
        self.detach(child)?;
        let index = match reference {
            Some(&reference) => self.position(parent, reference)?,
            None => self.get(parent)?.children.len(),
        };
        self.get_mut(parent)?.children.insert(index, child);
        self.get_mut(child)?.parent = Some(parent);
        self.log.push(Mutation::Insert {
            parent,
            child,
            before: reference.copied(),
        });
        Ok(())
    }

    fn append_children(&mut self, parent: &LiveId, children: Vec<LiveId>) -> Result<()> {
        let parent = *parent;
        for &child in &children {
            self.ensure_insertable(parent, child)?;
        }
        for &child in &children {
            self.detach(child)?;
            self.get_mut(child)?.parent = Some(parent);
        }
        self.get_mut(parent)?.children.extend(children.iter().copied());
        self.log.push(Mutation::Append { parent, children });
        Ok(())
    }

    fn remove_child(&mut self, parent: &LiveId, child: &LiveId) -> Result<()> {
        let (parent, child) = (*parent, *child);
        let index = self.position(parent, child)?;
        self.get_mut(parent)?.children.remove(index);
        self.discard(child);
        self.log.push(Mutation::Remove { parent, child });
        Ok(())
    }

    fn replace_child(&mut self, parent: &LiveId, new: &LiveId, old: &LiveId) -> Result<()> {
        let (parent, new, old) = (*parent, *new, *old);
        self.ensure_insertable(parent, new)?;
        self.position(parent, old)?;
        self.detach(new)?;
        let index = self.position(parent, old)?;
        self.get_mut(parent)?.children[index] = new;
        self.get_mut(new)?.parent = Some(parent);
        self.discard(old);
        self.log.push(Mutation::Replace { parent, new, old });
        Ok(())
    }

    fn child_at(&self, parent: &LiveId, index: usize) -> Option<LiveId> {
        self.get(*parent).ok()?.children.get(index).copied()
    }

    fn child_count(&self, parent: &LiveId) -> usize {
        self.children(*parent).len()
    }

    fn parent(&self, node: &LiveId) -> Option<LiveId> {
        self.get(*node).ok()?.parent
    }

    fn attach_shadow(&mut self, host: &LiveId) -> Result<LiveId> {
        let host = *host;
        match self.get(host)?.data {
            NodeData::Element { shadow: None, .. } => {}
            NodeData::Element { shadow: Some(_), .. } => {
                return Err(Error::ShadowRootExists(host.to_string()));
            }
            _ => return Err(Error::NotAnElement(host.to_string())),
        }
        let root = self.create(NodeData::ShadowRoot { host });
        if let NodeData::Element { shadow, .. } = &mut self.get_mut(host)?.data {
            *shadow = Some(root);
        }
        Ok(root)
    }

    fn shadow_host(&self, root: &LiveId) -> Option<LiveId> {
        match self.get(*root).ok()?.data {
            NodeData::ShadowRoot { host } => Some(host),
            _ => None,
        }
    }
}

impl fmt::Debug for MemoryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryTree")
            .field("nodes", &self.len())
            .field("mutations", &self.log.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::vdom::{dispatch_event, Event, EventInit};

    fn element(tree: &mut MemoryTree, tag: &str) -> LiveId {
        tree.create_element(tag, Namespace::Html).unwrap()
    }

    #[test]
    fn insert_before_orders_children() {
        let mut tree = MemoryTree::new();
        let list = element(&mut tree, "ul");
        let a = element(&mut tree, "li");
        let b = element(&mut tree, "li");
        let c = element(&mut tree, "li");

        tree.append_child(&list, &c).unwrap();
        tree.insert_before(&list, &a, Some(&c)).unwrap();
        tree.insert_before(&list, &b, Some(&c)).unwrap();

        assert_eq!(tree.children(list), &[a, b, c]);
        assert_eq!(tree.parent(&b), Some(list));
        assert_eq!(tree.child_at(&list, 1), Some(b));
    }

    #[test]
    fn inserting_an_attached_child_moves_it() {
        let mut tree = MemoryTree::new();
        let first = element(&mut tree, "div");
        let second = element(&mut tree, "div");
        let child = tree.create_text("x").unwrap();

        tree.append_child(&first, &child).unwrap();
        tree.append_child(&second, &child).unwrap();

        assert_eq!(tree.child_count(&first), 0);
        assert_eq!(tree.children(second), &[child]);
    }

    #[test]
    fn remove_and_replace_discard_old_subtrees() {
        let mut tree = MemoryTree::new();
        let root = element(&mut tree, "div");
        let old = element(&mut tree, "p");
        let text = tree.create_text("gone").unwrap();
        tree.append_child(&old, &text).unwrap();
        tree.append_child(&root, &old).unwrap();

        let new = element(&mut tree, "span");
        tree.replace_child(&root, &new, &old).unwrap();
        assert_eq!(tree.children(root), &[new]);
        assert!(!tree.contains(old));
        assert!(!tree.contains(text));

        tree.remove_child(&root, &new).unwrap();
        assert!(!tree.contains(new));
        assert!(matches!(
            tree.remove_child(&root, &new),
            Err(Error::NotAChild { .. })
        ));
    }

    #[test]
    fn text_nodes_hold_no_children() {
        let mut tree = MemoryTree::new();
        let text = tree.create_text("a").unwrap();
        let other = tree.create_text("b").unwrap();

        assert!(matches!(
            tree.append_child(&text, &other),
            Err(Error::NotAContainer(_))
        ));
    }

    #[test]
    fn append_children_is_one_batched_mutation() {
        let mut tree = MemoryTree::new();
        let root = element(&mut tree, "div");
        let a = tree.create_text("a").unwrap();
        let b = tree.create_text("b").unwrap();
        tree.take_mutations();

        tree.append_children(&root, vec![a, b]).unwrap();

        assert_eq!(
            tree.mutations(),
            &[Mutation::Append {
                parent: root,
                children: vec![a, b]
            }]
        );
        assert_eq!(tree.text_content(root), "ab");
    }

    #[test]
    fn listeners_are_removed_by_identity() {
        let mut tree = MemoryTree::new();
        let button = element(&mut tree, "button");
        let first: Handler = Rc::new(|_: &Event| {});
        let second: Handler = Rc::new(|_: &Event| {});

        tree.add_listener(&button, "click", first.clone()).unwrap();
        tree.add_listener(&button, "click", second.clone()).unwrap();
        tree.remove_listener(&button, "click", &first).unwrap();

        let remaining = tree.listeners(&button, "click");
        assert_eq!(remaining.len(), 1);
        assert!(Rc::ptr_eq(&remaining[0], &second));
    }

    #[test]
    fn events_bubble_and_stop_at_shadow_roots_unless_composed() {
        let tree = RefCell::new(MemoryTree::new());
        let hits = Rc::new(RefCell::new(Vec::<&'static str>::new()));

        let (outer, host, root, inner) = {
            let mut t = tree.borrow_mut();
            let outer = element(&mut t, "main");
            let host = element(&mut t, "x-card");
            t.append_child(&outer, &host).unwrap();
            let root = t.attach_shadow(&host).unwrap();
            let inner = element(&mut t, "button");
            t.append_child(&root, &inner).unwrap();
            (outer, host, root, inner)
        };

        for (node, label) in [(outer, "outer"), (host, "host"), (root, "root"), (inner, "inner")] {
            let log = hits.clone();
            let handler: Handler = Rc::new(move |_: &Event| log.borrow_mut().push(label));
            tree.borrow_mut().add_listener(&node, "ping", handler).ok();
        }

        let bubbling = EventInit {
            bubbles: true,
            ..EventInit::default()
        };
        dispatch_event(&tree, &inner, &Event::new("ping", serde_json::Value::Null, bubbling));
        // The shadow root is not an element, so it records no listener.
        assert_eq!(*hits.borrow(), ["inner"]);

        hits.borrow_mut().clear();
        let composed = EventInit {
            composed: true,
            ..bubbling
        };
        dispatch_event(&tree, &inner, &Event::new("ping", serde_json::Value::Null, composed));
        assert_eq!(*hits.borrow(), ["inner", "host", "outer"]);
    }

    #[test]
    fn prevent_default_requires_cancelable() {
        let tree = RefCell::new(MemoryTree::new());
        let target = element(&mut tree.borrow_mut(), "form");
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let handler: Handler = Rc::new(move |event: &Event| {
            counter.set(counter.get() + 1);
            event.prevent_default();
        });
        tree.borrow_mut().add_listener(&target, "submit", handler).unwrap();

        assert!(dispatch_event(&tree, &target, &Event::simple("submit")));

        let cancelable = EventInit {
            cancelable: true,
            ..EventInit::default()
        };
        let event = Event::new("submit", serde_json::Value::Null, cancelable);
        assert!(!dispatch_event(&tree, &target, &event));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn snapshot_ignores_attribute_order() {
        let mut tree = MemoryTree::new();
        let a = element(&mut tree, "div");
        tree.set_attribute(&a, "x", "1").unwrap();
        tree.set_attribute(&a, "y", "2").unwrap();
        let b = element(&mut tree, "div");
        tree.set_attribute(&b, "y", "2").unwrap();
        tree.set_attribute(&b, "x", "1").unwrap();

        assert_eq!(tree.snapshot(a).unwrap(), tree.snapshot(b).unwrap());
        let json = serde_json::to_value(tree.snapshot(a).unwrap()).unwrap();
        assert_eq!(json["kind"], "element");
        assert_eq!(json["attributes"]["x"], "1");
    }

    #[test]
    fn discarded_slots_are_reused_and_old_handles_go_stale() {
        let mut tree = MemoryTree::new();
        let list = element(&mut tree, "ul");
        let item = element(&mut tree, "li");
        let text = tree.create_text("a").unwrap();
        tree.append_child(&item, &text).unwrap();
        tree.append_child(&list, &item).unwrap();

        tree.remove_child(&list, &item).unwrap();
        assert_eq!(tree.len(), 1);

        let fresh = element(&mut tree, "li");
        let again = tree.create_text("b").unwrap();
        assert_eq!(tree.len(), 3);
        assert!([item.index(), text.index()].contains(&fresh.index()));
        assert!([item.index(), text.index()].contains(&again.index()));
        assert!(fresh.generation() > 0);

        assert!(!tree.contains(item));
        assert!(!tree.contains(text));
        assert!(tree.contains(fresh));
        assert!(matches!(tree.set_attribute(&item, "x", "1"), Err(Error::MissingNode(_))));
        assert_eq!(tree.attribute(&fresh, "x"), None);
    }

    #[test]
    fn prop_writes_and_dump() {
        let mut tree = MemoryTree::new();
        let link = element(&mut tree, "a");
        let label = tree.create_text("home").unwrap();
        tree.append_child(&link, &label).unwrap();
        tree.take_mutations();

        tree.set_attribute(&link, "href", "/").unwrap();
        tree.set_text(&label, "Home").unwrap();
        tree.remove_attribute(&link, "href").unwrap();

        let writes: Vec<bool> = tree.mutations().iter().map(Mutation::is_prop_write).collect();
        assert_eq!(writes, [true, false, true]);

        tree.set_attribute(&link, "href", "/home").unwrap();
        assert_eq!(tree.dump(link), format!("[{link}] <a href=\"/home\">\n  [{label}] \"Home\"\n"));
        assert_eq!(format!("{link}"), "#0");
    }
}
