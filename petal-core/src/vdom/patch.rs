//! Patching
//!
//! [`patch`] brings a live node in line with a new [`VNode`], given the
//! VNode it was last rendered from. In priority order:
//!
//! 1. No live node: mount fresh and append.
//! 2. Same `Rc`: nothing to do.
//! 3. Incompatible tags: mount the new node and replace the old one.
//! 4. Text: rewrite the content only if the joined text changed.
//! 5. Empty: nothing to do.
//! 6. Element: reconcile props, then children. Fragments have children only.
//!
//! Children are matched purely by position. There is no keyed matching and
//! no moves.

use std::rc::Rc;

use crate::error::{Error, Result};

use super::mount::{attribute_text, binding, event_name, is_valid_tag_name, mount, mount_child, Binding};
use super::tree::{Namespace, RetainedTree};
use super::vnode::{Child, PropValue, Props, Tag, VNode};

/// Reconcile `live` (rendered from `old`) against `new`, returning the live
/// node that now represents `new`. It differs from `live` only when the node
/// had to be replaced.
pub fn patch<T: RetainedTree>(
    tree: &mut T,
    old: &Rc<VNode>,
    new: &Rc<VNode>,
    parent: &T::Node,
    live: Option<&T::Node>,
) -> Result<T::Node> {
    let namespace = tree.namespace(parent);
    let Some(live) = live else {
        let node = mount(tree, new, namespace)?;
        tree.append_child(parent, &node)?;
        return Ok(node);
    };
    reconcile(tree, old, new, parent, live, namespace)
}

/// Whether a live node rendered from `old` can be updated in place to `new`.
fn reconcilable(old: &Tag, new: &Tag) -> bool {
    match (old, new) {
        (Tag::Element(a), Tag::Element(b)) => a == b && is_valid_tag_name(b),
        (a, b) => a == b,
    }
}

fn reconcile<T: RetainedTree>(
    tree: &mut T,
    old: &Rc<VNode>,
    new: &Rc<VNode>,
    parent: &T::Node,
    live: &T::Node,
    namespace: Option<Namespace>,
) -> Result<T::Node> {
    if Rc::ptr_eq(old, new) {
        return Ok(live.clone());
    }
    if !reconcilable(old.tag(), new.tag()) {
        return replace(tree, new, parent, live, namespace);
    }

    match new.tag() {
        Tag::Text => {
            let text = new.text_content();
            if old.text_content() != text {
                tree.set_text(live, &text)?;
            }
        }
        Tag::Empty => {}
        Tag::Fragment => {
            patch_children(tree, live, old.children(), new.children(), namespace)?;
        }
        Tag::Element(_) => {
            patch_props(tree, live, old.props(), new.props())?;
            let inner = tree.namespace(live);
            patch_children(tree, live, old.children(), new.children(), inner)?;
        }
    }
    Ok(live.clone())
}

fn replace<T: RetainedTree>(
    tree: &mut T,
    new: &VNode,
    parent: &T::Node,
    live: &T::Node,
    namespace: Option<Namespace>,
) -> Result<T::Node> {
    tracing::trace!(tag = %new.tag(), "remounting");
    let node = mount(tree, new, namespace)?;
    tree.replace_child(parent, &node, live)?;
    Ok(node)
}

/// Reconcile the props of an element.
pub fn patch_props<T: RetainedTree>(tree: &mut T, node: &T::Node, old: &Props, new: &Props) -> Result<()> {
    if old.ptr_eq(new) {
        return Ok(());
    }

    for (key, value) in old.iter() {
        if !new.contains_key(key) {
            unbind(tree, node, key, value)?;
        }
    }

    for (key, value) in new.iter() {
        let previous = old.get(key);
        if previous.is_some_and(|previous| previous.is_same(value)) {
            continue;
        }

        let next = binding(key, value);
        if let Some(previous) = previous {
            match binding(key, previous) {
                Binding::Listener => unbind(tree, node, key, previous)?,
                Binding::Attribute if next != Binding::Attribute => unbind(tree, node, key, previous)?,
                _ => {}
            }
        }

        match (next, value) {
            (Binding::Listener, PropValue::Handler(handler)) => {
                tree.add_listener(node, &event_name(key), handler.clone())?;
            }
            (Binding::Attribute, _) => {
                if let Some(text) = attribute_text(value) {
                    if tree.attribute(node, key).as_deref() != Some(text.as_str()) {
                        tree.set_attribute(node, key, &text)?;
                    }
                }
            }
            (_, PropValue::Handler(_)) => {
                tracing::warn!(prop = key, "handler on a non-event prop ignored");
            }
            _ => {}
        }
    }
    Ok(())
}

/// Undo whatever `value` bound under `key`.
fn unbind<T: RetainedTree>(tree: &mut T, node: &T::Node, key: &str, value: &PropValue) -> Result<()> {
    match (binding(key, value), value) {
        (Binding::Listener, PropValue::Handler(handler)) => {
            tree.remove_listener(node, &event_name(key), handler)
        }
        (Binding::Attribute, _) => tree.remove_attribute(node, key),
        _ => Ok(()),
    }
}

/// Reconcile the children of `parent` position by position.
pub fn patch_children<T: RetainedTree>(
    tree: &mut T,
    parent: &T::Node,
    old: &[Child],
    new: &[Child],
    namespace: Option<Namespace>,
) -> Result<()> {
    if old.is_empty() && new.is_empty() {
        return Ok(());
    }

    if old.len() == new.len() {
        let texts: Option<Vec<(&str, &str)>> = old
            .iter()
            .zip(new)
            .map(|(o, n)| Some((o.as_text()?, n.as_text()?)))
            .collect();
        if let Some(texts) = texts {
            for (index, (before, after)) in texts.into_iter().enumerate() {
                if before != after {
                    let node = live_child(tree, parent, index)?;
                    tree.set_text(&node, after)?;
                }
            }
            return Ok(());
        }
    }

    // Walk from the end so removals never shift a position still to visit.
    // `anchor` is the live node now at `index + 1`.
    let mut anchor: Option<T::Node> = None;
    for index in (0..old.len().max(new.len())).rev() {
        anchor = match (old.get(index), new.get(index)) {
            (None, Some(child)) => {
                let node = mount_child(tree, child, namespace)?;
                tree.insert_before(parent, &node, anchor.as_ref())?;
                Some(node)
            }
            (Some(_), None) => {
                let node = live_child(tree, parent, index)?;
                tree.remove_child(parent, &node)?;
                None
            }
            (Some(before), Some(after)) => {
                let node = live_child(tree, parent, index)?;
                Some(patch_child(tree, parent, before, after, &node, namespace)?)
            }
            (None, None) => None,
        };
    }
    Ok(())
}

fn patch_child<T: RetainedTree>(
    tree: &mut T,
    parent: &T::Node,
    old: &Child,
    new: &Child,
    live: &T::Node,
    namespace: Option<Namespace>,
) -> Result<T::Node> {
    match (old, new) {
        (Child::Text(before), Child::Text(after)) => {
            if before != after {
                tree.set_text(live, after)?;
            }
            Ok(live.clone())
        }
        (Child::Node(before), Child::Node(after)) => reconcile(tree, before, after, parent, live, namespace),
        _ => {
            let node = mount_child(tree, new, namespace)?;
            tree.replace_child(parent, &node, live)?;
            Ok(node)
        }
    }
}

fn live_child<T: RetainedTree>(tree: &T, parent: &T::Node, index: usize) -> Result<T::Node> {
    tree.child_at(parent, index)
        .ok_or_else(|| Error::MissingNode(format!("child {index} of {parent:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vdom::{h, LiveId, MemoryTree, Mutation};

    fn render(tree: &mut MemoryTree, vnode: &Rc<VNode>) -> (LiveId, LiveId) {
        let container = tree.create_element("main", Namespace::Html).unwrap();
        let live = patch(tree, vnode, vnode, &container, None).unwrap();
        tree.take_mutations();
        (container, live)
    }

    fn list(items: &[&str]) -> Rc<VNode> {
        h(
            "ul",
            [],
            items.iter().map(|item| VNode::element("li").child(*item).into()),
        )
    }

    #[test]
    fn missing_live_node_mounts_and_appends() {
        let mut tree = MemoryTree::new();
        let vnode = h("p", [], ["hi".into()]);
        let (container, live) = render(&mut tree, &vnode);

        assert_eq!(tree.children(container), &[live]);
        assert_eq!(tree.text_content(live), "hi");
    }

    #[test]
    fn same_vnode_is_a_no_op() {
        let mut tree = MemoryTree::new();
        let vnode = list(&["a", "b"]);
        let (container, live) = render(&mut tree, &vnode);

        let result = patch(&mut tree, &vnode, &vnode, &container, Some(&live)).unwrap();
        assert_eq!(result, live);
        assert!(tree.mutations().is_empty());
    }

    #[test]
    fn identical_copy_writes_nothing() {
        let mut tree = MemoryTree::new();
        let build = || {
            h(
                "form",
                [("id", "f".into()), ("novalidate", true.into())],
                [VNode::element("input").prop("value", 3).into(), "text".into()],
            )
        };
        let old = build();
        let (container, live) = render(&mut tree, &old);

        patch(&mut tree, &old, &build(), &container, Some(&live)).unwrap();
        assert!(tree.mutations().is_empty(), "{:?}", tree.mutations());
    }

    #[test]
    fn tag_change_replaces_the_node() {
        let mut tree = MemoryTree::new();
        let old = h("div", [], ["x".into()]);
        let (container, live) = render(&mut tree, &old);

        let new = h("span", [], ["x".into()]);
        let result = patch(&mut tree, &old, &new, &container, Some(&live)).unwrap();

        assert_ne!(result, live);
        assert!(!tree.contains(live));
        assert_eq!(tree.tag(result), Some("span"));
        assert!(tree
            .mutations()
            .contains(&Mutation::Replace { parent: container, new: result, old: live }));
    }

    #[test]
    fn special_tag_mismatch_replaces() {
        let mut tree = MemoryTree::new();
        let old = Rc::new(VNode::empty());
        let (container, live) = render(&mut tree, &old);

        let new = Rc::new(VNode::text("now"));
        let result = patch(&mut tree, &old, &new, &container, Some(&live)).unwrap();
        assert_eq!(tree.text(result), Some("now"));
        assert_eq!(tree.children(container), &[result]);
    }

    #[test]
    fn invalid_tag_always_remounts() {
        let mut tree = MemoryTree::new();
        let old = h("bad tag", [], []);
        let (container, live) = render(&mut tree, &old);

        let new = h("bad tag", [], []);
        let result = patch(&mut tree, &old, &new, &container, Some(&live)).unwrap();
        assert_ne!(result, live);
        assert_eq!(tree.tag(result), Some("unknown-element"));
    }

    #[test]
    fn text_node_updates_only_on_change() {
        let mut tree = MemoryTree::new();
        let old = Rc::new(VNode::text("same"));
        let (container, live) = render(&mut tree, &old);

        patch(&mut tree, &old, &Rc::new(VNode::text("same")), &container, Some(&live)).unwrap();
        assert!(tree.mutations().is_empty());

        patch(&mut tree, &old, &Rc::new(VNode::text("changed")), &container, Some(&live)).unwrap();
        assert_eq!(tree.text(live), Some("changed"));
    }

    #[test]
    fn prop_changes() {
        let mut tree = MemoryTree::new();
        let old = h(
            "input",
            [
                ("value", "a".into()),
                ("checked", true.into()),
                ("title", "t".into()),
                ("placeholder", "p".into()),
            ],
            [],
        );
        let (container, live) = render(&mut tree, &old);

        let new = h(
            "input",
            [
                ("value", "b".into()),
                ("checked", false.into()),
                ("title", PropValue::Null),
                ("size", 4.into()),
            ],
            [],
        );
        patch(&mut tree, &old, &new, &container, Some(&live)).unwrap();

        assert_eq!(tree.attribute(&live, "value").as_deref(), Some("b"));
        assert_eq!(tree.attribute(&live, "checked"), None);
        assert_eq!(tree.attribute(&live, "title"), None);
        assert_eq!(tree.attribute(&live, "placeholder"), None);
        assert_eq!(tree.attribute(&live, "size").as_deref(), Some("4"));
    }

    #[test]
    fn equal_stringified_value_is_not_rewritten() {
        let mut tree = MemoryTree::new();
        let old = h("td", [("colspan", "2".into())], []);
        let (container, live) = render(&mut tree, &old);

        let new = h("td", [("colspan", 2.into())], []);
        patch(&mut tree, &old, &new, &container, Some(&live)).unwrap();
        assert!(tree.mutations().is_empty());
    }

    #[test]
    fn handlers_are_swapped_every_render() {
        let mut tree = MemoryTree::new();
        let old = h("button", [("onClick", PropValue::handler(|_| {}))], []);
        let (container, live) = render(&mut tree, &old);

        let new = h("button", [("onClick", PropValue::handler(|_| {}))], []);
        patch(&mut tree, &old, &new, &container, Some(&live)).unwrap();

        assert_eq!(
            tree.mutations(),
            &[
                Mutation::RemoveListener { node: live, event: "click".into() },
                Mutation::AddListener { node: live, event: "click".into() },
            ]
        );
        let listeners = tree.listeners(&live, "click");
        assert_eq!(listeners.len(), 1);
        assert!(Rc::ptr_eq(&listeners[0], new.props().get("onClick").unwrap().as_handler().unwrap()));
    }

    #[test]
    fn removed_handler_detaches_listener() {
        let mut tree = MemoryTree::new();
        let old = h("a", [("onFocus", PropValue::handler(|_| {}))], []);
        let (container, live) = render(&mut tree, &old);

        patch(&mut tree, &old, &h("a", [], []), &container, Some(&live)).unwrap();
        assert!(tree.listeners(&live, "focus").is_empty());
    }

    #[test]
    fn shared_props_short_circuit() {
        let mut tree = MemoryTree::new();
        let live = tree.create_element("div", Namespace::Html).unwrap();
        let props = Props::new().with("a", 1);
        tree.take_mutations();

        patch_props(&mut tree, &live, &props, &props.clone()).unwrap();
        assert!(tree.mutations().is_empty());
    }

    #[test]
    fn positional_diff_touches_only_the_changed_child() {
        let mut tree = MemoryTree::new();
        let old = list(&["a", "b"]);
        let (container, live) = render(&mut tree, &old);
        let first = tree.child_at(&live, 0).unwrap();
        let second = tree.child_at(&live, 1).unwrap();
        let second_text = tree.child_at(&second, 0).unwrap();

        patch(&mut tree, &old, &list(&["a", "c"]), &container, Some(&live)).unwrap();

        assert_eq!(
            tree.mutations(),
            &[Mutation::SetText { node: second_text, text: "c".into() }]
        );
        assert_eq!(tree.children(live), &[first, second]);
    }

    #[test]
    fn all_text_children_update_in_place() {
        let mut tree = MemoryTree::new();
        let old = h("p", [], ["a".into(), "b".into(), "c".into()]);
        let (container, live) = render(&mut tree, &old);

        let new = h("p", [], ["a".into(), "B".into(), "c".into()]);
        patch(&mut tree, &old, &new, &container, Some(&live)).unwrap();

        assert_eq!(tree.mutations().len(), 1);
        assert_eq!(tree.text_content(live), "aBc");
    }

    #[test]
    fn growing_list_keeps_order() {
        let mut tree = MemoryTree::new();
        let old = list(&["a"]);
        let (container, live) = render(&mut tree, &old);
        let first = tree.child_at(&live, 0).unwrap();

        patch(&mut tree, &old, &list(&["a", "b", "c", "d"]), &container, Some(&live)).unwrap();

        assert_eq!(tree.text_content(live), "abcd");
        assert_eq!(tree.child_at(&live, 0), Some(first));
    }

    #[test]
    fn shrinking_list_removes_the_tail() {
        let mut tree = MemoryTree::new();
        let old = list(&["a", "b", "c", "d"]);
        let (container, live) = render(&mut tree, &old);

        patch(&mut tree, &old, &list(&["a", "x"]), &container, Some(&live)).unwrap();

        assert_eq!(tree.text_content(live), "ax");
        let removals = tree
            .mutations()
            .iter()
            .filter(|m| matches!(m, Mutation::Remove { .. }))
            .count();
        assert_eq!(removals, 2);
    }

    #[test]
    fn emptying_and_refilling_children() {
        let mut tree = MemoryTree::new();
        let old = list(&["a", "b"]);
        let (container, live) = render(&mut tree, &old);

        let empty = list(&[]);
        patch(&mut tree, &old, &empty, &container, Some(&live)).unwrap();
        assert_eq!(tree.child_count(&live), 0);

        tree.take_mutations();
        patch(&mut tree, &empty, &list(&[]), &container, Some(&live)).unwrap();
        assert!(tree.mutations().is_empty());

        patch(&mut tree, &empty, &list(&["z"]), &container, Some(&live)).unwrap();
        assert_eq!(tree.text_content(live), "z");
    }

    #[test]
    fn text_and_node_children_swap_by_replacement() {
        let mut tree = MemoryTree::new();
        let old = h("div", [], ["plain".into(), VNode::element("b").child("bold").into()]);
        let (container, live) = render(&mut tree, &old);

        let new = h("div", [], [VNode::element("i").child("now").into(), "text".into()]);
        patch(&mut tree, &old, &new, &container, Some(&live)).unwrap();

        let first = tree.child_at(&live, 0).unwrap();
        assert_eq!(tree.tag(first), Some("i"));
        assert_eq!(tree.text_content(live), "nowtext");
    }

    #[test]
    fn fragment_children_are_reconciled() {
        let mut tree = MemoryTree::new();
        let old = Rc::new(VNode::fragment(["a".into(), VNode::element("hr").into()]));
        let (container, live) = render(&mut tree, &old);

        let new = Rc::new(VNode::fragment(["b".into(), VNode::element("hr").into(), "c".into()]));
        let result = patch(&mut tree, &old, &new, &container, Some(&live)).unwrap();

        assert_eq!(result, live);
        assert_eq!(tree.child_count(&live), 3);
        assert_eq!(tree.text_content(live), "bc");
    }

    #[test]
    fn svg_children_mounted_during_patch_keep_the_namespace() {
        let mut tree = MemoryTree::new();
        let old = h("svg", [], []);
        let (container, live) = render(&mut tree, &old);

        let new = h("svg", [], [VNode::element("rect").into()]);
        patch(&mut tree, &old, &new, &container, Some(&live)).unwrap();

        let rect = tree.child_at(&live, 0).unwrap();
        assert_eq!(tree.namespace(&rect), Some(Namespace::Svg));
    }
}
