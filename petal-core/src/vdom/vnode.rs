//! Virtual Nodes
//!
//! A [`VNode`] describes one node of a renderable tree: a tag, a property
//! bag and ordered children. VNodes are immutable once built. Every render
//! pass produces a fresh tree, and subtrees are shared through `Rc` so the
//! reconciler can skip a subtree that was reused verbatim.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::tree::Event;

/// Event listener attached through a prop.
pub type Handler = Rc<dyn Fn(&Event)>;

/// What kind of node a [`VNode`] describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// A named element, such as `div` or `circle`.
    Element(String),
    /// A text node whose content is the joined children.
    Text,
    /// Intentionally absent content. Mounts to a placeholder.
    Empty,
    /// A grouping node with children and no props.
    Fragment,
}

impl Tag {
    /// The element name, if this is an element tag.
    pub fn name(&self) -> Option<&str> {
        match self {
            Tag::Element(name) => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::Element(name.to_string())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Element(name) => f.write_str(name),
            Tag::Text => f.write_str("#text"),
            Tag::Empty => f.write_str("#empty"),
            Tag::Fragment => f.write_str("#fragment"),
        }
    }
}

/// A prop value: a primitive or an event handler.
#[derive(Clone)]
pub enum PropValue {
    /// No value. Never written; removes the prop when patching.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Handler(Handler),
}

impl PropValue {
    /// Wrap a closure as a handler value.
    pub fn handler(f: impl Fn(&Event) + 'static) -> Self {
        PropValue::Handler(Rc::new(f))
    }

    /// Whether two values are unchanged between renders: equal primitives,
    /// or the very same handler.
    pub fn is_same(&self, other: &PropValue) -> bool {
        match (self, other) {
            (PropValue::Null, PropValue::Null) => true,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a == b,
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Null)
    }

    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            PropValue::Handler(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(value) => Some(value),
            _ => None,
        }
    }

    /// The attribute text for a primitive. `None` for `Null` and handlers.
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            PropValue::Null | PropValue::Handler(_) => None,
            PropValue::Bool(value) => Some(value.to_string()),
            PropValue::Int(value) => Some(value.to_string()),
            PropValue::Float(value) => Some(value.to_string()),
            PropValue::Str(value) => Some(value.clone()),
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => f.write_str("Null"),
            PropValue::Bool(value) => write!(f, "Bool({value})"),
            PropValue::Int(value) => write!(f, "Int({value})"),
            PropValue::Float(value) => write!(f, "Float({value})"),
            PropValue::Str(value) => write!(f, "Str({value:?})"),
            PropValue::Handler(handler) => write!(f, "Handler({:p})", Rc::as_ptr(handler)),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<Handler> for PropValue {
    fn from(value: Handler) -> Self {
        PropValue::Handler(value)
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropValue::Null, Into::into)
    }
}

/// An ordered prop bag.
///
/// Cloning shares the underlying map, so two VNodes built from the same
/// `Props` are recognized as having the very same bag.
#[derive(Clone, Default)]
pub struct Props(Rc<IndexMap<String, PropValue>>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a prop.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        Rc::make_mut(&mut self.0).insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether both handles share one bag.
    pub fn ptr_eq(&self, other: &Props) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Props(Rc::new(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ))
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// A child slot: a plain string or a nested node.
#[derive(Debug, Clone)]
pub enum Child {
    Text(String),
    Node(Rc<VNode>),
}

impl Child {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Child::Text(text) => Some(text),
            Child::Node(_) => None,
        }
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Child::Text(text) => out.push_str(text),
            Child::Node(node) => node.push_text(out),
        }
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<VNode> for Child {
    fn from(node: VNode) -> Self {
        Child::Node(Rc::new(node))
    }
}

impl From<Rc<VNode>> for Child {
    fn from(node: Rc<VNode>) -> Self {
        Child::Node(node)
    }
}

/// An immutable description of one node.
///
/// # Example
///
/// ```rust
/// use petal_core::vdom::{PropValue, VNode};
///
/// let list = VNode::element("ul")
///     .prop("class", "items")
///     .prop("hidden", false)
///     .child(VNode::element("li").child("a"))
///     .child(VNode::element("li").child("b"));
///
/// assert_eq!(list.children().len(), 2);
/// assert_eq!(list.props().get("class"), Some(&PropValue::from("items")));
/// assert_eq!(list.text_content(), "ab");
/// ```
#[derive(Debug, Clone)]
pub struct VNode {
    tag: Tag,
    props: Props,
    children: Vec<Child>,
}

impl VNode {
    pub fn new(tag: Tag, props: Props, children: Vec<Child>) -> Self {
        Self {
            tag,
            props,
            children,
        }
    }

    pub fn element(name: impl Into<String>) -> Self {
        Self::new(Tag::Element(name.into()), Props::new(), Vec::new())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Tag::Text, Props::new(), vec![Child::Text(text.into())])
    }

    pub fn empty() -> Self {
        Self::new(Tag::Empty, Props::new(), Vec::new())
    }

    pub fn fragment(children: impl IntoIterator<Item = Child>) -> Self {
        Self::new(Tag::Fragment, Props::new(), children.into_iter().collect())
    }

    /// Add or replace a prop.
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props = self.props.with(key, value);
        self
    }

    /// Replace the whole prop bag.
    pub fn props_from(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    /// Append a child.
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several children.
    pub fn children_from(mut self, children: impl IntoIterator<Item = Child>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// All text below this node, concatenated in order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for child in &self.children {
            child.push_text(out);
        }
    }
}

/// Build a shared element node.
pub fn h(
    name: &str,
    props: impl IntoIterator<Item = (&'static str, PropValue)>,
    children: impl IntoIterator<Item = Child>,
) -> Rc<VNode> {
    Rc::new(VNode::new(
        Tag::from(name),
        props.into_iter().collect(),
        children.into_iter().collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handlers_compare_by_identity() {
        let handler: Handler = Rc::new(|_: &Event| {});
        let a = PropValue::Handler(handler.clone());
        let b = PropValue::Handler(handler);
        let c = PropValue::handler(|_| {});

        assert!(a.is_same(&b));
        assert!(!a.is_same(&c));
    }

    #[test]
    fn primitives_compare_by_value() {
        assert!(PropValue::from("x").is_same(&PropValue::from(String::from("x"))));
        assert!(!PropValue::Int(1).is_same(&PropValue::Float(1.0)));
        assert!(PropValue::Null.is_same(&PropValue::from(None::<bool>)));
    }

    #[test]
    fn attribute_text() {
        assert_eq!(PropValue::Int(-3).to_attribute().as_deref(), Some("-3"));
        assert_eq!(PropValue::Float(1.5).to_attribute().as_deref(), Some("1.5"));
        assert_eq!(PropValue::Bool(true).to_attribute().as_deref(), Some("true"));
        assert_eq!(PropValue::Null.to_attribute(), None);
        assert_eq!(PropValue::handler(|_| {}).to_attribute(), None);
    }

    #[test]
    fn props_keep_insertion_order_and_share_on_clone() {
        let props = Props::new().with("b", 1).with("a", 2).with("b", 3);
        let keys: Vec<_> = props.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(props.get("b"), Some(&PropValue::Int(3)));

        let shared = props.clone();
        assert!(props.ptr_eq(&shared));
        assert!(!props.ptr_eq(&shared.clone().with("c", true)));
    }

    #[test]
    fn text_content_joins_nested_children() {
        let node = h(
            "p",
            [],
            ["Hello, ".into(), VNode::element("b").child("world").into(), "!".into()],
        );
        assert_eq!(node.text_content(), "Hello, world!");
        assert_eq!(node.tag().name(), Some("p"));
    }
}
