//! Mounting
//!
//! [`mount`] materializes a [`VNode`] into a fresh live node. It picks the
//! element namespace, binds props as attributes or listeners, and inserts
//! children. A tag that is not a valid element name degrades to a
//! diagnostic placeholder instead of failing the whole render.

use crate::error::Result;

use super::tree::{Namespace, RetainedTree};
use super::vnode::{Child, PropValue, Props, Tag, VNode};

/// Tag of the placeholder element that stands in for an invalid tag.
pub const UNKNOWN_ELEMENT: &str = "unknown-element";

/// Attribute on the placeholder that carries the original tag name.
pub const UNKNOWN_TAG_ATTRIBUTE: &str = "data-tag";

/// Element names that belong to the SVG namespace below an `<svg>`.
const SVG_TAGS: &[&str] = &[
    "a",
    "animate",
    "animateMotion",
    "animateTransform",
    "circle",
    "clipPath",
    "defs",
    "desc",
    "ellipse",
    "feBlend",
    "feColorMatrix",
    "feComponentTransfer",
    "feComposite",
    "feConvolveMatrix",
    "feDiffuseLighting",
    "feDisplacementMap",
    "feDistantLight",
    "feDropShadow",
    "feFlood",
    "feFuncA",
    "feFuncB",
    "feFuncG",
    "feFuncR",
    "feGaussianBlur",
    "feImage",
    "feMerge",
    "feMergeNode",
    "feMorphology",
    "feOffset",
    "fePointLight",
    "feSpecularLighting",
    "feSpotLight",
    "feTile",
    "feTurbulence",
    "filter",
    "foreignObject",
    "g",
    "image",
    "line",
    "linearGradient",
    "marker",
    "mask",
    "metadata",
    "mpath",
    "path",
    "pattern",
    "polygon",
    "polyline",
    "radialGradient",
    "rect",
    "script",
    "set",
    "stop",
    "style",
    "svg",
    "switch",
    "symbol",
    "text",
    "textPath",
    "title",
    "tspan",
    "use",
    "view",
];

/// Check whether `tag` is a recognized SVG element name.
pub fn is_svg_tag(tag: &str) -> bool {
    SVG_TAGS.contains(&tag)
}

/// Check whether `tag` can name an element: an ASCII letter followed by
/// ASCII alphanumerics, `-`, `_`, `.` or `:`.
pub fn is_valid_tag_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

/// Namespace for an element named `tag` under a parent in `parent`.
pub fn namespace_for(tag: &str, parent: Option<Namespace>) -> Namespace {
    match tag {
        "svg" => Namespace::Svg,
        "math" => Namespace::MathMl,
        _ if parent == Some(Namespace::Svg) && is_svg_tag(tag) => Namespace::Svg,
        _ => Namespace::Html,
    }
}

/// Whether `key` names an event when its value is a handler.
pub fn is_event_key(key: &str) -> bool {
    key.len() > 2 && key.starts_with("on")
}

/// Event name bound by an event key: `onClick` listens for `click`.
pub fn event_name(key: &str) -> String {
    key[2..].to_ascii_lowercase()
}

/// How a prop value shows up on a live element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding {
    /// Not reflected at all.
    Unbound,
    Listener,
    Attribute,
}

pub(crate) fn binding(key: &str, value: &PropValue) -> Binding {
    match value {
        PropValue::Null | PropValue::Bool(false) => Binding::Unbound,
        PropValue::Handler(_) if is_event_key(key) => Binding::Listener,
        PropValue::Handler(_) => Binding::Unbound,
        _ => Binding::Attribute,
    }
}

/// Attribute text for an attribute-bound value. `true` is a valueless
/// attribute.
pub(crate) fn attribute_text(value: &PropValue) -> Option<String> {
    match value {
        PropValue::Bool(true) => Some(String::new()),
        PropValue::Bool(false) => None,
        other => other.to_attribute(),
    }
}

/// Materialize `vnode` as a new, detached live node.
///
/// `parent` is the namespace of the element the node will be inserted
/// under, or `None` when there is no such element.
pub fn mount<T: RetainedTree>(tree: &mut T, vnode: &VNode, parent: Option<Namespace>) -> Result<T::Node> {
    match vnode.tag() {
        Tag::Text => tree.create_text(&vnode.text_content()),
        Tag::Empty => tree.create_placeholder(),
        Tag::Fragment => {
            let node = tree.create_fragment()?;
            mount_children(tree, &node, vnode.children(), parent)?;
            Ok(node)
        }
        Tag::Element(name) if !is_valid_tag_name(name) => mount_unknown(tree, name),
        Tag::Element(name) => {
            let namespace = namespace_for(name, parent);
            let node = tree.create_element(name, namespace)?;
            apply_props(tree, &node, vnode.props())?;
            mount_children(tree, &node, vnode.children(), Some(namespace))?;
            Ok(node)
        }
    }
}

fn mount_unknown<T: RetainedTree>(tree: &mut T, name: &str) -> Result<T::Node> {
    tracing::warn!(tag = name, "unknown tag, rendering placeholder");
    let node = tree.create_element(UNKNOWN_ELEMENT, Namespace::Html)?;
    tree.set_attribute(&node, UNKNOWN_TAG_ATTRIBUTE, name)?;
    Ok(node)
}

/// Mount one child slot.
pub(crate) fn mount_child<T: RetainedTree>(
    tree: &mut T,
    child: &Child,
    parent: Option<Namespace>,
) -> Result<T::Node> {
    match child {
        Child::Text(text) => tree.create_text(text),
        Child::Node(vnode) => mount(tree, vnode, parent),
    }
}

fn mount_children<T: RetainedTree>(
    tree: &mut T,
    node: &T::Node,
    children: &[Child],
    namespace: Option<Namespace>,
) -> Result<()> {
    match children {
        [] => Ok(()),
        [only] => {
            let child = mount_child(tree, only, namespace)?;
            tree.append_child(node, &child)
        }
        many => {
            let mounted = many
                .iter()
                .map(|child| mount_child(tree, child, namespace))
                .collect::<Result<Vec<_>>>()?;
            tree.append_children(node, mounted)
        }
    }
}

fn apply_props<T: RetainedTree>(tree: &mut T, node: &T::Node, props: &Props) -> Result<()> {
    for (key, value) in props.iter() {
        match (binding(key, value), value) {
            (Binding::Listener, PropValue::Handler(handler)) => {
                tree.add_listener(node, &event_name(key), handler.clone())?;
            }
            (Binding::Attribute, _) => {
                if let Some(text) = attribute_text(value) {
                    tree.set_attribute(node, key, &text)?;
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
