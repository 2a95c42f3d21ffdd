//! Error types for tree reconciliation and component hosting.
//!
//! The reactive engine itself never fails; everything that touches a
//! retained tree, a component registry or configuration returns [`Result`].

/// Errors raised by retained-tree operations, mounting, patching and hosts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A live node handle no longer refers to a node in the tree
    #[error("live node {0} does not exist")]
    MissingNode(String),

    /// The node is not a child of the given parent
    #[error("node {child} is not a child of {parent}")]
    NotAChild {
        /// The parent that was searched
        parent: String,
        /// The node that was expected among its children
        child: String,
    },

    /// The node cannot hold children (text and placeholder nodes)
    #[error("node {0} cannot hold children")]
    NotAContainer(String),

    /// The operation needs an element (attributes, listeners, shadow roots)
    #[error("node {0} is not an element")]
    NotAnElement(String),

    /// Text was written to a node that is not a text node
    #[error("node {0} is not a text node")]
    NotText(String),

    /// The element already hosts a shadow root
    #[error("node {0} already has a shadow root")]
    ShadowRootExists(String),

    /// The live tree is borrowed elsewhere, e.g. a signal was written while
    /// the caller held the tree mutably
    #[error("live tree is already borrowed")]
    TreeBusy,

    /// No component definition is registered for the tag
    #[error("no component is defined for <{0}>")]
    UnknownComponent(String),

    /// Host configuration could not be parsed
    #[error("invalid host configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
