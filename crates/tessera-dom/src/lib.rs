//! Tessera DOM
//!
//! Arena-based document tree shared by the parsing layer and its callers.
//! Nodes live in a single `Vec` and link to each other by [`NodeId`].

mod node;
mod tree;
mod serialize;
pub mod meta;

pub use node::{Attribute, ElementData, Node, NodeData, TextData};
pub use tree::{Children, Descendants, DomTree};
pub use serialize::HtmlSerializer;
pub use meta::MetaError;

/// HTML namespace URI
pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Whether this ID refers to a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
