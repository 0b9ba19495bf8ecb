use crate::error::{Error, Result};
use std::fmt::Display;

/// Node kind, stored little-endian in the first two bytes of a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum NodeType {
    /// Internal node: child pointers and separator keys, no values.
    Node = 1,
    /// Leaf node: key/value pairs.
    Leaf = 2,
}

impl TryFrom<u16> for NodeType {
    type Error = Error;

    fn try_from(value: u16) -> Result<NodeType> {
        match value {
            1 => Ok(NodeType::Node),
            2 => Ok(NodeType::Leaf),
            b => Err(Error::Corrupt(format!("Unknown node type {}", b))),
        }
    }
}

impl From<NodeType> for u16 {
    fn from(value: NodeType) -> Self {
        value as u16
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeType::Node => write!(f, "node"),
            NodeType::Leaf => write!(f, "leaf"),
        }
    }
}
