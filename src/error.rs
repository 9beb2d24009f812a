//! Error types.
//!
//! Setup entry points return [`EngineError`]. Steady-state rendering never
//! raises: effect bodies report through [`crate::log::report`] instead.

use thiserror::Error;

use crate::dom::NodeId;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Structural DOM failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("unknown node: {0:?}")]
    UnknownNode(NodeId),

    #[error("reference node {reference:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, reference: NodeId },

    #[error("cannot insert {node:?} into {parent:?}")]
    HierarchyRequest { parent: NodeId, node: NodeId },

    #[error("region markers {start:?}..{end:?} are not siblings under a parent")]
    DetachedRegion { start: NodeId, end: NodeId },
}

/// Errors raised by the binding engine and the component layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid instance or missing shadow root")]
    MissingRoot,

    #[error("component {tag} has already been destroyed")]
    Destroyed { tag: String },

    #[error("invalid tag name: {tag}")]
    InvalidTagName { tag: String },

    #[error("{tag} already registered")]
    AlreadyRegistered { tag: String },

    #[error("no component registered for {tag}")]
    UnknownComponent { tag: String },

    #[error(transparent)]
    Dom(#[from] DomError),
}
