//! Error types for the placement engine.

/// Errors that can occur during placement operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A ring backend call failed.
    #[error("ring error: {0}")]
    Ring(#[from] carousel_ring::RingError),

    /// `add_node` was called for a node already on the ring.
    #[error("node already on the ring: {0}")]
    DuplicateNode(String),

    /// `remove_node` was called for a node the ring does not know.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// The ring has no slots, so no node can own the key.
    #[error("no node available")]
    EmptyRing,

    /// A leaving node still holds data keys and no other node exists to
    /// take them over.
    #[error("no other node to take over data keys")]
    NoOtherNode,
}
