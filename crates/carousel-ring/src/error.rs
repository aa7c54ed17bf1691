//! Error types for ring backends.

use carousel_types::Score;

/// Errors that can occur during ring backend operations.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    /// The ring lock could not be acquired because another owner holds it.
    #[error("ring lock held by another owner")]
    LockHeldByOther,

    /// `unlock` was called while the lock was not held (or already expired
    /// and re-released).
    #[error("ring lock not held")]
    LockNotHeld,

    /// `unlock` was called by a caller that is not the current owner.
    #[error("ring lock owned by another caller")]
    LockNotOwned,

    /// No slot exists at the given score.
    #[error("no slot at score {0}")]
    SlotNotFound(Score),

    /// The slot exists but does not contain the given virtual-node key.
    #[error("vnode {vkey} not present at score {score}")]
    VnodeNotFound {
        /// Score of the slot that was searched.
        score: Score,
        /// The virtual-node key that was not found.
        vkey: String,
    },

    /// A backend-specific failure (I/O, remote store, encoding).
    #[error("ring backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}
