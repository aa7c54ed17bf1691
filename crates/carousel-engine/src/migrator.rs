//! The caller-supplied migration callback.

use std::collections::HashSet;

/// Error returned by a [`Migrator`]. The engine logs and discards it;
/// failure recovery is the caller's responsibility.
pub type MigrateError = Box<dyn std::error::Error + Send + Sync>;

/// Performs the actual relocation of data between nodes.
///
/// Invoked after the ring lock has been released, from a parallel task
/// group, once per virtual node whose arc changed hands. Implementations
/// must be idempotent: the engine does not retry, and it swallows both
/// returned errors and panics, so a failed migration never fails the
/// topology operation that triggered it.
#[async_trait::async_trait]
pub trait Migrator: Send + Sync {
    /// Move `keys` from node `from` to node `to`.
    async fn migrate(
        &self,
        keys: &HashSet<String>,
        from: &str,
        to: &str,
    ) -> Result<(), MigrateError>;
}
