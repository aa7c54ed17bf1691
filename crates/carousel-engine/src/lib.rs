//! Consistent-hash placement engine.
//!
//! The [`CarouselEngine`] decides which node of a dynamic set owns each data
//! key, and computes the minimal key movement when nodes join or leave. Ring
//! state lives behind the [`HashRing`](carousel_ring::HashRing) trait, so it
//! can be hosted in-process or on a shared coordination store; the actual
//! byte-moving is delegated to a caller-supplied [`Migrator`].

pub mod engine;
pub mod error;
pub mod hasher;
mod migration;
pub mod migrator;

pub use engine::{CarouselEngine, EngineConfig};
pub use error::EngineError;
pub use hasher::{KeyHasher, XxHasher};
pub use migrator::{MigrateError, Migrator};

#[cfg(test)]
mod tests;
