//! Storage primitives shared by every repository: the error taxonomy, the change
//! feed, and an in-memory backend.

mod feed;
mod memory;

pub use feed::{ChangeEvent, ChangeFeed, Entity, EqualityFilter, EventKind};
pub use memory::MemoryStore;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record cannot change from its current state: {0}")]
    InvalidState(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
