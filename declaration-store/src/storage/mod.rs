//! The three storage collaborator interfaces and their concrete
//! implementations. Each is a minimal operation set bound to a concrete
//! backend at assembly time — no virtual-base trickery beyond the trait
//! object itself.

pub mod document_store;
pub mod metadata_store;
pub mod text_index;
pub mod vector_index;

pub use document_store::{DocumentStore, FsDocumentStore};
pub use metadata_store::{MetadataStore, SqliteMetadataStore};
pub use text_index::{TantivyTextIndex, TextIndex, TextMatch};
pub use vector_index::{HnswVectorIndex, VectorIndex, VectorMatch, VectorPoint};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("serialization error: {0}")]
    Serialize(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Stable 64-bit id derived from a chunk id by hash truncation, matching
/// the vector store's requirement for an `int64` point id. Truncated into
/// the non-negative `i64` range the same way the reference vector store
/// truncates a 64-bit hash (`hash % 2^63`).
pub fn stable_point_id(chunk_id: &str) -> i64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    chunk_id.hash(&mut hasher);
    (hasher.finish() % (1u64 << 63)) as i64
}
