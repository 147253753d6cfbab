//! Multi-tenant schema registry, field mapping, normalization, and the
//! storage-trio collaborators (metadata / text / vector / document) for
//! the declaration ingestion-and-retrieval pipeline.

pub mod mapper;
pub mod normalize;
pub mod orchestrator;
pub mod registry;
pub mod storage;

pub use mapper::{map_fields, MappedFields};
pub use orchestrator::{ingest_declaration_orchestrated, delete_by_filter_orchestrated, DeleteReport, OrchestratorError};
pub use registry::{RegistryError, SchemaRegistry};
pub use storage::{
    DocumentStore, FsDocumentStore, MetadataStore, SqliteMetadataStore, StoreError,
    TantivyTextIndex, TextIndex, TextMatch, HnswVectorIndex, VectorIndex, VectorMatch, VectorPoint,
    stable_point_id,
};
