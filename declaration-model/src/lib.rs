//! Shared data model for the declaration ingestion-and-retrieval pipeline.

pub mod chunk;
pub mod error;
pub mod filter;
pub mod record;
pub mod rules;
pub mod schema;
pub mod search;

pub use chunk::{Chunk, SectionTag};
pub use error::CoreError;
pub use filter::{FilterClause, FilterValue};
pub use record::{CanonicalRecord, DeclarationType, Status};
pub use rules::RuleVersion;
pub use schema::{FieldType, TenantSchema};
pub use search::{Explanation, SearchHit};
