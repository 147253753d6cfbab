use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Logical area of a declaration a chunk was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionTag {
    Header,
    Declarant,
    Goods,
    Manufacturer,
    Importer,
    Exporter,
    CustomsValue,
    Payment,
    Transport,
    Documents,
    General,
}

/// A single retrieval unit produced by the section extractor / chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub declaration_id: String,
    pub content: String,
    pub section: Option<SectionTag>,
    /// 0-based, dense and stable within a declaration.
    pub chunk_index: u32,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Chunk {
    pub fn new(declaration_id: impl Into<String>, chunk_index: u32, content: impl Into<String>) -> Self {
        let declaration_id = declaration_id.into();
        Self {
            chunk_id: format!("{declaration_id}#{chunk_index}"),
            declaration_id,
            content: content.into(),
            section: None,
            chunk_index,
            metadata: BTreeMap::new(),
        }
    }
}
