use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rules::RuleVersion;

/// Human/machine-readable evidence for why a result matched a query.
/// Always dictionary-shaped: missing evidence yields empty vectors, not a
/// missing explanation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Explanation {
    pub matched_fields: Vec<String>,
    pub matched_terms: Vec<String>,
    pub reasons: Vec<String>,
}

/// Date-aware annotation attached by the temporal adjuster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalContext {
    pub declaration_date: chrono::DateTime<chrono::Utc>,
    pub years_ago: f64,
    pub rule_version: Option<RuleVersion>,
}

/// Which pairwise scorer tier, if any, re-ranked this result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelUsed {
    Simple,
    Complex,
}

/// A single search result, accumulating fields as it passes through the
/// retrieval, rerank, temporal, and explain stages. Optional fields are
/// `None` exactly when the corresponding stage was skipped or disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub declaration_id: String,
    pub chunk_id: String,
    pub content: String,
    pub section: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,

    pub dense_score: Option<f32>,
    pub sparse_score: Option<f32>,
    pub rrf_score: Option<f32>,
    pub final_score: f32,

    pub model_used: Option<ModelUsed>,
    pub temporal_context: Option<TemporalContext>,
    pub explanation: Option<Explanation>,
}

impl SearchHit {
    pub fn new(declaration_id: impl Into<String>, chunk_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            declaration_id: declaration_id.into(),
            chunk_id: chunk_id.into(),
            content: content.into(),
            section: None,
            metadata: BTreeMap::new(),
            dense_score: None,
            sparse_score: None,
            rrf_score: None,
            final_score: 0.0,
            model_used: None,
            temporal_context: None,
            explanation: None,
        }
    }
}
