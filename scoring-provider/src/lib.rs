//! The pairwise scorer used by the adaptive reranker, parallel in shape to
//! `embedding_provider`'s `Embedder`: a narrow trait over a stateful model
//! handle, bound to a concrete implementation at assembly time.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use thiserror::Error;

/// Identifies the backing implementation that powers a scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScorerKind {
    LexicalOverlap,
    DeterministicRemote,
}

/// Static metadata describing a particular scorer instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorerInfo {
    pub provider: ScorerKind,
    pub scorer_model_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScorerError {
    #[error("invalid scorer configuration: {message}")]
    InvalidConfiguration { message: String },
    #[error("provider failure: {message}")]
    ProviderFailure { message: String },
}

/// Core interface for all pairwise scorer implementations. Safe for
/// concurrent invocation — the reranker may call it from multiple requests
/// at once.
pub trait PairwiseScorer: Send + Sync {
    fn score_pair(&self, query: &str, doc: &str) -> Result<f32, ScorerError>;
    fn score_batch(&self, query: &str, docs: &[&str]) -> Result<Vec<f32>, ScorerError> {
        docs.iter().map(|doc| self.score_pair(query, doc)).collect()
    }
    fn info(&self) -> &ScorerInfo;
}

/// Deterministic light scorer: normalised lexical term overlap between the
/// lower-cased, whitespace-tokenised query and document.
#[derive(Debug, Clone)]
pub struct LexicalOverlapScorer {
    info: ScorerInfo,
}

impl LexicalOverlapScorer {
    pub fn new() -> Self {
        Self {
            info: ScorerInfo {
                provider: ScorerKind::LexicalOverlap,
                scorer_model_id: "lexical-overlap-v1".to_string(),
            },
        }
    }
}

impl Default for LexicalOverlapScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl PairwiseScorer for LexicalOverlapScorer {
    fn score_pair(&self, query: &str, doc: &str) -> Result<f32, ScorerError> {
        let query_terms: HashSet<String> = tokenize(query);
        if query_terms.is_empty() {
            return Ok(0.0);
        }
        let doc_terms: HashSet<String> = tokenize(doc);
        let overlap = query_terms.intersection(&doc_terms).count();
        Ok(overlap as f32 / query_terms.len() as f32)
    }

    fn info(&self) -> &ScorerInfo {
        &self.info
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Configuration for a heavy scorer delegating to an out-of-process scoring
/// model reachable over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteScorerConfig {
    pub endpoint: String,
    pub auth_token: Option<String>,
    pub scorer_model_id: String,
}

/// Deterministic pseudo-scorer representing a remote cross-encoder behind
/// HTTP: the pair's score is a seeded hash of `(endpoint, model_id, query,
/// doc)`, giving reproducible results without requiring network I/O.
#[derive(Debug, Clone)]
pub struct RemoteScorer {
    info: ScorerInfo,
    endpoint: String,
    auth_token: Option<String>,
}

impl RemoteScorer {
    pub fn new(config: RemoteScorerConfig) -> Result<Self, ScorerError> {
        if config.endpoint.trim().is_empty() {
            return Err(ScorerError::InvalidConfiguration {
                message: "endpoint must not be empty".into(),
            });
        }
        Ok(Self {
            info: ScorerInfo {
                provider: ScorerKind::DeterministicRemote,
                scorer_model_id: config.scorer_model_id,
            },
            endpoint: config.endpoint,
            auth_token: config.auth_token,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl PairwiseScorer for RemoteScorer {
    fn score_pair(&self, query: &str, doc: &str) -> Result<f32, ScorerError> {
        let mut hasher = DefaultHasher::new();
        self.endpoint.hash(&mut hasher);
        self.auth_token.hash(&mut hasher);
        self.info.scorer_model_id.hash(&mut hasher);
        query.hash(&mut hasher);
        doc.hash(&mut hasher);
        let hashed = hasher.finish();
        Ok((hashed as f64 / u64::MAX as f64) as f32)
    }

    fn info(&self) -> &ScorerInfo {
        &self.info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_overlap_scores_full_match_as_one() {
        let scorer = LexicalOverlapScorer::new();
        let score = scorer.score_pair("samsung transformer", "samsung transformer units").unwrap();
        assert_eq!(score, 1.0);
    }

    #[test]
    fn lexical_overlap_scores_no_match_as_zero() {
        let scorer = LexicalOverlapScorer::new();
        let score = scorer.score_pair("samsung", "unrelated content here").unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn remote_scorer_is_deterministic_for_same_pair() {
        let scorer = RemoteScorer::new(RemoteScorerConfig {
            endpoint: "https://example.test/score".into(),
            auth_token: None,
            scorer_model_id: "cross-encoder-v1".into(),
        })
        .unwrap();
        let a = scorer.score_pair("q", "d").unwrap();
        let b = scorer.score_pair("q", "d").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn remote_scorer_rejects_empty_endpoint() {
        let result = RemoteScorer::new(RemoteScorerConfig {
            endpoint: String::new(),
            auth_token: None,
            scorer_model_id: "x".into(),
        });
        assert!(result.is_err());
    }
}
