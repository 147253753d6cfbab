//! Assembles the storage-trio, schema registry, embedder and scorers into
//! the end-to-end declaration ingestion-and-retrieval service: ingestion
//! pipeline, hybrid (RRF) retriever, adaptive reranker, temporal adjuster
//! and explainer.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use declaration_adapters::{adapt_markup, adapt_ocr, adapt_record, chunk, ChunkerConfig};
use declaration_model::filter::RangePredicate;
use declaration_model::search::{ModelUsed, TemporalContext};
use declaration_model::{
    resolve_rule_version, CanonicalRecord, Chunk, Explanation, FilterClause, FilterValue,
    RuleVersion, SearchHit, SectionTag, TenantSchema,
};
use declaration_store::{
    delete_by_filter_orchestrated, ingest_declaration_orchestrated, stable_point_id, DeleteReport,
    DocumentStore, FsDocumentStore, HnswVectorIndex, MetadataStore, OrchestratorError,
    SchemaRegistry, SqliteMetadataStore, TantivyTextIndex, TextIndex, TextMatch, VectorIndex,
    VectorMatch,
};
use embedding_provider::embedder::{Embedder, OnnxStdIoConfig, OnnxStdIoEmbedder};
use scoring_provider::{LexicalOverlapScorer, PairwiseScorer};
use tracing::{debug, info, trace, warn};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("input format error: {0}")]
    InputFormat(String),
    #[error("storage unavailable: {0}")]
    Storage(String),
    #[error("embedder error: {0}")]
    Embed(String),
    #[error("query error in stage `{stage}`: {message}")]
    Query { stage: String, message: String },
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<declaration_store::StoreError> for ServiceError {
    fn from(e: declaration_store::StoreError) -> Self {
        ServiceError::Storage(e.to_string())
    }
}

impl From<declaration_store::RegistryError> for ServiceError {
    fn from(e: declaration_store::RegistryError) -> Self {
        ServiceError::Storage(e.to_string())
    }
}

impl From<OrchestratorError> for ServiceError {
    fn from(e: OrchestratorError) -> Self {
        ServiceError::Storage(e.to_string())
    }
}

impl From<embedding_provider::embedder::EmbedderError> for ServiceError {
    fn from(e: embedding_provider::embedder::EmbedderError) -> Self {
        ServiceError::Embed(e.to_string())
    }
}

impl From<declaration_adapters::AdapterError> for ServiceError {
    fn from(e: declaration_adapters::AdapterError) -> Self {
        ServiceError::InputFormat(e.to_string())
    }
}

/// Assembly-time configuration. Defaults mirror §6's configuration surface
/// (`chunk_size=512`, `hybrid_alpha=0.5`, `reranker.threshold=0.7`, ...).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub metadata_db_path: PathBuf,
    pub document_root: PathBuf,
    pub vector_dir: PathBuf,
    pub tenant_config_dir: PathBuf,
    pub embedder: OnnxStdIoConfig,
    pub chunker: ChunkerConfig,
    pub hybrid_alpha: f32,
    pub rrf_k: f32,
    pub reranker_threshold: f32,
    pub rule_versions: Vec<RuleVersion>,
    pub temporal_enabled: bool,
    pub explain_enabled: bool,
}

impl ServiceConfig {
    pub fn new(
        metadata_db_path: impl Into<PathBuf>,
        document_root: impl Into<PathBuf>,
        vector_dir: impl Into<PathBuf>,
        tenant_config_dir: impl Into<PathBuf>,
        embedder: OnnxStdIoConfig,
    ) -> Self {
        Self {
            metadata_db_path: metadata_db_path.into(),
            document_root: document_root.into(),
            vector_dir: vector_dir.into(),
            tenant_config_dir: tenant_config_dir.into(),
            embedder,
            chunker: ChunkerConfig::default(),
            hybrid_alpha: 0.5,
            rrf_k: 60.0,
            reranker_threshold: 0.7,
            rule_versions: Vec::new(),
            temporal_enabled: true,
            explain_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub declaration_id: String,
    pub chunks_count: usize,
    pub indexed_at: DateTime<Utc>,
    pub validation_errors: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
    pub filters: Vec<FilterClause>,
    pub rerank: bool,
    pub explain: bool,
    /// Defaults to "now" when absent; used by the temporal adjuster.
    pub query_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub metadata_ok: bool,
    pub vector_ok: bool,
    pub text_ok: bool,
}

/// The assembled service: one metadata/document/text/vector collaborator
/// each, a schema registry, an embedder, and the light/heavy pairwise
/// scorers used by the reranker.
pub struct DeclarationService {
    metadata: Mutex<SqliteMetadataStore>,
    documents: FsDocumentStore,
    text_index: TantivyTextIndex,
    vector_index: Mutex<HnswVectorIndex>,
    registry: SchemaRegistry,
    embedder: Box<dyn Embedder>,
    light_scorer: LexicalOverlapScorer,
    heavy_scorer: Option<Box<dyn PairwiseScorer>>,
    config: ServiceConfig,
}

impl DeclarationService {
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let metadata = SqliteMetadataStore::open(&config.metadata_db_path)?;
        let documents = FsDocumentStore::new(&config.document_root);
        let text_index = TantivyTextIndex::new_ram()?;
        let dimension = config.embedder.dimension;
        let vector_index = if config.vector_dir.exists() {
            HnswVectorIndex::load(&config.vector_dir, dimension)?
        } else {
            HnswVectorIndex::new(dimension, 10_000)
        };
        let registry = SchemaRegistry::load(&config.tenant_config_dir)?;
        let embedder = OnnxStdIoEmbedder::new(config.embedder.clone())?;

        info!(
            tenants = registry.list_tenants().len(),
            dimension,
            "declaration service assembled"
        );
        Ok(Self {
            metadata: Mutex::new(metadata),
            documents,
            text_index,
            vector_index: Mutex::new(vector_index),
            registry,
            embedder: Box::new(embedder),
            light_scorer: LexicalOverlapScorer::new(),
            heavy_scorer: None,
            config,
        })
    }

    /// Wires a heavy pairwise scorer for reranking high-complexity queries.
    /// Without one, the adaptive reranker always falls back to the light
    /// scorer regardless of complexity.
    pub fn with_heavy_scorer(mut self, scorer: Box<dyn PairwiseScorer>) -> Self {
        self.heavy_scorer = Some(scorer);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn register_schema(&self, schema: TenantSchema) -> Result<(), ServiceError> {
        Ok(self.registry.register_schema(schema)?)
    }

    pub fn get_schema(&self, tenant_id: &str) -> TenantSchema {
        self.registry.get_schema(tenant_id)
    }

    pub fn list_tenants(&self) -> Vec<String> {
        self.registry.list_tenants()
    }

    pub fn reload_schemas(&self) -> Result<(), ServiceError> {
        Ok(self.registry.reload()?)
    }

    pub fn declaration_count(&self) -> Result<i64, ServiceError> {
        Ok(self.metadata.lock().unwrap().counts()?)
    }

    pub fn get_document(&self, declaration_id: &str) -> Result<Option<CanonicalRecord>, ServiceError> {
        Ok(self.documents.get_document(declaration_id)?)
    }

    /// Persists the vector index sidecar to `config.vector_dir`. The
    /// Tantivy text index and SQLite metadata store are already durable on
    /// every write.
    pub fn persist(&self) -> Result<(), ServiceError> {
        let vector_index = self.vector_index.lock().unwrap();
        Ok(vector_index.save(&self.config.vector_dir)?)
    }

    pub fn health(&self) -> HealthReport {
        let metadata_ok = self
            .metadata
            .lock()
            .map(|m| m.counts().is_ok())
            .unwrap_or(false);
        let vector_ok = self.vector_index.lock().is_ok();
        let text_ok = self.text_index.search("healthcheck", 1, 1, &[]).is_ok();
        let status = if metadata_ok && vector_ok && text_ok {
            "healthy"
        } else {
            "degraded"
        };
        HealthReport {
            status,
            metadata_ok,
            vector_ok,
            text_ok,
        }
    }

    // --- Ingestion --------------------------------------------------

    pub fn ingest_markup(&self, xml: &str, tenant_id: &str) -> Result<IngestReport, ServiceError> {
        let record = adapt_markup(xml)?;
        self.ingest_common(record, tenant_id)
    }

    pub fn ingest_record(
        &self,
        json_data: &serde_json::Value,
        tenant_id: &str,
    ) -> Result<IngestReport, ServiceError> {
        let schema = self.registry.get_schema(tenant_id);
        let record = adapt_record(json_data, &schema);
        self.ingest_common(record, tenant_id)
    }

    pub fn ingest_ocr(&self, raw_text: &str, tenant_id: &str) -> Result<IngestReport, ServiceError> {
        if raw_text.trim().is_empty() {
            return Err(ServiceError::InputFormat("input is empty".into()));
        }
        let record = adapt_ocr(raw_text);
        self.ingest_common(record, tenant_id)
    }

    /// Shared tail of all three adapters: chunk → embed → upsert metadata →
    /// upsert vectors → upsert blob (§5's stage ordering), delegating the
    /// storage half to `ingest_declaration_orchestrated`.
    fn ingest_common(&self, mut record: CanonicalRecord, tenant_id: &str) -> Result<IngestReport, ServiceError> {
        let _ = tenant_id; // tenant-specific mapping already applied by adapt_record; markup/OCR are tenant-agnostic inputs
        record.processed_at = Some(Utc::now());

        let chunks = chunk(&record.declaration_id, record.coverage_text(), &record, &self.config.chunker);
        debug!(declaration_id = %record.declaration_id, chunks = chunks.len(), "chunked declaration");
        for c in &chunks {
            trace!(chunk_id = %c.chunk_id, len = c.content.len(), "produced chunk");
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let embeddings: Vec<(String, Vec<f32>)> = if texts.is_empty() {
            Vec::new()
        } else {
            let vectors = self.embedder.embed_batch(&texts).map_err(|e| {
                warn!(declaration_id = %record.declaration_id, error = %e, "embedding failed");
                e
            })?;
            chunks
                .iter()
                .zip(vectors)
                .map(|(c, v)| (c.chunk_id.clone(), v))
                .collect()
        };

        {
            let mut metadata = self.metadata.lock().unwrap();
            let mut vector_index = self.vector_index.lock().unwrap();
            ingest_declaration_orchestrated(
                &mut *metadata,
                &self.documents,
                &self.text_index,
                &mut *vector_index,
                &record,
                &chunks,
                &embeddings,
            )
            .map_err(|e| {
                warn!(declaration_id = %record.declaration_id, error = %e, "ingest failed");
                e
            })?;
        }

        info!(declaration_id = %record.declaration_id, chunks = chunks.len(), "ingested declaration");
        Ok(IngestReport {
            declaration_id: record.declaration_id.clone(),
            chunks_count: chunks.len(),
            indexed_at: record.processed_at.unwrap(),
            validation_errors: record.validation_errors.clone(),
        })
    }

    pub fn delete_by_filter(
        &self,
        field: &str,
        value: &str,
        batch_size: usize,
    ) -> Result<DeleteReport, ServiceError> {
        let mut metadata = self.metadata.lock().unwrap();
        let mut vector_index = self.vector_index.lock().unwrap();
        let report = delete_by_filter_orchestrated(
            &mut *metadata,
            &self.documents,
            &self.text_index,
            &mut *vector_index,
            field,
            value,
            batch_size,
        )?;
        info!(field, value, deleted = report.total_ids, "deleted declarations by filter");
        Ok(report)
    }

    // --- Retrieval ----------------------------------------------------

    pub fn search(&self, req: &SearchRequest) -> Result<Vec<SearchHit>, ServiceError> {
        let top_k = req.top_k.clamp(1, 100);
        let fetch = top_k.saturating_mul(2).max(top_k);

        let query_vector = self.embedder.embed(&req.query)?;
        let equality_filter = req
            .filters
            .iter()
            .find(|f| matches!(f.value, FilterValue::Eq(_)))
            .cloned();
        let dense_matches: Vec<VectorMatch> = {
            let vector_index = self.vector_index.lock().unwrap();
            vector_index
                .search(&query_vector, fetch, equality_filter.as_ref())
                .map_err(|e| ServiceError::Query {
                    stage: "dense".into(),
                    message: e.to_string(),
                })?
        };
        let sparse_matches: Vec<TextMatch> = self
            .text_index
            .search(&req.query, fetch, 2, &req.filters)
            .map_err(|e| ServiceError::Query {
                stage: "sparse".into(),
                message: e.to_string(),
            })?;

        debug!(
            query = %req.query,
            dense = dense_matches.len(),
            sparse = sparse_matches.len(),
            "channel results before fusion"
        );
        let fused = fuse_rrf(&dense_matches, &sparse_matches, self.config.hybrid_alpha, self.config.rrf_k);
        debug!(fused = fused.len(), "fused hybrid results");

        let mut cache: BTreeMap<String, (CanonicalRecord, Vec<Chunk>)> = BTreeMap::new();
        let mut hits = Vec::with_capacity(fused.len());
        for fused_hit in fused {
            let Some(declaration_id) = fused_hit.chunk_id.rsplit_once('#').map(|(d, _)| d.to_string()) else {
                continue;
            };
            let Some((record, matched_chunk)) = self.load_chunk(&declaration_id, &fused_hit.chunk_id, &mut cache) else {
                continue;
            };
            if !req.filters.iter().all(|fc| passes_filter(&record, fc)) {
                continue;
            }

            let mut hit = SearchHit::new(declaration_id, fused_hit.chunk_id, matched_chunk.content.clone());
            hit.section = matched_chunk.section.map(section_label);
            hit.metadata = matched_chunk.metadata.clone();
            hit.dense_score = fused_hit.dense_score;
            hit.sparse_score = fused_hit.sparse_score;
            hit.rrf_score = Some(fused_hit.rrf_score);
            hit.final_score = fused_hit.rrf_score;
            hits.push((hit, record));
        }
        hits.truncate(top_k);

        if req.rerank {
            self.rerank(&req.query, &mut hits, top_k)?;
        }

        if self.config.temporal_enabled {
            let query_date = req.query_date.unwrap_or_else(Utc::now);
            for (hit, record) in hits.iter_mut() {
                apply_temporal(hit, record, query_date, &self.config.rule_versions);
            }
        }

        if req.explain && self.config.explain_enabled {
            for (hit, record) in hits.iter_mut() {
                hit.explanation = Some(explain(&req.query, record, &hit.content, hit));
            }
        }

        hits.sort_by(|a, b| b.0.final_score.partial_cmp(&a.0.final_score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits.into_iter().map(|(hit, _)| hit).collect())
    }

    /// Recovers a chunk's content deterministically by re-running the
    /// chunker over the stored document: neither storage backend carries
    /// full chunk content (the vector payload and the text index both key
    /// on `chunk_id` only), and the chunker is a pure function of the
    /// record's coverage text, so re-deriving it is exact and avoids
    /// growing the storage contracts for a cache.
    fn load_chunk(
        &self,
        declaration_id: &str,
        chunk_id: &str,
        cache: &mut BTreeMap<String, (CanonicalRecord, Vec<Chunk>)>,
    ) -> Option<(CanonicalRecord, Chunk)> {
        if !cache.contains_key(declaration_id) {
            let record = self.documents.get_document(declaration_id).ok().flatten()?;
            let chunks = chunk(declaration_id, record.coverage_text(), &record, &self.config.chunker);
            cache.insert(declaration_id.to_string(), (record, chunks));
        }
        let (record, chunks) = cache.get(declaration_id)?;
        let found = chunks.iter().find(|c| c.chunk_id == chunk_id)?.clone();
        Some((record.clone(), found))
    }

    fn rerank(
        &self,
        query: &str,
        hits: &mut Vec<(SearchHit, CanonicalRecord)>,
        top_k: usize,
    ) -> Result<(), ServiceError> {
        if hits.is_empty() {
            return Ok(());
        }
        let complexity = query_complexity(query);
        let use_heavy = complexity >= self.config.reranker_threshold && self.heavy_scorer.is_some();
        debug!(complexity, use_heavy, "reranker routing decision");
        let (scorer, model_used): (&dyn PairwiseScorer, ModelUsed) = if use_heavy {
            (self.heavy_scorer.as_deref().unwrap(), ModelUsed::Complex)
        } else {
            (&self.light_scorer, ModelUsed::Simple)
        };

        let docs: Vec<&str> = hits.iter().map(|(h, _)| h.content.as_str()).collect();
        let scores = scorer.score_batch(query, &docs).map_err(|e| ServiceError::Query {
            stage: "rerank".into(),
            message: e.to_string(),
        })?;
        for ((hit, _), score) in hits.iter_mut().zip(scores) {
            hit.final_score = score;
            hit.model_used = Some(model_used);
        }
        hits.sort_by(|a, b| b.0.final_score.partial_cmp(&a.0.final_score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(())
    }
}

struct FusedHit {
    chunk_id: String,
    rrf_score: f32,
    dense_score: Option<f32>,
    sparse_score: Option<f32>,
}

/// Reciprocal Rank Fusion: `score = Σ_channel coefficient_channel /
/// (k_rrf + rank)`. Ties are broken by the order chunk ids were first seen
/// in a dense-then-sparse concatenation, preserved by a stable sort.
fn fuse_rrf(dense: &[VectorMatch], sparse: &[TextMatch], alpha: f32, k_rrf: f32) -> Vec<FusedHit> {
    let mut order: Vec<String> = Vec::new();
    let mut seen = HashSet::new();

    let dense_chunk_id = |m: &VectorMatch| -> Option<String> {
        m.payload.get("chunk_id").and_then(|v| v.as_str()).map(|s| s.to_string())
    };

    for m in dense {
        if let Some(cid) = dense_chunk_id(m) {
            if seen.insert(cid.clone()) {
                order.push(cid);
            }
        }
    }
    for m in sparse {
        if seen.insert(m.chunk_id.clone()) {
            order.push(m.chunk_id.clone());
        }
    }

    let mut dense_rank: BTreeMap<String, usize> = BTreeMap::new();
    let mut dense_score: BTreeMap<String, f32> = BTreeMap::new();
    for (i, m) in dense.iter().enumerate() {
        if let Some(cid) = dense_chunk_id(m) {
            dense_rank.entry(cid.clone()).or_insert(i + 1);
            dense_score.entry(cid).or_insert(m.score);
        }
    }
    let mut sparse_rank: BTreeMap<String, usize> = BTreeMap::new();
    let mut sparse_score: BTreeMap<String, f32> = BTreeMap::new();
    for (i, m) in sparse.iter().enumerate() {
        sparse_rank.entry(m.chunk_id.clone()).or_insert(i + 1);
        sparse_score.entry(m.chunk_id.clone()).or_insert(m.score);
    }

    let mut fused: Vec<FusedHit> = order
        .into_iter()
        .map(|chunk_id| {
            let mut rrf_score = 0.0f32;
            if let Some(r) = dense_rank.get(&chunk_id) {
                rrf_score += alpha / (k_rrf + *r as f32);
            }
            if let Some(r) = sparse_rank.get(&chunk_id) {
                rrf_score += (1.0 - alpha) / (k_rrf + *r as f32);
            }
            FusedHit {
                dense_score: dense_score.get(&chunk_id).copied(),
                sparse_score: sparse_score.get(&chunk_id).copied(),
                chunk_id,
                rrf_score,
            }
        })
        .collect();

    fused.sort_by(|a, b| b.rrf_score.partial_cmp(&a.rrf_score).unwrap_or(std::cmp::Ordering::Equal));
    fused
}

fn section_label(tag: SectionTag) -> String {
    match tag {
        SectionTag::Header => "header",
        SectionTag::Declarant => "declarant",
        SectionTag::Goods => "goods",
        SectionTag::Manufacturer => "manufacturer",
        SectionTag::Importer => "importer",
        SectionTag::Exporter => "exporter",
        SectionTag::CustomsValue => "customs_value",
        SectionTag::Payment => "payment",
        SectionTag::Transport => "transport",
        SectionTag::Documents => "documents",
        SectionTag::General => "general",
    }
    .to_string()
}

/// Three-way filter dispatch (grounded in `original_source/search/metadata_filter.py`):
/// a range predicate against a missing field is ignored (non-match skip,
/// not a failure); a list means membership; anything else means equality,
/// and equality/membership against a missing field fails the predicate.
fn passes_filter(record: &CanonicalRecord, fc: &FilterClause) -> bool {
    let value = field_json(record, &fc.field);
    match &fc.value {
        FilterValue::Range(r) => match value {
            Some(v) => range_matches(&v, r),
            None => true,
        },
        FilterValue::In(list) => match value {
            Some(v) => list.contains(&v),
            None => false,
        },
        FilterValue::Eq(expected) => match value {
            Some(v) => &v == expected,
            None => false,
        },
    }
}

fn field_json(record: &CanonicalRecord, field: &str) -> Option<serde_json::Value> {
    match field {
        "declaration_number" => record.declaration_number.clone().map(|s| serde_json::json!(s)),
        "date_issued" => record.date_issued.map(|d| serde_json::json!(d.to_rfc3339())),
        "manufacturer" => record.manufacturer.clone().map(|s| serde_json::json!(s)),
        "importer" => record.importer.clone().map(|s| serde_json::json!(s)),
        "exporter" => record.exporter.clone().map(|s| serde_json::json!(s)),
        "product_code" => record.product_code.clone().map(|s| serde_json::json!(s)),
        "country_origin" => record.country_origin.clone().map(|s| serde_json::json!(s)),
        "currency" => record.currency.clone().map(|s| serde_json::json!(s)),
        "quantity" => record.quantity.map(|q| serde_json::json!(q)),
        "customs_value" => record.customs_value.map(|v| serde_json::json!(v)),
        "language" => record.language.clone().map(|s| serde_json::json!(s)),
        _ => record.extras.get(field).cloned(),
    }
}

fn range_matches(v: &serde_json::Value, r: &RangePredicate) -> bool {
    let as_f64 = v.as_f64();
    let as_str = v.as_str();

    let ok = |bound: &Option<serde_json::Value>, f_num: fn(f64, f64) -> bool, f_str: fn(&str, &str) -> bool| -> bool {
        let Some(bound) = bound else { return true };
        if let (Some(a), Some(b)) = (as_f64, bound.as_f64()) {
            f_num(a, b)
        } else if let (Some(a), Some(b)) = (as_str, bound.as_str()) {
            f_str(a, b)
        } else {
            true
        }
    };

    if !ok(&r.gte, |a, b| a >= b, |a, b| a >= b) {
        return false;
    }
    if !ok(&r.lte, |a, b| a <= b, |a, b| a <= b) {
        return false;
    }
    if !ok(&r.gt, |a, b| a > b, |a, b| a > b) {
        return false;
    }
    if !ok(&r.lt, |a, b| a < b, |a, b| a < b) {
        return false;
    }
    if let Some(eq) = &r.eq {
        if v != eq {
            return false;
        }
    }
    true
}

/// Query-complexity score in [0,1] (§4.7), routing the reranker between
/// the light and heavy pairwise scorers.
fn query_complexity(query: &str) -> f32 {
    let words = query.split_whitespace().count();
    let mut score = if words > 10 {
        0.2
    } else if words > 5 {
        0.1
    } else {
        0.0
    };

    let lower = query.to_lowercase();
    const LOGICAL: &[&str] = &["and", "or", "и ", " или"];
    const NEGATION: &[&str] = &["not", "except", "не ", "кроме"];
    const TEMPORAL: &[&str] = &["before", "after", "between", "до", "после", "между"];
    const COMPARATORS: &[&str] = &[">", "<", "≥", "≤", "more", "less", "больше", "меньше"];

    let mut pattern_score = 0.0f32;
    for group in [LOGICAL, NEGATION, TEMPORAL, COMPARATORS] {
        if group.iter().any(|p| lower.contains(p)) {
            pattern_score += 0.15;
        }
    }
    if has_four_digit_number(&lower) {
        pattern_score += 0.15;
    }
    score += pattern_score.min(0.6);

    if query.chars().any(|c| c.is_ascii_digit()) {
        score += 0.1;
    }
    let special_chars = query
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();
    if special_chars > 3 {
        score += 0.1;
    }
    score.min(1.0)
}

fn has_four_digit_number(s: &str) -> bool {
    let digits: Vec<char> = s.chars().collect();
    digits.windows(4).any(|w| w.iter().all(|c| c.is_ascii_digit()))
}

fn apply_temporal(hit: &mut SearchHit, record: &CanonicalRecord, query_date: DateTime<Utc>, rule_versions: &[RuleVersion]) {
    let Some(date_issued) = record.date_issued else {
        return;
    };
    let days = (query_date - date_issued).num_days().abs() as f64;
    if days < 365.0 {
        let bonus = 0.1 * (1.0 - days / 365.0);
        hit.final_score += bonus as f32;
    }
    let rule_version = resolve_rule_version(rule_versions, date_issued).cloned();
    hit.temporal_context = Some(TemporalContext {
        declaration_date: date_issued,
        years_ago: days / 365.0,
        rule_version,
    });
}

/// Explanation per §4.9: matched fields/terms and human-readable reasons.
/// Always dictionary-shaped — missing evidence yields empty vectors.
fn explain(query: &str, record: &CanonicalRecord, content: &str, hit: &SearchHit) -> Explanation {
    let lower_query = query.to_lowercase();
    let mut matched_fields = Vec::new();
    let field_candidates: [(&str, Option<String>); 5] = [
        ("manufacturer", record.manufacturer.clone()),
        ("importer", record.importer.clone()),
        ("product_code", record.product_code.clone()),
        ("country_origin", record.country_origin.clone()),
        ("content", Some(content.to_string())),
    ];
    for (name, value) in field_candidates {
        if let Some(v) = value {
            if !lower_query.is_empty() && v.to_lowercase().contains(&lower_query) {
                matched_fields.push(name.to_string());
            }
        }
    }

    let content_lower = content.to_lowercase();
    let matched_terms: Vec<String> = lower_query
        .split_whitespace()
        .filter(|t| content_lower.contains(*t))
        .map(|s| s.to_string())
        .collect();

    let mut reasons = Vec::new();
    if !matched_fields.is_empty() {
        reasons.push(format!("matched fields: {}", matched_fields.join(", ")));
    }
    if !matched_terms.is_empty() {
        let shown: Vec<&str> = matched_terms.iter().take(5).map(|s| s.as_str()).collect();
        reasons.push(format!("matched terms: {}", shown.join(", ")));
    }
    if hit.dense_score.is_some() {
        reasons.push("semantic".to_string());
    }
    if hit.sparse_score.is_some() {
        reasons.push("keyword".to_string());
    }
    if hit.rrf_score.is_some() {
        reasons.push("hybrid".to_string());
    }

    Explanation {
        matched_fields,
        matched_terms,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm(chunk_id: &str, score: f32) -> VectorMatch {
        let mut payload = BTreeMap::new();
        payload.insert("chunk_id".to_string(), serde_json::json!(chunk_id));
        VectorMatch { id: stable_point_id(chunk_id), score, payload }
    }

    fn tm(chunk_id: &str, score: f32) -> TextMatch {
        TextMatch { chunk_id: chunk_id.to_string(), score }
    }

    #[test]
    fn rrf_orders_dense_and_sparse_contributions() {
        // E4: dense rank 1 / sparse rank 3 for A, dense rank 2 / sparse-absent for B.
        let dense = vec![vm("A#0", 0.9), vm("B#0", 0.8)];
        let sparse = vec![tm("X#0", 5.0), tm("Y#0", 4.0), tm("A#0", 3.0)];
        let fused = fuse_rrf(&dense, &sparse, 0.5, 60.0);
        let a_score = fused.iter().find(|f| f.chunk_id == "A#0").unwrap().rrf_score;
        let b_score = fused.iter().find(|f| f.chunk_id == "B#0").unwrap().rrf_score;
        assert!(a_score > b_score);
        assert!((a_score - (0.5 / 61.0 + 0.5 / 63.0)).abs() < 0.0001);
        assert!((b_score - (0.5 / 62.0)).abs() < 0.0001);
    }

    #[test]
    fn rrf_tie_break_prefers_dense_first_order() {
        let dense = vec![vm("A#0", 0.5)];
        let sparse = vec![tm("B#0", 0.5)];
        // Equal ranks (both rank 1, same single channel) => equal scores; dense must sort first.
        let fused = fuse_rrf(&dense, &sparse, 0.5, 60.0);
        assert_eq!(fused[0].chunk_id, "A#0");
    }

    #[test]
    fn complexity_is_low_for_a_single_term() {
        assert!(query_complexity("Samsung") < 0.2);
    }

    #[test]
    fn complexity_is_high_for_a_compound_temporal_query() {
        let score = query_complexity("все декларации Samsung или Apple после 2022 не транзит");
        assert!(score >= 0.7, "expected >= 0.7, got {score}");
    }

    #[test]
    fn temporal_bonus_matches_worked_example() {
        use chrono::TimeZone;
        let mut record = CanonicalRecord::new(Some("D1".into()));
        record.date_issued = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        let query_date = Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap();
        let mut hit = SearchHit::new("D1", "D1#0", "content");
        hit.final_score = 0.5;
        apply_temporal(&mut hit, &record, query_date, &[]);
        assert!((hit.final_score - 0.5753).abs() < 0.001);
    }

    #[test]
    fn passes_filter_treats_missing_range_field_as_skip() {
        let record = CanonicalRecord::new(Some("D1".into()));
        let fc = FilterClause {
            field: "customs_value".to_string(),
            value: FilterValue::Range(RangePredicate {
                gte: Some(serde_json::json!(100)),
                ..Default::default()
            }),
        };
        assert!(passes_filter(&record, &fc));
    }

    #[test]
    fn passes_filter_rejects_missing_equality_field() {
        let record = CanonicalRecord::new(Some("D1".into()));
        let fc = FilterClause::eq("manufacturer", "Samsung");
        assert!(!passes_filter(&record, &fc));
    }
}
