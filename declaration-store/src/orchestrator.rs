use declaration_model::{CanonicalRecord, Chunk};
use tracing::{debug, info};

use crate::storage::{DocumentStore, MetadataStore, StoreError, TextIndex, VectorIndex, VectorPoint, stable_point_id};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("index error: {0}")]
    Index(String),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DeleteReport {
    pub total_ids: usize,
    pub metadata_deleted: usize,
    pub document_deleted: usize,
    pub text_delete_attempts: usize,
    pub vector_delete_attempts: usize,
    pub batches: usize,
}

/// Orchestrates deletion by declaration id: list ids matching `field`/`value`
/// in batches (via the metadata store's indexed-column lookup), then delete
/// from metadata, documents, and both search indexes for each batch.
pub fn delete_by_filter_orchestrated(
    metadata: &mut dyn MetadataStore,
    documents: &dyn DocumentStore,
    text_index: &dyn TextIndex,
    vector_index: &mut dyn VectorIndex,
    field: &str,
    value: &str,
    batch_size: usize,
) -> Result<DeleteReport, OrchestratorError> {
    let mut report = DeleteReport::default();
    let batch = batch_size.max(1);

    loop {
        let ids = metadata.list_ids_by_filter(field, value, batch)?;
        if ids.is_empty() {
            break;
        }
        report.total_ids += ids.len();
        report.batches += 1;

        report.metadata_deleted += metadata.delete_by_ids(&ids)?;
        for id in &ids {
            if documents.delete_document(id)? {
                report.document_deleted += 1;
            }
        }

        let chunk_ids: Vec<String> = ids.clone();
        text_index
            .delete_by_ids(&chunk_ids)
            .map_err(|e| OrchestratorError::Index(format!("{e}")))?;
        report.text_delete_attempts += chunk_ids.len();

        let point_ids: Vec<i64> = ids.iter().map(|id| stable_point_id(id)).collect();
        vector_index
            .delete_by_ids(&point_ids)
            .map_err(|e| OrchestratorError::Index(format!("{e}")))?;
        report.vector_delete_attempts += point_ids.len();

        debug!(batch = report.batches, ids = ids.len(), "deleted batch");
    }
    info!(total = report.total_ids, batches = report.batches, "delete_by_filter complete");
    Ok(report)
}

/// Ingests one declaration's worth of chunks: metadata and document blob
/// first, then text and vector indexes, mirroring the ingestion stage order
/// (adapt→normalise→validate→chunk→embed→upsert metadata→upsert vectors→
/// upsert blob) — the indexes are only ever populated once the record they
/// describe is durably stored.
pub fn ingest_declaration_orchestrated(
    metadata: &mut dyn MetadataStore,
    documents: &dyn DocumentStore,
    text_index: &dyn TextIndex,
    vector_index: &mut dyn VectorIndex,
    record: &CanonicalRecord,
    chunks: &[Chunk],
    embeddings: &[(String, Vec<f32>)],
) -> Result<(), OrchestratorError> {
    metadata.upsert(record)?;
    documents.save_document(record)?;

    // Re-ingesting the same declaration_id must replace its chunks rather
    // than append to them, so any chunk count from a prior ingest is wiped
    // before the current chunk set is written.
    text_index
        .delete_by_declaration_id(&record.declaration_id)
        .map_err(|e| OrchestratorError::Index(format!("{e}")))?;
    vector_index
        .delete_where("declaration_id", &serde_json::json!(record.declaration_id))
        .map_err(|e| OrchestratorError::Index(format!("{e}")))?;

    for chunk in chunks {
        text_index
            .upsert(
                &chunk.chunk_id,
                &chunk.declaration_id,
                &chunk.content,
                record.date_issued.map(|d| d.to_rfc3339()).as_deref(),
            )
            .map_err(|e| OrchestratorError::Index(format!("{e}")))?;
    }

    if !embeddings.is_empty() {
        let points: Vec<VectorPoint> = embeddings
            .iter()
            .map(|(chunk_id, vector)| {
                let mut payload = std::collections::BTreeMap::new();
                payload.insert("chunk_id".to_string(), serde_json::json!(chunk_id));
                payload.insert("declaration_id".to_string(), serde_json::json!(record.declaration_id));
                VectorPoint {
                    id: stable_point_id(chunk_id),
                    vector: vector.clone(),
                    payload,
                }
            })
            .collect();
        vector_index
            .upsert(&points)
            .map_err(|e| OrchestratorError::Index(format!("{e}")))?;
    }

    debug!(declaration_id = %record.declaration_id, chunks = chunks.len(), "ingested declaration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FsDocumentStore, HnswVectorIndex, SqliteMetadataStore, TantivyTextIndex};

    fn record(id: &str, manufacturer: &str) -> CanonicalRecord {
        let mut r = CanonicalRecord::new(Some(id.to_string()));
        r.manufacturer = Some(manufacturer.to_string());
        r
    }

    fn chunks_for(record: &CanonicalRecord) -> Vec<Chunk> {
        vec![
            Chunk::new(&record.declaration_id, 0, format!("{} goods transformer", record.manufacturer.as_deref().unwrap_or(""))),
        ]
    }

    fn embeddings_for(chunks: &[Chunk], seed: f32) -> Vec<(String, Vec<f32>)> {
        chunks
            .iter()
            .map(|c| (c.chunk_id.clone(), vec![seed, 1.0 - seed, 0.0]))
            .collect()
    }

    #[test]
    fn ingest_then_search_both_channels_finds_the_chunk() {
        let mut metadata = SqliteMetadataStore::open_in_memory().unwrap();
        let doc_dir = tempfile::tempdir().unwrap();
        let documents = FsDocumentStore::new(doc_dir.path());
        let text_index = TantivyTextIndex::new_ram().unwrap();
        let mut vector_index = HnswVectorIndex::new(3, 100);

        let rec = record("D1", "Samsung");
        let chunks = chunks_for(&rec);
        let embeddings = embeddings_for(&chunks, 0.9);

        ingest_declaration_orchestrated(&mut metadata, &documents, &text_index, &mut vector_index, &rec, &chunks, &embeddings).unwrap();

        let text_hits = text_index.search("Samsung", 10, 2, &[]).unwrap();
        assert!(text_hits.iter().any(|h| h.chunk_id == "D1#0"));

        let vector_hits = vector_index.search(&[0.9, 0.1, 0.0], 10, None).unwrap();
        assert!(vector_hits.iter().any(|h| h.payload.get("chunk_id").and_then(|v| v.as_str()) == Some("D1#0")));

        assert!(documents.get_document("D1").unwrap().is_some());
        assert_eq!(metadata.counts().unwrap(), 1);
    }

    #[test]
    fn ingest_is_idempotent_across_repeated_calls() {
        let mut metadata = SqliteMetadataStore::open_in_memory().unwrap();
        let doc_dir = tempfile::tempdir().unwrap();
        let documents = FsDocumentStore::new(doc_dir.path());
        let text_index = TantivyTextIndex::new_ram().unwrap();
        let mut vector_index = HnswVectorIndex::new(3, 100);

        let rec = record("D2", "Acme");
        let chunks = chunks_for(&rec);
        let embeddings = embeddings_for(&chunks, 0.5);

        for _ in 0..2 {
            ingest_declaration_orchestrated(&mut metadata, &documents, &text_index, &mut vector_index, &rec, &chunks, &embeddings).unwrap();
        }
        assert_eq!(metadata.counts().unwrap(), 1);

        let text_hits = text_index.search("Acme", 10, 10, &[]).unwrap();
        assert_eq!(text_hits.iter().filter(|h| h.chunk_id == "D2#0").count(), 1);

        let vector_hits = vector_index.search(&[0.5, 0.5, 0.0], 10, None).unwrap();
        assert_eq!(
            vector_hits
                .iter()
                .filter(|h| h.payload.get("chunk_id").and_then(|v| v.as_str()) == Some("D2#0"))
                .count(),
            1
        );
    }

    #[test]
    fn delete_by_filter_removes_from_every_collaborator() {
        let mut metadata = SqliteMetadataStore::open_in_memory().unwrap();
        let doc_dir = tempfile::tempdir().unwrap();
        let documents = FsDocumentStore::new(doc_dir.path());
        let text_index = TantivyTextIndex::new_ram().unwrap();
        let mut vector_index = HnswVectorIndex::new(3, 100);

        let rec = record("D3", "Samsung");
        let chunks = chunks_for(&rec);
        let embeddings = embeddings_for(&chunks, 0.7);
        ingest_declaration_orchestrated(&mut metadata, &documents, &text_index, &mut vector_index, &rec, &chunks, &embeddings).unwrap();

        let report = delete_by_filter_orchestrated(&mut metadata, &documents, &text_index, &mut vector_index, "manufacturer", "Samsung", 10).unwrap();
        assert_eq!(report.total_ids, 1);
        assert_eq!(report.metadata_deleted, 1);
        assert!(documents.get_document("D3").unwrap().is_none());
    }
}
