use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};

use super::StoreError;
use declaration_model::FilterClause;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: i64,
    pub vector: Vec<f32>,
    pub payload: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: i64,
    pub score: f32,
    pub payload: BTreeMap<String, serde_json::Value>,
}

pub trait VectorIndex {
    fn upsert(&mut self, points: &[VectorPoint]) -> Result<(), StoreError>;
    /// Equality-only pushdown; richer predicates in `filter` are ignored
    /// here and must be re-applied by the caller (§4.6 — only equality is
    /// pushed down to this backend).
    fn search(&self, vector: &[f32], top_k: usize, filter: Option<&FilterClause>) -> Result<Vec<VectorMatch>, StoreError>;
    fn delete_where(&mut self, field: &str, value: &serde_json::Value) -> Result<usize, StoreError>;
    fn delete_by_ids(&mut self, ids: &[i64]) -> Result<usize, StoreError>;
    fn info(&self) -> VectorIndexInfo;
}

#[derive(Debug, Clone)]
pub struct VectorIndexInfo {
    pub dimension: usize,
    pub points_count: usize,
    pub distance: &'static str,
}

/// Cosine-distance HNSW index (via `hnsw_rs`) with an in-memory payload
/// table. Persistence is a flat sidecar of (id, vector, payload) rather
/// than the graph itself: on load the graph is rebuilt by re-inserting
/// every point, which is simple and correct at the scale this pipeline
/// targets.
pub struct HnswVectorIndex {
    dimension: usize,
    hnsw: Hnsw<f32, DistCosine>,
    payloads: BTreeMap<i64, (Vec<f32>, BTreeMap<String, serde_json::Value>)>,
}

const MAX_NB_CONNECTION: usize = 16;
const MAX_LAYER: usize = 16;
const EF_CONSTRUCTION: usize = 200;
const EF_SEARCH: usize = 64;

impl HnswVectorIndex {
    pub fn new(dimension: usize, max_elements: usize) -> Self {
        let hnsw = Hnsw::<f32, DistCosine>::new(
            MAX_NB_CONNECTION,
            max_elements,
            MAX_LAYER,
            EF_CONSTRUCTION,
            DistCosine {},
        );
        Self {
            dimension,
            hnsw,
            payloads: BTreeMap::new(),
        }
    }

    pub fn load(dir: impl AsRef<Path>, dimension: usize) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        let sidecar = sidecar_path(dir);
        let mut index = Self::new(dimension, default_capacity());
        if sidecar.exists() {
            let raw = std::fs::read_to_string(&sidecar)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let points: Vec<VectorPoint> =
                serde_json::from_str(&raw).map_err(|e| StoreError::Serialize(e.to_string()))?;
            index.upsert(&points)?;
        }
        Ok(index)
    }

    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), StoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let points: Vec<VectorPoint> = self
            .payloads
            .iter()
            .map(|(id, (vector, payload))| VectorPoint {
                id: *id,
                vector: vector.clone(),
                payload: payload.clone(),
            })
            .collect();
        let raw = serde_json::to_string(&points).map_err(|e| StoreError::Serialize(e.to_string()))?;
        std::fs::write(sidecar_path(dir), raw).map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

fn sidecar_path(dir: &Path) -> PathBuf {
    dir.join("points.json")
}

fn default_capacity() -> usize {
    10_000
}

impl VectorIndex for HnswVectorIndex {
    fn upsert(&mut self, points: &[VectorPoint]) -> Result<(), StoreError> {
        for point in points {
            if point.vector.len() != self.dimension {
                return Err(StoreError::Serialize(format!(
                    "vector dimension {} does not match index dimension {}",
                    point.vector.len(),
                    self.dimension
                )));
            }
            self.hnsw.insert((point.vector.as_slice(), point.id as usize));
            self.payloads
                .insert(point.id, (point.vector.clone(), point.payload.clone()));
        }
        Ok(())
    }

    fn search(&self, vector: &[f32], top_k: usize, filter: Option<&FilterClause>) -> Result<Vec<VectorMatch>, StoreError> {
        if vector.len() != self.dimension {
            return Err(StoreError::Serialize(format!(
                "query vector dimension {} does not match index dimension {}",
                vector.len(),
                self.dimension
            )));
        }
        // Over-fetch so post-hoc equality filtering still has enough
        // candidates; callers ask for top_k already doubled per §4.5.
        let fetch = top_k.max(1);
        let neighbours = self.hnsw.search(vector, fetch, EF_SEARCH);

        // hnsw_rs has no point-removal API (see `delete_by_ids`), so a point
        // id that was re-upserted still has its earlier graph node(s)
        // reachable; dedupe by id here and keep the best-scoring hit so a
        // repeated upsert never surfaces more than one match per id.
        let mut best: BTreeMap<i64, VectorMatch> = BTreeMap::new();
        for n in neighbours {
            let id = n.d_id as i64;
            let Some((_, payload)) = self.payloads.get(&id) else { continue };
            if let Some(fc) = filter {
                if !matches_equality(payload, fc) {
                    continue;
                }
            }
            // hnsw_rs reports a distance; cosine similarity is 1 - distance.
            let score = 1.0 - n.distance;
            best.entry(id)
                .and_modify(|existing| {
                    if score > existing.score {
                        existing.score = score;
                    }
                })
                .or_insert(VectorMatch {
                    id,
                    score,
                    payload: payload.clone(),
                });
        }
        let mut out: Vec<VectorMatch> = best.into_values().collect();
        out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        out.truncate(top_k);
        Ok(out)
    }

    fn delete_where(&mut self, field: &str, value: &serde_json::Value) -> Result<usize, StoreError> {
        let ids: Vec<i64> = self
            .payloads
            .iter()
            .filter(|(_, (_, payload))| payload.get(field) == Some(value))
            .map(|(id, _)| *id)
            .collect();
        self.delete_by_ids(&ids)
    }

    fn delete_by_ids(&mut self, ids: &[i64]) -> Result<usize, StoreError> {
        let mut removed = 0;
        for id in ids {
            if self.payloads.remove(id).is_some() {
                removed += 1;
            }
        }
        // hnsw_rs has no point-removal API; tombstoning via the payload map
        // is sufficient since `search` already filters through `payloads`.
        Ok(removed)
    }

    fn info(&self) -> VectorIndexInfo {
        VectorIndexInfo {
            dimension: self.dimension,
            points_count: self.payloads.len(),
            distance: "cosine",
        }
    }
}

fn matches_equality(payload: &BTreeMap<String, serde_json::Value>, fc: &FilterClause) -> bool {
    use declaration_model::FilterValue;
    match &fc.value {
        FilterValue::Eq(v) => payload.get(&fc.field) == Some(v),
        // Membership and range predicates are not pushed down to this
        // backend; treat as non-match here so callers fall back to
        // re-applying them post-hoc over the full candidate set.
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(id: i64, vector: Vec<f32>) -> VectorPoint {
        let mut payload = BTreeMap::new();
        payload.insert("declaration_id".to_string(), json!(format!("d{id}")));
        VectorPoint { id, vector, payload }
    }

    #[test]
    fn upsert_then_search_returns_nearest() {
        let mut index = HnswVectorIndex::new(3, 100);
        index
            .upsert(&[point(1, vec![1.0, 0.0, 0.0]), point(2, vec![0.0, 1.0, 0.0])])
            .unwrap();
        let hits = index.search(&[1.0, 0.0, 0.0], 1, None).unwrap();
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn delete_by_ids_removes_from_results() {
        let mut index = HnswVectorIndex::new(3, 100);
        index.upsert(&[point(1, vec![1.0, 0.0, 0.0])]).unwrap();
        index.delete_by_ids(&[1]).unwrap();
        let hits = index.search(&[1.0, 0.0, 0.0], 5, None).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn repeated_upsert_of_same_id_yields_one_hit_not_duplicates() {
        let mut index = HnswVectorIndex::new(3, 100);
        index.upsert(&[point(1, vec![1.0, 0.0, 0.0])]).unwrap();
        index.upsert(&[point(1, vec![1.0, 0.0, 0.0])]).unwrap();
        let hits = index.search(&[1.0, 0.0, 0.0], 5, None).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn stable_point_id_is_deterministic() {
        assert_eq!(super::super::stable_point_id("chunk-1"), super::super::stable_point_id("chunk-1"));
    }
}
