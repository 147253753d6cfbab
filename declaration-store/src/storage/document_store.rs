use std::path::PathBuf;

use chrono::Utc;
use declaration_model::CanonicalRecord;
use serde::Serialize;

use super::StoreError;

pub trait DocumentStore {
    fn save_document(&self, record: &CanonicalRecord) -> Result<(), StoreError>;
    fn get_document(&self, declaration_id: &str) -> Result<Option<CanonicalRecord>, StoreError>;
    fn delete_document(&self, declaration_id: &str) -> Result<bool, StoreError>;
    fn list_documents(&self) -> Result<Vec<String>, StoreError>;
}

#[derive(Serialize)]
struct DocumentBlob<'a> {
    record: &'a CanonicalRecord,
    saved_at: chrono::DateTime<Utc>,
}

/// Content-addressed JSON blob storage, sharded by the first two
/// characters of the declaration id (`"00"` if shorter) to bound
/// per-directory fan-out.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, declaration_id: &str) -> PathBuf {
        let shard = shard_for(declaration_id);
        self.root.join(shard).join(format!("{declaration_id}.json"))
    }
}

fn shard_for(declaration_id: &str) -> String {
    if declaration_id.len() >= 2 {
        declaration_id[..2].to_string()
    } else {
        "00".to_string()
    }
}

impl DocumentStore for FsDocumentStore {
    fn save_document(&self, record: &CanonicalRecord) -> Result<(), StoreError> {
        let path = self.blob_path(&record.declaration_id);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }
        let blob = DocumentBlob {
            record,
            saved_at: Utc::now(),
        };
        let raw = serde_json::to_vec_pretty(&blob).map_err(|e| StoreError::Serialize(e.to_string()))?;
        std::fs::write(&path, raw).map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn get_document(&self, declaration_id: &str) -> Result<Option<CanonicalRecord>, StoreError> {
        let path = self.blob_path(declaration_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read(&path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let value: serde_json::Value =
            serde_json::from_slice(&raw).map_err(|e| StoreError::Serialize(e.to_string()))?;
        let record = value
            .get("record")
            .cloned()
            .ok_or_else(|| StoreError::Serialize("document blob missing `record`".into()))?;
        serde_json::from_value(record)
            .map(Some)
            .map_err(|e| StoreError::Serialize(e.to_string()))
    }

    fn delete_document(&self, declaration_id: &str) -> Result<bool, StoreError> {
        let path = self.blob_path(declaration_id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(true)
    }

    fn list_documents(&self) -> Result<Vec<String>, StoreError> {
        let mut out = Vec::new();
        if !self.root.is_dir() {
            return Ok(out);
        }
        for shard_entry in std::fs::read_dir(&self.root).map_err(|e| StoreError::Unavailable(e.to_string()))? {
            let shard_entry = shard_entry.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            if !shard_entry.path().is_dir() {
                continue;
            }
            for file_entry in std::fs::read_dir(shard_entry.path()).map_err(|e| StoreError::Unavailable(e.to_string()))? {
                let file_entry = file_entry.map_err(|e| StoreError::Unavailable(e.to_string()))?;
                if let Some(stem) = file_entry.path().file_stem().and_then(|s| s.to_str()) {
                    out.push(stem.to_string());
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_uses_first_two_chars() {
        assert_eq!(shard_for("DT-2023-005678"), "DT");
        assert_eq!(shard_for("x"), "00");
    }

    #[test]
    fn save_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let record = CanonicalRecord::new(Some("DT-2023-005678".to_string()));
        store.save_document(&record).unwrap();
        let fetched = store.get_document("DT-2023-005678").unwrap().unwrap();
        assert_eq!(fetched.declaration_id, "DT-2023-005678");
    }

    #[test]
    fn delete_removes_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let record = CanonicalRecord::new(Some("DT-1".to_string()));
        store.save_document(&record).unwrap();
        assert!(store.delete_document("DT-1").unwrap());
        assert!(store.get_document("DT-1").unwrap().is_none());
    }
}
