use std::path::Path;

use chrono::{DateTime, Utc};
use declaration_model::{CanonicalRecord, DeclarationType, Status};
use rusqlite::{params, Connection, OptionalExtension};

use super::StoreError;

pub trait MetadataStore {
    fn upsert(&mut self, record: &CanonicalRecord) -> Result<(), StoreError>;
    fn get(&self, declaration_id: &str) -> Result<Option<CanonicalRecord>, StoreError>;
    /// Lists declaration ids matching the given indexed-column equality
    /// filters, for batch deletion. Does not attempt range/membership
    /// pushdown — that stays in the hybrid retriever's metadata filter.
    fn list_ids_by_filter(&self, field: &str, value: &str, limit: usize) -> Result<Vec<String>, StoreError>;
    fn delete_by_ids(&mut self, ids: &[String]) -> Result<usize, StoreError>;
    fn counts(&self) -> Result<i64, StoreError>;
}

/// `rusqlite`-backed metadata table. Indexed columns mirror the record's
/// own fields (declaration_number, date_issued, manufacturer, importer,
/// exporter, product_code, country_origin) per §4.6 / §6; everything else
/// about the record lives in a serialized JSON column so the schema does
/// not have to grow with `extras`.
pub struct SqliteMetadataStore {
    conn: Connection,
}

impl SqliteMetadataStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        if let Some(dir) = path.as_ref().parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        let conn = Connection::open(path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS declarations (
                declaration_id TEXT PRIMARY KEY,
                declaration_number TEXT,
                date_issued TEXT,
                manufacturer TEXT,
                importer TEXT,
                exporter TEXT,
                product_code TEXT,
                country_origin TEXT,
                record_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_decl_number ON declarations(declaration_number);
            CREATE INDEX IF NOT EXISTS idx_decl_date ON declarations(date_issued);
            CREATE INDEX IF NOT EXISTS idx_decl_manufacturer ON declarations(manufacturer);
            CREATE INDEX IF NOT EXISTS idx_decl_importer ON declarations(importer);
            CREATE INDEX IF NOT EXISTS idx_decl_exporter ON declarations(exporter);
            CREATE INDEX IF NOT EXISTS idx_decl_product_code ON declarations(product_code);
            CREATE INDEX IF NOT EXISTS idx_decl_country ON declarations(country_origin);",
        )
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn upsert(&mut self, record: &CanonicalRecord) -> Result<(), StoreError> {
        let record_json =
            serde_json::to_string(record).map_err(|e| StoreError::Serialize(e.to_string()))?;
        self.conn
            .execute(
                "INSERT INTO declarations
                    (declaration_id, declaration_number, date_issued, manufacturer, importer,
                     exporter, product_code, country_origin, record_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(declaration_id) DO UPDATE SET
                    declaration_number = excluded.declaration_number,
                    date_issued = excluded.date_issued,
                    manufacturer = excluded.manufacturer,
                    importer = excluded.importer,
                    exporter = excluded.exporter,
                    product_code = excluded.product_code,
                    country_origin = excluded.country_origin,
                    record_json = excluded.record_json",
                params![
                    record.declaration_id,
                    record.declaration_number,
                    record.date_issued.map(|d| d.to_rfc3339()),
                    record.manufacturer,
                    record.importer,
                    record.exporter,
                    record.product_code,
                    record.country_origin,
                    record_json,
                ],
            )
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn get(&self, declaration_id: &str) -> Result<Option<CanonicalRecord>, StoreError> {
        let record_json: Option<String> = self
            .conn
            .query_row(
                "SELECT record_json FROM declarations WHERE declaration_id = ?1",
                params![declaration_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        record_json
            .map(|raw| serde_json::from_str(&raw).map_err(|e| StoreError::Serialize(e.to_string())))
            .transpose()
    }

    fn list_ids_by_filter(&self, field: &str, value: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        if !is_indexed_column(field) {
            return Err(StoreError::Unavailable(format!("`{field}` is not an indexed column")));
        }
        let sql = format!(
            "SELECT declaration_id FROM declarations WHERE {field} = ?1 LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let rows = stmt
            .query_map(params![value, limit as i64], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn delete_by_ids(&mut self, ids: &[String]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut deleted = 0;
        for id in ids {
            deleted += tx
                .execute("DELETE FROM declarations WHERE declaration_id = ?1", params![id])
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }
        tx.commit().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(deleted)
    }

    fn counts(&self) -> Result<i64, StoreError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM declarations", [], |row| row.get(0))
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

fn is_indexed_column(field: &str) -> bool {
    matches!(
        field,
        "declaration_number" | "date_issued" | "manufacturer" | "importer" | "exporter" | "product_code" | "country_origin"
    )
}

/// Parses the stored `date_issued` back into a `DateTime<Utc>`; used by
/// callers that want the column directly rather than via the JSON blob.
pub fn parse_date_issued(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> CanonicalRecord {
        let mut r = CanonicalRecord::new(Some(id.to_string()));
        r.manufacturer = Some("Samsung".to_string());
        r.declaration_type = DeclarationType::Import;
        r.status = Status::Registered;
        r
    }

    #[test]
    fn upsert_is_idempotent() {
        let mut store = SqliteMetadataStore::open_in_memory().unwrap();
        let record = sample("D1");
        store.upsert(&record).unwrap();
        store.upsert(&record).unwrap();
        assert_eq!(store.counts().unwrap(), 1);
    }

    #[test]
    fn get_round_trips_manufacturer() {
        let mut store = SqliteMetadataStore::open_in_memory().unwrap();
        store.upsert(&sample("D2")).unwrap();
        let fetched = store.get("D2").unwrap().unwrap();
        assert_eq!(fetched.manufacturer.as_deref(), Some("Samsung"));
    }

    #[test]
    fn delete_by_ids_removes_rows() {
        let mut store = SqliteMetadataStore::open_in_memory().unwrap();
        store.upsert(&sample("D3")).unwrap();
        let deleted = store.delete_by_ids(&["D3".to_string()]).unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get("D3").unwrap().is_none());
    }
}
