use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Schema, NumericOptions, STORED, STRING, TEXT};
use tantivy::{doc, Index};

use super::StoreError;
use declaration_model::{FilterClause, FilterValue};

#[derive(Debug, Clone)]
pub struct TextMatch {
    pub chunk_id: String,
    pub score: f32,
}

pub trait TextIndex {
    fn upsert(&self, chunk_id: &str, declaration_id: &str, content: &str, date_issued: Option<&str>) -> Result<(), StoreError>;
    /// Equality on `declaration_id`/`chunk_id` and `date_issued` ranges are
    /// pushed down; everything else is caller-side post-filtering.
    fn search(&self, query: &str, top_k: usize, fetch_factor: usize, filters: &[FilterClause]) -> Result<Vec<TextMatch>, StoreError>;
    fn delete_by_ids(&self, chunk_ids: &[String]) -> Result<(), StoreError>;
    /// Removes every chunk belonging to a declaration, used ahead of a
    /// re-ingest so a changed chunk count can't leave a stale tail behind.
    fn delete_by_declaration_id(&self, declaration_id: &str) -> Result<(), StoreError>;
}

/// BM25-ranked full-text index over chunk content, backed by Tantivy
/// (Tantivy's default scorer is BM25, matching the Okapi parameters the
/// rest of the pipeline assumes).
pub struct TantivyTextIndex {
    index: Index,
    reader: tantivy::IndexReader,
    f_text: tantivy::schema::Field,
    f_chunk_id: tantivy::schema::Field,
    f_declaration_id: tantivy::schema::Field,
    f_date_issued: tantivy::schema::Field,
    f_date_issued_ts: tantivy::schema::Field,
}

impl TantivyTextIndex {
    pub fn new_ram() -> Result<Self, StoreError> {
        let mut builder = Schema::builder();
        let text = builder.add_text_field("text", TEXT);
        let chunk_id = builder.add_text_field("chunk_id", STRING | STORED);
        let declaration_id = builder.add_text_field("declaration_id", STRING);
        let date_issued = builder.add_text_field("date_issued", STRING);
        let num_opts = NumericOptions::default().set_fast().set_indexed();
        let date_issued_ts = builder.add_i64_field("date_issued_ts", num_opts);
        let schema = builder.build();

        let index = Index::create_in_ram(schema);
        let reader = index.reader().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            index,
            reader,
            f_text: text,
            f_chunk_id: chunk_id,
            f_declaration_id: declaration_id,
            f_date_issued: date_issued,
            f_date_issued_ts: date_issued_ts,
        })
    }
}

impl TextIndex for TantivyTextIndex {
    fn upsert(&self, chunk_id: &str, declaration_id: &str, content: &str, date_issued: Option<&str>) -> Result<(), StoreError> {
        let mut writer = self
            .index
            .writer(50_000_000)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut document = doc! {
            self.f_chunk_id => chunk_id,
            self.f_declaration_id => declaration_id,
            self.f_text => content,
        };
        if let Some(d) = date_issued {
            document.add_text(self.f_date_issued, d);
            if let Some(ts) = parse_rfc3339_to_ts(d) {
                document.add_i64(self.f_date_issued_ts, ts);
            }
        }
        writer.delete_term(tantivy::Term::from_field_text(self.f_chunk_id, chunk_id));
        writer.add_document(document).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        writer.commit().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.reader.reload().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn search(&self, query: &str, top_k: usize, fetch_factor: usize, filters: &[FilterClause]) -> Result<Vec<TextMatch>, StoreError> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        let mut q = query.trim().to_string();
        for fc in filters {
            match &fc.value {
                FilterValue::Eq(v) if fc.field == "declaration_id" => {
                    if let Some(s) = v.as_str() {
                        q.push_str(&format!(" declaration_id:\"{}\"", escape_quotes(s)));
                    }
                }
                FilterValue::Range(r) if fc.field == "date_issued" => {
                    let lower = r.gte.as_ref().and_then(|v| v.as_str()).and_then(parse_rfc3339_to_ts);
                    let upper = r.lte.as_ref().and_then(|v| v.as_str()).and_then(parse_rfc3339_to_ts);
                    let lo = lower.map(|v| v.to_string()).unwrap_or_else(|| i64::MIN.to_string());
                    let hi = upper.map(|v| v.to_string()).unwrap_or_else(|| i64::MAX.to_string());
                    q.push_str(&format!(" date_issued_ts:[{lo} TO {hi}]"));
                }
                _ => {}
            }
        }

        let parser = QueryParser::for_index(
            &self.index,
            vec![self.f_text, self.f_declaration_id, self.f_date_issued_ts],
        );
        let parsed = match parser.parse_query(&q) {
            Ok(parsed) => parsed,
            Err(_) => return Ok(Vec::new()),
        };
        let searcher = self.reader.searcher();
        let fetch_n = top_k.saturating_mul(fetch_factor.max(1)).max(top_k);
        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(fetch_n))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let mut out = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let document = searcher
                .doc::<tantivy::schema::document::TantivyDocument>(addr)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            if let Some(tantivy::schema::OwnedValue::Str(cid)) = document.get_first(self.f_chunk_id) {
                out.push(TextMatch {
                    chunk_id: cid.to_string(),
                    score,
                });
            }
        }
        Ok(out)
    }

    fn delete_by_ids(&self, chunk_ids: &[String]) -> Result<(), StoreError> {
        let mut writer = self
            .index
            .writer(50_000_000)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        for id in chunk_ids {
            let term = tantivy::Term::from_field_text(self.f_chunk_id, id);
            writer.delete_term(term);
        }
        writer.commit().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.reader.reload().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn delete_by_declaration_id(&self, declaration_id: &str) -> Result<(), StoreError> {
        let mut writer = self
            .index
            .writer(50_000_000)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        writer.delete_term(tantivy::Term::from_field_text(self.f_declaration_id, declaration_id));
        writer.commit().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.reader.reload().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('"', "\\\"")
}

fn parse_rfc3339_to_ts(s: &str) -> Option<i64> {
    if s.is_empty() {
        None
    } else {
        chrono::DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_search_finds_term() {
        let index = TantivyTextIndex::new_ram().unwrap();
        index.upsert("c1", "d1", "Samsung Electronics transformer", Some("2023-06-15T00:00:00Z")).unwrap();
        let hits = index.search("Samsung", 10, 10, &[]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "c1");
    }

    #[test]
    fn empty_query_returns_no_matches() {
        let index = TantivyTextIndex::new_ram().unwrap();
        index.upsert("c1", "d1", "Samsung Electronics", None).unwrap();
        assert!(index.search("", 10, 10, &[]).unwrap().is_empty());
    }

    #[test]
    fn delete_by_ids_removes_document() {
        let index = TantivyTextIndex::new_ram().unwrap();
        index.upsert("c1", "d1", "Samsung Electronics", None).unwrap();
        index.delete_by_ids(&["c1".to_string()]).unwrap();
        assert!(index.search("Samsung", 10, 10, &[]).unwrap().is_empty());
    }

    #[test]
    fn delete_by_declaration_id_removes_all_its_chunks() {
        let index = TantivyTextIndex::new_ram().unwrap();
        index.upsert("d1#0", "d1", "Samsung Electronics transformer", None).unwrap();
        index.upsert("d1#1", "d1", "Samsung Electronics relay", None).unwrap();
        index.delete_by_declaration_id("d1").unwrap();
        assert!(index.search("Samsung", 10, 10, &[]).unwrap().is_empty());
    }

    #[test]
    fn repeated_upsert_of_same_chunk_id_replaces_not_appends() {
        let index = TantivyTextIndex::new_ram().unwrap();
        index.upsert("c1", "d1", "Samsung Electronics transformer", None).unwrap();
        index.upsert("c1", "d1", "Samsung Electronics transformer", None).unwrap();
        let hits = index.search("Samsung", 10, 10, &[]).unwrap();
        assert_eq!(hits.len(), 1);
    }
}
