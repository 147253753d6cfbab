use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of customs movement a declaration represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationType {
    Import,
    Export,
    Transit,
}

impl Default for DeclarationType {
    fn default() -> Self {
        Self::Import
    }
}

/// Processing status of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Registered,
    Released,
    Rejected,
    Corrected,
}

impl Default for Status {
    fn default() -> Self {
        Self::Registered
    }
}

/// The canonical, tenant-independent representation of a single customs
/// declaration, produced by any of the three input adapters after mapping
/// and normalisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub declaration_id: String,
    pub declaration_number: Option<String>,
    pub date_issued: Option<DateTime<Utc>>,
    pub declaration_type: DeclarationType,
    pub status: Status,

    pub manufacturer: Option<String>,
    pub importer: Option<String>,
    pub exporter: Option<String>,

    pub product_code: Option<String>,
    pub product_description: Option<String>,
    pub country_origin: Option<String>,
    pub quantity: Option<f64>,
    pub unit_of_measure: Option<String>,

    pub customs_value: Option<f64>,
    pub currency: Option<String>,

    pub language: Option<String>,
    pub version: Option<String>,
    pub source: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,

    /// Concatenation of all leaf textual values; used for retrieval coverage
    /// when no `product_description` is present.
    pub full_text: String,

    /// Fields the schema mapper could not associate with a canonical field,
    /// retained verbatim rather than dropped.
    pub extras: BTreeMap<String, serde_json::Value>,

    /// Missing required-for-search fields, recorded but non-fatal.
    pub validation_errors: Vec<String>,
}

impl CanonicalRecord {
    /// Builds an empty record, generating a `declaration_id` when
    /// `declaration_number` is absent so every record is addressable.
    pub fn new(declaration_number: Option<String>) -> Self {
        let declaration_id = match &declaration_number {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => generate_declaration_id(),
        };
        Self {
            declaration_id,
            declaration_number,
            date_issued: None,
            declaration_type: DeclarationType::default(),
            status: Status::default(),
            manufacturer: None,
            importer: None,
            exporter: None,
            product_code: None,
            product_description: None,
            country_origin: None,
            quantity: None,
            unit_of_measure: None,
            customs_value: None,
            currency: None,
            language: None,
            version: None,
            source: None,
            processed_at: None,
            full_text: String::new(),
            extras: BTreeMap::new(),
            validation_errors: Vec::new(),
        }
    }

    /// Text used for retrieval coverage: the explicit product description
    /// when present, otherwise the record's full text.
    pub fn coverage_text(&self) -> &str {
        match &self.product_description {
            Some(d) if !d.trim().is_empty() => d.as_str(),
            _ => self.full_text.as_str(),
        }
    }
}

fn generate_declaration_id() -> String {
    format!("decl-{}", uuid::Uuid::new_v4())
}
