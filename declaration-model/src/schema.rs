use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Declared type of a canonical field, used for best-effort validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Number,
    Boolean,
    Date,
}

/// Per-tenant configuration: how raw input keys map onto canonical fields,
/// which fields are required for search, and declared field types.
///
/// Loaded eagerly from disk at startup (one YAML file per tenant) and
/// mutable at runtime through the registry, which persists overwrites back
/// to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSchema {
    pub tenant_id: String,
    #[serde(default)]
    pub tenant_name: Option<String>,
    /// canonical field -> list of input synonyms. A synonym containing '.'
    /// is resolved as a dotted path through nested input maps.
    #[serde(default)]
    pub field_mapping: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub required_for_search: Vec<String>,
    #[serde(default)]
    pub field_types: BTreeMap<String, FieldType>,
    /// Opaque configuration bags, passed through untouched.
    #[serde(default)]
    pub processing: serde_json::Value,
    #[serde(default)]
    pub search: serde_json::Value,
}

/// Canonical fields always required for search, independent of tenant
/// configuration (baseline P0).
pub const BASELINE_REQUIRED_FIELDS: [&str; 3] =
    ["declaration_number", "date_issued", "declaration_type"];

impl TenantSchema {
    pub fn default_for(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            tenant_name: None,
            field_mapping: BTreeMap::new(),
            required_for_search: Vec::new(),
            field_types: BTreeMap::new(),
            processing: serde_json::Value::Null,
            search: serde_json::Value::Null,
        }
    }

    /// Priority of a canonical field for this tenant: 0 (baseline), 1
    /// (tenant-required), or 2 (neither).
    pub fn field_priority(&self, field: &str) -> u8 {
        if BASELINE_REQUIRED_FIELDS.contains(&field) {
            0
        } else if self.required_for_search.iter().any(|f| f == field) {
            1
        } else {
            2
        }
    }
}
