use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use declaration_model::TenantSchema;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read tenant schema `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse tenant schema `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to write tenant schema `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("tenant `{0}` requires `{1}` to also appear in field_mapping or be a baseline field")]
    UnmappedRequiredField(String, String),
}

/// Holds one [`TenantSchema`] per tenant, with a mandatory `default`.
/// Schemas load eagerly from `config_dir` at construction; registering a
/// schema at runtime both updates the in-memory map and persists it back to
/// `config_dir` as `{tenant_id}.yaml`.
pub struct SchemaRegistry {
    config_dir: PathBuf,
    schemas: RwLock<BTreeMap<String, TenantSchema>>,
}

impl SchemaRegistry {
    /// Loads every `*.yaml` file under `config_dir`. Parse failures are
    /// fatal for that tenant's file (returned as an error), not silently
    /// skipped. Ensures a `default` tenant exists, synthesising an empty one
    /// if no `default.yaml` was present.
    pub fn load(config_dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let config_dir = config_dir.as_ref().to_path_buf();
        let mut schemas = BTreeMap::new();

        if config_dir.is_dir() {
            let entries = std::fs::read_dir(&config_dir).map_err(|source| RegistryError::Read {
                path: config_dir.clone(),
                source,
            })?;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                    continue;
                }
                let schema = load_schema_file(&path)?;
                validate_schema(&schema)?;
                info!(tenant = %schema.tenant_id, path = %path.display(), "loaded tenant schema");
                schemas.insert(schema.tenant_id.clone(), schema);
            }
        }

        schemas
            .entry("default".to_string())
            .or_insert_with(|| TenantSchema::default_for("default"));

        Ok(Self {
            config_dir,
            schemas: RwLock::new(schemas),
        })
    }

    /// Returns the tenant's schema, or the `default` schema if the tenant is
    /// unknown.
    pub fn get_schema(&self, tenant_id: &str) -> TenantSchema {
        let guard = self.schemas.read().unwrap();
        guard
            .get(tenant_id)
            .or_else(|| guard.get("default"))
            .cloned()
            .unwrap_or_else(|| TenantSchema::default_for("default"))
    }

    pub fn list_tenants(&self) -> Vec<String> {
        self.schemas.read().unwrap().keys().cloned().collect()
    }

    /// Registers (or overwrites) a tenant schema in memory and persists it
    /// to disk.
    pub fn register_schema(&self, schema: TenantSchema) -> Result<(), RegistryError> {
        validate_schema(&schema)?;
        self.save_schema(&schema)?;
        self.schemas
            .write()
            .unwrap()
            .insert(schema.tenant_id.clone(), schema);
        Ok(())
    }

    fn save_schema(&self, schema: &TenantSchema) -> Result<(), RegistryError> {
        let path = self.config_dir.join(format!("{}.yaml", schema.tenant_id));
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let yaml = serde_yaml::to_string(schema).map_err(|source| RegistryError::Parse {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, yaml).map_err(|source| RegistryError::Write { path, source })
    }

    /// Reloads every tenant file from disk, replacing the in-memory map
    /// atomically. Readers observe either the old or the new snapshot, never
    /// a partial one.
    pub fn reload(&self) -> Result<(), RegistryError> {
        let fresh = Self::load(&self.config_dir)?;
        let mut fresh_schemas = fresh.schemas.into_inner().unwrap();
        std::mem::swap(&mut *self.schemas.write().unwrap(), &mut fresh_schemas);
        Ok(())
    }
}

fn load_schema_file(path: &Path) -> Result<TenantSchema, RegistryError> {
    let raw = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| {
        error!(path = %path.display(), %source, "tenant schema parse failure");
        RegistryError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn validate_schema(schema: &TenantSchema) -> Result<(), RegistryError> {
    use declaration_model::schema::BASELINE_REQUIRED_FIELDS;
    for field in &schema.required_for_search {
        let is_baseline = BASELINE_REQUIRED_FIELDS.contains(&field.as_str());
        let is_mapped = schema.field_mapping.contains_key(field);
        if !is_baseline && !is_mapped {
            return Err(RegistryError::UnmappedRequiredField(
                schema.tenant_id.clone(),
                field.clone(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_dir_yields_default_only() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaRegistry::load(dir.path().join("does-not-exist")).unwrap();
        assert_eq!(registry.list_tenants(), vec!["default".to_string()]);
    }

    #[test]
    fn register_and_reload_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaRegistry::load(dir.path()).unwrap();
        let mut schema = TenantSchema::default_for("acme");
        schema
            .field_mapping
            .insert("manufacturer".into(), vec!["producer".into()]);
        schema.required_for_search.push("manufacturer".into());
        registry.register_schema(schema).unwrap();

        let reloaded = SchemaRegistry::load(dir.path()).unwrap();
        assert!(reloaded.list_tenants().contains(&"acme".to_string()));
        assert_eq!(reloaded.get_schema("acme").tenant_id, "acme");
    }

    #[test]
    fn unmapped_required_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaRegistry::load(dir.path()).unwrap();
        let mut schema = TenantSchema::default_for("broken");
        schema.required_for_search.push("nonexistent_field".into());
        assert!(registry.register_schema(schema).is_err());
    }

    #[test]
    fn unknown_tenant_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SchemaRegistry::load(dir.path()).unwrap();
        assert_eq!(registry.get_schema("ghost").tenant_id, "default");
    }
}
