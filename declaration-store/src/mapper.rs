use std::collections::BTreeMap;

use declaration_model::schema::BASELINE_REQUIRED_FIELDS;
use declaration_model::TenantSchema;
use serde_json::Value;

/// Result of mapping a raw keyed input through a tenant schema: canonical
/// fields found, everything else preserved, and which required-for-search
/// fields were missing.
pub struct MappedFields {
    pub fields: BTreeMap<String, Value>,
    pub extras: BTreeMap<String, Value>,
    pub validation_errors: Vec<String>,
}

/// Maps `input` (a flat or nested JSON object) onto canonical field names
/// using `schema.field_mapping`. For each canonical field, synonyms are
/// tried in order: exact key match, case-insensitive key match, then each
/// synonym as a dotted path through nested objects. The first hit wins.
/// Input keys not claimed by any synonym list are copied into `extras`
/// verbatim. Never fails: absent fields are simply absent.
pub fn map_fields(input: &Value, schema: &TenantSchema) -> MappedFields {
    let mut fields = BTreeMap::new();
    let mut claimed_keys: Vec<String> = Vec::new();

    if let Value::Object(map) = input {
        for (canonical, synonyms) in &schema.field_mapping {
            if let Some((value, top_level_key)) = resolve_synonym(map, synonyms) {
                fields.insert(canonical.clone(), value);
                if let Some(k) = top_level_key {
                    claimed_keys.push(k);
                }
            }
        }

        let mut extras = BTreeMap::new();
        for (key, value) in map {
            if !claimed_keys.iter().any(|k| k == key) {
                extras.insert(key.clone(), value.clone());
            }
        }

        let validation_errors = validate(&fields, schema);
        return MappedFields {
            fields,
            extras,
            validation_errors,
        };
    }

    MappedFields {
        fields,
        extras: BTreeMap::new(),
        validation_errors: validate(&BTreeMap::new(), schema),
    }
}

fn resolve_synonym(
    map: &serde_json::Map<String, Value>,
    synonyms: &[String],
) -> Option<(Value, Option<String>)> {
    for syn in synonyms {
        if let Some(v) = map.get(syn) {
            return Some((v.clone(), Some(syn.clone())));
        }
    }
    for syn in synonyms {
        if let Some((key, v)) = map.iter().find(|(k, _)| k.eq_ignore_ascii_case(syn)) {
            return Some((v.clone(), Some(key.clone())));
        }
    }
    for syn in synonyms {
        if syn.contains('.') {
            if let Some(v) = resolve_dotted_path(map, syn) {
                // Dotted paths reach into a nested key; the top-level key is
                // still "claimed" so it is not duplicated into extras.
                let top = syn.split('.').next().map(str::to_string);
                return Some((v, top));
            }
        }
    }
    None
}

fn resolve_dotted_path(map: &serde_json::Map<String, Value>, path: &str) -> Option<Value> {
    let mut current = Value::Object(map.clone());
    for segment in path.split('.') {
        match current {
            Value::Object(ref m) => {
                current = m.get(segment)?.clone();
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Baseline P0 fields intersected with the tenant's `required_for_search`
/// list, reporting any that are missing or empty. Priority: 0 for baseline
/// fields, 1 for tenant-required fields, 2 otherwise (informational only;
/// callers that need the priority of a specific field should use
/// [`TenantSchema::field_priority`]).
fn validate(fields: &BTreeMap<String, Value>, schema: &TenantSchema) -> Vec<String> {
    let mut required: Vec<&str> = BASELINE_REQUIRED_FIELDS.to_vec();
    for f in &schema.required_for_search {
        if !required.contains(&f.as_str()) {
            required.push(f.as_str());
        }
    }

    required
        .into_iter()
        .filter(|field| is_missing_or_empty(fields.get(*field)))
        .map(|field| format!("missing required field: {field}"))
        .collect()
}

fn is_missing_or_empty(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema_with_mapping() -> TenantSchema {
        let mut schema = TenantSchema::default_for("default");
        schema
            .field_mapping
            .insert("manufacturer".into(), vec!["producer".into(), "party.manufacturer".into()]);
        schema
            .field_mapping
            .insert("declaration_number".into(), vec!["number".into()]);
        schema
    }

    #[test]
    fn exact_match_wins_first() {
        let input = json!({"producer": "Samsung"});
        let mapped = map_fields(&input, &schema_with_mapping());
        assert_eq!(mapped.fields.get("manufacturer"), Some(&json!("Samsung")));
    }

    #[test]
    fn case_insensitive_match() {
        let input = json!({"Producer": "Samsung"});
        let mapped = map_fields(&input, &schema_with_mapping());
        assert_eq!(mapped.fields.get("manufacturer"), Some(&json!("Samsung")));
    }

    #[test]
    fn dotted_path_resolves_nested() {
        let input = json!({"party": {"manufacturer": "Samsung"}});
        let mapped = map_fields(&input, &schema_with_mapping());
        assert_eq!(mapped.fields.get("manufacturer"), Some(&json!("Samsung")));
    }

    #[test]
    fn unmapped_keys_land_in_extras() {
        let input = json!({"producer": "Samsung", "weird_field": 42});
        let mapped = map_fields(&input, &schema_with_mapping());
        assert_eq!(mapped.extras.get("weird_field"), Some(&json!(42)));
    }

    #[test]
    fn missing_required_fields_are_reported_but_nonfatal() {
        let input = json!({});
        let mapped = map_fields(&input, &schema_with_mapping());
        assert!(!mapped.validation_errors.is_empty());
    }
}
