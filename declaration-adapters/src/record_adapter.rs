use declaration_model::{CanonicalRecord, DeclarationType, TenantSchema};
use declaration_store::{map_fields, normalize};
use serde_json::Value;

use crate::dates::parse_date;

/// Accepts an already-keyed map (JSON object) and runs it through the
/// tenant's field mapper, then the normalisers, producing a
/// [`CanonicalRecord`]. Never fails: unmapped or malformed input simply
/// yields a record with more `extras`/`validation_errors`.
pub fn adapt_record(input: &Value, schema: &TenantSchema) -> CanonicalRecord {
    let mapped = map_fields(input, schema);
    let fields = &mapped.fields;

    let declaration_number = field_str(fields, "declaration_number");
    let mut record = CanonicalRecord::new(declaration_number);
    record.date_issued = field_str(fields, "date_issued").and_then(|v| parse_date(&v));
    record.declaration_type = field_str(fields, "declaration_type")
        .map(|v| parse_declaration_type(&v))
        .unwrap_or_default();
    record.manufacturer = field_str(fields, "manufacturer").and_then(|v| normalize::normalize_company_name(&v));
    record.importer = field_str(fields, "importer").and_then(|v| normalize::normalize_company_name(&v));
    record.exporter = field_str(fields, "exporter").and_then(|v| normalize::normalize_company_name(&v));
    record.product_code = field_str(fields, "product_code").and_then(|v| normalize::normalize_product_code(&v));
    record.product_description = field_str(fields, "product_description");
    record.country_origin = field_str(fields, "country_origin").and_then(|v| normalize::normalize_country(&v));
    record.quantity = field_str(fields, "quantity").and_then(|v| normalize::normalize_number(&v));
    record.unit_of_measure = field_str(fields, "unit_of_measure");
    record.customs_value = field_str(fields, "customs_value").and_then(|v| normalize::normalize_number(&v));
    record.currency = field_str(fields, "currency").and_then(|v| normalize::normalize_currency(&v));

    let full_text = build_full_text(fields, &mapped.extras);
    record.language = Some(normalize::detect_language(&full_text).to_string());
    record.full_text = full_text;
    record.extras = mapped.extras;
    record.validation_errors = mapped.validation_errors;
    record.source = Some("record".to_string());

    record
}

fn field_str(fields: &std::collections::BTreeMap<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(value_to_string)
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_declaration_type(raw: &str) -> DeclarationType {
    let lower = raw.to_lowercase();
    if lower.contains("export") || lower.contains("экспорт") {
        DeclarationType::Export
    } else if lower.contains("transit") || lower.contains("транзит") {
        DeclarationType::Transit
    } else {
        DeclarationType::Import
    }
}

fn build_full_text(
    fields: &std::collections::BTreeMap<String, Value>,
    extras: &std::collections::BTreeMap<String, Value>,
) -> String {
    let mut parts = Vec::new();
    for v in fields.values() {
        if let Some(s) = value_to_string(v) {
            parts.push(s);
        }
    }
    for v in extras.values() {
        if let Some(s) = value_to_string(v) {
            parts.push(s);
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_and_normalises_via_schema() {
        let mut schema = TenantSchema::default_for("default");
        schema
            .field_mapping
            .insert("manufacturer".into(), vec!["producer".into()]);
        let input = json!({"producer": "samsung electronics", "number": "DT-1"});
        let record = adapt_record(&input, &schema);
        assert_eq!(record.manufacturer.as_deref(), Some("Samsung Electronics"));
    }

    #[test]
    fn unmapped_keys_reach_extras_and_full_text() {
        let schema = TenantSchema::default_for("default");
        let input = json!({"weird_field": "some value"});
        let record = adapt_record(&input, &schema);
        assert!(record.full_text.contains("some value"));
        assert!(record.extras.contains_key("weird_field"));
    }
}
