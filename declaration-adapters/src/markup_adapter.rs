use std::collections::BTreeMap;

use declaration_model::{CanonicalRecord, DeclarationType};
use declaration_store::normalize;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::dates::parse_date;
use crate::AdapterError;

#[derive(Debug, Clone)]
enum XmlNode {
    Element { tag: String, children: Vec<XmlNode> },
    Text(String),
}

/// Candidate root element names, in priority order. The first candidate with
/// any match in the document wins; other elements are ignored entirely
/// rather than merged (first matching root, resolving Open Question 1).
const ROOT_CANDIDATES: &[&str] = &[
    "declaration",
    "customs_declaration",
    "cargo_declaration",
    "gtd",
    "декларация",
    "грузовая_таможенная_декларация",
];

const FIELD_TAG_SYNONYMS: &[(&str, &[&str])] = &[
    ("declaration_number", &["declaration_number", "number", "dec_number", "номер_декларации", "номер"]),
    ("date_issued", &["date_issued", "date", "issue_date", "дата", "дата_выпуска"]),
    ("declaration_type", &["declaration_type", "type", "тип", "тип_декларации"]),
    ("manufacturer", &["manufacturer", "producer", "изготовитель", "производитель"]),
    ("importer", &["importer", "импортер"]),
    ("exporter", &["exporter", "экспортер"]),
    ("product_code", &["product_code", "tn_ved", "hs_code", "код_тнвэд", "код"]),
    ("product_description", &["description", "product_description", "описание", "наименование_товара"]),
    ("country_origin", &["country_origin", "origin_country", "страна_происхождения", "страна"]),
    ("quantity", &["quantity", "количество", "кол-во"]),
    ("unit_of_measure", &["unit", "unit_of_measure", "единица_измерения"]),
    ("customs_value", &["customs_value", "value", "таможенная_стоимость", "стоимость"]),
    ("currency", &["currency", "валюта"]),
];

/// Parses markup (XML) into a nested tree, locates the declaration root by
/// the fixed candidate list, extracts each canonical field by tag synonym,
/// and normalises the result into a [`CanonicalRecord`].
pub fn adapt_markup(xml: &str) -> Result<CanonicalRecord, AdapterError> {
    let root = parse_xml(xml)?;
    let full_text = collect_text_leaves(&root).join(" ");

    let declaration_root = find_declaration_root(&root, ROOT_CANDIDATES)
        .ok_or_else(|| AdapterError::MissingRoot)?;

    let mut raw_fields: BTreeMap<&str, String> = BTreeMap::new();
    for (canonical, synonyms) in FIELD_TAG_SYNONYMS {
        if let Some(value) = find_first_descendant_text(declaration_root, synonyms) {
            raw_fields.insert(canonical, value);
        }
    }

    let declaration_number = raw_fields.get("declaration_number").cloned();
    let mut record = CanonicalRecord::new(declaration_number.clone());
    record.date_issued = raw_fields.get("date_issued").and_then(|v| parse_date(v));
    record.declaration_type = raw_fields
        .get("declaration_type")
        .map(|v| parse_declaration_type(v))
        .unwrap_or_default();
    record.manufacturer = raw_fields.get("manufacturer").and_then(|v| normalize::normalize_company_name(v));
    record.importer = raw_fields.get("importer").and_then(|v| normalize::normalize_company_name(v));
    record.exporter = raw_fields.get("exporter").and_then(|v| normalize::normalize_company_name(v));
    record.product_code = raw_fields.get("product_code").and_then(|v| normalize::normalize_product_code(v));
    record.product_description = raw_fields.get("product_description").cloned();
    record.country_origin = raw_fields.get("country_origin").and_then(|v| normalize::normalize_country(v));
    record.quantity = raw_fields.get("quantity").and_then(|v| normalize::normalize_number(v));
    record.unit_of_measure = raw_fields.get("unit_of_measure").cloned();
    record.customs_value = raw_fields.get("customs_value").and_then(|v| normalize::normalize_number(v));
    record.currency = raw_fields.get("currency").and_then(|v| normalize::normalize_currency(v));
    record.language = Some(normalize::detect_language(&full_text).to_string());
    record.full_text = full_text;
    record.source = Some("markup".to_string());

    Ok(record)
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

fn parse_xml(xml: &str) -> Result<XmlNode, AdapterError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<(String, Vec<XmlNode>)> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push((tag, Vec::new()));
            }
            Ok(Event::Empty(e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let node = XmlNode::Element { tag, children: Vec::new() };
                push_child(&mut stack, &mut root, node);
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().trim().to_string();
                if !text.is_empty() {
                    push_child(&mut stack, &mut root, XmlNode::Text(text));
                }
            }
            Ok(Event::End(_)) => {
                if let Some((tag, children)) = stack.pop() {
                    let node = XmlNode::Element { tag, children };
                    push_child(&mut stack, &mut root, node);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AdapterError::Parse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    root.ok_or(AdapterError::Empty)
}

fn push_child(stack: &mut Vec<(String, Vec<XmlNode>)>, root: &mut Option<XmlNode>, node: XmlNode) {
    if let Some((_, children)) = stack.last_mut() {
        children.push(node);
    } else {
        *root = Some(node);
    }
}

fn find_declaration_root<'a>(root: &'a XmlNode, candidates: &[&str]) -> Option<&'a XmlNode> {
    for candidate in candidates {
        if let Some(found) = search_tag(root, candidate) {
            return Some(found);
        }
    }
    Some(root)
}

fn search_tag<'a>(node: &'a XmlNode, tag: &str) -> Option<&'a XmlNode> {
    if let XmlNode::Element { tag: t, children } = node {
        if t.eq_ignore_ascii_case(tag) {
            return Some(node);
        }
        for child in children {
            if let Some(found) = search_tag(child, tag) {
                return Some(found);
            }
        }
    }
    None
}

fn find_first_descendant_text(node: &XmlNode, synonyms: &[&str]) -> Option<String> {
    for syn in synonyms {
        if let Some(found) = search_tag(node, syn) {
            let text = collect_text_leaves(found).join(" ");
            if !text.trim().is_empty() {
                return Some(text.trim().to_string());
            }
        }
    }
    None
}

fn collect_text_leaves(node: &XmlNode) -> Vec<String> {
    let mut out = Vec::new();
    match node {
        XmlNode::Text(t) => out.push(t.clone()),
        XmlNode::Element { children, .. } => {
            for child in children {
                out.extend(collect_text_leaves(child));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <declaration>
            <declaration_number>DT-2023-005678</declaration_number>
            <date>2023-06-15</date>
            <manufacturer>samsung electronics</manufacturer>
            <description>Transformer units</description>
            <product_code>8504 40 30</product_code>
            <country_origin>RU</country_origin>
        </declaration>
    "#;

    #[test]
    fn extracts_declaration_number() {
        let record = adapt_markup(SAMPLE).unwrap();
        assert_eq!(record.declaration_number.as_deref(), Some("DT-2023-005678"));
    }

    #[test]
    fn extracts_and_normalises_manufacturer() {
        let record = adapt_markup(SAMPLE).unwrap();
        assert_eq!(record.manufacturer.as_deref(), Some("Samsung Electronics"));
    }

    #[test]
    fn full_text_includes_all_leaves() {
        let record = adapt_markup(SAMPLE).unwrap();
        assert!(record.full_text.contains("Transformer units"));
    }

    #[test]
    fn date_issued_parses_iso_date() {
        let record = adapt_markup(SAMPLE).unwrap();
        assert!(record.date_issued.is_some());
    }
}
