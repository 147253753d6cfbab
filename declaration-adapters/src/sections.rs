use std::collections::BTreeMap;

use declaration_model::{CanonicalRecord, SectionTag};
use once_cell::sync::Lazy;

#[derive(Debug, Clone)]
pub struct Section {
    pub tag: SectionTag,
    pub content: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Case-insensitive keyword-per-tag table for the textual pass; lines are
/// attached to the most recently seen tag, and any text before the first
/// recognised heading becomes [`SectionTag::General`].
static KEYWORD_TABLE: Lazy<Vec<(SectionTag, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (SectionTag::Header, vec!["declaration number", "date issued", "номер декларации"]),
        (SectionTag::Declarant, vec!["declarant", "декларант"]),
        (SectionTag::Goods, vec!["goods", "description", "товар", "описание"]),
        (SectionTag::Manufacturer, vec!["manufacturer", "producer", "изготовитель"]),
        (SectionTag::Importer, vec!["importer", "импортер"]),
        (SectionTag::Exporter, vec!["exporter", "экспортер"]),
        (SectionTag::CustomsValue, vec!["customs value", "таможенная стоимость"]),
        (SectionTag::Payment, vec!["payment", "оплата"]),
        (SectionTag::Transport, vec!["transport", "транспорт"]),
        (SectionTag::Documents, vec!["documents", "документы"]),
    ]
});

/// Merges two views of a declaration into a section list: (a) structured
/// sections built from present `CanonicalRecord` fields, and (b) textual
/// sections found by line-wise keyword matching. Sections sharing a tag
/// across both views are merged (content joined with a newline, metadata
/// unioned).
pub fn sections(text: &str, record: &CanonicalRecord) -> Vec<Section> {
    let mut by_tag: BTreeMap<SectionTag, Section> = BTreeMap::new();

    for s in structured_sections(record) {
        by_tag.insert(s.tag, s);
    }

    for s in textual_sections(text) {
        by_tag
            .entry(s.tag)
            .and_modify(|existing| {
                existing.content.push('\n');
                existing.content.push_str(&s.content);
                for (k, v) in &s.metadata {
                    existing.metadata.entry(k.clone()).or_insert_with(|| v.clone());
                }
            })
            .or_insert(s);
    }

    by_tag.into_values().collect()
}

fn structured_sections(record: &CanonicalRecord) -> Vec<Section> {
    let mut out = Vec::new();

    if record.declaration_number.is_some() || record.date_issued.is_some() {
        let mut content = String::new();
        if let Some(n) = &record.declaration_number {
            content.push_str(n);
        }
        if let Some(d) = &record.date_issued {
            if !content.is_empty() {
                content.push(' ');
            }
            content.push_str(&d.to_rfc3339());
        }
        out.push(Section { tag: SectionTag::Header, content, metadata: BTreeMap::new() });
    }

    if let Some(m) = &record.manufacturer {
        out.push(Section { tag: SectionTag::Manufacturer, content: m.clone(), metadata: BTreeMap::new() });
    }
    if let Some(i) = &record.importer {
        out.push(Section { tag: SectionTag::Importer, content: i.clone(), metadata: BTreeMap::new() });
    }
    if let Some(e) = &record.exporter {
        out.push(Section { tag: SectionTag::Exporter, content: e.clone(), metadata: BTreeMap::new() });
    }

    let has_goods = record.product_code.is_some() || record.product_description.is_some() || record.country_origin.is_some();
    if has_goods {
        let mut parts = Vec::new();
        let mut metadata = BTreeMap::new();
        if let Some(code) = &record.product_code {
            parts.push(code.clone());
            metadata.insert("product_code".to_string(), serde_json::json!(code));
        }
        if let Some(desc) = &record.product_description {
            parts.push(desc.clone());
        }
        if let Some(origin) = &record.country_origin {
            parts.push(origin.clone());
            metadata.insert("country_origin".to_string(), serde_json::json!(origin));
        }
        if let Some(qty) = record.quantity {
            parts.push(qty.to_string());
        }
        out.push(Section { tag: SectionTag::Goods, content: parts.join(" "), metadata });
    }

    if record.customs_value.is_some() || record.currency.is_some() {
        let mut parts = Vec::new();
        if let Some(v) = record.customs_value {
            parts.push(v.to_string());
        }
        if let Some(c) = &record.currency {
            parts.push(c.clone());
        }
        out.push(Section { tag: SectionTag::CustomsValue, content: parts.join(" "), metadata: BTreeMap::new() });
    }

    out
}

fn textual_sections(text: &str) -> Vec<Section> {
    let mut out: Vec<Section> = Vec::new();
    let mut current_tag = SectionTag::General;
    let mut current_lines: Vec<&str> = Vec::new();

    let flush = |tag: SectionTag, lines: &mut Vec<&str>, out: &mut Vec<Section>| {
        if !lines.is_empty() {
            out.push(Section {
                tag,
                content: lines.join("\n"),
                metadata: BTreeMap::new(),
            });
            lines.clear();
        }
    };

    for line in text.lines() {
        let lower = line.to_lowercase();
        if let Some(matched_tag) = KEYWORD_TABLE
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
            .map(|(tag, _)| *tag)
        {
            flush(current_tag, &mut current_lines, &mut out);
            current_tag = matched_tag;
        }
        current_lines.push(line);
    }
    flush(current_tag, &mut current_lines, &mut out);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_goods_section_carries_product_code_metadata() {
        let mut record = CanonicalRecord::new(None);
        record.product_code = Some("8504403000".to_string());
        let sections = sections("", &record);
        let goods = sections.iter().find(|s| s.tag == SectionTag::Goods).unwrap();
        assert_eq!(goods.metadata.get("product_code"), Some(&serde_json::json!("8504403000")));
    }

    #[test]
    fn unattributed_lines_become_general() {
        let record = CanonicalRecord::new(None);
        let sections = sections("some free-standing note\nanother line", &record);
        assert!(sections.iter().any(|s| s.tag == SectionTag::General));
    }

    #[test]
    fn matching_tags_merge_content() {
        let mut record = CanonicalRecord::new(None);
        record.manufacturer = Some("Samsung".to_string());
        let sections = sections("Manufacturer: extra detail line", &record);
        let manufacturer = sections.iter().find(|s| s.tag == SectionTag::Manufacturer).unwrap();
        assert!(manufacturer.content.contains("Samsung"));
        assert!(manufacturer.content.contains("extra detail line"));
    }
}
