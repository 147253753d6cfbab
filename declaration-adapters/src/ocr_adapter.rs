use once_cell::sync::Lazy;
use regex::Regex;

use declaration_model::{CanonicalRecord, DeclarationType};
use declaration_store::normalize;

use crate::dates::parse_date;

struct FieldPattern {
    canonical: &'static str,
    patterns: &'static [&'static str],
}

static FIELD_PATTERNS: &[FieldPattern] = &[
    FieldPattern { canonical: "declaration_number", patterns: &[r"(?i)declaration\s*(?:no|number|#)\s*[:#]?\s*([A-Za-z0-9\-/]+)", r"(?i)номер\s*декларации\s*[:#]?\s*([A-Za-z0-9\-/]+)"] },
    FieldPattern { canonical: "date_issued", patterns: &[
        r"(\d{4}-\d{2}-\d{2}(?:T\d{2}:\d{2}:\d{2}Z?)?)",
        r"(\d{2}\.\d{2}\.\d{4})",
        r"(\d{2}/\d{2}/\d{4})",
    ] },
    FieldPattern { canonical: "manufacturer", patterns: &[r"(?i)manufacturer\s*[:#]?\s*([^\n]+)", r"(?i)изготовитель\s*[:#]?\s*([^\n]+)", r"(?i)производитель\s*[:#]?\s*([^\n]+)"] },
    FieldPattern { canonical: "importer", patterns: &[r"(?i)importer\s*[:#]?\s*([^\n]+)", r"(?i)импортер\s*[:#]?\s*([^\n]+)", r"(?i)получатель\s*[:#]?\s*([^\n]+)"] },
    FieldPattern { canonical: "country_origin", patterns: &[r"(?i)country\s*of\s*origin\s*[:#]?\s*([^\n]+)", r"(?i)страна\s*происхождения\s*[:#]?\s*([^\n]+)", r"(?i)происхождение\s*[:#]?\s*([^\n]+)"] },
    FieldPattern { canonical: "product_code", patterns: &[
        r"(?i)код\s+товара\s*[:#]?\s*(\d{10})",
        r"(?i)ТН\s*ВЭД\s*[:#]?\s*(\d{10})",
        r"(?i)product\s*code\s*[:#]?\s*(\d{10})",
        r"(?i)hs\s*code\s*[:#]?\s*(\d{6,10})",
    ] },
    FieldPattern { canonical: "product_description", patterns: &[r"(?i)description\s*[:#]?\s*([^\n]+)", r"(?i)описание\s+товара\s*[:#]?\s*([^\n]+)", r"(?i)наименование\s+товара\s*[:#]?\s*([^\n]+)"] },
    FieldPattern { canonical: "customs_value", patterns: &[r"(?i)customs\s*value\s*[:#]?\s*([\d.,\s]+)", r"(?i)таможенная\s+стоимость\s*[:#]?\s*([\d.,\s]+)"] },
    FieldPattern { canonical: "currency", patterns: &[r"(?i)currency\s*[:#]?\s*([A-Za-z$€]+)", r"(?i)валюта\s*[:#]?\s*([A-Za-z]+)"] },
];

static COMPILED: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    FIELD_PATTERNS
        .iter()
        .map(|fp| {
            let regexes = fp.patterns.iter().map(|p| Regex::new(p).unwrap()).collect();
            (fp.canonical, regexes)
        })
        .collect()
});

/// Applies a fixed catalogue of regex patterns per canonical field over raw
/// OCR text. Extracted values are post-cleaned (whitespace-normalised,
/// quote-stripped) before normalisation; the raw text is always retained as
/// `full_text`.
pub fn adapt_ocr(raw_text: &str) -> CanonicalRecord {
    let mut raw_fields = std::collections::BTreeMap::new();
    for (canonical, regexes) in COMPILED.iter() {
        for re in regexes {
            if let Some(caps) = re.captures(raw_text) {
                if let Some(m) = caps.get(1) {
                    raw_fields.insert(*canonical, clean_value(m.as_str()));
                    break;
                }
            }
        }
    }

    let declaration_number = raw_fields.get("declaration_number").cloned();
    let mut record = CanonicalRecord::new(declaration_number);
    record.date_issued = raw_fields.get("date_issued").and_then(|v| parse_date(v));
    record.declaration_type = DeclarationType::default();
    record.manufacturer = raw_fields.get("manufacturer").and_then(|v| normalize::normalize_company_name(v));
    record.importer = raw_fields.get("importer").and_then(|v| normalize::normalize_company_name(v));
    record.country_origin = raw_fields.get("country_origin").and_then(|v| normalize::normalize_country(v));
    record.product_code = raw_fields.get("product_code").and_then(|v| normalize::normalize_product_code(v));
    record.product_description = raw_fields.get("product_description").cloned();
    record.customs_value = raw_fields.get("customs_value").and_then(|v| normalize::normalize_number(v));
    record.currency = raw_fields.get("currency").and_then(|v| normalize::normalize_currency(v));
    record.language = Some(normalize::detect_language(raw_text).to_string());
    record.full_text = raw_text.to_string();
    record.source = Some("ocr".to_string());

    record
}

fn clean_value(raw: &str) -> String {
    raw.trim().trim_matches(|c| c == '"' || c == '\'').split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Declaration Number: DT-2023-005678\nManufacturer: samsung electronics\nCountry of Origin: russia\n";

    #[test]
    fn extracts_declaration_number() {
        let record = adapt_ocr(SAMPLE);
        assert_eq!(record.declaration_number.as_deref(), Some("DT-2023-005678"));
    }

    #[test]
    fn extracts_and_normalises_manufacturer() {
        let record = adapt_ocr(SAMPLE);
        assert_eq!(record.manufacturer.as_deref(), Some("Samsung Electronics"));
    }

    #[test]
    fn full_text_is_raw_text_verbatim() {
        let record = adapt_ocr(SAMPLE);
        assert_eq!(record.full_text, SAMPLE);
    }

    #[test]
    fn no_matches_yields_empty_fields_not_panic() {
        let record = adapt_ocr("nothing useful here");
        assert!(record.declaration_number.is_none());
    }

    #[test]
    fn extracts_product_code_from_localized_label() {
        let record = adapt_ocr("Декларация. Код товара: 8517120000\n");
        assert_eq!(record.product_code.as_deref(), Some("8517120000"));
    }

    #[test]
    fn extracts_importer_from_localized_label() {
        let record = adapt_ocr("Получатель: ООО Ромашка\n");
        assert!(record.importer.is_some());
    }

    #[test]
    fn extracts_currency_from_localized_label() {
        let record = adapt_ocr("Валюта: USD\n");
        assert_eq!(record.currency.as_deref(), Some("USD"));
    }
}
