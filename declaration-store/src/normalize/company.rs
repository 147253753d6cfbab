use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Legal-entity prefixes stripped when they lead the name, matched
/// case-insensitively and word-bounded.
const LEGAL_PREFIXES: [&str; 7] = ["LLC", "OAO", "ZAO", "PAO", "IP", "LTD", "INC"];

/// Trims, collapses internal whitespace, title-cases, and strips a leading
/// legal-entity abbreviation such as "LLC" or "ZAO".
pub fn normalize_company_name(raw: &str) -> Option<String> {
    let collapsed = WHITESPACE.replace_all(raw.trim(), " ").to_string();
    if collapsed.is_empty() {
        return None;
    }

    let title_cased = title_case(&collapsed);
    let stripped = strip_leading_legal_prefix(&title_cased);
    if stripped.is_empty() {
        None
    } else {
        Some(stripped)
    }
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_leading_legal_prefix(s: &str) -> String {
    let mut parts = s.splitn(2, ' ');
    let Some(first) = parts.next() else { return s.to_string() };
    let rest = parts.next().unwrap_or("");
    if LEGAL_PREFIXES.iter().any(|p| p.eq_ignore_ascii_case(first)) {
        rest.trim().to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_and_title_cases() {
        assert_eq!(normalize_company_name("  samsung   electronics ").as_deref(), Some("Samsung Electronics"));
    }

    #[test]
    fn strips_leading_legal_prefix() {
        assert_eq!(normalize_company_name("ZAO Rosneft").as_deref(), Some("Rosneft"));
        assert_eq!(normalize_company_name("LLC Vostok Trading").as_deref(), Some("Vostok Trading"));
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_company_name("  llc   globex corp ").unwrap();
        let twice = normalize_company_name(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_input_yields_none() {
        assert_eq!(normalize_company_name("   "), None);
    }
}
