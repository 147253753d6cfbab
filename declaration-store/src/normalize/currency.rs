use once_cell::sync::Lazy;
use std::collections::HashMap;

static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("RUR", "RUB"),
        ("$", "USD"),
        ("USD", "USD"),
        ("DOLLAR", "USD"),
        ("DOLLARS", "USD"),
        ("€", "EUR"),
        ("EURO", "EUR"),
        ("EUROS", "EUR"),
        ("₽", "RUB"),
        ("РУБ", "RUB"),
        ("РУБЛЬ", "RUB"),
        ("РУБЛЕЙ", "RUB"),
        ("ТЕНГЕ", "KZT"),
        ("₸", "KZT"),
    ])
});

/// Uppercases and maps known aliases (symbols, localised names, the legacy
/// `RUR` code) to their ISO-4217 tri-letter code; unknown input passes
/// through unchanged (uppercased).
pub fn normalize_currency(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let upper = trimmed.to_uppercase();
    Some(ALIASES.get(upper.as_str()).map(|s| s.to_string()).unwrap_or(upper))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_legacy_rur_to_rub() {
        assert_eq!(normalize_currency("rur").as_deref(), Some("RUB"));
    }

    #[test]
    fn maps_symbols() {
        assert_eq!(normalize_currency("$").as_deref(), Some("USD"));
        assert_eq!(normalize_currency("€").as_deref(), Some("EUR"));
    }

    #[test]
    fn passes_through_unknown() {
        assert_eq!(normalize_currency("xyz").as_deref(), Some("XYZ"));
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_currency("rur").unwrap();
        let twice = normalize_currency(&once).unwrap();
        assert_eq!(once, twice);
    }
}
