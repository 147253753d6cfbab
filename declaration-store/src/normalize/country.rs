use once_cell::sync::Lazy;
use std::collections::HashMap;

static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("RUS", "RU"),
        ("RUSSIA", "RU"),
        ("RUSSIAN FEDERATION", "RU"),
        ("РОССИЯ", "RU"),
        ("CHN", "CN"),
        ("CHINA", "CN"),
        ("КИТАЙ", "CN"),
        ("KAZ", "KZ"),
        ("KAZAKHSTAN", "KZ"),
        ("КАЗАХСТАН", "KZ"),
        ("BLR", "BY"),
        ("BELARUS", "BY"),
        ("БЕЛАРУСЬ", "BY"),
        ("ARM", "AM"),
        ("ARMENIA", "AM"),
        ("АРМЕНИЯ", "AM"),
        ("KGZ", "KG"),
        ("KYRGYZSTAN", "KG"),
        ("КЫРГЫЗСТАН", "KG"),
        ("DEU", "DE"),
        ("GERMANY", "DE"),
        ("ГЕРМАНИЯ", "DE"),
        ("USA", "US"),
        ("UNITED STATES", "US"),
        ("США", "US"),
    ])
});

/// Uppercases and maps ISO-3166-α3 codes or localised country names to the
/// ISO-3166-α2 code; unknown input passes through unchanged (uppercased).
pub fn normalize_country(raw: &str) -> Option<String> {
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
    fn maps_iso3_to_iso2() {
        assert_eq!(normalize_country("chn").as_deref(), Some("CN"));
    }

    #[test]
    fn maps_localised_name() {
        assert_eq!(normalize_country("Китай").as_deref(), Some("CN"));
    }

    #[test]
    fn passes_through_already_iso2() {
        assert_eq!(normalize_country("cn").as_deref(), Some("CN"));
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_country("china").unwrap();
        let twice = normalize_country(&once).unwrap();
        assert_eq!(once, twice);
    }
}
