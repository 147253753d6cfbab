/// Normalises a TN-VED (or HS) product code to exactly 10 ASCII digits.
///
/// Extracts digits only, then: `>10` digits truncates to the first 10 (a
/// caller-visible warning, not a hard error); `4..=9` digits right-pads with
/// `'0'` to 10; `<4` digits is rejected as ambiguous (`None`); exactly `10`
/// is accepted unchanged.
pub fn normalize_product_code(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        0..=3 => None,
        4..=9 => {
            let mut padded = digits;
            while padded.len() < 10 {
                padded.push('0');
            }
            Some(padded)
        }
        10 => Some(digits),
        _ => Some(digits[..10].to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_ten_digits_passes_through() {
        assert_eq!(normalize_product_code("8517120000").as_deref(), Some("8517120000"));
    }

    #[test]
    fn pads_short_codes() {
        assert_eq!(normalize_product_code("85171200").as_deref(), Some("8517120000"));
    }

    #[test]
    fn strips_non_digits_before_padding() {
        assert_eq!(normalize_product_code("  8517-1200-00-XX ").as_deref(), Some("8517120000"));
    }

    #[test]
    fn truncates_overlong_codes() {
        assert_eq!(normalize_product_code("85171200001234").as_deref(), Some("8517120000"));
    }

    #[test]
    fn rejects_too_short() {
        assert_eq!(normalize_product_code("851"), None);
    }

    #[test]
    fn always_ten_ascii_digits_when_some() {
        for raw in ["85171200", "8517120000", "8517-1200-00-XX", "85171200001234"] {
            let out = normalize_product_code(raw).unwrap();
            assert_eq!(out.len(), 10);
            assert!(out.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_product_code("85171200").unwrap();
        let twice = normalize_product_code(&once).unwrap();
        assert_eq!(once, twice);
    }
}
