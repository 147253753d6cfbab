/// Replaces comma decimal separators with dots, strips whitespace (used as
/// thousands separators), and parses the result as a decimal. Returns
/// `None` rather than erroring on anything unparsable.
pub fn normalize_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_decimal_separator() {
        assert_eq!(normalize_number("1234,56"), Some(1234.56));
    }

    #[test]
    fn whitespace_thousands_separator() {
        assert_eq!(normalize_number("1 234 567"), Some(1234567.0));
    }

    #[test]
    fn unparsable_is_none() {
        assert_eq!(normalize_number("not a number"), None);
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_number("1234,56").unwrap();
        let twice = normalize_number(&once.to_string()).unwrap();
        assert_eq!(once, twice);
    }
}
