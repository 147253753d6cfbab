use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.%+-]+@[\w.-]+\.[A-Za-z]{2,}$").unwrap());

/// Keeps digits and a single leading `+`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut out = String::new();
    if trimmed.starts_with('+') {
        out.push('+');
    }
    out.extend(trimmed.chars().filter(|c| c.is_ascii_digit()));
    if out.is_empty() || out == "+" {
        None
    } else {
        Some(out)
    }
}

/// Lower-cases and validates against a simple RFC-5322-ish pattern; invalid
/// addresses normalise to `None` rather than being passed through.
pub fn normalize_email(raw: &str) -> Option<String> {
    let lower = raw.trim().to_lowercase();
    if EMAIL_RE.is_match(&lower) {
        Some(lower)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_keeps_digits_and_leading_plus() {
        assert_eq!(normalize_phone("+7 (495) 123-45-67").as_deref(), Some("+74951234567"));
        assert_eq!(normalize_phone("8 495 123 45 67").as_deref(), Some("84951234567"));
    }

    #[test]
    fn email_lowercases_and_validates() {
        assert_eq!(normalize_email("John.Doe@Example.COM").as_deref(), Some("john.doe@example.com"));
        assert_eq!(normalize_email("not-an-email"), None);
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_email("John@Example.com").unwrap();
        let twice = normalize_email(&once).unwrap();
        assert_eq!(once, twice);
        let once = normalize_phone("+7 495 123").unwrap();
        let twice = normalize_phone(&once).unwrap();
        assert_eq!(once, twice);
    }
}
