use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Tries a fixed list of formats, in order, returning the first that parses:
/// `Y-M-D`, `Y-M-DTH:M:S[Z]`, `D.M.Y`, `D/M/Y`.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    let trimmed_z = raw.trim_end_matches('Z');
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed_z, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%d.%m.%Y") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%d/%m/%Y") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_date() {
        assert!(parse_date("2023-06-15").is_some());
    }

    #[test]
    fn parses_iso_datetime_with_trailing_z() {
        assert!(parse_date("2023-06-15T10:30:00Z").is_some());
    }

    #[test]
    fn parses_dotted_european_date() {
        assert!(parse_date("15.06.2023").is_some());
    }

    #[test]
    fn parses_slashed_date() {
        assert!(parse_date("15/06/2023").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_date("not a date").is_none());
    }
}
