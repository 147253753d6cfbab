use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A snapshot of applicable customs rules effective from a given date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleVersion {
    pub version: String,
    pub effective_from: DateTime<Utc>,
    pub description: String,
}

/// Resolves the rule version applicable to `date`: the highest
/// `effective_from` not after `date`, falling back to the earliest version
/// if `date` pre-dates all of them. `versions` need not be pre-sorted.
pub fn resolve_rule_version<'a>(
    versions: &'a [RuleVersion],
    date: DateTime<Utc>,
) -> Option<&'a RuleVersion> {
    if versions.is_empty() {
        return None;
    }
    let mut sorted: Vec<&RuleVersion> = versions.iter().collect();
    sorted.sort_by(|a, b| b.effective_from.cmp(&a.effective_from));
    sorted
        .iter()
        .find(|v| v.effective_from <= date)
        .copied()
        .or_else(|| sorted.last().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn v(version: &str, y: i32, m: u32, d: u32) -> RuleVersion {
        RuleVersion {
            version: version.into(),
            effective_from: Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(),
            description: String::new(),
        }
    }

    #[test]
    fn picks_highest_effective_from_not_after_date() {
        let versions = vec![v("2022", 2022, 1, 1), v("2023", 2023, 1, 1)];
        let date = Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap();
        assert_eq!(resolve_rule_version(&versions, date).unwrap().version, "2023");
    }

    #[test]
    fn falls_back_to_earliest_when_date_predates_all() {
        let versions = vec![v("2022", 2022, 1, 1), v("2023", 2023, 1, 1)];
        let date = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(resolve_rule_version(&versions, date).unwrap().version, "2022");
    }
}
