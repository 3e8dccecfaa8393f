//! Inline time-range directives in Splunk queries
//!
//! A search can carry its own bounds (`earliest=-2m latest=now`). Saved
//! searches expect these as dispatch parameters instead, so they are pulled
//! out of the query text and override the configured defaults.

/// Effective bounds and the query left after removing the directives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTimeRange {
    pub earliest: String,
    pub latest: String,
    pub query: String,
}

/// Extract `earliest=` then `latest=` from a query.
///
/// Only the first occurrence of each directive is honored. A later
/// directive of the same kind with a different value stays in the query.
pub fn extract_time_range(
    default_earliest: &str,
    default_latest: &str,
    query: &str,
) -> QueryTimeRange {
    let (earliest, query) = extract_directive("earliest", query, default_earliest);
    let (latest, query) = extract_directive("latest", &query, default_latest);

    QueryTimeRange {
        earliest,
        latest,
        query,
    }
}

fn extract_directive(kind: &str, query: &str, default: &str) -> (String, String) {
    let marker = format!("{}=", kind);
    let Some(start) = query.find(&marker) else {
        return (default.to_string(), query.to_string());
    };

    let mut words = query[start..].split_whitespace();
    // The slice starts with the marker, so there is always a first word
    let first = words.next().unwrap_or(marker.as_str());
    let raw = &first[marker.len()..];

    let Some(quoted) = raw.strip_prefix('"') else {
        let cleaned = query.replace(first, "");
        return (trim_closing_quote(raw).to_string(), cleaned);
    };

    // Quoted values may span several words, up to the one closing the quote
    let mut value = quoted.to_string();
    if !first.ends_with('"') {
        for word in words {
            value.push(' ');
            value.push_str(word);
            if word.ends_with('"') {
                break;
            }
        }
    }

    let mut cleaned = query.to_string();
    if !value.is_empty() {
        cleaned = cleaned.replace(&value, "");
    }
    cleaned = cleaned.replace(&format!("{}\"", marker), "");

    (trim_closing_quote(&value).to_string(), cleaned)
}

fn trim_closing_quote(value: &str) -> &str {
    value.strip_suffix('"').unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "source=/opt/splunk/var/log/secure.log sourcetype=osx_secure";

    #[test]
    fn test_both_directives_override_defaults() {
        let query = format!("{} earliest=-2m latest=+2m |stats count", BASE);
        let range = extract_time_range("-1m", "+1m", &query);

        assert_eq!(range.earliest, "-2m");
        assert_eq!(range.latest, "+2m");
        assert_eq!(range.query, format!("{}   |stats count", BASE));
    }

    #[test]
    fn test_only_latest() {
        let query = format!("{} latest=+2m |stats count", BASE);
        let range = extract_time_range("-1m", "+1m", &query);

        assert_eq!(range.earliest, "-1m");
        assert_eq!(range.latest, "+2m");
        assert!(!range.query.contains("latest"));
    }

    #[test]
    fn test_only_earliest() {
        let query = format!("{} earliest=-2m |stats count", BASE);
        let range = extract_time_range("-1m", "+1m", &query);

        assert_eq!(range.earliest, "-2m");
        assert_eq!(range.latest, "+1m");
        assert!(!range.query.contains("earliest"));
    }

    #[test]
    fn test_no_directives_passthrough() {
        let query = format!("{} |stats count", BASE);
        let range = extract_time_range("-1m", "+1m", &query);

        assert_eq!(range.earliest, "-1m");
        assert_eq!(range.latest, "+1m");
        assert_eq!(range.query, query);
    }

    #[test]
    fn test_second_directive_is_left_in_query() {
        let query = format!("{} earliest=-2m earliest=-1m |stats count", BASE);
        let range = extract_time_range("-5m", "now", &query);

        assert_eq!(range.earliest, "-2m");
        assert!(range.query.contains("earliest=-1m"));
        assert!(!range.query.contains("earliest=-2m"));
    }

    #[test]
    fn test_quoted_multi_word_value() {
        let query = "index=main earliest=\"07/01/2023 00:00:00\" | stats count";
        let range = extract_time_range("-1m", "now", query);

        assert_eq!(range.earliest, "07/01/2023 00:00:00");
        assert_eq!(range.latest, "now");
        assert!(!range.query.contains("earliest"));
        assert!(!range.query.contains("07/01/2023"));
        assert!(range.query.contains("| stats count"));
    }

    #[test]
    fn test_quoted_single_word_value() {
        let query = "index=main latest=\"-30s\" | stats count";
        let range = extract_time_range("-1m", "now", query);

        assert_eq!(range.latest, "-30s");
        assert_eq!(range.query, "index=main  | stats count");
    }
}
