use std::time::SystemTime;

/// The current time, formatted for humans (RFC 3339, UTC).
pub fn time_str() -> String {
    humantime::format_rfc3339_seconds(SystemTime::now()).to_string()
}

/// Splits a comma-separated list, skipping empty elements.
pub fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        let items: Vec<_> = split_list("#a,,bob,").collect();
        assert_eq!(items, vec!["#a", "bob"]);
        assert_eq!(split_list("").count(), 0);
    }

    #[test]
    fn test_time_str() {
        let now = time_str();
        assert!(now.ends_with('Z'), "{}", now);
    }
}
