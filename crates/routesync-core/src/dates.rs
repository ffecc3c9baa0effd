//! Promise-date normalization.

/// Convert a raw `YYYYMMDD` promise date into ISO `YYYY-MM-DD`.
///
/// The raw value must be exactly eight ASCII digits. Anything else
/// (shorter, longer, separators, alphabetic noise) yields `None` and the
/// caller leaves the field absent.
pub fn normalize_promise_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(format!("{}-{}-{}", &s[0..4], &s[4..6], &s[6..8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_date() {
        assert_eq!(
            normalize_promise_date("20251126"),
            Some("2025-11-26".to_string())
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(
            normalize_promise_date(" 20251126 "),
            Some("2025-11-26".to_string())
        );
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(normalize_promise_date("2025112"), None);
        assert_eq!(normalize_promise_date("202511260"), None);
        assert_eq!(normalize_promise_date(""), None);
    }

    #[test]
    fn test_non_digits_rejected() {
        assert_eq!(normalize_promise_date("2025-11-2"), None);
        assert_eq!(normalize_promise_date("2025112a"), None);
        assert_eq!(normalize_promise_date("abcdefgh"), None);
    }
}
