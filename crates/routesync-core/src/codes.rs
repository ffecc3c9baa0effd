//! Sub-status code normalization.
//!
//! `substatus_code` arrives from upstream as a string, a number, null, or
//! occasionally garbage (NaN leaked through an upstream export). The
//! reference mapping is equally loose and stores the code either as a
//! string or as a number, so lookups must try both representations.

use serde_json::Value;

use crate::tags::stringify;

/// Canonicalize a loosely-typed code into a stable lookup key.
///
/// Returns `None` when the code should be treated as "no code": null,
/// non-finite numbers, empty/blank strings, and the literal text "nan"
/// in any casing.
pub fn normalize_code(code: &Value) -> Option<String> {
    match code {
        Value::Null => None,
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    return None;
                }
            }
            normalize_str(&n.to_string())
        }
        other => normalize_str(&stringify(other)),
    }
}

fn normalize_str(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// All representations of a code worth trying against the reference mapping.
///
/// Returns the canonical string plus, when the string is entirely digits,
/// its integer form ("007" also yields 7). `None` when the code itself does
/// not normalize.
pub fn code_variants(code: &Value) -> Option<Vec<Value>> {
    let norm = normalize_code(code)?;

    let mut variants = vec![Value::String(norm.clone())];
    if norm.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = norm.parse::<i64>() {
            let numeric = Value::from(n);
            if !variants.contains(&numeric) {
                variants.push(numeric);
            }
        }
    }

    Some(variants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_null_is_absent() {
        assert_eq!(normalize_code(&Value::Null), None);
    }

    #[test]
    fn test_normalize_blank_and_nan_text() {
        assert_eq!(normalize_code(&json!("")), None);
        assert_eq!(normalize_code(&json!("   ")), None);
        assert_eq!(normalize_code(&json!("nan")), None);
        assert_eq!(normalize_code(&json!("NaN")), None);
        assert_eq!(normalize_code(&json!("NAN")), None);
    }

    #[test]
    fn test_normalize_trims_strings() {
        assert_eq!(normalize_code(&json!(" 7 ")), Some("7".to_string()));
        assert_eq!(normalize_code(&json!("007")), Some("007".to_string()));
        assert_eq!(normalize_code(&json!("abc")), Some("abc".to_string()));
    }

    #[test]
    fn test_normalize_numbers() {
        assert_eq!(normalize_code(&json!(1)), Some("1".to_string()));
        assert_eq!(normalize_code(&json!(1.5)), Some("1.5".to_string()));
    }

    #[test]
    fn test_variants_of_padded_digits() {
        let variants = code_variants(&json!("007")).unwrap();
        assert!(variants.contains(&json!("007")));
        assert!(variants.contains(&json!(7)));
    }

    #[test]
    fn test_variants_of_plain_digits() {
        let variants = code_variants(&json!("1")).unwrap();
        assert_eq!(variants, vec![json!("1"), json!(1)]);
    }

    #[test]
    fn test_variants_of_integer_input() {
        let variants = code_variants(&json!(1)).unwrap();
        assert_eq!(variants, vec![json!("1"), json!(1)]);
    }

    #[test]
    fn test_variants_of_non_digit_code() {
        let variants = code_variants(&json!("abc")).unwrap();
        assert_eq!(variants, vec![json!("abc")]);
    }

    #[test]
    fn test_variants_of_invalid_code() {
        assert_eq!(code_variants(&Value::Null), None);
        assert_eq!(code_variants(&json!("  ")), None);
    }
}
