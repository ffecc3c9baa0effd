//! Tag extraction from upstream payloads.
//!
//! Upstream route and dispatch payloads carry an unordered `tags` array of
//! `{name, value}` objects used for fields that have no structured column.
//! Different upstream producers are inconsistent about casing and key
//! spelling, and the consumers of those tags grew matching rules to suit:
//! the carrier-code tag is matched case-insensitively and accepts
//! `Name`/`Value` key spellings, while the promise-date and order-type tags
//! are matched byte-for-byte with lowercase keys only. Those per-field rules
//! are load-bearing (unifying them would silently change which tags match),
//! so each call site picks its own [`TagSelector`].

use serde_json::Value;

/// Matching rules for one tag consumer.
#[derive(Debug, Clone, Copy)]
pub struct TagSelector {
    /// Tag name to look for.
    pub name: &'static str,
    /// Compare names trimmed and case-insensitively.
    pub case_insensitive: bool,
    /// Also accept the capitalized `Name`/`Value` key spellings.
    pub alias_keys: bool,
}

/// Carrier-code tag (`CODCOMU`): tolerant matching.
pub const CODCOMU: TagSelector = TagSelector {
    name: "CODCOMU",
    case_insensitive: true,
    alias_keys: true,
};

/// Promise-date tag (`FECSOLDES`): exact matching.
pub const FECSOLDES: TagSelector = TagSelector {
    name: "FECSOLDES",
    case_insensitive: false,
    alias_keys: false,
};

/// Order-type tag (`TIPO_ORDEN`): exact matching.
pub const TIPO_ORDEN: TagSelector = TagSelector {
    name: "TIPO_ORDEN",
    case_insensitive: false,
    alias_keys: false,
};

/// Render a JSON value the way the upstream stringifies tag contents.
///
/// Strings pass through unquoted; everything else uses its JSON rendering.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Extract the value of the first tag matching `selector`.
///
/// `tags` must be a JSON array of objects; any other shape yields `None`.
/// At most one tag per name is expected, so list order never matters in
/// practice. A matching tag whose value key is missing or null yields
/// `None` as well.
pub fn extract_tag<'a>(tags: &'a Value, selector: &TagSelector) -> Option<&'a Value> {
    let items = tags.as_array()?;

    for item in items {
        let obj = match item.as_object() {
            Some(obj) => obj,
            None => continue,
        };

        let name = if selector.alias_keys {
            obj.get("name").or_else(|| obj.get("Name"))
        } else {
            obj.get("name")
        };
        let name = match name {
            Some(n) if !n.is_null() => n,
            _ => continue,
        };

        let matched = if selector.case_insensitive {
            stringify(name).trim().eq_ignore_ascii_case(selector.name)
        } else {
            name.as_str() == Some(selector.name)
        };
        if !matched {
            continue;
        }

        let value = if selector.alias_keys {
            obj.get("value").or_else(|| obj.get("Value"))
        } else {
            obj.get("value")
        };
        return match value {
            Some(v) if !v.is_null() => Some(v),
            _ => None,
        };
    }

    None
}

/// Extract a tag value as a trimmed, non-empty string.
pub fn extract_tag_str(tags: &Value, selector: &TagSelector) -> Option<String> {
    let value = extract_tag(tags, selector)?;
    let s = stringify(value).trim().to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_codcomu_any_casing() {
        for name in ["CODCOMU", "codcomu", "CodComu", "  codcomu  "] {
            let tags = json!([{"name": name, "value": " 123 "}]);
            assert_eq!(
                extract_tag_str(&tags, &CODCOMU),
                Some("123".to_string()),
                "casing {name:?} should match"
            );
        }
    }

    #[test]
    fn test_codcomu_capitalized_keys() {
        let tags = json!([{"Name": "CODCOMU", "Value": "456"}]);
        assert_eq!(extract_tag_str(&tags, &CODCOMU), Some("456".to_string()));
    }

    #[test]
    fn test_codcomu_numeric_value_is_stringified() {
        let tags = json!([{"name": "CODCOMU", "value": 123}]);
        assert_eq!(extract_tag_str(&tags, &CODCOMU), Some("123".to_string()));
    }

    #[test]
    fn test_codcomu_absent_returns_none() {
        let tags = json!([{"name": "OTHER", "value": "x"}]);
        assert_eq!(extract_tag(&tags, &CODCOMU), None);
    }

    #[test]
    fn test_fecsoldes_is_case_sensitive() {
        let tags = json!([{"name": "fecsoldes", "value": "20251126"}]);
        assert_eq!(extract_tag(&tags, &FECSOLDES), None);

        let tags = json!([{"name": "FECSOLDES", "value": "20251126"}]);
        assert_eq!(
            extract_tag(&tags, &FECSOLDES),
            Some(&json!("20251126"))
        );
    }

    #[test]
    fn test_fecsoldes_rejects_capitalized_keys() {
        let tags = json!([{"Name": "FECSOLDES", "Value": "20251126"}]);
        assert_eq!(extract_tag(&tags, &FECSOLDES), None);
    }

    #[test]
    fn test_first_match_wins() {
        let tags = json!([
            {"name": "TIPO_ORDEN", "value": "first"},
            {"name": "TIPO_ORDEN", "value": "second"}
        ]);
        assert_eq!(
            extract_tag_str(&tags, &TIPO_ORDEN),
            Some("first".to_string())
        );
    }

    #[test]
    fn test_non_array_input_returns_none() {
        assert_eq!(extract_tag(&json!(null), &CODCOMU), None);
        assert_eq!(extract_tag(&json!("tags"), &CODCOMU), None);
        assert_eq!(extract_tag(&json!({"name": "CODCOMU"}), &CODCOMU), None);
    }

    #[test]
    fn test_null_value_returns_none() {
        let tags = json!([{"name": "CODCOMU", "value": null}]);
        assert_eq!(extract_tag(&tags, &CODCOMU), None);
    }

    #[test]
    fn test_whitespace_only_value_returns_none_as_str() {
        let tags = json!([{"name": "CODCOMU", "value": "   "}]);
        assert_eq!(extract_tag_str(&tags, &CODCOMU), None);
    }

    #[test]
    fn test_non_object_items_are_skipped() {
        let tags = json!(["junk", 42, {"name": "CODCOMU", "value": "9"}]);
        assert_eq!(extract_tag_str(&tags, &CODCOMU), Some("9".to_string()));
    }
}
