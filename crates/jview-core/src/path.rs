#![forbid(unsafe_code)]

//! Path expressions for graph nodes.
//!
//! A path starts at `$`. Object members whose key is a bare identifier use
//! dot notation (`$.user.name`); any other key is written as a quoted JSON
//! string in brackets (`$["first name"]`). Array elements use `[index]`.

use serde_json::Value;

/// Path of the document root.
pub const ROOT_PATH: &str = "$";

/// One step of a parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Whether `key` matches `[A-Za-z_$][A-Za-z0-9_$]*`.
#[must_use]
pub fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Path of member `key` of the object at `parent`.
#[must_use]
pub fn object_child_path(parent: &str, key: &str) -> String {
    if is_identifier(key) {
        format!("{parent}.{key}")
    } else {
        // A str always serializes; the fallback only keeps this total.
        let quoted = serde_json::to_string(key).unwrap_or_else(|_| format!("\"{key}\""));
        format!("{parent}[{quoted}]")
    }
}

/// Path of element `index` of the array at `parent`.
#[must_use]
pub fn array_child_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Split a path expression into segments. `None` if it is malformed.
#[must_use]
pub fn parse_path(path: &str) -> Option<Vec<PathSegment>> {
    let mut rest = path.strip_prefix(ROOT_PATH)?;
    let mut segments = Vec::new();
    while !rest.is_empty() {
        if let Some(after_dot) = rest.strip_prefix('.') {
            let end = after_dot
                .find(['.', '['])
                .unwrap_or(after_dot.len());
            let key = &after_dot[..end];
            if !is_identifier(key) {
                return None;
            }
            segments.push(PathSegment::Key(key.to_string()));
            rest = &after_dot[end..];
        } else if let Some(after_bracket) = rest.strip_prefix('[') {
            if after_bracket.starts_with('"') {
                let close = closing_quote(after_bracket)?;
                let key: String = serde_json::from_str(&after_bracket[..=close]).ok()?;
                rest = after_bracket[close + 1..].strip_prefix(']')?;
                segments.push(PathSegment::Key(key));
            } else {
                let end = after_bracket.find(']')?;
                let digits = &after_bracket[..end];
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                segments.push(PathSegment::Index(digits.parse().ok()?));
                rest = &after_bracket[end + 1..];
            }
        } else {
            return None;
        }
    }
    Some(segments)
}

/// Byte index of the quote closing the JSON string that opens `s`.
fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, b) in s.bytes().enumerate().skip(1) {
        match b {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Resolve a path expression against a document.
#[must_use]
pub fn select_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    parse_path(path)?
        .iter()
        .try_fold(root, |current, segment| match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifiers() {
        assert!(is_identifier("name"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("$ref"));
        assert!(is_identifier("a1"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier("first name"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("é"));
    }

    #[test]
    fn child_paths() {
        assert_eq!(object_child_path(ROOT_PATH, "user"), "$.user");
        assert_eq!(object_child_path("$.user", "first name"), r#"$.user["first name"]"#);
        assert_eq!(object_child_path("$", r#"say "hi""#), r#"$["say \"hi\""]"#);
        assert_eq!(array_child_path("$.items", 3), "$.items[3]");
    }

    #[test]
    fn parse_round_trips_built_paths() {
        let path = array_child_path(&object_child_path(&object_child_path("$", "a"), "b c"), 2);
        assert_eq!(
            parse_path(&path),
            Some(vec![
                PathSegment::Key("a".into()),
                PathSegment::Key("b c".into()),
                PathSegment::Index(2),
            ])
        );
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(parse_path("user"), None);
        assert_eq!(parse_path("$."), None);
        assert_eq!(parse_path("$[x]"), None);
        assert_eq!(parse_path("$[\"open"), None);
        assert_eq!(parse_path("$[1"), None);
        assert_eq!(parse_path("$"), Some(vec![]));
    }

    #[test]
    fn select_resolves_values() {
        let doc = json!({"a": {"b c": [10, {"d": true}]}, "quote\"key": 1});
        assert_eq!(select_path(&doc, "$"), Some(&doc));
        assert_eq!(select_path(&doc, r#"$.a["b c"][0]"#), Some(&json!(10)));
        assert_eq!(select_path(&doc, r#"$.a["b c"][1].d"#), Some(&json!(true)));
        assert_eq!(select_path(&doc, r#"$["quote\"key"]"#), Some(&json!(1)));
        assert_eq!(select_path(&doc, "$.a.missing"), None);
        assert_eq!(select_path(&doc, "$.a[0]"), None);
    }
}
