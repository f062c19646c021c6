//! Tag filter (spec component C2).

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadTagError(pub String);

impl fmt::Display for BadTagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad tag: {}", self.0)
    }
}

impl std::error::Error for BadTagError {}

/// Characters disallowed in ids and tag keys/values (spec §3 "Item").
const FORBIDDEN: [char; 2] = ['"', '\\'];

pub fn validate_tag_component(value: &str) -> Result<(), BadTagError> {
    if value.is_empty() {
        return Err(BadTagError("empty tag key or value".to_string()));
    }
    if value.chars().any(|c| FORBIDDEN.contains(&c)) {
        return Err(BadTagError(format!(
            "tag component contains a forbidden character: {value}"
        )));
    }
    Ok(())
}

pub fn validate_id(id: &str) -> Result<(), BadTagError> {
    if id.is_empty() {
        return Err(BadTagError("empty metric id".to_string()));
    }
    if id.chars().any(|c| FORBIDDEN.contains(&c) || c.is_control()) {
        return Err(BadTagError(format!(
            "id contains a forbidden character: {id}"
        )));
    }
    Ok(())
}

/// Parse a `"a:x,b:y"` tag-query expression into a map, per spec §4.2.
pub fn parse_tags(expr: &str) -> Result<HashMap<String, String>, BadTagError> {
    let mut tags = HashMap::new();
    for token in expr.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (key, value) = token
            .split_once(':')
            .ok_or_else(|| BadTagError(format!("malformed tag token: {token}")))?;
        let key = key.trim();
        let value = value.trim();
        validate_tag_component(key)?;
        validate_tag_component(value)?;
        tags.insert(key.to_string(), value.to_string());
    }
    Ok(tags)
}

/// An item matches a tag query iff every `(k, v)` in the query is present
/// and equal in the item's tag map (AND semantics, spec §3).
pub fn matches(item_tags: &HashMap<String, String>, query: &HashMap<String, String>) -> bool {
    query
        .iter()
        .all(|(k, v)| item_tags.get(k).map(|iv| iv == v).unwrap_or(false))
}
