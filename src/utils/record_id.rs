use serde::Serializer;
use surrealdb::RecordId;

use crate::errors::{Error, Result};

/// Accepts `table:key` (as rendered in responses) or a bare `key`.
pub fn parse_record_id(table: &str, raw: &str) -> Result<RecordId> {
    let raw = raw.trim();
    let key = match raw.split_once(':') {
        Some((prefix, key)) if prefix == table => key,
        Some(_) => return Err(Error::BadRequest(format!("`{raw}` is not a {table} id"))),
        None => raw,
    };
    let key = key
        .trim_start_matches(['⟨', '`'])
        .trim_end_matches(['⟩', '`']);
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(Error::BadRequest(format!("`{raw}` is not a {table} id")));
    }
    Ok(RecordId::from_table_key(table, key))
}

pub fn as_string<S: Serializer>(id: &RecordId, serializer: S) -> core::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_string())
}

pub fn option_as_string<S: Serializer>(
    id: &Option<RecordId>,
    serializer: S,
) -> core::result::Result<S::Ok, S::Error> {
    match id {
        Some(id) => serializer.serialize_some(&id.to_string()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_prefixed_and_bare_keys() {
        let a = parse_record_id("shelters", "shelters:abc123").unwrap();
        let b = parse_record_id("shelters", "abc123").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.table(), "shelters");
    }

    #[test]
    fn rejects_other_tables_and_garbage() {
        assert!(parse_record_id("shelters", "users:abc").is_err());
        assert!(parse_record_id("shelters", "").is_err());
        assert!(parse_record_id("shelters", "a b;DELETE").is_err());
    }
}
