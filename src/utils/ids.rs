use rand::{Rng, distr::Alphanumeric};
use surrealdb::RecordId;

/// Fresh record id for documents created inside a transaction, where the id
/// must be known before the query runs.
pub fn new_record_id(table: &str) -> RecordId {
    let key = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(20)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect::<String>();
    RecordId::from_table_key(table, key)
}
