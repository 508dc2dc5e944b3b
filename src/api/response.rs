//! Read-result shaping.

use serde_json::Value;

use crate::store::Document;

/// Drop rows whose every value is null or the empty string.
///
/// Sheet reads come back padded with blank trailing rows; hiding them is
/// a read-side concern only. Insert/update/remove results are returned
/// as-is, since a legitimately all-empty row must stay visible to the
/// caller.
pub fn drop_empty_rows(docs: Vec<Document>) -> Vec<Document> {
    docs.into_iter().filter(|doc| !is_empty_row(doc)).collect()
}

fn is_empty_row(doc: &Document) -> bool {
    doc.values().all(|value| match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    })
}
