use serde_json::Value;

use crate::record::{Record, value_text};

/// Raw text a slug is generated from.
///
/// With no source fields the record's display string is used. Otherwise each
/// field is rendered in order and joined with single spaces; a missing field
/// contributes an empty string but keeps its position.
pub fn extract(record: &dyn Record, source: Option<&[String]>) -> String {
    match source {
        None => record.display_string(),
        Some(fields) => fields
            .iter()
            .map(|field| lookup(record, field).map(value_text).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Resolve a possibly dotted attribute path (`author.name`, `tags.0`).
///
/// An attribute whose name literally contains the dots wins over walking.
pub fn lookup<'a>(record: &'a dyn Record, path: &str) -> Option<&'a Value> {
    if let Some(value) = record.attribute(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let head = record.attribute(segments.next()?)?;
    segments.try_fold(head, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
