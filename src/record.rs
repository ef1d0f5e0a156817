//! Record abstraction the slug pipeline reads from and writes into.
//!
//! The pipeline never persists anything itself. It reads attributes, asks
//! whether fields changed since load, and writes the resolved slug back; the
//! caller saves the record afterwards.

use serde_json::Value;

use crate::config::SlugFields;
use crate::engine::SlugEngine;

/// A persisted (or about to be persisted) record with sluggable fields.
pub trait Record {
    /// Name of the record type (table, model, collection)
    fn record_type(&self) -> &str;

    /// Identity of the stored record; `None` before the first save
    fn key(&self) -> Option<&Value>;

    /// Top-level attribute value
    fn attribute(&self, name: &str) -> Option<&Value>;

    /// Overwrite a top-level attribute
    fn set_attribute(&mut self, name: &str, value: Value);

    /// Whether `name` changed since the record was loaded
    fn is_dirty(&self, name: &str) -> bool;

    /// Whether the record has been persisted before
    fn exists(&self) -> bool;

    /// Canonical string form, used when a field declares no source
    fn display_string(&self) -> String;

    /// Sluggable fields declared by this record type
    fn slug_fields(&self) -> SlugFields;

    /// Adjust the transliteration engine built for `field`.
    ///
    /// Called once per record type and field; the result is cached.
    fn customize_slug_engine(&self, engine: SlugEngine, _field: &str) -> SlugEngine {
        engine
    }

    /// Attribute constraints limiting which records compete for a slug
    /// (e.g. only posts in the same blog).
    fn unique_scope(&self, _field: &str) -> Vec<(String, Value)> {
        Vec::new()
    }

    /// Whether any of `names` changed since load
    fn any_dirty(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.is_dirty(name))
    }
}

/// True for missing, `null` and empty-string values.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Render an attribute value as source text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
