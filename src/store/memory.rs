//! In-memory document store.
//!
//! Backs the CLI and the test-suite. Documents are JSON attribute maps keyed
//! by an auto-incrementing integer; deletes are soft; slugs replaced by a save
//! are remembered so the uniqueness check can avoid re-issuing them.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ExistingSlug, SlugHistory, SlugQuery, SlugRepository};
use crate::config::SlugFields;
use crate::phases::numeric_suffix;
use crate::record::{Record, value_text};

// ============================================================================
// Document
// ============================================================================

/// A JSON-attribute record with dirty tracking.
#[derive(Debug, Clone)]
pub struct Document {
    record_type: String,
    key: Option<Value>,
    attributes: Map<String, Value>,
    /// Attributes as last loaded or saved
    original: Map<String, Value>,
    fields: SlugFields,
    display_field: Option<String>,
    scope_fields: Vec<String>,
    exists: bool,
}

impl Document {
    /// A new, unsaved document.
    pub fn new(record_type: impl Into<String>, fields: SlugFields) -> Self {
        Self {
            record_type: record_type.into(),
            key: None,
            attributes: Map::new(),
            original: Map::new(),
            fields,
            display_field: None,
            scope_fields: Vec::new(),
            exists: false,
        }
    }

    /// Builder form of [`Document::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Attribute rendered by [`Record::display_string`].
    pub fn with_display(mut self, field: impl Into<String>) -> Self {
        self.display_field = Some(field.into());
        self
    }

    /// Attributes that partition slug uniqueness.
    pub fn with_unique_scope<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// String value of an attribute
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Names of every attribute that differs from the loaded snapshot
    pub fn dirty_fields(&self) -> Vec<String> {
        let mut names: BTreeSet<&String> = self.attributes.keys().collect();
        names.extend(self.original.keys());
        names
            .into_iter()
            .filter(|name| self.attributes.get(*name) != self.original.get(*name))
            .cloned()
            .collect()
    }

    fn mark_persisted(&mut self, key: Value) {
        self.key = Some(key);
        self.original = self.attributes.clone();
        self.exists = true;
    }
}

impl Record for Document {
    fn record_type(&self) -> &str {
        &self.record_type
    }

    fn key(&self) -> Option<&Value> {
        self.key.as_ref()
    }

    fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    fn set_attribute(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    fn is_dirty(&self, name: &str) -> bool {
        self.attributes.get(name) != self.original.get(name)
    }

    fn exists(&self) -> bool {
        self.exists
    }

    fn display_string(&self) -> String {
        match &self.display_field {
            Some(field) => self.attributes.get(field).map(value_text).unwrap_or_default(),
            None => Value::Object(self.attributes.clone()).to_string(),
        }
    }

    fn slug_fields(&self) -> SlugFields {
        self.fields.clone()
    }

    fn unique_scope(&self, _field: &str) -> Vec<(String, Value)> {
        self.scope_fields
            .iter()
            .map(|name| {
                let value = self.attributes.get(name).cloned().unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect()
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    #[serde(rename = "type")]
    record_type: String,
    key: u64,
    attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deleted_at: Option<DateTime<Utc>>,
}

impl StoredDocument {
    fn slug(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).and_then(Value::as_str)
    }

    fn in_scope(&self, query: &SlugQuery) -> bool {
        self.record_type == query.record_type
            && (query.include_trashed || self.deleted_at.is_none())
            && query.exclude_key.as_ref() != Some(&Value::from(self.key))
            && query
                .scope
                .iter()
                .all(|(name, value)| self.attributes.get(name).unwrap_or(&Value::Null) == value)
    }
}

/// A slug a document held before it was renamed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetiredSlug {
    #[serde(rename = "type")]
    pub record_type: String,
    /// Key of the document that held the slug
    #[serde(default)]
    pub key: u64,
    pub field: String,
    pub slug: String,
    /// The document's unique-scope values for `field` at retirement
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub scope: Map<String, Value>,
    pub retired_at: DateTime<Utc>,
}

impl RetiredSlug {
    fn in_scope(&self, query: &SlugQuery) -> bool {
        self.record_type == query.record_type
            && self.field == query.field
            && query.exclude_key.as_ref() != Some(&Value::from(self.key))
            && query
                .scope
                .iter()
                .all(|(name, value)| self.scope.get(name).unwrap_or(&Value::Null) == value)
    }
}

/// Documents kept in memory, optionally persisted as one JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    next_key: u64,
    #[serde(default)]
    documents: Vec<StoredDocument>,
    #[serde(default)]
    retired: Vec<RetiredSlug>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store file; a missing file yields an empty store
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path).context("Failed to read store file")?;
        let mut store: Self = serde_json::from_str(&json).context("Failed to parse store file")?;
        let highest = store.documents.iter().map(|d| d.key).max().unwrap_or(0);
        store.next_key = store.next_key.max(highest);
        Ok(store)
    }

    /// Write the store to `path` atomically
    pub fn persist(&self, path: &Path) -> Result<()> {
        let temp_file = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("Failed to serialize store")?;

        // Write to temp file first
        fs::write(&temp_file, &json).context("Failed to write temp store file")?;

        // Atomic rename
        fs::rename(&temp_file, path).context("Failed to rename store file")?;

        Ok(())
    }

    /// Insert or update a document, assigning a key on first save.
    ///
    /// A declared slug field whose stored value changes is recorded as
    /// retired.
    pub fn save(&mut self, document: &mut Document) -> Value {
        let key = match document.key.as_ref().and_then(Value::as_u64) {
            Some(key) => key,
            None => {
                self.next_key += 1;
                self.next_key
            }
        };

        let now = Utc::now();
        let position = self
            .documents
            .iter()
            .position(|d| d.record_type == document.record_type && d.key == key);

        match position {
            Some(index) => {
                let stored = &mut self.documents[index];
                for (field, _) in document.fields.iter() {
                    let Some(old) = stored.slug(field) else {
                        continue;
                    };
                    if !old.is_empty() && document.get_str(field) != Some(old) {
                        self.retired.push(RetiredSlug {
                            record_type: document.record_type.clone(),
                            key,
                            field: field.to_string(),
                            slug: old.to_string(),
                            scope: document.unique_scope(field).into_iter().collect(),
                            retired_at: now,
                        });
                    }
                }
                stored.attributes = document.attributes.clone();
            }
            None => {
                self.next_key = self.next_key.max(key);
                self.documents.push(StoredDocument {
                    record_type: document.record_type.clone(),
                    key,
                    attributes: document.attributes.clone(),
                    deleted_at: None,
                });
            }
        }

        let key = Value::from(key);
        document.mark_persisted(key.clone());
        key
    }

    /// Load a stored document, including soft-deleted ones.
    pub fn get(&self, record_type: &str, key: &Value, fields: SlugFields) -> Option<Document> {
        let key = key.as_u64()?;
        let stored = self
            .documents
            .iter()
            .find(|d| d.record_type == record_type && d.key == key)?;

        let mut document = Document::new(record_type, fields);
        document.attributes = stored.attributes.clone();
        document.mark_persisted(Value::from(key));
        Some(document)
    }

    /// Keys of live documents of `record_type`, in insertion order
    pub fn keys(&self, record_type: &str) -> Vec<Value> {
        self.documents
            .iter()
            .filter(|d| d.record_type == record_type && d.deleted_at.is_none())
            .map(|d| Value::from(d.key))
            .collect()
    }

    /// Distinct record types present in the store
    pub fn record_types(&self) -> Vec<String> {
        let types: BTreeSet<&str> = self.documents.iter().map(|d| d.record_type.as_str()).collect();
        types.into_iter().map(String::from).collect()
    }

    /// Mark a document deleted. Returns false if it does not exist.
    pub fn soft_delete(&mut self, record_type: &str, key: &Value) -> bool {
        self.set_deleted(record_type, key, Some(Utc::now()))
    }

    /// Undo [`MemoryStore::soft_delete`]. Returns false if it does not exist.
    pub fn restore(&mut self, record_type: &str, key: &Value) -> bool {
        self.set_deleted(record_type, key, None)
    }

    fn set_deleted(&mut self, record_type: &str, key: &Value, at: Option<DateTime<Utc>>) -> bool {
        let Some(key) = key.as_u64() else {
            return false;
        };
        match self
            .documents
            .iter_mut()
            .find(|d| d.record_type == record_type && d.key == key)
        {
            Some(stored) => {
                stored.deleted_at = at;
                true
            }
            None => false,
        }
    }

    pub fn retired(&self) -> &[RetiredSlug] {
        &self.retired
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn matching<'a>(&'a self, query: &'a SlugQuery) -> impl Iterator<Item = ExistingSlug> + 'a {
        self.documents
            .iter()
            .filter(move |d| d.in_scope(query))
            .filter_map(move |d| {
                let slug = d.slug(&query.field)?;
                query.matches_slug(slug).then(|| ExistingSlug {
                    key: Value::from(d.key),
                    slug: slug.to_string(),
                })
            })
    }

    /// Retired slugs visible to `query`: same scope, not the asking record,
    /// and not held by a trashed document unless trash is included.
    fn retired_for<'a>(
        &'a self,
        query: &'a SlugQuery,
    ) -> impl Iterator<Item = &'a RetiredSlug> + 'a {
        self.retired.iter().filter(move |r| {
            r.in_scope(query) && (query.include_trashed || !self.is_trashed(&r.record_type, r.key))
        })
    }

    fn is_trashed(&self, record_type: &str, key: u64) -> bool {
        self.documents
            .iter()
            .any(|d| d.record_type == record_type && d.key == key && d.deleted_at.is_some())
    }
}

impl SlugRepository for MemoryStore {
    fn first(&self, query: &SlugQuery) -> Result<Option<ExistingSlug>> {
        Ok(self.matching(query).next())
    }

    fn all(&self, query: &SlugQuery) -> Result<Vec<ExistingSlug>> {
        Ok(self.matching(query).collect())
    }

    fn history(&self) -> Option<&dyn SlugHistory> {
        Some(self)
    }
}

impl SlugHistory for MemoryStore {
    fn slug_exists(&self, query: &SlugQuery) -> Result<bool> {
        Ok(self.retired_for(query).any(|r| query.matches_slug(&r.slug)))
    }

    fn taken_numbers(
        &self,
        query: &SlugQuery,
        separator: &str,
        mut taken: BTreeSet<u32>,
    ) -> Result<BTreeSet<u32>> {
        let prefix = format!("{}{}", query.slug(), separator);
        taken.extend(
            self.retired_for(query)
                .filter_map(|r| numeric_suffix(&r.slug, &prefix)),
        );
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(title: &str) -> Document {
        Document::new("post", SlugFields::new().field("slug")).with("title", title)
    }

    #[test]
    fn test_dirty_tracking() {
        let mut store = MemoryStore::new();
        let mut doc = post("Hello");
        assert!(doc.is_dirty("title"));
        assert!(!doc.exists());

        store.save(&mut doc);
        assert!(!doc.is_dirty("title"));
        assert!(doc.exists());

        doc.set("title", "Changed");
        assert!(doc.is_dirty("title"));
        assert!(!doc.is_dirty("slug"));
        assert_eq!(doc.dirty_fields(), vec!["title".to_string()]);
    }

    #[test]
    fn test_save_assigns_increasing_keys() {
        let mut store = MemoryStore::new();
        let first = store.save(&mut post("a"));
        let second = store.save(&mut post("b"));

        assert_eq!(first, json!(1));
        assert_eq!(second, json!(2));
        assert_eq!(store.keys("post"), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_queries_exclude_self_and_trashed() {
        let mut store = MemoryStore::new();
        let mut a = post("a").with("slug", "hello");
        let mut b = post("b").with("slug", "hello-1");
        store.save(&mut a);
        let b_key = store.save(&mut b);

        let exact = SlugQuery::exact("post", "slug", "hello");
        assert!(store.first(&exact).unwrap().is_some());
        assert!(store.first(&exact.clone().excluding(Some(json!(1)))).unwrap().is_none());

        let prefix = SlugQuery::prefix("post", "slug", "hello-");
        assert_eq!(store.all(&prefix).unwrap().len(), 1);

        store.soft_delete("post", &b_key);
        assert!(store.all(&prefix).unwrap().is_empty());
        assert_eq!(store.all(&prefix.clone().with_trashed(true)).unwrap().len(), 1);

        store.restore("post", &b_key);
        assert_eq!(store.all(&prefix).unwrap().len(), 1);
    }

    #[test]
    fn test_queries_respect_scope() {
        let mut store = MemoryStore::new();
        store.save(&mut post("a").with("slug", "hello").with("blog", "news"));

        let in_blog = |blog: &str| {
            SlugQuery::exact("post", "slug", "hello")
                .scoped(vec![("blog".to_string(), json!(blog))])
        };
        let news = in_blog("news");
        let sport = in_blog("sport");
        assert!(store.first(&news).unwrap().is_some());
        assert!(store.first(&sport).unwrap().is_none());
    }

    #[test]
    fn test_renamed_slug_is_retired() {
        let mut store = MemoryStore::new();
        let mut doc = post("a").with("slug", "hello-3");
        store.save(&mut doc);
        doc.set("slug", "goodbye");
        store.save(&mut doc);

        assert_eq!(store.retired().len(), 1);
        let exists = store
            .slug_exists(&SlugQuery::exact("post", "slug", "hello-3"))
            .unwrap();
        assert!(exists);

        let taken = store
            .taken_numbers(&SlugQuery::exact("post", "slug", "hello"), "-", BTreeSet::new())
            .unwrap();
        assert_eq!(taken, BTreeSet::from([3]));
    }

    #[test]
    fn test_persist_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = MemoryStore::new();
        store.save(&mut post("a").with("slug", "a"));
        store.persist(&path).unwrap();

        let mut loaded = MemoryStore::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        let key = loaded.save(&mut post("b"));
        assert_eq!(key, json!(2));

        let doc = loaded.get("post", &json!(1), SlugFields::new().field("slug")).unwrap();
        assert_eq!(doc.get_str("slug"), Some("a"));
        assert!(doc.exists());
        assert!(doc.dirty_fields().is_empty());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::load(&dir.path().join("absent.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_display_string() {
        let doc = post("Hello World").with_display("title");
        assert_eq!(doc.display_string(), "Hello World");
    }

    #[test]
    fn test_foreign_key_raises_next_key() {
        let mut store = MemoryStore::new();
        let mut imported = post("imported");
        imported.key = Some(json!(7));
        store.save(&mut imported);

        let fresh = store.save(&mut post("fresh"));
        assert_eq!(fresh, json!(8));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_history_ignores_own_retired_slugs() {
        let mut store = MemoryStore::new();
        let mut doc = post("a").with("slug", "launch");
        let key = store.save(&mut doc);
        doc.set("slug", "other");
        store.save(&mut doc);

        let exact = SlugQuery::exact("post", "slug", "launch");
        assert!(store.slug_exists(&exact).unwrap());
        assert!(!store.slug_exists(&exact.excluding(Some(key))).unwrap());
    }

    #[test]
    fn test_history_respects_scope_and_trash() {
        let mut store = MemoryStore::new();
        let mut doc = post("a")
            .with("slug", "welcome-2")
            .with("blog", 1)
            .with_unique_scope(["blog"]);
        let key = store.save(&mut doc);
        doc.set("slug", "hi");
        store.save(&mut doc);

        let in_blog = |blog: u64| {
            SlugQuery::exact("post", "slug", "welcome")
                .scoped(vec![("blog".to_string(), json!(blog))])
        };
        let taken = |store: &MemoryStore, query: &SlugQuery| {
            store.taken_numbers(query, "-", BTreeSet::new()).unwrap()
        };
        assert_eq!(taken(&store, &in_blog(1)), BTreeSet::from([2]));
        assert!(taken(&store, &in_blog(2)).is_empty());

        store.soft_delete("post", &key);
        assert!(taken(&store, &in_blog(1)).is_empty());
        assert_eq!(taken(&store, &in_blog(1).with_trashed(true)), BTreeSet::from([2]));
    }
}
