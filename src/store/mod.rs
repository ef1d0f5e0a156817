//! Persistence-side collaborators of the slug pipeline.
//!
//! The pipeline only needs two lookups from storage: the first record holding
//! an exact slug, and every record whose slug starts with a prefix. Both run
//! through [`SlugRepository`]. Stores that remember retired slugs can also
//! expose a [`SlugHistory`].

pub mod memory;

pub use memory::{Document, MemoryStore};

use std::collections::BTreeSet;

use anyhow::Result;
use serde_json::Value;

/// How a query compares the slug column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlugMatch {
    /// Slug equals the value
    Exact(String),
    /// Slug starts with the value
    Prefix(String),
}

/// A slug lookup against one record type and field.
#[derive(Debug, Clone, PartialEq)]
pub struct SlugQuery {
    pub record_type: String,
    pub field: String,
    pub matcher: SlugMatch,
    /// Identity of the record asking; never matched
    pub exclude_key: Option<Value>,
    /// Attribute equality constraints every match must satisfy
    pub scope: Vec<(String, Value)>,
    /// Also match soft-deleted records
    pub include_trashed: bool,
}

impl SlugQuery {
    pub fn new(
        record_type: impl Into<String>,
        field: impl Into<String>,
        matcher: SlugMatch,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            field: field.into(),
            matcher,
            exclude_key: None,
            scope: Vec::new(),
            include_trashed: false,
        }
    }

    pub fn exact(
        record_type: impl Into<String>,
        field: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self::new(record_type, field, SlugMatch::Exact(slug.into()))
    }

    pub fn prefix(
        record_type: impl Into<String>,
        field: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self::new(record_type, field, SlugMatch::Prefix(prefix.into()))
    }

    pub fn excluding(mut self, key: Option<Value>) -> Self {
        self.exclude_key = key;
        self
    }

    pub fn scoped(mut self, scope: Vec<(String, Value)>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_trashed(mut self, include: bool) -> Self {
        self.include_trashed = include;
        self
    }

    /// The slug or prefix being searched for
    pub fn slug(&self) -> &str {
        match &self.matcher {
            SlugMatch::Exact(slug) | SlugMatch::Prefix(slug) => slug,
        }
    }

    /// Whether a stored slug satisfies the matcher
    pub fn matches_slug(&self, candidate: &str) -> bool {
        match &self.matcher {
            SlugMatch::Exact(slug) => candidate == slug,
            SlugMatch::Prefix(prefix) => candidate.starts_with(prefix.as_str()),
        }
    }
}

/// A stored record's identity and slug value.
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingSlug {
    pub key: Value,
    pub slug: String,
}

/// Slug lookups against the backing store.
pub trait SlugRepository {
    /// First record matching the query
    fn first(&self, query: &SlugQuery) -> Result<Option<ExistingSlug>>;

    /// Every record matching the query
    fn all(&self, query: &SlugQuery) -> Result<Vec<ExistingSlug>>;

    /// Slug history, for stores that remember retired slugs
    fn history(&self) -> Option<&dyn SlugHistory> {
        None
    }

    /// Record currently holding `slug`
    fn find_by_slug(
        &self,
        record_type: &str,
        field: &str,
        slug: &str,
    ) -> Result<Option<ExistingSlug>> {
        self.first(&SlugQuery::exact(record_type, field, slug))
    }
}

impl<T: SlugRepository + ?Sized> SlugRepository for &T {
    fn first(&self, query: &SlugQuery) -> Result<Option<ExistingSlug>> {
        (**self).first(query)
    }

    fn all(&self, query: &SlugQuery) -> Result<Vec<ExistingSlug>> {
        (**self).all(query)
    }

    fn history(&self) -> Option<&dyn SlugHistory> {
        (**self).history()
    }
}

/// Slugs that records held in the past (renamed or deleted records).
pub trait SlugHistory {
    /// Whether the query's slug was ever held by a matching record
    fn slug_exists(&self, query: &SlugQuery) -> Result<bool>;

    /// Extend `taken` with numeric suffixes of the query's slug found in history
    fn taken_numbers(
        &self,
        query: &SlugQuery,
        separator: &str,
        taken: BTreeSet<u32>,
    ) -> Result<BTreeSet<u32>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_matching() {
        let exact = SlugQuery::exact("post", "slug", "hello");
        assert!(exact.matches_slug("hello"));
        assert!(!exact.matches_slug("hello-1"));

        let prefix = SlugQuery::prefix("post", "slug", "hello-");
        assert!(prefix.matches_slug("hello-1"));
        assert!(prefix.matches_slug("hello-world"));
        assert!(!prefix.matches_slug("hello"));
        assert_eq!(prefix.slug(), "hello-");
    }

    #[test]
    fn test_query_builders() {
        let query = SlugQuery::exact("post", "slug", "hello")
            .excluding(Some(json!(3)))
            .scoped(vec![("blog".to_string(), json!("news"))])
            .with_trashed(true);

        assert_eq!(query.exclude_key, Some(json!(3)));
        assert_eq!(query.scope.len(), 1);
        assert!(query.include_trashed);
    }
}
