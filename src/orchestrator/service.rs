//! SlugService - drives every declared slug field through the pipeline.
//!
//! The service owns the state that lives as long as the application: the
//! configuration resolver (defaults loaded once), the transliteration engine
//! cache and the registry of named slug methods. Construct one at startup, or
//! one per test for isolation.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::policy::needs_slugging;
use crate::config::{ConfigResolver, SlugConfig, SlugOverrides};
use crate::engine::EngineCache;
use crate::error::Result;
use crate::phases::{self, FieldContext, MethodRegistry};
use crate::record::Record;
use crate::store::{ExistingSlug, SlugRepository};

/// Resolves slugs for records against a repository.
pub struct SlugService<R> {
    repository: R,
    resolver: ConfigResolver,
    engines: EngineCache,
    methods: MethodRegistry,
}

impl<R: SlugRepository> SlugService<R> {
    /// Service with built-in defaults.
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            resolver: ConfigResolver::default(),
            engines: EngineCache::new(),
            methods: MethodRegistry::new(),
        }
    }

    /// Use a different source of default configuration.
    pub fn with_resolver(mut self, resolver: ConfigResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Make a slug function available to `method: <name>` in configuration.
    pub fn register_method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(f));
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repository
    }

    pub fn engines(&self) -> &EngineCache {
        &self.engines
    }

    /// Effective configuration for a field declared with `overrides`.
    pub fn config_for(&self, overrides: &SlugOverrides) -> Result<SlugConfig> {
        self.resolver.resolve(overrides)
    }

    /// Slug every declared field of `record` that needs it.
    ///
    /// Returns the fields this call assigned that now differ from the loaded
    /// record. With `force` every field with a non-blank source is
    /// regenerated.
    pub fn resolve_all(&self, record: &mut dyn Record, force: bool) -> Result<Vec<String>> {
        let declared = record.slug_fields();
        let mut touched = Vec::new();

        for (field, overrides) in declared.iter() {
            let config = self.resolver.resolve(overrides)?;

            if !needs_slugging(&*record, field, &config, force) {
                debug!("{}.{}: slug kept", record.record_type(), field);
                continue;
            }

            let source = phases::extract(&*record, config.source.as_deref());
            if source.trim().is_empty() {
                debug!("{}.{}: blank source, slug left unchanged", record.record_type(), field);
                continue;
            }

            let ctx = FieldContext::new(&*record, field, &config);
            let slug = self.build(&ctx, &source)?;
            if slug.is_empty() {
                continue;
            }

            info!("{}.{}: slug set to {}", record.record_type(), field, slug);
            record.set_attribute(field, Value::String(slug));
            touched.push(field.to_string());
        }

        Ok(touched
            .into_iter()
            .filter(|field| record.is_dirty(field))
            .collect())
    }

    /// Slug arbitrary text as if it were the source of `record.field`.
    ///
    /// Skips extraction and the regeneration check. `overrides` replaces the
    /// field's declared overrides when given.
    pub fn create_slug_from(
        &self,
        record: &dyn Record,
        field: &str,
        text: &str,
        overrides: Option<&SlugOverrides>,
    ) -> Result<String> {
        let declared = record.slug_fields();
        let overrides = overrides
            .or_else(|| declared.get(field))
            .cloned()
            .unwrap_or_default();
        let config = self.resolver.resolve(&overrides)?;

        self.build(&FieldContext::new(record, field, &config), text)
    }

    /// Record of `record_type` whose `field` currently equals `slug`.
    pub fn find_by_slug(
        &self,
        record_type: &str,
        field: &str,
        slug: &str,
    ) -> anyhow::Result<Option<ExistingSlug>> {
        self.repository.find_by_slug(record_type, field, slug)
    }

    /// generate -> validate -> uniquify
    fn build(&self, ctx: &FieldContext<'_>, text: &str) -> Result<String> {
        let slug = phases::generate(ctx, text, &self.engines, &self.methods)?;
        if slug.is_empty() {
            warn!(
                "{}.{}: source {:?} produced an empty slug",
                ctx.record_type(),
                ctx.field,
                text
            );
            return Ok(slug);
        }

        let slug = phases::validate(ctx, slug)?;
        phases::uniquify(ctx, slug, &self.repository)
    }
}
