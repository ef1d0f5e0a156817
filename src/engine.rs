//! Default transliteration engine and its per-field cache.
//!
//! The engine wraps `slug::slugify` (ASCII transliteration, lowercasing,
//! collapsing of non-alphanumeric runs) and adds per-field replacement rules
//! and an arbitrary separator.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::config::SlugConfig;
use crate::record::Record;

/// Separator produced by `slug::slugify`
const ENGINE_SEPARATOR: char = '-';

/// Transliterating slug engine.
#[derive(Debug, Clone, Default)]
pub struct SlugEngine {
    /// Applied in order before transliteration
    rules: Vec<(String, String)>,
}

impl SlugEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `from` with `to` before transliterating.
    pub fn with_rule(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        if !from.is_empty() {
            self.rules.push((from, to.into()));
        }
        self
    }

    pub fn with_rules<I, K, V>(self, rules: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        rules
            .into_iter()
            .fold(self, |engine, (from, to)| engine.with_rule(from, to))
    }

    pub fn rules(&self) -> &[(String, String)] {
        &self.rules
    }

    /// Lowercase ASCII slug of `text`, words joined by `separator`.
    pub fn slugify(&self, text: &str, separator: &str) -> String {
        let mut text = text.to_string();
        for (from, to) in &self.rules {
            text = text.replace(from.as_str(), &format!(" {} ", to));
        }

        let slugged = slug::slugify(&text);
        if separator.len() == 1 && separator.starts_with(ENGINE_SEPARATOR) {
            return slugged;
        }

        slugged
            .split(ENGINE_SEPARATOR)
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(separator)
    }
}

/// Engines built once per `(record type, field)` and reused.
#[derive(Debug, Default)]
pub struct EngineCache {
    engines: RefCell<HashMap<(String, String), Rc<SlugEngine>>>,
}

impl EngineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached engine for this record type and field, building it on first use.
    ///
    /// The field's `engine_rules` and the record's `customize_slug_engine`
    /// hook only apply when the engine is first built.
    pub fn engine_for(
        &self,
        record: &dyn Record,
        field: &str,
        config: &SlugConfig,
    ) -> Rc<SlugEngine> {
        let key = (record.record_type().to_string(), field.to_string());
        if let Some(engine) = self.engines.borrow().get(&key) {
            return Rc::clone(engine);
        }

        debug!("Building slug engine for {}.{}", key.0, key.1);
        let engine = SlugEngine::new().with_rules(config.engine_rules.clone());
        let engine = Rc::new(record.customize_slug_engine(engine, field));
        self.engines.borrow_mut().insert(key, Rc::clone(&engine));
        engine
    }

    pub fn len(&self) -> usize {
        self.engines.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.borrow().is_empty()
    }
}
