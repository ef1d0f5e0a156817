//! The four stages a slug passes through:
//! extract -> generate -> validate (reserved words) -> uniquify.

mod generator;
mod reserved;
mod source;
mod unique;

pub use generator::{MethodRegistry, generate, truncate};
pub use reserved::validate;
pub use source::{extract, lookup};
pub use unique::{MAX_SUFFIX, numeric_suffix, uniquify};

use crate::config::SlugConfig;
use crate::error::SlugError;
use crate::record::Record;
use crate::store::{SlugMatch, SlugQuery};

/// The record, field and effective configuration a stage works on.
#[derive(Clone, Copy)]
pub struct FieldContext<'a> {
    pub record: &'a dyn Record,
    pub field: &'a str,
    pub config: &'a SlugConfig,
}

impl<'a> FieldContext<'a> {
    pub fn new(record: &'a dyn Record, field: &'a str, config: &'a SlugConfig) -> Self {
        Self {
            record,
            field,
            config,
        }
    }

    pub fn record_type(&self) -> &str {
        self.record.record_type()
    }

    /// Query over other records of this type, honouring scope and trash settings
    pub fn query(&self, matcher: SlugMatch) -> SlugQuery {
        SlugQuery::new(self.record_type(), self.field, matcher)
            .excluding(self.record.key().cloned())
            .scoped(self.record.unique_scope(self.field))
            .with_trashed(self.config.include_trashed)
    }

    pub(crate) fn store_error(&self, error: anyhow::Error) -> SlugError {
        SlugError::Store {
            record_type: self.record_type().to_string(),
            field: self.field.to_string(),
            source: error.into(),
        }
    }
}
