//! When a sluggable field gets a fresh slug.

use crate::config::SlugConfig;
use crate::record::{Record, is_blank};

/// Decide whether `field` must be (re)slugged on this save.
///
/// Regenerate when forced, when the field is empty, when `on_update` is set,
/// or on the first save of a record whose slug the caller did not set.
/// A slug the caller set explicitly is otherwise left alone.
pub fn needs_slugging(record: &dyn Record, field: &str, config: &SlugConfig, force: bool) -> bool {
    if force || is_blank(record.attribute(field)) || config.on_update {
        return true;
    }

    if record.is_dirty(field) {
        return false;
    }

    !record.exists()
}
