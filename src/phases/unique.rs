use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::FieldContext;
use crate::error::{Result, SlugError};
use crate::store::{SlugMatch, SlugRepository};

/// Highest numeric suffix tried before giving up.
pub const MAX_SUFFIX: u32 = 9999;

static NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("invalid NUMERIC regex"));

/// The number after `prefix` in `slug`, if the remainder is purely numeric.
pub fn numeric_suffix(slug: &str, prefix: &str) -> Option<u32> {
    let rest = slug.strip_prefix(prefix)?;
    if !NUMERIC.is_match(rest) {
        return None;
    }
    rest.parse().ok()
}

/// Append the smallest free `separator + n` if another record holds `slug`.
///
/// History is only consulted for the exact slug when no live record holds
/// it; a live collision goes straight to the suffix scan.
pub fn uniquify(
    ctx: &FieldContext<'_>,
    slug: String,
    repository: &dyn SlugRepository,
) -> Result<String> {
    if !ctx.config.unique {
        return Ok(slug);
    }

    let separator = ctx.config.separator.as_str();
    let history = repository.history();
    let exact = ctx.query(SlugMatch::Exact(slug.clone()));

    let collision = repository.first(&exact).map_err(|e| ctx.store_error(e))?;
    if collision.is_none() {
        let historic = match history {
            Some(history) => history
                .slug_exists(&exact)
                .map_err(|e| ctx.store_error(e))?,
            None => false,
        };
        if !historic {
            return Ok(slug);
        }
        debug!("Slug {} is free but was used before", slug);
    }

    let prefix = format!("{}{}", slug, separator);
    let family = repository
        .all(&ctx.query(SlugMatch::Prefix(prefix.clone())))
        .map_err(|e| ctx.store_error(e))?;
    let mut taken: BTreeSet<u32> = family
        .iter()
        .filter_map(|existing| numeric_suffix(&existing.slug, &prefix))
        .collect();

    if let Some(history) = history {
        taken = history
            .taken_numbers(&exact, separator, taken)
            .map_err(|e| ctx.store_error(e))?;
    }

    let free = (1..=MAX_SUFFIX).find(|n| !taken.contains(n)).ok_or_else(|| {
        SlugError::SuffixExhausted {
            record_type: ctx.record_type().to_string(),
            field: ctx.field.to_string(),
            slug: slug.clone(),
            limit: MAX_SUFFIX,
        }
    })?;

    debug!("Slug {} taken, using suffix {}", slug, free);
    Ok(format!("{}{}", prefix, free))
}
