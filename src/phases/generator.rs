use std::collections::HashMap;

use super::FieldContext;
use crate::config::{Method, SlugFn};
use crate::engine::EngineCache;
use crate::error::{Result, SlugError};

/// Slug functions addressable by name from configuration files.
pub type MethodRegistry = HashMap<String, SlugFn>;

/// Turn source text into a candidate slug, then apply `max_length`.
pub fn generate(
    ctx: &FieldContext<'_>,
    text: &str,
    engines: &EngineCache,
    methods: &MethodRegistry,
) -> Result<String> {
    let config = ctx.config;
    let slug = match &config.method {
        Method::Engine => engines
            .engine_for(ctx.record, ctx.field, config)
            .slugify(text, &config.separator),
        Method::Custom(f) => f(text, &config.separator),
        Method::Named(name) => {
            let f = methods.get(name).ok_or_else(|| SlugError::UnknownMethod {
                record_type: ctx.record_type().to_string(),
                field: ctx.field.to_string(),
                method: name.clone(),
            })?;
            f(text, &config.separator)
        }
    };

    Ok(match config.max_length {
        Some(max_length) => truncate(
            &slug,
            max_length,
            config.max_length_keep_words,
            &config.separator,
        ),
        None => slug,
    })
}

/// Cut `slug` to at most `max_length` chars.
///
/// With `keep_words` whole separator-delimited words are kept while they fit;
/// if not even the first word fits, the slug is hard-cut.
pub fn truncate(slug: &str, max_length: usize, keep_words: bool, separator: &str) -> String {
    if slug.chars().count() <= max_length {
        return slug.to_string();
    }

    if keep_words && !separator.is_empty() {
        let separator_len = separator.chars().count();
        let mut kept = String::new();
        let mut kept_len = 0;
        for word in slug.split(separator) {
            let joiner = if kept.is_empty() { 0 } else { separator_len };
            let word_len = word.chars().count();
            if kept_len + joiner + word_len > max_length {
                break;
            }
            if joiner > 0 {
                kept.push_str(separator);
            }
            kept.push_str(word);
            kept_len += joiner + word_len;
        }
        if !kept.is_empty() {
            return kept;
        }
    }

    slug.chars().take(max_length).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SlugConfig, SlugFields};
    use crate::store::Document;

    fn generate_with(config: SlugConfig, text: &str) -> Result<String> {
        let doc = Document::new("post", SlugFields::new().field("slug"));
        let ctx = FieldContext::new(&doc, "slug", &config);
        generate(&ctx, text, &EngineCache::new(), &MethodRegistry::new())
    }

    #[test]
    fn test_generate_with_engine() {
        let slug = generate_with(SlugConfig::default(), "Hello World!").unwrap();
        assert_eq!(slug, "hello-world");
    }

    #[test]
    fn test_generate_with_custom_method() {
        let config = SlugConfig {
            method: Method::custom(|text, sep| text.to_uppercase().replace(' ', sep)),
            separator: ".".to_string(),
            ..SlugConfig::default()
        };
        assert_eq!(generate_with(config, "Hello World").unwrap(), "HELLO.WORLD");
    }

    #[test]
    fn test_generate_with_unknown_named_method() {
        let config = SlugConfig {
            method: Method::Named("nope".to_string()),
            ..SlugConfig::default()
        };
        let err = generate_with(config, "Hello").unwrap_err();
        assert!(matches!(
            err,
            SlugError::UnknownMethod { ref record_type, ref field, ref method }
                if record_type == "post" && field == "slug" && method == "nope"
        ));
    }

    #[test]
    fn test_generate_truncates() {
        let config = SlugConfig {
            max_length: Some(5),
            ..SlugConfig::default()
        };
        assert_eq!(generate_with(config, "Hello World").unwrap(), "hello");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("ĉu-ŝi", 3, false, "-"), "ĉu-");
        assert_eq!(truncate("日本語です", 2, false, "-"), "日本");
    }

    #[test]
    fn test_truncate_keep_words() {
        assert_eq!(truncate("hello-big-world", 12, true, "-"), "hello-big");
        assert_eq!(truncate("hello-big-world", 8, true, "-"), "hello");
        assert_eq!(truncate("supercalifragilistic", 5, true, "-"), "super");
        assert_eq!(truncate("short", 10, true, "-"), "short");
    }
}
