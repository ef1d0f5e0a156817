use std::borrow::Cow;

use super::FieldContext;
use crate::config::Reserved;
use crate::error::{Result, SlugError};

/// Move `slug` off a reserved word by appending `separator + "1"`.
///
/// The altered slug still goes through uniqueness resolution.
pub fn validate(ctx: &FieldContext<'_>, slug: String) -> Result<String> {
    let Some(words) = reserved_words(ctx)? else {
        return Ok(slug);
    };

    if words.iter().any(|word| *word == slug) {
        return Ok(format!("{}{}1", slug, ctx.config.separator));
    }
    Ok(slug)
}

fn reserved_words<'a>(ctx: &FieldContext<'a>) -> Result<Option<Cow<'a, [String]>>> {
    let config = ctx.config;
    match &config.reserved {
        Reserved::None => Ok(None),
        Reserved::Words(words) => Ok(Some(Cow::Borrowed(words.as_slice()))),
        // Evaluated on every call so the list can depend on record state
        Reserved::Dynamic(lookup) => match lookup(ctx.record) {
            Reserved::None => Ok(None),
            Reserved::Words(words) => Ok(Some(Cow::Owned(words))),
            other => Err(invalid(ctx, &other)),
        },
        malformed @ Reserved::Malformed(_) => Err(invalid(ctx, malformed)),
    }
}

fn invalid(ctx: &FieldContext<'_>, found: &Reserved) -> SlugError {
    let found = match found {
        Reserved::Dynamic(_) => "a function".to_string(),
        Reserved::Malformed(value) => value.to_string(),
        other => format!("{:?}", other),
    };
    SlugError::InvalidReserved {
        record_type: ctx.record_type().to_string(),
        field: ctx.field.to_string(),
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SlugConfig, SlugFields};
    use crate::record::Record;
    use crate::store::Document;
    use serde_json::json;

    fn check(reserved: Reserved, doc: &Document, slug: &str) -> Result<String> {
        let config = SlugConfig {
            reserved,
            ..SlugConfig::default()
        };
        validate(&FieldContext::new(doc, "slug", &config), slug.to_string())
    }

    fn doc() -> Document {
        Document::new("page", SlugFields::new().field("slug")).with("slug", "about")
    }

    #[test]
    fn test_no_reserved_words() {
        assert_eq!(check(Reserved::None, &doc(), "admin").unwrap(), "admin");
    }

    #[test]
    fn test_reserved_word_gets_suffix() {
        let reserved = Reserved::words(["admin", "login"]);
        assert_eq!(check(reserved.clone(), &doc(), "admin").unwrap(), "admin-1");
        assert_eq!(check(reserved, &doc(), "administrator").unwrap(), "administrator");
    }

    #[test]
    fn test_reserved_uses_field_separator() {
        let config = SlugConfig {
            reserved: Reserved::words(["admin"]),
            separator: "_".to_string(),
            ..SlugConfig::default()
        };
        let doc = doc();
        let ctx = FieldContext::new(&doc, "slug", &config);
        let slug = validate(&ctx, "admin".to_string()).unwrap();
        assert_eq!(slug, "admin_1");
    }

    #[test]
    fn test_dynamic_reserved_sees_record() {
        let reserved = Reserved::dynamic(|record: &dyn Record| {
            let own = record.attribute("slug").and_then(|v| v.as_str()).unwrap_or_default();
            Reserved::words(["about", "contact"].into_iter().filter(|w| *w != own))
        });

        assert_eq!(check(reserved.clone(), &doc(), "about").unwrap(), "about");
        assert_eq!(check(reserved, &doc(), "contact").unwrap(), "contact-1");
    }

    #[test]
    fn test_dynamic_returning_function_is_rejected() {
        let reserved =
            Reserved::dynamic(|_: &dyn Record| Reserved::dynamic(|_: &dyn Record| Reserved::None));
        let err = check(reserved, &doc(), "about").unwrap_err();
        assert!(matches!(
            err,
            SlugError::InvalidReserved { ref found, .. } if found == "a function"
        ));
    }

    #[test]
    fn test_malformed_reserved_is_rejected() {
        let err = check(Reserved::Malformed(json!("admin")), &doc(), "admin").unwrap_err();
        assert!(matches!(
            err,
            SlugError::InvalidReserved { ref record_type, ref field, .. }
                if record_type == "page" && field == "slug"
        ));
    }
}
