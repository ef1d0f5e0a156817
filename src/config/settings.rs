use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::record::Record;

/// Caller-supplied slug function: `(source text, separator) -> slug`.
pub type SlugFn = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Reserved-word lookup evaluated against the record at validation time.
pub type ReservedFn = Arc<dyn Fn(&dyn Record) -> Reserved + Send + Sync>;

// ============================================================================
// Method
// ============================================================================

/// How a field turns source text into a slug.
#[derive(Clone, Default)]
pub enum Method {
    /// The cached transliteration engine for the record type and field
    #[default]
    Engine,
    /// A function registered on the service under this name
    Named(String),
    /// A function that replaces the engine entirely
    Custom(SlugFn),
}

impl Method {
    /// Wrap a closure as a custom slug method.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        Method::Custom(Arc::new(f))
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Engine => f.write_str("Engine"),
            Method::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Method::Custom(_) => f.write_str("Custom(<function>)"),
        }
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(deserializer)? {
            Some(name) => Method::Named(name),
            None => Method::Engine,
        })
    }
}

// ============================================================================
// Reserved words
// ============================================================================

/// Words a generated slug must not equal.
#[derive(Clone, Default)]
pub enum Reserved {
    /// No check
    #[default]
    None,
    /// A fixed list
    Words(Vec<String>),
    /// Computed from the record on every validation
    Dynamic(ReservedFn),
    /// A configured value that is neither null nor a list of strings
    Malformed(Value),
}

impl Reserved {
    /// Fixed reserved list.
    pub fn words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Reserved::Words(words.into_iter().map(Into::into).collect())
    }

    /// Reserved list computed from the record.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&dyn Record) -> Reserved + Send + Sync + 'static,
    {
        Reserved::Dynamic(Arc::new(f))
    }
}

impl fmt::Debug for Reserved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reserved::None => f.write_str("None"),
            Reserved::Words(words) => f.debug_tuple("Words").field(words).finish(),
            Reserved::Dynamic(_) => f.write_str("Dynamic(<function>)"),
            Reserved::Malformed(value) => f.debug_tuple("Malformed").field(value).finish(),
        }
    }
}

impl<'de> Deserialize<'de> for Reserved {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Null => Reserved::None,
            Value::Array(items) if items.iter().all(Value::is_string) => Reserved::Words(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            // Shape errors surface when the field is validated
            other => Reserved::Malformed(other),
        })
    }
}

// ============================================================================
// Effective configuration
// ============================================================================

/// Fully merged configuration for one sluggable field.
#[derive(Debug, Clone)]
pub struct SlugConfig {
    /// Fields concatenated into the source text; `None` uses the display string
    pub source: Option<Vec<String>>,
    /// Separator inside slugs and before numeric suffixes
    pub separator: String,
    /// Maximum generated slug length in chars (suffix not counted)
    pub max_length: Option<usize>,
    /// Truncate at separator boundaries instead of mid-word
    pub max_length_keep_words: bool,
    /// Slug function
    pub method: Method,
    /// Enforce uniqueness against other records
    pub unique: bool,
    /// Re-slug on every save, not just creation
    pub on_update: bool,
    /// Reserved words
    pub reserved: Reserved,
    /// Count soft-deleted records as collisions
    pub include_trashed: bool,
    /// Extra replacements applied before transliteration
    pub engine_rules: BTreeMap<String, String>,
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            source: None,
            separator: "-".to_string(),
            max_length: None,
            max_length_keep_words: false,
            method: Method::Engine,
            unique: true,
            on_update: false,
            reserved: Reserved::None,
            include_trashed: false,
            engine_rules: BTreeMap::new(),
        }
    }
}

impl SlugConfig {
    /// Shallow merge: every key present in `overrides` replaces ours.
    pub fn merged(&self, overrides: &SlugOverrides) -> SlugConfig {
        SlugConfig {
            source: overrides
                .source
                .clone()
                .unwrap_or_else(|| self.source.clone()),
            separator: overrides
                .separator
                .clone()
                .unwrap_or_else(|| self.separator.clone()),
            max_length: overrides.max_length.unwrap_or(self.max_length),
            max_length_keep_words: overrides
                .max_length_keep_words
                .unwrap_or(self.max_length_keep_words),
            method: overrides
                .method
                .clone()
                .unwrap_or_else(|| self.method.clone()),
            unique: overrides.unique.unwrap_or(self.unique),
            on_update: overrides.on_update.unwrap_or(self.on_update),
            reserved: overrides
                .reserved
                .clone()
                .unwrap_or_else(|| self.reserved.clone()),
            include_trashed: overrides.include_trashed.unwrap_or(self.include_trashed),
            engine_rules: overrides
                .engine_rules
                .clone()
                .unwrap_or_else(|| self.engine_rules.clone()),
        }
    }
}

// ============================================================================
// Overrides
// ============================================================================

/// Partial configuration. `None` means "keep the default"; for nullable keys
/// `Some(None)` is an explicit null that replaces the default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlugOverrides {
    #[serde(deserialize_with = "source_field")]
    pub source: Option<Option<Vec<String>>>,
    pub separator: Option<String>,
    #[serde(deserialize_with = "present")]
    pub max_length: Option<Option<usize>>,
    pub max_length_keep_words: Option<bool>,
    #[serde(deserialize_with = "present")]
    pub method: Option<Method>,
    pub unique: Option<bool>,
    pub on_update: Option<bool>,
    #[serde(deserialize_with = "present")]
    pub reserved: Option<Reserved>,
    pub include_trashed: Option<bool>,
    pub engine_rules: Option<BTreeMap<String, String>>,
}

impl SlugOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug from a single field.
    pub fn source(self, field: impl Into<String>) -> Self {
        self.sources([field])
    }

    /// Slug from several fields, joined with spaces in this order.
    pub fn sources<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source = Some(Some(fields.into_iter().map(Into::into).collect()));
        self
    }

    /// Slug from the record's display string.
    pub fn display_source(mut self) -> Self {
        self.source = Some(None);
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(Some(max_length));
        self
    }

    pub fn keep_words(mut self, keep: bool) -> Self {
        self.max_length_keep_words = Some(keep);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = Some(unique);
        self
    }

    pub fn on_update(mut self, on_update: bool) -> Self {
        self.on_update = Some(on_update);
        self
    }

    pub fn reserved(mut self, reserved: Reserved) -> Self {
        self.reserved = Some(reserved);
        self
    }

    pub fn include_trashed(mut self, include: bool) -> Self {
        self.include_trashed = Some(include);
        self
    }

    /// Add a replacement applied before transliteration (e.g. `"&"` -> `"and"`).
    pub fn engine_rule(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.engine_rules
            .get_or_insert_with(BTreeMap::new)
            .insert(from.into(), to.into());
        self
    }
}

/// Deserialize a present key, keeping an explicit `null` distinct from absence.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn source_field<'de, D>(deserializer: D) -> Result<Option<Option<Vec<String>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<OneOrMany>::deserialize(deserializer)?;
    Ok(Some(raw.map(|fields| match fields {
        OneOrMany::One(field) => vec![field],
        OneOrMany::Many(fields) => fields,
    })))
}

// ============================================================================
// Field declarations
// ============================================================================

/// Sluggable fields declared by a record type, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct SlugFields {
    fields: Vec<(String, SlugOverrides)>,
}

impl SlugFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field that uses the default configuration.
    pub fn field(self, name: impl Into<String>) -> Self {
        self.with(name, SlugOverrides::default())
    }

    /// Declare a field with overrides. Redeclaring a field replaces it.
    pub fn with(mut self, name: impl Into<String>, overrides: SlugOverrides) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = overrides,
            None => self.fields.push((name, overrides)),
        }
        self
    }

    /// Overrides declared for `name`.
    pub fn get(&self, name: &str) -> Option<&SlugOverrides> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, overrides)| overrides)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SlugOverrides)> {
        self.fields
            .iter()
            .map(|(name, overrides)| (name.as_str(), overrides))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl<S: Into<String>> FromIterator<S> for SlugFields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter()
            .fold(SlugFields::new(), |fields, name| fields.field(name))
    }
}

impl<'de> Deserialize<'de> for SlugFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Declaration {
            One(String),
            Names(Vec<String>),
            Configured(BTreeMap<String, SlugOverrides>),
        }

        Ok(match Declaration::deserialize(deserializer)? {
            Declaration::One(name) => SlugFields::new().field(name),
            Declaration::Names(names) => names.into_iter().collect(),
            Declaration::Configured(map) => map
                .into_iter()
                .fold(SlugFields::new(), |fields, (name, overrides)| {
                    fields.with(name, overrides)
                }),
        })
    }
}

// ============================================================================
// Application configuration file
// ============================================================================

/// Contents of a `slugsmith` YAML configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Overrides applied on top of the built-in defaults
    pub defaults: SlugOverrides,
    /// Sluggable field declarations per record type
    pub models: BTreeMap<String, SlugFields>,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults if file doesn't exist
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) if p.exists() => Self::from_file(p),
            _ => Ok(Self::default()),
        }
    }

    /// `~/.config/slugsmith/config.yaml` (platform equivalent)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("slugsmith")
            .join("config.yaml")
    }

    /// Declared fields for a record type (empty when undeclared)
    pub fn fields_for(&self, record_type: &str) -> SlugFields {
        self.models.get(record_type).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SlugConfig::default();
        assert_eq!(config.source, None);
        assert_eq!(config.separator, "-");
        assert_eq!(config.max_length, None);
        assert!(config.unique);
        assert!(!config.on_update);
        assert!(matches!(config.method, Method::Engine));
        assert!(matches!(config.reserved, Reserved::None));
    }

    #[test]
    fn test_merge_replaces_only_present_keys() {
        let base = SlugConfig {
            max_length: Some(20),
            ..SlugConfig::default()
        };
        let merged = base.merged(&SlugOverrides::new().source("title").separator("_"));

        assert_eq!(merged.source, Some(vec!["title".to_string()]));
        assert_eq!(merged.separator, "_");
        assert_eq!(merged.max_length, Some(20));
        assert!(merged.unique);
    }

    #[test]
    fn test_explicit_null_replaces_default() {
        let base = SlugConfig {
            source: Some(vec!["title".to_string()]),
            max_length: Some(20),
            ..SlugConfig::default()
        };
        let overrides: SlugOverrides =
            serde_yaml::from_str("source: null\nmax_length: null\n").unwrap();
        let merged = base.merged(&overrides);

        assert_eq!(merged.source, None);
        assert_eq!(merged.max_length, None);
    }

    #[test]
    fn test_single_source_normalizes_to_list() {
        let overrides: SlugOverrides = serde_yaml::from_str("source: title").unwrap();
        assert_eq!(overrides.source, Some(Some(vec!["title".to_string()])));

        let overrides: SlugOverrides =
            serde_yaml::from_str("source: [first_name, last_name]").unwrap();
        assert_eq!(
            overrides.source,
            Some(Some(vec!["first_name".to_string(), "last_name".to_string()]))
        );
    }

    #[test]
    fn test_reserved_shapes() {
        let overrides: SlugOverrides = serde_yaml::from_str("reserved: [admin, new]").unwrap();
        assert!(matches!(overrides.reserved, Some(Reserved::Words(ref w)) if w.len() == 2));

        let overrides: SlugOverrides = serde_yaml::from_str("reserved: null").unwrap();
        assert!(matches!(overrides.reserved, Some(Reserved::None)));

        let overrides: SlugOverrides = serde_yaml::from_str("reserved: admin").unwrap();
        assert!(matches!(overrides.reserved, Some(Reserved::Malformed(_))));
    }

    #[test]
    fn test_method_from_yaml() {
        let overrides: SlugOverrides = serde_yaml::from_str("method: ascii_upper").unwrap();
        assert!(matches!(overrides.method, Some(Method::Named(ref n)) if n == "ascii_upper"));

        let overrides: SlugOverrides = serde_yaml::from_str("method: null").unwrap();
        assert!(matches!(overrides.method, Some(Method::Engine)));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let overrides: SlugOverrides =
            serde_yaml::from_str("separator: _\nflavour: vanilla\n").unwrap();
        assert_eq!(overrides.separator.as_deref(), Some("_"));
    }

    #[test]
    fn test_slug_fields_declaration_forms() {
        let fields: SlugFields = serde_yaml::from_str("[slug, handle]").unwrap();
        let names: Vec<_> = fields.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["slug", "handle"]);

        let fields: SlugFields =
            serde_yaml::from_str("slug:\n  source: title\n  on_update: true\n").unwrap();
        let overrides = fields.get("slug").unwrap();
        assert_eq!(overrides.on_update, Some(true));
    }

    #[test]
    fn test_redeclared_field_replaces_overrides() {
        let fields = SlugFields::new()
            .with("slug", SlugOverrides::new().separator("_"))
            .with("slug", SlugOverrides::new().separator("."));

        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("slug").unwrap().separator.as_deref(), Some("."));
    }

    #[test]
    fn test_app_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "defaults:\n  separator: _\nmodels:\n  post:\n    slug:\n      source: title\n",
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.defaults.separator.as_deref(), Some("_"));
        assert_eq!(config.fields_for("post").len(), 1);
        assert!(config.fields_for("comment").is_empty());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        let config = AppConfig::load_or_default(Some(missing.as_path())).unwrap();
        assert!(config.models.is_empty());
    }
}
