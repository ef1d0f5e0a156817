use std::path::PathBuf;

use once_cell::unsync::OnceCell;
use tracing::debug;

use super::settings::{AppConfig, SlugConfig, SlugOverrides};
use crate::error::{Result, SlugError};

/// Where the default configuration comes from.
#[derive(Debug, Clone)]
pub enum DefaultsSource {
    /// [`SlugConfig::default`]
    Builtin,
    /// Built-in defaults with these overrides applied
    Overrides(SlugOverrides),
    /// The `defaults` section of a YAML config file
    File(PathBuf),
}

/// Merges per-field overrides onto defaults that are loaded once.
#[derive(Debug)]
pub struct ConfigResolver {
    source: DefaultsSource,
    defaults: OnceCell<SlugConfig>,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new(DefaultsSource::Builtin)
    }
}

impl ConfigResolver {
    pub fn new(source: DefaultsSource) -> Self {
        Self {
            source,
            defaults: OnceCell::new(),
        }
    }

    pub fn with_overrides(overrides: SlugOverrides) -> Self {
        Self::new(DefaultsSource::Overrides(overrides))
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(DefaultsSource::File(path.into()))
    }

    /// Defaults, loaded on first call and reused afterwards.
    pub fn defaults(&self) -> Result<&SlugConfig> {
        self.defaults.get_or_try_init(|| {
            let builtin = SlugConfig::default();
            match &self.source {
                DefaultsSource::Builtin => Ok(builtin),
                DefaultsSource::Overrides(overrides) => Ok(builtin.merged(overrides)),
                DefaultsSource::File(path) => {
                    debug!("Loading slug defaults from {:?}", path);
                    let file = AppConfig::from_file(path).map_err(|e| SlugError::Defaults {
                        path: path.clone(),
                        source: e.into(),
                    })?;
                    Ok(builtin.merged(&file.defaults))
                }
            }
        })
    }

    /// Effective configuration for a field declared with `overrides`.
    pub fn resolve(&self, overrides: &SlugOverrides) -> Result<SlugConfig> {
        Ok(self.defaults()?.merged(overrides))
    }
}
