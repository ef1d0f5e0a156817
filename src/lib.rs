pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod phases;
pub mod record;
pub mod store;

// Re-export main types
pub use config::{
    AppConfig, ConfigResolver, DefaultsSource, Method, Reserved, SlugConfig, SlugFields,
    SlugOverrides,
};
pub use engine::{EngineCache, SlugEngine};
pub use error::{Result, SlugError};
pub use orchestrator::SlugService;
pub use record::Record;

// Re-export storage
pub use store::{
    Document, ExistingSlug, MemoryStore, SlugHistory, SlugMatch, SlugQuery, SlugRepository,
};
