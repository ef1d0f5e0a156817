pub mod resolver;
pub mod settings;

pub use resolver::{ConfigResolver, DefaultsSource};
pub use settings::{
    AppConfig, Method, Reserved, ReservedFn, SlugConfig, SlugFields, SlugFn, SlugOverrides,
};
