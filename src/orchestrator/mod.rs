pub mod policy;
pub mod service;

pub use policy::needs_slugging;
pub use service::SlugService;
