pub mod fabric;
pub mod resolver;
pub mod source;
pub mod vanilla;

pub use resolver::ManifestResolver;
pub use source::{ManifestSource, Source};
