pub mod local;

pub use local::{DiscoveredDocuments, LocalSource, SourceFailure};
