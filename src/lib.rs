// Public API exports
pub mod metadata;
pub mod parser;
pub mod security;
pub mod server;

// Re-export main types for convenience
pub use metadata::FileMetadata;
pub use security::{PathResolver, ResolvedPath};

pub use parser::{
    Fields, ImageParser, MetadataParser, ParserOutcome, ParserRegistry, ParserSupervisor,
    FAILURE_WARNING, TIMEOUT_WARNING, WARNING_FIELD,
};

pub use server::{Dispatch, MetaError, MetaHandler, MetaResponse, MetaServe, ServerConfig};
