mod image_parser;
mod registry;
mod supervisor;


pub use image_parser::ImageParser;
pub use registry::{normalize_extension, ParserRegistry};
pub use supervisor::{
    ParserOutcome, ParserSupervisor, FAILURE_WARNING, TIMEOUT_WARNING, WARNING_FIELD,
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::path::{Path, PathBuf};

/// Extra metadata fields contributed by a parser, merged into the response in order
pub type Fields = Map<String, Value>;

/// Contract every format parser implements
///
/// Parsers are untrusted with respect to latency: the caller may stop waiting
/// after its deadline and drop the result. Implementations must not rely on
/// running to completion and must not touch shared mutable state.
///
/// A timed-out parser is only cancelled at its next `.await`; synchronous or
/// CPU-bound work keeps its runtime worker busy past the deadline, so move it
/// to `tokio::task::spawn_blocking` as [`ImageParser`] does.
#[async_trait]
pub trait MetadataParser: Send + Sync {
    /// Extract format-specific fields from the file at `path`
    ///
    /// # Arguments
    /// * `path` - Canonical absolute path of a file inside the served root
    async fn parse(&self, path: &Path) -> anyhow::Result<Fields>;
}

/// Plain async closures are parsers too
///
/// # Example
/// ```ignore
/// server.register("txt", |path: PathBuf| async move {
///     let text = tokio::fs::read_to_string(&path).await?;
///     Ok(Fields::from_iter([("lines".into(), text.lines().count().into())]))
/// });
/// ```
#[async_trait]
impl<F, Fut> MetadataParser for F
where
    F: Fn(PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Fields>> + Send + 'static,
{
    async fn parse(&self, path: &Path) -> anyhow::Result<Fields> {
        self(path.to_path_buf()).await
    }
}
