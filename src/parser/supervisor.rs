use super::{Fields, ParserRegistry};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Response field carrying a degraded-parser notice
pub const WARNING_FIELD: &str = "_warning";
/// Warning set when the parser misses its deadline
pub const TIMEOUT_WARNING: &str = "Parser timed out";
/// Warning set when the parser returns an error or panics
pub const FAILURE_WARNING: &str = "Parser failed";

/// What happened to the plugin stage of one request
#[derive(Debug)]
pub enum ParserOutcome {
    /// No parser registered for the extension
    NoParser,
    /// Parser finished in time with these fields
    Completed(Fields),
    /// Deadline elapsed first; the parser's result is discarded
    TimedOut,
    /// Parser returned an error or its task panicked
    Failed(anyhow::Error),
}

impl ParserOutcome {
    /// Warning text this outcome contributes, if any
    pub fn warning(&self) -> Option<&'static str> {
        match self {
            ParserOutcome::NoParser | ParserOutcome::Completed(_) => None,
            ParserOutcome::TimedOut => Some(TIMEOUT_WARNING),
            ParserOutcome::Failed(_) => Some(FAILURE_WARNING),
        }
    }

    /// Fold the outcome into a metadata map
    ///
    /// Parser fields overwrite base fields with the same name.
    pub fn apply(self, metadata: &mut Fields) {
        if let Some(warning) = self.warning() {
            metadata.insert(WARNING_FIELD.to_string(), Value::from(warning));
            return;
        }
        if let ParserOutcome::Completed(fields) = self {
            metadata.extend(fields);
        }
    }
}

/// Runs parsers under a deadline and turns every failure into an outcome
#[derive(Debug, Clone)]
pub struct ParserSupervisor {
    timeout: Duration,
    debug: bool,
}

impl ParserSupervisor {
    pub fn new(timeout: Duration, debug: bool) -> Self {
        Self { timeout, debug }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Look up and run the parser for `extension` against `path`
    ///
    /// The parser runs on its own task so a panic is contained. On timeout the
    /// task is aborted; work already moved to a blocking thread may still finish
    /// in the background, but nobody waits for it.
    pub async fn run(
        &self,
        registry: &ParserRegistry,
        extension: &str,
        path: &Path,
    ) -> ParserOutcome {
        if extension.is_empty() {
            return ParserOutcome::NoParser;
        }
        let Some(parser) = registry.lookup(extension) else {
            return ParserOutcome::NoParser;
        };

        let owned_path = path.to_path_buf();
        let mut task = tokio::spawn(async move { parser.parse(&owned_path).await });

        let outcome = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(Ok(fields))) => ParserOutcome::Completed(fields),
            Ok(Ok(Err(err))) => ParserOutcome::Failed(err),
            Ok(Err(join_err)) => {
                ParserOutcome::Failed(anyhow::anyhow!("parser task failed: {join_err}"))
            }
            Err(_) => {
                task.abort();
                ParserOutcome::TimedOut
            }
        };

        if self.debug {
            match &outcome {
                ParserOutcome::TimedOut => warn!(
                    extension,
                    path = %path.display(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "parser timed out"
                ),
                ParserOutcome::Failed(err) => warn!(
                    extension,
                    path = %path.display(),
                    error = %err,
                    "parser failed"
                ),
                _ => {}
            }
        }

        outcome
    }

    /// Run the parser stage and merge its result into `metadata`
    pub async fn augment(
        &self,
        registry: &ParserRegistry,
        extension: &str,
        path: &Path,
        metadata: &mut Fields,
    ) {
        self.run(registry, extension, path).await.apply(metadata);
    }
}
