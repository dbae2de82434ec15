//! Request handling: turns `?meta=1` requests into JSON metadata responses

mod config;
mod dispatch;
mod error;
mod request;

#[cfg(test)]
mod tests;

pub use config::{ServerConfig, DEFAULT_MAX_FILE_SIZE, DEFAULT_PARSER_TIMEOUT_MS};
pub use dispatch::{Dispatch, MetaResponse};
pub use error::MetaError;
pub use request::{decode_path, is_metadata_request, query_param, query_params, META_PARAM};

use crate::metadata;
use crate::parser::{Fields, MetadataParser, ParserRegistry, ParserSupervisor};
use crate::security::PathResolver;
use axum::http::Uri;
use serde_json::Value;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// A configured metadata server: settings plus the parsers registered on it
///
/// Register parsers first, then build one [`MetaHandler`] per served root.
#[derive(Debug, Default)]
pub struct MetaServe {
    config: ServerConfig,
    registry: ParserRegistry,
}

impl MetaServe {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            registry: ParserRegistry::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    /// Register a parser for an extension; the last registration wins
    pub fn register(&mut self, extension: &str, parser: impl MetadataParser + 'static) {
        self.registry.register(extension, parser);
    }

    /// Register one parser under several extensions
    pub fn register_many<I, S>(&mut self, extensions: I, parser: impl MetadataParser + 'static)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.register_many(extensions, parser);
    }

    /// Build a request handler serving metadata for files under `root`
    ///
    /// The handler takes a snapshot of the registry; parsers registered
    /// afterwards only apply to handlers built later.
    pub fn handler(&self, root: impl AsRef<Path>) -> io::Result<MetaHandler> {
        let resolver = PathResolver::new(root)?;
        let supervisor = ParserSupervisor::new(self.config.parser_timeout, self.config.debug);
        Ok(MetaHandler {
            inner: Arc::new(HandlerState {
                config: self.config.clone(),
                registry: self.registry.clone(),
                resolver,
                supervisor,
            }),
        })
    }
}

#[derive(Debug)]
struct HandlerState {
    config: ServerConfig,
    registry: ParserRegistry,
    resolver: PathResolver,
    supervisor: ParserSupervisor,
}

/// Per-root request handler, cheap to clone and safe to share across tasks
#[derive(Debug, Clone)]
pub struct MetaHandler {
    inner: Arc<HandlerState>,
}

impl MetaHandler {
    pub fn root(&self) -> &Path {
        self.inner.resolver.root()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Offer a request to the handler
    ///
    /// Requests without a truthy `meta` query parameter are
    /// [`Dispatch::Unhandled`]. So are paths that fail to decode, resolve or
    /// stat: the host picks the fallback (usually a 404). Escapes from the
    /// root are rejected with 403 and oversized files with 413.
    pub async fn handle(&self, uri: &Uri) -> Dispatch {
        if !is_metadata_request(uri.query()) {
            return Dispatch::Unhandled;
        }

        match self.build(uri.path()).await {
            Ok(fields) => Dispatch::Handled(MetaResponse::ok(Value::Object(fields))),
            Err(err) => {
                if self.inner.config.debug {
                    match err.status() {
                        Some(status) => warn!(%status, error = %err, "metadata request rejected"),
                        None => debug!(error = %err, "metadata request not handled"),
                    }
                }
                err.into_dispatch()
            }
        }
    }

    /// Resolve, stat and enrich one request path
    async fn build(&self, raw_path: &str) -> Result<Fields, MetaError> {
        let state = &self.inner;

        let request_path = decode_path(raw_path)?;
        let real_path = state.resolver.resolve(&request_path).await?.ensure_inside()?;

        let file = metadata::collect(&real_path, state.config.max_file_size).await?;
        let extension = file.extension.clone();
        let mut fields = file.into_fields();

        state
            .supervisor
            .augment(&state.registry, &extension, &real_path, &mut fields)
            .await;

        Ok(fields)
    }
}
