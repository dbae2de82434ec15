//! metaserve binary
//!
//! Serves JSON metadata for files under a root directory. Any request with a
//! truthy `meta` query parameter is answered by the metadata handler; everything
//! else gets a JSON 404.
//!
//! ```bash
//! metaserve --root ./photos --bind 127.0.0.1:8080 --debug
//! curl 'http://127.0.0.1:8080/holiday/beach.jpg?meta=1'
//! ```

use anyhow::Context;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use clap::Parser;
use metaserve::server::{DEFAULT_MAX_FILE_SIZE, DEFAULT_PARSER_TIMEOUT_MS};
use metaserve::{ImageParser, MetaHandler, MetaServe, ServerConfig};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "metaserve", version, about = "JSON file metadata over HTTP")]
struct Args {
    /// Directory whose files are described
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Log rejections, resolution errors and parser failures
    #[arg(long)]
    debug: bool,

    /// Parser deadline in milliseconds
    #[arg(long, default_value_t = DEFAULT_PARSER_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Largest file, in bytes, that will be described
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_size: u64,

    /// Do not register the bundled image parser
    #[arg(long)]
    no_image_parser: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ServerConfig::new()
        .debug(args.debug)
        .parser_timeout_ms(args.timeout_ms)
        .max_file_size(args.max_size);

    let mut server = MetaServe::new(config);
    if !args.no_image_parser {
        server.register_many(ImageParser::EXTENSIONS, ImageParser);
    }

    let handler = server
        .handler(&args.root)
        .with_context(|| format!("invalid root directory {}", args.root.display()))?;

    info!(
        root = %handler.root().display(),
        parsers = ?server.registry().registered_extensions(),
        timeout_ms = server.config().parser_timeout.as_millis() as u64,
        max_size = server.config().max_file_size,
        "metadata handler ready"
    );

    let app = Router::new().fallback(serve).with_state(handler);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

/// Offer every request to the metadata handler, 404 whatever it declines
async fn serve(State(handler): State<MetaHandler>, uri: Uri) -> Response {
    match handler.handle(&uri).await.response() {
        Some(response) => response.into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response(),
    }
}
