//! HTTP JSON API exposing the same operations as the CLI.
//!
//! Design: blocking HTTP/1.1 microserver (no async/tokio). Thread per
//! connection, one request per connection.
//!
//! Auth model:
//! - Loopback binds (the default) are open.
//! - Any other bind requires a bearer token, generated at startup unless
//!   `ASKQL_SERVE_TOKEN` is set.

mod http;
mod internal;

use anyhow::Result;
use std::path::Path;

/// Options for the serve command
pub struct ServeOptions {
    /// Host to bind to (default: 127.0.0.1)
    pub host: String,
    /// Port to bind to (default: 7432)
    pub port: u16,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7432,
        }
    }
}

/// Start the API server. Blocks until killed.
pub fn execute(options: ServeOptions, db: Option<&Path>, config: Option<&Path>) -> Result<()> {
    let (config, store) = super::open_store(db, config)?;
    store.ensure_default_schema()?;
    internal::run_server(options, &config, store)
}
