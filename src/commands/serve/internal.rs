//! Routes and handlers for the API server.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::http;
use super::ServeOptions;
use askql::llm::{GroqClient, LlmSettings};
use askql::store::{ColumnDef, Store, Value};
use askql::Config;

/// Environment override for the bearer token on non-loopback binds.
const TOKEN_VAR: &str = "ASKQL_SERVE_TOKEN";

// === Server state ===

/// Shared across request threads. Everything here is set once at startup;
/// the request counter is the only mutable piece.
struct ServerState {
    start_time: Instant,
    version: String,
    token: String,
    settings: LlmSettings,
    store: Store,
    requests: AtomicU64,
}

impl ServerState {
    fn new(token: String, settings: LlmSettings, store: Store) -> Self {
        ServerState {
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            token,
            settings,
            store,
            requests: AtomicU64::new(0),
        }
    }

    fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

// === API types ===

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_secs: u64,
    requests: u64,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    /// Execute the generated SQL (default) or just return it.
    #[serde(default = "default_execute")]
    execute: bool,
    /// Per-request model override.
    model: Option<String>,
}

fn default_execute() -> bool {
    true
}

#[derive(Deserialize)]
struct SqlRequest {
    sql: String,
}

#[derive(Deserialize)]
struct CreateTableRequest {
    name: String,
    columns: Vec<ColumnDef>,
}

#[derive(Deserialize)]
struct InsertRequest {
    table: String,
    values: serde_json::Map<String, JsonValue>,
}

// === Helpers ===

/// Random 32-byte hex token.
fn generate_token() -> String {
    (0..32)
        .map(|_| format!("{:02x}", fastrand::u8(..)))
        .collect()
}

fn check_auth(request: &http::Request, token: &str) -> bool {
    request
        .header("Authorization")
        .map(|h| h == format!("Bearer {token}"))
        .unwrap_or(false)
}

fn with_security_headers(response: http::Response) -> http::Response {
    response
        .with_header("X-Content-Type-Options", "nosniff")
        .with_header("X-Frame-Options", "DENY")
}

fn json_error(status: u16, message: &str) -> http::Response {
    http::Response::json(status, &serde_json::json!({"error": message}))
}

/// Best-effort history write. A failed write is logged to stderr and never
/// fails the request that produced it.
fn record_outcome(store: &Store, question: &str, sql: &str, ok: bool, detail: &str) {
    if let Err(e) = store.record_ask(question, sql, ok, detail) {
        eprintln!("History write failed: {e:#}");
    }
}

/// Parse a JSON request body, mapping every failure to a 400.
fn parse_body<T: serde::de::DeserializeOwned>(
    request: &http::Request,
) -> Result<T, http::Response> {
    if request.body.is_empty() {
        return Err(json_error(400, "Missing request body"));
    }
    serde_json::from_slice(&request.body)
        .map_err(|e| json_error(400, &format!("Invalid JSON: {e}")))
}

// === Handlers ===

fn route_request(
    request: &http::Request,
    state: &ServerState,
    require_auth: bool,
) -> http::Response {
    state.requests.fetch_add(1, Ordering::Relaxed);
    let response = match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => handle_health(state),
        ("GET", "/api/tables") => handle_tables(request, state, require_auth),
        ("POST", "/api/ask") => handle_ask(request, state, require_auth),
        ("POST", "/api/sql") => handle_sql(request, state, require_auth),
        ("POST", "/api/tables") => handle_create_table(request, state, require_auth),
        ("POST", "/api/rows") => handle_insert(request, state, require_auth),
        _ => json_error(404, "Not found"),
    };
    with_security_headers(response)
}

/// GET /health. Always open, even on authed binds.
fn handle_health(state: &ServerState) -> http::Response {
    http::Response::json(
        200,
        &HealthResponse {
            status: "ok".to_string(),
            version: state.version.clone(),
            uptime_secs: state.uptime_secs(),
            requests: state.requests.load(Ordering::Relaxed),
        },
    )
}

/// GET /api/tables: visible tables with their columns.
fn handle_tables(
    request: &http::Request,
    state: &ServerState,
    require_auth: bool,
) -> http::Response {
    if require_auth && !check_auth(request, &state.token) {
        return json_error(401, "Unauthorized");
    }
    match state.store.tables_with_columns() {
        Ok(tables) => http::Response::json(
            200,
            &serde_json::json!({"count": tables.len(), "tables": tables}),
        ),
        Err(e) => json_error(500, &format!("{e:#}")),
    }
}

/// POST /api/ask: English question in, generated SQL (and rows) out.
fn handle_ask(request: &http::Request, state: &ServerState, require_auth: bool) -> http::Response {
    if require_auth && !check_auth(request, &state.token) {
        return json_error(401, "Unauthorized");
    }
    let body: AskRequest = match parse_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };
    if body.question.trim().is_empty() {
        return json_error(400, "Missing question");
    }

    let mut settings = state.settings.clone();
    if let Some(model) = body.model {
        settings.model = model;
    }
    let client = match GroqClient::new(settings) {
        Ok(client) => client,
        Err(e) => return json_error(500, &format!("{e:#}")),
    };
    let schema = match state.store.schema_summary() {
        Ok(schema) => schema,
        Err(e) => return json_error(500, &format!("{e:#}")),
    };
    let sql = match client.text_to_sql(&body.question, &schema) {
        Ok(sql) => sql,
        Err(e) => return json_error(500, &format!("{e:#}")),
    };

    if !body.execute {
        record_outcome(&state.store, &body.question, &sql, true, "not executed");
        return http::Response::json(
            200,
            &serde_json::json!({"question": body.question, "sql": sql}),
        );
    }

    match state.store.run_query(&sql) {
        Ok(output) => {
            let detail = format!("{} row(s)", output.rows.len());
            record_outcome(&state.store, &body.question, &sql, true, &detail);
            http::Response::json(
                200,
                &serde_json::json!({
                    "question": body.question,
                    "sql": sql,
                    "columns": output.columns,
                    "rows": output.rows,
                }),
            )
        }
        // The generated SQL goes back with the error so the caller can see
        // what the model produced
        Err(e) => {
            record_outcome(&state.store, &body.question, &sql, false, &format!("{e:#}"));
            http::Response::json(
                400,
                &serde_json::json!({"error": format!("{e:#}"), "sql": sql}),
            )
        }
    }
}

/// POST /api/sql: run a statement verbatim.
fn handle_sql(request: &http::Request, state: &ServerState, require_auth: bool) -> http::Response {
    if require_auth && !check_auth(request, &state.token) {
        return json_error(401, "Unauthorized");
    }
    let body: SqlRequest = match parse_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };
    if body.sql.trim().is_empty() {
        return json_error(400, "Missing sql");
    }
    match state.store.run_query(body.sql.trim()) {
        Ok(output) => http::Response::json(
            200,
            &serde_json::json!({"columns": output.columns, "rows": output.rows}),
        ),
        Err(e) => json_error(400, &format!("{e:#}")),
    }
}

/// POST /api/tables: create a table.
fn handle_create_table(
    request: &http::Request,
    state: &ServerState,
    require_auth: bool,
) -> http::Response {
    if require_auth && !check_auth(request, &state.token) {
        return json_error(401, "Unauthorized");
    }
    let body: CreateTableRequest = match parse_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };
    match state.store.create_table(&body.name, &body.columns) {
        Ok(message) => http::Response::json(200, &serde_json::json!({"message": message})),
        Err(e) => json_error(400, &format!("{e:#}")),
    }
}

/// POST /api/rows: insert one row.
fn handle_insert(
    request: &http::Request,
    state: &ServerState,
    require_auth: bool,
) -> http::Response {
    if require_auth && !check_auth(request, &state.token) {
        return json_error(401, "Unauthorized");
    }
    let body: InsertRequest = match parse_body(request) {
        Ok(body) => body,
        Err(response) => return response,
    };
    let values = match json_row(&state.store, &body.table, &body.values) {
        Ok(values) => values,
        Err(e) => return json_error(400, &format!("{e:#}")),
    };
    match state.store.insert_row(&body.table, &values) {
        Ok(message) => http::Response::json(200, &serde_json::json!({"message": message})),
        Err(e) => json_error(400, &format!("{e:#}")),
    }
}

/// Convert a JSON object into insertable values. Numbers and null pass
/// through; strings are coerced by the destination column's declared type.
fn json_row(
    store: &Store,
    table: &str,
    values: &serde_json::Map<String, JsonValue>,
) -> Result<Vec<(String, Value)>> {
    let declared = store.table_columns(table)?;
    values
        .iter()
        .map(|(col, raw)| {
            let value = match raw {
                JsonValue::Null => Value::Null,
                JsonValue::Bool(b) => Value::Integer(*b as i64),
                JsonValue::Number(n) => match n.as_i64() {
                    Some(i) => Value::Integer(i),
                    None => Value::Real(n.as_f64().unwrap_or(0.0)),
                },
                JsonValue::String(s) => {
                    let decl = declared
                        .iter()
                        .find(|c| c.name.eq_ignore_ascii_case(col))
                        .map(|c| c.decl_type.as_str())
                        .unwrap_or("TEXT");
                    Value::coerce(s, decl)?
                }
                _ => anyhow::bail!("Column '{col}' has a non-scalar value"),
            };
            Ok((col.clone(), value))
        })
        .collect()
}

// === Transport ===

fn handle_connection(stream: &mut (impl Read + Write), state: &ServerState, require_auth: bool) {
    let request = match http::read_request(stream) {
        http::ReadOutcome::Request(request) => request,
        http::ReadOutcome::Malformed(msg) => {
            http::write_response(stream, &with_security_headers(json_error(400, &msg)));
            return;
        }
        http::ReadOutcome::Closed => return,
    };
    let response = route_request(&request, state, require_auth);
    http::write_response(stream, &response);
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "127.0.0.1" | "localhost" | "::1")
}

/// Bind and serve forever.
pub fn run_server(options: ServeOptions, config: &Config, store: Store) -> Result<()> {
    let loopback = is_loopback(&options.host);
    let require_auth = !loopback;
    let token = if loopback {
        String::new()
    } else {
        std::env::var(TOKEN_VAR)
            .ok()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(generate_token)
    };

    if require_auth {
        eprintln!(
            "WARNING: Binding to {} exposes the server to the network.",
            options.host
        );
        eprintln!("  The server speaks plain HTTP. Put a TLS proxy in front for anything real.");
        eprintln!("  Requests must send: Authorization: Bearer {token}");
    }

    let state = Arc::new(ServerState::new(token, config.llm_settings(), store));
    let addr = format!("{}:{}", options.host, options.port);
    let listener = TcpListener::bind(&addr).with_context(|| format!("Failed to bind {addr}"))?;

    println!("🚀 askql API listening on http://{addr}");
    println!("   Database: {}", state.store.path().display());
    println!("   Model: {}", state.settings.model);
    println!("   Try: curl -s http://{addr}/health");
    println!("   Press Ctrl+C to stop\n");

    accept_loop(listener, state, require_auth)
}

fn accept_loop(listener: TcpListener, state: Arc<ServerState>, require_auth: bool) -> ! {
    for stream in listener.incoming() {
        match stream {
            Ok(mut stream) => {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    handle_connection(&mut stream, &state, require_auth);
                    let _ = stream.shutdown(Shutdown::Write);
                });
            }
            Err(e) => eprintln!("Accept error: {e}"),
        }
    }
    std::process::exit(0);
}
