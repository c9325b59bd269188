//! In-process MCP weather server for integration tests
//!
//! Serves Streamable HTTP on `POST /mcp`, the legacy HTTP+SSE binding on a
//! configurable GET path (with messages POSTed to `/messages`), or both.
//! Tool lists and tool results are scripted through [`MockOptions`], and
//! every route counts its hits.

#![allow(dead_code)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use mcp_e2e::e2e::{NegotiationPolicy, ScenarioSettings};

/// Session id handed out by the Streamable HTTP endpoint.
pub const SESSION_ID: &str = "mock-session";

/// What the mock server exposes.
#[derive(Debug, Clone)]
pub struct MockOptions {
    /// Serve Streamable HTTP on `/mcp`.
    pub streamable: bool,
    /// Serve the legacy SSE stream on this path.
    pub sse_path: Option<&'static str>,
    /// Protocol revision returned from `initialize`.
    pub protocol_version: String,
    /// Answer `initialize` with a JSON-RPC error.
    pub fail_initialize: bool,
    /// Raw value of the `tools` field in `tools/list`.
    pub tools: Value,
    /// Raw `tools/call` results keyed by tool name.
    pub results: HashMap<String, Value>,
}

impl MockOptions {
    /// Streamable HTTP weather server with sensible texts.
    pub fn streamable() -> Self {
        Self {
            streamable: true,
            sse_path: None,
            protocol_version: "2025-06-18".to_string(),
            fail_initialize: false,
            tools: json!([
                { "name": "get_alerts", "description": "Weather alerts for a US state" },
                { "name": "get_forecast", "description": "Forecast for a location" }
            ]),
            results: HashMap::from([
                (
                    "get_alerts".to_string(),
                    text_result("Event: Heat Advisory\nArea: Inland Empire"),
                ),
                (
                    "get_forecast".to_string(),
                    text_result("Tonight:\nTemperature: 55°F\nWind: 5 mph W"),
                ),
            ]),
        }
    }

    /// Legacy-only weather server streaming on `path`.
    pub fn legacy(path: &'static str) -> Self {
        Self {
            streamable: false,
            sse_path: Some(path),
            protocol_version: "2024-11-05".to_string(),
            ..Self::streamable()
        }
    }

    /// Replace one tool's result with a single text item.
    pub fn with_text(mut self, tool: &str, text: &str) -> Self {
        self.results.insert(tool.to_string(), text_result(text));
        self
    }

    /// Replace one tool's raw result.
    pub fn with_result(mut self, tool: &str, result: Value) -> Self {
        self.results.insert(tool.to_string(), result);
        self
    }

    /// Replace the raw `tools` value.
    pub fn with_tools(mut self, tools: Value) -> Self {
        self.tools = tools;
        self
    }
}

/// A `tools/call` result with one text item.
pub fn text_result(text: &str) -> Value {
    json!({ "content": [{ "type": "text", "text": text }] })
}

/// Per-route request counters.
#[derive(Debug, Default)]
pub struct Hits {
    pub streamable_posts: AtomicUsize,
    pub deletes: AtomicUsize,
    pub sse_gets: AtomicUsize,
    pub sse_posts: AtomicUsize,
    pub unrouted: AtomicUsize,
    methods: Mutex<Vec<String>>,
}

impl Hits {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// JSON-RPC methods received on any route, in order.
    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// How many times `method` was received.
    pub fn count(&self, method: &str) -> usize {
        self.methods().iter().filter(|m| m.as_str() == method).count()
    }
}

type EventSender = mpsc::UnboundedSender<Result<Event, Infallible>>;

struct ServerState {
    options: MockOptions,
    hits: Arc<Hits>,
    streams: Mutex<HashMap<String, EventSender>>,
    next_stream: AtomicUsize,
}

/// A running mock server; stops when dropped.
pub struct MockMcpServer {
    pub base: String,
    pub hits: Arc<Hits>,
    task: tokio::task::JoinHandle<()>,
}

impl MockMcpServer {
    /// Bind to an ephemeral port and start serving.
    pub async fn start(options: MockOptions) -> Self {
        let hits = Arc::new(Hits::default());
        let state = Arc::new(ServerState {
            options: options.clone(),
            hits: Arc::clone(&hits),
            streams: Mutex::new(HashMap::new()),
            next_stream: AtomicUsize::new(1),
        });

        let mut router = Router::new();
        match (options.streamable, options.sse_path) {
            (true, Some("/mcp")) => {
                router = router.route(
                    "/mcp",
                    post(streamable_post).delete(streamable_delete).get(sse_get),
                );
            }
            (true, sse_path) => {
                router = router.route("/mcp", post(streamable_post).delete(streamable_delete));
                if let Some(path) = sse_path {
                    router = router.route(path, get(sse_get));
                }
            }
            (false, Some(path)) => router = router.route(path, get(sse_get)),
            (false, None) => {}
        }
        if options.sse_path.is_some() {
            router = router.route("/messages", post(sse_post));
        }
        let app = router.fallback(unrouted).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base: format!("http://{addr}"),
            hits,
            task,
        }
    }

    /// `<base>/mcp`
    pub fn mcp_url(&self) -> String {
        format!("{}/mcp", self.base)
    }

    /// `<base><path>`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

impl Drop for MockMcpServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A URL on a port nothing listens on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/mcp")
}

/// Scenario settings with millisecond pauses.
pub fn fast_settings() -> ScenarioSettings {
    ScenarioSettings {
        policy: NegotiationPolicy {
            streamable_attempts: 3,
            streamable_retry_delay: Duration::from_millis(5),
            sse_retry_delay: Duration::from_millis(5),
        },
        close_delay: Duration::from_millis(5),
    }
}

/// JSON-RPC reply for `request`, or `None` for notifications.
fn respond(state: &ServerState, request: &Value) -> Option<Value> {
    let method = request["method"].as_str().unwrap_or_default().to_string();
    if let Ok(mut methods) = state.hits.methods.lock() {
        methods.push(method.clone());
    }

    let id = request.get("id").filter(|id| !id.is_null())?.clone();
    let options = &state.options;

    let outcome: Result<Value, (i64, String)> = match method.as_str() {
        "initialize" if options.fail_initialize => Err((-32603, "initialization refused".into())),
        "initialize" => Ok(json!({
            "protocolVersion": options.protocol_version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": "mock-weather", "version": "0.0.1" }
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": options.tools })),
        "tools/call" => {
            let name = request["params"]["name"].as_str().unwrap_or_default();
            match options.results.get(name) {
                Some(result) => Ok(result.clone()),
                None => Err((-32602, format!("Unknown tool: {name}"))),
            }
        }
        other => Err((-32601, format!("Method not found: {other}"))),
    };

    Some(match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        }),
    })
}

async fn streamable_post(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> Response {
    state.hits.streamable_posts.fetch_add(1, Ordering::SeqCst);
    let is_initialize = body["method"] == "initialize";
    match respond(&state, &body) {
        None => StatusCode::ACCEPTED.into_response(),
        Some(reply) => {
            let mut response = Json(reply).into_response();
            if is_initialize {
                response
                    .headers_mut()
                    .insert("mcp-session-id", HeaderValue::from_static(SESSION_ID));
            }
            response
        }
    }
}

async fn streamable_delete(State(state): State<Arc<ServerState>>) -> StatusCode {
    state.hits.deletes.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn sse_get(
    State(state): State<Arc<ServerState>>,
) -> Sse<UnboundedReceiverStream<Result<Event, Infallible>>> {
    state.hits.sse_gets.fetch_add(1, Ordering::SeqCst);
    let (tx, rx) = mpsc::unbounded_channel();
    let id = state.next_stream.fetch_add(1, Ordering::SeqCst).to_string();
    let _ = tx.send(Ok(Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={id}"))));
    if let Ok(mut streams) = state.streams.lock() {
        streams.insert(id, tx);
    }
    Sse::new(UnboundedReceiverStream::new(rx))
}

async fn sse_post(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.hits.sse_posts.fetch_add(1, Ordering::SeqCst);
    let sender = query
        .get("sessionId")
        .and_then(|id| state.streams.lock().ok()?.get(id).cloned());
    let Some(sender) = sender else {
        return StatusCode::NOT_FOUND;
    };
    if let Some(reply) = respond(&state, &body) {
        let _ = sender.send(Ok(Event::default().event("message").data(reply.to_string())));
    }
    StatusCode::ACCEPTED
}

async fn unrouted(State(state): State<Arc<ServerState>>) -> StatusCode {
    state.hits.unrouted.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND
}
