//! Chatweave Completion Proxy
//!
//! Forwards chat requests from the canvas client to the upstream language
//! model provider, keeping the API key out of the browser.
//!
//! ## Protocol
//!
//! `POST /api/chat` accepts JSON of the form:
//! ```json
//! { "messages": [{ "role": "user", "content": "hi" }], "model": "sonar-pro" }
//! ```
//! and responds with `{ "response": "<assistant text>" }` on success or
//! `{ "error": "<reason>" }` otherwise.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const DEFAULT_UPSTREAM_URL: &str = "https://api.perplexity.ai/chat/completions";
const DEFAULT_PORT: u16 = 3030;

/// Client-facing model aliases mapped to provider model names.
const MODEL_MAP: &[(&str, &str)] = &[
    ("sonar", "sonar"),
    ("sonar-pro", "sonar-pro"),
    ("sonar-reasoning-pro", "sonar-reasoning-pro"),
    ("sonar-deep-research", "sonar-deep-research"),
];
const DEFAULT_MODEL: &str = "sonar";

/// Shared application state
#[derive(Clone)]
struct AppState {
    /// Provider API key; requests fail with 500 when unset.
    api_key: Option<String>,
    /// Provider chat-completions endpoint.
    upstream_url: String,
    client: reqwest::Client,
}

impl AppState {
    fn from_env() -> Self {
        Self {
            api_key: std::env::var("PERPLEXITY_API_KEY").ok(),
            upstream_url: std::env::var("CHATWEAVE_UPSTREAM_URL")
                .unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string()),
            client: reqwest::Client::new(),
        }
    }
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatweave_server=info,tower_http=info".into()),
        )
        .init();

    let state = AppState::from_env();
    if state.api_key.is_none() {
        warn!("PERPLEXITY_API_KEY is not set; /api/chat will reject requests");
    }

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Chatweave proxy listening on {}", addr);
    info!("Chat endpoint: http://localhost:{}/api/chat", port);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app(state)).await.unwrap();
}

/// Index page
async fn index() -> &'static str {
    "Chatweave Completion Proxy - POST /api/chat"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// Resolve a client-facing model alias; unknown aliases fall back to the
/// default model.
fn map_model(alias: Option<&str>) -> &'static str {
    alias
        .and_then(|alias| MODEL_MAP.iter().find(|(name, _)| *name == alias))
        .map(|(_, provider)| *provider)
        .unwrap_or(DEFAULT_MODEL)
}

/// Proxy one chat request to the provider.
async fn chat(State(state): State<AppState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let messages = match body.get("messages").and_then(Value::as_array) {
        Some(messages) if !messages.is_empty() => messages.clone(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Messages array is required" })),
            );
        }
    };

    let Some(api_key) = state.api_key.as_deref() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "API key not configured" })),
        );
    };

    let model = map_model(body.get("model").and_then(Value::as_str));

    let upstream = state
        .client
        .post(&state.upstream_url)
        .bearer_auth(api_key)
        .json(&json!({ "model": model, "messages": messages }))
        .send()
        .await;

    let response = match upstream {
        Ok(response) => response,
        Err(err) => {
            error!("upstream request failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to generate response" })),
            );
        }
    };

    let upstream_status = response.status();
    if !upstream_status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        error!("upstream returned {upstream_status}: {detail}");
        return (
            StatusCode::from_u16(upstream_status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            Json(json!({ "error": format!("API request failed: {upstream_status}") })),
        );
    }

    match response.json::<Value>().await {
        Ok(data) => {
            let text = data
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str)
                .unwrap_or("No response generated");
            (StatusCode::OK, Json(json!({ "response": text })))
        }
        Err(err) => {
            error!("failed to decode upstream response: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to generate response" })),
            )
        }
    }
}
