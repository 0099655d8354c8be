// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/bridge/server.rs
// Version: 1.0.0
//
// This file implements the bridge HTTP/WebSocket server. Every upgraded
// connection is checked against the rate limiter and, when allowed, becomes
// one Session task. A small JSON status endpoint reports the live session
// count.
//
// Tree Location:
// - src/bridge/server.rs (bridge server and WebSocket handler)
// - Depends on: axum, tower-http, tokio

use super::rate_limit::RateLimiter;
use super::registry::SessionRegistry;
use super::session::Session;
use crate::config::BridgeConfig;
use axum::{
    Json, Router,
    extract::{
        ConnectInfo, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "poolbridge::bridge::server";

/// Policy violation close status used for rate limited clients
pub const CLOSE_RATE_LIMITED: u16 = 1008;
pub const RATE_LIMIT_REASON: &str = "rate limit exceeded";

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct BridgeState {
    pub config: BridgeConfig,
    pub limiter: Arc<RateLimiter>,
    pub registry: Arc<SessionRegistry>,
}

impl BridgeState {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::new(config.rate_limit)),
            registry: Arc::new(SessionRegistry::new()),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BridgeStatus {
    pub active_sessions: usize,
    pub tracked_sources: usize,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
}

/// Build the bridge router. WebSocket clients may connect on `/` or `/ws`.
pub fn router(state: BridgeState) -> Router {
    Router::new()
        .route("/", get(websocket_handler))
        .route("/ws", get(websocket_handler))
        .route("/status", get(status_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the bridge on an already bound listener until the server fails
pub async fn serve(listener: TcpListener, state: BridgeState) -> std::io::Result<()> {
    let sweeper = state.limiter.spawn_sweeper(state.config.sweep_interval);
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    let result = axum::serve(listener, app).await;
    sweeper.abort();
    result
}

/// Bind the configured address and serve
pub async fn start_bridge_server(config: BridgeConfig) -> std::io::Result<()> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(target: LOG_TARGET, "🌐 Bridge listening on ws://{}", listener.local_addr()?);
    info!(
        target: LOG_TARGET,
        "🛡️ Rate limit: {} connections per {}s per address",
        config.rate_limit.max_requests,
        config.rate_limit.window.as_secs()
    );
    serve(listener, BridgeState::new(config)).await
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<BridgeState>,
) -> Response {
    let source = peer.ip().to_string();
    if !state.limiter.allow(&source) {
        warn!(target: LOG_TARGET, "🚫 Rate limit exceeded for {}", source);
        return ws.on_upgrade(reject_rate_limited);
    }

    debug!(target: LOG_TARGET, "🔌 WebSocket connection request from {}", peer);
    let session = Session::new(peer, Arc::clone(&state.registry), state.config.connect_timeout);
    ws.on_upgrade(move |socket| session.run(socket))
}

async fn reject_rate_limited(mut socket: WebSocket) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: CLOSE_RATE_LIMITED,
            reason: RATE_LIMIT_REASON.into(),
        })))
        .await;
}

async fn status_handler(State(state): State<BridgeState>) -> Json<BridgeStatus> {
    Json(BridgeStatus {
        active_sessions: state.registry.len().await,
        tracked_sources: state.limiter.tracked_sources(),
        rate_limit_max: state.limiter.config().max_requests,
        rate_limit_window_secs: state.limiter.config().window.as_secs(),
    })
}
