// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/bridge/session.rs
// Version: 1.0.0
//
// This file implements one bridge session: a WebSocket client paired with at
// most one pool connection. The session task waits on both sides at once,
// wraps pool lines into pool_data frames and forwards mining_submit payloads
// to the pool.
//
// Tree Location:
// - src/bridge/session.rs (per-client session task)
// - Depends on: axum, futures-util, tokio, crate::pool

use super::messages::{submit_payload_line, ClientMessage, ServerMessage};
use super::registry::{SessionId, SessionInfo, SessionRegistry};
use crate::error::BridgeError;
use crate::pool::{PoolConnection, PoolEndpoint, PoolEvent};
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "poolbridge::bridge::session";

/// Normal closure status sent when a session ends
const CLOSE_NORMAL: u16 = 1000;

/// How long to wait for the client's close reply
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connecting, Active) | (Connecting, Closing) | (Connecting, Closed) | (Active, Closing) | (Closing, Closed)
        )
    }
}

type ClientSink = SplitSink<WebSocket, Message>;
type ClientStream = SplitStream<WebSocket>;

enum Step {
    Client(Option<Result<Message, axum::Error>>),
    Pool(Option<PoolEvent>),
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

pub struct Session {
    id: SessionId,
    peer: SocketAddr,
    state: SessionState,
    pool: Option<PoolConnection>,
    registry: Arc<SessionRegistry>,
    connect_timeout: Duration,
}

impl Session {
    pub fn new(peer: SocketAddr, registry: Arc<SessionRegistry>, connect_timeout: Duration) -> Self {
        Self {
            id: SessionId::generate(),
            peer,
            state: SessionState::Connecting,
            pool: None,
            registry,
            connect_timeout,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) -> Result<(), BridgeError> {
        if !self.state.can_transition_to(next) {
            return Err(BridgeError::InvalidTransition { from: self.state, to: next });
        }
        debug!(target: LOG_TARGET, "Session {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Drive the session until either side closes
    pub async fn run(mut self, socket: WebSocket) {
        info!(target: LOG_TARGET, "🔌 Session {} opened for {}", self.id, self.peer);
        let (mut sink, mut stream) = socket.split();
        let mut pool_events: Option<mpsc::Receiver<PoolEvent>> = None;

        loop {
            let step = tokio::select! {
                incoming = stream.next() => Step::Client(incoming),
                event = next_pool_event(&mut pool_events) => Step::Pool(event),
            };

            let flow = match step {
                Step::Client(Some(Ok(Message::Text(text)))) => {
                    self.on_client_text(&text, &mut sink, &mut stream, &mut pool_events).await
                }
                Step::Client(Some(Ok(Message::Binary(bytes)))) => match String::from_utf8(bytes) {
                    Ok(text) => self.on_client_text(&text, &mut sink, &mut stream, &mut pool_events).await,
                    Err(_) => send_frame(&mut sink, ServerMessage::error("Binary frames must be UTF-8 JSON")).await,
                },
                Step::Client(Some(Ok(Message::Close(_)))) | Step::Client(None) => {
                    debug!(target: LOG_TARGET, "Session {}: client closed", self.id);
                    Flow::Close
                }
                Step::Client(Some(Ok(_))) => Flow::Continue,
                Step::Client(Some(Err(e))) => {
                    warn!(target: LOG_TARGET, "Session {}: client transport error: {}", self.id, e);
                    Flow::Close
                }
                Step::Pool(Some(PoolEvent::Data(line))) => {
                    send_frame(&mut sink, ServerMessage::PoolData { data: line }).await
                }
                Step::Pool(Some(PoolEvent::Error(e))) => {
                    warn!(target: LOG_TARGET, "Session {}: pool error: {}", self.id, e);
                    send_frame(&mut sink, ServerMessage::error(format!("Pool connection error: {}", e))).await;
                    Flow::Close
                }
                Step::Pool(Some(PoolEvent::Closed)) | Step::Pool(None) => {
                    info!(target: LOG_TARGET, "Session {}: pool closed the connection", self.id);
                    send_frame(&mut sink, ServerMessage::error("Pool connection closed")).await;
                    Flow::Close
                }
            };

            if flow == Flow::Close {
                break;
            }
        }

        self.teardown().await;
        let _ = sink
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_NORMAL,
                reason: "session closed".into(),
            })))
            .await;
        // Read until the client answers the close so unread frames do not reset the socket
        let _ = tokio::time::timeout(CLOSE_GRACE, async {
            while let Some(Ok(_)) = stream.next().await {}
        })
        .await;
        let _ = sink.close().await;
        info!(target: LOG_TARGET, "🔌 Session {} closed", self.id);
    }

    async fn on_client_text(
        &mut self,
        text: &str,
        sink: &mut ClientSink,
        stream: &mut ClientStream,
        pool_events: &mut Option<mpsc::Receiver<PoolEvent>>,
    ) -> Flow {
        match ClientMessage::parse(text) {
            Ok(ClientMessage::Connect { pool }) => self.on_connect(&pool, sink, stream, pool_events).await,
            Ok(ClientMessage::MiningSubmit { data }) => self.on_submit(&data, sink).await,
            Err(e) => {
                debug!(target: LOG_TARGET, "Session {}: malformed frame: {}", self.id, e);
                send_frame(sink, ServerMessage::error(BridgeError::Parse(e).to_string())).await
            }
        }
    }

    async fn on_connect(
        &mut self,
        pool: &str,
        sink: &mut ClientSink,
        stream: &mut ClientStream,
        pool_events: &mut Option<mpsc::Receiver<PoolEvent>>,
    ) -> Flow {
        if self.state != SessionState::Connecting || self.pool.is_some() {
            return send_frame(sink, ServerMessage::error(BridgeError::AlreadyConnected.to_string())).await;
        }

        let endpoint: PoolEndpoint = match pool.parse() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                warn!(target: LOG_TARGET, "Session {}: rejected pool URL {:?}", self.id, pool);
                send_frame(sink, ServerMessage::error(e.to_string())).await;
                let _ = self.transition(SessionState::Closed);
                return Flow::Close;
            }
        };

        // Keep serving the client while the pool connects, a close abandons the attempt
        let connecting = PoolConnection::connect(&endpoint, self.connect_timeout);
        tokio::pin!(connecting);
        let connected = loop {
            tokio::select! {
                result = &mut connecting => break result,
                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Text(_))) | Some(Ok(Message::Binary(_))) => {
                        let busy = ServerMessage::error(BridgeError::Connecting.to_string());
                        if send_frame(sink, busy).await == Flow::Close {
                            return Flow::Close;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        debug!(target: LOG_TARGET, "Session {}: client left while connecting to {}", self.id, endpoint);
                        return Flow::Close;
                    }
                    Some(Ok(_)) => {}
                },
            }
        };

        match connected {
            Ok((connection, events)) => {
                self.pool = Some(connection);
                *pool_events = Some(events);
                let _ = self.transition(SessionState::Active);
                self.registry
                    .register(
                        self.id.clone(),
                        SessionInfo {
                            peer: self.peer,
                            pool: endpoint.to_string(),
                            active_since: Instant::now(),
                        },
                    )
                    .await;
                info!(target: LOG_TARGET, "✅ Session {} bridged to {}", self.id, endpoint);
                send_frame(sink, ServerMessage::Connected { session: self.id.to_string() }).await
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Session {}: {}", self.id, e);
                send_frame(sink, ServerMessage::error(BridgeError::from(e).to_string())).await;
                Flow::Close
            }
        }
    }

    async fn on_submit(&mut self, data: &Value, sink: &mut ClientSink) -> Flow {
        let pool = match (self.state, self.pool.as_mut()) {
            (SessionState::Active, Some(pool)) => pool,
            _ => return send_frame(sink, ServerMessage::error(BridgeError::NotConnected.to_string())).await,
        };
        let line = submit_payload_line(data);
        debug!(target: LOG_TARGET, "Session {}: forwarding submit {}", self.id, line);
        match pool.send(&line).await {
            Ok(()) => Flow::Continue,
            Err(e) => {
                warn!(target: LOG_TARGET, "Session {}: pool write failed: {}", self.id, e);
                send_frame(sink, ServerMessage::error(BridgeError::from(e).to_string())).await;
                Flow::Close
            }
        }
    }

    /// Release the pool connection and registry entry. Only the first call acts.
    async fn teardown(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        let _ = self.transition(SessionState::Closing);
        if let Some(mut pool) = self.pool.take() {
            pool.close().await;
        }
        if self.registry.deregister(&self.id).await {
            debug!(target: LOG_TARGET, "Session {} deregistered", self.id);
        }
        let _ = self.transition(SessionState::Closed);
    }
}

async fn next_pool_event(events: &mut Option<mpsc::Receiver<PoolEvent>>) -> Option<PoolEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_frame(sink: &mut ClientSink, message: ServerMessage) -> Flow {
    match sink.send(Message::Text(message.to_json())).await {
        Ok(()) => Flow::Continue,
        Err(_) => Flow::Close,
    }
}
