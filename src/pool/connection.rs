// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/pool/connection.rs
// Version: 1.0.0
//
// This file implements the outbound TCP connection from one bridge session
// to a mining pool. Writes go straight to the socket; reads run in a
// background task that turns every received line into a PoolEvent.
//
// Pool bytes are relayed as they come: invalid UTF-8 is replaced rather than
// rejected, and a line longer than MAX_LINE_BYTES ends the connection.
//
// Tree Location:
// - src/pool/connection.rs (pool TCP connection)
// - Depends on: tokio

use super::endpoint::PoolEndpoint;
use crate::error::PoolError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const LOG_TARGET: &str = "poolbridge::pool::connection";

/// Buffered pool events per connection before the reader waits on the session
const EVENT_BUFFER: usize = 64;

/// Longest pool line accepted, terminator included
pub const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolConnectionState {
    Connecting,
    Open,
    Closed,
    Failed,
}

/// Notifications produced by the pool reader task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    /// One line from the pool, without its terminator
    Data(String),
    /// The pool closed the stream
    Closed,
    /// Reading from the pool failed
    Error(String),
}

pub struct PoolConnection {
    endpoint: PoolEndpoint,
    state: PoolConnectionState,
    writer: Option<OwnedWriteHalf>,
    reader_task: Option<JoinHandle<()>>,
}

impl PoolConnection {
    /// Resolve and connect to the pool within `timeout`.
    ///
    /// Returns the connection and the receiving end of its event stream.
    pub async fn connect(
        endpoint: &PoolEndpoint,
        timeout: Duration,
    ) -> Result<(Self, mpsc::Receiver<PoolEvent>), PoolError> {
        let authority = endpoint.authority();
        debug!(target: LOG_TARGET, "Connecting to pool {}", authority);

        let stream = match tokio::time::timeout(timeout, Self::open_stream(&authority)).await {
            Ok(result) => result?,
            Err(_) => return Err(PoolError::Timeout(authority)),
        };
        stream.set_nodelay(true)?; // Disable Nagle's algorithm for low latency

        let (reader, writer) = stream.into_split();
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let reader_task = tokio::spawn(read_pool_lines(reader, event_tx));

        info!(target: LOG_TARGET, "✅ Connected to pool {}", authority);
        Ok((
            Self {
                endpoint: endpoint.clone(),
                state: PoolConnectionState::Open,
                writer: Some(writer),
                reader_task: Some(reader_task),
            },
            event_rx,
        ))
    }

    async fn open_stream(authority: &str) -> Result<TcpStream, PoolError> {
        // Try parsing as direct IP:port first
        let addr = match authority.parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(_) => lookup_host(authority)
                .await
                .map_err(|_| PoolError::Resolve(authority.to_string()))?
                .next()
                .ok_or_else(|| PoolError::Resolve(authority.to_string()))?,
        };
        TcpStream::connect(addr).await.map_err(|source| PoolError::Connect {
            addr: authority.to_string(),
            source,
        })
    }

    pub fn endpoint(&self) -> &PoolEndpoint {
        &self.endpoint
    }

    pub fn state(&self) -> PoolConnectionState {
        self.state
    }

    /// Write one frame to the pool, newline-terminated
    pub async fn send(&mut self, frame: &str) -> Result<(), PoolError> {
        let writer = match (self.state, self.writer.as_mut()) {
            (PoolConnectionState::Open, Some(writer)) => writer,
            _ => return Err(PoolError::Closed),
        };
        let result = async {
            writer.write_all(frame.as_bytes()).await?;
            if !frame.ends_with('\n') {
                writer.write_all(b"\n").await?;
            }
            writer.flush().await
        }
        .await;
        if let Err(e) = result {
            self.state = PoolConnectionState::Failed;
            return Err(PoolError::Io(e));
        }
        Ok(())
    }

    /// Shut the connection down. Safe to call more than once; errors are ignored.
    pub async fn close(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
            debug!(target: LOG_TARGET, "Closed pool connection {}", self.endpoint.authority());
        }
        if self.state != PoolConnectionState::Failed {
            self.state = PoolConnectionState::Closed;
        }
    }
}

impl Drop for PoolConnection {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

async fn read_pool_lines(reader: OwnedReadHalf, events: mpsc::Sender<PoolEvent>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        let event = match (&mut reader).take(MAX_LINE_BYTES as u64).read_until(b'\n', &mut buf).await {
            Ok(0) => PoolEvent::Closed,
            Ok(_) if buf.last() == Some(&b'\n') => PoolEvent::Data(decode_line(&buf)),
            Ok(n) if n >= MAX_LINE_BYTES => {
                PoolEvent::Error(format!("pool line longer than {} bytes", MAX_LINE_BYTES))
            }
            // Unterminated tail before end of stream; Closed follows on the next read
            Ok(_) => PoolEvent::Data(decode_line(&buf)),
            Err(e) => PoolEvent::Error(e.to_string()),
        };
        let done = !matches!(event, PoolEvent::Data(_));
        if events.send(event).await.is_err() || done {
            break;
        }
    }
}

/// Strip the line terminator and decode, replacing invalid UTF-8
fn decode_line(bytes: &[u8]) -> String {
    let line = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
