// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/client/mod.rs
// Version: 1.0.0
//
// This file implements the miner side of the bridge. It opens a WebSocket
// session, asks the bridge to connect to the pool, logs in through
// `mining_submit`, feeds pool jobs to the work scheduler and submits the
// shares the scheduler finds.
//
// Tree Location:
// - src/client/mod.rs (bridge miner client)
// - Depends on: tokio-tungstenite, futures-util, miner, pool

use crate::bridge::{ClientMessage, ServerMessage};
use crate::core::{Algorithm, Share, hasher_for};
use crate::error::ClientError;
use crate::miner::{SchedulerConfig, SignalSource, SystemSignals, ThrottleConfig, WorkScheduler};
use crate::pool::protocol::FIRST_SUBMIT_ID;
use crate::pool::{PoolMessage, StratumProtocol, parse_pool_message};
use crate::utils::format::FormatUtils;
use futures_util::{Sink, SinkExt, StreamExt};
use std::collections::HashMap;
use std::future::{Future, pending};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

const LOG_TARGET: &str = "poolbridge::client";

/// How often the running summary is logged
const SUMMARY_INTERVAL: Duration = Duration::from_secs(30);

/// Everything the client needs to mine through a bridge
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub bridge_url: String,
    pub pool: String,
    pub wallet: String,
    pub worker: String,
    pub algo: Algorithm,
    /// 0 picks one worker per CPU
    pub threads: usize,
    pub throttle: ThrottleConfig,
    pub scheduler: SchedulerConfig,
}

/// Share outcomes reported by the pool
#[derive(Debug, Default)]
pub struct ShareCounters {
    pub submitted: AtomicU64,
    pub accepted: AtomicU64,
    pub rejected: AtomicU64,
}

impl ShareCounters {
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

pub struct BridgeClient {
    settings: ClientSettings,
    counters: Arc<ShareCounters>,
}

impl BridgeClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self {
            settings,
            counters: Arc::new(ShareCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<ShareCounters> {
        Arc::clone(&self.counters)
    }

    /// Mine until the bridge closes the session
    pub async fn run(&self) -> Result<(), ClientError> {
        self.run_until(pending()).await
    }

    /// Mine until the bridge closes the session or `shutdown` completes
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) -> Result<(), ClientError> {
        let settings = &self.settings;
        info!(target: LOG_TARGET, "🔌 Connecting to bridge {}", settings.bridge_url);
        let (socket, _) = connect_async(settings.bridge_url.as_str()).await?;
        let (mut sink, mut stream) = socket.split();

        send(&mut sink, &ClientMessage::Connect { pool: settings.pool.clone() }).await?;
        let session = loop {
            let Some(frame) = stream.next().await else {
                return Err(ClientError::ClosedEarly);
            };
            match frame? {
                Message::Text(text) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(ServerMessage::Connected { session }) => break session,
                    Ok(ServerMessage::Error { message }) => return Err(ClientError::Refused(message)),
                    Ok(ServerMessage::PoolData { .. }) => {}
                    Err(e) => warn!(target: LOG_TARGET, "Unreadable bridge frame: {}", e),
                },
                Message::Close(_) => return Err(ClientError::ClosedEarly),
                _ => {}
            }
        };
        info!(target: LOG_TARGET, "✅ Bridge session {} connected to {}", session, settings.pool);

        let login = StratumProtocol::create_login_request(&settings.wallet, &settings.worker, settings.algo.name())
            .ok_or_else(|| ClientError::Login(settings.wallet.clone()))?;
        send(&mut sink, &ClientMessage::MiningSubmit { data: login }).await?;
        info!(target: LOG_TARGET, "🔐 Login request sent");

        let (share_tx, mut share_rx) = mpsc::unbounded_channel::<Share>();
        let mut scheduler = WorkScheduler::new(
            hasher_for(settings.algo),
            settings.scheduler.clone(),
            Arc::new(move |share| {
                let _ = share_tx.send(share);
            }),
        );
        if let Some(signals) = system_signals_for(&settings.throttle) {
            scheduler = scheduler.with_signal_source(signals);
        }
        scheduler.start(settings.threads, settings.throttle)?;

        let mut session_state = MiningSession {
            counters: Arc::clone(&self.counters),
            pending: HashMap::new(),
            next_submit_id: FIRST_SUBMIT_ID,
            started: Instant::now(),
        };
        let mut summary = tokio::time::interval(SUMMARY_INTERVAL);
        summary.tick().await;
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => session_state.on_frame(&text, &mut scheduler),
                    Some(Ok(Message::Close(frame))) => {
                        info!(target: LOG_TARGET, "📡 Bridge closed the session: {:?}", frame);
                        break Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(ClientError::from(e)),
                    None => break Ok(()),
                },
                Some(share) = share_rx.recv() => {
                    if let Some(message) = session_state.submit(&settings.wallet, &share) {
                        // The read side reports the session end
                        if let Err(e) = send(&mut sink, &message).await {
                            warn!(target: LOG_TARGET, "Failed to submit share: {}", e);
                        }
                    }
                }
                _ = summary.tick() => session_state.log_summary(&scheduler),
                _ = &mut shutdown => {
                    info!(target: LOG_TARGET, "🛑 Shutdown requested");
                    let _ = sink.send(Message::Close(None)).await;
                    break Ok(());
                }
            }
        };

        // Stopping joins worker threads
        let stopped = tokio::task::spawn_blocking(move || {
            scheduler.stop();
            scheduler
        })
        .await;
        match stopped {
            Ok(scheduler) => session_state.log_summary(&scheduler),
            Err(e) => warn!(target: LOG_TARGET, "Scheduler shutdown task failed: {}", e),
        }
        result
    }
}

/// Per-session bookkeeping of submitted shares
struct MiningSession {
    counters: Arc<ShareCounters>,
    /// Submit id to job id, for matching pool answers
    pending: HashMap<u64, String>,
    next_submit_id: u64,
    started: Instant,
}

impl MiningSession {
    fn on_frame(&mut self, text: &str, scheduler: &mut WorkScheduler) {
        let message = match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(target: LOG_TARGET, "Unreadable bridge frame: {}", e);
                return;
            }
        };
        let line = match message {
            ServerMessage::PoolData { data } => data,
            ServerMessage::Error { message } => {
                warn!(target: LOG_TARGET, "⚠️ Bridge error: {}", message);
                return;
            }
            ServerMessage::Connected { .. } => return,
        };

        match parse_pool_message(&line) {
            Ok(Some(PoolMessage::LoginSuccess(job))) => {
                info!(target: LOG_TARGET, "✅ Login successful");
                if let Some(job) = job {
                    scheduler.set_job(job);
                }
            }
            Ok(Some(PoolMessage::NewJob(job))) => scheduler.set_job(job),
            Ok(Some(PoolMessage::ShareResponse { submit_id, accepted })) => {
                let job_id = self.pending.remove(&submit_id).unwrap_or_default();
                if accepted {
                    self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                    info!(target: LOG_TARGET, "✅ Share {} accepted (job {})", submit_id, job_id);
                } else {
                    self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                    warn!(target: LOG_TARGET, "❌ Share {} rejected (job {})", submit_id, job_id);
                }
            }
            Ok(Some(PoolMessage::Error(message))) => error!(target: LOG_TARGET, "Pool error: {}", message),
            Ok(None) => debug!(target: LOG_TARGET, "Ignoring pool line: {}", line),
            Err(e) => warn!(target: LOG_TARGET, "Unparseable pool line {:?}: {}", line, e),
        }
    }

    fn submit(&mut self, wallet: &str, share: &Share) -> Option<ClientMessage> {
        let submit_id = self.next_submit_id;
        let request = StratumProtocol::create_submit_request(wallet, share, submit_id)?;
        self.next_submit_id += 1;
        self.pending.insert(submit_id, share.job_id.clone());
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        info!(
            target: LOG_TARGET,
            "📤 Submitting share {}: job_id={}, nonce={}", submit_id, share.job_id, share.nonce_hex()
        );
        Some(ClientMessage::MiningSubmit { data: request })
    }

    fn log_summary(&self, scheduler: &WorkScheduler) {
        info!(
            target: LOG_TARGET,
            "📊 {} | throttle {:.2} ({} ms pause) | uptime {} | shares {}/{} accepted ({})",
            FormatUtils::format_hashrate(scheduler.hashrate()),
            scheduler.throttle_factor(),
            scheduler.current_delay().as_millis(),
            FormatUtils::format_uptime(self.started.elapsed()),
            self.counters.accepted(),
            self.counters.submitted(),
            FormatUtils::format_acceptance(self.counters.accepted(), self.counters.rejected())
        );

        let now = Instant::now();
        for state in scheduler.worker_states() {
            debug!(
                target: LOG_TARGET,
                "Worker {}: {} avg, {} shares{}",
                state.index,
                FormatUtils::format_hashrate(state.hashrate(now)),
                state.shares,
                if state.faulted { ", faulted" } else { "" }
            );
        }
    }
}

/// Host signal source for battery or thermal aware throttling
fn system_signals_for(throttle: &ThrottleConfig) -> Option<Arc<dyn SignalSource>> {
    if throttle.battery_aware || throttle.thermal_aware {
        Some(Arc::new(SystemSignals::new()))
    } else {
        None
    }
}

async fn send<S>(sink: &mut S, message: &ClientMessage) -> Result<(), ClientError>
where
    S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    sink.send(Message::Text(message.to_json())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MAX_TARGET, Sha3xHasher};

    fn mining_session() -> MiningSession {
        MiningSession {
            counters: Arc::new(ShareCounters::default()),
            pending: HashMap::new(),
            next_submit_id: FIRST_SUBMIT_ID,
            started: Instant::now(),
        }
    }

    #[test]
    fn either_awareness_flag_installs_system_signals() {
        assert!(system_signals_for(&ThrottleConfig::new(0.5)).is_none());
        assert!(system_signals_for(&ThrottleConfig::new(0.5).with_battery_aware(true)).is_some());
        assert!(system_signals_for(&ThrottleConfig::new(0.5).with_thermal_aware(true)).is_some());
    }

    #[test]
    fn submits_use_increasing_ids() {
        let mut session = mining_session();
        let share = Share::new("job".to_string(), 5, MAX_TARGET, 0);
        let first = session.submit("wallet", &share).unwrap();
        let second = session.submit("wallet", &share).unwrap();

        let ClientMessage::MiningSubmit { data } = first else { panic!("expected submit") };
        assert_eq!(data["id"], FIRST_SUBMIT_ID);
        let ClientMessage::MiningSubmit { data } = second else { panic!("expected submit") };
        assert_eq!(data["id"], FIRST_SUBMIT_ID + 1);
        assert_eq!(session.counters.submitted(), 2);
    }

    #[test]
    fn pool_answers_update_counters_and_jobs() {
        let mut session = mining_session();
        let share = Share::new("job".to_string(), 5, MAX_TARGET, 0);
        session.submit("wallet", &share);
        session.submit("wallet", &share);

        let mut scheduler = WorkScheduler::new(Arc::new(Sha3xHasher), SchedulerConfig::default(), Arc::new(|_| {}));
        let accepted = ServerMessage::PoolData {
            data: r#"{"id":100,"jsonrpc":"2.0","result":{"status":"OK"}}"#.to_string(),
        };
        let rejected = ServerMessage::PoolData {
            data: r#"{"id":101,"jsonrpc":"2.0","result":false}"#.to_string(),
        };
        session.on_frame(&accepted.to_json(), &mut scheduler);
        session.on_frame(&rejected.to_json(), &mut scheduler);
        assert_eq!(session.counters.accepted(), 1);
        assert_eq!(session.counters.rejected(), 1);
        assert!(session.pending.is_empty());

        let job = ServerMessage::PoolData {
            data: format!(
                r#"{{"jsonrpc":"2.0","method":"job","params":{{"job_id":"j9","blob":"{}","difficulty":1,"height":3}}}}"#,
                "00".repeat(32)
            ),
        };
        session.on_frame(&job.to_json(), &mut scheduler);
        assert_eq!(scheduler.current_job().map(|j| j.job_id.clone()), Some("j9".to_string()));
    }
}
