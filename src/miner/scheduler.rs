// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/scheduler.rs
// Version: 1.0.0
//
// This file implements the work scheduler. It owns a pool of hash workers,
// hands them the current job, collects their hash counts and shares on a
// supervisor thread, reports hashrate once per interval and adjusts the
// throttle factor from runtime signals.
//
// Stopping is a barrier: `stop()` returns only after every worker has
// acknowledged (or the stop timeout ran out), so no iteration of the
// stopped run is observable afterwards.
//
// Tree Location:
// - src/miner/scheduler.rs (work scheduler and supervisor)
// - Depends on: crossbeam, num_cpus, miner::{worker, throttle, stats, signals}

use super::signals::{ManualSignals, SignalSource};
use super::stats::{HashrateReporter, REPORT_INTERVAL, WorkerState};
use super::throttle::{ADJUST_INTERVAL, BASE_INTERVAL, ThrottleConfig, ThrottleController};
use super::worker::{WorkerAck, WorkerCommand, WorkerContext, WorkerEvent, spawn_worker};
use crate::core::{MiningJob, PowHasher, Share};
use crate::error::SchedulerError;
use crate::utils::format::FormatUtils;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "poolbridge::miner::scheduler";

/// Called for every share a worker finds
pub type ShareCallback = Arc<dyn Fn(Share) + Send + Sync>;

/// Called with each hashrate report in hashes per second
pub type HashrateCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Tunables of the scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Pause at throttle factor 0
    pub base_interval: Duration,
    /// Nonces a worker evaluates between two throttle pauses
    pub nonces_per_iteration: u64,
    pub report_interval: Duration,
    pub adjust_interval: Duration,
    /// Upper bound on how long `stop()` waits for workers
    pub stop_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_interval: BASE_INTERVAL,
            nonces_per_iteration: 1000,
            report_interval: REPORT_INTERVAL,
            adjust_interval: ADJUST_INTERVAL,
            stop_timeout: Duration::from_secs(5),
        }
    }
}

struct WorkerSlot {
    commands: Sender<WorkerCommand>,
    command_rx: Receiver<WorkerCommand>,
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

/// Everything that exists only while mining
struct ActiveRun {
    worker_count: usize,
    throttle: ThrottleConfig,
    slots: Vec<WorkerSlot>,
    events: Sender<WorkerEvent>,
    ack_tx: Sender<WorkerAck>,
    ack_rx: Receiver<WorkerAck>,
    supervisor: Option<JoinHandle<()>>,
}

pub struct WorkScheduler {
    hasher: Arc<dyn PowHasher>,
    config: SchedulerConfig,
    on_share: ShareCallback,
    on_hashrate: Option<HashrateCallback>,
    signals: Arc<dyn SignalSource>,
    job: Option<Arc<MiningJob>>,
    states: Arc<Mutex<Vec<WorkerState>>>,
    /// f64 bits of the latest hashrate report
    hashrate: Arc<AtomicU64>,
    /// f64 bits of the effective throttle factor
    throttle_factor: Arc<AtomicU64>,
    /// Nanoseconds of the pause after the latest iteration
    current_delay: Arc<AtomicU64>,
    run: Option<ActiveRun>,
}

impl WorkScheduler {
    pub fn new(hasher: Arc<dyn PowHasher>, config: SchedulerConfig, on_share: ShareCallback) -> Self {
        Self {
            hasher,
            config,
            on_share,
            on_hashrate: None,
            signals: Arc::new(ManualSignals::new()),
            job: None,
            states: Arc::new(Mutex::new(Vec::new())),
            hashrate: Arc::new(AtomicU64::new(0f64.to_bits())),
            throttle_factor: Arc::new(AtomicU64::new(1f64.to_bits())),
            current_delay: Arc::new(AtomicU64::new(0)),
            run: None,
        }
    }

    pub fn with_hashrate_callback(mut self, callback: HashrateCallback) -> Self {
        self.on_hashrate = Some(callback);
        self
    }

    pub fn with_signal_source(mut self, signals: Arc<dyn SignalSource>) -> Self {
        self.signals = signals;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn current_job(&self) -> Option<Arc<MiningJob>> {
        self.job.clone()
    }

    /// Replace the current job; running workers switch at their next iteration
    pub fn set_job(&mut self, job: MiningJob) {
        info!(target: LOG_TARGET, "📋 New job {} (height {})", job.job_id, job.height);
        let job = Arc::new(job);
        if let Some(run) = &self.run {
            for slot in &run.slots {
                let _ = slot.commands.send(WorkerCommand::Job(Arc::clone(&job)));
            }
        }
        self.job = Some(job);
    }

    /// Start `worker_count` workers (0 picks one per CPU).
    ///
    /// Starting again with the same parameters is a no-op; different
    /// parameters while running are rejected.
    pub fn start(&mut self, worker_count: usize, throttle: ThrottleConfig) -> Result<(), SchedulerError> {
        if !throttle.is_valid() {
            return Err(SchedulerError::InvalidThrottle(throttle.throttle_factor));
        }
        let worker_count = if worker_count == 0 { num_cpus::get().max(1) } else { worker_count };

        if let Some(run) = &self.run {
            if run.worker_count == worker_count && run.throttle == throttle {
                debug!(target: LOG_TARGET, "Already running with {} workers", worker_count);
                return Ok(());
            }
            return Err(SchedulerError::AlreadyRunning);
        }

        let now = Instant::now();
        *lock(&self.states) = (0..worker_count)
            .map(|index| WorkerState {
                running: true,
                ..WorkerState::new(index, now)
            })
            .collect();
        self.hashrate.store(0f64.to_bits(), Ordering::Relaxed);
        self.throttle_factor.store(throttle.throttle_factor.to_bits(), Ordering::Relaxed);
        self.current_delay.store(0, Ordering::Relaxed);

        let (event_tx, event_rx) = unbounded();
        let (ack_tx, ack_rx) = unbounded();
        let mut run = ActiveRun {
            worker_count,
            throttle,
            slots: Vec::with_capacity(worker_count),
            events: event_tx,
            ack_tx,
            ack_rx,
            supervisor: None,
        };

        for index in 0..worker_count {
            let (commands, command_rx) = unbounded();
            let mut slot = WorkerSlot {
                commands,
                command_rx,
                handle: None,
                generation: 0,
            };
            match spawn_worker(self.worker_context(&run, &slot, index)) {
                Ok(handle) => slot.handle = Some(handle),
                Err(e) => {
                    warn!(target: LOG_TARGET, "Failed to spawn worker {}: {}", index, e);
                    self.run = Some(run);
                    self.stop();
                    return Err(SchedulerError::Spawn(e));
                }
            }
            run.slots.push(slot);
        }

        let supervisor = Supervisor {
            config: self.config.clone(),
            controller: ThrottleController::new(throttle, self.config.base_interval, self.config.adjust_interval),
            reporter: HashrateReporter::new(self.config.report_interval, now),
            signals: Arc::clone(&self.signals),
            on_share: Arc::clone(&self.on_share),
            on_hashrate: self.on_hashrate.clone(),
            states: Arc::clone(&self.states),
            hashrate: Arc::clone(&self.hashrate),
            throttle_factor: Arc::clone(&self.throttle_factor),
            current_delay: Arc::clone(&self.current_delay),
            worker_commands: run.slots.iter().map(|s| s.commands.clone()).collect(),
        };
        let spawned = thread::Builder::new()
            .name("hash-supervisor".to_string())
            .spawn(move || supervisor.run(event_rx));
        match spawned {
            Ok(handle) => run.supervisor = Some(handle),
            Err(e) => {
                self.run = Some(run);
                self.stop();
                return Err(SchedulerError::Spawn(e));
            }
        }

        info!(
            target: LOG_TARGET,
            "⛏️ Started {} workers with {} (throttle {:.2})",
            worker_count,
            self.hasher.name(),
            throttle.throttle_factor
        );
        self.run = Some(run);
        Ok(())
    }

    fn worker_context(&self, run: &ActiveRun, slot: &WorkerSlot, index: usize) -> WorkerContext {
        WorkerContext {
            index,
            worker_count: run.worker_count,
            generation: slot.generation,
            nonces_per_iteration: self.config.nonces_per_iteration,
            base_interval: self.config.base_interval,
            hasher: Arc::clone(&self.hasher),
            job: self.job.clone(),
            throttle_factor: f64::from_bits(self.throttle_factor.load(Ordering::Relaxed)),
            commands: slot.command_rx.clone(),
            events: run.events.clone(),
            ack: run.ack_tx.clone(),
        }
    }

    /// Stop all workers and wait for them, bounded by the stop timeout.
    ///
    /// Safe to call when not running. Afterwards the hashrate reads 0 and
    /// every worker state is reset.
    pub fn stop(&mut self) {
        let Some(mut run) = self.run.take() else {
            return;
        };

        for slot in &run.slots {
            let _ = slot.commands.send(WorkerCommand::Stop);
        }

        let mut pending: HashSet<WorkerAck> = run
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.handle.is_some())
            .map(|(index, slot)| (index, slot.generation))
            .collect();
        let deadline = Instant::now() + self.config.stop_timeout;
        while !pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match run.ack_rx.recv_timeout(remaining) {
                // Acks from replaced generations are ignored
                Ok(ack) => {
                    pending.remove(&ack);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        for (index, slot) in run.slots.iter_mut().enumerate() {
            let Some(handle) = slot.handle.take() else {
                continue;
            };
            if pending.contains(&(index, slot.generation)) {
                warn!(target: LOG_TARGET, "Worker {} did not stop in time, detaching", index);
            } else {
                let _ = handle.join();
            }
        }

        let _ = run.events.send(WorkerEvent::Shutdown);
        if let Some(supervisor) = run.supervisor.take() {
            let _ = supervisor.join();
        }

        let now = Instant::now();
        for state in lock(&self.states).iter_mut() {
            state.reset(now);
        }
        self.hashrate.store(0f64.to_bits(), Ordering::Relaxed);
        self.current_delay.store(0, Ordering::Relaxed);
        if let Some(callback) = &self.on_hashrate {
            callback(0.0);
        }
        info!(target: LOG_TARGET, "🛑 Stopped {} workers", run.worker_count);
    }

    /// Bring a faulted worker slot back with a fresh thread.
    ///
    /// Healthy slots are left alone. The faulted thread is joined once its
    /// replacement is running.
    pub fn restart_worker(&mut self, index: usize) -> Result<(), SchedulerError> {
        let run = self.run.as_ref().ok_or(SchedulerError::NotRunning)?;
        let slot = run.slots.get(index).ok_or(SchedulerError::UnknownWorker(index))?;
        let faulted = lock(&self.states).get(index).is_some_and(|state| state.faulted);
        if !faulted && slot.handle.is_some() {
            debug!(target: LOG_TARGET, "Worker {} is healthy, not restarting", index);
            return Ok(());
        }

        let generation = slot.generation + 1;
        let ctx = WorkerContext {
            generation,
            ..self.worker_context(run, slot, index)
        };

        // Reset before spawning so a fault of the new thread is not overwritten
        if let Some(state) = lock(&self.states).get_mut(index) {
            state.reset(Instant::now());
            state.running = true;
        }
        let handle = match spawn_worker(ctx) {
            Ok(handle) => handle,
            Err(e) => {
                if let Some(state) = lock(&self.states).get_mut(index) {
                    state.mark_faulted();
                }
                return Err(SchedulerError::Spawn(e));
            }
        };

        let Some(run) = self.run.as_mut() else {
            return Err(SchedulerError::NotRunning);
        };
        let slot = &mut run.slots[index];
        if let Some(old) = slot.handle.replace(handle) {
            let _ = old.join();
        }
        slot.generation = generation;
        info!(target: LOG_TARGET, "🔄 Restarted worker {}", index);
        Ok(())
    }

    /// Latest reported hashrate in hashes per second
    pub fn hashrate(&self) -> f64 {
        f64::from_bits(self.hashrate.load(Ordering::Relaxed))
    }

    /// Throttle factor currently applied to the workers
    pub fn throttle_factor(&self) -> f64 {
        f64::from_bits(self.throttle_factor.load(Ordering::Relaxed))
    }

    /// Pause the throttle computed after the most recent iteration
    pub fn current_delay(&self) -> Duration {
        Duration::from_nanos(self.current_delay.load(Ordering::Relaxed))
    }

    pub fn worker_states(&self) -> Vec<WorkerState> {
        lock(&self.states).clone()
    }
}

impl Drop for WorkScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(states: &Mutex<Vec<WorkerState>>) -> MutexGuard<'_, Vec<WorkerState>> {
    states.lock().unwrap_or_else(|p| p.into_inner())
}

/// Collects worker events for one run
struct Supervisor {
    config: SchedulerConfig,
    controller: ThrottleController,
    reporter: HashrateReporter,
    signals: Arc<dyn SignalSource>,
    on_share: ShareCallback,
    on_hashrate: Option<HashrateCallback>,
    states: Arc<Mutex<Vec<WorkerState>>>,
    hashrate: Arc<AtomicU64>,
    throttle_factor: Arc<AtomicU64>,
    current_delay: Arc<AtomicU64>,
    worker_commands: Vec<Sender<WorkerCommand>>,
}

impl Supervisor {
    fn run(mut self, events: Receiver<WorkerEvent>) {
        let tick = self.config.report_interval.min(self.config.adjust_interval);
        let mut next_tick = Instant::now() + tick;

        loop {
            let wait = next_tick.saturating_duration_since(Instant::now());
            match events.recv_timeout(wait) {
                Ok(WorkerEvent::Shutdown) => break,
                Ok(event) => self.handle(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let now = Instant::now();
            if now >= next_tick {
                self.tick(now);
                next_tick = now + tick;
            }
        }
    }

    fn handle(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Hashes { worker, count, elapsed } => {
                self.reporter.record(count);
                let delay = self.controller.delay_for(elapsed);
                self.current_delay.store(delay.as_nanos() as u64, Ordering::Relaxed);
                if let Some(state) = lock(&self.states).get_mut(worker) {
                    state.record_hashes(count);
                }
            }
            WorkerEvent::Share(share) => self.report_share(share),
            WorkerEvent::Fault { worker, reason } => {
                warn!(target: LOG_TARGET, "⚠️ Worker {} faulted: {}", worker, reason);
                if let Some(state) = lock(&self.states).get_mut(worker) {
                    state.mark_faulted();
                }
            }
            WorkerEvent::Shutdown => {}
        }
    }

    fn report_share(&self, share: Share) {
        if let Some(state) = lock(&self.states).get_mut(share.worker) {
            state.record_share();
        }
        (self.on_share)(share);
    }

    fn tick(&mut self, now: Instant) {
        if let Some(rate) = self.reporter.poll(now) {
            self.hashrate.store(rate.to_bits(), Ordering::Relaxed);
            debug!(target: LOG_TARGET, "Hashrate: {}", FormatUtils::format_hashrate(rate));
            if let Some(callback) = &self.on_hashrate {
                callback(rate);
            }
        }

        let signals = self.signals.sample();
        if let Some(factor) = self.controller.adjust(&signals, now) {
            self.throttle_factor.store(factor.to_bits(), Ordering::Relaxed);
            for commands in &self.worker_commands {
                let _ = commands.send(WorkerCommand::Throttle(factor));
            }
        }
    }
}
