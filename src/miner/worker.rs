// PoolBridge - Free and Open Source Software Statement
//
// This project, poolbridge, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/worker.rs
// Version: 1.0.0
//
// This file implements a single hash worker. Each worker runs on its own OS
// thread, walks its share of the nonce space for the current job and reports
// hash counts, shares and faults to the scheduler over a channel.
//
// Worker `i` of `n` evaluates nonces `i, i + n, i + 2n, ...`, so no two
// workers ever test the same nonce of a job. A new job restarts the walk.
//
// Tree Location:
// - src/miner/worker.rs (hash worker thread)
// - Depends on: crossbeam, core

use super::throttle::compute_delay;
use crate::core::{MiningJob, PowHasher, Share, meets_target};
use crate::error::HashError;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const LOG_TARGET: &str = "poolbridge::miner::worker";

/// How long an idle worker waits for a job before polling again
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Instructions from the scheduler
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    Job(Arc<MiningJob>),
    Throttle(f64),
    Stop,
}

/// Reports sent to the scheduler's supervisor
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// One finished iteration and how long its hashing took
    Hashes { worker: usize, count: u64, elapsed: Duration },
    Share(Share),
    Fault { worker: usize, reason: String },
    /// Sent by the scheduler once every worker acknowledged a stop
    Shutdown,
}

/// Sent by a worker as the last thing it does; `(index, generation)`
pub type WorkerAck = (usize, u64);

pub struct WorkerContext {
    pub index: usize,
    pub worker_count: usize,
    /// Incremented every time the slot is restarted
    pub generation: u64,
    pub nonces_per_iteration: u64,
    pub base_interval: Duration,
    pub hasher: Arc<dyn PowHasher>,
    pub job: Option<Arc<MiningJob>>,
    pub throttle_factor: f64,
    pub commands: Receiver<WorkerCommand>,
    pub events: Sender<WorkerEvent>,
    pub ack: Sender<WorkerAck>,
}

pub fn spawn_worker(ctx: WorkerContext) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("hash-worker-{}", ctx.index))
        .spawn(move || run_worker(ctx))
}

enum Exit {
    Stopped,
    Faulted,
}

struct WorkerLoop {
    index: usize,
    worker_count: u64,
    nonces_per_iteration: u64,
    job: Option<Arc<MiningJob>>,
    factor: f64,
    /// Position in this worker's nonce sequence for the current job
    round: u64,
}

impl WorkerLoop {
    /// Apply a command; `false` means the worker must stop
    fn apply(&mut self, command: WorkerCommand) -> bool {
        match command {
            WorkerCommand::Job(job) => {
                debug!(target: LOG_TARGET, "Worker {}: new job {}", self.index, job.job_id);
                self.job = Some(job);
                self.round = 0;
                true
            }
            WorkerCommand::Throttle(factor) => {
                self.factor = factor;
                true
            }
            WorkerCommand::Stop => false,
        }
    }

    fn next_nonce(&mut self) -> u64 {
        let nonce = self.round.wrapping_mul(self.worker_count).wrapping_add(self.index as u64);
        self.round = self.round.wrapping_add(1);
        nonce
    }

    /// One iteration over `nonces_per_iteration` nonces of the current job
    fn iterate(
        &mut self,
        job: &MiningJob,
        hasher: &dyn PowHasher,
        events: &Sender<WorkerEvent>,
    ) -> Result<u64, HashError> {
        let mut evaluated = 0;
        for _ in 0..self.nonces_per_iteration {
            let nonce = self.next_nonce();
            let digest = hasher.hash(&job.header, nonce, job.height)?;
            evaluated += 1;

            if meets_target(&digest, &job.target) {
                info!(
                    target: LOG_TARGET,
                    "💎 Worker {} found share for job {} (nonce {})", self.index, job.job_id, nonce
                );
                let share = Share::new(job.job_id.clone(), nonce, digest, self.index);
                if events.send(WorkerEvent::Share(share)).is_err() {
                    break;
                }
            }
        }
        Ok(evaluated)
    }
}

fn run_worker(ctx: WorkerContext) {
    let WorkerContext {
        index,
        worker_count,
        generation,
        nonces_per_iteration,
        base_interval,
        hasher,
        job,
        throttle_factor,
        commands,
        events,
        ack,
    } = ctx;

    let mut state = WorkerLoop {
        index,
        worker_count: worker_count.max(1) as u64,
        nonces_per_iteration: nonces_per_iteration.max(1),
        job,
        factor: throttle_factor,
        round: 0,
    };

    debug!(target: LOG_TARGET, "Worker {} started (generation {})", index, generation);
    let exit = worker_loop(&mut state, hasher.as_ref(), base_interval, &commands, &events);
    match exit {
        Exit::Stopped => debug!(target: LOG_TARGET, "Worker {} stopped", index),
        Exit::Faulted => error!(target: LOG_TARGET, "Worker {} halted after a fault", index),
    }
    let _ = ack.send((index, generation));
}

fn worker_loop(
    state: &mut WorkerLoop,
    hasher: &dyn PowHasher,
    base_interval: Duration,
    commands: &Receiver<WorkerCommand>,
    events: &Sender<WorkerEvent>,
) -> Exit {
    loop {
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if !state.apply(command) {
                        return Exit::Stopped;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Exit::Stopped,
            }
        }

        let Some(job) = state.job.clone() else {
            match commands.recv_timeout(IDLE_POLL) {
                Ok(command) => {
                    if !state.apply(command) {
                        return Exit::Stopped;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Exit::Stopped,
            }
            continue;
        };

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| state.iterate(&job, hasher, events)));
        let reason = match outcome {
            Ok(Ok(count)) => {
                let hashes = WorkerEvent::Hashes {
                    worker: state.index,
                    count,
                    elapsed: started.elapsed(),
                };
                if events.send(hashes).is_err() {
                    return Exit::Stopped;
                }
                None
            }
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("hash function panicked".to_string()),
        };
        if let Some(reason) = reason {
            error!(target: LOG_TARGET, "Worker {} fault: {}", state.index, reason);
            let _ = events.send(WorkerEvent::Fault { worker: state.index, reason });
            return Exit::Faulted;
        }

        // The only suspension point; a command cuts the pause short
        let delay = compute_delay(state.factor, started.elapsed(), base_interval);
        if !delay.is_zero() {
            match commands.recv_timeout(delay) {
                Ok(command) => {
                    if !state.apply(command) {
                        return Exit::Stopped;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Exit::Stopped,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MAX_TARGET, Sha3xHasher};
    use crossbeam::channel::unbounded;

    fn context(
        index: usize,
        worker_count: usize,
        hasher: Arc<dyn PowHasher>,
        job: Option<Arc<MiningJob>>,
    ) -> (WorkerContext, Sender<WorkerCommand>, Receiver<WorkerEvent>, Receiver<WorkerAck>) {
        let (cmd_tx, cmd_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let (ack_tx, ack_rx) = unbounded();
        let ctx = WorkerContext {
            index,
            worker_count,
            generation: 0,
            nonces_per_iteration: 4,
            base_interval: Duration::from_millis(10),
            hasher,
            job,
            throttle_factor: 1.0,
            commands: cmd_rx,
            events: event_tx,
            ack: ack_tx,
        };
        (ctx, cmd_tx, event_rx, ack_rx)
    }

    #[test]
    fn nonces_are_strided_by_worker_count() {
        let mut state = WorkerLoop {
            index: 2,
            worker_count: 4,
            nonces_per_iteration: 1,
            job: None,
            factor: 1.0,
            round: 0,
        };
        let nonces: Vec<u64> = (0..4).map(|_| state.next_nonce()).collect();
        assert_eq!(nonces, vec![2, 6, 10, 14]);

        let job = Arc::new(MiningJob::new("j", [0; 32], MAX_TARGET, 1));
        assert!(state.apply(WorkerCommand::Job(job)));
        assert_eq!(state.next_nonce(), 2);
    }

    #[test]
    fn worker_reports_shares_and_acks_stop() {
        let job = Arc::new(MiningJob::new("job-1", [7; 32], MAX_TARGET, 1));
        let (ctx, cmd_tx, events, acks) = context(1, 2, Arc::new(Sha3xHasher), Some(job));
        let handle = spawn_worker(ctx).unwrap();

        let mut shares = Vec::new();
        while shares.len() < 4 {
            if let WorkerEvent::Share(share) = events.recv_timeout(Duration::from_secs(5)).unwrap() {
                shares.push(share);
            }
        }
        assert!(shares.iter().all(|s| s.nonce % 2 == 1 && s.job_id == "job-1"));

        cmd_tx.send(WorkerCommand::Stop).unwrap();
        assert_eq!(acks.recv_timeout(Duration::from_secs(5)).unwrap(), (1, 0));
        handle.join().unwrap();
    }

    struct Failing;

    impl PowHasher for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn hash(&self, _: &[u8; 32], _: u64, _: u64) -> Result<[u8; 32], HashError> {
            Err(HashError::Backend("boom".to_string()))
        }
    }

    #[test]
    fn hash_failure_faults_the_worker() {
        let job = Arc::new(MiningJob::new("job-1", [0; 32], MAX_TARGET, 1));
        let (ctx, _cmd_tx, events, acks) = context(0, 1, Arc::new(Failing), Some(job));
        let handle = spawn_worker(ctx).unwrap();

        match events.recv_timeout(Duration::from_secs(5)).unwrap() {
            WorkerEvent::Fault { worker, reason } => {
                assert_eq!(worker, 0);
                assert!(reason.contains("boom"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(acks.recv_timeout(Duration::from_secs(5)).unwrap(), (0, 0));
        handle.join().unwrap();
    }

    #[test]
    fn idle_worker_waits_for_a_job() {
        let (ctx, cmd_tx, events, acks) = context(0, 1, Arc::new(Sha3xHasher), None);
        let handle = spawn_worker(ctx).unwrap();
        assert!(events.recv_timeout(Duration::from_millis(150)).is_err());

        cmd_tx
            .send(WorkerCommand::Job(Arc::new(MiningJob::new("late", [1; 32], MAX_TARGET, 1))))
            .unwrap();
        assert!(events.recv_timeout(Duration::from_secs(5)).is_ok());

        cmd_tx.send(WorkerCommand::Stop).unwrap();
        acks.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
    }
}
