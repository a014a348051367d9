//! Single-writer command queue.
//!
//! Any number of threads submit frames; one worker thread owns the
//! [`Transport`] and sends them strictly in correlation-id order. A transport
//! fault or a watchdog verdict poisons the queue: every waiting caller wakes
//! with [`SynScanError::DeviceUnavailable`] and later submissions are refused.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::channel::Transport;
use crate::error::{Result, SynScanError};

/// Called once, after the queue is poisoned, with the reason.
pub type FatalHook = Arc<dyn Fn(&SynScanError) + Send + Sync>;

/// Correlation id of a submitted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Queued,
    InFlight,
    Done,
    /// Poisoned or shut down; the reply will never come.
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub progress: Progress,
    /// When the worker last put any command on the wire.
    pub last_dispatch: Option<Instant>,
}

enum State {
    Queued,
    InFlight,
    Done(Vec<u8>),
}

struct Command {
    frame: Vec<u8>,
    state: State,
}

#[derive(Default)]
struct Table {
    last_id: u64,
    pending: BTreeMap<u64, Command>,
    last_dispatch: Option<Instant>,
    poisoned: Option<String>,
    stopping: bool,
}

impl Table {
    fn closed(&self) -> Option<SynScanError> {
        if let Some(reason) = &self.poisoned {
            return Some(SynScanError::unavailable(reason.clone()));
        }
        self.stopping.then(|| SynScanError::unavailable("command executor stopped"))
    }
}

struct Shared {
    table: Mutex<Table>,
    /// Wakes the worker when something is queued.
    submitted: Condvar,
    /// Wakes callers when a command finishes or the queue closes.
    completed: Condvar,
    poll_interval: Duration,
    on_fatal: FatalHook,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheap clonable access to the queue, used by callers and the watchdog.
#[derive(Clone)]
pub struct ExecutorHandle {
    shared: Arc<Shared>,
}

impl ExecutorHandle {
    pub fn submit(&self, frame: impl Into<Vec<u8>>) -> Result<Ticket> {
        let mut table = self.shared.lock();
        if let Some(e) = table.closed() {
            return Err(e);
        }
        table.last_id += 1;
        let id = table.last_id;
        table.pending.insert(id, Command { frame: frame.into(), state: State::Queued });
        drop(table);
        self.shared.submitted.notify_one();
        Ok(Ticket(id))
    }

    /// Block until the reply for `ticket` is ready, then take it.
    pub fn wait(&self, ticket: Ticket) -> Result<Vec<u8>> {
        let mut table = self.shared.lock();
        loop {
            if let Some(e) = table.closed() {
                table.pending.remove(&ticket.0);
                return Err(e);
            }
            match table.pending.get(&ticket.0).map(|c| matches!(c.state, State::Done(_))) {
                Some(true) => {
                    if let Some(Command { state: State::Done(reply), .. }) = table.pending.remove(&ticket.0) {
                        return Ok(reply);
                    }
                }
                Some(false) => {}
                None => {
                    return Err(SynScanError::invalid(format!("unknown ticket {}", ticket.0)));
                }
            }
            table = self
                .shared
                .completed
                .wait_timeout(table, self.shared.poll_interval)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub fn execute(&self, frame: impl Into<Vec<u8>>) -> Result<Vec<u8>> {
        let ticket = self.submit(frame)?;
        self.wait(ticket)
    }

    pub fn snapshot(&self, ticket: Ticket) -> Snapshot {
        let table = self.shared.lock();
        let progress = if table.closed().is_some() {
            Progress::Closed
        } else {
            match table.pending.get(&ticket.0).map(|c| &c.state) {
                Some(State::Queued) => Progress::Queued,
                Some(State::InFlight) => Progress::InFlight,
                Some(State::Done(_)) => Progress::Done,
                None => Progress::Closed,
            }
        };
        Snapshot { progress, last_dispatch: table.last_dispatch }
    }

    /// Fail everything, now and from here on. Only the first reason is kept
    /// and only the first call runs the fatal hook.
    pub fn poison(&self, reason: SynScanError) {
        let mut table = self.shared.lock();
        if table.poisoned.is_some() {
            return;
        }
        table.poisoned = Some(reason.to_string());
        let abandoned = table.pending.len();
        table.pending.clear();
        drop(table);

        error!("mount declared unavailable ({} commands abandoned): {}", abandoned, reason);
        (self.shared.on_fatal)(&reason);
        self.shared.submitted.notify_all();
        self.shared.completed.notify_all();
    }

    pub fn is_poisoned(&self) -> bool {
        self.shared.lock().poisoned.is_some()
    }

    pub fn poll_interval(&self) -> Duration {
        self.shared.poll_interval
    }

    fn next_queued(&self) -> Option<(u64, Vec<u8>)> {
        let mut table = self.shared.lock();
        loop {
            if table.closed().is_some() {
                return None;
            }
            let next = table
                .pending
                .iter()
                .find_map(|(id, c)| matches!(c.state, State::Queued).then_some(*id));
            if let Some(id) = next {
                table.last_dispatch = Some(Instant::now());
                let cmd = table.pending.get_mut(&id)?;
                cmd.state = State::InFlight;
                return Some((id, cmd.frame.clone()));
            }
            table = self
                .shared
                .submitted
                .wait_timeout(table, self.shared.poll_interval)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn complete(&self, id: u64, reply: Vec<u8>) {
        let mut table = self.shared.lock();
        if let Some(cmd) = table.pending.get_mut(&id) {
            cmd.state = State::Done(reply);
        }
        drop(table);
        self.shared.completed.notify_all();
    }
}

/// Poisons the queue if the worker leaves its loop for any reason other
/// than a requested stop, panics included.
struct WorkerGuard(ExecutorHandle);

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let stopping = self.0.shared.lock().stopping;
        if !stopping {
            self.0.poison(SynScanError::unavailable("command worker exited"));
        }
    }
}

fn worker_loop(handle: ExecutorHandle, mut transport: Box<dyn Transport>) {
    let _guard = WorkerGuard(handle.clone());
    while let Some((id, frame)) = handle.next_queued() {
        match transport.transmit(&frame) {
            Ok(reply) => handle.complete(id, reply),
            Err(e) => {
                let e = match e {
                    fatal @ SynScanError::DeviceUnavailable(_) => fatal,
                    other => SynScanError::unavailable(other.to_string()),
                };
                handle.poison(e);
                return;
            }
        }
    }
}

/// Owns the worker thread; dropping it stops the worker.
pub struct Executor {
    handle: ExecutorHandle,
    worker: Option<JoinHandle<()>>,
}

impl Executor {
    pub fn start(transport: Box<dyn Transport>, poll_interval: Duration, on_fatal: FatalHook) -> Result<Self> {
        let handle = ExecutorHandle {
            shared: Arc::new(Shared {
                table: Mutex::new(Table::default()),
                submitted: Condvar::new(),
                completed: Condvar::new(),
                poll_interval,
                on_fatal,
            }),
        };
        let worker_handle = handle.clone();
        let worker = std::thread::Builder::new()
            .name("synscan-executor".into())
            .spawn(move || worker_loop(worker_handle, transport))
            .map_err(|e| SynScanError::unavailable(format!("spawn command worker: {}", e)))?;
        info!("command executor started (poll {:?})", poll_interval);
        Ok(Self { handle, worker: Some(worker) })
    }

    pub fn handle(&self) -> ExecutorHandle {
        self.handle.clone()
    }

    pub fn execute(&self, frame: impl Into<Vec<u8>>) -> Result<Vec<u8>> {
        self.handle.execute(frame)
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.handle.shared.lock().stopping = true;
        self.handle.shared.submitted.notify_all();
        self.handle.shared.completed.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
