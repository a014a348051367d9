use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Result, SynScanError};
use crate::executor::{ExecutorHandle, Progress};
use crate::WatchdogConfig;

/// Echo command: the mount answers with the character after `K`.
pub const PING_FRAME: &[u8] = b"Kp";
const PING_REPLY: &[u8] = b"p";

/// Background liveness check sharing the executor's queue.
///
/// The ping is not prioritised, so the deadline runs from the later of the
/// ping's submission and the most recent dispatch of any command. A backlog
/// that keeps moving never trips it; one exchange stuck on the wire does.
pub struct Watchdog {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Watchdog {
    pub fn spawn(handle: ExecutorHandle, cfg: &WatchdogConfig) -> Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let ping_timeout = cfg.ping_timeout();
        let interval = cfg.interval();

        let worker = std::thread::Builder::new()
            .name("synscan-watchdog".into())
            .spawn(move || loop {
                if let Err(e) = ping_once(&handle, ping_timeout) {
                    if matches!(stopped.try_recv(), Err(mpsc::TryRecvError::Empty)) {
                        handle.poison(e);
                    }
                    return;
                }
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    _ => return,
                }
            })
            .map_err(|e| SynScanError::unavailable(format!("spawn watchdog: {}", e)))?;

        info!("watchdog armed: deadline {:?}, every {:?}", ping_timeout, interval);
        Ok(Self { stop: Some(stop), worker: Some(worker) })
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        drop(self.stop.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

pub fn ping_once(handle: &ExecutorHandle, deadline: Duration) -> Result<()> {
    let ticket = handle.submit(PING_FRAME)?;
    let submitted = Instant::now();
    loop {
        let snap = handle.snapshot(ticket);
        match snap.progress {
            Progress::Done => {
                let reply = handle.wait(ticket)?;
                if reply != PING_REPLY {
                    return Err(SynScanError::unavailable(format!(
                        "ping echoed {:?}, link out of sync",
                        String::from_utf8_lossy(&reply)
                    )));
                }
                debug!("ping ok in {:?}", submitted.elapsed());
                return Ok(());
            }
            Progress::Closed => return Err(SynScanError::unavailable("command queue closed")),
            Progress::Queued | Progress::InFlight => {
                let clock = snap.last_dispatch.map_or(submitted, |d| d.max(submitted));
                if clock.elapsed() > deadline {
                    return Err(SynScanError::unavailable(format!(
                        "no reply to ping within {:?}",
                        deadline
                    )));
                }
            }
        }
        std::thread::sleep(handle.poll_interval());
    }
}
