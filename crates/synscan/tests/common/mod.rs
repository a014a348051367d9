#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use synscan::channel::Transport;
use synscan::executor::FatalHook;
use synscan::{MountClient, SynScanError, WatchdogConfig};

pub type FrameLog = Arc<Mutex<Vec<Vec<u8>>>>;

/// In-memory hand controller answering the command set with fixed values.
pub struct SimMount {
    pub log: FrameLog,
    pub model: u8,
    /// Answer this many frames, then fail the link.
    pub fail_after: Option<usize>,
    /// Answer this many frames, then block until the sender is dropped.
    pub freeze_after: Option<(usize, mpsc::Receiver<()>)>,
}

impl SimMount {
    pub fn new() -> Self {
        Self { log: FrameLog::default(), model: 1, fail_after: None, freeze_after: None }
    }

    fn reply(&self, frame: &[u8]) -> Vec<u8> {
        match frame {
            b"e" => b"40000000,20000000".to_vec(),
            b"E" => b"4000,2000".to_vec(),
            b"z" => b"80000000,10000000".to_vec(),
            b"Z" => b"8000,1000".to_vec(),
            b"t" => vec![2],
            b"w" => vec![55, 45, 20, 1, 37, 37, 6, 1],
            b"V" => b"042507".to_vec(),
            b"m" => vec![self.model],
            b"h" => vec![22, 15, 0, 6, 21, 24, 3, 0],
            b"J" => vec![1],
            b"p" => b"W".to_vec(),
            [b'K', ch] => vec![*ch],
            _ => Vec::new(),
        }
    }
}

impl Transport for SimMount {
    fn transmit(&mut self, frame: &[u8]) -> synscan::Result<Vec<u8>> {
        let seen = {
            let mut log = self.log.lock().unwrap();
            log.push(frame.to_vec());
            log.len()
        };
        if let Some(limit) = self.fail_after {
            if seen > limit {
                return Err(SynScanError::unavailable("simulated unplug"));
            }
        }
        if let Some((limit, release)) = &self.freeze_after {
            if seen > *limit {
                let _ = release.recv();
                return Err(SynScanError::unavailable("simulated freeze"));
            }
        }
        Ok(self.reply(frame))
    }
}

pub fn counting_hook() -> (FatalHook, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let hook: FatalHook = Arc::new(move |_: &SynScanError| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (hook, calls)
}

pub fn no_watchdog() -> WatchdogConfig {
    WatchdogConfig { enable: false, ..WatchdogConfig::default() }
}

pub fn sim_client(sim: SimMount) -> (MountClient, FrameLog, Arc<AtomicUsize>) {
    let log = sim.log.clone();
    let (hook, calls) = counting_hook();
    let client = MountClient::with_transport(
        Box::new(sim),
        "sim",
        Duration::from_millis(1),
        &no_watchdog(),
        hook,
    )
    .unwrap();
    (client, log, calls)
}
