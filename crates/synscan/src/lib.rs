pub mod autodetect;
pub mod channel;
pub mod client;
pub mod codec;
pub mod commands;
pub mod error;
pub mod executor;
pub mod model;
pub mod watchdog;

use std::time::Duration;

use serde::Deserialize;

pub use client::MountClient;
pub use codec::Precision;
pub use commands::{Axis, Commander, Getter, Sense};
pub use error::{Result, SynScanError};
pub use model::TrackMode;

/// SynScan hand controllers of this generation only talk at 9600 baud.
pub const SYNSCAN_BAUD: u32 = 9600;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Fixed device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub serial_dev: Option<String>,

    /// Pick the only serial port the OS reports instead of `serial_dev`.
    pub autodetect: bool,

    pub baud: u32,

    /// Read timeout on the port and idle period of the command loop.
    pub poll_interval_ms: u64,

    /// Longest a single command may wait for its `#`.
    pub exchange_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            serial_dev: None,
            autodetect: true,
            baud: SYNSCAN_BAUD,
            poll_interval_ms: 10,
            exchange_timeout_ms: 1000,
        }
    }
}

impl SerialConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.exchange_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub enable: bool,

    /// Ping deadline; a miss takes the whole process down.
    pub ping_timeout_ms: u64,

    /// Idle time between successful pings.
    pub interval_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self { enable: true, ping_timeout_ms: 1000, interval_ms: 10_000 }
    }
}

impl WatchdogConfig {
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
