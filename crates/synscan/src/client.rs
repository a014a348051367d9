use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::autodetect;
use crate::channel::{SerialChannel, Transport};
use crate::codec::{self, Precision};
use crate::commands::{Axis, CommandSink, Commander, Getter, Sense};
use crate::error::{Result, SynScanError};
use crate::executor::{Executor, ExecutorHandle, FatalHook};
use crate::watchdog::Watchdog;
use crate::{SerialConfig, WatchdogConfig};

/// Exit status used when the mount is declared unavailable.
pub const EXIT_DEVICE_UNAVAILABLE: i32 = 69;

/// Default fatal hook: report, then end the process.
pub fn exit_on_fatal() -> FatalHook {
    Arc::new(|e: &SynScanError| {
        error!("stopping: mount unusable: {}", e);
        eprintln!("fatal: {}", e);
        std::process::exit(EXIT_DEVICE_UNAVAILABLE);
    })
}

/// One mount on one serial link: the executor, its watchdog and the full
/// command vocabulary through [`Getter`] and [`Commander`].
pub struct MountClient {
    // declared first so it stops pinging before the executor shuts down
    watchdog: Option<Watchdog>,
    executor: Executor,
    port: String,
}

impl MountClient {
    pub fn open(dev: &str, serial: &SerialConfig, watchdog: &WatchdogConfig, on_fatal: FatalHook) -> Result<Self> {
        let channel = SerialChannel::open(dev, serial)?;
        Self::with_transport(Box::new(channel), dev, serial.poll_interval(), watchdog, on_fatal)
    }

    /// Open the configured port, or the only one the OS reports.
    pub fn connect(serial: &SerialConfig, watchdog: &WatchdogConfig, on_fatal: FatalHook) -> Result<Self> {
        let dev = autodetect::resolve_port(serial)?;
        Self::open(&dev, serial, watchdog, on_fatal)
    }

    pub fn with_transport(
        transport: Box<dyn Transport>,
        port: &str,
        poll_interval: Duration,
        watchdog: &WatchdogConfig,
        on_fatal: FatalHook,
    ) -> Result<Self> {
        let executor = Executor::start(transport, poll_interval, on_fatal)?;
        let watchdog = if watchdog.enable {
            Some(Watchdog::spawn(executor.handle(), watchdog)?)
        } else {
            None
        };
        info!("mount client ready on {}", port);
        Ok(Self { watchdog, executor, port: port.to_string() })
    }

    pub fn available_ports() -> Result<Vec<String>> {
        autodetect::available_ports()
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn handle(&self) -> ExecutorHandle {
        self.executor.handle()
    }

    pub fn has_watchdog(&self) -> bool {
        self.watchdog.is_some()
    }

    /// Signed-rate slew: the sign picks the direction, the magnitude the rate.
    pub fn slew(&self, axis: Axis, speed: i8) -> Result<()> {
        let sense = if speed >= 0 { Sense::Positive } else { Sense::Negative };
        self.slew_axis(axis, sense, speed.unsigned_abs())
    }

    pub fn slew_ra(&self, speed: i8) -> Result<()> {
        self.slew(Axis::Ra, speed)
    }

    pub fn slew_dec(&self, speed: i8) -> Result<()> {
        self.slew(Axis::Dec, speed)
    }

    /// Zero-rate slew on both axes.
    pub fn stop(&self) -> Result<()> {
        self.slew_ra(0)?;
        self.slew_dec(0)
    }

    pub fn ra_dec_display(&self) -> Result<(String, String)> {
        let (ra, dec) = self.get_ra_dec(Precision::Precise)?;
        Ok(codec::format_ra_dec(ra, dec))
    }

    pub fn azm_alt_display(&self) -> Result<(String, String)> {
        let (azm, alt) = self.get_azm_alt(Precision::Precise)?;
        Ok(codec::format_azm_alt(azm, alt))
    }

    /// Goto typed-in display coordinates, e.g. `"5h 35m 17s"`, `"22° 0’ 52”"`.
    pub fn goto_display(&self, ra: &str, dec: &str) -> Result<()> {
        let (ra, dec) = codec::parse_ra_dec(ra, dec)?;
        self.goto_ra_dec(ra, dec, Precision::Precise)
    }
}

impl CommandSink for MountClient {
    fn run(&self, frame: &[u8]) -> Result<Vec<u8>> {
        self.executor.execute(frame)
    }
}
