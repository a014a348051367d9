pub mod mock;
pub mod real;
pub mod request;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use synscan::executor::FatalHook;
use synscan::{SerialConfig, WatchdogConfig};

pub use mock::MockMount;
pub use real::RealMount;
pub use request::{Direction, GotoRequest, SlewRequest};

/// What the orchestration layer drives, hardware or not.
pub trait Mount: Send + Sync {
    /// Right ascension and declination as display strings.
    fn get_coordinates(&self) -> Result<(String, String)>;

    fn get_azm_alt(&self) -> Result<(String, String)>;

    fn start_slew(&self, req: &SlewRequest) -> Result<()>;

    fn stop_slew(&self) -> Result<()>;

    fn goto_coordinates(&self, req: &GotoRequest) -> Result<()>;

    fn cancel_goto(&self) -> Result<()>;

    fn describe(&self) -> Result<MountInfo>;
}

#[derive(Debug, Clone, Serialize)]
pub struct MountInfo {
    pub port: String,
    pub model: String,
    pub version: String,
    pub time: String,
    pub location: String,
    pub tracking: String,
    pub aligned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkMode {
    Real,
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    pub workmode: WorkMode,

    /// Signed slew rates the operator may request; anything else is refused.
    pub slew_speeds: Vec<i8>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self { workmode: WorkMode::Real, slew_speeds: vec![-7, -2, 2, 7] }
    }
}

/// Build the mount for `cfg.workmode`. `port` overrides serial config
/// discovery, which is how the caller settles an ambiguous port list.
pub fn mount_factory(
    cfg: &MountConfig,
    serial: &SerialConfig,
    watchdog: &WatchdogConfig,
    port: Option<&str>,
    on_fatal: FatalHook,
) -> Result<Box<dyn Mount>> {
    match cfg.workmode {
        WorkMode::Mock => {
            info!("mount: mock mode");
            Ok(Box::new(MockMount::new(cfg.slew_speeds.clone())))
        }
        WorkMode::Real => {
            let dev = match port {
                Some(dev) => dev.to_string(),
                None => synscan::autodetect::resolve_port(serial)
                    .context("choose the mount port with --port or serial.serial_dev")?,
            };
            let mount = RealMount::open(&dev, cfg.slew_speeds.clone(), serial, watchdog, on_fatal)?;
            Ok(Box::new(mount))
        }
    }
}
