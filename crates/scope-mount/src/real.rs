use anyhow::{Context, Result};
use tracing::info;

use synscan::executor::FatalHook;
use synscan::{Commander, Getter, MountClient, SerialConfig, WatchdogConfig};

use crate::request::{GotoRequest, SlewRequest};
use crate::{Mount, MountInfo};

pub struct RealMount {
    client: MountClient,
    slew_speeds: Vec<i8>,
}

impl RealMount {
    pub fn open(
        dev: &str,
        slew_speeds: Vec<i8>,
        serial: &SerialConfig,
        watchdog: &WatchdogConfig,
        on_fatal: FatalHook,
    ) -> Result<Self> {
        let client = MountClient::open(dev, serial, watchdog, on_fatal)
            .with_context(|| format!("open mount on {}", dev))?;
        Ok(Self::from_client(client, slew_speeds))
    }

    pub fn from_client(client: MountClient, slew_speeds: Vec<i8>) -> Self {
        Self { client, slew_speeds }
    }

    pub fn client(&self) -> &MountClient {
        &self.client
    }
}

impl Mount for RealMount {
    fn get_coordinates(&self) -> Result<(String, String)> {
        self.client.ra_dec_display().context("read ra/dec")
    }

    fn get_azm_alt(&self) -> Result<(String, String)> {
        self.client.azm_alt_display().context("read azm/alt")
    }

    fn start_slew(&self, req: &SlewRequest) -> Result<()> {
        req.validate(&self.slew_speeds)?;
        info!("slew {:?} at {}", req.direction, req.speed);
        self.client.slew(req.direction.into(), req.speed).context("start slew")?;
        Ok(())
    }

    fn stop_slew(&self) -> Result<()> {
        self.client.stop().context("stop slew")?;
        Ok(())
    }

    fn goto_coordinates(&self, req: &GotoRequest) -> Result<()> {
        info!("goto ra={} dec={}", req.ra, req.dec);
        self.client
            .goto_display(&req.ra, &req.dec)
            .with_context(|| format!("goto {} {}", req.ra, req.dec))?;
        Ok(())
    }

    fn cancel_goto(&self) -> Result<()> {
        self.client.cancel_goto().context("cancel goto")?;
        Ok(())
    }

    fn describe(&self) -> Result<MountInfo> {
        let c = &self.client;
        Ok(MountInfo {
            port: c.port().to_string(),
            model: c.get_model().context("read model")?.to_string(),
            version: c.get_version().context("read version")?.to_string(),
            time: c.get_time().context("read time")?.to_string(),
            location: c.get_location().context("read location")?.to_string(),
            tracking: format!("{:?}", c.get_tracking().context("read tracking")?),
            aligned: c.is_alignment_complete().context("read alignment")?,
        })
    }
}
