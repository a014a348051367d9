use anyhow::Result;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use synscan::codec;

use crate::request::{GotoRequest, SlewRequest};
use crate::{Mount, MountInfo};

/// Bench stand-in: logs every call and reports a slowly drifting position.
pub struct MockMount {
    slew_speeds: Vec<i8>,
}

impl MockMount {
    pub fn new(slew_speeds: Vec<i8>) -> Self {
        Self { slew_speeds }
    }

    fn drift() -> (f64, f64) {
        let t = OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9 * 0.00002;
        (t.sin().powi(2), t.cos().powi(2))
    }
}

fn log_call(method: &str, args: Option<&impl Serialize>) {
    match args.map(serde_json::to_string_pretty) {
        Some(Ok(json)) => info!("[MOUNT] Called `{}` method with args {}", method, json),
        _ => info!("[MOUNT] Called `{}` method", method),
    }
}

impl Mount for MockMount {
    fn get_coordinates(&self) -> Result<(String, String)> {
        log_call("get_coordinates", None::<&()>);
        let (ra, dec) = Self::drift();
        Ok(codec::format_ra_dec(ra, dec))
    }

    fn get_azm_alt(&self) -> Result<(String, String)> {
        log_call("get_azm_alt", None::<&()>);
        let (azm, alt) = Self::drift();
        Ok(codec::format_azm_alt(azm, alt / 4.0))
    }

    fn start_slew(&self, req: &SlewRequest) -> Result<()> {
        req.validate(&self.slew_speeds)?;
        log_call("start_slew", Some(req));
        Ok(())
    }

    fn stop_slew(&self) -> Result<()> {
        log_call("stop_slew", None::<&()>);
        Ok(())
    }

    fn goto_coordinates(&self, req: &GotoRequest) -> Result<()> {
        // same parse as the real mount so bad input fails the same way
        codec::parse_ra_dec(&req.ra, &req.dec)?;
        log_call("goto_coordinates", Some(req));
        Ok(())
    }

    fn cancel_goto(&self) -> Result<()> {
        log_call("cancel_goto", None::<&()>);
        Ok(())
    }

    fn describe(&self) -> Result<MountInfo> {
        Ok(MountInfo {
            port: "mock".into(),
            model: "Mock GOTO Series".into(),
            version: "00.00.00".into(),
            time: OffsetDateTime::now_utc().to_string(),
            location: "0°0’0” E, 0°0’0” N".into(),
            tracking: "Off".into(),
            aligned: true,
        })
    }
}
