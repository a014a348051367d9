//! SynScan hand controller command set.
//!
//! Each command is a short frame whose first byte selects the operation.
//! [`Getter`] and [`Commander`] are implemented for anything that can run a
//! frame, so the executor handle and the full client share one vocabulary.

use crate::codec::{decode_coordinate, encode_coordinate, Precision};
use crate::error::{Result, SynScanError};
use crate::executor::{Executor, ExecutorHandle};
use crate::model::{model_name, FirmwareVersion, MountLocation, MountTime, TrackMode};

/// Highest fixed slew rate the hand controller accepts.
pub const MAX_SLEW_RATE: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Ra,
    Dec,
}

impl Axis {
    fn selector(self) -> u8 {
        match self {
            Axis::Ra => 0x10,
            Axis::Dec => 0x11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Positive,
    Negative,
}

impl Sense {
    fn byte(self) -> u8 {
        match self {
            Sense::Positive => b'$',
            Sense::Negative => b'%',
        }
    }
}

/// Anything that can put a frame on the mount link and return the reply.
pub trait CommandSink {
    fn run(&self, frame: &[u8]) -> Result<Vec<u8>>;
}

impl CommandSink for ExecutorHandle {
    fn run(&self, frame: &[u8]) -> Result<Vec<u8>> {
        self.execute(frame)
    }
}

impl CommandSink for Executor {
    fn run(&self, frame: &[u8]) -> Result<Vec<u8>> {
        self.execute(frame)
    }
}

fn single_byte(reply: &[u8], what: &str) -> Result<u8> {
    match reply {
        [b] => Ok(*b),
        other => Err(SynScanError::malformed(format!("{} reply {:?}", what, other))),
    }
}

fn coordinate_reply(reply: &[u8]) -> Result<(f64, f64)> {
    let text = std::str::from_utf8(reply)
        .map_err(|_| SynScanError::malformed(format!("coordinate reply {:?}", reply)))?;
    decode_coordinate(text)
}

fn with_payload(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 1);
    frame.push(code);
    frame.extend_from_slice(payload);
    frame
}

fn coordinate_frame(precise: u8, coarse: u8, coordinate: (f64, f64), precision: Precision) -> Vec<u8> {
    let code = match precision {
        Precision::Precise => precise,
        Precision::Coarse => coarse,
    };
    with_payload(code, encode_coordinate(coordinate, precision).as_bytes())
}

pub trait Getter: CommandSink {
    fn get_ra_dec(&self, precision: Precision) -> Result<(f64, f64)> {
        let code: &[u8] = if precision == Precision::Precise { b"e" } else { b"E" };
        coordinate_reply(&self.run(code)?)
    }

    fn get_azm_alt(&self, precision: Precision) -> Result<(f64, f64)> {
        let code: &[u8] = if precision == Precision::Precise { b"z" } else { b"Z" };
        coordinate_reply(&self.run(code)?)
    }

    fn get_tracking(&self) -> Result<TrackMode> {
        TrackMode::from_byte(single_byte(&self.run(b"t")?, "tracking")?)
    }

    fn get_location(&self) -> Result<MountLocation> {
        MountLocation::from_bytes(&self.run(b"w")?)
    }

    fn get_version(&self) -> Result<FirmwareVersion> {
        FirmwareVersion::from_reply(&self.run(b"V")?)
    }

    fn get_model(&self) -> Result<&'static str> {
        model_name(single_byte(&self.run(b"m")?, "model")?)
    }

    fn get_time(&self) -> Result<MountTime> {
        MountTime::from_bytes(&self.run(b"h")?)
    }

    /// Side of pier as the controller reports it (`E` or `W`).
    fn get_pier_side(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.run(b"p")?).into_owned())
    }

    fn is_alignment_complete(&self) -> Result<bool> {
        Ok(single_byte(&self.run(b"J")?, "alignment")? == 0x01)
    }

    fn is_goto_in_progress(&self) -> Result<bool> {
        Ok(single_byte(&self.run(b"J")?, "goto status")? == b'1')
    }

    fn echo(&self, ch: u8) -> Result<u8> {
        single_byte(&self.run(&[b'K', ch])?, "echo")
    }
}

pub trait Commander: CommandSink {
    /// Fixed-rate slew on one axis; rate 0 stops the axis.
    fn slew_axis(&self, axis: Axis, sense: Sense, rate: u8) -> Result<()> {
        if rate > MAX_SLEW_RATE {
            return Err(SynScanError::invalid(format!(
                "slew rate {} above {}",
                rate, MAX_SLEW_RATE
            )));
        }
        self.run(&[b'P', 2, axis.selector(), sense.byte(), rate, 0, 0, 0])?;
        Ok(())
    }

    fn cancel_goto(&self) -> Result<()> {
        self.run(b"M")?;
        Ok(())
    }

    fn goto_ra_dec(&self, ra: f64, dec: f64, precision: Precision) -> Result<()> {
        self.run(&coordinate_frame(b'r', b'R', (ra, dec), precision))?;
        Ok(())
    }

    fn goto_azm_alt(&self, azm: f64, alt: f64, precision: Precision) -> Result<()> {
        self.run(&coordinate_frame(b'b', b'B', (azm, alt), precision))?;
        Ok(())
    }

    /// Tell the mount it is pointing at `ra`/`dec` without moving.
    fn sync_ra_dec(&self, ra: f64, dec: f64, precision: Precision) -> Result<()> {
        self.run(&coordinate_frame(b's', b'S', (ra, dec), precision))?;
        Ok(())
    }

    fn set_tracking(&self, mode: TrackMode) -> Result<()> {
        self.run(&[b'T', mode.as_byte()])?;
        Ok(())
    }

    fn set_location(&self, location: &MountLocation) -> Result<()> {
        self.run(&with_payload(b'W', &location.to_bytes()))?;
        Ok(())
    }

    fn set_time(&self, time: &MountTime) -> Result<()> {
        self.run(&with_payload(b'H', &time.to_bytes()?))?;
        Ok(())
    }
}

impl<T: CommandSink + ?Sized> Getter for T {}
impl<T: CommandSink + ?Sized> Commander for T {}
