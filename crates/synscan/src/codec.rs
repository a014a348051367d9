//! Wire and display encodings for mount positions.
//!
//! Positions travel as fractions of a full turn: `0.0..1.0` maps to
//! `0..360°` for angles and `0..24h` for right ascension. The mount packs a
//! pair of them as fixed-width uppercase hex separated by a comma.

use crate::error::{Result, SynScanError};
use crate::model::{FirmwareVersion, MountLocation, MountTime};

pub const COARSE_SCALE: f64 = 65536.0;
pub const PRECISE_SCALE: f64 = 16777216.0;

const SEPARATOR: char = ',';
const COARSE_PACKED_LEN: usize = 9;
const PRECISE_PACKED_LEN: usize = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// 16-bit steps, 4 hex digits per axis.
    Coarse,
    /// 24-bit steps, 6 hex digits plus a `00` pad per axis.
    Precise,
}

impl Precision {
    pub fn from_flag(precise: bool) -> Self {
        if precise { Precision::Precise } else { Precision::Coarse }
    }

    pub fn scale(self) -> f64 {
        match self {
            Precision::Coarse => COARSE_SCALE,
            Precision::Precise => PRECISE_SCALE,
        }
    }

    /// Quantization step; a round trip never loses more than this.
    pub fn step(self) -> f64 {
        1.0 / self.scale()
    }
}

pub fn decode_coordinate(packed: &str) -> Result<(f64, f64)> {
    let precision = match packed.len() {
        COARSE_PACKED_LEN => Precision::Coarse,
        PRECISE_PACKED_LEN => Precision::Precise,
        n => return Err(SynScanError::malformed(format!("invalid coordinate length: {}", n))),
    };

    let mut fields = packed.split(SEPARATOR);
    let (Some(a), Some(b), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(SynScanError::malformed(format!("expected two fields in {:?}", packed)));
    };
    Ok((decode_field(a, precision)?, decode_field(b, precision)?))
}

fn decode_field(field: &str, precision: Precision) -> Result<f64> {
    let digits = match precision {
        Precision::Coarse if field.len() == 4 => Some(field),
        // trailing two characters are sub-step padding
        Precision::Precise if field.len() == 8 => field.get(..6),
        _ => None,
    }
    .ok_or_else(|| SynScanError::malformed(format!("bad coordinate field {:?}", field)))?;

    let raw = u32::from_str_radix(digits, 16)
        .map_err(|e| SynScanError::malformed(format!("coordinate field {:?}: {}", field, e)))?;
    Ok(raw as f64 / precision.scale())
}

/// Values outside `0..1` wrap around the circle, so `-0.25` encodes as `0.75`.
pub fn encode_coordinate(coordinate: (f64, f64), precision: Precision) -> String {
    let (a, b) = coordinate;
    format!("{}{}{}", encode_field(a, precision), SEPARATOR, encode_field(b, precision))
}

fn encode_field(value: f64, precision: Precision) -> String {
    let turns = value.rem_euclid(1.0);
    match precision {
        Precision::Coarse => {
            let raw = (turns * COARSE_SCALE) as u32 & 0xFFFF;
            format!("{:04X}", raw)
        }
        Precision::Precise => {
            let raw = (turns * PRECISE_SCALE) as u32 & 0xFF_FFFF;
            format!("{:06X}00", raw)
        }
    }
}

/// Split a fraction into sexagesimal parts, truncating at each level.
/// Returns the whole units, whole minutes and the fractional seconds.
fn sexagesimal(value: f64, full_turn: f64) -> (i64, i64, f64) {
    let units = value * full_turn;
    let whole = units.trunc();
    let minutes = 60.0 * (units - whole);
    let whole_minutes = minutes.trunc();
    let seconds = 60.0 * (minutes - whole_minutes);
    (whole as i64, whole_minutes as i64, seconds)
}

/// `"Hh Mm Ss"`; seconds are rounded half-to-even like the hand controller.
pub fn format_clock(value: f64) -> String {
    let (hours, minutes, seconds) = sexagesimal(value, 24.0);
    format!("{}h {}m {}s", hours, minutes, seconds.round_ties_even() as i64)
}

/// `"D° M’ S”"`; seconds are truncated, unlike [`format_clock`].
pub fn format_degrees(value: f64) -> String {
    let (degrees, minutes, seconds) = sexagesimal(value, 360.0);
    format!("{}° {}’ {}”", degrees, minutes, seconds.trunc() as i64)
}

pub fn from_degrees(value: (f64, f64, f64)) -> f64 {
    let (degrees, minutes, seconds) = value;
    ((seconds / 60.0 + minutes) / 60.0 + degrees) / 360.0
}

pub fn from_clock(value: (f64, f64, f64)) -> f64 {
    let (hours, minutes, seconds) = value;
    ((seconds / 60.0 + minutes) / 60.0 + hours) / 24.0
}

/// Every maximal run of ASCII digits, in order. Separators of any kind are skipped.
pub fn reveal_digits(text: &str) -> Vec<u64> {
    let mut groups = Vec::new();
    let mut current: Option<u64> = None;
    for ch in text.chars() {
        match ch.to_digit(10) {
            Some(d) => {
                let acc = current.unwrap_or(0);
                current = Some(acc.saturating_mul(10).saturating_add(d as u64));
            }
            None => groups.extend(current.take()),
        }
    }
    groups.extend(current);
    groups
}

fn triple(text: &str) -> Result<(f64, f64, f64)> {
    match reveal_digits(text).as_slice() {
        &[a, b, c] => Ok((a as f64, b as f64, c as f64)),
        other => Err(SynScanError::invalid(format!(
            "expected three numbers in {:?}, found {}",
            text,
            other.len()
        ))),
    }
}

pub fn format_ra_dec(ra: f64, dec: f64) -> (String, String) {
    (format_clock(ra), format_degrees(dec))
}

pub fn format_azm_alt(azm: f64, alt: f64) -> (String, String) {
    (format_degrees(azm), format_degrees(alt))
}

/// Parse typed-in display strings such as `"5h 35m 17s"` and `"22° 0’ 52”"`.
pub fn parse_ra_dec(ra: &str, dec: &str) -> Result<(f64, f64)> {
    Ok((from_clock(triple(ra)?), from_degrees(triple(dec)?)))
}

pub fn format_version(raw: &[u8]) -> Result<String> {
    Ok(FirmwareVersion::from_reply(raw)?.to_string())
}

pub fn format_datetime(raw: &[u8]) -> Result<String> {
    Ok(MountTime::from_bytes(raw)?.to_string())
}

pub fn format_location(raw: &[u8]) -> Result<String> {
    Ok(MountLocation::from_bytes(raw)?.to_string())
}
