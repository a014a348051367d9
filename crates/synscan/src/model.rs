use std::fmt;

use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::{Result, SynScanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMode {
    Off,
    AltAz,
    Equatorial,
    Pec,
}

impl TrackMode {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(TrackMode::Off),
            1 => Ok(TrackMode::AltAz),
            2 => Ok(TrackMode::Equatorial),
            3 => Ok(TrackMode::Pec),
            other => Err(SynScanError::malformed(format!("tracking mode byte {}", other))),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            TrackMode::Off => 0,
            TrackMode::AltAz => 1,
            TrackMode::Equatorial => 2,
            TrackMode::Pec => 3,
        }
    }
}

/// Hand controller model code to product line.
pub fn model_name(code: u8) -> Result<&'static str> {
    let name = match code {
        0 => "EQ6 GOTO Series",
        1 => "HEQ5 GOTO Series",
        2 => "EQ5 GOTO Series",
        3 => "EQ3 GOTO Series",
        4 => "EQ8 GOTO Series",
        5 => "AZ-EQ6 GOTO Series",
        6 => "AZ-EQ5 GOTO Series",
        128..=143 => "AZ GOTO Series",
        144..=159 => "DOB GOTO Series",
        160 => "AllView GOTO Series",
        other => return Err(SynScanError::UnknownModel(other)),
    };
    Ok(name)
}

fn exact<const N: usize>(raw: &[u8], what: &str) -> Result<[u8; N]> {
    raw.try_into()
        .map_err(|_| SynScanError::malformed(format!("{} reply has {} bytes, expected {}", what, raw.len(), N)))
}

/// Firmware version, sent as six hex digits, two per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion([u8; 6]);

impl FirmwareVersion {
    pub fn from_reply(raw: &[u8]) -> Result<Self> {
        let digits: [u8; 6] = exact(raw, "version")?;
        let mut nibbles = [0u8; 6];
        for (n, d) in nibbles.iter_mut().zip(digits) {
            *n = (d as char)
                .to_digit(16)
                .ok_or_else(|| SynScanError::malformed(format!("version digit {:?}", d as char)))?
                as u8;
        }
        Ok(Self(nibbles))
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = &self.0;
        write!(f, "{}{}.{}{}.{}{}", v[0], v[1], v[2], v[3], v[4], v[5])
    }
}

/// Local time kept by the hand controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountTime {
    pub at: OffsetDateTime,
    pub dst: bool,
}

impl MountTime {
    /// Layout: hour, minute, second, month, day, year-2000, UTC offset as i8 hours, DST flag.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let b: [u8; 8] = exact(raw, "time")?;
        let bad = |e: &dyn fmt::Display| SynScanError::malformed(format!("time reply {:?}: {}", b, e));

        let month = Month::try_from(b[3]).map_err(|e| bad(&e))?;
        let date = Date::from_calendar_date(2000 + b[5] as i32, month, b[4]).map_err(|e| bad(&e))?;
        let clock = Time::from_hms(b[0], b[1], b[2]).map_err(|e| bad(&e))?;
        let offset = UtcOffset::from_hms(b[6] as i8, 0, 0).map_err(|e| bad(&e))?;

        Ok(Self {
            at: PrimitiveDateTime::new(date, clock).assume_offset(offset),
            dst: b[7] != 0,
        })
    }

    /// Years outside 2000..=2255 and sub-hour offsets have no encoding.
    pub fn to_bytes(&self) -> Result<[u8; 8]> {
        let at = self.at;
        let year = u8::try_from(at.year() - 2000)
            .map_err(|_| SynScanError::invalid(format!("year {} outside 2000..=2255", at.year())))?;
        let offset = at.offset();
        if offset.minutes_past_hour() != 0 || offset.seconds_past_minute() != 0 {
            return Err(SynScanError::invalid(format!("UTC offset {} is not whole hours", offset)));
        }
        Ok([
            at.hour(),
            at.minute(),
            at.second(),
            u8::from(at.month()),
            at.day(),
            year,
            offset.whole_hours() as u8,
            u8::from(self.dst),
        ])
    }
}

impl fmt::Display for MountTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = format_description!(
            "[hour repr:12]:[minute]:[second][period] [month repr:long] [day], [year]"
        );
        let text = self.at.format(layout).map_err(|_| fmt::Error)?;
        let offset = self.at.offset();
        if offset.is_utc() {
            write!(f, "{} UTC", text)
        } else {
            let (h, m, _) = offset.as_hms();
            let sign = if offset.is_negative() { '-' } else { '+' };
            write!(f, "{} UTC{}{:02}:{:02}", text, sign, h.unsigned_abs(), m.unsigned_abs())
        }
    }
}

const LONGITUDE_HEMISPHERES: [char; 2] = ['W', 'E'];
const LATITUDE_HEMISPHERES: [char; 2] = ['S', 'N'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dms {
    pub degrees: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl fmt::Display for Dms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°{}’{}”", self.degrees, self.minutes, self.seconds)
    }
}

/// Observing site stored in the hand controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountLocation {
    pub latitude: Dms,
    pub north: bool,
    pub longitude: Dms,
    pub east: bool,
}

impl MountLocation {
    /// Layout: lat d/m/s, longitude flag 0=W 1=E, lon d/m/s, latitude flag 0=S 1=N.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let b: [u8; 8] = exact(raw, "location")?;
        let flag = |v: u8| match v {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SynScanError::malformed(format!("hemisphere flag {}", other))),
        };
        Ok(Self {
            latitude: Dms { degrees: b[0], minutes: b[1], seconds: b[2] },
            east: flag(b[3])?,
            longitude: Dms { degrees: b[4], minutes: b[5], seconds: b[6] },
            north: flag(b[7])?,
        })
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        let (lat, lon) = (self.latitude, self.longitude);
        [
            lat.degrees, lat.minutes, lat.seconds, u8::from(self.east),
            lon.degrees, lon.minutes, lon.seconds, u8::from(self.north),
        ]
    }
}

impl fmt::Display for MountLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}, {} {}",
            self.longitude,
            LONGITUDE_HEMISPHERES[usize::from(self.east)],
            self.latitude,
            LATITUDE_HEMISPHERES[usize::from(self.north)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_table_covers_ranges() {
        assert_eq!(model_name(0).unwrap(), "EQ6 GOTO Series");
        assert_eq!(model_name(6).unwrap(), "AZ-EQ5 GOTO Series");
        assert_eq!(model_name(128).unwrap(), "AZ GOTO Series");
        assert_eq!(model_name(143).unwrap(), "AZ GOTO Series");
        assert_eq!(model_name(144).unwrap(), "DOB GOTO Series");
        assert_eq!(model_name(159).unwrap(), "DOB GOTO Series");
        assert_eq!(model_name(160).unwrap(), "AllView GOTO Series");
        assert!(matches!(model_name(7), Err(SynScanError::UnknownModel(7))));
        assert!(matches!(model_name(161), Err(SynScanError::UnknownModel(161))));
    }

    #[test]
    fn track_mode_bytes() {
        for b in 0..4 {
            assert_eq!(TrackMode::from_byte(b).unwrap().as_byte(), b);
        }
        assert!(TrackMode::from_byte(4).is_err());
    }

    #[test]
    fn version_digits_are_hex_nibbles() {
        assert_eq!(FirmwareVersion::from_reply(b"042507").unwrap().to_string(), "04.25.07");
        assert_eq!(FirmwareVersion::from_reply(b"03A10F").unwrap().to_string(), "03.101.015");
        assert!(FirmwareVersion::from_reply(b"0425").is_err());
        assert!(FirmwareVersion::from_reply(b"04250Z").is_err());
    }

    #[test]
    fn time_with_negative_offset() {
        // 21:05:09 on 2024-03-07, UTC-5, DST on
        let t = MountTime::from_bytes(&[21, 5, 9, 3, 7, 24, 251, 1]).unwrap();
        assert!(t.dst);
        assert_eq!(t.at.offset().whole_hours(), -5);
        assert_eq!(t.to_string(), "09:05:09PM March 07, 2024 UTC-05:00");
        assert_eq!(t.to_bytes().unwrap(), [21, 5, 9, 3, 7, 24, 251, 1]);
    }

    #[test]
    fn time_in_utc() {
        let t = MountTime::from_bytes(&[8, 30, 0, 12, 31, 23, 0, 0]).unwrap();
        assert_eq!(t.to_string(), "08:30:00AM December 31, 2023 UTC");
    }

    #[test]
    fn time_outside_encodable_range_is_refused() {
        let mut t = MountTime::from_bytes(&[8, 30, 0, 12, 31, 23, 0, 0]).unwrap();
        t.at = t.at.replace_year(1999).unwrap();
        assert!(matches!(t.to_bytes(), Err(SynScanError::InvalidArgument(_))));
        t.at = t.at.replace_year(2256).unwrap();
        assert!(matches!(t.to_bytes(), Err(SynScanError::InvalidArgument(_))));
        t.at = t.at.replace_year(2255).unwrap();
        assert_eq!(t.to_bytes().unwrap()[5], 255);

        t.at = t.at.replace_offset(UtcOffset::from_hms(5, 30, 0).unwrap());
        assert!(matches!(t.to_bytes(), Err(SynScanError::InvalidArgument(_))));
    }

    #[test]
    fn time_rejects_impossible_dates() {
        assert!(MountTime::from_bytes(&[8, 30, 0, 13, 1, 23, 0, 0]).is_err());
        assert!(MountTime::from_bytes(&[25, 0, 0, 1, 1, 23, 0, 0]).is_err());
        assert!(MountTime::from_bytes(&[0; 7]).is_err());
    }

    #[test]
    fn location_flags_follow_hand_controller_tables() {
        let loc = MountLocation::from_bytes(&[55, 45, 20, 0, 37, 37, 6, 0]).unwrap();
        assert!(!loc.east && !loc.north);
        assert_eq!(loc.to_string(), "37°37’6” W, 55°45’20” S");

        let loc = MountLocation::from_bytes(&[55, 45, 20, 1, 37, 37, 6, 1]).unwrap();
        assert_eq!(loc.to_string(), "37°37’6” E, 55°45’20” N");
        assert_eq!(loc.to_bytes(), [55, 45, 20, 1, 37, 37, 6, 1]);

        let mixed = MountLocation::from_bytes(&[55, 45, 20, 1, 37, 37, 6, 0]).unwrap();
        assert_eq!(mixed.to_string(), "37°37’6” E, 55°45’20” S");

        assert!(MountLocation::from_bytes(&[55, 45, 20, 2, 37, 37, 6, 1]).is_err());
    }
}
