use anyhow::Result;
use serde::{Deserialize, Serialize};

use synscan::Axis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "RA")]
    Ra,
    Dec,
}

impl From<Direction> for Axis {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Ra => Axis::Ra,
            Direction::Dec => Axis::Dec,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlewRequest {
    pub direction: Direction,
    pub speed: i8,
}

impl SlewRequest {
    pub fn validate(&self, allowed: &[i8]) -> Result<()> {
        anyhow::ensure!(
            allowed.contains(&self.speed),
            "slew speed {} not in {:?}",
            self.speed,
            allowed
        );
        Ok(())
    }
}

/// Target as typed by the operator, e.g. `{"ra": "5h 35m 17s", "dec": "22° 0’ 52”"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GotoRequest {
    pub ra: String,
    pub dec: String,
}
