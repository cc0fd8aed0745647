//! Decoders for the monitor's rowing-status and workout-summary
//! notifications. Times are reported in hundredths of a second and distances
//! in tenths of a metre, both as 24-bit little-endian counters.

use std::fmt;
use std::time::Duration;

use crate::codec::{Endian, read_int};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkoutState {
    Waiting,
    Rowing,
    Completed,
    Terminated,
    /// Any of the monitor's other states, kept raw.
    Other(u8),
}

impl From<u8> for WorkoutState {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Waiting,
            1 => Self::Rowing,
            10 => Self::Completed,
            11 => Self::Terminated,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for WorkoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Rowing => write!(f, "rowing"),
            Self::Completed => write!(f, "completed"),
            Self::Terminated => write!(f, "terminated"),
            Self::Other(code) => write!(f, "other({})", code),
        }
    }
}

/// Periodic progress update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowingStatus {
    pub elapsed: Duration,
    /// Metres.
    pub distance: f64,
    pub workout_type: u8,
    pub workout_state: WorkoutState,
    pub rowing_state: Option<u8>,
    pub stroke_state: Option<u8>,
}

impl RowingStatus {
    pub const MIN_LEN: usize = 9;

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        need("rowing status", bytes, Self::MIN_LEN)?;
        Ok(Self {
            elapsed: centis(&bytes[0..3]),
            distance: decimetres(&bytes[3..6]),
            workout_type: bytes[6],
            workout_state: WorkoutState::from(bytes[8]),
            rowing_state: bytes.get(9).copied(),
            stroke_state: bytes.get(10).copied(),
        })
    }
}

impl fmt::Display for RowingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time={:.2}s distance={:.1}m state={}",
            self.elapsed.as_secs_f64(),
            self.distance,
            self.workout_state
        )
    }
}

/// Sent once when a workout ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkoutSummary {
    pub elapsed: Duration,
    /// Metres.
    pub distance: f64,
}

impl WorkoutSummary {
    pub const MIN_LEN: usize = 10;

    /// Bytes 0..4 carry the log date and are skipped.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        need("workout summary", bytes, Self::MIN_LEN)?;
        Ok(Self {
            elapsed: centis(&bytes[4..7]),
            distance: decimetres(&bytes[7..10]),
        })
    }
}

impl fmt::Display for WorkoutSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time={:.2}s distance={:.1}m",
            self.elapsed.as_secs_f64(),
            self.distance
        )
    }
}

fn need(kind: &'static str, bytes: &[u8], needed: usize) -> Result<()> {
    if bytes.len() < needed {
        return Err(Error::ShortNotification {
            kind,
            needed,
            got: bytes.len(),
        });
    }
    Ok(())
}

fn centis(bytes: &[u8]) -> Duration {
    Duration::from_millis(read_int(bytes, Endian::Little) * 10)
}

fn decimetres(bytes: &[u8]) -> f64 {
    read_int(bytes, Endian::Little) as f64 / 10.0
}
