use crate::codec::{Endian, write_int};

/// Marker for PM-specific commands tunnelled through `cmdUserCfg1`.
pub const PM_WRAPPER: u8 = 0x1A;
/// Marker for the PM "set configuration" block.
pub const C2_WRAPPER: u8 = 0x76;
/// CSAFE unit specifier for meters.
pub const UNIT_METERS: u8 = 0x24;
/// `cmdGetHorizontal`; also the identifier of its response structure.
pub const GET_WORK_DISTANCE: u8 = 0xA1;

const DISTANCE_DURATION_MARKER: u8 = 0x80;
const WORKOUT_TYPE_VARIABLE_INTERVAL: u8 = 0x07;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reset,
    GoInUse,
    SetProgram { program: u8 },
    SetHorizontal { distance: u16 },
    SetTWork { hours: u8, minutes: u8, seconds: u8 },
    AutoUpload { flags: u8 },
    GetForcePlot,
    GetWorkDistance,
    SetWorkoutType { code: u8 },
    SetRestDuration { seconds: u8 },
    SetWorkoutIntervalCount { count: u8 },
    StartDistanceIntervalWorkout { distance: u32, rest: u16 },
    /// Pre-encoded bytes, sent verbatim.
    Custom(Vec<u8>),
}

impl Command {
    pub fn set_program(program: Option<u8>) -> Self {
        Command::SetProgram {
            program: program.unwrap_or(0),
        }
    }

    /// Split a duration into h/m/s. Hours saturate at 255.
    pub fn set_t_work(total_seconds: u32) -> Self {
        Command::SetTWork {
            hours: u8::try_from(total_seconds / 3600).unwrap_or(u8::MAX),
            minutes: ((total_seconds / 60) % 60) as u8,
            seconds: (total_seconds % 60) as u8,
        }
    }

    pub fn set_horizontal(meters: u16) -> Self {
        Command::SetHorizontal { distance: meters }
    }

    /// Default flags enable auto-upload (bit 0) and the upload interrupt (bit 4).
    pub fn auto_upload() -> Self {
        Command::AutoUpload {
            flags: 0x01 | (1 << 4),
        }
    }

    pub fn start_distance_interval_workout(distance: u32, rest: u16) -> Self {
        Command::StartDistanceIntervalWorkout { distance, rest }
    }

    pub fn serialize(&self) -> Vec<u8> {
        use Command::*;
        match self {
            Reset => vec![0x81],
            GoInUse => vec![0x85],
            SetProgram { program } => vec![0x24, 2, *program, 0],
            SetHorizontal { distance } => {
                let mut out = vec![0x21, 3];
                out.extend(write_int(u64::from(*distance), 2, Endian::Little));
                out.push(UNIT_METERS);
                out
            }
            SetTWork {
                hours,
                minutes,
                seconds,
            } => vec![0x20, 3, *hours, *minutes, *seconds],
            AutoUpload { flags } => vec![0x01, *flags],
            GetForcePlot => wrap(&[0x6A, 1, 32]),
            GetWorkDistance => vec![GET_WORK_DISTANCE],
            SetWorkoutType { code } => wrap(&[0x01, 1, *code]),
            SetRestDuration { seconds } => wrap(&[0x04, 1, *seconds]),
            SetWorkoutIntervalCount { count } => wrap(&[0x18, 1, *count]),
            StartDistanceIntervalWorkout { distance, rest } => {
                let mut body = vec![0x01, 1, WORKOUT_TYPE_VARIABLE_INTERVAL];
                body.extend([0x03, 5, DISTANCE_DURATION_MARKER]);
                body.extend(write_int(u64::from(*distance), 4, Endian::Big));
                body.extend([0x04, 2]);
                body.extend(write_int(u64::from(*rest), 2, Endian::Big));
                // configure workout: programming mode on
                body.extend([0x14, 1, 1]);
                // screen state: workout type / prepare to start
                body.extend([0x13, 2, 1, 1]);
                c2_wrap(&body)
            }
            Custom(raw) => raw.clone(),
        }
    }
}

/// Concatenate the encodings of several commands so they share one frame.
pub fn serialize(commands: &[Command]) -> Vec<u8> {
    commands.iter().flat_map(Command::serialize).collect()
}

fn prefixed(marker: u8, inner: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(inner.len() + 2);
    out.push(marker);
    out.push((inner.len() & 0xFF) as u8);
    out.extend_from_slice(inner);
    out
}

pub fn wrap(inner: &[u8]) -> Vec<u8> {
    prefixed(PM_WRAPPER, inner)
}

pub fn c2_wrap(body: &[u8]) -> Vec<u8> {
    prefixed(C2_WRAPPER, body)
}
