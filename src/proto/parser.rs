// src/proto/parser.rs
use std::str::FromStr;

use thiserror::Error;

use super::command::Command;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("missing value for {0}")]
    MissingValue(&'static str),
    #[error("invalid integer for {0}: {1}")]
    BadInt(&'static str, String),
    #[error("invalid hex for {0}: {1}")]
    BadHex(&'static str, String),
    #[error("unknown command: {0}")]
    UnknownTag(String),
}

/// Render a command as the token [`Command::from_str`] accepts.
pub fn format_command(cmd: &Command) -> String {
    use Command::*;
    match cmd {
        Reset => "reset".into(),
        GoInUse => "go-in-use".into(),
        SetProgram { program } => format!("program={}", program),
        SetHorizontal { distance } => format!("horizontal={}", distance),
        SetTWork {
            hours,
            minutes,
            seconds,
        } => format!(
            "twork={}",
            u32::from(*hours) * 3600 + u32::from(*minutes) * 60 + u32::from(*seconds)
        ),
        AutoUpload { flags } => format!("auto-upload={}", flags),
        GetForcePlot => "force-plot".into(),
        GetWorkDistance => "work-distance".into(),
        SetWorkoutType { code } => format!("workout-type={}", code),
        SetRestDuration { seconds } => format!("rest={}", seconds),
        SetWorkoutIntervalCount { count } => format!("intervals={}", count),
        StartDistanceIntervalWorkout { distance, rest } => {
            format!("distance-interval={}/{}", distance, rest)
        }
        Custom(raw) => {
            let mut s = String::from("raw=");
            for b in raw {
                s.push_str(&format!("{:02x}", b));
            }
            s
        }
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        let (tag, value) = match s.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (s, None),
        };

        match tag.to_ascii_lowercase().as_str() {
            "reset" => Ok(Command::Reset),
            "go-in-use" => Ok(Command::GoInUse),
            "program" => Ok(Command::set_program(opt_int(value, "program")?)),
            "horizontal" => Ok(Command::set_horizontal(req_int(value, "horizontal")?)),
            "twork" => Ok(Command::set_t_work(req_int(value, "twork")?)),
            "auto-upload" => Ok(match opt_int(value, "auto-upload")? {
                Some(flags) => Command::AutoUpload { flags },
                None => Command::auto_upload(),
            }),
            "force-plot" => Ok(Command::GetForcePlot),
            "work-distance" => Ok(Command::GetWorkDistance),
            "workout-type" => Ok(Command::SetWorkoutType {
                code: req_int(value, "workout-type")?,
            }),
            "rest" => Ok(Command::SetRestDuration {
                seconds: req_int(value, "rest")?,
            }),
            "intervals" => Ok(Command::SetWorkoutIntervalCount {
                count: req_int(value, "intervals")?,
            }),
            "distance-interval" => {
                let v = value.ok_or(ParseError::MissingValue("distance-interval"))?;
                let (distance, rest) = v
                    .split_once('/')
                    .ok_or(ParseError::MissingValue("distance-interval rest"))?;
                Ok(Command::start_distance_interval_workout(
                    parse_int(distance, "distance-interval")?,
                    parse_int(rest, "distance-interval rest")?,
                ))
            }
            "raw" => Ok(Command::Custom(parse_hex(
                value.ok_or(ParseError::MissingValue("raw"))?,
                "raw",
            )?)),
            _ => Err(ParseError::UnknownTag(tag.to_string())),
        }
    }
}

/* ---------- helpers ---------- */

fn parse_int<T: FromStr>(v: &str, k: &'static str) -> Result<T, ParseError> {
    v.parse::<T>()
        .map_err(|_| ParseError::BadInt(k, v.to_string()))
}

fn req_int<T: FromStr>(v: Option<&str>, k: &'static str) -> Result<T, ParseError> {
    v.ok_or(ParseError::MissingValue(k))
        .and_then(|v| parse_int(v, k))
}

fn opt_int<T: FromStr>(v: Option<&str>, k: &'static str) -> Result<Option<T>, ParseError> {
    v.map(|v| parse_int(v, k)).transpose()
}

/// Accepts `1a0300`, `1A 03 00` or `1a:03:00`.
pub fn parse_hex(v: &str, k: &'static str) -> Result<Vec<u8>, ParseError> {
    let digits: String = v
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(ParseError::BadHex(k, v.to_string()));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ParseError::BadHex(k, v.to_string()))
        })
        .collect()
}

/* ---------- tests ---------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_tags() {
        assert_eq!("reset".parse::<Command>().unwrap(), Command::Reset);
        assert_eq!("GO-IN-USE".parse::<Command>().unwrap(), Command::GoInUse);
        assert_eq!(
            "program".parse::<Command>().unwrap(),
            Command::SetProgram { program: 0 }
        );
        assert_eq!(
            "auto-upload".parse::<Command>().unwrap(),
            Command::AutoUpload { flags: 0x11 }
        );
    }

    #[test]
    fn parse_valued_tags() {
        assert_eq!(
            "horizontal=2000".parse::<Command>().unwrap(),
            Command::SetHorizontal { distance: 2000 }
        );
        assert_eq!(
            "twork=1200".parse::<Command>().unwrap(),
            Command::set_t_work(1200)
        );
        assert_eq!(
            "distance-interval=500/30".parse::<Command>().unwrap(),
            Command::StartDistanceIntervalWorkout {
                distance: 500,
                rest: 30
            }
        );
        assert_eq!(
            "raw=1a 03 6a".parse::<Command>().unwrap(),
            Command::Custom(vec![0x1A, 0x03, 0x6A])
        );
    }

    #[test]
    fn format_then_parse() {
        let cmds = [
            Command::Reset,
            Command::set_t_work(3725),
            Command::SetRestDuration { seconds: 44 },
            Command::start_distance_interval_workout(750, 120),
            Command::Custom(vec![0xF0, 0x01]),
        ];
        for cmd in cmds {
            let token = format_command(&cmd);
            assert_eq!(token.parse::<Command>().unwrap(), cmd, "token {token}");
        }
    }

    #[test]
    fn test_error_cases() {
        assert_eq!("  ".parse::<Command>(), Err(ParseError::Empty));
        assert!(matches!(
            "launch".parse::<Command>(),
            Err(ParseError::UnknownTag(_))
        ));
        assert_eq!(
            "horizontal".parse::<Command>(),
            Err(ParseError::MissingValue("horizontal"))
        );
        // Byte fields reject values that do not fit.
        assert!(matches!(
            "rest=300".parse::<Command>(),
            Err(ParseError::BadInt("rest", _))
        ));
        assert!(matches!(
            "raw=abc".parse::<Command>(),
            Err(ParseError::BadHex("raw", _))
        ));
        assert!(matches!(
            "distance-interval=500".parse::<Command>(),
            Err(ParseError::MissingValue(_))
        ));
    }
}
