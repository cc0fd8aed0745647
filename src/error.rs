use std::time::Duration;

use thiserror::Error;

use crate::codec::hex;

/// Failure of a single request. Errors never outlive the request they belong to;
/// the multiplexer keeps serving the queue after any of them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("frame too short: {0} bytes after unstuffing, need at least 2")]
    TooShort(usize),

    #[error("checksum mismatch in frame [{}]", hex(.frame))]
    Checksum { frame: Vec<u8> },

    #[error("no response received within {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("multiplexer is closed")]
    Closed,

    #[error("response has no usable 0x{0:02X} structure")]
    BadStructure(u8),

    #[error("{kind} notification too short: {got} bytes, need {needed}")]
    ShortNotification {
        kind: &'static str,
        needed: usize,
        got: usize,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    #[error("escape byte 0xF3 is the last byte of the frame")]
    TrailingEscape,
    #[error("frame starts with 0x{0:02X}, expected 0xF1")]
    MissingStartFlag(u8),
    #[error("frame ends with 0x{0:02X}, expected 0xF2")]
    MissingStopFlag(u8),
    #[error("empty frame")]
    Empty,
    #[error("structure 0x{identifier:02X} at offset {offset} claims {length} bytes, {available} available")]
    StructureOverrun {
        identifier: u8,
        offset: usize,
        length: usize,
        available: usize,
    },
    #[error("frame exceeds {max} bytes without a stop flag")]
    Oversized { max: usize },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("link disconnected")]
    Disconnected,
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
