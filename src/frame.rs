use std::fmt;

use tracing::{trace, warn};

use crate::codec::{Endian, START_FLAG, STOP_FLAG, checksum, hex, read_int, stuff, unstuff};
use crate::error::{Error, FramingError, Result};
use crate::proto::{Command, serialize};

/// Default BLE characteristic write size.
pub const DEFAULT_PACKET_SIZE: usize = 20;
/// Upper bound on a buffered inbound frame.
pub const MAX_FRAME_LEN: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Structure {
    pub identifier: u8,
    pub data: Vec<u8>,
}

impl Structure {
    pub fn read_int(&self, endian: Endian) -> u64 {
        read_int(&self.data, endian)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub prev_frame: u8,
    pub slave_status: u8,
    pub structures: Vec<Structure>,
}

impl Response {
    pub fn structure(&self, identifier: u8) -> Option<&Structure> {
        self.structures.iter().find(|s| s.identifier == identifier)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "prev_frame={} slave_status={} structures=[",
            self.prev_frame, self.slave_status
        )?;
        for (i, s) in self.structures.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "0x{:02X}:[{}]", s.identifier, hex(&s.data))?;
        }
        write!(f, "]")
    }
}

pub fn build_frame(commands: &[Command]) -> Vec<u8> {
    let payload = serialize(commands);
    let body = stuff(&payload);
    let sum = stuff(&[checksum(&payload)]);
    let mut out = Vec::with_capacity(body.len() + sum.len() + 2);
    out.push(START_FLAG);
    out.extend(body);
    out.extend(sum);
    out.push(STOP_FLAG);
    out
}

/// Split a frame into transport-sized packets. Boundaries may fall inside an
/// escape pair; the receiver reassembles before unstuffing.
pub fn fragment(frame: &[u8], max_packet_size: usize) -> std::slice::Chunks<'_, u8> {
    frame.chunks(max_packet_size.max(1))
}

pub fn parse_frame(raw: &[u8]) -> Result<Response> {
    let (&first, rest) = raw.split_first().ok_or(FramingError::Empty)?;
    if first != START_FLAG {
        return Err(FramingError::MissingStartFlag(first).into());
    }
    let (&last, inner) = rest
        .split_last()
        .ok_or(FramingError::MissingStopFlag(first))?;
    if last != STOP_FLAG {
        return Err(FramingError::MissingStopFlag(last).into());
    }

    let data = unstuff(inner)?;
    if data.len() < 2 {
        return Err(Error::TooShort(data.len()));
    }
    if checksum(&data) != 0 {
        warn!("checksum mismatch: [{}]", hex(raw));
        return Err(Error::Checksum {
            frame: raw.to_vec(),
        });
    }

    let status = data[0];
    let region = &data[1..data.len() - 1];
    let mut structures = Vec::new();
    let mut i = 0;
    while i < region.len() {
        let identifier = region[i];
        let length = region.get(i + 1).copied().map(usize::from);
        let start = i + 2;
        match length {
            Some(length) if start + length <= region.len() => {
                structures.push(Structure {
                    identifier,
                    data: region[start..start + length].to_vec(),
                });
                i = start + length;
            }
            _ => {
                return Err(FramingError::StructureOverrun {
                    identifier,
                    offset: i + 1,
                    length: length.unwrap_or(0),
                    available: region.len().saturating_sub(start),
                }
                .into());
            }
        }
    }

    Ok(Response {
        prev_frame: (status >> 4) & 0x03,
        slave_status: status & 0x0F,
        structures,
    })
}

/// Collects transport chunks until a stop flag ends the buffer.
#[derive(Debug, Default)]
pub struct Reassembler {
    buf: Vec<u8>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Feed one chunk. Returns the raw frame once the buffer ends with the stop
    /// flag; a chunk that starts with the start flag discards whatever was
    /// buffered before it.
    pub fn push(&mut self, chunk: &[u8]) -> std::result::Result<Option<Vec<u8>>, FramingError> {
        let Some(&first) = chunk.first() else {
            return Ok(None);
        };
        if first == START_FLAG && !self.buf.is_empty() {
            trace!("dropping {} buffered bytes on new start flag", self.buf.len());
            self.buf.clear();
        }
        if self.buf.len() + chunk.len() > MAX_FRAME_LEN {
            self.buf.clear();
            return Err(FramingError::Oversized { max: MAX_FRAME_LEN });
        }
        self.buf.extend_from_slice(chunk);
        if self.buf.last() == Some(&STOP_FLAG) {
            Ok(Some(std::mem::take(&mut self.buf)))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_reset_frame() {
        assert_eq!(build_frame(&[Command::Reset]), vec![0xF1, 0x81, 0x81, 0xF2]);
    }

    #[test]
    fn checksum_is_stuffed_too() {
        // payload 0xF0 stuffs to F3 00, checksum 0xF0 likewise
        assert_eq!(
            build_frame(&[Command::Custom(vec![0xF0])]),
            vec![0xF1, 0xF3, 0x00, 0xF3, 0x00, 0xF2]
        );
    }

    #[test]
    fn fragments_split_mid_payload() {
        let twork = Command::set_t_work(20 * 60);
        let frame = build_frame(&[
            Command::Reset,
            twork.clone(),
            twork.clone(),
            twork.clone(),
            twork,
        ]);
        let parts: Vec<&[u8]> = fragment(&frame, DEFAULT_PACKET_SIZE).collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[0],
            &[
                0xF1, 0x81, 0x20, 0x03, 0x00, 0x14, 0x00, 0x20, 0x03, 0x00, 0x14, 0x00, 0x20,
                0x03, 0x00, 0x14, 0x00, 0x20, 0x03, 0x00
            ]
        );
        assert_eq!(parts[1], &[0x14, 0x00, 0x81, 0xF2]);
    }

    #[test]
    fn fragment_zero_size_is_clamped() {
        assert_eq!(fragment(&[1, 2, 3], 0).count(), 3);
    }

    #[test]
    fn parse_built_frame() {
        let cmds = [Command::Custom(vec![0x81, 0x1A, 0x02, 0xF1, 0x05])];
        let resp = parse_frame(&build_frame(&cmds)).unwrap();
        assert_eq!(resp.prev_frame, 0);
        assert_eq!(resp.slave_status, 1);
        assert_eq!(
            resp.structures,
            vec![Structure {
                identifier: 0x1A,
                data: vec![0xF1, 0x05]
            }]
        );
    }

    #[test]
    fn parse_status_bits() {
        // status 0xB9: prev_frame = 0b11, slave_status = 9
        let resp = parse_frame(&[0xF1, 0xB9, 0xB9, 0xF2]).unwrap();
        assert_eq!(resp.prev_frame, 3);
        assert_eq!(resp.slave_status, 9);
        assert!(resp.structures.is_empty());
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            parse_frame(&[]),
            Err(Error::Framing(FramingError::Empty))
        ));
        assert!(matches!(
            parse_frame(&[0xF0, 0x81, 0x81, 0xF2]),
            Err(Error::Framing(FramingError::MissingStartFlag(0xF0)))
        ));
        assert!(matches!(
            parse_frame(&[0xF1, 0x81, 0x81]),
            Err(Error::Framing(FramingError::MissingStopFlag(0x81)))
        ));
        assert!(matches!(
            parse_frame(&[0xF1, 0x81, 0xF2]),
            Err(Error::TooShort(1))
        ));
        assert!(matches!(
            parse_frame(&[0xF1, 0x81, 0xF3, 0xF2]),
            Err(Error::Framing(FramingError::TrailingEscape))
        ));
        assert!(matches!(
            parse_frame(&[0xF1, 0x81, 0x80, 0xF2]),
            Err(Error::Checksum { .. })
        ));
        // 0x22 claims 5 bytes, only 1 follows before the checksum
        assert!(matches!(
            parse_frame(&[0xF1, 0x81, 0x22, 0x05, 0x01, 0xA7, 0xF2]),
            Err(Error::Framing(FramingError::StructureOverrun {
                identifier: 0x22,
                ..
            }))
        ));
    }

    #[test]
    fn reassembles_across_chunks() {
        let thirty: Vec<u8> = (0..30).collect();
        let mut bytes = vec![0xF1, 0x81, 0x22, 30];
        bytes.extend(&thirty);
        bytes.extend([188, 0xF2]);
        assert_eq!(bytes.len(), 36);

        let mut r = Reassembler::new();
        assert_eq!(r.push(&bytes[..20]).unwrap(), None);
        assert!(!r.is_empty());
        let frame = r.push(&bytes[20..]).unwrap().unwrap();
        assert!(r.is_empty());

        let resp = parse_frame(&frame).unwrap();
        assert_eq!(resp.structure(0x22).unwrap().data, thirty);
    }

    #[test]
    fn start_flag_restarts_buffer() {
        let mut r = Reassembler::new();
        assert_eq!(r.push(&[0xF1, 0x81, 0x22]).unwrap(), None);
        let frame = r.push(&[0xF1, 0x81, 0x81, 0xF2]).unwrap();
        assert_eq!(frame, Some(vec![0xF1, 0x81, 0x81, 0xF2]));
        assert_eq!(r.push(&[]).unwrap(), None);
    }

    #[test]
    fn oversized_buffer_is_dropped() {
        let mut r = Reassembler::new();
        let chunk = [0x00; 20];
        r.push(&[0xF1]).unwrap();
        let mut result = Ok(None);
        for _ in 0..=(MAX_FRAME_LEN / chunk.len()) {
            result = r.push(&chunk);
            if result.is_err() {
                break;
            }
        }
        assert_eq!(result, Err(FramingError::Oversized { max: MAX_FRAME_LEN }));
        assert!(r.is_empty());
    }

    #[test]
    fn structure_reads_integers() {
        let s = Structure {
            identifier: 0xA1,
            data: vec![0xD0, 0x07],
        };
        assert_eq!(s.read_int(Endian::Little), 2000);
        assert_eq!(s.read_int(Endian::Big), 0xD007);
    }

    #[test]
    fn response_display() {
        let resp = parse_frame(&[0xF1, 0x81, 0x1A, 0x00, 0x9B, 0xF2]).unwrap();
        assert_eq!(
            resp.to_string(),
            "prev_frame=0 slave_status=1 structures=[0x1A:[]]"
        );
    }
}
