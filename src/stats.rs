use tracing::info;

use crate::error::Error;

/// Counters kept by the multiplexer driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub requests: u64,
    pub ok: u64,
    pub timeouts: u64,
    pub bad_checksum: u64,
    pub bad_framing: u64,
    pub transport_errors: u64,
    pub unexpected: u64,
    pub packets_tx: u64,
    pub bytes_tx: u64,
    pub bytes_rx: u64,
    /// Entries waiting behind the in-flight request, sampled when queried.
    pub queued: usize,
}

impl LinkStats {
    pub fn add_tx(&mut self, n: usize) {
        self.packets_tx += 1;
        self.bytes_tx += n as u64;
    }
    pub fn add_rx(&mut self, n: usize) {
        self.bytes_rx += n as u64;
    }
    pub fn inc_requests(&mut self) {
        self.requests += 1;
    }
    pub fn inc_ok(&mut self) {
        self.ok += 1;
    }
    pub fn inc_unexpected(&mut self) {
        self.unexpected += 1;
    }

    pub fn record_failure(&mut self, err: &Error) {
        match err {
            Error::Timeout(_) => self.timeouts += 1,
            Error::Checksum { .. } => self.bad_checksum += 1,
            Error::Framing(_) | Error::TooShort(_) => self.bad_framing += 1,
            Error::Transport(_) => self.transport_errors += 1,
            Error::Closed | Error::BadStructure(_) | Error::ShortNotification { .. } => {}
        }
    }

    pub fn failed(&self) -> u64 {
        self.timeouts + self.bad_checksum + self.bad_framing + self.transport_errors
    }

    pub fn log(&self) {
        info!(
            "[link] requests={} ok={} failed={} (timeout={} checksum={} framing={} transport={}) unexpected={} tx={}B/{}pkt rx={}B queued={}",
            self.requests,
            self.ok,
            self.failed(),
            self.timeouts,
            self.bad_checksum,
            self.bad_framing,
            self.transport_errors,
            self.unexpected,
            self.bytes_tx,
            self.packets_tx,
            self.bytes_rx,
            self.queued,
        );
    }
}
