use std::future::Future;

use crate::error::TransportError;

/// Outbound half of a link to the monitor.
///
/// Inbound packets and link errors are not pulled through this trait; the
/// implementation pushes them into [`crate::Multiplexer::receive`] as they
/// arrive, with whatever packet boundaries the link produces.
pub trait Transport {
    /// Write one packet. The multiplexer awaits each write before issuing the
    /// next, so implementations never see overlapping calls.
    fn write_packet(
        &mut self,
        packet: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
