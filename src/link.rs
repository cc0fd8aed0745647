use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use csafe_mux::port::{SerialTransport, open_port};
use csafe_mux::{LinkStats, Multiplexer};

use crate::cli::{LinkOpts, SerialOpts};

/// Open the serial device and start the multiplexer driver and reader thread.
pub fn connect(ser: &SerialOpts, link: &LinkOpts) -> Result<(Multiplexer, JoinHandle<LinkStats>)> {
    let settings = ser.settings();
    let port = open_port(&settings).with_context(|| format!("opening {}", settings.dev))?;
    let (transport, reader) = SerialTransport::split(port).context("cloning serial port")?;
    let config = link.config();
    tracing::debug!(
        "[link] dev={} baud={} rtscts={} timeout={:?} packet_size={}",
        settings.dev,
        settings.baud,
        settings.rtscts,
        config.timeout,
        config.max_packet_size
    );
    let (mux, driver) = Multiplexer::spawn(transport, config);
    reader.spawn(mux.downgrade());
    Ok((mux, driver))
}
