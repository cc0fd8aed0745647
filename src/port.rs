//! CSAFE over a serial line.

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::future::Future;
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::mux::WeakMultiplexer;
use crate::transport::Transport;

/// CSAFE's serial default.
pub const DEFAULT_BAUD: u32 = 9600;

#[derive(Debug, Clone)]
pub struct PortSettings {
    pub dev: String,
    pub baud: u32,
    pub rtscts: bool,
}

pub fn open_port(settings: &PortSettings) -> Result<Box<dyn SerialPort>, TransportError> {
    let builder = serialport::new(&settings.dev, settings.baud)
        .timeout(Duration::from_millis(100))
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(if settings.rtscts {
            FlowControl::Hardware
        } else {
            FlowControl::None
        });

    builder
        .open()
        .map_err(|e| TransportError::Other(format!("open {}: {}", settings.dev, e)))
}

/// Write half of a serial link. Writes run on the blocking pool.
pub struct SerialTransport {
    port: Arc<Mutex<Box<dyn SerialPort>>>,
}

/// Read half of a serial link; forwards everything it reads to a multiplexer.
pub struct SerialReader {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn split(port: Box<dyn SerialPort>) -> Result<(Self, SerialReader), TransportError> {
        let reader = port.try_clone().map_err(std::io::Error::from)?;
        Ok((
            Self {
                port: Arc::new(Mutex::new(port)),
            },
            SerialReader { port: reader },
        ))
    }
}

impl Transport for SerialTransport {
    fn write_packet(
        &mut self,
        packet: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let port = Arc::clone(&self.port);
        let packet = packet.to_vec();
        async move {
            tokio::task::spawn_blocking(move || {
                let mut port = port
                    .lock()
                    .map_err(|_| TransportError::Other("serial port lock poisoned".into()))?;
                port.write_all(&packet)?;
                port.flush()?;
                Ok::<(), TransportError>(())
            })
            .await
            .map_err(|e| TransportError::Other(format!("serial write task: {}", e)))?
        }
    }
}

impl SerialReader {
    /// Pump bytes into the multiplexer until the link fails or the last
    /// [`Multiplexer`](crate::Multiplexer) handle is dropped. Idle reads wake
    /// up every port timeout to notice the latter.
    pub fn spawn(mut self, mux: WeakMultiplexer) -> JoinHandle<()> {
        std::thread::spawn(move || {
            let mut buf = [0u8; 64];
            loop {
                let read = self.port.read(&mut buf);
                let Some(mux) = mux.upgrade() else {
                    break;
                };
                match read {
                    Ok(0) => continue,
                    Ok(n) => mux.receive(Ok(buf[..n].to_vec())),
                    // read timeout is set by the builder
                    Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                        continue;
                    }
                    Err(e) => {
                        warn!("[port] read failed: {}", e);
                        mux.receive(Err(e.into()));
                        break;
                    }
                }
            }
            debug!("[port] reader stopped");
        })
    }
}
