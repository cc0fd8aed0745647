//! In-memory link used by the integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use csafe_mux::{Multiplexer, Transport, TransportError};

pub const ACK: [u8; 4] = [0xF1, 0x81, 0x81, 0xF2];

/// Records every packet written; can be told to fail writes or to answer each
/// completed frame with a canned response.
#[derive(Clone, Default)]
pub struct MockLink {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
    responder: Arc<OnceLock<(Multiplexer, Vec<u8>)>>,
}

impl MockLink {
    pub fn packets(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Answer every frame written from now on with `reply`.
    pub fn auto_reply(&self, mux: &Multiplexer, reply: &[u8]) {
        let _ = self.responder.set((mux.clone(), reply.to_vec()));
    }
}

impl Transport for MockLink {
    fn write_packet(
        &mut self,
        packet: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let packet = packet.to_vec();
        let link = self.clone();
        async move {
            if link.fail_writes.load(Ordering::SeqCst) {
                return Err(TransportError::Disconnected);
            }
            let frame_done = packet.last() == Some(&0xF2);
            link.writes.lock().unwrap().push(packet);
            if frame_done {
                if let Some((mux, reply)) = link.responder.get() {
                    mux.receive(Ok(reply.clone()));
                }
            }
            Ok(())
        }
    }
}
