//! CSAFE command/response multiplexer for rowing ergometer monitors.
//!
//! Commands are serialized, framed, byte-stuffed and split into
//! transport-sized packets; inbound packets are reassembled, checked and
//! decoded into [`Response`]s. A [`Multiplexer`] keeps exactly one request in
//! flight on a link and fails it on timeout or transport error without
//! disturbing the requests queued behind it.

pub mod codec;
pub mod error;
pub mod frame;
pub mod mux;
pub mod port;
pub mod proto;
pub mod session;
pub mod stats;
pub mod status;
pub mod transport;

pub use error::{Error, FramingError, Result, TransportError};
pub use frame::{Reassembler, Response, Structure, build_frame, fragment, parse_frame};
pub use mux::{Driver, MuxConfig, Multiplexer, Ticket, WeakMultiplexer};
pub use proto::Command;
pub use session::Session;
pub use stats::LinkStats;
pub use status::{RowingStatus, WorkoutState, WorkoutSummary};
pub use transport::Transport;
