use clap::builder::TypedValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::time::Duration;

use csafe_mux::MuxConfig;
use csafe_mux::frame::DEFAULT_PACKET_SIZE;
use csafe_mux::port::{DEFAULT_BAUD, PortSettings};
use csafe_mux::proto::Command;

#[derive(Parser, Debug, Clone)]
#[command(name = "csafe-mux", about = "CSAFE command multiplexer for rowing ergometer monitors")]
pub struct Cli {
    /// Log filter (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Print the frame and packets for a command list without a device
    Encode(EncodeOpts),
    /// Decode captured bytes: a response frame or a status notification
    Decode(DecodeOpts),
    /// Send commands as one frame and print the response
    Send(SendOpts),
    /// Run a workout set-up sequence
    Workout(WorkoutOpts),
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device path
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub dev: String,
    /// Baud rate
    #[arg(long, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,
    /// Enable RTS/CTS
    #[arg(long, default_value_t = false)]
    pub rtscts: bool,
}

impl SerialOpts {
    pub fn settings(&self) -> PortSettings {
        PortSettings {
            dev: self.dev.clone(),
            baud: self.baud,
            rtscts: self.rtscts,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct LinkOpts {
    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,
    /// Largest packet written to the link
    #[arg(long, default_value_t = DEFAULT_PACKET_SIZE, value_parser = clap::value_parser!(u16).range(1..).map(usize::from))]
    pub packet_size: usize,
}

impl LinkOpts {
    pub fn config(&self) -> MuxConfig {
        MuxConfig::default()
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_max_packet_size(self.packet_size)
    }
}

#[derive(Args, Debug, Clone)]
pub struct EncodeOpts {
    /// Largest packet size
    #[arg(long, default_value_t = DEFAULT_PACKET_SIZE)]
    pub packet_size: usize,
    /// Commands, e.g. `reset horizontal=2000 program go-in-use`
    #[arg(required = true)]
    pub commands: Vec<Command>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeKind {
    Frame,
    RowingStatus,
    WorkoutSummary,
}

#[derive(Args, Debug, Clone)]
pub struct DecodeOpts {
    #[arg(long, value_enum, default_value_t = DecodeKind::Frame)]
    pub kind: DecodeKind,
    /// Bytes as hex, e.g. `F1 81 81 F2` or `F18181F2`
    #[arg(required = true, num_args = 1..)]
    pub hex: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SendOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    #[command(flatten)]
    pub link: LinkOpts,
    /// Commands sent together in one frame
    #[arg(required = true)]
    pub commands: Vec<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct WorkoutOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    #[command(flatten)]
    pub link: LinkOpts,
    #[command(subcommand)]
    pub kind: WorkoutKind,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum WorkoutKind {
    /// Single distance piece
    Distance {
        #[arg(long)]
        meters: u16,
    },
    /// Single timed piece
    Time {
        #[arg(long)]
        seconds: u32,
    },
    /// Distance intervals with fixed rest
    Interval {
        #[arg(long)]
        meters: u32,
        #[arg(long)]
        rest: u16,
    },
}
