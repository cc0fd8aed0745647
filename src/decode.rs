use anyhow::{Context, Result};

use csafe_mux::proto::parser::parse_hex;
use csafe_mux::{RowingStatus, WorkoutSummary, parse_frame};

use crate::cli::{DecodeKind, DecodeOpts};
use crate::send::print_response;

pub fn run(opts: DecodeOpts) -> Result<()> {
    let bytes = parse_hex(&opts.hex.join(" "), "hex")?;
    match opts.kind {
        DecodeKind::Frame => {
            let response = parse_frame(&bytes).context("decoding response frame")?;
            print_response(&response);
        }
        DecodeKind::RowingStatus => println!("{}", RowingStatus::parse(&bytes)?),
        DecodeKind::WorkoutSummary => println!("{}", WorkoutSummary::parse(&bytes)?),
    }
    Ok(())
}
