use anyhow::{Context, Result};

use csafe_mux::Response;
use csafe_mux::codec::Endian;

use crate::cli::SendOpts;
use crate::link::connect;

pub async fn run(opts: SendOpts) -> Result<()> {
    let (mux, driver) = connect(&opts.ser, &opts.link)?;

    let result = mux.send(opts.commands.iter().cloned()).await;
    drop(mux);
    match driver.await {
        Ok(stats) => stats.log(),
        Err(e) => tracing::warn!("[link] driver task failed: {}", e),
    }
    let response = result.context("waiting for response")?;

    print_response(&response);
    Ok(())
}

/// One line for the frame, then one per structure with its little-endian value
/// where the data is short enough to be a counter.
pub fn print_response(response: &Response) {
    println!("{}", response);
    for s in &response.structures {
        if (1..=4).contains(&s.data.len()) {
            println!("  0x{:02X} = {}", s.identifier, s.read_int(Endian::Little));
        }
    }
}
