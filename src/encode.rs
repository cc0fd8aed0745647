use anyhow::Result;

use csafe_mux::codec::hex;
use csafe_mux::proto::format_command;
use csafe_mux::{build_frame, fragment};

use crate::cli::EncodeOpts;

pub fn run(opts: EncodeOpts) -> Result<()> {
    let tokens: Vec<String> = opts.commands.iter().map(format_command).collect();
    let frame = build_frame(&opts.commands);
    println!("commands: {}", tokens.join(" "));
    println!("frame ({} bytes): {}", frame.len(), hex(&frame));

    let packets: Vec<&[u8]> = fragment(&frame, opts.packet_size).collect();
    for (i, packet) in packets.iter().enumerate() {
        println!(
            "packet {}/{} ({} bytes): {}",
            i + 1,
            packets.len(),
            packet.len(),
            hex(packet)
        );
    }
    Ok(())
}
