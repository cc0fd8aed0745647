use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod decode;
mod encode;
mod link;
mod send;
mod workout;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match args.cmd {
        cli::Cmd::Encode(opts) => encode::run(opts),
        cli::Cmd::Decode(opts) => decode::run(opts),
        cli::Cmd::Send(opts) => send::run(opts).await,
        cli::Cmd::Workout(opts) => workout::run(opts).await,
    }
}
