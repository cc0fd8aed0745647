use anyhow::{Context, Result};

use csafe_mux::Session;

use crate::cli::{WorkoutKind, WorkoutOpts};
use crate::link::connect;

pub async fn run(opts: WorkoutOpts) -> Result<()> {
    let (mux, driver) = connect(&opts.ser, &opts.link)?;
    let session = Session::new(mux);

    let result = match opts.kind {
        WorkoutKind::Distance { meters } => session.start_distance_workout(meters).await,
        WorkoutKind::Time { seconds } => session.start_time_workout(seconds).await,
        WorkoutKind::Interval { meters, rest } => {
            session.start_distance_interval_workout(meters, rest).await
        }
    };
    drop(session);
    match driver.await {
        Ok(stats) => stats.log(),
        Err(e) => tracing::warn!("[link] driver task failed: {}", e),
    }
    result.with_context(|| format!("starting {:?} workout", opts.kind))?;

    println!("workout started");
    Ok(())
}
