//! Workout set-up sequences issued through a [`Multiplexer`].

use tracing::{debug, info};

use crate::codec::{Endian, read_int};
use crate::error::{Error, Result};
use crate::frame::Response;
use crate::mux::Multiplexer;
use crate::proto::Command;
use crate::proto::command::GET_WORK_DISTANCE;

/// One monitor, one link. Constructed by whoever owns the connection and
/// passed to the code that starts workouts.
#[derive(Clone)]
pub struct Session {
    mux: Multiplexer,
}

impl Session {
    pub fn new(mux: Multiplexer) -> Self {
        Self { mux }
    }

    pub fn multiplexer(&self) -> &Multiplexer {
        &self.mux
    }

    pub async fn reset(&self) -> Result<Response> {
        self.mux.send([Command::Reset]).await
    }

    /// Distance rowed so far as `(value, unit specifier)`; the unit is
    /// [`UNIT_METERS`](crate::proto::command::UNIT_METERS) on a PM.
    pub async fn work_distance(&self) -> Result<(u16, u8)> {
        let response = self.mux.send([Command::GetWorkDistance]).await?;
        let data = response
            .structure(GET_WORK_DISTANCE)
            .map(|s| s.data.as_slice())
            .filter(|d| d.len() >= 3)
            .ok_or(Error::BadStructure(GET_WORK_DISTANCE))?;
        let distance = read_int(&data[..2], Endian::Little) as u16;
        debug!("[session] work distance {} (unit 0x{:02X})", distance, data[2]);
        Ok((distance, data[2]))
    }

    pub async fn start_distance_workout(&self, meters: u16) -> Result<()> {
        info!("[session] starting {}m workout", meters);
        self.start_workout(Command::set_horizontal(meters)).await
    }

    pub async fn start_time_workout(&self, seconds: u32) -> Result<()> {
        info!("[session] starting {}s workout", seconds);
        self.start_workout(Command::set_t_work(seconds)).await
    }

    /// The configuration block carries the workout type, distance, rest and
    /// screen state, so it goes out on its own.
    pub async fn start_distance_interval_workout(&self, meters: u32, rest_seconds: u16) -> Result<()> {
        info!(
            "[session] starting {}m intervals with {}s rest",
            meters, rest_seconds
        );
        self.mux
            .send([Command::start_distance_interval_workout(meters, rest_seconds)])
            .await?;
        Ok(())
    }

    async fn start_workout(&self, goal: Command) -> Result<()> {
        let steps = [
            Command::Reset,
            goal,
            Command::set_program(None),
            Command::GoInUse,
        ];
        for step in steps {
            self.mux.send([step]).await?;
        }
        Ok(())
    }
}
