//! # Flight control link
//!
//! [FlightLink] is the set of Crazyflie operations used by this crate: setting
//! parameters, pushing external poses to the estimator, uploading and flying
//! trajectories with the high-level commander and streaming log variables.
//!
//! It is implemented for [crazyflie_lib::Crazyflie] so that a connected
//! Crazyflie can be passed directly to the functions of the crate:
//! ``` no_run
//! # async fn example() -> crazyflie_mocap::Result<()> {
//! use crazyflie_mocap::link::FlightLink;
//!
//! let link_context = crazyflie_link::LinkContext::new();
//! let uri = "radio://0/80/2M/E7E7E7E7E7";
//! let cf = crazyflie_mocap::crazyflie::connect(&link_context, uri).await?;
//!
//! cf.send_external_position([0.0, 0.0, 0.1]).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{timeout_at, Instant};

use crate::pose::Pose;
use crate::relay::PoseSink;
use crate::trajectory::TrajectorySegment;
use crate::{Error, Result};

/// Operations needed from a Crazyflie
#[async_trait]
pub trait FlightLink: Send + Sync {
    /// Set a parameter, the value is converted to the type of the parameter
    async fn set_param(&self, name: &str, value: f64) -> Result<()>;

    /// Send position (meters) and orientation (`[qx, qy, qz, qw]`) to the estimator
    async fn send_external_pose(&self, position: [f32; 3], quaternion: [f32; 4]) -> Result<()>;

    /// Send position (meters) to the estimator
    async fn send_external_position(&self, position: [f32; 3]) -> Result<()>;

    /// Write polynomial segments at the start of the trajectory memory
    ///
    /// Returns the number of bytes written.
    async fn write_trajectory(&self, segments: &[TrajectorySegment]) -> Result<usize>;

    /// Bind a trajectory ID to segments previously written in trajectory memory
    async fn define_trajectory(
        &self,
        trajectory_id: u8,
        memory_offset: u32,
        piece_count: u8,
    ) -> Result<()>;

    /// Take off to `height` meters in `duration` seconds, keeping the current yaw
    async fn take_off(&self, height: f32, duration: f32) -> Result<()>;

    /// Start a defined trajectory
    async fn start_trajectory(
        &self,
        trajectory_id: u8,
        time_scale: f32,
        relative: bool,
    ) -> Result<()>;

    /// Go to an absolute position and yaw in `duration` seconds
    async fn go_to(&self, x: f32, y: f32, z: f32, yaw: f32, duration: f32) -> Result<()>;

    /// Land to `height` meters in `duration` seconds, keeping the current yaw
    async fn land(&self, height: f32, duration: f32) -> Result<()>;

    /// Stop the high-level commander and the motors
    async fn stop(&self) -> Result<()>;

    /// Arm or disarm the motors
    async fn arm(&self, arm: bool) -> Result<()>;

    /// Stream log variables at the given period
    async fn subscribe_log(&self, variables: &[&str], period: Duration) -> Result<LogSubscription>;
}

/// One sample of a log subscription
#[derive(Debug, Clone, PartialEq)]
pub struct LogSample {
    /// Crazyflie timestamp in milliseconds
    pub timestamp: u32,
    /// Value of each logged variable
    pub values: HashMap<String, f64>,
}

impl LogSample {
    /// Value of a logged variable
    pub fn get(&self, name: &str) -> Result<f64> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| Error::InvalidArgument(format!("{} is not in the log sample", name)))
    }
}

/// Stream of log samples
///
/// Dropping the subscription stops the log block on the Crazyflie side.
#[derive(Debug)]
pub struct LogSubscription {
    samples: flume::Receiver<LogSample>,
}

impl LogSubscription {
    /// Create a subscription reading samples from a channel
    pub fn new(samples: flume::Receiver<LogSample>) -> Self {
        Self { samples }
    }

    /// Wait for the next sample
    ///
    /// Returns [Error::Disconnected] once the producer is gone.
    pub async fn next(&self) -> Result<LogSample> {
        Ok(self.samples.recv_async().await?)
    }

    /// Wait for the next sample until `deadline`
    ///
    /// Returns `None` if no sample arrived before the deadline.
    pub async fn next_until(&self, deadline: Instant) -> Result<Option<LogSample>> {
        match timeout_at(deadline, self.next()).await {
            Ok(sample) => sample.map(Some),
            Err(_) => Ok(None),
        }
    }
}

/// Pose sink forwarding poses to the Crazyflie estimator
///
/// With `full_pose` the orientation is sent along with the position, otherwise
/// only the position is sent.
pub struct ExternalPoseSink<L: FlightLink> {
    link: Arc<L>,
    full_pose: bool,
}

impl<L: FlightLink> ExternalPoseSink<L> {
    /// Create a sink sending to `link`
    pub fn new(link: Arc<L>, full_pose: bool) -> Self {
        Self { link, full_pose }
    }
}

#[async_trait]
impl<L: FlightLink + 'static> PoseSink for ExternalPoseSink<L> {
    async fn on_pose(&self, pose: &Pose) -> Result<()> {
        if self.full_pose {
            self.link
                .send_external_pose(pose.position_f32(), pose.quaternion_xyzw())
                .await
        } else {
            self.link.send_external_position(pose.position_f32()).await
        }
    }
}
