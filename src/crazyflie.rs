//! # Crazyflie backend
//!
//! [FlightLink] implementation for [crazyflie_lib::Crazyflie]. Every operation
//! maps to one call of the `crazyflie-lib` subsystems, the only logic here is
//! the conversion of trajectory segments and log samples.

use std::convert::TryInto;
use std::time::Duration;

use async_trait::async_trait;
use crazyflie_lib::subsystems::memory::{MemoryType, Poly, Poly4D, TrajectoryMemory};
use crazyflie_lib::{Crazyflie, NoTocCache};
use log::{debug, info, warn};

use crate::link::{FlightLink, LogSample, LogSubscription};
use crate::trajectory::TrajectorySegment;
use crate::{Error, Result};

/// Open a Crazyflie connection to a given URI
///
/// The link context must be kept alive for as long as the Crazyflie is used.
pub async fn connect(link_context: &crazyflie_link::LinkContext, uri: &str) -> Result<Crazyflie> {
    info!("Connecting to {}", uri);
    let cf = Crazyflie::connect_from_uri(link_context, uri, NoTocCache).await?;
    info!("Connected to {}", uri);
    Ok(cf)
}

impl From<&TrajectorySegment> for Poly4D {
    fn from(segment: &TrajectorySegment) -> Self {
        Poly4D::new(
            segment.duration,
            Poly::new(segment.x),
            Poly::new(segment.y),
            Poly::new(segment.z),
            Poly::new(segment.yaw),
        )
    }
}

// The memory is always closed, a close failure is reported after the write error
fn write_outcome(
    written: crazyflie_lib::Result<usize>,
    closed: crazyflie_lib::Result<()>,
) -> Result<usize> {
    if let Err(e) = &closed {
        warn!("Failed to close trajectory memory: {:?}", e);
    }
    let written = written?;
    closed?;
    Ok(written)
}

#[async_trait]
impl FlightLink for Crazyflie {
    async fn set_param(&self, name: &str, value: f64) -> Result<()> {
        debug!("Setting {} to {}", name, value);
        self.param.set_lossy(name, value).await?;
        Ok(())
    }

    async fn send_external_pose(&self, position: [f32; 3], quaternion: [f32; 4]) -> Result<()> {
        self.localization
            .external_pose
            .send_external_pose(position, quaternion)
            .await?;
        Ok(())
    }

    async fn send_external_position(&self, position: [f32; 3]) -> Result<()> {
        self.localization
            .external_pose
            .send_external_position(position)
            .await?;
        Ok(())
    }

    async fn write_trajectory(&self, segments: &[TrajectorySegment]) -> Result<usize> {
        let device = self
            .memory
            .get_memories(Some(MemoryType::Trajectory))
            .first()
            .map(|device| (*device).clone())
            .ok_or_else(|| Error::MemoryError("No trajectory memory found".to_owned()))?;

        let memory = self
            .memory
            .open_memory::<TrajectoryMemory>(device)
            .await
            .ok_or_else(|| Error::MemoryError("Trajectory memory is already open".to_owned()))??;

        let pieces: Vec<Poly4D> = segments.iter().map(Poly4D::from).collect();
        let written = memory.write_uncompressed(&pieces, 0).await;
        let closed = self.memory.close_memory(memory).await;

        let written = write_outcome(written, closed)?;
        debug!("Wrote {} pieces ({} bytes) to trajectory memory", pieces.len(), written);
        Ok(written)
    }

    async fn define_trajectory(
        &self,
        trajectory_id: u8,
        memory_offset: u32,
        piece_count: u8,
    ) -> Result<()> {
        self.high_level_commander
            .define_trajectory(trajectory_id, memory_offset, piece_count, None)
            .await?;
        Ok(())
    }

    async fn take_off(&self, height: f32, duration: f32) -> Result<()> {
        self.high_level_commander
            .take_off(height, None, duration, None)
            .await?;
        Ok(())
    }

    async fn start_trajectory(
        &self,
        trajectory_id: u8,
        time_scale: f32,
        relative: bool,
    ) -> Result<()> {
        self.high_level_commander
            .start_trajectory(trajectory_id, time_scale, relative, false, false, None)
            .await?;
        Ok(())
    }

    async fn go_to(&self, x: f32, y: f32, z: f32, yaw: f32, duration: f32) -> Result<()> {
        self.high_level_commander
            .go_to(x, y, z, yaw, duration, false, false, None)
            .await?;
        Ok(())
    }

    async fn land(&self, height: f32, duration: f32) -> Result<()> {
        self.high_level_commander
            .land(height, None, duration, None)
            .await?;
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.high_level_commander.stop(None).await?;
        Ok(())
    }

    async fn arm(&self, arm: bool) -> Result<()> {
        self.supervisor.send_arming_request(arm).await?;
        Ok(())
    }

    async fn subscribe_log(&self, variables: &[&str], period: Duration) -> Result<LogSubscription> {
        let mut block = self.log.create_block().await?;
        for variable in variables {
            block.add_variable(variable).await?;
        }

        let period = period
            .try_into()
            .map_err(|e| Error::InvalidArgument(format!("Invalid log period: {:?}", e)))?;
        let stream = block.start(period).await?;

        let (samples, rx) = flume::unbounded();
        tokio::spawn(async move {
            while let Ok(data) = stream.next().await {
                let sample = LogSample {
                    timestamp: data.timestamp,
                    values: data
                        .data
                        .iter()
                        .map(|(name, value)| (name.clone(), value.to_f64_lossy()))
                        .collect(),
                };
                if samples.send_async(sample).await.is_err() {
                    break;
                }
            }
            let _ = stream.stop().await;
        });

        Ok(LogSubscription::new(rx))
    }
}
