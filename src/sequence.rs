//! # Scripted flight
//!
//! Time based flight sequence using the high-level commander: take off, fly a
//! defined trajectory, optionally go to a final point, land.
//!
//! The sequence only sleeps between commands, it does not check where the
//! Crazyflie actually is.

use std::time::Duration;

use log::{info, warn};
use tokio::time::sleep;

use crate::link::FlightLink;
use crate::{Error, Result};

/// Absolute position to fly to after the trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoToPoint {
    /// X in meters
    pub x: f32,
    /// Y in meters
    pub y: f32,
    /// Z in meters
    pub z: f32,
    /// Yaw in radians
    pub yaw: f32,
    /// Time to reach the point, in seconds
    pub duration: f32,
    /// Time to wait once the command is sent, in seconds
    pub settle: f32,
}

impl Default for GoToPoint {
    fn default() -> Self {
        Self {
            x: -0.1,
            y: 0.1,
            z: 0.5,
            yaw: 0.0,
            duration: 2.0,
            settle: 3.0,
        }
    }
}

/// Timings and heights of the flight sequence
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceConfig {
    /// Take-off height in meters
    pub takeoff_height: f32,
    /// Take-off duration in seconds
    pub takeoff_duration: f32,
    /// Wait after take-off, in seconds
    pub takeoff_settle: f32,
    /// Trajectory time scale, 1.0 flies the trajectory at its nominal speed
    pub time_scale: f32,
    /// Fly the trajectory relative to the take-off position
    pub relative: bool,
    /// Optional point to go to after the trajectory
    pub go_to: Option<GoToPoint>,
    /// Landing height in meters
    pub land_height: f32,
    /// Landing duration in seconds
    pub land_duration: f32,
    /// Wait after the land command, in seconds
    pub land_settle: f32,
    /// Arm the motors before taking off
    pub arm: bool,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            takeoff_height: 1.0,
            takeoff_duration: 2.0,
            takeoff_settle: 3.0,
            time_scale: 1.0,
            relative: true,
            go_to: None,
            land_height: 0.0,
            land_duration: 2.0,
            land_settle: 2.0,
            arm: false,
        }
    }
}

fn seconds(value: f32, name: &str) -> Result<Duration> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, value
        )));
    }
    Ok(Duration::from_secs_f32(value))
}

/// Fly the trajectory `trajectory_id` lasting `duration` seconds
///
/// All durations are checked before the first command is sent.
pub async fn run_sequence<L: FlightLink + ?Sized>(
    link: &L,
    trajectory_id: u8,
    duration: f32,
    config: &SequenceConfig,
) -> Result<()> {
    if !config.time_scale.is_finite() || config.time_scale <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "time scale must be positive, got {}",
            config.time_scale
        )));
    }
    let takeoff_settle = seconds(config.takeoff_settle, "take-off settle time")?;
    let trajectory_time = seconds(duration * config.time_scale, "trajectory duration")?;
    let land_settle = seconds(config.land_settle, "land settle time")?;
    let go_to_settle = match &config.go_to {
        Some(point) => Some(seconds(point.settle, "go-to settle time")?),
        None => None,
    };

    if config.arm {
        info!("Arming");
        link.arm(true).await?;
        sleep(Duration::from_secs(1)).await;
    }

    info!("Taking off to {} m", config.takeoff_height);
    link.take_off(config.takeoff_height, config.takeoff_duration).await?;
    sleep(takeoff_settle).await;

    info!("Starting trajectory {}", trajectory_id);
    link.start_trajectory(trajectory_id, config.time_scale, config.relative).await?;
    sleep(trajectory_time).await;

    if let (Some(point), Some(settle)) = (&config.go_to, go_to_settle) {
        info!("Going to ({}, {}, {})", point.x, point.y, point.z);
        link.go_to(point.x, point.y, point.z, point.yaw, point.duration).await?;
        sleep(settle).await;
    }

    info!("Landing");
    link.land(config.land_height, config.land_duration).await?;
    sleep(land_settle).await;

    link.stop().await?;
    info!("Sequence done");
    Ok(())
}

/// Duration of the landing started by [emergency_land()], in seconds
pub const EMERGENCY_LAND_DURATION: f32 = 2.0;

/// Land immediately and stop the motors once landed
///
/// The stop command is sent even if landing fails, then right away.
pub async fn emergency_land<L: FlightLink + ?Sized>(link: &L) -> Result<()> {
    warn!("Emergency landing");
    let landed = link.land(0.0, EMERGENCY_LAND_DURATION).await;
    match &landed {
        Ok(()) => sleep(Duration::from_secs_f32(EMERGENCY_LAND_DURATION)).await,
        Err(e) => warn!("Land command failed: {}", e),
    }

    link.stop().await?;
    landed
}
