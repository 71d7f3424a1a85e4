//! # Crazyflie mocap
//!
//! This crate feeds the pose of a rigid body tracked by a motion capture system into the Crazyflie onboard state
//! estimator, and flies scripted trajectories with the high-level commander. The Crazyflie side is handled by the
//! [crazyflie-lib] crate.
//!
//! ## Status
//!
//! | Component | Support |
//! |-----------|---------|
//! | Vicon UDP object stream | Full (object items) |
//! | Other mocap systems | Through the [source::MocapSource] trait |
//! | External pose / position | Full |
//! | Kalman estimator set-up | Full |
//! | Trajectory upload | Uncompressed polynomials |
//! | Flight sequence | Time based |
//!
//! ## Usage
//!
//! The basic procedure is:
//!  - Connect a Crazyflie with [crazyflie::connect()]
//!  - Start a [relay::PoseRelay] on a mocap source, usually a [source::ViconUdpSource]
//!  - Install an [link::ExternalPoseSink] on the relay so that every pose reaches the Kalman estimator
//!  - Activate and reset the estimator with the functions of the [estimator] module
//!  - Upload a trajectory with [trajectory::upload_trajectory()] and fly it with [sequence::run_sequence()]
//!  - Close the relay
//!
//! All the Crazyflie operations go through the [link::FlightLink] trait, implemented for
//! [crazyflie_lib::Crazyflie]. All its functions only take an un-mutable reference to self (`&self`), the
//! Crazyflie is intended to be shared between the relay and the flight code using `Arc<>`.
//!
//! For example:
//! ``` no_run
//! # async fn fly() -> crazyflie_mocap::Result<()> {
//! use std::sync::Arc;
//! use crazyflie_mocap::{estimator, sequence, trajectory};
//! use crazyflie_mocap::link::ExternalPoseSink;
//! use crazyflie_mocap::relay::PoseRelay;
//! use crazyflie_mocap::source::ViconUdpSource;
//!
//! let link_context = crazyflie_link::LinkContext::new();
//! let cf = Arc::new(crazyflie_mocap::crazyflie::connect(&link_context, "radio://0/80/2M/E7E7E7E7E7").await?);
//!
//! let relay = PoseRelay::start(ViconUdpSource::bind("0.0.0.0:51001").await?, "cf");
//! relay.set_on_pose(Arc::new(ExternalPoseSink::new(cf.clone(), true))).await;
//!
//! estimator::activate_kalman_estimator(cf.as_ref()).await?;
//! let duration = trajectory::upload_trajectory(cf.as_ref(), 1, &trajectory::figure8()).await?;
//! estimator::reset_estimator(cf.as_ref(), None).await?;
//!
//! sequence::run_sequence(cf.as_ref(), 1, duration, &Default::default()).await?;
//!
//! relay.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! [crazyflie-lib]: https://crates.io/crates/crazyflie-lib

#![warn(missing_docs)]

pub mod config;
pub mod crazyflie;
mod error;
pub mod estimator;
pub mod link;
pub mod pose;
pub mod relay;
pub mod sequence;
pub mod source;
pub mod trajectory;
pub mod vicon;

pub use crate::error::{Error, Result};
pub use crate::link::{ExternalPoseSink, FlightLink};
pub use crate::pose::Pose;
pub use crate::relay::{PoseRelay, PoseSink};
pub use crate::source::{MocapFrame, MocapSource, RigidBody, ViconUdpSource};
