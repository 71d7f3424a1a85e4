//! # Pose relay
//!
//! The relay runs a background task that waits for mocap frames, picks the
//! rigid body representing the Crazyflie and hands its pose to a [PoseSink].
//! The sink can be installed after the relay is started; until then the poses
//! are only recorded as the latest known pose.
//!
//! ``` no_run
//! # async fn example() -> crazyflie_mocap::Result<()> {
//! use std::sync::Arc;
//! use crazyflie_mocap::link::ExternalPoseSink;
//! use crazyflie_mocap::relay::PoseRelay;
//! use crazyflie_mocap::source::ViconUdpSource;
//!
//! let link_context = crazyflie_link::LinkContext::new();
//! let uri = "radio://0/80/2M/E7E7E7E7E7";
//! let cf = Arc::new(crazyflie_mocap::crazyflie::connect(&link_context, uri).await?);
//!
//! let source = ViconUdpSource::bind("0.0.0.0:51001").await?;
//! let relay = PoseRelay::start(source, "cf");
//! relay.set_on_pose(Arc::new(ExternalPoseSink::new(cf.clone(), true))).await;
//!
//! // ... fly ...
//!
//! relay.close().await;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::Ordering::Relaxed;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::lock::Mutex;
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;

use crate::pose::Pose;
use crate::source::MocapSource;
use crate::Result;

// The stop flag is checked at least this often
const POLL_PERIOD: Duration = Duration::from_millis(100);

/// Receiver of the poses of the tracked body
#[async_trait]
pub trait PoseSink: Send + Sync {
    /// Called for every valid pose of the tracked body
    async fn on_pose(&self, pose: &Pose) -> Result<()>;
}

type SharedSink = Arc<Mutex<Option<Arc<dyn PoseSink>>>>;

/// Background task relaying the pose of one rigid body
///
/// The relay is one-time use: once closed, either by [PoseRelay::close()] or
/// because the source failed, a new relay has to be started.
pub struct PoseRelay {
    body_name: String,
    on_pose: SharedSink,
    latest: Arc<Mutex<Option<Pose>>>,
    forwarded: Arc<AtomicU64>,
    stay_open: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PoseRelay {
    /// Start relaying the pose of `body_name` from `source`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(source: impl MocapSource + 'static, body_name: &str) -> Self {
        let on_pose: SharedSink = Arc::new(Mutex::new(None));
        let latest = Arc::new(Mutex::new(None));
        let forwarded = Arc::new(AtomicU64::new(0));
        let stay_open = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(relay_task(
            source,
            body_name.to_owned(),
            on_pose.clone(),
            latest.clone(),
            forwarded.clone(),
            stay_open.clone(),
        ));

        info!("Relaying pose of rigid body '{}'", body_name);

        Self {
            body_name: body_name.to_owned(),
            on_pose,
            latest,
            forwarded,
            stay_open,
            task: Mutex::new(Some(task)),
        }
    }

    /// Name of the relayed rigid body
    pub fn body_name(&self) -> &str {
        &self.body_name
    }

    /// Install the sink receiving the poses, replacing the previous one
    pub async fn set_on_pose(&self, sink: Arc<dyn PoseSink>) {
        *self.on_pose.lock().await = Some(sink);
    }

    /// Remove the sink, poses are then only recorded
    pub async fn clear_on_pose(&self) {
        *self.on_pose.lock().await = None;
    }

    /// Last valid pose received for the body
    pub async fn latest_pose(&self) -> Option<Pose> {
        *self.latest.lock().await
    }

    /// Number of poses successfully handed to a sink
    pub fn poses_forwarded(&self) -> u64 {
        self.forwarded.load(Relaxed)
    }

    /// `true` until the relay is closed or its source fails
    pub fn is_running(&self) -> bool {
        self.stay_open.load(Relaxed)
    }

    /// Stop the relay and wait for the background task to finish
    pub async fn close(&self) {
        self.stay_open.store(false, Relaxed);

        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("Pose relay task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PoseRelay {
    fn drop(&mut self) {
        self.stay_open.store(false, Relaxed);
    }
}

async fn relay_task(
    mut source: impl MocapSource,
    body_name: String,
    on_pose: SharedSink,
    latest: Arc<Mutex<Option<Pose>>>,
    forwarded: Arc<AtomicU64>,
    stay_open: Arc<AtomicBool>,
) {
    while stay_open.load(Relaxed) {
        let frame = match tokio::time::timeout(POLL_PERIOD, source.next_frame()).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => {
                error!("Mocap source failed, stopping relay: {}", e);
                break;
            }
            Err(_) => continue,
        };

        let Some(body) = frame.body(&body_name) else {
            continue;
        };

        if !body.pose.is_valid() {
            debug!("Frame {}: '{}' not tracked", frame.frame_number, body_name);
            continue;
        }

        *latest.lock().await = Some(body.pose);

        let sink = on_pose.lock().await.clone();
        if let Some(sink) = sink {
            match sink.on_pose(&body.pose).await {
                Ok(()) => {
                    forwarded.fetch_add(1, Relaxed);
                }
                Err(e) => warn!("Could not forward pose of frame {}: {}", frame.frame_number, e),
            }
        }
    }

    stay_open.store(false, Relaxed);
}
