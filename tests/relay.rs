mod common;

use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{frame, init_logger, Call, ChannelSource, MockLink};
use crazyflie_mocap::link::ExternalPoseSink;
use crazyflie_mocap::relay::{PoseRelay, PoseSink};
use crazyflie_mocap::{Error, Pose, Result};
use tokio::time::timeout;

struct RecordingSink {
    poses: flume::Sender<Pose>,
}

#[async_trait]
impl PoseSink for RecordingSink {
    async fn on_pose(&self, pose: &Pose) -> Result<()> {
        self.poses.send(*pose)?;
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl PoseSink for FailingSink {
    async fn on_pose(&self, _pose: &Pose) -> Result<()> {
        Err(Error::Disconnected)
    }
}

fn recording_sink() -> (Arc<RecordingSink>, flume::Receiver<Pose>) {
    let (poses, rx) = flume::unbounded();
    (Arc::new(RecordingSink { poses }), rx)
}

fn at(x: f64) -> Pose {
    Pose::from_euler(x, 0.0, 0.0, 0.0, 0.0, 0.0)
}

async fn next_pose(rx: &flume::Receiver<Pose>) -> Pose {
    timeout(Duration::from_secs(2), rx.recv_async())
        .await
        .expect("no pose received")
        .unwrap()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached");
}

#[tokio::test]
async fn relays_the_configured_body_only() {
    init_logger();
    let (frames, source) = ChannelSource::new();
    let relay = PoseRelay::start(source, "cf");
    let (sink, poses) = recording_sink();
    relay.set_on_pose(sink).await;

    frames.send(frame(1, &[("wand", at(9.0)), ("cf", at(1.0))])).unwrap();
    frames.send(frame(2, &[("wand", at(9.0))])).unwrap();
    frames.send(frame(3, &[("cf", at(3.0))])).unwrap();

    assert_eq!(next_pose(&poses).await, at(1.0));
    assert_eq!(next_pose(&poses).await, at(3.0));
    assert_eq!(relay.latest_pose().await, Some(at(3.0)));
    assert_eq!(relay.poses_forwarded(), 2);
    assert_eq!(relay.body_name(), "cf");

    relay.close().await;
    assert!(!relay.is_running());
}

#[tokio::test]
async fn untracked_poses_are_not_forwarded() {
    let (frames, source) = ChannelSource::new();
    let relay = PoseRelay::start(source, "cf");
    let (sink, poses) = recording_sink();
    relay.set_on_pose(sink).await;

    frames.send(frame(1, &[("cf", at(f64::NAN))])).unwrap();
    frames.send(frame(2, &[("cf", at(2.0))])).unwrap();

    assert_eq!(next_pose(&poses).await, at(2.0));
    assert!(poses.is_empty());

    relay.close().await;
}

#[tokio::test]
async fn poses_without_sink_are_only_recorded() {
    let (frames, source) = ChannelSource::new();
    let relay = PoseRelay::start(source, "cf");

    assert_eq!(relay.latest_pose().await, None);

    frames.send(frame(1, &[("cf", at(1.0))])).unwrap();
    wait_until(|| frames.is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(relay.latest_pose().await, Some(at(1.0)));
    assert_eq!(relay.poses_forwarded(), 0);

    // Installed late, only sees the following poses
    let (sink, poses) = recording_sink();
    relay.set_on_pose(sink).await;
    frames.send(frame(2, &[("cf", at(2.0))])).unwrap();
    assert_eq!(next_pose(&poses).await, at(2.0));

    relay.clear_on_pose().await;
    frames.send(frame(3, &[("cf", at(3.0))])).unwrap();
    wait_until(|| frames.is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(poses.is_empty());
    assert_eq!(relay.latest_pose().await, Some(at(3.0)));

    relay.close().await;
}

#[tokio::test]
async fn sink_errors_do_not_stop_the_relay() {
    init_logger();
    let (frames, source) = ChannelSource::new();
    let relay = PoseRelay::start(source, "cf");
    relay.set_on_pose(Arc::new(FailingSink)).await;

    frames.send(frame(1, &[("cf", at(1.0))])).unwrap();
    frames.send(frame(2, &[("cf", at(2.0))])).unwrap();
    wait_until(|| frames.is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(relay.is_running());
    assert_eq!(relay.poses_forwarded(), 0);
    assert_eq!(relay.latest_pose().await, Some(at(2.0)));

    relay.close().await;
}

#[tokio::test]
async fn source_error_ends_the_relay() {
    init_logger();
    let (frames, source) = ChannelSource::new();
    let relay = PoseRelay::start(source, "cf");
    assert!(relay.is_running());

    drop(frames);

    wait_until(|| !relay.is_running()).await;
    relay.close().await;
}

#[tokio::test]
async fn close_returns_while_waiting_for_frames() {
    let (_frames, source) = ChannelSource::new();
    let relay = PoseRelay::start(source, "cf");

    timeout(Duration::from_secs(1), relay.close())
        .await
        .expect("relay did not stop");
    assert!(!relay.is_running());

    // Closing twice is fine
    relay.close().await;
}

#[tokio::test]
async fn external_pose_sink_sends_full_pose() {
    let link = Arc::new(MockLink::new());
    let (frames, source) = ChannelSource::new();
    let relay = PoseRelay::start(source, "cf");
    relay
        .set_on_pose(Arc::new(ExternalPoseSink::new(link.clone(), true)))
        .await;

    let pose = Pose::from_euler(0.1, 0.2, 0.3, 0.0, 0.0, std::f64::consts::PI);
    frames.send(frame(1, &[("cf", pose)])).unwrap();
    wait_until(|| relay.poses_forwarded() == 1).await;

    assert_eq!(
        link.calls(),
        vec![Call::ExternalPose([0.1, 0.2, 0.3], pose.quaternion_xyzw())]
    );

    relay.close().await;
}

#[tokio::test]
async fn external_pose_sink_sends_position_only() {
    let link = Arc::new(MockLink::new());
    let (frames, source) = ChannelSource::new();
    let relay = PoseRelay::start(source, "cf");
    relay
        .set_on_pose(Arc::new(ExternalPoseSink::new(link.clone(), false)))
        .await;

    frames.send(frame(1, &[("cf", at(0.5))])).unwrap();
    wait_until(|| relay.poses_forwarded() == 1).await;

    assert_eq!(link.calls(), vec![Call::ExternalPosition([0.5, 0.0, 0.0])]);

    relay.close().await;
}

#[tokio::test]
async fn link_errors_are_not_counted() {
    let link = Arc::new(MockLink::new());
    link.fail_poses.store(true, Relaxed);
    let (frames, source) = ChannelSource::new();
    let relay = PoseRelay::start(source, "cf");
    relay
        .set_on_pose(Arc::new(ExternalPoseSink::new(link.clone(), true)))
        .await;

    frames.send(frame(1, &[("cf", at(0.5))])).unwrap();
    wait_until(|| frames.is_empty()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(relay.poses_forwarded(), 0);
    assert!(relay.is_running());
    assert!(link.calls().is_empty());

    relay.close().await;
}
