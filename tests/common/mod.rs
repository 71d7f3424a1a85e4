// Shared helpers for the integration tests
#![allow(dead_code)]

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use crazyflie_mocap::link::{FlightLink, LogSample, LogSubscription};
use crazyflie_mocap::source::{MocapFrame, MocapSource, RigidBody};
use crazyflie_mocap::trajectory::{TrajectorySegment, PIECE_SIZE};
use crazyflie_mocap::{Error, Pose, Result};
use tokio::time::Instant;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Operation received by [MockLink]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetParam(String, f64),
    ExternalPose([f32; 3], [f32; 4]),
    ExternalPosition([f32; 3]),
    WriteTrajectory(usize),
    DefineTrajectory(u8, u32, u8),
    TakeOff(f32, f32),
    StartTrajectory(u8, f32, bool),
    GoTo(f32, f32, f32, f32, f32),
    Land(f32, f32),
    Stop,
    Arm(bool),
    SubscribeLog(Vec<String>),
}

/// Flight link recording every call with the time it was made
#[derive(Default)]
pub struct MockLink {
    calls: Mutex<Vec<(Instant, Call)>>,
    log_samples: Mutex<Vec<LogSample>>,
    open_logs: Mutex<Vec<flume::Sender<LogSample>>>,
    pub keep_logs_open: AtomicBool,
    pub fail_poses: AtomicBool,
    pub fail_land: AtomicBool,
    pub short_write: AtomicBool,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples delivered to every log subscription
    pub fn with_log_samples(samples: Vec<LogSample>) -> Self {
        let link = Self::new();
        *link.log_samples.lock().unwrap() = samples;
        link
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(_, call)| call.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }
}

#[async_trait]
impl FlightLink for MockLink {
    async fn set_param(&self, name: &str, value: f64) -> Result<()> {
        self.record(Call::SetParam(name.to_owned(), value));
        Ok(())
    }

    async fn send_external_pose(&self, position: [f32; 3], quaternion: [f32; 4]) -> Result<()> {
        if self.fail_poses.load(Relaxed) {
            return Err(Error::Disconnected);
        }
        self.record(Call::ExternalPose(position, quaternion));
        Ok(())
    }

    async fn send_external_position(&self, position: [f32; 3]) -> Result<()> {
        if self.fail_poses.load(Relaxed) {
            return Err(Error::Disconnected);
        }
        self.record(Call::ExternalPosition(position));
        Ok(())
    }

    async fn write_trajectory(&self, segments: &[TrajectorySegment]) -> Result<usize> {
        self.record(Call::WriteTrajectory(segments.len()));
        if self.short_write.load(Relaxed) {
            Ok(segments.len() * PIECE_SIZE - 1)
        } else {
            Ok(segments.len() * PIECE_SIZE)
        }
    }

    async fn define_trajectory(
        &self,
        trajectory_id: u8,
        memory_offset: u32,
        piece_count: u8,
    ) -> Result<()> {
        self.record(Call::DefineTrajectory(trajectory_id, memory_offset, piece_count));
        Ok(())
    }

    async fn take_off(&self, height: f32, duration: f32) -> Result<()> {
        self.record(Call::TakeOff(height, duration));
        Ok(())
    }

    async fn start_trajectory(
        &self,
        trajectory_id: u8,
        time_scale: f32,
        relative: bool,
    ) -> Result<()> {
        self.record(Call::StartTrajectory(trajectory_id, time_scale, relative));
        Ok(())
    }

    async fn go_to(&self, x: f32, y: f32, z: f32, yaw: f32, duration: f32) -> Result<()> {
        self.record(Call::GoTo(x, y, z, yaw, duration));
        Ok(())
    }

    async fn land(&self, height: f32, duration: f32) -> Result<()> {
        self.record(Call::Land(height, duration));
        if self.fail_land.load(Relaxed) {
            return Err(Error::Disconnected);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.record(Call::Stop);
        Ok(())
    }

    async fn arm(&self, arm: bool) -> Result<()> {
        self.record(Call::Arm(arm));
        Ok(())
    }

    async fn subscribe_log(
        &self,
        variables: &[&str],
        _period: Duration,
    ) -> Result<LogSubscription> {
        self.record(Call::SubscribeLog(
            variables.iter().map(|v| v.to_string()).collect(),
        ));

        let (tx, rx) = flume::unbounded();
        for sample in self.log_samples.lock().unwrap().iter() {
            tx.send(sample.clone()).unwrap();
        }
        if self.keep_logs_open.load(Relaxed) {
            self.open_logs.lock().unwrap().push(tx);
        }
        Ok(LogSubscription::new(rx))
    }
}

/// Kalman variance sample as logged while waiting for the estimator
pub fn variance_sample(timestamp: u32, x: f64, y: f64, z: f64) -> LogSample {
    LogSample {
        timestamp,
        values: [
            ("kalman.varPX".to_owned(), x),
            ("kalman.varPY".to_owned(), y),
            ("kalman.varPZ".to_owned(), z),
        ]
        .into_iter()
        .collect(),
    }
}

/// Mocap source fed from a channel, ends when the sender is dropped
pub struct ChannelSource {
    frames: flume::Receiver<MocapFrame>,
}

impl ChannelSource {
    pub fn new() -> (flume::Sender<MocapFrame>, Self) {
        let (tx, frames) = flume::unbounded();
        (tx, Self { frames })
    }
}

#[async_trait]
impl MocapSource for ChannelSource {
    async fn next_frame(&mut self) -> Result<MocapFrame> {
        Ok(self.frames.recv_async().await?)
    }
}

pub fn frame(frame_number: u32, bodies: &[(&str, Pose)]) -> MocapFrame {
    MocapFrame {
        frame_number,
        bodies: bodies
            .iter()
            .map(|(name, pose)| RigidBody {
                name: name.to_string(),
                pose: *pose,
            })
            .collect(),
    }
}

/// One object item of a Vicon datagram
pub struct Item<'a> {
    pub name: &'a [u8],
    pub translation: [f64; 3],
    pub rotation: [f64; 3],
    pub extra: usize,
}

impl<'a> Item<'a> {
    pub fn new(name: &'a str, translation: [f64; 3], rotation: [f64; 3]) -> Self {
        Self {
            name: name.as_bytes(),
            translation,
            rotation,
            extra: 0,
        }
    }
}

/// Encode a Vicon UDP object stream datagram
pub fn vicon_datagram(frame_number: u32, items: &[Item]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&frame_number.to_le_bytes());
    data.push(items.len() as u8);

    for (id, item) in items.iter().enumerate() {
        data.push(id as u8);
        data.extend_from_slice(&(72 + item.extra as u16).to_le_bytes());

        let mut name = [0u8; 24];
        name[..item.name.len()].copy_from_slice(item.name);
        data.extend_from_slice(&name);

        for v in item.translation.iter().chain(item.rotation.iter()) {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend(std::iter::repeat(0xAA).take(item.extra));
    }

    data
}
