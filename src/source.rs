//! # Mocap sources
//!
//! A [MocapSource] produces frames of rigid body poses. The only system
//! implemented in this crate is the legacy Vicon UDP object stream, see
//! [ViconUdpSource].

use async_trait::async_trait;
use log::{debug, warn};
use tokio::net::{ToSocketAddrs, UdpSocket};

use crate::pose::Pose;
use crate::vicon::{self, ObjectTable, ViconFrame};
use crate::{Error, Result};

/// Size of the receive buffer, larger than any Vicon datagram
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Default port of the Vicon UDP object stream
pub const DEFAULT_VICON_PORT: u16 = 51001;

/// A rigid body in one mocap frame
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    /// Name of the body as configured in the mocap system
    pub name: String,
    /// Pose of the body, position in meters
    pub pose: Pose,
}

/// One frame from a mocap system
#[derive(Debug, Clone, PartialEq)]
pub struct MocapFrame {
    /// Frame counter of the mocap system
    pub frame_number: u32,
    /// Bodies present in the frame
    pub bodies: Vec<RigidBody>,
}

impl MocapFrame {
    /// Find a body by name
    pub fn body(&self, name: &str) -> Option<&RigidBody> {
        self.bodies.iter().find(|body| body.name == name)
    }
}

impl From<&ViconFrame> for MocapFrame {
    fn from(frame: &ViconFrame) -> Self {
        MocapFrame {
            frame_number: frame.frame_number,
            bodies: frame
                .items
                .iter()
                .map(|item| RigidBody {
                    name: item.name.clone(),
                    pose: item.pose(),
                })
                .collect(),
        }
    }
}

/// Source of mocap frames
#[async_trait]
pub trait MocapSource: Send {
    /// Wait for the next frame
    ///
    /// An error ends the stream: the caller is not expected to call this
    /// function again.
    async fn next_frame(&mut self) -> Result<MocapFrame>;
}

/// Receiver for the Vicon UDP object stream
///
/// Datagrams that cannot be decoded are dropped with a warning, the next
/// datagram is a new frame so reception simply continues.
#[derive(Debug)]
pub struct ViconUdpSource {
    socket: UdpSocket,
    buffer: Vec<u8>,
    objects: ObjectTable,
}

impl ViconUdpSource {
    /// Bind a UDP socket and listen to the Vicon stream
    ///
    /// The Vicon server is usually configured to send to port
    /// [DEFAULT_VICON_PORT], bind to `0.0.0.0:51001` to receive from any
    /// interface.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        debug!("Listening for Vicon data on {}", socket.local_addr()?);
        Ok(Self::from_socket(socket))
    }

    /// Use an already bound socket
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self {
            socket,
            buffer: vec![0; MAX_DATAGRAM_SIZE],
            objects: ObjectTable::new(),
        }
    }

    /// Local address of the socket
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Latest state of all the rigid bodies received so far
    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    /// Mutable access to the object table, to reset it
    pub fn objects_mut(&mut self) -> &mut ObjectTable {
        &mut self.objects
    }

    /// Wait for the next datagram that decodes as a Vicon frame
    pub async fn receive_frame(&mut self) -> Result<ViconFrame> {
        loop {
            let (len, addr) = self.socket.recv_from(&mut self.buffer).await?;

            match vicon::decode_frame(&self.buffer[..len]) {
                Ok(frame) => {
                    for item in &frame.items {
                        debug!(
                            "Frame {} from {}, {}:\n{}",
                            frame.frame_number,
                            addr,
                            item.name,
                            item.report()
                        );
                    }
                    self.objects.update(&frame);
                    return Ok(frame);
                }
                Err(Error::MalformedPacket(reason)) => {
                    warn!("Dropping datagram of {} bytes from {}: {}", len, addr, reason);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl MocapSource for ViconUdpSource {
    async fn next_frame(&mut self) -> Result<MocapFrame> {
        let frame = self.receive_frame().await?;
        Ok(MocapFrame::from(&frame))
    }
}
