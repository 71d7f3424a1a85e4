//! # Vicon UDP object stream
//!
//! Decoder for the legacy Vicon "UDP object stream". Each datagram carries one
//! frame: a 5 bytes header followed by `ItemsInBlock` items. An object item
//! carries the name of the rigid body and its translation and rotation:
//!
//! | Offset | Field        | Type                        |
//! |--------|--------------|-----------------------------|
//! | 0      | FrameNumber  | u32                         |
//! | 4      | ItemsInBlock | u8                          |
//! | +0     | ItemID       | u8                          |
//! | +1     | ItemDataSize | u16, bytes after the header |
//! | +3     | ItemName     | 24 bytes, NUL padded        |
//! | +27    | TransX/Y/Z   | 3 x f64, millimeters        |
//! | +51    | RotX/Y/Z     | 3 x f64, radians            |
//!
//! All values are little endian and packed. For the first item of a frame the
//! translation starts at byte 32 and the rotation ends at byte 79, the second
//! item starts at byte 80.

use std::collections::HashMap;
use std::convert::TryInto;

use crate::pose::{Pose, PoseReport};
use crate::{Error, Result};

/// Size of the frame header (FrameNumber + ItemsInBlock)
pub const FRAME_HEADER_SIZE: usize = 5;
/// Size of an item header (ItemID + ItemDataSize)
pub const ITEM_HEADER_SIZE: usize = 3;
/// Length of the item name field
pub const ITEM_NAME_SIZE: usize = 24;
/// Minimum `ItemDataSize` of an object item: name + 6 doubles
pub const OBJECT_DATA_SIZE: usize = ITEM_NAME_SIZE + 6 * 8;

/// One decoded Vicon frame
#[derive(Debug, Clone, PartialEq)]
pub struct ViconFrame {
    /// Frame counter of the Vicon system
    pub frame_number: u32,
    /// Items decoded from the frame, in datagram order
    pub items: Vec<ViconItem>,
}

/// One object item, in Vicon units
#[derive(Debug, Clone, PartialEq)]
pub struct ViconItem {
    /// Item ID as sent by the server
    pub item_id: u8,
    /// Number of bytes following the item header
    pub data_size: u16,
    /// Name of the rigid body, printable characters only
    pub name: String,
    /// Translation in millimeters
    pub translation: [f64; 3],
    /// Rotation as Euler angles around X, Y and Z, in radians
    pub rotation: [f64; 3],
}

impl ViconItem {
    /// Position in meters
    pub fn position_m(&self) -> [f64; 3] {
        [
            self.translation[0] * 1e-3,
            self.translation[1] * 1e-3,
            self.translation[2] * 1e-3,
        ]
    }

    /// Attitude as (roll, pitch, yaw) in radians
    pub fn euler(&self) -> (f64, f64, f64) {
        (self.rotation[0], self.rotation[1], self.rotation[2])
    }

    /// Pose of the item in meters and unit quaternion
    pub fn pose(&self) -> Pose {
        let [x, y, z] = self.position_m();
        let (roll, pitch, yaw) = self.euler();
        Pose::from_euler(x, y, z, roll, pitch, yaw)
    }

    /// Human readable readout, position in cm and attitude in degrees
    pub fn report(&self) -> PoseReport {
        PoseReport {
            x: self.translation[0] * 1e-1,
            y: self.translation[1] * 1e-1,
            z: self.translation[2] * 1e-1,
            roll: self.rotation[0].to_degrees(),
            pitch: self.rotation[1].to_degrees(),
            yaw: self.rotation[2].to_degrees(),
        }
    }
}

fn read_f64(data: &[u8], offset: usize) -> Result<f64> {
    Ok(f64::from_le_bytes(data[offset..offset + 8].try_into()?))
}

/// Decode an item name, keeping printable non-space ASCII characters
///
/// The name field is padded with NUL bytes and some servers leave garbage
/// after the terminator, only characters in `'!'..='~'` are kept.
pub fn decode_name(raw: &[u8]) -> String {
    raw.iter()
        .filter(|&&b| (b'!'..=b'~').contains(&b))
        .map(|&b| b as char)
        .collect()
}

/// Decode one Vicon UDP datagram
///
/// Every item announced in the header is decoded. The position of the next
/// item is computed from `ItemDataSize` so items carrying more data than an
/// object are skipped over correctly.
///
/// Returns [Error::MalformedPacket] if the datagram is truncated or if an item
/// is too small to be an object.
pub fn decode_frame(data: &[u8]) -> Result<ViconFrame> {
    if data.len() < FRAME_HEADER_SIZE {
        return Err(Error::MalformedPacket(format!(
            "datagram of {} bytes is shorter than the frame header",
            data.len()
        )));
    }

    let frame_number = u32::from_le_bytes(data[0..4].try_into()?);
    let items_in_block = data[4];

    let mut items = Vec::with_capacity(items_in_block as usize);
    let mut offset = FRAME_HEADER_SIZE;

    for index in 0..items_in_block {
        if data.len() < offset + ITEM_HEADER_SIZE {
            return Err(Error::MalformedPacket(format!(
                "item {} header truncated at byte {}",
                index, offset
            )));
        }

        let item_id = data[offset];
        let data_size = u16::from_le_bytes(data[offset + 1..offset + 3].try_into()?);

        if (data_size as usize) < OBJECT_DATA_SIZE {
            return Err(Error::MalformedPacket(format!(
                "item {} announces {} bytes, an object needs {}",
                index, data_size, OBJECT_DATA_SIZE
            )));
        }

        let payload = offset + ITEM_HEADER_SIZE;
        let next = payload + data_size as usize;
        if data.len() < next {
            return Err(Error::MalformedPacket(format!(
                "item {} truncated: need {} bytes, datagram has {}",
                index,
                next,
                data.len()
            )));
        }

        let name = decode_name(&data[payload..payload + ITEM_NAME_SIZE]);
        let values = payload + ITEM_NAME_SIZE;
        let translation = [
            read_f64(data, values)?,
            read_f64(data, values + 8)?,
            read_f64(data, values + 16)?,
        ];
        let rotation = [
            read_f64(data, values + 24)?,
            read_f64(data, values + 32)?,
            read_f64(data, values + 40)?,
        ];

        items.push(ViconItem {
            item_id,
            data_size,
            name,
            translation,
            rotation,
        });

        offset = next;
    }

    Ok(ViconFrame {
        frame_number,
        items,
    })
}

/// Latest state of every rigid body seen on the stream
///
/// Items are stored by name, a newer item overwrites the older one.
#[derive(Debug, Default, Clone)]
pub struct ObjectTable {
    objects: HashMap<String, ViconItem>,
    number_objects: usize,
}

impl ObjectTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Store all items of a frame
    pub fn update(&mut self, frame: &ViconFrame) {
        for item in &frame.items {
            self.objects.insert(item.name.clone(), item.clone());
            self.number_objects += 1;
        }
    }

    /// Latest item received for a rigid body
    pub fn get(&self, name: &str) -> Option<&ViconItem> {
        self.objects.get(name)
    }

    /// Names of all the rigid bodies seen since the last reset
    pub fn names(&self) -> Vec<String> {
        self.objects.keys().cloned().collect()
    }

    /// Number of items stored since the last reset
    pub fn number_objects(&self) -> usize {
        self.number_objects
    }

    /// Forget all stored items
    pub fn reset(&mut self) {
        self.objects.clear();
        self.number_objects = 0;
    }
}
