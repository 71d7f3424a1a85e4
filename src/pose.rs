//! # Rigid body pose
//!
//! Conversions between the mocap representation of a rigid body (position and
//! Euler angles) and what the Crazyflie estimator consumes (position in meters
//! and a `[qx, qy, qz, qw]` quaternion).

use std::fmt;

use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector3};

const ROTATION_MAX_ITER: usize = 100;

/// Rotation matrix from Euler angles in radians
///
/// The rotation is `Rz(yaw) * Ry(pitch) * Rx(roll)`: roll around X is applied
/// first, then pitch around Y, then yaw around Z.
pub fn rotation_from_euler(roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
    *Rotation3::from_euler_angles(roll, pitch, yaw).matrix()
}

/// Position and orientation of a rigid body in the world frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Position in meters
    pub position: Vector3<f64>,
    /// Orientation
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    /// Create a pose from a position and an orientation
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Create a pose from a position in meters and Euler angles in radians
    pub fn from_euler(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            orientation: UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        }
    }

    /// Create a pose from a position in meters and a 3x3 rotation matrix
    ///
    /// The matrix does not need to be perfectly orthonormal, it is projected
    /// on the closest rotation first. A matrix with non-finite entries gives a
    /// NaN orientation, which [Pose::is_valid] rejects.
    pub fn from_rotation_matrix(x: f64, y: f64, z: f64, rotation: &Matrix3<f64>) -> Self {
        let position = Vector3::new(x, y, z);

        // The projection never converges on NaN input
        if !rotation.iter().all(|v| v.is_finite()) {
            return Self {
                position,
                orientation: UnitQuaternion::new_unchecked(Quaternion::new(
                    f64::NAN,
                    f64::NAN,
                    f64::NAN,
                    f64::NAN,
                )),
            };
        }

        let rotation = Rotation3::from_matrix_eps(
            rotation,
            f64::EPSILON,
            ROTATION_MAX_ITER,
            Rotation3::identity(),
        );
        Self {
            position,
            orientation: UnitQuaternion::from_rotation_matrix(&rotation),
        }
    }

    /// Returns `false` if any component is NaN or infinite
    ///
    /// Mocap systems report NaN for bodies that are not tracked in a frame.
    pub fn is_valid(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.orientation.coords.iter().all(|v| v.is_finite())
    }

    /// Position as sent to the Crazyflie
    pub fn position_f32(&self) -> [f32; 3] {
        [
            self.position.x as f32,
            self.position.y as f32,
            self.position.z as f32,
        ]
    }

    /// Orientation as a `[qx, qy, qz, qw]` quaternion as sent to the Crazyflie
    pub fn quaternion_xyzw(&self) -> [f32; 4] {
        let q = self.orientation;
        [q.i as f32, q.j as f32, q.k as f32, q.w as f32]
    }

    /// Orientation as (roll, pitch, yaw) in radians
    pub fn euler(&self) -> (f64, f64, f64) {
        self.orientation.euler_angles()
    }

    /// Human readable readout, position in cm and attitude in degrees
    pub fn report(&self) -> PoseReport {
        let (roll, pitch, yaw) = self.euler();
        PoseReport {
            x: self.position.x * 100.0,
            y: self.position.y * 100.0,
            z: self.position.z * 100.0,
            roll: roll.to_degrees(),
            pitch: pitch.to_degrees(),
            yaw: yaw.to_degrees(),
        }
    }
}

/// Position in centimeters and attitude in degrees, for display
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseReport {
    /// X position in cm
    pub x: f64,
    /// Y position in cm
    pub y: f64,
    /// Z position in cm
    pub z: f64,
    /// Roll in degrees
    pub roll: f64,
    /// Pitch in degrees
    pub pitch: f64,
    /// Yaw in degrees
    pub yaw: f64,
}

impl fmt::Display for PoseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "\tPosition [cm]: {:+.4}, {:+.4}, {:+.4}",
            self.x, self.y, self.z
        )?;
        write!(
            f,
            "\tAttitude [deg]: {:+.4}, {:+.4}, {:+.4}",
            self.roll, self.pitch, self.yaw
        )
    }
}
