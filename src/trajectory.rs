//! # Polynomial trajectories
//!
//! Trajectories for the high-level commander are made of pieces of 7th
//! degree polynomials. In text form each piece is one row of 33 values:
//!
//! ```text
//! duration, x^0..x^7, y^0..y^7, z^0..z^7, yaw^0..yaw^7
//! ```
//!
//! Tools like [uav_trajectories](https://github.com/whoenig/uav_trajectories)
//! generate such tables. [parse_trajectory()] reads them and
//! [upload_trajectory()] sends them to the Crazyflie trajectory memory.

use log::info;

use crate::link::FlightLink;
use crate::{Error, Result};

/// Number of values in one trajectory row
pub const ROW_LENGTH: usize = 33;

/// Size of one uncompressed piece in trajectory memory
pub const PIECE_SIZE: usize = 132;

/// Size of the Crazyflie trajectory memory
pub const TRAJECTORY_MEMORY_SIZE: usize = 4096;

/// Maximum number of pieces of a trajectory definition
pub const MAX_PIECES: usize = u8::MAX as usize;

/// One polynomial piece of a trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySegment {
    /// Duration of the piece in seconds
    pub duration: f32,
    /// X polynomial coefficients, constant term first
    pub x: [f32; 8],
    /// Y polynomial coefficients
    pub y: [f32; 8],
    /// Z polynomial coefficients
    pub z: [f32; 8],
    /// Yaw polynomial coefficients
    pub yaw: [f32; 8],
}

impl TrajectorySegment {
    /// Build a segment from a row of 33 values
    pub fn from_row(row: &[f32]) -> Result<Self> {
        if row.len() != ROW_LENGTH {
            return Err(Error::TrajectoryError(format!(
                "a trajectory row has {} values, got {}",
                ROW_LENGTH,
                row.len()
            )));
        }

        let mut values = [0.0; ROW_LENGTH];
        values.copy_from_slice(row);
        Ok(Self::from(&values))
    }

    /// Position and yaw at `t` seconds from the start of the piece
    pub fn evaluate(&self, t: f32) -> [f32; 4] {
        let eval = |poly: &[f32; 8]| poly.iter().rev().fold(0.0, |acc, &c| acc * t + c);
        [eval(&self.x), eval(&self.y), eval(&self.z), eval(&self.yaw)]
    }
}

impl From<&[f32; ROW_LENGTH]> for TrajectorySegment {
    fn from(row: &[f32; ROW_LENGTH]) -> Self {
        let coefficients = |start: usize| {
            let mut poly = [0.0; 8];
            poly.copy_from_slice(&row[start..start + 8]);
            poly
        };

        Self {
            duration: row[0],
            x: coefficients(1),
            y: coefficients(9),
            z: coefficients(17),
            yaw: coefficients(25),
        }
    }
}

/// Parse a trajectory table
///
/// Rows are separated by new lines, values by white space or commas.
/// Scientific notation (`-5.4623E-14`) is accepted. Empty lines and lines
/// starting with `#` are skipped.
pub fn parse_trajectory(text: &str) -> Result<Vec<TrajectorySegment>> {
    let mut segments = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let row = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|value| !value.is_empty())
            .map(|value| {
                value.parse::<f32>().map_err(|e| {
                    Error::TrajectoryError(format!("line {}: '{}': {}", number + 1, value, e))
                })
            })
            .collect::<Result<Vec<f32>>>()?;

        if row.len() != ROW_LENGTH {
            return Err(Error::TrajectoryError(format!(
                "line {}: expected {} values, got {}",
                number + 1,
                ROW_LENGTH,
                row.len()
            )));
        }
        segments.push(TrajectorySegment::from_row(&row)?);
    }

    Ok(segments)
}

/// Sum of the durations of all the pieces, in seconds
pub fn total_duration(segments: &[TrajectorySegment]) -> f32 {
    segments.iter().map(|segment| segment.duration).sum()
}

/// Figure-8 of about 1 m by 0.5 m, 10 pieces
#[rustfmt::skip]
pub const FIGURE8: [[f32; ROW_LENGTH]; 10] = [
    [1.050000, 0.000000, 0.000000, 0.000000, 0.000000, 0.830443, -0.276140, -0.384219, 0.180493, 0.000000, 0.000000, 0.000000, 0.000000, -1.356107, 0.688430, 0.587426, -0.329106, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000],
    [0.710000, 0.396058, 0.918033, 0.128965, -0.773546, 0.339704, 0.034310, -0.026417, -0.030049, -0.445604, -0.684403, 0.888433, 1.493630, -1.361618, -0.139316, 0.158875, 0.095799, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000],
    [0.620000, 0.922409, 0.405715, -0.582968, -0.092188, -0.114670, 0.101046, 0.075834, -0.037926, -0.291165, 0.967514, 0.421451, -1.086348, 0.545211, 0.030109, -0.050046, -0.068177, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000],
    [0.700000, 0.923174, -0.431533, -0.682975, 0.177173, 0.319468, -0.043852, -0.111269, 0.023166, 0.289869, 0.724722, -0.512011, -0.209623, -0.218710, 0.108797, 0.128756, -0.055461, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000],
    [0.560000, 0.405364, -0.834716, 0.158939, 0.288175, -0.373738, -0.054995, 0.036090, 0.078627, 0.450742, -0.385534, -0.954089, 0.128288, 0.442620, 0.055630, -0.060142, -0.076163, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000],
    [0.560000, 0.001062, -0.646270, -0.012560, -0.324065, 0.125327, 0.119738, 0.034567, -0.063130, 0.001593, -1.031457, 0.015159, 0.820816, -0.152665, -0.130729, -0.045679, 0.080444, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000],
    [0.700000, -0.402804, -0.820508, -0.132914, 0.236278, 0.235164, -0.053551, -0.088687, 0.031253, -0.449354, -0.411507, 0.902946, 0.185335, -0.239125, -0.041696, 0.016857, 0.016709, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000],
    [0.620000, -0.921641, -0.464596, 0.661875, 0.286582, -0.228921, -0.051987, 0.004669, 0.038463, -0.292459, 0.777682, 0.565788, -0.432472, -0.060568, -0.082048, -0.009439, 0.041158, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000],
    [0.710000, -0.923935, 0.447832, 0.627381, -0.259808, -0.042325, -0.032258, 0.001420, 0.005294, 0.288570, 0.873350, -0.515586, -0.730207, -0.026023, 0.288755, 0.215678, -0.148061, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000],
    [1.053185, -0.398611, 0.850510, -0.144007, -0.485368, -0.079781, 0.176330, 0.234482, -0.153567, 0.447039, -0.532729, -0.855023, 0.878509, 0.775168, -0.391051, -0.713519, 0.391628, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000, 0.000000],
];

/// The [FIGURE8] table as segments
pub fn figure8() -> Vec<TrajectorySegment> {
    FIGURE8.iter().map(TrajectorySegment::from).collect()
}

/// Slalom between poles 1.29 m apart along X, 13 pieces
pub fn slalom() -> Result<Vec<TrajectorySegment>> {
    parse_trajectory(include_str!("trajectories/slalom.txt"))
}

/// Wave along X and back, 36 pieces
///
/// The wave does not fit in the trajectory memory as a whole, upload a
/// subset of its pieces.
pub fn wave() -> Result<Vec<TrajectorySegment>> {
    parse_trajectory(include_str!("trajectories/wave.txt"))
}

/// Check that a trajectory can be uploaded and defined
pub fn validate_trajectory(segments: &[TrajectorySegment]) -> Result<()> {
    if segments.is_empty() {
        return Err(Error::TrajectoryError("trajectory is empty".to_owned()));
    }

    if segments.len() > MAX_PIECES {
        return Err(Error::TrajectoryError(format!(
            "{} pieces, at most {} can be defined",
            segments.len(),
            MAX_PIECES
        )));
    }

    let size = segments.len() * PIECE_SIZE;
    if size > TRAJECTORY_MEMORY_SIZE {
        return Err(Error::TrajectoryError(format!(
            "{} pieces need {} bytes, the trajectory memory holds {}",
            segments.len(),
            size,
            TRAJECTORY_MEMORY_SIZE
        )));
    }

    for (index, segment) in segments.iter().enumerate() {
        if !segment.duration.is_finite() || segment.duration <= 0.0 {
            return Err(Error::TrajectoryError(format!(
                "piece {} has invalid duration {}",
                index, segment.duration
            )));
        }

        let finite = [segment.x, segment.y, segment.z, segment.yaw]
            .iter()
            .flatten()
            .all(|c| c.is_finite());
        if !finite {
            return Err(Error::TrajectoryError(format!(
                "piece {} has non finite coefficients",
                index
            )));
        }
    }

    Ok(())
}

/// Upload a trajectory and define it as `trajectory_id`
///
/// The pieces are written at the start of the trajectory memory, replacing
/// any trajectory previously written there. Returns the total duration of
/// the trajectory in seconds.
pub async fn upload_trajectory<L: FlightLink + ?Sized>(
    link: &L,
    trajectory_id: u8,
    segments: &[TrajectorySegment],
) -> Result<f32> {
    validate_trajectory(segments)?;

    let written = link.write_trajectory(segments).await?;
    let expected = segments.len() * PIECE_SIZE;
    if written != expected {
        return Err(Error::MemoryError(format!(
            "wrote {} bytes of trajectory, expected {}",
            written, expected
        )));
    }

    link.define_trajectory(trajectory_id, 0, segments.len() as u8)
        .await?;

    let duration = total_duration(segments);
    info!(
        "Trajectory {} uploaded: {} pieces, {:.2} s",
        trajectory_id,
        segments.len(),
        duration
    );
    Ok(duration)
}
