//! # Configuration
//!
//! Defaults used by the demos and helpers to override them from the
//! environment.

use std::env;

use log::warn;

/// Default Crazyflie URI
pub const DEFAULT_URI: &str = "radio://0/80/2M/E7E7E7E7E7";
/// Default address the mocap stream is received on
pub const DEFAULT_MOCAP_ADDR: &str = "0.0.0.0:51001";
/// Default name of the rigid body representing the Crazyflie
pub const DEFAULT_BODY_NAME: &str = "cf";
/// Default standard deviation of the orientation sent to the Kalman filter
pub const DEFAULT_QUAT_STD_DEV: f64 = 8.0e-3;
/// Default trajectory ID
pub const DEFAULT_TRAJECTORY_ID: u8 = 1;

/// Crazyflie URI, from the `CFLIB_URI` environment variable or `default`
pub fn uri_from_env(default: &str) -> String {
    uri_from_lookup(default, |key| env::var(key).ok())
}

/// Same as [uri_from_env()] with a custom variable lookup
///
/// An empty `CFLIB_URI` falls back to `default`.
pub fn uri_from_lookup(default: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    match lookup("CFLIB_URI") {
        Some(uri) if !uri.trim().is_empty() => uri.trim().to_owned(),
        _ => default.to_owned(),
    }
}

/// Settings of the mocap side of the demos
#[derive(Debug, Clone, PartialEq)]
pub struct MocapConfig {
    /// Address the UDP socket is bound to
    pub listen_addr: String,
    /// Name of the rigid body to relay
    pub body_name: String,
    /// Send the orientation along with the position
    pub full_pose: bool,
    /// Standard deviation of the orientation, in radians
    pub quat_std_dev: f64,
}

impl Default for MocapConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_MOCAP_ADDR.to_owned(),
            body_name: DEFAULT_BODY_NAME.to_owned(),
            full_pose: true,
            quat_std_dev: DEFAULT_QUAT_STD_DEV,
        }
    }
}

impl MocapConfig {
    /// Defaults overridden by `MOCAP_ADDR`, `MOCAP_BODY`, `MOCAP_FULL_POSE`
    /// and `MOCAP_QUAT_STD_DEV`
    ///
    /// Values that cannot be parsed are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [MocapConfig::from_env()] with a custom variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("MOCAP_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(body) = lookup("MOCAP_BODY") {
            config.body_name = body;
        }
        if let Some(full_pose) = lookup("MOCAP_FULL_POSE") {
            match full_pose.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => config.full_pose = true,
                "0" | "false" | "no" | "off" => config.full_pose = false,
                other => warn!("Ignoring MOCAP_FULL_POSE={}", other),
            }
        }
        if let Some(std_dev) = lookup("MOCAP_QUAT_STD_DEV") {
            match std_dev.trim().parse::<f64>() {
                Ok(v) if v.is_finite() && v > 0.0 => config.quat_std_dev = v,
                _ => warn!("Ignoring MOCAP_QUAT_STD_DEV={}", std_dev),
            }
        }

        config
    }
}
