//! # Estimator set-up
//!
//! Helpers configuring the Kalman estimator for mocap input and waiting for
//! the position estimate to settle after a reset.

use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, info};

use crate::link::FlightLink;
use crate::{Error, Result};

/// Standard deviation of the orientation set when activating the Kalman estimator
pub const KALMAN_QUAT_STD_DEV: f64 = 0.06;

/// Log period of the Kalman variances while waiting for convergence
pub const VARIANCE_LOG_PERIOD: Duration = Duration::from_millis(500);

/// Number of samples the variance spread is computed over
pub const VARIANCE_WINDOW_SIZE: usize = 10;

/// Maximum spread of each variance for the estimate to be considered stable
pub const VARIANCE_THRESHOLD: f64 = 0.001;

const VARIANCE_INITIAL_VALUE: f64 = 1000.0;

/// Select the Kalman estimator
pub async fn activate_kalman_estimator<L: FlightLink + ?Sized>(link: &L) -> Result<()> {
    link.set_param("stabilizer.estimator", 2.0).await?;
    link.set_param("locSrv.extQuatStdDev", KALMAN_QUAT_STD_DEV).await?;
    info!("Kalman estimator activated");
    Ok(())
}

/// Set how much the Kalman filter trusts the external orientation
pub async fn adjust_orientation_sensitivity<L: FlightLink + ?Sized>(
    link: &L,
    std_dev: f64,
) -> Result<()> {
    if !std_dev.is_finite() || std_dev <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "orientation standard deviation must be positive, got {}",
            std_dev
        )));
    }
    link.set_param("locSrv.extQuatStdDev", std_dev).await
}

/// Select the Mellinger controller
pub async fn activate_mellinger_controller<L: FlightLink + ?Sized>(link: &L) -> Result<()> {
    link.set_param("stabilizer.controller", 2.0).await?;
    info!("Mellinger controller activated");
    Ok(())
}

/// Reset the Kalman estimator and wait for the position estimate to settle
pub async fn reset_estimator<L: FlightLink + ?Sized>(
    link: &L,
    timeout: Option<Duration>,
) -> Result<()> {
    link.set_param("kalman.resetEstimation", 1.0).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    link.set_param("kalman.resetEstimation", 0.0).await?;

    wait_for_position_estimator(link, timeout).await
}

/// Wait until the Kalman position variances are stable
///
/// The variances of X, Y and Z are logged every 500 ms. The estimate is
/// considered found when, over the last 10 samples, the spread of each
/// variance is below 0.001. With a `timeout`, [Error::Timeout] is returned if
/// the estimate does not settle in time.
pub async fn wait_for_position_estimator<L: FlightLink + ?Sized>(
    link: &L,
    timeout: Option<Duration>,
) -> Result<()> {
    info!("Waiting for estimator to find position...");

    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, wait_for_convergence(link)).await??,
        None => wait_for_convergence(link).await?,
    }

    info!("Position estimate found");
    Ok(())
}

async fn wait_for_convergence<L: FlightLink + ?Sized>(link: &L) -> Result<()> {
    let subscription = link
        .subscribe_log(
            &["kalman.varPX", "kalman.varPY", "kalman.varPZ"],
            VARIANCE_LOG_PERIOD,
        )
        .await?;

    let mut window = VarianceWindow::new();
    loop {
        let sample = subscription.next().await?;
        window.push(
            sample.get("kalman.varPX")?,
            sample.get("kalman.varPY")?,
            sample.get("kalman.varPZ")?,
        );
        debug!("Variance spread: {:?}", window.spread());

        if window.is_converged() {
            return Ok(());
        }
    }
}

/// Sliding window over the last Kalman position variances
#[derive(Debug, Clone)]
pub struct VarianceWindow {
    x: VecDeque<f64>,
    y: VecDeque<f64>,
    z: VecDeque<f64>,
    samples: usize,
}

impl Default for VarianceWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl VarianceWindow {
    /// Window filled with a large variance so it cannot converge before it
    /// has been filled with real samples
    pub fn new() -> Self {
        let filled = || VecDeque::from(vec![VARIANCE_INITIAL_VALUE; VARIANCE_WINDOW_SIZE]);
        Self {
            x: filled(),
            y: filled(),
            z: filled(),
            samples: 0,
        }
    }

    /// Add one sample, dropping the oldest one
    pub fn push(&mut self, var_x: f64, var_y: f64, var_z: f64) {
        for (axis, value) in [(&mut self.x, var_x), (&mut self.y, var_y), (&mut self.z, var_z)] {
            axis.pop_front();
            axis.push_back(value);
        }
        self.samples = self.samples.saturating_add(1);
    }

    /// Number of samples pushed so far
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// `max - min` of each axis
    pub fn spread(&self) -> [f64; 3] {
        [spread(&self.x), spread(&self.y), spread(&self.z)]
    }

    /// `true` when the spread of all three axes is below [VARIANCE_THRESHOLD]
    ///
    /// An empty window is never converged.
    pub fn is_converged(&self) -> bool {
        self.samples > 0 && self.spread().iter().all(|&s| s < VARIANCE_THRESHOLD)
    }
}

fn spread(values: &VecDeque<f64>) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    max - min
}
