// Feed mocap poses to the Crazyflie and print the state estimate for 10 seconds
//
// The Crazyflie URI is the first argument, or CFLIB_URI.

use std::sync::Arc;
use std::time::Duration;

use crazyflie_mocap::config::{self, MocapConfig, DEFAULT_URI};
use crazyflie_mocap::relay::PoseRelay;
use crazyflie_mocap::source::ViconUdpSource;
use crazyflie_mocap::{crazyflie, estimator, ExternalPoseSink, FlightLink};
use tokio::time::Instant;

const LOG_VARIABLES: [&str; 6] = [
    "stateEstimate.vx",
    "stateEstimate.vy",
    "stateEstimate.vz",
    "stateEstimate.qx",
    "stateEstimate.qy",
    "stateEstimate.qz",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let uri = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::uri_from_env(DEFAULT_URI));
    let mocap = MocapConfig::from_env();

    let link_context = crazyflie_link::LinkContext::new();
    let cf = Arc::new(crazyflie::connect(&link_context, &uri).await?);
    println!("Connected to {}", uri);

    let relay = PoseRelay::start(
        ViconUdpSource::bind(mocap.listen_addr.as_str()).await?,
        &mocap.body_name,
    );
    relay
        .set_on_pose(Arc::new(ExternalPoseSink::new(cf.clone(), mocap.full_pose)))
        .await;

    estimator::activate_kalman_estimator(cf.as_ref()).await?;
    estimator::adjust_orientation_sensitivity(cf.as_ref(), mocap.quat_std_dev).await?;
    estimator::reset_estimator(cf.as_ref(), Some(Duration::from_secs(30))).await?;

    let samples = cf
        .subscribe_log(&LOG_VARIABLES, Duration::from_millis(100))
        .await?;

    let end = Instant::now() + Duration::from_secs(10);
    while let Some(sample) = samples.next_until(end).await? {
        print!("[{}]: ", sample.timestamp);
        for name in LOG_VARIABLES {
            print!("{}: {:3.3} ", name, sample.get(name)?);
        }
        println!();
    }

    if let Some(pose) = relay.latest_pose().await {
        println!("Last mocap pose:\n{}", pose.report());
    }
    println!("{} poses sent", relay.poses_forwarded());

    relay.close().await;
    Ok(())
}
