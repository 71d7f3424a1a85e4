// Fly a figure-8 with the high-level commander, using the pose of the Crazyflie
// tracked by a Vicon system as position estimate.
//
// The Crazyflie URI is the first argument, or CFLIB_URI. The mocap settings are
// read from the MOCAP_* environment variables. Ctrl-C lands the Crazyflie.

use std::sync::Arc;

use crazyflie_mocap::config::{self, MocapConfig, DEFAULT_TRAJECTORY_ID, DEFAULT_URI};
use crazyflie_mocap::relay::PoseRelay;
use crazyflie_mocap::sequence::{self, SequenceConfig};
use crazyflie_mocap::source::ViconUdpSource;
use crazyflie_mocap::{crazyflie, estimator, trajectory, ExternalPoseSink};

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

    let source = ViconUdpSource::bind(mocap.listen_addr.as_str()).await?;
    let relay = PoseRelay::start(source, &mocap.body_name);
    relay
        .set_on_pose(Arc::new(ExternalPoseSink::new(cf.clone(), mocap.full_pose)))
        .await;

    let flight = async {
        estimator::activate_kalman_estimator(cf.as_ref()).await?;
        estimator::adjust_orientation_sensitivity(cf.as_ref(), mocap.quat_std_dev).await?;

        let figure8 = trajectory::figure8();
        let duration =
            trajectory::upload_trajectory(cf.as_ref(), DEFAULT_TRAJECTORY_ID, &figure8).await?;
        println!("The sequence is {:.1} seconds long", duration);

        println!("Waiting for the estimator to find the position...");
        estimator::reset_estimator(cf.as_ref(), None).await?;

        println!("Flying!");
        sequence::run_sequence(
            cf.as_ref(),
            DEFAULT_TRAJECTORY_ID,
            duration,
            &SequenceConfig::default(),
        )
        .await
    };

    tokio::select! {
        result = flight => match result {
            Ok(()) => println!("Done"),
            Err(e) => {
                eprintln!("Flight failed: {}", e);
                sequence::emergency_land(cf.as_ref()).await?;
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!("\nClosing program ...");
            sequence::emergency_land(cf.as_ref()).await?;
        }
    }

    relay.close().await;
    Ok(())
}
