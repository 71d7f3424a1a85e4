// Receive the Vicon stream without the relay, send every pose to the
// Crazyflie as a rotation matrix based external pose (or position only when
// MOCAP_FULL_POSE is off), then hover to a point and land.
//
// The Crazyflie URI is the first argument, or CFLIB_URI. Ctrl-C lands the
// Crazyflie.

use std::sync::Arc;
use std::time::Duration;

use crazyflie_mocap::config::{self, MocapConfig, DEFAULT_URI};
use crazyflie_mocap::pose::{rotation_from_euler, Pose};
use crazyflie_mocap::sequence::{self, GoToPoint};
use crazyflie_mocap::source::ViconUdpSource;
use crazyflie_mocap::{crazyflie, estimator, ExternalPoseSink, FlightLink, PoseSink};
use tokio::time::sleep;

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

    // Start from a stopped high-level commander
    sleep(Duration::from_secs(2)).await;
    cf.stop().await?;

    let mut source = ViconUdpSource::bind(mocap.listen_addr.as_str()).await?;
    let sink = ExternalPoseSink::new(cf.clone(), mocap.full_pose);
    let body_name = mocap.body_name.clone();
    let forward = tokio::spawn(async move {
        loop {
            let frame = match source.receive_frame().await {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("Stopped receiving mocap data: {}", e);
                    return;
                }
            };
            let Some(item) = frame.items.iter().find(|item| item.name == body_name) else {
                continue;
            };

            let [x, y, z] = item.position_m();
            let (roll, pitch, yaw) = item.euler();
            let pose = Pose::from_rotation_matrix(x, y, z, &rotation_from_euler(roll, pitch, yaw));

            // Untracked bodies are reported as NaN
            if !pose.is_valid() {
                continue;
            }

            if let Err(e) = sink.on_pose(&pose).await {
                log::warn!("Could not send external pose: {}", e);
            }
        }
    });

    let flight = async {
        estimator::activate_kalman_estimator(cf.as_ref()).await?;
        estimator::adjust_orientation_sensitivity(cf.as_ref(), mocap.quat_std_dev).await?;
        estimator::reset_estimator(cf.as_ref(), Some(Duration::from_secs(30))).await?;
        println!("Estimator reset");

        let point = GoToPoint::default();
        cf.take_off(0.5, 2.0).await?;
        sleep(Duration::from_secs(3)).await;
        cf.go_to(point.x, point.y, point.z, point.yaw, point.duration).await?;
        sleep(Duration::from_secs_f32(point.settle)).await;
        cf.land(0.0, 2.0).await?;
        sleep(Duration::from_secs(2)).await;
        cf.stop().await?;
        Ok::<(), crazyflie_mocap::Error>(())
    };

    tokio::select! {
        result = flight => {
            if let Err(e) = result {
                eprintln!("Flight failed: {}", e);
                sequence::emergency_land(cf.as_ref()).await?;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nClosing program ...");
            sequence::emergency_land(cf.as_ref()).await?;
        }
    }

    forward.abort();
    Ok(())
}
