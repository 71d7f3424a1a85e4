// Print the rigid bodies received on the Vicon UDP object stream
//
// The listen address is taken from MOCAP_ADDR, 0.0.0.0:51001 by default.
// Run with RUST_LOG=debug to also see the datagrams that are dropped.

use crazyflie_mocap::config::MocapConfig;
use crazyflie_mocap::source::ViconUdpSource;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = MocapConfig::from_env();
    let mut source = ViconUdpSource::bind(config.listen_addr.as_str()).await?;
    println!("Listening on {}, Ctrl-C to quit", source.local_addr()?);

    loop {
        tokio::select! {
            frame = source.receive_frame() => {
                let frame = frame?;
                for item in &frame.items {
                    println!("Frame {}, {}:\n{}", frame.frame_number, item.name, item.report());
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!(
        "Received {} objects: {:?}",
        source.objects().number_objects(),
        source.objects().names()
    );
    Ok(())
}
