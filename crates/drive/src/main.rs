//! OBD Buddy - Main Entry Point
//!
//! Usage: `obd-buddy [config-file]`. Without `adapter.device` the simulated
//! adapter is driven through a repeating stop-and-go profile.

use braking::Period;
use drive::{init_logging, Drive, DriveConfig, DriveError};
use obd_protocol::{serial, sim::SimulatedElm327, Transport};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1);
    let config = DriveConfig::load(path.as_deref())?;
    init_logging(&config.logging)?;

    info!("=== OBD Buddy v{} ===", env!("CARGO_PKG_VERSION"));

    match config.adapter.device.clone() {
        Some(device) => {
            let (transport, chunks) = serial::open(&device, config.adapter.baud_rate)?;
            run_drive(transport, chunks, &config).await?;
        }
        None => {
            warn!("No adapter device configured, using the simulated adapter");
            let (sim, chunks) = SimulatedElm327::new(demo_profile());
            let sim = sim.with_reply_delay(Duration::from_millis(config.adapter.sim_reply_delay_ms));
            run_drive(sim, chunks, &config).await?;
        }
    }

    Ok(())
}

async fn run_drive<T: Transport>(
    transport: T,
    chunks: mpsc::Receiver<Vec<u8>>,
    config: &DriveConfig,
) -> Result<(), DriveError> {
    let mut drive = Drive::from_config(transport, config)?;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let result = drive.run(chunks, shutdown).await;

    let summary = drive.summary(Period::Week);
    match serde_json::to_string(drive.detector().events()) {
        Ok(events) => info!(
            "Braking events this drive: {} ({:.4} L, {:.2} lost this week)",
            events, summary.liters, summary.cost
        ),
        Err(e) => warn!("Failed to serialize braking events: {}", e),
    }

    result
}

/// Accelerate to 70 km/h, cruise, brake hard, repeat
fn demo_profile() -> Vec<u8> {
    let cycle: Vec<u8> = (0..=70)
        .step_by(10)
        .chain(std::iter::repeat(70).take(6))
        .chain([55, 35, 20, 10, 5, 0, 0, 0])
        .collect();
    cycle.iter().copied().cycle().take(cycle.len() * 50).collect()
}
