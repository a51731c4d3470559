use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};
use incomfort::{Gateway, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let hostname = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "192.168.0.1".to_string());

    info!("InComfort Status Monitor");
    info!("Connecting to gateway {}...", hostname);

    let mut gateway = Gateway::new(hostname)?;

    match gateway.heaters(false).await {
        Ok(heaters) => info!("Found {} heater(s)", heaters.len()),
        Err(e) => {
            error!("Failed to list heaters: {}", e);
            return Err(e);
        }
    }

    info!("Press Ctrl+C to stop monitoring");

    let mut monitor_interval = interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            _ = monitor_interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping monitor");
                return Ok(());
            }
        }

        if let Err(e) = gateway.update_heaters().await {
            // Polling resumes on the next tick
            warn!("Update failed: {}", e);
            continue;
        }

        for heater in gateway.heaters(false).await? {
            let status = heater.status()?;
            println!(
                "{} [{}] heater {:>6} tap {:>6} pressure {:>5} burning={} pumping={}",
                heater.serial_no(),
                status.display_text,
                fmt_reading(status.heater_temp, "°C"),
                fmt_reading(status.tap_temp, "°C"),
                fmt_reading(status.pressure, "bar"),
                status.is_burning,
                status.is_pumping,
            );

            for room in heater.rooms()? {
                let room_status = room.status();
                println!(
                    "    room {}: {} (setpoint {}, override {})",
                    room.room_no(),
                    fmt_reading(room_status.room_temp, "°C"),
                    fmt_reading(room_status.setpoint, "°C"),
                    fmt_reading(room_status.override_temp, "°C"),
                );
            }
        }
    }
}

fn fmt_reading(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}{unit}"))
}
