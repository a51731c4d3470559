use clap::Parser;
use incomfort::{Gateway, GatewayConfig, IncomfortError};
use serde_json::{json, Value};
use tracing::{error, info};

/// Query an Intergas Lan2RF gateway for heater and room status
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Hostname/address of the Lan2RF gateway
    gateway: String,

    /// Username, only needed by newer gateway firmware
    #[arg(short, long, requires = "password")]
    username: Option<String>,

    /// Password, only needed by newer gateway firmware
    #[arg(short, long, requires = "username")]
    password: Option<String>,

    /// Set the override of the first room (°C)
    #[arg(short, long)]
    temp: Option<f64>,

    /// Print the raw status payload
    #[arg(short, long, conflicts_with = "temp")]
    raw: bool,

    /// Position of the heater in the gateway's heater list
    #[arg(long, default_value_t = 0)]
    heater: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = GatewayConfig::with_login(args.username, args.password)?;
    let mut gateway = Gateway::with_config(&args.gateway, &config)?;

    let heaters = match gateway.heaters(false).await {
        Ok(heaters) => heaters,
        Err(e) => {
            error!("Setup failed, check your configuration: {}", e);
            return Err(e.into());
        }
    };

    let count = heaters.len();
    let Some(heater) = heaters.get_mut(args.heater) else {
        return Err(IncomfortError::InvalidParameters(format!(
            "There is no heater {} (the gateway has {count})",
            args.heater
        ))
        .into());
    };

    heater.update().await?;

    if let Some(temp) = args.temp {
        let rooms = heater.rooms()?;
        let Some(room) = rooms.first() else {
            error!("There is no valid room thermostat");
            return Err(IncomfortError::InvalidParameters("no room thermostat".to_string()).into());
        };
        room.set_override(temp).await?;
        info!("Room {} override set to {:.1}", room.room_no(), temp);
    } else if args.raw {
        println!("{}", serde_json::to_string_pretty(&heater.raw_payload())?);
    } else {
        let mut status = serde_json::to_value(heater.status()?)?;
        if let Value::Object(map) = &mut status {
            for room in heater.rooms()? {
                map.insert(
                    format!("room_{}", room.room_no()),
                    json!(room.status()),
                );
            }
        }
        println!("{}", serde_json::to_string_pretty(&status)?);
    }

    Ok(())
}
