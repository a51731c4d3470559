#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

//! # InComfort client
//!
//! A Rust client library for Intergas InComfort heaters (boilers), reached
//! through the Lan2RF gateway's local HTTP/JSON API.
//!
//! Each gateway can have up to 8 heaters, and each heater up to 2 room
//! thermostats. Everything is pulled: the library never receives pushed updates.
//!
//! - [`Gateway`] discovers the heaters bound to a gateway and owns the shared transport
//! - [`Heater`] polls one boiler and decodes its status payload
//! - [`Room`] exposes a thermostat's readings and can override its setpoint
//!
//! ## Status payload
//!
//! The gateway reports physical quantities as `<field>_msb` / `<field>_lsb`
//! byte pairs holding a fixed-point value with two implied decimals; the value
//! `0x7FFF` marks an absent sensor (see [`protocol::decode`]). Heater state
//! flags come from the `IO` bitmask and the operating state or fault from
//! `displ_code` (see [`DisplayCode`] and [`FaultCode`]).
//!
//! ## Quick Start
//!
//! ```no_run
//! use incomfort::Gateway;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut gateway = Gateway::new("192.168.0.1")?;
//!
//!     let heater = &mut gateway.heaters(false).await?[0];
//!     heater.update().await?;
//!     println!("Heater temperature: {:?}", heater.heater_temp()?);
//!
//!     if let Some(room) = heater.rooms()?.first() {
//!         room.set_override(19.5).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

/// Gateway entry point
pub mod gateway;
/// Heater entity
pub mod heater;
/// Error types and handling
pub mod error;
/// Payload decoding and request encoding
pub mod protocol;
/// Room thermostat entity
pub mod room;
/// Transport between the library and the gateway
pub mod transport;
/// Code tables, status records and configuration
pub mod types;

// Re-export the main types for convenient usage
pub use error::{IncomfortError, Result};
pub use gateway::Gateway;
pub use heater::Heater;
pub use protocol::{RawPayload, Request, RoomNo};
pub use room::Room;
pub use transport::{HttpTransport, Transport};
pub use types::{Credentials, DisplayCode, FaultCode, GatewayConfig, HeaterStatus, RoomStatus};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of heaters a gateway reports
pub const MAX_HEATERS: usize = 8;

/// Serial number the gateway reports for a slot without a bound heater
pub const NULL_SERIAL_NO: &str = "000W00000";

/// Default total request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;
