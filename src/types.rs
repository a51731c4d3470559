use crate::{
    error::{IncomfortError, Result},
    DEFAULT_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating state reported in `displ_code` while the heater is not failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum DisplayCode {
    /// OpenTherm (0)
    Opentherm,
    /// External boiler (15)
    BoilerExt,
    /// Frost protection (24)
    Frost,
    /// Central heating, RF thermostat (37)
    CentralHeatingRf,
    /// Internal tap water (51)
    TapwaterInt,
    /// Sensor test (85)
    SensorTest,
    /// Central heating (102)
    CentralHeating,
    /// Standby (126)
    Standby,
    /// Off (127)
    Off,
    /// Boiler post-run (153)
    PostrunBoiler,
    /// Service (170)
    Service,
    /// Tap water (204)
    Tapwater,
    /// Central heating post-run (231)
    PostrunCh,
    /// Internal boiler (240)
    BoilerInt,
    /// Buffer (255)
    Buffer,
    /// Code missing from the table
    Unknown(i64),
}

impl DisplayCode {
    /// Raw code as reported by the heater
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Opentherm => 0,
            Self::BoilerExt => 15,
            Self::Frost => 24,
            Self::CentralHeatingRf => 37,
            Self::TapwaterInt => 51,
            Self::SensorTest => 85,
            Self::CentralHeating => 102,
            Self::Standby => 126,
            Self::Off => 127,
            Self::PostrunBoiler => 153,
            Self::Service => 170,
            Self::Tapwater => 204,
            Self::PostrunCh => 231,
            Self::BoilerInt => 240,
            Self::Buffer => 255,
            Self::Unknown(code) => code,
        }
    }

    /// Code is in the table
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<i64> for DisplayCode {
    fn from(value: i64) -> Self {
        match value {
            0 => Self::Opentherm,
            15 => Self::BoilerExt,
            24 => Self::Frost,
            37 => Self::CentralHeatingRf,
            51 => Self::TapwaterInt,
            85 => Self::SensorTest,
            102 => Self::CentralHeating,
            126 => Self::Standby,
            127 => Self::Off,
            153 => Self::PostrunBoiler,
            170 => Self::Service,
            204 => Self::Tapwater,
            231 => Self::PostrunCh,
            240 => Self::BoilerInt,
            255 => Self::Buffer,
            other => Self::Unknown(other),
        }
    }
}

impl From<DisplayCode> for i64 {
    fn from(code: DisplayCode) -> Self {
        code.code()
    }
}

impl fmt::Display for DisplayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opentherm => write!(f, "opentherm"),
            Self::BoilerExt => write!(f, "boiler ext."),
            Self::Frost => write!(f, "frost"),
            Self::CentralHeatingRf => write!(f, "central heating rf"),
            Self::TapwaterInt => write!(f, "tapwater int."),
            Self::SensorTest => write!(f, "sensortest"),
            Self::CentralHeating => write!(f, "central heating"),
            Self::Standby => write!(f, "standby"),
            Self::Off => write!(f, "off"),
            Self::PostrunBoiler => write!(f, "postrun boiler"),
            Self::Service => write!(f, "service"),
            Self::Tapwater => write!(f, "tapwater"),
            Self::PostrunCh => write!(f, "postrun ch"),
            Self::BoilerInt => write!(f, "boiler int."),
            Self::Buffer => write!(f, "buffer"),
            Self::Unknown(code) => write!(f, "unknown (code {code})"),
        }
    }
}

/// Fault reported in `displ_code` while the heater is failed
///
/// Sensor and gas valve faults span several codes; the variant keeps the exact
/// code so it can be shown as `E<code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum FaultCode {
    /// E0
    SensorFaultAfterSelfCheck,
    /// E1
    CvTemperatureTooHigh,
    /// E2
    S1AndS2Interchanged,
    /// E4
    NoFlameSignal,
    /// E5
    PoorFlameSignal,
    /// E6
    FlameDetectionFault,
    /// E8
    IncorrectFanSpeed,
    /// E10 - E14
    SensorFaultS1(u8),
    /// E20 - E24
    SensorFaultS2(u8),
    /// E27
    ShortcutOutsideSensorTemperature,
    /// E29, E30
    GasValveRelayFaulty(u8),
    /// Code missing from the table
    Unknown(i64),
}

impl FaultCode {
    /// Raw code as reported by the heater
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::SensorFaultAfterSelfCheck => 0,
            Self::CvTemperatureTooHigh => 1,
            Self::S1AndS2Interchanged => 2,
            Self::NoFlameSignal => 4,
            Self::PoorFlameSignal => 5,
            Self::FlameDetectionFault => 6,
            Self::IncorrectFanSpeed => 8,
            Self::SensorFaultS1(code) | Self::SensorFaultS2(code) | Self::GasValveRelayFaulty(code) => {
                code as i64
            }
            Self::ShortcutOutsideSensorTemperature => 27,
            Self::Unknown(code) => code,
        }
    }

    /// Code is in the table
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<i64> for FaultCode {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from(value: i64) -> Self {
        match value {
            0 => Self::SensorFaultAfterSelfCheck,
            1 => Self::CvTemperatureTooHigh,
            2 => Self::S1AndS2Interchanged,
            4 => Self::NoFlameSignal,
            5 => Self::PoorFlameSignal,
            6 => Self::FlameDetectionFault,
            8 => Self::IncorrectFanSpeed,
            10..=14 => Self::SensorFaultS1(value as u8),
            20..=24 => Self::SensorFaultS2(value as u8),
            27 => Self::ShortcutOutsideSensorTemperature,
            29 | 30 => Self::GasValveRelayFaulty(value as u8),
            other => Self::Unknown(other),
        }
    }
}

impl From<FaultCode> for i64 {
    fn from(code: FaultCode) -> Self {
        code.code()
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorFaultAfterSelfCheck => write!(f, "sensor fault after self check"),
            Self::CvTemperatureTooHigh => write!(f, "cv temperature too high"),
            Self::S1AndS2Interchanged => write!(f, "s1 and s2 interchanged"),
            Self::NoFlameSignal => write!(f, "no flame signal"),
            Self::PoorFlameSignal => write!(f, "poor flame signal"),
            Self::FlameDetectionFault => write!(f, "flame detection fault"),
            Self::IncorrectFanSpeed => write!(f, "incorrect fan speed"),
            Self::SensorFaultS1(_) => write!(f, "sensor fault s1"),
            Self::SensorFaultS2(_) => write!(f, "sensor fault s2"),
            Self::ShortcutOutsideSensorTemperature => {
                write!(f, "shortcut outside sensor temperature")
            }
            Self::GasValveRelayFaulty(_) => write!(f, "gas valve relay faulty"),
            Self::Unknown(code) => write!(f, "unknown fault (code {code})"),
        }
    }
}

/// Snapshot of a heater, rebuilt on every successful update
///
/// The key set is fixed: readings without a valid sensor value are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaterStatus {
    /// Operating state, `None` while failed
    pub display_code: Option<DisplayCode>,
    /// Label of the display or fault code
    pub display_text: String,
    /// Fault, `None` unless failed
    pub fault_code: Option<FaultCode>,
    /// Burner is on
    pub is_burning: bool,
    /// Heater is in lockout
    pub is_failed: bool,
    /// Pump is running
    pub is_pumping: bool,
    /// Tap water is being heated
    pub is_tapping: bool,
    /// Central heating supply temperature (°C)
    pub heater_temp: Option<f64>,
    /// Tap water temperature (°C)
    pub tap_temp: Option<f64>,
    /// Central heating water pressure (bar)
    pub pressure: Option<f64>,
    /// Serial number from the heater list
    pub serial_no: String,
    /// RF node number
    pub nodenr: Option<i64>,
    /// RF signal strength of the last message
    pub rf_message_rssi: Option<i64>,
    /// RF status counter
    pub rfstatus_cntr: Option<i64>,
}

/// Readings of one room thermostat
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoomStatus {
    /// Measured room temperature (°C)
    pub room_temp: Option<f64>,
    /// Scheduled setpoint (°C)
    pub setpoint: Option<f64>,
    /// Override setpoint (°C)
    #[serde(rename = "override")]
    pub override_temp: Option<f64>,
}

/// Basic-auth login for gateways with protected access
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub username: String,
    /// Password
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"REDACTED")
            .finish()
    }
}

/// Gateway connection settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Login, routed through the protected path prefix when present
    pub credentials: Option<Credentials>,
    /// Total request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl GatewayConfig {
    /// Default settings with an optional login
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::InvalidCredentials`] if only one of `username`
    /// and `password` is given.
    pub fn with_login(username: Option<String>, password: Option<String>) -> Result<Self> {
        let credentials = match (username, password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            _ => return Err(IncomfortError::InvalidCredentials),
        };

        Ok(Self {
            credentials,
            ..Default::default()
        })
    }

    /// Base URL for `hostname`: the root path, or `protect/` when logging in
    #[must_use]
    pub fn base_url(&self, hostname: &str) -> String {
        if self.credentials.is_some() {
            format!("http://{hostname}/protect/")
        } else {
            format!("http://{hostname}/")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_code_from_i64() {
        assert_eq!(DisplayCode::from(126), DisplayCode::Standby);
        assert_eq!(DisplayCode::from(0), DisplayCode::Opentherm);
        assert_eq!(DisplayCode::from(255), DisplayCode::Buffer);
        assert_eq!(DisplayCode::from(99), DisplayCode::Unknown(99));
        assert_eq!(DisplayCode::from(99).code(), 99);
        assert_eq!(DisplayCode::Standby.code(), 126);
    }

    #[test]
    fn test_display_code_table_round_trips() {
        for code in 0..=300 {
            let display = DisplayCode::from(code);
            assert_eq!(display.code(), code);
        }

        let known = (0..=300).filter(|&c| DisplayCode::from(c).is_known()).count();
        assert_eq!(known, 15);
    }

    #[test]
    fn test_display_text() {
        assert_eq!(DisplayCode::Standby.to_string(), "standby");
        assert_eq!(DisplayCode::BoilerExt.to_string(), "boiler ext.");
        assert_eq!(DisplayCode::from(77).to_string(), "unknown (code 77)");
    }

    #[test]
    fn test_fault_code_from_i64() {
        assert_eq!(FaultCode::from(4), FaultCode::NoFlameSignal);
        assert_eq!(FaultCode::from(12), FaultCode::SensorFaultS1(12));
        assert_eq!(FaultCode::from(30), FaultCode::GasValveRelayFaulty(30));
        assert_eq!(FaultCode::from(3), FaultCode::Unknown(3));

        for code in -5..=300 {
            assert_eq!(FaultCode::from(code).code(), code);
        }

        let known = (0..=300).filter(|&c| FaultCode::from(c).is_known()).count();
        assert_eq!(known, 20);
    }

    #[test]
    fn test_fault_text() {
        assert_eq!(FaultCode::from(1).to_string(), "cv temperature too high");
        assert_eq!(FaultCode::from(22).to_string(), "sensor fault s2");
        assert!(FaultCode::from(42).to_string().contains("42"));
    }

    #[test]
    fn test_codes_serialize_as_integers() {
        assert_eq!(serde_json::to_string(&DisplayCode::Standby).unwrap(), "126");
        assert_eq!(
            serde_json::to_string(&FaultCode::SensorFaultS1(11)).unwrap(),
            "11"
        );
        let code: DisplayCode = serde_json::from_str("204").unwrap();
        assert_eq!(code, DisplayCode::Tapwater);
    }

    #[test]
    fn test_gateway_config() {
        let config = GatewayConfig::default();
        assert!(config.credentials.is_none());
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.base_url("192.168.0.1"), "http://192.168.0.1/");

        let config =
            GatewayConfig::with_login(Some("admin".to_string()), Some("intergas".to_string()))
                .unwrap();
        assert_eq!(config.base_url("192.168.0.1"), "http://192.168.0.1/protect/");
        assert!(!format!("{config:?}").contains("intergas"));
    }

    #[test]
    fn test_partial_credentials_rejected() {
        assert!(matches!(
            GatewayConfig::with_login(Some("admin".to_string()), None),
            Err(IncomfortError::InvalidCredentials)
        ));
        assert!(matches!(
            GatewayConfig::with_login(None, Some("intergas".to_string())),
            Err(IncomfortError::InvalidCredentials)
        ));
        assert!(GatewayConfig::with_login(None, None).is_ok());
    }

    #[test]
    fn test_room_status_keys() {
        let status = RoomStatus {
            room_temp: Some(19.0),
            setpoint: None,
            override_temp: None,
        };
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"room_temp": 19.0, "setpoint": null, "override": null})
        );
    }
}
