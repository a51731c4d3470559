use crate::{
    error::{IncomfortError, Result},
    MAX_HEATERS, NULL_SERIAL_NO,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Raw two-byte value reserved for "sensor absent / not applicable" (327.67)
pub const INVALID_VALUE: u16 = 0x7FFF;

/// Lowest accepted room override temperature in °C
pub const OVERRIDE_MIN_TEMP: f64 = 5.0;

/// Highest accepted room override temperature in °C
pub const OVERRIDE_MAX_TEMP: f64 = 30.0;

/// Digits used for the production line character of a decoded serial number
const SERIAL_LINE: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Decode a two-byte fixed-point field with two implied decimals
///
/// Returns `None` for the [`INVALID_VALUE`] sentinel. No range checking is done:
/// every other byte combination decodes, however implausible.
#[must_use]
pub fn decode(msb: u8, lsb: u8) -> Option<f64> {
    let raw = u16::from_be_bytes([msb, lsb]);
    if raw == INVALID_VALUE {
        None
    } else {
        Some(f64::from(raw) / 100.0)
    }
}

/// Encode an override target as tenths of a degree above [`OVERRIDE_MIN_TEMP`]
///
/// # Errors
///
/// Returns [`IncomfortError::InvalidParameters`] if `target` is outside
/// `OVERRIDE_MIN_TEMP..=OVERRIDE_MAX_TEMP` (or not a number).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode_setpoint(target: f64) -> Result<u16> {
    if !(OVERRIDE_MIN_TEMP..=OVERRIDE_MAX_TEMP).contains(&target) {
        return Err(IncomfortError::InvalidParameters(format!(
            "Setpoint {target} is out of range ({OVERRIDE_MIN_TEMP:.1} - {OVERRIDE_MAX_TEMP:.1})"
        )));
    }

    Ok(((target - OVERRIDE_MIN_TEMP) * 10.0).round() as u16)
}

/// Heater state bits carried by the `IO` payload field
///
/// The bits are independent; any combination can be set at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoFlags(i64);

impl IoFlags {
    /// Failure (lockout) bit
    pub const FAILED: i64 = 0x01;
    /// Pump running bit
    pub const PUMPING: i64 = 0x02;
    /// Tap water function active bit
    pub const TAPPING: i64 = 0x04;
    /// Burner on bit
    pub const BURNING: i64 = 0x08;

    /// Wrap a raw `IO` value
    #[must_use]
    pub const fn new(bits: i64) -> Self {
        Self(bits)
    }

    /// Raw bit pattern
    #[must_use]
    pub const fn bits(self) -> i64 {
        self.0
    }

    /// Burner is on
    #[must_use]
    pub const fn is_burning(self) -> bool {
        self.0 & Self::BURNING != 0
    }

    /// Heater is in a failed (lockout) state
    #[must_use]
    pub const fn is_failed(self) -> bool {
        self.0 & Self::FAILED != 0
    }

    /// Pump is running
    #[must_use]
    pub const fn is_pumping(self) -> bool {
        self.0 & Self::PUMPING != 0
    }

    /// Tap water is being heated
    #[must_use]
    pub const fn is_tapping(self) -> bool {
        self.0 & Self::TAPPING != 0
    }
}

/// Heater-level quantities encoded as msb/lsb pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// Central heating supply temperature (°C)
    HeaterTemp,
    /// Tap water temperature (°C)
    TapTemp,
    /// Central heating water pressure (bar)
    Pressure,
}

/// Room-level quantities encoded as msb/lsb pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomQuantity {
    /// Measured room temperature
    Temp,
    /// Scheduled setpoint
    Setpoint,
    /// Override setpoint
    Override,
}

/// Thermostat slot of a heater
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoomNo {
    /// First thermostat
    One,
    /// Second thermostat
    Two,
}

impl RoomNo {
    /// Both slots in order
    pub const ALL: [Self; 2] = [Self::One, Self::Two];

    /// Room number as reported to users (1 or 2)
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Zero-based thermostat index used in override commands
    #[must_use]
    pub const fn thermostat(self) -> u8 {
        self.number() - 1
    }
}

impl std::fmt::Display for RoomNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Stem of an msb/lsb field pair; all field names are built here
#[derive(Debug, Clone, Copy)]
enum FieldStem {
    Heater(Quantity),
    Room(RoomNo, RoomQuantity),
}

impl FieldStem {
    fn name(self) -> String {
        match self {
            Self::Heater(Quantity::HeaterTemp) => "ch_temp".to_string(),
            Self::Heater(Quantity::TapTemp) => "tap_temp".to_string(),
            Self::Heater(Quantity::Pressure) => "ch_pressure".to_string(),
            Self::Room(room, quantity) => {
                let stem = match quantity {
                    RoomQuantity::Temp => "room_temp",
                    RoomQuantity::Setpoint => "room_temp_set",
                    RoomQuantity::Override => "room_set_ovr",
                };
                format!("{stem}_{}", room.number())
            }
        }
    }
}

/// Flat status payload returned by `data.json` for one heater
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(Map<String, Value>);

impl RawPayload {
    /// Parse a payload from a response body, whatever its declared content type
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::InvalidGateway`] if the body is not a JSON object.
    pub fn from_bytes(body: &[u8]) -> Result<Self> {
        Ok(Self(serde_json::from_slice(body)?))
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Payload has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Integer value of a field, if present
    #[must_use]
    pub fn get(&self, field: &str) -> Option<i64> {
        self.0.get(field).and_then(Value::as_i64)
    }

    /// Integer value of a required field
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::MissingField`] if the field is absent or not an integer.
    pub fn field(&self, field: &str) -> Result<i64> {
        self.get(field)
            .ok_or_else(|| IncomfortError::MissingField(field.to_string()))
    }

    fn byte(&self, field: &str) -> Result<u8> {
        let value = self.field(field)?;
        u8::try_from(value).map_err(|_| IncomfortError::InvalidField {
            field: field.to_string(),
            value,
        })
    }

    fn pair(&self, stem: FieldStem) -> Result<Option<f64>> {
        let stem = stem.name();
        let msb = self.byte(&format!("{stem}_msb"))?;
        let lsb = self.byte(&format!("{stem}_lsb"))?;
        Ok(decode(msb, lsb))
    }

    /// Decode a heater-level quantity
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::MissingField`] or [`IncomfortError::InvalidField`]
    /// if either byte of the pair is absent or out of range.
    pub fn quantity(&self, quantity: Quantity) -> Result<Option<f64>> {
        self.pair(FieldStem::Heater(quantity))
    }

    /// Decode a room-level quantity
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::MissingField`] or [`IncomfortError::InvalidField`]
    /// if either byte of the pair is absent or out of range.
    pub fn room_quantity(&self, room: RoomNo, quantity: RoomQuantity) -> Result<Option<f64>> {
        self.pair(FieldStem::Room(room, quantity))
    }

    /// The `IO` bitmask
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::MissingField`] if `IO` is absent.
    pub fn io_flags(&self) -> Result<IoFlags> {
        self.field("IO").map(IoFlags::new)
    }

    /// The raw `displ_code`, a display code or a fault code depending on [`IoFlags::is_failed`]
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::MissingField`] if `displ_code` is absent.
    pub fn display_code(&self) -> Result<i64> {
        self.field("displ_code")
    }

    /// Serial number rebuilt from the six `serial_*` fields
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::MissingField`] if a field is absent, or
    /// [`IncomfortError::InvalidField`] if `serial_line` is not a base-36 digit.
    pub fn decoded_serial_no(&self) -> Result<String> {
        let line = self.field("serial_line")?;
        let line_char = usize::try_from(line)
            .ok()
            .and_then(|idx| SERIAL_LINE.get(idx))
            .map(|&c| char::from(c))
            .ok_or_else(|| IncomfortError::InvalidField {
                field: "serial_line".to_string(),
                value: line,
            })?;

        Ok(format!(
            "{}{}{}{}{}{}",
            self.field("serial_year")?,
            self.field("serial_month")?,
            line_char,
            self.field("serial_sn1")?,
            self.field("serial_sn2")?,
            self.field("serial_sn3")?,
        ))
    }
}

/// Requests understood by the gateway, relative to its base URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// List the serial numbers bound to the gateway
    HeaterList,
    /// Fetch the status payload of one heater
    Status {
        /// Heater slot in the heater list
        heater: u8,
    },
    /// Set a thermostat override
    SetOverride {
        /// Heater slot in the heater list
        heater: u8,
        /// Zero-based thermostat index
        thermostat: u8,
        /// Tenths of a degree above [`OVERRIDE_MIN_TEMP`]
        setpoint: u16,
    },
}

impl Request {
    /// Build a validated override request
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::InvalidParameters`] if `target` is out of range.
    pub fn set_override(heater: u8, room: RoomNo, target: f64) -> Result<Self> {
        Ok(Self::SetOverride {
            heater,
            thermostat: room.thermostat(),
            setpoint: encode_setpoint(target)?,
        })
    }

    /// Path and query, appended to the gateway base URL
    #[must_use]
    pub fn path(self) -> String {
        match self {
            Self::HeaterList => "heaterlist.json".to_string(),
            Self::Status { heater } => format!("data.json?heater={heater}"),
            Self::SetOverride {
                heater,
                thermostat,
                setpoint,
            } => format!("data.json?heater={heater}&thermostat={thermostat}&setpoint={setpoint}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HeaterListResponse {
    heaterlist: Vec<Option<String>>,
}

/// Parse a `heaterlist.json` body into `(slot, serial_no)` pairs
///
/// Empty slots and the "no heater bound" serial are dropped; the remaining
/// entries keep their original slot index.
///
/// # Errors
///
/// Returns [`IncomfortError::InvalidGateway`] if the body does not have the
/// expected shape.
pub fn parse_heater_list(body: &[u8]) -> Result<Vec<(u8, String)>> {
    let response: HeaterListResponse = serde_json::from_slice(body)?;

    if response.heaterlist.len() > MAX_HEATERS {
        warn!(
            "Heater list has {} slots, ignoring all beyond {}",
            response.heaterlist.len(),
            MAX_HEATERS
        );
    }

    Ok(response
        .heaterlist
        .into_iter()
        .take(MAX_HEATERS)
        .zip(0u8..)
        .filter_map(|(slot, idx)| match slot {
            Some(serial) if !serial.is_empty() && serial != NULL_SERIAL_NO => Some((idx, serial)),
            _ => None,
        })
        .collect())
}
