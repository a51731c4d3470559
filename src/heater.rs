use crate::{
    error::{IncomfortError, Result},
    protocol::{Quantity, RawPayload, Request, RoomNo, RoomQuantity},
    room::Room,
    transport::Transport,
    types::{DisplayCode, FaultCode, HeaterStatus},
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where to report display or fault codes missing from the tables
pub const ISSUE_URL: &str = "https://github.com/jbouwh/incomfort-client/issues";

/// A heater (boiler) bound to a Lan2RF gateway
///
/// Heaters are created by [`Gateway::heaters`](crate::Gateway::heaters) and
/// addressed by their slot in the gateway's heater list. All readings come from
/// the payload fetched by the last successful [`Heater::update`]; reading them
/// before that fails with [`IncomfortError::NotUpdated`].
///
/// # Examples
///
/// ```no_run
/// use incomfort::Gateway;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut gateway = Gateway::new("192.168.0.1")?;
///     let heater = &mut gateway.heaters(false).await?[0];
///
///     heater.update().await?;
///     println!("{}: {}", heater.serial_no(), heater.display_text()?);
///
///     for room in heater.rooms()? {
///         println!("room {}: {:?}", room.room_no(), room.room_temp());
///     }
///     Ok(())
/// }
/// ```
pub struct Heater {
    serial_no: String,
    index: u8,
    transport: Arc<dyn Transport>,
    payload: Option<RawPayload>,
    status: Option<HeaterStatus>,
    rooms: Option<Vec<RoomNo>>,
    last_display_code: Option<i64>,
}

impl Heater {
    pub(crate) fn new(serial_no: String, index: u8, transport: Arc<dyn Transport>) -> Self {
        debug!("Heater(serial_no={}, index={}) created", serial_no, index);

        Self {
            serial_no,
            index,
            transport,
            payload: None,
            status: None,
            rooms: None,
            last_display_code: None,
        }
    }

    /// Serial number as reported in the gateway's heater list
    #[must_use]
    pub fn serial_no(&self) -> &str {
        &self.serial_no
    }

    /// Slot in the gateway's heater list, used for all status queries
    #[must_use]
    pub const fn index(&self) -> u8 {
        self.index
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Fetch the latest status payload from the gateway
    ///
    /// The stored payload is replaced as a whole, the status snapshot and the
    /// room list are rebuilt. On error the previous state is kept.
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::InvalidGateway`] if the request fails or the
    /// body is not JSON, and [`IncomfortError::MissingField`] or
    /// [`IncomfortError::InvalidField`] if the payload lacks required fields.
    pub async fn update(&mut self) -> Result<()> {
        let body = self
            .transport
            .get(Request::Status { heater: self.index })
            .await?;
        let payload = RawPayload::from_bytes(&body)?;

        let status = build_status(&self.serial_no, &payload)?;
        let rooms = RoomNo::ALL
            .into_iter()
            .filter(|&room| matches!(payload.room_quantity(room, RoomQuantity::Temp), Ok(Some(_))))
            .collect();

        let code = payload.display_code()?;
        if self.last_display_code != Some(code) {
            self.report_unknown_code(&status);
        }
        self.last_display_code = Some(code);

        debug!("Heater({}).status() = {:?}", self.serial_no, status);

        self.payload = Some(payload);
        self.status = Some(status);
        self.rooms = Some(rooms);

        Ok(())
    }

    fn report_unknown_code(&self, status: &HeaterStatus) {
        match (status.display_code, status.fault_code) {
            (_, Some(FaultCode::Unknown(code))) => warn!(
                "Unknown fault code {} reported by heater {}. Log an issue at {} to report it",
                code, self.serial_no, ISSUE_URL
            ),
            (Some(DisplayCode::Unknown(code)), _) => warn!(
                "Unknown operation code {} reported by heater {}. Log an issue at {} to report it",
                code, self.serial_no, ISSUE_URL
            ),
            _ => {}
        }
    }

    fn payload(&self) -> Result<&RawPayload> {
        self.payload
            .as_ref()
            .ok_or_else(|| IncomfortError::NotUpdated {
                serial_no: self.serial_no.clone(),
            })
    }

    /// Payload from the last successful update, if any
    #[must_use]
    pub const fn raw_payload(&self) -> Option<&RawPayload> {
        self.payload.as_ref()
    }

    /// Status snapshot from the last successful update
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update.
    pub fn status(&self) -> Result<&HeaterStatus> {
        self.status.as_ref().ok_or_else(|| IncomfortError::NotUpdated {
            serial_no: self.serial_no.clone(),
        })
    }

    /// Burner is on
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update.
    pub fn is_burning(&self) -> Result<bool> {
        Ok(self.payload()?.io_flags()?.is_burning())
    }

    /// Heater is in a failed (lockout) state
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update.
    pub fn is_failed(&self) -> Result<bool> {
        Ok(self.payload()?.io_flags()?.is_failed())
    }

    /// Pump is running
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update.
    pub fn is_pumping(&self) -> Result<bool> {
        Ok(self.payload()?.io_flags()?.is_pumping())
    }

    /// Tap water is being heated
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update.
    pub fn is_tapping(&self) -> Result<bool> {
        Ok(self.payload()?.io_flags()?.is_tapping())
    }

    /// Operating state, `None` while the heater is failed
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update.
    pub fn display_code(&self) -> Result<Option<DisplayCode>> {
        display_code_of(self.payload()?)
    }

    /// Fault, `None` unless the heater is failed
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update.
    pub fn fault_code(&self) -> Result<Option<FaultCode>> {
        fault_code_of(self.payload()?)
    }

    /// Label of the fault code while failed, of the display code otherwise
    ///
    /// Codes missing from the tables give a fallback label holding the raw code.
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update.
    pub fn display_text(&self) -> Result<String> {
        let payload = self.payload()?;
        display_text_of(display_code_of(payload)?, fault_code_of(payload)?)
    }

    /// Central heating supply temperature (°C)
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update.
    pub fn heater_temp(&self) -> Result<Option<f64>> {
        self.payload()?.quantity(Quantity::HeaterTemp)
    }

    /// Tap water temperature (°C)
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update.
    pub fn tap_temp(&self) -> Result<Option<f64>> {
        self.payload()?.quantity(Quantity::TapTemp)
    }

    /// Central heating water pressure (bar)
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update.
    pub fn pressure(&self) -> Result<Option<f64>> {
        self.payload()?.quantity(Quantity::Pressure)
    }

    /// Serial number rebuilt from the payload's `serial_*` fields
    ///
    /// Should agree with [`Heater::serial_no`], which stays authoritative.
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update,
    /// or a field error if the payload carries no serial fields.
    pub fn decoded_serial_no(&self) -> Result<String> {
        self.payload()?.decoded_serial_no()
    }

    /// Room thermostats with a valid temperature in the last payload
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::NotUpdated`] before the first successful update.
    pub fn rooms(&self) -> Result<Vec<Room<'_>>> {
        let rooms = self.rooms.as_ref().ok_or_else(|| IncomfortError::NotUpdated {
            serial_no: self.serial_no.clone(),
        })?;

        Ok(rooms.iter().map(|&room_no| Room::new(self, room_no)).collect())
    }
}

impl std::fmt::Debug for Heater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heater")
            .field("serial_no", &self.serial_no)
            .field("index", &self.index)
            .field("status", &self.status)
            .field("rooms", &self.rooms)
            .finish_non_exhaustive()
    }
}

fn display_code_of(payload: &RawPayload) -> Result<Option<DisplayCode>> {
    if payload.io_flags()?.is_failed() {
        return Ok(None);
    }
    Ok(Some(DisplayCode::from(payload.display_code()?)))
}

fn fault_code_of(payload: &RawPayload) -> Result<Option<FaultCode>> {
    if !payload.io_flags()?.is_failed() {
        return Ok(None);
    }
    Ok(Some(FaultCode::from(payload.display_code()?)))
}

fn display_text_of(display: Option<DisplayCode>, fault: Option<FaultCode>) -> Result<String> {
    match (fault, display) {
        (Some(fault), _) => Ok(fault.to_string()),
        (None, Some(display)) => Ok(display.to_string()),
        (None, None) => Err(IncomfortError::MissingField("displ_code".to_string())),
    }
}

fn build_status(serial_no: &str, payload: &RawPayload) -> Result<HeaterStatus> {
    let flags = payload.io_flags()?;
    let display_code = display_code_of(payload)?;
    let fault_code = fault_code_of(payload)?;

    Ok(HeaterStatus {
        display_code,
        display_text: display_text_of(display_code, fault_code)?,
        fault_code,
        is_burning: flags.is_burning(),
        is_failed: flags.is_failed(),
        is_pumping: flags.is_pumping(),
        is_tapping: flags.is_tapping(),
        heater_temp: payload.quantity(Quantity::HeaterTemp)?,
        tap_temp: payload.quantity(Quantity::TapTemp)?,
        pressure: payload.quantity(Quantity::Pressure)?,
        serial_no: serial_no.to_string(),
        nodenr: payload.get("nodenr"),
        rf_message_rssi: payload.get("rf_message_rssi"),
        rfstatus_cntr: payload.get("rfstatus_cntr"),
    })
}
