use crate::{
    error::Result,
    heater::Heater,
    protocol::{Request, RoomNo, RoomQuantity},
    types::RoomStatus,
};
use tracing::{debug, info};

/// A room thermostat attached to a [`Heater`]
///
/// A room holds no data of its own: every reading is decoded on demand from the
/// heater's latest payload, so a fresh [`Heater::update`] is needed to see the
/// effect of [`Room::set_override`].
#[derive(Debug, Clone, Copy)]
pub struct Room<'a> {
    heater: &'a Heater,
    room_no: RoomNo,
}

impl<'a> Room<'a> {
    pub(crate) const fn new(heater: &'a Heater, room_no: RoomNo) -> Self {
        Self { heater, room_no }
    }

    /// Thermostat slot
    #[must_use]
    pub const fn room_no(&self) -> RoomNo {
        self.room_no
    }

    /// Heater this room belongs to
    #[must_use]
    pub const fn heater(&self) -> &'a Heater {
        self.heater
    }

    fn reading(&self, quantity: RoomQuantity) -> Option<f64> {
        match self
            .heater
            .raw_payload()?
            .room_quantity(self.room_no, quantity)
        {
            Ok(value) => value,
            Err(e) => {
                debug!("Room({}) has no usable {:?} reading: {}", self.room_no, quantity, e);
                None
            }
        }
    }

    /// Measured room temperature (°C)
    ///
    /// `None` when the sensor is absent. A missing or corrupt field also reads
    /// as `None`; the cause is logged at debug level.
    #[must_use]
    pub fn room_temp(&self) -> Option<f64> {
        self.reading(RoomQuantity::Temp)
    }

    /// Scheduled setpoint (°C)
    #[must_use]
    pub fn setpoint(&self) -> Option<f64> {
        self.reading(RoomQuantity::Setpoint)
    }

    /// Override setpoint (°C)
    #[must_use]
    pub fn override_temp(&self) -> Option<f64> {
        self.reading(RoomQuantity::Override)
    }

    /// All readings of the room
    #[must_use]
    pub fn status(&self) -> RoomStatus {
        let status = RoomStatus {
            room_temp: self.room_temp(),
            setpoint: self.setpoint(),
            override_temp: self.override_temp(),
        };
        debug!("Room({}).status() = {:?}", self.room_no, status);
        status
    }

    /// Override the room setpoint
    ///
    /// # Arguments
    ///
    /// * `setpoint` - Target temperature in °C, within 5.0 - 30.0
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::InvalidParameters`](crate::IncomfortError::InvalidParameters)
    /// without contacting the gateway if `setpoint` is out of range, or
    /// [`IncomfortError::InvalidGateway`](crate::IncomfortError::InvalidGateway)
    /// if the request fails.
    pub async fn set_override(&self, setpoint: f64) -> Result<()> {
        let request = Request::set_override(self.heater.index(), self.room_no, setpoint)?;
        info!(
            "Setting override of room {} on heater {} to {:.1}",
            self.room_no,
            self.heater.serial_no(),
            setpoint
        );

        self.heater.transport().get(request).await?;
        Ok(())
    }
}
