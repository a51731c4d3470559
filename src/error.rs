use thiserror::Error;

/// Boxed cause carried by [`IncomfortError::InvalidGateway`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur when talking to a Lan2RF gateway
#[derive(Error, Debug)]
pub enum IncomfortError {
    /// The gateway did not answer, answered with an error status, or sent a body
    /// that is not the expected JSON
    #[error(
        "Invalid/no response from gateway: {0} (check the network/hostname, and the user credentials)"
    )]
    InvalidGateway(#[source] BoxError),

    /// The gateway answered, but its heater list holds no usable entry
    #[error(
        "There is no valid heater in the heater list (check the binding between the gateway and the heater)"
    )]
    InvalidHeaterList,

    /// A heater attribute was read before the first successful update
    #[error("Heater {serial_no} has not been updated yet")]
    NotUpdated {
        /// Serial number of the heater
        serial_no: String,
    },

    /// The status payload lacks a field
    #[error("Status payload has no field `{0}`")]
    MissingField(String),

    /// A payload field holds a value outside its encoding range
    #[error("Status payload field `{field}` has invalid value {value}")]
    InvalidField {
        /// Field name
        field: String,
        /// Offending raw value
        value: i64,
    },

    /// Invalid command parameters
    #[error("Invalid command parameters: {0}")]
    InvalidParameters(String),

    /// Only one of username and password was supplied
    #[error("Username and password must be given together, or not at all")]
    InvalidCredentials,
}

/// Result type for InComfort operations
pub type Result<T> = std::result::Result<T, IncomfortError>;

impl IncomfortError {
    /// Check if this error indicates a network or gateway availability issue
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::InvalidGateway(_))
    }

    /// Check if this error was caused by the caller rather than the gateway
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameters(_) | Self::InvalidCredentials | Self::NotUpdated { .. }
        )
    }
}

impl From<reqwest::Error> for IncomfortError {
    fn from(err: reqwest::Error) -> Self {
        Self::InvalidGateway(Box::new(err))
    }
}

impl From<serde_json::Error> for IncomfortError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidGateway(Box::new(err))
    }
}
