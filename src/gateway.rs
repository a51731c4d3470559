use crate::{
    error::{IncomfortError, Result},
    heater::Heater,
    protocol::{parse_heater_list, Request},
    transport::{HttpTransport, Transport},
    types::GatewayConfig,
};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};

/// Main interface to an InComfort Lan2RF gateway
///
/// A gateway owns the transport shared by all heaters it discovers and caches
/// its heater list after the first successful fetch. Heaters borrow from the
/// gateway, so they never outlive it.
///
/// # Examples
///
/// ```no_run
/// use incomfort::{Gateway, GatewayConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = GatewayConfig::with_login(
///         Some("admin".to_string()),
///         Some("intergas".to_string()),
///     )?;
///     let mut gateway = Gateway::with_config("192.168.0.1", &config)?;
///
///     for heater in gateway.heaters(false).await? {
///         heater.update().await?;
///         println!("{:?}", heater.status()?);
///     }
///     Ok(())
/// }
/// ```
pub struct Gateway {
    hostname: String,
    transport: Arc<dyn Transport>,
    heaters: Option<Vec<Heater>>,
}

impl Gateway {
    /// Connect to an unprotected gateway with default settings
    ///
    /// No request is issued until [`Gateway::heaters`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::InvalidGateway`] if the HTTP client cannot be created.
    pub fn new(hostname: impl Into<String>) -> Result<Self> {
        Self::with_config(hostname, &GatewayConfig::default())
    }

    /// Connect to a gateway with custom settings
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::InvalidGateway`] if the HTTP client cannot be created.
    pub fn with_config(hostname: impl Into<String>, config: &GatewayConfig) -> Result<Self> {
        let hostname = hostname.into();
        let transport = HttpTransport::new(&hostname, config)?;
        Ok(Self::with_transport(hostname, Arc::new(transport)))
    }

    /// Connect to a gateway through an existing HTTP client
    #[must_use]
    pub fn with_client(
        hostname: impl Into<String>,
        client: reqwest::Client,
        config: &GatewayConfig,
    ) -> Self {
        let hostname = hostname.into();
        let transport = HttpTransport::with_client(client, &hostname, config);
        Self::with_transport(hostname, Arc::new(transport))
    }

    /// Connect to a gateway through any [`Transport`]
    #[must_use]
    pub fn with_transport(hostname: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        let hostname = hostname.into();
        debug!("Gateway(hostname={}) created", hostname);

        Self {
            hostname,
            transport,
            heaters: None,
        }
    }

    /// Host name or address of the gateway
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Heaters bound to the gateway, in heater-list order
    ///
    /// The list is fetched once and cached; pass `force_refresh` to fetch it
    /// again. A failed refresh keeps the previous list.
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::InvalidGateway`] if the gateway cannot be reached
    /// or its answer cannot be parsed, and [`IncomfortError::InvalidHeaterList`]
    /// if the list holds no usable heater.
    pub async fn heaters(&mut self, force_refresh: bool) -> Result<&mut [Heater]> {
        if force_refresh || self.heaters.is_none() {
            let heaters = self.fetch_heaters().await?;
            self.heaters = Some(heaters);
        }

        Ok(self.heaters.as_deref_mut().unwrap_or_default())
    }

    async fn fetch_heaters(&self) -> Result<Vec<Heater>> {
        let body = self.transport.get(Request::HeaterList).await?;
        let slots = parse_heater_list(&body)?;
        debug!("Gateway({}).heaters() = {:?}", self.hostname, slots);

        if slots.is_empty() {
            return Err(IncomfortError::InvalidHeaterList);
        }

        info!(
            "Found {} heater(s) on gateway {}",
            slots.len(),
            self.hostname
        );

        Ok(slots
            .into_iter()
            .map(|(index, serial_no)| Heater::new(serial_no, index, Arc::clone(&self.transport)))
            .collect())
    }

    /// Update every heater concurrently
    ///
    /// Fetches the heater list first if it has not been fetched yet.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Gateway::heaters`] or [`Heater::update`].
    pub async fn update_heaters(&mut self) -> Result<()> {
        let heaters = self.heaters(false).await?;
        try_join_all(heaters.iter_mut().map(|heater| heater.update())).await?;
        Ok(())
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("hostname", &self.hostname)
            .field("heaters", &self.heaters)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{transport::mock::MockTransport, NULL_SERIAL_NO};
    use serde_json::{json, Value};

    const HOSTNAME: &str = "192.168.0.1";
    const SERIAL_NO_0: &str = "2110f25190";
    const SERIAL_NO_1: &str = "2110f25191";

    fn gateway_with(heaterlist: &Value) -> (Gateway, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        transport.respond("heaterlist.json", &json!({ "heaterlist": heaterlist }));
        (Gateway::with_transport(HOSTNAME, transport.clone()), transport)
    }

    #[tokio::test]
    async fn test_gateway_invalid() {
        let mut gateway = Gateway::with_transport(HOSTNAME, Arc::new(MockTransport::new()));
        let error = gateway.heaters(false).await.unwrap_err();
        assert!(matches!(error, IncomfortError::InvalidGateway(_)));
    }

    #[tokio::test]
    async fn test_gateway_unreachable() {
        let config = GatewayConfig {
            timeout_ms: 2_000,
            ..Default::default()
        };
        let mut gateway = Gateway::with_config("127.0.0.1:1", &config).unwrap();
        let error = gateway.heaters(false).await.unwrap_err();
        assert!(matches!(error, IncomfortError::InvalidGateway(_)));
    }

    #[tokio::test]
    async fn test_gateway_garbage_response() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_raw("heaterlist.json", "<html>Login required</html>");
        let mut gateway = Gateway::with_transport(HOSTNAME, transport);

        let error = gateway.heaters(false).await.unwrap_err();
        assert!(error.is_connection_error());
    }

    #[tokio::test]
    async fn test_heaterlist_empty() {
        let lists = [
            json!([null, null, null, null, null, null, null, null]),
            json!([NULL_SERIAL_NO, null, null, null, null, null, null, null]),
            json!([NULL_SERIAL_NO, NULL_SERIAL_NO, null, null, null, null, null, null]),
        ];

        for list in &lists {
            let (mut gateway, _transport) = gateway_with(list);
            let error = gateway.heaters(false).await.unwrap_err();
            assert!(
                matches!(error, IncomfortError::InvalidHeaterList),
                "unexpected {error:?} for {list}"
            );
        }
    }

    #[tokio::test]
    async fn test_heaterlist_valid() {
        let lists = [
            json!([SERIAL_NO_0, null, null, null, null, null, null, null]),
            json!([SERIAL_NO_0, SERIAL_NO_1, null, null, null, null, null, null]),
            json!([null, NULL_SERIAL_NO, null, null, SERIAL_NO_0, null, null, null]),
        ];

        for list in &lists {
            let (mut gateway, _transport) = gateway_with(list);
            let heaters = gateway.heaters(false).await.unwrap();

            assert_eq!(heaters[0].serial_no(), SERIAL_NO_0);
            assert!(heaters.len() < 2 || heaters[1].serial_no() == SERIAL_NO_1);
        }
    }

    #[tokio::test]
    async fn test_heaters_keep_list_position() {
        let (mut gateway, transport) = gateway_with(&json!([
            SERIAL_NO_0, null, null, null, SERIAL_NO_0, null, null, null
        ]));
        transport.respond("data.json?heater=4", &json!({
            "IO": 0, "displ_code": 204,
            "ch_temp_msb": 24, "ch_temp_lsb": 168,
            "tap_temp_msb": 19, "tap_temp_lsb": 184,
            "ch_pressure_msb": 0, "ch_pressure_lsb": 174,
            "room_temp_1_msb": 127, "room_temp_1_lsb": 255,
            "room_temp_2_msb": 127, "room_temp_2_lsb": 255,
        }));

        let heaters = gateway.heaters(false).await.unwrap();
        let indices: Vec<u8> = heaters.iter().map(Heater::index).collect();
        assert_eq!(indices, vec![0, 4]);

        heaters[1].update().await.unwrap();
        assert_eq!(heaters[1].display_text().unwrap(), "tapwater");
        assert_eq!(
            transport.requests(),
            vec!["heaterlist.json", "data.json?heater=4"]
        );
    }

    #[tokio::test]
    async fn test_heaters_are_cached() {
        let (mut gateway, transport) =
            gateway_with(&json!([SERIAL_NO_0, null, null, null, null, null, null, null]));

        gateway.heaters(false).await.unwrap();
        transport.respond(
            "heaterlist.json",
            &json!({ "heaterlist": [SERIAL_NO_0, SERIAL_NO_1, null, null, null, null, null, null] }),
        );
        assert_eq!(gateway.heaters(false).await.unwrap().len(), 1);
        assert_eq!(transport.requests().len(), 1);

        assert_eq!(gateway.heaters(true).await.unwrap().len(), 2);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_cache() {
        let (mut gateway, transport) =
            gateway_with(&json!([SERIAL_NO_0, null, null, null, null, null, null, null]));
        gateway.heaters(false).await.unwrap();

        transport.respond("heaterlist.json", &json!({ "heaterlist": [null] }));
        assert!(matches!(
            gateway.heaters(true).await,
            Err(IncomfortError::InvalidHeaterList)
        ));
        assert_eq!(gateway.heaters(false).await.unwrap()[0].serial_no(), SERIAL_NO_0);
    }

    #[tokio::test]
    async fn test_update_heaters() {
        let (mut gateway, transport) = gateway_with(&json!([
            SERIAL_NO_0, SERIAL_NO_1, null, null, null, null, null, null
        ]));
        for index in 0..2 {
            transport.respond(&format!("data.json?heater={index}"), &json!({
                "IO": 0b1000, "displ_code": 102,
                "ch_temp_msb": 24, "ch_temp_lsb": 168,
                "tap_temp_msb": 19, "tap_temp_lsb": 184,
                "ch_pressure_msb": 0, "ch_pressure_lsb": 174,
                "room_temp_1_msb": 7, "room_temp_1_lsb": 108,
                "room_temp_2_msb": 127, "room_temp_2_lsb": 255,
            }));
        }

        gateway.update_heaters().await.unwrap();

        for heater in gateway.heaters(false).await.unwrap().iter() {
            assert!(heater.is_burning().unwrap());
            assert_eq!(heater.display_text().unwrap(), "central heating");
            assert_eq!(heater.rooms().unwrap().len(), 1);
        }
        assert_eq!(transport.requests().len(), 3);
    }
}
