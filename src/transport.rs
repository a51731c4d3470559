use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::Result,
    protocol::Request,
    types::{Credentials, GatewayConfig},
};

/// Request/response channel to a Lan2RF gateway
///
/// One transport is shared by a [`Gateway`](crate::Gateway) and every heater
/// it creates. Implementations return the raw response body; parsing is done
/// by the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `request` and return the response body
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::InvalidGateway`](crate::IncomfortError::InvalidGateway)
    /// if the gateway cannot be reached, times out, or answers with an error status.
    async fn get(&self, request: Request) -> Result<Bytes>;
}

/// HTTP transport backed by a `reqwest` client
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with its own HTTP client
    ///
    /// # Errors
    ///
    /// Returns [`IncomfortError::InvalidGateway`](crate::IncomfortError::InvalidGateway)
    /// if the HTTP client cannot be initialized.
    pub fn new(hostname: &str, config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, hostname, config))
    }

    /// Create a transport on top of an existing HTTP client
    #[must_use]
    pub fn with_client(client: reqwest::Client, hostname: &str, config: &GatewayConfig) -> Self {
        Self {
            client,
            base_url: config.base_url(hostname),
            credentials: config.credentials.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// URL every request path is appended to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn prepare(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.get(url).timeout(self.timeout);
        match &self.credentials {
            Some(credentials) => {
                builder.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => builder,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: Request) -> Result<Bytes> {
        let url = format!("{}{}", self.base_url, request.path());
        debug!(
            url = %url,
            auth = if self.credentials.is_some() { "REDACTED" } else { "none" },
            "GET"
        );

        let response = self.prepare(&url).send().await?.error_for_status()?;
        debug!(url = %url, status = %response.status(), "response received");

        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::error::IncomfortError;
    use serde_json::Value;
    use std::{
        collections::HashMap,
        io,
        sync::{Arc, Mutex},
    };
    use tracing::subscriber::DefaultGuard;

    /// Serves canned bodies keyed by request path and records every request
    #[derive(Default)]
    pub(crate) struct MockTransport {
        responses: Mutex<HashMap<String, Bytes>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn respond(&self, path: &str, body: &Value) {
            self.respond_raw(path, body.to_string());
        }

        pub(crate) fn respond_raw(&self, path: &str, body: impl Into<Bytes>) {
            self.responses
                .lock()
                .unwrap()
                .insert(path.to_string(), body.into());
        }

        pub(crate) fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn get(&self, request: Request) -> Result<Bytes> {
            let path = request.path();
            self.requests.lock().unwrap().push(path.clone());
            self.responses
                .lock()
                .unwrap()
                .get(&path)
                .cloned()
                .ok_or_else(|| IncomfortError::InvalidGateway(format!("404 for {path}").into()))
        }
    }

    /// Formatted log output collected on the current thread
    #[derive(Clone, Default)]
    pub(crate) struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        /// Route events at `level` and above into a new buffer until the guard drops
        pub(crate) fn capture(level: tracing::Level) -> (Self, DefaultGuard) {
            let logs = Self::default();
            let writer = logs.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .finish();
            (logs, tracing::subscriber::set_default(subscriber))
        }

        pub(crate) fn count(&self, needle: &str) -> usize {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .matches(needle)
                .count()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn test_base_url() {
        let transport = HttpTransport::new("192.168.0.1", &GatewayConfig::default()).unwrap();
        assert_eq!(transport.base_url(), "http://192.168.0.1/");

        let config =
            GatewayConfig::with_login(Some("admin".to_string()), Some("intergas".to_string()))
                .unwrap();
        let transport = HttpTransport::with_client(reqwest::Client::new(), "lan2rf.local", &config);
        assert_eq!(transport.base_url(), "http://lan2rf.local/protect/");
    }

    #[test]
    fn test_login_sent_as_basic_auth() {
        let config =
            GatewayConfig::with_login(Some("admin".to_string()), Some("intergas".to_string()))
                .unwrap();
        let transport = HttpTransport::new("192.168.0.1", &config).unwrap();
        let url = format!("{}{}", transport.base_url(), Request::HeaterList.path());
        let request = transport.prepare(&url).build().unwrap();

        assert_eq!(
            request.url().as_str(),
            "http://192.168.0.1/protect/heaterlist.json"
        );
        assert_eq!(
            request.headers()[AUTHORIZATION].to_str().unwrap(),
            "Basic YWRtaW46aW50ZXJnYXM="
        );
        assert_eq!(
            request.timeout(),
            Some(&Duration::from_millis(crate::DEFAULT_TIMEOUT_MS))
        );
    }

    #[test]
    fn test_no_login_sends_no_auth() {
        let transport = HttpTransport::new("192.168.0.1", &GatewayConfig::default()).unwrap();
        let request = transport
            .prepare("http://192.168.0.1/heaterlist.json")
            .build()
            .unwrap();

        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_gateway() {
        let config = GatewayConfig {
            timeout_ms: 2_000,
            ..Default::default()
        };
        let transport = HttpTransport::new("127.0.0.1:1", &config).unwrap();

        let error = transport.get(Request::HeaterList).await.unwrap_err();
        assert!(error.is_connection_error());
    }
}
