use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT},
    Client, Response, StatusCode,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use pifire_common::{
    BridgeConfig, DeviceRequest, API_CURRENT, API_HOPPER, HISTORY_REFRESH, REFERER_DASH,
    REFERER_EVENTS, REFERER_HISTORY,
};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection-level failure: refused, DNS, or timed out.
    #[error("device unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
    #[error("Error: {0}")]
    Device(u16),
    #[error("invalid device payload: {0}")]
    Malformed(#[source] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("base url {0:?} cannot be used in request headers")]
    InvalidHeader(String),
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Result of one poll cycle, shaped so the state owner can apply it uniformly.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Fetched {
        device: Value,
        hopper: Option<Value>,
    },
    Unreachable,
    Failed(String),
}

/// HTTP access to one device. Immutable once built; a server change builds a
/// new client instead of mutating this one.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: Client,
    base_url: String,
    control_timeout: Duration,
    history_timeout: Duration,
    dash_headers: HeaderMap,
    history_headers: HeaderMap,
}

impl DeviceClient {
    pub fn new(base_url: String, config: &BridgeConfig) -> Result<Self, ClientError> {
        let mut defaults = HeaderMap::new();
        defaults.insert(USER_AGENT, header_value(&config.user_agent)?);
        defaults.insert(ACCEPT, HeaderValue::from_static("*/*"));
        defaults.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );
        defaults.insert(REFERER, header_value(&format!("{base_url}{REFERER_EVENTS}"))?);

        let mut dash_headers = HeaderMap::new();
        dash_headers.insert(REFERER, header_value(&format!("{base_url}{REFERER_DASH}"))?);
        dash_headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        let mut history_headers = HeaderMap::new();
        history_headers.insert(REFERER, header_value(&format!("{base_url}{REFERER_HISTORY}"))?);
        history_headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        history_headers.insert(ORIGIN, header_value(&base_url)?);

        // The device serves a self-signed certificate on the LAN.
        let http = Client::builder()
            .default_headers(defaults)
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            http,
            base_url,
            control_timeout: Duration::from_millis(config.control_timeout_ms),
            history_timeout: Duration::from_millis(config.history_timeout_ms),
            dash_headers,
            history_headers,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    pub async fn fetch_status(&self) -> Result<Value, FetchError> {
        let response = self
            .http
            .get(self.url(API_CURRENT))
            .timeout(self.control_timeout)
            .send()
            .await
            .map_err(FetchError::Unreachable)?;

        read_json(ensure_accepted(response)?).await
    }

    /// Best-effort companion fetch; any failure just omits hopper data.
    pub async fn fetch_hopper(&self) -> Option<Value> {
        let result = match self
            .http
            .get(self.url(API_HOPPER))
            .timeout(self.control_timeout)
            .send()
            .await
        {
            Ok(response) => match ensure_accepted(response) {
                Ok(response) => read_json(response).await,
                Err(err) => Err(err),
            },
            Err(err) => Err(FetchError::Unreachable(err)),
        };

        match result {
            Ok(hopper) => Some(hopper),
            Err(err) => {
                debug!("hopper fetch skipped: {err}");
                None
            }
        }
    }

    pub async fn poll(&self) -> PollOutcome {
        match self.fetch_status().await {
            Ok(device) => PollOutcome::Fetched {
                device,
                hopper: self.fetch_hopper().await,
            },
            Err(FetchError::Unreachable(err)) => {
                debug!("status fetch failed at transport level: {err}");
                PollOutcome::Unreachable
            }
            Err(err) => PollOutcome::Failed(err.to_string()),
        }
    }

    pub async fn post(&self, request: &DeviceRequest) -> Result<(), FetchError> {
        let response = self
            .http
            .post(self.url(request.endpoint))
            .headers(self.dash_headers.clone())
            .json(&request.body)
            .timeout(self.control_timeout)
            .send()
            .await
            .map_err(FetchError::Unreachable)?;

        ensure_accepted(response).map(|_| ())
    }

    /// Fire-and-forget: failures are logged and never retried.
    pub async fn send_command(&self, request: &DeviceRequest) {
        debug!("POST {} {}", request.endpoint, request.body);
        if let Err(err) = self.post(request).await {
            warn!("command to {} failed: {err}", request.endpoint);
        }
    }

    /// Writes settings, then triggers the device to reload them. The trigger is
    /// sent even when the settings write fails; neither call is rolled back.
    pub async fn send_settings_then_trigger(
        &self,
        settings: &DeviceRequest,
        trigger: &DeviceRequest,
    ) {
        self.send_command(settings).await;
        self.send_command(trigger).await;
    }

    pub async fn fetch_history(&self, minutes: u32) -> Result<Value, FetchError> {
        let response = self
            .http
            .post(self.url(HISTORY_REFRESH))
            .headers(self.history_headers.clone())
            .json(&json!({"num_mins": minutes.to_string()}))
            .timeout(self.history_timeout)
            .send()
            .await
            .map_err(FetchError::Unreachable)?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Device(response.status().as_u16()));
        }
        read_json(response).await
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(raw).map_err(|_| ClientError::InvalidHeader(raw.to_string()))
}

fn ensure_accepted(response: Response) -> Result<Response, FetchError> {
    match response.status() {
        StatusCode::OK | StatusCode::CREATED => Ok(response),
        status => Err(FetchError::Device(status.as_u16())),
    }
}

async fn read_json(response: Response) -> Result<Value, FetchError> {
    response.json::<Value>().await.map_err(|err| {
        if err.is_timeout() {
            FetchError::Unreachable(err)
        } else {
            FetchError::Malformed(err)
        }
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode as StubStatus;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::testing::{closed_port_url, DeviceStub};
    use pifire_common::{CommandIntent, CommandPlan, API_CONTROL, API_SETTINGS};

    fn client(base_url: String) -> DeviceClient {
        DeviceClient::new(base_url, &BridgeConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn poll_returns_status_and_hopper() {
        let stub = DeviceStub::default();
        stub.set_current(json!({"status": {"mode": "Smoke"}})).await;
        stub.set_hopper(json!({"hopper_level": 70, "hopper_pellets": "Oak"})).await;
        let base_url = stub.spawn().await;

        let outcome = client(base_url).poll().await;

        assert_eq!(
            outcome,
            PollOutcome::Fetched {
                device: json!({"status": {"mode": "Smoke"}}),
                hopper: Some(json!({"hopper_level": 70, "hopper_pellets": "Oak"})),
            }
        );
    }

    #[tokio::test]
    async fn hopper_failure_is_swallowed() {
        let stub = DeviceStub::default();
        stub.set_hopper_status(StubStatus::INTERNAL_SERVER_ERROR).await;
        let base_url = stub.spawn().await;

        match client(base_url).poll().await {
            PollOutcome::Fetched { hopper, .. } => assert_eq!(hopper, None),
            other => panic!("expected a fetched cycle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_success_status_is_a_device_error() {
        let stub = DeviceStub::default();
        stub.set_current_status(StubStatus::SERVICE_UNAVAILABLE).await;
        let base_url = stub.spawn().await;
        let client = client(base_url);

        match client.fetch_status().await {
            Err(FetchError::Device(503)) => {}
            other => panic!("expected a 503 device error, got {other:?}"),
        }
        assert_eq!(
            client.poll().await,
            PollOutcome::Failed("Error: 503".to_string())
        );
    }

    #[tokio::test]
    async fn created_counts_as_success() {
        let stub = DeviceStub::default();
        stub.set_current_status(StubStatus::CREATED).await;
        let base_url = stub.spawn().await;

        assert!(client(base_url).fetch_status().await.is_ok());
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let base_url = closed_port_url().await;

        assert_eq!(client(base_url).poll().await, PollOutcome::Unreachable);
    }

    #[tokio::test]
    async fn slow_status_reply_times_out_as_unreachable() {
        let stub = DeviceStub::default();
        stub.set_current(json!({"status": {"mode": "Smoke"}})).await;
        stub.set_current_delay(Duration::from_millis(1_500)).await;
        let base_url = stub.spawn().await;
        let config = BridgeConfig {
            control_timeout_ms: 100,
            ..BridgeConfig::default()
        };
        let client = DeviceClient::new(base_url, &config).unwrap();

        match client.fetch_status().await {
            Err(FetchError::Unreachable(err)) => assert!(err.is_timeout()),
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert_eq!(client.poll().await, PollOutcome::Unreachable);
    }

    #[tokio::test]
    async fn commands_post_json_with_dash_referer() {
        let stub = DeviceStub::default();
        let base_url = stub.spawn().await;
        let client = client(base_url.clone());

        let CommandPlan::Single(request) = CommandIntent::SetTargetTemp(225).plan() else {
            panic!("target temperature is a single request");
        };
        client.send_command(&request).await;

        let received = stub.received().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].path, API_CONTROL);
        assert_eq!(received[0].referer, format!("{base_url}/dash/"));
        assert_eq!(
            received[0].body,
            json!({"updated": true, "mode": "Hold", "primary_setpoint": 225})
        );
    }

    #[tokio::test]
    async fn trigger_follows_failed_settings_write() {
        let stub = DeviceStub::default();
        stub.set_post_status(API_SETTINGS, StubStatus::INTERNAL_SERVER_ERROR)
            .await;
        let base_url = stub.spawn().await;

        let CommandPlan::SettingsThenTrigger { settings, trigger } =
            CommandIntent::SetPMode(3).plan()
        else {
            panic!("p-mode is a two-step request");
        };
        client(base_url)
            .send_settings_then_trigger(&settings, &trigger)
            .await;

        let paths: Vec<(String, Value)> = stub
            .received()
            .await
            .into_iter()
            .map(|request| (request.path, request.body))
            .collect();
        assert_eq!(
            paths,
            vec![
                (API_SETTINGS.to_string(), json!({"cycle_data": {"PMode": 3}})),
                (API_CONTROL.to_string(), json!({"settings_update": true})),
            ]
        );
    }

    #[tokio::test]
    async fn command_to_unreachable_device_does_not_panic() {
        let base_url = closed_port_url().await;
        let CommandPlan::Single(request) = CommandIntent::SetTargetTemp(200).plan() else {
            panic!("target temperature is a single request");
        };

        client(base_url.clone()).send_command(&request).await;
        assert!(matches!(
            client(base_url).post(&request).await,
            Err(FetchError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn history_request_sends_minutes_as_text() {
        let stub = DeviceStub::default();
        stub.set_history(json!({"chart_data": []})).await;
        let base_url = stub.spawn().await;

        let raw = client(base_url.clone()).fetch_history(30).await.unwrap();

        assert_eq!(raw, json!({"chart_data": []}));
        let received = stub.received().await;
        assert_eq!(received[0].path, HISTORY_REFRESH);
        assert_eq!(received[0].body, json!({"num_mins": "30"}));
        assert_eq!(received[0].referer, format!("{base_url}/history/"));
    }

    #[test]
    fn rejects_base_urls_that_are_not_header_safe() {
        let result = DeviceClient::new("http://bad\nhost".to_string(), &BridgeConfig::default());
        assert!(matches!(result, Err(ClientError::InvalidHeader(_))));
    }
}
