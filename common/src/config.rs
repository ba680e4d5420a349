use serde::{Deserialize, Serialize};

pub const PIFIRE_BASE_URL: &str = "http://pifire.local";
pub const LOCALHOST_BASE_URL: &str = "http://localhost";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    pub poll_interval_ms: u64,
    pub control_timeout_ms: u64,
    pub history_timeout_ms: u64,
    pub history_sample_interval_ms: u64,
    pub user_agent: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            control_timeout_ms: 2_000,
            history_timeout_ms: 5_000,
            history_sample_interval_ms: 1_000,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:146.0) Gecko/20100101 Firefox/146.0"
                .to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn sanitize(&mut self) {
        self.poll_interval_ms = self.poll_interval_ms.max(10);
        self.control_timeout_ms = self.control_timeout_ms.max(100);
        self.history_timeout_ms = self.history_timeout_ms.max(100);
        self.history_sample_interval_ms = self.history_sample_interval_ms.max(100);
        if self.user_agent.trim().is_empty() {
            self.user_agent = Self::default().user_agent;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerSelection {
    #[default]
    Pifire,
    Localhost,
    #[serde(other)]
    Custom,
}

impl ServerSelection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pifire => "pifire",
            Self::Localhost => "localhost",
            Self::Custom => "custom",
        }
    }

    /// Unrecognised names select a custom address.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pifire" => Self::Pifire,
            "localhost" => Self::Localhost,
            _ => Self::Custom,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server_selection: ServerSelection,
    #[serde(default)]
    pub custom_ip: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_selection: ServerSelection::Pifire,
            custom_ip: "192.168.1.100".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self) -> String {
        match self.server_selection {
            ServerSelection::Pifire => PIFIRE_BASE_URL.to_string(),
            ServerSelection::Localhost => LOCALHOST_BASE_URL.to_string(),
            ServerSelection::Custom => {
                let host = self.custom_ip.trim();
                if host.is_empty() {
                    return PIFIRE_BASE_URL.to_string();
                }

                let url = if host.starts_with("http://") || host.starts_with("https://") {
                    host.to_string()
                } else {
                    format!("http://{host}")
                };
                url.trim_end_matches('/').to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub server: ServerConfig,
}
