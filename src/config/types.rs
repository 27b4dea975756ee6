use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub appliance: ApplianceConfig,
    #[serde(default)]
    pub defaults: Defaults,
}

/// Connection settings for the appliance's configuration API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplianceConfig {
    /// Host, `host:port`, or full base URL (e.g. "https://10.0.0.1").
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_username")]
    pub username: String,
    /// Password for `username`. Prefer `NS_PASSWORD` over storing it here.
    #[serde(default)]
    pub password: Option<String>,
    /// Whole-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Connection timeout in seconds (default: 5).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
}

/// Values applied to objects the manager creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Namespace used when the caller does not name one.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Service type for services and load balancers (default: "HTTP").
    #[serde(default = "default_service_type")]
    pub service_type: String,
}

fn default_username() -> String {
    "nsroot".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_service_type() -> String {
    "HTTP".to_string()
}

impl ApplianceConfig {
    /// Base URL of the appliance; bare hosts are assumed to speak plain HTTP.
    pub fn base_url(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_seconds))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_seconds))
    }
}

impl Default for ApplianceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            username: default_username(),
            password: None,
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            service_type: default_service_type(),
        }
    }
}
