use std::collections::HashMap;
use std::env;

use p2g_core::config::{AppConfig, ConfigError};

const BIND_ADDR_VAR: &str = "P2G_API_BIND_ADDR";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub app: AppConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup(BIND_ADDR_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        if !bind_addr.contains(':') {
            return Err(ConfigError::Invalid(format!(
                "{BIND_ADDR_VAR} must be a host:port address"
            )));
        }

        let app = AppConfig::from_lookup(&lookup)?;
        if !app.is_pipeline_configured() {
            return Err(ConfigError::Invalid(
                "P2G_DOWNLOAD_COMMAND and P2G_UPLOAD_COMMAND must be set to serve sync requests"
                    .to_string(),
            ));
        }

        Ok(Self { bind_addr, app })
    }
}
