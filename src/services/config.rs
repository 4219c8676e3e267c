use crate::constants::{globals, network, outputs, protocols::ALLOWED_HTTP};
use crate::errors::BridgeError;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub base_url: String,
    pub bootstrap_path: String,
    pub token_global: String,
    pub entropy_global: String,
    pub output_prefix: String,
    pub timeout_ms: Option<u64>,
    pub user_agent: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: network::DEFAULT_BASE_URL.to_string(),
            bootstrap_path: network::BOOTSTRAP_PATH.to_string(),
            token_global: globals::TOKEN.to_string(),
            entropy_global: globals::ENTROPY.to_string(),
            output_prefix: outputs::DEFAULT_PREFIX.to_string(),
            timeout_ms: None,
            user_agent: network::USER_AGENT.to_string(),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl BridgeConfig {
    pub fn from_env() -> Result<Self, BridgeError> {
        let mut config = Self::default();
        if let Some(base_url) = env_string("SE_BRIDGE_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(path) = env_string("SE_BRIDGE_BOOTSTRAP_PATH") {
            config.bootstrap_path = path;
        }
        if let Some(name) = env_string("SE_BRIDGE_TOKEN_GLOBAL") {
            config.token_global = name;
        }
        if let Some(name) = env_string("SE_BRIDGE_ENTROPY_GLOBAL") {
            config.entropy_global = name;
        }
        if let Some(prefix) = env_string("SE_BRIDGE_OUTPUT_PREFIX") {
            config.output_prefix = prefix;
        }
        if let Some(raw) = env_string("SE_BRIDGE_TIMEOUT_MS") {
            let timeout = raw.parse::<u64>().map_err(|_| {
                BridgeError::configuration("SE_BRIDGE_TIMEOUT_MS must be a positive integer")
                    .with_details(serde_json::json!({"value": raw}))
            })?;
            config.timeout_ms = Some(timeout).filter(|v| *v > 0);
        }
        config.validate()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn validate(mut self) -> Result<Self, BridgeError> {
        let parsed = Url::parse(&self.base_url).map_err(|_| {
            BridgeError::configuration("Invalid base URL")
                .with_hint("Expected a valid URL, e.g. \"https://api.streamelements.com/kappa\".")
                .with_details(serde_json::json!({"base_url": self.base_url}))
        })?;
        let scheme = format!("{}:", parsed.scheme());
        if !ALLOWED_HTTP.contains(&scheme.as_str()) {
            return Err(
                BridgeError::configuration("Only http/https base URLs are supported")
                    .with_details(serde_json::json!({"base_url": self.base_url})),
            );
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self.bootstrap_path = self.bootstrap_path.trim_start_matches('/').to_string();
        Ok(self)
    }

    /// `<output_prefix>.<name>`
    pub fn output_key(&self, name: &str) -> String {
        format!("{}.{}", self.output_prefix, name)
    }
}
