use serde::{Deserialize, Serialize};

pub const DEFAULT_AUTH_URL: &str = "https://campus-auth-server.example.com";
pub const DEFAULT_COURSES_URL: &str = "https://campus-courses.example.com";
pub const DEFAULT_PAYMENTS_URL: &str = "https://campus-payments.example.com";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Read-only upstream configuration, established once at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub identity_base_url: String,
    pub course_base_url: String,
    pub payment_base_url: String,
    /// Legacy auth-server deployments expect the credential in `x-api-key`
    /// instead of `x-auth-token`.
    #[serde(default)]
    pub identity_legacy_auth: bool,
    /// Uniform timeout applied to every outbound upstream call.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            identity_base_url: DEFAULT_AUTH_URL.to_string(),
            course_base_url: DEFAULT_COURSES_URL.to_string(),
            payment_base_url: DEFAULT_PAYMENTS_URL.to_string(),
            identity_legacy_auth: false,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GatewayConfig {
    /// Loads configuration from the environment, falling back to the
    /// documented defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            identity_base_url: env_or("GATEWAY_AUTH_URL", DEFAULT_AUTH_URL),
            course_base_url: env_or("GATEWAY_COURSES_URL", DEFAULT_COURSES_URL),
            payment_base_url: env_or("GATEWAY_PAYMENTS_URL", DEFAULT_PAYMENTS_URL),
            identity_legacy_auth: env_flag("GATEWAY_AUTH_LEGACY_API_KEY"),
            request_timeout_secs: std::env::var("GATEWAY_TIMEOUT_SECS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).ok().as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}
