//! CLI utilities for binaries
//!
//! Handles environment variable configuration for all binary executables.

/// A setting the binaries read from the environment
#[derive(Debug, Clone)]
pub enum EnvSetting {
    /// Real-time endpoint URL (LIVELINE_URL)
    Endpoint,
    /// Handshake bearer token (LIVELINE_TOKEN)
    AuthToken,
    /// Snapshot panel refresh interval in milliseconds (LIVELINE_REFRESH_MS)
    RefreshMs,
    /// Custom variable with a fallback value
    Custom(String, String),
}

impl EnvSetting {
    /// Get the default value for this setting
    pub fn default_value(&self) -> &str {
        match self {
            EnvSetting::Endpoint => "ws://127.0.0.1:9001/socket",
            EnvSetting::AuthToken => "",
            EnvSetting::RefreshMs => "500",
            EnvSetting::Custom(_, fallback) => fallback,
        }
    }

    /// Get the environment variable name for this setting
    pub fn env_var_name(&self) -> &str {
        match self {
            EnvSetting::Endpoint => "LIVELINE_URL",
            EnvSetting::AuthToken => "LIVELINE_TOKEN",
            EnvSetting::RefreshMs => "LIVELINE_REFRESH_MS",
            EnvSetting::Custom(name, _) => name,
        }
    }
}

/// Load a setting from the environment or fall back to its default
///
/// # Examples
/// ```
/// use marketline::bin_common::{load_from_env, EnvSetting};
///
/// let url = load_from_env(EnvSetting::Endpoint);
/// ```
pub fn load_from_env(setting: EnvSetting) -> String {
    std::env::var(setting.env_var_name())
        .unwrap_or_else(|_| setting.default_value().to_string())
}
