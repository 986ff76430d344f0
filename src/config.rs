//! Application configuration
//!
//! Loaded from the embedded config.toml; the relay URL can be overridden
//! through the environment (KIKIGAKI_PROXY_URL, also picked up from a
//! .env file).

use serde::Deserialize;

/// Environment variable overriding the relay base URL.
const PROXY_URL_VAR: &str = "KIKIGAKI_PROXY_URL";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub proxy: ProxyConfig,
    pub speech: SpeechConfig,
}

#[derive(Debug, Deserialize)]
pub struct ProxyConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeechConfig {
    /// Fixed source-language tag for recognition (BCP-47).
    pub language: String,
}

/// Load configuration from the embedded config.toml, applying the
/// environment override for the relay URL.
pub fn load() -> Result<Config, toml::de::Error> {
    const CONFIG_TOML: &str = include_str!("../config.toml");
    let mut config: Config = toml::from_str(CONFIG_TOML)?;

    if let Ok(url) = std::env::var(PROXY_URL_VAR) {
        if !url.trim().is_empty() {
            config.proxy.base_url = url;
        }
    }

    Ok(config)
}
