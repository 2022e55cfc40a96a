//! Settings file handling

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// CLI settings, loaded from `config.toml`
#[derive(Debug, Deserialize, Default)]
pub struct Settings {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Prompt/response conversation settings
    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// HTTP client settings
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    /// Timeout for a single request to Conjur
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_http_timeout() -> u64 {
    30
}

/// Timing for scripted prompt/response conversations
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ConversationConfig {
    /// Longest wait for any single prompt to appear
    #[serde(default = "default_prompt_timeout")]
    pub prompt_timeout_ms: u64,

    /// How often new output is checked for the expected prompt
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            prompt_timeout_ms: default_prompt_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_prompt_timeout() -> u64 {
    2_000
}
fn default_poll_interval() -> u64 {
    10
}

impl Settings {
    /// Load settings from the default settings file
    ///
    /// Returns default settings if the file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| super::Error::file_read(path, e))?;
        Self::parse(&content)
    }

    /// Parse settings from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings.http.timeout_secs, 30);
        assert_eq!(settings.conversation.prompt_timeout_ms, 2_000);
        assert_eq!(settings.conversation.poll_interval_ms, 10);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let settings = Settings::parse(
            r#"
            [conversation]
            prompt_timeout_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(settings.conversation.prompt_timeout_ms, 500);
        assert_eq!(settings.conversation.poll_interval_ms, 10);
        assert_eq!(settings.http.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn malformed_file_is_config_parse_error() {
        let err = Settings::parse("[http\ntimeout_secs = ").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigParse(_)));
    }
}
