use std::path::PathBuf;

use serde::Deserialize;

use self::api::ApiConfig;
use self::capture::CaptureConfig;
use self::hotkey::HotkeyConfig;

pub mod api;
pub mod capture;
pub mod credential;
pub mod hotkey;
pub mod loader;

pub use credential::ApiKey;
pub use loader::ConfigLoader;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Key names looked up in the config file and the environment
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const DASHSCOPE_KEY_VAR: &str = "ALIYUN_DASHSCOPE_API_KEY";

pub const BASE_URL_VAR: &str = "SNAPTEXT_BASE_URL";
pub const MODEL_VAR: &str = "SNAPTEXT_MODEL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot locate the executable directory: {0}")]
    ExecutableDir(#[source] std::io::Error),

    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Resolved configuration, built once at startup by [`ConfigLoader`]
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api: ApiConfig,
    pub capture: CaptureConfig,
    pub hotkeys: HotkeyConfig,
    /// `None` means OCR requests are skipped
    pub credential: Option<ApiKey>,
    /// File the settings were read from, if it existed
    pub source: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(ConfigError::InvalidValue {
                field: "jpeg_quality",
                reason: format!("{} is outside 1..=100", self.capture.jpeg_quality),
            });
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }

        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "base_url",
                reason: "must not be empty".to_string(),
            });
        }

        if self.api.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "model",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// On-disk shape of `config.json`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    #[serde(rename = "OPENAI_API_KEY")]
    pub openai_api_key: Option<String>,
    #[serde(rename = "ALIYUN_DASHSCOPE_API_KEY")]
    pub dashscope_api_key: Option<String>,
    #[serde(flatten)]
    pub api: ApiConfig,
    #[serde(flatten)]
    pub capture: CaptureConfig,
    #[serde(flatten)]
    pub hotkeys: HotkeyConfig,
}
