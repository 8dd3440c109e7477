use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string()
}

fn default_model() -> String {
    "qwen3-vl-plus".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_prompt() -> String {
    "Recognize all text in the image and output only the text itself, \
     without any explanation or Markdown formatting."
        .to_string()
}

/// Chat completion endpoint settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    /// OpenAI-compatible base URL, `/chat/completions` is appended
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Instruction sent next to the image
    #[serde(default = "default_prompt")]
    pub prompt: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            prompt: default_prompt(),
        }
    }
}
