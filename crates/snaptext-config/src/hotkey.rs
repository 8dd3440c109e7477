use serde::{Deserialize, Serialize};

fn default_capture() -> String {
    "ctrl+alt+a".to_string()
}

fn default_quit() -> String {
    "ctrl+alt+q".to_string()
}

/// Global key combinations, in `modifier+modifier+key` form
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HotkeyConfig {
    #[serde(default = "default_capture", rename = "capture_hotkey")]
    pub capture: String,
    #[serde(default = "default_quit", rename = "quit_hotkey")]
    pub quit: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            capture: default_capture(),
            quit: default_quit(),
        }
    }
}
