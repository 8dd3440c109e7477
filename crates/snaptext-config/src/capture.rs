use serde::{Deserialize, Serialize};

fn default_jpeg_quality() -> u16 {
    75
}

fn default_min_selection_px() -> u32 {
    5
}

fn default_settle_ms() -> u64 {
    150
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CaptureConfig {
    /// JPEG quality, 1..=100. Wider type so out-of-range values reach validation.
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u16,
    /// Selections whose width or height is not above this are dropped
    #[serde(default = "default_min_selection_px")]
    pub min_selection_px: u32,
    /// Wait after the overlay closes so it is not part of the capture
    #[serde(default = "default_settle_ms", rename = "capture_settle_ms")]
    pub settle_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
            min_selection_px: default_min_selection_px(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl CaptureConfig {
    /// Quality for the encoder, clamped to 1..=100
    pub fn encoder_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100) as u8
    }
}
