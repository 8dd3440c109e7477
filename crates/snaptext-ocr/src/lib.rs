mod capture;
mod client;
mod encode;
mod error;
mod hotkey;
mod response;

pub use capture::{capture_screen_region, monitor_bounds, stitch, virtual_desktop};
pub use client::{ChatRequest, ChatTransport, HttpTransport, OcrClient};
pub use encode::{EncodedImage, encode_jpeg_base64};
pub use error::OcrError;
pub use hotkey::{HotkeyAction, HotkeyBindings, HotkeyManager};
pub use response::extract_text;
