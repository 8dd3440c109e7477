pub mod clipboard;

pub use clipboard::{SystemClipboard, TextSink};
