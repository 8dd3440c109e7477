use anyhow::{Context, Result};
use arboard::Clipboard;

/// Destination for recognized text
pub trait TextSink {
    fn publish(&mut self, text: &str) -> Result<()>;
}

/// System clipboard through arboard.
///
/// The handle is kept alive because on X11 the copied text is only served
/// while it exists.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<Clipboard>,
}

impl SystemClipboard {
    /// Opens the clipboard now; failure is retried on the next publish
    pub fn open() -> Self {
        match Clipboard::new() {
            Ok(clipboard) => Self {
                inner: Some(clipboard),
            },
            Err(e) => {
                tracing::warn!("Clipboard unavailable: {}", e);
                Self { inner: None }
            }
        }
    }

    fn handle(&mut self) -> Result<&mut Clipboard> {
        if self.inner.is_none() {
            self.inner = Some(Clipboard::new().context("Failed to open clipboard")?);
        }
        self.inner.as_mut().context("Clipboard handle missing")
    }
}

impl TextSink for SystemClipboard {
    fn publish(&mut self, text: &str) -> Result<()> {
        let result = self
            .handle()?
            .set_text(text.to_owned())
            .context("Failed to copy text to clipboard");

        if result.is_err() {
            // Drop a handle that may be stale so the next cycle reopens it
            self.inner = None;
        }
        result
    }
}
