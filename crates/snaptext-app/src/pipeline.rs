use std::sync::Arc;
use std::time::Duration;

use kanal::AsyncReceiver;
use snaptext_config::Config;
use snaptext_io::TextSink;
use snaptext_ocr::{ChatTransport, EncodedImage, OcrClient, OcrError};
use snaptext_types::{AppEvent, SelectionRect};
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

#[derive(Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Text recognized and placed on the clipboard
    Copied(String),
    /// Text recognized, but only printed
    CopyFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("Capture failed: {0:#}")]
    Capture(anyhow::Error),

    #[error(transparent)]
    Ocr(#[from] OcrError),
}

/// One capture cycle: grab -> encode -> recognize -> clipboard
pub struct Pipeline<T, S> {
    state: Arc<AppState>,
    ocr: OcrClient<T>,
    sink: S,
}

impl<T: ChatTransport, S: TextSink> Pipeline<T, S> {
    pub fn new(state: Arc<AppState>, ocr: OcrClient<T>, sink: S) -> Self {
        Self { state, ocr, sink }
    }

    pub async fn run_cycle(&mut self, rect: SelectionRect) -> Result<CycleOutcome, CycleError> {
        // Nothing to send the capture to
        if !self.ocr.has_credential() {
            return Err(OcrError::MissingCredential.into());
        }

        let capture = self.state.config.capture.clone();
        if capture.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(capture.settle_ms)).await;
        }

        let region = rect.region();
        tracing::info!(
            "Capturing {}x{} at ({}, {})",
            region.width,
            region.height,
            region.x,
            region.y
        );

        let payload = tokio::task::spawn_blocking(move || {
            let image = snaptext_ocr::capture_screen_region(region)?;
            snaptext_ocr::encode_jpeg_base64(&image, capture.encoder_quality())
        })
        .await
        .map_err(|e| CycleError::Capture(e.into()))?
        .map_err(CycleError::Capture)?;

        self.recognize_and_publish(&payload).await
    }

    pub async fn recognize_and_publish(
        &mut self,
        payload: &EncodedImage,
    ) -> Result<CycleOutcome, CycleError> {
        println!("Recognizing text...");
        let text = self.ocr.recognize(payload).await?;
        println!("Recognized text:\n{text}");

        match self.sink.publish(&text) {
            Ok(()) => {
                tracing::info!("Copied recognized text to clipboard");
                println!("\nCopied to clipboard.");
                Ok(CycleOutcome::Copied(text))
            }
            Err(e) => {
                tracing::warn!("Clipboard copy failed: {:#}", e);
                println!("\nCould not copy to clipboard, please copy the text above manually.");
                Ok(CycleOutcome::CopyFailed(text))
            }
        }
    }

    pub fn report_failure(&self, error: &CycleError) {
        report_failure(error, &self.state.config);
    }
}

/// Print a diagnostic for a failed cycle. Never fatal.
pub fn report_failure(error: &CycleError, config: &Config) {
    match error {
        CycleError::Capture(e) => {
            tracing::error!("Capture failed: {:#}", e);
            println!("Screen capture failed: {e:#}");
        }
        CycleError::Ocr(OcrError::MissingCredential) => {
            tracing::warn!("OCR skipped, no API key configured");
            println!(
                "No API key configured, skipping OCR. Set ALIYUN_DASHSCOPE_API_KEY or \
                 OPENAI_API_KEY in config.json or the environment."
            );
        }
        CycleError::Ocr(e) if e.is_transport() => {
            tracing::error!("OCR request failed: {}", e);
            let masked = config
                .credential
                .as_ref()
                .map(|k| k.masked())
                .unwrap_or_else(|| "not set".to_string());
            println!("OCR request failed: {e}");
            println!("API key: {masked}");
            println!("Base URL: {}", config.api.base_url);
            println!("Model: {}", config.api.model);
            println!("Suggestions:");
            println!("  1. Check the network connection");
            println!("  2. Verify the API key");
        }
        CycleError::Ocr(OcrError::MalformedResponse { snippet }) => {
            tracing::error!("Malformed OCR response: {}", snippet);
            println!("Could not extract recognized text from the API response.");
            println!("Response start: {snippet}");
        }
        CycleError::Ocr(OcrError::EmptyResult) => {
            tracing::warn!("Recognized text is empty, clipboard left unchanged");
            println!("No text recognized, nothing copied.");
        }
        CycleError::Ocr(e) => {
            tracing::error!("OCR failed: {}", e);
            println!("OCR failed: {e}");
        }
    }
}

/// Runs cycles one at a time until shutdown. The capture slot is released
/// after every cycle whatever its result.
pub async fn pipeline_loop<T, S>(
    mut pipeline: Pipeline<T, S>,
    events: AsyncReceiver<AppEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()>
where
    T: ChatTransport,
    S: TextSink,
{
    tracing::info!("[PIPELINE] Waiting for selections");
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event?,
        };

        match event {
            AppEvent::RegionSelected(rect) => {
                match pipeline.run_cycle(rect).await {
                    Ok(outcome) => tracing::debug!("[PIPELINE] Cycle finished: {:?}", outcome),
                    Err(e) => pipeline.report_failure(&e),
                }
                pipeline.state.finish_capture();
            }
            AppEvent::Shutdown => break,
        }
    }

    tracing::info!("[PIPELINE] Stopping");
    Ok(())
}
