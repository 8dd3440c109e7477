use std::io::{self, Write};
use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use kanal::{AsyncReceiver, AsyncSender};
use snaptext_io::SystemClipboard;
use snaptext_ocr::{HotkeyAction, HotkeyBindings, HotkeyManager, OcrClient};
use snaptext_types::{AppEvent, SelectionRect};
use snaptext_ui::RegionSelector;
use tokio_util::sync::CancellationToken;

use crate::pipeline::{Pipeline, pipeline_loop};
use crate::state::AppState;

const HOTKEY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Every 5th second and each of the last five are announced
fn is_announced(remaining: u64) -> bool {
    remaining % 5 == 0 || remaining <= 5
}

/// Print the countdown to `out`, calling `tick` once per second of delay
pub fn write_countdown<W, F>(out: &mut W, seconds: u64, mut tick: F) -> io::Result<()>
where
    W: Write,
    F: FnMut(),
{
    writeln!(out, "Hotkeys activate in {seconds} seconds...")?;

    for remaining in (1..=seconds).rev() {
        if is_announced(remaining) {
            writeln!(out, "  {remaining}...")?;
        }
        tick();
    }

    writeln!(out, "  Hotkeys active!")
}

/// Block for `seconds` before hotkeys are registered
pub fn run_grace_delay(seconds: u64) {
    tracing::info!("Activating hotkeys in {} s", seconds);

    let mut stdout = io::stdout().lock();
    let printed = write_countdown(&mut stdout, seconds, || {
        thread::sleep(Duration::from_secs(1));
    });
    if let Err(e) = printed {
        tracing::warn!("Failed to print countdown: {}", e);
    }

    tracing::info!("Grace delay over");
}

/// Hand a finished selection to the pipeline.
///
/// Cancelled and too-small selections end the cycle here, releasing the
/// capture slot. Returns whether a capture was started.
pub fn dispatch_selection(
    state: &AppState,
    events: &AsyncSender<AppEvent>,
    selection: Option<SelectionRect>,
) -> bool {
    let Some(rect) = selection else {
        state.finish_capture();
        return false;
    };

    if !rect.exceeds(state.config.capture.min_selection_px) {
        tracing::debug!(
            "Selection {}x{} too small, ignored",
            rect.width(),
            rect.height()
        );
        state.finish_capture();
        return false;
    }

    match events.try_send(AppEvent::RegionSelected(rect)) {
        Ok(true) => true,
        Ok(false) => {
            tracing::warn!("Pipeline queue full, selection dropped");
            state.finish_capture();
            false
        }
        Err(e) => {
            tracing::error!("Pipeline is gone, selection dropped: {}", e);
            state.finish_capture();
            false
        }
    }
}

fn begin_capture(state: &AppState, selector: &RegionSelector) {
    if !state.try_begin_capture() {
        tracing::info!("Capture already in progress, hotkey ignored");
        return;
    }

    let opened = snaptext_ocr::virtual_desktop().and_then(|desktop| selector.open(desktop));
    if let Err(e) = opened {
        tracing::error!("Failed to open selection overlay: {:#}", e);
        println!("Could not start a capture: {e:#}");
        state.finish_capture();
    }
}

fn spawn_pipeline(
    state: Arc<AppState>,
    events: AsyncReceiver<AppEvent>,
    cancel: CancellationToken,
) -> Result<JoinHandle<Result<()>>> {
    let ocr = OcrClient::from_config(&state.config).context("Failed to build OCR client")?;

    thread::Builder::new()
        .name("snaptext-pipeline".to_string())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to build tokio runtime")?;

            let pipeline = Pipeline::new(state, ocr, SystemClipboard::open());
            runtime.block_on(pipeline_loop(pipeline, events, cancel))
        })
        .context("Failed to spawn pipeline thread")
}

/// Register hotkeys and serve them until the quit hotkey is pressed.
///
/// The UI event loop owns the main thread; capture cycles run one at a time
/// on the pipeline thread.
pub fn run(state: Arc<AppState>) -> Result<()> {
    let bindings = HotkeyBindings::parse(&state.config.hotkeys.capture, &state.config.hotkeys.quit)?;

    let (event_tx, event_rx) = kanal::bounded_async(4);
    let cancel = CancellationToken::new();
    let pipeline = spawn_pipeline(state.clone(), event_rx, cancel.child_token())?;

    let selector = {
        let state = state.clone();
        let event_tx = event_tx.clone();
        Rc::new(RegionSelector::new(move |selection| {
            dispatch_selection(&state, &event_tx, selection);
        })?)
    };

    let hotkeys = HotkeyManager::register(bindings)?;
    tracing::info!(
        "Hotkeys registered: capture {}, quit {}",
        state.config.hotkeys.capture,
        state.config.hotkeys.quit
    );

    let timer = slint::Timer::default();
    {
        let state = state.clone();
        let selector = selector.clone();
        timer.start(slint::TimerMode::Repeated, HOTKEY_POLL_INTERVAL, move || {
            match hotkeys.poll() {
                Some(HotkeyAction::Capture) => {
                    tracing::info!("Capture hotkey pressed");
                    begin_capture(&state, &selector);
                }
                Some(HotkeyAction::Quit) => {
                    tracing::info!("Quit hotkey pressed");
                    if let Err(e) = slint::quit_event_loop() {
                        tracing::error!("Failed to stop event loop: {}", e);
                    }
                }
                None => {}
            }
        });
    }

    slint::run_event_loop_until_quit().context("UI event loop failed")?;
    timer.stop();

    cancel.cancel();
    let _ = event_tx.try_send(AppEvent::Shutdown);

    // A request in flight runs to its timeout; don't wait for it
    if state.capture_in_flight() {
        tracing::warn!("Exiting with a capture still in progress");
        return Ok(());
    }

    match pipeline.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Pipeline exited with error: {:#}", e),
        Err(_) => tracing::error!("Pipeline thread panicked"),
    }

    Ok(())
}
