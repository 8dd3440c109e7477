use std::cell::Cell;
use std::rc::Rc;

use slint::ComponentHandle;
use snaptext_types::{CaptureRegion, SelectionRect};

use crate::SelectionOverlay;

/// Map logical overlay coordinates to physical virtual desktop pixels
pub fn to_desktop_rect(
    origin: CaptureRegion,
    scale: f32,
    start: (f32, f32),
    end: (f32, f32),
) -> SelectionRect {
    let to_physical = |(x, y): (f32, f32)| {
        (
            origin.x + (x * scale).round() as i32,
            origin.y + (y * scale).round() as i32,
        )
    };
    SelectionRect::from_corners(to_physical(start), to_physical(end))
}

/// Reports the outcome of each opened selection exactly once
pub struct Completion {
    pending: Cell<bool>,
    on_finish: Box<dyn Fn(Option<SelectionRect>)>,
}

impl Completion {
    pub fn new(on_finish: impl Fn(Option<SelectionRect>) + 'static) -> Self {
        Self {
            pending: Cell::new(false),
            on_finish: Box::new(on_finish),
        }
    }

    /// A selection was opened and awaits an outcome
    pub fn arm(&self) {
        self.pending.set(true);
    }

    /// Deliver the outcome. Ignored when nothing is pending.
    pub fn finish(&self, selection: Option<SelectionRect>) {
        if self.pending.replace(false) {
            (self.on_finish)(selection);
        }
    }

    /// The window was closed by the window manager (Alt+F4 and the like)
    pub fn close_requested(&self) -> slint::CloseRequestResponse {
        tracing::debug!("[SLINT] Overlay closed by the window manager");
        self.finish(None);
        slint::CloseRequestResponse::HideWindow
    }
}

/// The single overlay window, shown once per capture request
pub struct RegionSelector {
    overlay: SelectionOverlay,
    origin: Rc<Cell<CaptureRegion>>,
    completion: Rc<Completion>,
}

impl RegionSelector {
    /// `on_finish` gets the selection, or `None` when Escape was pressed or
    /// the window was closed. The overlay is already hidden when it runs.
    pub fn new<F>(on_finish: F) -> anyhow::Result<Self>
    where
        F: Fn(Option<SelectionRect>) + 'static,
    {
        let overlay = SelectionOverlay::new()?;
        let origin = Rc::new(Cell::new(CaptureRegion {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        }));
        let completion = Rc::new(Completion::new(on_finish));

        {
            let overlay_weak = overlay.as_weak();
            let origin = origin.clone();
            let completion = completion.clone();
            overlay.on_selected(move |x1, y1, x2, y2| {
                let Some(overlay) = overlay_weak.upgrade() else {
                    return;
                };
                let scale = overlay.window().scale_factor();
                let rect = to_desktop_rect(origin.get(), scale, (x1, y1), (x2, y2));

                if let Err(e) = overlay.hide() {
                    tracing::warn!("[SLINT] Failed to hide overlay: {}", e);
                }
                tracing::debug!("[SLINT] Selected {:?}", rect);
                completion.finish(Some(rect));
            });
        }

        {
            let overlay_weak = overlay.as_weak();
            let completion = completion.clone();
            overlay.on_cancelled(move || {
                if let Some(overlay) = overlay_weak.upgrade()
                    && let Err(e) = overlay.hide()
                {
                    tracing::warn!("[SLINT] Failed to hide overlay: {}", e);
                }
                tracing::debug!("[SLINT] Selection cancelled");
                completion.finish(None);
            });
        }

        {
            let completion = completion.clone();
            overlay
                .window()
                .on_close_requested(move || completion.close_requested());
        }

        Ok(Self {
            overlay,
            origin,
            completion,
        })
    }

    /// Cover `desktop` with the overlay and start tracking the mouse
    pub fn open(&self, desktop: CaptureRegion) -> anyhow::Result<()> {
        self.origin.set(desktop);
        self.overlay.set_dragging(false);

        let window = self.overlay.window();
        window.set_position(slint::PhysicalPosition::new(desktop.x, desktop.y));
        window.set_size(slint::PhysicalSize::new(desktop.width, desktop.height));

        self.overlay.show()?;
        self.completion.arm();
        tracing::debug!("[SLINT] Overlay shown over {:?}", desktop);
        Ok(())
    }
}
