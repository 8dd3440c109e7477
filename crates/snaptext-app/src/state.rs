use std::sync::atomic::{AtomicBool, Ordering};

use snaptext_config::Config;

pub struct AppState {
    pub config: Config,
    /// Set from the capture hotkey until the cycle it started is over
    capture_in_flight: AtomicBool,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            capture_in_flight: AtomicBool::new(false),
        }
    }

    /// Claim the single capture slot. `false` if a cycle is already running.
    pub fn try_begin_capture(&self) -> bool {
        self.capture_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn finish_capture(&self) {
        self.capture_in_flight.store(false, Ordering::SeqCst);
    }

    pub fn capture_in_flight(&self) -> bool {
        self.capture_in_flight.load(Ordering::SeqCst)
    }
}
