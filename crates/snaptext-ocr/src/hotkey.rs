use anyhow::{Context, Result};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState, hotkey::HotKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    Capture,
    Quit,
}

/// Parsed capture and quit combinations
#[derive(Debug, Clone, Copy)]
pub struct HotkeyBindings {
    pub capture: HotKey,
    pub quit: HotKey,
}

impl HotkeyBindings {
    /// Parse strings like `ctrl+alt+a`
    pub fn parse(capture: &str, quit: &str) -> Result<Self> {
        let capture_key: HotKey = capture
            .parse()
            .with_context(|| format!("Invalid capture hotkey '{capture}'"))?;
        let quit_key: HotKey = quit
            .parse()
            .with_context(|| format!("Invalid quit hotkey '{quit}'"))?;

        anyhow::ensure!(
            capture_key.id() != quit_key.id(),
            "Capture and quit hotkeys are both '{}'",
            capture
        );

        Ok(Self {
            capture: capture_key,
            quit: quit_key,
        })
    }

    pub fn action_for(&self, id: u32) -> Option<HotkeyAction> {
        if id == self.capture.id() {
            Some(HotkeyAction::Capture)
        } else if id == self.quit.id() {
            Some(HotkeyAction::Quit)
        } else {
            None
        }
    }
}

/// Keeps both hotkeys registered for as long as it lives
pub struct HotkeyManager {
    manager: GlobalHotKeyManager,
    bindings: HotkeyBindings,
}

impl HotkeyManager {
    pub fn register(bindings: HotkeyBindings) -> Result<Self> {
        let manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;

        manager
            .register(bindings.capture)
            .context("Failed to register capture hotkey")?;
        manager
            .register(bindings.quit)
            .context("Failed to register quit hotkey")?;

        Ok(Self { manager, bindings })
    }

    /// Next pending press of one of our hotkeys (non-blocking).
    /// Key releases and foreign ids are drained and ignored.
    pub fn poll(&self) -> Option<HotkeyAction> {
        let receiver = GlobalHotKeyEvent::receiver();
        while let Ok(event) = receiver.try_recv() {
            if event.state != HotKeyState::Pressed {
                continue;
            }

            match self.bindings.action_for(event.id) {
                Some(action) => return Some(action),
                None => tracing::debug!("Ignoring unknown hotkey id {}", event.id),
            }
        }
        None
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        let _ = self.manager.unregister(self.bindings.capture);
        let _ = self.manager.unregister(self.bindings.quit);
    }
}
