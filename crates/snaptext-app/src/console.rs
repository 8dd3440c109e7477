/// Hide the console window this process was started from
#[cfg(windows)]
pub fn hide_console() {
    use windows::Win32::System::Console::GetConsoleWindow;
    use windows::Win32::UI::WindowsAndMessaging::{SW_HIDE, ShowWindow};

    unsafe {
        let hwnd = GetConsoleWindow();
        if hwnd.is_invalid() {
            tracing::debug!("No console window to hide");
            return;
        }
        let _ = ShowWindow(hwnd, SW_HIDE);
    }
    tracing::info!("Console window hidden");
}

#[cfg(not(windows))]
pub fn hide_console() {
    tracing::debug!("Console hiding is only supported on Windows");
}
