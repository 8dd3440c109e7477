use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use crate::cli::AutostartCommand;

/// Arguments the startup shortcut launches the executable with
pub const SHORTCUT_ARGS: &str = "--delay 1";
pub const SHORTCUT_NAME: &str = "Snaptext";

#[derive(Debug, thiserror::Error)]
pub enum AutostartError {
    #[error("Startup folder unavailable: {0}")]
    StartupFolderUnavailable(&'static str),

    #[error("Cannot determine the executable path")]
    ExecutablePath(#[source] io::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Shortcut command failed (exit code {code:?}): {stderr}")]
    ShortcutCommand { code: Option<i32>, stderr: String },

    #[error("Shortcut was not created at {0}")]
    ShortcutMissing(PathBuf),
}

#[derive(Debug, PartialEq, Eq)]
pub enum DisableOutcome {
    Disabled(PathBuf),
    NotEnabled,
}

/// "Run at login" registration. The shortcut file is the whole state.
pub trait Autostart {
    fn shortcut_path(&self) -> &Path;

    /// Create or overwrite the shortcut so it launches `target`
    fn enable(&self, target: &Path) -> Result<PathBuf, AutostartError>;

    fn disable(&self) -> Result<DisableOutcome, AutostartError> {
        let path = self.shortcut_path();
        match fs::remove_file(path) {
            Ok(()) => Ok(DisableOutcome::Disabled(path.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(DisableOutcome::NotEnabled),
            Err(source) => Err(AutostartError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn status(&self) -> bool {
        self.shortcut_path().is_file()
    }
}

fn create_parent(path: &Path) -> Result<(), AutostartError> {
    match path.parent() {
        Some(dir) => fs::create_dir_all(dir).map_err(|source| AutostartError::Io {
            path: dir.to_path_buf(),
            source,
        }),
        None => Ok(()),
    }
}

/// `.lnk` in the Windows per-user Startup folder, written by PowerShell
#[cfg_attr(not(windows), allow(dead_code))]
pub struct WindowsStartupShortcut {
    path: PathBuf,
}

#[cfg_attr(not(windows), allow(dead_code))]
impl WindowsStartupShortcut {
    /// The per-user Startup known folder
    #[cfg(windows)]
    pub fn locate() -> Result<Self, AutostartError> {
        startup_folder()
            .map(Self::in_dir)
            .ok_or(AutostartError::StartupFolderUnavailable(
                "the Startup known folder could not be resolved",
            ))
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(format!("{SHORTCUT_NAME}.lnk")),
        }
    }

    pub fn script(&self, target: &Path) -> String {
        let working_dir = target.parent().unwrap_or(target);
        format!(
            "$WshShell = New-Object -ComObject WScript.Shell\n\
             $Shortcut = $WshShell.CreateShortcut({})\n\
             $Shortcut.TargetPath = {}\n\
             $Shortcut.Arguments = {}\n\
             $Shortcut.WorkingDirectory = {}\n\
             $Shortcut.Description = {}\n\
             $Shortcut.Save()\n",
            ps_quote(&self.path.to_string_lossy()),
            ps_quote(&target.to_string_lossy()),
            ps_quote(SHORTCUT_ARGS),
            ps_quote(&working_dir.to_string_lossy()),
            ps_quote("Snaptext screen OCR"),
        )
    }
}

#[cfg(windows)]
fn startup_folder() -> Option<PathBuf> {
    use windows::Win32::System::Com::CoTaskMemFree;
    use windows::Win32::UI::Shell::{FOLDERID_Startup, KF_FLAG_DEFAULT, SHGetKnownFolderPath};

    unsafe {
        let raw = match SHGetKnownFolderPath(&FOLDERID_Startup, KF_FLAG_DEFAULT, None) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Startup folder lookup failed: {}", e);
                return None;
            }
        };
        let path = raw.to_string();
        CoTaskMemFree(Some(raw.0 as *const _));

        match path {
            Ok(path) => Some(PathBuf::from(path)),
            Err(e) => {
                tracing::warn!("Startup folder path is not valid UTF-16: {}", e);
                None
            }
        }
    }
}

/// Single-quoted PowerShell literal
#[cfg_attr(not(windows), allow(dead_code))]
fn ps_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl Autostart for WindowsStartupShortcut {
    fn shortcut_path(&self) -> &Path {
        &self.path
    }

    fn enable(&self, target: &Path) -> Result<PathBuf, AutostartError> {
        create_parent(&self.path)?;

        let output = Command::new("powershell")
            .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command"])
            .arg(self.script(target))
            .output()
            .map_err(|source| AutostartError::Io {
                path: PathBuf::from("powershell"),
                source,
            })?;

        if !output.status.success() {
            return Err(AutostartError::ShortcutCommand {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !self.status() {
            return Err(AutostartError::ShortcutMissing(self.path.clone()));
        }

        tracing::info!("Created startup shortcut {}", self.path.display());
        Ok(self.path.clone())
    }
}

/// freedesktop autostart entry
#[cfg_attr(windows, allow(dead_code))]
pub struct XdgAutostartEntry {
    path: PathBuf,
}

#[cfg_attr(windows, allow(dead_code))]
impl XdgAutostartEntry {
    /// `autostart/` under the user config directory
    #[cfg(not(windows))]
    pub fn locate() -> Result<Self, AutostartError> {
        Self::in_config_dir(dirs::config_dir())
    }

    pub fn in_config_dir(config_dir: Option<PathBuf>) -> Result<Self, AutostartError> {
        config_dir
            .map(|dir| Self::in_dir(dir.join("autostart")))
            .ok_or(AutostartError::StartupFolderUnavailable(
                "no user config directory",
            ))
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join("snaptext.desktop"),
        }
    }

    pub fn entry(target: &Path) -> String {
        format!(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name={SHORTCUT_NAME}\n\
             Comment=Screen region OCR\n\
             Exec={} {SHORTCUT_ARGS}\n\
             Terminal=false\n\
             X-GNOME-Autostart-enabled=true\n",
            exec_quote(&target.to_string_lossy())
        )
    }
}

/// Quoted argument for a desktop entry `Exec` key
#[cfg_attr(windows, allow(dead_code))]
fn exec_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '`' | '$' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

impl Autostart for XdgAutostartEntry {
    fn shortcut_path(&self) -> &Path {
        &self.path
    }

    fn enable(&self, target: &Path) -> Result<PathBuf, AutostartError> {
        create_parent(&self.path)?;
        fs::write(&self.path, Self::entry(target)).map_err(|source| AutostartError::Io {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!("Created autostart entry {}", self.path.display());
        Ok(self.path.clone())
    }
}

pub fn platform_autostart() -> Result<Box<dyn Autostart>, AutostartError> {
    #[cfg(windows)]
    {
        Ok(Box::new(WindowsStartupShortcut::locate()?))
    }

    #[cfg(not(windows))]
    {
        Ok(Box::new(XdgAutostartEntry::locate()?))
    }
}

/// Handle one of the autostart flags for this executable
pub fn run_command(command: AutostartCommand) -> ExitCode {
    let exe = env::current_exe().map_err(AutostartError::ExecutablePath);
    execute(command, platform_autostart(), exe, &mut io::stdout().lock())
}

/// Run `command`, write its status line to `out` and produce the exit code.
/// Check always succeeds; enable and disable fail on any error.
pub fn execute<W: Write>(
    command: AutostartCommand,
    autostart: Result<Box<dyn Autostart>, AutostartError>,
    exe: Result<PathBuf, AutostartError>,
    out: &mut W,
) -> ExitCode {
    let (line, code) = match command {
        AutostartCommand::Enable => {
            match autostart.and_then(|a| exe.and_then(|exe| a.enable(&exe))) {
                Ok(path) => (
                    format!("[OK] Autostart enabled: {}", path.display()),
                    ExitCode::SUCCESS,
                ),
                Err(e) => {
                    tracing::error!("Failed to enable autostart: {}", e);
                    (
                        format!("[ERROR] Failed to enable autostart: {e}"),
                        ExitCode::FAILURE,
                    )
                }
            }
        }
        AutostartCommand::Disable => match autostart.and_then(|a| a.disable()) {
            Ok(DisableOutcome::Disabled(path)) => (
                format!("[OK] Autostart disabled, removed {}", path.display()),
                ExitCode::SUCCESS,
            ),
            Ok(DisableOutcome::NotEnabled) => (
                "[NOT ENABLED] Autostart was not enabled".to_string(),
                ExitCode::SUCCESS,
            ),
            Err(e) => {
                tracing::error!("Failed to disable autostart: {}", e);
                (
                    format!("[ERROR] Failed to disable autostart: {e}"),
                    ExitCode::FAILURE,
                )
            }
        },
        AutostartCommand::Check => {
            let line = match autostart {
                Ok(a) if a.status() => format!(
                    "[ENABLED] Autostart is enabled: {}",
                    a.shortcut_path().display()
                ),
                Ok(_) => "[NOT ENABLED] Autostart is not enabled".to_string(),
                Err(e) => format!("[ERROR] Cannot check autostart: {e}"),
            };
            (line, ExitCode::SUCCESS)
        }
    };

    if let Err(e) = writeln!(out, "{line}") {
        tracing::warn!("Failed to print autostart status: {}", e);
    }
    code
}
