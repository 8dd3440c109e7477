use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug)]
#[command(
    name = "snaptext",
    version,
    about = "Select a screen region, recognize its text with a vision model and copy it to the clipboard"
)]
#[command(group(ArgGroup::new("autostart").multiple(false)))]
pub struct Cli {
    /// Start automatically at login
    #[arg(long, group = "autostart")]
    pub enable_autostart: bool,

    /// Stop starting automatically at login
    #[arg(long, group = "autostart")]
    pub disable_autostart: bool,

    /// Report whether autostart is enabled
    #[arg(long, group = "autostart")]
    pub check_autostart: bool,

    /// Keep the console window visible
    #[arg(long)]
    pub no_hide: bool,

    /// Activate hotkeys immediately
    #[arg(long)]
    pub no_delay: bool,

    /// Seconds to wait before activating hotkeys
    #[arg(long, value_name = "SECONDS", default_value_t = 1)]
    pub delay: u64,

    /// Config file (default: config.json next to the executable)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutostartCommand {
    Enable,
    Disable,
    Check,
}

impl Cli {
    pub fn autostart_command(&self) -> Option<AutostartCommand> {
        if self.enable_autostart {
            Some(AutostartCommand::Enable)
        } else if self.disable_autostart {
            Some(AutostartCommand::Disable)
        } else if self.check_autostart {
            Some(AutostartCommand::Check)
        } else {
            None
        }
    }

    /// Seconds to wait before hotkeys go live, `None` to skip the countdown
    pub fn grace_delay(&self) -> Option<u64> {
        if self.no_delay || self.delay == 0 {
            None
        } else {
            Some(self.delay)
        }
    }
}
