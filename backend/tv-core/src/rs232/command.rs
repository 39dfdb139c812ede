use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};

/// Remote-control command on the plain serial-over-IP channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rs232Command {
    ChannelUp,
    ChannelDown,
    VolumeUp,
    VolumeDown,
    Left,
    Right,
    Up,
    Down,
    Menu,
    Enter,
    Back,
}

impl Rs232Command {
    /// Wire text, without the line terminator.
    pub fn text(self) -> &'static str {
        match self {
            Rs232Command::ChannelUp => "mc 1 00",
            Rs232Command::ChannelDown => "mc 1 01",
            Rs232Command::VolumeUp => "mc 1 02",
            Rs232Command::VolumeDown => "mc 1 03",
            Rs232Command::Right => "mc 1 06",
            Rs232Command::Left => "mc 1 07",
            Rs232Command::Back => "mc 1 28",
            Rs232Command::Up => "mc 1 40",
            Rs232Command::Down => "mc 1 41",
            Rs232Command::Menu => "mc 1 43",
            Rs232Command::Enter => "mc 1 44",
        }
    }
}

impl Display for Rs232Command {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.text())
    }
}
