use crate::ip_control::IpControlKey;
use crate::rs232::Rs232Command;

use serde::{Deserialize, Serialize};

/// Remote-control button, independent of the channel used to press it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TvButton {
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

impl TvButton {
    pub fn ip_control_key(self) -> IpControlKey {
        match self {
            TvButton::ChannelUp => IpControlKey::ChannelUp,
            TvButton::ChannelDown => IpControlKey::ChannelDown,
            TvButton::VolumeUp => IpControlKey::VolumeUp,
            TvButton::VolumeDown => IpControlKey::VolumeDown,
            TvButton::Left => IpControlKey::ArrowLeft,
            TvButton::Right => IpControlKey::ArrowRight,
            TvButton::Up => IpControlKey::ArrowUp,
            TvButton::Down => IpControlKey::ArrowDown,
            TvButton::Menu => IpControlKey::SettingMenu,
            TvButton::Enter => IpControlKey::Ok,
            TvButton::Back => IpControlKey::ReturnBack,
        }
    }

    pub fn rs232_command(self) -> Rs232Command {
        match self {
            TvButton::ChannelUp => Rs232Command::ChannelUp,
            TvButton::ChannelDown => Rs232Command::ChannelDown,
            TvButton::VolumeUp => Rs232Command::VolumeUp,
            TvButton::VolumeDown => Rs232Command::VolumeDown,
            TvButton::Left => Rs232Command::Left,
            TvButton::Right => Rs232Command::Right,
            TvButton::Up => Rs232Command::Up,
            TvButton::Down => Rs232Command::Down,
            TvButton::Menu => Rs232Command::Menu,
            TvButton::Enter => Rs232Command::Enter,
            TvButton::Back => Rs232Command::Back,
        }
    }
}

/// Input reachable through the application channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TvInput {
    LiveTv,
    Hdmi1,
    Hdmi2,
    Hdmi3,
}

impl TvInput {
    /// `inputId` for `ssap://tv/switchInput`. Live TV is an app launch instead.
    pub fn input_id(self) -> Option<&'static str> {
        match self {
            TvInput::LiveTv => None,
            TvInput::Hdmi1 => Some("HDMI_1"),
            TvInput::Hdmi2 => Some("HDMI_2"),
            TvInput::Hdmi3 => Some("HDMI_3"),
        }
    }
}
