//! Input and key identifiers understood by the IP-control channel.

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};

/// Source selectable with `INPUT_SELECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpControlInput {
    Dtv,
    Atv,
    CadTv,
    Catv,
    Avav1,
    Component1,
    Hdmi1,
    Hdmi2,
    Hdmi3,
}

impl IpControlInput {
    pub fn identifier(self) -> &'static str {
        match self {
            IpControlInput::Dtv => "dtv",
            IpControlInput::Atv => "atv",
            IpControlInput::CadTv => "cadtv",
            IpControlInput::Catv => "catv",
            IpControlInput::Avav1 => "avav1",
            IpControlInput::Component1 => "component1",
            IpControlInput::Hdmi1 => "hdmi1",
            IpControlInput::Hdmi2 => "hdmi2",
            IpControlInput::Hdmi3 => "hdmi3",
        }
    }
}

impl Display for IpControlInput {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.identifier())
    }
}

/// Remote-control key sent with `KEY_ACTION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpControlKey {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Ok,
    ReturnBack,
    ChannelUp,
    ChannelDown,
    VolumeUp,
    VolumeDown,
    SettingMenu,
}

impl IpControlKey {
    pub fn code(self) -> &'static str {
        match self {
            IpControlKey::ArrowUp => "arrowup",
            IpControlKey::ArrowDown => "arrowdown",
            IpControlKey::ArrowLeft => "arrowleft",
            IpControlKey::ArrowRight => "arrowright",
            IpControlKey::Ok => "ok",
            IpControlKey::ReturnBack => "returnback",
            IpControlKey::ChannelUp => "channelup",
            IpControlKey::ChannelDown => "channeldown",
            IpControlKey::VolumeUp => "volumeup",
            IpControlKey::VolumeDown => "volumedown",
            IpControlKey::SettingMenu => "settingmenu",
        }
    }
}

impl Display for IpControlKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.code())
    }
}
