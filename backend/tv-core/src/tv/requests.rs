//! Request URIs and payloads of the application channel.

use const_format::concatcp;
use serde::{Deserialize, Serialize};

const SSAP: &str = "ssap://";

pub const SET_VOLUME: &str = concatcp!(SSAP, "audio/setVolume");
pub const SET_MUTE: &str = concatcp!(SSAP, "audio/setMute");
pub const VOLUME_UP: &str = concatcp!(SSAP, "audio/volumeUp");
pub const VOLUME_DOWN: &str = concatcp!(SSAP, "audio/volumeDown");

pub const CREATE_TOAST: &str = concatcp!(SSAP, "system.notifications/createToast");
pub const TURN_OFF: &str = concatcp!(SSAP, "system/turnOff");

const TV_POWER: &str = concatcp!(SSAP, "com.webos.service.tvpower/power/");
pub const SCREEN_ON: &str = concatcp!(TV_POWER, "turnOnScreen");
pub const SCREEN_OFF: &str = concatcp!(TV_POWER, "turnOffScreen");

pub const SYSTEM_LAUNCH: &str = concatcp!(SSAP, "system.launcher/launch");
pub const SYSTEM_CLOSE: &str = concatcp!(SSAP, "system.launcher/close");
pub const APP_LAUNCH: &str = concatcp!(SSAP, "com.webos.applicationManager/launch");

pub const OPEN_CHANNEL: &str = concatcp!(SSAP, "tv/openChannel");
pub const SWITCH_INPUT: &str = concatcp!(SSAP, "tv/switchInput");
pub const EXECUTE_ONE_SHOT: &str = concatcp!(SSAP, "tv/executeOneShot");

pub const BROWSER_APP_ID: &str = "com.webos.app.browser";
pub const LIVE_TV_APP_ID: &str = "com.webos.app.livetv";

#[derive(Debug, Clone, Serialize)]
pub struct SetVolumeRequest {
    pub volume: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetMuteRequest {
    pub mute: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateToastRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppRequest<'a> {
    pub id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaunchBrowserRequest<'a> {
    pub id: &'a str,
    pub target: &'a str,
    pub params: BrowserTarget<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrowserTarget<'a> {
    pub target: &'a str,
}

impl<'a> LaunchBrowserRequest<'a> {
    pub fn new(url: &'a str) -> Self {
        Self {
            id: BROWSER_APP_ID,
            target: url,
            params: BrowserTarget { target: url },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenChannelRequest {
    /// The device expects the number as a string.
    pub channel_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchInputRequest<'a> {
    pub input_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneShotResponse {
    pub image_uri: String,
}

/// Payload of requests without a body.
pub const NO_PAYLOAD: Option<()> = None;
