//! Pairing (`register`) payload.
//!
//! The manifest below is the vendor's reference remote-app manifest. The TV
//! checks the signature against the `signed` block, so every string in it has
//! to be sent exactly as it appears here.

use serde::Serialize;

const PAIRING_TYPE_PROMPT: &str = "PROMPT";
const MANIFEST_VERSION: u64 = 1;
const APP_VERSION: &str = "1.1";
const SIGNATURE_VERSION: u64 = 1;

const SIGNED_CREATED: &str = "20140509";
const SIGNED_APP_ID: &str = "com.lge.test";
const SIGNED_VENDOR_ID: &str = "com.lge";
const SIGNED_SERIAL: &str = "2f930e2d2cfe083771f68e4fe7bb07";

const SIGNATURE: &str = "eyJhbGdvcml0aG0iOiJSU0EtU0hBMjU2Iiwia2V5SWQiOiJ0ZXN0LXNpZ25pbmctY2VydCIsInNpZ25hdHVyZVZlcnNpb24iOjF9.hrVRgjCwXVvE2OOSpDZ58hR+59aFNwYDyjQgKk3auukd7pcegmE2CzPCa0bJ0ZsRAcKkCTJrWo5iDzNhMBWRyaMOv5zWSrthlf7G128qvIlpMT0YNY+n/FaOHE73uLrS/g7swl3/qH/BGFG2Hu4RlL48eb3lLKqTt2xKHdCs6Cd4RMfJPYnzgvI4BNrFUKsjkcu+WD4OO2A27Pq1n50cMchmcaXadJhGrOqH5YmHdOCj5NSHzJYrsW0HPlpuAx/ECMeIZYDh6RMqaFM2DXzdKX9NmmyqzJ3o/0lkk/N97gfVRLW5hA29yeAwaCViZNCP8iC9aO0q9fQojoa7NQnAtw==";

const SIGNED_PERMISSIONS: [&str; 16] = [
    "TEST_SECURE",
    "CONTROL_INPUT_TEXT",
    "CONTROL_MOUSE_AND_KEYBOARD",
    "READ_INSTALLED_APPS",
    "READ_LGE_SDX",
    "READ_NOTIFICATIONS",
    "SEARCH",
    "WRITE_SETTINGS",
    "WRITE_NOTIFICATION_ALERT",
    "CONTROL_POWER",
    "READ_CURRENT_CHANNEL",
    "READ_RUNNING_APPS",
    "READ_UPDATE_INFO",
    "UPDATE_FROM_REMOTE_APP",
    "READ_LGE_TV_INPUT_EVENTS",
    "READ_TV_CURRENT_TIME",
];

const PERMISSIONS: [&str; 52] = [
    "LAUNCH",
    "LAUNCH_WEBAPP",
    "APP_TO_APP",
    "CLOSE",
    "TEST_OPEN",
    "TEST_PROTECTED",
    "CONTROL_AUDIO",
    "CONTROL_DISPLAY",
    "CONTROL_INPUT_JOYSTICK",
    "CONTROL_INPUT_MEDIA_RECORDING",
    "CONTROL_INPUT_MEDIA_PLAYBACK",
    "CONTROL_INPUT_TV",
    "CONTROL_POWER",
    "READ_APP_STATUS",
    "READ_CURRENT_CHANNEL",
    "READ_INPUT_DEVICE_LIST",
    "READ_NETWORK_STATE",
    "READ_RUNNING_APPS",
    "READ_TV_CHANNEL_LIST",
    "WRITE_NOTIFICATION_TOAST",
    "READ_POWER_STATE",
    "READ_COUNTRY_INFO",
    "READ_SETTINGS",
    "CONTROL_TV_SCREEN",
    "CONTROL_TV_STANBY",
    "CONTROL_FAVORITE_GROUP",
    "CONTROL_USER_INFO",
    "CHECK_BLUETOOTH_DEVICE",
    "CONTROL_BLUETOOTH",
    "CONTROL_TIMER_INFO",
    "STB_INTERNAL_CONNECTION",
    "CONTROL_RECORDING",
    "READ_RECORDING_STATE",
    "WRITE_RECORDING_LIST",
    "READ_RECORDING_LIST",
    "READ_RECORDING_SCHEDULE",
    "WRITE_RECORDING_SCHEDULE",
    "READ_STORAGE_DEVICE_LIST",
    "READ_TV_PROGRAM_INFO",
    "CONTROL_BOX_CHANNEL",
    "READ_TV_ACR_AUTH_TOKEN",
    "READ_TV_CONTENT_STATE",
    "READ_TV_CURRENT_TIME",
    "ADD_LAUNCHER_CHANNEL",
    "SET_CHANNEL_SKIP",
    "RELEASE_CHANNEL_SKIP",
    "CONTROL_CHANNEL_BLOCK",
    "DELETE_SELECT_CHANNEL",
    "CONTROL_CHANNEL_GROUP",
    "SCAN_TV_CHANNELS",
    "CONTROL_TV_POWER",
    "CONTROL_WOL",
];

/// Payload of the `register` envelope.
///
/// An empty `client_key` asks the TV to show the pairing prompt; a key from a
/// previous `registered` response skips it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PairingRequest<'a> {
    force_pairing: bool,
    pairing_type: &'static str,
    manifest: Manifest,
    #[serde(rename = "client-key")]
    client_key: &'a str,
}

impl<'a> PairingRequest<'a> {
    pub(crate) fn new(client_key: &'a str) -> Self {
        Self {
            force_pairing: false,
            pairing_type: PAIRING_TYPE_PROMPT,
            manifest: Manifest::default(),
            client_key,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    manifest_version: u64,
    app_version: &'static str,
    signed: SignedBlock,
    permissions: &'static [&'static str],
    signatures: [Signature; 1],
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            manifest_version: MANIFEST_VERSION,
            app_version: APP_VERSION,
            signed: SignedBlock::default(),
            permissions: &PERMISSIONS,
            signatures: [Signature {
                signature_version: SIGNATURE_VERSION,
                signature: SIGNATURE,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedBlock {
    created: &'static str,
    app_id: &'static str,
    vendor_id: &'static str,
    localized_app_names: LocalizedAppNames,
    localized_vendor_names: LocalizedVendorNames,
    permissions: &'static [&'static str],
    serial: &'static str,
}

impl Default for SignedBlock {
    fn default() -> Self {
        Self {
            created: SIGNED_CREATED,
            app_id: SIGNED_APP_ID,
            vendor_id: SIGNED_VENDOR_ID,
            localized_app_names: LocalizedAppNames {
                default: "LG Remote App",
                ko_kr: "리모컨 앱",
                zxx_xx: "ЛГ Rэмotэ AПП",
            },
            localized_vendor_names: LocalizedVendorNames {
                default: "LG Electronics",
            },
            permissions: &SIGNED_PERMISSIONS,
            serial: SIGNED_SERIAL,
        }
    }
}

#[derive(Debug, Serialize)]
struct LocalizedAppNames {
    #[serde(rename = "")]
    default: &'static str,
    #[serde(rename = "ko-KR")]
    ko_kr: &'static str,
    #[serde(rename = "zxx-XX")]
    zxx_xx: &'static str,
}

#[derive(Debug, Serialize)]
struct LocalizedVendorNames {
    #[serde(rename = "")]
    default: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Signature {
    signature_version: u64,
    signature: &'static str,
}
