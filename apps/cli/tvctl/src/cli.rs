//! Command-line surface of `tvctl`.

use tv_core::tv::{TvButton, TvInput};

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "tvctl")]
#[command(version)]
#[command(about = "Control an LG webOS TV over the local network")]
pub struct Cli {
    /// Directory holding config.json and tvctl.log
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// TV address, overriding the configured host for this run
    #[arg(long, global = true)]
    pub host: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Pair with the TV and store the issued client key
    Pair,
    /// Show a notification bubble
    Toast { message: String },
    /// Set the absolute volume
    Volume {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
        level: u8,
    },
    Mute {
        #[arg(action = ArgAction::Set)]
        mute: bool,
    },
    /// Power the TV off
    Off,
    ScreenOn,
    ScreenOff,
    Launch { app_id: String },
    Channel { number: u32 },
    Input {
        #[arg(value_enum)]
        input: InputArg,
    },
    /// Press a remote button over the enabled side channels
    Button {
        #[arg(value_enum)]
        button: ButtonArg,
    },
    /// Capture the screen and print the image URI
    Screenshot,
    /// Send a Wake-on-LAN packet
    Wake { mac: String },
}

impl Command {
    /// Whether the command goes over the application channel and so needs a
    /// paired, ready session.
    pub fn needs_session(&self) -> bool {
        !matches!(self, Command::Button { .. } | Command::Wake { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputArg {
    LiveTv,
    Hdmi1,
    Hdmi2,
    Hdmi3,
}

impl From<InputArg> for TvInput {
    fn from(input: InputArg) -> Self {
        match input {
            InputArg::LiveTv => TvInput::LiveTv,
            InputArg::Hdmi1 => TvInput::Hdmi1,
            InputArg::Hdmi2 => TvInput::Hdmi2,
            InputArg::Hdmi3 => TvInput::Hdmi3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ButtonArg {
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

impl From<ButtonArg> for TvButton {
    fn from(button: ButtonArg) -> Self {
        match button {
            ButtonArg::ChannelUp => TvButton::ChannelUp,
            ButtonArg::ChannelDown => TvButton::ChannelDown,
            ButtonArg::VolumeUp => TvButton::VolumeUp,
            ButtonArg::VolumeDown => TvButton::VolumeDown,
            ButtonArg::Left => TvButton::Left,
            ButtonArg::Right => TvButton::Right,
            ButtonArg::Up => TvButton::Up,
            ButtonArg::Down => TvButton::Down,
            ButtonArg::Menu => TvButton::Menu,
            ButtonArg::Enter => TvButton::Enter,
            ButtonArg::Back => TvButton::Back,
        }
    }
}
