use crate::cli::{ButtonArg, Cli, Command, InputArg};

use tv_core::tv::{TvButton, TvInput};

use std::path::PathBuf;

use clap::Parser;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("tvctl").chain(args.iter().copied()))
}

#[test]
fn given_global_flags_after_subcommand_when_parsed_then_applied() {
    let cli = parse(&["toast", "Hello there", "--host", "192.168.1.20", "--config-dir", "/tmp/tv"]).unwrap();

    assert_eq!(cli.host.as_deref(), Some("192.168.1.20"));
    assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/tv")));
    assert_eq!(
        cli.command,
        Command::Toast {
            message: String::from("Hello there")
        }
    );
}

#[test]
fn given_volume_out_of_range_when_parsed_then_rejected() {
    assert!(parse(&["volume", "101"]).is_err());
    assert_eq!(parse(&["volume", "100"]).unwrap().command, Command::Volume { level: 100 });
}

#[test]
fn given_mute_values_when_parsed_then_explicit_bool() {
    assert_eq!(parse(&["mute", "true"]).unwrap().command, Command::Mute { mute: true });
    assert_eq!(parse(&["mute", "false"]).unwrap().command, Command::Mute { mute: false });
    assert!(parse(&["mute"]).is_err());
}

#[test]
fn given_kebab_case_names_when_parsed_then_map_to_core_types() {
    let Command::Input { input } = parse(&["input", "live-tv"]).unwrap().command else {
        panic!("Expected input command");
    };
    assert_eq!(input, InputArg::LiveTv);
    assert_eq!(TvInput::from(input), TvInput::LiveTv);

    let Command::Button { button } = parse(&["button", "channel-up"]).unwrap().command else {
        panic!("Expected button command");
    };
    assert_eq!(button, ButtonArg::ChannelUp);
    assert_eq!(TvButton::from(button), TvButton::ChannelUp);
}

/// **VALUE**: Side-channel and Wake-on-LAN commands work while the TV is off
/// or unpaired.
///
/// **BUG THIS CATCHES**: Routing `wake` through the application channel would
/// wait 30 seconds for a TV that cannot answer before it is woken.
#[test]
fn given_commands_when_checking_session_need_then_only_application_channel_needs_one() {
    assert!(!parse(&["wake", "aa:bb:cc:dd:ee:ff"]).unwrap().command.needs_session());
    assert!(!parse(&["button", "enter"]).unwrap().command.needs_session());
    assert!(parse(&["pair"]).unwrap().command.needs_session());
    assert!(parse(&["screenshot"]).unwrap().command.needs_session());
    assert!(parse(&["channel", "7"]).unwrap().command.needs_session());
}
