//! One `tvctl` invocation: load config, start logging, open a session when
//! the command needs one, run the command and tear everything down again.

use crate::cli::{Cli, Command};
use crate::error::TvctlError;
use crate::logger::initialize as LoggerInitialize;

use tv_core::config::{AppConfig, default_config_dir};
use tv_core::error::handler::HandlerError;
use tv_core::events::Subscription;
use tv_core::tv::{TvClient, TvOptions};
use tv_core::webos::ClientState;

use common::{ErrorLocation, RedactedSecret};

use std::fs::create_dir_all;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info};
use tokio::task::spawn_blocking;

/// How long a session may take to pair or re-register before giving up.
pub const READY_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn run(cli: Cli) -> Result<(), TvctlError> {
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => default_config_dir()?,
    };

    create_dir_all(&config_dir).map_err(|e| TvctlError::Tvctl {
        message: format!("Failed to create config directory {}: {e}", config_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    LoggerInitialize(&config_dir)?;
    info!("tvctl {} starting", env!("CARGO_PKG_VERSION"));

    let stored = AppConfig::load(&config_dir)?;
    let effective = with_host_override(stored.clone(), cli.host)?;
    let client = TvClient::new(TvOptions::try_from(&effective)?)?;

    if !cli.command.needs_session() {
        return execute(&client, cli.command).await;
    }

    // Keys are persisted into the stored config so a --host override never
    // ends up on disk
    let wiring = wire_session(&client, stored, config_dir);
    let outcome = run_session(&client, cli.command).await;

    client.close().await;
    drop(wiring);
    outcome
}

/// Apply the `--host` override and check the result.
pub fn with_host_override(mut config: AppConfig, host: Option<String>) -> Result<AppConfig, TvctlError> {
    if let Some(host) = host {
        debug!("Host overridden on the command line: {host}");
        config.tv.host = host;
    }

    config.validate()?;
    Ok(config)
}

async fn run_session(client: &TvClient, command: Command) -> Result<(), TvctlError> {
    client.connect().await?;
    client.wait_for_state(ClientState::Ready, READY_TIMEOUT).await?;
    execute(client, command).await
}

/// Authenticate on every (re)connect and persist keys the TV hands out.
pub(crate) fn wire_session(client: &TvClient, config: AppConfig, config_dir: PathBuf) -> Vec<Subscription> {
    let config = Arc::new(Mutex::new(config));

    let authenticator = client.clone();
    let stored = Arc::clone(&config);
    let on_authenticate = client.on_authenticate_requested().subscribe(move |()| {
        let client = authenticator.clone();
        let key = lock(&stored).client_key();
        async move {
            client
                .authenticate(key.as_ref())
                .await
                .map_err(HandlerError::from)
        }
    });

    let on_client_key = client.on_client_key_changed().subscribe(move |key: RedactedSecret| {
        let config = Arc::clone(&config);
        let config_dir = config_dir.clone();
        async move {
            // File writes stay off the runtime threads
            spawn_blocking(move || persist_client_key(&config, &config_dir, &key))
                .await
                .map_err(|e| HandlerError::failed(format!("Client key save task failed: {e}")))?
        }
    });

    vec![on_authenticate, on_client_key]
}

/// Store `key` unless it is already the configured one.
pub fn persist_client_key(
    config: &Mutex<AppConfig>,
    config_dir: &Path,
    key: &RedactedSecret,
) -> Result<(), HandlerError> {
    let mut config = lock(config);

    if config.client_key().as_ref() == Some(key) {
        debug!("TV confirmed the stored client key");
        return Ok(());
    }

    config.set_client_key(key);
    config.save(config_dir)?;
    info!("Stored new client key ({} characters)", key.len());
    Ok(())
}

fn lock(config: &Mutex<AppConfig>) -> MutexGuard<'_, AppConfig> {
    config.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn execute(client: &TvClient, command: Command) -> Result<(), TvctlError> {
    match command {
        Command::Pair => {
            println!("Paired with {}", client.options().address);
        }
        Command::Toast { message } => client.show_toast(&message).await?,
        Command::Volume { level } => client.set_volume(level).await?,
        Command::Mute { mute } => client.set_mute(mute).await?,
        Command::Off => client.turn_off().await?,
        Command::ScreenOn => client.screen_on().await?,
        Command::ScreenOff => client.screen_off().await?,
        Command::Launch { app_id } => client.launch_app(&app_id).await?,
        Command::Channel { number } => client.set_channel(number).await?,
        Command::Input { input } => client.switch_input(input.into()).await?,
        Command::Button { button } => client.press_button(button.into()).await?,
        Command::Screenshot => {
            let uri = client.screenshot().await?;
            println!("{uri}");
        }
        Command::Wake { mac } => client.wake_on_lan(&mac).await?,
    }

    Ok(())
}
