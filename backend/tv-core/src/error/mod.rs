pub mod cipher;
pub mod config;
pub mod connection;
pub mod handler;
pub mod ip_control;
pub mod protocol;
pub mod rs232;
pub mod tv;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Connection(#[from] connection::ConnectionError),

    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),

    #[error(transparent)]
    Cipher(#[from] cipher::CipherError),

    #[error(transparent)]
    IpControl(#[from] ip_control::IpControlError),

    #[error(transparent)]
    Rs232(#[from] rs232::Rs232Error),

    #[error(transparent)]
    Tv(#[from] tv::TvError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}
