mod helpers;
mod ip_control;
mod rs232;
mod tv_pairing;
mod webos_client;
mod webos_connection;
