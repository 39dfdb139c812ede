mod cipher;
mod config;
mod dispatch;
mod events;
mod requests;
mod wake;
