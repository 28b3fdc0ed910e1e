pub mod commands;
pub mod config;
pub mod delivery;
pub mod http;
