pub mod auth;
pub mod backup;
pub mod bus;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod render;
pub mod server;

pub use server::{app, AppState, StartupError, Wiki};

#[cfg(test)]
pub mod testing;
