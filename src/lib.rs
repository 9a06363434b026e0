pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod server;
pub mod sql;
pub mod state;
pub mod token;

pub use server::router;
pub use state::AppState;
