pub mod access;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod gatekeeper;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod state;
pub mod store;

pub use router::build_router;
pub use state::AppState;
