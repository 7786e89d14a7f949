//! Application State
//!
//! Watchlist folders and saved formulas, persisted together as one JSON file,
//! plus the environment configuration the binary starts from.

pub mod config;
pub mod state;
pub mod watchlist;

pub use config::DashboardConfig;
pub use state::AppState;
pub use watchlist::{Holding, Watchlist, Watchlists, DEFAULT_FOLDER};
