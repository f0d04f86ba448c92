pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod expenses;
pub mod repo;
pub mod reports;
pub mod state;
pub mod web;

pub use app::build_app;
pub use state::AppState;
