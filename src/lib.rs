pub mod catalog;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod routes;
pub mod state;
