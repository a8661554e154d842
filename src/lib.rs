pub mod app;
pub mod auction;
pub mod config;
pub mod database;
pub mod error;
pub mod game;
pub mod handlers;
pub mod notifier;
pub mod query;
pub mod scheduler;
pub mod store;
