pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod effects;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod store;

pub use db::create_pool;
