pub mod assets;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod forum;
pub mod metadata;
pub mod models;
pub mod notify;
pub mod price;
pub mod subscribers;
