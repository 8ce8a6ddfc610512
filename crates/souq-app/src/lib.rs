//! Application service layer - use cases, config, HTTP API, export

pub mod app;
pub mod config;
pub mod export;
pub mod http;
pub mod repository;
pub mod smoke;
