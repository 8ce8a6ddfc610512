//! Marketplace domain: models, algorithms and repository traits
//!
//! The services in [`service`] are pure functions over in-memory data.
//! Persistence is reached only through the traits in [`repository`].

pub mod model;
pub mod repository;
pub mod service;
