//! Infrastructure layer: storage-backed repositories, data loaders and seeding

pub mod persistence;
pub mod reference_prices;
pub mod seed;
pub mod seed_csv;

pub use persistence::Repositories;
