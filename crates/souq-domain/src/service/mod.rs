//! Domain services

pub mod barter_matcher;
pub mod price_estimator;
pub mod recommender;

pub use barter_matcher::{find_chains, verify_chain};
pub use price_estimator::{deal_ratio, estimate_price};
pub use recommender::recommend;
