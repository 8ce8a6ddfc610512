//! Persistence implementations
//!
//! Repository traits backed by [`souq_store`] collections. The same code
//! serves the in-memory and the JSON-file backends.

mod store_barter_repo;
mod store_listing_repo;
mod store_market_data_repo;
mod store_profile_repo;

pub use store_barter_repo::{StoreBarterItemRepository, StoreBarterPreferenceRepository};
pub use store_listing_repo::StoreListingRepository;
pub use store_market_data_repo::StoreMarketDataRepository;
pub use store_profile_repo::StoreProfileRepository;

use std::sync::Arc;

use souq_domain::model::BasePrice;
use souq_domain::repository::{
    BarterItemRepository, BarterPreferenceRepository, ListingRepository, MarketDataRepository,
    UserProfileRepository,
};
use souq_store::Store;
use souq_types::Result;

/// Storage handle passed to services and request handlers
#[derive(Clone)]
pub struct Repositories {
    pub listings: Arc<dyn ListingRepository>,
    pub barter_items: Arc<dyn BarterItemRepository>,
    pub barter_preferences: Arc<dyn BarterPreferenceRepository>,
    pub profiles: Arc<dyn UserProfileRepository>,
    pub market_data: Arc<dyn MarketDataRepository>,
}

impl Repositories {
    /// Open every repository on `store`
    pub fn open(store: &Store, base_prices: Vec<BasePrice>) -> Result<Self> {
        Ok(Self {
            listings: Arc::new(StoreListingRepository::open(store)?),
            barter_items: Arc::new(StoreBarterItemRepository::open(store)?),
            barter_preferences: Arc::new(StoreBarterPreferenceRepository::open(store)?),
            profiles: Arc::new(StoreProfileRepository::open(store)?),
            market_data: Arc::new(StoreMarketDataRepository::open(store, base_prices)?),
        })
    }

    /// Fresh in-memory repositories
    pub fn in_memory(base_prices: Vec<BasePrice>) -> Result<Self> {
        Self::open(&Store::in_memory(), base_prices)
    }
}
