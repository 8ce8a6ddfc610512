//! Dependency wiring for the persistence layer

use souq_domain::model::BasePrice;
use souq_infra::{reference_prices, Repositories};
use souq_store::Store;
use souq_types::Result;

use crate::config::{Config, StoreLocation};

/// Open the store selected by `DATABASE_URL` or the configured store dir
pub fn open_store(config: &Config) -> Result<Store> {
    match config.store_location()? {
        StoreLocation::Memory => Ok(Store::in_memory()),
        StoreLocation::Dir(dir) => Store::open(dir),
    }
}

/// Reference prices from the configured TOML, or the built-in table
pub fn load_base_prices(config: &Config) -> Result<Vec<BasePrice>> {
    reference_prices::load(config.market_data_path.as_deref())
}

/// Open every repository for `config`
pub fn open_repositories(config: &Config) -> Result<Repositories> {
    let store = open_store(config)?;
    let base_prices = load_base_prices(config)?;
    tracing::debug!(
        persistent = store.is_persistent(),
        base_prices = base_prices.len(),
        "opened repositories"
    );
    Repositories::open(&store, base_prices)
}

