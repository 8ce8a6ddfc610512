//! Store-backed MarketDataRepository
//!
//! Comparables live in a collection keyed by the hash of their natural
//! key; reference prices are static and supplied at open time.

use souq_domain::model::{BasePrice, MarketComparable, MarketData};
use souq_domain::repository::MarketDataRepository;
use souq_store::{natural_key_hash, Collection, Store};
use souq_types::{Error, Result};

pub struct StoreMarketDataRepository {
    comparables: Collection<MarketComparable>,
    base_prices: Vec<BasePrice>,
}

impl StoreMarketDataRepository {
    pub fn open(store: &Store, base_prices: Vec<BasePrice>) -> Result<Self> {
        Ok(Self {
            comparables: store.collection("comparables")?,
            base_prices,
        })
    }

    pub fn comparable_key(comparable: &MarketComparable) -> String {
        let parts = comparable.natural_key();
        let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        natural_key_hash(&refs)
    }
}

impl MarketDataRepository for StoreMarketDataRepository {
    fn load(&self) -> std::result::Result<MarketData, Error> {
        Ok(MarketData {
            comparables: self.comparables.values()?,
            base_prices: self.base_prices.clone(),
        })
    }

    fn add_comparable(&self, comparable: &MarketComparable) -> std::result::Result<bool, Error> {
        let key = Self::comparable_key(comparable);
        self.comparables.insert_new(&key, comparable.clone())
    }

    fn comparables(&self) -> std::result::Result<Vec<(String, MarketComparable)>, Error> {
        Ok(self
            .comparables
            .values()?
            .into_iter()
            .map(|c| (Self::comparable_key(&c), c))
            .collect())
    }

    fn remove_comparable(&self, key: &str) -> std::result::Result<bool, Error> {
        Ok(self.comparables.remove(key)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use souq_types::{Governorate, VehicleCondition, VehicleMake};

    fn comparable(model: &str) -> MarketComparable {
        MarketComparable {
            make: VehicleMake::Hyundai,
            model: model.to_string(),
            year: 2019,
            condition: VehicleCondition::Good,
            mileage_km: 70_000,
            governorate: Governorate::Cairo,
            price: 650_000.0,
        }
    }

    #[test]
    fn test_identical_comparable_added_once() {
        let repo = StoreMarketDataRepository::open(&Store::in_memory(), vec![]).unwrap();
        assert!(repo.add_comparable(&comparable("Elantra")).unwrap());
        assert!(!repo.add_comparable(&comparable("elantra ")).unwrap());
        assert!(repo.add_comparable(&comparable("Tucson")).unwrap());
        assert_eq!(repo.load().unwrap().comparables.len(), 2);
    }

    #[test]
    fn test_base_prices_passed_through() {
        let base = BasePrice {
            make: VehicleMake::Hyundai,
            model: None,
            year: 2026,
            price: 1_200_000.0,
        };
        let repo = StoreMarketDataRepository::open(&Store::in_memory(), vec![base.clone()]).unwrap();
        assert_eq!(repo.load().unwrap().base_prices, vec![base]);
    }
}
