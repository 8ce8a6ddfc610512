//! Store-backed implementation of ListingRepository

use souq_domain::model::VehicleListing;
use souq_domain::repository::ListingRepository;
use souq_store::{Collection, Store};
use souq_types::{Error, Result};

pub struct StoreListingRepository {
    listings: Collection<VehicleListing>,
}

impl StoreListingRepository {
    pub fn open(store: &Store) -> Result<Self> {
        Ok(Self {
            listings: store.collection("listings")?,
        })
    }
}

impl ListingRepository for StoreListingRepository {
    fn save(&self, listing: &VehicleListing) -> std::result::Result<(), Error> {
        self.listings.upsert(&listing.id, listing.clone())?;
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> std::result::Result<Option<VehicleListing>, Error> {
        self.listings.get(id)
    }

    fn find_all(&self) -> std::result::Result<Vec<VehicleListing>, Error> {
        self.listings.values()
    }

    fn find_active(&self) -> std::result::Result<Vec<VehicleListing>, Error> {
        self.listings.filter(|l| l.is_active())
    }

    fn remove(&self, id: &str) -> std::result::Result<Option<VehicleListing>, Error> {
        self.listings.remove(id)
    }
}
