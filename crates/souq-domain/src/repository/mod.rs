//! Repository trait definitions for data persistence
//!
//! One trait per entity so the storage backend can be swapped without
//! touching services. Implementations must be shareable across request
//! handlers, hence the `Send + Sync` bounds.

use crate::model::{
    BarterItem, BarterPreference, ItemStatus, MarketComparable, MarketData, UserProfile,
    VehicleListing,
};
use souq_types::Error;

/// Repository for vehicle listings
pub trait ListingRepository: Send + Sync {
    /// Insert or replace a listing
    fn save(&self, listing: &VehicleListing) -> Result<(), Error>;

    fn find_by_id(&self, id: &str) -> Result<Option<VehicleListing>, Error>;

    /// All listings, any status
    fn find_all(&self) -> Result<Vec<VehicleListing>, Error>;

    /// Listings currently for sale
    fn find_active(&self) -> Result<Vec<VehicleListing>, Error>;

    fn remove(&self, id: &str) -> Result<Option<VehicleListing>, Error>;
}

/// Repository for barter items
pub trait BarterItemRepository: Send + Sync {
    fn save(&self, item: &BarterItem) -> Result<(), Error>;

    fn find_by_id(&self, id: &str) -> Result<Option<BarterItem>, Error>;

    fn find_all(&self) -> Result<Vec<BarterItem>, Error>;

    /// Items still open for matching
    fn find_available(&self) -> Result<Vec<BarterItem>, Error>;

    fn find_by_owner(&self, owner: &str) -> Result<Vec<BarterItem>, Error>;

    /// Change an item's status. Returns the updated item, or `None` if absent.
    fn set_status(&self, id: &str, status: ItemStatus) -> Result<Option<BarterItem>, Error>;

    /// Move every item in `ids` to `status` as one change, provided all of
    /// them are still available. Fails with `Conflict` if any is not, and
    /// with `NotFound` if any is absent; nothing changes in either case.
    fn set_status_if_available(
        &self,
        ids: &[&str],
        status: ItemStatus,
    ) -> Result<Vec<BarterItem>, Error>;

    fn remove(&self, id: &str) -> Result<Option<BarterItem>, Error>;
}

/// Repository for barter preferences (one per user)
pub trait BarterPreferenceRepository: Send + Sync {
    fn save(&self, preference: &BarterPreference) -> Result<(), Error>;

    fn find_by_user(&self, user: &str) -> Result<Option<BarterPreference>, Error>;

    fn find_all(&self) -> Result<Vec<BarterPreference>, Error>;
}

/// Repository for user profiles
pub trait UserProfileRepository: Send + Sync {
    fn save(&self, profile: &UserProfile) -> Result<(), Error>;

    fn find_by_user(&self, user: &str) -> Result<Option<UserProfile>, Error>;

    fn find_all(&self) -> Result<Vec<UserProfile>, Error>;

    /// Read-modify-write of one profile, creating an empty one if absent.
    /// Concurrent updates of the same user are applied one after another.
    fn update(
        &self,
        user: &str,
        f: &mut dyn FnMut(&mut UserProfile),
    ) -> Result<UserProfile, Error>;
}

/// Repository for market evidence used by the pricing estimator
pub trait MarketDataRepository: Send + Sync {
    /// Comparables plus reference prices
    fn load(&self) -> Result<MarketData, Error>;

    /// Record a comparable. Returns `false` if an identical one exists.
    fn add_comparable(&self, comparable: &MarketComparable) -> Result<bool, Error>;

    fn comparables(&self) -> Result<Vec<(String, MarketComparable)>, Error>;

    fn remove_comparable(&self, key: &str) -> Result<bool, Error>;
}
