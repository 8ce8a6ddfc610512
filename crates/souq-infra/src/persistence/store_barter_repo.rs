//! Store-backed barter item and preference repositories

use souq_domain::model::{BarterItem, BarterPreference, ItemStatus};
use souq_domain::repository::{BarterItemRepository, BarterPreferenceRepository};
use souq_store::{Collection, Store};
use souq_types::{Error, Result};

pub struct StoreBarterItemRepository {
    items: Collection<BarterItem>,
}

impl StoreBarterItemRepository {
    pub fn open(store: &Store) -> Result<Self> {
        Ok(Self {
            items: store.collection("barter_items")?,
        })
    }
}

impl BarterItemRepository for StoreBarterItemRepository {
    fn save(&self, item: &BarterItem) -> std::result::Result<(), Error> {
        self.items.upsert(&item.id, item.clone())?;
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> std::result::Result<Option<BarterItem>, Error> {
        self.items.get(id)
    }

    fn find_all(&self) -> std::result::Result<Vec<BarterItem>, Error> {
        self.items.values()
    }

    fn find_available(&self) -> std::result::Result<Vec<BarterItem>, Error> {
        self.items.filter(|i| i.is_available())
    }

    fn find_by_owner(&self, owner: &str) -> std::result::Result<Vec<BarterItem>, Error> {
        self.items.filter(|i| i.owner == owner)
    }

    fn set_status(
        &self,
        id: &str,
        status: ItemStatus,
    ) -> std::result::Result<Option<BarterItem>, Error> {
        self.items.update(id, |item| item.status = status)
    }

    fn set_status_if_available(
        &self,
        ids: &[&str],
        status: ItemStatus,
    ) -> std::result::Result<Vec<BarterItem>, Error> {
        let updated = self.items.update_all(ids, |item| {
            if !item.is_available() {
                return Err(Error::Conflict(format!(
                    "item {} is {:?}",
                    item.id, item.status
                )));
            }
            item.status = status;
            Ok(())
        })?;
        updated.ok_or_else(|| Error::not_found(format!("barter items {}", ids.join(", "))))
    }

    fn remove(&self, id: &str) -> std::result::Result<Option<BarterItem>, Error> {
        self.items.remove(id)
    }
}

pub struct StoreBarterPreferenceRepository {
    preferences: Collection<BarterPreference>,
}

impl StoreBarterPreferenceRepository {
    pub fn open(store: &Store) -> Result<Self> {
        Ok(Self {
            preferences: store.collection("barter_preferences")?,
        })
    }
}

impl BarterPreferenceRepository for StoreBarterPreferenceRepository {
    fn save(&self, preference: &BarterPreference) -> std::result::Result<(), Error> {
        self.preferences.upsert(&preference.user, preference.clone())?;
        Ok(())
    }

    fn find_by_user(&self, user: &str) -> std::result::Result<Option<BarterPreference>, Error> {
        self.preferences.get(user)
    }

    fn find_all(&self) -> std::result::Result<Vec<BarterPreference>, Error> {
        self.preferences.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use souq_types::ListingCategory;

    #[test]
    fn test_set_status_hides_from_available() {
        let repo = StoreBarterItemRepository::open(&Store::in_memory()).unwrap();
        let item = BarterItem::new("alice", "Laptop", ListingCategory::Electronics, 20_000.0);
        repo.save(&item).unwrap();
        assert_eq!(repo.find_available().unwrap().len(), 1);

        let updated = repo.set_status(&item.id, ItemStatus::Withdrawn).unwrap().unwrap();
        assert_eq!(updated.status, ItemStatus::Withdrawn);
        assert!(repo.find_available().unwrap().is_empty());
        assert_eq!(repo.find_by_owner("alice").unwrap().len(), 1);
    }

    #[test]
    fn test_set_status_unknown_item() {
        let repo = StoreBarterItemRepository::open(&Store::in_memory()).unwrap();
        assert!(repo.set_status("missing", ItemStatus::Matched).unwrap().is_none());
    }

    #[test]
    fn test_set_status_if_available_is_all_or_nothing() {
        let repo = StoreBarterItemRepository::open(&Store::in_memory()).unwrap();
        let a = BarterItem::new("alice", "Laptop", ListingCategory::Electronics, 20_000.0);
        let b = BarterItem::new("bob", "Sofa", ListingCategory::Furniture, 20_000.0);
        repo.save(&a).unwrap();
        repo.save(&b).unwrap();
        repo.set_status(&b.id, ItemStatus::Withdrawn).unwrap();

        let err = repo
            .set_status_if_available(&[&a.id, &b.id], ItemStatus::Matched)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(repo.find_by_id(&a.id).unwrap().unwrap().is_available());

        let err = repo
            .set_status_if_available(&[&a.id, "missing"], ItemStatus::Matched)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(repo.find_by_id(&a.id).unwrap().unwrap().is_available());

        let updated = repo
            .set_status_if_available(&[&a.id], ItemStatus::Matched)
            .unwrap();
        assert_eq!(updated[0].status, ItemStatus::Matched);
        assert!(repo.find_available().unwrap().is_empty());
    }

    #[test]
    fn test_preference_is_one_per_user() {
        let repo = StoreBarterPreferenceRepository::open(&Store::in_memory()).unwrap();
        repo.save(&BarterPreference::any("bob")).unwrap();
        repo.save(&BarterPreference::wanting("bob", &[ListingCategory::Vehicles]))
            .unwrap();
        let all = repo.find_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].wanted_categories, vec![ListingCategory::Vehicles]);
    }
}
