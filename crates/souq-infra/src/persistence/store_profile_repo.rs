//! Store-backed implementation of UserProfileRepository

use souq_domain::model::UserProfile;
use souq_domain::repository::UserProfileRepository;
use souq_store::{Collection, Store};
use souq_types::{Error, Result};

pub struct StoreProfileRepository {
    profiles: Collection<UserProfile>,
}

impl StoreProfileRepository {
    pub fn open(store: &Store) -> Result<Self> {
        Ok(Self {
            profiles: store.collection("profiles")?,
        })
    }
}

impl UserProfileRepository for StoreProfileRepository {
    fn save(&self, profile: &UserProfile) -> std::result::Result<(), Error> {
        self.profiles.upsert(&profile.user_id, profile.clone())?;
        Ok(())
    }

    fn find_by_user(&self, user: &str) -> std::result::Result<Option<UserProfile>, Error> {
        self.profiles.get(user)
    }

    fn find_all(&self) -> std::result::Result<Vec<UserProfile>, Error> {
        self.profiles.values()
    }

    fn update(
        &self,
        user: &str,
        f: &mut dyn FnMut(&mut UserProfile),
    ) -> std::result::Result<UserProfile, Error> {
        self.profiles
            .upsert_with(user, || UserProfile::new(user), |profile| f(profile))
    }
}
