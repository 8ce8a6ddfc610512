//! Idempotent seeding, cleanup and de-duplication
//!
//! A row is skipped when its id or its natural key already exists, so
//! running the seeder any number of times leaves one copy of each row.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use souq_domain::model::{BarterItem, VehicleListing};
use souq_types::Result;

use crate::persistence::Repositories;
use crate::seed_csv::{SeedData, SEED_ID_PREFIX};

/// Inserted/skipped counts for one entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedCount {
    pub inserted: usize,
    pub skipped: usize,
}

impl SeedCount {
    fn record(&mut self, inserted: bool) {
        if inserted {
            self.inserted += 1;
        } else {
            self.skipped += 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub listings: SeedCount,
    pub barter_items: SeedCount,
    pub barter_preferences: SeedCount,
    pub profiles: SeedCount,
    pub comparables: SeedCount,
}

impl SeedReport {
    pub fn inserted(&self) -> usize {
        self.listings.inserted
            + self.barter_items.inserted
            + self.barter_preferences.inserted
            + self.profiles.inserted
            + self.comparables.inserted
    }

    pub fn skipped(&self) -> usize {
        self.listings.skipped
            + self.barter_items.skipped
            + self.barter_preferences.skipped
            + self.profiles.skipped
            + self.comparables.skipped
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("listings", self.listings),
            ("barter items", self.barter_items),
            ("barter preferences", self.barter_preferences),
            ("profiles", self.profiles),
            ("comparables", self.comparables),
        ];
        for (name, count) in rows {
            writeln!(
                f,
                "{:<20} inserted {:>4}  skipped {:>4}",
                name, count.inserted, count.skipped
            )?;
        }
        Ok(())
    }
}

/// Rows removed by [`SeedRunner::clean`] or [`SeedRunner::dedupe`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemovalReport {
    pub listings: usize,
    pub barter_items: usize,
}

impl RemovalReport {
    pub fn total(&self) -> usize {
        self.listings + self.barter_items
    }
}

pub struct SeedRunner<'a> {
    repos: &'a Repositories,
}

impl<'a> SeedRunner<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    /// Insert every row of `data` that is not already present.
    ///
    /// `on_row` is called once per processed row, for progress display.
    pub fn run(&self, data: &SeedData, on_row: Option<&dyn Fn()>) -> Result<SeedReport> {
        let tick = || {
            if let Some(cb) = on_row {
                cb();
            }
        };
        let mut report = SeedReport::default();

        let mut seed_keys: HashSet<String> = self
            .repos
            .listings
            .find_all()?
            .into_iter()
            .filter_map(|l| l.seed_key)
            .collect();
        for listing in &data.listings {
            let fresh = match &listing.seed_key {
                Some(key) => !seed_keys.contains(key),
                None => true,
            } && self.repos.listings.find_by_id(&listing.id)?.is_none();
            if fresh {
                self.repos.listings.save(listing)?;
                if let Some(key) = &listing.seed_key {
                    seed_keys.insert(key.clone());
                }
            }
            report.listings.record(fresh);
            tick();
        }

        let mut item_keys: HashSet<(String, String)> = self
            .repos
            .barter_items
            .find_all()?
            .iter()
            .map(item_natural_key)
            .collect();
        for item in &data.barter_items {
            let fresh = !item_keys.contains(&item_natural_key(item))
                && self.repos.barter_items.find_by_id(&item.id)?.is_none();
            if fresh {
                self.repos.barter_items.save(item)?;
                item_keys.insert(item_natural_key(item));
            }
            report.barter_items.record(fresh);
            tick();
        }

        // Users may have edited their preferences since the last seed
        for preference in &data.barter_preferences {
            let fresh = self
                .repos
                .barter_preferences
                .find_by_user(&preference.user)?
                .is_none();
            if fresh {
                self.repos.barter_preferences.save(preference)?;
            }
            report.barter_preferences.record(fresh);
            tick();
        }

        for profile in &data.profiles {
            let fresh = self.repos.profiles.find_by_user(&profile.user_id)?.is_none();
            if fresh {
                self.repos.profiles.save(profile)?;
            }
            report.profiles.record(fresh);
            tick();
        }

        for comparable in &data.comparables {
            let fresh = self.repos.market_data.add_comparable(comparable)?;
            report.comparables.record(fresh);
            tick();
        }

        tracing::info!(
            inserted = report.inserted(),
            skipped = report.skipped(),
            "seed run finished"
        );
        Ok(report)
    }

    /// Remove seeded listings and barter items, leaving user data alone
    pub fn clean(&self) -> Result<RemovalReport> {
        let mut removed = RemovalReport::default();
        for listing in self.repos.listings.find_all()? {
            if listing.seed_key.is_some() && self.repos.listings.remove(&listing.id)?.is_some() {
                removed.listings += 1;
            }
        }
        for item in self.repos.barter_items.find_all()? {
            if item.id.starts_with(SEED_ID_PREFIX)
                && self.repos.barter_items.remove(&item.id)?.is_some()
            {
                removed.barter_items += 1;
            }
        }
        tracing::info!(
            listings = removed.listings,
            barter_items = removed.barter_items,
            "removed seeded rows"
        );
        Ok(removed)
    }

    /// Collapse duplicate listings and barter items, keeping the oldest copy
    pub fn dedupe(&self) -> Result<RemovalReport> {
        let mut removed = RemovalReport::default();

        let listings = self.repos.listings.find_all()?;
        for id in duplicates(&listings, listing_natural_key, |l| (l.created_at, l.id.clone())) {
            if self.repos.listings.remove(&id)?.is_some() {
                removed.listings += 1;
            }
        }

        let items = self.repos.barter_items.find_all()?;
        for id in duplicates(&items, item_natural_key, |i| (i.created_at, i.id.clone())) {
            if self.repos.barter_items.remove(&id)?.is_some() {
                removed.barter_items += 1;
            }
        }

        if removed.total() > 0 {
            tracing::warn!(
                listings = removed.listings,
                barter_items = removed.barter_items,
                "removed duplicate rows"
            );
        }
        Ok(removed)
    }
}

fn listing_natural_key(listing: &VehicleListing) -> String {
    match &listing.seed_key {
        Some(key) => format!("seed:{}", key),
        None => format!(
            "{}|{}|{}|{}|{}|{}",
            listing.seller,
            listing.make.label(),
            listing.model.to_lowercase(),
            listing.year,
            listing.mileage_km,
            listing.price
        ),
    }
}

fn item_natural_key(item: &BarterItem) -> (String, String) {
    (item.owner.clone(), item.title.trim().to_lowercase())
}

/// Ids of every row but the first in each natural-key group, by `order`
fn duplicates<T, K, O>(
    rows: &[T],
    key: impl Fn(&T) -> K,
    order: impl Fn(&T) -> O,
) -> Vec<String>
where
    K: std::hash::Hash + Eq,
    O: Ord,
    T: HasId,
{
    let mut groups: HashMap<K, Vec<&T>> = HashMap::new();
    for row in rows {
        groups.entry(key(row)).or_default().push(row);
    }
    let mut ids = Vec::new();
    for mut group in groups.into_values() {
        if group.len() < 2 {
            continue;
        }
        group.sort_by_key(|r| order(r));
        ids.extend(group.iter().skip(1).map(|r| r.id().to_string()));
    }
    ids.sort();
    ids
}

trait HasId {
    fn id(&self) -> &str;
}

impl HasId for VehicleListing {
    fn id(&self) -> &str {
        &self.id
    }
}

impl HasId for BarterItem {
    fn id(&self) -> &str {
        &self.id
    }
}
