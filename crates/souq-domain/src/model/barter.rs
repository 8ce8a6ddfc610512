//! Barter items, preferences and computed chains

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use souq_types::{Error, ItemId, ListingCategory, Result, UserId};

use super::pricing::{PricingInput, PricingRequest};

/// Lifecycle of a barter item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Available,
    Matched,
    Withdrawn,
}

/// A user-owned item offered for barter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarterItem {
    pub id: ItemId,
    pub owner: UserId,
    pub title: String,
    pub category: ListingCategory,
    /// Value declared by the owner
    pub declared_value: f64,
    /// Vehicle attributes, when the item is a vehicle that can be appraised
    #[serde(default)]
    pub vehicle: Option<PricingInput>,
    /// Estimator output; overrides the declared value in matching
    #[serde(default)]
    pub appraised_value: Option<f64>,
    #[serde(default)]
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

impl BarterItem {
    pub fn new(owner: &str, title: &str, category: ListingCategory, declared_value: f64) -> Self {
        Self {
            id: souq_types::new_id(),
            owner: owner.to_string(),
            title: title.to_string(),
            category,
            declared_value,
            vehicle: None,
            appraised_value: None,
            status: ItemStatus::Available,
            created_at: Utc::now(),
        }
    }

    /// Value used for balance checks
    pub fn value(&self) -> f64 {
        self.appraised_value.unwrap_or(self.declared_value)
    }

    pub fn is_available(&self) -> bool {
        self.status == ItemStatus::Available
    }
}

/// Client payload for listing an item for barter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBarterItem {
    pub title: String,
    pub category: String,
    pub declared_value: f64,
    #[serde(default)]
    pub vehicle: Option<PricingRequest>,
}

impl NewBarterItem {
    /// Validate into a fresh [`BarterItem`] owned by `owner`
    pub fn validate(&self, owner: &str, current_year: i32) -> Result<BarterItem> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::invalid("title must not be empty"));
        }
        let category: ListingCategory = self.category.parse()?;
        if !self.declared_value.is_finite() || self.declared_value <= 0.0 {
            return Err(Error::invalid(format!(
                "declared value must be positive, got {}",
                self.declared_value
            )));
        }
        let vehicle = self
            .vehicle
            .as_ref()
            .map(|v| v.validate(current_year))
            .transpose()?;

        let mut item = BarterItem::new(owner, title, category, self.declared_value);
        item.vehicle = vehicle;
        Ok(item)
    }
}

/// What a user is willing to receive in exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarterPreference {
    pub user: UserId,
    /// Empty means any category
    #[serde(default)]
    pub wanted_categories: Vec<ListingCategory>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    /// Per-user tolerance override, as a fraction of the given item's value
    #[serde(default)]
    pub tolerance: Option<f64>,
}

impl BarterPreference {
    pub fn any(user: &str) -> Self {
        Self {
            user: user.to_string(),
            wanted_categories: Vec::new(),
            min_value: None,
            max_value: None,
            tolerance: None,
        }
    }

    pub fn wanting(user: &str, categories: &[ListingCategory]) -> Self {
        Self {
            wanted_categories: categories.to_vec(),
            ..Self::any(user)
        }
    }

    /// Whether this user would accept `item` (category and value bounds only)
    pub fn accepts(&self, item: &BarterItem) -> bool {
        if !self.wanted_categories.is_empty() && !self.wanted_categories.contains(&item.category) {
            return false;
        }
        let value = item.value();
        if self.min_value.is_some_and(|min| value < min) {
            return false;
        }
        if self.max_value.is_some_and(|max| value > max) {
            return false;
        }
        true
    }

    pub fn tolerance_or(&self, default: f64) -> f64 {
        self.tolerance.unwrap_or(default)
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                return Err(Error::invalid(format!(
                    "min_value {} exceeds max_value {}",
                    min, max
                )));
            }
        }
        if let Some(t) = self.tolerance {
            if !(0.0..=1.0).contains(&t) {
                return Err(Error::invalid(format!("tolerance must be within 0..=1, got {}", t)));
            }
        }
        Ok(())
    }
}

/// One hand-over inside a chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarterTransfer {
    pub item_id: ItemId,
    pub item_title: String,
    pub from: UserId,
    pub to: UserId,
    pub value: f64,
}

/// Closed loop of transfers. Every participant gives exactly one item
/// and receives exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarterChain {
    pub transfers: Vec<BarterTransfer>,
    /// Largest |received - given| / given over all participants
    pub max_relative_imbalance: f64,
    /// 1.0 for perfectly balanced, 0.0 at the tolerance edge
    pub fairness: f64,
    pub score: f64,
    pub total_value: f64,
}

impl BarterChain {
    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    pub fn is_direct_swap(&self) -> bool {
        self.transfers.len() == 2
    }

    pub fn participants(&self) -> Vec<&str> {
        self.transfers.iter().map(|t| t.from.as_str()).collect()
    }

    pub fn item_ids(&self) -> Vec<&str> {
        self.transfers.iter().map(|t| t.item_id.as_str()).collect()
    }

    pub fn involves(&self, user: &str) -> bool {
        self.transfers.iter().any(|t| t.from == user)
    }

    /// Value received minus value given for `user`
    pub fn net_value_for(&self, user: &str) -> Option<f64> {
        let given = self.transfers.iter().find(|t| t.from == user)?.value;
        let received = self.transfers.iter().find(|t| t.to == user)?.value;
        Some(received - given)
    }

    /// Each participant appears once as giver and once as receiver
    pub fn is_closed(&self) -> bool {
        let givers: HashSet<&str> = self.transfers.iter().map(|t| t.from.as_str()).collect();
        let receivers: HashSet<&str> = self.transfers.iter().map(|t| t.to.as_str()).collect();
        givers.len() == self.transfers.len() && givers == receivers
    }
}

/// Tunables for a matching run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Default allowed imbalance as a fraction of the given item's value
    pub tolerance: f64,
    /// Longest chain searched (2 = direct swaps only)
    pub max_chain_length: usize,
    /// Maximum chains returned
    pub limit: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            tolerance: 0.15,
            max_chain_length: 4,
            limit: 50,
        }
    }
}

/// Ranked output of a matching run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarterMatchResult {
    pub chains: Vec<BarterChain>,
    pub items_considered: usize,
    pub tolerance: f64,
    pub max_chain_length: usize,
}

impl BarterMatchResult {
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Greedy pick of non-overlapping chains in rank order
    pub fn select_disjoint(&self) -> Vec<&BarterChain> {
        let mut used: HashSet<&str> = HashSet::new();
        let mut selected = Vec::new();
        for chain in &self.chains {
            if chain.item_ids().iter().any(|id| used.contains(id)) {
                continue;
            }
            used.extend(chain.item_ids());
            selected.push(chain);
        }
        selected
    }

    /// Narrow the result to chains `user` takes part in
    pub fn involving(mut self, user: &str) -> Self {
        self.chains.retain(|c| c.involves(user));
        self
    }
}
