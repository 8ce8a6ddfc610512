//! User profile, activity history and recommendation output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use souq_types::{Error, Governorate, ListingId, Result, UserId, VehicleMake};

use super::listing::VehicleListing;

/// Most recent events retained per profile
pub const MAX_HISTORY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    View,
    Favorite,
    Contact,
}

impl ActivityKind {
    /// How strongly the event signals interest
    pub fn weight(&self) -> f64 {
        match self {
            ActivityKind::View => 1.0,
            ActivityKind::Favorite => 3.0,
            ActivityKind::Contact => 5.0,
        }
    }
}

/// A single browsing signal, with the listing attributes captured at the time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub listing_id: ListingId,
    pub make: VehicleMake,
    pub price: f64,
    pub kind: ActivityKind,
    pub at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn for_listing(listing: &VehicleListing, kind: ActivityKind) -> Self {
        Self {
            listing_id: listing.id.clone(),
            make: listing.make,
            price: listing.price,
            kind,
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if min < 0.0 || max < min {
            return Err(Error::invalid(format!("invalid price range {}..{}", min, max)));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

/// Aggregated preference and history signals for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    #[serde(default)]
    pub preferred_makes: Vec<VehicleMake>,
    #[serde(default)]
    pub preferred_governorate: Option<Governorate>,
    #[serde(default)]
    pub budget: Option<PriceRange>,
    /// Oldest first
    #[serde(default)]
    pub history: Vec<ActivityEvent>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            preferred_makes: Vec::new(),
            preferred_governorate: None,
            budget: None,
            history: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Append an event, dropping the oldest beyond [`MAX_HISTORY`]
    pub fn record(&mut self, event: ActivityEvent) {
        self.updated_at = event.at.max(self.updated_at);
        self.history.push(event);
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }

    /// Interest-weighted mean price of listings in the history
    pub fn mean_history_price(&self) -> Option<f64> {
        let total_weight: f64 = self.history.iter().map(|e| e.kind.weight()).sum();
        if total_weight <= 0.0 {
            return None;
        }
        let sum: f64 = self
            .history
            .iter()
            .map(|e| e.price * e.kind.weight())
            .sum();
        Some(sum / total_weight)
    }
}

/// Per-signal contribution, each already in 0..=1 before weighting
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub make_affinity: f64,
    pub budget_fit: f64,
    pub location: f64,
    pub freshness: f64,
    pub condition: f64,
    pub deal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredListing {
    pub listing: VehicleListing,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub user_id: UserId,
    pub generated_at: DateTime<Utc>,
    pub items: Vec<ScoredListing>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(price: f64, kind: ActivityKind) -> ActivityEvent {
        ActivityEvent {
            listing_id: "l".to_string(),
            make: VehicleMake::Kia,
            price,
            kind,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_history_is_capped() {
        let mut profile = UserProfile::new("u1");
        for i in 0..(MAX_HISTORY + 5) {
            profile.record(event(i as f64, ActivityKind::View));
        }
        assert_eq!(profile.history.len(), MAX_HISTORY);
        assert_eq!(profile.history[0].price, 5.0);
    }

    #[test]
    fn test_mean_history_price_weights_kind() {
        let mut profile = UserProfile::new("u1");
        assert!(profile.mean_history_price().is_none());
        profile.record(event(100.0, ActivityKind::View));
        profile.record(event(200.0, ActivityKind::Favorite));
        // (100*1 + 200*3) / 4
        assert!((profile.mean_history_price().unwrap() - 175.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_range_validation() {
        assert!(PriceRange::new(10.0, 5.0).is_err());
        assert!(PriceRange::new(-1.0, 5.0).is_err());
        assert!(PriceRange::new(5.0, 5.0).unwrap().contains(5.0));
    }
}
