//! Listing recommendations for a user profile

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

use souq_types::{ListingId, VehicleMake};

use crate::model::{
    PriceEstimate, RecommendationsResponse, ScoreBreakdown, ScoredListing, UserProfile,
    VehicleListing,
};

pub const DEFAULT_LIMIT: usize = 20;

const W_MAKE: f64 = 0.30;
const W_BUDGET: f64 = 0.25;
const W_LOCATION: f64 = 0.15;
const W_FRESHNESS: f64 = 0.10;
const W_CONDITION: f64 = 0.10;
const W_DEAL: f64 = 0.10;

/// Days for freshness to decay by a factor of e
const FRESHNESS_DAYS: f64 = 30.0;
/// Fraction outside the budget at which fit reaches zero
const BUDGET_FALLOFF: f64 = 0.5;
/// Band around the history mean price used when no budget is set
const HISTORY_BAND: f64 = 0.3;

/// Share of interest weight per make across the history
fn make_affinities(profile: &UserProfile) -> HashMap<VehicleMake, f64> {
    let mut weights: HashMap<VehicleMake, f64> = HashMap::new();
    let mut total = 0.0;
    for event in &profile.history {
        *weights.entry(event.make).or_default() += event.kind.weight();
        total += event.kind.weight();
    }
    if total > 0.0 {
        for w in weights.values_mut() {
            *w /= total;
        }
    }
    weights
}

fn range_fit(price: f64, min: f64, max: f64) -> f64 {
    if price >= min && price <= max {
        return 1.0;
    }
    let (edge, distance) = if price < min {
        (min, min - price)
    } else {
        (max, price - max)
    };
    if edge <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / (edge * BUDGET_FALLOFF)).max(0.0)
}

fn budget_fit(profile: &UserProfile, history_mean: Option<f64>, price: f64) -> f64 {
    if let Some(budget) = profile.budget {
        return range_fit(price, budget.min, budget.max);
    }
    match history_mean {
        Some(mean) => range_fit(
            price,
            mean * (1.0 - HISTORY_BAND),
            mean * (1.0 + HISTORY_BAND),
        ),
        None => 0.5,
    }
}

fn freshness(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - created_at).num_seconds().max(0) as f64 / 86_400.0;
    (-age_days / FRESHNESS_DAYS).exp()
}

fn deal(price: f64, estimate: Option<&PriceEstimate>) -> f64 {
    match estimate {
        Some(est) if est.point > 0.0 => (0.5 + (est.point - price) / est.point).clamp(0.0, 1.0),
        _ => 0.5,
    }
}

fn score_listing(
    profile: &UserProfile,
    affinities: &HashMap<VehicleMake, f64>,
    history_mean: Option<f64>,
    listing: &VehicleListing,
    estimate: Option<&PriceEstimate>,
    now: DateTime<Utc>,
) -> ScoredListing {
    let make_affinity = if profile.preferred_makes.contains(&listing.make) {
        1.0
    } else {
        affinities.get(&listing.make).copied().unwrap_or(0.0)
    };
    let location = match profile.preferred_governorate {
        Some(g) if g == listing.governorate => 1.0,
        _ => 0.0,
    };

    let breakdown = ScoreBreakdown {
        make_affinity,
        budget_fit: budget_fit(profile, history_mean, listing.price),
        location,
        freshness: freshness(listing.created_at, now),
        condition: listing.condition.rank_score(),
        deal: deal(listing.price, estimate),
    };
    let score = W_MAKE * breakdown.make_affinity
        + W_BUDGET * breakdown.budget_fit
        + W_LOCATION * breakdown.location
        + W_FRESHNESS * breakdown.freshness
        + W_CONDITION * breakdown.condition
        + W_DEAL * breakdown.deal;

    ScoredListing {
        listing: listing.clone(),
        score: (score * 10_000.0).round() / 10_000.0,
        breakdown,
    }
}

/// Rank `candidates` for `profile`.
///
/// Inactive listings and the user's own listings are skipped. Ties are
/// broken by newer listing first, then by id.
pub fn recommend(
    profile: &UserProfile,
    candidates: &[VehicleListing],
    estimates: &HashMap<ListingId, PriceEstimate>,
    limit: usize,
    now: DateTime<Utc>,
) -> RecommendationsResponse {
    let affinities = make_affinities(profile);
    let history_mean = profile.mean_history_price();

    let mut items: Vec<ScoredListing> = candidates
        .iter()
        .filter(|l| l.is_active() && l.seller != profile.user_id)
        .map(|l| score_listing(profile, &affinities, history_mean, l, estimates.get(&l.id), now))
        .collect();

    items.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.listing.created_at.cmp(&a.listing.created_at))
            .then_with(|| a.listing.id.cmp(&b.listing.id))
    });
    items.truncate(limit);

    RecommendationsResponse {
        user_id: profile.user_id.clone(),
        generated_at: now,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ActivityEvent, ActivityKind, EstimateMethod, ListingStatus, PriceRange,
    };
    use chrono::Duration;
    use souq_types::{Governorate, VehicleCondition};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn listing(id: &str, make: VehicleMake, price: f64) -> VehicleListing {
        VehicleListing {
            id: id.to_string(),
            seller: "seller".to_string(),
            make,
            model: "Model".to_string(),
            year: 2020,
            condition: VehicleCondition::Good,
            mileage_km: 50_000,
            governorate: Governorate::Giza,
            price,
            status: ListingStatus::Active,
            created_at: now() - Duration::days(3),
            seed_key: None,
        }
    }

    fn recommend_ids(profile: &UserProfile, listings: &[VehicleListing]) -> Vec<String> {
        recommend(profile, listings, &HashMap::new(), DEFAULT_LIMIT, now())
            .items
            .into_iter()
            .map(|s| s.listing.id)
            .collect()
    }

    #[test]
    fn test_excludes_own_and_inactive() {
        let mut own = listing("own", VehicleMake::Kia, 500_000.0);
        own.seller = "u1".to_string();
        let mut sold = listing("sold", VehicleMake::Kia, 500_000.0);
        sold.status = ListingStatus::Sold;
        let open = listing("open", VehicleMake::Kia, 500_000.0);
        let ids = recommend_ids(&UserProfile::new("u1"), &[own, sold, open]);
        assert_eq!(ids, vec!["open"]);
    }

    #[test]
    fn test_preferred_make_ranks_higher() {
        let mut profile = UserProfile::new("u1");
        profile.preferred_makes = vec![VehicleMake::Hyundai];
        let ids = recommend_ids(
            &profile,
            &[
                listing("kia", VehicleMake::Kia, 500_000.0),
                listing("hyundai", VehicleMake::Hyundai, 500_000.0),
            ],
        );
        assert_eq!(ids[0], "hyundai");
    }

    #[test]
    fn test_history_affinity() {
        let mut profile = UserProfile::new("u1");
        let viewed = listing("x", VehicleMake::Nissan, 400_000.0);
        profile.record(ActivityEvent::for_listing(&viewed, ActivityKind::Contact));
        let result = recommend(
            &profile,
            &[
                listing("kia", VehicleMake::Kia, 400_000.0),
                listing("nissan", VehicleMake::Nissan, 400_000.0),
            ],
            &HashMap::new(),
            DEFAULT_LIMIT,
            now(),
        );
        assert_eq!(result.items[0].listing.id, "nissan");
        assert_eq!(result.items[0].breakdown.make_affinity, 1.0);
        assert_eq!(result.items[1].breakdown.make_affinity, 0.0);
    }

    #[test]
    fn test_budget_fit_prefers_in_range() {
        let mut profile = UserProfile::new("u1");
        profile.budget = Some(PriceRange::new(300_000.0, 600_000.0).unwrap());
        let ids = recommend_ids(
            &profile,
            &[
                listing("pricey", VehicleMake::Kia, 2_000_000.0),
                listing("fits", VehicleMake::Kia, 450_000.0),
            ],
        );
        assert_eq!(ids, vec!["fits", "pricey"]);
    }

    #[test]
    fn test_range_fit_decay() {
        assert_eq!(range_fit(100.0, 100.0, 200.0), 1.0);
        assert!((range_fit(250.0, 100.0, 200.0) - 0.5).abs() < 1e-9);
        assert_eq!(range_fit(400.0, 100.0, 200.0), 0.0);
        assert!((range_fit(75.0, 100.0, 200.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_location_match() {
        let mut profile = UserProfile::new("u1");
        profile.preferred_governorate = Some(Governorate::Alexandria);
        let mut alex = listing("alex", VehicleMake::Kia, 500_000.0);
        alex.governorate = Governorate::Alexandria;
        let ids = recommend_ids(&profile, &[listing("giza", VehicleMake::Kia, 500_000.0), alex]);
        assert_eq!(ids[0], "alex");
    }

    #[test]
    fn test_deal_signal_uses_estimate() {
        let cheap = listing("cheap", VehicleMake::Kia, 400_000.0);
        let fair = listing("fair", VehicleMake::Kia, 500_000.0);
        let estimate = |point: f64| PriceEstimate {
            point,
            low: point * 0.9,
            high: point * 1.1,
            confidence: 0.8,
            comparables_used: 5,
            method: EstimateMethod::Comparables,
            currency: "EGP".to_string(),
        };
        let mut estimates = HashMap::new();
        estimates.insert("cheap".to_string(), estimate(500_000.0));
        estimates.insert("fair".to_string(), estimate(500_000.0));
        let result = recommend(
            &UserProfile::new("u1"),
            &[fair, cheap],
            &estimates,
            DEFAULT_LIMIT,
            now(),
        );
        assert_eq!(result.items[0].listing.id, "cheap");
        assert!((result.items[0].breakdown.deal - 0.7).abs() < 1e-9);
        assert!((result.items[1].breakdown.deal - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_tie_break_newer_then_id() {
        let mut older = listing("b-older", VehicleMake::Kia, 500_000.0);
        older.created_at = now() - Duration::days(3);
        let mut newer = listing("c-newer", VehicleMake::Kia, 500_000.0);
        newer.created_at = now() - Duration::days(3) + Duration::seconds(1);
        let same = listing("a-same", VehicleMake::Kia, 500_000.0);
        let ids = recommend_ids(&UserProfile::new("u1"), &[older, newer, same]);
        assert_eq!(ids, vec!["c-newer", "a-same", "b-older"]);
    }

    #[test]
    fn test_limit_truncates() {
        let listings: Vec<_> = (0..10)
            .map(|i| listing(&format!("l{}", i), VehicleMake::Kia, 500_000.0))
            .collect();
        let result = recommend(&UserProfile::new("u1"), &listings, &HashMap::new(), 3, now());
        assert_eq!(result.items.len(), 3);
    }
}
