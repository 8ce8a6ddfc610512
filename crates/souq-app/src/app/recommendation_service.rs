//! Activity tracking and listing recommendations

use chrono::Utc;
use serde::{Deserialize, Serialize};

use souq_domain::model::{ActivityEvent, ActivityKind, RecommendationsResponse, UserProfile};
use souq_domain::service::recommend;
use souq_infra::Repositories;
use souq_types::{Error, Result};

use super::pricing_service::PricingService;

/// Upper bound on a single recommendation page
pub const MAX_LIMIT: usize = 100;

/// Browsing event reported by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRequest {
    pub listing_id: String,
    pub kind: ActivityKind,
}

#[derive(Clone)]
pub struct RecommendationService {
    repos: Repositories,
    pricing: PricingService,
}

impl RecommendationService {
    pub fn new(repos: Repositories, pricing: PricingService) -> Self {
        Self { repos, pricing }
    }

    /// Stored profile, or an empty one for a user with no history
    pub fn profile(&self, user: &str) -> Result<UserProfile> {
        Ok(self
            .repos
            .profiles
            .find_by_user(user)?
            .unwrap_or_else(|| UserProfile::new(user)))
    }

    /// Append a browsing event to `user`'s profile
    pub fn record_activity(&self, user: &str, request: &ActivityRequest) -> Result<UserProfile> {
        let listing = self
            .repos
            .listings
            .find_by_id(&request.listing_id)?
            .ok_or_else(|| Error::not_found(format!("listing {}", request.listing_id)))?;
        let mut event = Some(ActivityEvent::for_listing(&listing, request.kind));
        let profile = self.repos.profiles.update(user, &mut |profile: &mut UserProfile| {
            if let Some(event) = event.take() {
                profile.record(event);
            }
        })?;
        tracing::debug!(user, listing = %listing.id, kind = ?request.kind, "activity recorded");
        Ok(profile)
    }

    pub fn recommend(&self, user: &str, limit: usize) -> Result<RecommendationsResponse> {
        if limit == 0 || limit > MAX_LIMIT {
            return Err(Error::invalid(format!(
                "limit must be within 1..={}, got {}",
                MAX_LIMIT, limit
            )));
        }
        let profile = self.profile(user)?;
        let candidates = self.repos.listings.find_active()?;
        let estimates = self.pricing.estimate_many(&candidates)?;
        Ok(recommend(&profile, &candidates, &estimates, limit, Utc::now()))
    }
}
