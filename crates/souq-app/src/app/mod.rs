//! Application services: use cases over the repositories
//!
//! Each service owns a cheap clone of [`Repositories`] and is safe to call
//! from any thread. Clock reads happen here, never in the domain layer.

pub mod barter_service;
pub mod listing_service;
pub mod pricing_service;
pub mod recommendation_service;

pub use barter_service::{AcceptChainRequest, BarterService};
pub use listing_service::{ListingFilter, ListingService};
pub use pricing_service::PricingService;
pub use recommendation_service::{ActivityRequest, RecommendationService};

use chrono::{Datelike, Utc};

use souq_domain::model::MatchOptions;
use souq_infra::Repositories;

/// Calendar year used for validation and depreciation
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// All services sharing one storage handle
#[derive(Clone)]
pub struct Services {
    pub repos: Repositories,
    pub pricing: PricingService,
    pub listings: ListingService,
    pub barter: BarterService,
    pub recommendations: RecommendationService,
}

impl Services {
    pub fn new(repos: Repositories, match_options: MatchOptions) -> Self {
        let pricing = PricingService::new(repos.clone());
        Self {
            listings: ListingService::new(repos.clone()),
            barter: BarterService::new(repos.clone(), pricing.clone(), match_options),
            recommendations: RecommendationService::new(repos.clone(), pricing.clone()),
            pricing,
            repos,
        }
    }
}
