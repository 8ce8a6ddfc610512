//! Pricing use cases

use std::collections::HashMap;

use souq_domain::model::{MarketData, PriceEstimate, PricingInput, PricingRequest, VehicleListing};
use souq_domain::service::estimate_price;
use souq_infra::Repositories;
use souq_types::{Error, ListingId, Result};

use super::current_year;

#[derive(Clone)]
pub struct PricingService {
    repos: Repositories,
}

impl PricingService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Validate a raw request and estimate it
    pub fn estimate(&self, request: &PricingRequest) -> Result<PriceEstimate> {
        let year = current_year();
        let input = request.validate(year)?;
        self.estimate_input(&input)
    }

    pub fn estimate_input(&self, input: &PricingInput) -> Result<PriceEstimate> {
        let market = self.repos.market_data.load()?;
        estimate_price(input, &market, current_year())
    }

    /// Estimate a stored listing by id
    pub fn estimate_listing(&self, id: &str) -> Result<PriceEstimate> {
        let listing = self
            .repos
            .listings
            .find_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("listing {}", id)))?;
        self.estimate_input(&listing.pricing_input())
    }

    /// Estimates for many listings against one market snapshot.
    /// Listings without enough market data are left out.
    pub fn estimate_many(
        &self,
        listings: &[VehicleListing],
    ) -> Result<HashMap<ListingId, PriceEstimate>> {
        let market = self.repos.market_data.load()?;
        Ok(estimate_all(listings, &market, current_year()))
    }
}

fn estimate_all(
    listings: &[VehicleListing],
    market: &MarketData,
    year: i32,
) -> HashMap<ListingId, PriceEstimate> {
    let mut estimates = HashMap::with_capacity(listings.len());
    for listing in listings {
        match estimate_price(&listing.pricing_input(), market, year) {
            Ok(est) => {
                estimates.insert(listing.id.clone(), est);
            }
            Err(Error::InsufficientMarketData(msg)) => {
                tracing::debug!(listing = %listing.id, %msg, "no estimate");
            }
            Err(e) => {
                tracing::warn!(listing = %listing.id, error = %e, "estimate failed");
            }
        }
    }
    estimates
}
