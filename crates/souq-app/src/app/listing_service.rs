//! Vehicle listing use cases

use souq_domain::model::{NewListing, VehicleListing};
use souq_infra::Repositories;
use souq_types::{Error, Governorate, Result, VehicleMake};

use super::current_year;

/// Optional filters for browsing active listings
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub make: Option<VehicleMake>,
    pub governorate: Option<Governorate>,
}

impl ListingFilter {
    /// Build from raw query values; unknown names are invalid input
    pub fn parse(make: Option<&str>, governorate: Option<&str>) -> Result<Self> {
        Ok(Self {
            make: make.map(str::parse).transpose()?,
            governorate: governorate.map(str::parse).transpose()?,
        })
    }

    fn matches(&self, listing: &VehicleListing) -> bool {
        self.make.map_or(true, |m| m == listing.make)
            && self.governorate.map_or(true, |g| g == listing.governorate)
    }
}

#[derive(Clone)]
pub struct ListingService {
    repos: Repositories,
}

impl ListingService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub fn create(&self, seller: &str, request: &NewListing) -> Result<VehicleListing> {
        let listing = request.validate(seller, current_year())?;
        self.repos.listings.save(&listing)?;
        tracing::info!(id = %listing.id, seller, title = %listing.title(), "listing created");
        Ok(listing)
    }

    /// Active listings, newest first
    pub fn browse(&self, filter: &ListingFilter) -> Result<Vec<VehicleListing>> {
        let mut listings: Vec<_> = self
            .repos
            .listings
            .find_active()?
            .into_iter()
            .filter(|l| filter.matches(l))
            .collect();
        listings.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(listings)
    }

    pub fn get(&self, id: &str) -> Result<VehicleListing> {
        self.repos
            .listings
            .find_by_id(id)?
            .ok_or_else(|| Error::not_found(format!("listing {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use souq_domain::model::PricingRequest;

    fn service() -> ListingService {
        ListingService::new(Repositories::in_memory(Vec::new()).unwrap())
    }

    fn new_listing(make: &str, governorate: &str) -> NewListing {
        NewListing {
            vehicle: PricingRequest {
                make: make.to_string(),
                model: "Tucson".to_string(),
                year: 2022,
                condition: "excellent".to_string(),
                mileage_km: 20_000,
                governorate: governorate.to_string(),
            },
            price: 1_400_000.0,
        }
    }

    #[test]
    fn test_create_and_get() {
        let svc = service();
        let created = svc.create("u1", &new_listing("hyundai", "giza")).unwrap();
        let fetched = svc.get(&created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.seller, "u1");
    }

    #[test]
    fn test_browse_filters() {
        let svc = service();
        svc.create("u1", &new_listing("hyundai", "giza")).unwrap();
        svc.create("u1", &new_listing("kia", "giza")).unwrap();
        svc.create("u2", &new_listing("kia", "cairo")).unwrap();

        let filter = ListingFilter::parse(Some("kia"), None).unwrap();
        assert_eq!(svc.browse(&filter).unwrap().len(), 2);
        let filter = ListingFilter::parse(Some("kia"), Some("cairo")).unwrap();
        assert_eq!(svc.browse(&filter).unwrap().len(), 1);
        assert_eq!(svc.browse(&ListingFilter::default()).unwrap().len(), 3);
    }

    #[test]
    fn test_bad_filter_is_invalid() {
        assert!(ListingFilter::parse(Some("zastava"), None).is_err());
    }

    #[test]
    fn test_get_missing() {
        assert!(matches!(service().get("x").unwrap_err(), Error::NotFound(_)));
    }
}
