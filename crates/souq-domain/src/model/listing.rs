//! Vehicle listing types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use souq_types::{
    Error, Governorate, ListingId, Result, UserId, VehicleCondition, VehicleMake,
};

use super::pricing::{PricingInput, PricingRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    #[default]
    Active,
    Sold,
    Withdrawn,
}

/// A vehicle offered for sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleListing {
    pub id: ListingId,
    pub seller: UserId,
    pub make: VehicleMake,
    pub model: String,
    pub year: i32,
    pub condition: VehicleCondition,
    pub mileage_km: u64,
    pub governorate: Governorate,
    /// Asking price (EGP)
    pub price: f64,
    #[serde(default)]
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    /// Natural key of seeded rows
    #[serde(default)]
    pub seed_key: Option<String>,
}

impl VehicleListing {
    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }

    /// Attributes the estimator needs
    pub fn pricing_input(&self) -> PricingInput {
        PricingInput {
            make: self.make,
            model: self.model.clone(),
            year: self.year,
            condition: self.condition,
            mileage_km: self.mileage_km,
            governorate: self.governorate,
        }
    }

    pub fn title(&self) -> String {
        format!("{} {} {}", self.make, self.model, self.year)
    }
}

/// Client payload for creating a listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListing {
    #[serde(flatten)]
    pub vehicle: PricingRequest,
    pub price: f64,
}

impl NewListing {
    pub fn validate(&self, seller: &str, current_year: i32) -> Result<VehicleListing> {
        let input = self.vehicle.validate(current_year)?;
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(Error::invalid(format!("price must be positive, got {}", self.price)));
        }
        Ok(VehicleListing {
            id: souq_types::new_id(),
            seller: seller.to_string(),
            make: input.make,
            model: input.model,
            year: input.year,
            condition: input.condition,
            mileage_km: input.mileage_km,
            governorate: input.governorate,
            price: self.price,
            status: ListingStatus::Active,
            created_at: Utc::now(),
            seed_key: None,
        })
    }
}
