//! Pricing request, market data and estimate types

use serde::{Deserialize, Serialize};

use souq_types::{Error, Governorate, Result, VehicleCondition, VehicleMake};

/// Oldest model year accepted for pricing
pub const MIN_MODEL_YEAR: i32 = 1950;

/// Raw pricing request as received from a client.
///
/// Enums arrive as free text and numbers as signed values; [`validate`]
/// turns this into a [`PricingInput`] or an `InvalidInput` error.
///
/// [`validate`]: PricingRequest::validate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRequest {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub condition: String,
    pub mileage_km: i64,
    pub governorate: String,
}

impl PricingRequest {
    /// Validate against the current calendar year
    pub fn validate(&self, current_year: i32) -> Result<PricingInput> {
        let make: VehicleMake = self.make.parse()?;
        let condition: VehicleCondition = self.condition.parse()?;
        let governorate: Governorate = self.governorate.parse()?;

        let model = self.model.trim();
        if model.is_empty() {
            return Err(Error::invalid("model must not be empty"));
        }
        if self.mileage_km < 0 {
            return Err(Error::invalid(format!(
                "mileage must be non-negative, got {}",
                self.mileage_km
            )));
        }
        if self.year < MIN_MODEL_YEAR || self.year > current_year + 1 {
            return Err(Error::invalid(format!(
                "year must be between {} and {}, got {}",
                MIN_MODEL_YEAR,
                current_year + 1,
                self.year
            )));
        }

        Ok(PricingInput {
            make,
            model: model.to_string(),
            year: self.year,
            condition,
            mileage_km: self.mileage_km as u64,
            governorate,
        })
    }
}

/// Validated listing attributes to price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    pub make: VehicleMake,
    pub model: String,
    pub year: i32,
    pub condition: VehicleCondition,
    pub mileage_km: u64,
    pub governorate: Governorate,
}

/// A recent sale or asking price used as market evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketComparable {
    pub make: VehicleMake,
    pub model: String,
    pub year: i32,
    pub condition: VehicleCondition,
    pub mileage_km: u64,
    pub governorate: Governorate,
    pub price: f64,
}

impl MarketComparable {
    /// Natural key parts used for deduplication
    pub fn natural_key(&self) -> [String; 5] {
        [
            self.make.label().to_string(),
            self.model.clone(),
            self.year.to_string(),
            self.mileage_km.to_string(),
            format!("{:.0}", self.price),
        ]
    }
}

/// Reference new-vehicle price for a make (optionally a model)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasePrice {
    pub make: VehicleMake,
    #[serde(default)]
    pub model: Option<String>,
    /// Model year the price refers to
    pub year: i32,
    pub price: f64,
}

/// Market evidence handed to the estimator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(default)]
    pub comparables: Vec<MarketComparable>,
    #[serde(default)]
    pub base_prices: Vec<BasePrice>,
}

/// How an estimate was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateMethod {
    Comparables,
    ReferencePrice,
}

/// Point estimate with a range and confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEstimate {
    pub point: f64,
    pub low: f64,
    pub high: f64,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub comparables_used: usize,
    pub method: EstimateMethod,
    pub currency: String,
}

impl PriceEstimate {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PricingRequest {
        PricingRequest {
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2018,
            condition: "good".to_string(),
            mileage_km: 90_000,
            governorate: "cairo".to_string(),
        }
    }

    #[test]
    fn test_validate_ok() {
        let input = request().validate(2026).unwrap();
        assert_eq!(input.make, VehicleMake::Toyota);
        assert_eq!(input.condition, VehicleCondition::Good);
        assert_eq!(input.governorate, Governorate::Cairo);
        assert_eq!(input.mileage_km, 90_000);
    }

    #[test]
    fn test_validate_unknown_enum() {
        let mut r = request();
        r.governorate = "Atlantis".to_string();
        assert!(matches!(r.validate(2026), Err(Error::InvalidInput(_))));

        let mut r = request();
        r.condition = "mint-ish".to_string();
        assert!(matches!(r.validate(2026), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validate_negative_mileage() {
        let mut r = request();
        r.mileage_km = -1;
        let err = r.validate(2026).unwrap_err();
        assert!(err.to_string().contains("mileage"));
    }

    #[test]
    fn test_validate_year_bounds() {
        let mut r = request();
        r.year = 2027;
        assert!(r.validate(2026).is_ok());
        r.year = 2028;
        assert!(r.validate(2026).is_err());
        r.year = 1949;
        assert!(r.validate(2026).is_err());
    }

    #[test]
    fn test_validate_blank_model() {
        let mut r = request();
        r.model = "   ".to_string();
        assert!(r.validate(2026).is_err());
    }
}
