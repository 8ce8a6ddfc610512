//! Vehicle price estimation from market comparables
//!
//! Each comparable is normalized to the subject vehicle by the ratio of
//! their value factors (age, mileage, condition, governorate), then the
//! normalized prices are averaged with weights favouring similar year and
//! mileage. Without same-make comparables the make's reference price is
//! depreciated instead, at a lower confidence.

use souq_types::{Error, Governorate, Result, VehicleCondition};

use crate::model::pricing::MIN_MODEL_YEAR;
use crate::model::{
    BasePrice, EstimateMethod, MarketComparable, MarketData, PriceEstimate, PricingInput,
};

pub const CURRENCY: &str = "EGP";

/// Compound value loss per year of age
pub const DEPRECIATION_PER_YEAR: f64 = 0.08;
/// Value loss per 100 000 km
pub const MILEAGE_DISCOUNT_PER_100K: f64 = 0.12;
pub const MILEAGE_FACTOR_FLOOR: f64 = 0.45;
/// Same-model comparables needed before restricting to the model
pub const MIN_MODEL_COMPARABLES: usize = 3;
/// Comparables needed for full confidence
pub const FULL_CONFIDENCE_COMPARABLES: usize = 8;
pub const MIN_SPREAD_RATIO: f64 = 0.05;
/// Range half-width in spreads
pub const RANGE_WIDTH: f64 = 1.5;
pub const REFERENCE_RANGE_RATIO: f64 = 0.25;
pub const REFERENCE_CONFIDENCE: f64 = 0.3;

pub fn age_factor(age_years: i32) -> f64 {
    (1.0 - DEPRECIATION_PER_YEAR).powi(age_years.max(0))
}

pub fn mileage_factor(mileage_km: u64) -> f64 {
    (1.0 - MILEAGE_DISCOUNT_PER_100K * mileage_km as f64 / 100_000.0).max(MILEAGE_FACTOR_FLOOR)
}

pub fn condition_factor(condition: VehicleCondition) -> f64 {
    match condition {
        VehicleCondition::New => 1.0,
        VehicleCondition::LikeNew => 0.93,
        VehicleCondition::Excellent => 0.87,
        VehicleCondition::Good => 0.78,
        VehicleCondition::Fair => 0.64,
        VehicleCondition::Poor => 0.45,
    }
}

/// Regional price level relative to the national market
pub fn governorate_factor(governorate: Governorate) -> f64 {
    match governorate {
        Governorate::Cairo | Governorate::Giza => 1.04,
        Governorate::Alexandria => 1.03,
        Governorate::RedSea | Governorate::SouthSinai => 1.02,
        Governorate::Qalyubia
        | Governorate::PortSaid
        | Governorate::Suez
        | Governorate::Ismailia
        | Governorate::Damietta => 1.0,
        Governorate::NewValley
        | Governorate::NorthSinai
        | Governorate::Matruh
        | Governorate::Aswan => 0.95,
        _ => 0.98,
    }
}

fn value_factor(
    year: i32,
    mileage_km: u64,
    condition: VehicleCondition,
    governorate: Governorate,
    reference_year: i32,
) -> f64 {
    age_factor(reference_year - year)
        * mileage_factor(mileage_km)
        * condition_factor(condition)
        * governorate_factor(governorate)
}

fn subject_factor(input: &PricingInput, reference_year: i32) -> f64 {
    value_factor(
        input.year,
        input.mileage_km,
        input.condition,
        input.governorate,
        reference_year,
    )
}

fn similarity_weight(input: &PricingInput, comp: &MarketComparable) -> f64 {
    let year_gap = (input.year - comp.year).abs() as f64;
    let mileage_gap = (input.mileage_km as f64 - comp.mileage_km as f64).abs() / 50_000.0;
    1.0 / (1.0 + year_gap + mileage_gap)
}

/// Evidence outside this window would depreciate to zero and blow up
/// normalization
fn plausible_year(year: i32, reference_year: i32) -> bool {
    (MIN_MODEL_YEAR..=reference_year + 1).contains(&year)
}

/// Comparables of the subject's make; narrowed to its model when enough exist
fn select_comparables<'a>(
    input: &PricingInput,
    market: &'a MarketData,
    reference_year: i32,
) -> Vec<&'a MarketComparable> {
    let same_make: Vec<_> = market
        .comparables
        .iter()
        .filter(|c| {
            c.make == input.make && c.price > 0.0 && plausible_year(c.year, reference_year)
        })
        .collect();
    let same_model: Vec<_> = same_make
        .iter()
        .copied()
        .filter(|c| c.model.trim().eq_ignore_ascii_case(input.model.trim()))
        .collect();
    if same_model.len() >= MIN_MODEL_COMPARABLES {
        same_model
    } else {
        same_make
    }
}

/// Best reference price: model-specific beats make-wide, newer beats older
fn select_base_price<'a>(
    input: &PricingInput,
    market: &'a MarketData,
    reference_year: i32,
) -> Option<&'a BasePrice> {
    let for_make = market
        .base_prices
        .iter()
        .filter(move |b| {
            b.make == input.make && b.price > 0.0 && plausible_year(b.year, reference_year)
        });
    let model_match = |b: &&BasePrice| {
        b.model
            .as_deref()
            .is_some_and(|m| m.trim().eq_ignore_ascii_case(input.model.trim()))
    };
    for_make
        .clone()
        .filter(model_match)
        .max_by_key(|b| b.year)
        .or_else(|| for_make.filter(|b| b.model.is_none()).max_by_key(|b| b.year))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Estimate a price for `input` as of `reference_year`
pub fn estimate_price(
    input: &PricingInput,
    market: &MarketData,
    reference_year: i32,
) -> Result<PriceEstimate> {
    let target = subject_factor(input, reference_year);
    let comparables = select_comparables(input, market, reference_year);

    if !comparables.is_empty() {
        let mut weight_sum = 0.0;
        let mut weighted = Vec::with_capacity(comparables.len());
        for comp in &comparables {
            let factor = value_factor(
                comp.year,
                comp.mileage_km,
                comp.condition,
                comp.governorate,
                reference_year,
            );
            let normalized = comp.price * target / factor;
            let weight = similarity_weight(input, comp);
            weight_sum += weight;
            weighted.push((normalized, weight));
        }

        let point = weighted.iter().map(|(p, w)| p * w).sum::<f64>() / weight_sum;
        let variance = weighted
            .iter()
            .map(|(p, w)| w * (p - point).powi(2))
            .sum::<f64>()
            / weight_sum;
        let std_dev = variance.sqrt();
        let spread = std_dev.max(point * MIN_SPREAD_RATIO);
        let cv = if point > 0.0 { std_dev / point } else { 1.0 };
        let coverage =
            (comparables.len() as f64 / FULL_CONFIDENCE_COMPARABLES as f64).min(1.0);
        let confidence = round2(coverage * (1.0 - cv.min(0.9)));

        tracing::debug!(
            make = %input.make,
            model = %input.model,
            comparables = comparables.len(),
            point,
            "estimated from comparables"
        );

        return Ok(PriceEstimate {
            point: point.round(),
            low: (point - RANGE_WIDTH * spread).max(0.0).round(),
            high: (point + RANGE_WIDTH * spread).round(),
            confidence,
            comparables_used: comparables.len(),
            method: EstimateMethod::Comparables,
            currency: CURRENCY.to_string(),
        });
    }

    if let Some(base) = select_base_price(input, market, reference_year) {
        // A reference price is for a new, zero-km vehicle at the national level
        let point = base.price * target / age_factor(reference_year - base.year);
        tracing::debug!(make = %input.make, point, "estimated from reference price");
        return Ok(PriceEstimate {
            point: point.round(),
            low: (point * (1.0 - REFERENCE_RANGE_RATIO)).round(),
            high: (point * (1.0 + REFERENCE_RANGE_RATIO)).round(),
            confidence: REFERENCE_CONFIDENCE,
            comparables_used: 0,
            method: EstimateMethod::ReferencePrice,
            currency: CURRENCY.to_string(),
        });
    }

    Err(Error::InsufficientMarketData(format!(
        "no comparables or reference price for {}",
        input.make
    )))
}

/// Relative discount of `price` against an estimate: positive when cheaper
pub fn deal_ratio(price: f64, estimate: &PriceEstimate) -> Option<f64> {
    if estimate.point <= 0.0 {
        return None;
    }
    Some((estimate.point - price) / estimate.point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use souq_types::VehicleMake;

    const YEAR: i32 = 2026;

    fn subject() -> PricingInput {
        PricingInput {
            make: VehicleMake::Toyota,
            model: "Corolla".to_string(),
            year: 2020,
            condition: VehicleCondition::Good,
            mileage_km: 80_000,
            governorate: Governorate::Cairo,
        }
    }

    fn comp(model: &str, year: i32, mileage_km: u64, price: f64) -> MarketComparable {
        MarketComparable {
            make: VehicleMake::Toyota,
            model: model.to_string(),
            year,
            condition: VehicleCondition::Good,
            mileage_km,
            governorate: Governorate::Cairo,
            price,
        }
    }

    fn market() -> MarketData {
        MarketData {
            comparables: vec![
                comp("Corolla", 2020, 80_000, 900_000.0),
                comp("Corolla", 2019, 100_000, 820_000.0),
                comp("Corolla", 2021, 60_000, 990_000.0),
                comp("Yaris", 2020, 80_000, 600_000.0),
            ],
            base_prices: vec![],
        }
    }

    #[test]
    fn test_identical_comparable_returns_its_price() {
        let market = MarketData {
            comparables: vec![comp("Corolla", 2020, 80_000, 900_000.0)],
            base_prices: vec![],
        };
        let est = estimate_price(&subject(), &market, YEAR).unwrap();
        assert_eq!(est.point, 900_000.0);
        assert_eq!(est.method, EstimateMethod::Comparables);
        // spread floors at 5% of point
        assert_eq!(est.low, 832_500.0);
        assert_eq!(est.high, 967_500.0);
    }

    #[test]
    fn test_model_filter_excludes_other_models() {
        let est = estimate_price(&subject(), &market(), YEAR).unwrap();
        assert_eq!(est.comparables_used, 3);
        assert!(est.point > 850_000.0 && est.point < 950_000.0, "{}", est.point);
    }

    #[test]
    fn test_falls_back_to_make_when_model_sparse() {
        let mut input = subject();
        input.model = "Yaris".to_string();
        let est = estimate_price(&input, &market(), YEAR).unwrap();
        assert_eq!(est.comparables_used, 4);
    }

    #[test]
    fn test_range_brackets_point() {
        let est = estimate_price(&subject(), &market(), YEAR).unwrap();
        assert!(est.low <= est.point && est.point <= est.high);
        assert!(est.confidence > 0.0 && est.confidence <= 1.0);
    }

    #[test]
    fn test_more_mileage_is_cheaper() {
        let low_km = estimate_price(&subject(), &market(), YEAR).unwrap();
        let mut input = subject();
        input.mileage_km = 200_000;
        let high_km = estimate_price(&input, &market(), YEAR).unwrap();
        assert!(high_km.point < low_km.point);
    }

    #[test]
    fn test_older_is_cheaper() {
        let newer = estimate_price(&subject(), &market(), YEAR).unwrap();
        let mut input = subject();
        input.year = 2015;
        let older = estimate_price(&input, &market(), YEAR).unwrap();
        assert!(older.point < newer.point);
    }

    #[test]
    fn test_worse_condition_is_cheaper() {
        let good = estimate_price(&subject(), &market(), YEAR).unwrap();
        let mut input = subject();
        input.condition = VehicleCondition::Poor;
        let poor = estimate_price(&input, &market(), YEAR).unwrap();
        assert!(poor.point < good.point);
    }

    #[test]
    fn test_reference_price_fallback() {
        let market = MarketData {
            comparables: vec![],
            base_prices: vec![BasePrice {
                make: VehicleMake::Toyota,
                model: None,
                year: YEAR,
                price: 1_500_000.0,
            }],
        };
        let est = estimate_price(&subject(), &market, YEAR).unwrap();
        assert_eq!(est.method, EstimateMethod::ReferencePrice);
        assert_eq!(est.confidence, REFERENCE_CONFIDENCE);
        assert!(est.point < 1_500_000.0);
        assert!((est.high / est.point - 1.25).abs() < 0.01);
    }

    #[test]
    fn test_model_specific_reference_preferred() {
        let market = MarketData {
            comparables: vec![],
            base_prices: vec![
                BasePrice {
                    make: VehicleMake::Toyota,
                    model: None,
                    year: YEAR,
                    price: 3_000_000.0,
                },
                BasePrice {
                    make: VehicleMake::Toyota,
                    model: Some("corolla".to_string()),
                    year: YEAR,
                    price: 1_000_000.0,
                },
            ],
        };
        let est = estimate_price(&subject(), &market, YEAR).unwrap();
        assert!(est.point < 1_000_000.0);
    }

    #[test]
    fn test_no_data_is_error() {
        let mut input = subject();
        input.make = VehicleMake::Subaru;
        let err = estimate_price(&input, &market(), YEAR).unwrap_err();
        assert!(matches!(err, Error::InsufficientMarketData(_)));
    }

    #[test]
    fn test_deal_ratio() {
        let est = estimate_price(&subject(), &market(), YEAR).unwrap();
        let ratio = deal_ratio(est.point * 0.9, &est).unwrap();
        assert!((ratio - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_factor_floors() {
        assert_eq!(mileage_factor(10_000_000), MILEAGE_FACTOR_FLOOR);
        assert_eq!(age_factor(-1), 1.0);
    }

    #[test]
    fn test_implausible_comparable_year_is_ignored() {
        let market = MarketData {
            comparables: vec![
                comp("Corolla", 2020, 80_000, 900_000.0),
                comp("Corolla", -5000, 80_000, 900_000.0),
                comp("Corolla", YEAR + 40, 80_000, 900_000.0),
            ],
            base_prices: vec![],
        };
        let est = estimate_price(&subject(), &market, YEAR).unwrap();
        assert_eq!(est.comparables_used, 1);
        assert!(est.point.is_finite() && est.high.is_finite());
        assert_eq!(est.point, 900_000.0);
    }

    #[test]
    fn test_implausible_reference_year_is_ignored() {
        let market = MarketData {
            comparables: vec![comp("Corolla", -5000, 80_000, 900_000.0)],
            base_prices: vec![BasePrice {
                make: VehicleMake::Toyota,
                model: None,
                year: -5000,
                price: 1_500_000.0,
            }],
        };
        let err = estimate_price(&subject(), &market, YEAR).unwrap_err();
        assert!(matches!(err, Error::InsufficientMarketData(_)));
    }
}
