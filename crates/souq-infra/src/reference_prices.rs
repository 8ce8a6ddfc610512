//! Reference price loader from TOML
//!
//! A built-in table ships with the crate; deployments can point the
//! config at their own file instead.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use souq_domain::model::pricing::MIN_MODEL_YEAR;
use souq_domain::model::BasePrice;
use souq_types::{ConfigError, Error, Result};

const BUILTIN: &str = include_str!("../data/reference_prices.toml");

/// Container for parsing a reference price file
#[derive(Debug, Deserialize)]
struct ReferencePriceFile {
    #[serde(default)]
    base_prices: Vec<BasePrice>,
}

/// Load reference prices from a TOML file
pub fn load_from_file(path: &Path) -> Result<Vec<BasePrice>> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Config(ConfigError::ParseError(format!(
            "Failed to read reference price file {}: {}",
            path.display(),
            e
        )))
    })?;
    load_from_str(&content)
}

/// Load reference prices from a TOML string
pub fn load_from_str(toml_content: &str) -> Result<Vec<BasePrice>> {
    let file: ReferencePriceFile = toml::from_str(toml_content).map_err(|e| {
        Error::Config(ConfigError::ParseError(format!(
            "Failed to parse reference price TOML: {}",
            e
        )))
    })?;
    if let Some(bad) = file.base_prices.iter().find(|b| b.year < MIN_MODEL_YEAR) {
        return Err(Error::Config(ConfigError::ParseError(format!(
            "reference price for {} has year {}, earliest is {}",
            bad.make, bad.year, MIN_MODEL_YEAR
        ))));
    }
    Ok(file.base_prices)
}

/// The table shipped with the crate
pub fn builtin() -> Result<Vec<BasePrice>> {
    load_from_str(BUILTIN)
}

/// Load from `path` when given, otherwise the built-in table
pub fn load(path: Option<&Path>) -> Result<Vec<BasePrice>> {
    match path {
        Some(p) => load_from_file(p),
        None => builtin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use souq_types::VehicleMake;

    const TEST_TOML: &str = r#"
[[base_prices]]
make = "kia"
year = 2024
price = 1000000

[[base_prices]]
make = "kia"
model = "Cerato"
year = 2024
price = 1100000
"#;

    #[test]
    fn test_load_from_str() {
        let prices = load_from_str(TEST_TOML).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].make, VehicleMake::Kia);
        assert_eq!(prices[1].model.as_deref(), Some("Cerato"));
    }

    #[test]
    fn test_builtin_covers_every_make() {
        let prices = builtin().unwrap();
        for make in VehicleMake::ALL {
            assert!(
                prices.iter().any(|p| p.make == make && p.model.is_none()),
                "no make-wide reference price for {}",
                make
            );
        }
    }

    #[test]
    fn test_unknown_make_rejected() {
        let bad = "[[base_prices]]\nmake = \"trabant\"\nyear = 1990\nprice = 1\n";
        assert!(matches!(load_from_str(bad), Err(Error::Config(_))));
    }

    #[test]
    fn test_implausible_year_rejected() {
        let bad = "[[base_prices]]\nmake = \"kia\"\nyear = -5000\nprice = 1000000\n";
        let err = load_from_str(bad).unwrap_err();
        assert!(err.to_string().contains("-5000"), "{}", err);
    }

    #[test]
    fn test_missing_file() {
        let err = load_from_file(Path::new("/nonexistent/prices.toml")).unwrap_err();
        assert!(err.to_string().contains("reference price file"));
    }
}
