//! CSV loader for seed data
//!
//! Files are recognised by name (`listings.csv`, `barter_items.csv`,
//! `barter_preferences.csv`, `profiles.csv`, `comparables.csv`).
//! Spreadsheet exports in the region are often Windows-1256, so input is
//! decoded by BOM, then as UTF-8, then as Windows-1256.

use chrono::Utc;
use encoding_rs::{Encoding, WINDOWS_1256};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

use souq_domain::model::{
    BarterItem, BarterPreference, ItemStatus, ListingStatus, MarketComparable, PriceRange,
    PricingRequest, UserProfile, VehicleListing,
};
use souq_store::natural_key_hash;
use souq_types::{Error, ListingCategory, VehicleMake};

const SAMPLE_LISTINGS: &str = include_str!("../data/sample/listings.csv");
const SAMPLE_COMPARABLES: &str = include_str!("../data/sample/comparables.csv");
const SAMPLE_BARTER_ITEMS: &str = include_str!("../data/sample/barter_items.csv");
const SAMPLE_BARTER_PREFERENCES: &str = include_str!("../data/sample/barter_preferences.csv");
const SAMPLE_PROFILES: &str = include_str!("../data/sample/profiles.csv");

/// Prefix of ids assigned to seeded rows
pub const SEED_ID_PREFIX: &str = "seed-";

#[derive(Error, Debug)]
pub enum SeedCsvError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid row {row} in {file}: {message}")]
    InvalidRow {
        file: String,
        row: usize,
        message: String,
    },
}

impl From<SeedCsvError> for Error {
    fn from(err: SeedCsvError) -> Self {
        match err {
            SeedCsvError::IoError(e) => Error::Io(e),
            SeedCsvError::CsvError(e) => Error::Csv(e),
            other => Error::InvalidInput(other.to_string()),
        }
    }
}

/// Which entity a seed file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedFile {
    Listings,
    BarterItems,
    BarterPreferences,
    Profiles,
    Comparables,
}

impl SeedFile {
    pub fn from_path(path: &Path) -> Option<Self> {
        if !path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            return None;
        }
        match path.file_stem()?.to_str()?.to_lowercase().as_str() {
            "listings" => Some(SeedFile::Listings),
            "barter_items" => Some(SeedFile::BarterItems),
            "barter_preferences" => Some(SeedFile::BarterPreferences),
            "profiles" => Some(SeedFile::Profiles),
            "comparables" => Some(SeedFile::Comparables),
            _ => None,
        }
    }
}

/// Everything a seed run inserts
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub listings: Vec<VehicleListing>,
    pub barter_items: Vec<BarterItem>,
    pub barter_preferences: Vec<BarterPreference>,
    pub profiles: Vec<UserProfile>,
    pub comparables: Vec<MarketComparable>,
}

impl SeedData {
    /// Built-in demo dataset
    pub fn sample(current_year: i32) -> Result<Self, SeedCsvError> {
        let mut data = SeedData::default();
        data.load_str(SeedFile::Listings, "listings.csv", SAMPLE_LISTINGS, current_year)?;
        data.load_str(SeedFile::Comparables, "comparables.csv", SAMPLE_COMPARABLES, current_year)?;
        data.load_str(SeedFile::BarterItems, "barter_items.csv", SAMPLE_BARTER_ITEMS, current_year)?;
        data.load_str(
            SeedFile::BarterPreferences,
            "barter_preferences.csv",
            SAMPLE_BARTER_PREFERENCES,
            current_year,
        )?;
        data.load_str(SeedFile::Profiles, "profiles.csv", SAMPLE_PROFILES, current_year)?;
        Ok(data)
    }

    /// Load every recognised CSV file under `dir`, in path order
    pub fn load_dir(dir: &Path, current_year: i32) -> Result<Self, SeedCsvError> {
        let mut data = SeedData::default();
        let mut paths: Vec<_> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        for path in paths {
            match SeedFile::from_path(&path) {
                Some(kind) => {
                    let text = decode_bytes(&fs::read(&path)?);
                    let name = path.display().to_string();
                    data.load_str(kind, &name, &text, current_year)?;
                    tracing::info!(file = %name, ?kind, "loaded seed file");
                }
                None => {
                    if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv")) {
                        tracing::warn!(file = %path.display(), "skipping unrecognised seed file");
                    }
                }
            }
        }
        Ok(data)
    }

    /// Parse one CSV document of the given kind and append its rows
    pub fn load_str(
        &mut self,
        kind: SeedFile,
        file: &str,
        text: &str,
        current_year: i32,
    ) -> Result<(), SeedCsvError> {
        match kind {
            SeedFile::Listings => {
                for (row, r) in read_rows::<ListingRow>(text)?.into_iter().enumerate() {
                    let listing = r.into_listing(current_year).map_err(|e| invalid(file, row, e))?;
                    self.listings.push(listing);
                }
            }
            SeedFile::BarterItems => {
                for (row, r) in read_rows::<BarterItemRow>(text)?.into_iter().enumerate() {
                    self.barter_items.push(r.into_item().map_err(|e| invalid(file, row, e))?);
                }
            }
            SeedFile::BarterPreferences => {
                for (row, r) in read_rows::<PreferenceRow>(text)?.into_iter().enumerate() {
                    self.barter_preferences
                        .push(r.into_preference().map_err(|e| invalid(file, row, e))?);
                }
            }
            SeedFile::Profiles => {
                for (row, r) in read_rows::<ProfileRow>(text)?.into_iter().enumerate() {
                    self.profiles.push(r.into_profile().map_err(|e| invalid(file, row, e))?);
                }
            }
            SeedFile::Comparables => {
                for (row, r) in read_rows::<ComparableRow>(text)?.into_iter().enumerate() {
                    self.comparables
                        .push(r.into_comparable(current_year).map_err(|e| invalid(file, row, e))?);
                }
            }
        }
        Ok(())
    }

    /// Total number of rows
    pub fn len(&self) -> usize {
        self.listings.len()
            + self.barter_items.len()
            + self.barter_preferences.len()
            + self.profiles.len()
            + self.comparables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode raw file bytes to text: BOM first, then UTF-8, then Windows-1256
pub fn decode_bytes(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, had_errors) = WINDOWS_1256.decode(bytes);
            if had_errors {
                tracing::warn!("some characters could not be decoded from Windows-1256");
            }
            text.into_owned()
        }
    }
}

/// Deterministic id for a seeded row
pub fn seed_id(parts: &[&str]) -> String {
    let hash = natural_key_hash(parts);
    format!("{}{}", SEED_ID_PREFIX, &hash[..24])
}

fn read_rows<T: for<'de> Deserialize<'de>>(text: &str) -> Result<Vec<T>, SeedCsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

fn invalid(file: &str, row: usize, err: Error) -> SeedCsvError {
    let message = match err {
        Error::InvalidInput(msg) => msg,
        other => other.to_string(),
    };
    SeedCsvError::InvalidRow {
        file: file.to_string(),
        // header is line 1
        row: row + 2,
        message,
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(';').map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    seed_key: String,
    seller: String,
    make: String,
    model: String,
    year: i32,
    condition: String,
    mileage_km: i64,
    governorate: String,
    price: f64,
}

impl ListingRow {
    fn into_listing(self, current_year: i32) -> Result<VehicleListing, Error> {
        if self.seed_key.is_empty() || self.seller.is_empty() {
            return Err(Error::invalid("seed_key and seller are required"));
        }
        if self.price <= 0.0 {
            return Err(Error::invalid(format!("price must be positive, got {}", self.price)));
        }
        let input = PricingRequest {
            make: self.make,
            model: self.model,
            year: self.year,
            condition: self.condition,
            mileage_km: self.mileage_km,
            governorate: self.governorate,
        }
        .validate(current_year)?;
        Ok(VehicleListing {
            id: seed_id(&[&self.seed_key]),
            seller: self.seller,
            make: input.make,
            model: input.model,
            year: input.year,
            condition: input.condition,
            mileage_km: input.mileage_km,
            governorate: input.governorate,
            price: self.price,
            status: ListingStatus::Active,
            created_at: Utc::now(),
            seed_key: Some(self.seed_key),
        })
    }
}

#[derive(Debug, Deserialize)]
struct BarterItemRow {
    owner: String,
    title: String,
    category: String,
    declared_value: f64,
}

impl BarterItemRow {
    fn into_item(self) -> Result<BarterItem, Error> {
        if self.owner.is_empty() || self.title.is_empty() {
            return Err(Error::invalid("owner and title are required"));
        }
        if self.declared_value <= 0.0 {
            return Err(Error::invalid("declared_value must be positive"));
        }
        let category: ListingCategory = self.category.parse()?;
        let mut item = BarterItem::new(&self.owner, &self.title, category, self.declared_value);
        item.id = seed_id(&[&self.owner, &self.title]);
        item.status = ItemStatus::Available;
        Ok(item)
    }
}

#[derive(Debug, Deserialize)]
struct PreferenceRow {
    user: String,
    #[serde(default)]
    wanted_categories: String,
    min_value: Option<f64>,
    max_value: Option<f64>,
    tolerance: Option<f64>,
}

impl PreferenceRow {
    fn into_preference(self) -> Result<BarterPreference, Error> {
        if self.user.is_empty() {
            return Err(Error::invalid("user is required"));
        }
        let wanted_categories = split_list(&self.wanted_categories)
            .map(str::parse)
            .collect::<Result<Vec<ListingCategory>, _>>()?;
        let preference = BarterPreference {
            user: self.user,
            wanted_categories,
            min_value: self.min_value,
            max_value: self.max_value,
            tolerance: self.tolerance,
        };
        preference.validate()?;
        Ok(preference)
    }
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    user_id: String,
    #[serde(default)]
    preferred_makes: String,
    preferred_governorate: Option<String>,
    budget_min: Option<f64>,
    budget_max: Option<f64>,
}

impl ProfileRow {
    fn into_profile(self) -> Result<UserProfile, Error> {
        if self.user_id.is_empty() {
            return Err(Error::invalid("user_id is required"));
        }
        let mut profile = UserProfile::new(&self.user_id);
        profile.preferred_makes = split_list(&self.preferred_makes)
            .map(str::parse)
            .collect::<Result<Vec<VehicleMake>, _>>()?;
        profile.preferred_governorate = self
            .preferred_governorate
            .filter(|g| !g.is_empty())
            .map(|g| g.parse())
            .transpose()?;
        profile.budget = match (self.budget_min, self.budget_max) {
            (None, None) => None,
            (min, max) => Some(PriceRange::new(min.unwrap_or(0.0), max.unwrap_or(f64::MAX))?),
        };
        Ok(profile)
    }
}

#[derive(Debug, Deserialize)]
struct ComparableRow {
    make: String,
    model: String,
    year: i32,
    condition: String,
    mileage_km: i64,
    governorate: String,
    price: f64,
}

impl ComparableRow {
    fn into_comparable(self, current_year: i32) -> Result<MarketComparable, Error> {
        if self.price <= 0.0 {
            return Err(Error::invalid("price must be positive"));
        }
        let input = PricingRequest {
            make: self.make,
            model: self.model,
            year: self.year,
            condition: self.condition,
            mileage_km: self.mileage_km,
            governorate: self.governorate,
        }
        .validate(current_year)?;
        Ok(MarketComparable {
            make: input.make,
            model: input.model,
            year: input.year,
            condition: input.condition,
            mileage_km: input.mileage_km,
            governorate: input.governorate,
            price: self.price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use souq_types::{Governorate, VehicleCondition};

    #[test]
    fn test_sample_loads() {
        let data = SeedData::sample(2026).unwrap();
        assert_eq!(data.listings.len(), 12);
        assert_eq!(data.comparables.len(), 24);
        assert_eq!(data.barter_items.len(), 8);
        assert_eq!(data.barter_preferences.len(), 8);
        assert_eq!(data.profiles.len(), 4);
    }

    #[test]
    fn test_seed_ids_are_deterministic() {
        let a = SeedData::sample(2026).unwrap();
        let b = SeedData::sample(2026).unwrap();
        assert_eq!(a.listings[0].id, b.listings[0].id);
        assert!(a.listings[0].id.starts_with(SEED_ID_PREFIX));
        assert_eq!(a.barter_items[3].id, b.barter_items[3].id);
    }

    #[test]
    fn test_listing_row_parsed() {
        let mut data = SeedData::default();
        let csv = "seed_key,seller,make,model,year,condition,mileage_km,governorate,price\n\
                   k1,u1,mercedes benz,E200,2020,like new,40000,Port Said,3000000\n";
        data.load_str(SeedFile::Listings, "t.csv", csv, 2026).unwrap();
        let l = &data.listings[0];
        assert_eq!(l.make, VehicleMake::MercedesBenz);
        assert_eq!(l.condition, VehicleCondition::LikeNew);
        assert_eq!(l.governorate, Governorate::PortSaid);
        assert_eq!(l.seed_key.as_deref(), Some("k1"));
    }

    #[test]
    fn test_invalid_row_reports_line() {
        let mut data = SeedData::default();
        let csv = "make,model,year,condition,mileage_km,governorate,price\n\
                   Toyota,Corolla,2019,good,1000,Cairo,500000\n\
                   Lada,Niva,2019,good,1000,Cairo,500000\n";
        let err = data
            .load_str(SeedFile::Comparables, "comparables.csv", csv, 2026)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("row 3"), "{}", msg);
        assert!(msg.contains("Lada"), "{}", msg);
    }

    #[test]
    fn test_comparable_year_out_of_range_rejected() {
        let mut data = SeedData::default();
        let csv = "make,model,year,condition,mileage_km,governorate,price\n\
                   Toyota,Corolla,-5000,good,1000,Cairo,500000\n";
        let err = data
            .load_str(SeedFile::Comparables, "comparables.csv", csv, 2026)
            .unwrap_err();
        assert!(err.to_string().contains("row 2"), "{}", err);
        assert!(data.comparables.is_empty());

        let future = "make,model,year,condition,mileage_km,governorate,price\n\
                      Toyota,Corolla,2040,good,1000,Cairo,500000\n";
        assert!(data
            .load_str(SeedFile::Comparables, "comparables.csv", future, 2026)
            .is_err());
    }

    #[test]
    fn test_preference_lists_and_empty_options() {
        let mut data = SeedData::default();
        let csv = "user,wanted_categories,min_value,max_value,tolerance\n\
                   u1,vehicles; electronics,1000,,\n\
                   u2,,,,0.3\n";
        data.load_str(SeedFile::BarterPreferences, "p.csv", csv, 2026).unwrap();
        let p = &data.barter_preferences;
        assert_eq!(
            p[0].wanted_categories,
            vec![ListingCategory::Vehicles, ListingCategory::Electronics]
        );
        assert_eq!(p[0].min_value, Some(1000.0));
        assert_eq!(p[0].max_value, None);
        assert!(p[1].wanted_categories.is_empty());
        assert_eq!(p[1].tolerance, Some(0.3));
    }

    #[test]
    fn test_decode_windows_1256() {
        // "سيارة" (car) in Windows-1256
        let bytes = [0xD3, 0xED, 0xC7, 0xD1, 0xC9];
        assert_eq!(decode_bytes(&bytes), "سيارة");
    }

    #[test]
    fn test_decode_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("owner,title".as_bytes());
        assert_eq!(decode_bytes(&bytes), "owner,title");
    }

    #[test]
    fn test_load_dir_dispatches_by_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("profiles.csv"),
            "user_id,preferred_makes,preferred_governorate,budget_min,budget_max\nu9,Kia,,,\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.csv"), "a,b\n1,2\n").unwrap();
        let data = SeedData::load_dir(dir.path(), 2026).unwrap();
        assert_eq!(data.profiles.len(), 1);
        assert_eq!(data.profiles[0].preferred_makes, vec![VehicleMake::Kia]);
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_seed_file_from_path() {
        assert_eq!(
            SeedFile::from_path(Path::new("x/Listings.CSV")),
            Some(SeedFile::Listings)
        );
        assert_eq!(SeedFile::from_path(Path::new("x/listings.json")), None);
    }
}
