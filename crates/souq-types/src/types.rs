//! Marketplace enums and identifiers shared across crates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type UserId = String;
pub type ListingId = String;
pub type ItemId = String;

/// Generate a fresh random identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Lowercase and strip separators so "Mercedes-Benz", "mercedes benz"
/// and "MERCEDES_BENZ" compare equal.
fn normalize_key(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_' | '.' | '\''))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Look up a value by its label or serde name, ignoring case and separators
fn parse_known<T: Copy>(raw: &str, all: &[T], label: impl Fn(&T) -> &'static str, what: &str) -> Result<T, Error> {
    let key = normalize_key(raw);
    if key.is_empty() {
        return Err(Error::invalid(format!("{} must not be empty", what)));
    }
    all.iter()
        .copied()
        .find(|v| normalize_key(label(v)) == key)
        .ok_or_else(|| Error::invalid(format!("unknown {}: {}", what, raw.trim())))
}

/// Vehicle manufacturer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleMake {
    Toyota,
    Hyundai,
    Kia,
    Nissan,
    Chevrolet,
    Mitsubishi,
    Suzuki,
    Renault,
    Peugeot,
    Fiat,
    Skoda,
    Volkswagen,
    Opel,
    Honda,
    Mazda,
    Ford,
    Jeep,
    Bmw,
    MercedesBenz,
    Audi,
    Chery,
    Mg,
    Byd,
    Geely,
    Subaru,
}

impl VehicleMake {
    pub const ALL: [VehicleMake; 25] = [
        VehicleMake::Toyota,
        VehicleMake::Hyundai,
        VehicleMake::Kia,
        VehicleMake::Nissan,
        VehicleMake::Chevrolet,
        VehicleMake::Mitsubishi,
        VehicleMake::Suzuki,
        VehicleMake::Renault,
        VehicleMake::Peugeot,
        VehicleMake::Fiat,
        VehicleMake::Skoda,
        VehicleMake::Volkswagen,
        VehicleMake::Opel,
        VehicleMake::Honda,
        VehicleMake::Mazda,
        VehicleMake::Ford,
        VehicleMake::Jeep,
        VehicleMake::Bmw,
        VehicleMake::MercedesBenz,
        VehicleMake::Audi,
        VehicleMake::Chery,
        VehicleMake::Mg,
        VehicleMake::Byd,
        VehicleMake::Geely,
        VehicleMake::Subaru,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VehicleMake::Toyota => "Toyota",
            VehicleMake::Hyundai => "Hyundai",
            VehicleMake::Kia => "Kia",
            VehicleMake::Nissan => "Nissan",
            VehicleMake::Chevrolet => "Chevrolet",
            VehicleMake::Mitsubishi => "Mitsubishi",
            VehicleMake::Suzuki => "Suzuki",
            VehicleMake::Renault => "Renault",
            VehicleMake::Peugeot => "Peugeot",
            VehicleMake::Fiat => "Fiat",
            VehicleMake::Skoda => "Skoda",
            VehicleMake::Volkswagen => "Volkswagen",
            VehicleMake::Opel => "Opel",
            VehicleMake::Honda => "Honda",
            VehicleMake::Mazda => "Mazda",
            VehicleMake::Ford => "Ford",
            VehicleMake::Jeep => "Jeep",
            VehicleMake::Bmw => "BMW",
            VehicleMake::MercedesBenz => "Mercedes-Benz",
            VehicleMake::Audi => "Audi",
            VehicleMake::Chery => "Chery",
            VehicleMake::Mg => "MG",
            VehicleMake::Byd => "BYD",
            VehicleMake::Geely => "Geely",
            VehicleMake::Subaru => "Subaru",
        }
    }
}

impl FromStr for VehicleMake {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_known(s, &Self::ALL, |m| m.label(), "vehicle make")
    }
}

impl fmt::Display for VehicleMake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Vehicle condition, best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleCondition {
    New,
    LikeNew,
    Excellent,
    Good,
    Fair,
    Poor,
}

impl VehicleCondition {
    pub const ALL: [VehicleCondition; 6] = [
        VehicleCondition::New,
        VehicleCondition::LikeNew,
        VehicleCondition::Excellent,
        VehicleCondition::Good,
        VehicleCondition::Fair,
        VehicleCondition::Poor,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VehicleCondition::New => "New",
            VehicleCondition::LikeNew => "Like New",
            VehicleCondition::Excellent => "Excellent",
            VehicleCondition::Good => "Good",
            VehicleCondition::Fair => "Fair",
            VehicleCondition::Poor => "Poor",
        }
    }

    /// 1.0 for new down to 0.0 for poor
    pub fn rank_score(&self) -> f64 {
        match self {
            VehicleCondition::New => 1.0,
            VehicleCondition::LikeNew => 0.8,
            VehicleCondition::Excellent => 0.6,
            VehicleCondition::Good => 0.4,
            VehicleCondition::Fair => 0.2,
            VehicleCondition::Poor => 0.0,
        }
    }
}

impl FromStr for VehicleCondition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_known(s, &Self::ALL, |c| c.label(), "vehicle condition")
    }
}

impl fmt::Display for VehicleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Egyptian governorates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Governorate {
    Cairo,
    Giza,
    Alexandria,
    Qalyubia,
    Dakahlia,
    Sharqia,
    Gharbia,
    Monufia,
    Beheira,
    KafrElSheikh,
    Damietta,
    PortSaid,
    Ismailia,
    Suez,
    Faiyum,
    BeniSuef,
    Minya,
    Asyut,
    Sohag,
    Qena,
    Luxor,
    Aswan,
    RedSea,
    NewValley,
    Matruh,
    NorthSinai,
    SouthSinai,
}

impl Governorate {
    pub const ALL: [Governorate; 27] = [
        Governorate::Cairo,
        Governorate::Giza,
        Governorate::Alexandria,
        Governorate::Qalyubia,
        Governorate::Dakahlia,
        Governorate::Sharqia,
        Governorate::Gharbia,
        Governorate::Monufia,
        Governorate::Beheira,
        Governorate::KafrElSheikh,
        Governorate::Damietta,
        Governorate::PortSaid,
        Governorate::Ismailia,
        Governorate::Suez,
        Governorate::Faiyum,
        Governorate::BeniSuef,
        Governorate::Minya,
        Governorate::Asyut,
        Governorate::Sohag,
        Governorate::Qena,
        Governorate::Luxor,
        Governorate::Aswan,
        Governorate::RedSea,
        Governorate::NewValley,
        Governorate::Matruh,
        Governorate::NorthSinai,
        Governorate::SouthSinai,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Governorate::Cairo => "Cairo",
            Governorate::Giza => "Giza",
            Governorate::Alexandria => "Alexandria",
            Governorate::Qalyubia => "Qalyubia",
            Governorate::Dakahlia => "Dakahlia",
            Governorate::Sharqia => "Sharqia",
            Governorate::Gharbia => "Gharbia",
            Governorate::Monufia => "Monufia",
            Governorate::Beheira => "Beheira",
            Governorate::KafrElSheikh => "Kafr El Sheikh",
            Governorate::Damietta => "Damietta",
            Governorate::PortSaid => "Port Said",
            Governorate::Ismailia => "Ismailia",
            Governorate::Suez => "Suez",
            Governorate::Faiyum => "Faiyum",
            Governorate::BeniSuef => "Beni Suef",
            Governorate::Minya => "Minya",
            Governorate::Asyut => "Asyut",
            Governorate::Sohag => "Sohag",
            Governorate::Qena => "Qena",
            Governorate::Luxor => "Luxor",
            Governorate::Aswan => "Aswan",
            Governorate::RedSea => "Red Sea",
            Governorate::NewValley => "New Valley",
            Governorate::Matruh => "Matruh",
            Governorate::NorthSinai => "North Sinai",
            Governorate::SouthSinai => "South Sinai",
        }
    }
}

impl FromStr for Governorate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_known(s, &Self::ALL, |g| g.label(), "governorate")
    }
}

impl fmt::Display for Governorate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Marketplace vertical an item or listing belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingCategory {
    Items,
    Vehicles,
    RealEstate,
    GoldSilver,
    Electronics,
    Furniture,
    Transport,
    Tenders,
}

impl ListingCategory {
    pub const ALL: [ListingCategory; 8] = [
        ListingCategory::Items,
        ListingCategory::Vehicles,
        ListingCategory::RealEstate,
        ListingCategory::GoldSilver,
        ListingCategory::Electronics,
        ListingCategory::Furniture,
        ListingCategory::Transport,
        ListingCategory::Tenders,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ListingCategory::Items => "Items",
            ListingCategory::Vehicles => "Vehicles",
            ListingCategory::RealEstate => "Real Estate",
            ListingCategory::GoldSilver => "Gold & Silver",
            ListingCategory::Electronics => "Electronics",
            ListingCategory::Furniture => "Furniture",
            ListingCategory::Transport => "Transport",
            ListingCategory::Tenders => "Tenders",
        }
    }
}

impl FromStr for ListingCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "gold_silver" normalizes to "goldsilver", the label to "gold&silver"
        let key = normalize_key(s).replace('&', "");
        Self::ALL
            .iter()
            .copied()
            .find(|c| normalize_key(c.label()).replace('&', "") == key)
            .ok_or_else(|| Error::invalid(format!("unknown category: {}", s.trim())))
    }
}

impl fmt::Display for ListingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
