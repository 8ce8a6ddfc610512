//! Domain model types

pub mod barter;
pub mod listing;
pub mod pricing;
pub mod profile;

pub use barter::{
    BarterChain, BarterItem, BarterMatchResult, BarterPreference, BarterTransfer, ItemStatus,
    MatchOptions, NewBarterItem,
};
pub use listing::{ListingStatus, NewListing, VehicleListing};
pub use pricing::{
    BasePrice, EstimateMethod, MarketComparable, MarketData, PriceEstimate, PricingInput,
    PricingRequest,
};
pub use profile::{
    ActivityEvent, ActivityKind, PriceRange, RecommendationsResponse, ScoreBreakdown,
    ScoredListing, UserProfile,
};
