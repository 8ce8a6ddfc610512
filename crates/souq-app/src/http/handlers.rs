//! Endpoint handlers and the API route table

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use souq_domain::model::{BarterPreference, NewBarterItem, NewListing, PricingRequest};
use souq_infra::Repositories;
use souq_types::{ListingCategory, Result};

use super::request::{ApiRequest, Method};
use super::response::{ApiResponse, STATUS_OK};
use super::router::Router;
use crate::app::{AcceptChainRequest, ActivityRequest, ListingFilter, Services};
use crate::config::Config;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub environment: String,
    pub recommendation_limit: usize,
}

impl AppState {
    pub fn new(repos: Repositories, config: &Config) -> Self {
        Self {
            services: Services::new(repos, config.match_options()),
            environment: config.environment.clone(),
            recommendation_limit: config.recommendation_limit,
        }
    }
}

/// Caller-supplied barter preference; the user comes from the token
#[derive(Debug, Deserialize)]
struct PreferenceRequest {
    #[serde(default)]
    wanted_categories: Vec<ListingCategory>,
    #[serde(default)]
    min_value: Option<f64>,
    #[serde(default)]
    max_value: Option<f64>,
    #[serde(default)]
    tolerance: Option<f64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .public(Method::Get, "/health", health)
        .public(Method::Get, "/api/v1/health", health)
        .route(Method::Post, "/api/v1/pricing/estimate", estimate_price)
        .route(Method::Get, "/api/v1/listings", list_listings)
        .route(Method::Post, "/api/v1/listings", create_listing)
        .route(Method::Get, "/api/v1/listings/:id", get_listing)
        .route(Method::Get, "/api/v1/listings/:id/estimate", estimate_listing)
        .route(Method::Get, "/api/v1/barter/items", list_barter_items)
        .route(Method::Post, "/api/v1/barter/items", create_barter_item)
        .route(Method::Delete, "/api/v1/barter/items/:id", withdraw_barter_item)
        .route(Method::Put, "/api/v1/barter/preferences", set_barter_preferences)
        .route(Method::Get, "/api/v1/barter/matches", barter_matches)
        .route(Method::Post, "/api/v1/barter/chains/accept", accept_chain)
        .route(Method::Get, "/api/v1/recommendations", recommendations)
        .route(Method::Post, "/api/v1/activity", record_activity)
}

fn health(state: &AppState, _req: &ApiRequest) -> Result<ApiResponse> {
    Ok(ApiResponse::raw(
        STATUS_OK,
        json!({
            "status": "ok",
            "timestamp": Utc::now().to_rfc3339(),
            "environment": state.environment,
        }),
    ))
}

fn estimate_price(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let request: PricingRequest = req.json()?;
    let estimate = state.services.pricing.estimate(&request)?;
    Ok(ApiResponse::ok("price estimated", &estimate))
}

fn list_listings(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let filter = ListingFilter::parse(req.query("make"), req.query("governorate"))?;
    let listings = state.services.listings.browse(&filter)?;
    Ok(ApiResponse::ok(
        &format!("{} listings", listings.len()),
        &listings,
    ))
}

fn create_listing(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let request: NewListing = req.json()?;
    let listing = state.services.listings.create(req.caller()?, &request)?;
    Ok(ApiResponse::created("listing created", &listing))
}

fn get_listing(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let listing = state.services.listings.get(req.param("id")?)?;
    Ok(ApiResponse::ok("listing found", &listing))
}

fn estimate_listing(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let estimate = state.services.pricing.estimate_listing(req.param("id")?)?;
    Ok(ApiResponse::ok("price estimated", &estimate))
}

fn list_barter_items(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let items = state.services.barter.items_of(req.caller()?)?;
    Ok(ApiResponse::ok(&format!("{} items", items.len()), &items))
}

fn create_barter_item(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let request: NewBarterItem = req.json()?;
    let item = state.services.barter.list_item(req.caller()?, &request)?;
    Ok(ApiResponse::created("item listed for barter", &item))
}

fn withdraw_barter_item(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let item = state
        .services
        .barter
        .withdraw(req.caller()?, req.param("id")?)?;
    Ok(ApiResponse::ok("item withdrawn", &item))
}

fn set_barter_preferences(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let user = req.caller()?;
    let request: PreferenceRequest = req.json()?;
    let preference = BarterPreference {
        user: user.to_string(),
        wanted_categories: request.wanted_categories,
        min_value: request.min_value,
        max_value: request.max_value,
        tolerance: request.tolerance,
    };
    let saved = state.services.barter.set_preference(user, preference)?;
    Ok(ApiResponse::ok("preferences saved", &saved))
}

fn barter_matches(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let user = req.caller()?;
    let result = if req.query_as::<bool>("all")?.unwrap_or(false) {
        state.services.barter.all_matches()?
    } else {
        state.services.barter.matches_for(user)?
    };
    let message = if result.is_empty() {
        "no closing chains".to_string()
    } else {
        format!("{} chains", result.chains.len())
    };
    Ok(ApiResponse::ok(&message, &result))
}

fn accept_chain(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let request: AcceptChainRequest = req.json()?;
    let chain = state.services.barter.accept_chain(req.caller()?, &request)?;
    Ok(ApiResponse::ok("chain accepted", &chain))
}

fn recommendations(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let limit = req
        .query_as::<usize>("limit")?
        .unwrap_or(state.recommendation_limit);
    let response = state
        .services
        .recommendations
        .recommend(req.caller()?, limit)?;
    Ok(ApiResponse::ok(
        &format!("{} recommendations", response.items.len()),
        &response,
    ))
}

fn record_activity(state: &AppState, req: &ApiRequest) -> Result<ApiResponse> {
    let request: ActivityRequest = req.json()?;
    let profile = state
        .services
        .recommendations
        .record_activity(req.caller()?, &request)?;
    Ok(ApiResponse::ok(
        "activity recorded",
        &json!({ "user_id": profile.user_id, "history_len": profile.history.len() }),
    ))
}
