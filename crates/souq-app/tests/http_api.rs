//! API behaviour through the middleware pipeline, without sockets

use serde_json::{json, Value};

use souq_app::config::Config;
use souq_app::http::{build_pipeline, ApiRequest, AppState, Method, Pipeline, TokenIssuer};
use souq_infra::seed::SeedRunner;
use souq_infra::seed_csv::SeedData;
use souq_infra::{reference_prices, Repositories};

const SECRET: &str = "test-access-secret";

struct Api {
    state: AppState,
    pipeline: Pipeline<AppState>,
    issuer: TokenIssuer,
}

impl Api {
    fn new() -> Self {
        let repos = Repositories::in_memory(reference_prices::builtin().unwrap()).unwrap();
        let config = Config {
            environment: "test".to_string(),
            ..Default::default()
        };
        let issuer = TokenIssuer::new(SECRET, Some("test-refresh-secret"));
        Self {
            state: AppState::new(repos, &config),
            pipeline: build_pipeline(issuer.clone()),
            issuer,
        }
    }

    fn seeded() -> Self {
        let api = Self::new();
        let data = SeedData::sample(2026).unwrap();
        SeedRunner::new(&api.state.services.repos).run(&data, None).unwrap();
        api
    }

    fn call(&self, req: ApiRequest) -> (u16, Value) {
        let resp = self.pipeline.dispatch(&self.state, req);
        (resp.status, resp.body)
    }

    fn as_user(&self, user: &str, method: Method, path: &str) -> ApiRequest {
        let token = self.issuer.issue_access(user).unwrap();
        ApiRequest::new(method, path).with_header("Authorization", &format!("Bearer {}", token))
    }

    fn get(&self, user: &str, path: &str) -> (u16, Value) {
        self.call(self.as_user(user, Method::Get, path))
    }

    fn send(&self, user: &str, method: Method, path: &str, body: Value) -> (u16, Value) {
        self.call(self.as_user(user, method, path).with_json(&body).unwrap())
    }
}

#[test]
fn test_health_is_public() {
    let api = Api::new();
    for path in ["/health", "/api/v1/health"] {
        let (status, body) = api.call(ApiRequest::new(Method::Get, path));
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["environment"], "test");
        assert!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
    }
}

#[test]
fn test_missing_token_is_401() {
    let api = Api::new();
    let (status, body) = api.call(ApiRequest::new(Method::Get, "/api/v1/listings"));
    assert_eq!(status, 401);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[test]
fn test_invalid_tokens_are_401() {
    let api = Api::new();
    let foreign = TokenIssuer::new("someone-else", None).issue_access("u1").unwrap();
    for header in [
        "Bearer garbage".to_string(),
        format!("Bearer {}", foreign),
        format!("Token {}", api.issuer.issue_access("u1").unwrap()),
    ] {
        let req = ApiRequest::new(Method::Get, "/api/v1/listings").with_header("authorization", &header);
        let (status, body) = api.call(req);
        assert_eq!(status, 401, "{}", header);
        assert_eq!(body["success"], false);
    }
}

#[test]
fn test_refresh_token_not_accepted_as_access() {
    let api = Api::new();
    let pair = api.issuer.issue_pair("u1").unwrap();
    let req = ApiRequest::new(Method::Get, "/api/v1/listings")
        .with_header("authorization", &format!("Bearer {}", pair.refresh_token));
    assert_eq!(api.call(req).0, 401);
}

#[test]
fn test_valid_token_admitted() {
    let api = Api::seeded();
    let (status, body) = api.get("user-karim", "/api/v1/listings");
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 12);
}

#[test]
fn test_unknown_route_and_wrong_method() {
    let api = Api::new();
    assert_eq!(api.get("u1", "/api/v2/listings").0, 404);
    let (status, _) = api.call(api.as_user("u1", Method::Patch, "/api/v1/listings"));
    assert_eq!(status, 405);
}

#[test]
fn test_listing_filters() {
    let api = Api::seeded();
    let (status, body) = api.get("u1", "/api/v1/listings?make=toyota");
    assert_eq!(status, 200);
    let listings = body["data"].as_array().unwrap();
    assert!(!listings.is_empty());
    assert!(listings.iter().all(|l| l["make"] == "toyota"));

    assert_eq!(api.get("u1", "/api/v1/listings?make=lada").0, 400);
}

#[test]
fn test_pricing_estimate_validation() {
    let api = Api::seeded();
    let request = json!({
        "make": "Toyota", "model": "Corolla", "year": 2019,
        "condition": "good", "mileage_km": 90000, "governorate": "Giza"
    });
    let (status, body) = api.send("u1", Method::Post, "/api/v1/pricing/estimate", request.clone());
    assert_eq!(status, 200);
    let data = &body["data"];
    assert!(data["low"].as_f64().unwrap() <= data["point"].as_f64().unwrap());
    assert!(data["point"].as_f64().unwrap() <= data["high"].as_f64().unwrap());
    assert_eq!(data["currency"], "EGP");

    let mut bad = request.clone();
    bad["mileage_km"] = json!(-5);
    assert_eq!(api.send("u1", Method::Post, "/api/v1/pricing/estimate", bad).0, 400);

    let mut bad = request;
    bad["year"] = json!(1900);
    assert_eq!(api.send("u1", Method::Post, "/api/v1/pricing/estimate", bad).0, 400);
}

#[test]
fn test_create_then_fetch_listing() {
    let api = Api::new();
    let (status, body) = api.send(
        "seller-1",
        Method::Post,
        "/api/v1/listings",
        json!({
            "make": "Kia", "model": "Sportage", "year": 2022,
            "condition": "excellent", "mileage_km": 30000,
            "governorate": "Alexandria", "price": 1650000
        }),
    );
    assert_eq!(status, 201);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["seller"], "seller-1");

    let (status, body) = api.get("buyer-1", &format!("/api/v1/listings/{}", id));
    assert_eq!(status, 200);
    assert_eq!(body["data"]["model"], "Sportage");

    let (status, body) = api.get("buyer-1", &format!("/api/v1/listings/{}/estimate", id));
    assert_eq!(status, 200);
    assert_eq!(body["data"]["method"], "reference_price");

    assert_eq!(api.get("buyer-1", "/api/v1/listings/missing").0, 404);
}

#[test]
fn test_seeded_barter_matches_and_accept() {
    let api = Api::seeded();
    let (status, body) = api.get("user-sara", "/api/v1/barter/matches");
    assert_eq!(status, 200);
    let chains = body["data"]["chains"].as_array().unwrap();
    assert!(!chains.is_empty());
    let first = &chains[0];
    let item_ids: Vec<String> = first["transfers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["item_id"].as_str().unwrap().to_string())
        .collect();

    // An outsider cannot accept
    let (status, _) = api.send(
        "user-omar",
        Method::Post,
        "/api/v1/barter/chains/accept",
        json!({ "item_ids": item_ids }),
    );
    assert_eq!(status, 403);

    let (status, body) = api.send(
        "user-sara",
        Method::Post,
        "/api/v1/barter/chains/accept",
        json!({ "item_ids": item_ids }),
    );
    assert_eq!(status, 200, "{}", body);

    // Accepting again conflicts: the items are matched now
    let (status, _) = api.send(
        "user-sara",
        Method::Post,
        "/api/v1/barter/chains/accept",
        json!({ "item_ids": item_ids }),
    );
    assert_eq!(status, 409);

    let (_, body) = api.get("user-sara", "/api/v1/barter/items");
    assert_eq!(body["data"][0]["status"], "matched");
}

#[test]
fn test_all_matches_includes_three_party_chain() {
    let api = Api::seeded();
    let (status, body) = api.get("user-nour", "/api/v1/barter/matches?all=true");
    assert_eq!(status, 200);
    let chains = body["data"]["chains"].as_array().unwrap();
    assert!(chains.iter().any(|c| c["transfers"].as_array().unwrap().len() == 3));
}

#[test]
fn test_withdraw_is_owner_only() {
    let api = Api::new();
    let (status, body) = api.send(
        "owner",
        Method::Post,
        "/api/v1/barter/items",
        json!({"title": "Bike", "category": "items", "declared_value": 9000}),
    );
    assert_eq!(status, 201);
    let path = format!("/api/v1/barter/items/{}", body["data"]["id"].as_str().unwrap());

    assert_eq!(api.call(api.as_user("intruder", Method::Delete, &path)).0, 403);
    let (status, body) = api.call(api.as_user("owner", Method::Delete, &path));
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "withdrawn");
    assert_eq!(api.call(api.as_user("owner", Method::Delete, "/api/v1/barter/items/nope")).0, 404);
}

#[test]
fn test_preferences_validation() {
    let api = Api::new();
    let path = "/api/v1/barter/preferences";
    let (status, body) = api.send("u1", Method::Put, path, json!({"wanted_categories": ["vehicles"]}));
    assert_eq!(status, 200);
    assert_eq!(body["data"]["user"], "u1");

    let bad = json!({"min_value": 10, "max_value": 5});
    assert_eq!(api.send("u1", Method::Put, path, bad).0, 400);
    let bad = json!({"wanted_categories": ["spaceships"]});
    assert_eq!(api.send("u1", Method::Put, path, bad).0, 400);
}

#[test]
fn test_activity_and_recommendations() {
    let api = Api::seeded();
    let (_, body) = api.get("user-new", "/api/v1/listings?make=bmw");
    let bmw_id = body["data"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = api.send(
        "user-new",
        Method::Post,
        "/api/v1/activity",
        json!({"listing_id": bmw_id, "kind": "contact"}),
    );
    assert_eq!(status, 200);
    assert_eq!(body["data"]["history_len"], 1);

    let (status, body) = api.get("user-new", "/api/v1/recommendations?limit=3");
    assert_eq!(status, 200);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["listing"]["make"], "bmw");

    assert_eq!(api.get("user-new", "/api/v1/recommendations?limit=0").0, 400);
    assert_eq!(api.get("user-new", "/api/v1/recommendations?limit=abc").0, 400);
}

#[test]
fn test_recommendations_exclude_own_listings() {
    let api = Api::seeded();
    let (_, body) = api.get("user-karim", "/api/v1/recommendations?limit=50");
    let items = body["data"]["items"].as_array().unwrap();
    assert!(!items.is_empty());
    assert!(items.iter().all(|i| i["listing"]["seller"] != "user-karim"));
}
