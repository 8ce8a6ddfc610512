//! End-to-end smoke test against a running API
//!
//! Scenarios run in order; later ones reuse ids captured by earlier ones.
//! Tokens are minted locally, so the API must share this `JWT_SECRET`.

use serde::Serialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use souq_types::{Error, Result};

use crate::http::{Method, TokenIssuer};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Caller {
    Anonymous,
    BadToken,
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    ListingId,
    ItemId,
}

struct Scenario {
    name: &'static str,
    method: Method,
    /// `{listing}` and `{item}` are replaced with captured ids
    path: &'static str,
    caller: Caller,
    body: Option<Value>,
    expect_status: u16,
    check: Option<fn(&Value) -> bool>,
    capture: Option<Capture>,
}

fn is_health(body: &Value) -> bool {
    body["status"] == "ok" && body["timestamp"].is_string() && body["environment"].is_string()
}

fn is_failure_envelope(body: &Value) -> bool {
    body["success"] == false && body["message"].is_string()
}

fn is_success_envelope(body: &Value) -> bool {
    body["success"] == true
}

fn has_estimate(body: &Value) -> bool {
    let d = &body["data"];
    match (d["low"].as_f64(), d["point"].as_f64(), d["high"].as_f64()) {
        (Some(low), Some(point), Some(high)) => low <= point && point <= high,
        _ => false,
    }
}

fn has_items(body: &Value) -> bool {
    body["data"]["items"].is_array()
}

fn vehicle(make: &str) -> Value {
    json!({
        "make": make,
        "model": "Elantra",
        "year": 2020,
        "condition": "good",
        "mileage_km": 65000,
        "governorate": "Cairo",
    })
}

fn scenarios() -> Vec<Scenario> {
    let mut listing = vehicle("Hyundai");
    listing["price"] = json!(780000);

    let s = |name, method, path, caller, expect_status| Scenario {
        name,
        method,
        path,
        caller,
        body: None,
        expect_status,
        check: None,
        capture: None,
    };

    vec![
        Scenario { check: Some(is_health), ..s("health", Method::Get, "/health", Caller::Anonymous, 200) },
        Scenario { check: Some(is_health), ..s("versioned health", Method::Get, "/api/v1/health", Caller::Anonymous, 200) },
        Scenario { check: Some(is_failure_envelope), ..s("missing token rejected", Method::Get, "/api/v1/listings", Caller::Anonymous, 401) },
        Scenario { check: Some(is_failure_envelope), ..s("invalid token rejected", Method::Get, "/api/v1/listings", Caller::BadToken, 401) },
        Scenario { check: Some(is_success_envelope), ..s("valid token admitted", Method::Get, "/api/v1/listings", Caller::Primary, 200) },
        s("unknown route", Method::Get, "/api/v1/nowhere", Caller::Primary, 404),
        s("method not allowed", Method::Delete, "/api/v1/listings", Caller::Primary, 405),
        Scenario {
            body: Some(vehicle("Hyundai")),
            check: Some(has_estimate),
            ..s("price estimate", Method::Post, "/api/v1/pricing/estimate", Caller::Primary, 200)
        },
        Scenario {
            body: Some(vehicle("Trabant")),
            check: Some(is_failure_envelope),
            ..s("unknown make rejected", Method::Post, "/api/v1/pricing/estimate", Caller::Primary, 400)
        },
        Scenario {
            body: Some(json!("not an object")),
            ..s("malformed body rejected", Method::Post, "/api/v1/pricing/estimate", Caller::Primary, 400)
        },
        Scenario {
            body: Some(listing),
            capture: Some(Capture::ListingId),
            ..s("create listing", Method::Post, "/api/v1/listings", Caller::Secondary, 201)
        },
        s("get listing", Method::Get, "/api/v1/listings/{listing}", Caller::Primary, 200),
        s("missing listing", Method::Get, "/api/v1/listings/does-not-exist", Caller::Primary, 404),
        Scenario {
            check: Some(has_estimate),
            ..s("listing estimate", Method::Get, "/api/v1/listings/{listing}/estimate", Caller::Primary, 200)
        },
        Scenario {
            body: Some(json!({"title": "Smoke test camera", "category": "electronics", "declared_value": 30000})),
            capture: Some(Capture::ItemId),
            ..s("list barter item", Method::Post, "/api/v1/barter/items", Caller::Primary, 201)
        },
        Scenario {
            body: Some(json!({"wanted_categories": ["furniture", "items"], "tolerance": 0.2})),
            ..s("set barter preferences", Method::Put, "/api/v1/barter/preferences", Caller::Primary, 200)
        },
        Scenario {
            check: Some(is_success_envelope),
            ..s("barter matches", Method::Get, "/api/v1/barter/matches", Caller::Primary, 200)
        },
        s("withdraw foreign item forbidden", Method::Delete, "/api/v1/barter/items/{item}", Caller::Secondary, 403),
        Scenario {
            body: Some(json!({"listing_id": "{listing}", "kind": "favorite"})),
            ..s("record activity", Method::Post, "/api/v1/activity", Caller::Primary, 200)
        },
        Scenario {
            check: Some(has_items),
            ..s("recommendations", Method::Get, "/api/v1/recommendations?limit=5", Caller::Primary, 200)
        },
    ]
}

/// Result of one scenario
#[derive(Debug, Clone, Serialize)]
pub struct SmokeOutcome {
    pub name: String,
    pub passed: bool,
    pub status: Option<u16>,
    pub detail: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SmokeReport {
    pub base_url: String,
    pub outcomes: Vec<SmokeOutcome>,
}

impl SmokeReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

pub struct SmokeRunner {
    client: reqwest::Client,
    base_url: String,
    primary_token: String,
    secondary_token: String,
}

impl SmokeRunner {
    pub fn new(base_url: &str, issuer: &TokenIssuer) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        let run_id = souq_types::new_id();
        let short = &run_id[..8];
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            primary_token: issuer.issue_access(&format!("smoke-{}-a", short))?,
            secondary_token: issuer.issue_access(&format!("smoke-{}-b", short))?,
        })
    }

    pub fn scenario_count() -> usize {
        scenarios().len()
    }

    /// Run every scenario. `on_done` is called after each one.
    pub async fn run(&self, on_done: Option<&dyn Fn(&SmokeOutcome)>) -> SmokeReport {
        let mut report = SmokeReport {
            base_url: self.base_url.clone(),
            outcomes: Vec::new(),
        };
        let mut listing_id: Option<String> = None;
        let mut item_id: Option<String> = None;

        for scenario in scenarios() {
            let started = Instant::now();
            let outcome = match self
                .execute(&scenario, listing_id.as_deref(), item_id.as_deref())
                .await
            {
                Ok((status, body)) => {
                    let status_ok = status == scenario.expect_status;
                    let body_ok = scenario.check.map_or(true, |check| check(&body));
                    if status_ok {
                        if let Some(capture) = scenario.capture {
                            let id = body["data"]["id"].as_str().map(str::to_string);
                            match capture {
                                Capture::ListingId => listing_id = id,
                                Capture::ItemId => item_id = id,
                            }
                        }
                    }
                    let detail = if !status_ok {
                        format!(
                            "expected {}, got {}: {}",
                            scenario.expect_status, status, body["message"]
                        )
                    } else if !body_ok {
                        "unexpected response body".to_string()
                    } else {
                        String::new()
                    };
                    SmokeOutcome {
                        name: scenario.name.to_string(),
                        passed: status_ok && body_ok,
                        status: Some(status),
                        detail,
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    }
                }
                Err(e) => SmokeOutcome {
                    name: scenario.name.to_string(),
                    passed: false,
                    status: None,
                    detail: e.to_string(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                },
            };
            if outcome.passed {
                tracing::debug!(scenario = %outcome.name, "smoke scenario passed");
            } else {
                tracing::warn!(scenario = %outcome.name, detail = %outcome.detail, "smoke scenario failed");
            }
            if let Some(cb) = on_done {
                cb(&outcome);
            }
            report.outcomes.push(outcome);
        }
        report
    }

    async fn execute(
        &self,
        scenario: &Scenario,
        listing_id: Option<&str>,
        item_id: Option<&str>,
    ) -> Result<(u16, Value)> {
        let substitute = |raw: &str| -> Result<String> {
            let mut out = raw.to_string();
            for (placeholder, value, what) in [
                ("{listing}", listing_id, "listing"),
                ("{item}", item_id, "barter item"),
            ] {
                if out.contains(placeholder) {
                    let value = value.ok_or_else(|| {
                        Error::Http(format!("no {} id captured by an earlier scenario", what))
                    })?;
                    out = out.replace(placeholder, value);
                }
            }
            Ok(out)
        };

        let url = format!("{}{}", self.base_url, substitute(scenario.path)?);
        let method = reqwest::Method::from_bytes(scenario.method.as_str().as_bytes())
            .map_err(|e| Error::Http(e.to_string()))?;
        let mut request = self.client.request(method, &url);
        request = match scenario.caller {
            Caller::Anonymous => request,
            Caller::BadToken => request.bearer_auth("not.a.valid-token"),
            Caller::Primary => request.bearer_auth(&self.primary_token),
            Caller::Secondary => request.bearer_auth(&self.secondary_token),
        };
        if let Some(body) = &scenario.body {
            let body: Value = serde_json::from_str(&substitute(&body.to_string())?)?;
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("{} {}: {}", scenario.method, url, e)))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok((status, body))
    }
}
