pub mod mock_api;
pub mod mock_repo;
pub mod mock_store;

use serde_json::json;
use slurprs::domain::models::checkin::Checkin;
use slurprs::domain::services::untappd_api::ApiResponse;
use std::collections::BTreeMap;

/// Build a checkin with just an id
pub fn checkin(id: i64) -> Checkin {
    Checkin {
        checkin_id: id,
        extra: BTreeMap::new(),
    }
}

/// Build a raw API body in the flat response shape
pub fn page_body(ids: &[i64], max_id: Option<i64>, since_url: Option<&str>) -> serde_json::Value {
    let items: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| json!({ "checkin_id": id, "beer": { "beer_name": "Test IPA" } }))
        .collect();

    json!({
        "response": {
            "checkins": {
                "items": items,
                "pagination": {
                    "max_id": max_id,
                    "since_url": since_url,
                }
            }
        }
    })
}

pub fn api_response(body: serde_json::Value, ratelimit_remaining: Option<i64>) -> ApiResponse {
    ApiResponse {
        body,
        ratelimit_remaining,
    }
}
