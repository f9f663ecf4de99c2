use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

use crate::game::entity::state::MatchStatus;
use crate::models::http_response::MatchRecord;
use crate::utils::errors::ServiceError;
use crate::SETTINGS;

fn status_label(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::InProgress => "in_progress",
        MatchStatus::Completed => "completed",
    }
}

/// Loads a match's full serialized state from the match store.
pub async fn load_match(match_id: Uuid) -> Result<MatchRecord, ServiceError> {
    let settings = SETTINGS.get().expect("Settings not initialized");
    let api_url = format!("{}/api/match/{}", settings.match_store, match_id);
    match reqwest::get(api_url).await {
        Err(error) => Err(ServiceError::Unexpected(error.to_string())),
        Ok(response) => match response.status() {
            StatusCode::NOT_FOUND => Err(ServiceError::MatchNotFound),
            StatusCode::OK => response
                .json::<MatchRecord>()
                .await
                .map_err(|_| ServiceError::InvalidResponseBody("MatchRecord".to_string())),
            _ => {
                let body = response.text().await.unwrap_or("NO MESSAGE".to_string());
                Err(ServiceError::Unexpected(body))
            }
        },
    }
}

/// Stores a match snapshot plus its top-level status. Runs after the
/// in-memory transition completes; write idempotency is the store's concern.
pub async fn store_match(
    match_id: Uuid,
    snapshot: &Value,
    status: MatchStatus,
) -> Result<(), ServiceError> {
    let settings = SETTINGS.get().expect("Settings not initialized");
    let api_url = format!("{}/api/match/{}", settings.match_store, match_id);
    let client = reqwest::Client::new();
    let body = serde_json::json!({
        "id": match_id,
        "status": status_label(status),
        "serialized_game_state": snapshot,
    });
    match client.put(api_url).json(&body).send().await {
        Err(error) => Err(ServiceError::Unexpected(error.to_string())),
        Ok(response) => match response.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(ServiceError::MatchNotFound),
            _ => {
                let body = response.text().await.unwrap_or("NO MESSAGE".to_string());
                Err(ServiceError::Unexpected(body))
            }
        },
    }
}
