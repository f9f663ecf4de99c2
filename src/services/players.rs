use reqwest::StatusCode;

use crate::models::http_response::PlayerProfile;
use crate::utils::errors::ServiceError;
use crate::SETTINGS;

/// Resolves a player id to their display profile via the identity service.
pub async fn fetch_profile(player_id: &str) -> Result<PlayerProfile, ServiceError> {
    let settings = SETTINGS.get().expect("Settings not initialized");
    let api_url = format!("{}/api/player/{}", settings.auth_server, player_id);
    match reqwest::get(api_url).await {
        Err(error) => Err(ServiceError::Unexpected(error.to_string())),
        Ok(response) => match response.status() {
            StatusCode::NOT_FOUND => Err(ServiceError::PlayerNotFound),
            StatusCode::OK => response
                .json::<PlayerProfile>()
                .await
                .map_err(|_| ServiceError::InvalidResponseBody("PlayerProfile".to_string())),
            _ => {
                let body = response.text().await.unwrap_or("NO MESSAGE".to_string());
                Err(ServiceError::Unexpected(body))
            }
        },
    }
}
