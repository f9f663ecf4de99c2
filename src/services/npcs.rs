use reqwest::StatusCode;

use crate::models::http_response::NpcProfile;
use crate::utils::errors::ServiceError;
use crate::SETTINGS;

/// Picks a PVE opponent: a specific NPC when an id is given, otherwise one
/// at random from the NPC service's pool of deck-carrying NPCs.
pub async fn pick_npc(npc_id: Option<&str>) -> Result<NpcProfile, ServiceError> {
    let settings = SETTINGS.get().expect("Settings not initialized");
    let api_url = match npc_id {
        Some(id) => format!("{}/api/npc/{}", settings.npc_server, id),
        None => format!("{}/api/npc/random", settings.npc_server),
    };
    match reqwest::get(api_url).await {
        Err(error) => Err(ServiceError::Unexpected(error.to_string())),
        Ok(response) => match response.status() {
            StatusCode::NOT_FOUND => Err(ServiceError::NpcNotFound),
            StatusCode::OK => response
                .json::<NpcProfile>()
                .await
                .map_err(|_| ServiceError::InvalidResponseBody("NpcProfile".to_string())),
            _ => {
                let body = response.text().await.unwrap_or("NO MESSAGE".to_string());
                Err(ServiceError::Unexpected(body))
            }
        },
    }
}
