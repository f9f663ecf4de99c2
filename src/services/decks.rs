use reqwest::StatusCode;

use crate::game::entity::card::CardDefinition;
use crate::models::http_response::DeckCardsResponse;
use crate::utils::errors::ServiceError;
use crate::SETTINGS;

/// Fetches a deck's resolved card definitions from the deck service. The
/// service pre-expands quantities, so the list holds one entry per physical
/// copy. Effect payloads are normalized onto their canonical schema here,
/// at the data boundary, so the engine never sees legacy aliases.
///
/// # Returns
/// * `Ok(Vec<CardDefinition>)` - the deck's cards, canonicalized.
/// * `Err(ServiceError)` - deck missing, empty, or an unexpected response.
pub async fn load_deck_card_defs(deck_id: &str) -> Result<Vec<CardDefinition>, ServiceError> {
    let settings = SETTINGS.get().expect("Settings not initialized");
    let api_url = format!("{}/api/deck/{}/cards", settings.deck_server, deck_id);
    match reqwest::get(api_url).await {
        Err(error) => Err(ServiceError::Unexpected(error.to_string())),
        Ok(response) => match response.status() {
            StatusCode::NOT_FOUND => Err(ServiceError::DeckNotFound),
            StatusCode::OK => {
                let body = response
                    .json::<DeckCardsResponse>()
                    .await
                    .map_err(|_| ServiceError::InvalidResponseBody("DeckCardsResponse".to_string()))?;
                if body.cards.is_empty() {
                    return Err(ServiceError::DeckEmpty);
                }
                let mut cards = body.cards;
                for card in &mut cards {
                    card.canonicalize();
                }
                Ok(cards)
            }
            _ => {
                let body = response.text().await.unwrap_or("NO MESSAGE".to_string());
                Err(ServiceError::Unexpected(body))
            }
        },
    }
}
