use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::entity::card::CardDefinition;

#[derive(Debug, Deserialize, Serialize)]
pub struct PlayerProfile {
    pub id: String,
    #[serde(rename = "gamerTag")]
    pub gamer_tag: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NpcProfile {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "deckId")]
    pub deck_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DeckCardsResponse {
    pub deck_id: String,
    pub cards: Vec<CardDefinition>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MatchRecord {
    pub id: String,
    pub status: String,
    pub serialized_game_state: Value,
}
