use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::game::entity::state::{LogEvent, MatchMode};
use crate::game::intent::{Intent, PendingDecision};

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ConnectionRequest {
    pub player_id: String,
}

/// Starts a match: the requesting player's deck plus either an NPC pick
/// (PVE) or a named opponent and their deck (PVP).
#[derive(Serialize, Deserialize, Debug)]
pub struct StartMatchRequest {
    pub player_id: String,
    pub deck_id: String,
    pub mode: MatchMode,
    #[serde(default)]
    pub npc_id: Option<String>,
    #[serde(default)]
    pub opponent_id: Option<String>,
    #[serde(default)]
    pub opponent_deck_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct IntentRequest {
    pub match_id: Uuid,
    pub player_index: u8,
    #[serde(flatten)]
    pub intent: Intent,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ResolveTrapRequest {
    pub match_id: Uuid,
    pub player_index: u8,
    pub decision_id: Uuid,
    /// `None` declines the activation.
    #[serde(default)]
    pub trap_instance_id: Option<Uuid>,
}

/// Wire reply for every match operation: the authoritative snapshot, the
/// log entries this operation appended and, when an interrupt is waiting,
/// the open decision.
#[derive(Serialize, Deserialize, Debug)]
pub struct MatchStateResponse {
    pub match_id: Uuid,
    pub game_state: Value,
    pub events: Vec<LogEvent>,
    #[serde(default)]
    pub pending_decision: Option<PendingDecision>,
    #[serde(default)]
    pub cancelled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_request_flattens_the_action() {
        let raw = serde_json::json!({
            "match_id": Uuid::nil(),
            "player_index": 1,
            "action": "END_TURN",
        });
        let parsed: IntentRequest = serde_json::from_value(raw).expect("parses");
        assert_eq!(parsed.intent, Intent::EndTurn);
    }

    #[test]
    fn start_match_defaults_optional_fields() {
        let raw = serde_json::json!({
            "player_id": "p-1",
            "deck_id": "d-1",
            "mode": "PVE",
        });
        let parsed: StartMatchRequest = serde_json::from_value(raw).expect("parses");
        assert_eq!(parsed.mode, MatchMode::Pve);
        assert!(parsed.npc_id.is_none());
        assert!(parsed.opponent_id.is_none());
    }
}
