use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::card::TriggerKind;
use super::entity::state::{BoardCoord, LogEvent};

/// A player intent as submitted over the wire. Payload field names mirror
/// the client protocol one-to-one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    EndTurn,
    PlayMonster {
        card_instance_id: Uuid,
        zone_index: usize,
        #[serde(default)]
        tribute_instance_ids: Vec<Uuid>,
    },
    PlaySpell {
        card_instance_id: Uuid,
        #[serde(default)]
        target_player_index: Option<u8>,
        #[serde(default)]
        target_monster_instance_id: Option<Uuid>,
    },
    PlayTrap {
        card_instance_id: Uuid,
        zone_index: usize,
    },
    ActivateTrap {
        trap_instance_id: Uuid,
        #[serde(default)]
        target_player_index: Option<u8>,
        #[serde(default)]
        target_monster_instance_id: Option<Uuid>,
    },
    ActivateHeroAbility {
        #[serde(default)]
        target_player_index: Option<u8>,
        #[serde(default)]
        target_monster_instance_id: Option<Uuid>,
    },
    AttackMonster {
        attacker_instance_id: Uuid,
        defender_instance_id: Uuid,
    },
    AttackPlayer {
        attacker_instance_id: Uuid,
    },
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Intent::EndTurn => "END_TURN",
            Intent::PlayMonster { .. } => "PLAY_MONSTER",
            Intent::PlaySpell { .. } => "PLAY_SPELL",
            Intent::PlayTrap { .. } => "PLAY_TRAP",
            Intent::ActivateTrap { .. } => "ACTIVATE_TRAP",
            Intent::ActivateHeroAbility { .. } => "ACTIVATE_HERO_ABILITY",
            Intent::AttackMonster { .. } => "ATTACK_MONSTER",
            Intent::AttackPlayer { .. } => "ATTACK_PLAYER",
        }
    }
}

/// Raw payload describing the event a reactive trap fires against. Keyword
/// handlers read from this when they need more than the trigger kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub kind: String,
    #[serde(default)]
    pub amount: i32,
    #[serde(default)]
    pub attacking_player: Option<u8>,
    #[serde(default)]
    pub attacker_instance_id: Option<Uuid>,
    #[serde(default)]
    pub monster_instance_id: Option<Uuid>,
}

impl TriggerEvent {
    pub fn spell_cast(amount: i32, casting_player: u8) -> Self {
        Self {
            kind: "SPELL_CAST".to_string(),
            amount,
            attacking_player: Some(casting_player),
            attacker_instance_id: None,
            monster_instance_id: None,
        }
    }

    pub fn attack(kind: &str, amount: i32, attacking_player: u8, attacker: Uuid) -> Self {
        Self {
            kind: kind.to_string(),
            amount,
            attacking_player: Some(attacking_player),
            attacker_instance_id: Some(attacker),
            monster_instance_id: None,
        }
    }

    pub fn would_be_destroyed(monster: Uuid) -> Self {
        Self {
            kind: "MONSTER_DESTROYED".to_string(),
            amount: 0,
            attacking_player: None,
            attacker_instance_id: None,
            monster_instance_id: Some(monster),
        }
    }
}

/// Where a suspended intent parked, and everything needed to finish it.
///
/// Spell and attack intents suspend before any mutation. The death check
/// suspends after combat damage has landed; that partial completion is the
/// one sanctioned exception to all-or-nothing intent handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuspendedIntent {
    SpellCast { intent: Intent },
    AttackDeclared { intent: Intent },
    ResolvingDeaths { deaths: Vec<BoardCoord>, next: usize },
}

/// A trap-interrupt offer waiting on the defending player. Stored on the
/// game state (and serialized with it) until `resolve_pending` consumes it;
/// any other intent is rejected while one is outstanding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDecision {
    pub decision_id: Uuid,
    pub trigger: TriggerKind,
    pub trigger_event: TriggerEvent,
    pub acting_player: u8,
    pub defending_player: u8,
    pub eligible_traps: Vec<Uuid>,
    pub suspended: SuspendedIntent,
}

/// Result of applying one intent: either it ran to completion, or it was
/// suspended on a trap decision that the defender must resolve first.
#[derive(Debug, Clone)]
pub enum IntentOutcome {
    Completed { events: Vec<LogEvent> },
    Suspended { pending: PendingDecision, events: Vec<LogEvent> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_wire_shape_uses_action_tag() {
        let intent = Intent::AttackPlayer {
            attacker_instance_id: Uuid::nil(),
        };
        let value = serde_json::to_value(&intent).expect("serializes");
        assert_eq!(value["action"], "ATTACK_PLAYER");

        let parsed: Intent = serde_json::from_value(value).expect("parses");
        assert_eq!(parsed, intent);
    }

    #[test]
    fn optional_targets_default_when_absent() {
        let raw = serde_json::json!({
            "action": "PLAY_SPELL",
            "card_instance_id": Uuid::nil(),
        });
        let parsed: Intent = serde_json::from_value(raw).expect("parses");
        match parsed {
            Intent::PlaySpell {
                target_player_index,
                target_monster_instance_id,
                ..
            } => {
                assert!(target_player_index.is_none());
                assert!(target_monster_instance_id.is_none());
            }
            other => panic!("unexpected intent: {other:?}"),
        }
    }
}
