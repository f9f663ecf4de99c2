use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::card::{CardDefinition, CardInstance, StatusEffect};
use super::player::PlayerState;
use crate::game::intent::PendingDecision;
use crate::utils::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Start,
    Draw,
    Main,
    Battle,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    #[serde(rename = "PVE")]
    Pve,
    #[serde(rename = "PVP")]
    Pvp,
}

/// Location of a monster on the board: owning player index plus zone slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardCoord {
    pub player_index: u8,
    pub zone_index: usize,
}

impl BoardCoord {
    pub fn new(player_index: u8, zone_index: usize) -> Self {
        Self {
            player_index,
            zone_index,
        }
    }
}

/// One entry of the append-only match log. The log is the canonical audit
/// trail for replay and animation; entries are never rewritten or pruned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogEvent {
    GameInit { player1: String, player2: String },
    EndTurn { from_player: u8, to_player: u8, turn: u32 },
    TurnStarted { player: u8, turn: u32 },
    CardsDrawn { player: u8, count: usize },
    DeckReshuffled { player: u8, count: usize },
    HeroPassiveHealed { player: u8, healed: usize },
    TributePaid { player: u8, card_instance_id: Uuid },
    MonsterSummoned {
        player: u8,
        zone_index: usize,
        card_instance_id: Uuid,
        card_name: String,
        stars: u8,
        face_down: bool,
    },
    HeroSummoned { player: u8, card_instance_id: Uuid, card_name: String },
    ElementAttuned { player: u8, element_id: i32, reskinned: usize },
    TrapSet { player: u8, zone_index: usize },
    SpellCast { player: u8, card_instance_id: Uuid, card_name: String },
    SpellCountered { player: u8, card_instance_id: Uuid, reflected: bool },
    TrapActivated { player: u8, trap_instance_id: Uuid, card_name: String },
    HeroAbilityActivated { player: u8, keyword: String },
    AttackNegated { attacker_instance_id: Uuid },
    CombatResolved {
        attacker_instance_id: Uuid,
        defender_instance_id: Uuid,
        attacker_hp_after: i32,
        defender_hp_after: i32,
        overflow_to_attacker: i32,
        overflow_to_defender: i32,
    },
    DirectAttack {
        attacker_instance_id: Uuid,
        defending_player: u8,
        amount: i32,
        hp_after: i32,
    },
    MonsterDestroyed { player: u8, zone_index: usize, card_instance_id: Uuid },
    StatusExpired {
        player: u8,
        card_instance_id: Uuid,
        code: String,
        replaced_with: Option<String>,
    },
    MatchEnded { winner: Option<u8> },

    // Entries emitted by the effect resolver.
    EffectDamageMonster {
        player_index: u8,
        zone_index: usize,
        amount: i32,
        hp_before: i32,
        hp_after: i32,
        card_instance_id: Uuid,
    },
    EffectDamagePlayer { player_index: u8, amount: i32, hp_before: i32, hp_after: i32 },
    EffectHealMonster {
        player_index: u8,
        zone_index: usize,
        amount: i32,
        hp_before: i32,
        hp_after: i32,
        card_instance_id: Uuid,
    },
    EffectHealPlayer { player_index: u8, amount: i32, hp_before: i32, hp_after: i32 },
    EffectBuffMonster {
        player_index: u8,
        zone_index: usize,
        atk_after: i32,
        hp_after: i32,
        max_hp_after: i32,
        card_instance_id: Uuid,
    },
    EffectStatusApplied {
        player_index: u8,
        zone_index: usize,
        status: StatusEffect,
        card_instance_id: Uuid,
    },
    EffectStatusBlocked {
        player_index: u8,
        zone_index: usize,
        blocked_status: String,
        card_instance_id: Uuid,
    },
    EffectCleanseMonster { player_index: u8, zone_index: usize, removed: usize },
    EffectDrawCards { player_index: u8, amount: usize },
    EffectHaste { player_index: u8, zone_index: usize, card_instance_id: Uuid },
    EffectCounterSpell { trap_card_instance_id: Uuid, reflect: bool },
    EffectNegateAttack { trap_card_instance_id: Uuid, attacker_instance_id: Uuid },
    EffectReflectDamage { player_index: u8, amount: i32 },
    EffectPreventDestruction {
        player_index: u8,
        zone_index: usize,
        card_instance_id: Uuid,
        hp_after: i32,
    },
    EffectDestroyMonster { player_index: u8, zone_index: usize, card_instance_id: Uuid },
    EffectHeroCharges { spent: u32, remaining: u32 },
    EffectNoTarget { reason: String, card_code: String },
    EffectInvalidTarget { reason: String, card_code: String },
    EffectUnknownKeyword { keyword: String, card_code: String },
}

/// Complete authoritative state of one match. This is what gets serialized
/// into the match store and shipped to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub match_id: Uuid,
    pub mode: MatchMode,
    pub turn: u32,
    pub current_player: u8,
    pub phase: Phase,
    pub status: MatchStatus,
    pub winner: Option<u8>,
    pub players: [PlayerState; 2],
    pub log: Vec<LogEvent>,
    #[serde(default)]
    pub pending: Option<PendingDecision>,
    /// Every distinct card definition seen in either deck; consulted when a
    /// hero re-skins the controller's cards onto an element variant.
    #[serde(default)]
    pub card_pool: Vec<CardDefinition>,
}

impl GameState {
    pub fn opponent_of(player_index: u8) -> u8 {
        if player_index == 1 {
            2
        } else {
            1
        }
    }

    pub fn player(&self, player_index: u8) -> &PlayerState {
        &self.players[(player_index.max(1) as usize - 1).min(1)]
    }

    pub fn player_mut(&mut self, player_index: u8) -> &mut PlayerState {
        &mut self.players[(player_index.max(1) as usize - 1).min(1)]
    }

    /// Whether the given side is driven by the automated policy. In PVE
    /// matches player 2 is always the NPC.
    pub fn is_ai(&self, player_index: u8) -> bool {
        self.mode == MatchMode::Pve && player_index == 2
    }

    pub fn monster_at(&self, coord: BoardCoord) -> Option<&CardInstance> {
        self.player(coord.player_index).monster_at(coord.zone_index)
    }

    pub fn monster_at_mut(&mut self, coord: BoardCoord) -> Option<&mut CardInstance> {
        self.player_mut(coord.player_index).monster_at_mut(coord.zone_index)
    }

    /// Finds a monster by instance id across both boards.
    pub fn find_monster(&self, instance_id: Uuid) -> Option<BoardCoord> {
        for player in &self.players {
            if let Some(zone_index) = player.find_monster(instance_id) {
                return Some(BoardCoord::new(player.player_index, zone_index));
            }
        }
        None
    }

    pub fn push_event(&mut self, event: LogEvent) {
        self.log.push(event);
    }

    /// Flips the match to Completed the instant either life total is gone.
    /// Both dead at once is a draw (winner stays unset).
    pub fn check_lethal(&mut self) {
        if self.status != MatchStatus::InProgress {
            return;
        }
        let p1_dead = !self.players[0].alive();
        let p2_dead = !self.players[1].alive();
        if !p1_dead && !p2_dead {
            return;
        }
        self.status = MatchStatus::Completed;
        self.winner = match (p1_dead, p2_dead) {
            (true, true) => None,
            (true, false) => Some(2),
            (false, true) => Some(1),
            (false, false) => unreachable!(),
        };
        self.push_event(LogEvent::MatchEnded { winner: self.winner });
    }

    /// Deterministic JSON snapshot, suitable for exact reconstruction.
    pub fn to_snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_snapshot(snapshot: Value) -> Result<Self, ServiceError> {
        serde_json::from_value(snapshot)
            .map_err(|e| ServiceError::InvalidResponseBody(format!("GameState: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::player::STARTING_LIFE;

    fn bare_state() -> GameState {
        GameState {
            match_id: Uuid::new_v4(),
            mode: MatchMode::Pve,
            turn: 1,
            current_player: 1,
            phase: Phase::Start,
            status: MatchStatus::InProgress,
            winner: None,
            players: [
                PlayerState::new(1, "one", Vec::new(), Vec::new()),
                PlayerState::new(2, "two", Vec::new(), Vec::new()),
            ],
            log: Vec::new(),
            pending: None,
            card_pool: Vec::new(),
        }
    }

    #[test]
    fn lethal_sets_winner_once() {
        let mut state = bare_state();
        state.players[1].hp = 0;
        state.check_lethal();
        assert_eq!(state.status, MatchStatus::Completed);
        assert_eq!(state.winner, Some(1));

        // A later call must not rewrite the outcome.
        state.players[0].hp = 0;
        state.check_lethal();
        assert_eq!(state.winner, Some(1));
        assert_eq!(
            state.log.iter().filter(|e| matches!(e, LogEvent::MatchEnded { .. })).count(),
            1
        );
    }

    #[test]
    fn simultaneous_death_is_a_draw() {
        let mut state = bare_state();
        state.players[0].hp = 0;
        state.players[1].hp = -20;
        state.check_lethal();
        assert_eq!(state.status, MatchStatus::Completed);
        assert_eq!(state.winner, None);
    }

    #[test]
    fn snapshot_round_trip_is_identical() {
        let mut state = bare_state();
        state.players[0].hp = STARTING_LIFE - 250;
        state.push_event(LogEvent::TurnStarted { player: 1, turn: 1 });

        let snapshot = state.to_snapshot();
        let restored = GameState::from_snapshot(snapshot.clone()).expect("restores");
        assert_eq!(restored.to_snapshot(), snapshot);
    }
}
