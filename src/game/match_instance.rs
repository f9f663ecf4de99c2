use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::ai;
use super::engine;
use super::entity::state::{GameState, LogEvent, MatchStatus};
use super::intent::{Intent, IntentOutcome, PendingDecision};
use crate::logger;
use crate::utils::errors::IntentError;
use crate::utils::logger::Logger;

/// What one intent (or trap decision) produced, ready for the wire: the new
/// snapshot, everything appended to the log, and the open trap offer if the
/// processing suspended.
#[derive(Debug)]
pub struct IntentReply {
    pub snapshot: Value,
    pub events: Vec<LogEvent>,
    pub pending: Option<PendingDecision>,
    pub cancelled: Option<bool>,
}

/// One live match. The state sits behind a single `RwLock`: exactly one
/// intent mutates a match at a time, while separate matches stay fully
/// independent.
pub struct MatchInstance {
    state: RwLock<GameState>,
}

impl MatchInstance {
    pub fn new(state: GameState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn match_status(&self) -> MatchStatus {
        self.state.read().await.status
    }

    /// Applies one human intent, then lets the NPC respond until the turn
    /// comes back (PVE only). Holds the write lock for the whole transition
    /// so the engine never sees concurrent mutation.
    pub async fn handle_intent(&self, actor: u8, intent: Intent) -> Result<IntentReply, IntentError> {
        let mut state = self.state.write().await;
        let mark = state.log.len();

        let outcome = engine::apply_intent(&mut state, actor, intent)?;
        if matches!(outcome, IntentOutcome::Completed { .. }) {
            drive_npc(&mut state);
        }
        Ok(reply_since(&state, mark))
    }

    /// Resolves an outstanding trap decision, then resumes the NPC if the
    /// suspension interrupted its turn.
    pub async fn handle_trap_decision(
        &self,
        actor: u8,
        decision_id: Uuid,
        trap_instance_id: Option<Uuid>,
    ) -> Result<IntentReply, IntentError> {
        let mut state = self.state.write().await;
        let mark = state.log.len();

        let (_, cancelled) = engine::resolve_pending(&mut state, actor, decision_id, trap_instance_id)?;
        if state.pending.is_none() {
            drive_npc(&mut state);
        }
        let mut reply = reply_since(&state, mark);
        reply.cancelled = Some(cancelled);
        Ok(reply)
    }
}

fn reply_since(state: &GameState, mark: usize) -> IntentReply {
    IntentReply {
        snapshot: state.to_snapshot(),
        events: state.log[mark..].to_vec(),
        pending: state.pending.clone(),
        cancelled: None,
    }
}

/// Runs the automated side through the engine, one decided intent at a
/// time, until it yields the turn, suspends on a human trap, the match
/// ends, or the action cap trips.
fn drive_npc(state: &mut GameState) {
    let mut actions = 0;
    while state.status == MatchStatus::InProgress
        && state.pending.is_none()
        && state.is_ai(state.current_player)
    {
        let ai_player = state.current_player;
        if actions >= ai::MAX_ACTIONS_PER_TURN {
            logger!(
                WARN,
                "[MATCH] NPC hit the action cap on match `{}`; forcing end of turn",
                state.match_id
            );
            let _ = engine::apply_intent(&mut *state, ai_player, Intent::EndTurn);
            break;
        }
        let Some(intent) = ai::next_intent(state, ai_player) else {
            break;
        };
        let ends_turn = intent == Intent::EndTurn;
        match engine::apply_intent(&mut *state, ai_player, intent) {
            Ok(_) => {}
            Err(error) => {
                // A rejected pick means the policy and rules disagree; yield
                // the turn rather than loop on it.
                logger!(
                    WARN,
                    "[MATCH] NPC intent rejected ({}); ending its turn",
                    error.reason()
                );
                let _ = engine::apply_intent(&mut *state, ai_player, Intent::EndTurn);
                break;
            }
        }
        if ends_turn {
            break;
        }
        actions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::card::{CardDefinition, CardInstance, CardKind};
    use crate::game::entity::player::PlayerState;
    use crate::game::entity::state::{MatchMode, Phase};

    fn definition(code: &str, kind: CardKind, stars: u8, atk: i32, hp: i32) -> CardDefinition {
        CardDefinition {
            card_code: code.to_string(),
            name: code.to_string(),
            card_type: kind,
            stars,
            atk,
            hp,
            element_id: None,
            variant_group: None,
            trigger: None,
            effects: Vec::new(),
            description: None,
            art_asset_id: None,
            flavor_text: None,
        }
    }

    fn pve_state() -> GameState {
        let mut p1 = PlayerState::new(1, "human", Vec::new(), Vec::new());
        let mut p2 = PlayerState::new(2, "npc", Vec::new(), Vec::new());
        for i in 0..10 {
            let def = definition(&format!("C{i}"), CardKind::Monster, 1, 50, 50);
            p1.deck.push(CardInstance::from_definition(&def));
            p2.deck.push(CardInstance::from_definition(&def));
        }
        GameState {
            match_id: Uuid::new_v4(),
            mode: MatchMode::Pve,
            turn: 1,
            current_player: 1,
            phase: Phase::Main,
            status: MatchStatus::InProgress,
            winner: None,
            players: [p1, p2],
            log: Vec::new(),
            pending: None,
            card_pool: Vec::new(),
        }
    }

    #[tokio::test]
    async fn ending_the_turn_hands_it_to_the_npc_and_back() {
        let instance = MatchInstance::new(pve_state());
        let reply = instance
            .handle_intent(1, Intent::EndTurn)
            .await
            .expect("end turn applies");

        // The NPC took its whole turn (summon from its drawn cards, then
        // end) and control returned to the human.
        let state = instance.state.read().await;
        assert_eq!(state.current_player, 1);
        assert_eq!(state.turn, 3);
        assert!(reply
            .events
            .iter()
            .any(|e| matches!(e, LogEvent::TurnStarted { player: 2, .. })));
        assert!(reply
            .events
            .iter()
            .any(|e| matches!(e, LogEvent::TurnStarted { player: 1, .. })));
        assert!(reply.pending.is_none());
    }

    #[tokio::test]
    async fn wrong_actor_is_rejected_with_a_reason() {
        let instance = MatchInstance::new(pve_state());
        let err = instance.handle_intent(2, Intent::EndTurn).await.unwrap_err();
        assert_eq!(err.reason(), "not_your_turn");
    }
}
