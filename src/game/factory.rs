use rand::seq::SliceRandom;
use uuid::Uuid;

use super::entity::card::{CardDefinition, CardInstance};
use super::entity::player::{PlayerState, STARTING_HAND_SIZE};
use super::entity::state::{GameState, LogEvent, MatchMode, MatchStatus, Phase};
use crate::utils::errors::ConfigError;

/// Expands deck definitions into runtime instances and shuffles them with a
/// uniform permutation. A fresh RNG per call; no seed is shared between
/// matches.
pub fn build_deck_instances(deck_defs: &[CardDefinition]) -> Vec<CardInstance> {
    let mut instances: Vec<CardInstance> =
        deck_defs.iter().map(CardInstance::from_definition).collect();
    instances.shuffle(&mut rand::thread_rng());
    instances
}

fn initialize_player(
    player_index: u8,
    player_name: &str,
    deck_defs: &[CardDefinition],
) -> Result<PlayerState, ConfigError> {
    if deck_defs.is_empty() {
        return Err(ConfigError::EmptyDeck);
    }
    let deck = build_deck_instances(deck_defs);
    let mut player = PlayerState::new(player_index, player_name, deck, Vec::new());
    player.draw(STARTING_HAND_SIZE);
    Ok(player)
}

/// The master factory: given both sides' resolved decks, produces a fully
/// initialized match on turn 1 with player 1 to act.
pub fn create_match(
    match_id: Uuid,
    mode: MatchMode,
    player1: (&str, &[CardDefinition]),
    player2: (&str, &[CardDefinition]),
) -> Result<GameState, ConfigError> {
    let p1_state = initialize_player(1, player1.0, player1.1)?;
    let p2_state = initialize_player(2, player2.0, player2.1)?;

    // One entry per distinct card code; the hero re-skin looks up element
    // variants here.
    let mut card_pool: Vec<CardDefinition> = Vec::new();
    for def in player1.1.iter().chain(player2.1.iter()) {
        if !card_pool.iter().any(|d| d.card_code == def.card_code) {
            card_pool.push(def.clone());
        }
    }

    let mut state = GameState {
        match_id,
        mode,
        turn: 1,
        current_player: 1,
        phase: Phase::Start,
        status: MatchStatus::InProgress,
        winner: None,
        players: [p1_state, p2_state],
        log: Vec::new(),
        pending: None,
        card_pool,
    };

    state.push_event(LogEvent::GameInit {
        player1: player1.0.to_string(),
        player2: player2.0.to_string(),
    });
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::card::CardKind;

    fn deck_of(size: usize) -> Vec<CardDefinition> {
        (0..size)
            .map(|i| CardDefinition {
                card_code: format!("C{i}"),
                name: format!("Card {i}"),
                card_type: CardKind::Monster,
                stars: (i % 3 + 1) as u8,
                atk: 100,
                hp: 100,
                element_id: None,
                variant_group: None,
                trigger: None,
                effects: Vec::new(),
                description: None,
                art_asset_id: None,
                flavor_text: None,
            })
            .collect()
    }

    #[test]
    fn fresh_match_deals_five_card_hands() {
        // 25-card decks: after init both sides hold 5 and draw from 20.
        let deck = deck_of(25);
        let state = create_match(
            Uuid::new_v4(),
            MatchMode::Pve,
            ("player", &deck),
            ("npc", &deck),
        )
        .expect("match initializes");

        assert_eq!(state.turn, 1);
        assert_eq!(state.current_player, 1);
        assert_eq!(state.status, MatchStatus::InProgress);
        assert_eq!(state.phase, Phase::Start);
        assert_eq!(state.winner, None);
        for player in &state.players {
            assert_eq!(player.hand.len(), 5);
            assert_eq!(player.deck.len(), 20);
            assert_eq!(player.hp, 1500);
            assert!(player.hero.is_none());
            assert!(player.monster_zones.iter().all(Option::is_none));
        }
        assert!(matches!(state.log[0], LogEvent::GameInit { .. }));
    }

    #[test]
    fn instances_start_face_down_and_exhausted() {
        let deck = deck_of(6);
        let instances = build_deck_instances(&deck);
        assert_eq!(instances.len(), 6);
        for card in &instances {
            assert!(card.face_down);
            assert!(!card.can_attack);
            assert_eq!(card.hp, card.max_hp);
        }
    }

    #[test]
    fn each_copy_gets_a_distinct_instance_id() {
        let mut deck = deck_of(1);
        deck.push(deck[0].clone());
        let instances = build_deck_instances(&deck);
        assert_ne!(instances[0].instance_id, instances[1].instance_id);
    }

    #[test]
    fn empty_deck_is_a_configuration_error() {
        let full = deck_of(10);
        let err = create_match(Uuid::new_v4(), MatchMode::Pve, ("player", &[]), ("npc", &full))
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyDeck);
    }

    #[test]
    fn card_pool_dedupes_by_code() {
        let mut deck = deck_of(3);
        deck.push(deck[0].clone());
        let state = create_match(
            Uuid::new_v4(),
            MatchMode::Pvp,
            ("one", &deck),
            ("two", &deck),
        )
        .expect("match initializes");
        assert_eq!(state.card_pool.len(), 3);
    }
}
