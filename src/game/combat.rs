use super::entity::state::{BoardCoord, GameState, LogEvent};

/// Applies simultaneous combat damage between two monsters and spills the
/// excess onto the owning players.
///
/// Both sides take the opposing ATK at once; overflow is whatever exceeded
/// the HP the opposing monster had left, and it always reaches the player
/// (this is a core combat rule, not an effect-gated option). Returns the
/// would-be deaths in resolution order: defender first, then attacker.
pub(crate) fn resolve_monster_combat(
    state: &mut GameState,
    attacker: BoardCoord,
    defender: BoardCoord,
) -> Vec<BoardCoord> {
    let (attacker_atk, attacker_hp, attacker_id) = match state.monster_at(attacker) {
        Some(card) => (card.atk, card.hp, card.instance_id),
        None => return Vec::new(),
    };
    let (defender_atk, defender_hp, defender_id) = match state.monster_at(defender) {
        Some(card) => (card.atk, card.hp, card.instance_id),
        None => return Vec::new(),
    };

    let defender_hp_after = (defender_hp - attacker_atk).max(0);
    let attacker_hp_after = (attacker_hp - defender_atk).max(0);
    let overflow_to_defender = (attacker_atk - defender_hp).max(0);
    let overflow_to_attacker = (defender_atk - attacker_hp).max(0);

    if let Some(card) = state.monster_at_mut(attacker) {
        card.hp = attacker_hp_after;
        // The attack is spent whether or not the attacker survives.
        card.can_attack = false;
    }
    if let Some(card) = state.monster_at_mut(defender) {
        card.hp = defender_hp_after;
    }

    if overflow_to_defender > 0 {
        let player = state.player_mut(defender.player_index);
        player.hp = (player.hp - overflow_to_defender).max(0);
    }
    if overflow_to_attacker > 0 {
        let player = state.player_mut(attacker.player_index);
        player.hp = (player.hp - overflow_to_attacker).max(0);
    }

    state.push_event(LogEvent::CombatResolved {
        attacker_instance_id: attacker_id,
        defender_instance_id: defender_id,
        attacker_hp_after,
        defender_hp_after,
        overflow_to_attacker,
        overflow_to_defender,
    });

    let mut deaths = Vec::new();
    if defender_hp_after == 0 {
        deaths.push(defender);
    }
    if attacker_hp_after == 0 {
        deaths.push(attacker);
    }
    deaths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::card::{CardDefinition, CardInstance, CardKind};
    use crate::game::entity::player::PlayerState;
    use crate::game::entity::state::{MatchMode, MatchStatus, Phase};
    use uuid::Uuid;

    fn monster(atk: i32, hp: i32) -> CardInstance {
        let mut card = CardInstance::from_definition(&CardDefinition {
            card_code: "M".to_string(),
            name: "M".to_string(),
            card_type: CardKind::Monster,
            stars: 3,
            atk,
            hp,
            element_id: None,
            variant_group: None,
            trigger: None,
            effects: Vec::new(),
            description: None,
            art_asset_id: None,
            flavor_text: None,
        });
        card.face_down = false;
        card.can_attack = true;
        card
    }

    fn state_with(attacker: CardInstance, defender: CardInstance) -> GameState {
        let mut p1 = PlayerState::new(1, "one", Vec::new(), Vec::new());
        let mut p2 = PlayerState::new(2, "two", Vec::new(), Vec::new());
        p1.monster_zones[0] = Some(attacker);
        p2.monster_zones[0] = Some(defender);
        GameState {
            match_id: Uuid::new_v4(),
            mode: MatchMode::Pvp,
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

    #[test]
    fn simultaneous_damage_both_ways() {
        let mut state = state_with(monster(150, 400), monster(100, 300));
        let deaths = resolve_monster_combat(
            &mut state,
            BoardCoord::new(1, 0),
            BoardCoord::new(2, 0),
        );
        assert!(deaths.is_empty());
        assert_eq!(state.players[0].monster_zones[0].as_ref().unwrap().hp, 300);
        assert_eq!(state.players[1].monster_zones[0].as_ref().unwrap().hp, 150);
        // No overflow when both survive.
        assert_eq!(state.players[0].hp, 1500);
        assert_eq!(state.players[1].hp, 1500);
    }

    #[test]
    fn overflow_spills_onto_the_defending_player() {
        // ATK 150 into 100 HP: defender dies, 50 spills over.
        let mut state = state_with(monster(150, 400), monster(20, 100));
        let deaths = resolve_monster_combat(
            &mut state,
            BoardCoord::new(1, 0),
            BoardCoord::new(2, 0),
        );
        assert_eq!(deaths, vec![BoardCoord::new(2, 0)]);
        assert_eq!(state.players[1].monster_zones[0].as_ref().unwrap().hp, 0);
        assert_eq!(state.players[1].hp, 1450);
    }

    #[test]
    fn overflow_can_hit_both_players() {
        let mut state = state_with(monster(500, 50), monster(400, 100));
        let deaths = resolve_monster_combat(
            &mut state,
            BoardCoord::new(1, 0),
            BoardCoord::new(2, 0),
        );
        // Defender first, attacker second.
        assert_eq!(
            deaths,
            vec![BoardCoord::new(2, 0), BoardCoord::new(1, 0)]
        );
        assert_eq!(state.players[1].hp, 1500 - 400);
        assert_eq!(state.players[0].hp, 1500 - 350);
    }

    #[test]
    fn overflow_never_drives_life_below_zero() {
        let mut state = state_with(monster(9000, 400), monster(10, 100));
        state.players[1].hp = 50;
        resolve_monster_combat(&mut state, BoardCoord::new(1, 0), BoardCoord::new(2, 0));
        assert_eq!(state.players[1].hp, 0);
    }

    #[test]
    fn attacker_spends_its_attack() {
        let mut state = state_with(monster(10, 400), monster(10, 400));
        resolve_monster_combat(&mut state, BoardCoord::new(1, 0), BoardCoord::new(2, 0));
        assert!(!state.players[0].monster_zones[0].as_ref().unwrap().can_attack);
    }
}
