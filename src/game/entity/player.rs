use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::card::CardInstance;

pub const STARTING_LIFE: i32 = 1500;
pub const MONSTER_ZONE_COUNT: usize = 4;
pub const SPELL_TRAP_ZONE_COUNT: usize = 4;
pub const STARTING_HAND_SIZE: usize = 5;
pub const TURN_DRAW_COUNT: usize = 2;

/// Full runtime state for one side of a match: life total, zones and the
/// per-turn usage counters. Zone slot indexes are only meaningful while the
/// slot is occupied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_index: u8,
    pub name: String,
    pub hp: i32,

    pub deck: Vec<CardInstance>,
    pub hand: Vec<CardInstance>,
    pub monster_zones: [Option<CardInstance>; MONSTER_ZONE_COUNT],
    pub spell_trap_zones: [Option<CardInstance>; SPELL_TRAP_ZONE_COUNT],
    pub hero: Option<CardInstance>,
    pub graveyard: Vec<CardInstance>,
    pub exile: Vec<CardInstance>,

    #[serde(default)]
    pub active_element: Option<i32>,

    // Per-turn usage, each capped at 1, reset at the owner's own turn start.
    #[serde(default)]
    pub summons_used: u8,
    #[serde(default)]
    pub spells_traps_used: u8,
    #[serde(default)]
    pub hero_ability_used: u8,
}

impl PlayerState {
    pub fn new(player_index: u8, name: &str, deck: Vec<CardInstance>, hand: Vec<CardInstance>) -> Self {
        Self {
            player_index,
            name: name.to_string(),
            hp: STARTING_LIFE,
            deck,
            hand,
            monster_zones: Default::default(),
            spell_trap_zones: Default::default(),
            hero: None,
            graveyard: Vec::new(),
            exile: Vec::new(),
            active_element: None,
            summons_used: 0,
            spells_traps_used: 0,
            hero_ability_used: 0,
        }
    }

    pub fn alive(&self) -> bool {
        self.hp > 0
    }

    pub fn reset_turn_usage(&mut self) {
        self.summons_used = 0;
        self.spells_traps_used = 0;
        self.hero_ability_used = 0;
    }

    pub fn find_in_hand(&self, instance_id: Uuid) -> Option<usize> {
        self.hand.iter().position(|c| c.instance_id == instance_id)
    }

    pub fn find_monster(&self, instance_id: Uuid) -> Option<usize> {
        self.monster_zones.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|c| c.instance_id == instance_id)
        })
    }

    pub fn find_trap(&self, instance_id: Uuid) -> Option<usize> {
        self.spell_trap_zones.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|c| c.instance_id == instance_id)
        })
    }

    pub fn monster_at(&self, zone_index: usize) -> Option<&CardInstance> {
        self.monster_zones.get(zone_index).and_then(Option::as_ref)
    }

    pub fn monster_at_mut(&mut self, zone_index: usize) -> Option<&mut CardInstance> {
        self.monster_zones.get_mut(zone_index).and_then(Option::as_mut)
    }

    /// Occupied monster slots with a living card, in zone order.
    pub fn live_monsters(&self) -> impl Iterator<Item = (usize, &CardInstance)> {
        self.monster_zones
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().filter(|c| c.alive()).map(|c| (i, c)))
    }

    pub fn live_monster_count(&self) -> usize {
        self.live_monsters().count()
    }

    pub fn first_empty_monster_zone(&self) -> Option<usize> {
        self.monster_zones.iter().position(Option::is_none)
    }

    pub fn first_empty_spell_trap_zone(&self) -> Option<usize> {
        self.spell_trap_zones.iter().position(Option::is_none)
    }

    /// Moves the card out of the given monster slot into the graveyard.
    pub fn bury_monster(&mut self, zone_index: usize) -> Option<Uuid> {
        let card = self.monster_zones.get_mut(zone_index)?.take()?;
        let id = card.instance_id;
        self.graveyard.push(card);
        Some(id)
    }

    /// Draws up to `count` cards from the front of the deck. No reshuffle;
    /// used by card effects, which stop at an empty deck.
    pub fn draw(&mut self, count: usize) -> usize {
        let drawn = count.min(self.deck.len());
        for _ in 0..drawn {
            let card = self.deck.remove(0);
            self.hand.push(card);
        }
        drawn
    }

    /// Turn-start draw: when the deck runs dry mid-draw and the graveyard
    /// still holds cards, the graveyard is shuffled back into the deck and
    /// drawing continues. With both empty the draw comes up short.
    ///
    /// # Returns
    /// `(cards_drawn, reshuffled_count)` where `reshuffled_count` is how many
    /// cards were recycled from the graveyard (0 when no reshuffle happened).
    pub fn draw_with_reshuffle(&mut self, count: usize) -> (usize, usize) {
        let mut drawn = 0;
        let mut reshuffled = 0;
        for _ in 0..count {
            if self.deck.is_empty() {
                if self.graveyard.is_empty() {
                    break;
                }
                reshuffled += self.graveyard.len();
                self.deck.append(&mut self.graveyard);
                self.deck.shuffle(&mut rand::thread_rng());
            }
            let card = self.deck.remove(0);
            self.hand.push(card);
            drawn += 1;
        }
        (drawn, reshuffled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::card::{CardDefinition, CardKind};

    fn dummy_card(code: &str) -> CardInstance {
        CardInstance::from_definition(&CardDefinition {
            card_code: code.to_string(),
            name: code.to_string(),
            card_type: CardKind::Monster,
            stars: 1,
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
    }

    fn player_with_deck(deck_size: usize) -> PlayerState {
        let deck = (0..deck_size).map(|i| dummy_card(&format!("C{i}"))).collect();
        PlayerState::new(1, "tester", deck, Vec::new())
    }

    #[test]
    fn draw_moves_cards_front_to_hand() {
        let mut player = player_with_deck(5);
        let first = player.deck[0].instance_id;
        assert_eq!(player.draw(2), 2);
        assert_eq!(player.hand.len(), 2);
        assert_eq!(player.deck.len(), 3);
        assert_eq!(player.hand[0].instance_id, first);
    }

    #[test]
    fn effect_draw_stops_at_empty_deck() {
        let mut player = player_with_deck(1);
        player.graveyard.push(dummy_card("G0"));
        assert_eq!(player.draw(3), 1);
        // Graveyard untouched: effect draws never recycle it.
        assert_eq!(player.graveyard.len(), 1);
    }

    #[test]
    fn turn_draw_reshuffles_graveyard_into_empty_deck() {
        // Deck of 1, graveyard of 3: drawing 2 must reshuffle mid-draw and
        // complete the draw without inventing cards.
        let mut player = player_with_deck(1);
        for i in 0..3 {
            player.graveyard.push(dummy_card(&format!("G{i}")));
        }
        let total_before = player.deck.len() + player.graveyard.len() + player.hand.len();

        let (drawn, reshuffled) = player.draw_with_reshuffle(2);
        assert_eq!(drawn, 2);
        assert_eq!(reshuffled, 3);
        assert!(player.graveyard.is_empty());
        assert_eq!(player.hand.len(), 2);
        assert_eq!(player.deck.len(), 2);
        let total_after = player.deck.len() + player.graveyard.len() + player.hand.len();
        assert_eq!(total_before, total_after);
    }

    #[test]
    fn turn_draw_comes_up_short_when_everything_is_empty() {
        let mut player = player_with_deck(1);
        let (drawn, reshuffled) = player.draw_with_reshuffle(2);
        assert_eq!(drawn, 1);
        assert_eq!(reshuffled, 0);
    }

    #[test]
    fn turn_usage_resets_together() {
        let mut player = player_with_deck(0);
        player.summons_used = 1;
        player.spells_traps_used = 1;
        player.hero_ability_used = 1;
        player.reset_turn_usage();
        assert_eq!(player.summons_used, 0);
        assert_eq!(player.spells_traps_used, 0);
        assert_eq!(player.hero_ability_used, 0);
    }

    #[test]
    fn bury_monster_empties_the_slot() {
        let mut player = player_with_deck(0);
        player.monster_zones[2] = Some(dummy_card("M"));
        let id = player.bury_monster(2);
        assert!(id.is_some());
        assert!(player.monster_zones[2].is_none());
        assert_eq!(player.graveyard.len(), 1);
    }
}
