use rand::seq::SliceRandom;
use uuid::Uuid;

use super::entity::card::{CardInstance, CardKind};
use super::entity::state::GameState;
use super::intent::Intent;

/// Maximum intents the NPC may issue in one turn before the driver forces
/// an end of turn. A runaway guard, not a gameplay rule.
pub const MAX_ACTIONS_PER_TURN: usize = 32;

enum SpellTargeting {
    None,
    Monster { friendly: bool, prefers_damaged: bool },
    Player,
}

/// Infers what a spell wants to hit from its declared keywords: buffs and
/// heals point at friendly monsters (heals prefer damaged ones), damage
/// points across the board.
fn spell_targeting(card: &CardInstance) -> SpellTargeting {
    let mut result = SpellTargeting::None;
    for effect in &card.effects {
        let keyword = effect.keyword.as_str();
        if keyword.contains("MONSTER") {
            let friendly = keyword.contains("BUFF")
                || keyword.contains("HEAL")
                || keyword.contains("HASTE")
                || keyword.contains("CLEANSE");
            return SpellTargeting::Monster {
                friendly,
                prefers_damaged: keyword.contains("HEAL"),
            };
        }
        if keyword.contains("PLAYER") {
            result = SpellTargeting::Player;
        }
    }
    result
}

/// Decides the NPC's next intent for the current state, or `None` when it
/// is not this player's turn. Pure over the state: the caller executes the
/// intent through the engine and asks again.
///
/// Priority order: hero summon, best monster summon, castable spell, trap
/// set, hero ability, best attack, end turn. Every level falls through when
/// its options are exhausted.
pub fn next_intent(state: &GameState, ai_index: u8) -> Option<Intent> {
    if state.current_player != ai_index {
        return None;
    }
    let player = state.player(ai_index);
    let enemy_index = GameState::opponent_of(ai_index);
    let enemy = state.player(enemy_index);
    let rng = &mut rand::thread_rng();

    let board_monsters: Vec<&CardInstance> =
        player.monster_zones.iter().flatten().collect();

    // 1. Hero, when two tributes stand ready.
    if player.hero.is_none() && player.summons_used < 1 {
        let hero_card = player
            .hand
            .iter()
            .find(|c| c.is_hero() || c.stars == 6);
        if let Some(hero) = hero_card {
            if board_monsters.len() >= 2 {
                let tributes: Vec<Uuid> = board_monsters
                    .iter()
                    .take(2)
                    .map(|c| c.instance_id)
                    .collect();
                return Some(Intent::PlayMonster {
                    card_instance_id: hero.instance_id,
                    zone_index: 0,
                    tribute_instance_ids: tributes,
                });
            }
        }
    }

    // 2. Highest-star monster the board can pay for.
    if player.summons_used < 1 {
        let mut candidates: Vec<&CardInstance> = player
            .hand
            .iter()
            .filter(|c| c.is_monster() && c.stars < 6)
            .collect();
        candidates.sort_by(|a, b| b.stars.cmp(&a.stars));
        for monster in candidates {
            let Some(zone_index) = player.first_empty_monster_zone() else {
                break;
            };
            let tributes: Vec<Uuid> = if monster.stars >= 4 {
                match board_monsters.first() {
                    Some(tribute) => vec![tribute.instance_id],
                    None => continue,
                }
            } else {
                Vec::new()
            };
            return Some(Intent::PlayMonster {
                card_instance_id: monster.instance_id,
                zone_index,
                tribute_instance_ids: tributes,
            });
        }
    }

    // 3. A spell with a satisfiable target.
    if player.spells_traps_used < 1 {
        for spell in player.hand.iter().filter(|c| c.card_type == CardKind::Spell) {
            match spell_targeting(spell) {
                SpellTargeting::None => {
                    return Some(Intent::PlaySpell {
                        card_instance_id: spell.instance_id,
                        target_player_index: None,
                        target_monster_instance_id: None,
                    });
                }
                SpellTargeting::Player => {
                    return Some(Intent::PlaySpell {
                        card_instance_id: spell.instance_id,
                        target_player_index: Some(enemy_index),
                        target_monster_instance_id: None,
                    });
                }
                SpellTargeting::Monster {
                    friendly,
                    prefers_damaged,
                } => {
                    let target = if friendly {
                        let mut own: Vec<&CardInstance> =
                            player.live_monsters().map(|(_, c)| c).collect();
                        if prefers_damaged {
                            let damaged: Vec<&CardInstance> = own
                                .iter()
                                .copied()
                                .filter(|c| c.hp < c.max_hp)
                                .collect();
                            if !damaged.is_empty() {
                                own = damaged;
                            }
                        }
                        own.choose(rng).copied()
                    } else {
                        let hostile: Vec<&CardInstance> =
                            enemy.live_monsters().map(|(_, c)| c).collect();
                        hostile.choose(rng).copied()
                    };
                    match target {
                        Some(card) => {
                            let target_player = if friendly { ai_index } else { enemy_index };
                            return Some(Intent::PlaySpell {
                                card_instance_id: spell.instance_id,
                                target_player_index: Some(target_player),
                                target_monster_instance_id: Some(card.instance_id),
                            });
                        }
                        // No legal target: try the next spell instead.
                        None => continue,
                    }
                }
            }
        }
    }

    // 4. Set a trap into an open zone.
    if player.spells_traps_used < 1 {
        let traps: Vec<&CardInstance> = player
            .hand
            .iter()
            .filter(|c| c.card_type == CardKind::Trap)
            .collect();
        if let Some(zone_index) = player.first_empty_spell_trap_zone() {
            if let Some(trap) = traps.choose(rng) {
                return Some(Intent::PlayTrap {
                    card_instance_id: trap.instance_id,
                    zone_index,
                });
            }
        }
    }

    // 5. Hero ability, aimed at the weakest enemy monster when one exists.
    if player.hero_ability_used < 1 {
        if let Some(hero) = &player.hero {
            if hero.active_ability().is_some() {
                let weakest = enemy
                    .live_monsters()
                    .min_by_key(|(_, c)| c.hp)
                    .map(|(_, c)| c.instance_id);
                return Some(Intent::ActivateHeroAbility {
                    target_player_index: weakest.is_none().then_some(enemy_index),
                    target_monster_instance_id: weakest,
                });
            }
        }
    }

    // 6. Attack: strongest ready monster into the weakest defender, or the
    // player directly across an empty board.
    let attacker = player
        .monster_zones
        .iter()
        .flatten()
        .filter(|c| !c.face_down && c.can_attack && c.alive())
        .max_by_key(|c| c.atk);
    if let Some(attacker) = attacker {
        let weakest_defender = enemy
            .live_monsters()
            .min_by_key(|(_, c)| c.hp)
            .map(|(_, c)| c.instance_id);
        return Some(match weakest_defender {
            Some(defender_instance_id) => Intent::AttackMonster {
                attacker_instance_id: attacker.instance_id,
                defender_instance_id,
            },
            None => Intent::AttackPlayer {
                attacker_instance_id: attacker.instance_id,
            },
        });
    }

    // 7. Nothing left worth doing.
    Some(Intent::EndTurn)
}
