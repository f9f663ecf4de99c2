use super::{EffectContext, EffectResult};
use crate::game::entity::card::{EffectEntry, StatusEffect, STATUS_FROZEN, STATUS_IMMUNE};
use crate::game::entity::state::{BoardCoord, GameState, LogEvent};

fn no_target(ctx: &EffectContext, reason: &str) -> EffectResult {
    EffectResult::with_event(LogEvent::EffectNoTarget {
        reason: reason.to_string(),
        card_code: ctx.source_card.card_code.clone(),
    })
}

fn invalid_target(ctx: &EffectContext, reason: &str) -> EffectResult {
    EffectResult::with_event(LogEvent::EffectInvalidTarget {
        reason: reason.to_string(),
        card_code: ctx.source_card.card_code.clone(),
    })
}

/// The single-target monster coordinate supplied by the action layer,
/// validated against the current board.
fn target_monster(ctx: &EffectContext) -> Option<BoardCoord> {
    let coord = ctx.targets.monster?;
    ctx.state.monster_at(coord).map(|_| coord)
}

fn damage_player(state: &mut GameState, player_index: u8, amount: i32) -> EffectResult {
    let player = state.player_mut(player_index);
    let before = player.hp;
    player.hp = (player.hp - amount.max(0)).max(0);
    EffectResult::with_event(LogEvent::EffectDamagePlayer {
        player_index,
        amount,
        hp_before: before,
        hp_after: player.hp,
    })
}

fn heal_player(state: &mut GameState, player_index: u8, amount: i32) -> EffectResult {
    let player = state.player_mut(player_index);
    let before = player.hp;
    player.hp += amount.max(0);
    EffectResult::with_event(LogEvent::EffectHealPlayer {
        player_index,
        amount,
        hp_before: before,
        hp_after: player.hp,
    })
}

/// Damage to a monster slot, flagging it for destruction when it hits 0.
/// The actual graveyard move belongs to the action layer.
fn damage_monster(state: &mut GameState, coord: BoardCoord, amount: i32) -> EffectResult {
    let Some(card) = state.monster_at_mut(coord) else {
        return EffectResult::default();
    };
    let id = card.instance_id;
    let (before, after) = card.apply_damage(amount);
    let mut result = EffectResult::with_event(LogEvent::EffectDamageMonster {
        player_index: coord.player_index,
        zone_index: coord.zone_index,
        amount,
        hp_before: before,
        hp_after: after,
        card_instance_id: id,
    });
    if after <= 0 {
        result.destroyed.push(coord);
    }
    result
}

fn apply_status_at(state: &mut GameState, coord: BoardCoord, status: StatusEffect) -> EffectResult {
    let Some(card) = state.monster_at_mut(coord) else {
        return EffectResult::default();
    };
    let id = card.instance_id;
    if card.apply_status(status.clone()) {
        EffectResult::with_event(LogEvent::EffectStatusApplied {
            player_index: coord.player_index,
            zone_index: coord.zone_index,
            status,
            card_instance_id: id,
        })
    } else {
        EffectResult::with_event(LogEvent::EffectStatusBlocked {
            player_index: coord.player_index,
            zone_index: coord.zone_index,
            blocked_status: status.code,
            card_instance_id: id,
        })
    }
}

/// Overflow beyond what the monster had left spills onto its controller.
fn overflow_to_controller(
    state: &mut GameState,
    coord: BoardCoord,
    amount: i32,
    hp_before: i32,
) -> Option<EffectResult> {
    let overflow = (amount - hp_before).max(0);
    if overflow > 0 {
        Some(damage_player(state, coord.player_index, overflow))
    } else {
        None
    }
}

fn hp_before_from(result: &EffectResult) -> Option<i32> {
    result.events.iter().find_map(|e| match e {
        LogEvent::EffectDamageMonster { hp_before, .. } => Some(*hp_before),
        _ => None,
    })
}

// --- Spell keywords -------------------------------------------------------

pub fn spell_damage_monster(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let amount = entry.int("amount", 0);
    let Some(coord) = target_monster(ctx) else {
        return no_target(ctx, "MONSTER_NOT_FOUND");
    };
    let mut result = damage_monster(ctx.state, coord, amount);
    if entry.flag("overflow_to_player", false) {
        if let Some(hp_before) = hp_before_from(&result) {
            if let Some(spill) = overflow_to_controller(ctx.state, coord, amount, hp_before) {
                result.merge(spill);
            }
        }
    }
    result
}

pub fn spell_damage_player(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let amount = entry.int("amount", 0);
    let target = ctx
        .targets
        .player
        .unwrap_or_else(|| GameState::opponent_of(ctx.source_player));
    damage_player(ctx.state, target, amount)
}

pub fn spell_heal_monster(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let amount = entry.int("amount", 0);
    let Some(coord) = target_monster(ctx) else {
        return no_target(ctx, "MONSTER_NOT_FOUND");
    };
    let Some(card) = ctx.state.monster_at_mut(coord) else {
        return no_target(ctx, "MONSTER_NOT_FOUND");
    };
    let id = card.instance_id;
    let (before, after) = card.heal(amount);
    EffectResult::with_event(LogEvent::EffectHealMonster {
        player_index: coord.player_index,
        zone_index: coord.zone_index,
        amount,
        hp_before: before,
        hp_after: after,
        card_instance_id: id,
    })
}

pub fn spell_heal_player(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let amount = entry.int("amount", 0);
    let target = ctx.targets.player.unwrap_or(ctx.source_player);
    heal_player(ctx.state, target, amount)
}

pub fn apply_status(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let Some(status) = entry.status_effect() else {
        return no_target(ctx, "STATUS_NOT_DECLARED");
    };
    let coord = match target_monster(ctx) {
        Some(coord) => coord,
        // Reactive path: fall back to the monster named by the trigger.
        None => match ctx
            .trigger_event
            .as_ref()
            .and_then(|t| t.monster_instance_id)
            .and_then(|id| ctx.state.find_monster(id))
        {
            Some(coord) => coord,
            None => return no_target(ctx, "MONSTER_NOT_FOUND"),
        },
    };
    apply_status_at(ctx.state, coord, status)
}

pub fn spell_draw_cards(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let count = entry.int("count", 0).max(0) as usize;
    if count == 0 {
        return EffectResult::default();
    }
    let target = ctx.targets.player.unwrap_or(ctx.source_player);
    let drawn = ctx.state.player_mut(target).draw(count);
    EffectResult::with_event(LogEvent::EffectDrawCards {
        player_index: target,
        amount: drawn,
    })
}

pub(crate) fn buff_card_at(state: &mut GameState, coord: BoardCoord, atk: i32, hp: i32) -> Option<LogEvent> {
    let card = state.monster_at_mut(coord)?;
    card.atk += atk;
    card.max_hp += hp;
    card.hp = (card.hp + hp).clamp(0, card.max_hp);
    Some(LogEvent::EffectBuffMonster {
        player_index: coord.player_index,
        zone_index: coord.zone_index,
        atk_after: card.atk,
        hp_after: card.hp,
        max_hp_after: card.max_hp,
        card_instance_id: card.instance_id,
    })
}

pub fn spell_buff_monster(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let atk = entry.int("atk", 0);
    let hp = entry.int("hp", 0);
    let mut result = EffectResult::default();

    match entry.text("target") {
        Some("all_monsters") | Some("own_monsters") => {
            let sides: Vec<u8> = if entry.text("target") == Some("own_monsters") {
                vec![ctx.source_player]
            } else {
                vec![1, 2]
            };
            for player_index in sides {
                let coords: Vec<BoardCoord> = ctx
                    .state
                    .player(player_index)
                    .monster_zones
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| slot.is_some())
                    .map(|(zone_index, _)| BoardCoord::new(player_index, zone_index))
                    .collect();
                for coord in coords {
                    if let Some(event) = buff_card_at(ctx.state, coord, atk, hp) {
                        result.events.push(event);
                    }
                }
            }
        }
        _ => {
            let Some(coord) = target_monster(ctx) else {
                return no_target(ctx, "MONSTER_NOT_FOUND");
            };
            if coord.player_index != ctx.source_player {
                return invalid_target(ctx, "CANNOT_BUFF_ENEMY_MONSTER");
            }
            if let Some(event) = buff_card_at(ctx.state, coord, atk, hp) {
                result.events.push(event);
            }
        }
    }
    result
}

pub fn spell_cleanse_monster(ctx: &mut EffectContext, _entry: &EffectEntry) -> EffectResult {
    let Some(coord) = target_monster(ctx) else {
        return no_target(ctx, "MONSTER_NOT_FOUND");
    };
    let Some(card) = ctx.state.monster_at_mut(coord) else {
        return no_target(ctx, "MONSTER_NOT_FOUND");
    };
    let removed = card.statuses.len();
    card.statuses.clear();
    EffectResult::with_event(LogEvent::EffectCleanseMonster {
        player_index: coord.player_index,
        zone_index: coord.zone_index,
        removed,
    })
}

/// Haste flips the monster face-up (face-down cards cannot attack) and
/// grants immediate attack eligibility, summoning sickness included.
pub fn spell_haste(ctx: &mut EffectContext, _entry: &EffectEntry) -> EffectResult {
    let Some(coord) = target_monster(ctx) else {
        return no_target(ctx, "MONSTER_NOT_FOUND");
    };
    let Some(card) = ctx.state.monster_at_mut(coord) else {
        return no_target(ctx, "MONSTER_NOT_FOUND");
    };
    card.face_down = false;
    card.can_attack = true;
    EffectResult::with_event(LogEvent::EffectHaste {
        player_index: coord.player_index,
        zone_index: coord.zone_index,
        card_instance_id: card.instance_id,
    })
}

// --- Hero actives ---------------------------------------------------------

/// Hero nuke: monster damage always overflows onto the controller, like a
/// fireball. Falls back to a direct player hit when no monster is targeted.
pub fn hero_active_damage(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let amount = entry.int("amount", 0);
    if amount <= 0 {
        return EffectResult::default();
    }
    if let Some(coord) = target_monster(ctx) {
        let mut result = damage_monster(ctx.state, coord, amount);
        if let Some(hp_before) = hp_before_from(&result) {
            if let Some(spill) = overflow_to_controller(ctx.state, coord, amount, hp_before) {
                result.merge(spill);
            }
        }
        return result;
    }
    if let Some(player_index) = ctx.targets.player {
        return damage_player(ctx.state, player_index, amount);
    }
    no_target(ctx, "NO_MONSTER_OR_PLAYER_TARGET")
}

/// Freeze for one round, then a round of status immunity so the target
/// cannot be chain-frozen.
pub fn hero_active_freeze(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let turns = entry.int("turns", 2).max(1) as u32;
    let Some(coord) = target_monster(ctx) else {
        return no_target(ctx, "MONSTER_NOT_FOUND");
    };
    let mut frozen = StatusEffect::fixed(STATUS_FROZEN, turns);
    frozen.on_expire = Some(STATUS_IMMUNE.to_string());
    let result = apply_status_at(ctx.state, coord, frozen);
    if let Some(card) = ctx.state.monster_at_mut(coord) {
        if card.has_status(STATUS_FROZEN) {
            card.can_attack = false;
        }
    }
    result
}

/// Charge-costed execute: destroy a face-up enemy monster outright; a big
/// enough kill feeds the lowest-HP ally a permanent HP buff.
pub fn hero_active_soul_rend(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let charge_cost = entry.int("charge_cost", 3).max(0) as u32;
    let hp_threshold = entry.int("if_target_hp_gt", 200);
    let buff_amount = entry.int("buff_lowest_ally_hp_increase", 100);
    let require_face_up = entry.flag("target_face_up", true);

    let current_charges = ctx
        .state
        .player(ctx.source_player)
        .hero
        .as_ref()
        .map(|h| h.hero_charges)
        .unwrap_or(0);
    if current_charges < charge_cost {
        let mut result = invalid_target(ctx, "NOT_ENOUGH_CHARGES");
        result.cancelled = true;
        return result;
    }

    let Some(coord) = target_monster(ctx) else {
        return no_target(ctx, "MONSTER_NOT_FOUND");
    };
    let (hp_before, target_id, face_down) = match ctx.state.monster_at(coord) {
        Some(card) => (card.hp, card.instance_id, card.face_down),
        None => return no_target(ctx, "MONSTER_NOT_FOUND"),
    };
    if require_face_up && face_down {
        let mut result = invalid_target(ctx, "TARGET_MUST_BE_FACE_UP");
        result.cancelled = true;
        return result;
    }

    let mut result = EffectResult::default();
    if let Some(hero) = ctx.state.player_mut(ctx.source_player).hero.as_mut() {
        hero.hero_charges -= charge_cost;
        result.events.push(LogEvent::EffectHeroCharges {
            spent: charge_cost,
            remaining: hero.hero_charges,
        });
    }

    if let Some(card) = ctx.state.monster_at_mut(coord) {
        card.hp = 0;
    }
    result.destroyed.push(coord);
    result.events.push(LogEvent::EffectDestroyMonster {
        player_index: coord.player_index,
        zone_index: coord.zone_index,
        card_instance_id: target_id,
    });

    if hp_before > hp_threshold && buff_amount > 0 {
        let lowest = ctx
            .state
            .player(ctx.source_player)
            .live_monsters()
            .min_by_key(|(_, c)| c.hp)
            .map(|(zone_index, _)| BoardCoord::new(ctx.source_player, zone_index));
        if let Some(ally) = lowest {
            if let Some(event) = buff_card_at(ctx.state, ally, 0, buff_amount) {
                result.events.push(event);
            }
        }
    }
    result
}

// --- Reactive / trap keywords ---------------------------------------------

/// Hard counter: cancel the chain. With `reflect` the action layer replays
/// the countered spell against the caster's own side.
pub fn trap_counter_spell(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let reflect = entry.flag("reflect", false);
    EffectResult {
        events: vec![LogEvent::EffectCounterSpell {
            trap_card_instance_id: ctx.source_card.instance_id,
            reflect,
        }],
        destroyed: Vec::new(),
        cancelled: true,
        reflect_spell: reflect,
    }
}

/// Cancels a declared attack, by default throwing the attacker's own ATK
/// back at it.
pub fn trap_negate_attack(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let Some(attacker_id) = ctx
        .trigger_event
        .as_ref()
        .and_then(|t| t.attacker_instance_id)
    else {
        return no_target(ctx, "NO_ATTACKER");
    };
    let Some(coord) = ctx.state.find_monster(attacker_id) else {
        return no_target(ctx, "ATTACKER_NOT_FOUND");
    };

    let mut result = EffectResult {
        events: vec![LogEvent::EffectNegateAttack {
            trap_card_instance_id: ctx.source_card.instance_id,
            attacker_instance_id: attacker_id,
        }],
        destroyed: Vec::new(),
        cancelled: true,
        reflect_spell: false,
    };

    if entry.flag("reflect_damage", true) {
        let fallback = ctx.trigger_event.as_ref().map(|t| t.amount).unwrap_or(0);
        let amount = entry.int("damage_amount", fallback);
        result.merge(damage_monster(ctx.state, coord, amount));
    }
    result
}

/// Percentage of the triggering hit bounced back onto the attacking player.
pub fn trap_reflect_damage(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let trigger = match ctx.trigger_event.as_ref() {
        Some(trigger) => trigger,
        None => return EffectResult::default(),
    };
    let pct = entry.int("percentage", 100).max(0);
    let reflected = trigger.amount.max(0) * pct / 100;
    let Some(attacking_player) = trigger.attacking_player else {
        return EffectResult::default();
    };
    if reflected <= 0 {
        return EffectResult::default();
    }
    let mut result = damage_player(ctx.state, attacking_player, reflected);
    result.events.insert(
        0,
        LogEvent::EffectReflectDamage {
            player_index: attacking_player,
            amount: reflected,
        },
    );
    result
}

/// Keeps a would-be-destroyed ally on the board by flooring its HP.
pub fn trap_prevent_destruction(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let coord = match target_monster(ctx) {
        Some(coord) => Some(coord),
        None => ctx
            .trigger_event
            .as_ref()
            .and_then(|t| t.monster_instance_id)
            .and_then(|id| ctx.state.find_monster(id)),
    };
    let Some(coord) = coord else {
        return no_target(ctx, "MONSTER_NOT_FOUND");
    };
    let floor = entry.int("floor", 1).max(1);
    let Some(card) = ctx.state.monster_at_mut(coord) else {
        return no_target(ctx, "MONSTER_NOT_FOUND");
    };
    if card.hp <= 0 {
        card.hp = floor;
    }
    EffectResult::with_event(LogEvent::EffectPreventDestruction {
        player_index: coord.player_index,
        zone_index: coord.zone_index,
        card_instance_id: card.instance_id,
        hp_after: card.hp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::effects::{resolve_card_effects, EffectContext, Targets};
    use crate::game::entity::card::{CardDefinition, CardInstance, CardKind};
    use crate::game::entity::player::PlayerState;
    use crate::game::entity::state::{GameState, MatchMode, MatchStatus, Phase};
    use crate::game::intent::TriggerEvent;
    use serde_json::json;
    use uuid::Uuid;

    fn definition(code: &str, kind: CardKind, atk: i32, hp: i32) -> CardDefinition {
        CardDefinition {
            card_code: code.to_string(),
            name: code.to_string(),
            card_type: kind,
            stars: 2,
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

    fn monster(code: &str, atk: i32, hp: i32) -> CardInstance {
        let mut card = CardInstance::from_definition(&definition(code, CardKind::Monster, atk, hp));
        card.face_down = false;
        card
    }

    fn state() -> GameState {
        GameState {
            match_id: Uuid::new_v4(),
            mode: MatchMode::Pvp,
            turn: 1,
            current_player: 1,
            phase: Phase::Main,
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

    fn ctx<'a>(state: &'a mut GameState, source: &CardInstance, targets: Targets) -> EffectContext<'a> {
        EffectContext {
            state,
            source_player: 1,
            source_card: source.clone(),
            targets,
            trigger: None,
            trigger_event: None,
        }
    }

    fn spell_with(effects: Vec<EffectEntry>) -> CardInstance {
        let mut def = definition("SPELL", CardKind::Spell, 0, 0);
        def.effects = effects;
        CardInstance::from_definition(&def)
    }

    #[test]
    fn damage_monster_overflows_excess_to_controller() {
        let mut gs = state();
        gs.players[1].monster_zones[0] = Some(monster("TGT", 50, 100));
        let spell = spell_with(vec![EffectEntry::new("SPELL_DAMAGE_MONSTER")
            .with("amount", json!(150))
            .with("overflow_to_player", json!(true))]);

        let targets = Targets {
            player: None,
            monster: Some(BoardCoord::new(2, 0)),
        };
        let mut context = ctx(&mut gs, &spell, targets);
        let result = resolve_card_effects(&mut context);

        assert_eq!(result.destroyed, vec![BoardCoord::new(2, 0)]);
        assert_eq!(gs.players[1].monster_zones[0].as_ref().unwrap().hp, 0);
        // 150 against 100 HP: 50 spills onto the controller.
        assert_eq!(gs.players[1].hp, 1450);
    }

    #[test]
    fn exact_kill_has_no_overflow() {
        let mut gs = state();
        gs.players[1].monster_zones[0] = Some(monster("TGT", 50, 150));
        let spell = spell_with(vec![EffectEntry::new("SPELL_DAMAGE_MONSTER")
            .with("amount", json!(150))
            .with("overflow_to_player", json!(true))]);
        let targets = Targets {
            player: None,
            monster: Some(BoardCoord::new(2, 0)),
        };
        let mut context = ctx(&mut gs, &spell, targets);
        resolve_card_effects(&mut context);
        assert_eq!(gs.players[1].hp, 1500);
    }

    #[test]
    fn buffing_an_enemy_monster_is_rejected() {
        let mut gs = state();
        gs.players[1].monster_zones[0] = Some(monster("TGT", 50, 100));
        let spell = spell_with(vec![EffectEntry::new("SPELL_BUFF_MONSTER")
            .with("atk", json!(50))
            .with("hp", json!(50))]);
        let targets = Targets {
            player: None,
            monster: Some(BoardCoord::new(2, 0)),
        };
        let mut context = ctx(&mut gs, &spell, targets);
        let result = resolve_card_effects(&mut context);

        assert!(matches!(
            result.events[0],
            LogEvent::EffectInvalidTarget { .. }
        ));
        assert_eq!(gs.players[1].monster_zones[0].as_ref().unwrap().atk, 50);
    }

    #[test]
    fn own_monsters_buff_raises_hp_and_max() {
        let mut gs = state();
        gs.players[0].monster_zones[0] = Some(monster("A", 50, 100));
        gs.players[0].monster_zones[2] = Some(monster("B", 60, 120));
        gs.players[1].monster_zones[0] = Some(monster("E", 70, 140));
        let spell = spell_with(vec![EffectEntry::new("SPELL_BUFF_MONSTER")
            .with("atk", json!(10))
            .with("hp", json!(20))
            .with("target", json!("own_monsters"))]);
        let mut context = ctx(&mut gs, &spell, Targets::default());
        let result = resolve_card_effects(&mut context);

        assert_eq!(result.events.len(), 2);
        let a = gs.players[0].monster_zones[0].as_ref().unwrap();
        assert_eq!((a.atk, a.hp, a.max_hp), (60, 120, 120));
        // Enemy untouched.
        assert_eq!(gs.players[1].monster_zones[0].as_ref().unwrap().atk, 70);
    }

    #[test]
    fn status_immune_monster_blocks_application() {
        let mut gs = state();
        let mut shielded = monster("TGT", 50, 100);
        shielded.apply_status(StatusEffect::permanent(STATUS_IMMUNE));
        gs.players[1].monster_zones[0] = Some(shielded);
        let spell = spell_with(vec![EffectEntry::new("SPELL_APPLY_STATUS")
            .with("status", json!("FROZEN"))
            .with("duration_type", json!("FIXED_TURNS"))
            .with("duration_value", json!(2))]);
        let targets = Targets {
            player: None,
            monster: Some(BoardCoord::new(2, 0)),
        };
        let mut context = ctx(&mut gs, &spell, targets);
        let result = resolve_card_effects(&mut context);

        assert!(matches!(
            result.events[0],
            LogEvent::EffectStatusBlocked { .. }
        ));
        assert!(!gs.players[1].monster_zones[0]
            .as_ref()
            .unwrap()
            .has_status(STATUS_FROZEN));
    }

    #[test]
    fn unknown_keyword_is_logged_and_skipped() {
        let mut gs = state();
        let spell = spell_with(vec![
            EffectEntry::new("SPELL_SUMMON_DRAGON_HORDE"),
            EffectEntry::new("SPELL_HEAL_PLAYER").with("amount", json!(100)),
        ]);
        gs.players[0].hp = 1000;
        let mut context = ctx(&mut gs, &spell, Targets::default());
        let result = resolve_card_effects(&mut context);

        assert!(matches!(
            result.events[0],
            LogEvent::EffectUnknownKeyword { .. }
        ));
        // The rest of the chain still resolved.
        assert_eq!(gs.players[0].hp, 1100);
    }

    #[test]
    fn counter_spell_cancels_and_requests_reflection() {
        let mut gs = state();
        let trap = spell_with(vec![
            EffectEntry::new("TRAP_COUNTER_SPELL").with("reflect", json!(true))
        ]);
        let mut context = ctx(&mut gs, &trap, Targets::default());
        let result = resolve_card_effects(&mut context);
        assert!(result.cancelled);
        assert!(result.reflect_spell);
    }

    #[test]
    fn cancellation_stops_the_chain() {
        let mut gs = state();
        let trap = spell_with(vec![
            EffectEntry::new("TRAP_COUNTER_SPELL"),
            EffectEntry::new("SPELL_DAMAGE_PLAYER").with("amount", json!(500)),
        ]);
        let mut context = ctx(&mut gs, &trap, Targets::default());
        let result = resolve_card_effects(&mut context);
        assert!(result.cancelled);
        assert_eq!(gs.players[1].hp, 1500);
    }

    #[test]
    fn reflect_damage_returns_percentage_to_attacker() {
        let mut gs = state();
        let trap = spell_with(vec![
            EffectEntry::new("TRAP_REFLECT_DAMAGE").with("percentage", json!(50))
        ]);
        let mut context = EffectContext {
            state: &mut gs,
            source_player: 2,
            source_card: trap.clone(),
            targets: Targets::default(),
            trigger: None,
            trigger_event: Some(TriggerEvent::attack("ATTACK_PLAYER", 300, 1, Uuid::new_v4())),
        };
        resolve_card_effects(&mut context);
        assert_eq!(gs.players[0].hp, 1350);
    }

    #[test]
    fn prevent_destruction_floors_hp() {
        let mut gs = state();
        let mut dying = monster("TGT", 50, 100);
        dying.hp = 0;
        let id = dying.instance_id;
        gs.players[1].monster_zones[1] = Some(dying);
        let trap = spell_with(vec![EffectEntry::new("TRAP_PREVENT_DESTRUCTION")]);
        let mut context = EffectContext {
            state: &mut gs,
            source_player: 2,
            source_card: trap.clone(),
            targets: Targets::default(),
            trigger: None,
            trigger_event: Some(TriggerEvent::would_be_destroyed(id)),
        };
        let result = resolve_card_effects(&mut context);
        assert!(matches!(
            result.events[0],
            LogEvent::EffectPreventDestruction { hp_after: 1, .. }
        ));
        assert_eq!(gs.players[1].monster_zones[1].as_ref().unwrap().hp, 1);
    }

    #[test]
    fn negate_attack_reflects_attacker_atk_by_default() {
        let mut gs = state();
        let attacker = monster("ATK", 120, 100);
        let attacker_id = attacker.instance_id;
        gs.players[0].monster_zones[0] = Some(attacker);
        let trap = spell_with(vec![EffectEntry::new("TRAP_NEGATE_ATTACK")]);
        let mut context = EffectContext {
            state: &mut gs,
            source_player: 2,
            source_card: trap.clone(),
            targets: Targets::default(),
            trigger: None,
            trigger_event: Some(TriggerEvent::attack("ATTACK_MONSTER", 120, 1, attacker_id)),
        };
        let result = resolve_card_effects(&mut context);
        assert!(result.cancelled);
        // 120 reflected into 100 HP: attacker dies.
        assert_eq!(result.destroyed, vec![BoardCoord::new(1, 0)]);
        assert_eq!(gs.players[0].monster_zones[0].as_ref().unwrap().hp, 0);
    }

    #[test]
    fn soul_rend_needs_charges_and_face_up_target() {
        let mut gs = state();
        let mut hero = CardInstance::from_definition(&definition("HERO", CardKind::Hero, 0, 0));
        hero.hero_charges = 3;
        gs.players[0].hero = Some(hero);
        gs.players[1].monster_zones[0] = Some(monster("BIG", 100, 300));
        gs.players[0].monster_zones[0] = Some(monster("ALLY", 10, 50));

        let active = spell_with(vec![EffectEntry::new("HERO_ACTIVE_SOUL_REND")]);
        let targets = Targets {
            player: None,
            monster: Some(BoardCoord::new(2, 0)),
        };
        let mut context = ctx(&mut gs, &active, targets);
        let result = resolve_card_effects(&mut context);

        assert_eq!(result.destroyed, vec![BoardCoord::new(2, 0)]);
        assert_eq!(gs.players[0].hero.as_ref().unwrap().hero_charges, 0);
        // 300 HP kill beats the 200 threshold: lowest ally gets +100 max HP.
        let ally = gs.players[0].monster_zones[0].as_ref().unwrap();
        assert_eq!(ally.max_hp, 150);
    }
}
