use uuid::Uuid;

use super::combat;
use super::effects::{self, handlers, EffectContext, Targets};
use super::entity::card::{CardDefinition, CardInstance, CardKind, TriggerKind, STATUS_FROZEN};
use super::entity::player::{MONSTER_ZONE_COUNT, SPELL_TRAP_ZONE_COUNT, TURN_DRAW_COUNT};
use super::entity::state::{BoardCoord, GameState, LogEvent, MatchStatus, Phase};
use super::intent::{Intent, IntentOutcome, PendingDecision, SuspendedIntent, TriggerEvent};
use crate::utils::errors::{ConfigError, IntentError};

/// Core rules entry point: validates one player intent against the current
/// state and applies it. Validation happens before any mutation, so a
/// rejection leaves the state untouched. The one sanctioned partial
/// completion is a trap interrupt, surfaced as `IntentOutcome::Suspended`.
pub fn apply_intent(
    state: &mut GameState,
    actor: u8,
    intent: Intent,
) -> Result<IntentOutcome, IntentError> {
    if state.status != MatchStatus::InProgress {
        return Err(IntentError::MatchNotInProgress);
    }
    if state.pending.is_some() {
        return Err(IntentError::DecisionPending);
    }
    if actor != state.current_player {
        return Err(IntentError::NotYourTurn);
    }

    let mark = state.log.len();
    let suspension = match intent.clone() {
        Intent::EndTurn => {
            handle_end_turn(state, actor);
            None
        }
        Intent::PlayMonster {
            card_instance_id,
            zone_index,
            tribute_instance_ids,
        } => {
            handle_play_monster(state, actor, card_instance_id, zone_index, &tribute_instance_ids)?;
            None
        }
        Intent::PlaySpell { .. } => handle_play_spell(state, actor, intent)?,
        Intent::PlayTrap {
            card_instance_id,
            zone_index,
        } => {
            handle_play_trap(state, actor, card_instance_id, zone_index)?;
            None
        }
        Intent::ActivateTrap {
            trap_instance_id,
            target_player_index,
            target_monster_instance_id,
        } => {
            handle_activate_trap(
                state,
                actor,
                trap_instance_id,
                target_player_index,
                target_monster_instance_id,
            )?;
            None
        }
        Intent::ActivateHeroAbility {
            target_player_index,
            target_monster_instance_id,
        } => {
            handle_activate_hero_ability(state, actor, target_player_index, target_monster_instance_id)?;
            None
        }
        Intent::AttackMonster { .. } => handle_attack_monster(state, actor, intent)?,
        Intent::AttackPlayer { .. } => handle_attack_player(state, actor, intent)?,
    };

    let events = state.log[mark..].to_vec();
    match suspension {
        Some(pending) => {
            state.pending = Some(pending.clone());
            Ok(IntentOutcome::Suspended { pending, events })
        }
        None => Ok(IntentOutcome::Completed { events }),
    }
}

// --- End turn -------------------------------------------------------------

fn handle_end_turn(state: &mut GameState, actor: u8) {
    // End-of-turn hero passive for the ending player.
    let heals_allies = state
        .player(actor)
        .hero
        .as_ref()
        .is_some_and(|h| h.effect("HERO_PASSIVE_HEAL_ALLIES").is_some());
    if heals_allies {
        let player = state.player_mut(actor);
        let mut healed = 0;
        for card in player.monster_zones.iter_mut().flatten() {
            if card.alive() && card.hp < card.max_hp {
                card.hp = card.max_hp;
                healed += 1;
            }
        }
        if healed > 0 {
            state.push_event(LogEvent::HeroPassiveHealed { player: actor, healed });
        }
    }

    let next_player = GameState::opponent_of(actor);
    state.push_event(LogEvent::EndTurn {
        from_player: actor,
        to_player: next_player,
        turn: state.turn,
    });
    state.turn += 1;
    state.current_player = next_player;
    let new_turn = state.turn;

    // Start-of-turn housekeeping for the new active player: reveal monsters,
    // hand out attack eligibility (sickness persists one tick), tick statuses.
    let mut expirations: Vec<(Uuid, String, Option<String>)> = Vec::new();
    {
        let player = state.player_mut(next_player);
        for card in player.monster_zones.iter_mut().flatten() {
            card.face_down = false;
            if card.alive() && card.summoned_turn != Some(new_turn) && !card.has_status(STATUS_FROZEN)
            {
                card.can_attack = true;
            }
        }
        for card in player.monster_zones.iter_mut().flatten() {
            for (code, replaced_with) in card.tick_statuses() {
                expirations.push((card.instance_id, code, replaced_with));
            }
        }
        if let Some(hero) = player.hero.as_mut() {
            for (code, replaced_with) in hero.tick_statuses() {
                expirations.push((hero.instance_id, code, replaced_with));
            }
        }
    }
    for (card_instance_id, code, replaced_with) in expirations {
        state.push_event(LogEvent::StatusExpired {
            player: next_player,
            card_instance_id,
            code,
            replaced_with,
        });
    }

    let (drawn, reshuffled) = state.player_mut(next_player).draw_with_reshuffle(TURN_DRAW_COUNT);
    if reshuffled > 0 {
        state.push_event(LogEvent::DeckReshuffled {
            player: next_player,
            count: reshuffled,
        });
    }
    state.push_event(LogEvent::CardsDrawn {
        player: next_player,
        count: drawn,
    });

    state.player_mut(next_player).reset_turn_usage();
    state.phase = Phase::Main;
    state.push_event(LogEvent::TurnStarted {
        player: next_player,
        turn: new_turn,
    });
}

// --- Summons --------------------------------------------------------------

fn tribute_cost(stars: u8) -> Result<usize, IntentError> {
    match stars {
        1..=3 => Ok(0),
        4..=5 => Ok(1),
        6 => Ok(2),
        other => Err(ConfigError::UnknownStarTier(other).into()),
    }
}

fn handle_play_monster(
    state: &mut GameState,
    actor: u8,
    card_instance_id: Uuid,
    zone_index: usize,
    tribute_instance_ids: &[Uuid],
) -> Result<(), IntentError> {
    let player = state.player(actor);
    if player.summons_used >= 1 {
        return Err(IntentError::SummonLimitReached);
    }
    let hand_idx = player
        .find_in_hand(card_instance_id)
        .ok_or(IntentError::CardNotInHand)?;
    let card = &player.hand[hand_idx];
    if !(card.is_monster() || card.is_hero()) {
        return Err(IntentError::NotAMonster);
    }
    let stars = card.stars;
    let required = tribute_cost(stars)?;
    if tribute_instance_ids.len() != required {
        return Err(IntentError::TributesRequired);
    }

    let mut tribute_zones: Vec<usize> = Vec::new();
    for id in tribute_instance_ids {
        let zone = player.find_monster(*id).ok_or(IntentError::CardNotOnBoard)?;
        if tribute_zones.contains(&zone) {
            return Err(IntentError::CardNotOnBoard);
        }
        tribute_zones.push(zone);
    }

    if stars == 6 {
        if player.hero.is_some() {
            return Err(IntentError::HeroSlotOccupied);
        }
    } else {
        if zone_index >= MONSTER_ZONE_COUNT {
            return Err(IntentError::InvalidZone);
        }
        if player.monster_zones[zone_index].is_some() {
            return Err(IntentError::ZoneOccupied);
        }
    }

    // Validated; mutations start here. Tributes are paid first.
    let turn = state.turn;
    let mut tribute_events = Vec::new();
    {
        let player = state.player_mut(actor);
        for zone in tribute_zones {
            if let Some(id) = player.bury_monster(zone) {
                tribute_events.push(LogEvent::TributePaid {
                    player: actor,
                    card_instance_id: id,
                });
            }
        }
    }
    for event in tribute_events {
        state.push_event(event);
    }

    let player = state.player_mut(actor);
    let mut card = player.hand.remove(hand_idx);
    card.summoned_turn = Some(turn);
    let summon_event;
    match stars {
        1..=3 => {
            card.face_down = true;
            card.can_attack = false;
            summon_event = LogEvent::MonsterSummoned {
                player: actor,
                zone_index,
                card_instance_id: card.instance_id,
                card_name: card.name.clone(),
                stars,
                face_down: true,
            };
            player.monster_zones[zone_index] = Some(card);
        }
        4..=5 => {
            // Tribute summons skip summoning sickness and enter face-up.
            card.face_down = false;
            card.can_attack = true;
            summon_event = LogEvent::MonsterSummoned {
                player: actor,
                zone_index,
                card_instance_id: card.instance_id,
                card_name: card.name.clone(),
                stars,
                face_down: false,
            };
            player.monster_zones[zone_index] = Some(card);
        }
        _ => {
            // 6 stars: the hero. Occupies its own slot and never attacks.
            card.face_down = false;
            card.can_attack = false;
            summon_event = LogEvent::HeroSummoned {
                player: actor,
                card_instance_id: card.instance_id,
                card_name: card.name.clone(),
            };
            player.hero = Some(card);
        }
    }
    player.summons_used += 1;
    state.push_event(summon_event);

    if stars == 6 {
        apply_hero_entry(state, actor);
    }
    Ok(())
}

/// Hero entry: attune the controller to the hero's element (re-skinning
/// their remaining cards onto matching variants) and apply the board aura.
fn apply_hero_entry(state: &mut GameState, actor: u8) {
    let element = state.player(actor).hero.as_ref().and_then(|h| h.element_id);
    if let Some(element_id) = element {
        state.player_mut(actor).active_element = Some(element_id);
        let reskinned = reskin_player_cards(state, actor, element_id);
        state.push_event(LogEvent::ElementAttuned {
            player: actor,
            element_id,
            reskinned,
        });
    }

    let aura = state
        .player(actor)
        .hero
        .as_ref()
        .and_then(|h| h.effect("HERO_PASSIVE_AURA").cloned());
    if let Some(aura) = aura {
        let atk = aura.int("atk", 0);
        let hp = aura.int("hp", 0);
        if atk != 0 || hp != 0 {
            let coords: Vec<BoardCoord> = state
                .player(actor)
                .monster_zones
                .iter()
                .enumerate()
                .filter(|(_, slot)| slot.is_some())
                .map(|(zone, _)| BoardCoord::new(actor, zone))
                .collect();
            for coord in coords {
                if let Some(event) = handlers::buff_card_at(state, coord, atk, hp) {
                    state.push_event(event);
                }
            }
        }
    }
}

fn reskin_player_cards(state: &mut GameState, actor: u8, element_id: i32) -> usize {
    let pool: Vec<CardDefinition> = state.card_pool.clone();
    let player = state.player_mut(actor);
    let mut reskinned = 0;
    let cards = player
        .deck
        .iter_mut()
        .chain(player.hand.iter_mut())
        .chain(player.monster_zones.iter_mut().flatten())
        .chain(player.spell_trap_zones.iter_mut().flatten());
    for card in cards {
        let variant = match card.variant_group.as_deref() {
            Some(group) => pool.iter().find(|def| {
                def.variant_group.as_deref() == Some(group)
                    && def.element_id == Some(element_id)
                    && def.card_code != card.card_code
            }),
            None => None,
        };
        if let Some(variant) = variant {
            card.reskin_to(variant);
            reskinned += 1;
        }
    }
    reskinned
}

// --- Spells and traps -----------------------------------------------------

/// Strict target resolution used before committing to an intent.
fn build_targets(
    state: &GameState,
    target_player_index: Option<u8>,
    target_monster_instance_id: Option<Uuid>,
) -> Result<Targets, IntentError> {
    let mut targets = Targets::default();
    if let Some(player_index) = target_player_index {
        if player_index != 1 && player_index != 2 {
            return Err(IntentError::TargetRequired);
        }
        targets.player = Some(player_index);
    }
    if let Some(instance_id) = target_monster_instance_id {
        targets.monster = Some(
            state
                .find_monster(instance_id)
                .ok_or(IntentError::CardNotOnBoard)?,
        );
    }
    Ok(targets)
}

/// Lenient variant for resumed intents: a target that vanished while the
/// intent was suspended degrades to "no target" and the resolver logs it.
fn build_targets_lenient(
    state: &GameState,
    target_player_index: Option<u8>,
    target_monster_instance_id: Option<Uuid>,
) -> Targets {
    Targets {
        player: target_player_index.filter(|p| *p == 1 || *p == 2),
        monster: target_monster_instance_id.and_then(|id| state.find_monster(id)),
    }
}

/// Declared damage of a spell, recorded on the trigger event so reactive
/// traps can reflect off it.
fn spell_damage_total(card: &CardInstance) -> i32 {
    card.effects
        .iter()
        .filter(|e| {
            matches!(
                e.keyword.as_str(),
                "SPELL_DAMAGE_MONSTER" | "SPELL_DAMAGE_PLAYER" | "HERO_ACTIVE_DAMAGE"
            )
        })
        .map(|e| e.int("amount", 0).max(0))
        .sum()
}

pub(crate) fn eligible_traps(state: &GameState, player_index: u8, trigger: TriggerKind) -> Vec<Uuid> {
    state
        .player(player_index)
        .spell_trap_zones
        .iter()
        .flatten()
        .filter(|card| {
            card.face_down && card.card_type == CardKind::Trap && card.trigger == Some(trigger)
        })
        .map(|card| card.instance_id)
        .collect()
}

/// Flips a face-down trap, resolves its effects against the trigger and
/// sends it to the graveyard. Returns (chain_cancelled, reflect_spell).
pub(crate) fn activate_reactive_trap(
    state: &mut GameState,
    owner: u8,
    trap_instance_id: Uuid,
    trigger: TriggerKind,
    trigger_event: TriggerEvent,
) -> Result<(bool, bool), IntentError> {
    let zone = state
        .player(owner)
        .find_trap(trap_instance_id)
        .ok_or(IntentError::CardNotOnBoard)?;
    let trap = state.player_mut(owner).spell_trap_zones[zone]
        .take()
        .ok_or(IntentError::CardNotOnBoard)?;
    state.push_event(LogEvent::TrapActivated {
        player: owner,
        trap_instance_id: trap.instance_id,
        card_name: trap.name.clone(),
    });

    let result = {
        let mut ctx = EffectContext {
            state: &mut *state,
            source_player: owner,
            source_card: trap.clone(),
            targets: Targets::default(),
            trigger: Some(trigger),
            trigger_event: Some(trigger_event),
        };
        effects::resolve_card_effects(&mut ctx)
    };
    let cancelled = result.cancelled;
    let reflect_spell = result.reflect_spell;
    for event in result.events {
        state.push_event(event);
    }
    reconcile_destroyed(state, &result.destroyed);
    state.player_mut(owner).graveyard.push(trap);
    Ok((cancelled, reflect_spell))
}

/// Moves every still-dead monster the resolver flagged into its owner's
/// graveyard.
pub(crate) fn reconcile_destroyed(state: &mut GameState, destroyed: &[BoardCoord]) {
    for &coord in destroyed {
        let still_dead = state.monster_at(coord).is_some_and(|c| c.hp <= 0);
        if still_dead {
            if let Some(card_instance_id) = state.player_mut(coord.player_index).bury_monster(coord.zone_index) {
                state.push_event(LogEvent::MonsterDestroyed {
                    player: coord.player_index,
                    zone_index: coord.zone_index,
                    card_instance_id,
                });
            }
        }
    }
}

fn handle_play_spell(
    state: &mut GameState,
    actor: u8,
    intent: Intent,
) -> Result<Option<PendingDecision>, IntentError> {
    let Intent::PlaySpell {
        card_instance_id,
        target_player_index,
        target_monster_instance_id,
    } = intent.clone()
    else {
        return Err(IntentError::NotASpell);
    };

    let player = state.player(actor);
    if player.spells_traps_used >= 1 {
        return Err(IntentError::SpellTrapLimitReached);
    }
    let hand_idx = player
        .find_in_hand(card_instance_id)
        .ok_or(IntentError::CardNotInHand)?;
    let card = &player.hand[hand_idx];
    if card.card_type != CardKind::Spell {
        return Err(IntentError::NotASpell);
    }
    let damage_total = spell_damage_total(card);
    build_targets(state, target_player_index, target_monster_instance_id)?;

    let defender = GameState::opponent_of(actor);
    let traps = eligible_traps(state, defender, TriggerKind::OnOpponentSpellCast);
    if !traps.is_empty() {
        let trigger_event = TriggerEvent::spell_cast(damage_total, actor);
        if state.is_ai(defender) {
            // The automated policy never bluffs: first eligible trap fires.
            let (cancelled, reflect) = activate_reactive_trap(
                state,
                defender,
                traps[0],
                TriggerKind::OnOpponentSpellCast,
                trigger_event,
            )?;
            if cancelled {
                cancel_spell(state, actor, card_instance_id, reflect)?;
                state.check_lethal();
                return Ok(None);
            }
        } else {
            return Ok(Some(PendingDecision {
                decision_id: Uuid::new_v4(),
                trigger: TriggerKind::OnOpponentSpellCast,
                trigger_event,
                acting_player: actor,
                defending_player: defender,
                eligible_traps: traps,
                suspended: SuspendedIntent::SpellCast { intent },
            }));
        }
    }

    commit_spell(
        state,
        actor,
        card_instance_id,
        target_player_index,
        target_monster_instance_id,
    )?;
    state.check_lethal();
    Ok(None)
}

/// The non-interrupted tail of a spell cast: hand to graveyard, resolve,
/// reconcile, count the use.
fn commit_spell(
    state: &mut GameState,
    actor: u8,
    card_instance_id: Uuid,
    target_player_index: Option<u8>,
    target_monster_instance_id: Option<Uuid>,
) -> Result<(), IntentError> {
    let targets = build_targets_lenient(state, target_player_index, target_monster_instance_id);
    let player = state.player_mut(actor);
    let hand_idx = player
        .find_in_hand(card_instance_id)
        .ok_or(IntentError::CardNotInHand)?;
    let card = player.hand.remove(hand_idx);
    state.push_event(LogEvent::SpellCast {
        player: actor,
        card_instance_id: card.instance_id,
        card_name: card.name.clone(),
    });

    let result = {
        let mut ctx = EffectContext {
            state: &mut *state,
            source_player: actor,
            source_card: card.clone(),
            targets,
            trigger: None,
            trigger_event: None,
        };
        effects::resolve_card_effects(&mut ctx)
    };
    for event in result.events {
        state.push_event(event);
    }
    reconcile_destroyed(state, &result.destroyed);

    let player = state.player_mut(actor);
    player.graveyard.push(card);
    player.spells_traps_used += 1;
    Ok(())
}

/// A countered spell is still consumed. With reflection enabled the spell's
/// own effects are replayed against the caster's side of the board.
fn cancel_spell(
    state: &mut GameState,
    caster: u8,
    card_instance_id: Uuid,
    reflect: bool,
) -> Result<(), IntentError> {
    let player = state.player_mut(caster);
    let hand_idx = player
        .find_in_hand(card_instance_id)
        .ok_or(IntentError::CardNotInHand)?;
    let card = player.hand.remove(hand_idx);
    player.graveyard.push(card.clone());
    player.spells_traps_used += 1;
    state.push_event(LogEvent::SpellCountered {
        player: caster,
        card_instance_id: card.instance_id,
        reflected: reflect,
    });

    if reflect {
        let reflected_monster = state
            .player(caster)
            .live_monsters()
            .next()
            .map(|(zone, _)| BoardCoord::new(caster, zone));
        let targets = Targets {
            player: Some(caster),
            monster: reflected_monster,
        };
        let result = {
            let mut ctx = EffectContext {
                state: &mut *state,
                source_player: GameState::opponent_of(caster),
                source_card: card,
                targets,
                trigger: None,
                trigger_event: None,
            };
            effects::resolve_card_effects(&mut ctx)
        };
        for event in result.events {
            state.push_event(event);
        }
        reconcile_destroyed(state, &result.destroyed);
    }
    Ok(())
}

fn handle_play_trap(
    state: &mut GameState,
    actor: u8,
    card_instance_id: Uuid,
    zone_index: usize,
) -> Result<(), IntentError> {
    let player = state.player(actor);
    if player.spells_traps_used >= 1 {
        return Err(IntentError::SpellTrapLimitReached);
    }
    let hand_idx = player
        .find_in_hand(card_instance_id)
        .ok_or(IntentError::CardNotInHand)?;
    if player.hand[hand_idx].card_type != CardKind::Trap {
        return Err(IntentError::NotATrap);
    }
    if zone_index >= SPELL_TRAP_ZONE_COUNT {
        return Err(IntentError::InvalidZone);
    }
    if player.spell_trap_zones[zone_index].is_some() {
        return Err(IntentError::ZoneOccupied);
    }

    let turn = state.turn;
    let player = state.player_mut(actor);
    let mut card = player.hand.remove(hand_idx);
    card.face_down = true;
    card.summoned_turn = Some(turn);
    player.spell_trap_zones[zone_index] = Some(card);
    player.spells_traps_used += 1;

    // The set is logged without revealing which card went down.
    state.push_event(LogEvent::TrapSet {
        player: actor,
        zone_index,
    });
    Ok(())
}

/// Administrative activation of one's own face-down trap, outside the
/// reactive window. Used by tooling and by tests; defensive activation goes
/// through `resolve_pending`.
fn handle_activate_trap(
    state: &mut GameState,
    actor: u8,
    trap_instance_id: Uuid,
    target_player_index: Option<u8>,
    target_monster_instance_id: Option<Uuid>,
) -> Result<(), IntentError> {
    let player = state.player(actor);
    let zone = player
        .find_trap(trap_instance_id)
        .ok_or(IntentError::CardNotOnBoard)?;
    let is_trap = player.spell_trap_zones[zone]
        .as_ref()
        .is_some_and(|c| c.card_type == CardKind::Trap);
    if !is_trap {
        return Err(IntentError::NotATrap);
    }
    let targets = build_targets(state, target_player_index, target_monster_instance_id)?;

    let trap = state.player_mut(actor).spell_trap_zones[zone]
        .take()
        .ok_or(IntentError::CardNotOnBoard)?;
    state.push_event(LogEvent::TrapActivated {
        player: actor,
        trap_instance_id: trap.instance_id,
        card_name: trap.name.clone(),
    });
    let result = {
        let mut ctx = EffectContext {
            state: &mut *state,
            source_player: actor,
            source_card: trap.clone(),
            targets,
            trigger: None,
            trigger_event: None,
        };
        effects::resolve_card_effects(&mut ctx)
    };
    for event in result.events {
        state.push_event(event);
    }
    reconcile_destroyed(state, &result.destroyed);
    state.player_mut(actor).graveyard.push(trap);
    state.check_lethal();
    Ok(())
}

fn handle_activate_hero_ability(
    state: &mut GameState,
    actor: u8,
    target_player_index: Option<u8>,
    target_monster_instance_id: Option<Uuid>,
) -> Result<(), IntentError> {
    let player = state.player(actor);
    if player.hero_ability_used >= 1 {
        return Err(IntentError::HeroAbilityLimitReached);
    }
    let hero = player.hero.as_ref().ok_or(IntentError::NoHero)?;
    let active = hero
        .active_ability()
        .cloned()
        .ok_or(IntentError::NoActiveAbility)?;
    let hero_card = hero.clone();

    let mut targets = build_targets(state, target_player_index, target_monster_instance_id)?;
    if targets.monster.is_none() && targets.player.is_none() {
        // Auto-targeting: a lone enemy monster picks itself, an empty enemy
        // board falls back to the enemy player, anything else needs the
        // caller to choose.
        let enemy = GameState::opponent_of(actor);
        let live: Vec<usize> = state.player(enemy).live_monsters().map(|(zone, _)| zone).collect();
        match live.len() {
            0 => targets.player = Some(enemy),
            1 => targets.monster = Some(BoardCoord::new(enemy, live[0])),
            _ => return Err(IntentError::TargetRequired),
        }
    }

    let result = {
        let mut ctx = EffectContext {
            state: &mut *state,
            source_player: actor,
            source_card: hero_card,
            targets,
            trigger: None,
            trigger_event: None,
        };
        effects::resolve_effect_entry(&mut ctx, &active)
    };
    let aborted = result.cancelled;
    for event in result.events {
        state.push_event(event);
    }
    reconcile_destroyed(state, &result.destroyed);
    if !aborted {
        state.player_mut(actor).hero_ability_used += 1;
        state.push_event(LogEvent::HeroAbilityActivated {
            player: actor,
            keyword: active.keyword.clone(),
        });
    }
    state.check_lethal();
    Ok(())
}

// --- Attacks --------------------------------------------------------------

fn validate_attacker(state: &GameState, actor: u8, attacker_instance_id: Uuid) -> Result<BoardCoord, IntentError> {
    let zone = state
        .player(actor)
        .find_monster(attacker_instance_id)
        .ok_or(IntentError::CardNotOnBoard)?;
    let coord = BoardCoord::new(actor, zone);
    let card = state.monster_at(coord).ok_or(IntentError::CardNotOnBoard)?;
    if card.face_down || !card.can_attack || !card.alive() {
        return Err(IntentError::CannotAttack);
    }
    Ok(coord)
}

fn handle_attack_monster(
    state: &mut GameState,
    actor: u8,
    intent: Intent,
) -> Result<Option<PendingDecision>, IntentError> {
    let Intent::AttackMonster {
        attacker_instance_id,
        defender_instance_id,
    } = intent.clone()
    else {
        return Err(IntentError::CannotAttack);
    };

    let attacker_coord = validate_attacker(state, actor, attacker_instance_id)?;
    let attacker_atk = state
        .monster_at(attacker_coord)
        .map(|c| c.atk)
        .unwrap_or(0);
    let defender_player = GameState::opponent_of(actor);
    let defender_zone = state
        .player(defender_player)
        .find_monster(defender_instance_id)
        .ok_or(IntentError::CardNotOnBoard)?;
    let defender_coord = BoardCoord::new(defender_player, defender_zone);
    let defender_alive = state.monster_at(defender_coord).is_some_and(|c| c.alive());
    if !defender_alive {
        return Err(IntentError::CardNotOnBoard);
    }

    let traps = eligible_traps(state, defender_player, TriggerKind::OnAttackDeclared);
    if !traps.is_empty() {
        let trigger_event =
            TriggerEvent::attack("ATTACK_MONSTER", attacker_atk, actor, attacker_instance_id);
        if state.is_ai(defender_player) {
            let (cancelled, _) = activate_reactive_trap(
                state,
                defender_player,
                traps[0],
                TriggerKind::OnAttackDeclared,
                trigger_event,
            )?;
            if cancelled {
                negate_attack(state, attacker_instance_id);
                state.check_lethal();
                return Ok(None);
            }
        } else {
            return Ok(Some(PendingDecision {
                decision_id: Uuid::new_v4(),
                trigger: TriggerKind::OnAttackDeclared,
                trigger_event,
                acting_player: actor,
                defending_player: defender_player,
                eligible_traps: traps,
                suspended: SuspendedIntent::AttackDeclared { intent },
            }));
        }
    }

    execute_attack_monster(state, attacker_coord, defender_coord)
}

fn negate_attack(state: &mut GameState, attacker_instance_id: Uuid) {
    if let Some(coord) = state.find_monster(attacker_instance_id) {
        if let Some(card) = state.monster_at_mut(coord) {
            card.can_attack = false;
        }
    }
    state.push_event(LogEvent::AttackNegated {
        attacker_instance_id,
    });
}

/// Combat plus the death pipeline. When no death needs a human decision the
/// lethal check runs here and the attack is fully complete.
fn execute_attack_monster(
    state: &mut GameState,
    attacker_coord: BoardCoord,
    defender_coord: BoardCoord,
) -> Result<Option<PendingDecision>, IntentError> {
    let deaths = combat::resolve_monster_combat(state, attacker_coord, defender_coord);
    match process_deaths(state, &deaths, 0)? {
        Some(pending) => Ok(Some(pending)),
        None => {
            state.check_lethal();
            Ok(None)
        }
    }
}

/// Walks queued combat deaths in order, offering each owner's
/// would-be-destroyed trap before the card hits the graveyard. An automated
/// owner activates inline; a human owner suspends the pipeline.
pub(crate) fn process_deaths(
    state: &mut GameState,
    deaths: &[BoardCoord],
    start: usize,
) -> Result<Option<PendingDecision>, IntentError> {
    for i in start..deaths.len() {
        let coord = deaths[i];
        let Some(card) = state.monster_at(coord) else {
            continue;
        };
        if card.alive() {
            continue;
        }
        let monster_id = card.instance_id;
        let owner = coord.player_index;

        let traps = eligible_traps(state, owner, TriggerKind::OnAllyMonsterWouldBeDestroyed);
        if !traps.is_empty() {
            let trigger_event = TriggerEvent::would_be_destroyed(monster_id);
            if state.is_ai(owner) {
                activate_reactive_trap(
                    state,
                    owner,
                    traps[0],
                    TriggerKind::OnAllyMonsterWouldBeDestroyed,
                    trigger_event,
                )?;
                if state.monster_at(coord).is_some_and(|c| c.alive()) {
                    continue;
                }
            } else {
                return Ok(Some(PendingDecision {
                    decision_id: Uuid::new_v4(),
                    trigger: TriggerKind::OnAllyMonsterWouldBeDestroyed,
                    trigger_event,
                    acting_player: state.current_player,
                    defending_player: owner,
                    eligible_traps: traps,
                    suspended: SuspendedIntent::ResolvingDeaths {
                        deaths: deaths.to_vec(),
                        next: i,
                    },
                }));
            }
        }

        if let Some(card_instance_id) = state.player_mut(owner).bury_monster(coord.zone_index) {
            state.push_event(LogEvent::MonsterDestroyed {
                player: owner,
                zone_index: coord.zone_index,
                card_instance_id,
            });
        }
    }
    Ok(None)
}

fn handle_attack_player(
    state: &mut GameState,
    actor: u8,
    intent: Intent,
) -> Result<Option<PendingDecision>, IntentError> {
    let Intent::AttackPlayer {
        attacker_instance_id,
    } = intent.clone()
    else {
        return Err(IntentError::CannotAttack);
    };

    let attacker_coord = validate_attacker(state, actor, attacker_instance_id)?;
    let attacker_atk = state.monster_at(attacker_coord).map(|c| c.atk).unwrap_or(0);
    let defender_player = GameState::opponent_of(actor);
    if state.player(defender_player).live_monster_count() > 0 {
        return Err(IntentError::MonstersStillPresent);
    }

    let traps = eligible_traps(state, defender_player, TriggerKind::OnAttackDeclared);
    if !traps.is_empty() {
        let trigger_event =
            TriggerEvent::attack("ATTACK_PLAYER", attacker_atk, actor, attacker_instance_id);
        if state.is_ai(defender_player) {
            let (cancelled, _) = activate_reactive_trap(
                state,
                defender_player,
                traps[0],
                TriggerKind::OnAttackDeclared,
                trigger_event,
            )?;
            if cancelled {
                negate_attack(state, attacker_instance_id);
                state.check_lethal();
                return Ok(None);
            }
        } else {
            return Ok(Some(PendingDecision {
                decision_id: Uuid::new_v4(),
                trigger: TriggerKind::OnAttackDeclared,
                trigger_event,
                acting_player: actor,
                defending_player: defender_player,
                eligible_traps: traps,
                suspended: SuspendedIntent::AttackDeclared { intent },
            }));
        }
    }

    execute_attack_player(state, attacker_coord, defender_player);
    Ok(None)
}

fn execute_attack_player(state: &mut GameState, attacker_coord: BoardCoord, defender_player: u8) {
    let (atk, attacker_id) = match state.monster_at_mut(attacker_coord) {
        Some(card) => {
            card.can_attack = false;
            (card.atk, card.instance_id)
        }
        None => return,
    };
    let defender = state.player_mut(defender_player);
    defender.hp = (defender.hp - atk.max(0)).max(0);
    let hp_after = defender.hp;
    state.push_event(LogEvent::DirectAttack {
        attacker_instance_id: attacker_id,
        defending_player: defender_player,
        amount: atk,
        hp_after,
    });
    state.check_lethal();
}

// --- Pending decisions ----------------------------------------------------

/// Consumes an outstanding trap decision. `trap_instance_id = None` declines
/// the offer and lets the suspended intent run on current state. Returns the
/// events appended plus whether the original intent was cancelled.
///
/// Exactly-once: the decision id is checked and the pending slot cleared
/// before anything resolves, so a stale client retry is rejected instead of
/// re-applying the intent.
pub fn resolve_pending(
    state: &mut GameState,
    actor: u8,
    decision_id: Uuid,
    trap_instance_id: Option<Uuid>,
) -> Result<(Vec<LogEvent>, bool), IntentError> {
    if state.status != MatchStatus::InProgress {
        return Err(IntentError::MatchNotInProgress);
    }
    let pending = state.pending.clone().ok_or(IntentError::StalePendingDecision)?;
    if pending.decision_id != decision_id {
        return Err(IntentError::StalePendingDecision);
    }
    if pending.defending_player != actor {
        return Err(IntentError::NotYourDecision);
    }
    if let Some(trap_id) = trap_instance_id {
        if !pending.eligible_traps.contains(&trap_id) {
            return Err(IntentError::TrapNotEligible);
        }
    }
    state.pending = None;

    let mark = state.log.len();
    let mut cancelled = false;

    match pending.suspended.clone() {
        SuspendedIntent::SpellCast { intent } => {
            let Intent::PlaySpell {
                card_instance_id,
                target_player_index,
                target_monster_instance_id,
            } = intent
            else {
                return Err(IntentError::StalePendingDecision);
            };
            let caster = pending.acting_player;
            let mut countered = false;
            let mut reflect = false;
            if let Some(trap_id) = trap_instance_id {
                let (c, r) = activate_reactive_trap(
                    state,
                    actor,
                    trap_id,
                    pending.trigger,
                    pending.trigger_event.clone(),
                )?;
                countered = c;
                reflect = r;
            }
            if countered {
                cancel_spell(state, caster, card_instance_id, reflect)?;
                cancelled = true;
            } else {
                commit_spell(
                    state,
                    caster,
                    card_instance_id,
                    target_player_index,
                    target_monster_instance_id,
                )?;
            }
            state.check_lethal();
        }
        SuspendedIntent::AttackDeclared { intent } => {
            let mut negated = false;
            if let Some(trap_id) = trap_instance_id {
                let (c, _) = activate_reactive_trap(
                    state,
                    actor,
                    trap_id,
                    pending.trigger,
                    pending.trigger_event.clone(),
                )?;
                negated = c;
            }
            match intent {
                Intent::AttackMonster {
                    attacker_instance_id,
                    defender_instance_id,
                } => {
                    if negated {
                        negate_attack(state, attacker_instance_id);
                        state.check_lethal();
                        cancelled = true;
                    } else {
                        resume_attack_monster(state, attacker_instance_id, defender_instance_id)?;
                    }
                }
                Intent::AttackPlayer {
                    attacker_instance_id,
                } => {
                    if negated {
                        negate_attack(state, attacker_instance_id);
                        state.check_lethal();
                        cancelled = true;
                    } else if let Some(coord) = state.find_monster(attacker_instance_id) {
                        if state.monster_at(coord).is_some_and(|c| c.alive()) {
                            let defender = GameState::opponent_of(pending.acting_player);
                            execute_attack_player(state, coord, defender);
                        } else {
                            state.check_lethal();
                        }
                    }
                }
                _ => return Err(IntentError::StalePendingDecision),
            }
        }
        SuspendedIntent::ResolvingDeaths { deaths, next } => {
            if let Some(trap_id) = trap_instance_id {
                activate_reactive_trap(
                    state,
                    actor,
                    trap_id,
                    pending.trigger,
                    pending.trigger_event.clone(),
                )?;
            }
            if let Some(&coord) = deaths.get(next) {
                let saved = state.monster_at(coord).is_some_and(|c| c.alive());
                if !saved {
                    if let Some(card_instance_id) =
                        state.player_mut(coord.player_index).bury_monster(coord.zone_index)
                    {
                        state.push_event(LogEvent::MonsterDestroyed {
                            player: coord.player_index,
                            zone_index: coord.zone_index,
                            card_instance_id,
                        });
                    }
                }
            }
            match process_deaths(state, &deaths, next + 1)? {
                Some(new_pending) => state.pending = Some(new_pending),
                None => state.check_lethal(),
            }
        }
    }

    let events = state.log[mark..].to_vec();
    Ok((events, cancelled))
}

/// Resumes a declared monster attack after a non-cancelling trap. Either
/// participant may have died to the trap; the attack then fizzles.
fn resume_attack_monster(
    state: &mut GameState,
    attacker_instance_id: Uuid,
    defender_instance_id: Uuid,
) -> Result<(), IntentError> {
    let attacker = state.find_monster(attacker_instance_id);
    let defender = state.find_monster(defender_instance_id);
    match (attacker, defender) {
        (Some(attacker_coord), Some(defender_coord))
            if state.monster_at(attacker_coord).is_some_and(|c| c.alive())
                && state.monster_at(defender_coord).is_some_and(|c| c.alive()) =>
        {
            if let Some(pending) = execute_attack_monster(state, attacker_coord, defender_coord)? {
                state.pending = Some(pending);
            }
        }
        _ => {
            negate_attack(state, attacker_instance_id);
            state.check_lethal();
        }
    }
    Ok(())
}
