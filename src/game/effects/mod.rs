pub mod handlers;

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::game::entity::card::{CardInstance, EffectEntry, TriggerKind};
use crate::game::entity::state::{BoardCoord, GameState, LogEvent};
use crate::game::intent::TriggerEvent;
use crate::utils::logger::Logger;
use crate::logger;

/// Targets resolved by the action layer before the resolver runs. The
/// resolver never hunts through the state for targets on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct Targets {
    pub player: Option<u8>,
    pub monster: Option<BoardCoord>,
}

/// Everything a keyword handler may see: the match state, who is acting,
/// which card is generating the effect, the resolved targets and, for
/// reactive cards, the trigger that fired them.
pub struct EffectContext<'a> {
    pub state: &'a mut GameState,
    pub source_player: u8,
    pub source_card: CardInstance,
    pub targets: Targets,
    pub trigger: Option<TriggerKind>,
    pub trigger_event: Option<TriggerEvent>,
}

/// Accumulated outcome of one or more keyword effects. Destroyed monsters
/// are reported, not buried; the action layer reconciles zones afterwards.
#[derive(Debug, Default)]
pub struct EffectResult {
    pub events: Vec<LogEvent>,
    pub destroyed: Vec<BoardCoord>,
    pub cancelled: bool,
    pub reflect_spell: bool,
}

impl EffectResult {
    pub fn with_event(event: LogEvent) -> Self {
        Self {
            events: vec![event],
            ..Default::default()
        }
    }

    pub fn merge(&mut self, delta: EffectResult) {
        self.events.extend(delta.events);
        self.destroyed.extend(delta.destroyed);
        self.cancelled |= delta.cancelled;
        self.reflect_spell |= delta.reflect_spell;
    }
}

pub type KeywordHandler = fn(&mut EffectContext, &EffectEntry) -> EffectResult;

/// Keyword registry. New card behavior means a new entry here plus card
/// data; nothing else in the engine changes.
static KEYWORD_HANDLERS: LazyLock<HashMap<&'static str, KeywordHandler>> = LazyLock::new(|| {
    let mut registry: HashMap<&'static str, KeywordHandler> = HashMap::new();
    registry.insert("SPELL_DAMAGE_MONSTER", handlers::spell_damage_monster);
    registry.insert("SPELL_DAMAGE_PLAYER", handlers::spell_damage_player);
    registry.insert("SPELL_HEAL_MONSTER", handlers::spell_heal_monster);
    registry.insert("SPELL_HEAL_PLAYER", handlers::spell_heal_player);
    registry.insert("SPELL_APPLY_STATUS", handlers::apply_status);
    registry.insert("SPELL_DRAW_CARDS", handlers::spell_draw_cards);
    registry.insert("SPELL_BUFF_MONSTER", handlers::spell_buff_monster);
    registry.insert("SPELL_CLEANSE_MONSTER", handlers::spell_cleanse_monster);
    registry.insert("SPELL_HASTE", handlers::spell_haste);
    registry.insert("HERO_ACTIVE_DAMAGE", handlers::hero_active_damage);
    registry.insert("HERO_ACTIVE_FREEZE", handlers::hero_active_freeze);
    registry.insert("HERO_ACTIVE_SOUL_REND", handlers::hero_active_soul_rend);
    registry.insert("TRAP_COUNTER_SPELL", handlers::trap_counter_spell);
    registry.insert("TRAP_NEGATE_ATTACK", handlers::trap_negate_attack);
    registry.insert("TRAP_REFLECT_DAMAGE", handlers::trap_reflect_damage);
    registry.insert("TRAP_APPLY_STATUS", handlers::apply_status);
    registry.insert("TRAP_PREVENT_DESTRUCTION", handlers::trap_prevent_destruction);
    registry
});

/// Resolves a single keyword entry. Unknown keywords are a logged no-op:
/// the keyword vocabulary grows with card data, and an older server must
/// not fall over on a newer card.
pub fn resolve_effect_entry(ctx: &mut EffectContext, entry: &EffectEntry) -> EffectResult {
    let keyword = entry.keyword.trim().to_uppercase();
    match KEYWORD_HANDLERS.get(keyword.as_str()) {
        Some(handler) => handler(ctx, entry),
        None => {
            logger!(
                WARN,
                "[EFFECTS] Unknown keyword `{}` on card `{}`",
                entry.keyword,
                ctx.source_card.card_code
            );
            EffectResult::with_event(LogEvent::EffectUnknownKeyword {
                keyword: entry.keyword.clone(),
                card_code: ctx.source_card.card_code.clone(),
            })
        }
    }
}

/// Walks the source card's effect list in order, merging partial results.
/// A handler that cancels the chain stops the walk.
pub fn resolve_card_effects(ctx: &mut EffectContext) -> EffectResult {
    let entries = ctx.source_card.effects.clone();
    let mut result = EffectResult::default();
    for entry in &entries {
        let partial = resolve_effect_entry(ctx, entry);
        result.merge(partial);
        if result.cancelled {
            break;
        }
    }
    result
}
