use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Status code that blocks the application of every other status code.
pub const STATUS_IMMUNE: &str = "STATUS_IMMUNE";
/// Status code that keeps a monster from receiving attack eligibility.
pub const STATUS_FROZEN: &str = "FROZEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Monster,
    Spell,
    Trap,
    Hero,
}

/// Reactive trigger a face-down trap listens for. Matching is strict
/// equality on this field; there is no tag scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerKind {
    OnOpponentSpellCast,
    OnAttackDeclared,
    OnAllyMonsterWouldBeDestroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DurationKind {
    Permanent,
    FixedTurns,
    UntilControllerNextTurn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub code: String,
    pub duration_type: DurationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_value: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_expire: Option<String>,
}

impl StatusEffect {
    pub fn permanent(code: &str) -> Self {
        Self {
            code: code.to_string(),
            duration_type: DurationKind::Permanent,
            duration_value: None,
            on_expire: None,
        }
    }

    pub fn fixed(code: &str, turns: u32) -> Self {
        Self {
            code: code.to_string(),
            duration_type: DurationKind::FixedTurns,
            duration_value: Some(turns),
            on_expire: None,
        }
    }
}

/// One keyword effect of a card's payload: a keyword plus its parameter map.
/// The engine has zero per-card logic; everything a card does lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectEntry {
    pub keyword: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl EffectEntry {
    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            params: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn int(&self, key: &str, default: i32) -> i32 {
        match self.params.get(key) {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(default as i64) as i32,
            Some(Value::String(s)) => s.parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.params.get(key) {
            Some(Value::Bool(b)) => *b,
            _ => default,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    fn rename_param(&mut self, from: &str, to: &str) {
        if !self.params.contains_key(to) {
            if let Some(value) = self.params.remove(from) {
                self.params.insert(to.to_string(), value);
            }
        } else {
            self.params.remove(from);
        }
    }

    /// Migrates historical keyword and parameter aliases onto the canonical
    /// schema. Runs once at definition intake so the resolver only ever sees
    /// one name per concept.
    pub fn canonicalize(&mut self) {
        self.keyword = self.keyword.trim().to_uppercase();
        match self.keyword.as_str() {
            "SPELL_DRAW" => self.keyword = "SPELL_DRAW_CARDS".to_string(),
            "SPELL_COUNTER_SPELL" => self.keyword = "TRAP_COUNTER_SPELL".to_string(),
            _ => {}
        }

        match self.keyword.as_str() {
            "SPELL_DRAW_CARDS" => self.rename_param("amount", "count"),
            "SPELL_DAMAGE_MONSTER" | "SPELL_DAMAGE_PLAYER" | "HERO_ACTIVE_DAMAGE" => {
                self.rename_param("damage", "amount");
            }
            "SPELL_BUFF_MONSTER" => {
                self.rename_param("atk_increase", "atk");
                self.rename_param("amount_atk", "atk");
                self.rename_param("atk_delta", "atk");
                self.rename_param("hp_increase", "hp");
                self.rename_param("amount_hp", "hp");
                self.rename_param("hp_delta", "hp");
                if self.flag("target_all", false) {
                    self.params.remove("target_all");
                    self.params
                        .insert("target".to_string(), Value::String("all_monsters".into()));
                }
                let target = self.text("target").map(str::to_uppercase);
                if let Some(target) = target {
                    let canonical = match target.as_str() {
                        "ALL_MONSTERS" => "all_monsters",
                        "SELF_MONSTERS" | "OWN_MONSTERS" => "own_monsters",
                        _ => "single",
                    };
                    self.params
                        .insert("target".to_string(), Value::String(canonical.into()));
                }
            }
            "SPELL_APPLY_STATUS" | "TRAP_APPLY_STATUS" => {
                self.rename_param("status_code", "status");
            }
            "TRAP_COUNTER_SPELL" => self.rename_param("reflect_spell", "reflect"),
            "TRAP_PREVENT_DESTRUCTION" => self.rename_param("prevent_destruction_hp", "floor"),
            _ => {}
        }
    }

    /// Builds a status entry from this effect's canonical parameters.
    pub fn status_effect(&self) -> Option<StatusEffect> {
        let code = self.text("status")?.to_string();
        let duration_type = match self.text("duration_type").map(str::to_uppercase).as_deref() {
            Some("FIXED_TURNS") => DurationKind::FixedTurns,
            Some("UNTIL_CONTROLLER_NEXT_TURN") => DurationKind::UntilControllerNextTurn,
            _ => DurationKind::Permanent,
        };
        let duration_value = match duration_type {
            DurationKind::FixedTurns => Some(self.int("duration_value", 1).max(1) as u32),
            _ => None,
        };
        Some(StatusEffect {
            code,
            duration_type,
            duration_value,
            on_expire: self.text("on_expire").map(str::to_string),
        })
    }
}

/// A card row as delivered by the deck service: one entry per physical copy,
/// quantity already expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDefinition {
    pub card_code: String,
    pub name: String,
    pub card_type: CardKind,
    pub stars: u8,
    #[serde(default)]
    pub atk: i32,
    #[serde(default)]
    pub hp: i32,
    #[serde(default)]
    pub element_id: Option<i32>,
    #[serde(default)]
    pub variant_group: Option<String>,
    #[serde(default)]
    pub trigger: Option<TriggerKind>,
    #[serde(default)]
    pub effects: Vec<EffectEntry>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub art_asset_id: Option<String>,
    #[serde(default)]
    pub flavor_text: Option<String>,
}

impl CardDefinition {
    pub fn canonicalize(&mut self) {
        for effect in &mut self.effects {
            effect.canonicalize();
        }
    }
}

/// One physical copy of a card inside a live match. The instance id is
/// opaque and stays stable across every zone move and re-skin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardInstance {
    pub instance_id: Uuid,
    pub card_code: String,
    pub name: String,
    pub card_type: CardKind,
    pub stars: u8,
    pub atk: i32,
    pub hp: i32,
    pub max_hp: i32,
    #[serde(default)]
    pub element_id: Option<i32>,
    #[serde(default)]
    pub variant_group: Option<String>,
    #[serde(default)]
    pub trigger: Option<TriggerKind>,

    // Board state
    pub face_down: bool,
    pub can_attack: bool,
    #[serde(default)]
    pub summoned_turn: Option<u32>,
    #[serde(default)]
    pub hero_charges: u32,

    #[serde(default)]
    pub statuses: Vec<StatusEffect>,
    #[serde(default)]
    pub effects: Vec<EffectEntry>,

    // Display only, never behavior-bearing.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub art_asset_id: Option<String>,
    #[serde(default)]
    pub flavor_text: Option<String>,
}

impl CardInstance {
    /// Creates a fresh runtime instance from a definition. New instances are
    /// face-down and cannot attack until the turn lifecycle grants it.
    pub fn from_definition(def: &CardDefinition) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            card_code: def.card_code.clone(),
            name: def.name.clone(),
            card_type: def.card_type,
            stars: def.stars,
            atk: def.atk,
            hp: def.hp,
            max_hp: def.hp,
            element_id: def.element_id,
            variant_group: def.variant_group.clone(),
            trigger: def.trigger,
            face_down: true,
            can_attack: false,
            summoned_turn: None,
            hero_charges: 0,
            statuses: Vec::new(),
            effects: def.effects.clone(),
            description: def.description.clone(),
            art_asset_id: def.art_asset_id.clone(),
            flavor_text: def.flavor_text.clone(),
        }
    }

    pub fn is_monster(&self) -> bool {
        self.card_type == CardKind::Monster
    }

    pub fn is_hero(&self) -> bool {
        self.card_type == CardKind::Hero
    }

    pub fn alive(&self) -> bool {
        self.hp > 0
    }

    /// Applies damage, clamping at 0. Returns (hp_before, hp_after).
    pub fn apply_damage(&mut self, amount: i32) -> (i32, i32) {
        let before = self.hp;
        self.hp = (self.hp - amount.max(0)).max(0);
        (before, self.hp)
    }

    /// Heals up to max HP. Returns (hp_before, hp_after).
    pub fn heal(&mut self, amount: i32) -> (i32, i32) {
        let before = self.hp;
        self.hp = (self.hp + amount.max(0)).min(self.max_hp);
        (before, self.hp)
    }

    pub fn has_status(&self, code: &str) -> bool {
        self.statuses.iter().any(|s| s.code == code)
    }

    /// Applies a status unless the card is status-immune or already carries
    /// the code. Returns whether the status landed.
    pub fn apply_status(&mut self, status: StatusEffect) -> bool {
        if self.has_status(STATUS_IMMUNE) && status.code != STATUS_IMMUNE {
            return false;
        }
        if self.has_status(&status.code) {
            return true;
        }
        self.statuses.push(status);
        true
    }

    /// Advances duration-based statuses one tick at the controller's turn
    /// start. Returns `(expired_code, replacement_code)` pairs for the log.
    pub fn tick_statuses(&mut self) -> Vec<(String, Option<String>)> {
        let mut expired = Vec::new();
        let mut kept = Vec::new();
        for mut status in self.statuses.drain(..) {
            match status.duration_type {
                DurationKind::Permanent => kept.push(status),
                DurationKind::UntilControllerNextTurn => {
                    expired.push((status.code, None));
                }
                DurationKind::FixedTurns => {
                    let remaining = status.duration_value.unwrap_or(1).saturating_sub(1);
                    if remaining == 0 {
                        let replacement = status.on_expire.take();
                        if let Some(code) = &replacement {
                            kept.push(StatusEffect::fixed(code, 2));
                        }
                        expired.push((status.code, replacement));
                    } else {
                        status.duration_value = Some(remaining);
                        kept.push(status);
                    }
                }
            }
        }
        self.statuses = kept;
        expired
    }

    /// First effect entry with the given keyword, if any.
    pub fn effect(&self, keyword: &str) -> Option<&EffectEntry> {
        self.effects.iter().find(|e| e.keyword == keyword)
    }

    /// The hero's declared active ability, if it has one.
    pub fn active_ability(&self) -> Option<&EffectEntry> {
        self.effects
            .iter()
            .find(|e| e.keyword.starts_with("HERO_ACTIVE_"))
    }

    /// Re-skins this instance onto an element variant definition. Identity,
    /// statuses and board flags survive; stats and behavior come from the
    /// variant. Damage already taken carries over against the new maximum.
    pub fn reskin_to(&mut self, variant: &CardDefinition) {
        let damage_taken = (self.max_hp - self.hp).max(0);
        self.card_code = variant.card_code.clone();
        self.name = variant.name.clone();
        self.stars = variant.stars;
        self.atk = variant.atk;
        self.max_hp = variant.hp;
        self.hp = (variant.hp - damage_taken).max(1).min(variant.hp);
        self.element_id = variant.element_id;
        self.trigger = variant.trigger;
        self.effects = variant.effects.clone();
        self.description = variant.description.clone();
        self.art_asset_id = variant.art_asset_id.clone();
        self.flavor_text = variant.flavor_text.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn monster_def(code: &str, stars: u8, atk: i32, hp: i32) -> CardDefinition {
        CardDefinition {
            card_code: code.to_string(),
            name: code.to_string(),
            card_type: CardKind::Monster,
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

    #[test]
    fn damage_and_heal_clamp() {
        let mut card = CardInstance::from_definition(&monster_def("M1", 2, 100, 150));
        let (before, after) = card.apply_damage(200);
        assert_eq!((before, after), (150, 0));
        let (before, after) = card.heal(500);
        assert_eq!((before, after), (0, 150));
    }

    #[test]
    fn status_immune_blocks_other_statuses() {
        let mut card = CardInstance::from_definition(&monster_def("M1", 2, 100, 150));
        assert!(card.apply_status(StatusEffect::permanent(STATUS_IMMUNE)));
        assert!(!card.apply_status(StatusEffect::fixed(STATUS_FROZEN, 2)));
        assert!(!card.has_status(STATUS_FROZEN));
    }

    #[test]
    fn fixed_turns_status_expires_on_second_tick_with_replacement() {
        let mut card = CardInstance::from_definition(&monster_def("M1", 2, 100, 150));
        let mut frozen = StatusEffect::fixed(STATUS_FROZEN, 2);
        frozen.on_expire = Some(STATUS_IMMUNE.to_string());
        card.apply_status(frozen);

        // First tick: 2 -> 1, still frozen.
        assert!(card.tick_statuses().is_empty());
        assert!(card.has_status(STATUS_FROZEN));

        // Second tick: removed, replacement installed.
        let expired = card.tick_statuses();
        assert_eq!(
            expired,
            vec![(STATUS_FROZEN.to_string(), Some(STATUS_IMMUNE.to_string()))]
        );
        assert!(!card.has_status(STATUS_FROZEN));
        assert!(card.has_status(STATUS_IMMUNE));
    }

    #[test]
    fn until_next_turn_status_drops_on_first_tick() {
        let mut card = CardInstance::from_definition(&monster_def("M1", 2, 100, 150));
        card.apply_status(StatusEffect {
            code: "SHIELDED".to_string(),
            duration_type: DurationKind::UntilControllerNextTurn,
            duration_value: None,
            on_expire: None,
        });
        let expired = card.tick_statuses();
        assert_eq!(expired, vec![("SHIELDED".to_string(), None)]);
        assert!(card.statuses.is_empty());
    }

    #[test]
    fn canonicalize_migrates_aliases() {
        let mut entry = EffectEntry::new("spell_draw");
        entry.params.insert("amount".to_string(), json!(2));
        entry.canonicalize();
        assert_eq!(entry.keyword, "SPELL_DRAW_CARDS");
        assert_eq!(entry.int("count", 0), 2);

        let mut buff = EffectEntry::new("SPELL_BUFF_MONSTER");
        buff.params.insert("atk_increase".to_string(), json!(50));
        buff.params.insert("target".to_string(), json!("SELF_MONSTERS"));
        buff.canonicalize();
        assert_eq!(buff.int("atk", 0), 50);
        assert_eq!(buff.text("target"), Some("own_monsters"));
    }

    #[test]
    fn reskin_preserves_identity_and_damage_taken() {
        let mut def = monster_def("FIRE_WOLF", 3, 100, 200);
        def.variant_group = Some("WOLF".to_string());
        let mut card = CardInstance::from_definition(&def);
        card.apply_damage(50);
        let id = card.instance_id;
        card.can_attack = true;
        card.summoned_turn = Some(3);

        let mut variant = monster_def("ICE_WOLF", 3, 120, 260);
        variant.variant_group = Some("WOLF".to_string());
        variant.element_id = Some(2);
        card.reskin_to(&variant);

        assert_eq!(card.instance_id, id);
        assert_eq!(card.card_code, "ICE_WOLF");
        assert_eq!(card.atk, 120);
        assert_eq!(card.max_hp, 260);
        assert_eq!(card.hp, 210); // 50 damage carried over
        assert!(card.can_attack);
        assert_eq!(card.summoned_turn, Some(3));
    }
}
