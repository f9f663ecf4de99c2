use thiserror::Error;

/// Rejection of a player intent. Every variant renders as a stable,
/// machine-readable reason code; clients match on the string, so variants
/// must never change their message once shipped.
#[derive(Debug, Error, PartialEq)]
pub enum IntentError {
    #[error("match_not_in_progress")]
    MatchNotInProgress,
    #[error("not_your_turn")]
    NotYourTurn,
    #[error("pending_decision_outstanding")]
    DecisionPending,
    #[error("card_not_in_hand")]
    CardNotInHand,
    #[error("card_not_on_board")]
    CardNotOnBoard,
    #[error("not_a_monster")]
    NotAMonster,
    #[error("not_a_spell")]
    NotASpell,
    #[error("not_a_trap")]
    NotATrap,
    #[error("invalid_zone")]
    InvalidZone,
    #[error("zone_occupied")]
    ZoneOccupied,
    #[error("hero_slot_occupied")]
    HeroSlotOccupied,
    #[error("tributes_required")]
    TributesRequired,
    #[error("summon_limit_reached")]
    SummonLimitReached,
    #[error("spell_trap_limit_reached")]
    SpellTrapLimitReached,
    #[error("hero_ability_limit_reached")]
    HeroAbilityLimitReached,
    #[error("no_hero")]
    NoHero,
    #[error("no_active_ability")]
    NoActiveAbility,
    #[error("target_required")]
    TargetRequired,
    #[error("cannot_attack")]
    CannotAttack,
    #[error("monsters_still_present")]
    MonstersStillPresent,
    #[error("not_your_decision")]
    NotYourDecision,
    #[error("stale_pending_decision")]
    StalePendingDecision,
    #[error("trap_not_eligible")]
    TrapNotEligible,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IntentError {
    /// The stable reason code sent back to clients.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Faults in card or deck data. These abort the operation that hit them but
/// never leave the match state partially mutated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("deck_has_no_cards")]
    EmptyDeck,
    #[error("unknown_star_tier")]
    UnknownStarTier(u8),
    #[error("malformed_effect_payload")]
    MalformedEffectPayload(String),
}

/// Failures talking to the collaborator services (decks, NPCs, identity,
/// match store).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Deck not found")]
    DeckNotFound,
    #[error("Deck has no cards")]
    DeckEmpty,
    #[error("NPC not found")]
    NpcNotFound,
    #[error("Player not found")]
    PlayerNotFound,
    #[error("Match not found")]
    MatchNotFound,
    #[error("Invalid response body for `{0}`")]
    InvalidResponseBody(String),
    #[error("Unexpected service error: {0}")]
    Unexpected(String),
}

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Invalid protocol header")]
    InvalidHeader,
    #[error("Invalid checksum value")]
    InvalidChecksum,
    #[error("Packet payload is truncated")]
    TruncatedPacket,
    #[error("Unable to send packet through client stream: {0}")]
    PacketWrite(String),
    #[error("Could not parse packet payload: {0}")]
    InvalidPayload(String),
}
