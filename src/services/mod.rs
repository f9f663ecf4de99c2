pub mod decks;
pub mod matches;
pub mod npcs;
pub mod players;
