use serde::Deserialize;

/// Server configuration, loaded from `settings.toml` plus the environment.
/// Field names on disk are the ALL_CAPS keys.
#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(rename = "PORT", default = "default_port")]
    pub port: u16,
    /// Identity service: player profiles.
    #[serde(rename = "AUTH_SERVER")]
    pub auth_server: String,
    /// Deck service: resolved card definition lists.
    #[serde(rename = "DECK_SERVER")]
    pub deck_server: String,
    /// NPC service: opponent selection for PVE.
    #[serde(rename = "NPC_SERVER")]
    pub npc_server: String,
    /// Match store: serialized snapshots keyed by match id.
    #[serde(rename = "MATCH_STORE")]
    pub match_store: String,
}

fn default_port() -> u16 {
    8000
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("settings").required(false))
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()
    }
}
