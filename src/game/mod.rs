/// Game phase configuration read by every client to gate which rounds are playable.
// region:    --- Imports
use crate::error::{AuctionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// endregion: --- Imports

// region:    --- Game State

pub const CURRENT_PHASE_KEY: &str = "current_phase";
pub const PHASE_KEY_PREFIX: &str = "phase:";
pub const INITIAL_PHASE: &str = "waiting";
pub const DEFAULT_PHASES: [&str; 4] = ["quiz", "logic", "survey", "auction"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub current_phase: String,
    pub phases: BTreeMap<String, bool>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            current_phase: INITIAL_PHASE.to_string(),
            phases: DEFAULT_PHASES
                .iter()
                .map(|name| (name.to_string(), false))
                .collect(),
        }
    }
}

impl GameState {
    /// Rebuilds the state from `game_config` key/value rows.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut state = GameState {
            current_phase: INITIAL_PHASE.to_string(),
            phases: BTreeMap::new(),
        };
        for (key, value) in entries {
            if key == CURRENT_PHASE_KEY {
                state.current_phase = value;
            } else if let Some(name) = key.strip_prefix(PHASE_KEY_PREFIX) {
                state.phases.insert(name.to_string(), value == "true");
            }
        }
        state
    }
}

#[derive(Debug, Deserialize)]
pub struct SetPhaseCommand {
    pub phase: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPhaseEnabledCommand {
    pub enabled: bool,
}

/// Phase names are short identifiers used as config keys.
pub fn validate_phase_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty()
        || name.len() > 64
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AuctionError::Validation(format!(
            "invalid phase name {name:?}"
        )));
    }
    Ok(name)
}

// endregion: --- Game State

// endregion: --- Tests
