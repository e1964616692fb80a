//! Progress: the persisted game state and its owner.
//!
//! `Progress` is the only writer of `GameState`. Every mutation persists
//! before it returns; storage failures are logged and play continues.

pub mod store;
pub mod unlocks;

use serde::{Deserialize, Serialize};

use crate::engine::source::ENTRY;
use store::KeyValueStore;

pub const STATE_KEY: &str = "storyGameState";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameState {
    pub current_location: String,
    pub current_scene: usize,
    pub completed_locations: Vec<String>,
}

impl Default for GameState {
    fn default() -> Self {
        GameState {
            current_location: ENTRY.to_string(),
            current_scene: 0,
            completed_locations: Vec::new(),
        }
    }
}

impl GameState {
    /// Drop repeated ids, keeping first occurrences in order.
    fn dedup(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.completed_locations.retain(|id| seen.insert(id.clone()));
    }
}

pub struct Progress {
    state: GameState,
    store: Box<dyn KeyValueStore>,
}

impl Progress {
    /// Restore from `store`, falling back to defaults when absent or corrupt.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let state = match store.get(STATE_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<GameState>(&json) {
                Ok(mut state) => {
                    state.dedup();
                    tracing::info!(
                        location = %state.current_location,
                        scene = state.current_scene,
                        completed = state.completed_locations.len(),
                        "progress restored"
                    );
                    state
                }
                Err(e) => {
                    tracing::warn!(error = %e, "stored progress is corrupt, starting fresh");
                    GameState::default()
                }
            },
            Ok(None) => {
                tracing::info!("no stored progress, starting fresh");
                GameState::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not read progress, starting fresh");
                GameState::default()
            }
        };
        Progress { state, store }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn completed(&self) -> &[String] {
        &self.state.completed_locations
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.state.completed_locations.iter().any(|c| c == id)
    }

    /// Record a completion. Returns `false` when it was already recorded.
    pub fn complete(&mut self, id: &str) -> bool {
        if self.is_completed(id) {
            return false;
        }
        self.state.completed_locations.push(id.to_string());
        self.persist();
        true
    }

    pub fn set_position(&mut self, location: &str, scene: usize) {
        self.state.current_location = location.to_string();
        self.state.current_scene = scene;
        self.persist();
    }

    /// Forget everything: clear storage and return to the initial state.
    pub fn reset(&mut self) {
        if let Err(e) = self.store.remove(STATE_KEY) {
            tracing::warn!(error = %e, "could not clear stored progress");
        }
        self.state = GameState::default();
        tracing::info!("progress reset");
    }

    fn persist(&mut self) {
        let json = match serde_json::to_string(&self.state) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "could not serialize progress");
                return;
            }
        };
        if let Err(e) = self.store.set(STATE_KEY, &json) {
            tracing::warn!(error = %e, "could not save progress");
        }
    }
}
