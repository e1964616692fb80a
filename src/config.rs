use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub key_bindings: KeyBindings,
    /// Where progress and the log file live.
    pub state_dir: Option<PathBuf>,
    /// Multiplier on every delay; 0.5 plays twice as fast.
    pub speed: f64,
    /// Problems found while loading, logged once logging is up.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub quit: Vec<String>,
    pub restart: String,
    pub fullscreen: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            quit: vec!["Esc".into(), "Ctrl-c".into()],
            restart: "Ctrl-r".into(),
            fullscreen: "F11".into(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            key_bindings: KeyBindings::default(),
            state_dir: None,
            speed: 1.0,
            warnings: Vec::new(),
        }
    }
}

/// Speed multiplier applied by `--fast`.
pub const FAST_SPEED: f64 = 0.2;

impl PlayerConfig {
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match std::fs::read_to_string(&config_path) {
            Ok(json) => Self::from_json(&json),
            Err(_) => Self::default(),
        }
    }

    /// Parse a config file body, falling back on invalid input.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<PlayerConfig>(json) {
            Ok(config) if config.speed.is_finite() && config.speed >= 0.0 => config,
            Ok(mut config) => {
                config.warnings.push(format!("invalid speed {} in config, using 1.0", config.speed));
                config.speed = 1.0;
                config
            }
            Err(e) => {
                let mut config = Self::default();
                config.warnings.push(format!("invalid player config ({e}), using defaults"));
                config
            }
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| home().join(".local/state/story-map"))
    }

    fn config_path() -> PathBuf {
        home().join(".config").join("story-map").join("config.json")
    }
}

fn home() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
}

/// Check whether a crossterm `KeyEvent` matches a binding string from config.
pub fn matches_binding(binding: &str, event: &KeyEvent) -> bool {
    if let Some(rest) = binding.strip_prefix("Alt-") {
        return event.modifiers.contains(KeyModifiers::ALT) && matches_key(rest, event.code);
    }

    if let Some(rest) = binding.strip_prefix("Ctrl-") {
        return event.modifiers.contains(KeyModifiers::CONTROL) && matches_key(rest, event.code);
    }

    // Plain bindings never fire while Ctrl or Alt is held.
    if event.modifiers.contains(KeyModifiers::CONTROL)
        || event.modifiers.contains(KeyModifiers::ALT)
    {
        return false;
    }
    matches_key(binding, event.code)
}

fn matches_key(name: &str, code: KeyCode) -> bool {
    match name {
        "Right" => code == KeyCode::Right,
        "Left" => code == KeyCode::Left,
        "Up" => code == KeyCode::Up,
        "Down" => code == KeyCode::Down,
        "Enter" => code == KeyCode::Enter,
        "Esc" => code == KeyCode::Esc,
        "Space" => code == KeyCode::Char(' '),
        "Tab" => code == KeyCode::Tab,
        "Backspace" => code == KeyCode::Backspace,
        s => {
            if let Some(n) = s.strip_prefix('F').and_then(|rest| rest.parse::<u8>().ok()) {
                return code == KeyCode::F(n);
            }
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => code == KeyCode::Char(c),
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn bindings_respect_modifiers() {
        assert!(matches_binding("Ctrl-r", &key(KeyCode::Char('r'), KeyModifiers::CONTROL)));
        assert!(!matches_binding("Ctrl-r", &key(KeyCode::Char('r'), KeyModifiers::NONE)));
        assert!(!matches_binding("n", &key(KeyCode::Char('n'), KeyModifiers::CONTROL)));
        assert!(matches_binding("Esc", &key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(matches_binding("F11", &key(KeyCode::F(11), KeyModifiers::NONE)));
        assert!(!matches_binding("F1", &key(KeyCode::F(11), KeyModifiers::NONE)));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = PlayerConfig::from_json(r#"{"speed":0.5,"key_bindings":{"restart":"Ctrl-x"}}"#);
        assert_eq!(config.speed, 0.5);
        assert_eq!(config.key_bindings.restart, "Ctrl-x");
        assert_eq!(config.key_bindings.quit, vec!["Esc".to_string(), "Ctrl-c".to_string()]);
    }

    #[test]
    fn invalid_config_falls_back() {
        let config = PlayerConfig::from_json("{ nope");
        assert_eq!(config.speed, 1.0);
        assert_eq!(config.warnings.len(), 1);
        let negative = PlayerConfig::from_json(r#"{"speed":-2}"#);
        assert_eq!(negative.speed, 1.0);
        assert!(negative.warnings[0].contains("speed"));
    }
}
