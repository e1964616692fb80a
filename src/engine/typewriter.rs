//! Typewriter: character-by-character reveal with jitter and punctuation
//! pauses.

use crate::error::Result;

use super::rng::{DeterministicRng, jitter};
use super::stage::Stage;
use super::surface::ElementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub base_ms: u64,
    /// Total jitter width; each interval moves by up to half of it either way.
    pub spread_ms: u64,
    pub punct_ms: u64,
    pub punctuation: &'static [char],
}

impl Cadence {
    /// Chapter lines: 150ms extra after `, . ? !`.
    pub fn line(speed: u64, variance: u64) -> Self {
        Cadence {
            base_ms: speed,
            spread_ms: variance,
            punct_ms: 150,
            punctuation: &[',', '.', '?', '!'],
        }
    }

    /// Intro words and reasons.
    pub fn word(speed: u64) -> Self {
        Cadence {
            spread_ms: 40,
            ..Cadence::line(speed, 0)
        }
    }

    /// Intro welcome line: slow, wide jitter, 200ms after `, . ?`.
    pub fn welcome() -> Self {
        Cadence {
            base_ms: 80,
            spread_ms: 60,
            punct_ms: 200,
            punctuation: &[',', '.', '?'],
        }
    }

    /// Wait after revealing `ch`. Never negative.
    pub fn interval(&self, ch: char, rng: &mut dyn DeterministicRng) -> u64 {
        let jittered = (self.base_ms as f64 + jitter(rng, self.spread_ms)).max(0.0).round() as u64;
        let pause = if self.punctuation.contains(&ch) {
            self.punct_ms
        } else {
            0
        };
        jittered + pause
    }
}

/// Reset `target` to empty, show it, then append `text` one character at a
/// time.
pub async fn type_into(stage: &mut Stage, target: ElementId, text: &str, cadence: Cadence) -> Result<()> {
    stage.surface_mut().set_segments(target, Vec::new());
    stage.surface_mut().show(target);
    for ch in text.chars() {
        stage.surface_mut().push_char(target, ch);
        let ms = cadence.interval(ch, stage.rng.as_mut());
        stage.wait(ms).await?;
    }
    Ok(())
}
