use async_trait::async_trait;
use serde::Deserialize;

use crate::engine::source::Line;
use crate::engine::stage::Stage;
use crate::error::Result;
use crate::types::Accent;

use super::{Gate, Render, confetti, render_line};

#[derive(Debug, Clone, Deserialize)]
pub struct CelebrationScene {
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default = "default_confetti")]
    pub confetti: bool,
}

fn default_confetti() -> bool {
    true
}

#[async_trait(?Send)]
impl Render for CelebrationScene {
    async fn render(&self, stage: &mut Stage) -> Result<Gate> {
        for line in &self.lines {
            let mut festive = line.clone();
            festive.look.accent = festive.look.accent.or(Some(Accent::Gold));
            festive.look.glow = true;
            render_line(stage, &festive).await?;
        }
        if self.confetti {
            confetti(stage);
        }
        Ok(Gate::Choices)
    }
}
