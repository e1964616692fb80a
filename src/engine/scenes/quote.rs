use async_trait::async_trait;
use serde::Deserialize;

use crate::engine::source::Line;
use crate::engine::stage::Stage;
use crate::engine::surface::{Effect, Kind};
use crate::error::Result;
use crate::types::Style;

use super::{Gate, Render};

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteScene {
    pub lines: Vec<Line>,
}

#[async_trait(?Send)]
impl Render for QuoteScene {
    async fn render(&self, stage: &mut Stage) -> Result<Gate> {
        let text = self
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let look = self.lines.first().map(|l| l.look.to_style()).unwrap_or_default();
        let style = Style { italic: true, ..look };

        let block = stage.surface_mut().push(Kind::Text, &text, style);
        stage.wait(100).await?;
        stage.surface_mut().show(block);
        stage.surface_mut().add_effect(block, Effect::FadeIn);
        stage.wait(800).await?;
        Ok(Gate::Choices)
    }
}
