use async_trait::async_trait;
use serde::Deserialize;

use crate::engine::source::Line;
use crate::engine::stage::Stage;
use crate::error::Result;

use super::{Gate, Render, render_lines};

#[derive(Debug, Clone, Deserialize)]
pub struct TextScene {
    #[serde(default)]
    pub lines: Vec<Line>,
}

#[async_trait(?Send)]
impl Render for TextScene {
    async fn render(&self, stage: &mut Stage) -> Result<Gate> {
        render_lines(stage, &self.lines).await?;
        Ok(Gate::Choices)
    }
}
