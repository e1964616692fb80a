use async_trait::async_trait;
use serde::Deserialize;

use crate::engine::source::Line;
use crate::engine::stage::Stage;
use crate::engine::surface::InputField;
use crate::error::Result;

use super::{Gate, Render, render_lines};

pub const DEFAULT_MIN_LENGTH: usize = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputScene {
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

fn default_placeholder() -> String {
    "Write here...".to_string()
}

fn default_min_length() -> usize {
    DEFAULT_MIN_LENGTH
}

#[async_trait(?Send)]
impl Render for InputScene {
    async fn render(&self, stage: &mut Stage) -> Result<Gate> {
        render_lines(stage, &self.lines).await?;
        stage.surface_mut().set_input(InputField {
            placeholder: self.placeholder.clone(),
            value: String::new(),
            visible: false,
            focused: false,
            rejected: false,
        });
        stage.wait(100).await?;
        if let Some(field) = stage.surface_mut().input_mut() {
            field.visible = true;
            field.focused = true;
        }
        Ok(Gate::Input {
            min_length: self.min_length,
        })
    }
}
