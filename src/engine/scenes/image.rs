use async_trait::async_trait;
use serde::Deserialize;

use crate::engine::source::Line;
use crate::engine::stage::Stage;
use crate::engine::surface::{Effect, Kind};
use crate::error::Result;
use crate::types::Style;

use super::{Gate, Render, render_lines};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageScene {
    #[serde(default)]
    pub text_before: Vec<Line>,
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub caption: Option<String>,
}

#[async_trait(?Send)]
impl Render for ImageScene {
    async fn render(&self, stage: &mut Stage) -> Result<Gate> {
        render_lines(stage, &self.text_before).await?;

        let image = stage.surface_mut().push(
            Kind::Image {
                src: self.src.clone(),
                alt: self.alt.clone(),
            },
            "",
            Style::default(),
        );
        let caption = self
            .caption
            .as_deref()
            .map(|c| stage.surface_mut().push(Kind::Text, c, Style::default().dim()));

        stage.wait(300).await?;
        for id in std::iter::once(image).chain(caption) {
            stage.surface_mut().show(id);
            stage.surface_mut().add_effect(id, Effect::FadeIn);
        }
        Ok(Gate::Choices)
    }
}
