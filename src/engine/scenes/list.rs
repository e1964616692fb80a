use async_trait::async_trait;
use serde::Deserialize;

use crate::engine::stage::Stage;
use crate::engine::surface::{Effect, Kind};
use crate::error::Result;
use crate::types::{Color, Look, NamedColor, Style};

use super::{Gate, Render};

const DEFAULT_ITEM_DELAY: u64 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Plus,
    Minus,
    #[default]
    Neutral,
}

impl ItemKind {
    fn bullet(self) -> &'static str {
        match self {
            ItemKind::Plus => "+ ",
            ItemKind::Minus => "- ",
            ItemKind::Neutral => "• ",
        }
    }

    fn style(self) -> Style {
        match self {
            ItemKind::Plus => Style::fg(Color::Named(NamedColor::Green)),
            ItemKind::Minus => Style::fg(Color::Named(NamedColor::Red)),
            ItemKind::Neutral => Style::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListItem {
    pub text: String,
    #[serde(default, rename = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub delay: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListScene {
    #[serde(default)]
    pub title: Option<String>,
    pub items: Vec<ListItem>,
}

#[async_trait(?Send)]
impl Render for ListScene {
    async fn render(&self, stage: &mut Stage) -> Result<Gate> {
        if let Some(title) = &self.title {
            let id = stage.surface_mut().push(Kind::Text, title, Look::big().to_style());
            stage.wait(100).await?;
            stage.surface_mut().show(id);
            stage.wait(400).await?;
        }

        for item in &self.items {
            let text = format!("{}{}", item.kind.bullet(), item.text);
            let id = stage.surface_mut().push(Kind::Text, &text, item.kind.style());
            stage.wait(item.delay.unwrap_or(DEFAULT_ITEM_DELAY)).await?;
            stage.surface_mut().show(id);
            stage.surface_mut().add_effect(id, Effect::FadeIn);
            stage.wait(300).await?;
        }
        Ok(Gate::Choices)
    }
}
