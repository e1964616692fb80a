use async_trait::async_trait;
use serde::Deserialize;

use crate::engine::stage::Stage;
use crate::engine::surface::{Effect, ElementId, Kind, Layout};
use crate::error::Result;
use crate::types::{Accent, Color, Look, NamedColor, Size, Style};

use super::{Gate, ListItem, Render};

const STAGGER_MS: u64 = 200;
const NEGATIVE_OFFSET_MS: u64 = 500;
const MIN_DURATION_MS: u64 = 300;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DualListScene {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_positive_title")]
    pub positive_title: String,
    #[serde(default = "default_negative_title")]
    pub negative_title: String,
    #[serde(default)]
    pub positive_items: Vec<ListItem>,
    #[serde(default)]
    pub negative_items: Vec<ListItem>,
}

fn default_positive_title() -> String {
    "Positive".to_string()
}

fn default_negative_title() -> String {
    "Negative".to_string()
}

impl DualListScene {
    /// Reveal offsets of the positive column, then of the negative column.
    pub fn schedule(&self) -> (Vec<u64>, Vec<u64>) {
        let positive = (0..self.positive_items.len() as u64).map(|i| i * STAGGER_MS).collect();
        let negative = (0..self.negative_items.len() as u64)
            .map(|i| i * STAGGER_MS + NEGATIVE_OFFSET_MS)
            .collect();
        (positive, negative)
    }
}

fn column(stage: &mut Stage, row: ElementId, title: &str, accent: Accent, items: &[ListItem], color: Color) -> Vec<ElementId> {
    let col = stage.surface_mut().push_in(row, Kind::Group(Layout::Stack), "", Style::default());
    stage.surface_mut().show(col);
    let heading = stage
        .surface_mut()
        .push_in(col, Kind::Text, title, Look::accented(Size::Big, accent).to_style());
    stage.surface_mut().show(heading);
    items
        .iter()
        .map(|item| {
            stage
                .surface_mut()
                .push_in(col, Kind::Text, &format!("→ {}", item.text), Style::fg(color))
        })
        .collect()
}

#[async_trait(?Send)]
impl Render for DualListScene {
    async fn render(&self, stage: &mut Stage) -> Result<Gate> {
        if let Some(title) = &self.title {
            let id = stage.surface_mut().push(Kind::Text, title, Look::big().to_style());
            stage.wait(200).await?;
            stage.surface_mut().show(id);
        }

        let row = stage.surface_mut().push(Kind::Group(Layout::Row), "", Style::default());
        stage.surface_mut().show(row);
        let positive = column(
            stage,
            row,
            &self.positive_title,
            Accent::Green,
            &self.positive_items,
            Color::Named(NamedColor::Green),
        );
        let negative = column(
            stage,
            row,
            &self.negative_title,
            Accent::Red,
            &self.negative_items,
            Color::Named(NamedColor::Red),
        );

        let (pos_at, neg_at) = self.schedule();
        let mut events: Vec<(u64, ElementId)> = pos_at
            .into_iter()
            .zip(positive)
            .chain(neg_at.into_iter().zip(negative))
            .collect();
        // Stable: on equal offsets the positive column goes first.
        events.sort_by_key(|(at, _)| *at);

        let mut clock = 0;
        for (at, id) in events {
            stage.wait(at - clock).await?;
            clock = at;
            stage.surface_mut().show(id);
            stage.surface_mut().add_effect(id, Effect::FadeIn);
        }
        stage.wait(MIN_DURATION_MS.saturating_sub(clock)).await?;
        Ok(Gate::Choices)
    }
}
