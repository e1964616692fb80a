use async_trait::async_trait;
use serde::Deserialize;

use crate::engine::media::MediaStatus;
use crate::engine::source::Line;
use crate::engine::stage::Stage;
use crate::engine::surface::{Effect, ElementId, Kind, Layout, PanelStatus};
use crate::error::Result;
use crate::types::{PANEL_PALETTE, Style};

use super::{Gate, Render, confetti, render_lines};

const LOAD_TIMEOUT_MS: u64 = 3000;
const PANEL_HOLD_MS: u64 = 2500;
const MAX_TILT_DEG: f64 = 5.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicScene {
    #[serde(default)]
    pub text_before: Vec<Line>,
    pub images: Vec<String>,
    #[serde(default)]
    pub chaos: bool,
    #[serde(default)]
    pub confetti: bool,
}

#[async_trait(?Send)]
impl Render for ComicScene {
    async fn render(&self, stage: &mut Stage) -> Result<Gate> {
        render_lines(stage, &self.text_before).await?;

        let columns = if self.chaos { 1 } else { 2 };
        let grid = stage
            .surface_mut()
            .push(Kind::Group(Layout::Grid { columns }), "", Style::default());
        stage.surface_mut().show(grid);

        // Build every panel up front so the grid has its final shape.
        let mut slots: Vec<ElementId> = Vec::with_capacity(self.images.len());
        for (i, _) in self.images.iter().enumerate() {
            let (tilt, border) = if self.chaos {
                let tilt = (stage.rng.next_f64() - 0.5) * 2.0 * MAX_TILT_DEG;
                (tilt as f32, Some(PANEL_PALETTE[i % PANEL_PALETTE.len()]))
            } else {
                (0.0, None)
            };
            let panel = stage.surface_mut().push_in(
                grid,
                Kind::Panel {
                    number: i + 1,
                    tilt,
                    border,
                },
                "",
                Style::default(),
            );
            stage.surface_mut().show(panel);
            let slot = stage.surface_mut().push_in(
                panel,
                Kind::Placeholder(PanelStatus::Loading),
                "",
                Style::default().dim(),
            );
            stage.surface_mut().show(slot);
            slots.push(slot);
        }

        for (i, (src, slot)) in self.images.iter().zip(slots).enumerate() {
            stage.commit();
            let outcome = stage
                .delay
                .race(LOAD_TIMEOUT_MS, stage.media.load(src))
                .await?;
            match outcome {
                Some(MediaStatus::Loaded) => {
                    stage.surface_mut().set_kind(
                        slot,
                        Kind::Image {
                            src: src.clone(),
                            alt: format!("Panel {}", i + 1),
                        },
                    );
                    stage.surface_mut().set_style(slot, Style::default());
                    stage.surface_mut().add_effect(slot, Effect::FadeIn);
                    stage.wait(PANEL_HOLD_MS).await?;
                }
                Some(MediaStatus::Failed) => {
                    tracing::warn!(src = %src, "comic panel failed to load");
                    stage.surface_mut().set_kind(slot, Kind::Placeholder(PanelStatus::Failed));
                    stage.wait(PANEL_HOLD_MS).await?;
                }
                None => {
                    tracing::warn!(src = %src, "comic panel timed out");
                    stage.surface_mut().set_kind(slot, Kind::Placeholder(PanelStatus::TimedOut));
                }
            }
        }

        if self.confetti {
            confetti(stage);
        }
        Ok(Gate::Choices)
    }
}
