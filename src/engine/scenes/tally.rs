use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::engine::stage::Stage;
use crate::engine::surface::{Control, ControlAction, ElementId, Kind};
use crate::error::Result;
use crate::types::{Accent, Look, Size, Style};

use super::{Gate, Render, spray};

const FALL_MS: u64 = 2000;
const CONTINUE_AFTER_MS: u64 = 1000;
const NEAR_TARGET: u32 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct TallyScene {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default = "default_target")]
    pub target: u32,
}

fn default_target() -> u32 {
    99
}

/// Live state of a tally while its scene is on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally {
    pub target: u32,
    pub count: u32,
    counter: ElementId,
    status: ElementId,
}

impl Tally {
    pub fn is_done(&self) -> bool {
        self.count >= self.target
    }

    fn counter_text(&self) -> String {
        format!("{}/{}", self.count, self.target)
    }

    /// Running status while the tally is short of its target.
    fn progress_text(&self) -> String {
        let left = self.target - self.count;
        if left < NEAR_TARGET {
            format!("Only {left} left!")
        } else {
            format!("Added: {}", self.count)
        }
    }

    /// Add up to `amount`, clamped at the target. Reaching the target disables
    /// both increments and, after a beat, offers a continue control.
    pub async fn add(&mut self, stage: &mut Stage, amount: u32) -> Result<()> {
        if self.is_done() {
            return Ok(());
        }
        let added = amount.min(self.target - self.count);
        self.count += added;
        tracing::debug!(added, count = self.count, target = self.target, "tally");

        spray(stage, added as usize, &['🍮'], Duration::from_millis(FALL_MS));
        let text = self.counter_text();
        stage.surface_mut().set_text(self.counter, &text);
        if !self.is_done() {
            let status = self.progress_text();
            stage.surface_mut().set_text(self.status, &status);
        }

        if self.is_done() {
            let increments: Vec<usize> = stage
                .surface()
                .controls()
                .iter()
                .enumerate()
                .filter(|(_, c)| matches!(c.action, ControlAction::Add(_)))
                .map(|(i, _)| i)
                .collect();
            for i in increments {
                stage.surface_mut().set_control_enabled(i, false);
            }
            stage.surface_mut().set_text(self.status, "Done!");
            stage.wait(CONTINUE_AFTER_MS).await?;
            let next = stage
                .surface_mut()
                .push_control(Control::new("Continue", ControlAction::Advance).primary());
            stage.surface_mut().show_control(next);
            stage.surface_mut().set_focus(next);
        }
        stage.commit();
        Ok(())
    }
}

#[async_trait(?Send)]
impl Render for TallyScene {
    async fn render(&self, stage: &mut Stage) -> Result<Gate> {
        if let Some(title) = &self.title {
            let id = stage.surface_mut().push(Kind::Text, title, Look::big().to_style());
            stage.surface_mut().show(id);
        }
        let instructions = self
            .instructions
            .clone()
            .unwrap_or_else(|| format!("Add {} to finish", self.target));
        let hint = format!("{instructions}  (Space +1, Enter +10)");
        let id = stage.surface_mut().push(Kind::Text, &hint, Style::default().dim());
        stage.surface_mut().show(id);

        let counter = stage.surface_mut().push(
            Kind::Text,
            &format!("0/{}", self.target),
            Look::accented(Size::Huge, Accent::Gold).to_style(),
        );
        stage.surface_mut().show(counter);
        let status = stage.surface_mut().push(Kind::Text, "", Style::default());
        stage.surface_mut().show(status);

        for amount in [1, 10] {
            let idx = stage
                .surface_mut()
                .push_control(Control::new(format!("+{amount}"), ControlAction::Add(amount)));
            stage.surface_mut().show_control(idx);
        }

        Ok(Gate::Tally(Tally {
            target: self.target,
            count: 0,
            counter,
            status,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::TestStage;

    async fn rendered(t: &mut TestStage, target: u32) -> Tally {
        let scene = TallyScene {
            title: Some("Pudding".into()),
            instructions: None,
            target,
        };
        match scene.render(&mut t.stage).await.unwrap() {
            Gate::Tally(tally) => tally,
            other => panic!("expected tally gate, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ten_tens_then_nine_ones_is_exactly_the_target() {
        let mut t = TestStage::new();
        let mut tally = rendered(&mut t, 99).await;
        let status = |t: &TestStage, tally: &Tally| {
            t.stage.surface().get(tally.status).unwrap().text().to_string()
        };
        for i in 0..10 {
            tally.add(&mut t.stage, 10).await.unwrap();
            match i {
                4 => assert_eq!(status(&t, &tally), "Added: 50"),
                8 => assert_eq!(status(&t, &tally), "Only 9 left!"),
                _ => {}
            }
        }
        for _ in 0..9 {
            tally.add(&mut t.stage, 1).await.unwrap();
        }
        assert_eq!(tally.count, 99);
        let counter = t.stage.surface().get(tally.counter).unwrap();
        assert_eq!(counter.text(), "99/99");
        let status = t.stage.surface().get(tally.status).unwrap();
        assert_eq!(status.text(), "Done!");
    }

    #[tokio::test(start_paused = true)]
    async fn status_counts_down_near_the_target() {
        let mut t = TestStage::new();
        let mut tally = rendered(&mut t, 99).await;
        for _ in 0..9 {
            tally.add(&mut t.stage, 10).await.unwrap();
        }
        for _ in 0..5 {
            tally.add(&mut t.stage, 1).await.unwrap();
        }
        assert_eq!(tally.count, 95);
        let status = t.stage.surface().get(tally.status).unwrap();
        assert_eq!(status.text(), "Only 4 left!");
        assert!(t.stage.surface().controls().iter().all(|c| c.enabled));
    }

    #[tokio::test(start_paused = true)]
    async fn finishing_disables_increments_and_offers_continue() {
        let mut t = TestStage::new();
        let mut tally = rendered(&mut t, 12).await;
        tally.add(&mut t.stage, 10).await.unwrap();
        assert!(t.stage.surface().controls().iter().all(|c| c.enabled));
        assert_eq!(t.stage.surface().controls().len(), 2);

        tally.add(&mut t.stage, 10).await.unwrap();
        assert_eq!(tally.count, 12);
        let controls = t.stage.surface().controls();
        assert!(!controls[0].enabled && !controls[1].enabled);
        assert_eq!(controls[2].action, ControlAction::Advance);
        assert!(controls[2].primary && controls[2].visible);
        assert_eq!(t.stage.surface().focus(), Some(2));
    }
}
