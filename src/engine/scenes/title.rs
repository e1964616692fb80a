use async_trait::async_trait;
use serde::Deserialize;

use crate::engine::source::Line;
use crate::engine::stage::Stage;
use crate::engine::surface::{Effect, Kind, Mark, Segment};
use crate::error::Result;
use crate::types::Look;

use super::{Gate, Render, render_lines};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleScene {
    pub title: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub lines: Vec<Line>,
}

#[async_trait(?Send)]
impl Render for TitleScene {
    async fn render(&self, stage: &mut Stage) -> Result<Gate> {
        let style = Look::big().to_style();
        let heading = stage.surface_mut().push(Kind::Text, &self.title, style);
        stage.wait(100).await?;
        stage.surface_mut().show(heading);
        stage.surface_mut().add_effect(heading, Effect::FadeIn);

        if let Some(emoji) = &self.emoji {
            stage.wait(400).await?;
            stage.surface_mut().push_segment(heading, Segment::plain(" "));
            stage.surface_mut().push_segment(heading, Segment::plain(emoji.clone()));
            stage.wait(100).await?;
            if let Some(seg) = stage
                .surface_mut()
                .get_mut(heading)
                .and_then(|el| el.segments.last_mut())
            {
                seg.mark = Mark::Bounce;
            }
        }

        if !self.lines.is_empty() {
            stage.wait(600).await?;
            render_lines(stage, &self.lines).await?;
        }
        Ok(Gate::Choices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::TestStage;
    use tokio::time::{Duration, Instant};

    #[tokio::test(start_paused = true)]
    async fn title_with_emoji_follows_the_choreography() {
        let mut t = TestStage::new();
        let scene = TitleScene {
            title: "Napoleon".into(),
            emoji: Some("📖".into()),
            lines: Vec::new(),
        };
        let start = Instant::now();
        let gate = scene.render(&mut t.stage).await.unwrap();
        assert_eq!(gate, Gate::Choices);
        assert_eq!(start.elapsed(), Duration::from_millis(100 + 400 + 100));

        let (_, heading) = t.stage.surface().top_level().next().unwrap();
        assert_eq!(heading.text(), "Napoleon 📖");
        assert_eq!(heading.segments.last().unwrap().mark, Mark::Bounce);
        assert!(heading.has_effect(Effect::FadeIn));
    }
}
