use async_trait::async_trait;
use serde::Deserialize;

use crate::engine::stage::Stage;
use crate::engine::surface::{Control, ControlAction, Effect, Kind};
use crate::error::Result;
use crate::types::{Look, Style};

use super::{Gate, Render};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoScene {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub embed_id: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub start_time: Option<u32>,
}

/// The video id, from `embedId` or the `v=` query parameter of `src`.
pub fn video_id(embed_id: Option<&str>, src: Option<&str>) -> Option<String> {
    if let Some(id) = embed_id.filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }
    let query = src?.split_once('?')?.1;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("v="))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

pub fn embed_url(id: &str, start: Option<u32>) -> String {
    let mut url = format!("https://www.youtube.com/embed/{id}?autoplay=0&rel=0&modestbranding=1");
    if let Some(secs) = start {
        url.push_str(&format!("&start={secs}"));
    }
    url
}

#[async_trait(?Send)]
impl Render for VideoScene {
    async fn render(&self, stage: &mut Stage) -> Result<Gate> {
        if let Some(title) = &self.title {
            let id = stage.surface_mut().push(Kind::Text, title, Look::big().to_style());
            stage.wait(200).await?;
            stage.surface_mut().show(id);
        }
        if let Some(description) = &self.description {
            let id = stage.surface_mut().push(Kind::Text, description, Style::default());
            stage.wait(200).await?;
            stage.surface_mut().show(id);
        }

        match video_id(self.embed_id.as_deref(), self.src.as_deref()) {
            Some(id) => {
                let embed = stage.surface_mut().push(
                    Kind::Embed {
                        url: embed_url(&id, self.start_time),
                    },
                    "",
                    Style::default(),
                );
                stage.wait(1000).await?;
                stage.surface_mut().show(embed);
                stage.surface_mut().add_effect(embed, Effect::FadeIn);
                let link = stage.surface_mut().push(
                    Kind::Link {
                        url: format!("https://youtu.be/{id}"),
                    },
                    "Open on YouTube",
                    Style::default().dim(),
                );
                stage.surface_mut().show(link);
            }
            None => {
                tracing::warn!("video scene without a video id");
                let id = stage
                    .surface_mut()
                    .push(Kind::Text, "Video unavailable", Style::default().dim());
                stage.surface_mut().show(id);
            }
        }

        stage.wait(300).await?;
        stage.wait(1000).await?;
        let next = stage
            .surface_mut()
            .push_control(Control::new("Continue", ControlAction::Advance).primary());
        stage.wait(200).await?;
        stage.surface_mut().show_control(next);
        Ok(Gate::Choices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::TestStage;

    #[test]
    fn id_comes_from_embed_id_or_src() {
        assert_eq!(video_id(Some("abc"), None).as_deref(), Some("abc"));
        assert_eq!(
            video_id(None, Some("https://www.youtube.com/watch?v=tWH0pcCJp4c&t=3")).as_deref(),
            Some("tWH0pcCJp4c")
        );
        assert_eq!(video_id(None, Some("https://example.com/video")), None);
        assert_eq!(video_id(Some(""), None), None);
    }

    #[test]
    fn start_time_is_appended() {
        assert_eq!(
            embed_url("tWH0pcCJp4c", Some(27)),
            "https://www.youtube.com/embed/tWH0pcCJp4c?autoplay=0&rel=0&modestbranding=1&start=27"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn continue_control_emits_advance() {
        let mut t = TestStage::new();
        let scene: VideoScene = serde_json::from_str(r#"{"title":"Beta","embedId":"jntsKUT1Hkk"}"#).unwrap();
        scene.render(&mut t.stage).await.unwrap();
        let surface = t.stage.surface();
        let control = surface.control(0).unwrap();
        assert_eq!(control.action, ControlAction::Advance);
        assert!(control.primary && control.visible && control.enabled);
        assert!(surface
            .elements()
            .iter()
            .any(|e| e.kind == Kind::Link { url: "https://youtu.be/jntsKUT1Hkk".into() }));
    }
}
