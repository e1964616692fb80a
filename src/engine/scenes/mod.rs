//! Scene kinds and their renderers.
//!
//! Each kind lives in its own module with its payload struct and `Render`
//! implementation side by side.

mod celebration;
mod comic;
mod dual_list;
mod image;
mod input;
mod list;
mod quote;
mod tally;
mod text;
mod title;
mod video;

pub use celebration::CelebrationScene;
pub use comic::ComicScene;
pub use dual_list::DualListScene;
pub use image::ImageScene;
pub use input::InputScene;
pub use list::{ItemKind, ListItem, ListScene};
pub use quote::QuoteScene;
pub use tally::{Tally, TallyScene};
pub use text::TextScene;
pub use title::TitleScene;
pub use video::{VideoScene, embed_url, video_id};

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::Result;
use crate::types::PANEL_PALETTE;

use super::source::{Line, Reveal, SceneBody};
use super::stage::Stage;
use super::surface::{Burst, Effect, ElementId, Kind, Mark, Piece, Segment};
use super::typewriter::{Cadence, type_into};

/// How the interactive wait after a scene is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    /// The scene's declared choices (and any renderer-provided continue).
    Choices,
    /// Submit is only accepted with at least `min_length` characters typed.
    Input { min_length: usize },
    /// A live tally owns the key shortcuts until it is released.
    Tally(Tally),
}

/// Reveal a scene's content on the stage, resolving before choices appear.
#[async_trait(?Send)]
pub trait Render {
    async fn render(&self, stage: &mut Stage) -> Result<Gate>;
}

#[async_trait(?Send)]
impl Render for SceneBody {
    async fn render(&self, stage: &mut Stage) -> Result<Gate> {
        match self {
            SceneBody::Title(s) => s.render(stage).await,
            SceneBody::Text(s) => s.render(stage).await,
            SceneBody::Quote(s) => s.render(stage).await,
            SceneBody::List(s) => s.render(stage).await,
            SceneBody::DualList(s) => s.render(stage).await,
            SceneBody::Input(s) => s.render(stage).await,
            SceneBody::Image(s) => s.render(stage).await,
            SceneBody::Comic(s) => s.render(stage).await,
            SceneBody::Video(s) => s.render(stage).await,
            SceneBody::PuddingGame(s) => s.render(stage).await,
            SceneBody::Celebration(s) => s.render(stage).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared line contract
// ---------------------------------------------------------------------------

/// Reveal one line per its reveal mode, apply post-effects, then hold for its
/// `pause_after`.
pub(crate) async fn render_line(stage: &mut Stage, line: &Line) -> Result<ElementId> {
    if line.pause_before > 0 {
        stage.wait(line.pause_before).await?;
    }
    let id = stage
        .surface_mut()
        .push(Kind::Text, "", line.look.to_style());

    match line.reveal {
        Reveal::Instant => {
            stage.surface_mut().set_text(id, &line.text);
            stage.surface_mut().show(id);
            if line.shake {
                stage.wait(100).await?;
                stage.surface_mut().add_effect(id, Effect::Shake);
            }
        }
        Reveal::Typewriter { speed, variance } => {
            type_into(stage, id, &line.text, Cadence::line(speed, variance)).await?;
            if line.shake {
                stage.surface_mut().add_effect(id, Effect::Shake);
            }
        }
    }

    if line.emoji_bounce {
        stage.surface_mut().set_segments(id, bounce_emoji(&line.text));
    }

    if let Some(fix) = &line.correction {
        let kept = line.text.replacen(&fix.struck, "", 1);
        stage.surface_mut().set_segments(
            id,
            vec![
                Segment::plain(kept),
                Segment::marked(fix.struck.clone(), Mark::Struck),
                Segment::plain(format!(" {}", fix.corrected)),
            ],
        );
    }

    stage.wait(line.pause_after).await?;
    Ok(id)
}

pub(crate) async fn render_lines(stage: &mut Stage, lines: &[Line]) -> Result<()> {
    for line in lines {
        render_line(stage, line).await?;
    }
    Ok(())
}

pub(crate) fn is_emoji(ch: char) -> bool {
    matches!(ch as u32,
        0x1F300..=0x1F9FF | 0x1FA70..=0x1FAFF | 0x2600..=0x26FF | 0x2700..=0x27BF)
}

/// Split text so runs of emoji carry the bounce mark.
pub(crate) fn bounce_emoji(text: &str) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    for ch in text.chars() {
        // Variation selectors and joiners stick to the preceding run.
        let glue = matches!(ch, '\u{FE0F}' | '\u{200D}');
        let mark = if is_emoji(ch) || (glue && out.last().is_some_and(|s| s.mark == Mark::Bounce)) {
            Mark::Bounce
        } else {
            Mark::Plain
        };
        match out.last_mut() {
            Some(seg) if seg.mark == mark => seg.text.push(ch),
            _ => out.push(Segment::marked(ch.to_string(), mark)),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Particles
// ---------------------------------------------------------------------------

const CONFETTI_PIECES: usize = 30;
const CONFETTI_TTL_MS: u64 = 2500;

pub(crate) fn confetti(stage: &mut Stage) {
    spray(stage, CONFETTI_PIECES, &['*', '+', '•', '▪', '✦'], Duration::from_millis(CONFETTI_TTL_MS));
}

pub(crate) fn spray(stage: &mut Stage, count: usize, glyphs: &[char], ttl: Duration) {
    let pieces = (0..count)
        .map(|_| {
            let column = stage.rng.next_f64() as f32;
            let glyph = glyphs[stage.rng.next_u32_range(0, glyphs.len() as u32 - 1) as usize];
            let slot = stage.rng.next_u32_range(0, PANEL_PALETTE.len() as u32 - 1) as usize;
            let color = PANEL_PALETTE[slot];
            Piece { column, glyph, color }
        })
        .collect();
    stage.surface_mut().burst(Burst {
        pieces,
        born: Instant::now(),
        ttl,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::TestStage;
    use crate::engine::rng::DeterministicRng;
    use crate::types::{Accent, Look, Size};
    use tokio::time::Instant;

    /// Always picks the top of the range.
    struct TopRng;

    impl DeterministicRng for TopRng {
        fn next_u32_range(&mut self, _min: u32, max: u32) -> u32 {
            max
        }

        fn next_f64(&mut self) -> f64 {
            0.99
        }
    }

    #[test]
    fn emoji_runs_are_marked() {
        let segs = bounce_emoji("nice 😋😋 ok");
        assert_eq!(
            segs,
            vec![
                Segment::plain("nice "),
                Segment::marked("😋😋", Mark::Bounce),
                Segment::plain(" ok"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn instant_shake_line_waits_then_shakes() {
        let mut t = TestStage::new();
        let mut line = Line::typed("LOUD");
        line.reveal = Reveal::Instant;
        line.shake = true;
        line.look = Look::accented(Size::Huge, Accent::Red);
        let start = Instant::now();
        let id = render_line(&mut t.stage, &line).await.unwrap();
        assert_eq!(start.elapsed().as_millis(), 100 + 300);
        let el = t.stage.surface().get(id).unwrap();
        assert!(el.has_effect(Effect::Shake));
        assert!(el.visible);
        assert!(el.style.bold);
    }

    #[tokio::test(start_paused = true)]
    async fn correction_strikes_and_appends() {
        let mut t = TestStage::new();
        let line: Line = serde_json::from_str(
            r#"{"text":"Motice","instant":true,"strikethrough":"ce","corrected":"vace","pauseAfter":0}"#,
        )
        .unwrap();
        let id = render_line(&mut t.stage, &line).await.unwrap();
        let el = t.stage.surface().get(id).unwrap();
        assert_eq!(el.segments[0], Segment::plain("Moti"));
        assert_eq!(el.segments[1], Segment::marked("ce", Mark::Struck));
        assert_eq!(el.text(), "Motice vace");
    }

    #[tokio::test(start_paused = true)]
    async fn spray_colours_stay_inside_the_palette() {
        let mut t = TestStage::new();
        t.stage.rng = Box::new(TopRng);
        spray(&mut t.stage, 4, &['🍮', '✦'], Duration::from_millis(2000));
        let burst = &t.stage.surface().bursts()[0];
        assert_eq!(burst.pieces.len(), 4);
        for piece in &burst.pieces {
            assert_eq!(piece.glyph, '✦');
            assert_eq!(piece.color, PANEL_PALETTE[PANEL_PALETTE.len() - 1]);
        }
    }
}
