//! Intro: the one-time cinematic played before the map is first shown.
//!
//! Strictly linear. Nothing here is persisted; the caller marks the entry
//! sentinel completed once `play_intro` returns.

use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::types::{Accent, Look, Size, Style};

use super::scenes::{bounce_emoji, spray};
use super::stage::{Input, Key, Stage};
use super::surface::{Control, ControlAction, Effect, ElementId, Kind, Mark, Segment};
use super::typewriter::{Cadence, type_into};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntroScript {
    pub welcome: String,
    pub question: String,
    /// Word inside `question` that gets singled out.
    pub highlight: String,
    pub explanation: String,
    pub parenthesis: String,
    pub reveal_heading: String,
    pub words: Vec<String>,
    pub reason_title: String,
    pub reasons: Vec<String>,
    pub personal: Vec<String>,
    pub tone_shift: String,
    pub image: Option<String>,
    pub continue_label: String,
    pub final_label: String,
}

impl Default for IntroScript {
    fn default() -> Self {
        let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        IntroScript {
            welcome: "Welcome to my MINI game".into(),
            question: "Wondering why MINI and not mini?".into(),
            highlight: "MINI".into(),
            explanation: "Because MINI is a great acronym".into(),
            parenthesis: "(which I just made up 😏)".into(),
            reveal_heading: "MINI =".into(),
            words: owned(&["Mentally", "Insanely", "Nonstop", "Intense"]),
            reason_title: "Why I made this:".into(),
            reasons: owned(&[
                "1️⃣ it felt funny",
                "2️⃣ I can't remember the last time I talked business with someone and learned something, so this is my thank you 🥳",
                "3️⃣ it felt funny",
            ]),
            personal: owned(&[
                "4️⃣ you said nobody had got your number in a long time",
                "so I'm honoured by this exceptional situation",
                "and now I'm doing something I haven't done in a long time (ever)",
            ]),
            tone_shift: "Ur welkam".into(),
            image: None,
            continue_label: "Continue".into(),
            final_label: "Let's go".into(),
        }
    }
}

/// Play the whole intro, returning once the final control is activated.
pub async fn play_intro(stage: &mut Stage, script: &IntroScript) -> Result<()> {
    tracing::info!("intro started");
    stage.surface_mut().clear();

    // 1. silence
    let silence = 500 + stage.rng.next_u32_range(0, 300) as u64;
    stage.wait(silence).await?;

    // 2. welcome line with a blinking caret
    let welcome = text(stage, "", Look::big().to_style());
    type_into(stage, welcome, &script.welcome, Cadence::welcome()).await?;
    stage.surface_mut().add_effect(welcome, Effect::Caret);
    stage.wait(300).await?;
    stage.surface_mut().remove_effect(welcome, Effect::Caret);
    stage.wait(500).await?;

    // 3. question, then single out the highlight word
    let question = text(stage, &script.question, Style::default());
    stage.wait(100).await?;
    stage.surface_mut().show(question);
    if let Some(at) = highlight_at(&script.question, &script.highlight) {
        stage.wait(800).await?;
        let (before, rest) = script.question.split_at(at);
        let after = &rest[script.highlight.len()..];
        stage.surface_mut().set_segments(
            question,
            vec![
                Segment::plain(before),
                Segment::marked(script.highlight.clone(), Mark::Highlight),
                Segment::plain(after),
            ],
        );
        stage.surface_mut().add_effect(question, Effect::Shake);
    }
    stage.wait(1000).await?;

    // 4. explanation and aside
    let explanation = text(stage, &script.explanation, Look::big().to_style());
    stage.surface_mut().show(explanation);
    stage.wait(800).await?;
    let aside = text(stage, &script.parenthesis, Style::default().dim());
    stage.surface_mut().show(aside);
    stage.surface_mut().add_effect(aside, Effect::FadeIn);
    stage.wait(1000).await?;

    // 5. acronym reveal
    let heading = text(
        stage,
        &script.reveal_heading,
        Look::accented(Size::Huge, Accent::Orange).to_style(),
    );
    stage.surface_mut().show(heading);
    stage.surface_mut().add_effect(heading, Effect::Thump);
    stage.wait(400).await?;
    stage.surface_mut().remove_effect(heading, Effect::Thump);
    stage.wait(300).await?;
    for (i, word) in script.words.iter().enumerate() {
        let id = text(stage, "", Look::big().to_style());
        match i {
            0 => {
                type_into(stage, id, word, Cadence::word(100)).await?;
                stage.surface_mut().add_effect(id, Effect::MicroShake);
            }
            2 => {
                type_into(stage, id, word, Cadence::word(120)).await?;
                stage.surface_mut().add_effect(id, Effect::HardShake);
                stage.surface_mut().add_effect(id, Effect::Glitch);
            }
            3 => {
                type_into(stage, id, word, Cadence::word(180)).await?;
                stage.surface_mut().add_effect(id, Effect::SlowZoom);
            }
            _ => {
                stage.surface_mut().set_text(id, word);
                stage.surface_mut().show(id);
                stage.wait(200).await?;
            }
        }
        stage.wait(400).await?;
    }
    stage.wait(1000).await?;

    // 6. reasons
    let title = text(stage, &script.reason_title, Look::big().to_style());
    stage.surface_mut().show(title);
    stage.wait(500).await?;
    for (i, reason) in script.reasons.iter().enumerate() {
        let id = text(stage, "", Style::fg(crate::types::ORANGE));
        match i {
            0 => {
                stage.surface_mut().set_text(id, reason);
                stage.surface_mut().show(id);
                stage.surface_mut().add_effect(id, Effect::BounceIn);
                stage.wait(1000).await?;
            }
            1 => {
                type_into(stage, id, reason, Cadence::word(40)).await?;
                stage.surface_mut().set_segments(id, bounce_emoji(reason));
                stage.surface_mut().add_effect(id, Effect::Bounce);
                spray(stage, 12, &['*', '•'], Duration::from_millis(1500));
            }
            2 => {
                stage.wait(1500).await?;
                stage.surface_mut().set_text(id, reason);
                stage.surface_mut().show(id);
            }
            _ => {
                stage.surface_mut().set_text(id, reason);
                stage.surface_mut().show(id);
            }
        }
        stage.wait(800).await?;
    }
    stage.wait(1500).await?;

    await_control(stage, &script.continue_label).await?;
    tracing::debug!("intro cut-scene");

    // Cut-scene
    stage.surface_mut().clear();
    stage.wait(500).await?;
    for line in &script.personal {
        let id = text(stage, "", Style::default());
        type_into(stage, id, line, Cadence::word(35)).await?;
        stage.wait(300).await?;
    }
    stage.wait(1200).await?;
    let tone = text(stage, &script.tone_shift, Look::big().to_style());
    stage.surface_mut().show(tone);
    stage.surface_mut().add_effect(tone, Effect::FadeInDry);
    stage.wait(2000).await?;
    if let Some(src) = &script.image {
        let image = stage.surface_mut().push(
            Kind::Image {
                src: src.clone(),
                alt: String::new(),
            },
            "",
            Style::default(),
        );
        stage.wait(500).await?;
        stage.surface_mut().show(image);
        stage.surface_mut().add_effect(image, Effect::FadeIn);
    }

    await_control(stage, &script.final_label).await?;
    tracing::info!("intro finished");
    Ok(())
}

fn text(stage: &mut Stage, content: &str, style: Style) -> ElementId {
    stage.surface_mut().push(Kind::Text, content, style)
}

fn highlight_at(question: &str, word: &str) -> Option<usize> {
    if word.is_empty() {
        return None;
    }
    question.find(word)
}

/// Show a single primary control and wait until it is activated. Every other
/// input is ignored.
async fn await_control(stage: &mut Stage, label: &str) -> Result<()> {
    let idx = stage
        .surface_mut()
        .push_control(Control::new(label, ControlAction::Advance).primary());
    stage.surface_mut().show_control(idx);
    stage.surface_mut().set_focus(idx);
    loop {
        match stage.next_input().await? {
            Input::Key(Key::Enter) => break,
            Input::Activate(i) if i == idx => break,
            other => tracing::trace!(?other, "intro input ignored"),
        }
    }
    stage.surface_mut().set_control_enabled(idx, false);
    Ok(())
}
