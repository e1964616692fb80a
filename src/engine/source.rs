//! Story source types: the authored content format.
//!
//! These types define *what is told* and *in which order*, not how it is
//! drawn. Content is validated once at load and never mutated afterwards.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoryError};
use crate::types::{Accent, Look, Size};

use super::intro::IntroScript;

// Re-export scene payloads so they remain accessible via `engine::source::*`.
pub use super::scenes::{
    CelebrationScene, ComicScene, DualListScene, ImageScene, InputScene, ListItem, ListScene,
    QuoteScene, TallyScene, TextScene, TitleScene, VideoScene,
};

/// Sentinel id every first chapter depends on; completed by the intro.
pub const ENTRY: &str = "start";

pub static BUILTIN_STORY: &str = include_str!("../../content/story.json");

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub title: String,
    #[serde(default = "default_entry")]
    pub entry: String,
    pub final_chapter: String,
    #[serde(default)]
    pub intro: IntroScript,
    pub chapters: Vec<Chapter>,
}

fn default_entry() -> String {
    ENTRY.to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    #[default]
    Main,
    Bonus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub name: String,
    /// Single prerequisite; `None` means the entry sentinel.
    #[serde(default)]
    pub requires: Option<String>,
    #[serde(default)]
    pub route: Route,
    pub scenes: Vec<Scene>,
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

pub const DEFAULT_PAUSE_BEFORE: u64 = 400;
pub const DEFAULT_PAUSE_AFTER: u64 = 600;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default)]
    pub pause_before: Option<u64>,
    #[serde(default)]
    pub pause_after: Option<u64>,
    #[serde(default)]
    pub buttons: Vec<Choice>,
    #[serde(flatten)]
    pub body: SceneBody,
}

impl Scene {
    pub fn pause_before(&self) -> u64 {
        self.pause_before.unwrap_or(DEFAULT_PAUSE_BEFORE)
    }

    pub fn pause_after(&self) -> u64 {
        self.pause_after.unwrap_or(DEFAULT_PAUSE_AFTER)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SceneBody {
    Title(TitleScene),
    Text(TextScene),
    Quote(QuoteScene),
    List(ListScene),
    DualList(DualListScene),
    Input(InputScene),
    Image(ImageScene),
    Comic(ComicScene),
    Video(VideoScene),
    PuddingGame(TallyScene),
    Celebration(CelebrationScene),
}

impl SceneBody {
    pub fn kind(&self) -> &'static str {
        match self {
            SceneBody::Title(_) => "title",
            SceneBody::Text(_) => "text",
            SceneBody::Quote(_) => "quote",
            SceneBody::List(_) => "list",
            SceneBody::DualList(_) => "dual_list",
            SceneBody::Input(_) => "input",
            SceneBody::Image(_) => "image",
            SceneBody::Comic(_) => "comic",
            SceneBody::Video(_) => "video",
            SceneBody::PuddingGame(_) => "pudding_game",
            SceneBody::Celebration(_) => "celebration",
        }
    }
}

// ---------------------------------------------------------------------------
// Choices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceAction {
    Next,
    End,
    Map,
    Submit,
    Skip,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(rename = "text")]
    pub label: String,
    #[serde(default = "missing_action", deserialize_with = "deserialize_action_lenient")]
    pub action: ChoiceAction,
    #[serde(default)]
    pub primary: bool,
}

fn missing_action() -> ChoiceAction {
    tracing::warn!("choice without action, treating as `next`");
    ChoiceAction::Next
}

/// Accepts any action string; unknown names (and `null`) fall back to `next`.
fn deserialize_action_lenient<'de, D>(d: D) -> std::result::Result<ChoiceAction, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{Error, Visitor};

    struct ActionVisitor;

    impl<'de> Visitor<'de> for ActionVisitor {
        type Value = ChoiceAction;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a choice action name")
        }

        fn visit_str<E: Error>(self, v: &str) -> std::result::Result<ChoiceAction, E> {
            Ok(match v {
                "next" => ChoiceAction::Next,
                "end" => ChoiceAction::End,
                "map" => ChoiceAction::Map,
                "submit" => ChoiceAction::Submit,
                "skip" => ChoiceAction::Skip,
                other => {
                    tracing::warn!(action = other, "unknown choice action, treating as `next`");
                    ChoiceAction::Next
                }
            })
        }

        fn visit_unit<E: Error>(self) -> std::result::Result<ChoiceAction, E> {
            Ok(missing_action())
        }

        fn visit_none<E: Error>(self) -> std::result::Result<ChoiceAction, E> {
            Ok(missing_action())
        }
    }

    d.deserialize_any(ActionVisitor)
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

pub const DEFAULT_TYPE_SPEED: u64 = 45;
pub const DEFAULT_TYPE_VARIANCE: u64 = 20;
pub const DEFAULT_LINE_PAUSE: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    Instant,
    Typewriter { speed: u64, variance: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub struck: String,
    pub corrected: String,
}

/// One authored line of text with its closed style set and reveal mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawLine")]
pub struct Line {
    pub text: String,
    pub look: Look,
    pub reveal: Reveal,
    pub shake: bool,
    pub emoji_bounce: bool,
    /// Wait before the line appears.
    pub pause_before: u64,
    pub pause_after: u64,
    pub correction: Option<Correction>,
}

impl Line {
    pub fn typed(text: impl Into<String>) -> Self {
        Line {
            text: text.into(),
            look: Look::default(),
            reveal: Reveal::Typewriter {
                speed: DEFAULT_TYPE_SPEED,
                variance: DEFAULT_TYPE_VARIANCE,
            },
            shake: false,
            emoji_bounce: false,
            pause_before: 0,
            pause_after: DEFAULT_LINE_PAUSE,
            correction: None,
        }
    }
}

/// Flag-based authoring shape, normalised into `Line`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLine {
    text: String,
    #[serde(default)]
    instant: bool,
    speed: Option<u64>,
    variance: Option<u64>,
    #[serde(default)]
    shake: bool,
    #[serde(default)]
    emoji_bounce: bool,
    #[serde(default)]
    delay: u64,
    pause_after: Option<u64>,
    #[serde(default)]
    small: bool,
    #[serde(default)]
    big: bool,
    #[serde(default)]
    huge: bool,
    #[serde(default)]
    red: bool,
    #[serde(default)]
    green: bool,
    #[serde(default)]
    gold: bool,
    #[serde(default)]
    orange: bool,
    #[serde(default)]
    glow: bool,
    #[serde(default)]
    bold: bool,
    strikethrough: Option<String>,
    corrected: Option<String>,
}

impl TryFrom<RawLine> for Line {
    type Error = String;

    fn try_from(raw: RawLine) -> std::result::Result<Self, String> {
        let sizes: Vec<Size> = [
            (raw.small, Size::Small),
            (raw.big, Size::Big),
            (raw.huge, Size::Huge),
        ]
        .into_iter()
        .filter_map(|(set, size)| set.then_some(size))
        .collect();
        if sizes.len() > 1 {
            return Err(format!("line {:?} sets more than one size flag", raw.text));
        }

        let accents: Vec<Accent> = [
            (raw.red, Accent::Red),
            (raw.green, Accent::Green),
            (raw.gold, Accent::Gold),
            (raw.orange, Accent::Orange),
        ]
        .into_iter()
        .filter_map(|(set, accent)| set.then_some(accent))
        .collect();
        if accents.len() > 1 {
            return Err(format!("line {:?} sets more than one color flag", raw.text));
        }

        let correction = match (raw.strikethrough, raw.corrected) {
            (None, None) => None,
            (Some(struck), Some(corrected)) => {
                if struck.is_empty() || !raw.text.contains(&struck) {
                    return Err(format!(
                        "line {:?}: strikethrough {struck:?} does not occur in the text",
                        raw.text
                    ));
                }
                Some(Correction { struck, corrected })
            }
            _ => {
                return Err(format!(
                    "line {:?}: strikethrough and corrected must be given together",
                    raw.text
                ));
            }
        };

        let reveal = if raw.instant {
            Reveal::Instant
        } else {
            Reveal::Typewriter {
                speed: raw.speed.unwrap_or(DEFAULT_TYPE_SPEED),
                variance: raw.variance.unwrap_or(DEFAULT_TYPE_VARIANCE),
            }
        };

        Ok(Line {
            text: raw.text,
            look: Look {
                size: sizes.first().copied().unwrap_or_default(),
                accent: accents.first().copied(),
                glow: raw.glow,
                bold: raw.bold,
            },
            reveal,
            shake: raw.shake,
            emoji_bounce: raw.emoji_bounce,
            pause_before: raw.delay,
            pause_after: raw.pause_after.unwrap_or(DEFAULT_LINE_PAUSE),
            correction,
        })
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl Story {
    /// The story embedded in the binary.
    pub fn builtin() -> Result<Story> {
        Story::from_json(BUILTIN_STORY)
    }

    pub fn from_json(json: &str) -> Result<Story> {
        let story: Story = serde_json::from_str(json)?;
        story.validate()?;
        Ok(story)
    }

    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn requires_of<'a>(&'a self, chapter: &'a Chapter) -> &'a str {
        chapter.requires.as_deref().unwrap_or(&self.entry)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for chapter in &self.chapters {
            if chapter.id == self.entry {
                return Err(content(format!("chapter id `{}` collides with the entry id", chapter.id)));
            }
            if !seen.insert(chapter.id.as_str()) {
                return Err(content(format!("duplicate chapter id `{}`", chapter.id)));
            }
            if chapter.scenes.is_empty() {
                return Err(content(format!("chapter `{}` has no scenes", chapter.id)));
            }
        }

        let prereq: HashMap<&str, &str> = self
            .chapters
            .iter()
            .map(|c| (c.id.as_str(), self.requires_of(c)))
            .collect();

        for chapter in &self.chapters {
            let req = self.requires_of(chapter);
            if req != self.entry && !prereq.contains_key(req) {
                return Err(content(format!(
                    "chapter `{}` requires unknown chapter `{req}`",
                    chapter.id
                )));
            }
        }

        for chapter in &self.chapters {
            // Walk the prerequisite chain; revisiting a node means a cycle.
            let mut visited = HashSet::new();
            let mut cursor = chapter.id.as_str();
            while cursor != self.entry {
                if !visited.insert(cursor) {
                    return Err(content(format!(
                        "prerequisite cycle through chapter `{}`",
                        chapter.id
                    )));
                }
                cursor = prereq[cursor];
            }

            for (index, scene) in chapter.scenes.iter().enumerate() {
                check_scene(scene).map_err(|msg| {
                    content(format!("chapter `{}` scene {index}: {msg}", chapter.id))
                })?;
            }
        }

        if !prereq.contains_key(self.final_chapter.as_str()) {
            return Err(content(format!(
                "final chapter `{}` does not exist",
                self.final_chapter
            )));
        }
        Ok(())
    }
}

fn check_scene(scene: &Scene) -> std::result::Result<(), String> {
    match &scene.body {
        SceneBody::Comic(comic) if comic.images.is_empty() => {
            Err("comic needs at least one image".into())
        }
        SceneBody::PuddingGame(tally) if tally.target == 0 => {
            Err("pudding_game target must be positive".into())
        }
        SceneBody::Input(_) if !scene.buttons.iter().any(|b| b.action == ChoiceAction::Submit) => {
            tracing::warn!("input scene without a submit choice");
            Ok(())
        }
        _ => Ok(()),
    }
}

fn content(msg: String) -> StoryError {
    StoryError::Content(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story_json(chapters: &str) -> String {
        format!(r#"{{"title":"t","finalChapter":"a","chapters":{chapters}}}"#)
    }

    const TEXT_SCENE: &str = r#"{"type":"text","lines":[{"text":"hi"}]}"#;

    #[test]
    fn builtin_story_loads() {
        let story = Story::builtin().unwrap();
        assert_eq!(story.entry, ENTRY);
        assert!(story.chapter(&story.final_chapter).is_some());
    }

    #[test]
    fn line_flags_become_a_look() {
        let line: Line = serde_json::from_str(
            r#"{"text":"POWER","big":true,"gold":true,"glow":true,"speed":55}"#,
        )
        .unwrap();
        assert_eq!(line.look.size, Size::Big);
        assert_eq!(line.look.accent, Some(Accent::Gold));
        assert!(line.look.glow);
        assert_eq!(line.reveal, Reveal::Typewriter { speed: 55, variance: 20 });
        assert_eq!(line.pause_after, DEFAULT_LINE_PAUSE);
    }

    #[test]
    fn conflicting_flags_fail_to_load() {
        let sizes = serde_json::from_str::<Line>(r#"{"text":"x","big":true,"huge":true}"#);
        assert!(sizes.is_err());
        let colors = serde_json::from_str::<Line>(r#"{"text":"x","red":true,"green":true}"#);
        assert!(colors.is_err());
        let half = serde_json::from_str::<Line>(r#"{"text":"Motice","strikethrough":"ce"}"#);
        assert!(half.is_err());
    }

    #[test]
    fn explicit_zero_pause_is_kept() {
        let line: Line = serde_json::from_str(r#"{"text":"x","pauseAfter":0}"#).unwrap();
        assert_eq!(line.pause_after, 0);
        let scene: Scene =
            serde_json::from_str(r#"{"type":"text","pauseBefore":0,"lines":[]}"#).unwrap();
        assert_eq!(scene.pause_before(), 0);
        assert_eq!(scene.pause_after(), DEFAULT_PAUSE_AFTER);
    }

    #[test]
    fn unknown_or_missing_action_means_next() {
        let weird: Choice = serde_json::from_str(r#"{"text":"?","action":"dance"}"#).unwrap();
        assert_eq!(weird.action, ChoiceAction::Next);
        let absent: Choice = serde_json::from_str(r#"{"text":"?"}"#).unwrap();
        assert_eq!(absent.action, ChoiceAction::Next);
        let null: Choice = serde_json::from_str(r#"{"text":"?","action":null}"#).unwrap();
        assert_eq!(null.action, ChoiceAction::Next);
        let end: Choice = serde_json::from_str(r#"{"text":"!","action":"end"}"#).unwrap();
        assert_eq!(end.action, ChoiceAction::End);
    }

    #[test]
    fn cyclic_prerequisites_fail_to_load() {
        let json = story_json(&format!(
            r#"[{{"id":"a","name":"A","requires":"b","scenes":[{TEXT_SCENE}]}},
                {{"id":"b","name":"B","requires":"a","scenes":[{TEXT_SCENE}]}}]"#
        ));
        let err = Story::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("cycle"), "{err}");
    }

    #[test]
    fn unknown_prerequisite_fails_to_load() {
        let json = story_json(&format!(
            r#"[{{"id":"a","name":"A","requires":"ghost","scenes":[{TEXT_SCENE}]}}]"#
        ));
        assert!(Story::from_json(&json).is_err());
    }

    #[test]
    fn empty_comic_is_rejected_with_context() {
        let json = story_json(
            r#"[{"id":"a","name":"A","scenes":[{"type":"comic","images":[]}]}]"#,
        );
        let err = Story::from_json(&json).unwrap_err().to_string();
        assert!(err.contains("chapter `a` scene 0"), "{err}");
    }
}
