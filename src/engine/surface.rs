//! Surface: the retained render model scene renderers mutate.
//!
//! Renderers append elements, reveal them, attach effects and register
//! controls. The surface knows nothing about terminals; the rasterizer turns
//! it into cells.

use std::time::Duration;

use tokio::time::Instant;

use crate::types::{Color, Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Stack,
    Row,
    Grid { columns: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStatus {
    Loading,
    Failed,
    TimedOut,
}

impl PanelStatus {
    pub fn label(self) -> &'static str {
        match self {
            PanelStatus::Loading => "Loading...",
            PanelStatus::Failed => "\u{274c} Image not found",
            PanelStatus::TimedOut => "\u{23f1}\u{fe0f} Timed out",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    Text,
    Group(Layout),
    Panel {
        number: usize,
        tilt: f32,
        border: Option<Color>,
    },
    Image {
        src: String,
        alt: String,
    },
    Placeholder(PanelStatus),
    Embed {
        url: String,
    },
    Link {
        url: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    FadeIn,
    FadeInDry,
    BounceIn,
    Shake,
    MicroShake,
    HardShake,
    Glitch,
    Thump,
    SlowZoom,
    Bounce,
    Caret,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mark {
    #[default]
    Plain,
    Struck,
    Bounce,
    Highlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub mark: Mark,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Segment {
            text: text.into(),
            mark: Mark::Plain,
        }
    }

    pub fn marked(text: impl Into<String>, mark: Mark) -> Self {
        Segment {
            text: text.into(),
            mark,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: Kind,
    pub segments: Vec<Segment>,
    pub style: Style,
    pub visible: bool,
    pub effects: Vec<Effect>,
    pub parent: Option<ElementId>,
}

impl Element {
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn has_effect(&self, effect: Effect) -> bool {
        self.effects.contains(&effect)
    }
}

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// Index into the scene's declared `buttons`.
    Choice(usize),
    /// Renderer-provided continue control (video, tally).
    Advance,
    /// Tally increment.
    Add(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub label: String,
    pub primary: bool,
    pub enabled: bool,
    pub visible: bool,
    pub action: ControlAction,
}

impl Control {
    pub fn new(label: impl Into<String>, action: ControlAction) -> Self {
        Control {
            label: label.into(),
            primary: false,
            enabled: true,
            visible: false,
            action,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputField {
    pub placeholder: String,
    pub value: String,
    pub visible: bool,
    pub focused: bool,
    /// Set when a submit was refused for being too short.
    pub rejected: bool,
}

// ---------------------------------------------------------------------------
// Particle bursts (confetti, falling tally items)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Piece {
    /// Horizontal position as a fraction of the surface width.
    pub column: f32,
    pub glyph: char,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Burst {
    pub pieces: Vec<Piece>,
    pub born: Instant,
    pub ttl: Duration,
}

impl Burst {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.born)
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Surface {
    elements: Vec<Element>,
    controls: Vec<Control>,
    focus: Option<usize>,
    input: Option<InputField>,
    bursts: Vec<Burst>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all content, controls, the input field and pending bursts.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.controls.clear();
        self.focus = None;
        self.input = None;
        self.bursts.clear();
    }

    // -----------------------------------------------------------------------
    // Elements
    // -----------------------------------------------------------------------

    /// Append a hidden top-level element.
    pub fn push(&mut self, kind: Kind, text: &str, style: Style) -> ElementId {
        self.insert(kind, text, style, None)
    }

    /// Append a hidden element inside `parent`.
    pub fn push_in(&mut self, parent: ElementId, kind: Kind, text: &str, style: Style) -> ElementId {
        self.insert(kind, text, style, Some(parent))
    }

    fn insert(&mut self, kind: Kind, text: &str, style: Style, parent: Option<ElementId>) -> ElementId {
        let segments = if text.is_empty() {
            Vec::new()
        } else {
            vec![Segment::plain(text)]
        };
        self.elements.push(Element {
            kind,
            segments,
            style,
            visible: false,
            effects: Vec::new(),
            parent,
        });
        ElementId(self.elements.len() - 1)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn top_level(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.parent.is_none())
            .map(|(i, e)| (ElementId(i), e))
    }

    pub fn children(&self, parent: ElementId) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.parent == Some(parent))
            .map(|(i, e)| (ElementId(i), e))
    }

    pub fn show(&mut self, id: ElementId) {
        if let Some(el) = self.get_mut(id) {
            el.visible = true;
        }
    }

    pub fn set_text(&mut self, id: ElementId, text: &str) {
        self.set_segments(id, vec![Segment::plain(text)]);
    }

    pub fn set_segments(&mut self, id: ElementId, segments: Vec<Segment>) {
        if let Some(el) = self.get_mut(id) {
            el.segments = segments;
        }
    }

    pub fn push_segment(&mut self, id: ElementId, segment: Segment) {
        if let Some(el) = self.get_mut(id) {
            el.segments.push(segment);
        }
    }

    /// Append one character to the last plain segment (typewriter).
    pub fn push_char(&mut self, id: ElementId, ch: char) {
        if let Some(el) = self.get_mut(id) {
            match el.segments.last_mut() {
                Some(seg) if seg.mark == Mark::Plain => seg.text.push(ch),
                _ => el.segments.push(Segment::plain(ch.to_string())),
            }
        }
    }

    pub fn set_kind(&mut self, id: ElementId, kind: Kind) {
        if let Some(el) = self.get_mut(id) {
            el.kind = kind;
        }
    }

    pub fn set_style(&mut self, id: ElementId, style: Style) {
        if let Some(el) = self.get_mut(id) {
            el.style = style;
        }
    }

    pub fn add_effect(&mut self, id: ElementId, effect: Effect) {
        if let Some(el) = self.get_mut(id) {
            if !el.effects.contains(&effect) {
                el.effects.push(effect);
            }
        }
    }

    pub fn remove_effect(&mut self, id: ElementId, effect: Effect) {
        if let Some(el) = self.get_mut(id) {
            el.effects.retain(|e| *e != effect);
        }
    }

    /// Elements of the given kind discriminant, in insertion order.
    pub fn placeholders(&self) -> impl Iterator<Item = PanelStatus> + '_ {
        self.elements.iter().filter_map(|e| match e.kind {
            Kind::Placeholder(status) => Some(status),
            _ => None,
        })
    }

    // -----------------------------------------------------------------------
    // Controls
    // -----------------------------------------------------------------------

    pub fn push_control(&mut self, control: Control) -> usize {
        self.controls.push(control);
        self.controls.len() - 1
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn control(&self, index: usize) -> Option<&Control> {
        self.controls.get(index)
    }

    pub fn show_control(&mut self, index: usize) {
        if let Some(c) = self.controls.get_mut(index) {
            c.visible = true;
        }
        if self.focus.is_none() {
            self.focus = Some(index);
        }
    }

    pub fn set_control_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(c) = self.controls.get_mut(index) {
            c.enabled = enabled;
        }
    }

    /// Disable every control in one step.
    pub fn disable_controls(&mut self) {
        for c in &mut self.controls {
            c.enabled = false;
        }
    }

    pub fn enable_controls(&mut self) {
        for c in &mut self.controls {
            c.enabled = true;
        }
    }

    /// The scene's declared choices currently on the surface.
    pub fn choices(&self) -> impl Iterator<Item = &Control> {
        self.controls
            .iter()
            .filter(|c| matches!(c.action, ControlAction::Choice(_)))
    }

    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn set_focus(&mut self, index: usize) {
        if index < self.controls.len() {
            self.focus = Some(index);
        }
    }

    /// Move focus to the next (or previous) visible, enabled control.
    pub fn cycle_focus(&mut self, forward: bool) {
        let n = self.controls.len();
        if n == 0 {
            return;
        }
        let start = self.focus.unwrap_or(if forward { n - 1 } else { 0 });
        for step in 1..=n {
            let i = if forward {
                (start + step) % n
            } else {
                (start + n - step % n) % n
            };
            let c = &self.controls[i];
            if c.visible && c.enabled {
                self.focus = Some(i);
                return;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Input field
    // -----------------------------------------------------------------------

    pub fn set_input(&mut self, field: InputField) {
        self.input = Some(field);
    }

    pub fn input(&self) -> Option<&InputField> {
        self.input.as_ref()
    }

    pub fn input_mut(&mut self) -> Option<&mut InputField> {
        self.input.as_mut()
    }

    // -----------------------------------------------------------------------
    // Bursts
    // -----------------------------------------------------------------------

    pub fn burst(&mut self, burst: Burst) {
        self.bursts.push(burst);
    }

    pub fn bursts(&self) -> &[Burst] {
        &self.bursts
    }

    /// Drop bursts whose animation has finished.
    pub fn prune(&mut self, now: Instant) {
        self.bursts.retain(|b| b.age(now) < b.ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_with_controls(n: usize) -> Surface {
        let mut s = Surface::new();
        for i in 0..n {
            let idx = s.push_control(Control::new(format!("c{i}"), ControlAction::Choice(i)));
            s.show_control(idx);
        }
        s
    }

    #[test]
    fn typewriter_chars_extend_the_plain_tail() {
        let mut s = Surface::new();
        let id = s.push(Kind::Text, "", Style::default());
        s.push_char(id, 'h');
        s.push_char(id, 'i');
        s.push_segment(id, Segment::marked("!", Mark::Bounce));
        s.push_char(id, '?');
        let el = s.get(id).unwrap();
        assert_eq!(el.text(), "hi!?");
        assert_eq!(el.segments.len(), 3);
    }

    #[test]
    fn first_shown_control_takes_focus() {
        let s = surface_with_controls(3);
        assert_eq!(s.focus(), Some(0));
    }

    #[test]
    fn focus_cycles_over_enabled_controls() {
        let mut s = surface_with_controls(3);
        s.set_control_enabled(1, false);
        s.cycle_focus(true);
        assert_eq!(s.focus(), Some(2));
        s.cycle_focus(true);
        assert_eq!(s.focus(), Some(0));
        s.cycle_focus(false);
        assert_eq!(s.focus(), Some(2));
    }

    #[test]
    fn disable_controls_is_total() {
        let mut s = surface_with_controls(4);
        s.disable_controls();
        assert!(s.controls().iter().all(|c| !c.enabled));
    }

    #[test]
    fn clear_drops_everything() {
        let mut s = surface_with_controls(2);
        s.push(Kind::Text, "x", Style::default());
        s.set_input(InputField {
            placeholder: String::new(),
            value: "abc".into(),
            visible: true,
            focused: true,
            rejected: false,
        });
        s.clear();
        assert!(s.elements().is_empty());
        assert!(s.controls().is_empty());
        assert!(s.input().is_none());
        assert_eq!(s.focus(), None);
    }
}
