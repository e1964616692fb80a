//! Engine: the scene player.
//!
//! Owns the current chapter and scene index, sequences every scene through
//! pause → render → pause → choices, and turns user activations into the next
//! step of the story. It never deals with terminals; everything it shows goes
//! through the `Stage`.

pub mod delay;
pub mod intro;
pub mod media;
pub mod rng;
pub mod scenes;
pub mod screens;
pub mod source;
pub mod stage;
pub mod surface;
pub mod typewriter;

use std::cell::Cell;
use std::rc::Rc;

use crate::error::{Result, StoryError};
use crate::progress::Progress;
use crate::progress::unlocks::{NodeStatus, UnlockGraph};

use scenes::{Gate, Render, confetti};
use source::{ChoiceAction, Scene, Story};
use stage::{Input, Key, Screen, Stage};
use surface::{Control, ControlAction};

const CHOICE_STAGGER_MS: u64 = 100;
const RESUME_SETTLE_MS: u64 = 300;
const FINALE_MS: u64 = 1500;

/// What the caller should expect after an engine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Still on the same screen, waiting for input.
    Continue,
    /// A submit was refused; the field is flagged and controls are live again.
    InputRejected,
    /// The chapter view was left for the map.
    Map,
    /// The final chapter finished; the program should exit.
    Exit,
}

// ---------------------------------------------------------------------------
// Playback latch
// ---------------------------------------------------------------------------

/// At most one scene playback may be in flight. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct PlaybackLatch(Rc<Cell<bool>>);

impl PlaybackLatch {
    pub fn try_acquire(&self) -> Option<LatchGuard> {
        if self.0.replace(true) {
            return None;
        }
        Some(LatchGuard(Rc::clone(&self.0)))
    }

    pub fn is_held(&self) -> bool {
        self.0.get()
    }
}

/// Releases the latch on drop, including on early return or error.
#[derive(Debug)]
pub struct LatchGuard(Rc<Cell<bool>>);

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// ---------------------------------------------------------------------------
// Story engine
// ---------------------------------------------------------------------------

pub struct StoryEngine {
    story: Rc<Story>,
    graph: UnlockGraph,
    progress: Progress,
    stage: Stage,
    latch: PlaybackLatch,
    gate: Option<Gate>,
    submitted: Option<String>,
}

impl StoryEngine {
    pub fn new(story: Story, stage: Stage, progress: Progress) -> Self {
        let graph = UnlockGraph::from_story(&story);
        let mut engine = StoryEngine {
            story: Rc::new(story),
            graph,
            progress,
            stage,
            latch: PlaybackLatch::default(),
            gate: None,
            submitted: None,
        };
        engine.recompute_availability();
        engine
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn graph(&self) -> &UnlockGraph {
        &self.graph
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn latch(&self) -> &PlaybackLatch {
        &self.latch
    }

    pub fn gate(&self) -> Option<&Gate> {
        self.gate.as_ref()
    }

    /// The last accepted input-scene answer.
    pub fn submitted(&self) -> Option<&str> {
        self.submitted.as_deref()
    }

    pub fn screen(&self) -> Screen {
        self.stage.pres.screen.active
    }

    pub fn position(&self) -> (&str, usize) {
        let state = self.progress.state();
        (&state.current_location, state.current_scene)
    }

    pub fn is_available(&self, id: &str) -> bool {
        self.graph.is_available(id, self.progress.completed())
    }

    fn current_scene(&self) -> Option<&Scene> {
        let (id, index) = self.position();
        self.story.chapter(id)?.scenes.get(index)
    }

    // -----------------------------------------------------------------------
    // Intro & map
    // -----------------------------------------------------------------------

    /// Play the intro, mark the entry completed and cross-fade to the map.
    pub async fn play_intro(&mut self) -> Result<()> {
        screens::show_instant(&mut self.stage, Screen::Intro);
        let story = Rc::clone(&self.story);
        intro::play_intro(&mut self.stage, &story.intro).await?;
        if self.progress.complete(&story.entry) {
            tracing::info!(entry = %story.entry, "entry completed");
        }
        self.recompute_availability();
        self.stage.surface_mut().clear();
        screens::cross_fade(&mut self.stage, Screen::Map).await
    }

    pub fn show_map(&mut self) {
        self.recompute_availability();
        screens::show_instant(&mut self.stage, Screen::Map);
    }

    /// Refresh map node statuses and quick navigation. Never touches completion.
    pub fn recompute_availability(&mut self) {
        self.stage
            .pres
            .map
            .refresh(&self.story, &self.graph, self.progress.completed());
    }

    /// Wipe progress and replay the intro.
    pub async fn restart(&mut self) -> Result<()> {
        tracing::info!("restart requested");
        self.release_gate();
        self.submitted = None;
        self.progress.reset();
        self.stage.surface_mut().clear();
        self.stage.drain_inputs();
        self.play_intro().await
    }

    /// Map keys: move the selection, enter it, or jump via quick navigation.
    pub async fn handle_map_input(&mut self, input: Input) -> Result<Flow> {
        let map = &mut self.stage.pres.map;
        map.notice = None;
        let target = match input {
            Input::Key(Key::Left | Key::Up | Key::BackTab) => {
                map.select_prev();
                None
            }
            Input::Key(Key::Right | Key::Down | Key::Tab) => {
                map.select_next();
                None
            }
            Input::Key(Key::Enter) => map.selected_node().map(|n| n.id.clone()),
            Input::Activate(i) => map.nodes.get(i).map(|n| n.id.clone()),
            Input::Key(Key::Char('n')) => map.quick.main.clone(),
            Input::Key(Key::Char('b')) => map.quick.bonus.clone(),
            _ => None,
        };
        let Some(id) = target else {
            self.stage.commit();
            return Ok(Flow::Continue);
        };

        map.select(&id);
        match self.graph.status(&id, self.progress.completed()) {
            NodeStatus::Locked => {
                let needs = self
                    .story
                    .chapter(&id)
                    .map(|c| self.story.requires_of(c).to_string())
                    .unwrap_or_default();
                let needs_name = self
                    .story
                    .chapter(&needs)
                    .map(|c| c.name.clone())
                    .unwrap_or(needs);
                tracing::debug!(chapter = %id, "locked chapter selected");
                self.stage.pres.map.notice = Some(format!("Locked: finish {needs_name} first"));
                self.stage.commit();
                Ok(Flow::Continue)
            }
            NodeStatus::Completed => {
                let name = self.story.chapter(&id).map(|c| c.name.clone()).unwrap_or(id);
                self.stage.pres.map.notice = Some(format!("Already visited: {name}"));
                self.stage.commit();
                Ok(Flow::Continue)
            }
            NodeStatus::Available => self.start_chapter(&id).await,
        }
    }

    // -----------------------------------------------------------------------
    // Chapters
    // -----------------------------------------------------------------------

    pub async fn start_chapter(&mut self, id: &str) -> Result<Flow> {
        if self.story.chapter(id).is_none() {
            return Err(StoryError::UnknownChapter(id.to_string()));
        }
        tracing::info!(chapter = id, "chapter started");
        self.release_gate();
        self.progress.set_position(id, 0);
        self.stage.surface_mut().clear();
        screens::cross_fade(&mut self.stage, Screen::Chapter).await?;
        self.play_scene().await
    }

    /// Re-enter a chapter at `index` without the entry transition. The scene
    /// always starts fresh.
    pub async fn resume_chapter(&mut self, id: &str, index: usize) -> Result<Flow> {
        if self.story.chapter(id).is_none() {
            return Err(StoryError::UnknownChapter(id.to_string()));
        }
        tracing::info!(chapter = id, scene = index, "chapter resumed");
        self.release_gate();
        self.progress.set_position(id, index);
        self.stage.surface_mut().clear();
        screens::show_instant(&mut self.stage, Screen::Chapter);
        self.stage.wait(RESUME_SETTLE_MS).await?;
        self.play_scene().await
    }

    /// Play the scene at the current position. A call made while another
    /// playback is in flight does nothing.
    pub async fn play_scene(&mut self) -> Result<Flow> {
        let Some(_guard) = self.latch.try_acquire() else {
            tracing::debug!("scene playback already in flight, ignoring");
            return Ok(Flow::Continue);
        };

        let story = Rc::clone(&self.story);
        let (id, index) = {
            let (id, index) = self.position();
            (id.to_string(), index)
        };
        let chapter = story.chapter(&id).ok_or(StoryError::NoChapter)?;
        let Some(scene) = chapter.scenes.get(index) else {
            return self.end_chapter().await;
        };
        tracing::debug!(chapter = %id, scene = index, kind = scene.body.kind(), "playing scene");

        self.progress.set_position(&id, index);
        self.stage.surface_mut().clear();
        self.release_gate();

        self.stage.wait(scene.pause_before()).await?;
        let gate = scene.body.render(&mut self.stage).await?;
        self.gate = Some(gate);
        self.stage.wait(scene.pause_after()).await?;
        self.show_choices(scene).await?;
        Ok(Flow::Continue)
    }

    async fn show_choices(&mut self, scene: &Scene) -> Result<()> {
        let mut first = None;
        for (i, choice) in scene.buttons.iter().enumerate() {
            if i > 0 {
                self.stage.wait(CHOICE_STAGGER_MS).await?;
            }
            let mut control = Control::new(choice.label.clone(), ControlAction::Choice(i));
            control.primary = choice.primary;
            let idx = self.stage.surface_mut().push_control(control);
            self.stage.surface_mut().show_control(idx);
            first.get_or_insert(idx);
        }
        if let Some(idx) = first {
            self.stage.surface_mut().set_focus(idx);
        }
        self.stage.commit();
        Ok(())
    }

    /// Route one input on the chapter screen.
    pub async fn handle_input(&mut self, input: Input) -> Result<Flow> {
        match input {
            Input::Activate(index) => self.handle_button_click(index).await,
            Input::Key(key) => self.handle_key(key).await,
            Input::Restart => {
                self.restart().await?;
                Ok(Flow::Map)
            }
        }
    }

    async fn handle_key(&mut self, key: Key) -> Result<Flow> {
        if let Some(Gate::Tally(tally)) = &mut self.gate {
            if !tally.is_done() {
                match key {
                    Key::Char(' ') => {
                        tally.add(&mut self.stage, 1).await?;
                        return Ok(Flow::Continue);
                    }
                    Key::Enter => {
                        tally.add(&mut self.stage, 10).await?;
                        return Ok(Flow::Continue);
                    }
                    _ => {}
                }
            }
        }

        let surface = self.stage.surface_mut();
        match key {
            Key::Left | Key::Up | Key::BackTab => surface.cycle_focus(false),
            Key::Right | Key::Down | Key::Tab => surface.cycle_focus(true),
            Key::Enter => {
                if let Some(focus) = surface.focus() {
                    return self.handle_button_click(focus).await;
                }
            }
            Key::Char(ch) => {
                if let Some(field) = surface.input_mut().filter(|f| f.visible && f.focused) {
                    field.value.push(ch);
                    field.rejected = false;
                }
            }
            Key::Backspace => {
                if let Some(field) = surface.input_mut().filter(|f| f.visible && f.focused) {
                    field.value.pop();
                }
            }
        }
        self.stage.commit();
        Ok(Flow::Continue)
    }

    /// Act on the control at `index`. Disabled or unknown controls are ignored.
    pub async fn handle_button_click(&mut self, index: usize) -> Result<Flow> {
        let Some(control) = self.stage.surface().control(index).cloned() else {
            return Ok(Flow::Continue);
        };
        if !control.enabled || !control.visible {
            tracing::debug!(index, "inactive control ignored");
            return Ok(Flow::Continue);
        }

        let action = match control.action {
            ControlAction::Add(amount) => {
                if let Some(Gate::Tally(tally)) = &mut self.gate {
                    tally.add(&mut self.stage, amount).await?;
                }
                return Ok(Flow::Continue);
            }
            ControlAction::Advance => ChoiceAction::Next,
            ControlAction::Choice(i) => self
                .current_scene()
                .and_then(|s| s.buttons.get(i))
                .map(|b| b.action)
                .unwrap_or(ChoiceAction::Next),
        };

        self.stage.surface_mut().disable_controls();
        self.stage.commit();
        tracing::debug!(?action, label = %control.label, "choice activated");

        match action {
            ChoiceAction::Next => {
                let (id, index) = self.position();
                let id = id.to_string();
                self.progress.set_position(&id, index + 1);
                self.play_scene().await
            }
            ChoiceAction::End => self.end_chapter().await,
            ChoiceAction::Map | ChoiceAction::Skip => self.return_to_map().await,
            ChoiceAction::Submit => self.submit().await,
        }
    }

    async fn submit(&mut self) -> Result<Flow> {
        let Some(Gate::Input { min_length }) = self.gate else {
            tracing::warn!("submit outside an input scene, ending chapter");
            return self.end_chapter().await;
        };
        let value = self
            .stage
            .surface()
            .input()
            .map(|f| f.value.clone())
            .unwrap_or_default();
        let typed = value.chars().count();

        if typed < min_length {
            tracing::debug!(len = typed, min_length, "submit rejected");
            let surface = self.stage.surface_mut();
            surface.enable_controls();
            if let Some(field) = surface.input_mut() {
                field.rejected = true;
                field.focused = true;
            }
            self.stage.commit();
            return Ok(Flow::InputRejected);
        }

        tracing::info!(chars = typed, "input submitted");
        self.submitted = Some(value.trim().to_string());
        self.end_chapter().await
    }

    /// Complete the current chapter (idempotent) and leave it.
    pub async fn end_chapter(&mut self) -> Result<Flow> {
        let id = self.position().0.to_string();
        if self.progress.complete(&id) {
            tracing::info!(chapter = %id, "chapter completed");
        }
        self.release_gate();
        self.recompute_availability();

        if id == self.story.final_chapter {
            tracing::info!("final chapter finished");
            confetti(&mut self.stage);
            self.stage.wait(FINALE_MS).await?;
            return Ok(Flow::Exit);
        }
        self.return_to_map().await
    }

    /// Leave the chapter view without recording completion.
    pub async fn return_to_map(&mut self) -> Result<Flow> {
        self.release_gate();
        self.recompute_availability();
        screens::cross_fade(&mut self.stage, Screen::Map).await?;
        self.stage.surface_mut().clear();
        self.recompute_availability();
        self.stage.commit();
        Ok(Flow::Map)
    }

    fn release_gate(&mut self) {
        if let Some(Gate::Tally(_)) = self.gate.take() {
            tracing::debug!("tally key listener released");
        }
    }
}
