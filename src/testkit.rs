//! Test doubles shared by unit and integration tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::engine::delay::{CancelHandle, Delay};
use crate::engine::media::{MediaLoader, MediaStatus};
use crate::engine::rng::DeterministicRng;
use crate::engine::stage::{Input, Key, Presentation, ScreenState, Stage, View};
use crate::error::{Result, StoryError};
use crate::progress::store::KeyValueStore;

/// Always returns the middle of the range, so jitter is exactly zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct MidpointRng;

impl DeterministicRng for MidpointRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        min + (max.saturating_sub(min)) / 2
    }

    fn next_f64(&mut self) -> f64 {
        0.5
    }
}

#[derive(Debug, Default)]
pub struct NullView;

impl View for NullView {
    fn present(&mut self, _pres: &Presentation) {}
}

/// Records the screen state and a snapshot of each committed presentation.
#[derive(Debug, Default, Clone)]
pub struct RecordingView {
    pub frames: Rc<RefCell<Vec<ScreenState>>>,
    pub last: Rc<RefCell<Option<Presentation>>>,
}

impl View for RecordingView {
    fn present(&mut self, pres: &Presentation) {
        self.frames.borrow_mut().push(pres.screen);
        *self.last.borrow_mut() = Some(pres.clone());
    }
}

/// Every image resolves; ids listed in `missing` fail instead.
#[derive(Debug, Default, Clone)]
pub struct ScriptedMedia {
    pub missing: HashSet<String>,
}

#[async_trait(?Send)]
impl MediaLoader for ScriptedMedia {
    async fn load(&self, src: &str) -> MediaStatus {
        if self.missing.contains(src) {
            MediaStatus::Failed
        } else {
            MediaStatus::Loaded
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FailingMedia;

#[async_trait(?Send)]
impl MediaLoader for FailingMedia {
    async fn load(&self, _src: &str) -> MediaStatus {
        MediaStatus::Failed
    }
}

/// Never finishes loading.
#[derive(Debug, Default, Clone, Copy)]
pub struct StalledMedia;

#[async_trait(?Send)]
impl MediaLoader for StalledMedia {
    async fn load(&self, _src: &str) -> MediaStatus {
        std::future::pending().await
    }
}

/// A store whose every operation fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(StoryError::Store("disk on fire".into()))
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
        Err(StoryError::Store("disk on fire".into()))
    }

    fn remove(&mut self, _key: &str) -> Result<()> {
        Err(StoryError::Store("disk on fire".into()))
    }
}

/// A stage wired to test doubles, with handles to drive and observe it.
pub struct TestStage {
    pub stage: Stage,
    pub inputs: UnboundedSender<Input>,
    pub cancel: CancelHandle,
    pub view: RecordingView,
}

impl TestStage {
    pub fn new() -> Self {
        Self::with_media(Box::new(ScriptedMedia::default()))
    }

    pub fn with_media(media: Box<dyn MediaLoader>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (delay, cancel) = Delay::new(1.0);
        let view = RecordingView::default();
        let stage = Stage::new(
            "test",
            Box::new(view.clone()),
            delay,
            Box::new(MidpointRng),
            media,
            rx,
        );
        TestStage {
            stage,
            inputs: tx,
            cancel,
            view,
        }
    }

    pub fn frames(&self) -> Vec<ScreenState> {
        self.view.frames.borrow().clone()
    }

    pub fn press(&self, key: Key) {
        let _ = self.inputs.send(Input::Key(key));
    }
}

impl Default for TestStage {
    fn default() -> Self {
        Self::new()
    }
}
