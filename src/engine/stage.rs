//! Stage: everything a renderer needs while it plays.
//!
//! The stage owns the retained presentation (active screen, surface, map), the
//! view it is committed to, the delay primitive, randomness, the media loader
//! and the input queue. Renderers borrow it mutably for their whole run, so at
//! most one of them can be animating at any time.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

use crate::error::{Result, StoryError};
use crate::map::MapModel;

use super::delay::Delay;
use super::media::MediaLoader;
use super::rng::DeterministicRng;
use super::surface::Surface;

/// Redraw cadence while particles are in flight.
const FRAME_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Intro,
    Map,
    Chapter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenState {
    pub active: Screen,
    /// 0.0 is fully faded out, 1.0 fully shown.
    pub opacity: f32,
}

#[derive(Debug, Clone)]
pub struct Presentation {
    pub title: String,
    pub screen: ScreenState,
    pub surface: Surface,
    pub map: MapModel,
}

impl Presentation {
    pub fn new(title: impl Into<String>) -> Self {
        Presentation {
            title: title.into(),
            screen: ScreenState {
                active: Screen::Intro,
                opacity: 0.0,
            },
            surface: Surface::new(),
            map: MapModel::default(),
        }
    }
}

/// Receives every committed presentation. The terminal player draws it;
/// tests record it.
pub trait View {
    fn present(&mut self, pres: &Presentation);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Tab,
    BackTab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Key(Key),
    /// Activate the control at this surface index directly.
    Activate(usize),
    /// Wipe progress and replay the intro.
    Restart,
}

pub struct Stage {
    pub pres: Presentation,
    pub delay: Delay,
    pub rng: Box<dyn DeterministicRng>,
    pub media: Box<dyn MediaLoader>,
    view: Box<dyn View>,
    inputs: UnboundedReceiver<Input>,
}

impl Stage {
    pub fn new(
        title: impl Into<String>,
        view: Box<dyn View>,
        delay: Delay,
        rng: Box<dyn DeterministicRng>,
        media: Box<dyn MediaLoader>,
        inputs: UnboundedReceiver<Input>,
    ) -> Self {
        Stage {
            pres: Presentation::new(title),
            delay,
            rng,
            media,
            view,
            inputs,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.pres.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.pres.surface
    }

    /// Hand the current presentation to the view.
    pub fn commit(&mut self) {
        self.pres.surface.prune(Instant::now());
        self.view.present(&self.pres);
    }

    /// Commit, then suspend for `ms`. Redraws periodically while bursts fly.
    pub async fn wait(&mut self, ms: u64) -> Result<()> {
        self.commit();
        let mut remaining = ms;
        while remaining > 0 && !self.pres.surface.bursts().is_empty() {
            let step = remaining.min(FRAME_MS);
            self.delay.sleep(step).await?;
            remaining -= step;
            self.commit();
        }
        self.delay.sleep(remaining).await
    }

    /// Commit, then wait for the next user input.
    pub async fn next_input(&mut self) -> Result<Input> {
        self.commit();
        if self.delay.is_cancelled() {
            return Err(StoryError::Cancelled);
        }
        loop {
            let tick = !self.pres.surface.bursts().is_empty();
            tokio::select! {
                input = self.inputs.recv() => return input.ok_or(StoryError::Cancelled),
                () = self.delay.cancelled() => return Err(StoryError::Cancelled),
                () = tokio::time::sleep(Duration::from_millis(FRAME_MS)), if tick => self.commit(),
            }
        }
    }

    /// Drop keys typed ahead while an animation was running.
    pub fn drain_inputs(&mut self) {
        while self.inputs.try_recv().is_ok() {}
    }
}
