//! Top-level flow: intro on first launch, then the map/chapter loop.

use crate::engine::stage::{Input, Screen};
use crate::engine::{Flow, StoryEngine};
use crate::error::{Result, StoryError};

#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchOptions {
    /// Re-enter the stored chapter position instead of opening on the map.
    pub resume: bool,
}

/// Run until the final chapter ends or playback is cancelled.
pub async fn run(engine: &mut StoryEngine, opts: LaunchOptions) -> Result<()> {
    match play(engine, opts).await {
        Err(StoryError::Cancelled) => {
            tracing::info!("playback cancelled");
            Ok(())
        }
        other => other,
    }
}

async fn play(engine: &mut StoryEngine, opts: LaunchOptions) -> Result<()> {
    if launch(engine, opts).await? == Flow::Exit {
        return Ok(());
    }
    loop {
        let input = engine.stage_mut().next_input().await?;
        let before = checkpoint(engine);
        let flow = match input {
            Input::Restart => {
                engine.restart().await?;
                Flow::Map
            }
            _ if engine.screen() == Screen::Map => engine.handle_map_input(input).await?,
            _ => engine.handle_input(input).await?,
        };
        if flow == Flow::Exit {
            tracing::info!("story finished");
            return Ok(());
        }
        // Keys typed during a reveal belong to the scene that just ended.
        if checkpoint(engine) != before {
            engine.stage_mut().drain_inputs();
        }
    }
}

fn checkpoint(engine: &StoryEngine) -> (Screen, String, usize) {
    let (location, scene) = engine.position();
    (engine.screen(), location.to_string(), scene)
}

async fn launch(engine: &mut StoryEngine, opts: LaunchOptions) -> Result<Flow> {
    let entry = engine.story().entry.clone();
    if !engine.progress().is_completed(&entry) {
        engine.play_intro().await?;
        return Ok(Flow::Map);
    }

    let (location, scene) = {
        let (location, scene) = engine.position();
        (location.to_string(), scene)
    };
    let resumable = location != entry
        && engine.story().chapter(&location).is_some()
        && !engine.progress().is_completed(&location);
    if opts.resume && resumable {
        engine.recompute_availability();
        return engine.resume_chapter(&location, scene).await;
    }
    engine.show_map();
    Ok(Flow::Map)
}
