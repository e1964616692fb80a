//! Screen transitions between the intro, map and chapter views.

use crate::error::Result;

use super::stage::{Screen, ScreenState, Stage};

const FADE_MS: u64 = 500;
const FRAME_MS: u64 = 50;

/// Fade the active view out, swap to `to`, then fade it in.
pub async fn cross_fade(stage: &mut Stage, to: Screen) -> Result<()> {
    tracing::debug!(from = ?stage.pres.screen.active, ?to, "cross-fade");
    stage.pres.screen.opacity = 0.0;
    stage.wait(FADE_MS).await?;
    stage.pres.screen = ScreenState {
        active: to,
        opacity: 0.0,
    };
    stage.wait(FRAME_MS).await?;
    stage.pres.screen.opacity = 1.0;
    stage.wait(FADE_MS).await
}

/// Switch to `to` at full opacity without a transition.
pub fn show_instant(stage: &mut Stage, to: Screen) {
    stage.pres.screen = ScreenState {
        active: to,
        opacity: 1.0,
    };
    stage.commit();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::TestStage;
    use tokio::time::{Duration, Instant};

    #[tokio::test(start_paused = true)]
    async fn cross_fade_walks_through_opacity_zero() {
        let mut t = TestStage::new();
        show_instant(&mut t.stage, Screen::Map);
        let start = Instant::now();
        cross_fade(&mut t.stage, Screen::Chapter).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(1050));

        let frames = t.frames();
        let fade: Vec<_> = frames.iter().map(|s| (s.active, s.opacity)).collect();
        assert_eq!(
            fade,
            vec![
                (Screen::Map, 1.0),
                (Screen::Map, 0.0),
                (Screen::Chapter, 0.0),
                (Screen::Chapter, 1.0),
            ]
        );
        assert_eq!(t.stage.pres.screen.active, Screen::Chapter);
    }
}
