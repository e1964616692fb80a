use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use story_map::{
    config::PlayerConfig,
    engine::source::Story,
    player::{PlayOptions, Player},
    progress::{Progress, store::FileStore, unlocks::{NodeStatus, UnlockGraph}},
};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

const PLAY_USAGE: &str = "story-map play [--story <story.json>] [--resume] [--fast]";
const CHECK_USAGE: &str = "story-map check <story.json>";
const STATUS_USAGE: &str = "story-map status [--story <story.json>]";
const RESET_USAGE: &str = "story-map reset";

const LOG_ENV: &str = "STORY_MAP_LOG";
const LOG_FILE: &str = "story-map.log";

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let command = args.next();
    let rest: Vec<String> = args.collect();

    match command.as_deref() {
        Some("play") | None => {
            let mut story = None;
            let mut opts = PlayOptions::default();
            let mut it = rest.into_iter();
            while let Some(arg) = it.next() {
                match arg.as_str() {
                    "--story" => story = Some(PathBuf::from(it.next().context(PLAY_USAGE)?)),
                    "--resume" => opts.resume = true,
                    "--fast" => opts.fast = true,
                    other => bail!("unexpected argument `{other}`\n\nUsage:\n  {PLAY_USAGE}"),
                }
            }
            play(story.as_deref(), opts)
        }
        Some("check") => {
            let path = rest.first().context(CHECK_USAGE)?;
            check(Path::new(path))
        }
        Some("status") => {
            let story = match rest.as_slice() {
                [] => None,
                [flag, path] if flag == "--story" => Some(PathBuf::from(path)),
                _ => bail!("Usage:\n  {STATUS_USAGE}"),
            };
            status(story.as_deref())
        }
        Some("reset") => reset(),
        _ => bail!(
            "story-map: a terminal story player\n\nUsage:\n  {PLAY_USAGE}\n  {CHECK_USAGE}\n  {STATUS_USAGE}\n  {RESET_USAGE}"
        ),
    }
}

fn load_story(path: Option<&Path>) -> Result<(Story, PathBuf)> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let story = Story::from_json(&json)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            let root = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            Ok((story, root))
        }
        None => {
            let story = Story::builtin().context("Built-in story is invalid")?;
            let root = std::env::current_dir().context("Failed to read the working directory")?;
            Ok((story, root))
        }
    }
}

/// Log to a file in the state directory; the terminal is in raw mode while playing.
fn init_logging(config: &PlayerConfig) -> Result<()> {
    let dir = config.state_dir();
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(LOG_FILE);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("story_map=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }
    Ok(())
}

fn play(story_path: Option<&Path>, opts: PlayOptions) -> Result<()> {
    let config = PlayerConfig::load();
    init_logging(&config)?;
    let (story, root) = load_story(story_path)?;
    tracing::info!(title = %story.title, chapters = story.chapters.len(), "story loaded");
    Player::new(story, root, config).play(opts)
}

fn check(path: &Path) -> Result<()> {
    let (story, _) = load_story(Some(path))?;
    let scenes: usize = story.chapters.iter().map(|c| c.scenes.len()).sum();
    println!(
        "{}: ok, \"{}\" with {} chapters and {} scenes",
        path.display(),
        story.title,
        story.chapters.len(),
        scenes,
    );
    Ok(())
}

fn status(story_path: Option<&Path>) -> Result<()> {
    let config = PlayerConfig::load();
    let (story, _) = load_story(story_path)?;
    let progress = Progress::load(Box::new(FileStore::new(config.state_dir())));
    let graph = UnlockGraph::from_story(&story);
    let state = progress.state();

    println!("{}", story.title);
    println!("  at: {} (scene {})", state.current_location, state.current_scene + 1);
    for chapter in &story.chapters {
        let mark = match graph.status(&chapter.id, progress.completed()) {
            NodeStatus::Completed => "done",
            NodeStatus::Available => "open",
            NodeStatus::Locked => "locked",
        };
        println!("  [{mark:>6}] {} ({})", chapter.name, chapter.id);
    }
    Ok(())
}

fn reset() -> Result<()> {
    let config = PlayerConfig::load();
    let mut progress = Progress::load(Box::new(FileStore::new(config.state_dir())));
    progress.reset();
    println!("Progress cleared.");
    Ok(())
}
