//! Player: The terminal host.
//!
//! Owns the terminal (raw mode, alternate screen), reads keys on a blocking
//! thread and runs the story engine on a single-threaded runtime. Every
//! committed presentation is rasterized and drawn as a cell diff.

use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, queue, style, terminal};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::time::Instant;

use crate::app::{self, LaunchOptions};
use crate::config::{FAST_SPEED, KeyBindings, PlayerConfig, matches_binding};
use crate::engine::StoryEngine;
use crate::engine::delay::{CancelHandle, Delay};
use crate::engine::media::FsMediaLoader;
use crate::engine::rng::SystemRng;
use crate::engine::source::Story;
use crate::engine::stage::{Input, Key, Presentation, Screen, Stage, View};
use crate::menubar::print_menubar;
use crate::progress::Progress;
use crate::progress::store::FileStore;
use crate::progress::unlocks::NodeStatus;
use crate::renderer::Renderer;
use crate::types::{Cell, CellChange, Color, Grid, NamedColor, Style, TerminalContract, WIDE_TAIL};

/// Rows reserved above the canvas for the menu bar.
const CANVAS_OFFSET: u16 = 1;
const MIN_WIDTH: u16 = 40;
const MIN_HEIGHT: u16 = 12;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayOptions {
    pub resume: bool,
    pub fast: bool,
}

pub struct Player {
    story: Story,
    media_root: PathBuf,
    config: PlayerConfig,
}

impl Player {
    pub fn new(story: Story, media_root: impl Into<PathBuf>, config: PlayerConfig) -> Self {
        Player {
            story,
            media_root: media_root.into(),
            config,
        }
    }

    /// Play the story in the terminal.
    ///
    /// Sets up the terminal, runs the engine until the story ends or the
    /// player quits, and restores the terminal on exit (even on error).
    pub fn play(self, opts: PlayOptions) -> Result<()> {
        let (term_w, term_h) = terminal::size()?;
        // +2: one row for menu bar, one row for status bar
        if term_w < MIN_WIDTH || term_h < MIN_HEIGHT + 2 {
            bail!(
                "Terminal too small: need {}x{}, have {}x{}",
                MIN_WIDTH,
                MIN_HEIGHT + 2,
                term_w,
                term_h,
            );
        }

        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All),
        )?;

        let result = self.run(opts);

        // Always restore terminal state.
        let _ = execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();

        result
    }

    fn run(self, opts: PlayOptions) -> Result<()> {
        let speed = if opts.fast { FAST_SPEED } else { self.config.speed };
        let (delay, cancel) = Delay::new(speed);
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = spawn_input_reader(tx, cancel.clone(), self.config.key_bindings.clone());

        let stage = Stage::new(
            self.story.title.clone(),
            Box::new(TerminalView::stdout()),
            delay,
            Box::new(SystemRng::new()),
            Box::new(FsMediaLoader::new(self.media_root)),
            rx,
        );
        let state_dir = self.config.state_dir();
        let progress = Progress::load(Box::new(FileStore::new(state_dir.clone())));
        let mut engine = StoryEngine::new(self.story, stage, progress);
        tracing::info!(state_dir = %state_dir.display(), speed, resume = opts.resume, "starting playback");

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .context("Failed to start the async runtime")?;
        let result = runtime.block_on(app::run(&mut engine, LaunchOptions { resume: opts.resume }));

        cancel.cancel();
        if reader.join().is_err() {
            tracing::error!("input reader panicked");
        }
        result.context("Playback failed")
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

fn spawn_input_reader(
    tx: UnboundedSender<Input>,
    cancel: CancelHandle,
    bindings: KeyBindings,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut fullscreen = false;
        while !cancel.is_cancelled() {
            let key = match poll_key() {
                Ok(Some(key)) => key,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "reading the terminal failed");
                    cancel.cancel();
                    break;
                }
            };

            if bindings.quit.iter().any(|b| matches_binding(b, &key)) {
                tracing::info!("quit requested");
                cancel.cancel();
                break;
            }

            let input = if matches_binding(&bindings.restart, &key) {
                Some(Input::Restart)
            } else if matches_binding(&bindings.fullscreen, &key) {
                fullscreen = !fullscreen;
                if let Err(e) = toggle_fullscreen(fullscreen) {
                    tracing::warn!(error = %e, "fullscreen toggle failed");
                }
                None
            } else {
                map_key(&key)
            };

            if let Some(input) = input {
                if tx.send(input).is_err() {
                    break;
                }
            }
        }
    })
}

fn poll_key() -> io::Result<Option<KeyEvent>> {
    if !event::poll(POLL_INTERVAL)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key)),
        _ => Ok(None),
    }
}

fn toggle_fullscreen(on: bool) -> io::Result<()> {
    let mut stdout = io::stdout();
    if on {
        stdout.write_all(b"\x1b[10;1t")?;
    } else {
        stdout.write_all(b"\x1b[10;0t")?;
    }
    stdout.flush()
}

/// Translate a terminal key into engine input. Ctrl/Alt chords are ignored.
pub fn map_key(key: &KeyEvent) -> Option<Input> {
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return None;
    }
    let k = match key.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Tab => Key::Tab,
        KeyCode::BackTab => Key::BackTab,
        _ => return None,
    };
    Some(Input::Key(k))
}

// ---------------------------------------------------------------------------
// Terminal output
// ---------------------------------------------------------------------------

/// Draws committed presentations, printing only the cells that changed.
pub struct TerminalView<W: Write> {
    out: W,
    /// Fixed terminal size; `None` asks the terminal on every frame.
    size: Option<(u16, u16)>,
    grid: Option<Grid>,
    screen: Option<Screen>,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        TerminalView {
            out: io::stdout(),
            size: None,
            grid: None,
            screen: None,
        }
    }
}

impl<W: Write> TerminalView<W> {
    pub fn with_size(out: W, width: u16, height: u16) -> Self {
        TerminalView {
            out,
            size: Some((width, height)),
            grid: None,
            screen: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, pres: &Presentation) -> io::Result<()> {
        let (term_w, term_h) = match self.size {
            Some(size) => size,
            None => terminal::size()?,
        };
        let contract = TerminalContract {
            width: term_w,
            height: term_h.saturating_sub(CANVAS_OFFSET + 1),
        };
        let next = Renderer::rasterize(pres, contract, Instant::now());

        let resized = self.grid.as_ref().is_none_or(|prev| {
            prev.len() != next.len() || prev.first().map(Vec::len) != next.first().map(Vec::len)
        });
        if resized {
            queue!(self.out, terminal::Clear(terminal::ClearType::All))?;
        }
        if resized || self.screen != Some(pres.screen.active) {
            self.render_menubar(pres.screen.active)?;
            self.screen = Some(pres.screen.active);
        }

        match self.grid.take().filter(|_| !resized) {
            Some(prev) => {
                let changes = Renderer::diff(&prev, &next);
                self.render_diff(&changes)?;
            }
            None => self.render_full(&next)?,
        }
        self.render_status(pres, contract)?;
        self.grid = Some(next);
        self.out.flush()
    }

    fn render_menubar(&mut self, screen: Screen) -> io::Result<()> {
        queue!(
            self.out,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::CurrentLine),
        )?;
        print_menubar(&mut self.out, screen)
    }

    fn render_full(&mut self, grid: &Grid) -> io::Result<()> {
        for (y, row) in grid.iter().enumerate() {
            queue!(self.out, cursor::MoveTo(0, y as u16 + CANVAS_OFFSET))?;
            for cell in row.iter().filter(|c| c.ch != WIDE_TAIL) {
                print_cell(&mut self.out, cell)?;
            }
        }
        Ok(())
    }

    fn render_diff(&mut self, changes: &[CellChange]) -> io::Result<()> {
        for change in changes.iter().filter(|c| c.cell.ch != WIDE_TAIL) {
            queue!(self.out, cursor::MoveTo(change.x, change.y + CANVAS_OFFSET))?;
            print_cell(&mut self.out, &change.cell)?;
        }
        Ok(())
    }

    fn render_status(&mut self, pres: &Presentation, contract: TerminalContract) -> io::Result<()> {
        let status_y = contract.height + CANVAS_OFFSET;
        let done = pres
            .map
            .nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Completed)
            .count();
        let status = format!(" {} | {done}/{} places visited ", pres.title, pres.map.nodes.len());

        let mut cs = style::ContentStyle::default();
        cs.attributes.set(style::Attribute::Dim);

        queue!(
            self.out,
            cursor::MoveTo(0, status_y),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::PrintStyledContent(style::StyledContent::new(cs, status)),
        )
    }
}

impl<W: Write> View for TerminalView<W> {
    fn present(&mut self, pres: &Presentation) {
        if let Err(e) = self.draw(pres) {
            // The grid was taken, so the next frame is drawn in full.
            tracing::warn!(error = %e, "drawing to the terminal failed");
        }
    }
}

fn print_cell(out: &mut impl Write, cell: &Cell) -> io::Result<()> {
    let cs = to_content_style(&cell.style);
    queue!(out, style::PrintStyledContent(style::StyledContent::new(cs, cell.ch)))
}

// ---------------------------------------------------------------------------
// Style conversion
// ---------------------------------------------------------------------------

pub fn to_content_style(s: &Style) -> style::ContentStyle {
    let mut cs = style::ContentStyle::default();
    if let Some(fg) = &s.fg {
        cs.foreground_color = Some(to_ct_color(fg));
    }
    if let Some(bg) = &s.bg {
        cs.background_color = Some(to_ct_color(bg));
    }
    let attributes = [
        (s.bold, style::Attribute::Bold),
        (s.dim, style::Attribute::Dim),
        (s.italic, style::Attribute::Italic),
        (s.crossed, style::Attribute::CrossedOut),
        (s.reverse, style::Attribute::Reverse),
    ];
    for (on, attribute) in attributes {
        if on {
            cs.attributes.set(attribute);
        }
    }
    cs
}

pub fn to_ct_color(c: &Color) -> style::Color {
    match c {
        Color::Named(n) => match n {
            NamedColor::Black => style::Color::Black,
            NamedColor::Red => style::Color::Red,
            NamedColor::Green => style::Color::Green,
            NamedColor::Yellow => style::Color::Yellow,
            NamedColor::Blue => style::Color::Blue,
            NamedColor::Magenta => style::Color::Magenta,
            NamedColor::Cyan => style::Color::Cyan,
            NamedColor::White => style::Color::White,
        },
        Color::Rgb { r, g, b } => style::Color::Rgb {
            r: *r,
            g: *g,
            b: *b,
        },
    }
}
