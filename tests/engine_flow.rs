use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedSender};

use story_map::app::{self, LaunchOptions};
use story_map::engine::delay::{CancelHandle, Delay};
use story_map::engine::scenes::Gate;
use story_map::engine::source::Story;
use story_map::engine::stage::{Input, Key, Presentation, Screen, Stage, View};
use story_map::engine::{Flow, StoryEngine};
use story_map::error::StoryError;
use story_map::progress::store::{KeyValueStore, MemoryStore};
use story_map::progress::{GameState, Progress, STATE_KEY};
use story_map::testkit::{MidpointRng, ScriptedMedia};

const STORY: &str = r#"{
  "title": "Test",
  "finalChapter": "fin",
  "chapters": [
    {"id": "one", "name": "One", "scenes": [
      {"type": "text", "lines": [{"text": "hello", "instant": true}],
       "buttons": [{"text": "A", "action": "next"}, {"text": "B", "action": "next"}, {"text": "C", "action": "end"}]},
      {"type": "text", "lines": [{"text": "bye", "instant": true}],
       "buttons": [{"text": "Done", "action": "end"}]}
    ]},
    {"id": "ask", "name": "Ask", "requires": "one", "scenes": [
      {"type": "input", "lines": [{"text": "Tell me", "instant": true}],
       "buttons": [{"text": "Send", "action": "submit", "primary": true}]}
    ]},
    {"id": "watch", "name": "Watch", "requires": "ask", "route": "bonus", "scenes": [
      {"type": "video", "embedId": "abc123"},
      {"type": "pudding_game", "target": 12},
      {"type": "text", "lines": [{"text": "x", "instant": true}],
       "buttons": [{"text": "Map", "action": "map"}]}
    ]},
    {"id": "fin", "name": "Fin", "requires": "watch", "scenes": [
      {"type": "text", "lines": [{"text": "the end", "instant": true}],
       "buttons": [{"text": "Bye", "action": "end"}]}
    ]}
  ]
}"#;

/// Keeps every committed presentation.
#[derive(Clone, Default)]
struct Tape(Rc<RefCell<Vec<Presentation>>>);

impl View for Tape {
    fn present(&mut self, pres: &Presentation) {
        self.0.borrow_mut().push(pres.clone());
    }
}

impl Tape {
    fn len(&self) -> usize {
        self.0.borrow().len()
    }

    fn frame(&self, i: usize) -> Presentation {
        self.0.borrow()[i].clone()
    }
}

struct Harness {
    engine: StoryEngine,
    store: MemoryStore,
    tape: Tape,
    inputs: UnboundedSender<Input>,
    cancel: CancelHandle,
}

impl Harness {
    fn new(json: &str) -> Self {
        Self::with_state(json, None)
    }

    fn with_state(json: &str, state: Option<&str>) -> Self {
        let mut store = MemoryStore::new();
        if let Some(state) = state {
            store.set(STATE_KEY, state).unwrap();
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let (delay, cancel) = Delay::new(1.0);
        let tape = Tape::default();
        let stage = Stage::new(
            "Test",
            Box::new(tape.clone()),
            delay,
            Box::new(MidpointRng),
            Box::new(ScriptedMedia::default()),
            rx,
        );
        let progress = Progress::load(Box::new(store.clone()));
        let story = Story::from_json(json).unwrap();
        Harness {
            engine: StoryEngine::new(story, stage, progress),
            store,
            tape,
            inputs: tx,
            cancel,
        }
    }

    fn labels(&self) -> Vec<String> {
        self.engine
            .stage()
            .surface()
            .controls()
            .iter()
            .map(|c| c.label.clone())
            .collect()
    }

    fn completed(&self) -> Vec<String> {
        self.engine.progress().completed().to_vec()
    }

    fn saved(&self) -> GameState {
        serde_json::from_str(&self.store.raw(STATE_KEY).unwrap()).unwrap()
    }

    async fn type_text(&mut self, text: &str) {
        for ch in text.chars() {
            self.engine.handle_input(Input::Key(Key::Char(ch))).await.unwrap();
        }
    }
}

#[tokio::test(start_paused = true)]
async fn declared_choices_are_shown_and_enabled() {
    let mut h = Harness::new(STORY);
    assert_eq!(h.engine.start_chapter("one").await.unwrap(), Flow::Continue);

    assert_eq!(h.labels(), ["A", "B", "C"]);
    let surface = h.engine.stage().surface();
    assert!(surface.controls().iter().all(|c| c.enabled && c.visible));
    assert_eq!(surface.focus(), Some(0));
    assert_eq!(h.engine.position(), ("one", 0));
    assert_eq!(h.saved().current_location, "one");
}

#[tokio::test(start_paused = true)]
async fn a_click_disables_every_choice_before_anything_else() {
    let mut h = Harness::new(STORY);
    h.engine.start_chapter("one").await.unwrap();
    let before = h.tape.len();

    h.engine.handle_button_click(1).await.unwrap();

    let first = h.tape.frame(before);
    assert_eq!(first.surface.controls().len(), 3);
    assert!(first.surface.controls().iter().all(|c| !c.enabled));
    assert_eq!(h.engine.position(), ("one", 1));
    assert_eq!(h.labels(), ["Done"]);
}

#[tokio::test(start_paused = true)]
async fn a_second_activation_is_ignored() {
    let mut h = Harness::new(STORY);
    h.engine.start_chapter("one").await.unwrap();
    assert_eq!(h.engine.handle_button_click(2).await.unwrap(), Flow::Map);
    assert_eq!(h.completed(), ["one"]);

    let frames = h.tape.len();
    assert_eq!(h.engine.handle_button_click(2).await.unwrap(), Flow::Continue);
    assert_eq!(h.tape.len(), frames);
    assert_eq!(h.completed(), ["one"]);
    assert_eq!(h.engine.screen(), Screen::Map);
}

#[tokio::test(start_paused = true)]
async fn ending_twice_records_completion_once() {
    let mut h = Harness::new(STORY);
    h.engine.start_chapter("one").await.unwrap();
    h.engine.end_chapter().await.unwrap();
    h.engine.end_chapter().await.unwrap();
    assert_eq!(h.completed(), ["one"]);
    assert_eq!(h.saved().completed_locations, ["one"]);
}

#[tokio::test(start_paused = true)]
async fn first_chapter_unlocks_with_the_entry() {
    let fresh = Harness::new(story_map::engine::source::BUILTIN_STORY);
    assert!(!fresh.engine.is_available("napoleon"));

    let started = Harness::with_state(
        story_map::engine::source::BUILTIN_STORY,
        Some(r#"{"completedLocations":["start"]}"#),
    );
    assert!(started.engine.is_available("napoleon"));
    assert!(!started.engine.is_available("jednou_vetou"));
}

#[tokio::test(start_paused = true)]
async fn short_answers_are_rejected_and_long_ones_end_the_chapter() {
    let mut h = Harness::new(STORY);
    h.engine.start_chapter("ask").await.unwrap();
    assert!(matches!(h.engine.gate(), Some(Gate::Input { min_length: 10 })));

    h.type_text("short").await;
    assert_eq!(h.engine.handle_button_click(0).await.unwrap(), Flow::InputRejected);
    assert!(h.completed().is_empty());
    let surface = h.engine.stage().surface();
    assert!(surface.controls().iter().all(|c| c.enabled));
    assert!(surface.input().unwrap().rejected);

    for _ in 0.."short".len() {
        h.engine.handle_input(Input::Key(Key::Backspace)).await.unwrap();
    }
    h.type_text("this is long enough").await;
    assert!(!h.engine.stage().surface().input().unwrap().rejected);
    assert_eq!(h.engine.handle_button_click(0).await.unwrap(), Flow::Map);
    assert_eq!(h.completed(), ["ask"]);
    assert_eq!(h.engine.submitted(), Some("this is long enough"));
}

#[tokio::test(start_paused = true)]
async fn answer_length_counts_every_typed_character() {
    let mut h = Harness::new(STORY);
    h.engine.start_chapter("ask").await.unwrap();
    h.type_text("  abcdefg").await;
    assert_eq!(h.engine.handle_button_click(0).await.unwrap(), Flow::InputRejected);

    h.type_text(" ").await;
    assert_eq!(h.engine.handle_button_click(0).await.unwrap(), Flow::Map);
    assert_eq!(h.completed(), ["ask"]);
    assert_eq!(h.engine.submitted(), Some("abcdefg"));
}

#[tokio::test(start_paused = true)]
async fn padded_answers_are_accepted() {
    let mut h = Harness::new(STORY);
    h.engine.start_chapter("ask").await.unwrap();
    h.type_text("   short   ").await;
    assert_eq!(h.engine.handle_button_click(0).await.unwrap(), Flow::Map);
    assert_eq!(h.engine.submitted(), Some("short"));
}

#[tokio::test(start_paused = true)]
async fn restart_clears_progress_and_replays_the_intro() {
    let mut h = Harness::with_state(
        STORY,
        Some(r#"{"currentLocation":"ask","currentScene":0,"completedLocations":["start","one"]}"#),
    );
    let inputs = h.inputs.clone();
    let feeder = async move {
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_secs(30)).await;
            let _ = inputs.send(Input::Key(Key::Enter));
        }
    };

    let (restarted, ()) = tokio::join!(h.engine.restart(), feeder);
    restarted.unwrap();

    let state = h.engine.progress().state().clone();
    assert_eq!(state.current_location, "start");
    assert_eq!(state.current_scene, 0);
    assert_eq!(state.completed_locations, ["start"]);
    assert_eq!(h.engine.screen(), Screen::Map);
}

#[tokio::test(start_paused = true)]
async fn playback_in_flight_blocks_a_second_one() {
    let mut h = Harness::new(STORY);
    let guard = h.engine.latch().try_acquire().unwrap();
    let frames = h.tape.len();
    assert_eq!(h.engine.play_scene().await.unwrap(), Flow::Continue);
    assert_eq!(h.tape.len(), frames);
    drop(guard);
    assert!(!h.engine.latch().is_held());
}

#[tokio::test(start_paused = true)]
async fn unknown_chapter_is_an_error() {
    let mut h = Harness::new(STORY);
    let err = h.engine.start_chapter("nowhere").await.unwrap_err();
    assert!(matches!(err, StoryError::UnknownChapter(ref id) if id == "nowhere"));
}

#[tokio::test(start_paused = true)]
async fn index_past_the_end_finishes_the_chapter() {
    let mut h = Harness::new(STORY);
    assert_eq!(h.engine.resume_chapter("one", 7).await.unwrap(), Flow::Map);
    assert_eq!(h.completed(), ["one"]);
    assert!(!h.engine.latch().is_held());
}

#[tokio::test(start_paused = true)]
async fn the_final_chapter_exits() {
    let mut h = Harness::new(STORY);
    h.engine.start_chapter("fin").await.unwrap();
    assert_eq!(h.engine.handle_button_click(0).await.unwrap(), Flow::Exit);
    assert_eq!(h.completed(), ["fin"]);
}

#[tokio::test(start_paused = true)]
async fn video_and_tally_continue_on_their_own_controls() {
    let mut h = Harness::new(STORY);
    h.engine.start_chapter("watch").await.unwrap();
    assert_eq!(h.labels(), ["Continue"]);

    h.engine.handle_button_click(0).await.unwrap();
    assert_eq!(h.engine.position(), ("watch", 1));
    assert!(matches!(h.engine.gate(), Some(Gate::Tally(_))));

    h.engine.handle_input(Input::Key(Key::Enter)).await.unwrap();
    h.engine.handle_input(Input::Key(Key::Enter)).await.unwrap();
    match h.engine.gate() {
        Some(Gate::Tally(t)) => assert_eq!((t.count, t.is_done()), (12, true)),
        other => panic!("expected a tally gate, got {other:?}"),
    }

    // Enter now activates the focused Continue control.
    h.engine.handle_input(Input::Key(Key::Enter)).await.unwrap();
    assert_eq!(h.engine.position(), ("watch", 2));
    assert!(h.engine.gate().is_some_and(|g| !matches!(g, Gate::Tally(_))));

    assert_eq!(h.engine.handle_button_click(0).await.unwrap(), Flow::Map);
    assert!(h.completed().is_empty());
    assert_eq!(h.engine.screen(), Screen::Map);
}

#[tokio::test(start_paused = true)]
async fn map_quick_navigation_and_locked_nodes() {
    let mut h = Harness::with_state(STORY, Some(r#"{"completedLocations":["start"]}"#));
    h.engine.show_map();
    assert_eq!(h.engine.stage().pres.map.quick.main.as_deref(), Some("one"));

    let flow = h.engine.handle_map_input(Input::Activate(3)).await.unwrap();
    assert_eq!(flow, Flow::Continue);
    assert_eq!(
        h.engine.stage().pres.map.notice.as_deref(),
        Some("Locked: finish Watch first")
    );
    assert_eq!(h.engine.screen(), Screen::Map);

    h.engine.handle_map_input(Input::Key(Key::Char('n'))).await.unwrap();
    assert_eq!(h.engine.screen(), Screen::Chapter);
    assert_eq!(h.engine.position(), ("one", 0));
    assert_eq!(h.engine.stage().pres.map.notice, None);
}

#[tokio::test(start_paused = true)]
async fn launch_resumes_the_stored_chapter() {
    let mut h = Harness::with_state(
        STORY,
        Some(r#"{"currentLocation":"one","currentScene":1,"completedLocations":["start"]}"#),
    );
    let inputs = h.inputs.clone();
    let cancel = h.cancel.clone();
    let feeder = async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        let _ = inputs.send(Input::Key(Key::Enter));
        tokio::time::sleep(Duration::from_secs(30)).await;
        cancel.cancel();
    };

    let (result, ()) = tokio::join!(app::run(&mut h.engine, LaunchOptions { resume: true }), feeder);
    result.unwrap();
    assert_eq!(h.completed(), ["start", "one"]);
    assert_eq!(h.engine.screen(), Screen::Map);
}

#[tokio::test(start_paused = true)]
async fn visited_chapters_stay_closed_on_the_map() {
    let mut h = Harness::with_state(STORY, Some(r#"{"completedLocations":["start","one"]}"#));
    h.engine.show_map();
    let one = h
        .engine
        .stage()
        .pres
        .map
        .nodes
        .iter()
        .position(|n| n.id == "one")
        .unwrap();

    let flow = h.engine.handle_map_input(Input::Activate(one)).await.unwrap();
    assert_eq!(flow, Flow::Continue);
    assert_eq!(h.engine.screen(), Screen::Map);
    assert_eq!(
        h.engine.stage().pres.map.notice.as_deref(),
        Some("Already visited: One")
    );
    assert_eq!(h.completed(), ["start", "one"]);
}
