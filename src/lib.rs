//! story-map: A terminal story player.
//!
//! A story is a set of chapters unlocked along a map. Each chapter is a
//! sequence of animated scenes; progress persists between runs.

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod map;
pub mod menubar;
pub mod player;
pub mod progress;
pub mod renderer;
#[doc(hidden)]
pub mod testkit;
pub mod types;
