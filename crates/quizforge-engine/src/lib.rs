//! Session lifecycle and scoring for Quizforge.
//!
//! Each session runs as an isolated Tokio task (actor model) that owns its
//! players, question cursor, and clock. The [`GameEngine`] indexes those
//! actors by join code and is the only way in.
//!
//! # Key types
//!
//! - [`GameEngine`]: creates sessions and applies operations to them
//! - [`QuizStore`]: where quiz content comes from
//! - [`SessionArchive`]: where finished sessions go
//! - [`Session`] / [`Player`]: snapshots handed back to callers
//! - [`SessionState`]: lifecycle state machine
//! - [`EngineConfig`]: eviction TTL, channel sizes, code allocation

mod archive;
mod config;
mod engine;
mod error;
mod model;
mod quiz;
pub mod scoring;
mod session;
mod store;

pub use archive::{ArchiveError, NoopArchive, SessionArchive};
pub use config::{EngineConfig, SessionState};
pub use engine::GameEngine;
pub use error::GameError;
pub use model::{AnswerGrade, CurrentQuestion, Player, Question, Quiz, Session};
pub use quiz::{InMemoryQuizStore, QuizStore};
