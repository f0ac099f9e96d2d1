//! The game engine: creates sessions and routes operations to them.

use std::sync::Arc;

use quizforge_protocol::{JoinCode, PlayerId, QuizId};

use crate::archive::{self, NoopArchive, SessionArchive};
use crate::model::{AnswerGrade, CurrentQuestion, Player, Session};
use crate::session::{spawn_session, SessionHandle};
use crate::store::SessionStore;
use crate::{EngineConfig, GameError, QuizStore};

/// Owns every live session.
///
/// All methods take `&self` and are safe to call from many tasks at once.
/// Operations on the same join code are applied in arrival order by that
/// session's actor; different join codes never block each other.
pub struct GameEngine<Q> {
    quizzes: Q,
    sessions: SessionStore,
    archive: Arc<dyn SessionArchive>,
    config: EngineConfig,
}

impl<Q: QuizStore> GameEngine<Q> {
    /// Creates an engine with default settings and no archive.
    pub fn new(quizzes: Q) -> Self {
        Self::with_config(quizzes, EngineConfig::default(), Arc::new(NoopArchive))
    }

    pub fn with_config(quizzes: Q, config: EngineConfig, archive: Arc<dyn SessionArchive>) -> Self {
        Self {
            quizzes,
            sessions: SessionStore::new(),
            archive,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Starts a new session for `quiz_id` with a fresh join code.
    ///
    /// The host is recorded on the session but is not a player.
    pub async fn create_session(
        &self,
        quiz_id: &QuizId,
        host_id: PlayerId,
    ) -> Result<Session, GameError> {
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await
            .ok_or_else(|| GameError::QuizNotFound(quiz_id.clone()))?;

        let handle = self
            .sessions
            .insert_with_fresh_code(self.config.max_code_attempts, |code| {
                let session = Session::new(code, quiz_id.clone(), host_id);
                spawn_session(
                    session,
                    Arc::clone(&quiz),
                    &self.config,
                    Arc::clone(&self.archive),
                )
            })?;

        let session = handle.snapshot().await?;
        archive::record_best_effort(self.archive.as_ref(), &session);
        tracing::info!(
            join_code = %session.join_code,
            session_id = %session.id,
            %quiz_id,
            %host_id,
            "session created"
        );
        Ok(session)
    }

    /// Adds a player to a session that hasn't started yet. Joining again
    /// under the same id resets that player's counters.
    pub async fn join_session(
        &self,
        code: JoinCode,
        player_id: PlayerId,
        display_name: impl Into<String>,
    ) -> Result<Session, GameError> {
        self.handle(code)?.join(player_id, display_name.into()).await
    }

    /// Moves the session onto its first question and starts the clock.
    ///
    /// Does not check the current state. Callers that must not restart a
    /// running session use [`GameEngine::start_if_waiting`].
    pub async fn start_session(&self, code: JoinCode) -> Result<Session, GameError> {
        self.handle(code)?.start().await
    }

    /// Starts the session only if it is still `Waiting`, checked and
    /// applied in one actor step. Fails with `SessionAlreadyStarted`
    /// otherwise.
    pub async fn start_if_waiting(&self, code: JoinCode) -> Result<Session, GameError> {
        self.handle(code)?.start_if_waiting().await
    }

    /// The question the session is on, or `None` before the start or once
    /// the index has run past the quiz. The result includes the answer key;
    /// use [`CurrentQuestion::view`] for anything sent to clients.
    pub async fn current_question(
        &self,
        code: JoinCode,
    ) -> Result<Option<CurrentQuestion>, GameError> {
        self.handle(code)?.current_question().await
    }

    /// Scores an answer against the current question.
    ///
    /// Returns whether it was correct. Unknown sessions, unknown players,
    /// and sessions not in progress all yield `false` with no change.
    pub async fn submit_answer(
        &self,
        code: JoinCode,
        player_id: PlayerId,
        option_index: usize,
    ) -> bool {
        self.grade_answer(code, player_id, option_index)
            .await
            .correct
    }

    /// Like [`GameEngine::submit_answer`], but also reports the key of the
    /// current question, read in the same step so a concurrent advance
    /// can't swap it for the next question's. The key is present whenever
    /// a question is current, even if the answer was not scored.
    pub async fn grade_answer(
        &self,
        code: JoinCode,
        player_id: PlayerId,
        option_index: usize,
    ) -> AnswerGrade {
        let Ok(handle) = self.handle(code) else {
            return AnswerGrade::default();
        };
        handle
            .submit_answer(player_id, option_index)
            .await
            .unwrap_or_default()
    }

    /// Moves to the next question, or to `Finished` after the last one.
    pub async fn advance_question(&self, code: JoinCode) -> Result<Session, GameError> {
        self.handle(code)?.advance().await
    }

    /// Players in leaderboard order. Empty for an unknown session.
    pub async fn leaderboard(&self, code: JoinCode) -> Vec<Player> {
        match self.handle(code) {
            Ok(handle) => handle.leaderboard().await.unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Drops a player from a session. Returns whether anyone was removed;
    /// unknown sessions and players are not an error.
    pub async fn remove_player(&self, code: JoinCode, player_id: PlayerId) -> bool {
        let Ok(handle) = self.handle(code) else {
            return false;
        };
        handle.remove_player(player_id).await.unwrap_or(false)
    }

    /// A point-in-time copy of the session.
    pub async fn session(&self, code: JoinCode) -> Result<Session, GameError> {
        self.handle(code)?.snapshot().await
    }

    /// Forgets sessions whose actors have been evicted. Returns how many
    /// index entries were reclaimed.
    pub fn purge_finished(&self) -> usize {
        let purged = self.sessions.purge_closed();
        if purged > 0 {
            tracing::debug!(purged, "purged evicted sessions");
        }
        purged
    }

    /// Number of sessions still resident.
    pub fn session_count(&self) -> usize {
        self.sessions.live_count()
    }

    fn handle(&self, code: JoinCode) -> Result<SessionHandle, GameError> {
        self.sessions
            .get(code)
            .ok_or(GameError::SessionNotFound(code))
    }
}

impl<Q> std::fmt::Debug for GameEngine<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("sessions", &self.sessions)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
