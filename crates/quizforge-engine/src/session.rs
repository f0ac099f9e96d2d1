//! Session actor: one Tokio task per join code.
//!
//! The actor owns its `Session` outright. Every read or write for that join
//! code goes through the actor's command channel, so operations on one
//! session are applied one at a time in arrival order while different
//! sessions proceed in parallel.
//!
//! Once a session reaches `Finished` the actor keeps serving reads for the
//! configured TTL, then archives a final snapshot and exits. A handle whose
//! actor has exited reports `SessionNotFound`.

use std::sync::Arc;

use quizforge_protocol::{JoinCode, PlayerId};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::archive::{self, SessionArchive};
use crate::model::{AnswerGrade, CurrentQuestion, Player, Quiz, Session};
use crate::{scoring, EngineConfig, GameError, SessionState};

/// Commands sent to a session actor. Each carries a reply channel.
pub(crate) enum SessionCommand {
    Join {
        player_id: PlayerId,
        display_name: String,
        reply: oneshot::Sender<Result<Session, GameError>>,
    },
    Start {
        reply: oneshot::Sender<Session>,
    },
    StartIfWaiting {
        reply: oneshot::Sender<Result<Session, GameError>>,
    },
    CurrentQuestion {
        reply: oneshot::Sender<Option<CurrentQuestion>>,
    },
    SubmitAnswer {
        player_id: PlayerId,
        option_index: usize,
        reply: oneshot::Sender<AnswerGrade>,
    },
    Advance {
        reply: oneshot::Sender<Session>,
    },
    Leaderboard {
        reply: oneshot::Sender<Vec<Player>>,
    },
    RemovePlayer {
        player_id: PlayerId,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<Session>,
    },
}

/// Handle to a running session actor.
///
/// Cheap to clone. The session store holds one per join code.
#[derive(Debug, Clone)]
pub(crate) struct SessionHandle {
    pub(crate) join_code: JoinCode,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Returns `true` once the actor has exited.
    pub(crate) fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub(crate) async fn join(
        &self,
        player_id: PlayerId,
        display_name: String,
    ) -> Result<Session, GameError> {
        self.request(|reply| SessionCommand::Join {
            player_id,
            display_name,
            reply,
        })
        .await?
    }

    pub(crate) async fn start(&self) -> Result<Session, GameError> {
        self.request(|reply| SessionCommand::Start { reply }).await
    }

    pub(crate) async fn start_if_waiting(&self) -> Result<Session, GameError> {
        self.request(|reply| SessionCommand::StartIfWaiting { reply })
            .await?
    }

    pub(crate) async fn current_question(&self) -> Result<Option<CurrentQuestion>, GameError> {
        self.request(|reply| SessionCommand::CurrentQuestion { reply })
            .await
    }

    pub(crate) async fn submit_answer(
        &self,
        player_id: PlayerId,
        option_index: usize,
    ) -> Result<AnswerGrade, GameError> {
        self.request(|reply| SessionCommand::SubmitAnswer {
            player_id,
            option_index,
            reply,
        })
        .await
    }

    pub(crate) async fn advance(&self) -> Result<Session, GameError> {
        self.request(|reply| SessionCommand::Advance { reply }).await
    }

    pub(crate) async fn leaderboard(&self) -> Result<Vec<Player>, GameError> {
        self.request(|reply| SessionCommand::Leaderboard { reply })
            .await
    }

    pub(crate) async fn remove_player(&self, player_id: PlayerId) -> Result<bool, GameError> {
        self.request(|reply| SessionCommand::RemovePlayer { player_id, reply })
            .await
    }

    pub(crate) async fn snapshot(&self) -> Result<Session, GameError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Sends a command and waits for its reply. A closed channel on either
    /// leg means the actor is gone.
    async fn request<T, F>(&self, command: F) -> Result<T, GameError>
    where
        T: Send,
        F: FnOnce(oneshot::Sender<T>) -> SessionCommand + Send,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| GameError::SessionNotFound(self.join_code))?;
        reply_rx
            .await
            .map_err(|_| GameError::SessionNotFound(self.join_code))
    }
}

/// The actor's private state. Lives inside its Tokio task.
struct SessionActor {
    session: Session,
    quiz: Arc<Quiz>,
    config: EngineConfig,
    archive: Arc<dyn SessionArchive>,
    finished_at: Option<Instant>,
    receiver: mpsc::Receiver<SessionCommand>,
}

impl SessionActor {
    async fn run(mut self) {
        tracing::debug!(join_code = %self.session.join_code, "session actor started");

        loop {
            let command = match self.finished_at {
                Some(finished_at) => {
                    let deadline = finished_at + self.config.finished_ttl;
                    tokio::select! {
                        command = self.receiver.recv() => command,
                        () = tokio::time::sleep_until(deadline) => {
                            self.evict();
                            break;
                        }
                    }
                }
                None => self.receiver.recv().await,
            };

            let Some(command) = command else {
                break;
            };
            self.handle(command);
        }

        tracing::debug!(join_code = %self.session.join_code, "session actor stopped");
    }

    fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Join {
                player_id,
                display_name,
                reply,
            } => {
                let _ = reply.send(self.handle_join(player_id, display_name));
            }
            SessionCommand::Start { reply } => {
                self.handle_start();
                let _ = reply.send(self.session.clone());
            }
            SessionCommand::StartIfWaiting { reply } => {
                let result = if self.session.state.is_joinable() {
                    self.handle_start();
                    Ok(self.session.clone())
                } else {
                    Err(GameError::SessionAlreadyStarted(self.session.join_code))
                };
                let _ = reply.send(result);
            }
            SessionCommand::CurrentQuestion { reply } => {
                let _ = reply.send(self.current_question());
            }
            SessionCommand::SubmitAnswer {
                player_id,
                option_index,
                reply,
            } => {
                let _ = reply.send(self.handle_submit(player_id, option_index));
            }
            SessionCommand::Advance { reply } => {
                self.handle_advance();
                let _ = reply.send(self.session.clone());
            }
            SessionCommand::Leaderboard { reply } => {
                let _ = reply.send(scoring::rank(self.session.players.values().cloned()));
            }
            SessionCommand::RemovePlayer { player_id, reply } => {
                let _ = reply.send(self.handle_remove(player_id));
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.clone());
            }
        }
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        display_name: String,
    ) -> Result<Session, GameError> {
        if !self.session.state.is_joinable() {
            return Err(GameError::SessionAlreadyStarted(self.session.join_code));
        }

        // Rejoining under the same id starts the player over.
        self.session
            .players
            .insert(player_id, Player::new(player_id, display_name));
        tracing::info!(
            join_code = %self.session.join_code,
            %player_id,
            players = self.session.players.len(),
            "player joined"
        );
        Ok(self.session.clone())
    }

    /// Does not check the current state; see `StartIfWaiting` for the guarded form.
    fn handle_start(&mut self) {
        self.session.state = SessionState::InProgress;
        self.session.current_question_index = Some(0);
        self.session.question_started_at = Some(Instant::now());
        tracing::info!(
            join_code = %self.session.join_code,
            players = self.session.players.len(),
            "session started"
        );
    }

    fn current_question(&self) -> Option<CurrentQuestion> {
        let index = self.session.current_question_index?;
        let question = self.quiz.questions.get(index)?;
        Some(CurrentQuestion {
            index,
            question: question.clone(),
            time_limit: self.quiz.time_limit(),
            total_questions: self.quiz.question_count(),
        })
    }

    /// The key is reported whenever a question is current, scored or not,
    /// so an unknown player looks exactly like a wrong answer.
    fn handle_submit(&mut self, player_id: PlayerId, option_index: usize) -> AnswerGrade {
        let Some(question) = self
            .session
            .current_question_index
            .and_then(|index| self.quiz.questions.get(index))
        else {
            return AnswerGrade::default();
        };
        let unscored = AnswerGrade {
            correct: false,
            correct_option: Some(question.correct_option_index),
        };
        if !self.session.state.is_active() {
            return unscored;
        }
        let Some(player) = self.session.players.get_mut(&player_id) else {
            return unscored;
        };

        let now = Instant::now();
        player.total_answered += 1;
        player.last_answer_at = Some(now);

        let correct = option_index == question.correct_option_index;
        if correct {
            let elapsed = self
                .session
                .question_started_at
                .map(|started| now.saturating_duration_since(started))
                .unwrap_or_default();
            let awarded = scoring::award(question.points, self.quiz.time_limit(), elapsed);
            player.score += awarded;
            player.correct_count += 1;
            tracing::debug!(
                join_code = %self.session.join_code,
                %player_id,
                awarded,
                "correct answer"
            );
        }

        AnswerGrade {
            correct,
            correct_option: Some(question.correct_option_index),
        }
    }

    fn handle_advance(&mut self) {
        if self.session.state.is_finished() {
            return;
        }

        let next = self.session.current_question_index.map_or(0, |i| i + 1);
        if next >= self.quiz.question_count() {
            self.session.state = SessionState::Finished;
            self.finished_at = Some(Instant::now());
            tracing::info!(join_code = %self.session.join_code, "session finished");
        } else {
            self.session.current_question_index = Some(next);
            self.session.question_started_at = Some(Instant::now());
            self.session.state = SessionState::InProgress;
            tracing::debug!(
                join_code = %self.session.join_code,
                question = next,
                "advanced to next question"
            );
        }
    }

    fn handle_remove(&mut self, player_id: PlayerId) -> bool {
        let removed = self.session.players.remove(&player_id).is_some();
        if removed {
            tracing::info!(
                join_code = %self.session.join_code,
                %player_id,
                players = self.session.players.len(),
                "player left"
            );
        }
        removed
    }

    fn evict(&mut self) {
        archive::record_best_effort(self.archive.as_ref(), &self.session);
        self.receiver.close();
        tracing::info!(
            join_code = %self.session.join_code,
            session_id = %self.session.id,
            "finished session evicted"
        );
    }
}

/// Spawns a session actor and returns a handle to it.
///
/// `config.command_buffer` bounds the command channel; callers wait when
/// it is full.
pub(crate) fn spawn_session(
    session: Session,
    quiz: Arc<Quiz>,
    config: &EngineConfig,
    archive: Arc<dyn SessionArchive>,
) -> SessionHandle {
    let (sender, receiver) = mpsc::channel(config.command_buffer.max(1));
    let handle = SessionHandle {
        join_code: session.join_code,
        sender,
    };

    let actor = SessionActor {
        session,
        quiz,
        config: config.clone(),
        archive,
        finished_at: None,
        receiver,
    };
    tokio::spawn(actor.run());

    handle
}
