//! Message router: turns inbound envelopes into engine calls and engine
//! results into outbound envelopes.
//!
//! The router never touches a socket. Everything it sends goes through the
//! [`ConnectionRegistry`], which queues envelopes on per-connection
//! channels, so the router can be driven entirely in-process.

use std::sync::Arc;

use quizforge_engine::{GameEngine, QuizStore};
use quizforge_protocol::{
    AnswerResult, ClientMessage, Codec, CreateSession, Envelope, GameEnded, JoinCode,
    JoinSession, PlayerId, PlayerJoined, PlayerLeft, ServerMessage, SessionCreated,
    SubmitAnswer,
};
use quizforge_registry::{Association, ConnectionRegistry, ConnectionSender};
use quizforge_transport::ConnectionId;

use crate::QuizforgeError;

/// The identity a connection acts under, as host or player.
pub fn player_id_for(conn: ConnectionId) -> PlayerId {
    PlayerId(conn.into_inner())
}

/// Routes messages between connections and the game engine.
pub struct MessageRouter<Q, C> {
    engine: Arc<GameEngine<Q>>,
    registry: Arc<ConnectionRegistry>,
    codec: C,
}

impl<Q, C> MessageRouter<Q, C>
where
    Q: QuizStore,
    C: Codec,
{
    pub fn new(engine: Arc<GameEngine<Q>>, registry: Arc<ConnectionRegistry>, codec: C) -> Self {
        Self {
            engine,
            registry,
            codec,
        }
    }

    pub fn engine(&self) -> &GameEngine<Q> {
        &self.engine
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Makes a freshly accepted connection addressable.
    pub fn connect(&self, conn: ConnectionId, sender: ConnectionSender) {
        self.registry.connect(conn, sender);
    }

    /// Handles one raw inbound frame. Anything that fails to decode is
    /// answered with a `MALFORMED_MESSAGE` error.
    pub async fn handle_frame(&self, conn: ConnectionId, data: &[u8]) {
        let message = self
            .codec
            .decode::<Envelope>(data)
            .and_then(|envelope| ClientMessage::try_from(&envelope));
        match message {
            Ok(message) => self.handle(conn, message).await,
            Err(e) => {
                tracing::debug!(%conn, error = %e, "failed to decode inbound frame");
                self.reject(conn, &e.into());
            }
        }
    }

    /// Handles one decoded message. Failures are reported to `conn` alone
    /// and never close it.
    pub async fn handle(&self, conn: ConnectionId, message: ClientMessage) {
        let kind = message.kind();
        tracing::debug!(%conn, %kind, "routing message");

        let result = match message {
            ClientMessage::CreateSession(payload) => self.create_session(conn, payload).await,
            ClientMessage::JoinSession(payload) => self.join_session(conn, payload).await,
            ClientMessage::StartSession => self.start_session(conn).await,
            ClientMessage::SubmitAnswer(payload) => self.submit_answer(conn, payload).await,
            ClientMessage::NextQuestion => self.next_question(conn).await,
            ClientMessage::EndSession => self.end_session(conn).await,
        };

        if let Err(e) = result {
            tracing::debug!(%conn, %kind, error = %e, "message rejected");
            self.reject(conn, &e);
        }
    }

    /// Cleans up after a closed connection. If it was playing, the player
    /// is dropped from the session and everyone left is told.
    pub async fn handle_disconnect(&self, conn: ConnectionId) {
        let Association {
            join_code,
            player_id,
        } = self.registry.unregister(conn);
        let (Some(join_code), Some(player_id)) = (join_code, player_id) else {
            return;
        };

        self.depart(join_code, player_id).await;
        tracing::info!(%conn, %join_code, %player_id, "participant disconnected");
    }

    /// Drops `player_id` from `join_code` and tells whoever is still there.
    async fn depart(&self, join_code: JoinCode, player_id: PlayerId) {
        self.engine.remove_player(join_code, player_id).await;
        match ServerMessage::PlayerLeft(PlayerLeft { player_id }).into_envelope() {
            Ok(envelope) => {
                self.registry
                    .broadcast(join_code, envelope.with_player(player_id));
            }
            Err(e) => tracing::warn!(%join_code, error = %e, "failed to encode PLAYER_LEFT"),
        }
    }

    /// Moves `conn` under `join_code` as `player_id`. If it was in another
    /// session, it leaves that one the same way a disconnect would.
    async fn enter(
        &self,
        conn: ConnectionId,
        join_code: JoinCode,
        player_id: PlayerId,
    ) -> Result<(), QuizforgeError> {
        let previous = self.registry.association(conn);
        self.registry.register(conn, join_code)?;
        self.registry.associate_player(conn, player_id)?;

        if let Association {
            join_code: Some(old_code),
            player_id: Some(old_player),
        } = previous
        {
            if old_code != join_code {
                self.depart(old_code, old_player).await;
                tracing::info!(%conn, from = %old_code, to = %join_code, "participant switched sessions");
            }
        }
        Ok(())
    }

    async fn create_session(
        &self,
        conn: ConnectionId,
        payload: CreateSession,
    ) -> Result<(), QuizforgeError> {
        let host_id = player_id_for(conn);
        let session = self
            .engine
            .create_session(&payload.quiz_id, host_id)
            .await?;

        self.enter(conn, session.join_code, host_id).await?;

        let reply = ServerMessage::SessionCreated(SessionCreated {
            join_code: session.join_code,
            session_id: session.id,
        })
        .into_envelope()?
        .with_session(session.id)
        .with_player(host_id);
        self.registry.unicast(conn, reply)?;
        Ok(())
    }

    async fn join_session(
        &self,
        conn: ConnectionId,
        payload: JoinSession,
    ) -> Result<(), QuizforgeError> {
        let JoinSession {
            join_code,
            display_name,
        } = payload;
        let player_id = player_id_for(conn);
        let session = self
            .engine
            .join_session(join_code, player_id, display_name.clone())
            .await?;

        self.enter(conn, join_code, player_id).await?;

        let joined = ServerMessage::PlayerJoined(PlayerJoined {
            player_id,
            display_name,
            players: session.standings(),
        })
        .into_envelope()?
        .with_session(session.id);

        self.registry
            .unicast(conn, joined.clone().with_player(player_id))?;
        self.registry.broadcast(join_code, joined);
        Ok(())
    }

    async fn start_session(&self, conn: ConnectionId) -> Result<(), QuizforgeError> {
        let join_code = self.require_session(conn)?;

        let session = self.engine.start_if_waiting(join_code).await?;
        let question = self
            .engine
            .current_question(join_code)
            .await?
            .ok_or(QuizforgeError::NoActiveQuestion(join_code))?;

        let envelope = ServerMessage::SessionStarted(question.view())
            .into_envelope()?
            .with_session(session.id);
        self.registry.broadcast(join_code, envelope);
        Ok(())
    }

    async fn submit_answer(
        &self,
        conn: ConnectionId,
        payload: SubmitAnswer,
    ) -> Result<(), QuizforgeError> {
        let association = self.registry.association(conn);
        let (Some(join_code), Some(player_id)) = (association.join_code, association.player_id)
        else {
            return Err(QuizforgeError::NotInSession(conn));
        };

        let grade = self
            .engine
            .grade_answer(join_code, player_id, payload.option_index)
            .await;
        let leaderboard = self
            .engine
            .leaderboard(join_code)
            .await
            .iter()
            .map(|player| player.standing())
            .collect();

        // Unicast only: anyone still thinking must not see the key.
        let envelope = ServerMessage::AnswerResult(AnswerResult {
            correct: grade.correct,
            correct_option: grade.correct_option,
            leaderboard,
        })
        .into_envelope()?
        .with_player(player_id);
        self.registry.unicast(conn, envelope)?;
        Ok(())
    }

    async fn next_question(&self, conn: ConnectionId) -> Result<(), QuizforgeError> {
        let join_code = self.require_session(conn)?;
        let session = self.engine.advance_question(join_code).await?;

        let message = if session.state.is_finished() {
            tracing::info!(%join_code, "game over");
            ServerMessage::GameEnded(GameEnded {
                leaderboard: session.standings(),
            })
        } else {
            let question = self
                .engine
                .current_question(join_code)
                .await?
                .ok_or(QuizforgeError::NoActiveQuestion(join_code))?;
            ServerMessage::Question(question.view())
        };

        let envelope = message.into_envelope()?.with_session(session.id);
        self.registry.broadcast(join_code, envelope);
        Ok(())
    }

    async fn end_session(&self, conn: ConnectionId) -> Result<(), QuizforgeError> {
        let join_code = self.require_session(conn)?;
        let session = self.engine.session(join_code).await?;

        let envelope = ServerMessage::GameEnded(GameEnded {
            leaderboard: session.standings(),
        })
        .into_envelope()?
        .with_session(session.id);
        self.registry.broadcast(join_code, envelope);
        Ok(())
    }

    fn require_session(&self, conn: ConnectionId) -> Result<JoinCode, QuizforgeError> {
        self.registry
            .association(conn)
            .join_code
            .ok_or(QuizforgeError::NotInSession(conn))
    }

    /// Sends an `ERROR` envelope describing `error` to `conn`.
    fn reject(&self, conn: ConnectionId, error: &QuizforgeError) {
        let envelope = match ServerMessage::error(error.error_code(), error.to_string())
            .into_envelope()
        {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(%conn, error = %e, "failed to encode error reply");
                return;
            }
        };
        if let Err(e) = self.registry.unicast(conn, envelope) {
            tracing::debug!(%conn, error = %e, "error reply not delivered");
        }
    }
}
