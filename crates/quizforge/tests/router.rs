//! Router flows driven in-process: connections are plain channels, so every
//! envelope a flow produces can be inspected directly.

use std::sync::Arc;

use quizforge::MessageRouter;
use quizforge_engine::{GameEngine, InMemoryQuizStore, Question, Quiz};
use quizforge_protocol::{
    ClientMessage, CreateSession, Envelope, ErrorCode, JoinCode, JoinSession, JsonCodec,
    MessageKind, PlayerId, QuizId, ServerMessage, SubmitAnswer,
};
use quizforge_registry::{ConnectionReceiver, ConnectionRegistry};
use quizforge_transport::ConnectionId;
use tokio::sync::mpsc;

// =========================================================================
// Harness
// =========================================================================

type Router = MessageRouter<InMemoryQuizStore, JsonCodec>;

fn quiz() -> Quiz {
    Quiz {
        id: QuizId::new("science"),
        title: "Science".into(),
        description: String::new(),
        time_per_question: 20,
        questions: vec![
            Question {
                question_text: "H2O is?".into(),
                options: vec!["Water".into(), "Salt".into()],
                correct_option_index: 0,
                points: 1000,
            },
            Question {
                question_text: "Closest star?".into(),
                options: vec!["Sirius".into(), "Sun".into()],
                correct_option_index: 1,
                points: 500,
            },
        ],
    }
}

fn router() -> Router {
    let engine = Arc::new(GameEngine::new([quiz()].into_iter().collect()));
    MessageRouter::new(engine, Arc::new(ConnectionRegistry::new()), JsonCodec)
}

struct Client {
    conn: ConnectionId,
    rx: ConnectionReceiver,
}

impl Client {
    fn connect(router: &Router, id: u64) -> Self {
        let conn = ConnectionId::new(id);
        let (tx, rx) = mpsc::unbounded_channel();
        router.connect(conn, tx);
        Self { conn, rx }
    }

    fn player_id(&self) -> PlayerId {
        quizforge::player_id_for(self.conn)
    }

    fn next_envelope(&mut self) -> Envelope {
        let outbound = self.rx.try_recv().expect("an envelope should be queued");
        (*outbound).clone()
    }

    fn next(&mut self) -> ServerMessage {
        ServerMessage::try_from(&self.next_envelope()).unwrap()
    }

    fn expect_error(&mut self, expected: ErrorCode) {
        match self.next() {
            ServerMessage::Error(payload) => assert_eq!(payload.code, expected),
            other => panic!("expected ERROR {expected:?}, got {other:?}"),
        }
    }

    /// Everything queued so far, in order.
    fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(outbound) = self.rx.try_recv() {
            messages.push(ServerMessage::try_from(&*outbound).unwrap());
        }
        messages
    }

    fn assert_idle(&mut self) {
        assert!(self.rx.try_recv().is_err(), "no envelope should be queued");
    }
}

async fn create(router: &Router, host: &mut Client) -> JoinCode {
    router
        .handle(
            host.conn,
            ClientMessage::CreateSession(CreateSession {
                quiz_id: QuizId::new("science"),
            }),
        )
        .await;
    match host.next() {
        ServerMessage::SessionCreated(created) => created.join_code,
        other => panic!("expected SESSION_CREATED, got {other:?}"),
    }
}

async fn join(router: &Router, client: &Client, join_code: JoinCode, name: &str) {
    router
        .handle(
            client.conn,
            ClientMessage::JoinSession(JoinSession {
                join_code,
                display_name: name.into(),
            }),
        )
        .await;
}

/// Host plus two joined players, all inboxes drained.
async fn lobby(router: &Router) -> (Client, Client, Client, JoinCode) {
    let mut host = Client::connect(router, 1);
    let mut alice = Client::connect(router, 2);
    let mut bob = Client::connect(router, 3);
    let code = create(router, &mut host).await;
    join(router, &alice, code, "Alice").await;
    join(router, &bob, code, "Bob").await;
    for client in [&mut host, &mut alice, &mut bob] {
        while client.rx.try_recv().is_ok() {}
    }
    (host, alice, bob, code)
}

// =========================================================================
// Create / join
// =========================================================================

#[tokio::test]
async fn test_create_session_replies_to_host_only() {
    let router = router();
    let mut host = Client::connect(&router, 1);
    let mut other = Client::connect(&router, 2);

    let code = create(&router, &mut host).await;

    let association = router.registry().association(host.conn);
    assert_eq!(association.join_code, Some(code));
    assert_eq!(association.player_id, Some(host.player_id()));
    assert!(router.engine().session(code).await.unwrap().players.is_empty());
    host.assert_idle();
    other.assert_idle();
}

#[tokio::test]
async fn test_create_session_unknown_quiz_replies_error() {
    let router = router();
    let mut host = Client::connect(&router, 1);
    router
        .handle(
            host.conn,
            ClientMessage::CreateSession(CreateSession {
                quiz_id: QuizId::new("history"),
            }),
        )
        .await;
    host.expect_error(ErrorCode::QuizNotFound);
    assert_eq!(router.engine().session_count(), 0);
}

#[tokio::test]
async fn test_join_session_confirms_then_broadcasts_roster() {
    let router = router();
    let mut host = Client::connect(&router, 1);
    let mut alice = Client::connect(&router, 2);
    let code = create(&router, &mut host).await;

    join(&router, &alice, code, "Alice").await;

    let confirmation = alice.next_envelope();
    assert_eq!(confirmation.kind, MessageKind::PlayerJoined);
    assert_eq!(confirmation.player_id, Some(alice.player_id()));

    let roster = alice.next_envelope();
    assert_eq!(roster.kind, MessageKind::PlayerJoined);
    assert_eq!(roster.player_id, None);

    match host.next() {
        ServerMessage::PlayerJoined(joined) => {
            assert_eq!(joined.player_id, alice.player_id());
            assert_eq!(joined.display_name, "Alice");
            assert_eq!(joined.players.len(), 1);
        }
        other => panic!("expected PLAYER_JOINED, got {other:?}"),
    }
    host.assert_idle();
    alice.assert_idle();
}

#[tokio::test]
async fn test_join_session_unknown_code_replies_error() {
    let router = router();
    let mut alice = Client::connect(&router, 2);
    join(&router, &alice, JoinCode::new(999_999).unwrap(), "Alice").await;
    alice.expect_error(ErrorCode::SessionNotFound);
    assert_eq!(router.registry().association(alice.conn).join_code, None);
}

#[tokio::test]
async fn test_join_session_after_start_replies_already_started() {
    let router = router();
    let (host, _alice, _bob, code) = lobby(&router).await;
    router.handle(host.conn, ClientMessage::StartSession).await;

    let mut late = Client::connect(&router, 9);
    join(&router, &late, code, "Late").await;
    late.expect_error(ErrorCode::SessionAlreadyStarted);
    late.assert_idle();
}

// =========================================================================
// Gameplay
// =========================================================================

#[tokio::test]
async fn test_start_session_broadcasts_question_without_answer_key() {
    let router = router();
    let (mut host, mut alice, mut bob, _code) = lobby(&router).await;

    router.handle(host.conn, ClientMessage::StartSession).await;

    for client in [&mut host, &mut alice, &mut bob] {
        let envelope = client.next_envelope();
        assert_eq!(envelope.kind, MessageKind::SessionStarted);
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(!json.contains("correct"));

        match ServerMessage::try_from(&envelope).unwrap() {
            ServerMessage::SessionStarted(view) => {
                assert_eq!(view.question_index, 0);
                assert_eq!(view.question_text, "H2O is?");
                assert_eq!(view.time_limit, 20);
                assert_eq!(view.total_questions, 2);
            }
            other => panic!("expected SESSION_STARTED, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_start_session_twice_replies_already_started() {
    let router = router();
    let (mut host, mut alice, _bob, _code) = lobby(&router).await;
    router.handle(host.conn, ClientMessage::StartSession).await;
    host.next();
    alice.next();

    router.handle(host.conn, ClientMessage::StartSession).await;
    host.expect_error(ErrorCode::SessionAlreadyStarted);
    alice.assert_idle();
}

#[tokio::test]
async fn test_start_session_concurrent_starts_begin_game_once() {
    let router = router();
    let (mut host, mut alice, mut bob, code) = lobby(&router).await;

    tokio::join!(
        router.handle(host.conn, ClientMessage::StartSession),
        router.handle(alice.conn, ClientMessage::StartSession),
    );

    let started = |messages: &[ServerMessage]| {
        messages
            .iter()
            .filter(|m| matches!(m, ServerMessage::SessionStarted(_)))
            .count()
    };
    let refused = |messages: &[ServerMessage]| {
        messages
            .iter()
            .filter(|m| {
                matches!(m, ServerMessage::Error(e) if e.code == ErrorCode::SessionAlreadyStarted)
            })
            .count()
    };
    let (host_seen, alice_seen, bob_seen) = (host.drain(), alice.drain(), bob.drain());
    for seen in [&host_seen, &alice_seen, &bob_seen] {
        assert_eq!(started(seen), 1);
    }
    assert_eq!(refused(&host_seen) + refused(&alice_seen), 1);
    assert_eq!(refused(&bob_seen), 0);

    let session = router.engine().session(code).await.unwrap();
    assert_eq!(session.current_question_index, Some(0));
}

#[tokio::test]
async fn test_submit_answer_non_player_result_matches_wrong_answer() {
    let router = router();
    let (mut host, mut alice, mut bob, _code) = lobby(&router).await;
    router.handle(host.conn, ClientMessage::StartSession).await;
    for client in [&mut host, &mut alice, &mut bob] {
        client.next();
    }

    // The host is registered under the code but is not a player.
    for client in [&host, &alice] {
        router
            .handle(
                client.conn,
                ClientMessage::SubmitAnswer(SubmitAnswer { option_index: 1 }),
            )
            .await;
    }

    let result = |client: &mut Client| match client.next() {
        ServerMessage::AnswerResult(result) => (result.correct, result.correct_option),
        other => panic!("expected ANSWER_RESULT, got {other:?}"),
    };
    let from_host = result(&mut host);
    let from_alice = result(&mut alice);
    assert_eq!(from_alice, (false, Some(0)));
    assert_eq!(from_host, from_alice);
}

#[tokio::test]
async fn test_submit_answer_result_is_unicast_only() {
    let router = router();
    let (mut host, mut alice, mut bob, _code) = lobby(&router).await;
    router.handle(host.conn, ClientMessage::StartSession).await;
    for client in [&mut host, &mut alice, &mut bob] {
        client.next();
    }

    router
        .handle(
            alice.conn,
            ClientMessage::SubmitAnswer(SubmitAnswer { option_index: 0 }),
        )
        .await;

    match alice.next() {
        ServerMessage::AnswerResult(result) => {
            assert!(result.correct);
            assert_eq!(result.correct_option, Some(0));
            assert_eq!(result.leaderboard[0].id, alice.player_id());
            assert!(result.leaderboard[0].score >= 1000);
            assert_eq!(result.leaderboard.len(), 2);
        }
        other => panic!("expected ANSWER_RESULT, got {other:?}"),
    }
    host.assert_idle();
    bob.assert_idle();
}

#[tokio::test]
async fn test_next_question_broadcasts_question_then_game_ended() {
    let router = router();
    let (mut host, mut alice, _bob, _code) = lobby(&router).await;
    router.handle(host.conn, ClientMessage::StartSession).await;
    host.next();
    alice.next();

    router.handle(host.conn, ClientMessage::NextQuestion).await;
    match alice.next() {
        ServerMessage::Question(view) => {
            assert_eq!(view.question_index, 1);
            assert_eq!(view.question_text, "Closest star?");
        }
        other => panic!("expected QUESTION, got {other:?}"),
    }
    host.next();

    router.handle(host.conn, ClientMessage::NextQuestion).await;
    match alice.next() {
        ServerMessage::GameEnded(ended) => assert_eq!(ended.leaderboard.len(), 2),
        other => panic!("expected GAME_ENDED, got {other:?}"),
    }
    assert!(matches!(host.next(), ServerMessage::GameEnded(_)));
}

#[tokio::test]
async fn test_end_session_broadcasts_leaderboard_without_finishing() {
    let router = router();
    let (mut host, mut alice, mut bob, code) = lobby(&router).await;

    router.handle(host.conn, ClientMessage::EndSession).await;

    for client in [&mut host, &mut alice, &mut bob] {
        assert!(matches!(client.next(), ServerMessage::GameEnded(_)));
    }
    let session = router.engine().session(code).await.unwrap();
    assert!(session.state.is_joinable());
}

// =========================================================================
// Errors
// =========================================================================

#[tokio::test]
async fn test_session_messages_without_session_reply_not_in_session() {
    let router = router();
    let mut stranger = Client::connect(&router, 5);

    for message in [
        ClientMessage::StartSession,
        ClientMessage::NextQuestion,
        ClientMessage::EndSession,
        ClientMessage::SubmitAnswer(SubmitAnswer { option_index: 0 }),
    ] {
        router.handle(stranger.conn, message).await;
        stranger.expect_error(ErrorCode::NotInSession);
    }
}

#[tokio::test]
async fn test_handle_frame_bad_input_replies_malformed() {
    let router = router();
    let mut client = Client::connect(&router, 5);

    let frames: [&[u8]; 4] = [
        b"not json",
        br#"{"kind":"TELEPORT"}"#,
        br#"{"kind":"QUESTION","payload":{}}"#,
        br#"{"kind":"JOIN_SESSION","payload":{"joinCode":"12"}}"#,
    ];
    for frame in frames {
        router.handle_frame(client.conn, frame).await;
        client.expect_error(ErrorCode::MalformedMessage);
    }
    // Still usable afterwards.
    router
        .handle_frame(client.conn, br#"{"kind":"CREATE_SESSION","payload":{"quizId":"science"}}"#)
        .await;
    assert!(matches!(client.next(), ServerMessage::SessionCreated(_)));
}

// =========================================================================
// Disconnects
// =========================================================================

#[tokio::test]
async fn test_disconnect_removes_player_and_notifies_rest_once() {
    let router = router();
    let (mut host, alice, mut bob, code) = lobby(&router).await;

    router.handle_disconnect(alice.conn).await;

    for client in [&mut host, &mut bob] {
        match client.next() {
            ServerMessage::PlayerLeft(left) => assert_eq!(left.player_id, alice.player_id()),
            other => panic!("expected PLAYER_LEFT, got {other:?}"),
        }
        client.assert_idle();
    }

    let session = router.engine().session(code).await.unwrap();
    assert_eq!(session.players.len(), 1);
    assert!(session.players.contains_key(&bob.player_id()));
    assert!(!router.registry().members(code).contains(&alice.conn));
}

#[tokio::test]
async fn test_join_other_session_leaves_previous_one() {
    let router = router();
    let (mut host, mut alice, mut bob, first) = lobby(&router).await;
    let mut other_host = Client::connect(&router, 10);
    let second = create(&router, &mut other_host).await;

    join(&router, &alice, second, "Alice").await;
    assert!(matches!(alice.next(), ServerMessage::PlayerJoined(_)));

    for client in [&mut host, &mut bob] {
        match client.next() {
            ServerMessage::PlayerLeft(left) => assert_eq!(left.player_id, alice.player_id()),
            other => panic!("expected PLAYER_LEFT, got {other:?}"),
        }
    }
    let old = router.engine().session(first).await.unwrap();
    assert!(!old.players.contains_key(&alice.player_id()));
    assert!(!router.registry().members(first).contains(&alice.conn));

    router.handle_disconnect(alice.conn).await;
    let old = router.engine().session(first).await.unwrap();
    let new = router.engine().session(second).await.unwrap();
    assert_eq!(old.players.len(), 1);
    assert!(new.players.is_empty());
}

#[tokio::test]
async fn test_create_while_in_session_leaves_previous_one() {
    let router = router();
    let (mut host, mut alice, mut bob, first) = lobby(&router).await;

    let second = create(&router, &mut alice).await;
    assert_ne!(first, second);

    match host.next() {
        ServerMessage::PlayerLeft(left) => assert_eq!(left.player_id, alice.player_id()),
        other => panic!("expected PLAYER_LEFT, got {other:?}"),
    }
    bob.next();
    let old = router.engine().session(first).await.unwrap();
    assert_eq!(old.players.len(), 1);
    assert_eq!(router.registry().association(alice.conn).join_code, Some(second));
}

#[tokio::test]
async fn test_join_same_session_again_does_not_announce_departure() {
    let router = router();
    let (mut host, alice, _bob, code) = lobby(&router).await;

    join(&router, &alice, code, "Alice again").await;

    assert!(matches!(host.next(), ServerMessage::PlayerJoined(_)));
    host.assert_idle();
    let session = router.engine().session(code).await.unwrap();
    assert_eq!(session.players[&alice.player_id()].display_name, "Alice again");
}

#[tokio::test]
async fn test_disconnect_unassociated_connection_is_silent() {
    let router = router();
    let (mut host, _alice, _bob, _code) = lobby(&router).await;
    let idle = Client::connect(&router, 42);

    router.handle_disconnect(idle.conn).await;
    host.assert_idle();
    assert_eq!(router.registry().len(), 3);
}
