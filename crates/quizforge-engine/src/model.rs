//! Quiz content and live session records.

use std::collections::HashMap;
use std::time::Duration;

use quizforge_protocol::{JoinCode, PlayerId, PlayerStanding, QuestionView, QuizId, SessionId};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::SessionState;
use crate::scoring;

// ---------------------------------------------------------------------------
// Quiz content
// ---------------------------------------------------------------------------

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_text: String,
    pub options: Vec<String>,
    /// The answer key. Never leaves the server while a question is live.
    pub correct_option_index: usize,
    pub points: u32,
}

/// A quiz as the quiz store hands it out. Immutable once a session uses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Advisory per-question time limit, in seconds.
    pub time_per_question: u64,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_per_question)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// The question a session is currently on, with enough context to render
/// it for clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentQuestion {
    pub index: usize,
    pub question: Question,
    pub time_limit: Duration,
    pub total_questions: usize,
}

impl CurrentQuestion {
    /// The client-facing view. Drops the answer key.
    pub fn view(&self) -> QuestionView {
        QuestionView {
            question_index: self.index,
            question_text: self.question.question_text.clone(),
            options: self.question.options.clone(),
            points: self.question.points,
            time_limit: self.time_limit.as_secs(),
            total_questions: self.total_questions,
        }
    }
}

/// Outcome of one answer submission.
///
/// `correct_option` is the current question's key whenever one exists,
/// whether or not the submission was scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerGrade {
    pub correct: bool,
    pub correct_option: Option<usize>,
}

// ---------------------------------------------------------------------------
// Players and sessions
// ---------------------------------------------------------------------------

/// A participant in a session. The host is not one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub score: u64,
    pub correct_count: u32,
    pub total_answered: u32,
    /// When the player last submitted anything. `None` sorts ahead of
    /// every recorded time on leaderboard ties.
    #[serde(skip)]
    pub last_answer_at: Option<Instant>,
}

impl Player {
    pub fn new(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            score: 0,
            correct_count: 0,
            total_answered: 0,
            last_answer_at: None,
        }
    }

    pub fn standing(&self) -> PlayerStanding {
        PlayerStanding {
            id: self.id,
            display_name: self.display_name.clone(),
            score: self.score,
            correct_count: self.correct_count,
            total_answered: self.total_answered,
        }
    }
}

/// One live run of a quiz.
///
/// The engine hands out clones; the authoritative copy lives inside the
/// session's actor task.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub join_code: JoinCode,
    pub quiz_id: QuizId,
    pub host_id: PlayerId,
    pub state: SessionState,
    /// `None` until the session starts.
    pub current_question_index: Option<usize>,
    pub players: HashMap<PlayerId, Player>,
    #[serde(skip)]
    pub question_started_at: Option<Instant>,
}

impl Session {
    pub fn new(join_code: JoinCode, quiz_id: QuizId, host_id: PlayerId) -> Self {
        Self {
            id: SessionId::new_v4(),
            join_code,
            quiz_id,
            host_id,
            state: SessionState::Waiting,
            current_question_index: None,
            players: HashMap::new(),
            question_started_at: None,
        }
    }

    /// Standings for every player, in leaderboard order.
    pub fn standings(&self) -> Vec<PlayerStanding> {
        scoring::rank(self.players.values().cloned())
            .iter()
            .map(Player::standing)
            .collect()
    }
}
