//! The quiz store seam.
//!
//! Quiz authoring and persistence live outside the engine. The engine only
//! asks for a quiz by id when a session is created, and keeps the returned
//! `Arc` for the session's lifetime.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use quizforge_protocol::QuizId;

use crate::model::Quiz;

/// Source of quiz content.
///
/// Implement this over whatever holds your quizzes (a database, a file
/// tree, an HTTP service). Lookups may be slow; the engine awaits them
/// outside any session's critical section.
pub trait QuizStore: Send + Sync + 'static {
    /// Fetches a quiz, or `None` if no quiz has this id.
    fn get_quiz(&self, id: &QuizId) -> impl Future<Output = Option<Arc<Quiz>>> + Send;
}

/// A quiz store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryQuizStore {
    quizzes: DashMap<QuizId, Arc<Quiz>>,
}

impl InMemoryQuizStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON array of quizzes.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let quizzes: Vec<Quiz> = serde_json::from_str(json)?;
        Ok(quizzes.into_iter().collect())
    }

    /// Adds or replaces a quiz. Sessions already running keep the old copy.
    pub fn insert(&self, quiz: Quiz) {
        self.quizzes.insert(quiz.id.clone(), Arc::new(quiz));
    }

    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }
}

impl FromIterator<Quiz> for InMemoryQuizStore {
    fn from_iter<I: IntoIterator<Item = Quiz>>(iter: I) -> Self {
        let store = Self::new();
        for quiz in iter {
            store.insert(quiz);
        }
        store
    }
}

impl QuizStore for InMemoryQuizStore {
    async fn get_quiz(&self, id: &QuizId) -> Option<Arc<Quiz>> {
        self.quizzes.get(id).map(|quiz| Arc::clone(quiz.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOGUE: &str = r#"[
        {"id": "a", "title": "A", "timePerQuestion": 10, "questions": []},
        {"id": "b", "title": "B", "timePerQuestion": 30, "questions": []}
    ]"#;

    #[tokio::test]
    async fn test_from_json_loads_every_quiz() {
        let store = InMemoryQuizStore::from_json(CATALOGUE).unwrap();
        assert_eq!(store.len(), 2);

        let quiz = store.get_quiz(&QuizId::new("b")).await.unwrap();
        assert_eq!(quiz.time_per_question, 30);
    }

    #[tokio::test]
    async fn test_get_quiz_unknown_id_returns_none() {
        let store = InMemoryQuizStore::from_json(CATALOGUE).unwrap();
        assert!(store.get_quiz(&QuizId::new("missing")).await.is_none());
    }

    #[test]
    fn test_from_json_rejects_malformed_catalogue() {
        assert!(InMemoryQuizStore::from_json("{not json").is_err());
    }

    #[tokio::test]
    async fn test_insert_replaces_existing_quiz() {
        let store = InMemoryQuizStore::from_json(CATALOGUE).unwrap();
        store.insert(Quiz {
            id: QuizId::new("a"),
            title: "A v2".into(),
            description: String::new(),
            time_per_question: 5,
            questions: Vec::new(),
        });
        assert_eq!(store.len(), 2);
        let quiz = store.get_quiz(&QuizId::new("a")).await.unwrap();
        assert_eq!(quiz.title, "A v2");
    }
}
