//! crates/study_assistant_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Value types that are persisted as embedded documents (questions, answers,
//! flashcards) derive serde so adapters can store them as JSON as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Numeric user identifier handed out by the `userId` counter.
pub type UserId = i64;

/// Names of the store-level sequence counters.
pub mod counters {
    pub const USER_ID: &str = "userId";
    pub const SCHEDULE_ID: &str = "scheduleId";
    pub const FLASHCARD_SET_ID: &str = "flashcardSetId";
}

//=========================================================================================
// Identity
//=========================================================================================

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

impl UserCredentials {
    pub fn to_user(&self) -> User {
        User {
            user_id: self.user_id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// A lookup of a user-owned record where ownership is part of the match predicate.
///
/// A record that exists but belongs to someone else is indistinguishable from a
/// record that does not exist: both come back as `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedLookup<Id> {
    pub id: Id,
    pub owner: UserId,
}

impl<Id> OwnedLookup<Id> {
    pub fn new(id: Id, owner: UserId) -> Self {
        Self { id, owner }
    }
}

//=========================================================================================
// Quizzes
//=========================================================================================

/// A multiple-choice question. `answer` is the text of the correct option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

/// The graded outcome for one question of a quiz inside an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_index: usize,
    pub selected_option: Option<String>,
    pub is_skipped: bool,
    pub is_correct: bool,
}

/// One scored submission. Attempts are appended to a quiz and never changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub user_id: UserId,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<Answer>,
    pub score: u32,
    pub accuracy: f64,
    pub duration_seconds: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Quiz {
    pub id: Uuid,
    pub user_id: UserId,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub questions: Vec<Question>,
    pub attempts: Vec<Attempt>,
    pub created_at: DateTime<Utc>,
}

/// The data needed to persist a freshly generated quiz.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub user_id: UserId,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub questions: Vec<Question>,
}

//=========================================================================================
// Schedules
//=========================================================================================

/// A schedule item in canonical form, after alias normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleItem {
    pub date: DateTime<Utc>,
    pub topic: String,
    pub duration: f64,
    pub details: Option<String>,
    pub subtopics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub id: i64,
    pub user_id: UserId,
    pub date: DateTime<Utc>,
    pub topic: String,
    pub duration: f64,
    pub details: Option<String>,
    pub subtopics: Vec<String>,
    pub completed: bool,
    pub delayed: bool,
}

impl ScheduleEntry {
    /// Builds a fresh, incomplete entry from a normalized item.
    pub fn from_item(id: i64, user_id: UserId, item: ScheduleItem) -> Self {
        Self {
            id,
            user_id,
            date: item.date,
            topic: item.topic,
            duration: item.duration,
            details: item.details,
            subtopics: item.subtopics,
            completed: false,
            delayed: false,
        }
    }

    /// The delay sweep predicate: incomplete, not yet delayed, and due strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && !self.delayed && self.date < now
    }
}

/// What the topic content generator receives for one schedule entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicRequest {
    pub topic: String,
    pub details: Option<String>,
    pub subtopics: Vec<String>,
}

impl From<&ScheduleEntry> for TopicRequest {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            topic: entry.topic.clone(),
            details: entry.details.clone(),
            subtopics: entry.subtopics.clone(),
        }
    }
}

//=========================================================================================
// Materials & Flashcards
//=========================================================================================

/// An uploaded document, as stored in external object storage.
#[derive(Debug, Clone)]
pub struct Material {
    pub file_id: Uuid,
    pub username: String,
    pub file_name: String,
    pub url: String,
    pub public_id: String,
    pub upload_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct FlashcardSet {
    pub id: i64,
    pub username: String,
    pub file_id: Uuid,
    pub file_name: String,
    pub cards: Vec<Flashcard>,
    pub tags: Vec<String>,
}

/// Where object storage put an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub public_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(date: DateTime<Utc>, completed: bool, delayed: bool) -> ScheduleEntry {
        ScheduleEntry {
            id: 1,
            user_id: 1,
            date,
            topic: "Graphs".into(),
            duration: 2.0,
            details: None,
            subtopics: vec![],
            completed,
            delayed,
        }
    }

    #[test]
    fn overdue_requires_incomplete_undelayed_past_entry() {
        let now = Utc::now();
        let yesterday = now - Duration::days(1);

        assert!(entry(yesterday, false, false).is_overdue(now));
        assert!(!entry(yesterday, true, false).is_overdue(now));
        assert!(!entry(yesterday, false, true).is_overdue(now));
        assert!(!entry(now + Duration::days(1), false, false).is_overdue(now));
    }

    #[test]
    fn entry_due_exactly_now_is_not_overdue() {
        let now = Utc::now();
        assert!(!entry(now, false, false).is_overdue(now));
    }
}
