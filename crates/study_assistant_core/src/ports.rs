//! crates/study_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, keeping the core
//! independent of the database, the object store and the AI backend.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{
    Attempt, FlashcardSet, Material, NewQuiz, OwnedLookup, Quiz, ScheduleEntry, StoredObject,
    TopicRequest, User, UserCredentials, UserId,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflicts with an existing item: {0}")]
    Conflict(String),
    #[error("Upstream returned an unusable payload: {0}")]
    InvalidUpstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Counters ---

    /// Atomically adds `count` to the named counter (creating it at zero) and
    /// returns the new value, i.e. the last id of the reserved range.
    async fn reserve_sequence(&self, name: &str, count: i64) -> PortResult<i64>;

    async fn next_sequence(&self, name: &str) -> PortResult<i64> {
        self.reserve_sequence(name, 1).await
    }

    // --- Users ---

    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, credentials: UserCredentials) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: UserId) -> PortResult<User>;

    // --- Quizzes ---
    async fn create_quiz(&self, quiz: NewQuiz) -> PortResult<Quiz>;

    /// Returns the quiz together with its attempts in submission order.
    async fn get_quiz_by_id(&self, quiz_id: Uuid) -> PortResult<Quiz>;

    async fn append_quiz_attempt(&self, quiz_id: Uuid, attempt: &Attempt) -> PortResult<()>;

    // --- Schedule ---
    async fn insert_schedule_entries(&self, entries: &[ScheduleEntry]) -> PortResult<()>;

    async fn get_schedule_for_user(&self, user_id: UserId) -> PortResult<Vec<ScheduleEntry>>;

    async fn get_schedule_entry(&self, lookup: OwnedLookup<i64>) -> PortResult<ScheduleEntry>;

    async fn set_schedule_completed(
        &self,
        lookup: OwnedLookup<i64>,
        completed: bool,
    ) -> PortResult<ScheduleEntry>;

    /// Sets `delayed` on every entry matching [`ScheduleEntry::is_overdue`] in a
    /// single bulk update and returns how many were marked.
    async fn mark_overdue_entries_delayed(&self, now: DateTime<Utc>) -> PortResult<u64>;

    // --- Materials & Flashcards ---
    async fn create_material(&self, material: &Material) -> PortResult<()>;

    /// Newest upload first.
    async fn list_materials(&self) -> PortResult<Vec<Material>>;

    async fn create_flashcard_set(&self, set: &FlashcardSet) -> PortResult<()>;

    /// Ordered by set id.
    async fn list_flashcard_sets(&self) -> PortResult<Vec<FlashcardSet>>;
}

#[async_trait]
pub trait ObjectStorageService: Send + Sync {
    /// Stores the bytes under `file_name` and returns the public location.
    async fn upload(&self, file_name: &str, data: Bytes) -> PortResult<StoredObject>;
}

/// The external AI backend. Every method returns the raw upstream payload;
/// callers run it through [`crate::normalize`] before using it.
#[async_trait]
pub trait StudyAiService: Send + Sync {
    async fn extract_flashcards(&self, file_url: &str) -> PortResult<Value>;

    async fn generate_quiz_from_document(&self, file_url: &str) -> PortResult<Value>;

    async fn generate_quiz_from_prompt(&self, prompt: &str) -> PortResult<Value>;

    async fn generate_schedule(&self, user_message: &str) -> PortResult<Value>;

    async fn ingest_chat_document(&self, file_url: &str) -> PortResult<Value>;

    async fn ask_chat(&self, message: &str) -> PortResult<Value>;
}

#[async_trait]
pub trait TopicContentService: Send + Sync {
    /// Produces structured study content for one topic.
    async fn generate_topic_content(&self, request: &TopicRequest) -> PortResult<Value>;
}
