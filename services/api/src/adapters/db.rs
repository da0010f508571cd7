//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use study_assistant_core::domain::{
    Answer, Attempt, Flashcard, FlashcardSet, Material, NewQuiz, OwnedLookup, Question, Quiz,
    ScheduleEntry, User, UserCredentials, UserId,
};
use study_assistant_core::ports::{DatabaseService, PortError, PortResult};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "user_id, username, email, hashed_password";
const SCHEDULE_COLUMNS: &str =
    "id, user_id, date, topic, duration, details, subtopics, completed, delayed";

#[derive(FromRow)]
struct UserRecord {
    user_id: i64,
    username: String,
    email: String,
    hashed_password: String,
}
impl UserRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            username: self.username,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct QuizRecord {
    id: Uuid,
    user_id: i64,
    file_name: Option<String>,
    file_url: Option<String>,
    questions: Json<Vec<Question>>,
    created_at: DateTime<Utc>,
}
impl QuizRecord {
    fn to_domain(self, attempts: Vec<Attempt>) -> Quiz {
        Quiz {
            id: self.id,
            user_id: self.user_id,
            file_name: self.file_name,
            file_url: self.file_url,
            questions: self.questions.0,
            attempts,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct AttemptRecord {
    user_id: i64,
    submitted_at: DateTime<Utc>,
    answers: Json<Vec<Answer>>,
    score: i32,
    accuracy: f64,
    duration_seconds: Option<i32>,
}
impl AttemptRecord {
    fn to_domain(self) -> Attempt {
        Attempt {
            user_id: self.user_id,
            submitted_at: self.submitted_at,
            answers: self.answers.0,
            score: self.score.max(0) as u32,
            accuracy: self.accuracy,
            duration_seconds: self.duration_seconds.map(|d| d.max(0) as u32),
        }
    }
}

#[derive(FromRow)]
struct ScheduleRecord {
    id: i64,
    user_id: i64,
    date: DateTime<Utc>,
    topic: String,
    duration: f64,
    details: Option<String>,
    subtopics: Vec<String>,
    completed: bool,
    delayed: bool,
}
impl ScheduleRecord {
    fn to_domain(self) -> ScheduleEntry {
        ScheduleEntry {
            id: self.id,
            user_id: self.user_id,
            date: self.date,
            topic: self.topic,
            duration: self.duration,
            details: self.details,
            subtopics: self.subtopics,
            completed: self.completed,
            delayed: self.delayed,
        }
    }
}

#[derive(FromRow)]
struct MaterialRecord {
    file_id: Uuid,
    username: String,
    file_name: String,
    url: String,
    public_id: String,
    upload_date: DateTime<Utc>,
}
impl MaterialRecord {
    fn to_domain(self) -> Material {
        Material {
            file_id: self.file_id,
            username: self.username,
            file_name: self.file_name,
            url: self.url,
            public_id: self.public_id,
            upload_date: self.upload_date,
        }
    }
}

#[derive(FromRow)]
struct FlashcardSetRecord {
    id: i64,
    username: String,
    file_id: Uuid,
    file_name: String,
    cards: Json<Vec<Flashcard>>,
    tags: Vec<String>,
}
impl FlashcardSetRecord {
    fn to_domain(self) -> FlashcardSet {
        FlashcardSet {
            id: self.id,
            username: self.username,
            file_id: self.file_id,
            file_name: self.file_name,
            cards: self.cards.0,
            tags: self.tags,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn reserve_sequence(&self, name: &str, count: i64) -> PortResult<i64> {
        // One statement: concurrent callers serialize on the row lock, never on a read.
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO counters (name, seq) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET seq = counters.seq + EXCLUDED.seq \
             RETURNING seq",
        )
        .bind(name)
        .bind(count)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn create_user(&self, credentials: UserCredentials) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (user_id, username, email, hashed_password) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(credentials.user_id)
        .bind(&credentials.username)
        .bind(&credentials.email)
        .bind(&credentials.hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                PortError::Conflict(format!("Email {} is already registered", credentials.email))
            }
            _ => unexpected(e),
        })?;

        Ok(record.to_domain().to_user())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(UserRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: UserId) -> PortResult<User> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(|record| record.to_domain().to_user())
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn create_quiz(&self, quiz: NewQuiz) -> PortResult<Quiz> {
        let record = sqlx::query_as::<_, QuizRecord>(
            "INSERT INTO quizzes (id, user_id, file_name, file_url, questions) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, file_name, file_url, questions, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(quiz.user_id)
        .bind(quiz.file_name)
        .bind(quiz.file_url)
        .bind(Json(quiz.questions))
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain(Vec::new()))
    }

    async fn get_quiz_by_id(&self, quiz_id: Uuid) -> PortResult<Quiz> {
        let record = sqlx::query_as::<_, QuizRecord>(
            "SELECT id, user_id, file_name, file_url, questions, created_at \
             FROM quizzes WHERE id = $1",
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Quiz {} not found", quiz_id)))?;

        let attempts = sqlx::query_as::<_, AttemptRecord>(
            "SELECT user_id, submitted_at, answers, score, accuracy, duration_seconds \
             FROM quiz_attempts WHERE quiz_id = $1 ORDER BY seq ASC",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?
        .into_iter()
        .map(AttemptRecord::to_domain)
        .collect();

        Ok(record.to_domain(attempts))
    }

    async fn append_quiz_attempt(&self, quiz_id: Uuid, attempt: &Attempt) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO quiz_attempts \
             (quiz_id, user_id, submitted_at, answers, score, accuracy, duration_seconds) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(quiz_id)
        .bind(attempt.user_id)
        .bind(attempt.submitted_at)
        .bind(Json(attempt.answers.clone()))
        .bind(attempt.score as i32)
        .bind(attempt.accuracy)
        .bind(attempt.duration_seconds.map(|d| d as i32))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn insert_schedule_entries(&self, entries: &[ScheduleEntry]) -> PortResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "INSERT INTO schedule_entries ({SCHEDULE_COLUMNS}) "
        ));
        builder.push_values(entries, |mut row, entry| {
            row.push_bind(entry.id)
                .push_bind(entry.user_id)
                .push_bind(entry.date)
                .push_bind(entry.topic.clone())
                .push_bind(entry.duration)
                .push_bind(entry.details.clone())
                .push_bind(entry.subtopics.clone())
                .push_bind(entry.completed)
                .push_bind(entry.delayed);
        });

        builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_schedule_for_user(&self, user_id: UserId) -> PortResult<Vec<ScheduleEntry>> {
        let records = sqlx::query_as::<_, ScheduleRecord>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedule_entries WHERE user_id = $1 ORDER BY date, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(ScheduleRecord::to_domain).collect())
    }

    async fn get_schedule_entry(&self, lookup: OwnedLookup<i64>) -> PortResult<ScheduleEntry> {
        sqlx::query_as::<_, ScheduleRecord>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedule_entries WHERE id = $1 AND user_id = $2"
        ))
        .bind(lookup.id)
        .bind(lookup.owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(ScheduleRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("Schedule entry {} not found", lookup.id)))
    }

    async fn set_schedule_completed(
        &self,
        lookup: OwnedLookup<i64>,
        completed: bool,
    ) -> PortResult<ScheduleEntry> {
        sqlx::query_as::<_, ScheduleRecord>(&format!(
            "UPDATE schedule_entries SET completed = $3 WHERE id = $1 AND user_id = $2 \
             RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(lookup.id)
        .bind(lookup.owner)
        .bind(completed)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .map(ScheduleRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("Schedule entry {} not found", lookup.id)))
    }

    async fn mark_overdue_entries_delayed(&self, now: DateTime<Utc>) -> PortResult<u64> {
        // Same predicate as `ScheduleEntry::is_overdue`.
        let result = sqlx::query(
            "UPDATE schedule_entries SET delayed = TRUE \
             WHERE completed = FALSE AND delayed = FALSE AND date < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.rows_affected())
    }

    async fn create_material(&self, material: &Material) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO materials (file_id, username, file_name, url, public_id, upload_date) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(material.file_id)
        .bind(&material.username)
        .bind(&material.file_name)
        .bind(&material.url)
        .bind(&material.public_id)
        .bind(material.upload_date)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_materials(&self) -> PortResult<Vec<Material>> {
        let records = sqlx::query_as::<_, MaterialRecord>(
            "SELECT file_id, username, file_name, url, public_id, upload_date \
             FROM materials ORDER BY upload_date DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(MaterialRecord::to_domain).collect())
    }

    async fn create_flashcard_set(&self, set: &FlashcardSet) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO flashcard_sets (id, username, file_id, file_name, cards, tags) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(set.id)
        .bind(&set.username)
        .bind(set.file_id)
        .bind(&set.file_name)
        .bind(Json(set.cards.clone()))
        .bind(set.tags.clone())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_flashcard_sets(&self) -> PortResult<Vec<FlashcardSet>> {
        let records = sqlx::query_as::<_, FlashcardSetRecord>(
            "SELECT id, username, file_id, file_name, cards, tags \
             FROM flashcard_sets ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(FlashcardSetRecord::to_domain).collect())
    }
}
