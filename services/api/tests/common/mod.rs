use api_lib::{
    config::Config,
    web::{router, AppState},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use study_assistant_core::{
    domain::{
        Attempt, FlashcardSet, Material, NewQuiz, OwnedLookup, Quiz, ScheduleEntry,
        StoredObject, TopicRequest, User, UserCredentials, UserId,
    },
    ports::{
        DatabaseService, ObjectStorageService, PortError, PortResult, StudyAiService,
        TopicContentService,
    },
};
use tokio::sync::Mutex;
use uuid::Uuid;

//=========================================================================================
// In-memory database
//=========================================================================================

#[derive(Default)]
struct Store {
    counters: HashMap<String, i64>,
    users: Vec<UserCredentials>,
    quizzes: Vec<Quiz>,
    schedule: Vec<ScheduleEntry>,
    materials: Vec<Material>,
    flashcard_sets: Vec<FlashcardSet>,
}

#[derive(Default)]
pub struct MemoryDb {
    store: Mutex<Store>,
}

#[allow(dead_code)]
impl MemoryDb {
    pub async fn quiz(&self, id: Uuid) -> Option<Quiz> {
        self.store.lock().await.quizzes.iter().find(|q| q.id == id).cloned()
    }

    pub async fn schedule_entries(&self) -> Vec<ScheduleEntry> {
        self.store.lock().await.schedule.clone()
    }

    pub async fn insert_entry(&self, entry: ScheduleEntry) {
        self.store.lock().await.schedule.push(entry);
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn reserve_sequence(&self, name: &str, count: i64) -> PortResult<i64> {
        let mut store = self.store.lock().await;
        let seq = store.counters.entry(name.to_string()).or_insert(0);
        *seq += count;
        Ok(*seq)
    }

    async fn create_user(&self, credentials: UserCredentials) -> PortResult<User> {
        let mut store = self.store.lock().await;
        if store.users.iter().any(|u| u.email == credentials.email) {
            return Err(PortError::Conflict(format!(
                "Email {} is already registered",
                credentials.email
            )));
        }
        let user = credentials.to_user();
        store.users.push(credentials);
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.store
            .lock()
            .await
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User with email {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: UserId) -> PortResult<User> {
        self.store
            .lock()
            .await
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(UserCredentials::to_user)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn create_quiz(&self, quiz: NewQuiz) -> PortResult<Quiz> {
        let quiz = Quiz {
            id: Uuid::new_v4(),
            user_id: quiz.user_id,
            file_name: quiz.file_name,
            file_url: quiz.file_url,
            questions: quiz.questions,
            attempts: Vec::new(),
            created_at: Utc::now(),
        };
        self.store.lock().await.quizzes.push(quiz.clone());
        Ok(quiz)
    }

    async fn get_quiz_by_id(&self, quiz_id: Uuid) -> PortResult<Quiz> {
        self.quiz(quiz_id)
            .await
            .ok_or_else(|| PortError::NotFound(format!("Quiz {} not found", quiz_id)))
    }

    async fn append_quiz_attempt(&self, quiz_id: Uuid, attempt: &Attempt) -> PortResult<()> {
        let mut store = self.store.lock().await;
        let quiz = store
            .quizzes
            .iter_mut()
            .find(|q| q.id == quiz_id)
            .ok_or_else(|| PortError::NotFound(format!("Quiz {} not found", quiz_id)))?;
        quiz.attempts.push(attempt.clone());
        Ok(())
    }

    async fn insert_schedule_entries(&self, entries: &[ScheduleEntry]) -> PortResult<()> {
        self.store.lock().await.schedule.extend_from_slice(entries);
        Ok(())
    }

    async fn get_schedule_for_user(&self, user_id: UserId) -> PortResult<Vec<ScheduleEntry>> {
        let mut entries: Vec<ScheduleEntry> = self
            .store
            .lock()
            .await
            .schedule
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn get_schedule_entry(&self, lookup: OwnedLookup<i64>) -> PortResult<ScheduleEntry> {
        self.store
            .lock()
            .await
            .schedule
            .iter()
            .find(|e| e.id == lookup.id && e.user_id == lookup.owner)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Schedule entry {} not found", lookup.id)))
    }

    async fn set_schedule_completed(
        &self,
        lookup: OwnedLookup<i64>,
        completed: bool,
    ) -> PortResult<ScheduleEntry> {
        let mut store = self.store.lock().await;
        let entry = store
            .schedule
            .iter_mut()
            .find(|e| e.id == lookup.id && e.user_id == lookup.owner)
            .ok_or_else(|| PortError::NotFound(format!("Schedule entry {} not found", lookup.id)))?;
        entry.completed = completed;
        Ok(entry.clone())
    }

    async fn mark_overdue_entries_delayed(&self, now: DateTime<Utc>) -> PortResult<u64> {
        let mut store = self.store.lock().await;
        let mut marked = 0;
        for entry in store.schedule.iter_mut().filter(|e| e.is_overdue(now)) {
            entry.delayed = true;
            marked += 1;
        }
        Ok(marked)
    }

    async fn create_material(&self, material: &Material) -> PortResult<()> {
        self.store.lock().await.materials.push(material.clone());
        Ok(())
    }

    async fn list_materials(&self) -> PortResult<Vec<Material>> {
        let mut materials = self.store.lock().await.materials.clone();
        materials.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
        Ok(materials)
    }

    async fn create_flashcard_set(&self, set: &FlashcardSet) -> PortResult<()> {
        self.store.lock().await.flashcard_sets.push(set.clone());
        Ok(())
    }

    async fn list_flashcard_sets(&self) -> PortResult<Vec<FlashcardSet>> {
        let mut sets = self.store.lock().await.flashcard_sets.clone();
        sets.sort_by_key(|s| s.id);
        Ok(sets)
    }
}

//=========================================================================================
// Fake AI service and object storage
//=========================================================================================

/// Answers every AI call with a canned payload keyed by the operation name and
/// records what it was asked.
#[derive(Default)]
pub struct FakeAi {
    responses: StdMutex<HashMap<&'static str, Value>>,
    calls: StdMutex<Vec<(&'static str, Value)>>,
}

#[allow(dead_code)]
impl FakeAi {
    pub fn respond(&self, operation: &'static str, payload: Value) {
        self.responses.lock().unwrap().insert(operation, payload);
    }

    pub fn calls(&self) -> Vec<(&'static str, Value)> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, operation: &'static str, input: Value) -> PortResult<Value> {
        self.calls.lock().unwrap().push((operation, input));
        self.responses
            .lock()
            .unwrap()
            .get(operation)
            .cloned()
            .ok_or_else(|| PortError::Unexpected(format!("no canned response for {}", operation)))
    }
}

#[async_trait]
impl StudyAiService for FakeAi {
    async fn extract_flashcards(&self, file_url: &str) -> PortResult<Value> {
        self.answer("flashcards", json!(file_url))
    }

    async fn generate_quiz_from_document(&self, file_url: &str) -> PortResult<Value> {
        self.answer("quiz_document", json!(file_url))
    }

    async fn generate_quiz_from_prompt(&self, prompt: &str) -> PortResult<Value> {
        self.answer("quiz_prompt", json!(prompt))
    }

    async fn generate_schedule(&self, user_message: &str) -> PortResult<Value> {
        self.answer("schedule", json!(user_message))
    }

    async fn ingest_chat_document(&self, file_url: &str) -> PortResult<Value> {
        self.answer("chat_upload", json!(file_url))
    }

    async fn ask_chat(&self, message: &str) -> PortResult<Value> {
        self.answer("chat_ask", json!(message))
    }
}

#[async_trait]
impl TopicContentService for FakeAi {
    async fn generate_topic_content(&self, request: &TopicRequest) -> PortResult<Value> {
        self.answer("topic", serde_json::to_value(request).unwrap())
    }
}

pub struct FakeStorage;

#[async_trait]
impl ObjectStorageService for FakeStorage {
    async fn upload(&self, file_name: &str, _data: Bytes) -> PortResult<StoredObject> {
        Ok(StoredObject {
            url: format!("https://files.test/{}", file_name),
            public_id: format!("test/{}", file_name),
        })
    }
}

//=========================================================================================
// Test application
//=========================================================================================

#[allow(dead_code)]
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub db: Arc<MemoryDb>,
    pub ai: Arc<FakeAi>,
}

#[allow(dead_code)]
pub const JWT_SECRET: &str = "test-secret";

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        log_level: tracing::Level::INFO,
        genai_base_url: "http://127.0.0.1:9".to_string(),
        genai_timeout: Duration::from_secs(5),
        cloudinary: None,
        cors_origins: vec!["http://localhost:3000".to_string()],
        openai_api_key: None,
        openai_base_url: None,
        topic_model: "test-model".to_string(),
        max_upload_bytes: 1024 * 1024,
    }
}

pub async fn spawn_app() -> TestApp {
    let db = Arc::new(MemoryDb::default());
    let ai = Arc::new(FakeAi::default());
    let state = Arc::new(AppState::new(
        db.clone(),
        Arc::new(FakeStorage),
        ai.clone(),
        ai.clone(),
        Arc::new(test_config()),
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        address,
        api_client: reqwest::Client::new(),
        db,
        ai,
    }
}

#[allow(dead_code)]
impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn signup(&self, username: &str, email: &str, password: &str) -> reqwest::Response {
        self.api_client
            .post(self.url("/api/auth/signup"))
            .json(&json!({ "username": username, "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Registers a fresh user and returns `(token, userId)`.
    pub async fn register(&self, username: &str) -> (String, i64) {
        let email = format!("{}_{}@example.com", username, Uuid::new_v4());
        let response = self.signup(username, &email, "password123").await;
        assert_eq!(201, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to read JSON");
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["userId"].as_i64().unwrap(),
        )
    }

    pub async fn post_json(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.api_client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn put_json(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.api_client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.api_client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn upload(&self, path: &str, token: &str, form: reqwest::multipart::Form) -> reqwest::Response {
        self.api_client
            .post(self.url(path))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

#[allow(dead_code)]
pub fn pdf_form(file_name: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(b"%PDF-1.4 test".to_vec()).file_name(file_name.to_string()),
    )
}
