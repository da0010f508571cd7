//! services/api/src/adapters/genai.rs
//!
//! HTTP adapter for the external GenAI service. It implements `StudyAiService`
//! (and `TopicContentService` when no OpenAI-compatible key is configured).
//! Responses are returned as raw JSON; normalization happens in the core crate.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use study_assistant_core::{
    domain::TopicRequest,
    ports::{PortError, PortResult, StudyAiService, TopicContentService},
};
use tracing::{debug, error};

const FLASHCARDS_PATH: &str = "/api/flashcards";
const QUIZ_FROM_DOCUMENT_PATH: &str = "/api/quizbot";
const QUIZ_FROM_PROMPT_PATH: &str = "/api/quizbot/prompt";
const SCHEDULE_PATH: &str = "/api/schedule";
const CHAT_UPLOAD_PATH: &str = "/api/chatbot/upload";
const CHAT_ASK_PATH: &str = "/api/chatbot/chat";
const TOPIC_PATH: &str = "/api/topic";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct GenAiAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl GenAiAdapter {
    /// Creates a new `GenAiAdapter`; every call is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post_json(&self, path: &str, body: Value) -> PortResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("[AI request] POST {}", url);

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            error!("[AI request error] POST {}: {}", url, e);
            PortError::Unexpected(format!("AI service request to {} failed: {}", path, e))
        })?;

        let status = response.status();
        debug!("[AI response] {} {}", status, path);
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("[AI response error] {} {}: {}", status, path, detail);
            return Err(PortError::Unexpected(format!(
                "AI service answered {} for {}",
                status, path
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| PortError::InvalidUpstream(format!("{} returned non-JSON: {}", path, e)))
    }
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl StudyAiService for GenAiAdapter {
    async fn extract_flashcards(&self, file_url: &str) -> PortResult<Value> {
        self.post_json(FLASHCARDS_PATH, json!({ "Path": file_url })).await
    }

    async fn generate_quiz_from_document(&self, file_url: &str) -> PortResult<Value> {
        self.post_json(QUIZ_FROM_DOCUMENT_PATH, json!({ "Path": file_url }))
            .await
    }

    async fn generate_quiz_from_prompt(&self, prompt: &str) -> PortResult<Value> {
        self.post_json(QUIZ_FROM_PROMPT_PATH, json!({ "prompt": prompt }))
            .await
    }

    async fn generate_schedule(&self, user_message: &str) -> PortResult<Value> {
        self.post_json(SCHEDULE_PATH, json!({ "userMessage": user_message }))
            .await
    }

    async fn ingest_chat_document(&self, file_url: &str) -> PortResult<Value> {
        self.post_json(CHAT_UPLOAD_PATH, json!({ "Path": file_url })).await
    }

    async fn ask_chat(&self, message: &str) -> PortResult<Value> {
        self.post_json(CHAT_ASK_PATH, json!({ "userMessage": message }))
            .await
    }
}

#[async_trait]
impl TopicContentService for GenAiAdapter {
    async fn generate_topic_content(&self, request: &TopicRequest) -> PortResult<Value> {
        let body = serde_json::to_value(request).map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.post_json(TOPIC_PATH, body).await
    }
}
