//! services/api/src/adapters/topic_llm.rs
//!
//! This module contains the adapter for the topic content LLM.
//! It implements the `TopicContentService` port against any OpenAI-compatible
//! chat completion endpoint.

const SYSTEM_INSTRUCTIONS: &str = r#"You are an expert teacher creating structured teaching content for one learning topic.

Requirements:
- Beginner-friendly and highly detailed, suitable for self-study.
- Step-by-step and logically ordered, like a mini-course.
- Strongly exam-oriented with clear focus on what is tested.
- Original, without generic filler sentences.
- Output must be strict JSON that a UI can render directly.

Content density rules:
- learning_objectives: 5-8 clear, exam-focused objectives.
- prerequisites: 3-6 concise items.
- core_concepts: 4-7 concepts, each with a multi-paragraph explanation and 4-8 key_points.
- worked_examples: 3-5 examples with detailed step-by-step explanation.
- visuals: 3-5 items describing useful mental diagrams or flows.
- real_world_applications: 3-6 items.
- common_mistakes: 5-10 items, each describing what and why.
- exam_interview_relevance: 5-10 bullet points about typical questions or patterns.
- quick_revision: 8-15 short bullets for last-minute revision.
- next_actions fields should be concrete and actionable.

Follow exactly this JSON schema and key names, and respond with the JSON object only:
{
  "topic": "",
  "overview": "",
  "learning_objectives": [],
  "prerequisites": [],
  "eli5": "",
  "core_concepts": [{ "title": "", "explanation": "", "key_points": [] }],
  "worked_examples": [{ "problem": "", "explanation": "", "final_answer": "" }],
  "visuals": [{ "type": "diagram | chart | flow", "description": "" }],
  "real_world_applications": [],
  "common_mistakes": [],
  "exam_interview_relevance": [],
  "quick_revision": [],
  "next_actions": { "suggested_practice": "", "suggested_quiz": "", "suggested_flashcards": "" }
}"#;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use study_assistant_core::{
    domain::TopicRequest,
    ports::{PortError, PortResult, TopicContentService},
};
use tokio::time::timeout;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TopicContentService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiTopicAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiTopicAdapter {
    /// Creates a new `OpenAiTopicAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, timeout: Duration) -> Self {
        Self {
            client,
            model,
            timeout,
        }
    }

    fn user_prompt(request: &TopicRequest) -> String {
        let details = request.details.as_deref().unwrap_or("").trim();
        let subtopics = request
            .subtopics
            .iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Topic: {}\n\nDetails:\n{}\n\nSubtopics:\n{}",
            request.topic.trim(),
            details,
            subtopics
        )
    }
}

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("fence regex is invalid")
});

/// Models like to wrap JSON in markdown fences; strip them before parsing.
fn parse_json_payload(raw: &str) -> PortResult<Value> {
    let body = FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw.trim(), |m| m.as_str());

    serde_json::from_str(body)
        .map_err(|e| PortError::InvalidUpstream(format!("Topic content is not JSON: {}", e)))
}

//=========================================================================================
// `TopicContentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TopicContentService for OpenAiTopicAdapter {
    async fn generate_topic_content(&self, request: &TopicRequest) -> PortResult<Value> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(Self::user_prompt(request))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let completion = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = timeout(self.timeout, self.client.chat().create(completion))
            .await
            .map_err(|_| PortError::Unexpected("Topic generation timed out".to_string()))?
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::InvalidUpstream("Topic LLM response contained no text content.".to_string())
            })?;

        parse_json_payload(&content)
    }
}
