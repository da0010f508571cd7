//! crates/study_assistant_core/src/normalize.rs
//!
//! Turns loosely shaped JSON (AI service responses and client-supplied
//! schedules) into the canonical domain types. Field aliases are resolved here
//! and nowhere else.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::domain::{Flashcard, Question, ScheduleItem};
use crate::grading::SubmittedAnswer;

const DETAILS_ALIASES: [&str; 3] = ["details", "description", "detail"];
const SUBTOPICS_ALIASES: [&str; 3] = ["subtopics", "sub_topics", "subTopics"];

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NormalizeError {
    #[error("expected a JSON array of {0}")]
    NotAnArray(&'static str),
    #[error("expected {0}")]
    UnexpectedShape(&'static str),
    #[error("item {index}: {reason}")]
    InvalidItem { index: usize, reason: String },
}

fn invalid(index: usize, reason: impl Into<String>) -> NormalizeError {
    NormalizeError::InvalidItem {
        index,
        reason: reason.into(),
    }
}

//=========================================================================================
// Schedules
//=========================================================================================

/// Normalizes an array of schedule items. One bad item rejects the whole batch.
pub fn schedule_items(value: &Value) -> Result<Vec<ScheduleItem>, NormalizeError> {
    let items = value
        .as_array()
        .ok_or(NormalizeError::NotAnArray("schedule items"))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| schedule_item(index, item))
        .collect()
}

fn schedule_item(index: usize, item: &Value) -> Result<ScheduleItem, NormalizeError> {
    let fields = item
        .as_object()
        .ok_or_else(|| invalid(index, "schedule item must be an object"))?;

    let date = fields
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_date)
        .ok_or_else(|| invalid(index, "missing or unparseable date"))?;

    let topic = fields
        .get("topic")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| invalid(index, "missing topic"))?
        .to_string();

    let duration = fields
        .get("duration")
        .and_then(parse_duration)
        .ok_or_else(|| invalid(index, "duration must be a non-negative number of hours"))?;

    Ok(ScheduleItem {
        date,
        topic,
        duration,
        details: first_non_empty_string(fields, &DETAILS_ALIASES),
        subtopics: first_string_array(fields, &SUBTOPICS_ALIASES),
    })
}

/// Accepts `YYYY-MM-DD` (midnight UTC), RFC 3339, or a zone-less timestamp read as UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

// The scheduler emits hours as strings ("3"), clients send numbers.
fn parse_duration(value: &Value) -> Option<f64> {
    let hours = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (hours.is_finite() && hours >= 0.0).then_some(hours)
}

fn first_non_empty_string(fields: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_string_array(fields: &Map<String, Value>, aliases: &[&str]) -> Vec<String> {
    aliases
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_array))
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

//=========================================================================================
// Quizzes
//=========================================================================================

/// Normalizes generated quiz questions.
///
/// Every question must carry its correct answer among its options; a single
/// violation rejects the whole response so no unscorable quiz is stored.
pub fn quiz_questions(value: &Value) -> Result<Vec<Question>, NormalizeError> {
    let items = value
        .as_array()
        .ok_or(NormalizeError::NotAnArray("quiz questions"))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let question: Question = serde_json::from_value(item.clone())
                .map_err(|e| invalid(index, e.to_string()))?;
            if !question.options.contains(&question.answer) {
                return Err(invalid(index, "answer is not one of the options"));
            }
            Ok(question)
        })
        .collect()
}

/// Parses the `answers` field of a quiz submission.
///
/// Only the array shape is enforced. Elements without an integer
/// `questionIndex` match no question and are dropped, so those questions grade
/// as skipped. A non-string selection reads as no selection and a null or
/// non-boolean skip flag reads as `false`.
pub fn submitted_answers(value: &Value) -> Result<Vec<SubmittedAnswer>, NormalizeError> {
    let items = value
        .as_array()
        .ok_or(NormalizeError::NotAnArray("answers"))?;

    Ok(items.iter().filter_map(submitted_answer).collect())
}

fn submitted_answer(item: &Value) -> Option<SubmittedAnswer> {
    let question_index = item.get("questionIndex").and_then(Value::as_i64)?;
    let is_skipped = ["isSkipped", "is_skipped"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_bool))
        .unwrap_or(false);

    Some(SubmittedAnswer {
        question_index,
        selected_option: item
            .get("selectedOption")
            .and_then(Value::as_str)
            .map(str::to_string),
        is_skipped,
    })
}

//=========================================================================================
// Flashcards, chat & topics
//=========================================================================================

/// Reads `{ "flashcards": [...] }` (a bare array is accepted too).
pub fn flashcards(value: &Value) -> Result<Vec<Flashcard>, NormalizeError> {
    let cards = match value {
        Value::Array(_) => value,
        Value::Object(fields) => fields
            .get("flashcards")
            .ok_or(NormalizeError::UnexpectedShape("a `flashcards` field"))?,
        _ => return Err(NormalizeError::UnexpectedShape("a flashcards object")),
    };

    cards
        .as_array()
        .ok_or(NormalizeError::NotAnArray("flashcards"))?
        .iter()
        .enumerate()
        .map(|(index, card)| {
            serde_json::from_value(card.clone()).map_err(|e| invalid(index, e.to_string()))
        })
        .collect()
}

/// Reads the `botResponse` text of a chatbot reply.
pub fn bot_response(value: &Value) -> Result<String, NormalizeError> {
    value
        .get("botResponse")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(NormalizeError::UnexpectedShape("a `botResponse` string"))
}

/// Topic content is passed through untouched, but it has to be a JSON object.
pub fn topic_content(value: Value) -> Result<Value, NormalizeError> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(NormalizeError::UnexpectedShape("a topic content object"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn schedule_resolves_aliases() {
        let items = schedule_items(&json!([
            { "date": "2025-03-01", "topic": "Graphs", "duration": "3", "description": "BFS and DFS", "sub_topics": ["BFS", "DFS"] },
            { "date": "2025-03-02", "topic": "Trees", "duration": 1.5, "detail": "", "details": "", "subTopics": ["AVL"] },
            { "date": "2025-03-03T10:30:00Z", "topic": "Heaps", "duration": 2 }
        ]))
        .unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].date, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(items[0].duration, 3.0);
        assert_eq!(items[0].details.as_deref(), Some("BFS and DFS"));
        assert_eq!(items[0].subtopics, vec!["BFS", "DFS"]);
        assert_eq!(items[1].details, None);
        assert_eq!(items[1].subtopics, vec!["AVL"]);
        assert_eq!(items[2].date, Utc.with_ymd_and_hms(2025, 3, 3, 10, 30, 0).unwrap());
        assert!(items[2].subtopics.is_empty());
    }

    #[test]
    fn topic_is_kept_as_submitted() {
        let items = schedule_items(&json!([
            { "date": "2025-03-01", "topic": "  Graphs ", "duration": 1 }
        ]))
        .unwrap();
        assert_eq!(items[0].topic, "  Graphs ");
    }

    #[test]
    fn details_prefers_first_alias() {
        let items = schedule_items(&json!([
            { "date": "2025-03-01", "topic": "T", "duration": 1, "details": "primary", "description": "secondary" }
        ]))
        .unwrap();
        assert_eq!(items[0].details.as_deref(), Some("primary"));
    }

    #[test]
    fn non_array_subtopics_alias_is_skipped() {
        let items = schedule_items(&json!([
            { "date": "2025-03-01", "topic": "T", "duration": 1, "subtopics": "oops", "subTopics": ["ok"] }
        ]))
        .unwrap();
        assert_eq!(items[0].subtopics, vec!["ok"]);
    }

    #[test]
    fn schedule_rejects_non_array() {
        assert_eq!(
            schedule_items(&json!({ "schedule": [] })),
            Err(NormalizeError::NotAnArray("schedule items"))
        );
    }

    #[test]
    fn schedule_rejects_bad_items() {
        let bad_date = schedule_items(&json!([{ "date": "someday", "topic": "T", "duration": 1 }]));
        assert!(matches!(bad_date, Err(NormalizeError::InvalidItem { index: 0, .. })));

        let bad_duration = schedule_items(&json!([
            { "date": "2025-03-01", "topic": "T", "duration": 1 },
            { "date": "2025-03-02", "topic": "T", "duration": "lots" }
        ]));
        assert!(matches!(bad_duration, Err(NormalizeError::InvalidItem { index: 1, .. })));

        let no_topic = schedule_items(&json!([{ "date": "2025-03-01", "topic": "  ", "duration": 1 }]));
        assert!(no_topic.is_err());
    }

    #[test]
    fn quiz_questions_require_answer_in_options() {
        let ok = quiz_questions(&json!([
            { "question": "2+2?", "options": ["3", "4"], "answer": "4" }
        ]))
        .unwrap();
        assert_eq!(ok[0].answer, "4");

        let bad = quiz_questions(&json!([
            { "question": "2+2?", "options": ["3", "4"], "answer": "5" }
        ]));
        assert!(matches!(bad, Err(NormalizeError::InvalidItem { index: 0, .. })));

        assert_eq!(
            quiz_questions(&json!({ "questions": [] })),
            Err(NormalizeError::NotAnArray("quiz questions"))
        );
    }

    #[test]
    fn submitted_answers_must_be_array() {
        assert_eq!(
            submitted_answers(&json!("A,B")),
            Err(NormalizeError::NotAnArray("answers"))
        );
        let parsed = submitted_answers(&json!([{ "questionIndex": 0, "selectedOption": "A" }])).unwrap();
        assert_eq!(parsed[0].selected_option.as_deref(), Some("A"));
        assert!(!parsed[0].is_skipped);
    }

    #[test]
    fn unusable_answer_elements_are_dropped_not_rejected() {
        let parsed = submitted_answers(&json!([
            { "questionIndex": 0, "selectedOption": "A", "isSkipped": null },
            { "selectedOption": "B" },
            { "questionIndex": "2", "selectedOption": "C" },
            "C",
            { "questionIndex": 3, "selectedOption": 4 }
        ]))
        .unwrap();

        assert_eq!(
            parsed,
            vec![
                SubmittedAnswer {
                    question_index: 0,
                    selected_option: Some("A".into()),
                    is_skipped: false,
                },
                SubmittedAnswer {
                    question_index: 3,
                    selected_option: None,
                    is_skipped: false,
                },
            ]
        );
    }

    #[test]
    fn snake_case_skip_flag_is_read() {
        let parsed = submitted_answers(&json!([
            { "questionIndex": 2, "selectedOption": null, "is_skipped": true }
        ]))
        .unwrap();
        assert_eq!(parsed[0].question_index, 2);
        assert!(parsed[0].is_skipped);
    }

    #[test]
    fn flashcards_accepts_wrapped_and_bare() {
        let wrapped = flashcards(&json!({ "flashcards": [{ "question": "Q", "answer": "A" }] })).unwrap();
        let bare = flashcards(&json!([{ "question": "Q", "answer": "A" }])).unwrap();
        assert_eq!(wrapped, bare);
        assert!(flashcards(&json!({ "cards": [] })).is_err());
    }

    #[test]
    fn topic_content_must_be_object() {
        assert!(topic_content(json!({ "topic": "Graphs" })).is_ok());
        assert!(topic_content(json!(["Graphs"])).is_err());
    }
}
