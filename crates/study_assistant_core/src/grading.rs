//! crates/study_assistant_core/src/grading.rs
//!
//! Scores a quiz attempt against the quiz's stored questions.

use chrono::{DateTime, Utc};

use crate::domain::{Answer, Attempt, Question, UserId};

/// One answer as submitted by the client, before grading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub question_index: i64,
    pub selected_option: Option<String>,
    pub is_skipped: bool,
}

/// The result of grading one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub answers: Vec<Answer>,
    pub score: u32,
    pub total_questions: u32,
    pub accuracy: f64,
}

impl Grade {
    pub fn into_attempt(
        self,
        user_id: UserId,
        submitted_at: DateTime<Utc>,
        duration_seconds: Option<u32>,
    ) -> Attempt {
        Attempt {
            user_id,
            submitted_at,
            answers: self.answers,
            score: self.score,
            accuracy: self.accuracy,
            duration_seconds,
        }
    }
}

/// Grades `submitted` against `questions`.
///
/// Iterates the quiz's own questions, so incoming order and stray indices are
/// irrelevant. The first submitted answer carrying a question's index wins. A
/// question without one, or with one marked skipped, is skipped; otherwise it is
/// correct iff the selected option equals the stored answer byte for byte.
pub fn grade_attempt(questions: &[Question], submitted: &[SubmittedAnswer]) -> Grade {
    let answers: Vec<Answer> = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let incoming = submitted
                .iter()
                .find(|answer| answer.question_index == index as i64);

            let selected = match incoming {
                Some(answer) if !answer.is_skipped => answer.selected_option.clone(),
                _ => None,
            };

            match selected {
                Some(option) => Answer {
                    question_index: index,
                    is_correct: option == question.answer,
                    selected_option: Some(option),
                    is_skipped: false,
                },
                None => Answer {
                    question_index: index,
                    selected_option: None,
                    is_skipped: true,
                    is_correct: false,
                },
            }
        })
        .collect();

    let score = answers.iter().filter(|a| a.is_correct).count() as u32;
    let total_questions = questions.len() as u32;
    let accuracy = if total_questions == 0 {
        0.0
    } else {
        f64::from(score) / f64::from(total_questions)
    };

    Grade {
        answers,
        score,
        total_questions,
        accuracy,
    }
}
