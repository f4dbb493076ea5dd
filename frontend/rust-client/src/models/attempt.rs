use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{embedded_json, flexible_datetime, string_or_number, Question};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    #[validate(length(min = 1, message = "quiz id is required"))]
    pub quiz_id: String,
    /// question id -> chosen option text
    pub answers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    #[serde(deserialize_with = "string_or_number::deserialize")]
    pub question_id: String,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub user_answer: String,
    #[serde(default)]
    pub correct_answer: String,
    pub is_correct: bool,
}

/// Result of `POST /quizzes/submit`.
///
/// Older servers send `score` as the correct count next to `percentage`;
/// current ones send `score` as the percentage next to `correct_answers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SubmitResult {
    #[serde(deserialize_with = "string_or_number::deserialize")]
    #[validate(length(min = 1, message = "attempt id is empty"))]
    pub attempt_id: String,
    #[serde(default)]
    pub quiz_id: String,
    #[serde(default)]
    pub quiz_title: String,
    pub total_questions: u32,
    #[serde(default)]
    pub correct_answers: Option<u32>,
    pub score: f64,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default, with = "flexible_datetime")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Vec<QuestionResult>,
}

impl SubmitResult {
    pub fn percentage(&self) -> f64 {
        self.percentage.unwrap_or(self.score)
    }

    pub fn correct(&self) -> u32 {
        match (self.correct_answers, self.percentage) {
            (Some(n), _) => n,
            (None, Some(_)) => self.score.round() as u32,
            (None, None) => ((self.score / 100.0) * self.total_questions as f64).round() as u32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    #[serde(deserialize_with = "string_or_number::deserialize")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number::deserialize")]
    pub quiz_id: String,
    #[serde(default)]
    pub user_id: String,
    /// Number of correct answers.
    pub score: u32,
    pub total_questions: u32,
    #[serde(default, deserialize_with = "embedded_json::deserialize")]
    pub answers: BTreeMap<String, String>,
    #[serde(default, with = "flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    pub fn percentage(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        self.score as f64 / self.total_questions as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptQuiz {
    #[serde(deserialize_with = "string_or_number::deserialize")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Graded attempt as returned by `GET /quizzes/attempt/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptDetail {
    pub attempt: AttemptRecord,
    pub quiz: AttemptQuiz,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl AttemptDetail {
    pub fn questions(&self) -> &[Question] {
        if self.questions.is_empty() {
            &self.quiz.questions
        } else {
            &self.questions
        }
    }

    /// Per-question grading by comparing the stored answer text.
    pub fn graded(&self) -> Vec<QuestionResult> {
        self.questions()
            .iter()
            .map(|q| {
                let user_answer = self.attempt.answers.get(&q.id).cloned().unwrap_or_default();
                QuestionResult {
                    question_id: q.id.clone(),
                    question_text: q.text.clone(),
                    is_correct: q.is_correct(&user_answer),
                    correct_answer: q.correct_answer.clone().unwrap_or_default(),
                    user_answer,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AttemptListItem {
    #[serde(deserialize_with = "string_or_number::deserialize")]
    #[validate(length(min = 1, message = "attempt id is empty"))]
    pub id: String,
    #[serde(deserialize_with = "string_or_number::deserialize")]
    pub quiz_id: String,
    #[serde(default)]
    pub quiz_title: Option<String>,
    #[serde(default)]
    pub pdf_filename: Option<String>,
    pub score: u32,
    pub total_questions: u32,
    #[validate(range(min = 0.0, max = 100.0, message = "percentage out of range"))]
    pub percentage: f64,
    #[serde(default, with = "flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AttemptList {
    #[validate(nested)]
    pub attempts: Vec<AttemptListItem>,
    #[serde(default)]
    pub total: Option<u32>,
}
