use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use super::{embedded_json, flexible_datetime, string_or_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Wording used by the quiz creation wizard.
    pub fn level_label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Beginner",
            Difficulty::Medium => "Intermediate",
            Difficulty::Hard => "Expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Label for a raw difficulty string, `Unknown` for anything unrecognised.
pub fn difficulty_label(raw: &str) -> &'static str {
    raw.parse::<Difficulty>()
        .map(|d| d.label())
        .unwrap_or("Unknown")
}

/// A multiple-choice question, normalised from either backend shape.
///
/// The correct answer is kept as option text, which is what the submission
/// protocol compares against. `None` means the server withheld it (quiz
/// fetched for taking).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireQuestion", into = "WireQuestion")]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub points: u32,
}

impl Question {
    pub fn correct_index(&self) -> Option<usize> {
        let answer = self.correct_answer.as_deref()?;
        self.options.iter().position(|o| o == answer)
    }

    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer.as_deref() == Some(answer)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireQuestion {
    #[serde(default, deserialize_with = "string_or_number::deserialize")]
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    question: Option<String>,
    #[serde(default, skip_serializing)]
    question_text: Option<String>,
    #[serde(default, deserialize_with = "embedded_json::deserialize")]
    options: Vec<String>,
    #[serde(
        rename = "correctAnswer",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    correct_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correct_answer: Option<String>,
    #[serde(default, skip_serializing)]
    correct: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    points: Option<u32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<WireQuestion> for Question {
    type Error = String;

    fn try_from(wire: WireQuestion) -> Result<Self, Self::Error> {
        let text = [wire.text, wire.question, wire.question_text]
            .into_iter()
            .filter_map(non_empty)
            .map(|t| t.trim().to_string())
            .next()
            .ok_or_else(|| format!("question '{}' has no text", wire.id))?;

        if wire.options.is_empty() {
            return Err(format!("question '{}' has no options", wire.id));
        }

        let by_index = match wire.correct_index {
            Some(i) if i >= 0 => Some(
                wire.options
                    .get(i as usize)
                    .cloned()
                    .ok_or_else(|| format!("question '{}' answer index {} out of range", wire.id, i))?,
            ),
            _ => None,
        };
        let correct_answer = by_index
            .or_else(|| non_empty(wire.correct_answer))
            .or_else(|| non_empty(wire.correct));

        Ok(Question {
            id: wire.id,
            text,
            options: wire.options,
            correct_answer,
            explanation: non_empty(wire.explanation),
            points: wire.points.filter(|p| *p > 0).unwrap_or(1),
        })
    }
}

impl From<Question> for WireQuestion {
    fn from(q: Question) -> Self {
        let correct_index = q.correct_index().map(|i| i as i64);
        WireQuestion {
            id: q.id,
            question: Some(q.text.clone()),
            text: Some(q.text),
            question_text: None,
            options: q.options,
            correct_index,
            correct_answer: q.correct_answer,
            correct: None,
            explanation: q.explanation,
            points: Some(q.points),
        }
    }
}

fn optional_difficulty<'de, D>(deserializer: D) -> Result<Option<Difficulty>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(s) if !s.trim().is_empty() => s.parse().map(Some).map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Quiz {
    #[serde(deserialize_with = "string_or_number::deserialize")]
    #[validate(length(min = 1, message = "quiz id is empty"))]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[validate(length(min = 1, message = "quiz title is empty"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(
        default,
        deserialize_with = "optional_difficulty",
        skip_serializing_if = "Option::is_none"
    )]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(
        rename = "totalQuestions",
        alias = "question_count",
        alias = "total_questions",
        default
    )]
    pub total_questions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_filename: Option<String>,
    #[serde(
        rename = "createdAt",
        alias = "created_at",
        default,
        with = "flexible_datetime"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "updatedAt",
        alias = "updated_at",
        default,
        with = "flexible_datetime"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Quiz {
    /// Fills the derived question count when the server left it out.
    pub fn normalized(mut self) -> Self {
        if self.total_questions == 0 {
            self.total_questions = self.questions.len();
        }
        self
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

/// One page of the quiz list as requested by the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizPage {
    pub quizzes: Vec<Quiz>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateQuizRequest {
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(rename = "questionCount")]
    #[validate(range(min = 1, max = 50, message = "question count must be 1-50"))]
    pub question_count: u32,
}

/// Title, description and difficulty entered in the creation wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QuizDetails {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    pub difficulty: Difficulty,
}

impl Default for QuizDetails {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            difficulty: Difficulty::Easy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_from_index_shape() {
        let q: Question = serde_json::from_value(json!({
            "id": "1-1",
            "question": "What is the capital of France?",
            "options": ["London", "Berlin", "Paris", "Madrid"],
            "correctAnswer": 2,
            "explanation": "Paris is the capital and most populous city of France."
        }))
        .unwrap();

        assert_eq!(q.text, "What is the capital of France?");
        assert_eq!(q.correct_answer.as_deref(), Some("Paris"));
        assert_eq!(q.correct_index(), Some(2));
        assert_eq!(q.points, 1);
    }

    #[test]
    fn test_question_from_value_shape() {
        let q: Question = serde_json::from_value(json!({
            "id": 17,
            "question_text": "Largest continent?",
            "options": ["Africa", "Asia"],
            "correct_answer": "Asia"
        }))
        .unwrap();

        assert_eq!(q.id, "17");
        assert_eq!(q.text, "Largest continent?");
        assert!(q.is_correct("Asia"));
        assert_eq!(q.correct_index(), Some(1));
    }

    #[test]
    fn test_hidden_answer_for_taking() {
        let q: Question = serde_json::from_value(json!({
            "id": "q1",
            "type": "multiple_choice",
            "text": "Pick one",
            "question": "",
            "options": ["a", "b"],
            "correct": "",
            "correctAnswer": -1,
            "points": 0
        }))
        .unwrap();

        assert_eq!(q.correct_answer, None);
        assert_eq!(q.text, "Pick one");
    }

    #[test]
    fn test_question_without_text_is_rejected() {
        let err = serde_json::from_value::<Question>(json!({
            "id": "q1",
            "options": ["a"]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("has no text"));
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let result = serde_json::from_value::<Question>(json!({
            "id": "q1",
            "text": "t",
            "options": ["a"],
            "correctAnswer": 3
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_quiz_accepts_both_key_styles() {
        let quiz: Quiz = serde_json::from_value(json!({
            "id": "abc",
            "created_at": "2024-04-24",
            "user_id": "u1",
            "title": "World Geography",
            "question_count": 15
        }))
        .unwrap();
        assert_eq!(quiz.total_questions, 15);
        assert!(quiz.created_at.is_some());
        assert_eq!(quiz.difficulty, None);

        let quiz: Quiz = serde_json::from_value::<Quiz>(json!({
            "id": "abc",
            "title": "T",
            "description": "",
            "difficulty": "Hard",
            "createdAt": "2025-01-02T03:04:05Z",
            "questions": [{"id": "1", "text": "x", "options": ["a", "b"], "correctAnswer": 0}]
        }))
        .unwrap()
        .normalized();
        assert_eq!(quiz.difficulty, Some(Difficulty::Hard));
        assert_eq!(quiz.total_questions, 1);
    }

    #[test]
    fn test_question_serializes_both_answer_forms() {
        let q = Question {
            id: "1".into(),
            text: "x".into(),
            options: vec!["a".into(), "b".into()],
            correct_answer: Some("b".into()),
            explanation: None,
            points: 2,
        };
        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["correctAnswer"], 1);
        assert_eq!(value["correct_answer"], "b");
        assert_eq!(value["text"], "x");
    }

    #[test]
    fn test_generate_request_validation() {
        let req = GenerateQuizRequest {
            content: "text".into(),
            title: String::new(),
            description: "d".into(),
            difficulty: Difficulty::Easy,
            question_count: 10,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_difficulty_labels() {
        assert_eq!(difficulty_label("medium"), "Medium");
        assert_eq!(difficulty_label("extreme"), "Unknown");
        assert_eq!(Difficulty::Hard.level_label(), "Expert");
    }
}
