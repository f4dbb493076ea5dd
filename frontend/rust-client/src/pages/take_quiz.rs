use std::collections::BTreeMap;

use crate::error::{ClientError, ClientResult};
use crate::models::{Question, Quiz, SubmitQuizRequest};
use crate::pages::{require_user, Route};
use crate::services::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizMode {
    Practice,
    Challenge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TakeQuizStage {
    Loading,
    SelectMode {
        mode: Option<QuizMode>,
    },
    InProgress {
        index: usize,
        /// question index -> chosen option text
        answers: BTreeMap<usize, String>,
    },
    Submitted {
        attempt_id: String,
    },
    Failed(String),
    Redirect(Route),
}

/// Walks the user through one quiz and submits the answers.
pub struct TakeQuizPage {
    pub quiz_id: String,
    pub quiz: Option<Quiz>,
    pub stage: TakeQuizStage,
    /// Set when a submission fails; the answers are kept for another try.
    pub last_error: Option<String>,
}

impl TakeQuizPage {
    pub fn new(quiz_id: impl Into<String>) -> Self {
        Self {
            quiz_id: quiz_id.into(),
            quiz: None,
            stage: TakeQuizStage::Loading,
            last_error: None,
        }
    }

    pub async fn load(&mut self, app: &AppState) {
        if let Err(route) = require_user(&app.auth).await {
            self.stage = TakeQuizStage::Redirect(route);
            return;
        }

        match app.quizzes.get_quiz_for_taking(&self.quiz_id).await {
            Ok(quiz) if quiz.questions.is_empty() => {
                tracing::warn!(quiz_id = %self.quiz_id, "Quiz has no questions");
                self.stage = TakeQuizStage::Failed("This quiz has no questions".to_string());
            }
            Ok(quiz) => {
                self.quiz = Some(quiz);
                self.stage = TakeQuizStage::SelectMode { mode: None };
            }
            Err(e) => {
                tracing::error!(quiz_id = %self.quiz_id, error = %e, "Failed to load quiz");
                let message = if e.is_not_found() {
                    "Quiz not found".to_string()
                } else {
                    e.to_string()
                };
                self.stage = TakeQuizStage::Failed(message);
            }
        }
    }

    pub fn select_mode(&mut self, mode: QuizMode) -> ClientResult<()> {
        match &mut self.stage {
            TakeQuizStage::SelectMode { mode: selected } => {
                *selected = Some(mode);
                Ok(())
            }
            _ => Err(invalid("a mode can only be chosen before starting")),
        }
    }

    pub fn mode(&self) -> Option<QuizMode> {
        match self.stage {
            TakeQuizStage::SelectMode { mode } => mode,
            _ => None,
        }
    }

    pub fn start(&mut self) -> ClientResult<()> {
        match self.stage {
            TakeQuizStage::SelectMode { mode: Some(_) } => {
                self.stage = TakeQuizStage::InProgress {
                    index: 0,
                    answers: BTreeMap::new(),
                };
                Ok(())
            }
            TakeQuizStage::SelectMode { mode: None } => Err(invalid("choose a mode first")),
            _ => Err(invalid("the quiz cannot be started now")),
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.stage {
            TakeQuizStage::InProgress { index, .. } => Some(index),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        let index = self.current_index()?;
        self.quiz.as_ref()?.questions.get(index)
    }

    pub fn current_answer(&self) -> Option<&str> {
        match &self.stage {
            TakeQuizStage::InProgress { index, answers } => answers.get(index).map(String::as_str),
            _ => None,
        }
    }

    pub fn select_answer(&mut self, option: &str) -> ClientResult<()> {
        let valid = self
            .current_question()
            .map(|q| q.options.iter().any(|o| o == option))
            .ok_or_else(|| invalid("no question is being shown"))?;
        if !valid {
            return Err(invalid("not one of the offered options"));
        }

        if let TakeQuizStage::InProgress { index, answers } = &mut self.stage {
            answers.insert(*index, option.to_string());
        }
        Ok(())
    }

    pub fn can_advance(&self) -> bool {
        self.current_answer().is_some()
    }

    pub fn is_last_question(&self) -> bool {
        match (self.current_index(), &self.quiz) {
            (Some(index), Some(quiz)) => index + 1 >= quiz.questions.len(),
            _ => false,
        }
    }

    /// Moves forward; on the last question this submits instead.
    pub async fn next(&mut self, app: &AppState) -> ClientResult<()> {
        if !self.can_advance() {
            return Err(invalid("answer the current question first"));
        }
        if self.is_last_question() {
            return self.submit(app).await.map(|_| ());
        }
        if let TakeQuizStage::InProgress { index, .. } = &mut self.stage {
            *index += 1;
        }
        Ok(())
    }

    pub fn previous(&mut self) {
        if let TakeQuizStage::InProgress { index, .. } = &mut self.stage {
            *index = index.saturating_sub(1);
        }
    }

    /// Percent of the way through, counting the question on screen.
    pub fn progress(&self) -> f64 {
        match (self.current_index(), &self.quiz) {
            (Some(index), Some(quiz)) if !quiz.questions.is_empty() => {
                (index + 1) as f64 / quiz.questions.len() as f64 * 100.0
            }
            _ => 0.0,
        }
    }

    /// Every question id mapped to its chosen option, empty when unanswered.
    pub fn submission(&self) -> Option<SubmitQuizRequest> {
        let quiz = self.quiz.as_ref()?;
        let TakeQuizStage::InProgress { answers, .. } = &self.stage else {
            return None;
        };

        let answers = quiz
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id.clone(), answers.get(&i).cloned().unwrap_or_default()))
            .collect();

        Some(SubmitQuizRequest {
            quiz_id: self.quiz_id.clone(),
            answers,
        })
    }

    pub async fn submit(&mut self, app: &AppState) -> ClientResult<String> {
        let req = self
            .submission()
            .ok_or_else(|| invalid("the quiz is not in progress"))?;

        match app.quizzes.submit_attempt(&req).await {
            Ok(result) => {
                self.last_error = None;
                self.stage = TakeQuizStage::Submitted {
                    attempt_id: result.attempt_id.clone(),
                };
                Ok(result.attempt_id)
            }
            Err(e) => {
                tracing::error!(quiz_id = %self.quiz_id, error = %e, "Failed to submit quiz");
                self.last_error = Some("Failed to submit quiz. Please try again.".to_string());
                Err(e)
            }
        }
    }

    pub fn navigation(&self) -> Option<Route> {
        match &self.stage {
            TakeQuizStage::Submitted { attempt_id } => Some(Route::QuizResults(attempt_id.clone())),
            TakeQuizStage::Redirect(route) => Some(route.clone()),
            _ => None,
        }
    }
}

fn invalid(message: &str) -> ClientError {
    ClientError::Validation(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with(questions: usize) -> TakeQuizPage {
        let questions = (0..questions)
            .map(|i| Question {
                id: format!("q{}", i),
                text: format!("Question {}", i),
                options: vec!["a".into(), "b".into()],
                correct_answer: None,
                explanation: None,
                points: 1,
            })
            .collect::<Vec<_>>();
        let mut page = TakeQuizPage::new("quiz-1");
        page.quiz = Some(Quiz {
            id: "quiz-1".into(),
            user_id: None,
            title: "T".into(),
            description: String::new(),
            difficulty: None,
            total_questions: questions.len(),
            questions,
            pdf_filename: None,
            created_at: None,
            updated_at: None,
        });
        page.stage = TakeQuizStage::SelectMode { mode: None };
        page
    }

    #[test]
    fn test_start_requires_mode() {
        let mut page = page_with(2);
        assert!(page.start().is_err());
        page.select_mode(QuizMode::Challenge).unwrap();
        assert_eq!(page.mode(), Some(QuizMode::Challenge));
        page.start().unwrap();
        assert_eq!(page.current_index(), Some(0));
        assert_eq!(page.progress(), 50.0);
    }

    #[test]
    fn test_answers_must_be_offered_options() {
        let mut page = page_with(1);
        page.select_mode(QuizMode::Practice).unwrap();
        page.start().unwrap();

        assert!(!page.can_advance());
        assert!(page.select_answer("z").is_err());
        page.select_answer("b").unwrap();
        assert_eq!(page.current_answer(), Some("b"));
        assert!(page.is_last_question());
    }

    #[test]
    fn test_previous_stops_at_first_question() {
        let mut page = page_with(3);
        page.select_mode(QuizMode::Practice).unwrap();
        page.start().unwrap();
        page.previous();
        assert_eq!(page.current_index(), Some(0));
    }

    #[test]
    fn test_submission_fills_unanswered_with_empty() {
        let mut page = page_with(3);
        page.select_mode(QuizMode::Practice).unwrap();
        page.start().unwrap();
        page.select_answer("a").unwrap();

        let req = page.submission().unwrap();
        assert_eq!(req.quiz_id, "quiz-1");
        assert_eq!(req.answers.len(), 3);
        assert_eq!(req.answers["q0"], "a");
        assert_eq!(req.answers["q1"], "");
        assert_eq!(req.answers["q2"], "");
    }
}
