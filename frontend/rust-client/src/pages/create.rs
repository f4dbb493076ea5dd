use validator::Validate;

use crate::error::{ClientError, ClientResult};
use crate::models::{Difficulty, DocumentFile, GenerateQuizRequest, Quiz, QuizDetails};
use crate::pages::Route;
use crate::services::AppState;

const QUESTION_COUNT: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum CreateStage {
    SelectSource,
    Details,
    Generating,
    Created { quiz_id: String },
    Failed(String),
}

/// Quiz creation wizard: pick a document (or none), describe the quiz, generate.
pub struct CreateQuizPage {
    pub stage: CreateStage,
    pub file: Option<DocumentFile>,
    pub details: QuizDetails,
}

impl Default for CreateQuizPage {
    fn default() -> Self {
        Self::new()
    }
}

impl CreateQuizPage {
    pub fn new() -> Self {
        Self {
            stage: CreateStage::SelectSource,
            file: None,
            details: QuizDetails::default(),
        }
    }

    /// Accepts PDF, DOCX or TXT by extension or MIME type.
    pub fn choose_file(&mut self, file: DocumentFile) -> ClientResult<()> {
        if file.kind().is_none() {
            return Err(ClientError::Validation(
                "Please upload a PDF, DOCX, or TXT file".to_string(),
            ));
        }
        self.file = Some(file);
        self.stage = CreateStage::Details;
        Ok(())
    }

    /// Skips the document and generates from the title alone.
    pub fn create_manually(&mut self) {
        self.file = None;
        self.stage = CreateStage::Details;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.details.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.details.description = description.into();
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.details.difficulty = difficulty;
    }

    pub fn can_generate(&self) -> bool {
        matches!(self.stage, CreateStage::Details | CreateStage::Failed(_))
            && self.details.validate().is_ok()
    }

    pub async fn generate(&mut self, app: &AppState) -> ClientResult<Quiz> {
        if !matches!(self.stage, CreateStage::Details | CreateStage::Failed(_)) {
            return Err(ClientError::Validation(
                "A quiz cannot be generated from this step".to_string(),
            ));
        }
        if self.details.validate().is_err() {
            return Err(ClientError::Validation(
                "Please fill in all quiz details".to_string(),
            ));
        }

        self.stage = CreateStage::Generating;
        let result = match &self.file {
            Some(file) => app.quizzes.upload_and_generate(file, &self.details).await,
            None => {
                let req = GenerateQuizRequest {
                    content: format!(
                        "Please generate a general knowledge quiz about {}",
                        self.details.title
                    ),
                    title: self.details.title.clone(),
                    description: self.details.description.clone(),
                    difficulty: self.details.difficulty,
                    question_count: QUESTION_COUNT,
                };
                app.quizzes.generate_quiz(&req).await
            }
        };

        match result {
            Ok(quiz) => {
                tracing::info!(quiz_id = %quiz.id, "Quiz created");
                self.stage = CreateStage::Created {
                    quiz_id: quiz.id.clone(),
                };
                Ok(quiz)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error generating quiz");
                self.stage =
                    CreateStage::Failed("Failed to generate quiz. Please try again.".to_string());
                Err(e)
            }
        }
    }

    /// Back to the details form after a failure.
    pub fn retry(&mut self) {
        if matches!(self.stage, CreateStage::Failed(_)) {
            self.stage = CreateStage::Details;
        }
    }

    pub fn navigation(&self) -> Option<Route> {
        match self.stage {
            CreateStage::Created { .. } => Some(Route::Dashboard),
            _ => None,
        }
    }
}
