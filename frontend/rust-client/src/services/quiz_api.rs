use reqwest::multipart::Form;
use validator::Validate;

use crate::error::{ClientError, ClientResult};
use crate::models::{
    ApiEnvelope, ApiMessage, AttemptDetail, AttemptList, AttemptListItem, DocumentFile,
    GenerateQuizRequest, Quiz, QuizDetails, QuizPage, SubmitQuizRequest, SubmitResult,
};
use crate::services::http_client::{ensure_valid, id_segment, ApiClient};

const QUIZZES: &str = "api/v1/quizzes";

/// One method per quiz backend endpoint; each is exactly one HTTP call.
#[derive(Clone)]
pub struct QuizApiClient {
    api: ApiClient,
}

impl QuizApiClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn generate_quiz(&self, req: &GenerateQuizRequest) -> ClientResult<Quiz> {
        req.validate()?;
        let envelope: ApiEnvelope<Quiz> = self
            .api
            .post(&format!("{}/generate", QUIZZES), req)
            .await?;
        let quiz = ensure_valid(envelope.into_data()?.normalized())?;
        tracing::info!(quiz_id = %quiz.id, questions = quiz.total_questions, "Quiz generated");
        Ok(quiz)
    }

    pub async fn upload_and_generate(
        &self,
        file: &DocumentFile,
        details: &QuizDetails,
    ) -> ClientResult<Quiz> {
        details.validate()?;
        let kind = file.kind().ok_or_else(|| {
            ClientError::Validation("Please upload a PDF, DOCX, or TXT file".to_string())
        })?;

        let form = Form::new()
            .part("file", file.to_part()?)
            .text("title", details.title.clone())
            .text("description", details.description.clone())
            .text("difficulty", details.difficulty.to_string());

        let result: ClientResult<ApiEnvelope<Quiz>> = self
            .api
            .post_form(&format!("{}/upload", QUIZZES), form)
            .await;
        crate::metrics::record_upload(kind.as_str(), result.is_ok());

        let quiz = ensure_valid(result?.into_data()?.normalized())?;
        tracing::info!(quiz_id = %quiz.id, file = %file.file_name, "Quiz generated from document");
        Ok(quiz)
    }

    pub async fn list_quizzes(&self, limit: u32, offset: u32) -> ClientResult<QuizPage> {
        let query = [("limit", limit.to_string()), ("offset", offset.to_string())];
        let envelope: ApiEnvelope<Vec<Quiz>> =
            self.api.get(&format!("{}/", QUIZZES), &query).await?;

        let quizzes = envelope
            .into_data()?
            .into_iter()
            .map(|q| ensure_valid(q.normalized()))
            .collect::<ClientResult<Vec<_>>>()?;

        Ok(QuizPage {
            quizzes,
            limit,
            offset,
        })
    }

    pub async fn get_quiz(&self, id: &str) -> ClientResult<Quiz> {
        let path = format!("{}/{}", QUIZZES, id_segment(id)?);
        let envelope: ApiEnvelope<Quiz> = self.api.get(&path, &[]).await?;
        ensure_valid(envelope.into_data()?.normalized())
    }

    /// Quiz with the correct answers withheld. The endpoint answers with a
    /// bare quiz, not an envelope.
    pub async fn get_quiz_for_taking(&self, id: &str) -> ClientResult<Quiz> {
        let path = format!("{}/take/{}", QUIZZES, id_segment(id)?);
        let quiz: Quiz = self.api.get(&path, &[]).await?;
        ensure_valid(quiz.normalized())
    }

    pub async fn submit_attempt(&self, req: &SubmitQuizRequest) -> ClientResult<SubmitResult> {
        req.validate()?;
        let result: SubmitResult = self
            .api
            .post(&format!("{}/submit", QUIZZES), req)
            .await?;
        let result = ensure_valid(result)?;
        tracing::info!(
            quiz_id = %req.quiz_id,
            attempt_id = %result.attempt_id,
            percentage = result.percentage(),
            "Quiz attempt submitted"
        );
        Ok(result)
    }

    pub async fn get_attempt(&self, id: &str) -> ClientResult<AttemptDetail> {
        let path = format!("{}/attempt/{}", QUIZZES, id_segment(id)?);
        self.api.get(&path, &[]).await
    }

    pub async fn list_attempts(&self) -> ClientResult<Vec<AttemptListItem>> {
        let list: AttemptList = self
            .api
            .get(&format!("{}/attempts", QUIZZES), &[])
            .await?;
        Ok(ensure_valid(list)?.attempts)
    }

    pub async fn update_quiz(&self, id: &str, quiz: &Quiz) -> ClientResult<()> {
        quiz.validate()?;
        let path = format!("{}/{}", QUIZZES, id_segment(id)?);
        let ack: ApiMessage = self.api.put(&path, quiz).await?;
        tracing::info!(quiz_id = %id, message = %ack.message, "Quiz updated");
        Ok(())
    }

    pub async fn delete_quiz(&self, id: &str) -> ClientResult<()> {
        let path = format!("{}/{}", QUIZZES, id_segment(id)?);
        let ack: ApiMessage = self.api.delete(&path).await?;
        tracing::info!(quiz_id = %id, message = %ack.message, "Quiz deleted");
        Ok(())
    }
}
