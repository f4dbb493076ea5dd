use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DataSourceKind;
use crate::error::ClientResult;
use crate::metrics::QUIZ_SUBMISSIONS_TOTAL;
use crate::models::{
    AttemptDetail, AttemptListItem, Difficulty, DocumentFile, GenerateQuizRequest, Quiz,
    QuizDetails, QuizPage, SubmitQuizRequest, SubmitResult,
};
use crate::services::quiz_api::QuizApiClient;

/// Upper bound for the list fetched by the default search and filter.
const SEARCH_PAGE_SIZE: u32 = 100;

/// Where quizzes and attempts live.
#[async_trait]
pub trait QuizDataSource: Send + Sync {
    fn kind(&self) -> DataSourceKind;

    async fn list_quizzes(&self, limit: u32, offset: u32) -> ClientResult<QuizPage>;
    async fn get_quiz(&self, id: &str) -> ClientResult<Quiz>;
    async fn get_quiz_for_taking(&self, id: &str) -> ClientResult<Quiz>;
    async fn generate_quiz(&self, req: &GenerateQuizRequest) -> ClientResult<Quiz>;
    async fn upload_and_generate(
        &self,
        file: &DocumentFile,
        details: &QuizDetails,
    ) -> ClientResult<Quiz>;
    async fn submit_attempt(&self, req: &SubmitQuizRequest) -> ClientResult<SubmitResult>;
    async fn get_attempt(&self, id: &str) -> ClientResult<AttemptDetail>;
    async fn list_attempts(&self) -> ClientResult<Vec<AttemptListItem>>;
    async fn update_quiz(&self, id: &str, quiz: &Quiz) -> ClientResult<()>;
    async fn delete_quiz(&self, id: &str) -> ClientResult<()>;

    /// Case-insensitive match on title or description.
    async fn search_quizzes(&self, query: &str) -> ClientResult<Vec<Quiz>> {
        let page = self.list_quizzes(SEARCH_PAGE_SIZE, 0).await?;
        Ok(page
            .quizzes
            .into_iter()
            .filter(|q| q.matches(query))
            .collect())
    }

    async fn quizzes_by_difficulty(&self, difficulty: Difficulty) -> ClientResult<Vec<Quiz>> {
        let page = self.list_quizzes(SEARCH_PAGE_SIZE, 0).await?;
        Ok(page
            .quizzes
            .into_iter()
            .filter(|q| q.difficulty == Some(difficulty))
            .collect())
    }
}

/// The quiz backend over HTTP.
pub struct RemoteQuizSource {
    api: QuizApiClient,
}

impl RemoteQuizSource {
    pub fn new(api: QuizApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl QuizDataSource for RemoteQuizSource {
    fn kind(&self) -> DataSourceKind {
        DataSourceKind::Remote
    }

    async fn list_quizzes(&self, limit: u32, offset: u32) -> ClientResult<QuizPage> {
        self.api.list_quizzes(limit, offset).await
    }

    async fn get_quiz(&self, id: &str) -> ClientResult<Quiz> {
        self.api.get_quiz(id).await
    }

    async fn get_quiz_for_taking(&self, id: &str) -> ClientResult<Quiz> {
        self.api.get_quiz_for_taking(id).await
    }

    async fn generate_quiz(&self, req: &GenerateQuizRequest) -> ClientResult<Quiz> {
        self.api.generate_quiz(req).await
    }

    async fn upload_and_generate(
        &self,
        file: &DocumentFile,
        details: &QuizDetails,
    ) -> ClientResult<Quiz> {
        self.api.upload_and_generate(file, details).await
    }

    async fn submit_attempt(&self, req: &SubmitQuizRequest) -> ClientResult<SubmitResult> {
        self.api.submit_attempt(req).await
    }

    async fn get_attempt(&self, id: &str) -> ClientResult<AttemptDetail> {
        self.api.get_attempt(id).await
    }

    async fn list_attempts(&self) -> ClientResult<Vec<AttemptListItem>> {
        self.api.list_attempts().await
    }

    async fn update_quiz(&self, id: &str, quiz: &Quiz) -> ClientResult<()> {
        self.api.update_quiz(id, quiz).await
    }

    async fn delete_quiz(&self, id: &str) -> ClientResult<()> {
        self.api.delete_quiz(id).await
    }
}

/// Facade the pages talk to. The source is fixed at construction; errors
/// from it are returned as-is.
#[derive(Clone)]
pub struct QuizService {
    source: Arc<dyn QuizDataSource>,
}

impl QuizService {
    pub fn new(source: Arc<dyn QuizDataSource>) -> Self {
        Self { source }
    }

    /// True when serving locally generated demo data.
    pub fn is_demo(&self) -> bool {
        self.source.kind() == DataSourceKind::Stub
    }

    pub async fn list_quizzes(&self, limit: u32, offset: u32) -> ClientResult<QuizPage> {
        self.source.list_quizzes(limit, offset).await
    }

    pub async fn get_quiz(&self, id: &str) -> ClientResult<Quiz> {
        self.source.get_quiz(id).await
    }

    pub async fn get_quiz_for_taking(&self, id: &str) -> ClientResult<Quiz> {
        self.source.get_quiz_for_taking(id).await
    }

    pub async fn generate_quiz(&self, req: &GenerateQuizRequest) -> ClientResult<Quiz> {
        self.source.generate_quiz(req).await
    }

    pub async fn upload_and_generate(
        &self,
        file: &DocumentFile,
        details: &QuizDetails,
    ) -> ClientResult<Quiz> {
        self.source.upload_and_generate(file, details).await
    }

    pub async fn submit_attempt(&self, req: &SubmitQuizRequest) -> ClientResult<SubmitResult> {
        let result = self.source.submit_attempt(req).await?;
        QUIZ_SUBMISSIONS_TOTAL
            .with_label_values(&[self.source.kind().to_string()])
            .inc();
        Ok(result)
    }

    pub async fn get_attempt(&self, id: &str) -> ClientResult<AttemptDetail> {
        self.source.get_attempt(id).await
    }

    pub async fn list_attempts(&self) -> ClientResult<Vec<AttemptListItem>> {
        self.source.list_attempts().await
    }

    pub async fn update_quiz(&self, id: &str, quiz: &Quiz) -> ClientResult<()> {
        self.source.update_quiz(id, quiz).await
    }

    pub async fn delete_quiz(&self, id: &str) -> ClientResult<()> {
        self.source.delete_quiz(id).await
    }

    pub async fn search_quizzes(&self, query: &str) -> ClientResult<Vec<Quiz>> {
        self.source.search_quizzes(query).await
    }

    pub async fn quizzes_by_difficulty(&self, difficulty: Difficulty) -> ClientResult<Vec<Quiz>> {
        self.source.quizzes_by_difficulty(difficulty).await
    }
}
