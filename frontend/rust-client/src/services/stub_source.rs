use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use tokio::sync::RwLock;
use uuid::Uuid;
use validator::Validate;

use crate::config::DataSourceKind;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    AttemptDetail, AttemptListItem, AttemptQuiz, AttemptRecord, Difficulty, DocumentFile,
    DocumentKind, GenerateQuizRequest, Question, QuestionResult, Quiz, QuizDetails, QuizPage,
    SubmitQuizRequest, SubmitResult,
};
use crate::services::quiz_service::QuizDataSource;
use crate::utils::parse_timestamp;

const MAX_GENERATED_QUESTIONS: u32 = 50;

#[derive(Default)]
struct StubState {
    // Newest first
    quizzes: Vec<Quiz>,
    attempts: Vec<AttemptRecord>,
}

/// In-memory quiz repository for demo mode. Each instance owns its data.
pub struct StubQuizSource {
    owner: String,
    state: RwLock<StubState>,
}

impl StubQuizSource {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            state: RwLock::new(StubState::default()),
        }
    }

    /// Repository seeded with the demo quizzes.
    pub fn with_demo_data(owner: impl Into<String>) -> Self {
        let owner = owner.into();
        let quizzes = demo_quizzes(&owner);
        Self {
            owner,
            state: RwLock::new(StubState {
                quizzes,
                attempts: Vec::new(),
            }),
        }
    }

    async fn insert(&self, quiz: Quiz) -> Quiz {
        self.state.write().await.quizzes.insert(0, quiz.clone());
        tracing::info!(quiz_id = %quiz.id, title = %quiz.title, "Demo quiz created");
        quiz
    }
}

fn not_found(what: &str) -> ClientError {
    ClientError::Http {
        status: StatusCode::NOT_FOUND,
        message: format!("{} not found", what),
    }
}

fn percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    correct as f64 / total as f64 * 100.0
}

#[async_trait]
impl QuizDataSource for StubQuizSource {
    fn kind(&self) -> DataSourceKind {
        DataSourceKind::Stub
    }

    async fn list_quizzes(&self, limit: u32, offset: u32) -> ClientResult<QuizPage> {
        let state = self.state.read().await;
        let quizzes = state
            .quizzes
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(QuizPage {
            quizzes,
            limit,
            offset,
        })
    }

    async fn get_quiz(&self, id: &str) -> ClientResult<Quiz> {
        let state = self.state.read().await;
        state
            .quizzes
            .iter()
            .find(|q| q.id == id)
            .cloned()
            .ok_or_else(|| not_found("Quiz"))
    }

    async fn get_quiz_for_taking(&self, id: &str) -> ClientResult<Quiz> {
        let mut quiz = self.get_quiz(id).await?;
        for question in &mut quiz.questions {
            question.correct_answer = None;
            question.explanation = None;
        }
        Ok(quiz)
    }

    async fn generate_quiz(&self, req: &GenerateQuizRequest) -> ClientResult<Quiz> {
        req.validate()?;
        let mut quiz = template_quiz(&req.content, &req.title, &req.description, req.difficulty);
        quiz.user_id = Some(self.owner.clone());
        quiz.questions.truncate(req.question_count as usize);
        quiz.total_questions = quiz.questions.len();
        Ok(self.insert(quiz).await)
    }

    async fn upload_and_generate(
        &self,
        file: &DocumentFile,
        details: &QuizDetails,
    ) -> ClientResult<Quiz> {
        details.validate()?;
        let kind = file.kind().ok_or_else(|| {
            ClientError::Validation("Please upload a PDF, DOCX, or TXT file".to_string())
        })?;

        // Only plain text can be read locally; other formats are summarised by name
        let content = match kind {
            DocumentKind::Txt => String::from_utf8_lossy(&file.bytes).into_owned(),
            DocumentKind::Pdf | DocumentKind::Docx => String::new(),
        };
        let content = if content.trim().is_empty() {
            file.file_name.clone()
        } else {
            content
        };

        let mut quiz = self
            .generate_quiz(&GenerateQuizRequest {
                content,
                title: details.title.clone(),
                description: details.description.clone(),
                difficulty: details.difficulty,
                question_count: MAX_GENERATED_QUESTIONS,
            })
            .await?;

        quiz.pdf_filename = Some(file.file_name.clone());
        let mut state = self.state.write().await;
        if let Some(stored) = state.quizzes.iter_mut().find(|q| q.id == quiz.id) {
            stored.pdf_filename = quiz.pdf_filename.clone();
        }
        Ok(quiz)
    }

    async fn submit_attempt(&self, req: &SubmitQuizRequest) -> ClientResult<SubmitResult> {
        req.validate()?;
        let quiz = self.get_quiz(&req.quiz_id).await?;

        let results: Vec<QuestionResult> = quiz
            .questions
            .iter()
            .map(|q| {
                let user_answer = req.answers.get(&q.id).cloned().unwrap_or_default();
                QuestionResult {
                    question_id: q.id.clone(),
                    question_text: q.text.clone(),
                    is_correct: q.is_correct(&user_answer),
                    correct_answer: q.correct_answer.clone().unwrap_or_default(),
                    user_answer,
                }
            })
            .collect();

        let correct = results.iter().filter(|r| r.is_correct).count() as u32;
        let total = quiz.questions.len() as u32;
        let pct = percentage(correct, total);
        let now = Utc::now();

        let record = AttemptRecord {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz.id.clone(),
            user_id: self.owner.clone(),
            score: correct,
            total_questions: total,
            answers: req.answers.clone(),
            created_at: Some(now),
        };
        let attempt_id = record.id.clone();
        self.state.write().await.attempts.insert(0, record);

        Ok(SubmitResult {
            attempt_id,
            quiz_id: quiz.id,
            quiz_title: quiz.title,
            total_questions: total,
            correct_answers: Some(correct),
            score: pct,
            percentage: Some(pct),
            completed_at: Some(now),
            results,
        })
    }

    async fn get_attempt(&self, id: &str) -> ClientResult<AttemptDetail> {
        let state = self.state.read().await;
        let attempt = state
            .attempts
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| not_found("Attempt"))?;
        let quiz = state
            .quizzes
            .iter()
            .find(|q| q.id == attempt.quiz_id)
            .ok_or_else(|| not_found("Quiz"))?;

        Ok(AttemptDetail {
            quiz: AttemptQuiz {
                id: quiz.id.clone(),
                title: quiz.title.clone(),
                description: quiz.description.clone(),
                created_at: quiz.created_at,
                questions: quiz.questions.clone(),
            },
            questions: quiz.questions.clone(),
            attempt,
        })
    }

    async fn list_attempts(&self) -> ClientResult<Vec<AttemptListItem>> {
        let state = self.state.read().await;
        Ok(state
            .attempts
            .iter()
            .map(|a| {
                let quiz = state.quizzes.iter().find(|q| q.id == a.quiz_id);
                AttemptListItem {
                    id: a.id.clone(),
                    quiz_id: a.quiz_id.clone(),
                    quiz_title: quiz.map(|q| q.title.clone()),
                    pdf_filename: quiz.and_then(|q| q.pdf_filename.clone()),
                    score: a.score,
                    total_questions: a.total_questions,
                    percentage: a.percentage(),
                    created_at: a.created_at,
                }
            })
            .collect())
    }

    async fn update_quiz(&self, id: &str, quiz: &Quiz) -> ClientResult<()> {
        quiz.validate()?;
        let mut state = self.state.write().await;
        let stored = state
            .quizzes
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| not_found("Quiz"))?;

        stored.title = quiz.title.clone();
        stored.description = quiz.description.clone();
        stored.difficulty = quiz.difficulty;
        if !quiz.questions.is_empty() {
            stored.questions = quiz.questions.clone();
            stored.total_questions = stored.questions.len();
        }
        stored.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn delete_quiz(&self, id: &str) -> ClientResult<()> {
        let mut state = self.state.write().await;
        let before = state.quizzes.len();
        state.quizzes.retain(|q| q.id != id);
        if state.quizzes.len() == before {
            return Err(not_found("Quiz"));
        }
        tracing::info!(quiz_id = %id, "Demo quiz deleted");
        Ok(())
    }

    async fn search_quizzes(&self, query: &str) -> ClientResult<Vec<Quiz>> {
        let state = self.state.read().await;
        Ok(state
            .quizzes
            .iter()
            .filter(|q| q.matches(query))
            .cloned()
            .collect())
    }

    async fn quizzes_by_difficulty(&self, difficulty: Difficulty) -> ClientResult<Vec<Quiz>> {
        let state = self.state.read().await;
        Ok(state
            .quizzes
            .iter()
            .filter(|q| q.difficulty == Some(difficulty))
            .cloned()
            .collect())
    }
}

fn question(id: &str, text: &str, options: [&str; 4], correct: usize, explanation: &str) -> Question {
    let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
    Question {
        id: id.to_string(),
        text: text.to_string(),
        correct_answer: options.get(correct).cloned(),
        options,
        explanation: Some(explanation.to_string()),
        points: 1,
    }
}

fn demo_quiz(
    owner: &str,
    id: &str,
    title: &str,
    description: &str,
    difficulty: Difficulty,
    questions: Vec<Question>,
) -> Quiz {
    let created = parse_timestamp("2024-04-24");
    Quiz {
        id: id.to_string(),
        user_id: Some(owner.to_string()),
        title: title.to_string(),
        description: description.to_string(),
        difficulty: Some(difficulty),
        total_questions: questions.len(),
        questions,
        pdf_filename: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn demo_quizzes(owner: &str) -> Vec<Quiz> {
    vec![
        demo_quiz(
            owner,
            "1",
            "World Geography",
            "Explore your knowledge of world geography",
            Difficulty::Easy,
            vec![
                question(
                    "1-1",
                    "What is the capital of France?",
                    ["London", "Berlin", "Paris", "Madrid"],
                    2,
                    "Paris is the capital and most populous city of France.",
                ),
                question(
                    "1-2",
                    "Which continent is the largest by area?",
                    ["Africa", "Asia", "North America", "Europe"],
                    1,
                    "Asia is the largest continent by both area and population.",
                ),
                question(
                    "1-3",
                    "What is the longest river in the world?",
                    ["Amazon", "Nile", "Mississippi", "Yangtze"],
                    1,
                    "The Nile River is generally considered the longest river in the world.",
                ),
            ],
        ),
        demo_quiz(
            owner,
            "2",
            "World Geography Advanced",
            "Advanced questions about world geography",
            Difficulty::Hard,
            vec![
                question(
                    "2-1",
                    "Which country has the most time zones?",
                    ["Russia", "United States", "China", "Canada"],
                    0,
                    "Russia spans 11 time zones, more than any other country.",
                ),
                question(
                    "2-2",
                    "What is the smallest country in the world?",
                    ["Monaco", "Vatican City", "San Marino", "Liechtenstein"],
                    1,
                    "Vatican City is the smallest country in the world by both area and population.",
                ),
            ],
        ),
    ]
}

/// First six words of the content, capped at 50 characters.
pub fn main_topic(content: &str) -> String {
    let words: Vec<&str> = content.split_whitespace().take(6).collect();
    if words.is_empty() {
        return "the uploaded material".to_string();
    }
    let topic = words.join(" ");
    if topic.chars().count() > 50 {
        format!("{}...", topic.chars().take(50).collect::<String>())
    } else {
        topic
    }
}

/// Quiz built from fixed templates: three questions, one more for medium,
/// two more for hard. Only the id and timestamps vary between calls.
pub fn template_quiz(content: &str, title: &str, description: &str, difficulty: Difficulty) -> Quiz {
    let mut questions = vec![
        question(
            "demo-1",
            &format!(
                "Based on the uploaded content about '{}', which statement best describes the main topic?",
                main_topic(content)
            ),
            [
                "The content covers the specified topic in detail",
                "The content is unrelated to the topic",
                "The content provides only basic information",
                "The content is outdated and irrelevant",
            ],
            0,
            "This question is generated from your uploaded content analysis.",
        ),
        question(
            "demo-2",
            "What type of information would you expect to find in this material?",
            [
                "Detailed explanations and examples",
                "Only theoretical concepts",
                "Historical background only",
                "No relevant information",
            ],
            0,
            "Educational materials typically contain detailed explanations and practical examples.",
        ),
        question(
            "demo-3",
            &format!(
                "If you were studying from this material ({} difficulty), what approach would be most effective?",
                difficulty
            ),
            [
                "Read thoroughly and take notes",
                "Skim quickly for main points",
                "Memorize everything word-for-word",
                "Ignore the content completely",
            ],
            0,
            "Active reading and note-taking are proven effective study strategies.",
        ),
    ];

    if matches!(difficulty, Difficulty::Medium | Difficulty::Hard) {
        questions.push(question(
            "demo-4",
            "What critical thinking skill is most important when analyzing this type of content?",
            [
                "Evaluation and synthesis",
                "Simple memorization",
                "Speed reading only",
                "Passive consumption",
            ],
            0,
            "Higher-level thinking requires evaluation and synthesis of information.",
        ));
    }

    if difficulty == Difficulty::Hard {
        questions.push(question(
            "demo-5",
            "How would you apply the concepts from this material in a real-world scenario?",
            [
                "Connect theory to practical applications",
                "Use only in academic settings",
                "Apply without understanding context",
                "Avoid practical application",
            ],
            0,
            "Advanced learning involves connecting theoretical knowledge to real-world applications.",
        ));
    }

    let now = Utc::now();
    Quiz {
        id: Uuid::new_v4().to_string(),
        user_id: None,
        title: format!("{} (Demo Mode)", title),
        description: format!("{} - Generated in demonstration mode without AI.", description),
        difficulty: Some(difficulty),
        total_questions: questions.len(),
        questions,
        pdf_filename: None,
        created_at: Some(now),
        updated_at: Some(now),
    }
}
