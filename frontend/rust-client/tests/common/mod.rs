#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use quizlit_client::{
    config::Config,
    models::Credentials,
    services::{memory_provider::MemoryIdentityProvider, AppState},
};

pub const TEST_EMAIL: &str = "student@example.com";
pub const TEST_PASSWORD: &str = "hunter22";
pub const ANON_KEY: &str = "anon-key";
/// Refresh token the mock answers only after a delay.
pub const SLOW_REFRESH_TOKEN: &str = "refresh-slow";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

/// In-process stand-in for the quiz backend, the PDF endpoints and GoTrue.
#[derive(Default)]
pub struct MockBackend {
    pub quizzes: Mutex<Vec<Value>>,
    pub requests: Mutex<Vec<Recorded>>,
    pub submissions: Mutex<Vec<Value>>,
    pub uploads: Mutex<Vec<HashMap<String, String>>>,
}

impl MockBackend {
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn seed_quizzes() -> Vec<Value> {
    vec![
        json!({
            "id": "1",
            "user_id": "user-1",
            "title": "Rust Basics",
            "description": "Ownership and strings",
            "difficulty": "easy",
            "createdAt": "2024-04-24T10:00:00Z",
            "questions": [
                {"id": "q1", "text": "Which keyword declares a binding?", "options": ["let", "mut", "var"], "correctAnswer": 0},
                {"id": "q2", "text": "Which type is a growable string?", "options": ["&str", "String", "char"], "correctAnswer": 1}
            ],
            "totalQuestions": 2
        }),
        json!({
            "id": "2",
            "user_id": "user-1",
            "title": "Async Rust",
            "description": "Futures and executors",
            "difficulty": "hard",
            "created_at": "2024-05-01",
            "question_count": 0,
            "questions": []
        }),
    ]
}

pub async fn spawn_backend() -> (String, Arc<MockBackend>) {
    init_tracing();

    let backend = Arc::new(MockBackend {
        quizzes: Mutex::new(seed_quizzes()),
        ..Default::default()
    });

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/pdf/upload", post(pdf_upload))
        .route("/api/pdf/info", post(pdf_info))
        .route("/api/v1/quizzes/", get(list_quizzes))
        .route("/api/v1/quizzes/generate", post(generate_quiz))
        .route("/api/v1/quizzes/upload", post(upload_quiz))
        .route("/api/v1/quizzes/submit", post(submit_attempt))
        .route("/api/v1/quizzes/attempts", get(list_attempts))
        .route("/api/v1/quizzes/attempt/{id}", get(get_attempt))
        .route("/api/v1/quizzes/take/{id}", get(take_quiz))
        .route(
            "/api/v1/quizzes/{id}",
            get(get_quiz).put(update_quiz).delete(delete_quiz),
        )
        .route("/broken", get(broken))
        .route("/auth/v1/token", post(gotrue_token))
        .route("/auth/v1/signup", post(gotrue_signup))
        .route("/auth/v1/user", get(gotrue_user))
        .route("/auth/v1/logout", post(gotrue_logout))
        .layer(middleware::from_fn_with_state(backend.clone(), record))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), backend)
}

/// App state against the mock with a local account, not yet signed in.
pub fn signed_out_app(base_url: &str) -> AppState {
    let config = Config::for_base_url(base_url).unwrap();
    let provider = MemoryIdentityProvider::new("test-secret").with_account(TEST_EMAIL, TEST_PASSWORD);
    AppState::with_provider(config, Arc::new(provider))
}

pub async fn signed_in_app(base_url: &str) -> AppState {
    let app = signed_out_app(base_url);
    app.auth
        .sign_in(&Credentials::new(TEST_EMAIL, TEST_PASSWORD))
        .await
        .unwrap();
    app
}

async fn record(State(backend): State<Arc<MockBackend>>, request: Request, next: Next) -> Response {
    let recorded = {
        let header_value = |name: header::HeaderName| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Recorded {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            authorization: header_value(header::AUTHORIZATION),
            content_type: header_value(header::CONTENT_TYPE),
        }
    };
    backend.requests.lock().unwrap().push(recorded);
    next.run(request).await
}

fn error(status: StatusCode, key: &str, message: &str) -> Response {
    (status, Json(json!({ "success": false, key: message }))).into_response()
}

fn require_bearer(headers: &HeaderMap) -> Result<(), Response> {
    let ok = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer ") && v.len() > 7)
        .unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(error(StatusCode::UNAUTHORIZED, "message", "Missing authorization token"))
    }
}

async fn read_multipart(mut multipart: Multipart) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name() {
            fields.insert(format!("{}.name", name), file_name.to_string());
        }
        if let Some(content_type) = field.content_type() {
            fields.insert(format!("{}.type", name), content_type.to_string());
        }
        let data = field.bytes().await.unwrap();
        fields.insert(name, String::from_utf8_lossy(&data).into_owned());
    }
    fields
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "message": "PDF Parser API is running", "time": "2025-10-20T10:00:00Z"}))
}

async fn pdf_upload(State(backend): State<Arc<MockBackend>>, multipart: Multipart) -> Response {
    let fields = read_multipart(multipart).await;
    backend.uploads.lock().unwrap().push(fields.clone());
    let name = fields.get("file.name").cloned().unwrap_or_default();
    let body = fields.get("file").cloned().unwrap_or_default();
    if !body.starts_with("%PDF") {
        return error(StatusCode::BAD_REQUEST, "error", "Invalid PDF file");
    }
    Json(json!({
        "success": true,
        "message": "PDF processed successfully",
        "data": {
            "filename": name,
            "file_size": "0.01 MB",
            "page_count": 1,
            "text": "Hello from the PDF",
            "word_count": 4
        }
    }))
    .into_response()
}

async fn pdf_info(multipart: Multipart) -> Response {
    let fields = read_multipart(multipart).await;
    let body = fields.get("file").cloned().unwrap_or_default();
    if !body.starts_with("%PDF") {
        // No error field: the client falls back to its own message
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"success": false}))).into_response();
    }
    Json(json!({
        "success": true,
        "message": "PDF info retrieved",
        "data": {"filename": fields.get("file.name"), "file_size": "0.01 MB", "page_count": 3}
    }))
    .into_response()
}

async fn list_quizzes(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) = require_bearer(&headers) {
        return response;
    }
    let limit = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(usize::MAX);
    let offset = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let quizzes: Vec<Value> = backend
        .quizzes
        .lock()
        .unwrap()
        .iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();
    Json(json!({"success": true, "message": "Quizzes retrieved successfully", "data": quizzes}))
        .into_response()
}

fn generated_quiz(id: &str, title: &str, description: &str, difficulty: &str) -> Value {
    json!({
        "id": id,
        "user_id": "user-1",
        "title": title,
        "description": description,
        "difficulty": difficulty,
        "questions": [
            {"id": format!("{}-1", id), "question": "Generated question?", "options": ["yes", "no"], "correctAnswer": 0, "explanation": "Because."}
        ],
        "createdAt": "2025-10-20T10:00:00Z",
        "updatedAt": "2025-10-20T10:00:00Z"
    })
}

async fn generate_quiz(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = require_bearer(&headers) {
        return response;
    }
    if body["title"] == "explode" {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "message", "AI service unavailable");
    }
    let quiz = generated_quiz(
        "gen-1",
        body["title"].as_str().unwrap_or_default(),
        body["description"].as_str().unwrap_or_default(),
        body["difficulty"].as_str().unwrap_or_default(),
    );
    backend.quizzes.lock().unwrap().insert(0, quiz.clone());
    Json(json!({"success": true, "message": "Quiz generated successfully", "data": quiz})).into_response()
}

async fn upload_quiz(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    if let Err(response) = require_bearer(&headers) {
        return response;
    }
    let fields = read_multipart(multipart).await;
    backend.uploads.lock().unwrap().push(fields.clone());
    let mut quiz = generated_quiz(
        "up-1",
        fields.get("title").map(String::as_str).unwrap_or_default(),
        fields.get("description").map(String::as_str).unwrap_or_default(),
        fields.get("difficulty").map(String::as_str).unwrap_or_default(),
    );
    quiz["pdf_filename"] = json!(fields.get("file.name"));
    backend.quizzes.lock().unwrap().insert(0, quiz.clone());
    Json(json!({"success": true, "message": "Quiz generated from file", "data": quiz})).into_response()
}

fn find_quiz(backend: &MockBackend, id: &str) -> Option<Value> {
    backend
        .quizzes
        .lock()
        .unwrap()
        .iter()
        .find(|q| q["id"] == id)
        .cloned()
}

async fn get_quiz(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = require_bearer(&headers) {
        return response;
    }
    match find_quiz(&backend, &id) {
        Some(quiz) => Json(json!({"success": true, "message": "Quiz retrieved successfully", "data": quiz})).into_response(),
        None => error(StatusCode::NOT_FOUND, "message", "Quiz not found"),
    }
}

async fn update_quiz(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = require_bearer(&headers) {
        return response;
    }
    let mut quizzes = backend.quizzes.lock().unwrap();
    match quizzes.iter_mut().find(|q| q["id"] == id.as_str()) {
        Some(quiz) => {
            quiz["title"] = body["title"].clone();
            Json(json!({"success": true, "message": "Quiz updated successfully"})).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "message", "quiz not found"),
    }
}

async fn delete_quiz(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = require_bearer(&headers) {
        return response;
    }
    let mut quizzes = backend.quizzes.lock().unwrap();
    let before = quizzes.len();
    quizzes.retain(|q| q["id"] != id.as_str());
    if quizzes.len() == before {
        return error(StatusCode::NOT_FOUND, "message", "Quiz not found");
    }
    Json(json!({"success": true, "message": "Quiz deleted successfully"})).into_response()
}

async fn take_quiz(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = require_bearer(&headers) {
        return response;
    }
    let Some(mut quiz) = find_quiz(&backend, &id) else {
        return error(StatusCode::NOT_FOUND, "error", "Quiz not found");
    };
    if let Some(questions) = quiz["questions"].as_array_mut() {
        for q in questions {
            q["correctAnswer"] = json!(-1);
            q["correct"] = json!("");
            q["type"] = json!("multiple_choice");
        }
    }
    Json(quiz).into_response()
}

async fn submit_attempt(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = require_bearer(&headers) {
        return response;
    }
    let quiz_id = body["quiz_id"].as_str().unwrap_or_default().to_string();
    let Some(quiz) = find_quiz(&backend, &quiz_id) else {
        return error(StatusCode::NOT_FOUND, "error", "Quiz not found");
    };
    backend.submissions.lock().unwrap().push(body.clone());

    let questions = quiz["questions"].as_array().cloned().unwrap_or_default();
    let mut correct = 0;
    let results: Vec<Value> = questions
        .iter()
        .map(|q| {
            let answer_index = q["correctAnswer"].as_u64().unwrap_or(0) as usize;
            let correct_answer = q["options"][answer_index].as_str().unwrap_or_default();
            let user_answer = body["answers"][q["id"].as_str().unwrap_or_default()]
                .as_str()
                .unwrap_or_default();
            let is_correct = user_answer == correct_answer;
            if is_correct {
                correct += 1;
            }
            json!({
                "question_id": q["id"],
                "question_text": q["text"],
                "user_answer": user_answer,
                "correct_answer": correct_answer,
                "is_correct": is_correct
            })
        })
        .collect();
    let total = questions.len();
    let percentage = if total == 0 { 0.0 } else { correct as f64 / total as f64 * 100.0 };

    Json(json!({
        "attempt_id": "att-1",
        "quiz_id": quiz_id,
        "quiz_title": quiz["title"],
        "total_questions": total,
        "correct_answers": correct,
        "score": percentage,
        "completed_at": "2025-10-20T10:05:00Z",
        "results": results
    }))
    .into_response()
}

async fn get_attempt(
    State(backend): State<Arc<MockBackend>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = require_bearer(&headers) {
        return response;
    }
    if id != "att-1" {
        return error(StatusCode::NOT_FOUND, "error", "Attempt not found");
    }
    let answers = backend
        .submissions
        .lock()
        .unwrap()
        .last()
        .map(|s| s["answers"].clone())
        .unwrap_or_else(|| json!({"10": "Paris", "11": "Nile"}));

    // Stored columns come back JSON-encoded on this path
    Json(json!({
        "attempt": {
            "id": 1,
            "quiz_id": 1,
            "user_id": "user-1",
            "score": 1,
            "total_questions": 2,
            "answers": answers.to_string(),
            "created_at": "2025-10-20T10:05:00Z"
        },
        "quiz": {"id": 1, "title": "Geography", "description": "", "created_at": "2025-10-19T10:00:00Z"},
        "questions": [
            {"id": 10, "question_text": "Capital of France?", "options": "[\"Paris\",\"Rome\"]", "correct_answer": "Paris"},
            {"id": 11, "question_text": "Largest continent?", "options": "[\"Asia\",\"Nile\"]", "correct_answer": "Asia"}
        ]
    }))
    .into_response()
}

async fn list_attempts(headers: HeaderMap) -> Response {
    if let Err(response) = require_bearer(&headers) {
        return response;
    }
    Json(json!({
        "attempts": [
            {"id": "att-2", "quiz_id": "1", "quiz_title": "Rust Basics", "score": 2, "total_questions": 2, "percentage": 100.0, "created_at": "2025-10-21T09:00:00Z"},
            {"id": "att-1", "quiz_id": 2, "pdf_filename": "notes.pdf", "score": 1, "total_questions": 2, "percentage": 50.0, "created_at": "2025-10-20T10:05:00Z"}
        ],
        "total": 2
    }))
    .into_response()
}

async fn broken() -> Response {
    (StatusCode::NOT_FOUND, "no such thing").into_response()
}

fn gotrue_user_json(email: &str) -> Value {
    json!({
        "id": format!("uid-{}", email),
        "email": email,
        "user_metadata": {"full_name": "Ada Lovelace"}
    })
}

fn gotrue_session(email: &str, access: &str, expires_in: i64) -> Value {
    json!({
        "access_token": access,
        "refresh_token": "refresh-1",
        "token_type": "bearer",
        "expires_in": expires_in,
        "user": gotrue_user_json(email)
    })
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(ANON_KEY)
}

async fn gotrue_token(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if !has_api_key(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "No API key found in request"}))).into_response();
    }
    match query.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = body["email"].as_str().unwrap_or_default();
            match (email, body["password"].as_str()) {
                ("ada@example.com", Some("secret")) => Json(gotrue_session(email, "access-1", 3600)).into_response(),
                // Already expired: forces a refresh on the next read
                ("short@example.com", Some("secret")) => Json(gotrue_session(email, "access-1", 0)).into_response(),
                _ => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "invalid_grant", "error_description": "Invalid login credentials"})),
                )
                    .into_response(),
            }
        }
        Some("refresh_token") if body["refresh_token"] == "refresh-1" => {
            Json(gotrue_session("short@example.com", "access-2", 3600)).into_response()
        }
        Some("refresh_token") if body["refresh_token"] == SLOW_REFRESH_TOKEN => {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Json(gotrue_session("slow@example.com", "fresh", 3600)).into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Invalid Refresh Token"})),
        )
            .into_response(),
    }
}

async fn gotrue_signup(Json(body): Json<Value>) -> Response {
    match body["email"].as_str() {
        Some("auto@example.com") => Json(gotrue_session("auto@example.com", "access-1", 3600)).into_response(),
        Some("taken@example.com") => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"code": 422, "msg": "User already registered"})),
        )
            .into_response(),
        Some(email) => Json(gotrue_user_json(email)).into_response(),
        None => (StatusCode::BAD_REQUEST, Json(json!({"msg": "email required"}))).into_response(),
    }
}

async fn gotrue_user(headers: HeaderMap) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    match token {
        "access-1" => Json(gotrue_user_json("ada@example.com")).into_response(),
        "access-2" => Json(gotrue_user_json("short@example.com")).into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"msg": "invalid JWT"}))).into_response(),
    }
}

async fn gotrue_logout() -> StatusCode {
    StatusCode::NO_CONTENT
}
