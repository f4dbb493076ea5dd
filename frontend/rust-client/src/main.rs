use std::io::Write as _;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizlit_client::{
    config::Config,
    metrics,
    models::{Credentials, Difficulty, DocumentFile},
    pages::{
        dashboard::PAGE_SIZE, CreateQuizPage, DashboardPage, HistoryPage, LoadState, ProfilePage, QuizMode, ResultsPage,
        ResultsView, Route, TakeQuizPage, TakeQuizStage,
    },
    services::{AppState, DEMO_EMAIL, DEMO_PASSWORD},
    utils::time::format_datetime,
};

const USAGE: &str = "usage: quizlit <command>

commands:
  health                                          check the backend
  quizzes [limit] [offset]                        list your quizzes
  take <quiz-id>                                  answer a quiz interactively
  history                                         list past attempts
  result <attempt-id>                             show a graded attempt
  generate <title> <description> <difficulty> [file]
                                                  create a quiz
  extract <file.pdf>                              extract text from a PDF
  delete <quiz-id>                                delete a quiz
  profile                                         show the signed-in user
  metrics                                         print client metrics";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizlit_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = Config::load().context("Failed to load configuration")?;
    let app = AppState::new(config).context("Failed to initialize client")?;
    if app.quizzes.is_demo() {
        tracing::info!("Running against demo data");
    }

    sign_in(&app).await?;

    let rest = &args[1..];
    match command {
        "health" => health(&app).await,
        "quizzes" => quizzes(&app, rest).await,
        "take" => take(&app, arg(rest, 0, "quiz id")?).await,
        "history" => history(&app).await,
        "result" => result(&app, arg(rest, 0, "attempt id")?).await,
        "generate" => generate(&app, rest).await,
        "extract" => extract(&app, arg(rest, 0, "pdf path")?).await,
        "delete" => delete(&app, arg(rest, 0, "quiz id")?).await,
        "profile" => profile(&app).await,
        "metrics" => {
            print!("{}", metrics::render_metrics()?);
            Ok(())
        }
        other => {
            eprintln!("{}", USAGE);
            bail!("unknown command '{}'", other)
        }
    }
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing {}", name))
}

async fn sign_in(app: &AppState) -> Result<()> {
    let (email, password) = match app.config.credentials() {
        Some(credentials) => credentials,
        None if app.config.auth_url.is_none() => (DEMO_EMAIL, DEMO_PASSWORD),
        None => return Ok(()),
    };
    app.auth
        .sign_in(&Credentials::new(email, password))
        .await
        .context("Sign-in failed")?;
    Ok(())
}

fn unwrap_state<T>(state: LoadState<T>) -> Result<T> {
    match state {
        LoadState::Ready(value) => Ok(value),
        LoadState::Failed(message) => Err(anyhow!(message)),
        LoadState::Redirect(Route::Login) => {
            bail!("Not signed in. Set QUIZLIT_EMAIL and QUIZLIT_PASSWORD.")
        }
        LoadState::Redirect(route) => bail!("Redirected to {}", route),
        LoadState::Loading => bail!("Still loading"),
    }
}

async fn health(app: &AppState) -> Result<()> {
    let health = app.pdf.check_health().await?;
    println!("{}: {}", health.status, health.message);
    Ok(())
}

async fn quizzes(app: &AppState, args: &[String]) -> Result<()> {
    let limit = args.first().map(|v| v.parse()).transpose()?;
    let offset = args.get(1).map(|v| v.parse()).transpose()?;

    let mut page = DashboardPage::with_paging(limit.unwrap_or(PAGE_SIZE), offset.unwrap_or(0));
    page.load(app).await;
    let stats = page.stats();
    let demo = page.demo;
    let quizzes = unwrap_state(page.state)?;

    if demo {
        println!("(demo data)");
    }
    for quiz in &quizzes {
        println!(
            "{}  {}  [{}]  {} questions  {}",
            quiz.id,
            quiz.title,
            quiz.difficulty.map(|d| d.label()).unwrap_or("Unknown"),
            quiz.total_questions,
            quiz.created_at.as_ref().map(format_datetime).unwrap_or_default()
        );
    }
    println!(
        "{} quizzes, {} questions",
        stats.total_quizzes, stats.total_questions
    );
    Ok(())
}

async fn take(app: &AppState, quiz_id: &str) -> Result<()> {
    let mut page = TakeQuizPage::new(quiz_id);
    page.load(app).await;
    match &page.stage {
        TakeQuizStage::Failed(message) => bail!(message.clone()),
        TakeQuizStage::Redirect(_) => bail!("Not signed in. Set QUIZLIT_EMAIL and QUIZLIT_PASSWORD."),
        _ => {}
    }

    page.select_mode(QuizMode::Practice)?;
    page.start()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(question) = page.current_question().cloned() {
        println!();
        println!("[{:.0}%] {}", page.progress(), question.text);
        for (i, option) in question.options.iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }
        print!("answer (number, or 'b' to go back): ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            bail!("input closed before the quiz was finished");
        };
        let line = line.trim();
        if line.eq_ignore_ascii_case("b") {
            page.previous();
            continue;
        }

        let choice = line
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| question.options.get(i));
        match choice {
            Some(option) => page.select_answer(option)?,
            None => {
                println!("pick a number between 1 and {}", question.options.len());
                continue;
            }
        }

        page.next(app).await?;
        if matches!(page.stage, TakeQuizStage::Submitted { .. }) {
            break;
        }
    }

    let Some(Route::QuizResults(attempt_id)) = page.navigation() else {
        bail!("quiz was not submitted");
    };
    result(app, &attempt_id).await
}

async fn history(app: &AppState) -> Result<()> {
    let mut page = HistoryPage::new();
    page.load(app).await;
    let average = page.average_percentage();
    let attempts = unwrap_state(page.state)?;

    for item in &attempts {
        println!(
            "{}  {}  {}/{}  {:.1}%  {}",
            item.id,
            HistoryPage::title(item),
            item.score,
            item.total_questions,
            item.percentage,
            HistoryPage::date_label(item)
        );
    }
    if let Some(average) = average {
        println!("average score: {}%", average);
    }
    Ok(())
}

async fn result(app: &AppState, attempt_id: &str) -> Result<()> {
    let mut page = ResultsPage::new(attempt_id);
    page.load(app).await;
    let view: ResultsView = unwrap_state(page.state)?;

    println!("{}", view.title());
    println!(
        "score {}/{}  {}  ({:?})",
        view.detail.attempt.score,
        view.detail.attempt.total_questions,
        view.percentage_label(),
        view.band
    );
    for (i, q) in view.questions.iter().enumerate() {
        let mark = if q.is_correct { "✓" } else { "✗" };
        println!("{} {}. {}", mark, i + 1, q.question_text);
        println!("    your answer: {}", q.user_answer);
        if !q.is_correct {
            println!("    correct:     {}", q.correct_answer);
        }
    }
    Ok(())
}

async fn generate(app: &AppState, args: &[String]) -> Result<()> {
    let title = arg(args, 0, "title")?;
    let description = arg(args, 1, "description")?;
    let difficulty: Difficulty = arg(args, 2, "difficulty")?
        .parse()
        .map_err(|e: String| anyhow!(e))?;

    let mut page = CreateQuizPage::new();
    match args.get(3) {
        Some(path) => page.choose_file(DocumentFile::from_path(path).await?)?,
        None => page.create_manually(),
    }
    page.set_title(title);
    page.set_description(description);
    page.set_difficulty(difficulty);

    let quiz = page.generate(app).await?;
    println!(
        "created {} \"{}\" with {} questions",
        quiz.id, quiz.title, quiz.total_questions
    );
    Ok(())
}

async fn extract(app: &AppState, path: &str) -> Result<()> {
    let file = DocumentFile::from_path(path).await?;
    let response = app
        .pdf
        .upload_with_progress(&file, |percent| eprint!("\ruploading {:>3.0}%", percent))
        .await;
    eprintln!();
    let response = response?;

    let data = response
        .data
        .ok_or_else(|| anyhow!("server returned no extracted text"))?;
    println!(
        "{}: {} pages, {} words, {}",
        data.filename, data.page_count, data.word_count, data.file_size
    );
    println!();
    println!("{}", data.text);
    Ok(())
}

async fn delete(app: &AppState, quiz_id: &str) -> Result<()> {
    let mut page = DashboardPage::new();
    page.load(app).await;
    if let Some(route) = page.state.redirect() {
        bail!("Redirected to {}", route);
    }
    page.delete(app, quiz_id).await?;
    println!("deleted {}; {} quizzes left", quiz_id, page.stats().total_quizzes);
    Ok(())
}

async fn profile(app: &AppState) -> Result<()> {
    let mut page = ProfilePage::new();
    page.load(app).await;
    let view = unwrap_state(page.state)?;
    println!("{} ({})", view.display_name, view.initials);
    if let Some(email) = view.email {
        println!("{}", email);
    }
    Ok(())
}
