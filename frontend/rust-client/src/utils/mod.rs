pub mod score;
pub mod time;

pub use score::{calculate_quiz_score, QuizScore};
pub use time::{format_date, parse_timestamp};
