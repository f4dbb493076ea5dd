use serde::Serialize;

use crate::models::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizScore {
    pub score: usize,
    pub percentage: u32,
    pub correct: usize,
    pub total: usize,
}

/// Scores answers given as option indices, position by position.
///
/// Answers beyond the last question are ignored; questions without a known
/// correct answer never count as correct.
pub fn calculate_quiz_score(answers: &[usize], questions: &[Question]) -> QuizScore {
    let correct = answers
        .iter()
        .zip(questions)
        .filter(|(answer, question)| question.correct_index() == Some(**answer))
        .count();

    let total = questions.len();
    QuizScore {
        score: correct,
        percentage: percentage_of(correct, total),
        correct,
        total,
    }
}

/// Rounded whole percentage; 0 when there is nothing to score.
pub fn percentage_of(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}
