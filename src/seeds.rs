//! Built-in content used when no bank could be loaded.

use crate::domain::{QuizBank, QuizQuestion};

pub const FALLBACK_BANK_ID: &str = "fallback";
pub const FALLBACK_BANK_NAME: &str = "Fallback Quiz - General Knowledge";

fn seed_question(index: u32, question: &str, answers: &[&str], correct: &str) -> QuizQuestion {
  QuizQuestion {
    question_id: format!("fallback_{}", index),
    question: question.into(),
    answers: answers.iter().map(|a| a.to_string()).collect(),
    correct_answers: vec![correct.into()],
    bank: Some(FALLBACK_BANK_NAME.into()),
    title: None,
  }
}

/// Minimal general-knowledge set that guarantees the app is usable
/// even when every bank resource is unavailable.
pub fn fallback_questions() -> Vec<QuizQuestion> {
  vec![
    seed_question(1, "What is the capital of France?", &["London", "Berlin", "Paris", "Madrid"], "Paris"),
    seed_question(2, "Which planet is known as the Red Planet?", &["Venus", "Mars", "Jupiter", "Saturn"], "Mars"),
    seed_question(3, "What is 2 + 2?", &["3", "4", "5", "6"], "4"),
  ]
}

pub fn fallback_bank() -> QuizBank {
  QuizBank {
    id: FALLBACK_BANK_ID.into(),
    name: FALLBACK_BANK_NAME.into(),
    questions: fallback_questions(),
  }
}
