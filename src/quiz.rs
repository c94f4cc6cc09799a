//! Question normalization and comprehensive-review assembly.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{ProcessedQuestion, QuizBank, QuizQuestion};
use crate::util::capitalize_first;

/// Index of the first option that is listed among the accepted answers.
/// Matching is exact string equality, no trimming or case folding.
pub fn correct_index(q: &QuizQuestion) -> Option<usize> {
  q.answers.iter().position(|a| q.correct_answers.contains(a))
}

/// Turn a raw question into its display form. `display_id` is 1-based.
pub fn normalize(raw: &QuizQuestion, display_id: usize) -> ProcessedQuestion {
  ProcessedQuestion {
    id: display_id,
    question_id: raw.question_id.clone(),
    text: capitalize_first(&raw.question),
    options: raw.answers.clone(),
    correct_answer: correct_index(raw),
    bank: raw.bank_name().to_string(),
  }
}

/// Normalize a bank's questions in their original order.
pub fn process_questions(questions: &[QuizQuestion]) -> Vec<ProcessedQuestion> {
  questions.iter().enumerate().map(|(i, q)| normalize(q, i + 1)).collect()
}

/// Every question from every bank, uniformly shuffled with `rng`.
pub fn build_comprehensive_with<R: Rng + ?Sized>(banks: &[QuizBank], rng: &mut R) -> Vec<ProcessedQuestion> {
  let mut all: Vec<ProcessedQuestion> = banks.iter().flat_map(|b| process_questions(&b.questions)).collect();
  // SliceRandom::shuffle is Fisher-Yates: i from last down to 1, swap with j in [0, i].
  all.shuffle(rng);
  all
}

/// Every question from every bank, freshly shuffled on each call.
pub fn build_comprehensive(banks: &[QuizBank]) -> Vec<ProcessedQuestion> {
  build_comprehensive_with(banks, &mut rand::thread_rng())
}
