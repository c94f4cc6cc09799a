//! Domain models: raw quiz questions as stored in bank files, loaded banks, and
//! the display-ready processed question.

use serde::{Deserialize, Deserializer, Serialize};

/// Selection id meaning "all banks combined, shuffled".
pub const COMPREHENSIVE_ID: &str = "comprehensive";

/// Sort key for banks whose name carries no "Chapter <N>".
pub const NO_CHAPTER: u32 = 999;

/// One question as it appears in a bank file.
/// Export leftovers (`index`, `selectedAnswer`, `isCorrect`) are ignored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  #[serde(default, deserialize_with = "null_as_empty")]
  pub question_id: String,
  pub question: String,
  pub answers: Vec<String>,
  pub correct_answers: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bank: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
}

impl QuizQuestion {
  /// Bank name, empty when the file carries none.
  pub fn bank_name(&self) -> &str {
    self.bank.as_deref().unwrap_or("")
  }
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
  Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// A named collection of questions loaded from one resource.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuizBank {
  pub id: String,
  pub name: String,
  pub questions: Vec<QuizQuestion>,
}

impl QuizBank {
  pub fn chapter(&self) -> u32 {
    chapter_number(&self.name)
  }
}

/// A question ready for presentation.
/// `correct_answer` is `None` when no option matches the accepted answers;
/// such a question can never be answered correctly.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ProcessedQuestion {
  /// 1-based position within the bank it came from.
  pub id: usize,
  pub question_id: String,
  pub text: String,
  pub options: Vec<String>,
  pub correct_answer: Option<usize>,
  pub bank: String,
}

impl ProcessedQuestion {
  /// Wire form of the correct index: `-1` when unresolvable.
  pub fn correct_index(&self) -> i64 {
    self.correct_answer.map(|i| i as i64).unwrap_or(-1)
  }
}

/// Extract N from the first "Chapter <N>" (case-insensitive, at least one
/// whitespace between word and digits). Falls back to `NO_CHAPTER`.
pub fn chapter_number(name: &str) -> u32 {
  let lower = name.to_ascii_lowercase();
  let mut from = 0;
  while let Some(pos) = lower[from..].find("chapter") {
    let rest = &lower[from + pos + "chapter".len()..];
    let digits_at = rest.len() - rest.trim_start().len();
    if digits_at > 0 {
      let digits: String = rest[digits_at..].chars().take_while(|c| c.is_ascii_digit()).collect();
      if let Ok(n) = digits.parse::<u32>() {
        return n;
      }
    }
    from += pos + "chapter".len();
  }
  NO_CHAPTER
}
