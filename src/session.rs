//! Quiz session state machine.
//!
//! A session starts in `Loading` until banks are attached, then runs
//! `Answering -> Revealed -> Answering ... -> Revealed -> Finished`.
//! Invalid transitions return a `SessionError` and leave the session untouched.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{ProcessedQuestion, QuizBank, COMPREHENSIVE_ID};
use crate::persistence::Snapshot;
use crate::quiz::{build_comprehensive, process_questions};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
  /// Banks not installed yet.
  Loading,
  /// Banks installed but the current selection has no questions.
  NoContent,
  Answering { selected: Option<usize> },
  /// `selected` is None only for a question restored as already submitted.
  Revealed { selected: Option<usize> },
  /// Past the last question.
  Finished,
}

impl Phase {
  pub fn name(&self) -> &'static str {
    match self {
      Phase::Loading => "loading",
      Phase::NoContent => "no_content",
      Phase::Answering { .. } => "answering",
      Phase::Revealed { .. } => "revealed",
      Phase::Finished => "finished",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
  #[error("quizzes are still loading")]
  NotReady,
  #[error("no questions available")]
  NoContent,
  #[error("unknown quiz id: {0}")]
  InvalidSelection(String),
  #[error("answer already submitted for this question")]
  AlreadyRevealed,
  #[error("current question has not been submitted yet")]
  NotRevealed,
  #[error("no option selected")]
  NoOptionSelected,
  #[error("option {index} out of range ({len} options)")]
  OptionOutOfRange { index: usize, len: usize },
  #[error("quiz is finished; restart or select another quiz")]
  Finished,
}

/// A user intent, as delivered by either transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
  SelectQuiz(String),
  SelectOption(usize),
  Submit,
  Advance,
  Restart,
}

#[derive(Clone, Debug)]
pub struct SessionController {
  banks: Arc<Vec<QuizBank>>,
  selected_quiz: String,
  questions: Vec<ProcessedQuestion>,
  cursor: usize,
  phase: Phase,
  score: u32,
  completed: BTreeSet<usize>,
}

impl Default for SessionController {
  fn default() -> Self {
    Self::new()
  }
}

impl SessionController {
  pub fn new() -> Self {
    Self {
      banks: Arc::new(Vec::new()),
      selected_quiz: COMPREHENSIVE_ID.into(),
      questions: Vec::new(),
      cursor: 0,
      phase: Phase::Loading,
      score: 0,
      completed: BTreeSet::new(),
    }
  }

  /// Install loaded banks and start a comprehensive review.
  pub fn attach_banks(&mut self, banks: Arc<Vec<QuizBank>>) {
    self.banks = banks;
    self.phase = Phase::NoContent;
    if let Err(e) = self.select_quiz(COMPREHENSIVE_ID) {
      warn!(target: "quiz", error = %e, "Comprehensive selection failed after attaching banks");
    }
  }

  pub fn is_loading(&self) -> bool {
    self.phase == Phase::Loading
  }

  /// Replace the question sequence and reset progress. An unknown id leaves
  /// the session exactly as it was.
  pub fn select_quiz(&mut self, id: &str) -> Result<(), SessionError> {
    self.select_with(id, build_comprehensive)
  }

  /// Same as `select_quiz`, shuffling comprehensive review with `rng`.
  #[cfg(test)]
  pub fn select_quiz_with<R: rand::Rng + ?Sized>(&mut self, id: &str, rng: &mut R) -> Result<(), SessionError> {
    self.select_with(id, |banks| crate::quiz::build_comprehensive_with(banks, rng))
  }

  fn select_with<F>(&mut self, id: &str, comprehensive: F) -> Result<(), SessionError>
  where
    F: FnOnce(&[QuizBank]) -> Vec<ProcessedQuestion>,
  {
    if self.phase == Phase::Loading {
      return Err(SessionError::NotReady);
    }
    let questions = if id == COMPREHENSIVE_ID {
      comprehensive(self.banks.as_slice())
    } else {
      let bank = self
        .banks
        .iter()
        .find(|b| b.id == id)
        .ok_or_else(|| SessionError::InvalidSelection(id.to_string()))?;
      process_questions(&bank.questions)
    };

    self.selected_quiz = id.to_string();
    self.questions = questions;
    self.reset_progress();
    debug!(target: "quiz", quiz = %id, questions = self.questions.len(), "Quiz selected");
    Ok(())
  }

  /// Record the chosen option for the active question. Does not score.
  pub fn select_option(&mut self, index: usize) -> Result<(), SessionError> {
    match self.phase {
      Phase::Answering { .. } => {
        let len = self.current_question().map(|q| q.options.len()).unwrap_or(0);
        if index >= len {
          return Err(SessionError::OptionOutOfRange { index, len });
        }
        self.phase = Phase::Answering { selected: Some(index) };
        Ok(())
      }
      _ => Err(self.blocked_error()),
    }
  }

  /// Score the selected option and reveal the result. Returns whether it was correct.
  pub fn submit(&mut self) -> Result<bool, SessionError> {
    match self.phase {
      Phase::Answering { selected: Some(selected) } => {
        let correct = self
          .current_question()
          .map(|q| q.correct_answer == Some(selected))
          .unwrap_or(false);
        if correct {
          self.score += 1;
        }
        self.completed.insert(self.cursor);
        self.phase = Phase::Revealed { selected: Some(selected) };
        debug!(target: "quiz", cursor = self.cursor, selected, correct, score = self.score, "Answer submitted");
        Ok(correct)
      }
      Phase::Answering { selected: None } => Err(SessionError::NoOptionSelected),
      _ => Err(self.blocked_error()),
    }
  }

  /// Move past a revealed question; from the last one this finishes the quiz.
  pub fn advance(&mut self) -> Result<(), SessionError> {
    match self.phase {
      Phase::Revealed { .. } => {
        if self.cursor + 1 < self.questions.len() {
          self.cursor += 1;
          self.phase = Phase::Answering { selected: None };
        } else {
          self.phase = Phase::Finished;
          debug!(target: "quiz", score = self.score, total = self.questions.len(), "Quiz finished");
        }
        Ok(())
      }
      Phase::Answering { .. } => Err(SessionError::NotRevealed),
      _ => Err(self.blocked_error()),
    }
  }

  /// Start over on the same questions, in the same order.
  pub fn restart(&mut self) -> Result<(), SessionError> {
    match self.phase {
      Phase::Loading => Err(SessionError::NotReady),
      Phase::NoContent => Err(SessionError::NoContent),
      _ => {
        self.reset_progress();
        Ok(())
      }
    }
  }

  pub fn apply(&mut self, action: Action) -> Result<(), SessionError> {
    match action {
      Action::SelectQuiz(id) => self.select_quiz(&id),
      Action::SelectOption(i) => self.select_option(i),
      Action::Submit => self.submit().map(|_| ()),
      Action::Advance => self.advance(),
      Action::Restart => self.restart(),
    }
  }

  fn reset_progress(&mut self) {
    self.cursor = 0;
    self.score = 0;
    self.completed.clear();
    self.phase = if self.questions.is_empty() { Phase::NoContent } else { Phase::Answering { selected: None } };
  }

  /// Error for an operation attempted in a phase that does not accept it.
  fn blocked_error(&self) -> SessionError {
    match self.phase {
      Phase::Loading => SessionError::NotReady,
      Phase::NoContent => SessionError::NoContent,
      Phase::Revealed { .. } => SessionError::AlreadyRevealed,
      Phase::Finished => SessionError::Finished,
      Phase::Answering { .. } => SessionError::NotRevealed,
    }
  }

  // --- Accessors ---

  pub fn phase(&self) -> &Phase {
    &self.phase
  }
  pub fn selected_quiz(&self) -> &str {
    &self.selected_quiz
  }
  pub fn questions(&self) -> &[ProcessedQuestion] {
    &self.questions
  }
  pub fn cursor(&self) -> usize {
    self.cursor
  }
  pub fn score(&self) -> u32 {
    self.score
  }
  pub fn completed(&self) -> &BTreeSet<usize> {
    &self.completed
  }
  pub fn current_question(&self) -> Option<&ProcessedQuestion> {
    self.questions.get(self.cursor)
  }

  pub fn selected_option(&self) -> Option<usize> {
    match self.phase {
      Phase::Answering { selected } | Phase::Revealed { selected } => selected,
      _ => None,
    }
  }

  pub fn is_revealed(&self) -> bool {
    matches!(self.phase, Phase::Revealed { .. } | Phase::Finished)
  }

  /// Whether the revealed submission was correct; None before reveal or when
  /// the choice is unknown (restored session).
  pub fn last_submission_correct(&self) -> Option<bool> {
    match self.phase {
      Phase::Revealed { selected: Some(s) } => Some(self.current_question().and_then(|q| q.correct_answer) == Some(s)),
      _ => None,
    }
  }

  /// Completed share of the sequence, rounded to a whole percent.
  pub fn progress_percent(&self) -> u32 {
    if self.questions.is_empty() {
      return 0;
    }
    ((self.completed.len() as f64 / self.questions.len() as f64) * 100.0).round() as u32
  }

  pub fn display_name(&self) -> String {
    if self.selected_quiz == COMPREHENSIVE_ID {
      return "Comprehensive Review".into();
    }
    self
      .banks
      .iter()
      .find(|b| b.id == self.selected_quiz)
      .map(|b| b.name.clone())
      .unwrap_or_else(|| self.selected_quiz.clone())
  }

  // --- Persistence ---

  pub fn snapshot(&self) -> Snapshot {
    Snapshot {
      selected_quiz: self.selected_quiz.clone(),
      cursor: self.cursor,
      score: self.score,
      completed: self.completed.iter().copied().collect(),
    }
  }

  /// Rehydrate from a stored snapshot. Requires banks to be attached.
  /// A stored quiz that no longer exists falls back to comprehensive review.
  pub fn restore(&mut self, snap: &Snapshot) -> Result<(), SessionError> {
    if let Err(e) = self.select_quiz(&snap.selected_quiz) {
      if self.phase == Phase::Loading {
        return Err(e);
      }
      warn!(target: "quiz", quiz = %snap.selected_quiz, error = %e, "Stored quiz unavailable; using comprehensive review");
      self.select_quiz(COMPREHENSIVE_ID)?;
    }
    if self.questions.is_empty() {
      return Ok(());
    }

    let len = self.questions.len();
    self.cursor = snap.cursor.min(len - 1);
    self.completed = snap.completed.iter().copied().filter(|&i| i < len).collect();
    self.score = snap.score.min(self.completed.len() as u32);
    self.phase = if self.completed.contains(&self.cursor) {
      Phase::Revealed { selected: None }
    } else {
      Phase::Answering { selected: None }
    };
    debug!(target: "quiz", quiz = %self.selected_quiz, cursor = self.cursor, score = self.score, "Session restored");
    Ok(())
  }
}
