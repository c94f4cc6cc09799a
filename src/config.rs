//! Loading service configuration (bank resources, fetch paths, storage) from TOML.
//!
//! See `AppConfig` for the expected schema. Every field is optional; env vars
//! override a few of them after the file is read.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

/// Resource names tried by the loader, in order.
pub const DEFAULT_QUIZ_FILES: &[&str] = &[
  "canvas_quiz_results_1755654631020.json",
  "canvas_quiz_results_1755654636456.json",
  "canvas_quiz_results_1755654642621.json",
  "canvas_quiz_results_1755654648626.json",
  "canvas_quiz_results_1755654653858.json",
  "canvas_quiz_results_1755654658566.json",
  "canvas_quiz_results_1755654662791.json",
  "canvas_quiz_results_1755654666987.json",
  "canvas_quiz_results_1755654671653.json",
  "canvas_quiz_results_1755654677481.json",
  "canvas_quiz_results_1755654685712.json",
  "canvas_quiz_results_1755654690966.json",
  "canvas_quiz_results_1755654695793.json",
  "canvas_quiz_results_1755654702275.json",
  "canvas_quiz_results_1755654711436.json",
  "canvas_quiz_results_1755654715305.json",
  "canvas_quiz_results_1755654719358.json",
  "canvas_quiz_results_1755654723382.json",
  "canvas_quiz_results_1755654728535.json",
  "canvas_quiz_results_1755654731788.json",
  "canvas_quiz_results_1755654736147.json",
  "canvas_quiz_results_1755654741176.json",
  "canvas_quiz_results_1755654747371.json",
  "canvas_quiz_results_1755654751542.json",
  "canvas_quiz_results_1755654758363.json",
  "canvas_quiz_results_1755654762380.json",
  "canvas_quiz_results_1755654766924.json",
  "canvas_quiz_results_1755654771420.json",
  "canvas_quiz_results_1755654774952.json",
  "canvas_quiz_results_1755654778339.json",
  "canvas_quiz_results_1755654781736.json",
  "canvas_quiz_results_1755654785730.json",
  "canvas_quiz_results_1755654789198.json",
  "canvas_quiz_results_1755654792260.json",
  "canvas_quiz_results_1755654796556.json",
];

/// Candidate locations per resource, highest priority first.
pub const DEFAULT_CANDIDATE_PATHS: &[&str] = &["/quizzes/{file}", "/StudyTool/quizzes/{file}", "./quizzes/{file}"];

pub const DEFAULT_PORT: u16 = 3000;

/// Live sessions untouched for this long are dropped from memory.
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub quiz_files: Vec<String>,
  /// URL-path templates with a `{file}` placeholder.
  pub candidate_paths: Vec<String>,
  /// Base URL the candidate paths are resolved against.
  /// None means "this service", i.e. `http://127.0.0.1:{port}/`.
  pub quiz_base_url: Option<String>,
  /// Directory served under `/quizzes` and `/StudyTool/quizzes`.
  pub quiz_dir: String,
  /// JSON file backing the key-value store. None keeps state in memory only.
  pub store_path: Option<String>,
  pub fetch_timeout_secs: Option<u64>,
  /// Idle time before a live session is evicted; 0 disables eviction.
  pub session_idle_secs: u64,
  pub port: u16,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      quiz_files: DEFAULT_QUIZ_FILES.iter().map(|s| s.to_string()).collect(),
      candidate_paths: DEFAULT_CANDIDATE_PATHS.iter().map(|s| s.to_string()).collect(),
      quiz_base_url: None,
      quiz_dir: "./quizzes".into(),
      store_path: None,
      fetch_timeout_secs: None,
      session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
      port: DEFAULT_PORT,
    }
  }
}

impl AppConfig {
  /// Effective base URL for bank fetches.
  pub fn base_url(&self) -> String {
    self
      .quiz_base_url
      .clone()
      .unwrap_or_else(|| format!("http://127.0.0.1:{}/", self.port))
  }

  /// Idle eviction window, None when disabled.
  pub fn session_idle(&self) -> Option<Duration> {
    (self.session_idle_secs > 0).then(|| Duration::from_secs(self.session_idle_secs))
  }

  fn apply_env(mut self) -> Self {
    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
      self.port = port;
    }
    if let Ok(url) = std::env::var("QUIZ_BASE_URL") {
      self.quiz_base_url = Some(url);
    }
    if let Ok(path) = std::env::var("STORE_PATH") {
      self.store_path = Some(path);
    }
    if let Some(secs) = std::env::var("SESSION_IDLE_SECS").ok().and_then(|s| s.parse::<u64>().ok()) {
      self.session_idle_secs = secs;
    }
    self
  }
}

/// Parse a TOML document into `AppConfig`.
pub fn parse_config(s: &str) -> Result<AppConfig, String> {
  toml::from_str::<AppConfig>(s).map_err(|e| e.to_string())
}

/// Attempt to load `AppConfig` from STUDY_CONFIG_PATH, then apply env overrides.
/// On any parsing/IO error the defaults are used.
pub fn load_config_from_env() -> AppConfig {
  let from_file = std::env::var("STUDY_CONFIG_PATH").ok().and_then(|path| {
    match std::fs::read_to_string(&path) {
      Ok(s) => match parse_config(&s) {
        Ok(cfg) => {
          info!(target: "study_tool", %path, "Loaded config (TOML)");
          Some(cfg)
        }
        Err(e) => {
          error!(target: "study_tool", %path, error = %e, "Failed to parse TOML config");
          None
        }
      },
      Err(e) => {
        error!(target: "study_tool", %path, error = %e, "Failed to read TOML config file");
        None
      }
    }
  });
  from_file.unwrap_or_default().apply_env()
}
