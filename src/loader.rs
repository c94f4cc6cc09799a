//! Quiz bank loading: fetch each configured resource from its candidate paths,
//! parse it into a bank, order banks by chapter, and fall back to the built-in
//! bank when nothing could be loaded.
//!
//! Resources are attempted one at a time in list order, and the candidate paths
//! of a resource are tried sequentially. A failing resource is logged and
//! skipped; it never aborts the whole load. A resource whose id repeats an
//! already loaded bank, or shadows the comprehensive selection, is skipped too.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use crate::config::AppConfig;
use crate::domain::{QuizBank, QuizQuestion, COMPREHENSIVE_ID};
use crate::fetch::{BankFetcher, Fetched, HttpFetcher};
use crate::seeds::fallback_bank;
use crate::util::{capitalize_first, fill_template, trunc_for_log};

pub const UNKNOWN_TOPIC: &str = "Unknown Topic";
const BANK_EXTENSION: &str = ".json";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
  #[error("invalid quiz base URL '{url}': {reason}")]
  BadBaseUrl { url: String, reason: String },
  #[error("no quiz resources configured")]
  EmptyResourceList,
}

/// Load all configured banks over HTTP. Never fails: any total failure yields
/// the fallback bank.
#[instrument(level = "info", skip_all, fields(resources = cfg.quiz_files.len()))]
pub async fn load_from_config(cfg: &AppConfig) -> Vec<QuizBank> {
  let base = cfg.base_url();
  match HttpFetcher::new(&base, cfg.fetch_timeout_secs.map(Duration::from_secs)) {
    Ok(fetcher) => load_banks(&fetcher, &cfg.quiz_files, &cfg.candidate_paths).await,
    Err(reason) => {
      let e = LoadError::BadBaseUrl { url: base, reason };
      error!(target: "quiz", error = %e, "Bank loading impossible; using fallback bank");
      vec![fallback_bank()]
    }
  }
}

/// Load banks through `fetcher`, substituting the fallback bank if none load.
pub async fn load_banks<F: BankFetcher>(fetcher: &F, files: &[String], candidates: &[String]) -> Vec<QuizBank> {
  match try_load_banks(fetcher, files, candidates).await {
    Ok(banks) if !banks.is_empty() => {
      info!(target: "quiz", banks = banks.len(), "Successfully loaded quiz banks");
      banks
    }
    Ok(_) => {
      warn!(target: "quiz", "No quiz banks loaded; using fallback bank");
      vec![fallback_bank()]
    }
    Err(e) => {
      error!(target: "quiz", error = %e, "Error loading quiz data; using fallback bank");
      vec![fallback_bank()]
    }
  }
}

/// Attempt every resource; banks come back sorted by chapter (stable).
pub async fn try_load_banks<F: BankFetcher>(
  fetcher: &F,
  files: &[String],
  candidates: &[String],
) -> Result<Vec<QuizBank>, LoadError> {
  if files.is_empty() {
    return Err(LoadError::EmptyResourceList);
  }

  let mut banks = Vec::new();
  let mut seen = HashSet::new();
  for file in files {
    let id = bank_id(file);
    if id == COMPREHENSIVE_ID || seen.contains(&id) {
      warn!(target: "quiz", %file, %id, "Skipping quiz file with a reserved or duplicate id");
      continue;
    }
    let body = match fetch_resource(fetcher, file, candidates).await {
      Ok(b) => b,
      Err(e) => {
        warn!(target: "quiz", %file, error = %e, "Failed to load quiz file");
        continue;
      }
    };
    match parse_bank(file, &body) {
      Ok(bank) => {
        info!(target: "quiz", id = %bank.id, name = %bank.name, questions = bank.questions.len(), "Loaded quiz bank");
        seen.insert(id);
        banks.push(bank);
      }
      Err(e) => {
        warn!(target: "quiz", %file, error = %e, preview = %trunc_for_log(&body, 120), "Dropping malformed quiz file");
      }
    }
  }

  banks.sort_by_key(|b| b.chapter());
  Ok(banks)
}

/// First successful body among the candidate paths, in priority order.
#[instrument(level = "debug", skip(fetcher, candidates))]
pub async fn fetch_resource<F: BankFetcher>(fetcher: &F, file: &str, candidates: &[String]) -> Result<String, String> {
  let mut last = String::from("no candidate paths");
  for tpl in candidates {
    let path = fill_template(tpl, &[("file", file)]);
    match fetcher.fetch(&path).await {
      Ok(Fetched::Body(body)) => return Ok(body),
      Ok(Fetched::Status(code)) => last = format!("{} -> status {}", path, code),
      Err(e) => last = format!("{} -> {}", path, e),
    }
  }
  Err(format!("all candidate paths failed (last: {})", last))
}

/// Parse one resource body. Empty banks count as malformed.
pub fn parse_bank(file: &str, body: &str) -> Result<QuizBank, String> {
  let questions: Vec<QuizQuestion> = serde_json::from_str(body).map_err(|e| format!("JSON parse error: {}", e))?;
  let first = questions.first().ok_or_else(|| "bank has no questions".to_string())?;

  let name = [first.title.as_deref(), first.bank.as_deref()]
    .into_iter()
    .flatten()
    .find(|s| !s.is_empty())
    .unwrap_or(UNKNOWN_TOPIC)
    .to_string();
  let id = bank_id(file);

  let questions = questions
    .into_iter()
    .map(|q| QuizQuestion { question: capitalize_first(&q.question), ..q })
    .collect();

  Ok(QuizBank { id, name, questions })
}

/// Resource name without its extension.
pub fn bank_id(file: &str) -> String {
  file.strip_suffix(BANK_EXTENSION).unwrap_or(file).to_string()
}

#[cfg(test)]
pub(crate) mod tests {
  use std::collections::HashMap;
  use std::sync::Mutex;

  use super::*;
  use crate::config::DEFAULT_CANDIDATE_PATHS;
  use crate::seeds::{FALLBACK_BANK_ID, FALLBACK_BANK_NAME};

  /// Serves canned responses; anything unknown is a 404. Records every path asked for.
  #[derive(Default)]
  pub(crate) struct MapFetcher {
    pub responses: HashMap<String, Result<Fetched, String>>,
    pub seen: Mutex<Vec<String>>,
  }

  impl MapFetcher {
    pub(crate) fn with(mut self, path: &str, r: Result<Fetched, String>) -> Self {
      self.responses.insert(path.to_string(), r);
      self
    }
    pub(crate) fn body(self, path: &str, body: &str) -> Self {
      self.with(path, Ok(Fetched::Body(body.to_string())))
    }
  }

  impl BankFetcher for MapFetcher {
    async fn fetch(&self, path: &str) -> Result<Fetched, String> {
      self.seen.lock().unwrap().push(path.to_string());
      self.responses.get(path).cloned().unwrap_or(Ok(Fetched::Status(404)))
    }
  }

  pub(crate) fn candidates() -> Vec<String> {
    DEFAULT_CANDIDATE_PATHS.iter().map(|s| s.to_string()).collect()
  }

  fn files(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
  }

  pub(crate) fn bank_json(title: Option<&str>, bank: &str, questions: &[(&str, &[&str], &str)]) -> String {
    let items: Vec<serde_json::Value> = questions
      .iter()
      .enumerate()
      .map(|(i, (q, answers, correct))| {
        let mut v = serde_json::json!({
          "index": i + 1,
          "questionId": format!("{}_{}", bank, i + 1),
          "question": q,
          "answers": answers,
          "correctAnswers": [correct],
          "bank": bank,
        });
        if let Some(t) = title {
          v["title"] = serde_json::json!(t);
        }
        v
      })
      .collect();
    serde_json::to_string(&items).unwrap()
  }

  #[tokio::test]
  async fn tries_candidates_in_order_and_takes_first_success() {
    let body = bank_json(Some("Chapter 1 Basics"), "b1", &[("q?", &["a", "b"], "a")]);
    let fetcher = MapFetcher::default()
      .with("/quizzes/one.json", Ok(Fetched::Status(500)))
      .body("/StudyTool/quizzes/one.json", &body)
      .body("./quizzes/one.json", "[]");

    let banks = load_banks(&fetcher, &files(&["one.json"]), &candidates()).await;
    assert_eq!(banks.len(), 1);
    assert_eq!(banks[0].id, "one");
    assert_eq!(banks[0].name, "Chapter 1 Basics");
    assert_eq!(
      *fetcher.seen.lock().unwrap(),
      vec!["/quizzes/one.json".to_string(), "/StudyTool/quizzes/one.json".to_string()]
    );
  }

  #[tokio::test]
  async fn transport_errors_fall_through_to_next_candidate() {
    let body = bank_json(None, "Networking", &[("q?", &["a"], "a")]);
    let fetcher = MapFetcher::default()
      .with("/quizzes/n.json", Err("connection refused".into()))
      .with("/StudyTool/quizzes/n.json", Err("connection reset".into()))
      .body("./quizzes/n.json", &body);

    let banks = load_banks(&fetcher, &files(&["n.json"]), &candidates()).await;
    assert_eq!(banks[0].name, "Networking");
  }

  #[tokio::test]
  async fn unavailable_resource_is_skipped_without_failing_the_load() {
    let good = bank_json(Some("Chapter 2"), "b2", &[("q?", &["a"], "a")]);
    let fetcher = MapFetcher::default().body("/quizzes/good.json", &good);

    let banks = try_load_banks(&fetcher, &files(&["missing.json", "good.json"]), &candidates()).await.unwrap();
    assert_eq!(banks.len(), 1);
    assert_eq!(banks[0].id, "good");
    // three attempts for the missing one, one for the good one
    assert_eq!(fetcher.seen.lock().unwrap().len(), 4);
  }

  #[tokio::test]
  async fn malformed_and_empty_banks_are_dropped() {
    let good = bank_json(Some("Chapter 3"), "b3", &[("q?", &["a"], "a")]);
    let fetcher = MapFetcher::default()
      .body("/quizzes/broken.json", "{not json")
      .body("/quizzes/empty.json", "[]")
      .body("/quizzes/good.json", &good);

    let banks = load_banks(&fetcher, &files(&["broken.json", "empty.json", "good.json"]), &candidates()).await;
    assert_eq!(banks.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), vec!["good"]);
  }

  #[tokio::test]
  async fn nothing_loaded_yields_single_fallback_bank() {
    let fetcher = MapFetcher::default();
    let banks = load_banks(&fetcher, &files(&["a.json", "b.json"]), &candidates()).await;
    assert_eq!(banks.len(), 1);
    assert_eq!(banks[0].id, FALLBACK_BANK_ID);
    assert_eq!(banks[0].name, FALLBACK_BANK_NAME);
    assert!(!banks[0].questions.is_empty());
  }

  #[tokio::test]
  async fn empty_resource_list_is_a_total_failure_recovered_by_fallback() {
    let fetcher = MapFetcher::default();
    assert!(matches!(
      try_load_banks(&fetcher, &[], &candidates()).await,
      Err(LoadError::EmptyResourceList)
    ));
    let banks = load_banks(&fetcher, &[], &candidates()).await;
    assert_eq!(banks[0].id, FALLBACK_BANK_ID);
  }

  #[tokio::test]
  async fn banks_sort_by_chapter_with_unnumbered_last_in_load_order() {
    let mk = |t: &str| bank_json(Some(t), "x", &[("q?", &["a"], "a")]);
    let fetcher = MapFetcher::default()
      .body("/quizzes/a.json", &mk("Misc Review"))
      .body("/quizzes/b.json", &mk("Chapter 10 Trauma"))
      .body("/quizzes/c.json", &mk("Final Prep"))
      .body("/quizzes/d.json", &mk("Chapter 2 Airway"));

    let banks = load_banks(&fetcher, &files(&["a.json", "b.json", "c.json", "d.json"]), &candidates()).await;
    assert_eq!(banks.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), vec!["d", "b", "a", "c"]);
  }

  #[tokio::test]
  async fn duplicate_and_reserved_ids_are_skipped() {
    let mk = |t: &str| bank_json(Some(t), "x", &[("q?", &["a"], "a")]);
    let fetcher = MapFetcher::default()
      .body("/quizzes/a.json", &mk("Chapter 1"))
      .body("/quizzes/comprehensive.json", &mk("Chapter 2"))
      .body("/quizzes/b.json", &mk("Chapter 3"));

    let banks = try_load_banks(&fetcher, &files(&["a.json", "a.json", "comprehensive.json", "b.json"]), &candidates())
      .await
      .unwrap();
    assert_eq!(banks.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    // the repeat and the reserved name are never fetched
    assert_eq!(
      *fetcher.seen.lock().unwrap(),
      vec!["/quizzes/a.json".to_string(), "/quizzes/b.json".to_string()]
    );
  }

  #[tokio::test]
  async fn failed_resource_does_not_reserve_its_id() {
    let fetcher = MapFetcher::default().body("/quizzes/a.json", "{broken");

    // a dropped bank leaves its id free, so the second listing is attempted too
    let banks = try_load_banks(&fetcher, &files(&["a.json", "a.json"]), &candidates()).await.unwrap();
    assert!(banks.is_empty());
    assert_eq!(fetcher.seen.lock().unwrap().len(), 2);
  }

  #[test]
  fn null_bank_and_export_fields_fall_back_to_unknown_topic() {
    let body = r#"[{"index":-1,"questionId":"q1","question":"why?","answers":["a","b"],
      "correctAnswers":["b"],"selectedAnswer":null,"isCorrect":null,"bank":null}]"#;
    let bank = parse_bank("n.json", body).unwrap();
    assert_eq!(bank.name, UNKNOWN_TOPIC);
    assert_eq!(bank.questions[0].question, "Why?");
  }

  #[test]
  fn display_name_prefers_title_then_bank_then_unknown() {
    let titled = parse_bank("t.json", &bank_json(Some("Shock"), "bank-name", &[("q", &["a"], "a")])).unwrap();
    assert_eq!(titled.name, "Shock");

    let empty_title = parse_bank("e.json", &bank_json(Some(""), "bank-name", &[("q", &["a"], "a")])).unwrap();
    assert_eq!(empty_title.name, "bank-name");

    let anonymous = parse_bank("u.json", &bank_json(None, "", &[("q", &["a"], "a")])).unwrap();
    assert_eq!(anonymous.name, UNKNOWN_TOPIC);
  }

  #[test]
  fn parse_bank_capitalizes_questions_but_keeps_answers() {
    let bank = parse_bank("c.json", &bank_json(None, "b", &[("which one?", &["lower", "Upper"], "lower")])).unwrap();
    assert_eq!(bank.questions[0].question, "Which one?");
    assert_eq!(bank.questions[0].answers, vec!["lower", "Upper"]);
    assert_eq!(bank.questions[0].correct_answers, vec!["lower"]);
  }

  #[test]
  fn bank_id_strips_only_the_extension() {
    assert_eq!(bank_id("canvas_quiz_results_1.json"), "canvas_quiz_results_1");
    assert_eq!(bank_id("plain"), "plain");
  }

  #[tokio::test]
  async fn bad_base_url_yields_fallback() {
    let cfg = AppConfig { quiz_base_url: Some("::nope::".into()), ..AppConfig::default() };
    let banks = load_from_config(&cfg).await;
    assert_eq!(banks.len(), 1);
    assert_eq!(banks[0].id, FALLBACK_BANK_ID);
  }
}
