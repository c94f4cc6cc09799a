//! Maintenance tooling for bank files on disk.
//!
//! `add_title_fields` gives every question in a bank a `title` (copied from its
//! `bank` name) so the loader shows a stable display name that can then be
//! edited by hand. Banks whose first question already has a title are skipped.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{error, info};

pub const UNTITLED: &str = "Untitled Quiz";

#[derive(Debug, Default, PartialEq)]
pub struct TitleReport {
  pub updated: Vec<PathBuf>,
  pub skipped: Vec<PathBuf>,
  pub failed: Vec<(PathBuf, String)>,
}

/// Process every `*.json` file directly inside `dir`, in name order.
pub fn add_title_fields(dir: &Path) -> Result<TitleReport, String> {
  let entries = std::fs::read_dir(dir).map_err(|e| format!("cannot read {}: {}", dir.display(), e))?;
  let mut files: Vec<PathBuf> = entries
    .filter_map(|e| e.ok().map(|e| e.path()))
    .filter(|p| p.is_file() && p.extension().map(|x| x == "json").unwrap_or(false))
    .collect();
  files.sort();

  let mut report = TitleReport::default();
  for path in files {
    match add_title_field(&path) {
      Ok(true) => {
        info!(target: "study_tool", file = %path.display(), "Added title field");
        report.updated.push(path);
      }
      Ok(false) => {
        info!(target: "study_tool", file = %path.display(), "Title field already present");
        report.skipped.push(path);
      }
      Err(e) => {
        error!(target: "study_tool", file = %path.display(), error = %e, "Failed to process bank file");
        report.failed.push((path, e));
      }
    }
  }
  Ok(report)
}

/// Returns Ok(false) when the file already carries a title and was left alone.
pub fn add_title_field(path: &Path) -> Result<bool, String> {
  let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
  let mut doc: Value = serde_json::from_str(&raw).map_err(|e| e.to_string())?;
  let items = doc.as_array_mut().ok_or_else(|| "bank file is not a JSON array".to_string())?;

  let has_title = items
    .first()
    .and_then(|q| q.get("title"))
    .and_then(Value::as_str)
    .map(|t| !t.is_empty())
    .unwrap_or(false);
  if has_title {
    return Ok(false);
  }

  for q in items.iter_mut() {
    let Some(obj) = q.as_object_mut() else { continue };
    let title = obj
      .get("bank")
      .and_then(Value::as_str)
      .filter(|b| !b.is_empty())
      .unwrap_or(UNTITLED)
      .to_string();
    obj.insert("title".into(), Value::String(title));
  }

  let pretty = serde_json::to_string_pretty(&doc).map_err(|e| e.to_string())?;
  std::fs::write(path, pretty).map_err(|e| e.to_string())?;
  Ok(true)
}
