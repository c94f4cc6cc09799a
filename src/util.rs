//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Uppercase the first character, leaving the rest untouched.
/// Empty input is returned as-is.
pub fn capitalize_first(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

/// Log-safe truncation for large strings (char-boundary aware).
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_every_occurrence() {
    let out = fill_template("/quizzes/{file}?again={file}", &[("file", "a.json")]);
    assert_eq!(out, "/quizzes/a.json?again=a.json");
  }

  #[test]
  fn capitalize_first_handles_empty_and_unicode() {
    assert_eq!(capitalize_first(""), "");
    assert_eq!(capitalize_first("what is 2 + 2?"), "What is 2 + 2?");
    assert_eq!(capitalize_first("Already"), "Already");
    assert_eq!(capitalize_first("élan"), "Élan");
    assert_eq!(capitalize_first("1st question"), "1st question");
  }

  #[test]
  fn trunc_for_log_respects_char_boundaries() {
    assert_eq!(trunc_for_log("short", 10), "short");
    let out = trunc_for_log("ééééé", 3);
    assert!(out.starts_with("é…"));
    assert!(out.ends_with("(10 bytes total)"));
  }
}
