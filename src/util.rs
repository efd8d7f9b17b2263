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

/// Log-safe truncation for large strings (cuts on a char boundary).
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}

/// First `max` characters of `s`, with "..." appended when something was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    Some((idx, _)) => format!("{}...", &s[..idx]),
    None => s.to_string(),
  }
}

/// Formats seconds as "Xh Ym Zs".
pub fn format_uptime(secs: u64) -> String {
  format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_fills_every_occurrence() {
    assert_eq!(fill_template("{t} is {t}", &[("t", "INTJ")]), "INTJ is INTJ");
    assert_eq!(fill_template("no keys", &[("t", "x")]), "no keys");
  }

  #[test]
  fn log_truncation_respects_char_boundaries() {
    let s = "ééééé";
    let cut = trunc_for_log(s, 3);
    assert!(cut.starts_with('é'));
    assert!(cut.ends_with("(10 bytes total)"));
    assert_eq!(trunc_for_log("short", 10), "short");
  }

  #[test]
  fn char_truncation_appends_ellipsis_only_when_cut() {
    assert_eq!(truncate_chars("abcdef", 3), "abc...");
    assert_eq!(truncate_chars("abc", 3), "abc");
  }

  #[test]
  fn uptime_format() {
    assert_eq!(format_uptime(3725), "1h 2m 5s");
    assert_eq!(format_uptime(0), "0h 0m 0s");
  }
}
