//! Small utility helpers used across modules.

/// Case-insensitive substring check (Unicode lowercase on both sides).
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
  haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with whole prompts and oracle replies.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
