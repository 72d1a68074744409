// src/core/sanitize.rs
use std::borrow::Cow;

/// Collapse whitespace runs to a single space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Keep the first `head` and last `tail` chars of a long value, with a marker
/// counting what was cut. Short values pass through untouched.
pub fn excerpt(s: &str, head: usize, tail: usize) -> Cow<'_, str> {
    let n = s.chars().count();
    if n <= head + tail {
        return Cow::Borrowed(s);
    }
    let head_end = s.char_indices().nth(head).map_or(s.len(), |(i, _)| i);
    let tail_start = s.char_indices().nth(n - tail).map_or(s.len(), |(i, _)| i);
    let cut = n - head - tail;
    Cow::Owned(format!("{}…[{cut} chars]…{}", &s[..head_end], &s[tail_start..]))
}

/// One-line preview for logs.
pub fn preview(s: &str) -> String {
    normalize_ws(&excerpt(s, 60, 20))
}
