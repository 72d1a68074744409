// src/pattern.rs
//! Regex + replacement template, yielding one substituted string per match.
//!
//! Replacement templates accept both `$N` and `\N` group references. They are
//! normalized by three ordered rewrites before parsing:
//!
//! 1. an unescaped `$` followed by digits becomes `\`
//! 2. `\` followed by digits becomes `\g<N>`
//! 3. an escaped `\$` followed by a digit becomes a literal `$`
//!
//! Step 3 must run last, otherwise `\$1` would be read as group 1.

use regex::{CaptureMatches, Captures, Regex, RegexBuilder};

use crate::error::PatternError;

fn is_digit_at(b: &[u8], i: usize) -> bool {
    b.get(i).is_some_and(u8::is_ascii_digit)
}

fn dollar_to_backslash(input: &str) -> String {
    let b = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    for (i, ch) in input.char_indices() {
        let escaped = i > 0 && b[i - 1] == b'\\';
        if ch == '$' && !escaped && is_digit_at(b, i + 1) {
            out.push('\\');
        } else {
            out.push(ch);
        }
    }
    out
}

fn backslash_to_group(input: &str) -> String {
    let b = input.as_bytes();
    let mut out = String::with_capacity(input.len() + 8);
    let mut i = 0;
    while i < b.len() {
        if b[i] == b'\\' && is_digit_at(b, i + 1) {
            let start = i + 1;
            let mut end = start;
            while is_digit_at(b, end) {
                end += 1;
            }
            out.push_str("\\g<");
            out.push_str(&input[start..end]);
            out.push('>');
            i = end;
        } else {
            // copy one whole char
            let ch = input[i..].chars().next().unwrap_or_default();
            out.push(ch);
            i += ch.len_utf8().max(1);
        }
    }
    out
}

fn undollar(input: &str) -> String {
    let b = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < b.len() {
        if b[i] == b'\\' && b.get(i + 1) == Some(&b'$') && is_digit_at(b, i + 2) {
            out.push('$');
            i += 2;
        } else {
            let ch = input[i..].chars().next().unwrap_or_default();
            out.push(ch);
            i += ch.len_utf8().max(1);
        }
    }
    out
}

/// Normalize both backreference dialects to `\g<N>`.
pub fn switch_backreferences(input: &str) -> String {
    undollar(&backslash_to_group(&dollar_to_backslash(input)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Lit(String),
    Group(usize),
}

/// Parse normalized replacement text. `\\` is a literal backslash, every
/// other character is copied as is.
fn parse_pieces(normalized: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut lit = String::new();
    let mut rest = normalized;

    while let Some(ch) = rest.chars().next() {
        if ch == '\\' {
            if let Some(after) = rest.strip_prefix("\\g<") {
                let digits = after.bytes().take_while(u8::is_ascii_digit).count();
                if digits > 0 && after.as_bytes().get(digits) == Some(&b'>') {
                    if let Ok(n) = after[..digits].parse::<usize>() {
                        if !lit.is_empty() {
                            pieces.push(Piece::Lit(std::mem::take(&mut lit)));
                        }
                        pieces.push(Piece::Group(n));
                        rest = &after[digits + 1..];
                        continue;
                    }
                }
            }
            if let Some(after) = rest.strip_prefix("\\\\") {
                lit.push('\\');
                rest = after;
                continue;
            }
        }
        lit.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    if !lit.is_empty() {
        pieces.push(Piece::Lit(lit));
    }
    pieces
}

/// Compiled regex plus its replacement template.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    pieces: Vec<Piece>,
}

impl Pattern {
    pub fn compile(
        pattern: &str,
        ignore_case: bool,
        multiline: bool,
        dot_all: bool,
        replacement: &str,
    ) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(ignore_case)
            .multi_line(multiline)
            .dot_matches_new_line(dot_all)
            .build()
            .map_err(|e| PatternError(e.to_string()))?;
        let pieces = parse_pieces(&switch_backreferences(replacement));
        Ok(Self { regex, pieces })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Lazy stream of substituted matches over `input`, in match order.
    pub fn substitutions<'r, 'h>(&'r self, input: &'h str) -> Substitutions<'r, 'h> {
        Substitutions {
            pattern: self,
            matches: self.regex.captures_iter(input),
            index: 0,
            min: 0,
            max: None,
        }
    }

    fn expand(&self, caps: &Captures<'_>) -> Result<String, PatternError> {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Lit(s) => out.push_str(s),
                Piece::Group(n) if *n < caps.len() => {
                    out.push_str(caps.get(*n).map_or("", |m| m.as_str()));
                }
                Piece::Group(n) => {
                    return Err(PatternError(format!("invalid group reference {n}")));
                }
            }
        }
        Ok(out)
    }
}

/// Iterator returned by [`Pattern::substitutions`]. Single pass; call
/// `substitutions` again to rescan.
pub struct Substitutions<'r, 'h> {
    pattern: &'r Pattern,
    matches: CaptureMatches<'r, 'h>,
    index: usize,
    min: usize,
    max: Option<usize>,
}

impl Substitutions<'_, '_> {
    /// Keep only matches with ordinal `min <= i < max`. `None` means no
    /// upper bound.
    pub fn range(mut self, min: usize, max: Option<usize>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

impl Iterator for Substitutions<'_, '_> {
    type Item = Result<String, PatternError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.max.is_some_and(|max| self.index >= max) {
                return None;
            }
            let caps = self.matches.next()?;
            let i = self.index;
            self.index += 1;
            if i < self.min {
                continue;
            }
            return Some(self.pattern.expand(&caps));
        }
    }
}
