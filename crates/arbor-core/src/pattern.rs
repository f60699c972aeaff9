//! Glob patterns evaluated against forward-slash relative paths
//!
//! Supported syntax:
//!
//! - literal segments match exactly (case-sensitive)
//! - `*` matches any run of characters inside one segment
//! - `**` as a whole segment matches zero or more segments
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]`, `[!a-z]` match one character from (or outside) a class
//!
//! Matching walks pattern segments against path segments recursively; no
//! regex translation is involved, so `*` can never cross a `/`.
//! Patterns are validated when parsed, which is when a rule is added or the
//! registry is loaded. Matching itself cannot fail.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors raised while parsing a pattern
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("Pattern is empty")]
    Empty,

    #[error("Pattern '{pattern}' must be relative to the tree root")]
    Absolute { pattern: String },

    #[error("Pattern '{pattern}' must not contain '..' segments")]
    ParentSegment { pattern: String },

    #[error("Unbalanced '[' in segment '{segment}' of pattern '{pattern}'")]
    UnclosedClass { pattern: String, segment: String },

    #[error("Empty character class in pattern '{pattern}'")]
    EmptyClass { pattern: String },

    #[error("Invalid range '{start}-{end}' in pattern '{pattern}'")]
    InvalidRange {
        pattern: String,
        start: char,
        end: char,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Single(char),
    Range(char, char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Char(char),
    AnyChar,
    Star,
    Class { negated: bool, items: Vec<ClassItem> },
}

impl Token {
    fn matches_char(&self, c: char) -> bool {
        match self {
            Self::Char(expected) => *expected == c,
            Self::AnyChar => true,
            Self::Star => false,
            Self::Class { negated, items } => {
                let hit = items.iter().any(|item| match item {
                    ClassItem::Single(x) => *x == c,
                    ClassItem::Range(lo, hi) => (*lo..=*hi).contains(&c),
                });
                hit != *negated
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// `**`: zero or more whole segments
    Recursive,
    Literal(String),
    Glob(Vec<Token>),
}

impl Segment {
    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Recursive => true,
            Self::Literal(literal) => literal == name,
            Self::Glob(tokens) => {
                let chars: Vec<char> = name.chars().collect();
                match_tokens(tokens, &chars)
            }
        }
    }
}

/// Wildcard matching within one segment, backtracking on the last `*`.
fn match_tokens(tokens: &[Token], text: &[char]) -> bool {
    let (mut t, mut s) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while s < text.len() {
        if let Some(token) = tokens.get(t) {
            if *token == Token::Star {
                backtrack = Some((t, s));
                t += 1;
                continue;
            }
            if token.matches_char(text[s]) {
                t += 1;
                s += 1;
                continue;
            }
        }
        match backtrack {
            Some((star, consumed)) => {
                t = star + 1;
                s = consumed + 1;
                backtrack = Some((star, consumed + 1));
            }
            None => return false,
        }
    }

    tokens[t..].iter().all(|token| *token == Token::Star)
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::Recursive, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((segment, rest)) => match path.split_first() {
            Some((first, tail)) => segment.matches(first) && match_segments(rest, tail),
            None => false,
        },
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect()
}

/// A validated, immutable glob pattern.
///
/// The stored source is normalized (forward slashes, no `./` prefix, no
/// trailing `/`), so two spellings of the same pattern compare equal.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse and validate a pattern.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let unified = raw.trim().replace('\\', "/");
        if unified.is_empty() {
            return Err(PatternError::Empty);
        }
        if unified.starts_with('/') || has_drive_prefix(&unified) {
            return Err(PatternError::Absolute {
                pattern: raw.to_string(),
            });
        }

        let parts: Vec<&str> = unified
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        if parts.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut segments = Vec::with_capacity(parts.len());
        for part in &parts {
            if *part == ".." {
                return Err(PatternError::ParentSegment {
                    pattern: raw.to_string(),
                });
            }
            let segment = parse_segment(part, raw)?;
            // a/**/**/b is the same as a/**/b
            if segment == Segment::Recursive && segments.last() == Some(&Segment::Recursive) {
                continue;
            }
            segments.push(segment);
        }

        Ok(Self {
            source: parts.join("/"),
            segments,
        })
    }

    /// The normalized pattern text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True if the pattern contains no wildcard at all.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }

    /// Match a relative, forward-slash path.
    pub fn matches(&self, path: &str) -> bool {
        let parts = split_path(path);
        match_segments(&self.segments, &parts)
    }

    /// Match `path` or any of its ancestors.
    ///
    /// A path beneath a matched directory is covered by that directory.
    pub fn matches_self_or_ancestor(&self, path: &str) -> bool {
        let parts = split_path(path);
        (1..=parts.len()).any(|len| match_segments(&self.segments, &parts[..len]))
    }
}

fn has_drive_prefix(pattern: &str) -> bool {
    let bytes = pattern.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn parse_segment(part: &str, pattern: &str) -> Result<Segment, PatternError> {
    if part == "**" {
        return Ok(Segment::Recursive);
    }

    let chars: Vec<char> = part.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut wildcard = false;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                wildcard = true;
                if tokens.last() != Some(&Token::Star) {
                    tokens.push(Token::Star);
                }
                i += 1;
            }
            '?' => {
                wildcard = true;
                tokens.push(Token::AnyChar);
                i += 1;
            }
            '[' => {
                wildcard = true;
                let (token, next) = parse_class(&chars, i, part, pattern)?;
                tokens.push(token);
                i = next;
            }
            c => {
                tokens.push(Token::Char(c));
                i += 1;
            }
        }
    }

    if wildcard {
        Ok(Segment::Glob(tokens))
    } else {
        Ok(Segment::Literal(part.to_string()))
    }
}

/// Parse a bracket expression starting at `chars[start] == '['`.
///
/// Returns the class token and the index just past the closing `]`.
fn parse_class(
    chars: &[char],
    start: usize,
    segment: &str,
    pattern: &str,
) -> Result<(Token, usize), PatternError> {
    let unclosed = || PatternError::UnclosedClass {
        pattern: pattern.to_string(),
        segment: segment.to_string(),
    };

    let mut i = start + 1;
    let negated = matches!(chars.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }

    let mut items = Vec::new();
    loop {
        let c = *chars.get(i).ok_or_else(unclosed)?;
        if c == ']' {
            if items.is_empty() {
                return Err(PatternError::EmptyClass {
                    pattern: pattern.to_string(),
                });
            }
            return Ok((Token::Class { negated, items }, i + 1));
        }

        let is_range = chars.get(i + 1) == Some(&'-') && chars.get(i + 2).is_some_and(|e| *e != ']');
        if is_range {
            let end = chars[i + 2];
            if end < c {
                return Err(PatternError::InvalidRange {
                    pattern: pattern.to_string(),
                    start: c,
                    end,
                });
            }
            items.push(ClassItem::Range(c, end));
            i += 3;
        } else {
            items.push(ClassItem::Single(c));
            i += 1;
        }
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Pattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.source)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

impl PartialOrd for Pattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pattern {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source.cmp(&other.source)
    }
}
