//! Path allow-list for the edge verifier.
//!
//! Patterns are `glob` patterns over the request path with `/` as a literal
//! separator: `**` matches zero or more whole segments, `*` and `?` stay
//! within one segment. A trailing `/**` also matches the bare prefix, so
//! `/actuator/**` admits `/actuator`.
//!
//! Paths are matched as sent, never decoded. A path with a segment that is,
//! or percent-decodes to, `.` or `..`, or that hides a separator, never
//! matches: the HTTP client would resolve it to a different path on the way
//! upstream.

use std::fmt;
use std::str::FromStr;

use glob::{MatchOptions, Pattern};
use thiserror::Error;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must start with '/': {0}")]
    NotAbsolute(String),
    #[error("'**' must be a whole segment: {0}")]
    PartialDoubleStar(String),
    #[error("invalid pattern {pattern}: {reason}")]
    Glob { pattern: String, reason: String },
}

/// One compiled allow-list pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    pattern: Pattern,
    /// `/prefix` for a `/prefix/**` pattern.
    bare_prefix: Option<Pattern>,
}

impl PathPattern {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let Some(segments) = safe_segments(path) else {
            return false;
        };
        let path = format!("/{}", segments.join("/"));
        self.pattern.matches_with(&path, MATCH_OPTIONS)
            || self
                .bare_prefix
                .as_ref()
                .is_some_and(|p| p.matches_with(&path, MATCH_OPTIONS))
    }
}

impl FromStr for PathPattern {
    type Err = PatternError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if !raw.starts_with('/') {
            return Err(PatternError::NotAbsolute(raw.to_string()));
        }
        if raw.split('/').any(|s| s != "**" && s.contains("**")) {
            return Err(PatternError::PartialDoubleStar(raw.to_string()));
        }
        let compile = |p: &str| {
            Pattern::new(p).map_err(|e| PatternError::Glob {
                pattern: raw.to_string(),
                reason: e.msg.to_string(),
            })
        };
        let bare_prefix = match raw.strip_suffix("/**") {
            Some("") => Some(compile("/")?),
            Some(prefix) => Some(compile(prefix)?),
            None => None,
        };
        Ok(Self {
            raw: raw.to_string(),
            pattern: compile(raw)?,
            bare_prefix,
        })
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Non-empty `/`-separated segments of `path`, or `None` when a segment is a
/// dot segment (literal or percent-encoded), hides a `/` or `\` behind
/// percent-encoding, contains a raw `\`, or is not valid UTF-8 once decoded.
pub fn safe_segments(path: &str) -> Option<Vec<&str>> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let decoded = urlencoding::decode(segment).ok()?;
            let unsafe_segment =
                decoded == "." || decoded == ".." || decoded.contains(['/', '\\']);
            (!unsafe_segment).then_some(segment)
        })
        .collect()
}

/// Ordered set of patterns exempt from token verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    patterns: Vec<PathPattern>,
}

impl AllowList {
    pub fn new(patterns: Vec<PathPattern>) -> Self {
        Self { patterns }
    }

    /// Parse a comma-separated list, ignoring blank entries.
    pub fn from_csv(csv: &str) -> Result<Self, PatternError> {
        let patterns = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathPattern::from_str)
            .collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }

    /// First pattern matching `path`, if any.
    pub fn find(&self, path: &str) -> Option<&PathPattern> {
        self.patterns.iter().find(|p| p.matches(path))
    }

    pub fn matches(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }
}
