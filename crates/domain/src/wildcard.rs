//! Segmented wildcard permission patterns.
//!
//! A pattern is a `.`-separated list of segments. A segment is either the
//! wildcard `*` or one or more `|`-separated literal alternatives:
//!
//! - a non-trailing `*` matches exactly one segment;
//! - a trailing `*` matches one or more remaining segments, so `posts.*`
//!   matches `posts.edit` and `posts.edit.own` but not `posts`;
//! - `posts.edit|delete` matches `posts.edit` and `posts.delete`;
//! - every other pattern requires equal segment counts.
//!
//! Matching is case-sensitive and the requested name is always literal.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use warrant_core::{AppError, AppResult};

/// Separator between pattern segments.
pub const SEGMENT_DELIMITER: char = '.';
/// Separator between alternatives inside one segment.
pub const ALTERNATIVE_DELIMITER: char = '|';
/// Segment matching any single segment, or any suffix when trailing.
pub const WILDCARD_SEGMENT: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Any,
    Alternatives(Vec<String>),
}

impl PatternSegment {
    fn accepts(&self, requested: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Alternatives(values) => values.iter().any(|value| value == requested),
        }
    }
}

/// Parsed wildcard permission pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    source: String,
    segments: Vec<PatternSegment>,
}

impl WildcardPattern {
    /// Parses a granted permission name into a pattern.
    pub fn parse(pattern: &str) -> AppResult<Self> {
        if pattern.is_empty() {
            return Err(AppError::Validation(
                "wildcard pattern must not be empty".to_owned(),
            ));
        }

        let segments = pattern
            .split(SEGMENT_DELIMITER)
            .map(|segment| parse_segment(pattern, segment))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            source: pattern.to_owned(),
            segments,
        })
    }

    /// Returns the original pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.source.as_str()
    }

    /// Returns whether the pattern has neither wildcard nor alternative segments.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.segments.iter().all(|segment| {
            matches!(segment, PatternSegment::Alternatives(values) if values.len() == 1)
        })
    }

    /// Returns whether this pattern grants the requested permission name.
    #[must_use]
    pub fn matches(&self, requested: &str) -> bool {
        let requested: Vec<&str> = requested.split(SEGMENT_DELIMITER).collect();
        if requested.iter().any(|segment| segment.is_empty()) {
            return false;
        }

        let last_index = self.segments.len() - 1;
        for (index, segment) in self.segments.iter().enumerate() {
            if index == last_index && *segment == PatternSegment::Any {
                return requested.len() > index;
            }

            let Some(value) = requested.get(index) else {
                return false;
            };
            if !segment.accepts(value) {
                return false;
            }
        }

        requested.len() == self.segments.len()
    }
}

impl FromStr for WildcardPattern {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Display for WildcardPattern {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.source.as_str())
    }
}

fn parse_segment(pattern: &str, segment: &str) -> AppResult<PatternSegment> {
    if segment == WILDCARD_SEGMENT {
        return Ok(PatternSegment::Any);
    }

    let alternatives: Vec<String> = segment
        .split(ALTERNATIVE_DELIMITER)
        .map(str::to_owned)
        .collect();
    if alternatives.iter().any(String::is_empty) {
        return Err(AppError::Validation(format!(
            "wildcard pattern '{pattern}' contains an empty segment"
        )));
    }

    Ok(PatternSegment::Alternatives(alternatives))
}

/// Returns whether `granted` grants `requested`; malformed grants never match.
#[must_use]
pub fn wildcard_matches(granted: &str, requested: &str) -> bool {
    WildcardPattern::parse(granted).is_ok_and(|pattern| pattern.matches(requested))
}
