//! Wildcard topic matching.
//!
//! Filter patterns are plain strings where `*` matches any substring
//! (including the empty one) and every other character is literal. Patterns
//! are compiled into anchored regexes once, at registration time; matching a
//! topic against a compiled filter is regex evaluation only.

use regex::Regex;

use crate::error::{BusError, BusResult};
use crate::value::Value;

/// A compiled topic filter: zero or more wildcard patterns.
///
/// A filter with zero patterns is unconditional: it matches every topic,
/// including an absent one. A filter with patterns matches a topic iff any
/// pattern full-matches it; an absent topic never matches a pattern.
#[derive(Debug, Clone)]
pub struct TopicFilter {
    patterns: Vec<Regex>,
}

impl TopicFilter {
    /// The unconditional filter (no patterns, matches everything).
    #[must_use]
    pub const fn match_all() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Compiles a list of wildcard patterns.
    ///
    /// # Errors
    ///
    /// [`BusError::InvalidFilter`] if a pattern does not compile. Since
    /// every literal segment is escaped, this does not happen for ordinary
    /// pattern strings.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> BusResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| wildcard_to_regex(p.as_ref()))
            .collect::<BusResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Builds a filter from the `event.topics` registration property value.
    ///
    /// Accepted forms: absent / [`Value::Null`] (match every topic), a single
    /// string, or a sequence of strings.
    ///
    /// # Errors
    ///
    /// [`BusError::InvalidFilter`] for any other value type.
    pub fn from_property(value: Option<&Value>) -> BusResult<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::match_all()),
            Some(Value::String(s)) => Self::compile(&[s]),
            Some(Value::Strings(v)) => Self::compile(v),
            Some(other) => Err(BusError::InvalidFilter {
                reason: format!("expected a string or a sequence of strings, got {other:?}"),
            }),
        }
    }

    /// Whether this filter is unconditional.
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Tests a topic against the filter.
    #[must_use]
    pub fn matches(&self, topic: Option<&str>) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let Some(topic) = topic else {
            return false;
        };
        self.patterns.iter().any(|p| p.is_match(topic))
    }
}

/// Translates a `*`-wildcard string into an anchored regex.
///
/// Every literal segment is escaped, every `*` becomes `.*`, and the whole
/// expression is anchored so the topic must match in full.
fn wildcard_to_regex(pattern: &str) -> BusResult<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for (i, segment) in pattern.split('*').enumerate() {
        if i > 0 {
            expr.push_str(".*");
        }
        expr.push_str(&regex::escape(segment));
    }
    expr.push('$');

    Regex::new(&expr).map_err(|e| BusError::InvalidFilter {
        reason: format!("pattern {pattern:?} did not compile: {e}"),
    })
}
