//! Shell-style wildcard patterns over branch and feed ids.
//!
//! `*` matches any run of characters and `?` matches exactly one; every other
//! character is literal. Patterns are translated to anchored regular
//! expressions once, at construction.

use regex::Regex;

use crate::error::TypeError;

/// A compiled wildcard pattern.
#[derive(Clone, Debug)]
pub struct IdPattern {
    source: String,
    regex: Option<Regex>,
}

impl IdPattern {
    /// Compile a wildcard pattern.
    pub fn new(pattern: &str) -> Result<Self, TypeError> {
        if !is_wildcard(pattern) {
            return Ok(Self {
                source: pattern.to_string(),
                regex: None,
            });
        }
        let mut translated = String::with_capacity(pattern.len() + 8);
        translated.push('^');
        let mut literal = String::new();
        for ch in pattern.chars() {
            match ch {
                '*' | '?' => {
                    translated.push_str(&regex::escape(&literal));
                    literal.clear();
                    translated.push_str(if ch == '*' { ".*" } else { "." });
                }
                _ => literal.push(ch),
            }
        }
        translated.push_str(&regex::escape(&literal));
        translated.push('$');

        let regex = Regex::new(&translated).map_err(|e| TypeError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex: Some(regex),
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if the pattern has no wildcard.
    pub fn is_literal(&self) -> bool {
        self.regex.is_none()
    }

    /// Test an id against the pattern.
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(candidate),
            None => self.source == candidate,
        }
    }
}

/// Compile a list of patterns.
pub fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<IdPattern>, TypeError> {
    patterns.iter().map(|p| IdPattern::new(p.as_ref())).collect()
}

/// Returns `true` if any pattern in the list matches.
pub fn any_match(patterns: &[IdPattern], candidate: &str) -> bool {
    patterns.iter().any(|p| p.matches(candidate))
}

fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}
