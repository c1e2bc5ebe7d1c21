// src/extractors/pattern.rs
use crate::utils::error::ExtractError;
use regex::{Captures, Regex, RegexBuilder};

/// Which part of a successful match becomes the field value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CapturePolicy {
    /// First named group if the pattern declares any, else group 1 if it
    /// declares any groups, else the whole match.
    #[default]
    Auto,
    Named(String),
    Group(usize),
    WholeMatch,
}

/// A compiled regex alternative paired with its capture selection policy.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    regex: Regex,
    capture: CapturePolicy,
}

impl FieldPattern {
    /// Compiles `pattern` with `.` allowed to cross newlines, using [`CapturePolicy::Auto`].
    pub fn new(pattern: &str) -> Result<Self, ExtractError> {
        Self::with_policy(pattern, CapturePolicy::Auto)
    }

    pub fn with_policy(pattern: &str, capture: CapturePolicy) -> Result<Self, ExtractError> {
        let regex = RegexBuilder::new(pattern)
            .dot_matches_new_line(true)
            .build()
            .map_err(|source| ExtractError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;

        let group_exists = match &capture {
            CapturePolicy::Named(name) => regex.capture_names().flatten().any(|n| n == name.as_str()),
            CapturePolicy::Group(index) => *index < regex.captures_len(),
            CapturePolicy::Auto | CapturePolicy::WholeMatch => true,
        };
        if !group_exists {
            let group = match &capture {
                CapturePolicy::Named(name) => name.clone(),
                CapturePolicy::Group(index) => index.to_string(),
                _ => String::new(),
            };
            return Err(ExtractError::InvalidCapture {
                pattern: pattern.to_string(),
                group,
            });
        }

        Ok(Self { regex, capture })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Searches `text` once.
    ///
    /// `None` means the pattern did not match. `Some(None)` means it matched
    /// but the selected group did not take part in the match.
    pub fn apply<'t>(&self, text: &'t str) -> Option<Option<&'t str>> {
        let caps = self.regex.captures(text)?;
        Some(self.select(&caps))
    }

    fn select<'t>(&self, caps: &Captures<'t>) -> Option<&'t str> {
        let group = match &self.capture {
            CapturePolicy::Auto => {
                if let Some(name) = self.regex.capture_names().flatten().next() {
                    caps.name(name)
                } else if caps.len() > 1 {
                    caps.get(1)
                } else {
                    caps.get(0)
                }
            }
            CapturePolicy::Named(name) => caps.name(name),
            CapturePolicy::Group(index) => caps.get(*index),
            CapturePolicy::WholeMatch => caps.get(0),
        };
        group.map(|m| m.as_str())
    }
}

/// Tries each alternative in order and returns the value picked from the first
/// one that matches. Later alternatives are never consulted once one matches,
/// even if the selected group came back empty-handed.
pub fn apply_patterns<'t>(text: &'t str, patterns: &[FieldPattern]) -> Option<&'t str> {
    for pattern in patterns {
        if let Some(value) = pattern.apply(text) {
            tracing::trace!("Pattern '{}' matched", pattern.as_str());
            return value;
        }
    }
    None
}
