//! Regex matching for preview deployment origins

use crate::error::ConfigError;
use regex::Regex;

/// Compiled set of origin patterns
#[derive(Debug, Default)]
pub struct OriginPatterns {
    patterns: Vec<CompiledPattern>,
}

#[derive(Debug)]
struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl OriginPatterns {
    /// Compile a list of regex patterns
    pub fn new(patterns: &[String]) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;

            compiled.push(CompiledPattern {
                source: pattern.clone(),
                regex,
            });
        }

        Ok(Self { patterns: compiled })
    }

    /// A matcher with no patterns (matches nothing)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether any pattern matches `origin`
    pub fn matches(&self, origin: &str) -> bool {
        self.find_match(origin).is_some()
    }

    /// Source of the first pattern matching `origin`
    pub fn find_match(&self, origin: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(origin))
            .map(|p| p.source.as_str())
    }
}
