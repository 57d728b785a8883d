//! Message filtering with regex patterns.
//!
//! Blocks inbound messages matching any configured pattern before they
//! fan out to other platforms.

use fancy_regex::Regex;
use tracing::warn;

use crate::config::types::FiltersConfig;

/// Message filter that checks content against regex patterns.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    patterns: Vec<CompiledPattern>,
}

/// A compiled regex pattern with its original string for debugging.
#[derive(Debug, Clone)]
struct CompiledPattern {
    original: String,
    regex: Regex,
}

impl MessageFilter {
    /// Create a filter from pattern strings.
    ///
    /// Invalid regex patterns are logged and skipped.
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns: compile_patterns(patterns),
        }
    }

    /// Create an empty filter that allows all messages.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from the `filters` config section. Disabled means empty.
    pub fn from_config(config: &FiltersConfig) -> Self {
        if config.enabled {
            Self::new(config.patterns.clone())
        } else {
            Self::empty()
        }
    }

    /// Returns `true` if the message matches any pattern and should be blocked.
    pub fn should_filter(&self, message: &str) -> bool {
        self.patterns.iter().any(|p| {
            p.regex.is_match(message).unwrap_or_else(|e| {
                warn!("Regex match error for pattern '{}': {}", p.original, e);
                false
            })
        })
    }

    pub fn has_patterns(&self) -> bool {
        !self.patterns.is_empty()
    }
}

fn compile_patterns(patterns: Vec<String>) -> Vec<CompiledPattern> {
    patterns
        .into_iter()
        .filter_map(|pattern| match Regex::new(&pattern) {
            Ok(regex) => Some(CompiledPattern {
                original: pattern,
                regex,
            }),
            Err(e) => {
                warn!("Invalid filter regex pattern '{}': {}", pattern, e);
                None
            }
        })
        .collect()
}
