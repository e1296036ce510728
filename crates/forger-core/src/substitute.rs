//! Placeholder substitution over raw template bytes.
//!
//! Ordering rule for overlapping placeholders: the content is scanned once,
//! left to right. At each position the longest placeholder that matches is
//! replaced, and replacement text is never scanned again. The output therefore
//! does not depend on the order pairs were added in, a placeholder that is a
//! substring of another never clobbers the longer one, and a replacement that
//! happens to contain a placeholder is left alone.
//!
//! ```
//! use forger_core::{Substituter, Substitutions};
//!
//! let subs: Substitutions = [("{{app}}", "demo"), ("{{app}}_db", "store")].into_iter().collect();
//! let out = Substituter::new(&subs).unwrap().apply(b"{{app}} uses {{app}}_db");
//! assert_eq!(out, b"demo uses store");
//! ```

use crate::error::SubstituteError;
use crate::types::Substitutions;
use regex::bytes::{Captures, Regex};
use std::collections::HashMap;

/// Compiled form of a [`Substitutions`] map
#[derive(Debug)]
pub struct Substituter {
    pattern: Option<Regex>,
    replacements: HashMap<Vec<u8>, Vec<u8>>,
}

impl Substituter {
    /// Compile the placeholders into a single alternation, longest first
    pub fn new(substitutions: &Substitutions) -> Result<Self, SubstituteError> {
        if substitutions.is_empty() {
            return Ok(Self {
                pattern: None,
                replacements: HashMap::new(),
            });
        }

        let mut placeholders: Vec<&str> = substitutions.iter().map(|(p, _)| p).collect();
        if placeholders.iter().any(|p| p.is_empty()) {
            return Err(SubstituteError::EmptyPlaceholder);
        }
        // Alternation is leftmost-first, so longest-first makes it leftmost-longest
        placeholders.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let alternation = placeholders
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");

        let replacements = substitutions
            .iter()
            .map(|(p, r)| (p.as_bytes().to_vec(), r.as_bytes().to_vec()))
            .collect();

        Ok(Self {
            pattern: Some(Regex::new(&alternation)?),
            replacements,
        })
    }

    /// Replace every placeholder occurrence in `content`
    pub fn apply(&self, content: &[u8]) -> Vec<u8> {
        let Some(pattern) = &self.pattern else {
            return content.to_vec();
        };

        pattern
            .replace_all(content, |caps: &Captures<'_>| {
                let matched = &caps[0];
                self.replacements
                    .get(matched)
                    .cloned()
                    .unwrap_or_else(|| matched.to_vec())
            })
            .into_owned()
    }
}

/// Compile and apply in one step
pub fn apply(
    content: &[u8],
    substitutions: &Substitutions,
) -> Result<Vec<u8>, SubstituteError> {
    Ok(Substituter::new(substitutions)?.apply(content))
}
