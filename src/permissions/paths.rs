use anyhow::{Context, Result};
use path_clean::PathClean;
use regex::{RegexSet, RegexSetBuilder};
use serde_json::{Map, Value};
use std::path::Path;

/// Path patterns no operation may ever reference.
///
/// Patterns are case-insensitive regular expressions matched against every
/// parameter value, stringified. A string value is tested both as given and
/// lexically cleaned, so `..` segments cannot walk around a pattern.
#[derive(Debug, Clone)]
pub struct ForbiddenPathSet {
    patterns: Vec<String>,
    set: RegexSet,
}

/// The first parameter value that hit a forbidden pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenMatch {
    pub pattern: String,
    pub value: String,
}

impl ForbiddenPathSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let set = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()
            .context("Invalid forbidden path pattern")?;
        Ok(Self {
            patterns: patterns.to_vec(),
            set,
        })
    }

    pub fn contains_forbidden_path(&self, parameters: &Map<String, Value>) -> bool {
        self.find(parameters).is_some()
    }

    /// Walks all values (recursing into arrays and objects) and returns the
    /// first match. Non-string leaves are stringified; this never fails.
    pub fn find(&self, parameters: &Map<String, Value>) -> Option<ForbiddenMatch> {
        let mut leaves = Vec::new();
        for value in parameters.values() {
            collect_leaves(value, &mut leaves);
        }

        leaves.into_iter().find_map(|leaf| self.match_text(&leaf))
    }

    fn match_text(&self, text: &str) -> Option<ForbiddenMatch> {
        let cleaned = Path::new(text).clean().to_string_lossy().into_owned();
        for candidate in [text, cleaned.as_str()] {
            if let Some(index) = self.set.matches(candidate).iter().next() {
                return Some(ForbiddenMatch {
                    pattern: self.patterns[index].clone(),
                    value: text.to_string(),
                });
            }
        }
        None
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

fn collect_leaves(value: &Value, leaves: &mut Vec<String>) {
    match value {
        Value::String(s) => leaves.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                collect_leaves(item, leaves);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_leaves(item, leaves);
            }
        }
        Value::Null => {}
        other => leaves.push(other.to_string()),
    }
}
