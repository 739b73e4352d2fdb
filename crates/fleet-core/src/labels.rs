//! Label queries
//!
//! A query is a comma separated list of terms, all of which must hold:
//!
//! ```text
//! cluster=prod,role!=worker,managed,!deprecated
//! ```
//!
//! - `key=value` / `key==value`: label present with that value
//! - `key!=value`: label absent or with a different value
//! - `key`: label present
//! - `!key`: label absent

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A single predicate over a label set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "op")]
pub enum LabelTerm {
    Equal { key: String, value: String },
    NotEqual { key: String, value: String },
    Exists { key: String },
    NotExists { key: String },
}

impl LabelTerm {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            LabelTerm::Equal { key, value } => labels.get(key) == Some(value),
            LabelTerm::NotEqual { key, value } => labels.get(key) != Some(value),
            LabelTerm::Exists { key } => labels.contains_key(key),
            LabelTerm::NotExists { key } => !labels.contains_key(key),
        }
    }
}

impl fmt::Display for LabelTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelTerm::Equal { key, value } => write!(f, "{}={}", key, value),
            LabelTerm::NotEqual { key, value } => write!(f, "{}!={}", key, value),
            LabelTerm::Exists { key } => write!(f, "{}", key),
            LabelTerm::NotExists { key } => write!(f, "!{}", key),
        }
    }
}

/// Conjunction of label terms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelQuery {
    pub terms: Vec<LabelTerm>,
}

impl LabelQuery {
    /// Parse a query string; `Ok(None)` for blank input
    pub fn parse_optional(input: &str) -> Result<Option<Self>> {
        if input.trim().is_empty() {
            return Ok(None);
        }
        input.parse().map(Some)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Check a label set against every term
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.terms.iter().all(|term| term.matches(labels))
    }
}

impl FromStr for LabelQuery {
    type Err = CoreError;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |message: &str| CoreError::InvalidLabelQuery {
            query: input.to_string(),
            message: message.to_string(),
        };

        let mut terms = Vec::new();
        for raw in input.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(invalid("empty term"));
            }

            let term = if let Some((key, value)) = raw.split_once("!=") {
                LabelTerm::NotEqual {
                    key: parse_key(key).ok_or_else(|| invalid("missing key before '!='"))?,
                    value: value.trim().to_string(),
                }
            } else if let Some((key, value)) = raw.split_once("==").or_else(|| raw.split_once('=')) {
                LabelTerm::Equal {
                    key: parse_key(key).ok_or_else(|| invalid("missing key before '='"))?,
                    value: value.trim().to_string(),
                }
            } else if let Some(key) = raw.strip_prefix('!') {
                LabelTerm::NotExists {
                    key: parse_key(key).ok_or_else(|| invalid("missing key after '!'"))?,
                }
            } else {
                LabelTerm::Exists {
                    key: parse_key(raw).ok_or_else(|| invalid("invalid key"))?,
                }
            };
            terms.push(term);
        }

        Ok(Self { terms })
    }
}

impl fmt::Display for LabelQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", term)?;
        }
        Ok(())
    }
}

fn parse_key(key: &str) -> Option<String> {
    let key = key.trim();
    if key.is_empty() || key.contains(['=', '!', ' ']) {
        None
    } else {
        Some(key.to_string())
    }
}
