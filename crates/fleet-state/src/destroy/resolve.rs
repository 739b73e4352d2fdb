//! Resource type resolution
//!
//! Maps a user supplied type token to exactly one catalog definition. The
//! lookup table is keyed by lowercased ID and alias and built once per
//! operation.

use std::collections::HashMap;

use fleet_core::ResourceDefinition;

use crate::error::{Result, StateError};
use crate::store::State;

/// Maximum edit distance for a "did you mean" hint
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Resource definitions indexed by every name they answer to
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    definitions: Vec<ResourceDefinition>,
    by_name: HashMap<String, Vec<usize>>,
}

impl Catalog {
    pub fn new(definitions: Vec<ResourceDefinition>) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, definition) in definitions.iter().enumerate() {
            for name in definition.names() {
                let slot = by_name.entry(name.to_lowercase()).or_default();
                // A definition whose alias repeats its own ID still counts once
                if !slot.contains(&index) {
                    slot.push(index);
                }
            }
        }
        Self {
            definitions,
            by_name,
        }
    }

    /// Fetch the catalog from the store
    pub async fn load<S: State + ?Sized>(state: &S) -> Result<Self> {
        Ok(Self::new(state.resolve_catalog().await?))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Resolve a type token to a single definition
    pub fn resolve(&self, token: &str) -> Result<&ResourceDefinition> {
        let matches = self
            .by_name
            .get(&token.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default();

        match matches {
            [] => Err(StateError::UnknownType {
                token: token.to_string(),
                suggestion: self.suggest(token),
            }),
            [index] => Ok(&self.definitions[*index]),
            many => {
                let mut candidates: Vec<String> = many
                    .iter()
                    .map(|&index| self.definitions[index].id.clone())
                    .collect();
                candidates.sort();
                Err(StateError::AmbiguousType {
                    token: token.to_string(),
                    candidates,
                })
            }
        }
    }

    /// Closest known name to an unknown token
    fn suggest(&self, token: &str) -> Option<String> {
        let token = token.to_lowercase();
        self.definitions
            .iter()
            .flat_map(|definition| definition.names())
            .map(|name| (strsim::levenshtein(&token, &name.to_lowercase()), name))
            .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, name)| name.to_string())
    }
}
