//! Matching real photos with their synthetic counterparts.
//!
//! Real photos are named after the capture time (`20241114_0250.jpg`) while
//! synthetic images carry the same two leading tokens followed by generator
//! details (`20241114_0250_r14_FLDK_..._synthesized_image.jpg`). Both sides are
//! reduced to a prefix and joined on exact equality.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::collections::hash_map::Entry;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, SurveyError};

/// Delimiter separating the tokens of a synthetic filename.
pub const DEFAULT_DELIMITER: char = '_';

/// Number of leading tokens encoding the source photo's date and time.
pub const SYNTH_PREFIX_TOKENS: usize = 2;

/// A validated correspondence between a real photo and a synthetic image.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImagePair {
    /// Join key shared by both filenames.
    pub prefix: String,
    pub real_filename: String,
    pub synth_filename: String,
}

fn stem(name: &str) -> Option<&str> {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
}

/// Prefix of a real photo: the filename without its extension.
pub fn real_prefix(name: &str) -> Option<String> {
    stem(name).map(str::to_string)
}

/// Prefix of a synthetic image: the first two `delimiter`-separated tokens of
/// the extension-less name. Names with fewer than two tokens have no prefix.
pub fn synth_prefix(name: &str, delimiter: char) -> Option<String> {
    leading_tokens(name, delimiter, SYNTH_PREFIX_TOKENS)
}

/// First `count` tokens of a synthetic filename joined by `delimiter`.
///
/// Returns `None` for names that do not follow the synthetic convention (fewer
/// than [`SYNTH_PREFIX_TOKENS`] tokens or an empty leading token) or that are
/// shorter than `count` tokens.
pub fn leading_tokens(name: &str, delimiter: char, count: usize) -> Option<String> {
    let tokens: Vec<&str> = stem(name)?.split(delimiter).collect();
    let needed = count.max(SYNTH_PREFIX_TOKENS);
    if count == 0 || tokens.len() < needed {
        return None;
    }
    if tokens[..SYNTH_PREFIX_TOKENS].iter().any(|t| t.is_empty()) {
        return None;
    }
    Some(tokens[..count].join(&delimiter.to_string()))
}

/// Every pair available for sampling, in the order the real files were listed.
#[derive(Clone, Debug, Default)]
pub struct PairUniverse {
    pairs: Vec<ImagePair>,
    by_prefix: HashMap<String, usize>,
}

impl PairUniverse {
    /// Build the universe using [`DEFAULT_DELIMITER`].
    pub fn build<R, S>(real_set: R, synth_set: S) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        Self::build_with(real_set, synth_set, DEFAULT_DELIMITER)
    }

    /// Build the universe from two filename sets.
    ///
    /// A real photo whose prefix has `k` tokens matches the synthetic image
    /// whose first `k` tokens are identical, so the usual two-token photo name
    /// matches on the date/time prefix. Synthetic files sharing a key overwrite
    /// each other (last one wins). Real files sharing a prefix keep the first
    /// one seen.
    pub fn build_with<R, S>(real_set: R, synth_set: S, delimiter: char) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let reals: Vec<(String, String)> = real_set
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref();
                real_prefix(name).map(|prefix| (name.to_string(), prefix))
            })
            .collect();
        let depths: BTreeSet<usize> = reals
            .iter()
            .map(|(_, prefix)| prefix.split(delimiter).count())
            .collect();

        let mut synth_by_key: HashMap<(usize, String), String> = HashMap::new();
        for name in synth_set {
            let name = name.as_ref();
            for &depth in &depths {
                let Some(key) = leading_tokens(name, delimiter, depth) else {
                    continue;
                };
                if let Some(previous) = synth_by_key.insert((depth, key), name.to_string()) {
                    debug!(replaced = %previous, by = name, "duplicate synthetic prefix");
                }
            }
        }

        let mut universe = PairUniverse::default();
        for (name, prefix) in reals {
            let depth = prefix.split(delimiter).count();
            let Some(synth) = synth_by_key.get(&(depth, prefix.clone())) else {
                continue;
            };
            match universe.by_prefix.entry(prefix) {
                Entry::Occupied(slot) => {
                    debug!(prefix = %slot.key(), file = %name, "duplicate real prefix, keeping first");
                }
                Entry::Vacant(slot) => {
                    let prefix = slot.key().clone();
                    slot.insert(universe.pairs.len());
                    universe.pairs.push(ImagePair {
                        prefix,
                        real_filename: name,
                        synth_filename: synth.clone(),
                    });
                }
            }
        }
        universe
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[ImagePair] {
        &self.pairs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImagePair> {
        self.pairs.iter()
    }

    /// Look up the pair registered for `prefix`.
    pub fn get(&self, prefix: &str) -> Option<&ImagePair> {
        self.by_prefix.get(prefix).map(|&i| &self.pairs[i])
    }

    /// Fail with [`SurveyError::EmptyUniverse`] when nothing matched.
    pub fn require_non_empty(&self) -> Result<&Self> {
        if self.is_empty() {
            Err(SurveyError::EmptyUniverse)
        } else {
            Ok(self)
        }
    }
}

impl<'a> IntoIterator for &'a PairUniverse {
    type Item = &'a ImagePair;
    type IntoIter = std::slice::Iter<'a, ImagePair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}
