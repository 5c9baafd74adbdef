use super::ElementUniverse;
use crate::utils::{anchored_regex, has_regex_meta};
use regex::Regex;
use rustc_hash::FxHashMap;

/// Compiled id patterns and per-token match lists.
///
/// Owned by the panel and passed by `&mut`. Entries are only valid for the element universe they
/// were computed against; [`ResolverCache::sync`] drops them when the universe changes.
#[derive(Debug, Default)]
pub struct ResolverCache {
    fingerprint: Option<u64>,
    patterns: FxHashMap<String, Option<Regex>>,
    matches: FxHashMap<String, Vec<String>>,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.fingerprint = None;
        self.patterns.clear();
        self.matches.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.matches.is_empty()
    }

    pub fn cached_tokens(&self) -> usize {
        self.matches.len()
    }

    pub(crate) fn sync(&mut self, universe: &ElementUniverse) {
        let fingerprint = universe.fingerprint();
        if self.fingerprint != Some(fingerprint) {
            if self.fingerprint.is_some() {
                tracing::debug!("element set changed, dropping resolver cache");
            }
            self.clear();
            self.fingerprint = Some(fingerprint);
        }
    }

    /// Element ids matched by `id`, in document order.
    pub(crate) fn targets(&mut self, id: &str, universe: &ElementUniverse) -> &[String] {
        if !self.matches.contains_key(id) {
            let found = if universe.contains(id) {
                vec![id.to_string()]
            } else if has_regex_meta(id) {
                let re = self
                    .patterns
                    .entry(id.to_string())
                    .or_insert_with(|| anchored_regex(id));
                match re {
                    Some(re) => universe
                        .iter()
                        .filter(|el| re.is_match(el))
                        .map(str::to_string)
                        .collect(),
                    None => Vec::new(),
                }
            } else {
                Vec::new()
            };
            if found.is_empty() {
                tracing::debug!(token = id, "selector matched no element");
            }
            self.matches.insert(id.to_string(), found);
        }
        self.matches.get(id).map(Vec::as_slice).unwrap_or_default()
    }
}
