//! Rule resolution: id tokens → live element ids, schemas and query selectors applied.

mod cache;
mod schema;
mod token;

pub use cache::ResolverCache;
pub use schema::{Schema, UnknownSchema};
pub use token::{IdToken, QuerySelector, parse_id_token};

use crate::model::{Attributes, Change, Metric};
use rustc_hash::{FxHashSet, FxHasher};
use std::hash::{Hash, Hasher};

/// Element ids of the current SVG, in document order.
#[derive(Debug, Clone, Default)]
pub struct ElementUniverse {
    ids: Vec<String>,
    set: FxHashSet<String>,
}

impl ElementUniverse {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Self::default();
        for id in ids {
            let id = id.into();
            if out.set.insert(id.clone()) {
                out.ids.push(id);
            }
        }
        out
    }

    pub fn contains(&self, id: &str) -> bool {
        self.set.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub(crate) fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.ids.hash(&mut hasher);
        hasher.finish()
    }
}

/// One (rule, schema, selector) combination with its live targets.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRule {
    /// Position of the source rule in the flattened rule list.
    pub rule_index: usize,
    pub schema: Option<Schema>,
    pub targets: Vec<String>,
    /// Schema-shaped attributes; `metrics` is moved out into [`ResolvedRule::metrics`].
    pub attributes: Attributes,
    /// Normalized metrics with the token's query selector applied.
    pub metrics: Vec<Metric>,
}

fn parse_schema(raw: &str, rule_index: usize) -> Result<Schema, UnknownSchema> {
    raw.parse::<Schema>().inspect_err(|err| {
        tracing::warn!(rule = rule_index, error = %err, "skipping id token");
    })
}

/// Resolves `rules` against the current element ids.
///
/// Tokens of one rule that share a schema and selector are merged into a single
/// [`ResolvedRule`]; rules that match no element are dropped.
pub fn resolve_rules(
    rules: &[Change],
    universe: &ElementUniverse,
    cache: &mut ResolverCache,
) -> Vec<ResolvedRule> {
    cache.sync(universe);
    let mut out = Vec::new();

    for (rule_index, rule) in rules.iter().enumerate() {
        let default_schema = match rule.attributes.schema.as_deref() {
            Some(raw) => parse_schema(raw, rule_index).ok(),
            None => None,
        };

        let mut buckets: Vec<(Option<Schema>, Option<QuerySelector>, Vec<String>)> = Vec::new();
        for raw in rule.id.tokens() {
            let token = parse_id_token(raw, |id| universe.contains(id));
            let schema = match token.schema.as_deref() {
                Some(name) => match parse_schema(name, rule_index) {
                    Ok(schema) => Some(schema),
                    Err(_) => continue,
                },
                None => default_schema,
            };

            let idx = match buckets
                .iter()
                .position(|(s, sel, _)| *s == schema && *sel == token.selector)
            {
                Some(idx) => idx,
                None => {
                    buckets.push((schema, token.selector.clone(), Vec::new()));
                    buckets.len() - 1
                }
            };
            let targets = &mut buckets[idx].2;
            for id in cache.targets(&token.id, universe) {
                if !targets.contains(id) {
                    targets.push(id.clone());
                }
            }
        }

        for (schema, selector, targets) in buckets {
            if targets.is_empty() {
                continue;
            }
            let mut attributes = match schema {
                Some(schema) => schema.apply(&rule.attributes).into_owned(),
                None => rule.attributes.clone(),
            };
            let metrics = std::mem::take(&mut attributes.metrics)
                .iter()
                .map(|metric| match &selector {
                    Some(selector) => selector.apply(metric),
                    None => metric.normalized().into_owned(),
                })
                .collect();
            out.push(ResolvedRule {
                rule_index,
                schema,
                targets,
                attributes,
                metrics,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IdSpec, Query};

    fn universe() -> ElementUniverse {
        ElementUniverse::new(["cell1", "cell2", "cell10", "pump", "a:b"])
    }

    fn rule(ids: &[&str]) -> Change {
        Change {
            id: IdSpec::Many(ids.iter().map(|s| s.to_string()).collect()),
            attributes: Attributes {
                metrics: vec![Metric {
                    queries: vec![Query::by_ref("A"), Query::by_ref("B")],
                    ..Metric::default()
                }],
                label: Some("replace".to_string()),
                ..Attributes::default()
            },
        }
    }

    #[test]
    fn literal_and_pattern_tokens() {
        let mut cache = ResolverCache::new();
        let rules = [rule(&["cell\\d", "pump", "cell1", "missing"])];
        let resolved = resolve_rules(&rules, &universe(), &mut cache);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].targets, ["cell1", "cell2", "pump"]);
        assert_eq!(cache.cached_tokens(), 4);
    }

    #[test]
    fn exact_id_beats_token_syntax() {
        let mut cache = ResolverCache::new();
        let resolved = resolve_rules(&[rule(&["a:b"])], &universe(), &mut cache);
        assert_eq!(resolved[0].targets, ["a:b"]);
        assert_eq!(resolved[0].schema, None);
    }

    #[test]
    fn splits_by_schema_and_selector() {
        let mut cache = ResolverCache::new();
        let resolved = resolve_rules(
            &[rule(&["cell1:stroke", "cell2:stroke", "pump:text:r2", "cell10"])],
            &universe(),
            &mut cache,
        );
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].schema, Some(Schema::Stroke));
        assert_eq!(resolved[0].targets, ["cell1", "cell2"]);
        assert_eq!(resolved[0].attributes.label, None);
        assert_eq!(resolved[1].metrics[0].queries, vec![Query::by_ref("B")]);
        assert_eq!(resolved[2].schema, None);
        assert!(resolved.iter().all(|r| r.attributes.metrics.is_empty()));
    }

    #[test]
    fn unknown_schema_skips_token_and_default_schema_applies() {
        let mut cache = ResolverCache::new();
        let mut with_default = rule(&["cell1", "cell2:bogus"]);
        with_default.attributes.schema = Some("basic".to_string());
        let resolved = resolve_rules(&[with_default], &universe(), &mut cache);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].targets, ["cell1"]);
        assert_eq!(resolved[0].schema, Some(Schema::Basic));
    }

    #[test]
    fn empty_rules_are_dropped_and_cache_tracks_universe() {
        let mut cache = ResolverCache::new();
        assert!(resolve_rules(&[rule(&["nope", "[bad"])], &universe(), &mut cache).is_empty());
        assert!(!cache.is_empty());

        let smaller = ElementUniverse::new(["cell1"]);
        let resolved = resolve_rules(&[rule(&["cell.*"])], &smaller, &mut cache);
        assert_eq!(resolved[0].targets, ["cell1"]);
        assert_eq!(cache.cached_tokens(), 1);
    }
}
