//! Id tokens: `id[:schema[:selector]]` with selectors such as `r1,2|@l3`.

use crate::model::{Metric, QuerySource};

/// Keeps only the listed queries of a metric; ordinals are 1-based and counted per query kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QuerySelector {
    pub refs: Vec<usize>,
    pub legends: Vec<usize>,
}

impl QuerySelector {
    /// Parses `r1,2|l3`; every group needs a kind letter and at least one positive ordinal.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut out = Self::default();
        for group in raw.split('|') {
            let group = group.trim();
            let group = group.strip_prefix('@').unwrap_or(group);
            let mut chars = group.chars();
            let kind = chars.next()?.to_ascii_lowercase();
            let ordinals = chars
                .as_str()
                .split(',')
                .map(|n| n.trim().parse::<usize>().ok().filter(|n| *n > 0))
                .collect::<Option<Vec<_>>>()?;
            match kind {
                'r' => out.refs.extend(ordinals),
                'l' => out.legends.extend(ordinals),
                _ => return None,
            }
        }
        Some(out)
    }

    pub fn apply(&self, metric: &Metric) -> Metric {
        let mut metric = metric.normalized().into_owned();
        let (mut nth_ref, mut nth_legend) = (0, 0);
        metric.queries.retain(|q| match q.source {
            QuerySource::Ref(_) => {
                nth_ref += 1;
                self.refs.contains(&nth_ref)
            }
            QuerySource::Legend(_) => {
                nth_legend += 1;
                self.legends.contains(&nth_legend)
            }
        });
        metric
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdToken {
    pub id: String,
    pub schema: Option<String>,
    pub selector: Option<QuerySelector>,
}

impl IdToken {
    fn plain(id: &str) -> Self {
        Self {
            id: id.to_string(),
            schema: None,
            selector: None,
        }
    }
}

fn is_schema_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

/// Splits a token into id, schema and selector.
///
/// `is_element` reports live element ids: a token that names an element verbatim is never split,
/// so ids containing `:` keep working. Suffixes are peeled from the right and only when they look
/// like a schema word / selector, which leaves patterns such as `(?:a|b)` intact.
pub fn parse_id_token(token: &str, is_element: impl Fn(&str) -> bool) -> IdToken {
    let token = token.trim();
    if is_element(token) {
        return IdToken::plain(token);
    }

    let mut parts = token.rsplitn(3, ':');
    let last = parts.next().unwrap_or_default();
    let middle = parts.next();
    let head = parts.next();

    if let (Some(head), Some(schema)) = (head, middle) {
        if is_schema_word(schema) && !head.is_empty() {
            if let Some(selector) = QuerySelector::parse(last) {
                return IdToken {
                    id: head.to_string(),
                    schema: Some(schema.to_string()),
                    selector: Some(selector),
                };
            }
        }
    }

    if let Some((id, schema)) = token.rsplit_once(':') {
        if is_schema_word(schema) && !id.is_empty() {
            return IdToken {
                id: id.to_string(),
                schema: Some(schema.to_string()),
                selector: None,
            };
        }
    }
    IdToken::plain(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Query;

    fn no_elements(_: &str) -> bool {
        false
    }

    #[test]
    fn splits_schema_and_selector() {
        let tok = parse_id_token("pump1:stroke:r1,2|@l3", no_elements);
        assert_eq!(tok.id, "pump1");
        assert_eq!(tok.schema.as_deref(), Some("stroke"));
        assert_eq!(
            tok.selector,
            Some(QuerySelector {
                refs: vec![1, 2],
                legends: vec![3]
            })
        );

        let tok = parse_id_token("cell.*:text", no_elements);
        assert_eq!((tok.id.as_str(), tok.schema.as_deref()), ("cell.*", Some("text")));
    }

    #[test]
    fn keeps_literal_ids_and_patterns_whole() {
        let tok = parse_id_token("a:basic", |id| id == "a:basic");
        assert_eq!(tok, IdToken::plain("a:basic"));
        assert_eq!(parse_id_token("(?:a|b)", no_elements), IdToken::plain("(?:a|b)"));
        assert_eq!(parse_id_token("x:1", no_elements), IdToken::plain("x:1"));
    }

    #[test]
    fn selector_counts_ordinals_per_kind() {
        let metric = Metric {
            queries: vec![
                Query::by_ref("A"),
                Query::by_legend("cpu"),
                Query::by_ref("B"),
                Query::by_legend("mem"),
            ],
            ..Metric::default()
        };
        let selector = QuerySelector::parse("r2|l1").unwrap();
        let kept = selector.apply(&metric);
        assert_eq!(kept.queries, vec![Query::by_legend("cpu"), Query::by_ref("B")]);
        assert_eq!(metric.queries.len(), 4);
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert_eq!(QuerySelector::parse("x1"), None);
        assert_eq!(QuerySelector::parse("r"), None);
        assert_eq!(QuerySelector::parse("r0"), None);
        assert_eq!(QuerySelector::parse("r1,"), None);
    }
}
