//! Per-element aggregation of rule results into render directives.

use crate::evaluate::{ColorDataEntry, EvalContext, evaluate_rule};
use crate::filling::Filling;
use crate::model::{Attributes, LabelMapping};
use crate::resolve::{ResolvedRule, Schema};
use crate::utils::{sanitize_url, strip_prefix_tag};
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;

/// What one resolved rule contributes to one element.
#[derive(Debug, Clone)]
pub struct Contribution<'a> {
    pub rule_index: usize,
    pub schema: Option<Schema>,
    pub attributes: &'a Attributes,
    pub color_data: Vec<ColorDataEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct DataMapEntry<'a> {
    pub additional: Vec<Contribution<'a>>,
    /// Winning entry over all contributions; recomputed on every build.
    pub max_entry: Option<ColorDataEntry>,
}

/// Element id → contributions, in first-targeted order.
#[derive(Debug, Clone, Default)]
pub struct DataMap<'a> {
    entries: IndexMap<String, DataMapEntry<'a>>,
}

impl<'a> DataMap<'a> {
    /// Evaluates every resolved rule and distributes its entries over the rule's targets.
    pub fn build(rules: &'a [ResolvedRule], ctx: &EvalContext<'_>) -> Self {
        let mut map = Self::default();
        for rule in rules {
            let results = evaluate_rule(rule, ctx);
            let shares = distribute(results, rule.targets.len(), rule.attributes.auto_config);
            for (target, color_data) in rule.targets.iter().zip(shares) {
                map.entries
                    .entry(target.clone())
                    .or_default()
                    .additional
                    .push(Contribution {
                        rule_index: rule.rule_index,
                        schema: rule.schema,
                        attributes: &rule.attributes,
                        color_data,
                    });
            }
        }
        for entry in map.entries.values_mut() {
            entry.max_entry = select_winner(
                entry
                    .additional
                    .iter()
                    .flat_map(|c| c.color_data.iter()),
            )
            .cloned();
        }
        map
    }

    pub fn get(&self, id: &str) -> Option<&DataMapEntry<'a>> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataMapEntry<'a>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits one rule's results over `targets` elements.
///
/// With `auto_config` and more than one target, result `i` goes to target `min(i, targets - 1)`;
/// otherwise every target receives every result.
pub fn distribute(
    results: Vec<ColorDataEntry>,
    targets: usize,
    auto_config: bool,
) -> Vec<Vec<ColorDataEntry>> {
    if targets == 0 {
        return Vec::new();
    }
    if !auto_config || targets == 1 {
        return vec![results; targets];
    }
    let mut out = vec![Vec::new(); targets];
    for (i, entry) in results.into_iter().enumerate() {
        out[i.min(targets - 1)].push(entry);
    }
    out
}

fn outranks(candidate: &ColorDataEntry, best: &ColorDataEntry) -> bool {
    match candidate.lvl.cmp(&best.lvl) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => candidate.metric_value.total_cmp(&best.metric_value) == Ordering::Greater,
    }
}

/// Highest level wins, then the highest value; the first entry wins a full tie.
pub fn select_winner<'e>(
    entries: impl IntoIterator<Item = &'e ColorDataEntry>,
) -> Option<&'e ColorDataEntry> {
    entries.into_iter().fold(None, |best, candidate| match best {
        Some(best) if !outranks(candidate, best) => Some(best),
        _ => Some(candidate),
    })
}

/// Rewrites a displayed value through the label mappings; the first matching mapping wins.
///
/// Mappings are tried `>`/`>=` from the highest value down, then `<`/`<=` from the lowest value
/// up, then the equality operators in list order.
pub fn map_label(value: f64, display: &str, mappings: &[LabelMapping]) -> String {
    let mut ascending: Vec<&LabelMapping> = Vec::new();
    let mut descending: Vec<&LabelMapping> = Vec::new();
    let mut equality: Vec<&LabelMapping> = Vec::new();
    for m in mappings {
        if m.condition.is_ascending() {
            ascending.push(m);
        } else if m.condition.is_descending() {
            descending.push(m);
        } else {
            equality.push(m);
        }
    }
    ascending.sort_by(|a, b| b.value.total_cmp(&a.value));
    descending.sort_by(|a, b| a.value.total_cmp(&b.value));

    ascending
        .into_iter()
        .chain(descending)
        .chain(equality)
        .find(|m| m.condition.matches(value, m.value))
        .map_or_else(|| display.to_string(), |m| m.label.clone())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipContent {
    pub id: String,
    pub label: String,
    pub color: Option<String>,
    pub metric: String,
    pub lvl: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_above: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_below: Option<String>,
}

/// Everything the DOM applier needs for one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDirective {
    pub id: String,
    /// Winner color; `None` restores the element's original paint.
    pub color: Option<String>,
    pub filling: Filling,
    /// `false` when no rule produced a value for the element.
    pub painted: bool,
    /// Label lines, when any rule targeting the element sets `label`.
    pub label: Option<Vec<String>>,
    pub label_color: Option<String>,
    pub link: Option<String>,
    pub tooltips: Vec<TooltipContent>,
}

fn directive(id: &str, entry: &DataMapEntry<'_>) -> ElementDirective {
    let winner = entry.max_entry.as_ref();
    let mut label: Option<Vec<String>> = None;
    let mut label_color = None;
    let mut link = None;
    let mut tooltips = Vec::new();

    for contribution in &entry.additional {
        let attrs = contribution.attributes;
        match attrs.label.as_deref() {
            // No data leaves the original text in place.
            Some("replace") if contribution.color_data.is_empty() => {}
            Some("replace") => label.get_or_insert_with(Vec::new).extend(
                contribution
                    .color_data
                    .iter()
                    .map(|e| map_label(e.metric_value, &e.display_value, &attrs.label_mapping)),
            ),
            Some(text) => label.get_or_insert_with(Vec::new).push(text.to_string()),
            None => {}
        }

        if let Some(color) = attrs.label_color.as_deref() {
            label_color = match color {
                "metric" => winner.and_then(|w| w.color.clone()),
                literal => Some(literal.to_string()),
            };
        }

        if let Some(href) = attrs.link.as_deref().filter(|l| !l.trim().is_empty()) {
            link = Some(sanitize_url(href));
        }

        if let Some(tooltip) = attrs.tooltip.as_ref().filter(|t| t.show) {
            tooltips.extend(contribution.color_data.iter().map(|e| TooltipContent {
                id: id.to_string(),
                label: strip_prefix_tag(&e.label).to_string(),
                color: e.color.clone(),
                metric: e.display_value.clone(),
                lvl: e.lvl,
                title: e.title.clone(),
                text_above: tooltip.text_above.clone(),
                text_below: tooltip.text_below.clone(),
            }));
        }
    }

    ElementDirective {
        id: id.to_string(),
        color: winner.and_then(|w| w.color.clone()),
        filling: Filling::parse(winner.and_then(|w| w.filling.as_deref())),
        painted: winner.is_some(),
        label,
        label_color,
        link,
        tooltips,
    }
}

/// One directive per targeted element, in first-targeted order.
pub fn assemble_directives(map: &DataMap<'_>) -> Vec<ElementDirective> {
    map.iter().map(|(id, entry)| directive(id, entry)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metric, Operator, Query, Threshold, TooltipConfig};
    use crate::series::SeriesValueMap;
    use chrono::{TimeZone, Utc};

    fn entry(label: &str, lvl: i32, value: f64) -> ColorDataEntry {
        ColorDataEntry {
            key: label.to_string(),
            label: label.to_string(),
            color: Some(format!("c{lvl}")),
            lvl,
            metric_value: value,
            display_value: value.to_string(),
            filling: None,
            unit: None,
            title: None,
        }
    }

    fn labels(share: &[ColorDataEntry]) -> Vec<&str> {
        share.iter().map(|e| e.label.as_str()).collect()
    }

    #[test]
    fn auto_config_overflow_goes_to_last_target() {
        let results: Vec<_> = (0..5).map(|i| entry(&i.to_string(), 0, 0.0)).collect();
        let shares = distribute(results.clone(), 3, true);
        assert_eq!(labels(&shares[0]), ["0"]);
        assert_eq!(labels(&shares[1]), ["1"]);
        assert_eq!(labels(&shares[2]), ["2", "3", "4"]);

        let shares = distribute(results[..1].to_vec(), 3, true);
        assert!(shares[1].is_empty() && shares[2].is_empty());

        let shares = distribute(results, 2, false);
        assert_eq!(shares[0].len(), 5);
        assert_eq!(shares[1].len(), 5);
    }

    #[test]
    fn level_beats_magnitude() {
        let a = entry("a", 1, 100.0);
        let b = entry("b", 2, 1.0);
        let c = entry("c", 2, 1.0);
        let winner = select_winner([&a, &b, &c]);
        assert_eq!(winner.map(|w| w.label.as_str()), Some("b"));

        let d = entry("d", 2, 5.0);
        assert_eq!(select_winner([&b, &d]).map(|w| w.label.as_str()), Some("d"));
        assert_eq!(select_winner(std::iter::empty::<&ColorDataEntry>()), None);
    }

    #[test]
    fn label_mapping_order() {
        let mapping = |condition, value: f64, label: &str| LabelMapping {
            condition,
            value,
            label: label.to_string(),
        };
        let mappings = vec![
            mapping(Operator::Ge, 10.0, "warm"),
            mapping(Operator::Eq, 0.0, "off"),
            mapping(Operator::Ge, 50.0, "hot"),
            mapping(Operator::Lt, 5.0, "cold"),
            mapping(Operator::Lt, 2.0, "frozen"),
        ];
        assert_eq!(map_label(60.0, "60", &mappings), "hot");
        assert_eq!(map_label(20.0, "20", &mappings), "warm");
        assert_eq!(map_label(1.0, "1", &mappings), "frozen");
        assert_eq!(map_label(3.0, "3", &mappings), "cold");
        assert_eq!(map_label(0.0, "0", &mappings), "frozen");
        assert_eq!(map_label(7.0, "7", &mappings), "7");
    }

    #[test]
    fn builds_directives_across_rules() {
        let mut values = SeriesValueMap::new();
        values.append("A", "pump", [("42".to_string(), 0.0)]);
        values.append("B", "flow", [("3".to_string(), 0.0)]);
        let ctx = EvalContext::new(&values, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let metric = |refid: &str, color: &str| Metric {
            queries: vec![Query::by_ref(refid)],
            thresholds: vec![Threshold {
                color: color.to_string(),
                value: 1.0,
                operator: None,
                lvl: None,
                condition: None,
            }],
            filling: Some("fill, 50".to_string()),
            ..Metric::default()
        };
        let rules = vec![
            ResolvedRule {
                rule_index: 0,
                schema: None,
                targets: vec!["p1".to_string()],
                attributes: Attributes {
                    label: Some("replace".to_string()),
                    label_color: Some("metric".to_string()),
                    link: Some("javascript:alert(1)".to_string()),
                    tooltip: Some(TooltipConfig {
                        show: true,
                        text_above: Some("Pump".to_string()),
                        text_below: None,
                    }),
                    ..Attributes::default()
                },
                metrics: vec![metric("A", "red")],
            },
            ResolvedRule {
                rule_index: 1,
                schema: None,
                targets: vec!["p1".to_string(), "p2".to_string()],
                attributes: Attributes {
                    label: Some("Flow".to_string()),
                    ..Attributes::default()
                },
                metrics: vec![metric("B", "blue")],
            },
        ];

        let map = DataMap::build(&rules, &ctx);
        assert_eq!(map.len(), 2);
        let directives = assemble_directives(&map);

        let p1 = &directives[0];
        assert_eq!(p1.id, "p1");
        assert_eq!(p1.color.as_deref(), Some("red"));
        assert_eq!(p1.filling, Filling::parse(Some("fill, 50")));
        assert_eq!(p1.label, Some(vec!["42".to_string(), "Flow".to_string()]));
        assert_eq!(p1.label_color.as_deref(), Some("red"));
        assert_eq!(p1.link.as_deref(), Some("about:blank"));
        assert_eq!(p1.tooltips.len(), 1);
        assert_eq!(p1.tooltips[0].label, "pump");
        assert_eq!(p1.tooltips[0].text_above.as_deref(), Some("Pump"));

        let p2 = &directives[1];
        assert_eq!(p2.color.as_deref(), Some("blue"));
        assert!(p2.painted);
        assert!(p2.tooltips.is_empty());
    }

    #[test]
    fn replace_label_without_data_keeps_original_text() {
        let values = SeriesValueMap::new();
        let ctx = EvalContext::new(&values, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let rules = vec![ResolvedRule {
            rule_index: 0,
            schema: None,
            targets: vec!["level".to_string()],
            attributes: Attributes {
                label: Some("replace".to_string()),
                ..Attributes::default()
            },
            metrics: vec![Metric {
                queries: vec![Query::by_ref("L")],
                ..Metric::default()
            }],
        }];

        let directives = assemble_directives(&DataMap::build(&rules, &ctx));
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].label, None);
        assert!(!directives[0].painted);
    }
}
