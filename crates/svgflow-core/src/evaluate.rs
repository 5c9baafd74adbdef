//! Metric evaluation: queries → candidate series → calculated values → threshold colors.

use crate::calc::calculate_value;
use crate::condition::evaluate_condition;
use crate::filter::filter_data;
use crate::format::format_value;
use crate::model::{Metric, Query, QuerySource, Threshold};
use crate::resolve::ResolvedRule;
use crate::series::{SeriesValueMap, SeriesValues};
use crate::utils::{NameMatcher, with_prefix_tag};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Read-only inputs shared by every evaluation of one render pass.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub values: &'a SeriesValueMap,
    pub now: DateTime<Utc>,
}

impl<'a> EvalContext<'a> {
    pub fn new(values: &'a SeriesValueMap, now: DateTime<Utc>) -> Self {
        Self { values, now }
    }
}

/// One evaluated value of a metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorDataEntry {
    /// Origin of the value: `<refid>/<display name>`, or the `sum` label.
    pub key: String,
    /// Displayed label; may carry an internal `_prfx<n>` suffix when repeated inside a metric.
    pub label: String,
    /// `None` restores the element's original paint.
    pub color: Option<String>,
    pub lvl: i32,
    pub metric_value: f64,
    pub display_value: String,
    pub filling: Option<String>,
    pub unit: Option<String>,
    pub title: Option<String>,
}

struct Candidate<'v> {
    ref_id: &'v str,
    name: &'v str,
    series: &'v SeriesValues,
}

fn candidates<'v>(query: &Query, values: &'v SeriesValueMap) -> Vec<Candidate<'v>> {
    match &query.source {
        QuerySource::Ref(refid) => values
            .get_key_value(refid)
            .into_iter()
            .flat_map(|(ref_id, group)| {
                group.values.iter().map(move |(name, series)| Candidate {
                    ref_id,
                    name: name.as_str(),
                    series,
                })
            })
            .collect(),
        QuerySource::Legend(legend) => {
            let matcher = NameMatcher::new(legend);
            values
                .entries()
                .filter(|(_, name, _)| matcher.matches(name))
                .map(|(ref_id, name, series)| Candidate {
                    ref_id,
                    name,
                    series,
                })
                .collect()
        }
    }
}

/// Applies the threshold list to `value`: every match overwrites color and level.
pub fn evaluate_thresholds(
    value: f64,
    thresholds: &[Threshold],
    base_color: Option<&str>,
    ctx: &EvalContext<'_>,
) -> (Option<String>, i32) {
    let mut color = base_color.map(str::to_string);
    let mut lvl = 0;
    for (idx, threshold) in thresholds.iter().enumerate() {
        if !threshold.operator().matches(value, threshold.value) {
            continue;
        }
        if let Some(cond) = threshold.condition.as_deref().filter(|c| !c.trim().is_empty()) {
            if !evaluate_condition(cond, ctx) {
                continue;
            }
        }
        color = Some(threshold.color.clone());
        lvl = threshold.level(idx);
    }
    (color, lvl)
}

/// Evaluates every query of `metric` into color entries, in query order.
pub fn evaluate_metric(metric: &Metric, ctx: &EvalContext<'_>) -> Vec<ColorDataEntry> {
    let metric = metric.normalized();
    let today = ctx.now.date_naive();
    let mut out: Vec<ColorDataEntry> = Vec::new();
    let mut seen: FxHashMap<String, usize> = FxHashMap::default();

    for query in &metric.queries {
        let mut found = candidates(query, ctx.values);
        if let Some(filter) = query.filter.as_deref() {
            found = filter_data(found, filter, today, |c| c.name);
        }
        if found.is_empty() {
            tracing::debug!(query = ?query.source, "query matched no series");
            continue;
        }

        let calculated: Vec<(String, String, f64)> = match query.sum.as_deref() {
            Some(sum_label) => {
                let total = found
                    .iter()
                    .map(|c| calculate_value(&c.series.numeric(), query.calculation))
                    .sum();
                vec![(sum_label.to_string(), sum_label.to_string(), total)]
            }
            None => found
                .iter()
                .map(|c| {
                    let label = match query.label.as_deref() {
                        Some(template) => template.replace("{legend}", c.name),
                        None => c.name.to_string(),
                    };
                    let value = calculate_value(&c.series.numeric(), query.calculation);
                    (format!("{}/{}", c.ref_id, c.name), label, value)
                })
                .collect(),
        };

        let unit = query.unit.as_deref().or(metric.unit.as_deref());
        for (key, label, value) in calculated {
            let count = seen.entry(label.clone()).or_insert(0);
            *count += 1;
            let label = if *count > 1 {
                with_prefix_tag(&label, *count - 1)
            } else {
                label
            };

            let (color, lvl) =
                evaluate_thresholds(value, &metric.thresholds, metric.base_color.as_deref(), ctx);
            out.push(ColorDataEntry {
                key,
                label,
                color,
                lvl,
                metric_value: value,
                display_value: format_value(value, unit, metric.decimal),
                filling: metric.filling.clone(),
                unit: unit.map(str::to_string),
                title: query.title.clone().or_else(|| metric.title.clone()),
            });
        }
    }
    out
}

/// Evaluates every metric of a resolved rule, concatenating the entries in metric order.
pub fn evaluate_rule(rule: &ResolvedRule, ctx: &EvalContext<'_>) -> Vec<ColorDataEntry> {
    rule.metrics
        .iter()
        .flat_map(|metric| evaluate_metric(metric, ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Calculation, Operator};
    use chrono::TimeZone;

    fn values() -> SeriesValueMap {
        let mut map = SeriesValueMap::new();
        let samples = |xs: &[&str]| {
            xs.iter()
                .enumerate()
                .map(|(i, v)| (v.to_string(), i as f64))
                .collect::<Vec<_>>()
        };
        map.append("A", "cpu-1", samples(&["10", "12"]));
        map.append("A", "cpu-2", samples(&["3", "4"]));
        map.append("B", "mem", samples(&["70"]));
        map
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 13, 12, 0, 0).unwrap()
    }

    fn threshold(value: f64, color: &str) -> Threshold {
        Threshold {
            color: color.to_string(),
            value,
            operator: None,
            lvl: None,
            condition: None,
        }
    }

    #[test]
    fn last_matching_threshold_wins() {
        let v = values();
        let ctx = EvalContext::new(&v, now());
        let thresholds = vec![threshold(10.0, "orange"), threshold(5.0, "red")];
        assert_eq!(
            evaluate_thresholds(12.0, &thresholds, None, &ctx),
            (Some("red".to_string()), 2)
        );
        assert_eq!(
            evaluate_thresholds(1.0, &thresholds, Some("green"), &ctx),
            (Some("green".to_string()), 0)
        );
    }

    #[test]
    fn failed_condition_skips_threshold() {
        let v = values();
        let ctx = EvalContext::new(&v, now());
        let mut gated = threshold(5.0, "red");
        gated.condition = Some("hour < 6".to_string());
        gated.lvl = Some(7);
        let thresholds = vec![threshold(1.0, "yellow"), gated];
        assert_eq!(
            evaluate_thresholds(9.0, &thresholds, None, &ctx),
            (Some("yellow".to_string()), 1)
        );
    }

    #[test]
    fn ref_and_legend_queries() {
        let v = values();
        let ctx = EvalContext::new(&v, now());
        let metric = Metric {
            queries: vec![
                Query::by_ref("A").with_calculation(Calculation::Max),
                Query::by_legend("mem"),
            ],
            thresholds: vec![Threshold {
                operator: Some(Operator::Lt),
                ..threshold(5.0, "blue")
            }],
            unit: Some("percent".to_string()),
            ..Metric::default()
        };
        let entries = evaluate_metric(&metric, &ctx);
        let labels: Vec<_> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["cpu-1", "cpu-2", "mem"]);
        assert_eq!(entries[1].color.as_deref(), Some("blue"));
        assert_eq!(entries[0].color, None);
        assert_eq!(entries[2].display_value, "70%");
        assert_eq!(entries[0].key, "A/cpu-1");
    }

    #[test]
    fn sum_filter_and_label_template() {
        let v = values();
        let ctx = EvalContext::new(&v, now());
        let mut summed = Query::by_legend("cpu-.*");
        summed.sum = Some("all cpus".to_string());
        let mut filtered = Query::by_ref("A").with_filter("-cpu-1");
        filtered.label = Some("core {legend}".to_string());
        let metric = Metric {
            queries: vec![summed, filtered],
            ..Metric::default()
        };
        let entries = evaluate_metric(&metric, &ctx);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, "all cpus");
        assert_eq!(entries[0].metric_value, 16.0);
        assert_eq!(entries[1].label, "core cpu-2");
        assert_eq!(entries[1].metric_value, 4.0);
    }

    #[test]
    fn repeated_labels_get_prefix_tags() {
        let v = values();
        let ctx = EvalContext::new(&v, now());
        let metric = Metric {
            queries: vec![Query::by_ref("B"), Query::by_legend("mem")],
            ..Metric::default()
        };
        let labels: Vec<_> = evaluate_metric(&metric, &ctx)
            .into_iter()
            .map(|e| e.label)
            .collect();
        assert_eq!(labels, ["mem", "mem_prfx1"]);
    }

    #[test]
    fn missing_series_yield_nothing() {
        let v = SeriesValueMap::new();
        let ctx = EvalContext::new(&v, now());
        let metric = Metric {
            queries: vec![Query::by_ref("Z")],
            ..Metric::default()
        };
        assert!(evaluate_metric(&metric, &ctx).is_empty());
    }
}
