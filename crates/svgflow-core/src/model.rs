//! Rule configuration entities as they appear in the YAML rule document.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Aggregation reducing a series to one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Calculation {
    #[default]
    Last,
    Total,
    Max,
    Min,
    Count,
    Delta,
}

impl Calculation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" => Some(Self::Last),
            "total" | "sum" => Some(Self::Total),
            "max" => Some(Self::Max),
            "min" => Some(Self::Min),
            "count" => Some(Self::Count),
            "delta" => Some(Self::Delta),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::Total => "total",
            Self::Max => "max",
            Self::Min => "min",
            Self::Count => "count",
            Self::Delta => "delta",
        }
    }
}

/// Comparison used by thresholds and label mappings (`value <op> threshold`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Gt,
    #[default]
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "=", alias = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl Operator {
    pub fn matches(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Ge => value >= threshold,
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
            Self::Eq => value == threshold,
            Self::Ne => value != threshold,
        }
    }

    /// `>` and `>=` match "from a value upwards".
    pub fn is_ascending(self) -> bool {
        matches!(self, Self::Gt | Self::Ge)
    }

    pub fn is_descending(self) -> bool {
        matches!(self, Self::Lt | Self::Le)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threshold {
    pub color: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lvl: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Threshold {
    pub fn operator(&self) -> Operator {
        self.operator.unwrap_or_default()
    }

    /// Explicit `lvl`, otherwise the 1-based position in the threshold list.
    pub fn level(&self, index: usize) -> i32 {
        self.lvl
            .unwrap_or_else(|| i32::try_from(index + 1).unwrap_or(i32::MAX))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuerySource {
    Ref(String),
    Legend(String),
}

/// One query of a metric: either a ref query or a legend query, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQuery", into = "RawQuery")]
pub struct Query {
    pub source: QuerySource,
    pub calculation: Calculation,
    pub filter: Option<String>,
    pub sum: Option<String>,
    pub label: Option<String>,
    pub unit: Option<String>,
    pub title: Option<String>,
}

impl Query {
    pub fn by_ref(refid: impl Into<String>) -> Self {
        Self::with_source(QuerySource::Ref(refid.into()))
    }

    pub fn by_legend(legend: impl Into<String>) -> Self {
        Self::with_source(QuerySource::Legend(legend.into()))
    }

    fn with_source(source: QuerySource) -> Self {
        Self {
            source,
            calculation: Calculation::Last,
            filter: None,
            sum: None,
            label: None,
            unit: None,
            title: None,
        }
    }

    pub fn with_calculation(mut self, calculation: Calculation) -> Self {
        self.calculation = calculation;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn is_ref(&self) -> bool {
        matches!(self.source, QuerySource::Ref(_))
    }

    pub fn is_legend(&self) -> bool {
        matches!(self.source, QuerySource::Legend(_))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuery {
    #[serde(default, alias = "refId", skip_serializing_if = "Option::is_none")]
    refid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    legend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calculation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
}

impl TryFrom<RawQuery> for Query {
    type Error = Error;

    fn try_from(raw: RawQuery) -> Result<Self, Self::Error> {
        let source = match (raw.refid, raw.legend) {
            (Some(refid), None) => QuerySource::Ref(refid),
            (None, Some(legend)) => QuerySource::Legend(legend),
            (Some(refid), Some(legend)) => {
                return Err(Error::InvalidQuery {
                    message: format!(
                        "query sets both refid `{refid}` and legend `{legend}`; use one"
                    ),
                });
            }
            (None, None) => {
                return Err(Error::InvalidQuery {
                    message: "query needs either `refid` or `legend`".to_string(),
                });
            }
        };

        let calculation = match raw.calculation.as_deref() {
            None => Calculation::Last,
            Some(s) => Calculation::parse(s).unwrap_or_else(|| {
                tracing::warn!(calculation = s, "unknown calculation, using `last`");
                Calculation::Last
            }),
        };

        Ok(Self {
            source,
            calculation,
            filter: raw.filter,
            sum: raw.sum,
            label: raw.label,
            unit: raw.unit,
            title: raw.title,
        })
    }
}

impl From<Query> for RawQuery {
    fn from(q: Query) -> Self {
        let (refid, legend) = match q.source {
            QuerySource::Ref(r) => (Some(r), None),
            QuerySource::Legend(l) => (None, Some(l)),
        };
        Self {
            refid,
            legend,
            calculation: Some(q.calculation.as_str().to_string()),
            filter: q.filter,
            sum: q.sum,
            label: q.label,
            unit: q.unit,
            title: q.title,
        }
    }
}

/// Entry of the deprecated `refIds` / `legends` arrays: a bare name or a full query map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyQuery {
    Name(String),
    Query(Query),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Metric {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<Query>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_ids: Option<Vec<LegacyQuery>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legends: Option<Vec<LegacyQuery>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_color: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub thresholds: Vec<Threshold>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimal: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filling: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Metric {
    pub fn has_legacy_fields(&self) -> bool {
        self.ref_ids.is_some() || self.legends.is_some()
    }

    /// Rewrites the deprecated `refIds` / `legends` arrays into `queries`.
    ///
    /// Ref queries come first, then legend queries, both after any explicit `queries`. The
    /// legacy fields are dropped from the returned copy; `self` is left untouched.
    pub fn normalized(&self) -> Cow<'_, Metric> {
        if !self.has_legacy_fields() {
            return Cow::Borrowed(self);
        }

        let mut out = self.clone();
        let ref_ids = out.ref_ids.take().unwrap_or_default();
        let legends = out.legends.take().unwrap_or_default();
        out.queries.extend(ref_ids.into_iter().map(|q| match q {
            LegacyQuery::Name(name) => Query::by_ref(name),
            LegacyQuery::Query(q) => q,
        }));
        out.queries.extend(legends.into_iter().map(|q| match q {
            LegacyQuery::Name(name) => Query::by_legend(name),
            LegacyQuery::Query(q) => q,
        }));
        Cow::Owned(out)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TooltipConfig {
    pub show: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_above: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_below: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMapping {
    #[serde(default)]
    pub condition: Operator,
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Attributes {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<TooltipConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub label_mapping: Vec<LabelMapping>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auto_config: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl Attributes {
    pub fn shows_tooltip(&self) -> bool {
        self.tooltip.as_ref().is_some_and(|t| t.show)
    }
}

/// A single id token or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdSpec {
    One(String),
    Many(Vec<String>),
}

impl IdSpec {
    pub fn tokens(&self) -> &[String] {
        match self {
            Self::One(id) => std::slice::from_ref(id),
            Self::Many(ids) => ids,
        }
    }
}

/// A rule: which elements to target and what to do with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub id: IdSpec,
    #[serde(default)]
    pub attributes: Attributes,
}
