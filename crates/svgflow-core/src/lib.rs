#![forbid(unsafe_code)]

//! Metric-to-visual mapping engine (headless).
//!
//! The pipeline runs leaves first:
//! - [`extract`]: query-result frames into a [`SeriesValueMap`]
//! - [`resolve`]: rule list + live element ids into [`ResolvedRule`]s
//! - [`evaluate`]: metrics into [`ColorDataEntry`] results (thresholds, conditions)
//! - [`assemble`]: per-rule results into per-element [`ElementDirective`]s
//!
//! Applying directives to an SVG tree lives in `svgflow-render`.

pub mod assemble;
pub mod calc;
pub mod condition;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod extract;
pub mod filling;
pub mod filter;
pub mod format;
pub mod model;
pub mod resolve;
pub mod series;
pub mod utils;

pub use assemble::{DataMap, ElementDirective, TooltipContent, assemble_directives};
pub use calc::calculate_value;
pub use config::{
    GroupedRules, RuleGroup, grouped_rules_to_yaml, load_rules_lenient,
    parse_yaml_to_grouped_rules,
};
pub use error::{Error, Result};
pub use evaluate::{ColorDataEntry, EvalContext, evaluate_metric, evaluate_rule};
pub use extract::{DataFrame, Field, FieldConfig, FieldType, extract_series};
pub use filling::{Filling, FillMode};
pub use filter::filter_data;
pub use format::format_value;
pub use model::{
    Attributes, Calculation, Change, IdSpec, LabelMapping, Metric, Operator, Query, QuerySource,
    Threshold, TooltipConfig,
};
pub use resolve::{ElementUniverse, ResolvedRule, ResolverCache, Schema, resolve_rules};
pub use series::{SeriesGroup, SeriesValueMap, SeriesValues};

#[cfg(test)]
mod tests;
