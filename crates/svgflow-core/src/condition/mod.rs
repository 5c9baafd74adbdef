//! Scripted threshold conditions.
//!
//! A condition such as `timezone=3,hour >= 9 && hour < 18 && $A.cpu:max > 80` is evaluated in
//! three steps:
//! 1. the `timezone=N` directive is stripped and sets the offset used for `hour` / `minute`
//! 2. `$<refid>[.<subkey>][:<calculation>]` tokens are replaced by fixed 2-decimal literals
//! 3. the remaining text is parsed and evaluated by a small expression evaluator
//!
//! Nothing is ever executed as code. Any failure evaluates to `false`.

mod lexer;
mod parse;

use crate::calc::calculate_value;
use crate::evaluate::EvalContext;
use crate::model::Calculation;
use crate::series::SeriesValueMap;
use chrono::{Datelike, Duration, Timelike};
use regex::Regex;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("empty condition")]
    Empty,
    #[error("unexpected character `{0}` at byte {1}")]
    UnexpectedChar(char, usize),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    #[error("unexpected token {0}")]
    UnexpectedToken(String),
    #[error("unexpected end of condition")]
    UnexpectedEnd,
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),
    #[error("unresolved metric reference `{0}`")]
    UnresolvedMetric(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("nesting deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("condition longer than {0} tokens")]
    TooLong(usize),
    #[error("timezone offset out of range")]
    TimezoneOutOfRange,
}

fn timezone_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)timezone\s*=\s*([+-]?\d+(?:\.\d+)?)\s*,?").expect("valid regex")
    })
}

fn metric_token_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$([A-Za-z0-9_]+)(?:\.([A-Za-z0-9_]+))?(?::([A-Za-z]+))?")
            .expect("valid regex")
    })
}

/// Value of `$<ref_id>[.<subkey>][:<calculation>]`; the first sub-entry when `subkey` is absent.
pub fn resolve_metric_reference(
    values: &SeriesValueMap,
    ref_id: &str,
    subkey: Option<&str>,
    calculation: Calculation,
) -> Option<f64> {
    let group = values.get(ref_id)?;
    let series = match subkey {
        Some(key) => group.values.get(key)?,
        None => group.first()?.1,
    };
    Some(calculate_value(&series.numeric(), calculation))
}

/// Splits off the `timezone=N` directive, returning the offset in minutes (default `0`).
fn strip_timezone(condition: &str) -> (String, i64) {
    let Some(caps) = timezone_regex().captures(condition) else {
        return (condition.to_string(), 0);
    };
    let hours = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);
    let stripped = timezone_regex().replace(condition, "").to_string();
    (stripped, (hours * 60.0).round() as i64)
}

fn substitute_metrics(condition: &str, values: &SeriesValueMap) -> Result<String, ConditionError> {
    let mut unresolved: Option<String> = None;
    let out = metric_token_regex().replace_all(condition, |caps: &regex::Captures<'_>| {
        let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let ref_id = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let subkey = caps.get(2).map(|m| m.as_str());
        let calculation = match caps.get(3) {
            None => Some(Calculation::Last),
            Some(m) => Calculation::parse(m.as_str()),
        };
        match calculation.and_then(|c| resolve_metric_reference(values, ref_id, subkey, c)) {
            Some(v) => format!("{v:.2}"),
            None => {
                unresolved.get_or_insert_with(|| whole.to_string());
                "0".to_string()
            }
        }
    });
    match unresolved {
        Some(token) => Err(ConditionError::UnresolvedMetric(token)),
        None => Ok(out.into_owned()),
    }
}

pub fn try_evaluate_condition(condition: &str, ctx: &EvalContext<'_>) -> Result<bool, ConditionError> {
    let (without_tz, offset_minutes) = strip_timezone(condition);
    let source = substitute_metrics(&without_tz, ctx.values)?;

    let local = Duration::try_minutes(offset_minutes)
        .and_then(|offset| ctx.now.checked_add_signed(offset))
        .ok_or(ConditionError::TimezoneOutOfRange)?;
    let hour = f64::from(local.hour());
    let minute = f64::from(local.minute());
    let day = f64::from(ctx.now.weekday().num_days_from_sunday());
    let lookup = |name: &str| match name {
        "hour" => Some(hour),
        "minute" => Some(minute),
        "day" => Some(day),
        _ => None,
    };

    let toks = lexer::Lexer::new(&source).tokenize()?;
    let expr = parse::Parser::new(toks).parse()?;
    Ok(parse::eval(&expr, &lookup)?.truthy())
}

/// Evaluates a condition, treating every failure as "not met".
pub fn evaluate_condition(condition: &str, ctx: &EvalContext<'_>) -> bool {
    match try_evaluate_condition(condition, ctx) {
        Ok(v) => v,
        Err(err) => {
            tracing::debug!(condition, error = %err, "condition evaluated as false");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn values() -> SeriesValueMap {
        let mut map = SeriesValueMap::new();
        map.append(
            "A",
            "cpu",
            [("10".to_string(), 1.0), ("30".to_string(), 2.0)],
        );
        map.append("A", "mem", [("55.556".to_string(), 1.0)]);
        map
    }

    fn ctx(values: &SeriesValueMap) -> EvalContext<'_> {
        // Wednesday 2024-03-13 06:30 UTC.
        EvalContext::new(values, Utc.with_ymd_and_hms(2024, 3, 13, 6, 30, 0).unwrap())
    }

    #[test]
    fn timezone_shifts_hour_but_not_day() {
        let v = values();
        let c = ctx(&v);
        assert!(evaluate_condition("hour == 6 && minute == 30", &c));
        assert!(evaluate_condition("timezone=3,hour >= 9 && hour < 18", &c));
        assert!(!evaluate_condition("hour >= 9 && hour < 18", &c));
        assert!(evaluate_condition("timezone=-7, hour == 23 && day == 3", &c));
        assert!(evaluate_condition("timezone=5.5,hour == 12 && minute == 0", &c));
    }

    #[test]
    fn substitutes_metric_references() {
        let v = values();
        let c = ctx(&v);
        assert!(evaluate_condition("$A > 29", &c));
        assert!(evaluate_condition("$A:max == 30 && $A:min == 10", &c));
        assert!(evaluate_condition("$A.mem == 55.56", &c));
        assert!(evaluate_condition("$A:total - $A.cpu:delta === 20", &c));
    }

    #[test]
    fn failures_are_false() {
        let v = values();
        let c = ctx(&v);
        assert_eq!(
            try_evaluate_condition("$B > 1", &c),
            Err(ConditionError::UnresolvedMetric("$B".to_string()))
        );
        assert!(!evaluate_condition("$A.disk > 1", &c));
        assert!(!evaluate_condition("$A:median > 1", &c));
        assert!(!evaluate_condition("hour >", &c));
        assert!(!evaluate_condition("process.exit(1)", &c));
        assert!(!evaluate_condition("", &c));
    }

    #[test]
    fn extreme_timezone_is_false() {
        let v = values();
        let c = ctx(&v);
        assert_eq!(
            try_evaluate_condition("timezone=99999999999999999999,hour > 1", &c),
            Err(ConditionError::TimezoneOutOfRange)
        );
        assert!(!evaluate_condition("timezone=-99999999999999999999,hour > 1", &c));
    }
}
