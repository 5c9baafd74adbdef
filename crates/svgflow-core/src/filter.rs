//! Display-name filters: `"A|B,-C,$date1"`.
//!
//! Comma-separated groups, each a `|`-separated list of alternatives. A group passes when any of
//! its alternatives matches. Groups starting with `-` exclude and always win; without any
//! inclusion group everything that is not excluded passes.

use crate::utils::{anchored_regex, has_regex_meta};
use chrono::{Duration, NaiveDate};
use regex::Regex;

#[derive(Debug)]
enum Matcher {
    Exact(String),
    Pattern(Regex),
    Never,
}

impl Matcher {
    fn parse(raw: &str, today: NaiveDate) -> Self {
        if let Some(rest) = raw.strip_prefix("$date") {
            let days = if rest.is_empty() {
                Some(0)
            } else {
                rest.parse::<i64>().ok()
            };
            let date = days
                .and_then(Duration::try_days)
                .and_then(|d| today.checked_sub_signed(d));
            if let Some(date) = date {
                return Self::Exact(date.format("%Y-%m-%d").to_string());
            }
        }
        if has_regex_meta(raw) {
            return anchored_regex(raw).map_or(Self::Never, Self::Pattern);
        }
        Self::Exact(raw.to_string())
    }

    fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Exact(s) => s == name,
            Self::Pattern(re) => re.is_match(name),
            Self::Never => false,
        }
    }
}

#[derive(Debug, Default)]
struct FilterExpr {
    include: Vec<Vec<Matcher>>,
    exclude: Vec<Vec<Matcher>>,
}

impl FilterExpr {
    fn parse(expr: &str, today: NaiveDate) -> Self {
        let mut out = Self::default();
        for group in expr.split(',') {
            let group = group.trim();
            if group.is_empty() {
                continue;
            }
            let (negated, body) = match group.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, group),
            };
            let alternatives: Vec<Matcher> = body
                .split('|')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(|a| Matcher::parse(a, today))
                .collect();
            if alternatives.is_empty() {
                continue;
            }
            if negated {
                out.exclude.push(alternatives);
            } else {
                out.include.push(alternatives);
            }
        }
        out
    }

    fn accepts(&self, name: &str) -> bool {
        let group_matches = |g: &Vec<Matcher>| g.iter().any(|m| m.is_match(name));
        if self.exclude.iter().any(group_matches) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(group_matches)
    }
}

/// Keeps the items whose display name (as returned by `name`) passes `expr`.
pub fn filter_data<T>(
    items: Vec<T>,
    expr: &str,
    today: NaiveDate,
    name: impl Fn(&T) -> &str,
) -> Vec<T> {
    if expr.trim().is_empty() {
        return items;
    }
    let filter = FilterExpr::parse(expr, today);
    items.into_iter().filter(|i| filter.accepts(name(i))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn run(names: &[&'static str], expr: &str) -> Vec<&'static str> {
        filter_data(names.to_vec(), expr, today(), |s| s)
    }

    #[test]
    fn exclusion_wins_over_inclusion() {
        assert_eq!(run(&["A", "B", "C"], "A,-B"), vec!["A"]);
        assert_eq!(run(&["AB", "B", "C"], "A.*|B,-B"), vec!["AB"]);
    }

    #[test]
    fn only_exclusions_keep_everything_else() {
        assert_eq!(run(&["A", "B", "C"], "-B|C"), vec!["A"]);
    }

    #[test]
    fn alternatives_and_patterns() {
        assert_eq!(
            run(&["cpu1", "cpu2", "mem", "disk"], "cpu\\d|disk"),
            vec!["cpu1", "cpu2", "disk"]
        );
        assert_eq!(run(&["a", "b"], ""), vec!["a", "b"]);
    }

    #[test]
    fn relative_dates() {
        assert_eq!(
            run(&["2024-03-10", "2024-03-09", "2024-03-08"], "$date1"),
            vec!["2024-03-09"]
        );
        assert_eq!(
            run(&["2024-03-10", "2024-03-09"], "$date"),
            vec!["2024-03-10"]
        );
        assert_eq!(
            run(&["2024-03-10", "2024-03-09"], "-$date0"),
            vec!["2024-03-09"]
        );
    }

    #[test]
    fn out_of_range_date_matches_nothing() {
        assert!(run(&["2024-03-10", "0000-01-01"], "$date9223372036854775807").is_empty());
    }
}
