//! Rule document parsing: YAML into (grouped) rules and back.

use crate::model::Change;
use crate::{Error, Result};
use serde::Serialize;

/// Rules sharing a group in the rule editor. Unnamed groups hold rules listed at the top level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleGroup {
    pub name: Option<String>,
    pub rules: Vec<Change>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedRules {
    pub groups: Vec<RuleGroup>,
}

impl GroupedRules {
    /// Rules in evaluation order: group order, then rule order inside each group.
    pub fn flatten(&self) -> Vec<Change> {
        self.groups
            .iter()
            .flat_map(|g| g.rules.iter().cloned())
            .collect()
    }

    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.rules.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }

    /// Copy with every metric's legacy `refIds` / `legends` rewritten into `queries`.
    pub fn normalized(&self) -> GroupedRules {
        let mut out = self.clone();
        for rule in out.groups.iter_mut().flat_map(|g| g.rules.iter_mut()) {
            for metric in rule.attributes.metrics.iter_mut() {
                if metric.has_legacy_fields() {
                    *metric = metric.normalized().into_owned();
                }
            }
        }
        out
    }
}

#[derive(Debug, Default, Serialize)]
struct RulesDocument {
    changes: Vec<ChangeItem>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ChangeItem {
    Group(GroupItem),
    Rule(Change),
}

#[derive(Debug, Serialize)]
struct GroupItem {
    group: String,
    changes: Vec<Change>,
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidRulesYaml {
        message: message.into(),
    }
}

/// One rule; a rule that does not deserialize is logged and skipped.
fn parse_rule(value: serde_yaml::Value, group: Option<&str>, index: usize) -> Option<Change> {
    match serde_yaml::from_value::<Change>(value) {
        Ok(rule) => Some(rule),
        Err(err) => {
            tracing::warn!(group, index, error = %err, "skipping invalid rule");
            None
        }
    }
}

fn group_name(item: &serde_yaml::Value) -> Option<&serde_yaml::Value> {
    item.as_mapping()?.get("group")
}

/// Parses a rule document. Document-level problems are errors; a single rule that fails to
/// deserialize is skipped with a warning so the rest of the document still applies.
pub fn parse_yaml_to_grouped_rules(yaml: &str) -> Result<GroupedRules> {
    if yaml.trim().is_empty() {
        return Ok(GroupedRules::default());
    }

    let doc: Option<serde_yaml::Value> =
        serde_yaml::from_str(yaml).map_err(|e| invalid(e.to_string()))?;
    let changes = match doc {
        None | Some(serde_yaml::Value::Null) => return Ok(GroupedRules::default()),
        Some(serde_yaml::Value::Mapping(mut map)) => map.remove("changes"),
        Some(_) => return Err(invalid("rule document must be a mapping")),
    };
    let items = match changes {
        None | Some(serde_yaml::Value::Null) => Vec::new(),
        Some(serde_yaml::Value::Sequence(items)) => items,
        Some(_) => return Err(invalid("`changes` must be a list")),
    };

    let mut groups: Vec<RuleGroup> = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        if let Some(name) = group_name(&item) {
            let Some(name) = name.as_str().map(str::to_string) else {
                tracing::warn!(index, "skipping group without a string name");
                continue;
            };
            let inner = match item.get("changes") {
                None | Some(serde_yaml::Value::Null) => Vec::new(),
                Some(serde_yaml::Value::Sequence(inner)) => inner.clone(),
                Some(_) => {
                    tracing::warn!(group = %name, "skipping group whose `changes` is not a list");
                    continue;
                }
            };
            let rules = inner
                .into_iter()
                .enumerate()
                .filter_map(|(i, value)| parse_rule(value, Some(&name), i))
                .collect();
            groups.push(RuleGroup {
                name: Some(name),
                rules,
            });
            continue;
        }

        let Some(rule) = parse_rule(item, None, index) else {
            continue;
        };
        match groups.last_mut() {
            Some(last) if last.name.is_none() => last.rules.push(rule),
            _ => groups.push(RuleGroup {
                name: None,
                rules: vec![rule],
            }),
        }
    }

    Ok(GroupedRules { groups })
}

pub fn grouped_rules_to_yaml(rules: &GroupedRules) -> Result<String> {
    let mut changes: Vec<ChangeItem> = Vec::new();
    for group in &rules.groups {
        match &group.name {
            Some(name) => changes.push(ChangeItem::Group(GroupItem {
                group: name.clone(),
                changes: group.rules.clone(),
            })),
            None => changes.extend(group.rules.iter().cloned().map(ChangeItem::Rule)),
        }
    }

    serde_yaml::to_string(&RulesDocument { changes }).map_err(|e| Error::SerializeRules {
        message: e.to_string(),
    })
}

/// Parses the rule document, treating a malformed document as "no rules".
pub fn load_rules_lenient(yaml: &str) -> GroupedRules {
    match parse_yaml_to_grouped_rules(yaml) {
        Ok(rules) => rules,
        Err(err) => {
            tracing::warn!(error = %err, "ignoring malformed rule configuration");
            GroupedRules::default()
        }
    }
}
