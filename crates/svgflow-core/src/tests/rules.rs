use crate::*;

const FULL: &str = r#"
changes:
  - id: 'tank:stroke:r1|l1'
    attributes:
      autoConfig: true
      link: 'https://example.com/tank?id=1'
      label: replace
      labelColor: metric
      tooltip: { show: true, textAbove: 'Level', textBelow: 'm3' }
      labelMapping:
        - { condition: '<', value: 5, label: 'low' }
        - { condition: '=', value: 0, label: 'empty' }
      metrics:
        - queries:
            - { refid: A, calculation: delta, filter: '-B,$date1', sum: 'all', unit: percent, title: Tank }
            - { legend: 'level.*', calculation: max }
          baseColor: '#00ff00'
          decimal: 1
          filling: 'fill, 30'
          thresholds:
            - { color: orange, value: 10, operator: '>=', lvl: 1 }
            - { color: red, value: 20, condition: 'timezone=3,hour >= 9 && hour < 18' }
"#;

#[test]
fn full_rule_document_round_trips() {
    let rules = parse_yaml_to_grouped_rules(FULL).unwrap();
    let rule = &rules.groups[0].rules[0];
    let attrs = &rule.attributes;
    assert!(attrs.auto_config);
    assert_eq!(attrs.label_mapping[1].condition, Operator::Eq);
    assert_eq!(attrs.tooltip.as_ref().and_then(|t| t.text_below.as_deref()), Some("m3"));

    let metric = &attrs.metrics[0];
    assert_eq!(metric.queries[0].calculation, Calculation::Delta);
    assert_eq!(metric.queries[0].sum.as_deref(), Some("all"));
    assert_eq!(metric.decimal, Some(1));
    assert_eq!(metric.thresholds[1].operator, None);

    let yaml = grouped_rules_to_yaml(&rules).unwrap();
    assert!(yaml.contains("autoConfig: true"));
    assert!(yaml.contains("refid: A"));
    assert_eq!(parse_yaml_to_grouped_rules(&yaml).unwrap(), rules);
}

#[test]
fn normalized_yaml_has_no_legacy_fields() {
    let rules = load_rules_lenient(
        r#"
changes:
  - id: x
    attributes:
      metrics:
        - refIds: [A]
          legends: [cpu]
"#,
    );
    let yaml = grouped_rules_to_yaml(&rules.normalized()).unwrap();
    assert!(!yaml.contains("refIds"));
    assert!(!yaml.contains("legends"));
    assert!(yaml.contains("legend: cpu"));
}
