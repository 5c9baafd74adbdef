use crate::*;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

fn frames() -> Vec<DataFrame> {
    serde_json::from_value(json!([
        { "refId": "A", "fields": [
            { "name": "Time", "type": "time", "values": [1000, 2000, 3000] },
            { "name": "Value", "type": "number", "values": [40, null, 95],
              "config": { "displayNameFromDS": "pump-1" } }
        ]},
        { "refId": "A", "fields": [
            { "name": "Value", "type": "number", "values": [12, 14],
              "config": { "displayNameFromDS": "pump-2" } }
        ]},
        { "refId": "B", "fields": [
            { "name": "Value", "type": "number", "values": ["1536"] }
        ]}
    ]))
    .unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 10, 15, 0).unwrap()
}

const RULES: &str = r#"
changes:
  - id: 'pump-\d'
    attributes:
      autoConfig: true
      label: replace
      labelMapping:
        - { condition: '>=', value: 90, label: 'HIGH' }
      tooltip: { show: true }
      metrics:
        - queries:
            - { legend: 'pump-.*' }
          baseColor: green
          thresholds:
            - { color: orange, value: 50 }
            - { color: red, value: 90, condition: 'timezone=2,hour >= 12' }
  - group: Storage
    changes:
      - id: ['disk:text', 'pump-1']
        attributes:
          metrics:
            - refIds: ['B']
              unit: bytes
              thresholds:
                - { color: purple, value: 1000, lvl: 5 }
"#;

fn run(rules: &GroupedRules) -> Vec<ElementDirective> {
    let values = extract_series(&frames());
    let ctx = EvalContext::new(&values, now());
    let universe = ElementUniverse::new(["pump-1", "pump-2", "disk", "legend"]);
    let mut cache = ResolverCache::new();
    let resolved = resolve_rules(&rules.flatten(), &universe, &mut cache);
    let map = DataMap::build(&resolved, &ctx);
    assemble_directives(&map)
}

#[test]
fn rules_yaml_to_directives() {
    let rules = parse_yaml_to_grouped_rules(RULES).unwrap();
    let directives = run(&rules);
    let ids: Vec<_> = directives.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["pump-1", "pump-2", "disk"]);

    // 95 at 12:15 local clears the gated red threshold; the bytes rule wins on level.
    let pump1 = &directives[0];
    assert_eq!(pump1.color.as_deref(), Some("purple"));
    assert_eq!(pump1.label, Some(vec!["HIGH".to_string()]));
    assert_eq!(pump1.tooltips.len(), 1);
    assert_eq!(pump1.tooltips[0].color.as_deref(), Some("red"));
    assert_eq!(pump1.tooltips[0].metric, "95");

    let pump2 = &directives[1];
    assert_eq!(pump2.color.as_deref(), Some("green"));
    assert_eq!(pump2.label, Some(vec!["14".to_string()]));

    let disk = &directives[2];
    assert_eq!(disk.label, Some(vec!["1.5 KB".to_string()]));
    assert_eq!(disk.label_color.as_deref(), Some("purple"));
    assert_eq!(disk.filling.mode, FillMode::None);
    assert!(disk.tooltips.is_empty());
}

#[test]
fn malformed_rules_color_nothing() {
    let rules = load_rules_lenient("changes: [ {id: ");
    assert!(rules.is_empty());
    assert!(run(&rules).is_empty());
}
