use indexmap::IndexMap;
use serde::Serialize;

/// Raw samples of one display name, index-aligned with their timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesValues {
    pub values: Vec<String>,
    pub timestamps: Vec<f64>,
}

impl SeriesValues {
    /// Samples that parse as finite numbers, in order.
    pub fn numeric(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter_map(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// All display names reported under one ref id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesGroup {
    pub values: IndexMap<String, SeriesValues>,
}

impl SeriesGroup {
    pub fn first(&self) -> Option<(&str, &SeriesValues)> {
        self.values.first().map(|(k, v)| (k.as_str(), v))
    }
}

/// Ref id → display name → samples. Built once per data refresh, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesValueMap(IndexMap<String, SeriesGroup>);

impl SeriesValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ref_id: &str) -> Option<&SeriesGroup> {
        self.0.get(ref_id)
    }

    pub fn get_key_value(&self, ref_id: &str) -> Option<(&str, &SeriesGroup)> {
        self.0.get_key_value(ref_id).map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn ref_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every `(ref id, display name, samples)` triple in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &SeriesValues)> {
        self.0.iter().flat_map(|(ref_id, group)| {
            group
                .values
                .iter()
                .map(move |(name, series)| (ref_id.as_str(), name.as_str(), series))
        })
    }

    /// Appends samples under `ref_id` / `display_name`, creating both levels as needed.
    pub fn append(
        &mut self,
        ref_id: &str,
        display_name: &str,
        values: impl IntoIterator<Item = (String, f64)>,
    ) {
        let series = self
            .0
            .entry(ref_id.to_string())
            .or_default()
            .values
            .entry(display_name.to_string())
            .or_default();
        for (value, ts) in values {
            series.values.push(value);
            series.timestamps.push(ts);
        }
    }
}
