//! Value extraction: host query-result frames into a [`SeriesValueMap`].

use crate::series::SeriesValueMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Time,
    String,
    Boolean,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldConfig {
    #[serde(rename = "displayNameFromDS", skip_serializing_if = "Option::is_none")]
    pub display_name_from_ds: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub values: Vec<Value>,
    pub config: FieldConfig,
}

impl Field {
    pub fn display_name(&self) -> Option<&str> {
        self.config
            .display_name_from_ds
            .as_deref()
            .or(self.config.display_name.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// One query-result frame as handed over by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub fields: Vec<Field>,
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).map(|_| n.to_string()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|_| s.trim().to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

/// Builds the series map: first numeric field per frame, grouped by ref id.
///
/// Frames without a ref id or without a numeric field are skipped. Samples that are null or not
/// numeric are dropped together with their timestamp. Frames that share a ref id and display
/// name append to the same series.
pub fn extract_series(frames: &[DataFrame]) -> SeriesValueMap {
    let mut out = SeriesValueMap::new();

    for frame in frames {
        let Some(ref_id) = frame.ref_id.as_deref().filter(|r| !r.is_empty()) else {
            tracing::debug!(frame = ?frame.name, "skipping frame without ref id");
            continue;
        };
        let Some(field) = frame
            .fields
            .iter()
            .find(|f| f.field_type == FieldType::Number)
        else {
            tracing::debug!(ref_id, "skipping frame without numeric field");
            continue;
        };
        let time = frame
            .fields
            .iter()
            .find(|f| f.field_type == FieldType::Time);

        let display_name = field.display_name().unwrap_or(ref_id);
        let samples = field.values.iter().enumerate().filter_map(|(idx, raw)| {
            let value = scalar_to_string(raw)?;
            let ts = time
                .and_then(|t| t.values.get(idx))
                .and_then(Value::as_f64)
                .unwrap_or(idx as f64);
            Some((value, ts))
        });
        out.append(ref_id, display_name, samples);
    }

    out
}
