use serde::{Deserialize, Serialize};

/// Host-editable panel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PanelOptions {
    /// Written on the root `<svg>`, together with `width` / `height` of `100%`.
    pub preserve_aspect_ratio: String,
    pub tooltip: TooltipOptions,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            preserve_aspect_ratio: "xMidYMid meet".to_string(),
            tooltip: TooltipOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TooltipOptions {
    pub enabled: bool,
    /// Highest level first; entries of equal level keep their order.
    pub sort_by_level: bool,
}

impl Default for TooltipOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            sort_by_level: false,
        }
    }
}
