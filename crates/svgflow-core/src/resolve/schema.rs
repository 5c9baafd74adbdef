use crate::model::{Attributes, Metric};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Attribute presets selected by the `:schema` part of an id token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schema {
    Basic,
    Stroke,
    StrokeBase,
    Text,
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown schema `{0}`")]
pub struct UnknownSchema(pub String);

impl FromStr for Schema {
    type Err = UnknownSchema;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "stroke" => Ok(Self::Stroke),
            "strokebase" => Ok(Self::StrokeBase),
            "text" => Ok(Self::Text),
            "table" => Ok(Self::Table),
            _ => Err(UnknownSchema(s.to_string())),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Basic => "basic",
            Self::Stroke => "stroke",
            Self::StrokeBase => "strokeBase",
            Self::Text => "text",
            Self::Table => "table",
        })
    }
}

/// Swaps the kind of a filling string while keeping its `, <opacity>` suffix.
fn with_filling_kind(current: Option<&str>, kind: &str) -> String {
    match current.and_then(|f| f.split_once(',')) {
        Some((_, opacity)) => format!("{kind},{opacity}"),
        None => kind.to_string(),
    }
}

impl Schema {
    fn filling_kind(self) -> &'static str {
        match self {
            Self::Basic | Self::Table => "fill",
            Self::Stroke | Self::StrokeBase => "stroke",
            Self::Text => "none",
        }
    }

    fn metric_is_shaped(self, metric: &Metric) -> bool {
        let filling = with_filling_kind(metric.filling.as_deref(), self.filling_kind());
        metric.filling.as_deref() == Some(filling.as_str())
            && (self != Self::Stroke || metric.base_color.is_none())
    }

    /// `true` when applying this schema would leave `attrs` unchanged.
    fn is_shaped(self, attrs: &Attributes) -> bool {
        let label = attrs.label.as_deref();
        let top = match self {
            Self::Basic => label.is_none() && attrs.tooltip.is_none(),
            Self::Stroke | Self::StrokeBase => label.is_none(),
            Self::Text => {
                label == Some("replace")
                    && attrs.label_color.as_deref() == Some("metric")
                    && attrs.tooltip.is_none()
            }
            Self::Table => label == Some("replace") && attrs.label_color.is_none(),
        };
        top && attrs.metrics.iter().all(|m| self.metric_is_shaped(m))
    }

    fn shape(self, attrs: &mut Attributes) {
        match self {
            Self::Basic => {
                attrs.label = None;
                attrs.tooltip = None;
            }
            Self::Stroke | Self::StrokeBase => {
                attrs.label = None;
            }
            Self::Text => {
                attrs.label = Some("replace".to_string());
                attrs.label_color = Some("metric".to_string());
                attrs.tooltip = None;
            }
            Self::Table => {
                attrs.label = Some("replace".to_string());
                attrs.label_color = None;
            }
        }
        for metric in &mut attrs.metrics {
            metric.filling = Some(with_filling_kind(
                metric.filling.as_deref(),
                self.filling_kind(),
            ));
            if self == Self::Stroke {
                metric.base_color = None;
            }
        }
    }

    /// Returns `attrs` shaped by this schema; borrowed when nothing changes.
    pub fn apply(self, attrs: &Attributes) -> Cow<'_, Attributes> {
        if self.is_shaped(attrs) {
            return Cow::Borrowed(attrs);
        }
        let mut out = attrs.clone();
        self.shape(&mut out);
        Cow::Owned(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TooltipConfig;

    fn attrs() -> Attributes {
        Attributes {
            metrics: vec![Metric {
                base_color: Some("green".to_string()),
                filling: Some("fs, 40".to_string()),
                ..Metric::default()
            }],
            label: Some("Pump".to_string()),
            label_color: Some("white".to_string()),
            tooltip: Some(TooltipConfig {
                show: true,
                ..TooltipConfig::default()
            }),
            ..Attributes::default()
        }
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("strokeBase".parse::<Schema>(), Ok(Schema::StrokeBase));
        assert_eq!("TEXT".parse::<Schema>(), Ok(Schema::Text));
        assert!("sparkle".parse::<Schema>().is_err());
        assert_eq!(Schema::StrokeBase.to_string(), "strokeBase");
    }

    #[test]
    fn presets_shape_attributes() {
        let original = attrs();

        let stroke = Schema::Stroke.apply(&original);
        assert_eq!(stroke.label, None);
        assert_eq!(stroke.metrics[0].base_color, None);
        assert_eq!(stroke.metrics[0].filling.as_deref(), Some("stroke, 40"));

        let base = Schema::StrokeBase.apply(&original);
        assert_eq!(base.metrics[0].base_color.as_deref(), Some("green"));

        let text = Schema::Text.apply(&original);
        assert_eq!(text.label.as_deref(), Some("replace"));
        assert_eq!(text.label_color.as_deref(), Some("metric"));
        assert_eq!(text.tooltip, None);
        assert_eq!(text.metrics[0].filling.as_deref(), Some("none, 40"));

        let table = Schema::Table.apply(&original);
        assert_eq!(table.label_color, None);
        assert!(table.shows_tooltip());

        let basic = Schema::Basic.apply(&original);
        assert_eq!((basic.label.as_ref(), basic.tooltip.as_ref()), (None, None));

        assert_eq!(original, attrs());
    }

    #[test]
    fn applying_twice_is_a_no_op() {
        let original = attrs();
        for schema in [
            Schema::Basic,
            Schema::Stroke,
            Schema::StrokeBase,
            Schema::Text,
            Schema::Table,
        ] {
            let once = schema.apply(&original).into_owned();
            assert!(matches!(schema.apply(&once), Cow::Borrowed(_)), "{schema}");
            let mut shaped = original.clone();
            schema.shape(&mut shaped);
            assert_eq!(once, shaped, "{schema}");
        }
        assert!(matches!(Schema::Basic.apply(&original), Cow::Owned(_)));
    }

    #[test]
    fn metrics_without_filling_are_reshaped() {
        let attrs = Attributes {
            metrics: vec![Metric::default()],
            ..Attributes::default()
        };
        let shaped = Schema::Basic.apply(&attrs);
        assert!(matches!(shaped, Cow::Owned(_)));
        assert_eq!(shaped.metrics[0].filling.as_deref(), Some("fill"));
        assert!(matches!(Schema::Basic.apply(&shaped), Cow::Borrowed(_)));
    }
}
