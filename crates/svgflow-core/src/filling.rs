//! The `filling` mini-grammar: `fill`, `stroke`, `fs`, `none`, optionally `", <opacity 0-100>"`.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    /// Paint fill, and stroke unless the element's stroke is explicitly `none`.
    #[default]
    Default,
    Fill,
    Stroke,
    FillStroke,
    /// Leave the element's pre-rule look untouched.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Filling {
    pub mode: FillMode,
    /// Opacity in percent, clamped to `0..=100`.
    pub opacity: Option<u8>,
}

impl Filling {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };

        let (kind, opacity) = match raw.split_once(',') {
            Some((kind, opacity)) => (kind.trim(), opacity.trim().parse::<f64>().ok()),
            None => (raw, None),
        };

        let mode = match kind.to_ascii_lowercase().as_str() {
            "fill" => FillMode::Fill,
            "stroke" => FillMode::Stroke,
            "fs" => FillMode::FillStroke,
            "none" => FillMode::None,
            other => {
                tracing::debug!(filling = other, "unknown filling, using default");
                FillMode::Default
            }
        };

        let opacity = opacity
            .filter(|o| o.is_finite())
            .map(|o| o.round().clamp(0.0, 100.0) as u8);
        Self { mode, opacity }
    }

    pub fn paints_fill(&self) -> bool {
        matches!(
            self.mode,
            FillMode::Default | FillMode::Fill | FillMode::FillStroke
        )
    }

    pub fn paints_stroke(&self) -> bool {
        matches!(
            self.mode,
            FillMode::Default | FillMode::Stroke | FillMode::FillStroke
        )
    }

    /// Attribute receiving the opacity: `fill-opacity` for fill-only modes, `opacity` otherwise.
    pub fn opacity_attribute(&self) -> &'static str {
        match self.mode {
            FillMode::Default | FillMode::Fill => "fill-opacity",
            _ => "opacity",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes_and_opacity() {
        assert_eq!(Filling::parse(None), Filling::default());
        assert_eq!(Filling::parse(Some("stroke")).mode, FillMode::Stroke);
        assert_eq!(Filling::parse(Some("FS")).mode, FillMode::FillStroke);
        assert_eq!(
            Filling::parse(Some("fill, 30")),
            Filling {
                mode: FillMode::Fill,
                opacity: Some(30)
            }
        );
        assert_eq!(Filling::parse(Some("stroke,250")).opacity, Some(100));
        assert_eq!(Filling::parse(Some("none")).mode, FillMode::None);
        assert_eq!(Filling::parse(Some("sparkle")).mode, FillMode::Default);
    }

    #[test]
    fn opacity_attribute_follows_mode() {
        assert_eq!(Filling::parse(Some("fill, 5")).opacity_attribute(), "fill-opacity");
        assert_eq!(Filling::parse(Some("fs, 5")).opacity_attribute(), "opacity");
        assert!(!Filling::parse(Some("stroke")).paints_fill());
    }
}
