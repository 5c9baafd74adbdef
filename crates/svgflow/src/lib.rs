#![forbid(unsafe_code)]

//! `svgflow` recolors, labels and links the elements of an SVG diagram from live metric values.
//!
//! The engine is headless: the host hands a [`Panel`] the SVG source, a YAML rule document and
//! query-result frames, and gets back the mutated SVG string plus tooltip records.
//!
//! ```no_run
//! use svgflow::{Panel, PanelOptions};
//!
//! let panel = Panel::new(PanelOptions::default());
//! panel.set_svg(r#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="a"/></svg>"#)?;
//! panel.set_rules_yaml("changes: [{ id: a, attributes: { metrics: [{ queries: [{ refid: A }] }] } }]");
//! let out = panel.render_sync(&[]);
//! println!("{}", out.svg);
//! # Ok::<(), svgflow::Error>(())
//! ```

mod options;
mod panel;

pub use svgflow_core::*;

pub use options::{PanelOptions, TooltipOptions};
pub use panel::{FALLBACK_SVG, Panel, RenderOutcome, RenderOutput};

pub mod render {
    pub use svgflow_render::{
        ApplyStats, Element, LINK_MARKER, NodeId, NodeKind, SnapshotRegistry, SvgCanvas,
        SvgDocument,
    };
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Rules(#[from] svgflow_core::Error),
    #[error(transparent)]
    Svg(#[from] svgflow_render::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
