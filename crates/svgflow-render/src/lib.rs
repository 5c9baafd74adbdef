#![forbid(unsafe_code)]

//! SVG side of svgflow: an owned document model and the idempotent directive applier.

pub mod apply;
pub mod dom;
pub mod error;
pub mod snapshot;
pub mod style;

pub use apply::{ApplyStats, LINK_MARKER, SvgCanvas};
pub use dom::{Element, NodeId, NodeKind, SvgDocument};
pub use error::{Error, Result};
pub use snapshot::SnapshotRegistry;
