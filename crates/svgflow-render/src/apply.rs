//! Idempotent application of element directives to an owned SVG document.
//!
//! Every pass first restores all snapshotted nodes and then paints from scratch, so applying the
//! same directives twice yields the same document as applying them once.

use crate::dom::{NodeId, SvgDocument};
use crate::snapshot::{LABEL_ATTRS, SnapshotRegistry};
use crate::{Result, style};
use rustc_hash::FxHashSet;
use svgflow_core::{ElementDirective, FillMode, Filling};

/// Attribute marking link wrappers created by the applier.
pub const LINK_MARKER: &str = "data-svgflow-link";

const BASIC_SHAPES: [&str; 7] = [
    "rect", "circle", "ellipse", "line", "polyline", "polygon", "path",
];
const TEXT_ELEMENTS: [&str; 3] = ["text", "tspan", "textPath"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelFlavor {
    Svg,
    Html,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub painted: usize,
    pub labeled: usize,
    pub linked: usize,
    pub missing: usize,
}

/// Name for a new element that lives next to `near`, reusing its namespace prefix.
fn sibling_name(doc: &SvgDocument, near: NodeId, local: &str) -> String {
    match doc.element(near).and_then(|el| el.name.split_once(':')) {
        Some((prefix, _)) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

fn opacity_value(percent: u8) -> String {
    format!("{}", f64::from(percent) / 100.0)
}

#[derive(Debug, Clone)]
pub struct SvgCanvas {
    doc: SvgDocument,
    snapshots: SnapshotRegistry,
}

impl SvgCanvas {
    pub fn new(doc: SvgDocument) -> Self {
        Self {
            doc,
            snapshots: SnapshotRegistry::default(),
        }
    }

    pub fn parse(svg: &str) -> Result<Self> {
        Ok(Self::new(SvgDocument::parse(svg)?))
    }

    pub fn document(&self) -> &SvgDocument {
        &self.doc
    }

    pub fn element_ids(&self) -> Vec<String> {
        self.doc.element_ids()
    }

    pub fn to_svg_string(&self) -> String {
        self.doc.to_svg_string()
    }

    /// Makes the root scale to its container.
    pub fn set_viewport(&mut self, preserve_aspect_ratio: &str) {
        let root = self.doc.root();
        if let Some(el) = self.doc.element_mut(root) {
            el.set_attr("preserveAspectRatio", preserve_aspect_ratio);
            el.set_attr("width", "100%");
            el.set_attr("height", "100%");
        }
    }

    pub fn apply(&mut self, directives: &[ElementDirective]) -> ApplyStats {
        self.snapshots.restore_all(&mut self.doc);
        let mut stats = ApplyStats::default();
        let mut live_wrappers: FxHashSet<NodeId> = FxHashSet::default();

        for directive in directives {
            let Some(node) = self.doc.element_by_id(&directive.id) else {
                tracing::debug!(id = %directive.id, "element not found in SVG");
                stats.missing += 1;
                continue;
            };

            if let Some(color) = directive.color.as_deref() {
                if directive.painted
                    && directive.filling.mode != FillMode::None
                    && self.paint(node, color, directive.filling)
                {
                    stats.painted += 1;
                }
            }

            let lines = directive.label.as_deref().filter(|lines| !lines.is_empty());
            if lines.is_some() || directive.label_color.is_some() {
                if self.label(node, lines, directive.label_color.as_deref()) {
                    stats.labeled += 1;
                } else {
                    tracing::debug!(id = %directive.id, "no text node to label");
                }
            }

            if let Some(href) = directive.link.as_deref() {
                match self.link(node, href) {
                    Some(wrapper) => {
                        live_wrappers.insert(wrapper);
                        stats.linked += 1;
                    }
                    None => tracing::warn!(id = %directive.id, "cannot wrap element in a link"),
                }
            }
        }

        for wrapper in self.marked_wrappers() {
            if !live_wrappers.contains(&wrapper) && self.doc.unwrap(wrapper) {
                self.doc.release(wrapper);
            }
        }
        stats
    }

    fn declares_paint(&self, node: NodeId) -> bool {
        let Some(el) = self.doc.element(node) else {
            return false;
        };
        let inline = el.attr("style").unwrap_or_default();
        el.attr("fill").is_some()
            || el.attr("stroke").is_some()
            || style::has(inline, "fill")
            || style::has(inline, "stroke")
    }

    fn contains_text(&self, node: NodeId) -> bool {
        self.doc
            .descendants(node)
            .into_iter()
            .skip(1)
            .filter_map(|n| self.doc.local_name(n))
            .any(|name| TEXT_ELEMENTS.contains(&name) || name == "foreignObject")
    }

    /// The target and its descendants that carry paint, text subtrees excluded.
    fn paint_targets(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            let Some(name) = self.doc.local_name(n) else {
                continue;
            };
            if TEXT_ELEMENTS.contains(&name) || name == "foreignObject" {
                continue;
            }
            let text_group = name == "g" && self.contains_text(n);
            if !text_group && self.declares_paint(n) {
                out.push(n);
            }
            stack.extend(self.doc.children(n).iter().rev().copied());
        }
        if out.is_empty()
            && self
                .doc
                .local_name(node)
                .is_some_and(|name| BASIC_SHAPES.contains(&name))
        {
            out.push(node);
        }
        out
    }

    fn paint(&mut self, node: NodeId, color: &str, filling: Filling) -> bool {
        let targets = self.paint_targets(node);
        for target in &targets {
            self.snapshots.capture_paint(&self.doc, *target);
            let Some(el) = self.doc.element_mut(*target) else {
                continue;
            };
            let mut inline = el.attr("style").map(str::to_string);
            let current_stroke = inline
                .as_deref()
                .and_then(|s| style::get(s, "stroke"))
                .or_else(|| el.attr("stroke"))
                .map(str::to_string);

            let (fill, stroke) = match filling.mode {
                FillMode::Default => (true, current_stroke.as_deref() != Some("none")),
                FillMode::Fill => (true, false),
                FillMode::Stroke => (false, true),
                FillMode::FillStroke => (true, true),
                FillMode::None => (false, false),
            };

            for (property, enabled) in [("fill", fill), ("stroke", stroke)] {
                if !enabled {
                    continue;
                }
                el.set_attr(property, color);
                if let Some(s) = inline.as_mut().filter(|s| style::has(s, property)) {
                    *s = style::set(s, property, color);
                }
            }
            if let Some(s) = inline {
                el.set_attr("style", s);
            }
            if let Some(opacity) = filling.opacity {
                el.set_attr(filling.opacity_attribute(), opacity_value(opacity));
            }
        }
        !targets.is_empty()
    }

    /// First text-bearing node under `node`: an SVG `text`/`tspan` or the HTML inside a
    /// `foreignObject`.
    fn label_node(&self, node: NodeId) -> Option<(NodeId, LabelFlavor)> {
        for n in self.doc.descendants(node) {
            if !self.doc.is_source(n) {
                continue;
            }
            match self.doc.local_name(n) {
                Some("text" | "tspan") => return Some((n, LabelFlavor::Svg)),
                Some("foreignObject") => {
                    return self.html_text_node(n).map(|h| (h, LabelFlavor::Html));
                }
                _ => {}
            }
        }
        None
    }

    fn html_text_node(&self, foreign: NodeId) -> Option<NodeId> {
        let elements: Vec<NodeId> = self
            .doc
            .descendants(foreign)
            .into_iter()
            .skip(1)
            .filter(|n| self.doc.is_source(*n) && self.doc.element(*n).is_some())
            .collect();
        let has_own_text = |n: NodeId| {
            self.doc.children(n).iter().any(|c| {
                self.doc.element(*c).is_none() && !self.doc.text_content(*c).trim().is_empty()
            })
        };
        let is_leaf = |n: NodeId| {
            self.doc
                .children(n)
                .iter()
                .all(|c| self.doc.element(*c).is_none())
        };
        elements
            .iter()
            .copied()
            .find(|n| has_own_text(*n))
            .or_else(|| elements.iter().copied().find(|n| is_leaf(*n)))
    }

    fn label(&mut self, node: NodeId, lines: Option<&[String]>, color: Option<&str>) -> bool {
        let Some((target, flavor)) = self.label_node(node) else {
            return false;
        };
        self.snapshots.capture_label(&self.doc, target);

        if let Some(lines) = lines {
            let children = match flavor {
                LabelFlavor::Svg if lines.len() > 1 => {
                    let x = self.doc.attr(target, "x").unwrap_or("0").to_string();
                    let name = sibling_name(&self.doc, target, "tspan");
                    lines
                        .iter()
                        .enumerate()
                        .map(|(i, line)| {
                            let dy = if i == 0 { "0" } else { "1.2em" };
                            let row = self.doc.create_element(&name, &[("x", x.as_str()), ("dy", dy)]);
                            let text = self.doc.create_text(line);
                            self.doc.append_child(row, text);
                            row
                        })
                        .collect()
                }
                LabelFlavor::Svg => vec![self.doc.create_text(&lines.concat())],
                LabelFlavor::Html => {
                    let br = sibling_name(&self.doc, target, "br");
                    let mut out = Vec::new();
                    for (i, line) in lines.iter().enumerate() {
                        if i > 0 {
                            out.push(self.doc.create_element(&br, &[]));
                        }
                        out.push(self.doc.create_text(line));
                    }
                    out
                }
            };
            let previous = self.doc.children(target).to_vec();
            self.doc.replace_children(target, children);
            for child in previous {
                self.doc.release(child);
            }

            let kept: Vec<(&str, Option<String>)> = LABEL_ATTRS
                .iter()
                .map(|name| (*name, self.snapshots.label_attr(target, name).map(str::to_string)))
                .collect();
            if let Some(el) = self.doc.element_mut(target) {
                for (name, value) in &kept {
                    el.put_attr(name, value.as_deref());
                }
            }
        }

        if let Some(color) = color {
            if let Some(el) = self.doc.element_mut(target) {
                let inline = el.attr("style").unwrap_or_default().to_string();
                match flavor {
                    LabelFlavor::Svg => {
                        el.set_attr("fill", color);
                        if style::has(&inline, "fill") {
                            el.set_attr("style", style::set(&inline, "fill", color));
                        }
                    }
                    LabelFlavor::Html => el.set_attr("style", style::set(&inline, "color", color)),
                }
            }
        }
        true
    }

    fn wrapper_of(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.doc.parent(node)?;
        let el = self.doc.element(parent)?;
        (el.local_name() == "a" && el.attr(LINK_MARKER) == Some("true")).then_some(parent)
    }

    fn link(&mut self, node: NodeId, href: &str) -> Option<NodeId> {
        if let Some(wrapper) = self.wrapper_of(node) {
            if let Some(el) = self.doc.element_mut(wrapper) {
                el.set_attr("href", href);
            }
            return Some(wrapper);
        }
        if node == self.doc.root() {
            return None;
        }
        let name = sibling_name(&self.doc, node, "a");
        let wrapper = self.doc.create_element(
            &name,
            &[
                ("href", href),
                ("target", "_blank"),
                ("rel", "noopener noreferrer"),
                (LINK_MARKER, "true"),
            ],
        );
        self.doc.wrap(node, wrapper).then_some(wrapper)
    }

    fn marked_wrappers(&self) -> Vec<NodeId> {
        self.doc
            .descendants(self.doc.root())
            .into_iter()
            .filter(|n| {
                self.doc
                    .element(*n)
                    .is_some_and(|el| el.local_name() == "a" && el.attr(LINK_MARKER) == Some("true"))
            })
            .collect()
    }
}
