//! Pristine attribute state of nodes touched by the applier.
//!
//! Snapshots are taken the first time a node is touched and never refreshed, so restoring always
//! returns a node to how it looked in the source SVG.

use crate::dom::{NodeId, SvgDocument};
use rustc_hash::FxHashMap;

pub const PAINT_ATTRS: [&str; 5] = ["fill", "stroke", "opacity", "fill-opacity", "style"];
pub const LABEL_ATTRS: [&str; 5] = ["font-size", "fill", "stroke", "color", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSnapshot(Vec<(&'static str, Option<String>)>);

impl AttrSnapshot {
    fn capture(doc: &SvgDocument, node: NodeId, names: &[&'static str]) -> Self {
        Self(
            names
                .iter()
                .map(|name| (*name, doc.attr(node, name).map(str::to_string)))
                .collect(),
        )
    }

    fn restore(&self, doc: &mut SvgDocument, node: NodeId) {
        let Some(el) = doc.element_mut(node) else {
            return;
        };
        for (name, value) in &self.0 {
            el.put_attr(name, value.as_deref());
        }
    }
}

#[derive(Debug, Clone)]
struct LabelSnapshot {
    children: Vec<NodeId>,
    attrs: AttrSnapshot,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotRegistry {
    paint: FxHashMap<NodeId, AttrSnapshot>,
    labels: FxHashMap<NodeId, LabelSnapshot>,
}

impl SnapshotRegistry {
    pub fn capture_paint(&mut self, doc: &SvgDocument, node: NodeId) {
        if !doc.is_source(node) {
            return;
        }
        self.paint
            .entry(node)
            .or_insert_with(|| AttrSnapshot::capture(doc, node, &PAINT_ATTRS));
    }

    pub fn capture_label(&mut self, doc: &SvgDocument, node: NodeId) {
        if !doc.is_source(node) {
            return;
        }
        self.labels.entry(node).or_insert_with(|| LabelSnapshot {
            children: doc.children(node).to_vec(),
            attrs: AttrSnapshot::capture(doc, node, &LABEL_ATTRS),
        });
    }

    /// Attribute values captured for a label node, e.g. to reapply them after a rewrite.
    pub fn label_attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.labels
            .get(&node)?
            .attrs
            .0
            .iter()
            .find(|(k, _)| *k == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn restore_paint(&self, doc: &mut SvgDocument, node: NodeId) {
        if let Some(snapshot) = self.paint.get(&node) {
            snapshot.restore(doc, node);
        }
    }

    pub fn restore_label(&self, doc: &mut SvgDocument, node: NodeId) {
        if let Some(snapshot) = self.labels.get(&node) {
            let rewritten = doc.children(node).to_vec();
            doc.replace_children(node, snapshot.children.clone());
            for child in rewritten {
                doc.release(child);
            }
            snapshot.attrs.restore(doc, node);
        }
    }

    /// Puts every captured node back into its original state.
    pub fn restore_all(&self, doc: &mut SvgDocument) {
        for node in self.paint.keys() {
            self.restore_paint(doc, *node);
        }
        for node in self.labels.keys() {
            self.restore_label(doc, *node);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paint.is_empty() && self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paint.len() + self.labels.len()
    }
}
