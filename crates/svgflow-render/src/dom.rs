//! Owned, mutable SVG tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Detached nodes stay in the arena, so a
//! handle taken before a mutation never dangles and detached subtrees can be re-attached later.
//! Nodes parsed from the source are never recycled; created nodes return to a free list once
//! [`SvgDocument::release`] is called on them.

use crate::{Error, Result};
use rustc_hash::FxHashMap;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written in the source (`svg`, `xlink:href`-style prefixes kept).
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn local_name(&self) -> &str {
        self.name
            .rsplit_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attrs.iter().position(|(k, _)| k == name)?;
        Some(self.attrs.remove(idx).1)
    }

    /// Sets `name` to `value`, or removes it when `value` is `None`.
    pub fn put_attr(&mut self, name: &str, value: Option<&str>) {
        match value {
            Some(v) => self.set_attr(name, v),
            None => {
                self.remove_attr(name);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct SvgDocument {
    nodes: Vec<NodeData>,
    root: NodeId,
    ids: FxHashMap<String, NodeId>,
    /// Nodes below this index came from the parsed source.
    source_len: usize,
    free: Vec<NodeId>,
}

fn qualified_name(node: roxmltree::Node<'_, '_>, ns: Option<&str>, local: &str) -> String {
    let prefix = match ns {
        Some(XML_NS) => Some("xml"),
        Some(uri) => node.lookup_prefix(uri),
        None => None,
    };
    match prefix.filter(|p| !p.is_empty()) {
        Some(p) => format!("{p}:{local}"),
        None => local.to_string(),
    }
}

impl SvgDocument {
    pub fn parse(svg: &str) -> Result<Self> {
        let opts = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(svg, opts).map_err(|e| {
            Error::SvgParse {
                message: e.to_string(),
            }
        })?;
        let root_el = doc.root_element();
        if root_el.tag_name().name() != "svg" {
            return Err(Error::MissingSvgRoot);
        }

        let mut out = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            ids: FxHashMap::default(),
            source_len: 0,
            free: Vec::new(),
        };
        out.root = out.import(root_el, None);
        out.source_len = out.nodes.len();
        Ok(out)
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let data = NodeData {
            kind,
            parent,
            children: Vec::new(),
        };
        if let Some(id) = self.free.pop() {
            self.nodes[id.0] = data;
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    /// `true` for nodes parsed from the source SVG, `false` for nodes created afterwards.
    pub fn is_source(&self, id: NodeId) -> bool {
        id.0 < self.source_len
    }

    /// Slots in the arena, attached or not.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Hands a detached, created subtree back to the arena for reuse. Source nodes and attached
    /// nodes are left alone; `id` must not be used afterwards.
    pub fn release(&mut self, id: NodeId) {
        if self.is_source(id) || self.nodes[id.0].parent.is_some() {
            return;
        }
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if self.is_source(n) {
                self.nodes[n.0].parent = None;
                continue;
            }
            let data = &mut self.nodes[n.0];
            stack.append(&mut data.children);
            data.parent = None;
            data.kind = NodeKind::Comment(String::new());
            self.free.push(n);
        }
    }

    fn import(&mut self, node: roxmltree::Node<'_, '_>, parent: Option<NodeId>) -> NodeId {
        let tag = node.tag_name();
        let mut el = Element::new(qualified_name(node, tag.namespace(), tag.name()));

        let parent_ns: Vec<(Option<&str>, &str)> = node
            .parent_element()
            .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
            .unwrap_or_default();
        for ns in node.namespaces() {
            if ns.uri() == XML_NS || parent_ns.contains(&(ns.name(), ns.uri())) {
                continue;
            }
            let key = match ns.name() {
                Some(prefix) => format!("xmlns:{prefix}"),
                None => "xmlns".to_string(),
            };
            el.attrs.push((key, ns.uri().to_string()));
        }
        for a in node.attributes() {
            el.attrs
                .push((qualified_name(node, a.namespace(), a.name()), a.value().to_string()));
        }

        let id = self.push(NodeKind::Element(el), parent);
        if let Some(dom_id) = node.attribute("id") {
            self.ids.entry(dom_id.to_string()).or_insert(id);
        }

        for child in node.children() {
            let child_id = match child.node_type() {
                roxmltree::NodeType::Element => self.import(child, Some(id)),
                roxmltree::NodeType::Text => {
                    let text = child.text().unwrap_or_default().to_string();
                    self.push(NodeKind::Text(text), Some(id))
                }
                roxmltree::NodeType::Comment => {
                    let text = child.text().unwrap_or_default().to_string();
                    self.push(NodeKind::Comment(text), Some(id))
                }
                _ => continue,
            };
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::local_name)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// `true` while the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = id;
        loop {
            if cur == self.root {
                return true;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Element carrying `id="<dom_id>"`, when it is still attached.
    pub fn element_by_id(&self, dom_id: &str) -> Option<NodeId> {
        self.ids
            .get(dom_id)
            .copied()
            .filter(|n| self.is_attached(*n))
    }

    /// `id` attributes of all attached elements, in document order.
    pub fn element_ids(&self) -> Vec<String> {
        self.descendants(self.root)
            .into_iter()
            .filter_map(|n| self.attr(n, "id"))
            .map(str::to_string)
            .collect()
    }

    /// `id` and everything below it, in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of `id`'s subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(id) {
            if let NodeKind::Text(t) = self.kind(n) {
                out.push_str(t);
            }
        }
        out
    }

    pub fn create_element(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut el = Element::new(name);
        for (k, v) in attrs {
            el.set_attr(k, *v);
        }
        self.push(NodeKind::Element(el), None)
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()), None)
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Replaces the children of `parent`; previous children stay in the arena, detached.
    pub fn replace_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        for old in std::mem::take(&mut self.nodes[parent.0].children) {
            self.nodes[old.0].parent = None;
        }
        for child in children {
            self.append_child(parent, child);
        }
    }

    /// Puts `wrapper` where `node` is and moves `node` into it.
    pub fn wrap(&mut self, node: NodeId, wrapper: NodeId) -> bool {
        let Some(parent) = self.parent(node) else {
            return false;
        };
        let Some(pos) = self.children(parent).iter().position(|c| *c == node) else {
            return false;
        };
        self.detach(wrapper);
        self.nodes[parent.0].children[pos] = wrapper;
        self.nodes[wrapper.0].parent = Some(parent);
        self.nodes[node.0].parent = None;
        self.append_child(wrapper, node);
        true
    }

    /// Replaces `wrapper` with its children.
    pub fn unwrap(&mut self, wrapper: NodeId) -> bool {
        let Some(parent) = self.parent(wrapper) else {
            return false;
        };
        let Some(pos) = self.children(parent).iter().position(|c| *c == wrapper) else {
            return false;
        };
        let children = std::mem::take(&mut self.nodes[wrapper.0].children);
        for c in &children {
            self.nodes[c.0].parent = Some(parent);
        }
        self.nodes[parent.0].children.splice(pos..=pos, children);
        self.nodes[wrapper.0].parent = None;
        true
    }

    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        self.write_node(&mut out, self.root);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        match self.kind(id) {
            NodeKind::Text(t) => escape_xml_into(out, t),
            NodeKind::Comment(c) => {
                out.push_str("<!--");
                out.push_str(c);
                out.push_str("-->");
            }
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.name);
                for (k, v) in &el.attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    escape_xml_into(out, v);
                    out.push('"');
                }
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for c in children {
                    self.write_node(out, *c);
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
    }
}

pub(crate) fn escape_xml_into(out: &mut String, text: &str) {
    let bytes = text.as_bytes();
    let mut start = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        let esc = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            _ => continue,
        };
        if start < i {
            out.push_str(&text[start..i]);
        }
        out.push_str(esc);
        start = i + 1;
    }
    if start < text.len() {
        out.push_str(&text[start..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r##"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 10 10"><!-- c --><g id="g1"><rect id="r1" fill="red"/><use xlink:href="#r1"/></g><text id="t1">a &amp; b</text></svg>"##;

    #[test]
    fn parses_and_serializes_with_namespaces() {
        let doc = SvgDocument::parse(SVG).unwrap();
        let out = doc.to_svg_string();
        assert!(out.starts_with("<svg "));
        assert!(out.contains(r#"xmlns="http://www.w3.org/2000/svg""#));
        assert!(out.contains(r#"xmlns:xlink="http://www.w3.org/1999/xlink""#));
        assert!(out.ends_with(
            r##"viewBox="0 0 10 10"><!-- c --><g id="g1"><rect id="r1" fill="red"/><use xlink:href="#r1"/></g><text id="t1">a &amp; b</text></svg>"##
        ));
        assert_eq!(SvgDocument::parse(&out).unwrap().to_svg_string(), out);
        assert_eq!(doc.element_ids(), ["g1", "r1", "t1"]);
    }

    #[test]
    fn wrap_and_unwrap_keep_position() {
        let mut doc = SvgDocument::parse(SVG).unwrap();
        let r1 = doc.element_by_id("r1").unwrap();
        let a = doc.create_element("a", &[("href", "x")]);
        assert!(doc.wrap(r1, a));
        assert!(doc.to_svg_string().contains(r#"<g id="g1"><a href="x"><rect"#));
        assert!(doc.unwrap(a));
        assert!(doc.to_svg_string().contains(r#"<g id="g1"><rect id="r1""#));
        assert!(!doc.is_attached(a));
    }

    #[test]
    fn replaced_children_can_be_restored() {
        let mut doc = SvgDocument::parse(SVG).unwrap();
        let t1 = doc.element_by_id("t1").unwrap();
        let original = doc.children(t1).to_vec();
        let text = doc.create_text("new");
        doc.replace_children(t1, vec![text]);
        assert_eq!(doc.text_content(t1), "new");
        doc.replace_children(t1, original);
        assert_eq!(doc.text_content(t1), "a & b");
    }

    #[test]
    fn released_nodes_are_reused() {
        let mut doc = SvgDocument::parse(SVG).unwrap();
        let t1 = doc.element_by_id("t1").unwrap();
        let original = doc.children(t1).to_vec();
        let len = doc.arena_len();

        for i in 0..100 {
            let row = doc.create_element("tspan", &[]);
            let text = doc.create_text(&i.to_string());
            doc.append_child(row, text);
            doc.replace_children(t1, vec![row]);
            doc.replace_children(t1, original.clone());
            doc.release(row);
        }
        assert_eq!(doc.arena_len(), len + 2);
        assert_eq!(doc.text_content(t1), "a & b");

        doc.release(original[0]);
        doc.release(t1);
        assert_eq!(doc.arena_len(), len + 2);
        assert!(doc.is_source(original[0]));
        assert_eq!(doc.text_content(t1), "a & b");
    }

    #[test]
    fn rejects_non_svg_and_malformed_input() {
        assert!(matches!(
            SvgDocument::parse("<html/>"),
            Err(Error::MissingSvgRoot)
        ));
        assert!(matches!(
            SvgDocument::parse("<svg><g></svg>"),
            Err(Error::SvgParse { .. })
        ));
    }
}
