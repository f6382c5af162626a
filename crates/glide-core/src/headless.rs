//! In-memory host: a tiny document tree and a manually pumped frame clock.
//!
//! Node rects are given in document layout space (as if nothing were
//! scrolled); [`Document::bounding_rect`] subtracts the scroll offsets of
//! every ancestor and adds the translation of inline `matrix3d` transforms
//! on the node and its ancestors, the way a browser reports client rects.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId, Point, Rect, Size};
use crate::matrix::Matrix3d;
use crate::scheduler::{FrameHandle, FrameHost};

#[derive(Debug, Clone, Default)]
struct Node {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: BTreeMap<String, String>,
    classes: BTreeSet<String>,
    layout: Rect,
    client: Option<Size>,
    scroll: Point,
    scroll_size: Option<Size>,
    computed_transform: Option<String>,
    styles: BTreeMap<String, String>,
    style_writes: usize,
    hidden: bool,
}

impl Node {
    /// Translation of an inline `matrix3d` transform.
    fn inline_translation(&self) -> (f64, f64) {
        self.styles
            .get("transform")
            .and_then(|value| Matrix3d::parse(value).ok())
            .map_or((0.0, 0.0), |m| (m.0[12], m.0[13]))
    }
}

#[derive(Debug, Clone)]
pub struct HeadlessDocument {
    nodes: Vec<Node>,
    viewport: Size,
}

impl HeadlessDocument {
    /// A document whose root spans `content` and is viewed through `viewport`.
    pub fn new(viewport: Size, content: Size) -> Self {
        let root = Node {
            tag: "html".to_string(),
            layout: Rect::new(0.0, 0.0, content.width, content.height),
            client: Some(viewport),
            scroll_size: Some(content),
            ..Node::default()
        };
        Self {
            nodes: vec![root],
            viewport,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn append(&mut self, parent: NodeId, tag: &str, layout: Rect) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(Node {
            tag: tag.to_string(),
            parent: Some(parent),
            layout,
            ..Node::default()
        });
        if let Some(parent) = self.node_mut(parent) {
            parent.children.push(id);
        }
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn set_layout(&mut self, node: NodeId, layout: Rect) {
        if let Some(n) = self.node_mut(node) {
            n.layout = layout;
        }
    }

    pub fn set_client_size(&mut self, node: NodeId, size: Size) {
        if let Some(n) = self.node_mut(node) {
            n.client = Some(size);
        }
    }

    pub fn set_scroll_offset(&mut self, node: NodeId, offset: Point) {
        if let Some(n) = self.node_mut(node) {
            n.scroll = offset;
        }
    }

    pub fn set_scroll_size(&mut self, node: NodeId, size: Size) {
        if let Some(n) = self.node_mut(node) {
            n.scroll_size = Some(size);
        }
    }

    pub fn set_computed_transform(&mut self, node: NodeId, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.computed_transform = Some(value.to_string());
        }
    }

    /// Resize the window; the root's client size follows.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
        if let Some(root) = self.nodes.first_mut() {
            root.client = Some(viewport);
        }
    }

    /// Keep the node in the tree but drop its layout box (`display: none`).
    pub fn detach(&mut self, node: NodeId) {
        if let Some(n) = self.node_mut(node) {
            n.hidden = true;
        }
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.node(node)?.styles.get(property).cloned()
    }

    /// Number of `set_style` calls received by `node`.
    pub fn style_writes(&self, node: NodeId) -> usize {
        self.node(node).map_or(0, |n| n.style_writes)
    }

    pub fn total_style_writes(&self) -> usize {
        self.nodes.iter().map(|n| n.style_writes).sum()
    }

    /// Inline styles and classes of every node that has been written to.
    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.style_writes > 0)
            .map(|(i, n)| NodeSnapshot {
                node: NodeId(i as u64),
                tag: n.tag.clone(),
                id: n.attributes.get("id").cloned(),
                classes: n.classes.iter().cloned().collect(),
                styles: n.styles.clone(),
                writes: n.style_writes,
            })
            .collect()
    }

    /// First node whose `id` attribute equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.attributes.get("id").is_some_and(|v| v == id))
            .map(|i| NodeId(i as u64))
    }

    fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |id| self.parent(*id))
    }

    fn descendants(&self, scope: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.node(scope) else {
            return;
        };
        for child in &node.children {
            out.push(*child);
            self.descendants(*child, out);
        }
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        let Some(n) = self.node(node) else {
            return false;
        };
        selector.split(',').map(str::trim).any(|simple| {
            if let Some(inner) = simple.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                match inner.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim_matches(|c| c == '"' || c == '\'');
                        n.attributes.get(name.trim()).is_some_and(|v| v == value)
                    }
                    None => n.attributes.contains_key(inner.trim()),
                }
            } else if let Some(class) = simple.strip_prefix('.') {
                n.classes.contains(class)
            } else if let Some(id) = simple.strip_prefix('#') {
                n.attributes.get("id").is_some_and(|v| v == id)
            } else {
                !simple.is_empty() && n.tag.eq_ignore_ascii_case(simple)
            }
        })
    }

    /// Build a document from a scene description.
    pub fn from_scene(scene: &SceneDocument) -> Self {
        let mut doc = Self::new(scene.viewport, scene.content);
        let root = doc.root();
        for child in &scene.children {
            doc.insert_scene_node(root, child);
        }
        doc
    }

    fn insert_scene_node(&mut self, parent: NodeId, scene: &SceneNode) {
        let id = self.append(parent, &scene.tag, scene.rect);
        for (name, value) in &scene.attributes {
            self.set_attribute(id, name, value);
        }
        for class in &scene.classes {
            self.set_class(id, class, true);
        }
        if let Some(size) = scene.scroll_size {
            self.set_scroll_size(id, size);
        }
        if let Some(size) = scene.client_size {
            self.set_client_size(id, size);
        }
        if let Some(transform) = &scene.transform {
            self.set_computed_transform(id, transform);
        }
        for child in &scene.children {
            self.insert_scene_node(id, child);
        }
    }
}

impl Document for HeadlessDocument {
    fn document_root(&self) -> NodeId {
        self.root()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node)?.attributes.get(name).cloned()
    }

    fn query_all(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        let mut all = Vec::new();
        self.descendants(scope, &mut all);
        all.retain(|id| self.matches(*id, selector));
        all
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        let n = self.node(node)?;
        let hidden = |id: NodeId| self.node(id).is_some_and(|n| n.hidden);
        if n.hidden || self.ancestors(node).any(hidden) {
            return None;
        }
        let (dx, dy) = self
            .ancestors(node)
            .filter_map(|a| self.node(a))
            .fold(n.inline_translation(), |(x, y), a| {
                let (tx, ty) = a.inline_translation();
                (x + tx - a.scroll.x, y + ty - a.scroll.y)
            });
        Some(n.layout.offset(dx, dy))
    }

    fn client_size(&self, node: NodeId) -> Option<Size> {
        let n = self.node(node)?;
        Some(n.client.unwrap_or(n.layout.size()))
    }

    fn scroll_offset(&self, node: NodeId) -> Point {
        self.node(node).map(|n| n.scroll).unwrap_or_default()
    }

    fn scroll_size(&self, node: NodeId) -> Size {
        self.node(node)
            .map(|n| n.scroll_size.unwrap_or(n.layout.size()))
            .unwrap_or_default()
    }

    fn viewport_size(&self) -> Size {
        self.viewport
    }

    fn computed_transform(&self, node: NodeId) -> Option<String> {
        self.node(node)?.computed_transform.clone()
    }

    fn is_svg_leaf(&self, node: NodeId) -> bool {
        let is_svg = |id: NodeId| self.node(id).is_some_and(|n| n.tag.eq_ignore_ascii_case("svg"));
        !is_svg(node) && self.ancestors(node).any(is_svg)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node).is_some_and(|n| n.classes.contains(class))
    }

    fn set_class(&mut self, node: NodeId, class: &str, enabled: bool) {
        if let Some(n) = self.node_mut(node) {
            if enabled {
                n.classes.insert(class.to_string());
            } else {
                n.classes.remove(class);
            }
        }
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.styles.insert(property.to_string(), value.to_string());
            n.style_writes += 1;
        }
    }

    fn remove_style(&mut self, node: NodeId, property: &str) {
        if let Some(n) = self.node_mut(node) {
            n.styles.remove(property);
        }
    }
}

/// Written state of one node, see [`HeadlessDocument::snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub node: NodeId,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub styles: BTreeMap<String, String>,
    pub writes: usize,
}

/// Serializable description of a headless page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    pub viewport: Size,
    /// Scrollable size of the document root.
    pub content: Size,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Layout box in document space.
    pub rect: Rect,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_size: Option<Size>,
    /// Computed transform before any animation, e.g. `matrix(1, 0, 0, 1, 0, 0)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    #[serde(default)]
    pub children: Vec<SceneNode>,
}

fn default_tag() -> String {
    "div".to_string()
}

/// Frame host whose callbacks are fired by hand.
#[derive(Debug, Default)]
pub struct ManualFrameHost {
    next: u64,
    pending: Vec<FrameHandle>,
    cancelled: usize,
}

impl ManualFrameHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every requested, uncancelled handle in request order.
    pub fn drain(&mut self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.pending)
    }

    /// Take at most `limit` of the oldest pending handles.
    pub fn take(&mut self, limit: usize) -> Vec<FrameHandle> {
        let count = limit.min(self.pending.len());
        self.pending.drain(..count).collect()
    }

    pub fn pending(&self) -> &[FrameHandle] {
        &self.pending
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl FrameHost for ManualFrameHost {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle(self.next);
        self.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let before = self.pending.len();
        self.pending.retain(|h| *h != handle);
        if self.pending.len() != before {
            self.cancelled += 1;
        }
    }
}
