//! Host document seam.
//!
//! The engine never touches a real DOM. Everything it needs to discover bound
//! nodes, measure them and write styles goes through [`Document`], which a
//! browser binding (or the in-memory [`crate::headless`] host) implements.

use serde::{Deserialize, Serialize};

/// Opaque handle to a host node. Identity is owned by the host; the engine
/// keys its caches by this handle instead of tagging nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// This rect moved by `(dx, dy)`.
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            ..*self
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Read/write access to the host document.
///
/// Geometry is reported in viewport space, the way `getBoundingClientRect`
/// does, transforms included. Before measuring, the engine removes the
/// transforms it wrote to scroll sections and puts them back afterwards.
pub trait Document {
    /// The element acting as the default scroll root.
    fn document_root(&self) -> NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Descendants of `scope` matching `selector`, in document order.
    fn query_all(&self, scope: NodeId, selector: &str) -> Vec<NodeId>;

    /// Viewport-relative box, or `None` if the node is detached.
    fn bounding_rect(&self, node: NodeId) -> Option<Rect>;

    /// Inner (client) size of the node.
    fn client_size(&self, node: NodeId) -> Option<Size>;

    /// Native scroll offset of a scroll root.
    fn scroll_offset(&self, node: NodeId) -> Point;

    /// Full scrollable content size of a scroll root.
    fn scroll_size(&self, node: NodeId) -> Size;

    /// Window inner size.
    fn viewport_size(&self) -> Size;

    /// The computed `transform` value (`none`, `matrix(...)`, `matrix3d(...)`).
    fn computed_transform(&self, node: NodeId) -> Option<String>;

    /// Inside an SVG subtree but not the `<svg>` root itself.
    fn is_svg_leaf(&self, node: NodeId) -> bool;

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn set_class(&mut self, node: NodeId, class: &str, enabled: bool);

    /// Write one inline style property.
    fn set_style(&mut self, node: NodeId, property: &str, value: &str);

    /// Remove one inline style property, falling back to the stylesheet value.
    fn remove_style(&mut self, node: NodeId, property: &str);

    /// Nearest ancestor (or self) carrying `attribute`.
    fn closest_with_attribute(&self, node: NodeId, attribute: &str) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.has_attribute(id, attribute) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }
}
