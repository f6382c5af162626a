//! Scroll contexts and the elements bound to them.
//!
//! A rescan rebuilds every [`ScrollContext`] from the document: the document
//! root always yields context 0, each nested scroll root yields one more in
//! document order. Animated elements are attached to their nearest scroll
//! root ancestor and their tracks are compiled against that context's
//! content-space geometry.

use std::collections::{HashMap, HashSet};

use glide_config::{BindingSettings, GlideConfig, ScrollMode};
use tracing::{debug, trace, warn};

use crate::animations::{AnimationDef, AnimationSet, BindGeometry, PropertyTrigger, compile_tracks};
use crate::anchor::Axis;
use crate::cache::{CacheDecision, ChangeCache};
use crate::dom::{Document, NodeId, Point, Rect, Size};
use crate::error::{GlideError, Result};
use crate::keyframes::KeyframeTrack;
use crate::matrix::{InitialTransform, Matrix3d};
use crate::synth::{ResolvedValues, TransformMode, TransformPayload, synthesize};
use crate::units::UnitBasis;

/// Index of a scroll context within one rescan generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u32);

/// What moves a context's offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDriver {
    /// The host's own scrolling; offsets arrive through scroll events.
    Native,
    /// An inertial integrator translating the context's sections.
    Inertial,
}

/// An element with compiled tracks.
#[derive(Debug, Clone)]
pub struct AnimatedElement {
    pub node: NodeId,
    pub animation: String,
    pub tracks: Vec<KeyframeTrack>,
    pub initial: InitialTransform,
    pub mode: TransformMode,
}

impl AnimatedElement {
    /// Payload for the given scroll distance.
    pub fn resolve(&self, offset: Point) -> TransformPayload {
        let values: ResolvedValues = self
            .tracks
            .iter()
            .map(|track| {
                let position = match track.axis {
                    Axis::Vertical => offset.y,
                    Axis::Horizontal => offset.x,
                };
                (track.property.clone(), track.sample(position))
            })
            .collect();
        synthesize(self.mode, &self.initial, &values)
    }
}

/// A top-level block translated by the inertial scroller.
#[derive(Debug, Clone)]
pub struct Section {
    pub node: NodeId,
    /// Content-space box.
    pub rect: Rect,
    /// Sticky sections keep their position and are never translated.
    pub sticky: bool,
    visible: Option<bool>,
    /// Transform last written to the node.
    translated: Option<String>,
}

impl Section {
    pub fn is_visible(&self) -> bool {
        self.visible.unwrap_or(false)
    }
}

/// Section transforms taken off the document while it is measured.
#[derive(Debug, Default)]
#[must_use = "lifted transforms must be restored"]
pub struct LiftedSections(Vec<(NodeId, String)>);

impl LiftedSections {
    fn transform_of(&self, node: NodeId) -> Option<&String> {
        self.0.iter().find(|(n, _)| *n == node).map(|(_, t)| t)
    }

    /// Write every lifted transform back.
    pub fn restore<D: Document + ?Sized>(self, doc: &mut D) {
        for (node, transform) in self.0 {
            doc.set_style(node, "transform", &transform);
        }
    }
}

/// Culling window around the viewport, in viewports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullWindow {
    pub lead: f64,
    pub trail: f64,
}

/// One independently scrolling region.
#[derive(Debug)]
pub struct ScrollContext {
    id: ContextId,
    root: NodeId,
    driver: ScrollDriver,
    /// Top-left of the content in document space.
    origin: Point,
    viewport: Size,
    content: Size,
    /// Scrolled distance (positive down/right).
    offset: Point,
    last_applied: Option<Point>,
    elements: Vec<AnimatedElement>,
    sections: Vec<Section>,
    cache: ChangeCache,
}

impl ScrollContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn driver(&self) -> ScrollDriver {
        self.driver
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Full scrollable content size.
    pub fn content(&self) -> Size {
        self.content
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Offset of the last completed update pass.
    pub fn last_applied_offset(&self) -> Option<Point> {
        self.last_applied
    }

    pub fn elements(&self) -> &[AnimatedElement] {
        &self.elements
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn cache(&self) -> &ChangeCache {
        &self.cache
    }

    /// Remove the transforms this context wrote to its sections so the host
    /// reports untranslated boxes. Pair with [`LiftedSections::restore`].
    pub fn lift_sections<D: Document + ?Sized>(&self, doc: &mut D) -> LiftedSections {
        let mut lifted = Vec::new();
        for section in &self.sections {
            if let Some(transform) = &section.translated {
                doc.remove_style(section.node, "transform");
                lifted.push((section.node, transform.clone()));
            }
        }
        LiftedSections(lifted)
    }

    /// Map a viewport-space rect into this context's content space.
    pub fn content_rect(&self, rect: Rect, doc_scroll: Point) -> Rect {
        if self.id == ContextId(0) {
            return rect.offset(doc_scroll.x, doc_scroll.y);
        }
        rect.offset(
            doc_scroll.x - self.origin.x + self.offset.x,
            doc_scroll.y - self.origin.y + self.offset.y,
        )
    }

    /// Resolve every bound element at `offset` and write what changed.
    ///
    /// Returns the number of elements whose style was written.
    pub fn update_all<D: Document + ?Sized>(&mut self, offset: Point, doc: &mut D) -> usize {
        self.offset = offset;
        let mut writes = 0;
        for element in &self.elements {
            let payload = element.resolve(offset);
            if self.cache.offer(element.node, &payload) == CacheDecision::Unchanged {
                continue;
            }
            for (property, value) in payload.iter() {
                doc.set_style(element.node, property, value);
            }
            trace!(context = self.id.0, node = element.node.0, ?payload, "applied");
            writes += 1;
        }
        self.last_applied = Some(offset);
        writes
    }

    /// Translate sections by `translate` (the integrator's signed offset)
    /// and toggle their visibility classes.
    pub fn cull_sections<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        translate: f64,
        mode: ScrollMode,
        window: CullWindow,
        binding: &BindingSettings,
    ) {
        let distance = -translate;
        let (extent, transform) = match mode {
            ScrollMode::Vertical => (
                self.viewport.height,
                Matrix3d::translate(0.0, translate, 0.0).to_css(),
            ),
            ScrollMode::Horizontal => (
                self.viewport.width,
                Matrix3d::translate(translate, 0.0, 0.0).to_css(),
            ),
        };

        for section in &mut self.sections {
            let (start, end) = match mode {
                ScrollMode::Vertical => (section.rect.top, section.rect.bottom()),
                ScrollMode::Horizontal => (section.rect.left, section.rect.right()),
            };
            let visible =
                end > distance - window.lead * extent && start < distance + window.trail * extent;

            if visible && !section.sticky {
                doc.set_style(section.node, "transform", &transform);
                section.translated = Some(transform.clone());
            }
            if section.visible != Some(visible) {
                doc.set_class(section.node, &binding.visible_class, visible);
                doc.set_class(section.node, &binding.inactive_class, !visible);
                section.visible = Some(visible);
            }
        }
    }
}

/// Every scroll context of the current rescan generation.
#[derive(Debug, Default)]
pub struct Registry {
    contexts: Vec<ScrollContext>,
    /// Transforms captured the first time a node was bound.
    initials: HashMap<NodeId, InitialTransform>,
    generation: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed rescans.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn contexts(&self) -> impl Iterator<Item = &ScrollContext> {
        self.contexts.iter()
    }

    pub fn context(&self, id: ContextId) -> Option<&ScrollContext> {
        self.contexts.get(id.0 as usize)
    }

    pub fn context_mut(&mut self, id: ContextId) -> Option<&mut ScrollContext> {
        self.contexts.get_mut(id.0 as usize)
    }

    pub fn context_for_root(&self, root: NodeId) -> Option<ContextId> {
        self.contexts.iter().find(|c| c.root == root).map(|c| c.id)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Re-resolve and apply every element of one context.
    pub fn update_all<D: Document + ?Sized>(
        &mut self,
        id: ContextId,
        offset: Point,
        doc: &mut D,
    ) -> Result<usize> {
        let context = self
            .context_mut(id)
            .ok_or(GlideError::UnknownContext(id.0))?;
        Ok(context.update_all(offset, doc))
    }

    /// Rebuild every context, element and section from the document.
    ///
    /// Section transforms written by the previous generation are lifted
    /// while measuring and written back afterwards. Configuration errors
    /// abort the rescan and leave the previous generation in place.
    /// Detached nodes are skipped.
    pub fn rescan<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        animations: &AnimationSet,
        config: &GlideConfig,
    ) -> Result<()> {
        let mut lifted = Vec::new();
        for context in &self.contexts {
            lifted.extend(context.lift_sections(doc).0);
        }
        let lifted = LiftedSections(lifted);

        let result = self.scan(&*doc, animations, config);
        if result.is_ok() {
            for section in self.contexts.iter_mut().flat_map(|c| c.sections.iter_mut()) {
                section.translated = lifted.transform_of(section.node).cloned();
            }
        }
        lifted.restore(doc);
        result
    }

    fn scan<D: Document + ?Sized>(
        &mut self,
        doc: &D,
        animations: &AnimationSet,
        config: &GlideConfig,
    ) -> Result<()> {
        let binding = &config.binding;
        let document_root = doc.document_root();
        let doc_scroll = doc.scroll_offset(document_root);

        let mut contexts = vec![ScrollContext {
            id: ContextId(0),
            root: document_root,
            driver: if config.scroll.smooth {
                ScrollDriver::Inertial
            } else {
                ScrollDriver::Native
            },
            origin: Point::default(),
            viewport: doc.viewport_size(),
            content: doc.scroll_size(document_root),
            offset: doc_scroll,
            last_applied: None,
            elements: Vec::new(),
            sections: Vec::new(),
            cache: ChangeCache::new(),
        }];

        let root_selector = format!("[{}]", binding.scroll_root_attribute);
        for root in doc.query_all(document_root, &root_selector) {
            let Some(rect) = doc.bounding_rect(root) else {
                warn!(node = root.0, "skipping detached scroll root");
                continue;
            };
            let driver = match doc.attribute(root, &binding.scroll_root_attribute).as_deref() {
                Some("smooth") => ScrollDriver::Inertial,
                _ => ScrollDriver::Native,
            };
            contexts.push(ScrollContext {
                id: ContextId(contexts.len() as u32),
                root,
                driver,
                origin: Point::new(rect.left + doc_scroll.x, rect.top + doc_scroll.y),
                viewport: doc.client_size(root).unwrap_or(rect.size()),
                content: doc.scroll_size(root),
                offset: doc.scroll_offset(root),
                last_applied: None,
                elements: Vec::new(),
                sections: Vec::new(),
                cache: ChangeCache::new(),
            });
        }

        let index_of: HashMap<NodeId, usize> =
            contexts.iter().enumerate().map(|(i, c)| (c.root, i)).collect();
        let owner = |node: NodeId| -> Option<usize> {
            match doc
                .parent(node)
                .and_then(|p| doc.closest_with_attribute(p, &binding.scroll_root_attribute))
            {
                Some(root) => index_of.get(&root).copied(),
                None => Some(0),
            }
        };

        let mut initials = HashMap::new();
        let mut bound = HashSet::new();
        let animated_selector = format!("[{}]", binding.animation_attribute);

        for node in doc.query_all(document_root, &animated_selector) {
            let Some(id) = doc
                .attribute(node, &binding.animation_attribute)
                .filter(|id| !id.trim().is_empty())
            else {
                debug!(node = node.0, "element has an empty animation id");
                continue;
            };
            let Some(def) = animations.get(&id) else {
                warn!(node = node.0, animation = %id, "unknown animation id");
                continue;
            };
            let targets: Vec<(NodeId, &[PropertyTrigger], Option<&str>, bool)> = match def {
                AnimationDef::Flat(records) => vec![(node, records.as_slice(), None, false)],
                AnimationDef::Group(group) => group
                    .children
                    .iter()
                    .flat_map(|child| {
                        doc.query_all(node, &child.selector).into_iter().map(|target| {
                            (
                                target,
                                child.props.as_slice(),
                                group.ease.as_deref(),
                                group.force3d,
                            )
                        })
                    })
                    .collect(),
            };

            for (target, records, ease, force3d) in targets {
                let Some(index) = owner(target) else {
                    warn!(node = target.0, "element belongs to a skipped scroll root");
                    continue;
                };
                if !bound.insert(target) {
                    warn!(node = target.0, animation = %id, "node is already bound, skipping");
                    continue;
                }
                let context = &contexts[index];
                let Some(element) =
                    self.bind(doc, context, doc_scroll, target, &id, records, ease, force3d)?
                else {
                    continue;
                };
                initials.insert(target, element.initial);
                contexts[index].elements.push(element);
            }
        }

        let section_selector = format!("[{}]", binding.section_attribute);
        for index in 0..contexts.len() {
            if contexts[index].driver != ScrollDriver::Inertial {
                continue;
            }
            let root = contexts[index].root;
            for node in doc.query_all(root, &section_selector) {
                let nested = doc
                    .parent(node)
                    .and_then(|p| doc.closest_with_attribute(p, &binding.section_attribute))
                    .is_some_and(|outer| outer != root);
                if nested || owner(node) != Some(index) {
                    continue;
                }
                let Some(rect) = doc.bounding_rect(node) else {
                    warn!(node = node.0, "skipping detached section");
                    continue;
                };
                let rect = contexts[index].content_rect(rect, doc_scroll);
                contexts[index].sections.push(Section {
                    node,
                    rect,
                    sticky: doc.has_class(node, &binding.sticky_class),
                    visible: None,
                    translated: None,
                });
            }
        }

        self.contexts = contexts;
        self.initials
            .retain(|node, _| doc.bounding_rect(*node).is_some());
        self.initials.extend(initials);
        self.generation += 1;

        debug!(
            generation = self.generation,
            contexts = self.contexts.len(),
            elements = self.contexts.iter().map(|c| c.elements.len()).sum::<usize>(),
            sections = self.contexts.iter().map(|c| c.sections.len()).sum::<usize>(),
            "rescan complete"
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn bind<D: Document + ?Sized>(
        &self,
        doc: &D,
        context: &ScrollContext,
        doc_scroll: Point,
        node: NodeId,
        animation: &str,
        records: &[PropertyTrigger],
        ease: Option<&str>,
        force3d: bool,
    ) -> Result<Option<AnimatedElement>> {
        let Some(rect) = doc.bounding_rect(node) else {
            warn!(node = node.0, animation, "skipping detached element");
            return Ok(None);
        };

        let geometry = BindGeometry {
            rect: context.content_rect(rect, doc_scroll),
            basis: UnitBasis {
                element: doc.client_size(node).unwrap_or(rect.size()),
                viewport: context.viewport,
            },
        };
        let tracks = compile_tracks(animation, records, ease, &geometry)?;
        if tracks.is_empty() {
            debug!(node = node.0, animation, "no keyframes, nothing to bind");
            return Ok(None);
        }

        let initial = match self.initials.get(&node) {
            Some(initial) => *initial,
            None => match doc.computed_transform(node) {
                Some(value) => match InitialTransform::parse(&value) {
                    Ok(initial) => initial,
                    Err(error) => {
                        warn!(node = node.0, %error, "unreadable transform, skipping element");
                        return Ok(None);
                    }
                },
                None => InitialTransform::Identity,
            },
        };
        let mode = TransformMode::select(doc.is_svg_leaf(node), force3d, &initial);

        debug!(
            context = context.id.0,
            node = node.0,
            animation,
            tracks = tracks.len(),
            ?mode,
            "bound element"
        );
        Ok(Some(AnimatedElement {
            node,
            animation: animation.to_string(),
            tracks,
            initial,
            mode,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessDocument;

    const ANIMATIONS: &str = r#"{
        "slide": [
            { "when": "top_bottom", "x": 0 },
            { "when": "top_top", "x": 400 }
        ]
    }"#;

    fn page() -> (HeadlessDocument, NodeId, NodeId) {
        let mut doc = HeadlessDocument::new(Size::new(1000.0, 800.0), Size::new(1000.0, 4000.0));
        let root = doc.root();
        let hero = doc.append(root, "div", Rect::new(0.0, 1600.0, 1000.0, 400.0));
        doc.set_attribute(hero, "data-animation", "slide");
        let panel = doc.append(root, "div", Rect::new(0.0, 2400.0, 500.0, 600.0));
        doc.set_attribute(panel, "data-scroll-root", "");
        doc.set_scroll_size(panel, Size::new(500.0, 2000.0));
        (doc, hero, panel)
    }

    #[test]
    fn test_rescan_discovers_contexts_in_document_order() {
        let (mut doc, hero, panel) = page();
        let mut registry = Registry::new();
        let animations = AnimationSet::from_json_str(ANIMATIONS).unwrap();
        registry
            .rescan(&mut doc, &animations, &GlideConfig::default())
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.generation(), 1);
        let document = registry.context(ContextId(0)).unwrap();
        assert_eq!(document.root(), doc.root());
        assert_eq!(document.driver(), ScrollDriver::Inertial);
        assert_eq!(document.elements()[0].node, hero);

        let nested = registry.context(ContextId(1)).unwrap();
        assert_eq!(nested.root(), panel);
        assert_eq!(nested.driver(), ScrollDriver::Native);
        assert_eq!(nested.origin(), Point::new(0.0, 2400.0));
        assert_eq!(nested.viewport(), Size::new(500.0, 600.0));
        assert_eq!(registry.context_for_root(panel), Some(ContextId(1)));
    }

    #[test]
    fn test_thresholds_are_measured_in_content_space_mid_scroll() {
        let (mut doc, hero, _) = page();
        doc.set_scroll_offset(doc.root(), Point::new(0.0, 500.0));
        let mut registry = Registry::new();
        let animations = AnimationSet::from_json_str(ANIMATIONS).unwrap();
        registry
            .rescan(&mut doc, &animations, &GlideConfig::default())
            .unwrap();

        let element = &registry.context(ContextId(0)).unwrap().elements()[0];
        assert_eq!(element.node, hero);
        assert_eq!(element.tracks[0].points[0].offset, 800.0);
        assert_eq!(element.tracks[0].points[1].offset, 1600.0);
    }

    #[test]
    fn test_nested_context_elements_are_relative_to_the_root() {
        let (mut doc, _, panel) = page();
        let inner = doc.append(panel, "div", Rect::new(0.0, 3000.0, 500.0, 100.0));
        doc.set_attribute(inner, "data-animation", "slide");
        doc.set_scroll_offset(panel, Point::new(0.0, 200.0));

        let mut registry = Registry::new();
        let animations = AnimationSet::from_json_str(ANIMATIONS).unwrap();
        registry
            .rescan(&mut doc, &animations, &GlideConfig::default())
            .unwrap();

        let nested = registry.context(ContextId(1)).unwrap();
        assert_eq!(nested.elements().len(), 1);
        let track = &nested.elements()[0].tracks[0];
        // 600px into the panel's content; the panel's viewport is 600px tall.
        assert_eq!(track.points[0].offset, 0.0);
        assert_eq!(track.points[1].offset, 600.0);
        assert!(registry.context(ContextId(0)).unwrap().elements().len() == 1);
    }

    #[test]
    fn test_unknown_ids_and_detached_nodes_are_skipped() {
        let (mut doc, hero, _) = page();
        let stray = doc.append(doc.root(), "div", Rect::new(0.0, 0.0, 10.0, 10.0));
        doc.set_attribute(stray, "data-animation", "missing");
        doc.detach(hero);

        let mut registry = Registry::new();
        let animations = AnimationSet::from_json_str(ANIMATIONS).unwrap();
        registry
            .rescan(&mut doc, &animations, &GlideConfig::default())
            .unwrap();
        assert!(registry.context(ContextId(0)).unwrap().elements().is_empty());
    }

    #[test]
    fn test_configuration_error_keeps_previous_generation() {
        let (mut doc, _, _) = page();
        let mut registry = Registry::new();
        let good = AnimationSet::from_json_str(ANIMATIONS).unwrap();
        registry.rescan(&mut doc, &good, &GlideConfig::default()).unwrap();

        let bad = AnimationSet::from_json_str(
            r#"{ "slide": [{ "when": "top", "x": 0 }, { "when": "top_top", "x": 1 }] }"#,
        )
        .unwrap();
        let err = registry
            .rescan(&mut doc, &bad, &GlideConfig::default())
            .unwrap_err();
        assert!(matches!(err, GlideError::MalformedTrigger(_)));
        assert_eq!(registry.generation(), 1);
        assert_eq!(registry.context(ContextId(0)).unwrap().elements().len(), 1);
    }

    #[test]
    fn test_update_all_writes_once_per_change() {
        let (mut doc, hero, _) = page();
        let mut registry = Registry::new();
        let animations = AnimationSet::from_json_str(ANIMATIONS).unwrap();
        registry
            .rescan(&mut doc, &animations, &GlideConfig::default())
            .unwrap();

        let offset = Point::new(0.0, 1200.0);
        assert_eq!(registry.update_all(ContextId(0), offset, &mut doc).unwrap(), 1);
        assert_eq!(registry.update_all(ContextId(0), offset, &mut doc).unwrap(), 0);
        assert_eq!(doc.style_writes(hero), 1);
        assert_eq!(
            doc.style(hero, "transform").as_deref(),
            Some("translate(200px, 0px) rotate(0deg) scale(1, 1)")
        );
        assert!(matches!(
            registry.update_all(ContextId(9), offset, &mut doc),
            Err(GlideError::UnknownContext(9))
        ));
    }

    #[test]
    fn test_initial_transform_is_captured_once() {
        let (mut doc, hero, _) = page();
        doc.set_computed_transform(hero, "matrix(2, 0, 0, 2, 0, 0)");
        let mut registry = Registry::new();
        let animations = AnimationSet::from_json_str(ANIMATIONS).unwrap();
        let config = GlideConfig::default();
        registry.rescan(&mut doc, &animations, &config).unwrap();

        doc.set_computed_transform(hero, "matrix(1, 0, 0, 1, 50, 0)");
        registry.rescan(&mut doc, &animations, &config).unwrap();

        let element = &registry.context(ContextId(0)).unwrap().elements()[0];
        assert!(matches!(element.initial, InitialTransform::Affine(a) if a.a == 2.0));
        assert_eq!(element.mode, TransformMode::Affine2d);
    }

    #[test]
    fn test_sections_cull_and_translate() {
        let (mut doc, _, _) = page();
        let root = doc.root();
        let near = doc.append(root, "section", Rect::new(0.0, 0.0, 1000.0, 800.0));
        doc.set_attribute(near, "data-scroll-section", "");
        let far = doc.append(root, "section", Rect::new(0.0, 3500.0, 1000.0, 500.0));
        doc.set_attribute(far, "data-scroll-section", "");
        let sticky = doc.append(root, "section", Rect::new(0.0, 800.0, 1000.0, 800.0));
        doc.set_attribute(sticky, "data-scroll-section", "");
        doc.set_class(sticky, "js-sticky", true);
        let nested = doc.append(near, "section", Rect::new(0.0, 0.0, 100.0, 100.0));
        doc.set_attribute(nested, "data-scroll-section", "");

        let config = GlideConfig::default();
        let mut registry = Registry::new();
        registry
            .rescan(&mut doc, &AnimationSet::default(), &config)
            .unwrap();
        let context = registry.context_mut(ContextId(0)).unwrap();
        assert_eq!(context.sections().len(), 3);

        let window = CullWindow { lead: 1.0, trail: 2.0 };
        context.cull_sections(&mut doc, -120.0, ScrollMode::Vertical, window, &config.binding);

        assert_eq!(
            doc.style(near, "transform").as_deref(),
            Some("matrix3d(1,0,0,0,0,1,0,0,0,0,1,0,0,-120,0,1)")
        );
        assert!(doc.has_class(near, "section-visible"));
        assert!(doc.has_class(sticky, "section-visible"));
        assert!(doc.style(sticky, "transform").is_none());
        assert!(!doc.has_class(far, "section-visible"));
        assert!(doc.has_class(far, "inactive"));
        assert!(doc.style(far, "transform").is_none());
    }

    #[test]
    fn test_group_children_bind_to_their_own_scroll_root() {
        let mut doc = HeadlessDocument::new(Size::new(1000.0, 800.0), Size::new(1000.0, 4000.0));
        let group = doc.append(doc.root(), "div", Rect::new(0.0, 1000.0, 1000.0, 1000.0));
        doc.set_attribute(group, "data-animation", "cards");
        let outer = doc.append(group, "div", Rect::new(0.0, 1000.0, 400.0, 100.0));
        doc.set_class(outer, "card", true);
        let panel = doc.append(group, "div", Rect::new(0.0, 1200.0, 500.0, 600.0));
        doc.set_attribute(panel, "data-scroll-root", "");
        doc.set_scroll_size(panel, Size::new(500.0, 2000.0));
        let inner = doc.append(panel, "div", Rect::new(0.0, 1900.0, 400.0, 100.0));
        doc.set_class(inner, "card", true);

        let animations = AnimationSet::from_json_str(
            r#"{ "cards": { "children": [
                { "selector": ".card", "props": [
                    { "when": "top_bottom", "x": 0 },
                    { "when": "top_top", "x": 100 }
                ] }
            ] } }"#,
        )
        .unwrap();
        let mut registry = Registry::new();
        registry
            .rescan(&mut doc, &animations, &GlideConfig::default())
            .unwrap();

        let document = registry.context(ContextId(0)).unwrap();
        let nodes: Vec<NodeId> = document.elements().iter().map(|e| e.node).collect();
        assert_eq!(nodes, vec![outer]);

        let nested = registry.context(ContextId(1)).unwrap();
        assert_eq!(nested.root(), panel);
        assert_eq!(nested.elements().len(), 1);
        let element = &nested.elements()[0];
        assert_eq!(element.node, inner);
        // 700px into the panel's content with a 600px panel viewport.
        assert_eq!(element.tracks[0].points[0].offset, 100.0);
        assert_eq!(element.tracks[0].points[1].offset, 700.0);
    }

    #[test]
    fn test_rescan_measures_sections_without_their_transforms() {
        let (mut doc, _, _) = page();
        let section = doc.append(doc.root(), "section", Rect::new(0.0, 1600.0, 1000.0, 1000.0));
        doc.set_attribute(section, "data-scroll-section", "");
        let inside = doc.append(section, "div", Rect::new(0.0, 1700.0, 1000.0, 100.0));
        doc.set_attribute(inside, "data-animation", "slide");

        let config = GlideConfig::default();
        let animations = AnimationSet::from_json_str(ANIMATIONS).unwrap();
        let mut registry = Registry::new();
        registry.rescan(&mut doc, &animations, &config).unwrap();
        let window = CullWindow { lead: 1.0, trail: 2.0 };
        registry.context_mut(ContextId(0)).unwrap().cull_sections(
            &mut doc,
            -500.0,
            ScrollMode::Vertical,
            window,
            &config.binding,
        );
        let translated = doc.style(section, "transform");
        assert_eq!(
            translated.as_deref(),
            Some("matrix3d(1,0,0,0,0,1,0,0,0,0,1,0,0,-500,0,1)")
        );
        assert_eq!(doc.bounding_rect(inside).unwrap().top, 1200.0);

        // Twice: the restored transform must be lifted again the second time.
        for _ in 0..2 {
            registry.rescan(&mut doc, &animations, &config).unwrap();
            let context = registry.context(ContextId(0)).unwrap();
            let sections = context.sections();
            assert_eq!(sections.len(), 1);
            assert_eq!(sections[0].rect.top, 1600.0);
            let element = context
                .elements()
                .iter()
                .find(|e| e.node == inside)
                .unwrap();
            assert_eq!(element.tracks[0].points[0].offset, 900.0);
            assert_eq!(doc.style(section, "transform"), translated);
        }
    }

    #[test]
    fn test_initials_of_detached_nodes_are_dropped() {
        let (mut doc, hero, _) = page();
        doc.set_computed_transform(hero, "matrix(2, 0, 0, 2, 0, 0)");
        let animations = AnimationSet::from_json_str(ANIMATIONS).unwrap();
        let config = GlideConfig::default();
        let mut registry = Registry::new();
        registry.rescan(&mut doc, &animations, &config).unwrap();
        assert!(registry.initials.contains_key(&hero));

        doc.detach(hero);
        registry.rescan(&mut doc, &animations, &config).unwrap();
        assert!(!registry.initials.contains_key(&hero));
    }
}
