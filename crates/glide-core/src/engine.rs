//! The orchestrator tying contexts, scrollers, frames and persistence
//! together.
//!
//! All entry points run on the host's single callback queue. Input and
//! scroll events only schedule work; the resolve-and-apply pass for a
//! context happens in [`Engine::on_frame`] when that context's frame fires.

use std::collections::{HashMap, HashSet};

use glide_config::GlideConfig;
use tracing::{debug, trace};

use crate::animations::AnimationSet;
use crate::dom::{Document, NodeId};
use crate::error::{GlideError, Result};
use crate::inertial::{DeltaSource, InertialScroller, Tick};
use crate::persist::ScrollStateStore;
use crate::registry::{ContextId, CullWindow, Registry, ScrollContext, ScrollDriver};
use crate::scheduler::{FrameHandle, FrameHost, FrameScheduler, FrameThrottle};

/// What a fired frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The handle was cancelled or superseded; nothing ran.
    Stale,
    /// Skipped by the frame-rate cap and re-armed.
    Throttled(ContextId),
    Applied {
        context: ContextId,
        /// Elements whose style was written.
        writes: usize,
        /// Another frame was requested for this context.
        rearmed: bool,
    },
}

pub struct Engine {
    config: GlideConfig,
    animations: AnimationSet,
    registry: Registry,
    scheduler: FrameScheduler,
    /// Keyed by scroll root so they outlive rescans.
    scrollers: HashMap<NodeId, InertialScroller>,
    throttles: HashMap<ContextId, FrameThrottle>,
    forced: HashSet<ContextId>,
    /// Persistence key per scroll root.
    keys: HashMap<NodeId, String>,
    store: Option<Box<dyn ScrollStateStore>>,
    url: String,
}

impl Engine {
    pub fn new(config: GlideConfig, animations: AnimationSet) -> Self {
        Self {
            config: config.sanitized(),
            animations,
            registry: Registry::new(),
            scheduler: FrameScheduler::new(),
            scrollers: HashMap::new(),
            throttles: HashMap::new(),
            forced: HashSet::new(),
            keys: HashMap::new(),
            store: None,
            url: String::new(),
        }
    }

    /// Remember inertial offsets in `store` under the page `url`.
    pub fn with_store(mut self, store: Box<dyn ScrollStateStore>, url: impl Into<String>) -> Self {
        self.store = Some(store);
        self.url = url.into();
        self
    }

    pub fn config(&self) -> &GlideConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> Option<&dyn ScrollStateStore> {
        self.store.as_deref()
    }

    /// Replace the animation set; takes effect on the next rescan.
    pub fn set_animations(&mut self, animations: AnimationSet) {
        self.animations = animations;
    }

    pub fn context(&self, id: ContextId) -> Result<&ScrollContext> {
        self.registry.context(id).ok_or(GlideError::UnknownContext(id.0))
    }

    pub fn scroller(&self, id: ContextId) -> Option<&InertialScroller> {
        let root = self.registry.context(id)?.root();
        self.scrollers.get(&root)
    }

    fn scroller_mut(&mut self, id: ContextId) -> Result<Option<&mut InertialScroller>> {
        let root = self.context(id)?.root();
        Ok(self.scrollers.get_mut(&root))
    }

    /// Nothing is scheduled and every scroller is at rest.
    pub fn is_idle(&self) -> bool {
        self.scheduler.pending_count() == 0
    }

    /// Rebuild all contexts and schedule a forced update for each.
    ///
    /// Once the new generation is built, pending frames of the previous one
    /// are cancelled. On error the previous generation keeps running with
    /// its frames untouched.
    pub fn rescan<D, H>(&mut self, doc: &mut D, host: &mut H) -> Result<()>
    where
        D: Document + ?Sized,
        H: FrameHost + ?Sized,
    {
        self.registry.rescan(doc, &self.animations, &self.config)?;
        self.scheduler.cancel_all(host);
        self.forced.clear();

        let mut live = HashSet::new();
        self.throttles.clear();
        let contexts: Vec<(ContextId, NodeId, ScrollDriver)> = self
            .registry
            .contexts()
            .map(|c| (c.id(), c.root(), c.driver()))
            .collect();

        for (id, root, driver) in contexts {
            self.throttles
                .insert(id, FrameThrottle::new(self.config.frame.target_fps));
            self.keys.insert(root, persistence_key(&*doc, id, root));

            if driver == ScrollDriver::Inertial {
                live.insert(root);
                self.sync_scroller(id, root)?;
            }

            self.forced.insert(id);
            self.scheduler.schedule(id, host);
        }

        self.scrollers.retain(|root, _| live.contains(root));
        let registry = &self.registry;
        self.keys.retain(|root, _| registry.context_for_root(*root).is_some());
        debug!(
            generation = self.registry.generation(),
            scrollers = self.scrollers.len(),
            "engine rescanned"
        );
        Ok(())
    }

    fn sync_scroller(&mut self, id: ContextId, root: NodeId) -> Result<()> {
        let context = self.registry.context(id).ok_or(GlideError::UnknownContext(id.0))?;
        let (content, viewport) = (context.content(), context.viewport());

        if let Some(scroller) = self.scrollers.get_mut(&root) {
            scroller.set_bounds(content, viewport);
            return Ok(());
        }

        let mut scroller = InertialScroller::new(&self.config.scroll);
        scroller.set_bounds(content, viewport);
        if self.config.scroll.persist
            && let (Some(store), Some(key)) = (&self.store, self.keys.get(&root))
            && let Some(distance) = store.load(&self.url, key)
        {
            debug!(context = id.0, distance, "restoring scroll position");
            scroller.set_scroll(distance);
        }
        self.scrollers.insert(root, scroller);
        Ok(())
    }

    /// Viewport size changed: rebuild geometry and re-clamp scrollers.
    pub fn on_resize<D, H>(&mut self, doc: &mut D, host: &mut H) -> Result<()>
    where
        D: Document + ?Sized,
        H: FrameHost + ?Sized,
    {
        debug!(viewport = ?doc.viewport_size(), "resize");
        self.rescan(doc, host)
    }

    /// A native scroll event on `root`. Collapses into one pending frame.
    ///
    /// Events from nodes that are not scroll roots are ignored.
    pub fn on_scroll<H: FrameHost + ?Sized>(&mut self, root: NodeId, host: &mut H) {
        match self.registry.context_for_root(root) {
            Some(id) => {
                self.scheduler.schedule(id, host);
            }
            None => trace!(node = root.0, "scroll event outside any context"),
        }
    }

    /// Wheel/touch input for an inertial context. Positive deltas move
    /// forward. Returns `false` if the context is native or frozen.
    pub fn on_wheel<H: FrameHost + ?Sized>(
        &mut self,
        id: ContextId,
        delta: f64,
        source: DeltaSource,
        host: &mut H,
    ) -> Result<bool> {
        let accepted = match self.scroller_mut(id)? {
            Some(scroller) => scroller.on_delta(delta, source),
            None => false,
        };
        if accepted {
            self.scheduler.schedule(id, host);
        }
        Ok(accepted)
    }

    /// Ease an inertial context to `distance`.
    pub fn scroll_to<H: FrameHost + ?Sized>(
        &mut self,
        id: ContextId,
        distance: f64,
        host: &mut H,
    ) -> Result<()> {
        if let Some(scroller) = self.scroller_mut(id)? {
            scroller.scroll_to(distance);
            self.forced.insert(id);
            self.scheduler.schedule(id, host);
        }
        Ok(())
    }

    /// Ease an inertial context to the start of `node` plus `offset`.
    /// Detached nodes are ignored.
    ///
    /// The node is measured with the context's section transforms lifted.
    pub fn scroll_to_node<D, H>(
        &mut self,
        id: ContextId,
        node: NodeId,
        offset: f64,
        doc: &mut D,
        host: &mut H,
    ) -> Result<()>
    where
        D: Document + ?Sized,
        H: FrameHost + ?Sized,
    {
        let context = self.context(id)?;
        let lifted = context.lift_sections(doc);
        let measured = doc.bounding_rect(node);
        lifted.restore(doc);
        let Some(rect) = measured else {
            return Ok(());
        };
        let rect = context.content_rect(rect, doc.scroll_offset(doc.document_root()));
        if let Some(scroller) = self.scroller_mut(id)? {
            scroller.scroll_to_rect(&rect, offset);
            self.forced.insert(id);
            self.scheduler.schedule(id, host);
        }
        Ok(())
    }

    /// Jump an inertial context to `distance` without easing.
    pub fn set_scroll<H: FrameHost + ?Sized>(
        &mut self,
        id: ContextId,
        distance: f64,
        host: &mut H,
    ) -> Result<()> {
        if let Some(scroller) = self.scroller_mut(id)? {
            scroller.set_scroll(distance);
            self.forced.insert(id);
            self.scheduler.schedule(id, host);
        }
        Ok(())
    }

    pub fn freeze(&mut self, id: ContextId) -> Result<()> {
        if let Some(scroller) = self.scroller_mut(id)? {
            scroller.freeze();
        }
        Ok(())
    }

    pub fn unfreeze(&mut self, id: ContextId) -> Result<()> {
        if let Some(scroller) = self.scroller_mut(id)? {
            scroller.unfreeze();
        }
        Ok(())
    }

    pub fn begin_scrub(&mut self, id: ContextId) -> Result<()> {
        if let Some(scroller) = self.scroller_mut(id)? {
            scroller.begin_scrub();
        }
        Ok(())
    }

    /// Pointer moved while scrubbing, in viewport coordinates.
    pub fn scrub_to<H: FrameHost + ?Sized>(
        &mut self,
        id: ContextId,
        pointer: f64,
        host: &mut H,
    ) -> Result<()> {
        if let Some(scroller) = self.scroller_mut(id)?
            && scroller.is_scrubbing()
        {
            scroller.scrub_to(pointer);
            self.scheduler.schedule(id, host);
        }
        Ok(())
    }

    pub fn end_scrub(&mut self, id: ContextId) -> Result<()> {
        if let Some(scroller) = self.scroller_mut(id)? {
            scroller.end_scrub();
        }
        Ok(())
    }

    /// Run the frame callback for `handle`.
    pub fn on_frame<D, H>(
        &mut self,
        handle: FrameHandle,
        now_ms: f64,
        doc: &mut D,
        host: &mut H,
    ) -> Result<FrameOutcome>
    where
        D: Document + ?Sized,
        H: FrameHost + ?Sized,
    {
        let Some(id) = self.scheduler.fire(handle) else {
            trace!(handle = handle.0, "stale frame");
            return Ok(FrameOutcome::Stale);
        };

        if let Some(throttle) = self.throttles.get_mut(&id)
            && !throttle.ready(now_ms)
        {
            self.scheduler.schedule(id, host);
            return Ok(FrameOutcome::Throttled(id));
        }

        let forced = self.forced.remove(&id);
        let context = self.registry.context(id).ok_or(GlideError::UnknownContext(id.0))?;
        let root = context.root();
        let last_applied = context.last_applied_offset();

        let (writes, rearmed) = match context.driver() {
            ScrollDriver::Native => {
                let offset = doc.scroll_offset(root);
                let writes = if forced || last_applied != Some(offset) {
                    self.registry.update_all(id, offset, doc)?
                } else {
                    0
                };
                (writes, false)
            }
            ScrollDriver::Inertial => {
                let Some(scroller) = self.scrollers.get_mut(&root) else {
                    return Err(GlideError::UnknownContext(id.0));
                };
                let moved = matches!(scroller.tick(), Tick::Moved(_));
                let position = scroller.position();
                let (translate, distance, mode) =
                    (scroller.offset(), scroller.distance(), scroller.mode());

                let mut writes = 0;
                if moved || forced || last_applied != Some(position) {
                    let window = CullWindow {
                        lead: self.config.scroll.cull_lead_viewports,
                        trail: self.config.scroll.cull_trail_viewports,
                    };
                    let context = self
                        .registry
                        .context_mut(id)
                        .ok_or(GlideError::UnknownContext(id.0))?;
                    context.cull_sections(doc, translate, mode, window, &self.config.binding);
                    writes = context.update_all(position, doc);
                    self.remember(root, distance);
                }
                if moved {
                    self.scheduler.schedule(id, host);
                }
                (writes, moved)
            }
        };

        trace!(context = id.0, writes, rearmed, "frame");
        Ok(FrameOutcome::Applied {
            context: id,
            writes,
            rearmed,
        })
    }

    fn remember(&mut self, root: NodeId, distance: f64) {
        if !self.config.scroll.persist {
            return;
        }
        if let (Some(store), Some(key)) = (self.store.as_mut(), self.keys.get(&root)) {
            store.save(&self.url, key, distance);
        }
    }

    /// Write persisted offsets to their backing medium.
    pub fn flush(&mut self) -> Result<()> {
        match self.store.as_mut() {
            Some(store) => store
                .flush()
                .map_err(|error| GlideError::Persistence(format!("{error:#}"))),
            None => Ok(()),
        }
    }
}

/// `id` attribute of the root, else a positional name.
fn persistence_key<D: Document + ?Sized>(doc: &D, id: ContextId, root: NodeId) -> String {
    match doc.attribute(root, "id").filter(|v| !v.is_empty()) {
        Some(value) => value,
        None if id == ContextId(0) => "document".to_string(),
        None => format!("context-{}", id.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Point, Rect, Size};
    use crate::headless::{HeadlessDocument, ManualFrameHost};
    use crate::inertial::ScrollState;
    use crate::persist::SessionStore;

    const ANIMATIONS: &str = r#"{
        "slide": [
            { "when": "top_bottom", "x": 0 },
            { "when": "top_top", "x": 400 }
        ]
    }"#;

    fn page() -> (HeadlessDocument, NodeId) {
        let mut doc = HeadlessDocument::new(Size::new(1000.0, 800.0), Size::new(1000.0, 4000.0));
        let hero = doc.append(doc.root(), "div", Rect::new(0.0, 1600.0, 1000.0, 400.0));
        doc.set_attribute(hero, "data-animation", "slide");
        (doc, hero)
    }

    fn pump(engine: &mut Engine, doc: &mut HeadlessDocument, host: &mut ManualFrameHost) -> usize {
        let mut frames = 0;
        let mut now = 0.0;
        while !host.pending().is_empty() {
            for handle in host.drain() {
                engine.on_frame(handle, now, doc, host).unwrap();
                frames += 1;
            }
            now += 16.0;
            assert!(frames < 10_000, "frame loop never settled");
        }
        frames
    }

    #[test]
    fn test_rescan_schedules_a_forced_update_per_context() {
        let (mut doc, hero) = page();
        let mut host = ManualFrameHost::new();
        let mut engine = Engine::new(
            GlideConfig::default(),
            AnimationSet::from_json_str(ANIMATIONS).unwrap(),
        );
        engine.rescan(&mut doc, &mut host).unwrap();
        assert_eq!(host.pending().len(), 1);

        pump(&mut engine, &mut doc, &mut host);
        assert_eq!(
            doc.style(hero, "transform").as_deref(),
            Some("translate(0px, 0px) rotate(0deg) scale(1, 1)")
        );
        assert!(engine.is_idle());
    }

    #[test]
    fn test_wheel_drives_the_inertial_loop_until_settled() {
        let (mut doc, hero) = page();
        let mut host = ManualFrameHost::new();
        let mut engine = Engine::new(
            GlideConfig::default(),
            AnimationSet::from_json_str(ANIMATIONS).unwrap(),
        );
        engine.rescan(&mut doc, &mut host).unwrap();
        pump(&mut engine, &mut doc, &mut host);

        // 3000 * 0.4 = 1200px forward.
        assert!(engine.on_wheel(ContextId(0), 3000.0, DeltaSource::Wheel, &mut host).unwrap());
        let frames = pump(&mut engine, &mut doc, &mut host);
        assert!(frames > 10);

        let scroller = engine.scroller(ContextId(0)).unwrap();
        assert!((scroller.distance() - 1200.0).abs() < 1e-9);
        assert_eq!(
            doc.style(hero, "transform").as_deref(),
            Some("translate(200px, 0px) rotate(0deg) scale(1, 1)")
        );
    }

    #[test]
    fn test_native_scroll_events_collapse() {
        let (mut doc, hero) = page();
        let mut host = ManualFrameHost::new();
        let mut config = GlideConfig::default();
        config.scroll.smooth = false;
        let mut engine = Engine::new(config, AnimationSet::from_json_str(ANIMATIONS).unwrap());
        engine.rescan(&mut doc, &mut host).unwrap();
        pump(&mut engine, &mut doc, &mut host);
        let writes_before = doc.style_writes(hero);

        for y in [100.0, 600.0, 1200.0] {
            doc.set_scroll_offset(doc.root(), Point::new(0.0, y));
            engine.on_scroll(doc.root(), &mut host);
        }
        assert_eq!(host.pending().len(), 1);
        assert_eq!(pump(&mut engine, &mut doc, &mut host), 1);
        assert_eq!(doc.style_writes(hero), writes_before + 1);
        assert!(engine.scroller(ContextId(0)).is_none());
    }

    #[test]
    fn test_persisted_offset_is_restored_on_init() {
        let (mut doc, _) = page();
        let mut store = SessionStore::new();
        store.save("https://page.test/", "document", 900.0);

        let mut host = ManualFrameHost::new();
        let mut engine = Engine::new(
            GlideConfig::default(),
            AnimationSet::from_json_str(ANIMATIONS).unwrap(),
        )
        .with_store(Box::new(store), "https://page.test/");
        engine.rescan(&mut doc, &mut host).unwrap();
        assert_eq!(engine.scroller(ContextId(0)).unwrap().distance(), 900.0);

        engine.scroll_to(ContextId(0), 1000.0, &mut host).unwrap();
        pump(&mut engine, &mut doc, &mut host);
        assert_eq!(
            engine.store().unwrap().load("https://page.test/", "document"),
            Some(1000.0)
        );
    }

    #[test]
    fn test_throttle_rearms_without_work() {
        let (mut doc, _) = page();
        let mut host = ManualFrameHost::new();
        let mut config = GlideConfig::default();
        config.frame.target_fps = Some(30);
        let mut engine = Engine::new(config, AnimationSet::from_json_str(ANIMATIONS).unwrap());
        engine.rescan(&mut doc, &mut host).unwrap();

        let first = host.drain()[0];
        assert!(matches!(
            engine.on_frame(first, 0.0, &mut doc, &mut host).unwrap(),
            FrameOutcome::Applied { .. }
        ));
        engine.set_scroll(ContextId(0), 100.0, &mut host).unwrap();
        let second = host.drain()[0];
        assert_eq!(
            engine.on_frame(second, 10.0, &mut doc, &mut host).unwrap(),
            FrameOutcome::Throttled(ContextId(0))
        );
        let third = host.drain()[0];
        assert!(matches!(
            engine.on_frame(third, 40.0, &mut doc, &mut host).unwrap(),
            FrameOutcome::Applied { .. }
        ));
        assert_eq!(
            engine.on_frame(third, 40.0, &mut doc, &mut host).unwrap(),
            FrameOutcome::Stale
        );
    }

    #[test]
    fn test_failed_rescan_keeps_the_scroller_gliding() {
        let (mut doc, _) = page();
        let mut host = ManualFrameHost::new();
        let mut engine = Engine::new(
            GlideConfig::default(),
            AnimationSet::from_json_str(ANIMATIONS).unwrap(),
        );
        engine.rescan(&mut doc, &mut host).unwrap();
        pump(&mut engine, &mut doc, &mut host);

        assert!(engine.on_wheel(ContextId(0), 2000.0, DeltaSource::Wheel, &mut host).unwrap());
        for now in [0.0, 16.0, 32.0] {
            let handle = host.drain()[0];
            engine.on_frame(handle, now, &mut doc, &mut host).unwrap();
        }
        assert_eq!(engine.scroller(ContextId(0)).unwrap().state(), ScrollState::Settling);

        engine.set_animations(
            AnimationSet::from_json_str(
                r#"{ "slide": [{ "when": "top", "x": 0 }, { "when": "top_top", "x": 1 }] }"#,
            )
            .unwrap(),
        );
        assert!(engine.rescan(&mut doc, &mut host).is_err());
        assert_eq!(host.pending().len(), 1);
        assert_eq!(host.cancelled(), 0);

        pump(&mut engine, &mut doc, &mut host);
        let scroller = engine.scroller(ContextId(0)).unwrap();
        assert_eq!(scroller.state(), ScrollState::Idle);
        assert_eq!(scroller.distance(), 800.0);
    }

    #[test]
    fn test_unknown_context_is_an_error() {
        let mut host = ManualFrameHost::new();
        let mut engine = Engine::new(GlideConfig::default(), AnimationSet::default());
        assert!(matches!(
            engine.on_wheel(ContextId(4), 1.0, DeltaSource::Wheel, &mut host),
            Err(GlideError::UnknownContext(4))
        ));
    }
}
