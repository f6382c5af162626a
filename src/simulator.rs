//! Replays a [`Scene`] script against an [`Engine`] on a headless document.

use anyhow::{Context, Result, anyhow, bail};
use glide_core::headless::{HeadlessDocument, ManualFrameHost, NodeSnapshot};
use glide_core::persist::ScrollStateStore;
use glide_core::{ContextId, Engine, FrameOutcome, GlideConfig, NodeId, Point, Size};
use tracing::{debug, info};

use crate::scene::{Scene, Step, Target};

/// Upper bound for one `frames` step; inertial loops settle far sooner.
const MAX_FRAMES: usize = 100_000;

pub struct Simulator {
    engine: Engine,
    doc: HeadlessDocument,
    host: ManualFrameHost,
    now_ms: f64,
    frame_ms: f64,
    frames: usize,
}

impl Simulator {
    /// Build the document and run the initial scan.
    pub fn new(
        scene: &Scene,
        config: GlideConfig,
        store: Option<Box<dyn ScrollStateStore>>,
    ) -> Result<Self> {
        let mut doc = HeadlessDocument::from_scene(&scene.document);
        let mut engine = Engine::new(config, scene.animations.clone());
        if let Some(store) = store {
            engine = engine.with_store(store, scene.url.clone());
        }

        let mut host = ManualFrameHost::new();
        engine.rescan(&mut doc, &mut host).context("initial scan failed")?;
        info!(
            nodes = doc.len(),
            contexts = engine.registry().len(),
            "scene loaded"
        );

        Ok(Self {
            engine,
            doc,
            host,
            now_ms: 0.0,
            frame_ms: 1000.0 / 60.0,
            frames: 0,
        })
    }

    /// Simulated time between host frames.
    pub fn with_frame_interval(mut self, frame_ms: f64) -> Self {
        if frame_ms.is_finite() && frame_ms > 0.0 {
            self.frame_ms = frame_ms;
        }
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn document(&self) -> &HeadlessDocument {
        &self.doc
    }

    /// Host frames fired so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Run every step, then let pending frames drain.
    pub fn run(&mut self, script: &[Step]) -> Result<()> {
        for (index, step) in script.iter().enumerate() {
            self.step(step)
                .with_context(|| format!("step {index} ({step:?}) failed"))?;
        }
        self.pump(None)?;
        Ok(())
    }

    pub fn step(&mut self, step: &Step) -> Result<()> {
        debug!(?step, "step");
        match step {
            Step::Wheel {
                target,
                delta,
                source,
            } => {
                let (id, _) = self.resolve(target)?;
                if !self.engine.on_wheel(id, *delta, *source, &mut self.host)? {
                    debug!(context = id.0, "wheel input ignored");
                }
            }
            Step::Scroll { target, x, y } => {
                let (_, root) = self.resolve(target)?;
                self.doc.set_scroll_offset(root, Point::new(*x, *y));
                self.engine.on_scroll(root, &mut self.host);
            }
            Step::ScrollTo { target, distance } => {
                let (id, _) = self.resolve(target)?;
                self.engine.scroll_to(id, *distance, &mut self.host)?;
            }
            Step::ScrollToElement {
                target,
                element,
                offset,
            } => {
                let (id, _) = self.resolve(target)?;
                let node = self
                    .doc
                    .find_by_id(element)
                    .ok_or_else(|| anyhow!("no element with id `{element}`"))?;
                self.engine
                    .scroll_to_node(id, node, *offset, &mut self.doc, &mut self.host)?;
            }
            Step::SetScroll { target, distance } => {
                let (id, _) = self.resolve(target)?;
                self.engine.set_scroll(id, *distance, &mut self.host)?;
            }
            Step::Resize { width, height } => {
                self.doc.set_viewport(Size::new(*width, *height));
                self.engine.on_resize(&mut self.doc, &mut self.host)?;
            }
            Step::Scrub { target, pointers } => {
                let (id, _) = self.resolve(target)?;
                self.engine.begin_scrub(id)?;
                for pointer in pointers {
                    self.engine.scrub_to(id, *pointer, &mut self.host)?;
                    self.pump(Some(1))?;
                }
                self.engine.end_scrub(id)?;
            }
            Step::Freeze { target } => {
                let (id, _) = self.resolve(target)?;
                self.engine.freeze(id)?;
            }
            Step::Unfreeze { target } => {
                let (id, _) = self.resolve(target)?;
                self.engine.unfreeze(id)?;
            }
            Step::Rescan => self.engine.rescan(&mut self.doc, &mut self.host)?,
            Step::Frames { limit } => {
                self.pump(*limit)?;
            }
        }
        Ok(())
    }

    /// Fire pending frames until none are left or `limit` have run.
    ///
    /// Handles pending at the same time share one timestamp. Handles left
    /// over when the limit is reached stay pending.
    pub fn pump(&mut self, limit: Option<usize>) -> Result<usize> {
        let budget = limit.unwrap_or(MAX_FRAMES);
        let mut fired = 0;
        while fired < budget && !self.host.pending().is_empty() {
            for handle in self.host.take(budget - fired) {
                let outcome = self
                    .engine
                    .on_frame(handle, self.now_ms, &mut self.doc, &mut self.host)?;
                if let FrameOutcome::Applied { context, writes, .. } = outcome
                    && writes > 0
                {
                    debug!(context = context.0, writes, at = self.now_ms, "frame applied");
                }
                fired += 1;
            }
            self.now_ms += self.frame_ms;
        }
        if limit.is_none() && !self.host.pending().is_empty() {
            bail!("frames still pending after {MAX_FRAMES} callbacks");
        }
        self.frames += fired;
        Ok(fired)
    }

    fn resolve(&self, target: &Target) -> Result<(ContextId, NodeId)> {
        let id = match target {
            Target::Context(index) => ContextId(*index),
            Target::Element(element) => {
                let node = self
                    .doc
                    .find_by_id(element)
                    .ok_or_else(|| anyhow!("no element with id `{element}`"))?;
                self.engine
                    .registry()
                    .context_for_root(node)
                    .ok_or_else(|| anyhow!("`{element}` is not a scroll root"))?
            }
        };
        let root = self.engine.context(id)?.root();
        Ok((id, root))
    }

    /// Flush persisted offsets and return the written node state.
    pub fn finish(mut self) -> Result<Vec<NodeSnapshot>> {
        self.engine.flush()?;
        Ok(self.doc.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "document": {
            "viewport": { "width": 1000, "height": 800 },
            "content": { "width": 1000, "height": 3000 },
            "children": [
                { "rect": { "left": 0, "top": 1600, "width": 1000, "height": 400 },
                  "attributes": { "id": "hero", "data-animation": "rise" } }
            ]
        },
        "animations": {
            "rise": [
                { "when": "top_bottom", "y": 0 },
                { "when": "top_top", "y": -200 }
            ]
        }
    }"#;

    #[test]
    fn test_frames_step_honours_limit() {
        let scene = Scene::from_json_str(SCENE).unwrap();
        let mut sim = Simulator::new(&scene, GlideConfig::default(), None).unwrap();
        sim.step(&Step::ScrollTo {
            target: Target::Context(0),
            distance: 1200.0,
        })
        .unwrap();
        assert_eq!(sim.pump(Some(3)).unwrap(), 3);
        assert!(sim.engine().scroller(ContextId(0)).unwrap().distance() < 1200.0);
        sim.pump(None).unwrap();
        assert!(sim.engine().is_idle());
    }

    #[test]
    fn test_frame_limit_spans_contexts() {
        let scene = Scene::from_json_str(
            r#"{
                "document": {
                    "viewport": { "width": 1000, "height": 800 },
                    "content": { "width": 1000, "height": 3000 },
                    "children": [
                        { "rect": { "left": 0, "top": 1000, "width": 500, "height": 600 },
                          "attributes": { "id": "panel", "data-scroll-root": "smooth" },
                          "scroll_size": { "width": 500, "height": 2000 } }
                    ]
                }
            }"#,
        )
        .unwrap();
        let mut sim = Simulator::new(&scene, GlideConfig::default(), None).unwrap();
        assert_eq!(sim.host.pending().len(), 2);

        assert_eq!(sim.pump(Some(1)).unwrap(), 1);
        assert_eq!(sim.host.pending().len(), 1);
        assert_eq!(sim.frames(), 1);
        assert_eq!(sim.pump(None).unwrap(), 1);
        assert!(sim.engine().is_idle());
    }

    #[test]
    fn test_element_target_must_be_a_scroll_root() {
        let scene = Scene::from_json_str(SCENE).unwrap();
        let sim = Simulator::new(&scene, GlideConfig::default(), None).unwrap();
        let error = sim
            .resolve(&Target::Element("hero".to_string()))
            .unwrap_err();
        assert!(error.to_string().contains("not a scroll root"));
        assert!(sim.resolve(&Target::Context(0)).is_ok());
    }
}
