//! Frame scheduling.
//!
//! Each scroll context owns at most one pending frame request. Scheduling
//! again cancels the previous request first, so a burst of scroll events
//! collapses into the latest one. A handle that was cancelled or replaced is
//! ignored when the host fires it anyway.

use std::collections::HashMap;

use tracing::trace;

use crate::registry::ContextId;

/// Host-issued handle for one pending frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// The host's per-frame callback primitive (`requestAnimationFrame`).
pub trait FrameHost {
    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Single-slot, cancel-and-replace frame requests keyed by context.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: HashMap<ContextId, FrameHandle>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a frame for `context`, replacing any pending one.
    pub fn schedule<H: FrameHost + ?Sized>(&mut self, context: ContextId, host: &mut H) -> FrameHandle {
        if let Some(previous) = self.pending.remove(&context) {
            host.cancel_frame(previous);
            trace!(context = context.0, handle = previous.0, "superseded frame");
        }
        let handle = host.request_frame();
        self.pending.insert(context, handle);
        handle
    }

    /// Claim a fired handle. Returns the context it was scheduled for, or
    /// `None` if the handle is no longer current.
    pub fn fire(&mut self, handle: FrameHandle) -> Option<ContextId> {
        let context = self
            .pending
            .iter()
            .find_map(|(context, pending)| (*pending == handle).then_some(*context))?;
        self.pending.remove(&context);
        Some(context)
    }

    pub fn cancel<H: FrameHost + ?Sized>(&mut self, context: ContextId, host: &mut H) {
        if let Some(handle) = self.pending.remove(&context) {
            host.cancel_frame(handle);
        }
    }

    pub fn cancel_all<H: FrameHost + ?Sized>(&mut self, host: &mut H) {
        for (_, handle) in self.pending.drain() {
            host.cancel_frame(handle);
        }
    }

    pub fn is_pending(&self, context: ContextId) -> bool {
        self.pending.contains_key(&context)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Optional frame-rate cap.
///
/// Frames arriving sooner than `1000 / fps` ms after the last accepted one
/// are skipped; the remainder carries over so the average rate holds.
#[derive(Debug, Clone, Default)]
pub struct FrameThrottle {
    interval_ms: Option<f64>,
    last_ms: Option<f64>,
}

impl FrameThrottle {
    pub fn new(target_fps: Option<u32>) -> Self {
        Self {
            interval_ms: target_fps.filter(|fps| *fps > 0).map(|fps| 1000.0 / fps as f64),
            last_ms: None,
        }
    }

    /// Whether a frame at `now_ms` should run.
    pub fn ready(&mut self, now_ms: f64) -> bool {
        let Some(interval) = self.interval_ms else {
            return true;
        };
        let Some(last) = self.last_ms else {
            self.last_ms = Some(now_ms);
            return true;
        };
        let delta = now_ms - last;
        if delta < interval {
            return false;
        }
        self.last_ms = Some(now_ms - delta % interval);
        true
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}
