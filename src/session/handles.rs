//! Integer-handle surface over [`RenderContext`].
//!
//! Every operation returns an `i32` status: `0` on success, a negative code from
//! [`crate::status`] otherwise. Handles carry a generation, so a released handle never reaches a
//! context created later in the same slot.

use std::sync::Arc;

use crate::foundation::error::{NglError, NglResult, status};
use crate::foundation::ids::ContextHandle;
use crate::render::backend::{BackendFactory, DefaultBackendFactory};
use crate::session::capture::CaptureBuffer;
use crate::session::config::Config;
use crate::session::context::RenderContext;

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    ctx: Option<RenderContext>,
}

/// Arena of render contexts addressed by [`ContextHandle`].
pub struct ContextTable {
    factory: Arc<dyn BackendFactory>,
    slots: Vec<Slot>,
}

impl Default for ContextTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextTable {
    pub fn new() -> Self {
        Self::with_factory(Arc::new(DefaultBackendFactory::default()))
    }

    pub fn with_factory(factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            factory,
            slots: Vec::new(),
        }
    }

    /// Create a context and return its handle.
    pub fn create(&mut self) -> NglResult<ContextHandle> {
        let ctx = RenderContext::with_factory(self.factory.clone())?;
        let slot = match self.slots.iter().position(|s| s.ctx.is_none()) {
            Some(i) => i,
            None => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        let entry = &mut self.slots[slot];
        entry.ctx = Some(ctx);
        let handle = ContextHandle::new(slot as u32, entry.generation);
        tracing::debug!(handle = handle.as_raw(), "context created");
        Ok(handle)
    }

    /// Live context behind `handle`.
    pub fn get(&self, handle: ContextHandle) -> Option<&RenderContext> {
        let slot = self.slots.get(handle.slot())?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.ctx.as_ref()
    }

    fn get_mut(&mut self, handle: ContextHandle) -> NglResult<&mut RenderContext> {
        self.slots
            .get_mut(handle.slot())
            .filter(|s| s.generation == handle.generation())
            .and_then(|s| s.ctx.as_mut())
            .ok_or(NglError::InvalidHandle(handle.as_raw()))
    }

    fn run(
        &mut self,
        handle: ContextHandle,
        op: impl FnOnce(&mut RenderContext) -> NglResult<()>,
    ) -> i32 {
        match self.get_mut(handle).and_then(op) {
            Ok(()) => status::OK,
            Err(e) => {
                tracing::debug!(handle = handle.as_raw(), error = %e, "operation failed");
                e.status_code()
            }
        }
    }

    pub fn configure(&mut self, handle: ContextHandle, config: Config) -> i32 {
        self.run(handle, |ctx| ctx.configure(config))
    }

    pub fn resize(&mut self, handle: ContextHandle, width: u32, height: u32) -> i32 {
        self.run(handle, |ctx| ctx.resize(width, height))
    }

    pub fn load_scene(&mut self, handle: ContextHandle, text: &str) -> i32 {
        self.run(handle, |ctx| ctx.load_scene(text))
    }

    pub fn reset_scene(&mut self, handle: ContextHandle) -> i32 {
        self.run(handle, RenderContext::reset_scene)
    }

    pub fn draw(&mut self, handle: ContextHandle, time: f64) -> i32 {
        self.run(handle, |ctx| ctx.draw(time))
    }

    pub fn set_capture_buffer(&mut self, handle: ContextHandle, buffer: CaptureBuffer) -> i32 {
        self.run(handle, |ctx| ctx.set_capture_buffer(buffer))
    }

    /// Release and forget the context. Unknown or stale handles are ignored.
    pub fn release(&mut self, handle: ContextHandle) {
        let Some(slot) = self.slots.get_mut(handle.slot()) else {
            return;
        };
        if slot.generation != handle.generation() {
            return;
        }
        if let Some(mut ctx) = slot.ctx.take() {
            ctx.release();
            slot.generation = slot.generation.wrapping_add(1);
        }
    }

    /// Number of live contexts.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.ctx.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ContextTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextTable")
            .field("slots", &self.slots.len())
            .field("live", &self.len())
            .finish()
    }
}
