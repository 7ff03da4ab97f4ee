use std::sync::Arc;

use crate::eval::evaluator::{Evaluator, FrameState};
use crate::eval::plan::FramePlan;
use crate::foundation::core::SurfaceSize;
use crate::foundation::error::{NglError, NglResult, StateError};
use crate::render::backend::{Backend, BackendFactory, DefaultBackendFactory};
use crate::scene::model::Scene;
use crate::session::capture::{CaptureBuffer, CapturePipeline};
use crate::session::config::Config;

/// Lifecycle state of a [`RenderContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    /// Created, never successfully configured.
    Created,
    /// Holds a valid configuration and a live backend.
    Configured,
    /// Released; every later operation fails.
    Released,
}

/// Per-session render context.
///
/// Owns at most one configuration, scene, capture binding and backend, and sequences them through
/// `configure -> (resize | load_scene | draw | set_capture_buffer)* -> release`. Every operation
/// validates its input and the current state before mutating anything, so a failed call leaves
/// the context exactly as it was.
pub struct RenderContext {
    state: ContextState,
    factory: Arc<dyn BackendFactory>,

    config: Option<Config>,
    backend: Option<Box<dyn Backend>>,
    scene: Option<Arc<Scene>>,
    evaluator: Evaluator,
    capture: CapturePipeline,

    frame_count: u64,
    last_time: Option<f64>,
}

impl RenderContext {
    /// Create a context using the built-in backend factory.
    ///
    /// Fails with [`StateError::NotInitialized`] until [`crate::runtime::init`] has run.
    pub fn new() -> NglResult<Self> {
        Self::with_factory(Arc::new(DefaultBackendFactory::default()))
    }

    /// Create a context whose backends come from `factory`.
    pub fn with_factory(factory: Arc<dyn BackendFactory>) -> NglResult<Self> {
        if !crate::runtime::is_initialized() {
            return Err(StateError::NotInitialized.into());
        }
        Ok(Self {
            state: ContextState::Created,
            factory,
            config: None,
            backend: None,
            scene: None,
            evaluator: Evaluator::new(),
            capture: CapturePipeline::new(),
            frame_count: 0,
            last_time: None,
        })
    }

    fn ensure_configured(&self, op: &'static str) -> NglResult<()> {
        match self.state {
            ContextState::Configured => Ok(()),
            ContextState::Created => Err(StateError::NotConfigured { op }.into()),
            ContextState::Released => Err(StateError::Released { op }.into()),
        }
    }

    fn configured_parts(&mut self, op: &'static str) -> NglResult<(&Config, &mut dyn Backend)> {
        self.ensure_configured(op)?;
        match (&self.config, &mut self.backend) {
            (Some(cfg), Some(backend)) => Ok((cfg, backend.as_mut())),
            _ => Err(StateError::NotConfigured { op }.into()),
        }
    }

    /// Apply a configuration, replacing the current one.
    ///
    /// The new backend is created and initialized before the old one is released; any failure
    /// leaves the previous configuration in place. The active scene survives a reconfigure, its
    /// per-node frame state does not. A bound capture buffer survives only when the dimensions
    /// are unchanged; a buffer embedded in `config` becomes the new binding.
    #[tracing::instrument(
        skip(self, config),
        fields(backend = ?config.backend, width = config.width, height = config.height)
    )]
    pub fn configure(&mut self, mut config: Config) -> NglResult<()> {
        if self.state == ContextState::Released {
            return Err(StateError::Released { op: "configure" }.into());
        }
        config.validate(self.factory.as_ref())?;
        let size = config.size();
        let embedded = config.capture_buffer.take();
        if let Some(buf) = &embedded {
            CapturePipeline::check_capacity(buf, size)?;
        }

        let mut backend = self.factory.create(config.backend)?;
        if let Err(e) = backend.initialize(&config.surface_config()) {
            backend.release();
            return Err(e.into());
        }

        if let Some(mut old) = self.backend.replace(backend) {
            old.release();
        }
        match embedded {
            Some(buf) => self.capture.bind(buf, size)?,
            None => self.capture.on_resize(size),
        }
        self.evaluator.reset();
        self.last_time = None;
        self.config = Some(config);
        self.state = ContextState::Configured;
        tracing::info!("context configured");
        Ok(())
    }

    /// Resize an onscreen surface. Offscreen surfaces are fixed-size and reject this.
    #[tracing::instrument(skip(self))]
    pub fn resize(&mut self, width: u32, height: u32) -> NglResult<()> {
        let (cfg, backend) = self.configured_parts("resize")?;
        if cfg.offscreen {
            return Err(StateError::OffscreenResize.into());
        }
        let size = SurfaceSize::non_zero(width, height)?;
        if size == cfg.size() {
            return Ok(());
        }
        backend.resize(width, height)?;

        if let Some(cfg) = self.config.as_mut() {
            cfg.width = width;
            cfg.height = height;
        }
        self.capture.on_resize(size);
        Ok(())
    }

    /// Parse `text` and make it the active scene. A parse failure keeps the previous scene.
    #[tracing::instrument(skip(self, text), fields(bytes = text.len()))]
    pub fn load_scene(&mut self, text: &str) -> NglResult<()> {
        self.ensure_configured("load_scene")?;
        let scene = Scene::parse(text).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected scene; keeping the active one");
        })?;
        self.install_scene(Arc::new(scene));
        Ok(())
    }

    /// Make an already parsed scene the active one.
    pub fn load_scene_graph(&mut self, scene: Arc<Scene>) -> NglResult<()> {
        self.ensure_configured("load_scene_graph")?;
        self.install_scene(scene);
        Ok(())
    }

    fn install_scene(&mut self, scene: Arc<Scene>) {
        tracing::debug!(
            nodes = scene.len(),
            fingerprint = scene.fingerprint(),
            "scene installed"
        );
        self.scene = Some(scene);
        self.evaluator.reset();
        self.last_time = None;
    }

    /// Drop the active scene; later draws render only the clear color.
    pub fn reset_scene(&mut self) -> NglResult<()> {
        self.ensure_configured("reset_scene")?;
        self.scene = None;
        self.evaluator.reset();
        self.last_time = None;
        Ok(())
    }

    /// Render the frame at `time` seconds and copy it into the bound capture buffer.
    ///
    /// Timestamps may go backward; that is treated as a seek. A backend failure is returned as is,
    /// without retry, and the capture buffer keeps its previous contents.
    #[tracing::instrument(skip(self))]
    pub fn draw(&mut self, time: f64) -> NglResult<()> {
        self.ensure_configured("draw")?;
        if !time.is_finite() {
            return Err(NglError::InvalidTime(time));
        }
        if let Some(prev) = self.last_time
            && time < prev
        {
            tracing::debug!(from = prev, to = time, "non-monotonic draw time");
        }

        let (Some(cfg), Some(backend)) = (&self.config, &mut self.backend) else {
            return Err(StateError::NotConfigured { op: "draw" }.into());
        };
        let plan = match self.scene.as_deref() {
            Some(scene) => self.evaluator.eval_frame(scene, time, cfg.clear_color)?,
            None => FramePlan::clear_only(time, cfg.clear_color),
        };
        backend.evaluate_graph(&plan)?;
        backend.present(cfg.set_surface_pts.then_some(time))?;
        self.capture.copy_from(backend.as_mut(), cfg.size())?;

        self.frame_count += 1;
        self.last_time = Some(time);
        Ok(())
    }

    /// Bind a host buffer of exactly `width * height * 4` bytes. On failure the previous binding
    /// is kept.
    pub fn set_capture_buffer(&mut self, buffer: CaptureBuffer) -> NglResult<()> {
        let (cfg, _) = self.configured_parts("set_capture_buffer")?;
        let size = cfg.size();
        self.capture.bind(buffer, size)?;
        Ok(())
    }

    pub fn unbind_capture_buffer(&mut self) -> NglResult<()> {
        self.ensure_configured("unbind_capture_buffer")?;
        self.capture.unbind();
        Ok(())
    }

    /// Free the backend and drop the scene, configuration and capture binding.
    ///
    /// Idempotent and infallible.
    pub fn release(&mut self) {
        if self.state == ContextState::Released {
            return;
        }
        if let Some(mut backend) = self.backend.take() {
            backend.release();
        }
        self.scene = None;
        self.config = None;
        self.capture.unbind();
        self.evaluator.reset();
        self.state = ContextState::Released;
        tracing::debug!(frames = self.frame_count, "context released");
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Current surface size, once configured.
    pub fn size(&self) -> Option<SurfaceSize> {
        self.config.as_ref().map(Config::size)
    }

    pub fn clear_color(&self) -> Option<[f32; 4]> {
        self.config.as_ref().map(|c| c.clear_color)
    }

    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    pub fn scene(&self) -> Option<&Arc<Scene>> {
        self.scene.as_ref()
    }

    pub fn has_capture_buffer(&self) -> bool {
        self.capture.is_bound()
    }

    pub fn capture_buffer(&self) -> Option<&CaptureBuffer> {
        self.capture.buffer()
    }

    /// Successful draws since the context was created.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Per-node state of the active scene.
    pub fn frame_state(&self) -> &FrameState {
        self.evaluator.state()
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("state", &self.state)
            .field("size", &self.size())
            .field("scene_nodes", &self.scene.as_ref().map(|s| s.len()))
            .field("capture_bound", &self.capture.is_bound())
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/context.rs"]
mod tests;
