use crate::eval::plan::FramePlan;
use crate::foundation::core::SurfaceSize;
use crate::foundation::error::{BackendError, BackendResult};

/// Rendering API selector.
///
/// Integer codes are stable: `Auto` 0, `OpenGL` 1, `OpenGLES` 2, `Vulkan` 3.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Let the factory pick. The default factory resolves this to the CPU backend.
    #[default]
    Auto,
    #[serde(rename = "opengl")]
    OpenGL,
    #[serde(rename = "opengles")]
    OpenGLES,
    Vulkan,
}

impl BackendKind {
    pub fn code(self) -> i32 {
        match self {
            Self::Auto => 0,
            Self::OpenGL => 1,
            Self::OpenGLES => 2,
            Self::Vulkan => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Auto),
            1 => Some(Self::OpenGL),
            2 => Some(Self::OpenGLES),
            3 => Some(Self::Vulkan),
            _ => None,
        }
    }
}

/// Opaque host window handle, passed through to onscreen backends untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(pub u64);

/// The subset of a configuration a backend needs to set up its surface.
#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceConfig {
    pub size: SurfaceSize,
    pub offscreen: bool,
    pub window: Option<WindowHandle>,
    pub samples: u32,
    /// Straight-alpha clear color.
    pub clear_color: [f32; 4],
    pub hud: bool,
    pub hud_scale: u32,
}

/// Rendering collaborator driven by a render context.
///
/// Calls arrive in lifecycle order: `initialize` once, then any number of `resize` and
/// `evaluate_graph`/`present`/`read_pixels` rounds, then `release`. Every method except `release`
/// may fail; the context surfaces failures without retrying.
pub trait Backend: Send {
    fn kind(&self) -> BackendKind;

    fn initialize(&mut self, cfg: &SurfaceConfig) -> BackendResult<()>;

    fn resize(&mut self, width: u32, height: u32) -> BackendResult<()>;

    /// Execute a frame plan into the backend's framebuffer.
    fn evaluate_graph(&mut self, plan: &FramePlan) -> BackendResult<()>;

    /// Finish the frame. `pts` is the presentation time when the host asked for it.
    fn present(&mut self, pts: Option<f64>) -> BackendResult<()>;

    /// Copy the last presented frame as premultiplied RGBA8, rows top to bottom.
    fn read_pixels(&mut self, dst: &mut [u8]) -> BackendResult<()>;

    fn release(&mut self);
}

/// Creates backends for the selectors it supports.
pub trait BackendFactory: Send + Sync {
    fn supports(&self, kind: BackendKind) -> bool;

    fn create(&self, kind: BackendKind) -> BackendResult<Box<dyn Backend>>;
}

/// Factory shipped with the crate: `Auto` maps to the CPU raster backend.
#[derive(Clone, Debug, Default)]
pub struct DefaultBackendFactory {
    /// Worker threads for the CPU backend's pixel pool. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

impl BackendFactory for DefaultBackendFactory {
    fn supports(&self, kind: BackendKind) -> bool {
        kind == BackendKind::Auto
    }

    fn create(&self, kind: BackendKind) -> BackendResult<Box<dyn Backend>> {
        match kind {
            BackendKind::Auto => Ok(Box::new(crate::render::cpu::CpuBackend::new(
                self.threads,
            )?)),
            other => Err(BackendError::failed(format!(
                "no {other:?} backend in this build"
            ))),
        }
    }
}
