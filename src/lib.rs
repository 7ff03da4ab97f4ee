//! scenegl compiles a line-oriented scene-description language into an immutable node graph and
//! renders it through a render-context state machine with host-owned frame capture.
//!
//! The public surface is context-oriented:
//!
//! - Call [`runtime::init`] once per process
//! - Create a [`RenderContext`] (or a [`ContextTable`] for integer handles and status codes)
//! - [`RenderContext::configure`], [`RenderContext::load_scene`], then [`RenderContext::draw`]
//! - Bind a [`CaptureBuffer`] to receive every drawn frame as premultiplied RGBA8
#![forbid(unsafe_code)]

mod foundation;

/// Per-frame evaluation into backend-agnostic plans.
pub mod eval;
/// Rendering backends.
pub mod render;
/// Process-wide initialization.
pub mod runtime;
/// Scene-description language and node graph.
pub mod scene;
/// Render context sessions.
pub mod session;

pub use crate::foundation::core::{
    Rational, SurfaceSize, premul_rgba8, unpremultiply_rgba8_in_place,
};
pub use crate::foundation::error::{
    BackendError, BackendResult, CaptureError, ConfigError, EvalError, NglError, NglResult,
    ParseError, ParseErrorKind, StateError, status,
};
pub use crate::foundation::ids::{ContextHandle, NodeIndex};

pub use crate::eval::evaluator::{FrameState, MAX_FRAME_OPS, NodeState};
pub use crate::eval::plan::{DrawOp, FramePlan, QuadGeom, TextureSource};
pub use crate::render::backend::{
    Backend, BackendFactory, BackendKind, DefaultBackendFactory, SurfaceConfig, WindowHandle,
};
pub use crate::render::media::ContentResolver;
pub use crate::runtime::HostEnv;
pub use crate::scene::model::{Node, NodeRef, Param, ParamValue, Scene, SceneMeta};
pub use crate::scene::registry::{NodeKind, ParamKind};
pub use crate::session::capture::CaptureBuffer;
pub use crate::session::config::Config;
pub use crate::session::context::{ContextState, RenderContext};
pub use crate::session::handles::ContextTable;
