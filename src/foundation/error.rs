use crate::foundation::ids::NodeIndex;
use crate::render::backend::BackendKind;

/// Crate-wide result alias.
pub type NglResult<T> = Result<T, NglError>;

/// Result alias used at the backend seam.
pub type BackendResult<T> = Result<T, BackendError>;

/// Integer status codes returned by the handle surface (`0` is success).
pub mod status {
    /// Success.
    pub const OK: i32 = 0;

    /// Scene type name not present in the node registry.
    pub const UNKNOWN_NODE_TYPE: i32 = -10;
    /// Parameter not declared by the node type.
    pub const UNKNOWN_PARAMETER: i32 = -11;
    /// Reference to a node that is not declared earlier in the scene.
    pub const DANGLING_OR_FORWARD_REFERENCE: i32 = -12;
    /// Literal value that does not decode as the parameter's kind.
    pub const MALFORMED_LITERAL: i32 = -13;
    /// Bad metadata comment, or metadata after the first node.
    pub const MALFORMED_METADATA: i32 = -14;
    /// Same parameter given twice on one node.
    pub const DUPLICATE_PARAMETER: i32 = -15;
    /// Required parameter omitted.
    pub const MISSING_PARAMETER: i32 = -16;
    /// Reference to a node of a kind the slot does not accept.
    pub const REFERENCE_TYPE_MISMATCH: i32 = -17;

    /// Invalid configuration value.
    pub const INVALID_CONFIG: i32 = -20;
    /// Backend selector not supported by the backend factory.
    pub const UNSUPPORTED_BACKEND: i32 = -21;

    /// Operation invalid in the current state.
    pub const INVALID_STATE: i32 = -30;
    /// Operation on a released context.
    pub const RELEASED: i32 = -31;
    /// Context creation before process-wide init.
    pub const NOT_INITIALIZED: i32 = -32;

    /// Capture buffer capacity does not match the configured surface.
    pub const CAPTURE_MISMATCH: i32 = -40;
    /// Draw time is not a finite number.
    pub const INVALID_TIME: i32 = -41;
    /// Frame evaluation expanded past the draw-operation budget.
    pub const PLAN_TOO_LARGE: i32 = -42;

    /// Opaque failure reported by the rendering backend.
    pub const BACKEND: i32 = -50;

    /// Handle does not name a live context.
    pub const INVALID_HANDLE: i32 = -60;
}

/// What went wrong while parsing a scene.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("unknown parameter '{param}' for node type {node_type}")]
    UnknownParameter {
        node_type: &'static str,
        param: String,
    },

    #[error(
        "parameter '{param}' references {distance} node(s) back, but only {declared} node(s) are declared before it"
    )]
    DanglingOrForwardReference {
        param: String,
        distance: i64,
        declared: usize,
    },

    #[error("malformed value for '{param}': {reason}")]
    MalformedLiteral { param: String, reason: String },

    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    #[error("parameter '{0}' given more than once")]
    DuplicateParameter(String),

    #[error("node type {node_type} requires parameter '{param}'")]
    MissingParameter {
        node_type: &'static str,
        param: &'static str,
    },

    #[error("parameter '{param}' cannot reference a {found} node (expected {expected})")]
    ReferenceTypeMismatch {
        param: String,
        expected: String,
        found: &'static str,
    },
}

/// Parse failure localized to a 1-based line and column.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("scene parse error at line {line}, column {column}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, column: usize, kind: ParseErrorKind) -> Self {
        Self { line, column, kind }
    }

    pub fn status_code(&self) -> i32 {
        match self.kind {
            ParseErrorKind::UnknownNodeType(_) => status::UNKNOWN_NODE_TYPE,
            ParseErrorKind::UnknownParameter { .. } => status::UNKNOWN_PARAMETER,
            ParseErrorKind::DanglingOrForwardReference { .. } => {
                status::DANGLING_OR_FORWARD_REFERENCE
            }
            ParseErrorKind::MalformedLiteral { .. } => status::MALFORMED_LITERAL,
            ParseErrorKind::MalformedMetadata(_) => status::MALFORMED_METADATA,
            ParseErrorKind::DuplicateParameter(_) => status::DUPLICATE_PARAMETER,
            ParseErrorKind::MissingParameter { .. } => status::MISSING_PARAMETER,
            ParseErrorKind::ReferenceTypeMismatch { .. } => status::REFERENCE_TYPE_MISMATCH,
        }
    }
}

/// Configuration rejected before any state was touched.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid surface dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("backend {0:?} is not supported by this build")]
    UnsupportedBackend(BackendKind),

    #[error("onscreen configuration requires a window handle")]
    MissingWindow,

    #[error("offscreen configuration must not carry a window handle")]
    UnexpectedWindow,

    #[error("unsupported sample count {0} (expected 0, 1, 2, 4 or 8)")]
    InvalidSamples(u32),

    #[error("clear color components must be finite and within [0, 1], got {0:?}")]
    InvalidClearColor([f32; 4]),

    #[error("hud scale must be >= 1, got {0}")]
    InvalidHudScale(u32),
}

/// Operation not valid for the context's current lifecycle state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("{op} requires a configured context")]
    NotConfigured { op: &'static str },

    #[error("{op} called on a released context")]
    Released { op: &'static str },

    #[error("runtime::init must complete before creating a context")]
    NotInitialized,

    #[error("offscreen surfaces are fixed-size and cannot be resized")]
    OffscreenResize,
}

/// Host capture buffer rejected or unusable.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("capture buffer holds {actual} bytes, surface needs {expected}")]
    CapacityMismatch { expected: usize, actual: usize },

    #[error("capture buffer lock poisoned by a panicking reader")]
    Poisoned,
}

/// Opaque failure from the rendering collaborator.
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BackendError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Failure while expanding a scene into a frame plan.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("node {node} expands to {ops} draw operations (limit {limit})")]
    PlanTooLarge {
        node: NodeIndex,
        ops: usize,
        limit: usize,
    },
}

/// Top-level error for every context operation.
#[derive(thiserror::Error, Debug)]
pub enum NglError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("draw time must be finite, got {0}")]
    InvalidTime(f64),

    #[error("no live context for handle {0:#x}")]
    InvalidHandle(u64),
}

impl NglError {
    /// Map this error onto the integer status surface.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Parse(e) => e.status_code(),
            Self::Config(ConfigError::UnsupportedBackend(_)) => status::UNSUPPORTED_BACKEND,
            Self::Config(_) => status::INVALID_CONFIG,
            Self::State(StateError::Released { .. }) => status::RELEASED,
            Self::State(StateError::NotInitialized) => status::NOT_INITIALIZED,
            Self::State(_) => status::INVALID_STATE,
            Self::Capture(_) => status::CAPTURE_MISMATCH,
            Self::Eval(EvalError::PlanTooLarge { .. }) => status::PLAN_TOO_LARGE,
            Self::Backend(_) => status::BACKEND,
            Self::InvalidTime(_) => status::INVALID_TIME,
            Self::InvalidHandle(_) => status::INVALID_HANDLE,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
