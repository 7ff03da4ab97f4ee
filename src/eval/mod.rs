//! Per-frame evaluation of an immutable scene into a backend-agnostic plan.

pub(crate) mod evaluator;
/// Frame plan types consumed by backends.
pub mod plan;
