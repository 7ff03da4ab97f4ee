//! Rendering backends.
//!
//! The crate drives rendering through the [`backend::Backend`] trait and ships one implementation,
//! a CPU rasterizer built on `vello_cpu`.

/// Backend trait, selector and factory.
pub mod backend;
pub(crate) mod cpu;
/// Media resolution and decoding.
pub mod media;
