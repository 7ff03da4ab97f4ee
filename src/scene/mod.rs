//! Scene-description language and the immutable node graph it compiles to.

pub(crate) mod lexer;
/// Node graph types.
pub mod model;
pub(crate) mod parser;
/// Node-type registry and parameter schemas.
pub mod registry;
mod serialize;
