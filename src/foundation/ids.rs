use std::fmt;

/// 1-based position of a node in its scene's declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    /// Zero-based slot of this node inside `Scene::nodes`.
    pub fn slot(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle naming a context inside a [`crate::ContextTable`].
///
/// Packs a slot and a generation so a stale handle never aliases a newer context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub(crate) u64);

impl ContextHandle {
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        Self((u64::from(generation) << 32) | u64::from(slot))
    }

    pub(crate) fn slot(self) -> usize {
        (self.0 & 0xffff_ffff) as usize
    }

    pub(crate) fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw integer form, suitable for crossing a language boundary.
    pub fn as_raw(self) -> u64 {
        self.0
    }

    /// Rebuild a handle from its raw form. Unknown values are rejected by the table.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}
