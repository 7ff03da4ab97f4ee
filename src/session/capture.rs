//! Host-owned capture buffers and the copy-back path.
//!
//! The host allocates a buffer of exactly `width * height * 4` bytes and keeps a handle to it. After
//! every successful draw the context copies the frame in as premultiplied RGBA8, rows top to
//! bottom. The context never reallocates the buffer: a dimension change unbinds it instead.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::foundation::core::SurfaceSize;
use crate::foundation::error::{CaptureError, NglResult};
use crate::render::backend::Backend;

/// Shared handle to a fixed-capacity host buffer.
///
/// Clones share the same storage, so the host keeps reading frames through its own clone.
#[derive(Clone)]
pub struct CaptureBuffer {
    data: Arc<Mutex<Box<[u8]>>>,
    len: usize,
}

impl CaptureBuffer {
    /// Zero-filled buffer of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self::from_vec(vec![0; len])
    }

    /// Buffer sized for one RGBA8 frame of `width x height`.
    pub fn for_size(width: u32, height: u32) -> Self {
        Self::new(SurfaceSize::new(width, height).rgba8_len())
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        Self {
            data: Arc::new(Mutex::new(bytes.into_boxed_slice())),
            len,
        }
    }

    /// Capacity in bytes. Fixed for the life of the buffer.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Run `f` over the current contents.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, CaptureError> {
        Ok(f(&self.lock()?))
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, CaptureError> {
        self.read(<[u8]>::to_vec)
    }

    /// RGBA8 pixel at `(x, y)` of a frame `width` pixels wide.
    pub fn pixel(&self, width: u32, x: u32, y: u32) -> Result<Option<[u8; 4]>, CaptureError> {
        let i = (y as usize * width as usize + x as usize) * 4;
        self.read(|b| b.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]]))
    }

    /// Whether both handles name the same storage.
    pub fn same_buffer(&self, other: &CaptureBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<[u8]>>, CaptureError> {
        self.data.lock().map_err(|_| CaptureError::Poisoned)
    }
}

impl PartialEq for CaptureBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.same_buffer(other)
    }
}

impl std::fmt::Debug for CaptureBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureBuffer")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Binding {
    buffer: CaptureBuffer,
    size: SurfaceSize,
}

/// Binding between a context and at most one capture buffer.
#[derive(Debug, Default)]
pub(crate) struct CapturePipeline {
    bound: Option<Binding>,
    staging: Vec<u8>,
}

impl CapturePipeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn check_capacity(
        buffer: &CaptureBuffer,
        size: SurfaceSize,
    ) -> Result<(), CaptureError> {
        let expected = size.rgba8_len();
        if buffer.len() != expected {
            return Err(CaptureError::CapacityMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        Ok(())
    }

    /// Bind `buffer` for frames of `size`. On failure the previous binding is kept.
    pub(crate) fn bind(
        &mut self,
        buffer: CaptureBuffer,
        size: SurfaceSize,
    ) -> Result<(), CaptureError> {
        Self::check_capacity(&buffer, size)?;
        self.bound = Some(Binding { buffer, size });
        Ok(())
    }

    pub(crate) fn unbind(&mut self) {
        self.bound = None;
        self.staging = Vec::new();
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    pub(crate) fn buffer(&self) -> Option<&CaptureBuffer> {
        self.bound.as_ref().map(|b| &b.buffer)
    }

    /// Surface changed size: drop a binding that no longer fits.
    pub(crate) fn on_resize(&mut self, size: SurfaceSize) {
        if let Some(b) = &self.bound
            && b.size != size
        {
            tracing::debug!(
                from = ?b.size,
                to = ?size,
                "surface size changed; unbinding capture buffer"
            );
            self.unbind();
        }
    }

    /// Copy the presented frame into the bound buffer. Returns whether a copy happened.
    ///
    /// Pixels are read into a staging area first, so a failing backend leaves the host buffer as
    /// it was.
    pub(crate) fn copy_from(
        &mut self,
        backend: &mut dyn Backend,
        size: SurfaceSize,
    ) -> NglResult<bool> {
        let Some(binding) = &self.bound else {
            return Ok(false);
        };
        if binding.size != size {
            return Ok(false);
        }
        let len = binding.buffer.len();
        self.staging.resize(len, 0);
        backend.read_pixels(&mut self.staging)?;

        let mut dst = binding.buffer.lock()?;
        dst.copy_from_slice(&self.staging);
        Ok(true)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/capture.rs"]
mod tests;
