//! Media loading for the CPU backend.
//!
//! URIs with the `content://` scheme go through the host content resolver registered at
//! [`crate::runtime::init`]; `file://` URIs and plain paths are read from the file system. Only
//! still images decode here; anything `image` cannot read fails the frame.

use anyhow::Context as _;

use crate::foundation::core::premultiply_rgba8_in_place;
use crate::foundation::error::{BackendError, BackendResult};

/// Host hook that opens `content://` URIs.
pub trait ContentResolver: Send + Sync {
    fn read(&self, uri: &str) -> anyhow::Result<Vec<u8>>;
}

/// Decoded still image, premultiplied RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DecodedImage {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rgba8_premul: Vec<u8>,
}

/// Cache key for a media URI.
pub(crate) fn media_key(uri: &str) -> u64 {
    xxhash_rust::xxh3::xxh3_64(uri.as_bytes())
}

pub(crate) fn read_media(uri: &str) -> BackendResult<Vec<u8>> {
    if uri.starts_with("content://") {
        let resolver = crate::runtime::content_resolver().ok_or_else(|| {
            BackendError::failed(format!("no content resolver registered for '{uri}'"))
        })?;
        return resolver
            .read(uri)
            .with_context(|| format!("resolve '{uri}'"))
            .map_err(BackendError::from);
    }
    let path = uri.strip_prefix("file://").unwrap_or(uri);
    std::fs::read(path)
        .with_context(|| format!("read media '{path}'"))
        .map_err(BackendError::from)
}

pub(crate) fn decode_image(bytes: &[u8]) -> BackendResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(DecodedImage {
        width,
        height,
        rgba8_premul,
    })
}
