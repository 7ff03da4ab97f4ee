use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;

use crate::eval::plan::{DrawOp, FramePlan, QuadGeom, TextureSource};
use crate::foundation::core::{SurfaceSize, premul_rgba8};
use crate::foundation::error::{BackendError, BackendResult};
use crate::foundation::ids::NodeIndex;
use crate::render::backend::{Backend, BackendKind, SurfaceConfig};
use crate::render::media::{decode_image, media_key, read_media};

/// Height of one HUD row in pixels at scale 1.
const HUD_ROW_PX: u32 = 8;

/// Largest pixmap the backend allocates (8192 x 8192, 256 MiB of RGBA8).
const MAX_PIXMAP_PIXELS: u64 = 1 << 26;

#[derive(Clone)]
struct ImagePaint {
    paint: vello_cpu::Image,
    w: u32,
    h: u32,
}

/// CPU raster backend powered by `vello_cpu`.
///
/// Renders into an owned framebuffer; `read_pixels` copies it out on a dedicated rayon pool.
pub(crate) struct CpuBackend {
    pool: rayon::ThreadPool,
    cfg: Option<SurfaceConfig>,
    ctx: Option<vello_cpu::RenderContext>,

    frame: Option<vello_cpu::Pixmap>,
    presented: bool,

    media_cache: HashMap<u64, ImagePaint>,
    targets: HashMap<NodeIndex, ImagePaint>,
}

impl CpuBackend {
    pub(crate) fn new(threads: Option<usize>) -> BackendResult<Self> {
        Ok(Self {
            pool: build_thread_pool(threads)?,
            cfg: None,
            ctx: None,
            frame: None,
            presented: false,
            media_cache: HashMap::new(),
            targets: HashMap::new(),
        })
    }

    fn size(&self) -> BackendResult<SurfaceSize> {
        self.cfg
            .as_ref()
            .map(|c| c.size)
            .ok_or_else(|| BackendError::failed("cpu backend is not initialized"))
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> BackendResult<R>,
    ) -> BackendResult<R> {
        let mut ctx = match self.ctx.take() {
            None => vello_cpu::RenderContext::new(width, height),
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            Some(_) => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(self, &mut ctx)?;
        self.ctx = Some(ctx);
        Ok(out)
    }

    fn media_paint(&mut self, uri: &str) -> BackendResult<ImagePaint> {
        let key = media_key(uri);
        if let Some(p) = self.media_cache.get(&key) {
            return Ok(p.clone());
        }
        let bytes = read_media(uri)?;
        let decoded = decode_image(&bytes)?;
        let pixmap =
            pixmap_from_premul_bytes(&decoded.rgba8_premul, decoded.width, decoded.height)?;
        let out = ImagePaint {
            paint: image_paint(pixmap),
            w: decoded.width,
            h: decoded.height,
        };
        tracing::debug!(uri, w = out.w, h = out.h, "decoded media");
        self.media_cache.insert(key, out.clone());
        Ok(out)
    }

    fn texture_paint(
        &mut self,
        texture: NodeIndex,
        source: &TextureSource,
    ) -> BackendResult<Option<ImagePaint>> {
        if let Some(p) = self.targets.get(&texture) {
            return Ok(Some(p.clone()));
        }
        match source {
            TextureSource::Media { audio: true, .. } => Err(BackendError::failed(
                "audio textures are not supported by the cpu backend",
            )),
            TextureSource::Media { uri, .. } => self.media_paint(uri).map(Some),
            // Never rendered this frame: transparent.
            TextureSource::Target { .. } => Ok(None),
        }
    }

    /// Draw `ops` over the current contents of `dst`.
    fn render_ops(
        &mut self,
        ops: &[DrawOp],
        size: SurfaceSize,
        dst: &mut vello_cpu::Pixmap,
    ) -> BackendResult<()> {
        let mut i = 0;
        while i < ops.len() {
            if let DrawOp::RenderToTexture {
                target,
                size: target_size,
                clear,
                ops: child,
                ..
            } = &ops[i]
            {
                let ts = target_size.unwrap_or(size);
                let mut pm = new_pixmap(ts)?;
                clear_pixmap(&mut pm, premul_rgba8(*clear));
                self.render_ops(child, ts, &mut pm)?;
                self.targets.insert(
                    *target,
                    ImagePaint {
                        paint: image_paint(pm),
                        w: ts.width,
                        h: ts.height,
                    },
                );
                i += 1;
                continue;
            }

            let end = ops[i..]
                .iter()
                .position(|op| matches!(op, DrawOp::RenderToTexture { .. }))
                .map_or(ops.len(), |p| i + p);
            let batch = &ops[i..end];

            let mut paints = Vec::with_capacity(batch.len());
            for op in batch {
                paints.push(match op {
                    DrawOp::Texture {
                        texture, source, ..
                    } => self.texture_paint(*texture, source)?,
                    _ => None,
                });
            }

            // `vello_cpu` renders into a fresh buffer; accumulate with premul-over.
            let mut tmp = new_pixmap(size)?;
            self.with_ctx_mut(dst.width(), dst.height(), |_, ctx| {
                for (op, paint) in batch.iter().zip(&paints) {
                    draw_op(ctx, size, op, paint.as_ref());
                }
                ctx.flush();
                ctx.render_to_pixmap(&mut tmp);
                Ok(())
            })?;
            premul_over_in_place(dst.data_as_u8_slice_mut(), tmp.data_as_u8_slice())?;
            i = end;
        }
        Ok(())
    }

    fn draw_hud(
        &mut self,
        cfg: &SurfaceConfig,
        plan: &FramePlan,
        dst: &mut vello_cpu::Pixmap,
    ) -> BackendResult<()> {
        let s = f64::from(cfg.hud_scale.max(1));
        let w = f64::from(cfg.size.width);
        let row = (f64::from(HUD_ROW_PX) * s).min(f64::from(cfg.size.height));
        let block = row / 2.0;
        let fit = ((w - block) / (block * 1.5)).max(0.0) as usize;

        let mut tmp = new_pixmap(cfg.size)?;
        self.with_ctx_mut(dst.width(), dst.height(), |_, ctx| {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 160));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, row));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(64, 220, 96, 255));
            for k in 0..plan.op_count().min(fit) {
                let x = block / 2.0 + k as f64 * block * 1.5;
                let y = (row - block) / 2.0;
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(x, y, x + block, y + block));
            }
            ctx.flush();
            ctx.render_to_pixmap(&mut tmp);
            Ok(())
        })?;
        premul_over_in_place(dst.data_as_u8_slice_mut(), tmp.data_as_u8_slice())
    }
}

impl Backend for CpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Auto
    }

    fn initialize(&mut self, cfg: &SurfaceConfig) -> BackendResult<()> {
        let frame = new_pixmap(cfg.size)?;
        if cfg.samples > 1 {
            tracing::debug!(samples = cfg.samples, "cpu backend ignores multisampling");
        }
        if cfg.window.is_some() {
            tracing::debug!("cpu backend renders offscreen; host presents the window");
        }
        self.frame = Some(frame);
        self.presented = false;
        self.targets.clear();
        self.cfg = Some(cfg.clone());
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> BackendResult<()> {
        let size = SurfaceSize::new(width, height);
        let frame = new_pixmap(size)?;
        let cfg = self
            .cfg
            .as_mut()
            .ok_or_else(|| BackendError::failed("resize before initialize"))?;
        cfg.size = size;
        self.frame = Some(frame);
        self.presented = false;
        Ok(())
    }

    fn evaluate_graph(&mut self, plan: &FramePlan) -> BackendResult<()> {
        let size = self.size()?;
        let mut dst = match self.frame.take() {
            Some(pm) if u32::from(pm.width()) == size.width
                && u32::from(pm.height()) == size.height =>
            {
                pm
            }
            _ => new_pixmap(size)?,
        };
        clear_pixmap(&mut dst, premul_rgba8(plan.clear));
        self.targets.clear();
        self.presented = false;

        let result = self.render_ops(&plan.ops, size, &mut dst).and_then(|()| {
            match self.cfg.clone() {
                Some(cfg) if cfg.hud => self.draw_hud(&cfg, plan, &mut dst),
                _ => Ok(()),
            }
        });
        self.frame = Some(dst);
        result
    }

    fn present(&mut self, pts: Option<f64>) -> BackendResult<()> {
        if self.frame.is_none() {
            return Err(BackendError::failed("present before evaluate_graph"));
        }
        if let Some(pts) = pts {
            tracing::trace!(pts, "present");
        }
        self.presented = true;
        Ok(())
    }

    fn read_pixels(&mut self, dst: &mut [u8]) -> BackendResult<()> {
        let frame = match &self.frame {
            Some(f) if self.presented => f,
            _ => return Err(BackendError::failed("no presented frame to read")),
        };
        let src = frame.data_as_u8_slice();
        if dst.len() != src.len() {
            return Err(BackendError::failed(format!(
                "read_pixels destination holds {} bytes, frame has {}",
                dst.len(),
                src.len()
            )));
        }
        let row = usize::from(frame.width()) * 4;
        self.pool.install(|| {
            dst.par_chunks_mut(row)
                .zip(src.par_chunks(row))
                .for_each(|(d, s)| d.copy_from_slice(s));
        });
        Ok(())
    }

    fn release(&mut self) {
        self.ctx = None;
        self.frame = None;
        self.cfg = None;
        self.presented = false;
        self.media_cache.clear();
        self.targets.clear();
    }
}

fn draw_op(
    ctx: &mut vello_cpu::RenderContext,
    size: SurfaceSize,
    op: &DrawOp,
    paint: Option<&ImagePaint>,
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    match op {
        DrawOp::Color { quad, rgba, .. } => {
            let [r, g, b, a] = rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            ctx.fill_path(&quad_path(quad, size));
        }
        DrawOp::Texture { quad, .. } => {
            let Some(p) = paint else { return };
            let texel = quad.texel_affine(p.w, p.h);
            let surface = quad.surface_affine(size);
            if texel.determinant() == 0.0 || surface.determinant() == 0.0 {
                return;
            }
            ctx.set_paint_transform(affine_to_cpu(surface * texel.inverse()));
            ctx.set_paint(p.paint.clone());
            ctx.fill_path(&quad_path(quad, size));
        }
        DrawOp::RenderToTexture { .. } => {}
    }
}

fn quad_path(quad: &QuadGeom, size: SurfaceSize) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    for (i, p) in quad.surface_corners(size).into_iter().enumerate() {
        let p = vello_cpu::kurbo::Point::new(p.x, p.y);
        if i == 0 {
            out.move_to(p);
        } else {
            out.line_to(p);
        }
    }
    out.close_path();
    out
}

fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn build_thread_pool(threads: Option<usize>) -> BackendResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(BackendError::failed("cpu backend 'threads' must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| BackendError::failed(format!("failed to build rayon thread pool: {e}")))
}

fn new_pixmap(size: SurfaceSize) -> BackendResult<vello_cpu::Pixmap> {
    let (w, h) = pixmap_dims(size.width, size.height)?;
    Ok(vello_cpu::Pixmap::new(w, h))
}

fn pixmap_dims(width: u32, height: u32) -> BackendResult<(u16, u16)> {
    let w: u16 = width
        .try_into()
        .map_err(|_| BackendError::failed("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| BackendError::failed("pixmap height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(BackendError::failed("pixmap dimensions must be non-zero"));
    }
    if u64::from(width) * u64::from(height) > MAX_PIXMAP_PIXELS {
        return Err(BackendError::failed(format!(
            "pixmap {width}x{height} exceeds the {MAX_PIXMAP_PIXELS}-pixel limit"
        )));
    }
    Ok((w, h))
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> BackendResult<vello_cpu::Pixmap> {
    let (w, h) = pixmap_dims(width, height)?;
    if bytes.len() != SurfaceSize::new(width, height).rgba8_len() {
        return Err(BackendError::failed("pixmap byte len mismatch"));
    }
    let pixels = bytes
        .chunks_exact(4)
        .map(|px| {
            vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]])
        })
        .collect::<Vec<_>>();
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

fn image_paint(pixmap: vello_cpu::Pixmap) -> vello_cpu::Image {
    vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    }
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    for px in pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn premul_over_in_place(dst: &mut [u8], src: &[u8]) -> BackendResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(BackendError::failed(
            "premul_over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = u16::from(s[3]);
        if sa == 0 {
            continue;
        }
        let inv = 255 - sa;
        d[3] = s[3].saturating_add(mul_div255_u8(u16::from(d[3]), inv));
        for c in 0..3 {
            d[c] = s[c].saturating_add(mul_div255_u8(u16::from(d[c]), inv));
        }
    }
    Ok(())
}

fn mul_div255_u8(x: u16, y: u16) -> u8 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u8
}
