use kurbo::{Affine, Point};

use crate::foundation::core::SurfaceSize;
use crate::foundation::ids::NodeIndex;
use crate::scene::model::Node;

/// Parallelogram in normalized device coordinates with its texture mapping.
///
/// A point `(s, t)` in the unit square maps to `corner + s*width + t*height` on the surface and to
/// `uv_corner + s*uv_width + t*uv_height` in the texture. UV `(0, 0)` is the bottom-left texel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadGeom {
    pub corner: [f32; 3],
    pub width: [f32; 3],
    pub height: [f32; 3],
    pub uv_corner: [f32; 2],
    pub uv_width: [f32; 2],
    pub uv_height: [f32; 2],
}

impl QuadGeom {
    /// Quad covering the whole viewport with the full texture.
    pub fn full_viewport() -> Self {
        Self {
            corner: [-1.0, -1.0, 0.0],
            width: [2.0, 0.0, 0.0],
            height: [0.0, 2.0, 0.0],
            uv_corner: [0.0, 0.0],
            uv_width: [1.0, 0.0],
            uv_height: [0.0, 1.0],
        }
    }

    pub(crate) fn from_node(node: &Node) -> Self {
        Self {
            corner: node.vec("corner"),
            width: node.vec("width"),
            height: node.vec("height"),
            uv_corner: node.vec("uv_corner"),
            uv_width: node.vec("uv_width"),
            uv_height: node.vec("uv_height"),
        }
    }

    /// Unit square to surface pixels (origin top-left, y down).
    pub fn surface_affine(&self, size: SurfaceSize) -> Affine {
        let hw = f64::from(size.width) / 2.0;
        let hh = f64::from(size.height) / 2.0;
        let [cx, cy, _] = self.corner.map(f64::from);
        let [wx, wy, _] = self.width.map(f64::from);
        let [hx, hy, _] = self.height.map(f64::from);
        Affine::new([
            hw * wx,
            -hh * wy,
            hw * hx,
            -hh * hy,
            hw * (cx + 1.0),
            hh * (1.0 - cy),
        ])
    }

    /// Unit square to texel space of a `w x h` image (origin top-left, y down).
    pub fn texel_affine(&self, w: u32, h: u32) -> Affine {
        let (w, h) = (f64::from(w), f64::from(h));
        let [ux, uy] = self.uv_corner.map(f64::from);
        let [wx, wy] = self.uv_width.map(f64::from);
        let [hx, hy] = self.uv_height.map(f64::from);
        Affine::new([w * wx, -h * wy, w * hx, -h * hy, w * ux, h * (1.0 - uy)])
    }

    /// Corners in surface pixels, in winding order.
    pub fn surface_corners(&self, size: SurfaceSize) -> [Point; 4] {
        let a = self.surface_affine(size);
        [
            a * Point::new(0.0, 0.0),
            a * Point::new(1.0, 0.0),
            a * Point::new(1.0, 1.0),
            a * Point::new(0.0, 1.0),
        ]
    }
}

/// Where a texture's pixels come from.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    /// Decoded from a media node at a media time.
    Media {
        node: NodeIndex,
        uri: String,
        time: f64,
        /// Request for the audio spectrum texture instead of video frames.
        audio: bool,
    },
    /// Blank surface filled by a render-to-texture pass in the same frame. `None` follows the
    /// output surface size.
    Target { size: Option<SurfaceSize> },
}

/// One draw operation, in paint order.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Flat fill with a straight-alpha color.
    Color {
        node: NodeIndex,
        quad: QuadGeom,
        rgba: [f32; 4],
    },
    /// Textured quad.
    Texture {
        node: NodeIndex,
        texture: NodeIndex,
        source: TextureSource,
        quad: QuadGeom,
    },
    /// Render `ops` into the texture `target` after clearing it.
    RenderToTexture {
        node: NodeIndex,
        target: NodeIndex,
        size: Option<SurfaceSize>,
        clear: [f32; 4],
        ops: Vec<DrawOp>,
    },
}

impl DrawOp {
    pub fn node(&self) -> NodeIndex {
        match self {
            Self::Color { node, .. }
            | Self::Texture { node, .. }
            | Self::RenderToTexture { node, .. } => *node,
        }
    }
}

/// Everything a backend needs to produce one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    /// Draw time in seconds.
    pub time: f64,
    /// Straight-alpha clear color of the output surface.
    pub clear: [f32; 4],
    pub ops: Vec<DrawOp>,
}

impl FramePlan {
    /// Plan that only clears the surface.
    pub fn clear_only(time: f64, clear: [f32; 4]) -> Self {
        Self {
            time,
            clear,
            ops: Vec::new(),
        }
    }

    /// Number of operations, counting nested render-to-texture passes.
    pub fn op_count(&self) -> usize {
        fn count(ops: &[DrawOp]) -> usize {
            ops.iter()
                .map(|op| match op {
                    DrawOp::RenderToTexture { ops, .. } => 1 + count(ops),
                    _ => 1,
                })
                .sum()
        }
        count(&self.ops)
    }
}
