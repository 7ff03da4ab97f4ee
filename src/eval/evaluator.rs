use std::collections::BTreeMap;

use crate::eval::plan::{DrawOp, FramePlan, QuadGeom, TextureSource};
use crate::foundation::core::SurfaceSize;
use crate::foundation::error::EvalError;
use crate::foundation::ids::NodeIndex;
use crate::scene::model::{Node, Scene};
use crate::scene::registry::NodeKind;

/// Mutable per-node state carried between frames, keyed by node index.
///
/// The scene itself stays immutable; everything that changes from one draw to the next lives here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameState {
    nodes: BTreeMap<NodeIndex, NodeState>,
    frames: u64,
}

/// State of one node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeState {
    /// Media time of the previous frame, for media nodes.
    pub last_time: Option<f64>,
    /// Backward time jumps observed on a media node.
    pub seeks: u64,
    /// Frames in which a drawable node emitted operations.
    pub draws: u64,
}

impl FrameState {
    pub fn node(&self, index: NodeIndex) -> Option<&NodeState> {
        self.nodes.get(&index)
    }

    /// Frames evaluated since the last reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.frames = 0;
    }
}

/// Upper bound on draw operations in one frame plan, nested render-to-texture ops included.
pub const MAX_FRAME_OPS: usize = 1 << 16;

/// What an already evaluated node offers to the nodes that reference it.
#[derive(Debug, Clone)]
enum Output {
    None,
    Media {
        uri: String,
        time: f64,
        audio: bool,
    },
    Texture(TextureSource),
    Quad(QuadGeom),
    /// `weight` counts every op in `ops`, recursively through render-to-texture children.
    Draw { ops: Vec<DrawOp>, weight: usize },
}

impl Output {
    fn empty_draw() -> Self {
        Self::Draw {
            ops: Vec::new(),
            weight: 0,
        }
    }
}

/// State changes of one frame, applied only once the whole plan is built.
#[derive(Debug, Default)]
struct Pending {
    media: Vec<(NodeIndex, f64)>,
    drawn: Vec<NodeIndex>,
}

/// Walks a scene in ascending index order and emits the draw operations of its root.
#[derive(Debug, Default)]
pub(crate) struct Evaluator {
    state: FrameState,
    outputs: Vec<Output>,
}

impl Evaluator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state(&self) -> &FrameState {
        &self.state
    }

    /// Drop per-node state; the next frame starts from scratch.
    pub(crate) fn reset(&mut self) {
        self.state.clear();
        self.outputs.clear();
    }

    /// Build the plan for `time`. Fails without touching per-node state when the plan would
    /// exceed [`MAX_FRAME_OPS`].
    pub(crate) fn eval_frame(
        &mut self,
        scene: &Scene,
        time: f64,
        clear: [f32; 4],
    ) -> Result<FramePlan, EvalError> {
        self.outputs.clear();
        self.outputs.reserve(scene.len());

        let mut pending = Pending::default();
        let walked = scene.nodes().iter().try_for_each(|node| {
            let out = self.eval_node(node, time, &mut pending)?;
            self.outputs.push(out);
            Ok(())
        });
        let ops = match walked {
            Ok(()) => match self.outputs.pop() {
                Some(Output::Draw { ops, .. }) => ops,
                _ => Vec::new(),
            },
            Err(e) => {
                self.outputs.clear();
                tracing::warn!(error = %e, "frame plan rejected");
                return Err(e);
            }
        };
        self.outputs.clear();
        self.commit(pending);

        Ok(FramePlan { time, clear, ops })
    }

    fn commit(&mut self, pending: Pending) {
        for (index, time) in pending.media {
            let st = self.state.nodes.entry(index).or_default();
            if let Some(prev) = st.last_time
                && time < prev
            {
                st.seeks += 1;
                tracing::debug!(node = %index, from = prev, to = time, "media seek");
            }
            st.last_time = Some(time);
        }
        for index in pending.drawn {
            self.state.nodes.entry(index).or_default().draws += 1;
        }
        self.state.frames += 1;
    }

    fn output(&self, index: Option<NodeIndex>) -> Option<&Output> {
        let index = index?;
        self.outputs.get(index.slot())
    }

    fn draw_output(&self, index: NodeIndex) -> Option<(&[DrawOp], usize)> {
        match self.output(Some(index)) {
            Some(Output::Draw { ops, weight }) => Some((ops.as_slice(), *weight)),
            _ => None,
        }
    }

    fn quad(&self, node: &Node, param: &str) -> QuadGeom {
        match self.output(node.reference(param)) {
            Some(Output::Quad(q)) => *q,
            _ => QuadGeom::full_viewport(),
        }
    }

    fn eval_node(
        &self,
        node: &Node,
        time: f64,
        pending: &mut Pending,
    ) -> Result<Output, EvalError> {
        let out = match node.kind {
            NodeKind::Media => {
                pending.media.push((node.index, time));
                match node.str("filename") {
                    Some(uri) => Output::Media {
                        uri: uri.to_owned(),
                        time,
                        audio: node.bool("audio_tex"),
                    },
                    None => Output::None,
                }
            }
            NodeKind::Texture2D => {
                let src = node.reference("data_src");
                let source = match (src, self.output(src)) {
                    (Some(src), Some(Output::Media { uri, time, audio })) => {
                        TextureSource::Media {
                            node: src,
                            uri: uri.clone(),
                            time: *time,
                            audio: *audio,
                        }
                    }
                    _ => TextureSource::Target {
                        size: explicit_size(node),
                    },
                };
                Output::Texture(source)
            }
            NodeKind::Quad => Output::Quad(QuadGeom::from_node(node)),
            NodeKind::RenderTexture => {
                let Some(texture) = node.reference("texture") else {
                    return Ok(Output::empty_draw());
                };
                let ops = match self.output(Some(texture)) {
                    Some(Output::Texture(source)) => vec![DrawOp::Texture {
                        node: node.index,
                        texture,
                        source: source.clone(),
                        quad: self.quad(node, "geometry"),
                    }],
                    _ => Vec::new(),
                };
                let weight = ops.len();
                drawn(node.index, ops, weight, pending)
            }
            NodeKind::RenderColor => {
                let [r, g, b] = node.vec::<3>("color");
                let opacity = node.float("opacity").clamp(0.0, 1.0) as f32;
                let ops = vec![DrawOp::Color {
                    node: node.index,
                    quad: self.quad(node, "geometry"),
                    rgba: [r, g, b, opacity],
                }];
                drawn(node.index, ops, 1, pending)
            }
            NodeKind::Group => {
                let children = node.reference_list("children");
                // Sum first so an oversized group is rejected before anything is copied.
                let weight = children
                    .iter()
                    .filter_map(|c| self.draw_output(c.target))
                    .fold(0usize, |acc, (_, w)| acc.saturating_add(w));
                check_budget(node.index, weight)?;

                let mut ops = Vec::new();
                for child in children {
                    if let Some((child_ops, _)) = self.draw_output(child.target) {
                        ops.extend_from_slice(child_ops);
                    }
                }
                drawn(node.index, ops, weight, pending)
            }
            NodeKind::RenderToTexture => {
                let (Some(child), Some(target)) =
                    (node.reference("child"), node.reference("color_texture"))
                else {
                    return Ok(Output::empty_draw());
                };
                let (child_ops, child_weight) = self.draw_output(child).unwrap_or_default();
                let weight = child_weight.saturating_add(1);
                check_budget(node.index, weight)?;

                let size = match self.output(Some(target)) {
                    Some(Output::Texture(TextureSource::Target { size })) => *size,
                    _ => None,
                };
                let ops = vec![DrawOp::RenderToTexture {
                    node: node.index,
                    target,
                    size,
                    clear: node.vec::<4>("clear_color"),
                    ops: child_ops.to_vec(),
                }];
                drawn(node.index, ops, weight, pending)
            }
        };
        Ok(out)
    }
}

fn check_budget(node: NodeIndex, ops: usize) -> Result<(), EvalError> {
    if ops > MAX_FRAME_OPS {
        return Err(EvalError::PlanTooLarge {
            node,
            ops,
            limit: MAX_FRAME_OPS,
        });
    }
    Ok(())
}

fn drawn(index: NodeIndex, ops: Vec<DrawOp>, weight: usize, pending: &mut Pending) -> Output {
    if !ops.is_empty() {
        pending.drawn.push(index);
    }
    Output::Draw { ops, weight }
}

fn explicit_size(node: &Node) -> Option<SurfaceSize> {
    let w = u32::try_from(node.int("width")).ok()?;
    let h = u32::try_from(node.int("height")).ok()?;
    (w > 0 && h > 0).then_some(SurfaceSize::new(w, h))
}

#[cfg(test)]
#[path = "../../tests/unit/eval/evaluator.rs"]
mod tests;
