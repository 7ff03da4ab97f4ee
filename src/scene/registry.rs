//! Node-type registry.
//!
//! Each node type declares a fixed parameter schema. The schema is what lets the parser decide,
//! for a bare integer, whether it is a numeric literal or a back-reference to an earlier node.

/// Registered node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    /// Media source (file or host content URI).
    Media,
    /// 2D texture, optionally sourced from a media node.
    Texture2D,
    /// Parallelogram geometry in normalized device coordinates.
    Quad,
    /// Draws a texture over a geometry.
    RenderTexture,
    /// Fills a geometry with a flat color.
    RenderColor,
    /// Ordered list of drawables.
    Group,
    /// Renders a drawable into a texture.
    RenderToTexture,
}

/// Declared kind of a parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    /// Float vector with a fixed number of components.
    Vec(usize),
    Str,
    /// One of a fixed set of words.
    Select(&'static [&'static str]),
    /// Back-reference to one earlier node of the listed kinds.
    Ref(&'static [NodeKind]),
    /// Comma-separated back-references.
    RefList(&'static [NodeKind]),
}

impl ParamKind {
    pub fn is_reference(self) -> bool {
        matches!(self, Self::Ref(_) | Self::RefList(_))
    }
}

/// Schema default for an omitted parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Vec(&'static [f32]),
}

/// One parameter slot of a node type.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: ParamDefault,
}

const fn param(name: &'static str, kind: ParamKind, default: ParamDefault) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: false,
        default,
    }
}

const fn required(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: true,
        default: ParamDefault::None,
    }
}

pub(crate) const DRAWABLES: &[NodeKind] = &[
    NodeKind::RenderTexture,
    NodeKind::RenderColor,
    NodeKind::Group,
    NodeKind::RenderToTexture,
];

const MEDIA_PARAMS: &[ParamSpec] = &[
    required("filename", ParamKind::Str),
    param("audio_tex", ParamKind::Bool, ParamDefault::Bool(false)),
];

const TEXTURE2D_PARAMS: &[ParamSpec] = &[
    param("width", ParamKind::Int, ParamDefault::Int(0)),
    param("height", ParamKind::Int, ParamDefault::Int(0)),
    param(
        "data_src",
        ParamKind::Ref(&[NodeKind::Media]),
        ParamDefault::None,
    ),
];

const QUAD_PARAMS: &[ParamSpec] = &[
    param("corner", ParamKind::Vec(3), ParamDefault::Vec(&[-0.5, -0.5, 0.0])),
    param("width", ParamKind::Vec(3), ParamDefault::Vec(&[1.0, 0.0, 0.0])),
    param("height", ParamKind::Vec(3), ParamDefault::Vec(&[0.0, 1.0, 0.0])),
    param("uv_corner", ParamKind::Vec(2), ParamDefault::Vec(&[0.0, 0.0])),
    param("uv_width", ParamKind::Vec(2), ParamDefault::Vec(&[1.0, 0.0])),
    param("uv_height", ParamKind::Vec(2), ParamDefault::Vec(&[0.0, 1.0])),
];

const RENDER_TEXTURE_PARAMS: &[ParamSpec] = &[
    required("texture", ParamKind::Ref(&[NodeKind::Texture2D])),
    param(
        "geometry",
        ParamKind::Ref(&[NodeKind::Quad]),
        ParamDefault::None,
    ),
];

const RENDER_COLOR_PARAMS: &[ParamSpec] = &[
    param("color", ParamKind::Vec(3), ParamDefault::Vec(&[1.0, 1.0, 1.0])),
    param("opacity", ParamKind::Float, ParamDefault::Float(1.0)),
    param(
        "geometry",
        ParamKind::Ref(&[NodeKind::Quad]),
        ParamDefault::None,
    ),
];

const GROUP_PARAMS: &[ParamSpec] = &[param(
    "children",
    ParamKind::RefList(DRAWABLES),
    ParamDefault::None,
)];

const RENDER_TO_TEXTURE_PARAMS: &[ParamSpec] = &[
    required("child", ParamKind::Ref(DRAWABLES)),
    required("color_texture", ParamKind::Ref(&[NodeKind::Texture2D])),
    param(
        "clear_color",
        ParamKind::Vec(4),
        ParamDefault::Vec(&[0.0, 0.0, 0.0, 0.0]),
    ),
];

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Media,
        NodeKind::Texture2D,
        NodeKind::Quad,
        NodeKind::RenderTexture,
        NodeKind::RenderColor,
        NodeKind::Group,
        NodeKind::RenderToTexture,
    ];

    /// Short tag written by the serializer.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Media => "Mdia",
            Self::Texture2D => "Tex2",
            Self::Quad => "Quad",
            Self::RenderTexture => "Rtex",
            Self::RenderColor => "Rclr",
            Self::Group => "Grup",
            Self::RenderToTexture => "Rtt",
        }
    }

    /// Long, human-readable type name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Media => "Media",
            Self::Texture2D => "Texture2D",
            Self::Quad => "Quad",
            Self::RenderTexture => "RenderTexture",
            Self::RenderColor => "RenderColor",
            Self::Group => "Group",
            Self::RenderToTexture => "RenderToTexture",
        }
    }

    /// Look a type up by short tag or long name.
    pub fn from_type_name(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.tag() == s || k.name() == s)
    }

    pub fn schema(self) -> &'static [ParamSpec] {
        match self {
            Self::Media => MEDIA_PARAMS,
            Self::Texture2D => TEXTURE2D_PARAMS,
            Self::Quad => QUAD_PARAMS,
            Self::RenderTexture => RENDER_TEXTURE_PARAMS,
            Self::RenderColor => RENDER_COLOR_PARAMS,
            Self::Group => GROUP_PARAMS,
            Self::RenderToTexture => RENDER_TO_TEXTURE_PARAMS,
        }
    }

    pub fn param_spec(self, name: &str) -> Option<&'static ParamSpec> {
        self.schema().iter().find(|p| p.name == name)
    }

    /// Whether nodes of this kind produce draw operations.
    pub fn is_drawable(self) -> bool {
        DRAWABLES.contains(&self)
    }
}
