use smallvec::SmallVec;

use crate::foundation::core::Rational;
use crate::foundation::error::ParseError;
use crate::foundation::ids::NodeIndex;
use crate::scene::registry::{NodeKind, ParamDefault};

/// Resolved back-reference from a parameter slot to an earlier node.
///
/// Invariant: `target` is strictly smaller than the index of the node holding the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct NodeRef {
    pub target: NodeIndex,
}

/// Decoded parameter value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Vec(SmallVec<[f32; 4]>),
    Str(String),
    Select(String),
    Ref(NodeRef),
    RefList(Vec<NodeRef>),
}

/// One bound parameter of a node.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Param {
    pub name: &'static str,
    pub value: ParamValue,
}

/// One declared scene node. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Node {
    pub index: NodeIndex,
    pub kind: NodeKind,
    /// Parameters in the order they were written.
    pub params: SmallVec<[Param; 4]>,
}

impl Node {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Every outgoing reference of this node, in parameter order.
    pub fn references(&self) -> impl Iterator<Item = (&'static str, NodeRef)> + '_ {
        self.params.iter().flat_map(|p| {
            let refs: SmallVec<[NodeRef; 4]> = match &p.value {
                ParamValue::Ref(r) => smallvec::smallvec![*r],
                ParamValue::RefList(rs) => rs.iter().copied().collect(),
                _ => SmallVec::new(),
            };
            refs.into_iter().map(move |r| (p.name, r))
        })
    }

    fn default_of(&self, name: &str) -> ParamDefault {
        self.kind
            .param_spec(name)
            .map(|s| s.default)
            .unwrap_or(ParamDefault::None)
    }

    pub fn bool(&self, name: &str) -> bool {
        match (self.get(name), self.default_of(name)) {
            (Some(ParamValue::Bool(v)), _) => *v,
            (_, ParamDefault::Bool(v)) => v,
            _ => false,
        }
    }

    pub fn int(&self, name: &str) -> i64 {
        match (self.get(name), self.default_of(name)) {
            (Some(ParamValue::Int(v)), _) => *v,
            (_, ParamDefault::Int(v)) => v,
            _ => 0,
        }
    }

    pub fn float(&self, name: &str) -> f64 {
        match (self.get(name), self.default_of(name)) {
            (Some(ParamValue::Float(v)), _) => *v,
            (Some(ParamValue::Int(v)), _) => *v as f64,
            (_, ParamDefault::Float(v)) => v,
            _ => 0.0,
        }
    }

    /// Vector parameter padded with zeros to `N` components.
    pub fn vec<const N: usize>(&self, name: &str) -> [f32; N] {
        let src: &[f32] = match (self.get(name), self.default_of(name)) {
            (Some(ParamValue::Vec(v)), _) => v.as_slice(),
            (_, ParamDefault::Vec(v)) => v,
            _ => &[],
        };
        let mut out = [0.0f32; N];
        for (o, v) in out.iter_mut().zip(src) {
            *o = *v;
        }
        out
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ParamValue::Str(s) | ParamValue::Select(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn reference(&self, name: &str) -> Option<NodeIndex> {
        match self.get(name) {
            Some(ParamValue::Ref(r)) => Some(r.target),
            _ => None,
        }
    }

    pub fn reference_list(&self, name: &str) -> &[NodeRef] {
        match self.get(name) {
            Some(ParamValue::RefList(rs)) => rs.as_slice(),
            _ => &[],
        }
    }
}

/// Scene-level metadata from the leading comment block.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SceneMeta {
    /// Version string from a `# <Name> v<version>` banner.
    pub version: Option<String>,
    /// Duration in seconds.
    pub duration: Option<f64>,
    pub aspect_ratio: Option<Rational>,
    pub framerate: Option<Rational>,
}

/// Immutable, ordered node graph compiled from scene text.
///
/// The root is the last declared node. Evaluation order is ascending index order.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Scene {
    pub(crate) meta: SceneMeta,
    pub(crate) nodes: Vec<Node>,
}

impl Scene {
    /// Parse scene text into a graph whose references all point to earlier nodes.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        crate::scene::parser::parse(text)
    }

    pub fn meta(&self) -> &SceneMeta {
        &self.meta
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        if index.0 == 0 {
            return None;
        }
        self.nodes.get(index.slot())
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stable 64-bit hash of the canonical text form.
    pub fn fingerprint(&self) -> u64 {
        xxhash_rust::xxh3::xxh3_64(self.serialize().as_bytes())
    }
}
