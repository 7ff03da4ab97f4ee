use std::fmt::Write as _;

use crate::scene::model::{Node, ParamValue, Scene};

impl Scene {
    /// Canonical text form: metadata comments, then one line per node using short tags and
    /// relative references. Parsing the output yields a scene equal to `self`.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        let meta = &self.meta;
        if let Some(v) = &meta.version {
            let _ = writeln!(out, "# scenegl v{v}");
        }
        if let Some(d) = meta.duration {
            let _ = writeln!(out, "# duration={d}");
        }
        if let Some(r) = meta.aspect_ratio {
            let _ = writeln!(out, "# aspect_ratio={r}");
        }
        if let Some(r) = meta.framerate {
            let _ = writeln!(out, "# framerate={r}");
        }
        for node in &self.nodes {
            write_node(&mut out, node);
            out.push('\n');
        }
        out
    }
}

fn write_node(out: &mut String, node: &Node) {
    out.push_str(node.kind.tag());
    for p in &node.params {
        out.push(' ');
        out.push_str(p.name);
        out.push(':');
        write_value(out, node, &p.value);
    }
}

fn write_value(out: &mut String, node: &Node, value: &ParamValue) {
    let distance = |target: crate::foundation::ids::NodeIndex| node.index.0 - target.0;
    match value {
        ParamValue::Bool(b) => out.push(if *b { '1' } else { '0' }),
        ParamValue::Int(v) => {
            let _ = write!(out, "{v}");
        }
        ParamValue::Float(v) => {
            let _ = write!(out, "{v}");
        }
        ParamValue::Vec(vs) => {
            for (i, v) in vs.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Widen so the decimal text maps back to the same f32.
                let _ = write!(out, "{}", f64::from(*v));
            }
        }
        ParamValue::Str(s) => write_quoted(out, s),
        ParamValue::Select(s) => out.push_str(s),
        ParamValue::Ref(r) => {
            let _ = write!(out, "{}", distance(r.target));
        }
        ParamValue::RefList(rs) => {
            for (i, r) in rs.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}", distance(r.target));
            }
        }
    }
}

fn write_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}
