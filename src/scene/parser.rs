//! Scene-description parser.
//!
//! Single left-to-right pass over the lines of the text. Leading `#` lines carry metadata; every
//! other non-blank line declares one node. Node indices are assigned in declaration order,
//! starting at 1. A reference value `k` points `k` nodes back from the node being declared, so
//! every edge targets a strictly smaller index and the graph is acyclic by construction.

use smallvec::SmallVec;

use crate::foundation::core::Rational;
use crate::foundation::error::{ParseError, ParseErrorKind};
use crate::foundation::ids::NodeIndex;
use crate::scene::lexer::{LexError, RawComment, RawValue, lex_comment, lex_decl};
use crate::scene::model::{Node, NodeRef, Param, ParamValue, Scene, SceneMeta};
use crate::scene::registry::{NodeKind, ParamKind, ParamSpec};

pub(crate) fn parse(text: &str) -> Result<Scene, ParseError> {
    let mut meta = SceneMeta::default();
    let mut nodes: Vec<Node> = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let body = line.trim_start();
        if body.trim_end().is_empty() {
            continue;
        }
        let indent = line.len() - body.len();

        if body.starts_with('#') {
            if !nodes.is_empty() {
                return Err(ParseError::new(
                    line_no,
                    column(line, indent),
                    ParseErrorKind::MalformedMetadata(
                        "metadata must precede the first node declaration".to_owned(),
                    ),
                ));
            }
            parse_comment(line, indent, line_no, &mut meta)?;
            continue;
        }

        let node = parse_node(line, line_no, &nodes)?;
        nodes.push(node);
    }

    tracing::debug!(nodes = nodes.len(), "parsed scene");
    Ok(Scene { meta, nodes })
}

/// 1-based character column of a byte offset in `line`.
fn column(line: &str, offset: usize) -> usize {
    line[..offset.min(line.len())].chars().count() + 1
}

fn parse_comment(
    line: &str,
    hash_offset: usize,
    line_no: usize,
    meta: &mut SceneMeta,
) -> Result<(), ParseError> {
    match lex_comment(line, hash_offset) {
        RawComment::KeyValue {
            key,
            value,
            value_offset,
        } => {
            let bad = |reason: String| {
                ParseError::new(
                    line_no,
                    column(line, value_offset),
                    ParseErrorKind::MalformedMetadata(format!("{key}: {reason}")),
                )
            };
            match key {
                "duration" => {
                    let d = parse_number(value).map_err(bad)?;
                    if d < 0.0 {
                        return Err(bad(format!("duration must be >= 0, got {d}")));
                    }
                    meta.duration = Some(d);
                }
                "aspect_ratio" => {
                    let r = parse_rational(value).map_err(bad)?;
                    if r.num <= 0 || r.den <= 0 {
                        return Err(bad(format!("aspect ratio must be positive, got {r}")));
                    }
                    meta.aspect_ratio = Some(r);
                }
                "framerate" => {
                    let r = parse_rational(value).map_err(bad)?;
                    if r.num <= 0 || r.den <= 0 {
                        return Err(bad(format!("framerate must be positive, got {r}")));
                    }
                    meta.framerate = Some(r);
                }
                other => {
                    tracing::warn!(key = other, line = line_no, "ignoring unknown scene metadata");
                }
            }
        }
        RawComment::Text(text) => {
            if meta.version.is_none()
                && let Some(v) = banner_version(text)
            {
                meta.version = Some(v.to_owned());
            }
        }
    }
    Ok(())
}

/// `"Nope.GL v0.11.0"` -> `"0.11.0"`.
fn banner_version(text: &str) -> Option<&str> {
    let last = text.split_whitespace().last()?;
    let v = last.strip_prefix('v')?;
    let ok = !v.is_empty()
        && v.starts_with(|c: char| c.is_ascii_digit())
        && v.chars().all(|c| c.is_ascii_digit() || c == '.');
    ok.then_some(v)
}

fn parse_rational(s: &str) -> Result<Rational, String> {
    let (n, d) = s
        .split_once('/')
        .ok_or_else(|| format!("expected <int>/<int>, got '{s}'"))?;
    let num: i64 = n
        .trim()
        .parse()
        .map_err(|_| format!("invalid numerator '{n}'"))?;
    let den: i64 = d
        .trim()
        .parse()
        .map_err(|_| format!("invalid denominator '{d}'"))?;
    Rational::new(num, den).ok_or_else(|| "denominator must be non-zero".to_owned())
}

/// Decimal, `N/D` rational, or hex-bits double.
fn parse_number(s: &str) -> Result<f64, String> {
    if s.contains('/') {
        return parse_rational(s).map(Rational::as_f64);
    }
    parse_float(s)
}

/// Decimal float, or the IEEE-754 bit pattern in hex with a `Z` marker
/// (`403Z9000000000000` is `0x4039000000000000`, i.e. 25.0).
fn parse_float(s: &str) -> Result<f64, String> {
    let v = if s.contains(|c: char| c == 'Z' || c == 'z') {
        let (neg, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let hex: String = body.chars().filter(|&c| c != 'Z' && c != 'z').collect();
        if hex.is_empty() || hex.len() > 16 {
            return Err(format!("invalid hex-encoded float '{s}'"));
        }
        let bits =
            u64::from_str_radix(&hex, 16).map_err(|_| format!("invalid hex-encoded float '{s}'"))?;
        let v = f64::from_bits(bits);
        if neg { -v } else { v }
    } else {
        s.parse::<f64>()
            .map_err(|_| format!("invalid number '{s}'"))?
    };
    if !v.is_finite() {
        return Err(format!("number must be finite, got '{s}'"));
    }
    Ok(v)
}

fn lex_error(line: &str, line_no: usize, e: LexError) -> ParseError {
    ParseError::new(
        line_no,
        column(line, e.offset),
        ParseErrorKind::MalformedLiteral {
            param: e.param.unwrap_or_default(),
            reason: e.message,
        },
    )
}

fn parse_node(line: &str, line_no: usize, declared: &[Node]) -> Result<Node, ParseError> {
    let decl = lex_decl(line).map_err(|e| lex_error(line, line_no, e))?;

    let kind = NodeKind::from_type_name(decl.type_name).ok_or_else(|| {
        ParseError::new(
            line_no,
            column(line, decl.type_span.start),
            ParseErrorKind::UnknownNodeType(decl.type_name.to_owned()),
        )
    })?;
    let index = NodeIndex(declared.len() as u32 + 1);

    let mut params: SmallVec<[Param; 4]> = SmallVec::new();
    for raw in &decl.params {
        let at_name = column(line, raw.name_span.start);
        let spec = kind.param_spec(raw.name).ok_or_else(|| {
            ParseError::new(
                line_no,
                at_name,
                ParseErrorKind::UnknownParameter {
                    node_type: kind.name(),
                    param: raw.name.to_owned(),
                },
            )
        })?;
        if params.iter().any(|p| p.name == spec.name) {
            return Err(ParseError::new(
                line_no,
                at_name,
                ParseErrorKind::DuplicateParameter(spec.name.to_owned()),
            ));
        }
        let value = decode_value(spec, &raw.value, index, declared).map_err(|kind| {
            ParseError::new(line_no, column(line, raw.value.span.start), kind)
        })?;
        params.push(Param {
            name: spec.name,
            value,
        });
    }

    if let Some(missing) = kind
        .schema()
        .iter()
        .find(|s| s.required && !params.iter().any(|p| p.name == s.name))
    {
        return Err(ParseError::new(
            line_no,
            column(line, decl.type_span.start),
            ParseErrorKind::MissingParameter {
                node_type: kind.name(),
                param: missing.name,
            },
        ));
    }

    Ok(Node {
        index,
        kind,
        params,
    })
}

fn decode_value(
    spec: &ParamSpec,
    raw: &RawValue<'_>,
    index: NodeIndex,
    declared: &[Node],
) -> Result<ParamValue, ParseErrorKind> {
    let malformed = |reason: String| ParseErrorKind::MalformedLiteral {
        param: spec.name.to_owned(),
        reason,
    };
    let text: &str = &raw.text;

    if raw.quoted && spec.kind != ParamKind::Str {
        return Err(malformed("quoted value for a non-string parameter".to_owned()));
    }
    if text.is_empty() && spec.kind != ParamKind::Str {
        return Err(malformed("empty value".to_owned()));
    }

    match spec.kind {
        ParamKind::Bool => match text {
            "1" | "true" => Ok(ParamValue::Bool(true)),
            "0" | "false" => Ok(ParamValue::Bool(false)),
            _ => Err(malformed(format!("expected a boolean, got '{text}'"))),
        },
        ParamKind::Int => text
            .parse::<i64>()
            .map(ParamValue::Int)
            .map_err(|_| malformed(format!("expected an integer, got '{text}'"))),
        ParamKind::Float => parse_float(text).map(ParamValue::Float).map_err(malformed),
        ParamKind::Vec(n) => {
            let mut out = SmallVec::new();
            for part in text.split(',') {
                let v = parse_float(part).map_err(&malformed)? as f32;
                if !v.is_finite() {
                    return Err(malformed(format!("'{part}' does not fit in single precision")));
                }
                out.push(v);
            }
            if out.len() != n {
                return Err(malformed(format!(
                    "expected {n} components, got {}",
                    out.len()
                )));
            }
            Ok(ParamValue::Vec(out))
        }
        ParamKind::Str => {
            if raw.quoted {
                Ok(ParamValue::Str(text.to_owned()))
            } else {
                percent_decode(text).map(ParamValue::Str).map_err(malformed)
            }
        }
        ParamKind::Select(words) => {
            if words.contains(&text) {
                Ok(ParamValue::Select(text.to_owned()))
            } else {
                Err(malformed(format!(
                    "expected one of {}, got '{text}'",
                    words.join("|")
                )))
            }
        }
        ParamKind::Ref(kinds) => {
            resolve_ref(spec.name, text, kinds, index, declared).map(ParamValue::Ref)
        }
        ParamKind::RefList(kinds) => text
            .split(',')
            .map(|part| resolve_ref(spec.name, part, kinds, index, declared))
            .collect::<Result<Vec<_>, _>>()
            .map(ParamValue::RefList),
    }
}

fn resolve_ref(
    param: &str,
    text: &str,
    kinds: &[NodeKind],
    index: NodeIndex,
    declared: &[Node],
) -> Result<NodeRef, ParseErrorKind> {
    let distance: i64 = text
        .parse()
        .map_err(|_| ParseErrorKind::MalformedLiteral {
            param: param.to_owned(),
            reason: format!("expected a node reference, got '{text}'"),
        })?;

    let count = declared.len();
    if distance < 1 || distance as u64 > count as u64 {
        return Err(ParseErrorKind::DanglingOrForwardReference {
            param: param.to_owned(),
            distance,
            declared: count,
        });
    }

    let target = NodeIndex(index.0 - distance as u32);
    let found = declared[target.slot()].kind;
    if !kinds.contains(&found) {
        return Err(ParseErrorKind::ReferenceTypeMismatch {
            param: param.to_owned(),
            expected: kinds
                .iter()
                .map(|k| k.name())
                .collect::<Vec<_>>()
                .join("|"),
            found: found.name(),
        });
    }

    Ok(NodeRef { target })
}

fn percent_decode(s: &str) -> Result<String, String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s
                .get(i + 1..i + 3)
                .ok_or_else(|| format!("truncated percent escape in '{s}'"))?;
            if !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
                return Err(format!("invalid percent escape '%{hex}'"));
            }
            let b = u8::from_str_radix(hex, 16)
                .map_err(|_| format!("invalid percent escape '%{hex}'"))?;
            out.push(b);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| format!("percent escapes in '{s}' are not valid UTF-8"))
}

#[cfg(test)]
#[path = "../../tests/unit/scene/parser.rs"]
mod tests;
