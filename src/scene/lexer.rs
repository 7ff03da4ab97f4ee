use std::borrow::Cow;

/// Byte range inside one source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: usize,
    pub(crate) end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
    pub(crate) offset: usize,
    /// Parameter the error belongs to, when known.
    pub(crate) param: Option<String>,
    pub(crate) message: String,
}

impl LexError {
    fn new(offset: usize, param: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            offset,
            param: param.map(str::to_owned),
            message: message.into(),
        }
    }
}

/// Raw value text as written; decoding happens against the parameter schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawValue<'a> {
    pub(crate) text: Cow<'a, str>,
    pub(crate) quoted: bool,
    pub(crate) span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawParam<'a> {
    pub(crate) name: &'a str,
    pub(crate) name_span: Span,
    pub(crate) value: RawValue<'a>,
}

/// One node declaration split into its type name and `name:value` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawDecl<'a> {
    pub(crate) type_name: &'a str,
    pub(crate) type_span: Span,
    pub(crate) params: Vec<RawParam<'a>>,
}

/// A `#` comment line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawComment<'a> {
    KeyValue {
        key: &'a str,
        value: &'a str,
        value_offset: usize,
    },
    Text(&'a str),
}

pub(crate) fn lex_comment(line: &str, hash_offset: usize) -> RawComment<'_> {
    let body_start = hash_offset + 1;
    let body = &line[body_start..];
    match body.find('=') {
        Some(eq) => {
            let key = body[..eq].trim();
            let raw_value = &body[eq + 1..];
            let lead = raw_value.len() - raw_value.trim_start().len();
            RawComment::KeyValue {
                key,
                value: raw_value.trim(),
                value_offset: body_start + eq + 1 + lead,
            }
        }
        None => RawComment::Text(body.trim()),
    }
}

pub(crate) fn lex_decl(line: &str) -> Result<RawDecl<'_>, LexError> {
    let bytes = line.as_bytes();
    let mut i = skip_ws(bytes, 0);

    let type_start = i;
    while i < bytes.len() && !(bytes[i] as char).is_ascii_whitespace() {
        i += 1;
    }
    let type_span = Span {
        start: type_start,
        end: i,
    };
    let type_name = &line[type_start..i];

    let mut params = Vec::new();
    loop {
        i = skip_ws(bytes, i);
        if i >= bytes.len() {
            break;
        }

        let name_start = i;
        while i < bytes.len() && bytes[i] != b':' && !(bytes[i] as char).is_ascii_whitespace() {
            i += 1;
        }
        let name = &line[name_start..i];
        if i >= bytes.len() || bytes[i] != b':' {
            return Err(LexError::new(
                name_start,
                Some(name),
                "expected <name>:<value>",
            ));
        }
        if name.is_empty() {
            return Err(LexError::new(name_start, None, "parameter name is empty"));
        }
        let name_span = Span {
            start: name_start,
            end: i,
        };
        i += 1;

        let value_start = i;
        let value = if i < bytes.len() && bytes[i] == b'"' {
            let (text, end) = lex_quoted(line, i, name)?;
            i = end;
            if i < bytes.len() && !(bytes[i] as char).is_ascii_whitespace() {
                return Err(LexError::new(
                    i,
                    Some(name),
                    "unexpected character after closing quote",
                ));
            }
            RawValue {
                text: Cow::Owned(text),
                quoted: true,
                span: Span {
                    start: value_start,
                    end: i,
                },
            }
        } else {
            while i < bytes.len() && !(bytes[i] as char).is_ascii_whitespace() {
                i += 1;
            }
            RawValue {
                text: Cow::Borrowed(&line[value_start..i]),
                quoted: false,
                span: Span {
                    start: value_start,
                    end: i,
                },
            }
        };

        params.push(RawParam {
            name,
            name_span,
            value,
        });
    }

    Ok(RawDecl {
        type_name,
        type_span,
        params,
    })
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] as char).is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Lex a double-quoted string starting at `start`; returns the unescaped text and the offset
/// just past the closing quote.
fn lex_quoted(line: &str, start: usize, param: &str) -> Result<(String, usize), LexError> {
    let mut out = String::new();
    let mut chars = line[start + 1..].char_indices();
    while let Some((off, c)) = chars.next() {
        match c {
            '"' => return Ok((out, start + 1 + off + 1)),
            '\\' => {
                let Some((esc_off, esc)) = chars.next() else {
                    break;
                };
                match esc {
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    other => {
                        return Err(LexError::new(
                            start + 1 + esc_off,
                            Some(param),
                            format!("unknown escape '\\{other}'"),
                        ));
                    }
                }
            }
            other => out.push(other),
        }
    }
    Err(LexError::new(start, Some(param), "unterminated string"))
}
