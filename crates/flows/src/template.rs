//! Prompt templates.
//!
//! A small Handlebars subset, parsed once into a node tree and rendered
//! against a JSON record:
//!
//! ```text
//! {{field}}  {{{field}}}  {{a.b}}           interpolation (no escaping)
//! {{this}}  {{this.field}}                  the current loop item
//! {{@index}} {{@first}} {{@last}}           loop position
//! {{#if f}} .. {{else}} .. {{/if}}          renders iff f is present and non-empty
//! {{#unless f}} .. {{/unless}}              the inverse
//! {{#each list}} .. {{else}} .. {{/each}}   once per element
//! {{media url=field}}                       attaches a data URI instead of text
//! {{! comment }}  {{!-- comment --}}
//! ```
//!
//! Unknown fields render as empty text. Rendering has no side effects: the
//! same template and record always produce the same output.

use std::borrow::Cow;

use curalink_core::DataUri;
use serde_json::Value;

/// A parse or render failure. Offsets are byte positions in the source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed tag at byte {offset}")]
    UnclosedTag { offset: usize },

    #[error("'#{block}' block opened at byte {offset} is never closed")]
    UnclosedBlock { block: String, offset: usize },

    #[error("unexpected '/{block}' at byte {offset}")]
    UnexpectedClose { block: String, offset: usize },

    #[error("unexpected 'else' at byte {offset}")]
    UnexpectedElse { offset: usize },

    #[error("malformed tag '{tag}' at byte {offset}")]
    Malformed { tag: String, offset: usize },

    #[error("media field '{field}' is not a data URI: {reason}")]
    InvalidMedia { field: String, reason: String },
}

/// A reference to a value in the render context.
#[derive(Debug, Clone, PartialEq)]
enum Path {
    /// `a.b`, resolved innermost scope first, then the root record
    Field(Vec<String>),
    /// `this` / `this.a`, the current loop item
    This(Vec<String>),
    Index,
    First,
    Last,
}

impl Path {
    fn parse(expr: &str) -> Option<Self> {
        match expr {
            "@index" => return Some(Self::Index),
            "@first" => return Some(Self::First),
            "@last" => return Some(Self::Last),
            "this" | "." => return Some(Self::This(Vec::new())),
            _ => {}
        }

        let (this, rest) = match expr.strip_prefix("this.") {
            Some(rest) => (true, rest),
            None => (false, expr),
        };
        let segments: Vec<String> = rest.split('.').map(String::from).collect();
        let valid = segments.iter().all(|s| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
        if !valid {
            return None;
        }
        Some(if this {
            Self::This(segments)
        } else {
            Self::Field(segments)
        })
    }

    fn describe(&self) -> String {
        match self {
            Self::Field(s) => s.join("."),
            Self::This(s) if s.is_empty() => "this".into(),
            Self::This(s) => format!("this.{}", s.join(".")),
            Self::Index => "@index".into(),
            Self::First => "@first".into(),
            Self::Last => "@last".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    If,
    Unless,
    Each,
}

impl Section {
    fn keyword(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Unless => "unless",
            Self::Each => "each",
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Var(Path),
    Media(Path),
    Section {
        kind: Section,
        path: Path,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// The output of a render: prompt text plus attached media in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub media: Vec<DataUri>,
}

/// A parsed prompt template.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Parse template source.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let (nodes, stop) = parser.parse_nodes()?;
        match stop {
            Stop::End => Ok(Self { nodes }),
            Stop::Else(offset) => Err(TemplateError::UnexpectedElse { offset }),
            Stop::Close(block, offset) => Err(TemplateError::UnexpectedClose { block, offset }),
        }
    }

    /// Render against a JSON record.
    pub fn render(&self, context: &Value) -> Result<Rendered, TemplateError> {
        let mut out = Rendered::default();
        let mut scopes = Vec::new();
        render_nodes(&self.nodes, context, &mut scopes, &mut out)?;
        Ok(out)
    }
}

impl std::str::FromStr for Template {
    type Err = TemplateError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}

// ─── Tokenizer ──────────────────────────────────────────────────────

#[derive(Debug)]
enum Token<'a> {
    Text(&'a str),
    Tag { body: &'a str, offset: usize },
}

fn tokenize(source: &str) -> Result<Vec<Token<'_>>, TemplateError> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    while let Some(found) = source[cursor..].find("{{") {
        let start = cursor + found;
        if start > cursor {
            tokens.push(Token::Text(&source[cursor..start]));
        }

        let tail = &source[start..];
        let (open, close) = if tail.starts_with("{{!--") {
            (5, "--}}")
        } else if tail.starts_with("{{{") {
            (3, "}}}")
        } else {
            (2, "}}")
        };
        let body_start = start + open;
        let end = source[body_start..]
            .find(close)
            .map(|i| body_start + i)
            .ok_or(TemplateError::UnclosedTag { offset: start })?;

        let body = if open == 5 { "!" } else { source[body_start..end].trim() };
        tokens.push(Token::Tag { body, offset: start });
        cursor = end + close.len();
    }

    if cursor < source.len() {
        tokens.push(Token::Text(&source[cursor..]));
    }
    strip_standalone(&mut tokens);
    Ok(tokens)
}

/// Block, `else` and comment tags that sit alone on a line remove that
/// line entirely: its indentation and its line break.
fn strip_standalone(tokens: &mut [Token<'_>]) {
    // (end, start) byte cuts per text token, all decided on the untouched
    // tokens so that two adjacent standalone tags agree.
    let mut cuts: Vec<(Option<usize>, usize)> = vec![(None, 0); tokens.len()];

    for (i, token) in tokens.iter().enumerate() {
        let Token::Tag { body, .. } = token else { continue };
        if !(body.starts_with(['#', '/', '!']) || *body == "else") {
            continue;
        }
        let keep = match i.checked_sub(1).map(|j| &tokens[j]) {
            None => Some(0),
            Some(Token::Text(text)) => indentation_start(text, i == 1),
            Some(Token::Tag { .. }) => None,
        };
        let skip = match tokens.get(i + 1) {
            None => Some(0),
            Some(Token::Text(text)) => line_break_end(text, i + 2 == tokens.len()),
            Some(Token::Tag { .. }) => None,
        };
        if let (Some(keep), Some(skip)) = (keep, skip) {
            if i > 0 {
                cuts[i - 1].0 = Some(keep);
            }
            if i + 1 < tokens.len() {
                cuts[i + 1].1 = skip;
            }
        }
    }

    for (token, (keep, skip)) in tokens.iter_mut().zip(cuts) {
        if let Token::Text(text) = token {
            let whole = *text;
            let end = keep.unwrap_or(whole.len()).max(skip);
            *text = &whole[skip..end];
        }
    }
}

/// Where the trailing indentation of `text` begins, if nothing but spaces
/// follow its last line break. Text without a break only qualifies at the
/// very start of the template.
fn indentation_start(text: &str, at_start: bool) -> Option<usize> {
    let line = match text.rfind('\n') {
        Some(nl) => nl + 1,
        None if at_start => 0,
        None => return None,
    };
    text[line..].chars().all(|c| c == ' ' || c == '\t').then_some(line)
}

/// How many leading bytes of `text` are blank up to and including its first
/// line break. Text without a break only qualifies at the end of the template.
fn line_break_end(text: &str, at_end: bool) -> Option<usize> {
    let end = match text.find('\n') {
        Some(nl) => nl + 1,
        None if at_end => text.len(),
        None => return None,
    };
    text[..end].chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n')).then_some(end)
}

// ─── Parser ─────────────────────────────────────────────────────────

/// Why a run of nodes ended.
enum Stop {
    End,
    Else(usize),
    Close(String, usize),
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl Parser<'_> {
    fn parse_nodes(&mut self) -> Result<(Vec<Node>, Stop), TemplateError> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.get(self.pos) {
            self.pos += 1;
            let (body, offset) = match *token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text.to_string()));
                    continue;
                }
                Token::Tag { body, offset } => (body, offset),
            };

            if body.starts_with('!') {
                continue;
            }
            if body == "else" {
                return Ok((nodes, Stop::Else(offset)));
            }
            if let Some(name) = body.strip_prefix('/') {
                return Ok((nodes, Stop::Close(name.trim().to_string(), offset)));
            }
            if let Some(open) = body.strip_prefix('#') {
                nodes.push(self.parse_section(open, offset)?);
                continue;
            }
            nodes.push(parse_expression(body, offset)?);
        }

        Ok((nodes, Stop::End))
    }

    fn parse_section(&mut self, open: &str, offset: usize) -> Result<Node, TemplateError> {
        let malformed = || TemplateError::Malformed {
            tag: format!("#{open}"),
            offset,
        };
        let (keyword, arg) = open.split_once(char::is_whitespace).ok_or_else(malformed)?;
        let kind = match keyword {
            "if" => Section::If,
            "unless" => Section::Unless,
            "each" => Section::Each,
            _ => return Err(malformed()),
        };
        let path = Path::parse(arg.trim()).ok_or_else(malformed)?;

        let (body, stop) = self.parse_nodes()?;
        let (otherwise, stop) = match stop {
            Stop::Else(_) => self.parse_nodes()?,
            other => (Vec::new(), other),
        };

        match stop {
            Stop::Close(name, _) if name == kind.keyword() => Ok(Node::Section {
                kind,
                path,
                body,
                otherwise,
            }),
            Stop::Close(block, offset) => Err(TemplateError::UnexpectedClose { block, offset }),
            Stop::Else(offset) => Err(TemplateError::UnexpectedElse { offset }),
            Stop::End => Err(TemplateError::UnclosedBlock {
                block: keyword.to_string(),
                offset,
            }),
        }
    }
}

fn parse_expression(body: &str, offset: usize) -> Result<Node, TemplateError> {
    let malformed = || TemplateError::Malformed {
        tag: body.to_string(),
        offset,
    };

    if let Some(args) = body.strip_prefix("media ") {
        let field = args
            .trim()
            .strip_prefix("url=")
            .and_then(Path::parse)
            .ok_or_else(malformed)?;
        return Ok(Node::Media(field));
    }

    Path::parse(body).map(Node::Var).ok_or_else(malformed)
}

// ─── Renderer ───────────────────────────────────────────────────────

/// One level of `#each`.
struct Scope<'v> {
    item: &'v Value,
    index: usize,
    len: usize,
}

fn render_nodes<'v>(
    nodes: &[Node],
    root: &'v Value,
    scopes: &mut Vec<Scope<'v>>,
    out: &mut Rendered,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.text.push_str(text),
            Node::Var(path) => {
                if let Some(value) = resolve(path, root, scopes) {
                    push_value(&mut out.text, &value);
                }
            }
            Node::Media(path) => {
                let uri = resolve(path, root, scopes);
                let uri = uri.as_deref().and_then(Value::as_str).unwrap_or_default();
                let media = DataUri::parse(uri).map_err(|reason| TemplateError::InvalidMedia {
                    field: path.describe(),
                    reason,
                })?;
                out.media.push(media);
            }
            Node::Section {
                kind: Section::Each,
                path,
                body,
                otherwise,
            } => {
                let list = match resolve(path, root, scopes) {
                    Some(Cow::Borrowed(Value::Array(items))) if !items.is_empty() => items,
                    _ => {
                        render_nodes(otherwise, root, scopes, out)?;
                        continue;
                    }
                };
                for (index, item) in list.iter().enumerate() {
                    scopes.push(Scope {
                        item,
                        index,
                        len: list.len(),
                    });
                    let result = render_nodes(body, root, scopes, out);
                    scopes.pop();
                    result?;
                }
            }
            Node::Section {
                kind,
                path,
                body,
                otherwise,
            } => {
                let present = resolve(path, root, scopes).is_some_and(|v| truthy(&v));
                let branch = if present == (*kind == Section::If) {
                    body
                } else {
                    otherwise
                };
                render_nodes(branch, root, scopes, out)?;
            }
        }
    }
    Ok(())
}

fn resolve<'v>(path: &Path, root: &'v Value, scopes: &[Scope<'v>]) -> Option<Cow<'v, Value>> {
    match path {
        Path::This(segments) => {
            let base = scopes.last().map_or(root, |s| s.item);
            walk(base, segments).map(Cow::Borrowed)
        }
        Path::Field(segments) => scopes
            .iter()
            .rev()
            .map(|s| s.item)
            .chain(std::iter::once(root))
            .find_map(|base| walk(base, segments))
            .map(Cow::Borrowed),
        Path::Index => scopes.last().map(|s| Cow::Owned(Value::from(s.index))),
        Path::First => scopes.last().map(|s| Cow::Owned(Value::Bool(s.index == 0))),
        Path::Last => scopes
            .last()
            .map(|s| Cow::Owned(Value::Bool(s.index + 1 == s.len))),
    }
}

fn walk<'v>(base: &'v Value, segments: &[String]) -> Option<&'v Value> {
    segments
        .iter()
        .try_fold(base, |current, segment| current.get(segment.as_str()))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                push_value(out, item);
            }
        }
        other => out.push_str(&other.to_string()),
    }
}
