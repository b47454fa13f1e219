//! analysis::config — reader for the XML-like analysis plan file.
//!
//! Purpose
//! -------
//! Turn a plan file such as
//!
//! ```text
//! <analysis>
//!   <directory>
//!     <label>t.005</label>
//!     <path>data/t.005</path>
//!     <tauval>.005</tauval>
//!     <Lval>8</Lval>
//!     <ntherm>10</ntherm>
//!     <max_order>5</max_order>
//!     <swap_endian/>
//!   </directory>
//!   <actions>
//!     <show orders="2 4"/>
//!     <extrapolate orders="2" L="8" basis="1 x">
//!       <plot L="8" orders="2" pdfname="o2.pdf" known="1.5"/>
//!     </extrapolate>
//!     <therm orders="2" range="0 100 20"/>
//!   </actions>
//! </analysis>
//! ```
//!
//! into an immutable [`AnalysisPlan`].
//!
//! Key behaviors
//! -------------
//! - A small tokenizer handles elements, self-closing tags, quoted
//!   attributes, text, comments, processing instructions, CDATA sections,
//!   DOCTYPE declarations (skipped, internal subset included) and the five
//!   predefined entities plus numeric character references.
//! - Tags are looked up in a fixed registry mapping the lower-cased tag name
//!   to its allowed parents and a builder constructor; unknown names fail
//!   with `AnalysisError::UnknownTag`.
//! - A stack of partially built records is kept; on a closing tag the top
//!   record is finished and attached to its parent. No node refers back to
//!   its parent.
//!
//! Conventions
//! -----------
//! - Tag and attribute names are case-insensitive (`<Lval>` = `<lval>`,
//!   `L=` = `l=`).
//! - A directory without `<label>` is labelled by its path.
//! - Defaults: `tauval` 0, `ntherm` 0, `normalization` 1, basis `{1, x}`.

use crate::{
    analysis::{
        errors::{AnalysisError, AnalysisResult},
        plan::{
            Action, AnalysisPlan, DirectorySpec, ExtrapolateAction, PlotRequest, ThermRange,
        },
    },
    continuum::basis::Basis,
};
use anyhow::Context;
use std::{collections::HashMap, path::Path, str::FromStr};

const ROOT: &str = "#document";

/// Parse a plan from text.
///
/// Errors
/// ------
/// - Any plan-file variant of [`AnalysisError`].
pub fn parse_plan(input: &str) -> AnalysisResult<AnalysisPlan> {
    let tokens = tokenize(input)?;
    let registry = tag_registry();
    let mut stack: Vec<Frame> = Vec::new();
    let mut plan: Option<AnalysisPlan> = None;

    for token in tokens {
        let line = token.line;
        match token.kind {
            TokenKind::Open { name, attrs, self_closing } => {
                let spec = registry
                    .get(name.as_str())
                    .ok_or_else(|| AnalysisError::UnknownTag { tag: name.clone(), line })?;
                let parent = stack.last().map_or(ROOT, |f| f.tag.as_str());
                if !spec.parents.iter().any(|p| *p == parent) {
                    return Err(AnalysisError::MisplacedTag {
                        tag: name,
                        parent: stack.last().map(|f| f.tag.clone()),
                        line,
                    });
                }
                let builder = (spec.open)(&Attributes { tag: &name, line, pairs: &attrs })?;
                stack.push(Frame { tag: name, line, builder });
                if self_closing {
                    close_top(&mut stack, &mut plan)?;
                }
            }
            TokenKind::Close { name } => {
                match stack.last() {
                    Some(top) if top.tag == name => {}
                    top => {
                        return Err(AnalysisError::UnexpectedClosingTag {
                            tag: name,
                            expected: top.map(|f| f.tag.clone()),
                            line,
                        });
                    }
                }
                close_top(&mut stack, &mut plan)?;
            }
            TokenKind::Text(text) => {
                if let Some(Frame { builder: Builder::Field { text: buffer, .. }, .. }) =
                    stack.last_mut()
                {
                    buffer.push_str(&text);
                }
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(AnalysisError::Syntax {
            message: format!("tag <{}> is never closed", open.tag),
            line: open.line,
        });
    }
    plan.ok_or(AnalysisError::MissingAnalysis)
}

/// Read and parse a plan file.
pub fn read_plan(path: impl AsRef<Path>) -> AnalysisResult<AnalysisPlan> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading plan file {}", path.display()))?;
    parse_plan(&text)
}

// ---- Builders ----------------------------------------------------------------

struct Frame {
    tag: String,
    line: usize,
    builder: Builder,
}

#[derive(Default)]
struct DirectoryDraft {
    label: Option<String>,
    path: Option<String>,
    tau: Option<f64>,
    lattice_size: Option<u32>,
    ntherm: Option<usize>,
    max_order: Option<usize>,
    normalization: Option<f64>,
    swap_endian: bool,
    complex: bool,
    filename_contains: Option<String>,
}

enum Builder {
    Analysis { directories: Vec<DirectorySpec>, actions: Vec<Action> },
    Directory(DirectoryDraft),
    Field { text: String },
    Flag,
    Actions(Vec<Action>),
    Show { orders: Vec<usize> },
    Extrapolate(ExtrapolateAction),
    Plot(PlotRequest),
    Therm { orders: Vec<usize>, range: ThermRange },
}

enum Node {
    Plan(AnalysisPlan),
    Directory(DirectorySpec),
    Field { tag: String, text: String, line: usize },
    Flag { tag: String },
    Actions(Vec<Action>),
    Action(Action),
    Plot(PlotRequest),
}

fn close_top(stack: &mut Vec<Frame>, plan: &mut Option<AnalysisPlan>) -> AnalysisResult<()> {
    let Some(frame) = stack.pop() else {
        return Ok(());
    };
    let line = frame.line;
    let node = finish(frame)?;
    match stack.last_mut() {
        Some(parent) => attach(parent, node),
        None => match node {
            Node::Plan(p) => {
                if plan.is_some() {
                    return Err(AnalysisError::Syntax {
                        message: "more than one <analysis> tag".to_string(),
                        line,
                    });
                }
                *plan = Some(p);
                Ok(())
            }
            _ => Ok(()),
        },
    }
}

fn finish(frame: Frame) -> AnalysisResult<Node> {
    let Frame { tag, line, builder } = frame;
    Ok(match builder {
        Builder::Analysis { directories, actions } => {
            Node::Plan(AnalysisPlan { directories, actions })
        }
        Builder::Directory(draft) => Node::Directory(draft.build(line)?),
        Builder::Field { text } => Node::Field { tag, text, line },
        Builder::Flag => Node::Flag { tag },
        Builder::Actions(actions) => Node::Actions(actions),
        Builder::Show { orders } => Node::Action(Action::Show { orders }),
        Builder::Extrapolate(ex) => Node::Action(Action::Extrapolate(ex)),
        Builder::Plot(plot) => Node::Plot(plot),
        Builder::Therm { orders, range } => Node::Action(Action::Therm { orders, range }),
    })
}

fn attach(parent: &mut Frame, node: Node) -> AnalysisResult<()> {
    match (&mut parent.builder, node) {
        (Builder::Analysis { directories, .. }, Node::Directory(d)) => directories.push(d),
        (Builder::Analysis { actions, .. }, Node::Actions(a)) => actions.extend(a),
        (Builder::Directory(draft), Node::Field { tag, text, line }) => {
            draft.set(&tag, text.trim(), line)?
        }
        (Builder::Directory(draft), Node::Flag { tag }) => match tag.as_str() {
            "swap_endian" => draft.swap_endian = true,
            _ => draft.complex = true,
        },
        (Builder::Actions(actions), Node::Action(a)) => actions.push(a),
        (Builder::Extrapolate(ex), Node::Plot(p)) => ex.plots.push(p),
        _ => {
            return Err(AnalysisError::Syntax {
                message: format!("unexpected content inside <{}>", parent.tag),
                line: parent.line,
            });
        }
    }
    Ok(())
}

impl DirectoryDraft {
    fn set(&mut self, tag: &str, text: &str, line: usize) -> AnalysisResult<()> {
        match tag {
            "label" => self.label = Some(text.to_string()),
            "path" => self.path = Some(text.to_string()),
            "tauval" => self.tau = Some(parse_value(tag, text, line)?),
            "lval" => self.lattice_size = Some(parse_value(tag, text, line)?),
            "ntherm" => self.ntherm = Some(parse_value(tag, text, line)?),
            "max_order" => {
                let order: usize = parse_value(tag, text, line)?;
                if order == 0 {
                    return Err(invalid(tag, text, "at least one order is required", line));
                }
                self.max_order = Some(order);
            }
            "normalization" => self.normalization = Some(parse_value(tag, text, line)?),
            _ => self.filename_contains = Some(text.to_string()),
        }
        Ok(())
    }

    fn build(self, line: usize) -> AnalysisResult<DirectorySpec> {
        let missing = |what: &str| AnalysisError::MissingAttribute {
            tag: "directory".to_string(),
            attribute: what.to_string(),
            line,
        };
        let path = self.path.ok_or_else(|| missing("path"))?;
        Ok(DirectorySpec {
            label: self.label.unwrap_or_else(|| path.clone()),
            tau: self.tau.unwrap_or(0.0),
            lattice_size: self.lattice_size.ok_or_else(|| missing("lval"))?,
            ntherm: self.ntherm.unwrap_or(0),
            max_order: self.max_order.ok_or_else(|| missing("max_order"))?,
            normalization: self.normalization.unwrap_or(1.0),
            swap_endian: self.swap_endian,
            complex: self.complex,
            filename_contains: self.filename_contains.unwrap_or_default(),
            path: path.into(),
        })
    }
}

// ---- Tag registry --------------------------------------------------------------

struct Attributes<'a> {
    tag: &'a str,
    line: usize,
    pairs: &'a [(String, String)],
}

impl Attributes<'_> {
    fn get(&self, name: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    fn required(&self, name: &str) -> AnalysisResult<&str> {
        self.get(name).ok_or_else(|| AnalysisError::MissingAttribute {
            tag: self.tag.to_string(),
            attribute: name.to_string(),
            line: self.line,
        })
    }

    fn list<T: FromStr>(&self, name: &str) -> AnalysisResult<Vec<T>> {
        let raw = self.required(name)?;
        let items = raw
            .split_whitespace()
            .map(|item| parse_value(self.tag, item, self.line))
            .collect::<AnalysisResult<Vec<T>>>()?;
        if items.is_empty() {
            return Err(invalid(self.tag, raw, &format!("'{name}' must not be empty"), self.line));
        }
        Ok(items)
    }
}

struct TagSpec {
    parents: &'static [&'static str],
    open: fn(&Attributes<'_>) -> AnalysisResult<Builder>,
}

fn tag_registry() -> HashMap<&'static str, TagSpec> {
    let field = TagSpec { parents: &["directory"], open: |_| Ok(Builder::Field { text: String::new() }) };
    let flag = || TagSpec { parents: &["directory"], open: |_| Ok(Builder::Flag) };

    let mut registry = HashMap::new();
    registry.insert(
        "analysis",
        TagSpec {
            parents: &[ROOT],
            open: |_| Ok(Builder::Analysis { directories: Vec::new(), actions: Vec::new() }),
        },
    );
    registry.insert(
        "directory",
        TagSpec { parents: &["analysis"], open: |_| Ok(Builder::Directory(DirectoryDraft::default())) },
    );
    for name in
        ["label", "path", "tauval", "lval", "ntherm", "max_order", "normalization", "filenamecontains"]
    {
        registry.insert(name, TagSpec { parents: field.parents, open: field.open });
    }
    registry.insert("swap_endian", flag());
    registry.insert("complex", flag());
    registry.insert(
        "actions",
        TagSpec { parents: &["analysis"], open: |_| Ok(Builder::Actions(Vec::new())) },
    );
    registry.insert(
        "show",
        TagSpec { parents: &["actions"], open: |a| Ok(Builder::Show { orders: a.list("orders")? }) },
    );
    registry.insert("extrapolate", TagSpec { parents: &["actions"], open: open_extrapolate });
    registry.insert("plot", TagSpec { parents: &["extrapolate"], open: open_plot });
    registry.insert("therm", TagSpec { parents: &["actions"], open: open_therm });
    registry
}

fn open_extrapolate(attrs: &Attributes<'_>) -> AnalysisResult<Builder> {
    let lattice_sizes = match attrs.get("l") {
        Some(_) => Some(attrs.list("l")?),
        None => None,
    };
    let basis = match attrs.get("basis") {
        Some(raw) => Basis::from_str(raw)
            .map_err(|err| invalid(attrs.tag, raw, &err.to_string(), attrs.line))?,
        None => Basis::linear(),
    };
    Ok(Builder::Extrapolate(ExtrapolateAction {
        orders: attrs.list("orders")?,
        lattice_sizes,
        basis,
        plots: Vec::new(),
    }))
}

fn open_plot(attrs: &Attributes<'_>) -> AnalysisResult<Builder> {
    let known = match attrs.get("known") {
        Some(raw) => raw
            .split_whitespace()
            .map(|v| parse_value(attrs.tag, v, attrs.line))
            .collect::<AnalysisResult<Vec<f64>>>()?,
        None => Vec::new(),
    };
    Ok(Builder::Plot(PlotRequest {
        lattice_sizes: attrs.list("l")?,
        orders: attrs.list("orders")?,
        pdfname: attrs.required("pdfname")?.to_string(),
        ylabel: attrs.get("ylabel").unwrap_or_default().to_string(),
        known,
    }))
}

fn open_therm(attrs: &Attributes<'_>) -> AnalysisResult<Builder> {
    let raw = attrs.required("range")?;
    let bounds: Vec<usize> = attrs.list("range")?;
    let [start, end, step] = bounds[..] else {
        return Err(invalid(attrs.tag, raw, "range needs 'start end step'", attrs.line));
    };
    if step == 0 {
        return Err(invalid(attrs.tag, raw, "step must be positive", attrs.line));
    }
    Ok(Builder::Therm { orders: attrs.list("orders")?, range: ThermRange { start, end, step } })
}

fn parse_value<T: FromStr>(tag: &str, text: &str, line: usize) -> AnalysisResult<T> {
    text.trim().parse().map_err(|_| {
        invalid(tag, text, &format!("expected {}", std::any::type_name::<T>()), line)
    })
}

fn invalid(tag: &str, value: &str, reason: &str, line: usize) -> AnalysisError {
    AnalysisError::InvalidValue {
        tag: tag.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
        line,
    }
}

// ---- Tokenizer -----------------------------------------------------------------

struct Token {
    kind: TokenKind,
    line: usize,
}

enum TokenKind {
    Open { name: String, attrs: Vec<(String, String)>, self_closing: bool },
    Close { name: String },
    Text(String),
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn advance(&mut self, bytes: usize) -> &'a str {
        let taken = &self.src[self.pos..self.pos + bytes];
        self.line += taken.matches('\n').count();
        self.pos += bytes;
        taken
    }

    fn skip_past(&mut self, end: &str, what: &str) -> AnalysisResult<&'a str> {
        let line = self.line;
        match self.rest().find(end) {
            Some(idx) => {
                let body = self.advance(idx);
                self.advance(end.len());
                Ok(body)
            }
            None => Err(AnalysisError::Syntax { message: format!("unterminated {what}"), line }),
        }
    }

    fn skip_whitespace(&mut self) {
        let n = self.rest().len() - self.rest().trim_start().len();
        self.advance(n);
    }

    fn name(&mut self) -> AnalysisResult<String> {
        let n = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
            .unwrap_or(self.rest().len());
        if n == 0 {
            return Err(AnalysisError::Syntax {
                message: "expected a tag or attribute name".to_string(),
                line: self.line,
            });
        }
        Ok(self.advance(n).to_ascii_lowercase())
    }

    fn expect(&mut self, s: &str) -> AnalysisResult<()> {
        if self.rest().starts_with(s) {
            self.advance(s.len());
            Ok(())
        } else {
            Err(AnalysisError::Syntax { message: format!("expected '{s}'"), line: self.line })
        }
    }
}

fn tokenize(src: &str) -> AnalysisResult<Vec<Token>> {
    let mut sc = Scanner { src, pos: 0, line: 1 };
    let mut tokens = Vec::new();

    while !sc.rest().is_empty() {
        let line = sc.line;
        let rest = sc.rest();
        if rest.starts_with("<!--") {
            sc.advance(4);
            sc.skip_past("-->", "comment")?;
        } else if rest.starts_with("<?") {
            sc.skip_past("?>", "processing instruction")?;
        } else if rest.starts_with("<![CDATA[") {
            sc.advance(9);
            let raw = sc.skip_past("]]>", "CDATA section")?;
            tokens.push(Token { kind: TokenKind::Text(raw.to_string()), line });
        } else if rest.starts_with("<!") {
            // a DOCTYPE internal subset may itself contain '>'
            match (rest.find('['), rest.find('>')) {
                (Some(open), Some(close)) if open < close => {
                    sc.skip_past("]", "declaration")?;
                    sc.skip_past(">", "declaration")?;
                }
                _ => {
                    sc.skip_past(">", "declaration")?;
                }
            }
        } else if rest.starts_with("</") {
            sc.advance(2);
            let name = sc.name()?;
            sc.skip_whitespace();
            sc.expect(">")?;
            tokens.push(Token { kind: TokenKind::Close { name }, line });
        } else if rest.starts_with('<') {
            sc.advance(1);
            let name = sc.name()?;
            let mut attrs = Vec::new();
            let self_closing = loop {
                sc.skip_whitespace();
                if sc.rest().starts_with("/>") {
                    sc.advance(2);
                    break true;
                }
                if sc.rest().starts_with('>') {
                    sc.advance(1);
                    break false;
                }
                let key = sc.name()?;
                sc.skip_whitespace();
                sc.expect("=")?;
                sc.skip_whitespace();
                let quote = match sc.rest().chars().next() {
                    Some(q @ ('"' | '\'')) => q,
                    _ => {
                        return Err(AnalysisError::Syntax {
                            message: format!("attribute '{key}' must be quoted"),
                            line: sc.line,
                        });
                    }
                };
                sc.advance(1);
                let raw = sc.skip_past(&quote.to_string(), "attribute value")?;
                attrs.push((key, decode_entities(raw, line)?));
            };
            tokens.push(Token { kind: TokenKind::Open { name, attrs, self_closing }, line });
        } else {
            let n = rest.find('<').unwrap_or(rest.len());
            let raw = sc.advance(n);
            tokens.push(Token { kind: TokenKind::Text(decode_entities(raw, line)?), line });
        }
    }
    Ok(tokens)
}

fn decode_entities(raw: &str, line: usize) -> AnalysisResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        let semi = tail.find(';').ok_or_else(|| AnalysisError::Syntax {
            message: "unterminated entity reference".to_string(),
            line,
        })?;
        let entity = &tail[..semi];
        let decoded = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(str::parse))
                .and_then(Result::ok)
                .and_then(char::from_u32),
        };
        let ch = decoded.ok_or_else(|| AnalysisError::Syntax {
            message: format!("unknown entity '&{entity};'"),
            line,
        })?;
        out.push(ch);
        rest = &tail[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
