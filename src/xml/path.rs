//! Path expressions over a [`Document`]
//!
//! Supports the XPath subset the field rules need:
//!
//! - `a/b` child steps, `a//b` descendant steps
//! - `.//a` relative descendant, `./a` relative child, `//a` and `/a` absolute
//! - `*` any element, `..` parent, `.` self, `text()` text nodes
//! - attribute predicates `[@name="value"]`, `[@name='value']`, `[@name]`
//!
//! Each step's result is de-duplicated and kept in document order, so
//! `Heading/*[@Flag="Y"]/../Name` yields each qualifying heading's name once.

use std::fmt;
use std::str::FromStr;

use super::{Document, NodeId, NodeKind};
use crate::error::{CorpusError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    Parent,
    SelfNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    AnyElement,
    Text,
    AnyNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    AttributeEquals { name: String, value: String },
    HasAttribute(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

/// Compiled path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    expression: String,
    absolute: bool,
    steps: Vec<Step>,
}

impl Path {
    /// Compile a path expression
    ///
    /// # Example
    ///
    /// ```
    /// use ncbi_corpus::xml::{Document, Path};
    ///
    /// let doc = Document::parse(
    ///     r#"<set><art><id type="doi">10.1/x</id><id type="pmc">PMC1</id></art></set>"#,
    /// )?;
    /// let path = Path::parse(r#".//id[@type="doi"]/text()"#)?;
    /// let article = doc.records()[0];
    /// assert_eq!(doc.joined(article, &path, ""), "10.1/x");
    /// # Ok::<(), ncbi_corpus::CorpusError>(())
    /// ```
    pub fn parse(expression: &str) -> Result<Self> {
        let invalid = |message: &str| CorpusError::InvalidPath {
            expression: expression.to_string(),
            message: message.to_string(),
        };

        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty expression"));
        }

        let segments = split_segments(trimmed).map_err(|m| invalid(&m))?;
        let mut rest = segments.as_slice();
        let mut absolute = false;
        let mut steps = Vec::new();

        match rest.first().map(String::as_str) {
            Some("") => {
                absolute = true;
                rest = &rest[1..];
            }
            Some(".") if rest.len() > 1 => {
                rest = &rest[1..];
            }
            _ => {}
        }

        let mut axis = Axis::Child;
        for segment in rest {
            if segment.is_empty() {
                if axis == Axis::Descendant {
                    return Err(invalid("'///' is not a valid separator"));
                }
                axis = Axis::Descendant;
                continue;
            }
            steps.push(parse_step(segment, axis).map_err(|m| invalid(&m))?);
            axis = Axis::Child;
        }

        if axis == Axis::Descendant {
            return Err(invalid("expression ends with a separator"));
        }
        if steps.is_empty() {
            return Err(invalid("expression has no steps"));
        }
        if steps[..steps.len() - 1]
            .iter()
            .any(|step| step.test == NodeTest::Text)
        {
            return Err(invalid("text() may only be the last step"));
        }

        Ok(Self {
            expression: expression.to_string(),
            absolute,
            steps,
        })
    }

    /// The source expression
    pub fn as_str(&self) -> &str {
        &self.expression
    }

    pub(super) fn evaluate(&self, doc: &Document, context: NodeId) -> Vec<NodeId> {
        let start = if self.absolute {
            doc.document_node()
        } else {
            context
        };
        let mut current = vec![start];

        for step in &self.steps {
            let mut next = Vec::new();
            for &node in &current {
                match step.axis {
                    Axis::Child => next.extend(
                        doc.node(node)
                            .children
                            .iter()
                            .copied()
                            .filter(|id| step.matches(doc, *id)),
                    ),
                    Axis::Descendant => collect_descendants(doc, node, step, &mut next),
                    Axis::Parent => {
                        if let Some(parent) = doc.node(node).parent
                            && step.matches(doc, parent)
                        {
                            next.push(parent);
                        }
                    }
                    Axis::SelfNode => {
                        if step.matches(doc, node) {
                            next.push(node);
                        }
                    }
                }
            }
            next.sort_unstable();
            next.dedup();
            if next.is_empty() {
                return next;
            }
            current = next;
        }

        current
    }
}

impl FromStr for Path {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl Step {
    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let kind = &doc.node(id).kind;
        let test_ok = match (&self.test, kind) {
            (NodeTest::AnyNode, _) => true,
            (NodeTest::Text, NodeKind::Text(_)) => true,
            (NodeTest::AnyElement, NodeKind::Element { .. }) => true,
            (NodeTest::Name(wanted), NodeKind::Element { name, .. }) => wanted == name,
            _ => false,
        };
        test_ok
            && self.predicates.iter().all(|predicate| match predicate {
                Predicate::AttributeEquals { name, value } => {
                    doc.attribute(id, name) == Some(value.as_str())
                }
                Predicate::HasAttribute(name) => doc.attribute(id, name).is_some(),
            })
    }
}

fn collect_descendants(doc: &Document, node: NodeId, step: &Step, out: &mut Vec<NodeId>) {
    let mut stack: Vec<NodeId> = doc.node(node).children.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        if step.matches(doc, id) {
            out.push(id);
        }
        stack.extend(doc.node(id).children.iter().rev().copied());
    }
}

/// Split on `/` outside of predicates and quoted strings
fn split_segments(expression: &str) -> std::result::Result<Vec<String>, String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in expression.chars() {
        match (ch, quote) {
            (c, Some(q)) if c == q => {
                quote = None;
                current.push(c);
            }
            (c, Some(_)) => current.push(c),
            ('"' | '\'', None) if depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            ('[', None) => {
                depth += 1;
                current.push(ch);
            }
            (']', None) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ']'".to_string())?;
                current.push(ch);
            }
            ('/', None) if depth == 0 => segments.push(std::mem::take(&mut current)),
            (c, None) => current.push(c),
        }
    }

    if quote.is_some() {
        return Err("unterminated string literal".to_string());
    }
    if depth != 0 {
        return Err("unbalanced '['".to_string());
    }
    segments.push(current);
    Ok(segments)
}

fn parse_step(segment: &str, axis: Axis) -> std::result::Result<Step, String> {
    let segment = segment.trim();
    match segment {
        ".." => {
            if axis == Axis::Descendant {
                return Err("'..' cannot follow '//'".to_string());
            }
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }
        "." => {
            return Ok(Step {
                axis: if axis == Axis::Descendant {
                    Axis::Descendant
                } else {
                    Axis::SelfNode
                },
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }
        "text()" => {
            return Ok(Step {
                axis,
                test: NodeTest::Text,
                predicates: Vec::new(),
            });
        }
        _ => {}
    }

    let (name, mut predicate_src) = match segment.find('[') {
        Some(pos) => (&segment[..pos], &segment[pos..]),
        None => (segment, ""),
    };

    let test = match name {
        "*" => NodeTest::AnyElement,
        n if is_valid_name(n) => NodeTest::Name(n.to_string()),
        n => return Err(format!("invalid node test {n:?}")),
    };

    let mut predicates = Vec::new();
    while !predicate_src.is_empty() {
        let end = predicate_src
            .find(']')
            .ok_or_else(|| "unterminated predicate".to_string())?;
        predicates.push(parse_predicate(&predicate_src[1..end])?);
        predicate_src = &predicate_src[end + 1..];
        if !predicate_src.is_empty() && !predicate_src.starts_with('[') {
            return Err(format!("unexpected text after predicate: {predicate_src:?}"));
        }
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

fn parse_predicate(body: &str) -> std::result::Result<Predicate, String> {
    let body = body.trim();
    let attr = body
        .strip_prefix('@')
        .ok_or_else(|| format!("only attribute predicates are supported, got {body:?}"))?;

    match attr.split_once('=') {
        None => {
            let name = attr.trim();
            if !is_valid_name(name) {
                return Err(format!("invalid attribute name {name:?}"));
            }
            Ok(Predicate::HasAttribute(name.to_string()))
        }
        Some((name, value)) => {
            let name = name.trim();
            let value = value.trim();
            if !is_valid_name(name) {
                return Err(format!("invalid attribute name {name:?}"));
            }
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .ok_or_else(|| format!("attribute value must be quoted, got {value}"))?;
            Ok(Predicate::AttributeEquals {
                name: name.to_string(),
                value: unquoted.to_string(),
            })
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}
