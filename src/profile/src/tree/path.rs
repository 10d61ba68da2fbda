//! Structural path queries over [`Element`] trees

use super::Element;
use crate::error::{ProfileError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Tag(String),
    Any,
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasAttribute(String),
    AttributeEquals(String, String),
    HasChild(String),
}

impl Predicate {
    fn holds(&self, element: &Element) -> bool {
        match self {
            Predicate::HasAttribute(key) => element.attributes.contains_key(key),
            Predicate::AttributeEquals(key, value) => element.attribute(key) == Some(value),
            Predicate::HasChild(tag) => element.child(tag).is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

impl Step {
    fn accepts(&self, element: &Element) -> bool {
        let test = match &self.test {
            NodeTest::Tag(tag) => &element.tag == tag,
            NodeTest::Any | NodeTest::Current => true,
        };
        test && self.predicates.iter().all(|p| p.holds(element))
    }
}

/// Compiled relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ElementPath {
    steps: Vec<Step>,
}

impl ElementPath {
    pub(crate) fn parse(path: &str) -> Result<Self> {
        let invalid = |reason: &str| ProfileError::InvalidQuery {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty path"));
        }
        if trimmed.starts_with('/') {
            return Err(invalid("absolute paths are not supported"));
        }

        let segments = split_segments(trimmed).ok_or_else(|| invalid("unterminated predicate"))?;

        let mut steps = Vec::new();
        let mut axis = Axis::Child;
        let last = segments.len().saturating_sub(1);
        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                if i == last || axis == Axis::Descendant {
                    return Err(invalid("dangling separator"));
                }
                axis = Axis::Descendant;
                continue;
            }
            let step = parse_step(segment, axis).map_err(|reason| invalid(&reason))?;
            steps.push(step);
            axis = Axis::Child;
        }

        Ok(Self { steps })
    }

    pub(crate) fn select<'a>(&self, root: &'a Element) -> Vec<&'a Element> {
        let mut context = vec![root];
        for step in &self.steps {
            let mut next: Vec<&'a Element> = Vec::new();
            for element in &context {
                let candidates: Vec<&'a Element> = match (step.axis, &step.test) {
                    (Axis::Child, NodeTest::Current) => vec![*element],
                    (Axis::Descendant, NodeTest::Current) => element.iter().collect(),
                    (Axis::Child, _) => element.children.iter().collect(),
                    (Axis::Descendant, _) => element.iter().skip(1).collect(),
                };
                for candidate in candidates {
                    if step.accepts(candidate) && !next.iter().any(|e| std::ptr::eq(*e, candidate)) {
                        next.push(candidate);
                    }
                }
            }
            context = next;
        }
        context
    }
}

/// Split on `/` outside of predicates and quotes
fn split_segments(path: &str) -> Option<Vec<String>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in path.chars() {
        match (quote, c) {
            (Some(q), _) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), _) => current.push(c),
            (None, '\'' | '"') if depth > 0 => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[') => {
                depth += 1;
                current.push(c);
            }
            (None, ']') => {
                depth = depth.checked_sub(1)?;
                current.push(c);
            }
            (None, '/') if depth == 0 => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if depth != 0 || quote.is_some() {
        return None;
    }
    segments.push(current);
    Some(segments)
}

fn parse_step(segment: &str, axis: Axis) -> std::result::Result<Step, String> {
    let (head, mut rest) = match segment.find('[') {
        Some(i) => segment.split_at(i),
        None => (segment, ""),
    };

    let test = match head {
        "." => NodeTest::Current,
        "*" => NodeTest::Any,
        ".." => return Err("parent steps are not supported".to_string()),
        "" => return Err(format!("missing node test in '{}'", segment)),
        tag => NodeTest::Tag(tag.to_string()),
    };

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let body_end = closing_bracket(rest).ok_or_else(|| format!("malformed predicate in '{}'", segment))?;
        predicates.push(parse_predicate(&rest[1..body_end])?);
        rest = &rest[body_end + 1..];
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

/// Index of the `]` closing the predicate that opens at `rest[0]`
fn closing_bracket(rest: &str) -> Option<usize> {
    if !rest.starts_with('[') {
        return None;
    }
    let mut quote: Option<char> = None;
    for (i, c) in rest.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_predicate(body: &str) -> std::result::Result<Predicate, String> {
    let body = body.trim();
    if let Some(attr) = body.strip_prefix('@') {
        return match attr.split_once('=') {
            None if !attr.is_empty() => Ok(Predicate::HasAttribute(attr.to_string())),
            None => Err("empty attribute name".to_string()),
            Some((key, value)) => {
                let value = unquote(value.trim())
                    .ok_or_else(|| format!("attribute value must be quoted: {}", value))?;
                Ok(Predicate::AttributeEquals(key.trim().to_string(), value.to_string()))
            }
        };
    }
    if body.is_empty() || body.contains(|c: char| c == '=' || c == '\'' || c == '"') {
        return Err(format!("unsupported predicate '[{}]'", body));
    }
    Ok(Predicate::HasChild(body.to_string()))
}

fn unquote(value: &str) -> Option<&str> {
    let first = value.chars().next()?;
    if (first == '\'' || first == '"') && value.len() >= 2 && value.ends_with(first) {
        Some(&value[1..value.len() - 1])
    } else {
        None
    }
}
