//! Generic labeled tree
//!
//! The external loader hands the core an already validated, already expanded
//! tree of [`Element`] nodes: a tag, an attribute mapping, optional text and
//! ordered children. Profiles, discovery snapshots and synthesized output all
//! share this shape.

mod path;
mod xml;

use crate::error::Result;
use path::ElementPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag of the synthetic container returned by [`Element::query`]
pub const RESULTS_TAG: &str = "results";

/// One node of a generic labeled tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Element {
    /// Element tag
    pub tag: String,

    /// Attributes, kept sorted so serialization is deterministic
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    /// Text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Ordered children
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    /// Create an empty element with the given tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Set an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set the text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Append a child
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children
    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    /// Attribute value
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Text content
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// First direct child with the given tag
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Direct children with the given tag, in document order
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Pre-order traversal starting at (and including) this element
    pub fn iter(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// All elements matched by a structural path, in document order
    ///
    /// Supported syntax: `tag`, `*`, `.`, `//` (descendant), and predicates
    /// `[@attr]`, `[@attr='value']`, `[tag]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use comarmor_profile::Element;
    ///
    /// let root = Element::new("profiles").with_child(
    ///     Element::new("profile")
    ///         .with_attribute("name", "talker")
    ///         .with_child(Element::new("topic").with_attribute("qualifier", "DENY")),
    /// );
    ///
    /// let denied = root.find_all(".//topic[@qualifier='DENY']").unwrap();
    /// assert_eq!(denied.len(), 1);
    /// ```
    pub fn find_all(&self, path: &str) -> Result<Vec<&Element>> {
        let compiled = ElementPath::parse(path)?;
        Ok(compiled.select(self))
    }

    /// First element matched by a structural path
    pub fn find(&self, path: &str) -> Result<Option<&Element>> {
        Ok(self.find_all(path)?.into_iter().next())
    }

    /// Text of the first element matched by a structural path
    pub fn find_text(&self, path: &str) -> Result<Option<&str>> {
        Ok(self.find(path)?.and_then(Element::text))
    }

    /// Copy every match of `path` into a new `results` container
    ///
    /// The returned tree owns its nodes; it is never a view into `self`.
    pub fn query(&self, path: &str) -> Result<Element> {
        let matches = self.find_all(path)?;
        Ok(Element::new(RESULTS_TAG).with_children(matches.into_iter().cloned()))
    }

    /// Render as indented XML
    pub fn to_xml(&self) -> String {
        self.to_string()
    }
}

/// Pre-order iterator over an element and its descendants
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.stack.extend(current.children.iter().rev());
        Some(current)
    }
}

/// Location of the `index`-th (1-based) child with `tag` below `parent`
pub fn child_location(parent: &str, tag: &str, index: usize) -> String {
    if parent.is_empty() {
        format!("{}[{}]", tag, index)
    } else {
        format!("{}/{}[{}]", parent, tag, index)
    }
}
