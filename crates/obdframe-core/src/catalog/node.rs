//! Declarative catalog node tree.
//!
//! The catalog-file reader is an external collaborator; whatever format it
//! consumes (XML definition files in practice), its output is this plain
//! tree of named nodes. Serde derives let fixtures and host applications
//! ship node trees through any serde format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One node of the declarative catalog tree.
///
/// Unknown attribute keys and child names are ignored by the engine, so
/// readers may pass richer trees through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Element name, e.g. `"spec"`, `"protocol"`, `"parameter"`.
    pub name: String,

    /// Named string attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Text body; carries the script source on `script` nodes.
    #[serde(default)]
    pub text: String,

    /// Ordered children. Order is preserved through the catalog index
    /// (parameter listings follow source order).
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    /// Create an empty node with the given element name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: set an attribute.
    #[must_use]
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder: set the text body.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder: append a child node.
    #[must_use]
    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Attribute lookup. `None` when absent; empty values are returned
    /// as-is.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attribute lookup treating an empty value the same as an absent one,
    /// matching how definition files leave optional bytes blank.
    #[must_use]
    pub fn attribute_non_empty(&self, key: &str) -> Option<&str> {
        self.attribute(key).filter(|value| !value.is_empty())
    }

    /// Iterate children with a given element name, in source order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First child with a given element name.
    #[must_use]
    pub fn child_named<'a>(&'a self, name: &'a str) -> Option<&'a Node> {
        self.children_named(name).next()
    }
}
