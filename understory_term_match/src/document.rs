// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text tree abstraction and an owned reference document.
//!
//! The matcher never touches a real DOM. Hosts implement [`TextTree`] over
//! whatever node handles they have; [`Document`] is a small owned tree used by
//! tests, demos and hosts that render from their own model.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::Selector;

/// Attribute that marks an element as a hovercard trigger (or an earlier match).
pub const TRIGGER_ATTRIBUTE: &str = "data-hovercard-term";

/// Read-only view of a host's rendered text.
pub trait TextTree {
    /// Node handle. Copied freely; never owned by the matcher.
    type Node: Copy + Eq + core::fmt::Debug;

    /// Children of `node` in document order.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Text content if `node` is a text node.
    fn text(&self, node: Self::Node) -> Option<&str>;

    /// Whether `node` is an element matching `selector`.
    fn matches(&self, node: Self::Node, selector: &Selector) -> bool;

    /// Whether `node` already carries a trigger/match marker.
    fn is_marker(&self, node: Self::Node) -> bool;
}

/// Handle to a node in a [`Document`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocNode(u32);

impl DocNode {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
enum Kind {
    Element {
        tag: String,
        classes: Vec<String>,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    kind: Kind,
    children: Vec<DocNode>,
}

/// An owned element/text tree rooted at a `body` element.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document containing only the root `body` element.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: Kind::Element {
                    tag: "body".into(),
                    classes: Vec::new(),
                    attributes: Vec::new(),
                },
                children: Vec::new(),
            }],
        }
    }

    /// The root element.
    pub fn root(&self) -> DocNode {
        DocNode(0)
    }

    fn push(&mut self, parent: DocNode, kind: Kind) -> DocNode {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "DocNode uses 32-bit indices by design."
        )]
        let id = DocNode(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        if let Some(p) = self.nodes.get_mut(parent.idx()) {
            p.children.push(id);
        }
        id
    }

    /// Append an element with the given tag under `parent`.
    pub fn append_element(&mut self, parent: DocNode, tag: &str) -> DocNode {
        self.push(
            parent,
            Kind::Element {
                tag: tag.to_ascii_lowercase(),
                classes: Vec::new(),
                attributes: Vec::new(),
            },
        )
    }

    /// Append a text node under `parent`.
    pub fn append_text(&mut self, parent: DocNode, text: &str) -> DocNode {
        self.push(parent, Kind::Text(text.to_owned()))
    }

    /// Add a class to an element. Ignored for text nodes.
    pub fn add_class(&mut self, node: DocNode, class: &str) {
        if let Some(Node {
            kind: Kind::Element { classes, .. },
            ..
        }) = self.nodes.get_mut(node.idx())
        {
            classes.push(class.to_owned());
        }
    }

    /// Set an attribute on an element, replacing an earlier value. Ignored for text nodes.
    pub fn set_attribute(&mut self, node: DocNode, name: &str, value: &str) {
        if let Some(Node {
            kind: Kind::Element { attributes, .. },
            ..
        }) = self.nodes.get_mut(node.idx())
        {
            match attributes.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_owned(),
                None => attributes.push((name.to_owned(), value.to_owned())),
            }
        }
    }

    /// Mark an element as the trigger for `term`.
    pub fn mark_trigger(&mut self, node: DocNode, term: &str) {
        self.set_attribute(node, TRIGGER_ATTRIBUTE, term);
    }

    /// Value of an attribute on an element.
    pub fn attribute(&self, node: DocNode, name: &str) -> Option<&str> {
        match &self.nodes.get(node.idx())?.kind {
            Kind::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            Kind::Text(_) => None,
        }
    }
}

impl TextTree for Document {
    type Node = DocNode;

    fn children(&self, node: DocNode) -> Vec<DocNode> {
        self.nodes
            .get(node.idx())
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn text(&self, node: DocNode) -> Option<&str> {
        match &self.nodes.get(node.idx())?.kind {
            Kind::Text(t) => Some(t),
            Kind::Element { .. } => None,
        }
    }

    fn matches(&self, node: DocNode, selector: &Selector) -> bool {
        let Some(Node {
            kind:
                Kind::Element {
                    tag,
                    classes,
                    attributes,
                },
            ..
        }) = self.nodes.get(node.idx())
        else {
            return false;
        };
        match selector {
            Selector::Tag(t) => tag.eq_ignore_ascii_case(t),
            Selector::Class(c) => classes.iter().any(|x| x == c),
            Selector::Attribute(a) => attributes.iter().any(|(n, _)| n == a),
        }
    }

    fn is_marker(&self, node: DocNode) -> bool {
        self.attribute(node, TRIGGER_ATTRIBUTE).is_some()
    }
}
