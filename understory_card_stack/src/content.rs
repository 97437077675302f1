// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Card content and the pluggable source contract.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::SourceError;

/// A link rendered inside a card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    /// Term the link opens.
    pub term: String,
    /// Display label; the term is shown when absent.
    pub label: Option<String>,
}

/// Resolved card payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Content {
    /// Card title.
    pub title: String,
    /// HTML body.
    pub html: Option<String>,
    /// Markdown body.
    pub markdown: Option<String>,
    /// Links in display order.
    pub links: Vec<Link>,
    /// Free-form metadata.
    pub meta: BTreeMap<String, String>,
}

impl Content {
    /// Content with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the HTML body.
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Set the Markdown body.
    pub fn with_markdown(mut self, markdown: impl Into<String>) -> Self {
        self.markdown = Some(markdown.into());
        self
    }

    /// Append a link.
    pub fn with_link(mut self, term: impl Into<String>, label: Option<&str>) -> Self {
        self.links.push(Link {
            term: term.into(),
            label: label.map(str::to_owned),
        });
        self
    }

    /// Insert a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Future returned by [`ContentSource::resolve`].
pub type ResolveFuture = BoxFuture<'static, Result<Option<Content>, SourceError>>;

/// A place content can come from: a glossary, a docs site, an API.
///
/// `Ok(None)` means "no answer"; an error is logged and treated the same way.
pub trait ContentSource: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Look up `term`.
    fn resolve(&self, term: &str) -> ResolveFuture;
}

/// An in-memory glossary. Lookups ignore case.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    name: String,
    entries: HashMap<String, Content>,
}

impl StaticSource {
    /// Empty glossary named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
        }
    }

    /// Add or replace the content for `term`.
    pub fn insert(&mut self, term: &str, content: Content) {
        self.entries.insert(term.to_lowercase(), content);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, term: &str, content: Content) -> Self {
        self.insert(term, content);
        self
    }
}

impl ContentSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(&self, term: &str) -> ResolveFuture {
        let found = self.entries.get(&term.to_lowercase()).cloned();
        futures::future::ready(Ok(found)).boxed()
    }
}

/// Ask each source in order; the first content wins.
pub(crate) async fn resolve_content(
    sources: &[Arc<dyn ContentSource>],
    term: &str,
) -> Option<Content> {
    for source in sources {
        match source.resolve(term).await {
            Ok(Some(content)) => return Some(content),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(source = source.name(), term, %error, "content source failed");
            }
        }
    }
    tracing::debug!(term, "no content found");
    None
}
