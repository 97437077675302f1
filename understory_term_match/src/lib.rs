// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Term Match: find known terms in rendered text.
//!
//! ## Overview
//!
//! This crate keeps a registry of glossary terms (each with optional aliases) and scans text for them.
//! It reports match spans with a confidence score so a renderer can wrap them in hovercard triggers.
//! It does not render anything and it does not walk a DOM directly.
//! Instead, a host exposes its text through the [`TextTree`] trait, and the matcher visits text nodes in document order.
//!
//! ## Confidence
//!
//! Every [`Match`] carries a confidence:
//! - `1.0` when the matched text equals the canonical term exactly.
//! - `0.9` when it differs from the canonical term only by case.
//! - `0.8` for every other match (aliases, normalized forms).
//!
//! ## Exclusions
//!
//! Subtrees matching any configured [`Selector`] (for example `code`, `pre` or `.no-hovercard`) are skipped,
//! as are subtrees that already carry a trigger marker from a previous pass.
//!
//! ## Minimal example
//!
//! ```
//! use understory_term_match::{Document, MatcherConfig, TermMatcher};
//!
//! let mut matcher = TermMatcher::new(MatcherConfig::default());
//! matcher.add_term("API", &["interface"]).unwrap();
//!
//! let mut doc = Document::new();
//! let p = doc.append_element(doc.root(), "p");
//! doc.append_text(p, "Learn the API today");
//!
//! let matches = matcher.find_matches(&doc, doc.root());
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].term, "API");
//! assert_eq!((matches[0].start, matches[0].end), (10, 13));
//! assert_eq!(matches[0].confidence, 1.0);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

use alloc::string::String;

mod document;
mod matcher;
mod selector;

pub use document::{DocNode, Document, TRIGGER_ATTRIBUTE, TextTree};
pub use matcher::{
    CASE_CONFIDENCE, DEFAULT_PATTERN_SIZE_LIMIT, EXACT_CONFIDENCE, MatchStrategy, MatcherConfig,
    NORMALIZED_CONFIDENCE, Segment, TermEntry, TermMatcher, TextMatch,
};
pub use selector::Selector;

/// A match found inside one text node of a [`TextTree`].
///
/// Offsets are byte offsets into that node's text, not a document-wide offset.
#[derive(Clone, Debug, PartialEq)]
pub struct Match<N> {
    /// Canonical term this match resolves to.
    pub term: String,
    /// Start byte offset within the text segment.
    pub start: usize,
    /// End byte offset (exclusive) within the text segment.
    pub end: usize,
    /// Confidence in `0.8..=1.0`.
    pub confidence: f32,
    /// The text node the match was found in. Owned by the host tree.
    pub node: N,
}

/// Errors raised while configuring a [`TermMatcher`].
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// A term (after trimming) was empty.
    #[error("terms must contain at least one non-whitespace character")]
    EmptyTerm,

    /// An exclusion selector could not be parsed.
    #[error("invalid exclusion selector `{0}`")]
    InvalidSelector(String),

    /// The combined term pattern failed to compile.
    #[error("term pattern error: {0}")]
    Pattern(regex::Error),
}
