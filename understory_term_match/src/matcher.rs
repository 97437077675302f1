// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Term registry and scanner.
//!
//! All registered terms and aliases are compiled into one alternation,
//! longest first, so that at any offset the longest known term wins.
//! The pattern is rebuilt once per registry change, so whole glossaries
//! should be loaded with [`TermMatcher::add_terms`] rather than term by term.

use alloc::borrow::ToOwned;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use regex::{Regex, RegexBuilder};

use crate::{Match, MatchError, Selector, TextTree};

/// Confidence of a match whose text equals the canonical term exactly.
pub const EXACT_CONFIDENCE: f32 = 1.0;
/// Confidence of a match that differs from the canonical term only by case.
pub const CASE_CONFIDENCE: f32 = 0.9;
/// Confidence of alias and other normalized matches.
pub const NORMALIZED_CONFIDENCE: f32 = 0.8;

/// Default compiled-size limit for the term pattern, in bytes.
pub const DEFAULT_PATTERN_SIZE_LIMIT: usize = 64 << 20;

/// How term boundaries are located in text.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Only whole words match (`\b` on both sides).
    #[default]
    WordBoundary,
    /// Any occurrence matches, including inside longer words.
    Substring,
}

/// Matcher settings.
#[derive(Clone, Debug, PartialEq)]
pub struct MatcherConfig {
    /// Boundary strategy.
    pub strategy: MatchStrategy,
    /// When false, terms and text are compared case-insensitively.
    pub case_sensitive: bool,
    /// Subtrees matching any of these are never scanned.
    pub excluded: Vec<Selector>,
    /// Upper bound on the compiled pattern. Registering more terms than fit fails.
    pub pattern_size_limit: usize,
}

impl MatcherConfig {
    /// Replace the exclusion list with parsed `selectors`.
    pub fn with_excluded<S: AsRef<str>>(mut self, selectors: &[S]) -> Result<Self, MatchError> {
        self.excluded = selectors
            .iter()
            .map(|s| s.as_ref().parse())
            .collect::<Result<_, _>>()?;
        Ok(self)
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            strategy: MatchStrategy::WordBoundary,
            case_sensitive: false,
            excluded: Selector::defaults(),
            pattern_size_limit: DEFAULT_PATTERN_SIZE_LIMIT,
        }
    }
}

/// A canonical term and its aliases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermEntry {
    canonical: String,
    aliases: Vec<String>,
}

impl TermEntry {
    /// The display form of the term, as first registered.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Aliases in registration order.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

/// A match inside a single string.
#[derive(Clone, Debug, PartialEq)]
pub struct TextMatch {
    /// Canonical term.
    pub term: String,
    /// Start byte offset.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Confidence in `0.8..=1.0`.
    pub confidence: f32,
}

/// A piece of a string split by [`TermMatcher::highlight`].
#[derive(Clone, Debug, PartialEq)]
pub enum Segment<'a> {
    /// Text with no term in it.
    Plain(&'a str),
    /// Text that should become a trigger for `term`.
    Matched {
        /// The matched slice.
        text: &'a str,
        /// Canonical term.
        term: String,
        /// Match confidence.
        confidence: f32,
    },
}

#[derive(Copy, Clone, Debug)]
struct Key {
    entry: usize,
    alias: bool,
}

/// Registry of known terms plus the compiled scan pattern.
#[derive(Clone, Debug)]
pub struct TermMatcher {
    config: MatcherConfig,
    entries: Vec<TermEntry>,
    // Normalized term or alias -> entry.
    keys: BTreeMap<String, Key>,
    pattern: Option<Regex>,
}

impl TermMatcher {
    /// Create an empty matcher.
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            keys: BTreeMap::new(),
            pattern: None,
        }
    }

    /// Current settings.
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Number of canonical terms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no terms are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered entries in registration order.
    pub fn terms(&self) -> impl Iterator<Item = &TermEntry> {
        self.entries.iter()
    }

    fn normalize(&self, s: &str) -> String {
        if self.config.case_sensitive {
            s.to_owned()
        } else {
            s.to_lowercase()
        }
    }

    /// Look up the entry for a term or alias.
    pub fn entry(&self, text: &str) -> Option<&TermEntry> {
        let key = self.keys.get(&self.normalize(text.trim()))?;
        self.entries.get(key.entry)
    }

    /// Register `term` with optional aliases.
    ///
    /// Registering a term that already exists merges the new aliases into it.
    /// An alias never shadows another entry's canonical term. On error the
    /// registry is left as it was.
    pub fn add_term(&mut self, term: &str, aliases: &[&str]) -> Result<(), MatchError> {
        self.add_terms([(term, aliases.iter().copied())])
    }

    /// Register many terms and compile the pattern once.
    ///
    /// Each item is a term and its aliases, with the same merge rules as
    /// [`add_term`](Self::add_term). The batch is all or nothing: an empty term
    /// or a pattern that fails to compile leaves the registry unchanged.
    pub fn add_terms<I, T, A>(&mut self, terms: I) -> Result<(), MatchError>
    where
        I: IntoIterator<Item = (T, A)>,
        T: AsRef<str>,
        A: IntoIterator,
        A::Item: AsRef<str>,
    {
        let entries = self.entries.clone();
        let keys = self.keys.clone();
        let mut result = Ok(());
        for (term, aliases) in terms {
            result = self.register(term.as_ref(), aliases);
            if result.is_err() {
                break;
            }
        }
        if result.is_ok() {
            result = self.rebuild();
        }
        if let Err(err) = &result {
            tracing::debug!(%err, "term batch rejected, registry restored");
            self.entries = entries;
            self.keys = keys;
        }
        result
    }

    fn register<A>(&mut self, term: &str, aliases: A) -> Result<(), MatchError>
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
    {
        let term = term.trim();
        if term.is_empty() {
            return Err(MatchError::EmptyTerm);
        }
        let key = self.normalize(term);
        let entry = match self.keys.get(&key) {
            Some(k) if !k.alias => k.entry,
            _ => {
                self.entries.push(TermEntry {
                    canonical: term.to_owned(),
                    aliases: Vec::new(),
                });
                let idx = self.entries.len() - 1;
                self.keys.insert(
                    key.clone(),
                    Key {
                        entry: idx,
                        alias: false,
                    },
                );
                idx
            }
        };
        for alias in aliases {
            let alias = alias.as_ref().trim();
            if alias.is_empty() {
                continue;
            }
            let akey = self.normalize(alias);
            if akey == key {
                continue;
            }
            match self.keys.get(&akey) {
                Some(k) if !k.alias => continue,
                Some(k) if k.entry != entry => {
                    // Re-pointed alias: drop it from the previous owner.
                    let previous = k.entry;
                    let normalized = akey.clone();
                    let case_sensitive = self.config.case_sensitive;
                    self.entries[previous].aliases.retain(|a| {
                        let a = if case_sensitive { a.clone() } else { a.to_lowercase() };
                        a != normalized
                    });
                }
                _ => {}
            }
            self.keys.insert(akey, Key { entry, alias: true });
            let aliases = &mut self.entries[entry].aliases;
            if !aliases.iter().any(|a| a == alias) {
                aliases.push(alias.to_owned());
            }
        }
        Ok(())
    }

    /// Remove every term.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.keys.clear();
        self.pattern = None;
    }

    fn rebuild(&mut self) -> Result<(), MatchError> {
        let mut words: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        // Longest first so alternation prefers "REST API" over "API".
        words.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        let source = match self.config.strategy {
            MatchStrategy::WordBoundary => format!(r"\b(?:{alternation})\b"),
            MatchStrategy::Substring => format!("(?:{alternation})"),
        };
        let pattern = RegexBuilder::new(&source)
            .case_insensitive(!self.config.case_sensitive)
            .size_limit(self.config.pattern_size_limit)
            .build()
            .map_err(MatchError::Pattern)?;
        tracing::debug!(keys = words.len(), "rebuilt term pattern");
        self.pattern = Some(pattern);
        Ok(())
    }

    fn classify(&self, matched: &str) -> Option<(String, f32)> {
        let key = self.keys.get(&self.normalize(matched))?;
        let canonical = &self.entries.get(key.entry)?.canonical;
        let confidence = if matched == canonical {
            EXACT_CONFIDENCE
        } else if matched.to_lowercase() == canonical.to_lowercase() {
            CASE_CONFIDENCE
        } else {
            NORMALIZED_CONFIDENCE
        };
        Some((canonical.clone(), confidence))
    }

    /// Scan a single string.
    pub fn find_in_text(&self, text: &str) -> Vec<TextMatch> {
        let mut out = Vec::new();
        let Some(pattern) = &self.pattern else {
            return out;
        };
        let mut at = 0;
        while at <= text.len() {
            let Some(m) = pattern.find_at(text, at) else {
                break;
            };
            if m.is_empty() {
                // Step over one character so an empty match cannot stall the scan.
                match text[m.end()..].chars().next() {
                    Some(c) => at = m.end() + c.len_utf8(),
                    None => break,
                }
                continue;
            }
            if let Some((term, confidence)) = self.classify(m.as_str()) {
                out.push(TextMatch {
                    term,
                    start: m.start(),
                    end: m.end(),
                    confidence,
                });
            }
            at = m.end();
        }
        out
    }

    /// Split `text` into plain and matched segments, in order.
    pub fn highlight<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        let mut out = Vec::new();
        let mut cursor = 0;
        for m in self.find_in_text(text) {
            if m.start > cursor {
                out.push(Segment::Plain(&text[cursor..m.start]));
            }
            out.push(Segment::Matched {
                text: &text[m.start..m.end],
                term: m.term,
                confidence: m.confidence,
            });
            cursor = m.end;
        }
        if cursor < text.len() {
            out.push(Segment::Plain(&text[cursor..]));
        }
        out
    }

    fn is_excluded<T: TextTree>(&self, tree: &T, node: T::Node) -> bool {
        tree.is_marker(node) || self.config.excluded.iter().any(|s| tree.matches(node, s))
    }

    /// Scan every text node under `root`.
    ///
    /// Text nodes are visited in document order; matches within one node are
    /// in scan order. Excluded and already-marked subtrees are skipped.
    pub fn find_matches<T: TextTree>(&self, tree: &T, root: T::Node) -> Vec<Match<T::Node>> {
        let mut out = Vec::new();
        if self.pattern.is_none() {
            return out;
        }
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.is_excluded(tree, node) {
                continue;
            }
            if let Some(text) = tree.text(node) {
                out.extend(self.find_in_text(text).into_iter().map(|m| Match {
                    term: m.term,
                    start: m.start,
                    end: m.end,
                    confidence: m.confidence,
                    node,
                }));
                continue;
            }
            // Reverse so the first child is popped first.
            stack.extend(tree.children(node).into_iter().rev());
        }
        out
    }
}
