// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exclusion selectors.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use crate::MatchError;

/// A simple element selector used to exclude subtrees from scanning.
///
/// Supported forms:
/// - `tag` matches elements by tag name (ASCII case-insensitive).
/// - `.class` matches elements carrying the class.
/// - `[attr]` matches elements carrying the attribute, whatever its value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Tag name, stored lowercase.
    Tag(String),
    /// Class name.
    Class(String),
    /// Attribute name.
    Attribute(String),
}

impl Selector {
    /// Selectors excluded by default: code-like and input-like elements.
    pub fn defaults() -> Vec<Self> {
        ["code", "pre", "kbd", "input", "textarea", "script", "style"]
            .into_iter()
            .map(|t| Self::Tag(t.to_owned()))
            .collect()
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl FromStr for Selector {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || MatchError::InvalidSelector(s.to_owned());
        if let Some(class) = s.strip_prefix('.') {
            return is_ident(class)
                .then(|| Self::Class(class.to_owned()))
                .ok_or_else(invalid);
        }
        if let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            let inner = inner.trim();
            return is_ident(inner)
                .then(|| Self::Attribute(inner.to_owned()))
                .ok_or_else(invalid);
        }
        if is_ident(s) {
            return Ok(Self::Tag(s.to_ascii_lowercase()));
        }
        Err(invalid())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(t) => f.write_str(t),
            Self::Class(c) => write!(f, ".{c}"),
            Self::Attribute(a) => write!(f, "[{a}]"),
        }
    }
}
