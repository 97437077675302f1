// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Card records.

use core::fmt;
use core::time::Duration;

use kurbo::{Point, Rect};

use crate::Content;

/// Identifier of a card. Never reused within one [`CardStack`](crate::CardStack).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardId(pub(crate) u64);

impl CardId {
    /// Raw value, for hosts that key their own tables by card.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card#{}", self.0)
    }
}

/// One open card.
///
/// Cards are owned by the stack; hosts read them through
/// [`CardStack::card`](crate::CardStack::card) and never mutate them.
#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub(crate) id: CardId,
    pub(crate) term: String,
    pub(crate) content: Option<Content>,
    pub(crate) position: Point,
    pub(crate) pinned: bool,
    pub(crate) loading: bool,
    pub(crate) parent: Option<CardId>,
    pub(crate) level: u32,
    pub(crate) opened_at: Duration,
    pub(crate) anchor: Option<Rect>,
    // Bumped on every (re)load; resolutions carrying an older value are dropped.
    pub(crate) generation: u64,
}

impl Card {
    /// Card id.
    pub fn id(&self) -> CardId {
        self.id
    }

    /// Term shown by the card.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Resolved content, if any source answered.
    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    /// Viewport-space origin.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Whether the card is exempt from auto-close.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Whether content resolution is still in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Card this one was opened from.
    pub fn parent_id(&self) -> Option<CardId> {
        self.parent
    }

    /// Nesting depth; zero for roots.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Clock time of the open.
    pub fn opened_at(&self) -> Duration {
        self.opened_at
    }

    /// Bounds of the trigger the card was opened from, when known.
    pub fn anchor(&self) -> Option<Rect> {
        self.anchor
    }

    /// Resolution finished without content. Renderers show an empty state.
    pub fn is_empty(&self) -> bool {
        !self.loading && self.content.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_means_loaded_without_content() {
        let mut card = Card {
            id: CardId(3),
            term: "API".into(),
            content: None,
            position: Point::ORIGIN,
            pinned: false,
            loading: true,
            parent: None,
            level: 0,
            opened_at: Duration::ZERO,
            anchor: None,
            generation: 0,
        };
        assert!(!card.is_empty());
        card.loading = false;
        assert!(card.is_empty());
        card.content = Some(Content::new("API"));
        assert!(!card.is_empty());
        assert_eq!(card.id().to_string(), "card#3");
    }
}
