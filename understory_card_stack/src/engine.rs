// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The card stack: the single owner of open cards.
//!
//! ## Opening
//!
//! An open first makes room (see [Eviction](#eviction)), then inserts the card
//! in a loading state and emits [`StackEvent::Opened`] right away. Content
//! resolution runs as a future owned by the stack; when it completes the card
//! is updated and `Opened` is emitted again for the same id.
//!
//! ## Eviction
//!
//! When `max_open_cards` cards are open, the oldest card that is not an
//! ancestor of the card being opened is closed (with its descendants). If only
//! ancestors remain, nothing is evicted and the cap is exceeded for this open.
//!
//! ## Driving resolution
//!
//! The stack never spawns. A host either awaits [`CardStack::next_resolution`]
//! in its event loop or calls [`CardStack::poll_resolutions`] to apply
//! everything that has already finished. Closing or replacing a card aborts
//! its load; the source future is dropped the next time the stack is polled.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use futures::future::{AbortHandle, Abortable, Aborted, BoxFuture};
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use kurbo::{Point, Rect};

use crate::card::{Card, CardId};
use crate::clock::Clock;
use crate::content::resolve_content;
use crate::placement::{PlacementRequest, PositionResolver};
use crate::{ConfigError, Content, ContentSource, HovercardConfig, LinkMode};

/// Lifecycle notification. Drained with [`CardStack::drain_events`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StackEvent {
    /// A card was opened, or its content finished resolving, or it was replaced in place.
    Opened(CardId),
    /// A card was removed.
    Closed(CardId),
    /// A card was pinned.
    Pinned(CardId),
}

struct Resolution {
    id: CardId,
    generation: u64,
    content: Option<Content>,
}

/// Bounded forest of open cards.
pub struct CardStack {
    config: HovercardConfig,
    sources: Arc<[Arc<dyn ContentSource>]>,
    placement: Box<dyn PositionResolver>,
    clock: Rc<dyn Clock>,
    // Insertion order; the last card is the top card.
    cards: Vec<Card>,
    next_id: u64,
    events: Vec<StackEvent>,
    pending: FuturesUnordered<BoxFuture<'static, Result<Resolution, Aborted>>>,
    // Abort handle of the live load of each loading card.
    loads: HashMap<CardId, AbortHandle>,
    top: Rc<Cell<Option<CardId>>>,
}

impl core::fmt::Debug for CardStack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CardStack")
            .field("cards", &self.cards)
            .field("sources", &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("pending", &self.pending.len())
            .field("loading", &self.loads.len())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl CardStack {
    /// Create an empty stack.
    ///
    /// Sources are queried in order for every open.
    pub fn new(
        config: &HovercardConfig,
        sources: Vec<Arc<dyn ContentSource>>,
        placement: impl PositionResolver + 'static,
        clock: Rc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            sources: sources.into(),
            placement: Box::new(placement),
            clock,
            cards: Vec::new(),
            next_id: 1,
            events: Vec::new(),
            pending: FuturesUnordered::new(),
            loads: HashMap::new(),
            top: Rc::new(Cell::new(None)),
        })
    }

    /// Configuration the stack was built with.
    pub fn config(&self) -> &HovercardConfig {
        &self.config
    }

    /// Open a card for `term`.
    ///
    /// A `parent` that is no longer open is ignored and the card opens as a root.
    pub fn open_card(
        &mut self,
        term: impl Into<String>,
        anchor: Option<Rect>,
        position: Point,
        parent: Option<CardId>,
    ) -> CardId {
        let parent = parent.filter(|&p| {
            let alive = self.contains(p);
            if !alive {
                tracing::debug!(parent = %p, "parent no longer open, opening as root");
            }
            alive
        });
        self.evict_for(parent);
        let (level, parent_position) = match parent.and_then(|p| self.card(p)) {
            Some(p) => (p.level + 1, Some(p.position)),
            None => (0, None),
        };
        let position = self.placement.place(&PlacementRequest {
            requested: position,
            anchor,
            parent: parent_position,
            level,
            adjacent: false,
        });
        self.insert(term.into(), anchor, position, parent, level, false)
    }

    /// Close `id` and every descendant, children before parents.
    ///
    /// Returns the removed ids in removal order. Unknown ids remove nothing.
    pub fn close_card(&mut self, id: CardId) -> Vec<CardId> {
        if !self.contains(id) {
            tracing::debug!(card = %id, "close of unknown card ignored");
            return Vec::new();
        }
        let mut order = Vec::new();
        self.post_order(id, &mut order);
        for &removed in &order {
            self.cards.retain(|c| c.id != removed);
            if let Some(load) = self.loads.remove(&removed) {
                load.abort();
            }
            self.events.push(StackEvent::Closed(removed));
        }
        tracing::debug!(card = %id, removed = order.len(), "closed card");
        self.sync_top();
        order
    }

    /// Close every card, newest root first.
    pub fn close_all(&mut self) -> Vec<CardId> {
        let roots: Vec<CardId> = self
            .cards
            .iter()
            .rev()
            .filter(|c| c.parent.is_none())
            .map(|c| c.id)
            .collect();
        roots.into_iter().flat_map(|r| self.close_card(r)).collect()
    }

    /// Pin the card showing `term`, opening one beside `anchor` if none is open.
    pub fn pin_card(&mut self, term: &str, anchor: Rect) -> CardId {
        if let Some(card) = self.cards.iter_mut().rev().find(|c| c.term == term) {
            if !card.pinned {
                card.pinned = true;
                self.events.push(StackEvent::Pinned(card.id));
            }
            return card.id;
        }
        self.evict_for(None);
        let position = self.placement.place(&PlacementRequest {
            requested: Point::new(anchor.x1, anchor.y0),
            anchor: Some(anchor),
            parent: None,
            level: 0,
            adjacent: true,
        });
        let id = self.insert(term.to_owned(), Some(anchor), position, None, 0, true);
        self.events.push(StackEvent::Pinned(id));
        id
    }

    /// Follow a link to `term` from inside card `from`.
    ///
    /// In [`LinkMode::NewCard`] this opens a child of `from`. In
    /// [`LinkMode::Replace`] the card keeps its id, parent and level and
    /// reloads with the new term. Returns `None` when `from` is not open.
    pub fn follow_link(
        &mut self,
        term: impl Into<String>,
        from: CardId,
        position: Point,
    ) -> Option<CardId> {
        if !self.contains(from) {
            tracing::debug!(card = %from, "link followed from a closed card");
            return None;
        }
        let term = term.into();
        match self.config.link_mode {
            LinkMode::NewCard => Some(self.open_card(term, None, position, Some(from))),
            LinkMode::Replace => {
                let card = self.cards.iter_mut().find(|c| c.id == from)?;
                card.term = term.clone();
                card.content = None;
                card.loading = true;
                card.generation += 1;
                let generation = card.generation;
                self.load(from, generation, term);
                self.events.push(StackEvent::Opened(from));
                Some(from)
            }
        }
    }

    /// Apply every resolution that is already complete. Returns how many cards changed.
    pub fn poll_resolutions(&mut self) -> usize {
        let mut applied = 0;
        while let Some(Some(result)) = self.pending.next().now_or_never() {
            let Ok(resolution) = result else {
                continue;
            };
            if self.apply(resolution).is_some() {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next resolution that lands on an open card.
    ///
    /// Returns `None` once nothing is in flight.
    pub async fn next_resolution(&mut self) -> Option<CardId> {
        loop {
            let Ok(resolution) = self.pending.next().await? else {
                continue;
            };
            if let Some(id) = self.apply(resolution) {
                return Some(id);
            }
        }
    }

    /// Number of open cards whose content is still loading.
    pub fn pending_loads(&self) -> usize {
        self.loads.len()
    }

    /// Look up an open card.
    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Open cards in the order they were opened.
    pub fn cards(&self) -> impl Iterator<Item = &Card> + '_ {
        self.cards.iter()
    }

    /// Most recently opened card that is still open.
    pub fn top_card(&self) -> Option<CardId> {
        self.cards.last().map(|c| c.id)
    }

    /// Shared cell always holding [`top_card`](Self::top_card).
    ///
    /// Hand a reader of this cell to the zone tracker as its top-card resolver.
    pub fn top_card_handle(&self) -> Rc<Cell<Option<CardId>>> {
        self.top.clone()
    }

    /// Direct children of `id`, oldest first.
    pub fn children_of(&self, id: CardId) -> Vec<CardId> {
        self.cards
            .iter()
            .filter(|c| c.parent == Some(id))
            .map(|c| c.id)
            .collect()
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors_of(&self, id: CardId) -> Vec<CardId> {
        let mut out = Vec::new();
        let mut cursor = self.card(id).and_then(|c| c.parent);
        while let Some(p) = cursor {
            out.push(p);
            cursor = self.card(p).and_then(|c| c.parent);
        }
        out
    }

    /// An open card showing `term`, newest first.
    pub fn find_by_term(&self, term: &str) -> Option<CardId> {
        self.cards.iter().rev().find(|c| c.term == term).map(|c| c.id)
    }

    /// Whether `id` is open.
    pub fn contains(&self, id: CardId) -> bool {
        self.card(id).is_some()
    }

    /// Number of open cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether no card is open.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Take the events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<StackEvent> {
        core::mem::take(&mut self.events)
    }

    fn insert(
        &mut self,
        term: String,
        anchor: Option<Rect>,
        position: Point,
        parent: Option<CardId>,
        level: u32,
        pinned: bool,
    ) -> CardId {
        let id = CardId(self.next_id);
        self.next_id += 1;
        tracing::debug!(card = %id, term = term.as_str(), level, "opening card");
        self.cards.push(Card {
            id,
            term: term.clone(),
            content: None,
            position,
            pinned,
            loading: true,
            parent,
            level,
            opened_at: self.clock.now(),
            anchor,
            generation: 0,
        });
        self.sync_top();
        self.events.push(StackEvent::Opened(id));
        self.load(id, 0, term);
        id
    }

    fn load(&mut self, id: CardId, generation: u64, term: String) {
        let sources = self.sources.clone();
        let (handle, registration) = AbortHandle::new_pair();
        if let Some(previous) = self.loads.insert(id, handle) {
            tracing::debug!(card = %id, "aborting superseded load");
            previous.abort();
        }
        let resolve = async move {
            let content = resolve_content(&sources, &term).await;
            Resolution {
                id,
                generation,
                content,
            }
        };
        self.pending.push(Abortable::new(resolve, registration).boxed());
    }

    fn apply(&mut self, resolution: Resolution) -> Option<CardId> {
        let Some(card) = self
            .cards
            .iter_mut()
            .find(|c| c.id == resolution.id && c.generation == resolution.generation)
        else {
            tracing::debug!(card = %resolution.id, "discarding stale resolution");
            return None;
        };
        card.content = resolution.content;
        card.loading = false;
        self.loads.remove(&resolution.id);
        self.events.push(StackEvent::Opened(resolution.id));
        Some(resolution.id)
    }

    fn evict_for(&mut self, parent: Option<CardId>) {
        let cap = self.config.max_open_cards;
        if self.cards.len() < cap {
            return;
        }
        let mut protected: HashSet<CardId> = self.ancestors_of_parent(parent);
        if let Some(p) = parent {
            protected.insert(p);
        }
        while self.cards.len() >= cap {
            let victim = self
                .cards
                .iter()
                .filter(|c| !protected.contains(&c.id))
                .min_by_key(|c| c.opened_at)
                .map(|c| c.id);
            let Some(victim) = victim else {
                tracing::debug!(open = self.cards.len(), cap, "only ancestors open, exceeding cap");
                return;
            };
            tracing::debug!(card = %victim, "evicting oldest card");
            self.close_card(victim);
        }
    }

    fn ancestors_of_parent(&self, parent: Option<CardId>) -> HashSet<CardId> {
        parent
            .map(|p| self.ancestors_of(p).into_iter().collect())
            .unwrap_or_default()
    }

    fn post_order(&self, id: CardId, out: &mut Vec<CardId>) {
        for child in self.children_of(id) {
            self.post_order(child, out);
        }
        out.push(id);
    }

    fn sync_top(&self) {
        self.top.set(self.top_card());
    }
}
