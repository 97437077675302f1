// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Card Stack: which hovercards are open, and when they close.
//!
//! ## Overview
//!
//! [`CardStack`] owns the open cards. Cards form a forest: a card opened from a
//! link inside another card is its child, one level deeper. Closing a card closes
//! its descendants first. The number of open cards is bounded; the oldest card
//! that is not an ancestor of the one being opened is evicted.
//!
//! Content comes from an ordered list of [`ContentSource`]s. A card is visible in
//! a loading state as soon as it opens; the first source with an answer wins, and
//! a failing source is logged and skipped.
//!
//! [`StackController`] wraps a stack and an
//! [`understory_pointer_zone::ZoneTracker`] and runs the timed auto-close state
//! machine: cards close after the pointer has been away for a while, faster and
//! faster while the user keeps exploring, and never while the pointer is over a
//! card. Time comes from an injected [`Clock`]; timers are fired by the host
//! calling [`StackController::tick`].
//!
//! ## Minimal example
//!
//! ```
//! use std::rc::Rc;
//! use std::sync::Arc;
//!
//! use core::time::Duration;
//! use kurbo::{Point, Rect};
//! use understory_card_stack::{
//!     CardPhase, Content, HovercardConfig, ManualClock, PlacementRequest, StackController,
//!     StaticSource,
//! };
//! use understory_pointer_zone::RegionTable;
//!
//! let clock = ManualClock::new();
//! let glossary = StaticSource::new("glossary").with("API", Content::new("Application Programming Interface"));
//! let mut ctl = StackController::new(
//!     &HovercardConfig::default(),
//!     RegionTable::new(Rect::new(0.0, 0.0, 800.0, 600.0)),
//!     vec![Arc::new(glossary)],
//!     |r: &PlacementRequest| r.requested,
//!     Rc::new(clock.clone()),
//! )
//! .unwrap();
//!
//! let card = ctl.open("API", None, Point::new(10.0, 30.0), None);
//! assert!(ctl.stack().card(card).unwrap().is_loading());
//! ctl.poll_resolutions();
//! assert!(ctl.stack().card(card).unwrap().content().is_some());
//!
//! // Nobody is pointing at the card: after the grace window it is scheduled to close.
//! clock.advance(Duration::from_millis(300));
//! ctl.tick();
//! assert_eq!(ctl.phase_of(card), Some(CardPhase::ScheduledClose));
//! ```

mod card;
mod clock;
mod config;
mod content;
mod controller;
mod engine;
mod error;
mod placement;
mod timers;

pub use card::{Card, CardId};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{HovercardConfig, HovercardConfigBuilder, LinkMode, StackingMode};
pub use content::{Content, ContentSource, Link, ResolveFuture, StaticSource};
pub use controller::{CardPhase, StackController};
pub use engine::{CardStack, StackEvent};
pub use error::{ConfigError, SourceError};
pub use placement::{AdjacentPlacement, PlacementRequest, PositionResolver};
pub use timers::{TimerId, TimerQueue};
