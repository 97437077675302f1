// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Pointer Zone: where is the pointer, relative to hovercards?
//!
//! ## Overview
//!
//! [`ZoneTracker`] classifies the pointer into one of four [`Zone`]s:
//! over the top card, over another card, over a trigger, or over nothing.
//! It consumes raw pointer samples from the host, coalesces them to at most one
//! classification per animation frame, and notifies subscribers only when the
//! zone changes.
//!
//! ## Platform adapter
//!
//! The tracker does no hit testing of its own. The host implements [`RegionHitTest`]:
//! an ordered list of regions under a point (topmost first), the nearest ancestor
//! carrying a [`Marker`], and the viewport. [`RegionTable`] is a small in-memory
//! implementation for hosts without a scene of their own, and for tests.
//!
//! ## Registries
//!
//! Regions become meaningful only once registered as a trigger (with its term),
//! a card (with its id) or a scroll container. Registries hold handles for lookup
//! only; the host owns the regions. Any registry change reclassifies immediately.
//!
//! ## Minimal example
//!
//! ```
//! use core::time::Duration;
//! use kurbo::Rect;
//! use understory_pointer_zone::{
//!     Marker, PointerSample, RegionSpec, RegionTable, TrackerConfig, Zone, ZoneTracker,
//! };
//!
//! let mut table = RegionTable::new(Rect::new(0.0, 0.0, 800.0, 600.0));
//! let card = table.insert(
//!     None,
//!     RegionSpec { bounds: Rect::new(100.0, 100.0, 300.0, 250.0), z_index: 1, markers: Marker::CARD },
//! );
//!
//! let mut tracker = ZoneTracker::new(table, TrackerConfig::default(), || Some(1_u64));
//! tracker.start();
//! tracker.register_card(card, 1);
//!
//! if tracker.pointer_move(PointerSample::mouse(150.0, 150.0, Duration::ZERO)) {
//!     // The host would wait for its next animation frame here.
//!     assert_eq!(tracker.animation_frame(), Some(Zone::TopCard));
//! }
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod regions;
mod tracker;
mod types;

pub use regions::{RegionId, RegionSpec, RegionTable};
pub use tracker::ZoneTracker;
pub use types::{
    InputType, Marker, PointerSample, PointerState, RegionHitTest, SubscriptionId, TrackerConfig,
    Zone,
};
