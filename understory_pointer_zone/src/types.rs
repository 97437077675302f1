// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types: zones, pointer samples and state, markers, and the hit-test adapter.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::time::Duration;

use kurbo::{Point, Rect, Vec2};

/// Classified pointer location relative to registered regions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Over the card currently on top of the stack.
    TopCard,
    /// Over a card that is not on top.
    OtherCard,
    /// Over a trigger and no card.
    Trigger,
    /// Over nothing registered, or outside the viewport.
    #[default]
    None,
}

impl Zone {
    /// Whether the zone is any card.
    pub fn is_over_stack(self) -> bool {
        matches!(self, Self::TopCard | Self::OtherCard)
    }
}

/// Kind of pointing device.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum InputType {
    /// Mouse or trackpad.
    #[default]
    Mouse,
    /// Touch screen.
    Touch,
    /// Stylus.
    Pen,
}

/// One raw input sample from the host.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerSample {
    /// Viewport-space position.
    pub position: Point,
    /// Monotonic timestamp.
    pub timestamp: Duration,
    /// Device kind.
    pub input_type: InputType,
}

impl PointerSample {
    /// A mouse sample.
    pub fn mouse(x: f64, y: f64, timestamp: Duration) -> Self {
        Self {
            position: Point::new(x, y),
            timestamp,
            input_type: InputType::Mouse,
        }
    }
}

/// Last known pointer state, as delivered to subscribers.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PointerState {
    /// Viewport-space position of the latest sample.
    pub position: Point,
    /// Classified zone.
    pub zone: Zone,
    /// Timestamp of the latest sample.
    pub timestamp: Duration,
    /// Device kind of the latest sample.
    pub input_type: InputType,
    /// Smoothed velocity in px/ms, once two samples far enough apart were seen.
    pub velocity: Option<Vec2>,
}

bitflags::bitflags! {
    /// Markers a host attaches to regions so ancestors can be located from any hit.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Marker: u8 {
        /// Region is a trigger for a term.
        const TRIGGER = 0b0000_0001;
        /// Region is a card.
        const CARD    = 0b0000_0010;
        /// Region scrolls its content.
        const SCROLL  = 0b0000_0100;
    }
}

/// Platform hit-testing capability.
///
/// This is the only view of the host's visual tree the tracker needs.
pub trait RegionHitTest {
    /// Host-owned region handle. The tracker stores copies for lookup only.
    type Region: Copy + Ord + Debug;

    /// Every region containing `point`, topmost first.
    fn regions_at(&self, point: Point) -> Vec<Self::Region>;

    /// `region` itself or its nearest ancestor carrying `marker`.
    fn nearest_marked(&self, region: Self::Region, marker: Marker) -> Option<Self::Region>;

    /// Visible viewport. Points outside it classify as [`Zone::None`].
    fn viewport(&self) -> Rect;
}

/// Handle returned by [`ZoneTracker::subscribe`](crate::ZoneTracker::subscribe).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Tracker tuning.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrackerConfig {
    /// Speed (px/ms) below which a sample counts as jitter.
    pub velocity_threshold: f64,
    /// Samples closer together than this do not update velocity.
    pub min_sample_interval: Duration,
    /// Consecutive slow samples required before a slow pointer is reclassified.
    pub settle_samples: u32,
    /// Weight of the newest raw velocity in the smoothed value, in `0..=1`.
    pub smoothing: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            velocity_threshold: 0.05,
            min_sample_interval: Duration::from_millis(16),
            settle_samples: 3,
            smoothing: 0.5,
        }
    }
}
