// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The zone tracker.
//!
//! ## Input path
//!
//! The host forwards raw samples to [`ZoneTracker::pointer_move`]. Each sample
//! updates position and (time-gated, smoothed) velocity. A sample either skips
//! reclassification (micro-jitter that has not yet settled) or marks a frame as
//! pending; the call returns `true` only for the sample that made the frame
//! pending, so the host requests at most one animation frame per burst. The
//! host then calls [`ZoneTracker::animation_frame`], which classifies once.
//!
//! ## Immediate paths
//!
//! Pointer leave, off-viewport samples, scrolls and registry changes classify
//! synchronously and cancel any pending frame.
//!
//! ## Notifications
//!
//! Subscribers hear the current state on subscribe, then only when the zone changes.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::time::Duration;

use kurbo::Point;

use crate::types::{
    Marker, PointerSample, PointerState, RegionHitTest, SubscriptionId, TrackerConfig, Zone,
};

type Listener = Box<dyn FnMut(&PointerState)>;

/// Classifies pointer position into [`Zone`]s against registered regions.
///
/// `C` is the card identifier type; the tracker compares it with the value
/// returned by the host's "current top card" resolver.
pub struct ZoneTracker<H: RegionHitTest, C> {
    host: H,
    config: TrackerConfig,
    top_card: Box<dyn Fn() -> Option<C>>,
    triggers: BTreeMap<H::Region, String>,
    cards: BTreeMap<H::Region, C>,
    scroll_containers: BTreeSet<H::Region>,
    state: PointerState,
    has_position: bool,
    velocity_anchor: Option<PointerSample>,
    slow_samples: u32,
    frame_pending: bool,
    active: bool,
    // Region stack under the last classified point.
    hit_cache: Option<(Point, Vec<H::Region>)>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<H: RegionHitTest, C> core::fmt::Debug for ZoneTracker<H, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ZoneTracker")
            .field("state", &self.state)
            .field("active", &self.active)
            .field("frame_pending", &self.frame_pending)
            .field("triggers", &self.triggers.len())
            .field("cards", &self.cards.len())
            .field("scroll_containers", &self.scroll_containers.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<H: RegionHitTest, C: Copy + PartialEq> ZoneTracker<H, C> {
    /// Create a stopped tracker.
    ///
    /// `top_card` must return the id of the card currently on top of the stack.
    pub fn new(
        host: H,
        config: TrackerConfig,
        top_card: impl Fn() -> Option<C> + 'static,
    ) -> Self {
        Self {
            host,
            config,
            top_card: Box::new(top_card),
            triggers: BTreeMap::new(),
            cards: BTreeMap::new(),
            scroll_containers: BTreeSet::new(),
            state: PointerState::default(),
            has_position: false,
            velocity_anchor: None,
            slow_samples: 0,
            frame_pending: false,
            active: false,
            hit_cache: None,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// The hit-test adapter.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the adapter. Cached geometry is dropped since regions may move.
    pub fn host_mut(&mut self) -> &mut H {
        self.hit_cache = None;
        &mut self.host
    }

    /// Begin accepting input. Idempotent.
    pub fn start(&mut self) {
        if !self.active {
            self.active = true;
            tracing::debug!("zone tracker started");
        }
    }

    /// Stop accepting input and cancel any pending frame. Idempotent.
    pub fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.frame_pending = false;
            self.hit_cache = None;
            tracing::debug!("zone tracker stopped");
        }
    }

    /// Whether input is being accepted.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Last known pointer state.
    pub fn state(&self) -> &PointerState {
        &self.state
    }

    /// Current zone.
    pub fn zone(&self) -> Zone {
        self.state.zone
    }

    /// Whether a classification is waiting for the next animation frame.
    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Register a trigger region for `term`.
    pub fn register_trigger(&mut self, region: H::Region, term: impl Into<String>) -> Option<Zone> {
        self.triggers.insert(region, term.into());
        self.force_check_pointer_zone()
    }

    /// Unregister a trigger region. Unknown regions are ignored.
    pub fn unregister_trigger(&mut self, region: H::Region) -> Option<Zone> {
        self.triggers.remove(&region)?;
        self.force_check_pointer_zone()
    }

    /// Register a card region.
    pub fn register_card(&mut self, region: H::Region, card: C) -> Option<Zone> {
        self.cards.insert(region, card);
        self.force_check_pointer_zone()
    }

    /// Unregister a card region. Unknown regions are ignored.
    pub fn unregister_card(&mut self, region: H::Region) -> Option<Zone> {
        self.cards.remove(&region)?;
        self.force_check_pointer_zone()
    }

    /// Register a scrollable container whose scrolls invalidate geometry.
    pub fn register_scroll_container(&mut self, region: H::Region) -> Option<Zone> {
        self.scroll_containers.insert(region);
        self.force_check_pointer_zone()
    }

    /// Unregister a scroll container. Unknown regions are ignored.
    pub fn unregister_scroll_container(&mut self, region: H::Region) -> Option<Zone> {
        if !self.scroll_containers.remove(&region) {
            return None;
        }
        self.force_check_pointer_zone()
    }

    /// Term registered for a trigger region.
    pub fn trigger_term(&self, region: H::Region) -> Option<&str> {
        self.triggers.get(&region).map(String::as_str)
    }

    /// Card registered for a card region.
    pub fn card_for(&self, region: H::Region) -> Option<C> {
        self.cards.get(&region).copied()
    }

    /// Subscribe to zone changes. The listener is called once immediately.
    pub fn subscribe(&mut self, mut listener: impl FnMut(&PointerState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        listener(&self.state);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a subscription. Returns false for unknown ids.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(i, _)| *i != id);
        before != self.listeners.len()
    }

    /// Drop cached hit-test results.
    pub fn invalidate_geometry(&mut self) {
        self.hit_cache = None;
    }

    /// Feed a raw move sample.
    ///
    /// Returns `true` when the host should request an animation frame and then
    /// call [`animation_frame`](Self::animation_frame).
    pub fn pointer_move(&mut self, sample: PointerSample) -> bool {
        if !self.active {
            return false;
        }
        self.state.position = sample.position;
        self.state.timestamp = sample.timestamp;
        self.state.input_type = sample.input_type;
        self.has_position = true;
        self.update_velocity(sample);

        if !self.host.viewport().contains(sample.position) {
            self.frame_pending = false;
            self.apply_zone(Zone::None);
            return false;
        }

        let slow = self
            .state
            .velocity
            .is_some_and(|v| v.hypot() < self.config.velocity_threshold);
        if slow {
            self.slow_samples = self.slow_samples.saturating_add(1);
            if self.slow_samples < self.config.settle_samples {
                return false;
            }
        } else {
            self.slow_samples = 0;
        }

        if self.frame_pending {
            return false;
        }
        self.frame_pending = true;
        true
    }

    fn update_velocity(&mut self, sample: PointerSample) {
        let Some(anchor) = self.velocity_anchor else {
            self.velocity_anchor = Some(sample);
            return;
        };
        let dt = sample.timestamp.saturating_sub(anchor.timestamp);
        if dt < self.config.min_sample_interval {
            return;
        }
        let ms = dt.as_secs_f64() * 1000.0;
        let raw = (sample.position - anchor.position) / ms;
        let smoothed = match self.state.velocity {
            Some(prev) => prev + (raw - prev) * self.config.smoothing,
            None => raw,
        };
        self.state.velocity = Some(smoothed);
        self.velocity_anchor = Some(sample);
    }

    /// Run the classification scheduled by [`pointer_move`](Self::pointer_move).
    ///
    /// Returns the new zone if it changed.
    pub fn animation_frame(&mut self) -> Option<Zone> {
        if !self.active || !self.frame_pending {
            return None;
        }
        self.frame_pending = false;
        self.classify()
    }

    /// The pointer left the window.
    pub fn pointer_leave(&mut self, timestamp: Duration) -> Option<Zone> {
        if !self.active {
            return None;
        }
        self.frame_pending = false;
        self.has_position = false;
        self.velocity_anchor = None;
        self.slow_samples = 0;
        self.state.timestamp = timestamp;
        self.state.velocity = None;
        self.apply_zone(Zone::None)
    }

    /// A scroll happened. `container` is `None` for the window itself.
    ///
    /// Scrolls of unregistered containers are ignored.
    pub fn scroll(&mut self, container: Option<H::Region>) -> Option<Zone> {
        if container.is_some_and(|c| !self.scroll_containers.contains(&c)) {
            return None;
        }
        self.invalidate_geometry();
        self.force_check_pointer_zone()
    }

    /// Cancel any pending frame and classify now.
    pub fn force_check_pointer_zone(&mut self) -> Option<Zone> {
        self.hit_cache = None;
        if !self.active {
            return None;
        }
        self.frame_pending = false;
        self.classify()
    }

    /// Classify an arbitrary point without touching tracker state.
    pub fn zone_at(&self, point: Point) -> Zone {
        if !self.host.viewport().contains(point) {
            return Zone::None;
        }
        self.zone_for(&self.host.regions_at(point))
    }

    fn classify(&mut self) -> Option<Zone> {
        if !self.has_position {
            return self.apply_zone(Zone::None);
        }
        let point = self.state.position;
        if !self.host.viewport().contains(point) {
            return self.apply_zone(Zone::None);
        }
        let regions = match &self.hit_cache {
            Some((p, regions)) if *p == point => regions.clone(),
            _ => {
                let regions = self.host.regions_at(point);
                self.hit_cache = Some((point, regions.clone()));
                regions
            }
        };
        let zone = self.zone_for(&regions);
        tracing::trace!(?zone, x = point.x, y = point.y, "classified pointer");
        self.apply_zone(zone)
    }

    fn zone_for(&self, regions: &[H::Region]) -> Zone {
        let card = regions.iter().find_map(|&r| {
            self.cards.get(&r).copied().or_else(|| {
                self.host
                    .nearest_marked(r, Marker::CARD)
                    .and_then(|a| self.cards.get(&a).copied())
            })
        });
        if let Some(card) = card {
            return if (self.top_card)() == Some(card) {
                Zone::TopCard
            } else {
                Zone::OtherCard
            };
        }
        let over_trigger = regions.iter().any(|&r| {
            self.triggers.contains_key(&r)
                || self
                    .host
                    .nearest_marked(r, Marker::TRIGGER)
                    .is_some_and(|a| self.triggers.contains_key(&a))
        });
        if over_trigger {
            Zone::Trigger
        } else {
            Zone::None
        }
    }

    fn apply_zone(&mut self, zone: Zone) -> Option<Zone> {
        if self.state.zone == zone {
            return None;
        }
        tracing::debug!(from = ?self.state.zone, to = ?zone, "pointer zone changed");
        self.state.zone = zone;
        for (_, listener) in &mut self.listeners {
            listener(&self.state);
        }
        Some(zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::{RegionId, RegionSpec, RegionTable};
    use kurbo::Rect;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    struct Fixture {
        tracker: ZoneTracker<RegionTable, u32>,
        top: Rc<Cell<Option<u32>>>,
        trigger: RegionId,
        card_a: RegionId,
        card_b: RegionId,
    }

    // Trigger at (0..50, 0..20); card A at (100..200, 0..100); card B over A at (150..250, 50..150).
    fn fixture() -> Fixture {
        let mut table = RegionTable::new(Rect::new(0.0, 0.0, 400.0, 300.0));
        let trigger = table.insert(
            None,
            RegionSpec {
                bounds: Rect::new(0.0, 0.0, 50.0, 20.0),
                z_index: 0,
                markers: Marker::TRIGGER,
            },
        );
        let card_a = table.insert(
            None,
            RegionSpec {
                bounds: Rect::new(100.0, 0.0, 200.0, 100.0),
                z_index: 10,
                markers: Marker::CARD,
            },
        );
        let card_b = table.insert(
            None,
            RegionSpec {
                bounds: Rect::new(150.0, 50.0, 250.0, 150.0),
                z_index: 11,
                markers: Marker::CARD,
            },
        );
        let top = Rc::new(Cell::new(None));
        let resolver = top.clone();
        let mut tracker = ZoneTracker::new(table, TrackerConfig::default(), move || resolver.get());
        tracker.start();
        Fixture {
            tracker,
            top,
            trigger,
            card_a,
            card_b,
        }
    }

    fn move_to(t: &mut ZoneTracker<RegionTable, u32>, x: f64, y: f64, at: u64) -> Option<Zone> {
        if t.pointer_move(PointerSample::mouse(x, y, ms(at))) {
            t.animation_frame()
        } else {
            None
        }
    }

    #[test]
    fn classifies_trigger_top_and_other() {
        let mut f = fixture();
        f.tracker.register_trigger(f.trigger, "API");
        f.tracker.register_card(f.card_a, 1);
        f.tracker.register_card(f.card_b, 2);
        f.top.set(Some(2));

        assert_eq!(move_to(&mut f.tracker, 10.0, 10.0, 0), Some(Zone::Trigger));
        assert_eq!(move_to(&mut f.tracker, 120.0, 10.0, 100), Some(Zone::OtherCard));
        // Overlap: card B is on top of A and is the top card.
        assert_eq!(move_to(&mut f.tracker, 175.0, 75.0, 200), Some(Zone::TopCard));
        assert_eq!(move_to(&mut f.tracker, 300.0, 250.0, 300), Some(Zone::None));
    }

    // Unregistered regions do not count even when marked.
    #[test]
    fn unregistered_regions_are_none() {
        let mut f = fixture();
        assert_eq!(move_to(&mut f.tracker, 10.0, 10.0, 0), None);
        assert_eq!(f.tracker.zone(), Zone::None);
        assert_eq!(f.tracker.register_trigger(f.trigger, "API"), Some(Zone::Trigger));
        assert_eq!(f.tracker.trigger_term(f.trigger), Some("API"));
        assert_eq!(f.tracker.unregister_trigger(f.trigger), Some(Zone::None));
        assert_eq!(f.tracker.unregister_trigger(f.trigger), None);
    }

    // Child regions resolve to their nearest registered card ancestor.
    #[test]
    fn nested_region_resolves_to_card() {
        let mut f = fixture();
        let link = f.tracker.host_mut().insert(
            Some(f.card_a),
            RegionSpec {
                bounds: Rect::new(110.0, 10.0, 140.0, 20.0),
                z_index: 10,
                markers: Marker::TRIGGER,
            },
        );
        f.tracker.register_card(f.card_a, 7);
        f.tracker.register_trigger(link, "REST");
        f.top.set(Some(7));
        // Over a trigger inside a card: the card wins.
        assert_eq!(move_to(&mut f.tracker, 120.0, 15.0, 0), Some(Zone::TopCard));
        assert_eq!(f.tracker.card_for(f.card_a), Some(7));
    }

    #[test]
    fn subscribe_is_immediate_then_edge_triggered() {
        let mut f = fixture();
        f.tracker.register_trigger(f.trigger, "API");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = f.tracker.subscribe(move |s| sink.borrow_mut().push(s.zone));
        assert_eq!(*seen.borrow(), vec![Zone::None]);

        // Identical samples, spaced past the velocity gate, notify only once.
        for i in 0..6 {
            move_to(&mut f.tracker, 10.0, 10.0, i * 20);
        }
        assert_eq!(*seen.borrow(), vec![Zone::None, Zone::Trigger]);

        assert!(f.tracker.unsubscribe(id));
        assert!(!f.tracker.unsubscribe(id));
        move_to(&mut f.tracker, 300.0, 250.0, 500);
        assert_eq!(seen.borrow().len(), 2);
    }

    // Bursts of samples within one frame request a single frame.
    #[test]
    fn coalesces_bursts_into_one_frame() {
        let mut f = fixture();
        f.tracker.register_trigger(f.trigger, "API");
        let requests = (0_u32..5)
            .filter(|&i| {
                let x = 10.0 + f64::from(i) * 5.0;
                f.tracker
                    .pointer_move(PointerSample::mouse(x, 10.0, ms(u64::from(i))))
            })
            .count();
        assert_eq!(requests, 1);
        assert!(f.tracker.frame_pending());
        assert_eq!(f.tracker.animation_frame(), Some(Zone::Trigger));
        assert_eq!(f.tracker.animation_frame(), None);
    }

    // Slow samples skip scheduling until they have settled.
    #[test]
    fn jitter_waits_for_settled_samples() {
        let mut f = fixture();
        f.tracker.register_trigger(f.trigger, "API");
        // First sample has no velocity yet, so it schedules.
        assert!(f.tracker.pointer_move(PointerSample::mouse(10.0, 10.0, ms(0))));
        f.tracker.animation_frame();
        // Barely moving: velocity below threshold.
        assert!(!f.tracker.pointer_move(PointerSample::mouse(10.1, 10.0, ms(20))));
        assert!(!f.tracker.pointer_move(PointerSample::mouse(10.2, 10.0, ms(40))));
        assert!(f.tracker.pointer_move(PointerSample::mouse(10.3, 10.0, ms(60))));
        assert!(f.tracker.state().velocity.is_some());
    }

    // Samples closer than the gate keep the previous velocity.
    #[test]
    fn velocity_is_time_gated() {
        let mut f = fixture();
        f.tracker.pointer_move(PointerSample::mouse(0.0, 0.0, ms(0)));
        f.tracker.pointer_move(PointerSample::mouse(50.0, 0.0, ms(5)));
        assert_eq!(f.tracker.state().velocity, None);
        f.tracker.pointer_move(PointerSample::mouse(40.0, 0.0, ms(20)));
        let v = f.tracker.state().velocity.unwrap();
        assert!((v.x - 2.0).abs() < 1e-9);
        assert_eq!(f.tracker.state().position, Point::new(40.0, 0.0));
    }

    #[test]
    fn leave_and_off_viewport_are_immediate() {
        let mut f = fixture();
        f.tracker.register_trigger(f.trigger, "API");
        move_to(&mut f.tracker, 10.0, 10.0, 0);
        assert_eq!(f.tracker.pointer_leave(ms(10)), Some(Zone::None));

        move_to(&mut f.tracker, 10.0, 10.0, 100);
        assert_eq!(f.tracker.zone(), Zone::Trigger);
        assert!(!f.tracker.pointer_move(PointerSample::mouse(-5.0, 10.0, ms(200))));
        assert_eq!(f.tracker.zone(), Zone::None);
        assert!(!f.tracker.frame_pending());
    }

    // Scrolling reclassifies against moved geometry.
    #[test]
    fn scroll_invalidates_geometry() {
        let mut f = fixture();
        f.tracker.register_trigger(f.trigger, "API");
        move_to(&mut f.tracker, 10.0, 10.0, 0);
        assert_eq!(f.tracker.zone(), Zone::Trigger);
        f.tracker.host_mut().scroll_by(0.0, 100.0);
        // Scrolls of unregistered containers are ignored.
        let container = f.card_a;
        assert_eq!(f.tracker.scroll(Some(container)), None);
        assert_eq!(f.tracker.register_scroll_container(container), Some(Zone::None));
        f.tracker.host_mut().scroll_by(0.0, -100.0);
        assert_eq!(f.tracker.scroll(Some(container)), Some(Zone::Trigger));
        assert_eq!(f.tracker.scroll(None), None);
    }

    // Stopped trackers ignore input and never notify.
    #[test]
    fn stop_detaches_input() {
        let mut f = fixture();
        f.tracker.register_trigger(f.trigger, "API");
        f.tracker.pointer_move(PointerSample::mouse(10.0, 10.0, ms(0)));
        f.tracker.stop();
        f.tracker.stop();
        assert!(!f.tracker.is_active());
        assert!(!f.tracker.frame_pending());
        assert_eq!(f.tracker.animation_frame(), None);
        assert!(!f.tracker.pointer_move(PointerSample::mouse(10.0, 10.0, ms(50))));
        assert_eq!(f.tracker.force_check_pointer_zone(), None);
        assert_eq!(f.tracker.zone(), Zone::None);
        f.tracker.start();
        assert_eq!(f.tracker.force_check_pointer_zone(), Some(Zone::Trigger));
    }

    #[test]
    fn zone_at_is_pure() {
        let mut f = fixture();
        f.tracker.register_card(f.card_a, 1);
        assert_eq!(f.tracker.zone_at(Point::new(120.0, 10.0)), Zone::OtherCard);
        assert_eq!(f.tracker.zone_at(Point::new(500.0, 10.0)), Zone::None);
        assert_eq!(f.tracker.zone(), Zone::None);
    }
}
