// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The stack controller: timed auto-close on top of the stack and the tracker.
//!
//! ## Phases
//!
//! Every open card has a [`CardPhase`]:
//!
//! ```text
//! Entering -> Idle -> ScheduledClose -> Closing -> (removed)
//!               ^          |               |
//!               +----------+---------------+   pointer back over the stack
//! ```
//!
//! Only the top card is ever scheduled. A close is scheduled when the top card
//! is idle and unpinned, the pointer is over nothing, and the grace window that
//! follows every open has elapsed. The first auto-close of a session waits
//! `initial_delay`; once one has happened, later ones wait `cascade_delay`
//! until the pointer returns to the stack.
//!
//! Escape, click outside and window scroll close immediately with a short
//! fade. Those closes are not cancelled by re-entry.
//!
//! ## Driving
//!
//! The controller owns no timers of its own. The host calls
//! [`StackController::tick`] at or after [`StackController::next_deadline`],
//! forwards input and registry changes, and polls content resolution.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use core::time::Duration;

use kurbo::{Point, Rect};
use understory_pointer_zone::{
    PointerSample, PointerState, RegionHitTest, SubscriptionId, Zone, ZoneTracker,
};

use crate::clock::Clock;
use crate::engine::{CardStack, StackEvent};
use crate::placement::PositionResolver;
use crate::timers::{TimerId, TimerQueue};
use crate::{CardId, ConfigError, ContentSource, HovercardConfig};

/// Animation and close state of one card.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CardPhase {
    /// Enter animation running.
    Entering,
    /// Settled.
    Idle,
    /// A close timer is pending.
    ScheduledClose,
    /// Fading out; removed when the fade ends.
    Closing,
}

#[derive(Clone, Debug)]
enum TimerAction {
    EnterDone(CardId),
    CloseDue(CardId),
    FadeDone(CardId),
    DismissAll,
    GraceEnd,
    Dwell,
}

#[derive(Debug)]
struct Tracked {
    phase: CardPhase,
    enter: Option<TimerId>,
    close: Option<TimerId>,
    fade: Option<TimerId>,
    // Escape, click outside or scroll; survives re-entry.
    forced: bool,
}

impl Tracked {
    fn revert_to_idle(&mut self, timers: &mut TimerQueue<TimerAction>) {
        for timer in [self.close.take(), self.fade.take()].into_iter().flatten() {
            timers.cancel(timer);
        }
        self.phase = CardPhase::Idle;
    }

    fn cancel_all(&mut self, timers: &mut TimerQueue<TimerAction>) {
        if let Some(enter) = self.enter.take() {
            timers.cancel(enter);
        }
        self.revert_to_idle(timers);
    }

    fn is_closing(&self) -> bool {
        matches!(self.phase, CardPhase::ScheduledClose | CardPhase::Closing)
    }
}

#[derive(Debug)]
struct Dwell {
    term: String,
    anchor: Rect,
    from: Option<CardId>,
    timer: TimerId,
}

/// Hovercard controller for a host whose regions are hit-tested by `H`.
pub struct StackController<H: RegionHitTest> {
    stack: CardStack,
    tracker: ZoneTracker<H, CardId>,
    clock: Rc<dyn Clock>,
    config: HovercardConfig,
    timers: TimerQueue<TimerAction>,
    tracked: HashMap<CardId, Tracked>,
    grace_until: Duration,
    grace_timer: Option<TimerId>,
    has_cascaded: bool,
    dwell: Option<Dwell>,
    dismiss_all: Option<TimerId>,
    last_top: Option<CardId>,
    active: bool,
}

impl<H: RegionHitTest> core::fmt::Debug for StackController<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StackController")
            .field("stack", &self.stack)
            .field("tracker", &self.tracker)
            .field("tracked", &self.tracked)
            .field("timers", &self.timers.len())
            .field("has_cascaded", &self.has_cascaded)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl<H: RegionHitTest> StackController<H> {
    /// Build the stack and a started tracker wired to its top card.
    pub fn new(
        config: &HovercardConfig,
        host: H,
        sources: Vec<Arc<dyn ContentSource>>,
        placement: impl PositionResolver + 'static,
        clock: Rc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let stack = CardStack::new(config, sources, placement, clock.clone())?;
        let top = stack.top_card_handle();
        let mut tracker = ZoneTracker::new(host, config.tracker_config(), move || top.get());
        tracker.start();
        Ok(Self {
            stack,
            tracker,
            clock,
            config: config.clone(),
            timers: TimerQueue::new(),
            tracked: HashMap::new(),
            grace_until: Duration::ZERO,
            grace_timer: None,
            has_cascaded: false,
            dwell: None,
            dismiss_all: None,
            last_top: None,
            active: true,
        })
    }

    /// The card stack. Read-only; use the controller's commands to mutate it.
    pub fn stack(&self) -> &CardStack {
        &self.stack
    }

    /// The zone tracker.
    pub fn tracker(&self) -> &ZoneTracker<H, CardId> {
        &self.tracker
    }

    /// The hit-test adapter, for moving or adding regions.
    ///
    /// Call [`force_check_pointer_zone`](Self::force_check_pointer_zone) afterwards.
    pub fn host_mut(&mut self) -> &mut H {
        self.tracker.host_mut()
    }

    /// Current pointer zone.
    pub fn zone(&self) -> Zone {
        self.tracker.zone()
    }

    /// Phase of an open card.
    pub fn phase_of(&self, id: CardId) -> Option<CardPhase> {
        self.tracked.get(&id).map(|t| t.phase)
    }

    /// Whether an auto-close happened since the pointer last returned to the stack.
    pub fn has_cascaded(&self) -> bool {
        self.has_cascaded
    }

    /// Whether the controller is still running.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// When [`tick`](Self::tick) next has work.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    // --- commands ---

    /// Open a card. See [`CardStack::open_card`].
    ///
    /// A `parent` that is being dismissed is ignored and the card opens as a root.
    pub fn open(
        &mut self,
        term: impl Into<String>,
        anchor: Option<Rect>,
        position: Point,
        parent: Option<CardId>,
    ) -> CardId {
        let parent = parent.filter(|&p| !self.is_dismissing(p));
        let id = self.stack.open_card(term, anchor, position, parent);
        self.sync();
        id
    }

    /// Close a card and its descendants now, without a fade.
    pub fn close(&mut self, id: CardId) -> Vec<CardId> {
        let removed = self.stack.close_card(id);
        self.sync();
        removed
    }

    /// Pin a card. See [`CardStack::pin_card`].
    pub fn pin(&mut self, term: &str, anchor: Rect) -> CardId {
        let id = self.stack.pin_card(term, anchor);
        self.sync();
        id
    }

    /// Follow a link. See [`CardStack::follow_link`].
    ///
    /// Returns `None` when `from` is being dismissed by Escape, click outside
    /// or scroll.
    pub fn follow_link(
        &mut self,
        term: impl Into<String>,
        from: CardId,
        position: Point,
    ) -> Option<CardId> {
        if self.is_dismissing(from) {
            tracing::debug!(card = %from, "link followed from a dismissed card");
            return None;
        }
        let id = self.stack.follow_link(term, from, position);
        self.sync();
        id
    }

    /// Apply finished content resolutions.
    pub fn poll_resolutions(&mut self) -> usize {
        let applied = self.stack.poll_resolutions();
        self.sync();
        applied
    }

    /// Wait for the next content resolution.
    pub async fn next_resolution(&mut self) -> Option<CardId> {
        let id = self.stack.next_resolution().await;
        self.sync();
        id
    }

    // --- registries ---

    /// Register a trigger region.
    pub fn register_trigger(&mut self, region: H::Region, term: impl Into<String>) {
        let change = self.tracker.register_trigger(region, term);
        self.on_zone(change);
    }

    /// Unregister a trigger region.
    pub fn unregister_trigger(&mut self, region: H::Region) {
        let change = self.tracker.unregister_trigger(region);
        self.on_zone(change);
    }

    /// Register the region a card is rendered in.
    pub fn register_card(&mut self, region: H::Region, card: CardId) {
        let change = self.tracker.register_card(region, card);
        self.on_zone(change);
    }

    /// Unregister a card region.
    pub fn unregister_card(&mut self, region: H::Region) {
        let change = self.tracker.unregister_card(region);
        self.on_zone(change);
    }

    /// Register a scrolling region.
    pub fn register_scroll_container(&mut self, region: H::Region) {
        let change = self.tracker.register_scroll_container(region);
        self.on_zone(change);
    }

    /// Unregister a scrolling region.
    pub fn unregister_scroll_container(&mut self, region: H::Region) {
        let change = self.tracker.unregister_scroll_container(region);
        self.on_zone(change);
    }

    /// Subscribe to zone changes. See [`ZoneTracker::subscribe`].
    pub fn subscribe(&mut self, listener: impl FnMut(&PointerState) + 'static) -> SubscriptionId {
        self.tracker.subscribe(listener)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.tracker.unsubscribe(id)
    }

    // --- input ---

    /// Forward a pointer sample. Returns `true` when the host should request an animation frame.
    pub fn pointer_move(&mut self, sample: PointerSample) -> bool {
        self.active && self.tracker.pointer_move(sample)
    }

    /// Run the coalesced classification for this frame.
    pub fn animation_frame(&mut self) -> Option<Zone> {
        let change = self.tracker.animation_frame();
        self.on_zone(change);
        change
    }

    /// The pointer left the window.
    pub fn pointer_leave(&mut self) -> Option<Zone> {
        let change = self.tracker.pointer_leave(self.clock.now());
        self.on_zone(change);
        change
    }

    /// Classify now, cancelling any pending frame.
    pub fn force_check_pointer_zone(&mut self) -> Option<Zone> {
        let change = self.tracker.force_check_pointer_zone();
        self.on_zone(change);
        change
    }

    /// A scroll happened. `None` is the window, which dismisses the whole stack.
    pub fn scroll(&mut self, container: Option<H::Region>) {
        if !self.active {
            return;
        }
        let change = self.tracker.scroll(container);
        if container.is_none() && !self.stack.is_empty() && self.dismiss_all.is_none() {
            let at = self.clock.now() + self.config.immediate_fade();
            for t in self.tracked.values_mut() {
                t.cancel_all(&mut self.timers);
                t.phase = CardPhase::Closing;
                t.forced = true;
            }
            self.dismiss_all = Some(self.timers.schedule(at, TimerAction::DismissAll));
            tracing::debug!(cards = self.stack.len(), "window scroll, dismissing stack");
        }
        self.on_zone(change);
    }

    /// Pointer pressed at `point`. Outside every trigger and card, this closes the top card.
    ///
    /// Returns the card being closed.
    pub fn pointer_down(&mut self, point: Point) -> Option<CardId> {
        if !self.active || !self.config.close_on_click_outside {
            return None;
        }
        if self.tracker.zone_at(point) != Zone::None {
            return None;
        }
        self.close_top_immediately()
    }

    /// Escape pressed. Closes the top card when enabled.
    pub fn escape(&mut self) -> Option<CardId> {
        if !self.active || !self.config.close_on_escape {
            return None;
        }
        self.close_top_immediately()
    }

    /// The pointer started hovering a trigger for `term`.
    ///
    /// After the dwell delay a card opens below `anchor`, as a child of `from`
    /// when the trigger is inside that card.
    pub fn hover_trigger(&mut self, term: impl Into<String>, anchor: Rect, from: Option<CardId>) {
        if !self.active {
            return;
        }
        self.leave_trigger();
        let at = self.clock.now() + self.config.dwell_delay;
        let timer = self.timers.schedule(at, TimerAction::Dwell);
        self.dwell = Some(Dwell {
            term: term.into(),
            anchor,
            from,
            timer,
        });
    }

    /// The pointer left the trigger before the dwell delay elapsed.
    pub fn leave_trigger(&mut self) {
        if let Some(dwell) = self.dwell.take() {
            self.timers.cancel(dwell.timer);
        }
    }

    /// Fire every timer due by now. Returns how many fired.
    pub fn tick(&mut self) -> usize {
        let mut fired = 0;
        while let Some((_, action)) = self.timers.pop_due(self.clock.now()) {
            fired += 1;
            tracing::trace!(?action, "timer fired");
            self.fire(action);
        }
        fired
    }

    /// Cancel every timer, stop the tracker and drop all bookkeeping.
    ///
    /// Cards stay open; nothing is scheduled for them again.
    pub fn shutdown(&mut self) {
        self.timers.clear();
        self.tracked.clear();
        self.dwell = None;
        self.grace_timer = None;
        self.dismiss_all = None;
        self.tracker.stop();
        self.active = false;
        tracing::debug!("stack controller shut down");
    }

    fn fire(&mut self, action: TimerAction) {
        match action {
            TimerAction::EnterDone(id) => {
                if let Some(t) = self.tracked.get_mut(&id) {
                    t.enter = None;
                    if t.phase == CardPhase::Entering {
                        t.phase = CardPhase::Idle;
                    }
                }
                self.reconcile();
            }
            TimerAction::CloseDue(id) => {
                let now = self.clock.now();
                if let Some(t) = self.tracked.get_mut(&id) {
                    t.close = None;
                    if t.phase == CardPhase::ScheduledClose {
                        t.phase = CardPhase::Closing;
                        let at = now + self.config.fade_duration;
                        t.fade = Some(self.timers.schedule(at, TimerAction::FadeDone(id)));
                    }
                }
            }
            TimerAction::FadeDone(id) => {
                let Some(t) = self.tracked.get_mut(&id) else {
                    return;
                };
                t.fade = None;
                if t.phase != CardPhase::Closing {
                    return;
                }
                if !t.forced {
                    self.has_cascaded = true;
                }
                self.stack.close_card(id);
                self.sync();
            }
            TimerAction::DismissAll => {
                self.dismiss_all = None;
                // Cards opened during the fade survive.
                let doomed: Vec<CardId> = self
                    .stack
                    .cards()
                    .map(|c| c.id())
                    .filter(|&id| self.is_dismissing(id))
                    .collect();
                for id in doomed.into_iter().rev() {
                    if self.stack.contains(id) {
                        self.stack.close_card(id);
                    }
                }
                self.sync();
            }
            TimerAction::GraceEnd => {
                self.grace_timer = None;
                self.reconcile();
            }
            TimerAction::Dwell => {
                if let Some(dwell) = self.dwell.take() {
                    self.open_from_dwell(dwell);
                }
            }
        }
    }

    fn open_from_dwell(&mut self, dwell: Dwell) {
        if self.stack.find_by_term(&dwell.term).is_some() {
            tracing::debug!(term = dwell.term.as_str(), "card already open, dwell ignored");
            return;
        }
        let position = Point::new(dwell.anchor.x0, dwell.anchor.y1);
        match dwell
            .from
            .filter(|&from| self.stack.contains(from) && !self.is_dismissing(from))
        {
            Some(from) => {
                self.stack.follow_link(dwell.term, from, position);
            }
            None => {
                self.stack
                    .open_card(dwell.term, Some(dwell.anchor), position, None);
            }
        }
        self.sync();
    }

    fn is_dismissing(&self, id: CardId) -> bool {
        self.tracked
            .get(&id)
            .is_some_and(|t| t.forced && t.phase == CardPhase::Closing)
    }

    fn close_top_immediately(&mut self) -> Option<CardId> {
        let top = self.stack.top_card()?;
        let at = self.clock.now() + self.config.immediate_fade();
        let t = self.tracked.get_mut(&top)?;
        if t.forced && t.phase == CardPhase::Closing {
            return Some(top);
        }
        t.cancel_all(&mut self.timers);
        t.phase = CardPhase::Closing;
        t.forced = true;
        t.fade = Some(self.timers.schedule(at, TimerAction::FadeDone(top)));
        tracing::debug!(card = %top, "closing top card immediately");
        Some(top)
    }

    fn on_zone(&mut self, change: Option<Zone>) {
        if !self.active {
            return;
        }
        if change.is_some_and(Zone::is_over_stack) {
            for t in self.tracked.values_mut() {
                if !t.forced && t.is_closing() {
                    t.revert_to_idle(&mut self.timers);
                }
            }
            if self.has_cascaded {
                tracing::debug!("pointer back on the stack, cascade reset");
            }
            self.has_cascaded = false;
        }
        self.reconcile();
    }

    // Fold stack events into phase bookkeeping.
    fn sync(&mut self) {
        let events = self.stack.drain_events();
        if !self.active {
            return;
        }
        let now = self.clock.now();
        for event in events {
            match event {
                StackEvent::Opened(id) => {
                    if self.tracked.contains_key(&id) || !self.stack.contains(id) {
                        continue;
                    }
                    self.track_new(id, now);
                }
                StackEvent::Closed(id) => {
                    if let Some(mut t) = self.tracked.remove(&id) {
                        t.cancel_all(&mut self.timers);
                    }
                }
                StackEvent::Pinned(id) => {
                    if let Some(t) = self.tracked.get_mut(&id) {
                        if !t.forced && t.is_closing() {
                            t.revert_to_idle(&mut self.timers);
                        }
                    }
                }
            }
        }
        self.tracked.retain(|id, _| self.stack.contains(*id));
        let top = self.stack.top_card();
        if top != self.last_top {
            self.last_top = top;
            let change = self.tracker.force_check_pointer_zone();
            self.on_zone(change);
        } else {
            self.reconcile();
        }
    }

    fn track_new(&mut self, id: CardId, now: Duration) {
        // Other cards stop closing unless the close was explicit.
        for t in self.tracked.values_mut() {
            if !t.forced && t.is_closing() {
                t.revert_to_idle(&mut self.timers);
            }
        }
        let (phase, enter) = if self.tracker.zone().is_over_stack() {
            (CardPhase::Idle, None)
        } else {
            let at = now + self.config.enter_duration;
            (
                CardPhase::Entering,
                Some(self.timers.schedule(at, TimerAction::EnterDone(id))),
            )
        };
        self.tracked.insert(
            id,
            Tracked {
                phase,
                enter,
                close: None,
                fade: None,
                forced: false,
            },
        );
        if let Some(old) = self.grace_timer.take() {
            self.timers.cancel(old);
        }
        self.grace_until = now + self.config.grace_period;
        self.grace_timer = Some(self.timers.schedule(self.grace_until, TimerAction::GraceEnd));
    }

    // Schedule the top card's close when every condition holds.
    fn reconcile(&mut self) {
        if !self.active || self.tracker.zone() != Zone::None {
            return;
        }
        let now = self.clock.now();
        if now < self.grace_until {
            return;
        }
        let Some(top) = self.stack.top_card() else {
            return;
        };
        if self.stack.card(top).is_none_or(|c| c.is_pinned()) {
            return;
        }
        let Some(t) = self.tracked.get_mut(&top) else {
            return;
        };
        if t.phase != CardPhase::Idle {
            return;
        }
        let delay = if self.has_cascaded {
            self.config.cascade_delay
        } else {
            self.config.initial_delay
        };
        t.phase = CardPhase::ScheduledClose;
        t.close = Some(self.timers.schedule(now + delay, TimerAction::CloseDue(top)));
        tracing::debug!(card = %top, ?delay, cascaded = self.has_cascaded, "scheduled close");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::placement::PlacementRequest;
    use crate::{Content, StaticSource};
    use understory_pointer_zone::{Marker, RegionId, RegionSpec, RegionTable};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    struct Fixture {
        ctl: StackController<RegionTable>,
        clock: ManualClock,
        trigger: RegionId,
    }

    // Viewport 800x600 with a trigger at (0..50, 0..20). Default timings:
    // enter 120, grace 300, initial 600, cascade 250, fade 150, immediate 80.
    fn fixture() -> Fixture {
        let clock = ManualClock::new();
        let mut table = RegionTable::new(Rect::new(0.0, 0.0, 800.0, 600.0));
        let trigger = table.insert(
            None,
            RegionSpec {
                bounds: Rect::new(0.0, 0.0, 50.0, 20.0),
                z_index: 0,
                markers: Marker::TRIGGER,
            },
        );
        let glossary = StaticSource::new("glossary")
            .with("API", Content::new("API"))
            .with("REST", Content::new("REST"));
        let mut ctl = StackController::new(
            &HovercardConfig::default(),
            table,
            vec![Arc::new(glossary)],
            |r: &PlacementRequest| r.requested,
            Rc::new(clock.clone()),
        )
        .unwrap();
        ctl.register_trigger(trigger, "API");
        Fixture {
            ctl,
            clock,
            trigger,
        }
    }

    impl Fixture {
        fn at(&mut self, t: u64) -> usize {
            self.clock.set(ms(t));
            self.ctl.tick()
        }

        fn card_region(&mut self, id: CardId, bounds: Rect) -> RegionId {
            let region = self.ctl.host_mut().insert(
                None,
                RegionSpec {
                    bounds,
                    z_index: 10,
                    markers: Marker::CARD,
                },
            );
            self.ctl.register_card(region, id);
            region
        }

        fn move_to(&mut self, x: f64, y: f64) -> Option<Zone> {
            let sample = PointerSample::mouse(x, y, self.clock.now());
            if self.ctl.pointer_move(sample) {
                self.ctl.animation_frame()
            } else {
                None
            }
        }
    }

    // Pointer away: initial delay, fade, removal; the next close cascades faster.
    #[test]
    fn auto_close_then_cascade() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::Entering));
        f.at(120);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::Idle));
        f.at(300);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::ScheduledClose));
        assert_eq!(f.ctl.next_deadline(), Some(ms(900)));
        f.at(899);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::ScheduledClose));
        f.at(900);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::Closing));
        assert!(!f.ctl.has_cascaded());
        f.at(1050);
        assert!(!f.ctl.stack().contains(a));
        assert_eq!(f.ctl.phase_of(a), None);
        assert!(f.ctl.has_cascaded());

        let b = f.ctl.open("REST", None, Point::ORIGIN, None);
        f.at(1350);
        assert_eq!(f.ctl.phase_of(b), Some(CardPhase::ScheduledClose));
        assert_eq!(f.ctl.next_deadline(), Some(ms(1600)));
    }

    // Closing the top card moves the schedule to the new top, at the cascade pace.
    #[test]
    fn cascade_walks_down_the_stack() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        let b = f.ctl.follow_link("REST", a, Point::ORIGIN).unwrap();
        f.at(300);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::Idle));
        assert_eq!(f.ctl.phase_of(b), Some(CardPhase::ScheduledClose));
        f.at(900);
        f.at(1050);
        assert!(!f.ctl.stack().contains(b));
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::ScheduledClose));
        assert_eq!(f.ctl.next_deadline(), Some(ms(1300)));
        f.at(1300);
        f.at(1450);
        assert!(f.ctl.stack().is_empty());
    }

    // Returning to the card cancels the close and resets the cascade pace.
    #[test]
    fn reentry_cancels_close() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        f.card_region(a, Rect::new(100.0, 100.0, 300.0, 250.0));
        f.at(300);
        f.at(900);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::Closing));

        assert_eq!(f.move_to(150.0, 150.0), Some(Zone::TopCard));
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::Idle));
        assert_eq!(f.ctl.next_deadline(), None);
        assert_eq!(f.at(2000), 0);
        assert!(f.ctl.stack().contains(a));

        // Leaving again starts over at the initial delay.
        assert_eq!(f.ctl.pointer_leave(), Some(Zone::None));
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::ScheduledClose));
        assert_eq!(f.ctl.next_deadline(), Some(ms(2600)));
    }

    // Moving over a lower card also cancels the top card's close and the cascade pace.
    #[test]
    fn reentry_over_other_card_cancels_close() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        f.card_region(a, Rect::new(100.0, 100.0, 300.0, 250.0));
        let b = f.ctl.follow_link("REST", a, Point::ORIGIN).unwrap();
        f.card_region(b, Rect::new(400.0, 100.0, 600.0, 250.0));
        f.at(300);
        f.at(900);
        f.at(1050);
        assert!(!f.ctl.stack().contains(b));
        assert!(f.ctl.has_cascaded());

        let c = f.ctl.follow_link("REST", a, Point::ORIGIN).unwrap();
        f.card_region(c, Rect::new(400.0, 100.0, 600.0, 250.0));
        f.at(1350);
        assert_eq!(f.ctl.phase_of(c), Some(CardPhase::ScheduledClose));
        assert_eq!(f.ctl.next_deadline(), Some(ms(1600)));

        assert_eq!(f.move_to(150.0, 150.0), Some(Zone::OtherCard));
        assert_eq!(f.ctl.phase_of(c), Some(CardPhase::Idle));
        assert!(!f.ctl.has_cascaded());
        assert_eq!(f.at(1600), 0);
        assert!(f.ctl.stack().contains(c));

        assert_eq!(f.ctl.pointer_leave(), Some(Zone::None));
        assert_eq!(f.ctl.next_deadline(), Some(ms(1600 + 600)));
    }

    // No close is scheduled during the grace window, even with the pointer away.
    #[test]
    fn grace_window_blocks_scheduling() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        f.at(200);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::Idle));
        f.ctl.force_check_pointer_zone();
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::Idle));
        f.at(300);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::ScheduledClose));
    }

    // A new open stops other cards from closing.
    #[test]
    fn open_cancels_pending_close_of_others() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        f.at(300);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::ScheduledClose));
        let b = f.ctl.open("REST", None, Point::ORIGIN, None);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::Idle));
        assert_eq!(f.ctl.phase_of(b), Some(CardPhase::Entering));
        f.at(900);
        assert!(f.ctl.stack().contains(a));
    }

    // A card opened under the pointer skips the enter phase.
    #[test]
    fn open_over_stack_starts_idle() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        f.card_region(a, Rect::new(100.0, 100.0, 300.0, 250.0));
        f.move_to(150.0, 150.0);
        let b = f.ctl.follow_link("REST", a, Point::ORIGIN).unwrap();
        assert_eq!(f.ctl.phase_of(b), Some(CardPhase::Idle));
        // The pointer is now over a card that is no longer on top.
        assert_eq!(f.ctl.zone(), Zone::OtherCard);
    }

    #[test]
    fn pinned_top_card_is_not_scheduled() {
        let mut f = fixture();
        let a = f.ctl.pin("API", Rect::new(0.0, 0.0, 50.0, 20.0));
        f.at(5000);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::Idle));
        assert_eq!(f.ctl.next_deadline(), None);
    }

    // Escape closes only the top card, quickly, and does not count as a cascade.
    #[test]
    fn escape_closes_top() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        let b = f.ctl.follow_link("REST", a, Point::ORIGIN).unwrap();
        assert_eq!(f.ctl.escape(), Some(b));
        assert_eq!(f.ctl.phase_of(b), Some(CardPhase::Closing));
        f.at(79);
        assert!(f.ctl.stack().contains(b));
        f.at(80);
        assert!(!f.ctl.stack().contains(b));
        assert!(f.ctl.stack().contains(a));
        assert!(!f.ctl.has_cascaded());
    }

    // A card fading out after Escape takes no new children; its fade removes only itself.
    #[test]
    fn dismissed_card_takes_no_children() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        assert_eq!(f.ctl.escape(), Some(a));
        f.at(40);
        assert_eq!(f.ctl.follow_link("REST", a, Point::ORIGIN), None);
        let b = f.ctl.open("REST", None, Point::ORIGIN, Some(a));
        assert_eq!(f.ctl.stack().card(b).unwrap().parent_id(), None);
        assert_eq!(f.ctl.stack().top_card(), Some(b));
        f.at(80);
        assert!(!f.ctl.stack().contains(a));
        assert!(f.ctl.stack().contains(b));
        assert_eq!(f.ctl.phase_of(b), Some(CardPhase::Entering));
    }

    // A card opened while a window scroll fades the stack is kept.
    #[test]
    fn scroll_dismissal_spares_later_cards() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        f.ctl.scroll(None);
        f.at(40);
        let b = f.ctl.open("REST", None, Point::ORIGIN, Some(a));
        f.at(80);
        assert!(!f.ctl.stack().contains(a));
        assert!(f.ctl.stack().contains(b));
    }

    // Forced closes survive the pointer returning to the stack.
    #[test]
    fn forced_close_ignores_reentry() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        f.card_region(a, Rect::new(100.0, 100.0, 300.0, 250.0));
        f.ctl.escape();
        f.move_to(150.0, 150.0);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::Closing));
        f.at(80);
        assert!(f.ctl.stack().is_empty());
    }

    #[test]
    fn click_outside_closes_top() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        f.card_region(a, Rect::new(100.0, 100.0, 300.0, 250.0));
        assert_eq!(f.ctl.pointer_down(Point::new(10.0, 10.0)), None);
        assert_eq!(f.ctl.pointer_down(Point::new(150.0, 150.0)), None);
        assert_eq!(f.ctl.pointer_down(Point::new(500.0, 500.0)), Some(a));
        f.at(80);
        assert!(f.ctl.stack().is_empty());
    }

    // Window scroll dismisses everything; container scrolls only reclassify.
    #[test]
    fn window_scroll_dismisses_stack() {
        let mut f = fixture();
        let container = f.ctl.host_mut().insert(
            None,
            RegionSpec {
                bounds: Rect::new(0.0, 300.0, 800.0, 600.0),
                z_index: 0,
                markers: Marker::SCROLL,
            },
        );
        f.ctl.register_scroll_container(container);
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        f.ctl.follow_link("REST", a, Point::ORIGIN);
        f.ctl.scroll(Some(container));
        assert_eq!(f.at(80), 0);
        assert_eq!(f.ctl.stack().len(), 2);
        f.ctl.scroll(None);
        f.at(160);
        assert!(f.ctl.stack().is_empty());
    }

    #[test]
    fn dwell_opens_below_trigger() {
        let mut f = fixture();
        let anchor = Rect::new(0.0, 0.0, 50.0, 20.0);
        assert_eq!(f.move_to(10.0, 10.0), Some(Zone::Trigger));
        assert_eq!(f.ctl.tracker().trigger_term(f.trigger), Some("API"));
        f.ctl.hover_trigger("API", anchor, None);
        f.at(349);
        assert!(f.ctl.stack().is_empty());
        f.at(350);
        let card = f.ctl.stack().cards().next().unwrap();
        assert_eq!(card.term(), "API");
        assert_eq!(card.position(), Point::new(0.0, 20.0));

        // Hovering again while open does not duplicate the card.
        f.ctl.hover_trigger("API", anchor, None);
        f.at(700);
        assert_eq!(f.ctl.stack().len(), 1);
    }

    #[test]
    fn leave_trigger_cancels_dwell() {
        let mut f = fixture();
        f.ctl
            .hover_trigger("API", Rect::new(0.0, 0.0, 50.0, 20.0), None);
        f.at(100);
        f.ctl.leave_trigger();
        f.at(1000);
        assert!(f.ctl.stack().is_empty());
    }

    // Explicit closes drop bookkeeping for every removed card.
    #[test]
    fn close_discards_bookkeeping() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        let b = f.ctl.follow_link("REST", a, Point::ORIGIN).unwrap();
        assert_eq!(f.ctl.close(a), vec![b, a]);
        assert_eq!(f.ctl.phase_of(a), None);
        assert_eq!(f.ctl.phase_of(b), None);
        assert!(f.ctl.close(a).is_empty());
    }

    #[test]
    fn shutdown_cancels_everything() {
        let mut f = fixture();
        f.ctl.open("API", None, Point::ORIGIN, None);
        f.ctl
            .hover_trigger("REST", Rect::new(0.0, 0.0, 50.0, 20.0), None);
        assert!(f.ctl.next_deadline().is_some());
        f.ctl.shutdown();
        assert_eq!(f.ctl.next_deadline(), None);
        assert_eq!(f.at(10_000), 0);
        assert!(!f.ctl.tracker().is_active());
        assert!(!f.ctl.is_active());
        assert_eq!(f.ctl.escape(), None);
        assert!(!f.ctl.pointer_move(PointerSample::mouse(1.0, 1.0, ms(10_001))));
        assert_eq!(f.ctl.stack().len(), 1);
    }

    // Content arrives without disturbing the phase.
    #[test]
    fn resolution_keeps_phase() {
        let mut f = fixture();
        let a = f.ctl.open("API", None, Point::ORIGIN, None);
        f.at(120);
        assert_eq!(f.ctl.poll_resolutions(), 1);
        assert_eq!(f.ctl.phase_of(a), Some(CardPhase::Idle));
        assert!(f.ctl.stack().card(a).unwrap().content().is_some());
    }
}
