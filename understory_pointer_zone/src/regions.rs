// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory region table implementing [`RegionHitTest`].
//!
//! Regions are axis-aligned rectangles in viewport space with a z-index, an
//! optional parent and a [`Marker`] set. Hosts that already own a scene (a DOM,
//! a box tree) implement [`RegionHitTest`] directly instead.

use alloc::vec::Vec;
use kurbo::{Point, Rect};

use crate::types::{Marker, RegionHitTest};

/// Generational handle of a region.
///
/// Stale handles (removed regions, or slots reused later) never alias a live region.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RegionId(u32, u32);

impl RegionId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Geometry and markers for one region.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegionSpec {
    /// Viewport-space bounds.
    pub bounds: Rect,
    /// Stacking order. Higher is on top.
    pub z_index: i32,
    /// Markers used by ancestor lookups.
    pub markers: Marker,
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    live: Option<Entry>,
}

#[derive(Clone, Debug)]
struct Entry {
    spec: RegionSpec,
    parent: Option<RegionId>,
    children: Vec<RegionId>,
    depth: u32,
}

/// Region table with z-ordered point queries.
#[derive(Clone, Debug)]
pub struct RegionTable {
    slots: Vec<Slot>,
    free_list: Vec<usize>,
    viewport: Rect,
}

impl RegionTable {
    /// Create an empty table covering `viewport`.
    pub fn new(viewport: Rect) -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            viewport,
        }
    }

    /// Replace the viewport (window resize).
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// Insert a region under `parent` (or as a root). A stale parent inserts a root.
    pub fn insert(&mut self, parent: Option<RegionId>, spec: RegionSpec) -> RegionId {
        let parent = parent.filter(|p| self.is_alive(*p));
        let depth = parent
            .and_then(|p| self.entry(p))
            .map_or(0, |e| e.depth + 1);
        let entry = Entry {
            spec,
            parent,
            children: Vec::new(),
            depth,
        };
        let id = if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx];
            slot.generation += 1;
            slot.live = Some(entry);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "RegionId uses 32-bit indices by design."
            )]
            RegionId(idx as u32, slot.generation)
        } else {
            self.slots.push(Slot {
                generation: 1,
                live: Some(entry),
            });
            #[allow(
                clippy::cast_possible_truncation,
                reason = "RegionId uses 32-bit indices by design."
            )]
            RegionId((self.slots.len() - 1) as u32, 1)
        };
        if let Some(p) = parent.and_then(|p| self.entry_mut(p)) {
            p.children.push(id);
        }
        id
    }

    /// Remove a region and its subtree. Stale ids are ignored.
    pub fn remove(&mut self, id: RegionId) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let (parent, children) = (entry.parent, entry.children.clone());
        if let Some(p) = parent.and_then(|p| self.entry_mut(p)) {
            p.children.retain(|c| *c != id);
        }
        for child in children {
            self.remove(child);
        }
        self.slots[id.idx()].live = None;
        self.free_list.push(id.idx());
    }

    /// Move or resize a region.
    pub fn set_bounds(&mut self, id: RegionId, bounds: Rect) {
        if let Some(e) = self.entry_mut(id) {
            e.spec.bounds = bounds;
        }
    }

    /// Change a region's stacking order.
    pub fn set_z_index(&mut self, id: RegionId, z_index: i32) {
        if let Some(e) = self.entry_mut(id) {
            e.spec.z_index = z_index;
        }
    }

    /// Offset every region by `(-dx, -dy)`, as a page scroll does.
    pub fn scroll_by(&mut self, dx: f64, dy: f64) {
        for e in self.slots.iter_mut().filter_map(|s| s.live.as_mut()) {
            e.spec.bounds = e.spec.bounds - kurbo::Vec2::new(dx, dy);
        }
    }

    /// Geometry of a live region.
    pub fn spec(&self, id: RegionId) -> Option<RegionSpec> {
        self.entry(id).map(|e| e.spec)
    }

    /// Parent of a live region.
    pub fn parent(&self, id: RegionId) -> Option<RegionId> {
        self.entry(id)?.parent
    }

    /// Whether `id` refers to a live region.
    pub fn is_alive(&self, id: RegionId) -> bool {
        self.entry(id).is_some()
    }

    fn entry(&self, id: RegionId) -> Option<&Entry> {
        let slot = self.slots.get(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.live.as_ref()
    }

    fn entry_mut(&mut self, id: RegionId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.live.as_mut()
    }
}

impl RegionHitTest for RegionTable {
    type Region = RegionId;

    fn regions_at(&self, point: Point) -> Vec<RegionId> {
        let mut hits: Vec<(i32, u32, usize, RegionId)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| {
                let e = s.live.as_ref()?;
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "RegionId uses 32-bit indices by design."
                )]
                let id = RegionId(i as u32, s.generation);
                e.spec
                    .bounds
                    .contains(point)
                    .then_some((e.spec.z_index, e.depth, i, id))
            })
            .collect();
        // Topmost first: higher z, then deeper (children paint over parents), then later slots.
        hits.sort_by(|a, b| (b.0, b.1, b.2).cmp(&(a.0, a.1, a.2)));
        hits.into_iter().map(|(.., id)| id).collect()
    }

    fn nearest_marked(&self, region: RegionId, marker: Marker) -> Option<RegionId> {
        let mut cur = Some(region);
        while let Some(id) = cur {
            let e = self.entry(id)?;
            if e.spec.markers.contains(marker) {
                return Some(id);
            }
            cur = e.parent;
        }
        None
    }

    fn viewport(&self) -> Rect {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn spec(x0: f64, y0: f64, x1: f64, y1: f64, z: i32, markers: Marker) -> RegionSpec {
        RegionSpec {
            bounds: Rect::new(x0, y0, x1, y1),
            z_index: z,
            markers,
        }
    }

    // Higher z first; among equal z, children before parents.
    #[test]
    fn regions_at_orders_topmost_first() {
        let mut t = RegionTable::new(Rect::new(0.0, 0.0, 500.0, 500.0));
        let page = t.insert(None, spec(0.0, 0.0, 500.0, 500.0, 0, Marker::empty()));
        let para = t.insert(Some(page), spec(0.0, 0.0, 200.0, 50.0, 0, Marker::empty()));
        let card = t.insert(None, spec(50.0, 0.0, 250.0, 200.0, 10, Marker::CARD));
        assert_eq!(t.regions_at(Point::new(60.0, 10.0)), vec![card, para, page]);
        assert_eq!(t.regions_at(Point::new(10.0, 10.0)), vec![para, page]);
        assert!(t.regions_at(Point::new(600.0, 10.0)).is_empty());
    }

    #[test]
    fn nearest_marked_walks_ancestors() {
        let mut t = RegionTable::new(Rect::new(0.0, 0.0, 500.0, 500.0));
        let card = t.insert(None, spec(0.0, 0.0, 100.0, 100.0, 1, Marker::CARD));
        let body = t.insert(Some(card), spec(0.0, 20.0, 100.0, 100.0, 1, Marker::empty()));
        let link = t.insert(Some(body), spec(0.0, 20.0, 30.0, 30.0, 1, Marker::TRIGGER));
        assert_eq!(t.nearest_marked(link, Marker::CARD), Some(card));
        assert_eq!(t.nearest_marked(link, Marker::TRIGGER), Some(link));
        assert_eq!(t.nearest_marked(body, Marker::TRIGGER), None);
    }

    // Removing a parent removes its subtree; reused slots produce fresh ids.
    #[test]
    fn remove_subtree_and_stale_ids() {
        let mut t = RegionTable::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let a = t.insert(None, spec(0.0, 0.0, 10.0, 10.0, 0, Marker::empty()));
        let b = t.insert(Some(a), spec(0.0, 0.0, 5.0, 5.0, 0, Marker::empty()));
        t.remove(a);
        assert!(!t.is_alive(a));
        assert!(!t.is_alive(b));
        let c = t.insert(None, spec(0.0, 0.0, 10.0, 10.0, 0, Marker::empty()));
        assert_ne!(c, a);
        assert_ne!(c, b);
        t.set_bounds(a, Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(t.spec(c).unwrap().bounds, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(t.regions_at(Point::new(1.0, 1.0)), vec![c]);
    }

    #[test]
    fn scroll_moves_regions() {
        let mut t = RegionTable::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let a = t.insert(None, spec(0.0, 50.0, 10.0, 60.0, 0, Marker::empty()));
        t.scroll_by(0.0, 40.0);
        assert_eq!(t.spec(a).unwrap().bounds, Rect::new(0.0, 10.0, 10.0, 20.0));
        assert_eq!(t.parent(a), None);
    }
}
