// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Card placement.
//!
//! The stack asks a [`PositionResolver`] for every card origin. The default,
//! [`AdjacentPlacement`], keeps cards inside the viewport; hosts with their own
//! layout pass a closure instead.

use kurbo::{Point, Rect, Size, Vec2};

use crate::{HovercardConfig, StackingMode};

/// Everything known about a card when it is placed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlacementRequest {
    /// Position passed to the open call.
    pub requested: Point,
    /// Bounds of the trigger, when known.
    pub anchor: Option<Rect>,
    /// Origin of the parent card, for nested cards.
    pub parent: Option<Point>,
    /// Nesting depth of the new card.
    pub level: u32,
    /// Place beside the anchor rather than at `requested`. Set by pinning.
    pub adjacent: bool,
}

/// Strategy that turns a [`PlacementRequest`] into a card origin.
pub trait PositionResolver {
    /// Origin for the new card.
    fn place(&self, request: &PlacementRequest) -> Point;
}

impl<F: Fn(&PlacementRequest) -> Point> PositionResolver for F {
    fn place(&self, request: &PlacementRequest) -> Point {
        self(request)
    }
}

/// Viewport-aware default placement.
///
/// Adjacent requests go right of the anchor, or left when that would overflow.
/// Nested cards in [`StackingMode::Cascade`] sit `offset` px down and right of
/// their parent. Every result is clamped so the card stays inside `viewport`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AdjacentPlacement {
    /// Visible area cards must stay within.
    pub viewport: Rect,
    /// Nominal card size used for overflow tests.
    pub card_size: Size,
    /// Horizontal gap between an anchor and an adjacent card.
    pub gap: f64,
    /// Nested card positioning.
    pub stacking: StackingMode,
    /// Cascade offset.
    pub offset: f64,
}

impl AdjacentPlacement {
    /// Placement using the stacking settings of `config`.
    pub fn from_config(config: &HovercardConfig, viewport: Rect, card_size: Size) -> Self {
        Self {
            viewport,
            card_size,
            gap: 8.0,
            stacking: config.stacking,
            offset: config.stack_offset,
        }
    }

    fn clamp(&self, p: Point) -> Point {
        let max_x = (self.viewport.x1 - self.card_size.width).max(self.viewport.x0);
        let max_y = (self.viewport.y1 - self.card_size.height).max(self.viewport.y0);
        Point::new(
            p.x.clamp(self.viewport.x0, max_x),
            p.y.clamp(self.viewport.y0, max_y),
        )
    }
}

impl PositionResolver for AdjacentPlacement {
    fn place(&self, request: &PlacementRequest) -> Point {
        let raw = match (request.adjacent, request.anchor, request.parent) {
            (true, Some(anchor), _) => {
                let right = anchor.x1 + self.gap;
                let x = if right + self.card_size.width <= self.viewport.x1 {
                    right
                } else {
                    anchor.x0 - self.gap - self.card_size.width
                };
                Point::new(x, anchor.y0)
            }
            (_, _, Some(parent)) if self.stacking == StackingMode::Cascade => {
                parent + Vec2::new(self.offset, self.offset)
            }
            _ => request.requested,
        };
        self.clamp(raw)
    }
}
