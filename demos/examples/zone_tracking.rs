// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Classify a pointer path against a trigger and two overlapping cards.
//!
//! Only zone changes are printed; repeated samples in the same zone are silent.
//!
//! Run:
//! - `cargo run -p understory_demos --example zone_tracking`

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use core::time::Duration;
use kurbo::Rect;
use understory_pointer_zone::{
    Marker, PointerSample, RegionSpec, RegionTable, TrackerConfig, Zone, ZoneTracker,
};

fn main() {
    let mut table = RegionTable::new(Rect::new(0.0, 0.0, 640.0, 480.0));
    let spec = |bounds, z_index, markers| RegionSpec {
        bounds,
        z_index,
        markers,
    };
    let trigger = table.insert(None, spec(Rect::new(20.0, 20.0, 80.0, 40.0), 0, Marker::TRIGGER));
    let card_a = table.insert(None, spec(Rect::new(20.0, 50.0, 260.0, 200.0), 10, Marker::CARD));
    let card_b = table.insert(None, spec(Rect::new(200.0, 120.0, 440.0, 280.0), 11, Marker::CARD));

    let top = Rc::new(Cell::new(Some(2_u32)));
    let resolver = top.clone();
    let mut tracker = ZoneTracker::new(table, TrackerConfig::default(), move || resolver.get());
    tracker.start();
    tracker.register_trigger(trigger, "API");
    tracker.register_card(card_a, 1);
    tracker.register_card(card_b, 2);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    tracker.subscribe(move |state| {
        println!(
            "  t={:>4}ms ({:>5.1}, {:>5.1}) -> {:?}",
            state.timestamp.as_millis(),
            state.position.x,
            state.position.y,
            state.zone
        );
        sink.borrow_mut().push(state.zone);
    });

    println!("== Pointer path ==");
    let path = [
        (30.0, 30.0),
        (32.0, 31.0),
        (60.0, 100.0),
        (230.0, 150.0),
        (300.0, 200.0),
        (600.0, 400.0),
        (700.0, 400.0),
    ];
    for (i, (x, y)) in (0_u64..).zip(path) {
        let sample = PointerSample::mouse(x, y, Duration::from_millis(i * 20));
        if tracker.pointer_move(sample) {
            // A real host would wait for its next animation frame.
            tracker.animation_frame();
        }
    }

    assert_eq!(
        *seen.borrow(),
        vec![
            Zone::None,
            Zone::Trigger,
            Zone::OtherCard,
            Zone::TopCard,
            Zone::None
        ]
    );
    top.set(None);
    tracker.stop();
}
