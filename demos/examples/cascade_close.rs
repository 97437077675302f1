// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drive the stack controller through an exploration session.
//!
//! A card opens from a trigger, a nested card opens from a link inside it, then
//! the pointer wanders off. The nested card closes after the initial delay and
//! its parent follows after the shorter cascade delay. A slow content source
//! shows the loading state.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p understory_demos --example cascade_close`

use std::rc::Rc;
use std::sync::{Arc, Mutex};

use core::time::Duration;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::block_on;
use kurbo::{Point, Rect, Size};
use tracing_subscriber::EnvFilter;
use understory_card_stack::{
    AdjacentPlacement, Clock, Content, ContentSource, HovercardConfig, ManualClock, ResolveFuture,
    SourceError, StackController, StaticSource,
};
use understory_pointer_zone::{Marker, PointerSample, RegionSpec, RegionTable};

/// Answers for one term when the demo releases it.
struct Remote {
    pending: Mutex<Option<oneshot::Receiver<Content>>>,
}

impl ContentSource for Remote {
    fn name(&self) -> &str {
        "remote"
    }

    fn resolve(&self, term: &str) -> ResolveFuture {
        let rx = match self.pending.lock() {
            Ok(mut slot) if term == "REST" => slot.take(),
            _ => None,
        };
        async move {
            match rx {
                Some(rx) => rx
                    .await
                    .map(Some)
                    .map_err(|_| SourceError::Unavailable("request dropped".into())),
                None => Ok(None),
            }
        }
        .boxed()
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = HovercardConfig::default();
    let viewport = Rect::new(0.0, 0.0, 1024.0, 768.0);
    let clock = ManualClock::new();
    let (release, rx) = oneshot::channel();
    let sources: Vec<Arc<dyn ContentSource>> = vec![
        Arc::new(Remote {
            pending: Mutex::new(Some(rx)),
        }),
        Arc::new(
            StaticSource::new("glossary")
                .with("API", Content::new("API").with_link("REST", Some("REST style"))),
        ),
    ];
    let mut table = RegionTable::new(viewport);
    let trigger = table.insert(
        None,
        RegionSpec {
            bounds: Rect::new(40.0, 40.0, 90.0, 60.0),
            z_index: 0,
            markers: Marker::TRIGGER,
        },
    );
    let mut ctl = StackController::new(
        &config,
        table,
        sources,
        AdjacentPlacement::from_config(&config, viewport, Size::new(280.0, 180.0)),
        Rc::new(clock.clone()),
    )
    .unwrap();
    ctl.register_trigger(trigger, "API");

    let report = |ctl: &StackController<RegionTable>, label: &str| {
        println!("== {label} (t={}ms) ==", clock.now().as_millis());
        for card in ctl.stack().cards() {
            let state = if card.is_loading() {
                "loading"
            } else if card.is_empty() {
                "empty"
            } else {
                "ready"
            };
            println!(
                "  {} {:<5} level {} at ({:.0}, {:.0}) {state} {:?}",
                card.id(),
                card.term(),
                card.level(),
                card.position().x,
                card.position().y,
                ctl.phase_of(card.id()),
            );
        }
    };
    let advance_to = |ctl: &mut StackController<RegionTable>, ms: u64| {
        clock.set(Duration::from_millis(ms));
        ctl.tick();
    };

    // Hover the trigger long enough to open a card.
    if ctl.pointer_move(PointerSample::mouse(50.0, 50.0, clock.now())) {
        ctl.animation_frame();
    }
    ctl.hover_trigger("API", Rect::new(40.0, 40.0, 90.0, 60.0), None);
    advance_to(&mut ctl, 350);
    ctl.poll_resolutions();
    let api = ctl.stack().top_card().unwrap();
    report(&ctl, "API opened");

    // Follow the link inside the card; the remote source is still thinking.
    let rest = ctl.follow_link("REST", api, Point::new(120.0, 140.0)).unwrap();
    ctl.poll_resolutions();
    report(&ctl, "REST requested");
    release.send(Content::new("REST").with_markdown("*Representational state transfer*")).ok();
    block_on(ctl.next_resolution());
    report(&ctl, "REST resolved");

    // The pointer leaves the window; both cards close, the second one faster.
    ctl.pointer_leave();
    let mut last = clock.now();
    while let Some(deadline) = ctl.next_deadline() {
        advance_to(&mut ctl, deadline.as_millis().try_into().unwrap_or(u64::MAX));
        if clock.now() != last {
            last = clock.now();
            report(&ctl, "tick");
        }
    }
    assert!(ctl.stack().is_empty());
    assert!(ctl.has_cascaded());
    println!("closed {rest} and {api}");
}
