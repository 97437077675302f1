// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scan a small document for glossary terms and print highlighted text.
//!
//! Run:
//! - `cargo run -p understory_demos --example term_highlight`

use understory_term_match::{Document, MatcherConfig, Segment, TermMatcher};

fn main() {
    let config = MatcherConfig::default()
        .with_excluded(&["code", "pre", ".no-hovercard"])
        .unwrap();
    let mut matcher = TermMatcher::new(config);
    matcher
        .add_terms([
            ("API", vec!["interface"]),
            ("REST API", Vec::new()),
            ("JSON", Vec::new()),
        ])
        .unwrap();

    let mut doc = Document::new();
    let intro = doc.append_element(doc.root(), "p");
    doc.append_text(intro, "Every REST API speaks json; the api docs describe the interface.");
    let snippet = doc.append_element(doc.root(), "code");
    doc.append_text(snippet, "GET /api/v1/items -> JSON");
    let aside = doc.append_element(doc.root(), "p");
    doc.add_class(aside, "no-hovercard");
    doc.append_text(aside, "This API mention is left alone.");

    println!("== Matches ==");
    let matches = matcher.find_matches(&doc, doc.root());
    for m in &matches {
        println!(
            "  {:<9} {:>3}..{:<3} confidence {:.1}",
            m.term, m.start, m.end, m.confidence
        );
    }
    assert_eq!(matches.len(), 4);

    println!("== Highlighted ==");
    let mut line = String::new();
    for segment in matcher.highlight("Every REST API speaks json; the api docs describe the interface.") {
        match segment {
            Segment::Plain(text) => line.push_str(text),
            Segment::Matched { text, term, .. } => line.push_str(&format!("[{text}|{term}]")),
        }
    }
    println!("  {line}");
}
