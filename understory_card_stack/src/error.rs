// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Only configuration errors are fatal. A failing content source is logged and
//! skipped; stale ids are silent no-ops; "no content" is a card state, not an error.

use core::time::Duration;

use understory_term_match::MatchError;

/// Invalid configuration, reported at construction.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `max_open_cards` was zero.
    #[error("max_open_cards must be at least 1")]
    ZeroCapacity,

    /// `initial_delay` was zero.
    #[error("initial_delay must be greater than zero")]
    ZeroInitialDelay,

    /// `cascade_delay` was zero.
    #[error("cascade_delay must be greater than zero")]
    ZeroCascadeDelay,

    /// `cascade_delay` was longer than `initial_delay`.
    #[error("cascade_delay ({cascade:?}) must not exceed initial_delay ({initial:?})")]
    CascadeExceedsInitial {
        /// Configured cascade delay.
        cascade: Duration,
        /// Configured initial delay.
        initial: Duration,
    },

    /// `stack_offset` was negative or not finite.
    #[error("stack_offset must be finite and non-negative, got {0}")]
    InvalidStackOffset(f64),

    /// `velocity_threshold` was negative or not finite.
    #[error("velocity_threshold must be finite and non-negative, got {0}")]
    InvalidVelocityThreshold(f64),

    /// A matcher setting (such as an exclusion selector) was invalid.
    #[error(transparent)]
    Matcher(#[from] MatchError),
}

/// A content source failed to answer.
///
/// The resolver logs it and moves on to the next source.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The backing store could not be reached.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The source answered with something it could not turn into content.
    #[error("source failed: {0}")]
    Failed(String),
}
