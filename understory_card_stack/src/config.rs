// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Configuration.
//!
//! [`HovercardConfig`] carries every knob of the stack, the controller, the
//! tracker and the matcher. Construct it with [`HovercardConfig::builder`], or
//! start from [`Default`] and call [`HovercardConfig::validate`]; the engine and
//! controller validate again at construction.

use core::time::Duration;

use understory_pointer_zone::TrackerConfig;
use understory_term_match::{MatchStrategy, MatcherConfig, Selector};

use crate::ConfigError;

/// What following a link inside a card does.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LinkMode {
    /// Open a child card stacked on the current one.
    #[default]
    NewCard,
    /// Replace the current card's term and content in place.
    Replace,
}

/// How nested cards are positioned relative to their parent.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum StackingMode {
    /// Offset each child diagonally from its parent by `stack_offset`.
    #[default]
    Cascade,
    /// Place each card where it was requested.
    Free,
}

/// Full hovercard configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct HovercardConfig {
    /// Hover time on a trigger before a card opens.
    pub dwell_delay: Duration,
    /// Link-follow behavior.
    pub link_mode: LinkMode,
    /// Cap on simultaneously open cards (soft when only ancestors remain).
    pub max_open_cards: usize,
    /// Escape closes the top card.
    pub close_on_escape: bool,
    /// Pointer-down outside every trigger and card closes the top card.
    pub close_on_click_outside: bool,
    /// Auto-close delay for the first close of an exploration session.
    pub initial_delay: Duration,
    /// Shorter auto-close delay used after an auto-close already happened.
    pub cascade_delay: Duration,
    /// Fade-out duration before an auto-closed card is removed.
    pub fade_duration: Duration,
    /// Enter animation duration.
    pub enter_duration: Duration,
    /// Window after every open during which no auto-close is scheduled.
    pub grace_period: Duration,
    /// Upper bound on the fade used by Escape, click-outside and scroll closes.
    pub immediate_fade_cap: Duration,
    /// Placement of nested cards.
    pub stacking: StackingMode,
    /// Offset in px between a parent and a cascaded child.
    pub stack_offset: f64,
    /// Whether cards render a close button. Read by renderers only.
    pub show_close_button: bool,
    /// Term boundary strategy.
    pub match_strategy: MatchStrategy,
    /// Case-sensitive term matching.
    pub case_sensitive: bool,
    /// Subtrees never scanned for terms.
    pub excluded_selectors: Vec<Selector>,
    /// Pointer speed (px/ms) below which samples count as jitter.
    pub velocity_threshold: f64,
}

impl Default for HovercardConfig {
    fn default() -> Self {
        Self {
            dwell_delay: Duration::from_millis(350),
            link_mode: LinkMode::NewCard,
            max_open_cards: 5,
            close_on_escape: true,
            close_on_click_outside: true,
            initial_delay: Duration::from_millis(600),
            cascade_delay: Duration::from_millis(250),
            fade_duration: Duration::from_millis(150),
            enter_duration: Duration::from_millis(120),
            grace_period: Duration::from_millis(300),
            immediate_fade_cap: Duration::from_millis(80),
            stacking: StackingMode::Cascade,
            stack_offset: 16.0,
            show_close_button: true,
            match_strategy: MatchStrategy::WordBoundary,
            case_sensitive: false,
            excluded_selectors: Selector::defaults(),
            velocity_threshold: TrackerConfig::default().velocity_threshold,
        }
    }
}

impl HovercardConfig {
    /// Start a builder from the defaults.
    pub fn builder() -> HovercardConfigBuilder {
        HovercardConfigBuilder {
            config: Self::default(),
            excluded: None,
        }
    }

    /// Check every invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_open_cards == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.initial_delay.is_zero() {
            return Err(ConfigError::ZeroInitialDelay);
        }
        if self.cascade_delay.is_zero() {
            return Err(ConfigError::ZeroCascadeDelay);
        }
        if self.cascade_delay > self.initial_delay {
            return Err(ConfigError::CascadeExceedsInitial {
                cascade: self.cascade_delay,
                initial: self.initial_delay,
            });
        }
        if !self.stack_offset.is_finite() || self.stack_offset < 0.0 {
            return Err(ConfigError::InvalidStackOffset(self.stack_offset));
        }
        if !self.velocity_threshold.is_finite() || self.velocity_threshold < 0.0 {
            return Err(ConfigError::InvalidVelocityThreshold(
                self.velocity_threshold,
            ));
        }
        Ok(())
    }

    /// Matcher settings derived from this configuration.
    pub fn matcher_config(&self) -> MatcherConfig {
        MatcherConfig {
            strategy: self.match_strategy,
            case_sensitive: self.case_sensitive,
            excluded: self.excluded_selectors.clone(),
            ..MatcherConfig::default()
        }
    }

    /// Tracker settings derived from this configuration.
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            velocity_threshold: self.velocity_threshold,
            ..TrackerConfig::default()
        }
    }

    /// Fade used by Escape, click-outside and scroll closes.
    pub fn immediate_fade(&self) -> Duration {
        self.fade_duration.min(self.immediate_fade_cap)
    }
}

/// Consuming builder for [`HovercardConfig`].
#[derive(Clone, Debug)]
pub struct HovercardConfigBuilder {
    config: HovercardConfig,
    excluded: Option<Vec<String>>,
}

impl HovercardConfigBuilder {
    /// Set the dwell delay.
    pub fn dwell_delay(mut self, d: Duration) -> Self {
        self.config.dwell_delay = d;
        self
    }

    /// Set the link-follow mode.
    pub fn link_mode(mut self, mode: LinkMode) -> Self {
        self.config.link_mode = mode;
        self
    }

    /// Set the open-card cap.
    pub fn max_open_cards(mut self, n: usize) -> Self {
        self.config.max_open_cards = n;
        self
    }

    /// Enable or disable Escape-to-close.
    pub fn close_on_escape(mut self, on: bool) -> Self {
        self.config.close_on_escape = on;
        self
    }

    /// Enable or disable click-outside-to-close.
    pub fn close_on_click_outside(mut self, on: bool) -> Self {
        self.config.close_on_click_outside = on;
        self
    }

    /// Set the initial, cascade and fade delays.
    pub fn close_delays(mut self, initial: Duration, cascade: Duration, fade: Duration) -> Self {
        self.config.initial_delay = initial;
        self.config.cascade_delay = cascade;
        self.config.fade_duration = fade;
        self
    }

    /// Set the enter animation duration.
    pub fn enter_duration(mut self, d: Duration) -> Self {
        self.config.enter_duration = d;
        self
    }

    /// Set the post-open grace period.
    pub fn grace_period(mut self, d: Duration) -> Self {
        self.config.grace_period = d;
        self
    }

    /// Set the stacking mode and offset.
    pub fn stacking(mut self, mode: StackingMode, offset: f64) -> Self {
        self.config.stacking = mode;
        self.config.stack_offset = offset;
        self
    }

    /// Show or hide the close button.
    pub fn show_close_button(mut self, on: bool) -> Self {
        self.config.show_close_button = on;
        self
    }

    /// Set the term matching strategy and case sensitivity.
    pub fn matching(mut self, strategy: MatchStrategy, case_sensitive: bool) -> Self {
        self.config.match_strategy = strategy;
        self.config.case_sensitive = case_sensitive;
        self
    }

    /// Replace the excluded selectors. Parsed in [`build`](Self::build).
    pub fn excluded_selectors<S: AsRef<str>>(mut self, selectors: &[S]) -> Self {
        self.excluded = Some(selectors.iter().map(|s| s.as_ref().to_owned()).collect());
        self
    }

    /// Set the jitter velocity threshold.
    pub fn velocity_threshold(mut self, v: f64) -> Self {
        self.config.velocity_threshold = v;
        self
    }

    /// Parse, validate and return the configuration.
    pub fn build(self) -> Result<HovercardConfig, ConfigError> {
        let mut config = self.config;
        if let Some(excluded) = self.excluded {
            config.excluded_selectors = excluded
                .iter()
                .map(|s| s.parse::<Selector>())
                .collect::<Result<_, _>>()?;
        }
        config.validate()?;
        Ok(config)
    }
}
