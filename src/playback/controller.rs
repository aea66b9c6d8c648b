//! Playback state machine.
//!
//! Owns the cursor year and the play/pause flag. All mutation goes through
//! `play`, `pause`, `toggle`, `reset`, `set_year`, `set_speed` and
//! `handle_tick`; the timer itself is an injected [`Scheduler`].

use super::scheduler::{Scheduler, Tick};
use crate::models::YearRange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Playing,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
        }
    }
}

/// Playback speed, from slowest to fastest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Speed {
    Slow,
    #[default]
    Normal,
    Fast,
    VeryFast,
}

impl Speed {
    /// Time spent on each year.
    pub fn interval(self) -> Duration {
        match self {
            Speed::Slow => Duration::from_millis(500),
            Speed::Normal => Duration::from_millis(200),
            Speed::Fast => Duration::from_millis(100),
            Speed::VeryFast => Duration::from_millis(50),
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speed::Slow => write!(f, "Slow"),
            Speed::Normal => write!(f, "Normal"),
            Speed::Fast => write!(f, "Fast"),
            Speed::VeryFast => write!(f, "Very Fast"),
        }
    }
}

/// Drives the cursor year through a bounded range.
pub struct PlaybackController<S: Scheduler> {
    scheduler: S,
    range: YearRange,
    year: i32,
    speed: Speed,
    state: PlaybackState,
    /// Generation of the scheduler run whose ticks are accepted.
    generation: Option<u64>,
}

impl<S: Scheduler> PlaybackController<S> {
    /// Create a stopped controller positioned at `initial_year` (clamped).
    pub fn new(scheduler: S, range: YearRange, initial_year: i32, speed: Speed) -> Self {
        Self {
            scheduler,
            range,
            year: range.clamp(initial_year),
            speed,
            state: PlaybackState::Stopped,
            generation: None,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn range(&self) -> YearRange {
        self.range
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Start playing. Does nothing when already playing or parked at the end.
    pub fn play(&mut self) {
        if self.is_playing() {
            return;
        }
        if self.year >= self.range.end {
            debug!("Play ignored: already at {}", self.year);
            return;
        }

        self.state = PlaybackState::Playing;
        self.generation = Some(self.scheduler.start(self.speed.interval()));
        debug!("Playing from {} at {} speed", self.year, self.speed);
    }

    /// Stop playing, keeping the current year.
    pub fn pause(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.halt();
        debug!("Paused at {}", self.year);
    }

    /// Play when stopped, pause when playing.
    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Stop and rewind to the start of the range.
    pub fn reset(&mut self) {
        self.halt();
        self.year = self.range.start;
        debug!("Reset to {}", self.year);
    }

    /// Jump to a year, clamped into the range. Playback state is unchanged.
    pub fn set_year(&mut self, year: i32) {
        self.year = self.range.clamp(year);
    }

    /// Change speed. A running timer is rescheduled, never doubled.
    pub fn set_speed(&mut self, speed: Speed) {
        if speed == self.speed {
            return;
        }
        self.speed = speed;

        if self.is_playing() {
            self.generation = Some(self.scheduler.start(speed.interval()));
            debug!("Rescheduled at {} speed", speed);
        }
    }

    /// Apply a scheduler tick.
    ///
    /// Returns the new year when the tick advanced playback. Ticks while
    /// stopped or from a replaced scheduler run are ignored. Reaching the
    /// end of the range stops playback.
    pub fn handle_tick(&mut self, tick: Tick) -> Option<i32> {
        if !self.is_playing() || self.generation != Some(tick.generation) {
            debug!("Dropped stale tick from run {}", tick.generation);
            return None;
        }

        if self.year >= self.range.end {
            self.halt();
            return None;
        }

        self.year += 1;
        if self.year >= self.range.end {
            self.halt();
            debug!("Reached {}, playback stopped", self.year);
        }

        Some(self.year)
    }

    fn halt(&mut self) {
        self.scheduler.stop();
        self.generation = None;
        self.state = PlaybackState::Stopped;
    }
}
