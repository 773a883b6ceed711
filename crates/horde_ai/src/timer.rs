//! Timers that turn instantaneous conditions into debounced signals
//!
//! Four shapes cover every timed behaviour in the crate:
//!
//! - [`HysteresisTimer`] rises while a condition holds and falls (clamped at
//!   zero) while it does not, firing at a threshold.
//! - [`Stopwatch`] is armed on an edge, counts up monotonically and is
//!   disarmed rather than decremented.
//! - [`Accumulator`] counts up while running and fires once at a threshold.
//! - [`Interval`] fires periodically.

/// What a timer did during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Nothing notable
    None,
    /// Threshold reached; the timer has been reset
    Fired,
    /// Counted down to zero and deactivated
    Drained,
}

/// Up/down accumulator with a firing threshold
#[derive(Debug, Clone)]
pub struct HysteresisTimer {
    name: &'static str,
    value: f32,
    threshold: f32,
    active: bool,
}

impl HysteresisTimer {
    /// Create an inactive timer
    pub fn new(name: &'static str, threshold: f32) -> Self {
        Self {
            name,
            value: 0.0,
            threshold,
            active: false,
        }
    }

    /// Start accumulating from zero
    pub fn arm(&mut self) {
        self.value = 0.0;
        self.active = true;
    }

    /// Back to zero and inactive
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.active = false;
    }

    /// Advance by `dt`, counting up if `condition` holds and down otherwise
    pub fn tick(&mut self, dt: f32, condition: bool) -> TimerEvent {
        if !self.active {
            return TimerEvent::None;
        }

        if condition {
            self.value += dt;
            if self.value >= self.threshold {
                log::debug!("{} timer fired after {:.2}s", self.name, self.value);
                self.reset();
                return TimerEvent::Fired;
            }
        } else {
            self.value -= dt;
            if self.value <= 0.0 {
                self.reset();
                return TimerEvent::Drained;
            }
        }

        TimerEvent::None
    }

    /// Current accumulated value
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Firing threshold
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Whether the timer is accumulating
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Timer name used in logs
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Monotonic edge-armed timer
#[derive(Debug, Clone)]
pub struct Stopwatch {
    name: &'static str,
    limit: f32,
    elapsed: Option<f32>,
}

impl Stopwatch {
    /// Create a disarmed stopwatch
    pub fn new(name: &'static str, limit: f32) -> Self {
        Self {
            name,
            limit,
            elapsed: None,
        }
    }

    /// Start counting from zero
    pub fn arm(&mut self) {
        self.elapsed = Some(0.0);
    }

    /// Stop counting
    pub fn disarm(&mut self) {
        self.elapsed = None;
    }

    /// Advance; returns `true` once when the limit is reached, then disarms
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(elapsed) = self.elapsed.as_mut() else {
            return false;
        };

        *elapsed += dt;
        if *elapsed >= self.limit {
            log::debug!("{} stopwatch expired after {:.2}s", self.name, *elapsed);
            self.elapsed = None;
            return true;
        }
        false
    }

    /// Whether the stopwatch is counting
    pub fn is_armed(&self) -> bool {
        self.elapsed.is_some()
    }

    /// Elapsed time, if armed
    pub fn elapsed(&self) -> Option<f32> {
        self.elapsed
    }
}

/// Count-up timer that fires once at a threshold
#[derive(Debug, Clone)]
pub struct Accumulator {
    name: &'static str,
    value: f32,
    threshold: f32,
    running: bool,
}

impl Accumulator {
    /// Create a stopped accumulator
    pub fn new(name: &'static str, threshold: f32) -> Self {
        Self {
            name,
            value: 0.0,
            threshold,
            running: false,
        }
    }

    /// Start (or restart) from zero
    pub fn start(&mut self) {
        self.value = 0.0;
        self.running = true;
    }

    /// Stop and clear
    pub fn stop(&mut self) {
        self.value = 0.0;
        self.running = false;
    }

    /// Advance; returns `true` once when the threshold is reached, then stops
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.running {
            return false;
        }

        self.value += dt;
        if self.value >= self.threshold {
            log::debug!("{} reached {:.2}s", self.name, self.threshold);
            self.stop();
            return true;
        }
        false
    }

    /// Whether the accumulator is counting
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current value
    pub fn value(&self) -> f32 {
        self.value
    }
}

/// Periodic trigger
#[derive(Debug, Clone)]
pub struct Interval {
    period: f32,
    elapsed: f32,
    primed: bool,
}

impl Interval {
    /// Create an interval that fires every `period` seconds
    pub fn new(period: f32) -> Self {
        Self {
            period,
            elapsed: 0.0,
            primed: false,
        }
    }

    /// Create an interval whose first tick fires immediately
    pub fn due_now(period: f32) -> Self {
        Self {
            period,
            elapsed: 0.0,
            primed: true,
        }
    }

    /// Advance; returns `true` when a period has elapsed
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.primed {
            self.primed = false;
            self.elapsed = 0.0;
            return true;
        }

        self.elapsed += dt;
        if self.elapsed >= self.period {
            // Never carry over more than one period
            self.elapsed = (self.elapsed - self.period).min(self.period);
            return true;
        }
        false
    }

    /// Start a fresh period
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.primed = false;
    }

    /// Fire on the next tick
    pub fn prime(&mut self) {
        self.primed = true;
    }

    /// Period length
    pub fn period(&self) -> f32 {
        self.period
    }
}
