//! Stoppable battle clock.

use std::fmt;

/// Battle clock advanced by the simulation's frame intervals.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Timeline {
    elapsed: f64,
    running: bool,
}

impl Timeline {
    /// Creates a stopped clock at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elapsed: 0.0,
            running: false,
        }
    }

    /// Restarts the clock from zero.
    pub fn start(&mut self) {
        self.elapsed = 0.0;
        self.running = true;
    }

    /// Stops the clock, keeping the elapsed time.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Continues a stopped clock without losing elapsed time.
    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Stops the clock and rewinds it to zero.
    pub fn reset(&mut self) {
        self.running = false;
        self.elapsed = 0.0;
    }

    /// Adds `interval` seconds while running.
    pub fn advance(&mut self, interval: f32) {
        if self.running && interval > 0.0 {
            self.elapsed += f64::from(interval);
        }
    }

    /// Seconds elapsed.
    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed as f32
    }

    /// Reports whether the clock is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Elapsed time as `mm:ss.mmm`.
    #[must_use]
    pub fn format(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let millis = (self.elapsed * 1000.0).floor().max(0.0) as u64;
        write!(
            f,
            "{:02}:{:02}.{:03}",
            millis / 60_000,
            millis / 1000 % 60,
            millis % 1000
        )
    }
}
