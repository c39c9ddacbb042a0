//! CPU timer.

use std::fmt;

use tracing::trace;

use super::types::C8Byte;

/// CPU timer.
///
/// Counts down to zero, one tick per 60 Hz frame.
#[derive(Clone)]
pub struct Timer {
    title: &'static str,
    count: C8Byte,
}

impl Timer {
    /// Create new timer.
    ///
    /// # Arguments
    ///
    /// * `title` - Timer title.
    ///
    pub fn new(title: &'static str) -> Self {
        Timer { title, count: 0 }
    }

    /// Decrement timer.
    pub fn decrement(&mut self) {
        if self.count > 0 {
            self.count -= 1;

            if self.count == 0 {
                trace!(timer = self.title, "timer elapsed");
            }
        }
    }

    /// Reset timer with value.
    ///
    /// # Arguments
    ///
    /// * `value` - Value.
    ///
    pub fn reset(&mut self, value: C8Byte) {
        self.count = value;
    }

    /// Get value.
    pub fn get_value(&self) -> C8Byte {
        self.count
    }

    /// Check if timer is counting.
    pub fn active(&self) -> bool {
        self.count > 0
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.count)
    }
}
