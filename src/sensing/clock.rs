// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the printer-thermal project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Monotonic clock and print-time estimation
//!
//! Sampling timestamps are observed on the host's monotonic clock and
//! converted to the controller's estimated print time before they reach the
//! heater callback. The conversion is a seam: the reference implementation
//! maps host seconds one-to-one, a real controller substitutes its MCU
//! clock skew estimate.

use std::time::Instant;

/// Clock collaborator for the sampling loop and sensor drivers
pub trait PrintTimeClock {
    /// Seconds elapsed on the monotonic clock since the service started
    fn monotonic(&self) -> f64;

    /// Convert a monotonic timestamp to the controller's estimated print time
    fn estimated_print_time(&self, eventtime: f64) -> f64;
}

/// Host reference clock: monotonic seconds since construction, identity
/// print-time mapping
pub struct HostClock {
    start: Instant,
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PrintTimeClock for HostClock {
    fn monotonic(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn estimated_print_time(&self, eventtime: f64) -> f64 {
        eventtime
    }
}
