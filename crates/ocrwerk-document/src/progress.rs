// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Progress reporting for a single run.

use ocrwerk_core::types::ProgressUpdate;
use tracing::debug;

/// Forwards `(percent, label)` updates to a caller's sink, never letting the
/// percentage go backwards or past 100.
pub struct ProgressTracker<'a> {
    sink: &'a mut dyn FnMut(ProgressUpdate),
    last: u8,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a mut dyn FnMut(ProgressUpdate)) -> Self {
        Self { sink, last: 0 }
    }

    pub fn report(&mut self, percent: u8, label: impl Into<String>) {
        let percent = percent.clamp(self.last, 100);
        self.last = percent;
        let label = label.into();
        debug!(percent, label = %label, "Progress");
        (self.sink)(ProgressUpdate { percent, label });
    }

    pub fn last_percent(&self) -> u8 {
        self.last
    }
}
