//! AI frame budget monitoring
//!
//! Smooths the cost of the opponent update and turns it into a number of
//! opponents the manager can afford to process in full next frame.

use std::time::{Duration, Instant};

/// Weight of the newest frame in the smoothed cost
const SMOOTHING: f32 = 0.1;
/// Frames measured before the status may change
const WARMUP_FRAMES: u32 = 10;
/// Budget fractions separating the status tiers
const TIGHT_RATIO: f32 = 0.75;
const OVERRUN_RATIO: f32 = 1.5;

/// Where the smoothed AI cost sits relative to the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// Under 75% of the budget
    Within,
    /// Between 75% and 100%
    Tight,
    /// Over budget, shed at least one fully processed opponent
    Over,
    /// Over 150%, shed at least half
    Overrun,
}

impl BudgetStatus {
    fn from_ratio(ratio: f32) -> Self {
        if ratio < TIGHT_RATIO {
            BudgetStatus::Within
        } else if ratio < 1.0 {
            BudgetStatus::Tight
        } else if ratio < OVERRUN_RATIO {
            BudgetStatus::Over
        } else {
            BudgetStatus::Overrun
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, BudgetStatus::Over | BudgetStatus::Overrun)
    }
}

/// Smoothed AI cost per frame against a fixed budget
pub struct AiBudgetMonitor {
    budget_ms: f32,
    /// Exponentially smoothed cost (ms)
    smoothed_ms: f32,
    /// Worst single frame seen (ms)
    peak_ms: f32,
    samples: u32,
    status: BudgetStatus,
    frame_start: Option<Instant>,
    /// Opponents fully processed in the last measured frame
    last_active_count: usize,
}

impl AiBudgetMonitor {
    pub fn new(budget_ms: f32) -> Self {
        Self {
            budget_ms: budget_ms.max(0.01),
            smoothed_ms: 0.0,
            peak_ms: 0.0,
            samples: 0,
            status: BudgetStatus::Within,
            frame_start: None,
            last_active_count: 0,
        }
    }

    pub fn frame_start(&mut self) {
        self.frame_start = Some(Instant::now());
    }

    pub fn frame_end(&mut self, active_count: usize) {
        if let Some(start) = self.frame_start.take() {
            self.record_frame(start.elapsed(), active_count);
        }
    }

    /// Fold one frame's AI cost into the estimate
    pub fn record_frame(&mut self, duration: Duration, active_count: usize) {
        let ms = duration.as_secs_f32() * 1000.0;
        self.smoothed_ms = if self.samples == 0 {
            ms
        } else {
            self.smoothed_ms + SMOOTHING * (ms - self.smoothed_ms)
        };
        self.peak_ms = self.peak_ms.max(ms);
        self.samples = self.samples.saturating_add(1);
        self.last_active_count = active_count;

        if self.samples >= WARMUP_FRAMES {
            self.status = BudgetStatus::from_ratio(self.smoothed_ms / self.budget_ms);
        }
    }

    pub fn status(&self) -> BudgetStatus {
        self.status
    }

    pub fn smoothed_ms(&self) -> f32 {
        self.smoothed_ms
    }

    pub fn peak_ms(&self) -> f32 {
        self.peak_ms
    }

    /// Smoothed cost of one fully processed opponent, if any were measured
    pub fn cost_per_opponent_ms(&self) -> Option<f32> {
        (self.last_active_count > 0 && self.smoothed_ms > 0.0)
            .then(|| self.smoothed_ms / self.last_active_count as f32)
    }

    /// Full-processing slots for the next frame, never below one
    pub fn active_limit(&self, configured: usize) -> usize {
        let affordable = self
            .cost_per_opponent_ms()
            .map(|cost| (self.budget_ms / cost) as usize)
            .unwrap_or(configured);
        let limit = match self.status {
            BudgetStatus::Within | BudgetStatus::Tight => configured,
            BudgetStatus::Over => configured.saturating_sub(1).min(affordable),
            BudgetStatus::Overrun => (configured / 2).min(affordable),
        };
        limit.max(1)
    }

    pub fn status_message(&self) -> String {
        format!(
            "{:?} - {:.3}ms of {:.1}ms (peak {:.3}ms), {} active opponents",
            self.status, self.smoothed_ms, self.budget_ms, self.peak_ms, self.last_active_count
        )
    }
}
