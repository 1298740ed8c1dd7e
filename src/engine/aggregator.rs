use crate::config::WindowConfig;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LatchState {
    Pending,
    /// Terminal; `snapshot` is the lifetime count when the deadline was reached.
    Latched { snapshot: u64 },
}

/// One-shot window that freezes the lifetime count at its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowLatch {
    label: String,
    deadline: Duration,
    state: LatchState,
}

impl WindowLatch {
    pub fn new(label: impl Into<String>, deadline: Duration) -> Self {
        Self {
            label: label.into(),
            deadline,
            state: LatchState::Pending,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn state(&self) -> LatchState {
        self.state
    }

    /// 0 while pending, the frozen snapshot once latched.
    pub fn value(&self) -> u64 {
        match self.state {
            LatchState::Pending => 0,
            LatchState::Latched { snapshot } => snapshot,
        }
    }

    /// Returns true only on the transition.
    fn tick(&mut self, elapsed: Duration, lifetime_count: u64) -> bool {
        if self.state == LatchState::Pending && elapsed >= self.deadline {
            self.state = LatchState::Latched {
                snapshot: lifetime_count,
            };
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatchView {
    pub label: String,
    pub deadline_secs: u64,
    pub latched: bool,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViolationState {
    pub lifetime_count: u64,
    pub windows: Vec<LatchView>,
}

/// Lifetime violation counter plus the window latches.
///
/// `record_cycle` is the only mutator and must be called at most once per
/// cycle; the engine serializes cycles, so the counter never decreases and
/// each latch transitions once.
#[derive(Debug, Clone)]
pub struct ViolationAggregator {
    lifetime_count: u64,
    last_cycle_failed: u64,
    latches: Vec<WindowLatch>,
}

impl ViolationAggregator {
    pub fn new(windows: &[WindowConfig]) -> Self {
        Self {
            lifetime_count: 0,
            last_cycle_failed: 0,
            latches: windows
                .iter()
                .map(|window| {
                    WindowLatch::new(&window.label, Duration::from_secs(window.deadline_secs))
                })
                .collect(),
        }
    }

    /// Add this cycle's failures, then close any window whose deadline has
    /// been reached. Returns the labels of windows that latched now.
    pub fn record_cycle(&mut self, failed: u64, elapsed: Duration) -> Vec<String> {
        self.lifetime_count = self.lifetime_count.saturating_add(failed);
        self.last_cycle_failed = failed;

        let lifetime_count = self.lifetime_count;
        self.latches
            .iter_mut()
            .filter_map(|latch| {
                latch
                    .tick(elapsed, lifetime_count)
                    .then(|| latch.label.clone())
            })
            .collect()
    }

    pub fn lifetime_count(&self) -> u64 {
        self.lifetime_count
    }

    pub fn last_cycle_failed(&self) -> u64 {
        self.last_cycle_failed
    }

    pub fn latches(&self) -> &[WindowLatch] {
        &self.latches
    }

    pub fn snapshot(&self) -> ViolationState {
        ViolationState {
            lifetime_count: self.lifetime_count,
            windows: self
                .latches
                .iter()
                .map(|latch| LatchView {
                    label: latch.label.clone(),
                    deadline_secs: latch.deadline.as_secs(),
                    latched: latch.state != LatchState::Pending,
                    value: latch.value(),
                })
                .collect(),
        }
    }
}
