// strata_core/src/trigger.rs

//! Scan scheduling: the rate limiter consulted on every host tick, and the
//! one-scan-in-flight slot that serializes scans.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

// =========================================================================
// == Scan State Machine ==
// =========================================================================

/// Whether a sensor currently owns a running scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    /// Scan number `scan_index` holds the slot.
    InFlight { scan_index: u64 },
}

const IDLE: u64 = 0;

#[derive(Debug, Default)]
struct SlotInner {
    /// `IDLE`, or the index of the scan that holds the slot.
    state: AtomicU64,
    /// Set at teardown; no permit is handed out afterwards.
    closed: AtomicBool,
}

/// The single slot a sensor's scans compete for. At most one `ScanPermit` is
/// alive per slot generation; a new one can only be acquired once the
/// previous holder has released it (or teardown force-released it).
#[derive(Debug, Clone, Default)]
pub struct ScanSlot {
    inner: Arc<SlotInner>,
}

impl ScanSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScanState {
        match self.inner.state.load(Ordering::Acquire) {
            IDLE => ScanState::Idle,
            scan_index => ScanState::InFlight { scan_index },
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state() == ScanState::Idle
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Moves the slot from `Idle` to `InFlight { scan_index }`.
    /// Returns `None` if a scan is already in flight, the slot is closed, or
    /// `scan_index` is 0 (reserved for `Idle`; scan indices start at 1).
    pub fn try_acquire(&self, scan_index: u64) -> Option<ScanPermit> {
        if scan_index == IDLE || self.is_closed() {
            return None;
        }
        self.inner
            .state
            .compare_exchange(IDLE, scan_index, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(ScanPermit {
            slot: self.inner.clone(),
            scan_index,
            released: false,
        })
    }

    /// Forces the slot back to `Idle` regardless of who holds it.
    /// Returns the scan that was evicted, if any.
    pub fn force_release(&self) -> Option<u64> {
        match self.inner.state.swap(IDLE, Ordering::AcqRel) {
            IDLE => None,
            scan_index => Some(scan_index),
        }
    }

    /// Closes the slot for good and evicts any in-flight scan.
    pub fn close(&self) -> Option<u64> {
        self.inner.closed.store(true, Ordering::Release);
        self.force_release()
    }
}

/// Proof that one scan holds its sensor's slot. Releasing is idempotent and
/// only ever clears the holder's own generation, so a late release after a
/// forced teardown cannot free a newer scan's slot.
#[derive(Debug)]
pub struct ScanPermit {
    slot: Arc<SlotInner>,
    scan_index: u64,
    released: bool,
}

impl ScanPermit {
    pub fn scan_index(&self) -> u64 {
        self.scan_index
    }

    /// True while this permit is still the slot's holder (not released,
    /// not evicted by teardown).
    pub fn is_current(&self) -> bool {
        !self.released && self.slot.state.load(Ordering::Acquire) == self.scan_index
    }

    /// Returns the slot to `Idle`. Returns `true` only for the call that
    /// actually cleared this permit's generation.
    pub fn release(&mut self) -> bool {
        if std::mem::replace(&mut self.released, true) {
            return false;
        }
        self.slot
            .state
            .compare_exchange(self.scan_index, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        self.release();
    }
}

// =========================================================================
// == Rate Limiter ==
// =========================================================================

/// Decides, once per host tick, whether a new scan may start.
///
/// Time is discretized as `floor(time * frequency)`; a scan starts only when
/// that step strictly exceeds the step of the last scan that started and the
/// slot is idle. Ticks that land while a scan is in flight are dropped, not
/// queued.
#[derive(Debug, Clone)]
pub struct ScanTrigger {
    frequency: f64,
    last_step: i64,
    enabled: bool,
}

impl ScanTrigger {
    pub fn new(frequency: f64) -> Self {
        Self {
            frequency,
            last_step: 0,
            enabled: true,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn time_step(&self, time: f64) -> i64 {
        (time * self.frequency).floor() as i64
    }

    /// Step recorded by the last scan that started.
    pub fn last_step(&self) -> i64 {
        self.last_step
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Evaluates the trigger for the tick at `time`. On `true` the step is
    /// recorded and the caller must start a scan.
    pub fn poll(&mut self, time: f64, idle: bool) -> bool {
        if !self.enabled || !idle {
            return false;
        }
        let step = self.time_step(time);
        if step > self.last_step {
            self.last_step = step;
            true
        } else {
            false
        }
    }
}
