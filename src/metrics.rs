//! Process-wide counters for territory activity.
//! Relaxed atomics; values are diagnostic only and never feed back into decisions.
use std::sync::atomic::{AtomicU64, Ordering};

static UNLOCKS: AtomicU64 = AtomicU64::new(0);
static FORCE_UNLOCKS: AtomicU64 = AtomicU64::new(0);
static TRANSFER_UNLOCKS: AtomicU64 = AtomicU64::new(0);
static PENALTIES_APPLIED: AtomicU64 = AtomicU64::new(0);
static WARNINGS_SENT: AtomicU64 = AtomicU64::new(0);
static SYNC_FAILURES: AtomicU64 = AtomicU64::new(0);
static AREA_RECOMPUTES: AtomicU64 = AtomicU64::new(0);
static CREDITS_AWARDED: AtomicU64 = AtomicU64::new(0);

pub fn inc_unlocks() {
    UNLOCKS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_force_unlocks() {
    FORCE_UNLOCKS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_transfer_unlocks() {
    TRANSFER_UNLOCKS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_penalties_applied() {
    PENALTIES_APPLIED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_warnings_sent() {
    WARNINGS_SENT.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_sync_failures() {
    SYNC_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_area_recomputes() {
    AREA_RECOMPUTES.fetch_add(1, Ordering::Relaxed);
}

pub fn add_credits_awarded(amount: u32) {
    CREDITS_AWARDED.fetch_add(amount as u64, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub unlocks: u64,
    pub force_unlocks: u64,
    pub transfer_unlocks: u64,
    pub penalties_applied: u64,
    pub warnings_sent: u64,
    pub sync_failures: u64,
    pub area_recomputes: u64,
    pub credits_awarded: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        unlocks: UNLOCKS.load(Ordering::Relaxed),
        force_unlocks: FORCE_UNLOCKS.load(Ordering::Relaxed),
        transfer_unlocks: TRANSFER_UNLOCKS.load(Ordering::Relaxed),
        penalties_applied: PENALTIES_APPLIED.load(Ordering::Relaxed),
        warnings_sent: WARNINGS_SENT.load(Ordering::Relaxed),
        sync_failures: SYNC_FAILURES.load(Ordering::Relaxed),
        area_recomputes: AREA_RECOMPUTES.load(Ordering::Relaxed),
        credits_awarded: CREDITS_AWARDED.load(Ordering::Relaxed),
    }
}
