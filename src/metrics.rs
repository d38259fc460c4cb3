//! Process-wide engine counters.
//! Cheap relaxed atomics; read back through `snapshot()` by the server status line and tests.
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static TICKS: AtomicU64 = AtomicU64::new(0);
static SUBSYSTEM_ERRORS: AtomicU64 = AtomicU64::new(0);
static ATTACKS: AtomicU64 = AtomicU64::new(0);
static KILLS: AtomicU64 = AtomicU64::new(0);
static FLEES: AtomicU64 = AtomicU64::new(0);
static SCRIPT_FAILURES: AtomicU64 = AtomicU64::new(0);
static CONNECTIONS: AtomicU64 = AtomicU64::new(0);

pub fn record_tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_subsystem_error() {
    SUBSYSTEM_ERRORS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_attack() {
    ATTACKS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_kill() {
    KILLS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_flee() {
    FLEES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_script_failure() {
    SCRIPT_FAILURES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_connection() {
    CONNECTIONS.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub ticks: u64,
    pub subsystem_errors: u64,
    pub attacks: u64,
    pub kills: u64,
    pub flees: u64,
    pub script_failures: u64,
    pub connections: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        ticks: TICKS.load(Ordering::Relaxed),
        subsystem_errors: SUBSYSTEM_ERRORS.load(Ordering::Relaxed),
        attacks: ATTACKS.load(Ordering::Relaxed),
        kills: KILLS.load(Ordering::Relaxed),
        flees: FLEES.load(Ordering::Relaxed),
        script_failures: SCRIPT_FAILURES.load(Ordering::Relaxed),
        connections: CONNECTIONS.load(Ordering::Relaxed),
    }
}

impl std::fmt::Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ticks={} subsystem_errors={} attacks={} kills={} flees={} script_failures={} connections={}",
            self.ticks,
            self.subsystem_errors,
            self.attacks,
            self.kills,
            self.flees,
            self.script_failures,
            self.connections
        )
    }
}
