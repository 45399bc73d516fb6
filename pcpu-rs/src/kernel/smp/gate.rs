use core::sync::atomic::{fence, AtomicU64, Ordering};

use crate::kernel::cpu::{wait_sync_change, Cpu};

const GATE_HOLD: u64 = 1;
const GATE_RELEASE: u64 = 0;

/// One-shot rendezvous used during a bring-up episode: followers wait here
/// until the leader has signalled every core.
pub struct SyncGate {
    value: AtomicU64,
}

impl SyncGate {
    pub const fn new() -> SyncGate {
        SyncGate {
            value: AtomicU64::new(GATE_RELEASE),
        }
    }

    /// Close the gate. Ordered before any startup signal sent afterwards.
    pub fn hold(&self) {
        self.value.store(GATE_HOLD, Ordering::Relaxed);
        fence(Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.value.store(GATE_RELEASE, Ordering::Release);
    }

    pub fn is_held(&self) -> bool {
        self.value.load(Ordering::Acquire) != GATE_RELEASE
    }

    pub fn wait(&self, cpu: &dyn Cpu) {
        wait_sync_change(cpu, &self.value, GATE_RELEASE);
    }
}

impl Default for SyncGate {
    fn default() -> SyncGate {
        SyncGate::new()
    }
}
