use core::sync::atomic::{AtomicU64, Ordering};

use pcpu_defs::CpuId;

/// Hardware operations of the core executing the call.
///
/// Everything here acts on the *calling* core: `read_msr` reads this core's
/// register, `halt` stops this core. Remote cores are reached through
/// [`crate::kernel::ipi::IpiController::call_on`], which hands the closure the
/// target core's `Cpu`.
pub trait Cpu: Sync {
    /// Logical id from the fast-lookup register.
    fn id(&self) -> CpuId;

    /// Store the logical id in the fast-lookup register.
    fn set_id(&self, id: CpuId);

    fn lapic_id(&self) -> u32;

    fn has_monitor(&self) -> bool;

    /// Arm address monitoring on `addr`.
    fn monitor(&self, addr: &AtomicU64);

    /// Idle until the monitored line is written or an interrupt arrives.
    /// May return spuriously.
    fn mwait(&self);

    fn relax(&self) {
        core::hint::spin_loop();
    }

    fn read_msr(&self, index: u32) -> u64;

    fn write_msr(&self, index: u32, value: u64);

    /// Leave VMX operation if the core is in it.
    fn vmx_off(&self);

    /// Write back and invalidate all caches.
    fn flush_caches(&self);

    fn halt(&self);
}

/// Wait until `*sync == wake_sync`.
pub fn wait_sync_change(cpu: &dyn Cpu, sync: &AtomicU64, wake_sync: u64) {
    if cpu.has_monitor() {
        while sync.load(Ordering::Acquire) != wake_sync {
            cpu.monitor(sync);
            // the store may have landed before the monitor was armed
            if sync.load(Ordering::Acquire) != wake_sync {
                cpu.mwait();
            }
        }
    } else {
        while sync.load(Ordering::Acquire) != wake_sync {
            cpu.relax();
        }
    }
}
