use pcpu_defs::{CpuId, NOTIFY_VCPU_VECTOR, TIMER_VECTOR};

use crate::kernel::cpu::Cpu;
use crate::kernel::utils::CpuMask;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum IpiKind {
    Timer = TIMER_VECTOR,
    NotifyVcpu = NOTIFY_VCPU_VECTOR,
}

/// Cross-core dispatch provided by the interrupt layer.
pub trait IpiController: Sync {
    /// INIT/SIPI sequence pointing `cpu` at the trampoline at `entry`.
    fn send_startup(&self, cpu: CpuId, entry: u64);

    fn send_ipi(&self, cpu: CpuId, kind: IpiKind);

    /// Run `f` on every core in `mask`, handing it that core's `Cpu`.
    /// Must not return before every target has finished running `f`.
    fn call_on(&self, mask: CpuMask, f: &(dyn Fn(&dyn Cpu) + Sync));
}
