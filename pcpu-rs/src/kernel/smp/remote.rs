//! Synchronous MSR access on another core.

use core::sync::atomic::{AtomicU64, Ordering};

use pcpu_defs::CpuId;

use crate::kernel::cpu::Cpu;
use crate::kernel::smp::Smp;
use crate::kernel::utils::CpuMask;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegisterOp {
    Read,
    Write(u64),
}

/// Request executed on the target core. The caller gets it back, and with it
/// the read value, only once the cross-core call has completed.
pub struct RemoteRegisterMessage {
    index: u32,
    op: RegisterOp,
    value: AtomicU64,
}

impl RemoteRegisterMessage {
    pub fn read(index: u32) -> RemoteRegisterMessage {
        RemoteRegisterMessage {
            index,
            op: RegisterOp::Read,
            value: AtomicU64::new(0),
        }
    }

    pub fn write(index: u32, value: u64) -> RemoteRegisterMessage {
        RemoteRegisterMessage {
            index,
            op: RegisterOp::Write(value),
            value: AtomicU64::new(value),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn op(&self) -> RegisterOp {
        self.op
    }

    fn execute(&self, cpu: &dyn Cpu) {
        match self.op {
            RegisterOp::Read => self.value.store(cpu.read_msr(self.index), Ordering::Release),
            RegisterOp::Write(v) => cpu.write_msr(self.index, v),
        }
    }

    pub fn into_value(self) -> u64 {
        self.value.into_inner()
    }
}

impl Smp {
    fn call_register(
        &self,
        cpu: &dyn Cpu,
        msg: RemoteRegisterMessage,
        target: CpuId,
    ) -> RemoteRegisterMessage {
        if target == cpu.id() {
            msg.execute(cpu);
        } else {
            dbgln!(ipi, "msr {:#x} {:?} on pcpu{}", msg.index, msg.op, target);

            self.platform
                .ipi
                .call_on(CpuMask::single(target), &|remote: &dyn Cpu| msg.execute(remote));
        }

        msg
    }

    pub fn write_register(&self, cpu: &dyn Cpu, index: u32, value: u64, target: CpuId) {
        self.call_register(cpu, RemoteRegisterMessage::write(index, value), target);
    }

    pub fn read_register(&self, cpu: &dyn Cpu, index: u32, target: CpuId) -> u64 {
        self.call_register(cpu, RemoteRegisterMessage::read(index), target)
            .into_value()
    }
}
