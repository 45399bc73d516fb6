use pcpu_defs::{BootState, CpuId, PcpuFlags};

use crate::kernel::cpu::Cpu;
use crate::kernel::ipi::IpiKind;
use crate::kernel::smp::Smp;
use crate::kernel::timer::Deadline;
use crate::kernel::utils::CpuMask;

impl Smp {
    /// Ask `target` to retire. A remote target is kicked with an IPI in case
    /// it is idle.
    pub fn request_offline(&self, cpu: &dyn Cpu, target: CpuId) {
        self.registry.set_flag(target, PcpuFlags::NEED_OFFLINE);

        if cpu.id() != target {
            self.platform.ipi.send_ipi(target, IpiKind::NotifyVcpu);
        }
    }

    /// Consume a pending offline request for `cpu`. Each request is observed
    /// once.
    pub fn consume_offline_request(&self, cpu: CpuId) -> bool {
        self.registry
            .test_and_clear_flag(cpu, PcpuFlags::NEED_OFFLINE)
    }

    /// Retire every core except the caller and wait for them to go down.
    pub fn stop_all_others(&self, cpu: &dyn Cpu) -> bool {
        let this = cpu.id();
        let mut mask = CpuMask::empty();

        for id in 0..self.registry.pcpu_nums() {
            if id == this {
                continue;
            }

            mask.set(id);
            self.request_offline(cpu, id);
        }

        // A running target takes the IPI and retires, a target that faulted
        // retires from the exception path, so this should not time out.
        self.await_offline(mask)
    }

    /// Wait for every core in `mask` to clear its active bit. Gives up
    /// silently after the shutdown deadline; returns whether they all did.
    pub fn await_offline(&self, mask: CpuMask) -> bool {
        let deadline = Deadline::after_us(self.platform.clock, self.config.down_timeout_us);

        let done = deadline.wait_until(self.config.poll_us, || {
            (self.registry.active_mask() & mask).is_empty()
        });

        if !done {
            dbgln!(
                smp,
                "cpus {:?} still active after {} us",
                self.registry.active_mask() & mask,
                deadline.elapsed_us()
            );
        }

        done
    }

    /// Take the calling core down. Does not return unless the core had
    /// already retired.
    pub fn retire_self(&self, cpu: &dyn Cpu) {
        let id = cpu.id();

        self.platform.sched.deinit(id);

        if self.registry.is_active(id) {
            cpu.vmx_off();
            cpu.flush_caches();

            self.registry.set_boot_state(id, BootState::Dead);
            self.registry.clear_active(id);

            self.halt_forever(cpu);
        } else {
            logln!("[ ERROR ] pcpu{} already dead", id);
        }
    }
}
