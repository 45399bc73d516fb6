use pcpu_defs::CpuId;

use crate::kernel::cpu::Cpu;
use crate::kernel::smp::Smp;
use crate::kernel::timer::Deadline;
use crate::kernel::utils::{CpuMask, StopWatch};

impl Smp {
    /// Start every core in `mask` except the caller.
    ///
    /// Cores are signalled one at a time in ascending id order. Each signalled
    /// core boots while the next one is being signalled, and all of them hold
    /// on the gate until every signal has gone out. A core that does not set
    /// its active bit within the startup deadline is marked dead.
    ///
    /// Returns true if every core in `mask` is active afterwards.
    pub fn start_cores(&self, cpu: &dyn Cpu, mask: CpuMask) -> bool {
        let _sw = StopWatch::new("start_cores", self.platform.clock);
        let this = cpu.id();

        // followers spin on the gate until it opens again
        self.gate.hold();

        for id in mask.iter() {
            if id == this {
                continue;
            }

            self.start_core(id);
        }

        self.gate.release();

        self.registry.active_mask().contains_all(mask)
    }

    fn start_core(&self, id: CpuId) {
        let entry = *self
            .startup_paddr
            .call_once(|| self.platform.trampoline.prepare());

        self.platform.trampoline.write_stack(id);

        dbgln!(smp, "starting pcpu{} at {:#x}", id, entry);

        self.platform.ipi.send_startup(id, entry);

        let deadline = Deadline::after_us(self.platform.clock, self.config.up_timeout_us);

        if deadline.wait_until(self.config.poll_us, || self.registry.is_active(id)) {
            dbgln!(smp, "pcpu{} up after {} us", id, deadline.elapsed_us());
        } else if self.registry.force_dead(id) {
            logln!("[ FATAL ] Secondary CPU{} failed to come up", id);
        } else {
            // committed just past the deadline, its active bit is next
            while !self.registry.is_active(id) && !self.registry.boot_state(id).is_dead() {
                core::hint::spin_loop();
            }

            dbgln!(smp, "pcpu{} committed after the deadline", id);
        }
    }

    /// Hold the calling follower until the leader has signalled every core.
    pub fn wait_for_all_running(&self, cpu: &dyn Cpu) {
        self.gate.wait(cpu);
    }
}
