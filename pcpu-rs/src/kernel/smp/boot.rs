use pcpu_defs::{CpuId, SmpError, SmpResult, BSP_CPU_ID};

use crate::kernel::cpu::Cpu;
use crate::kernel::smp::Smp;

impl Smp {
    /// Bootstrap core path: discover topology, register the BSP and start
    /// every AP.
    pub fn boot_primary(&self, cpu: &dyn Cpu, lapic_ids: &[u32]) -> SmpResult<()> {
        self.init_topology(lapic_ids)?;

        self.init_pcpu_state(cpu, BSP_CPU_ID)?;

        println!("[ OK ] Core {} is up", BSP_CPU_ID);

        let aps = self.ap_mask();

        if !self.start_cores(cpu, aps) {
            let missing = aps & !self.registry.active_mask();

            return Err(SmpError::SecondaryStartFailed(missing.bits()));
        }

        println!("[ OK ] SMP Initialized (CPU count: {})", self.pcpu_nums());

        Ok(())
    }

    /// Secondary core path, run on the AP right after it leaves the
    /// trampoline.
    ///
    /// A core that arrives after the startup deadline finds itself dead and
    /// halts here.
    pub fn boot_secondary(&self, cpu: &dyn Cpu) -> SmpResult<CpuId> {
        let lapic = cpu.lapic_id();

        let id = self
            .pcpu_id_from_lapic_id(lapic)
            .ok_or(SmpError::InvalidLapicId(lapic))?;

        match self.init_pcpu_state(cpu, id) {
            Ok(()) => {}
            Err(SmpError::AlreadyDead(id)) => {
                logln!("[ FATAL ] CPU{} came up after the startup deadline", id);
                self.halt_forever(cpu);
            }
            Err(e) => return Err(e),
        }

        println!("[ OK ] Core {} is up", id);

        self.wait_for_all_running(cpu);

        Ok(id)
    }
}
