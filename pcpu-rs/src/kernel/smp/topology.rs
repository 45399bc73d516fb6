use core::sync::atomic::Ordering;

use pcpu_defs::{CpuId, SmpError, SmpResult, BSP_CPU_ID, MAX_PCPU_NUM};

use crate::kernel::smp::Smp;
use crate::kernel::utils::CpuMask;

impl Smp {
    /// Record the cores reported by the platform, in logical id order.
    pub fn init_topology(&self, lapic_ids: &[u32]) -> SmpResult<()> {
        let count = lapic_ids.len();

        if count == 0 {
            return Err(SmpError::NoCpus);
        }

        if count > MAX_PCPU_NUM {
            return Err(SmpError::CapacityExceeded {
                found: count,
                max: MAX_PCPU_NUM,
            });
        }

        for (id, lapic) in lapic_ids.iter().enumerate() {
            self.lapic_ids
                .cpu(id as CpuId)
                .store(*lapic, Ordering::Release);
        }

        self.registry.set_pcpu_nums(count as u16);

        dbgln!(smp, "topology: {} cpus", count);

        Ok(())
    }

    pub fn lapic_id(&self, cpu: CpuId) -> Option<u32> {
        if cpu >= self.registry.pcpu_nums() {
            return None;
        }

        Some(self.lapic_ids.cpu(cpu).load(Ordering::Acquire))
    }

    pub fn pcpu_id_from_lapic_id(&self, lapic_id: u32) -> Option<CpuId> {
        (0..self.registry.pcpu_nums()).find(|id| self.lapic_id(*id) == Some(lapic_id))
    }

    /// Every core in the topology except the BSP.
    pub fn ap_mask(&self) -> CpuMask {
        let mut mask = CpuMask::first(self.registry.pcpu_nums() as usize);
        mask.clear(BSP_CPU_ID);
        mask
    }
}
