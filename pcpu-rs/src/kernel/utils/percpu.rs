use pcpu_defs::{CpuId, MAX_PCPU_NUM};

/// One slot per possible core, indexed by logical id.
pub struct PerCpu<T> {
    data: [T; MAX_PCPU_NUM],
}

impl<T> PerCpu<T> {
    pub fn new_fn(init: fn() -> T) -> PerCpu<T> {
        PerCpu {
            data: core::array::from_fn(|_| init()),
        }
    }

    pub fn cpu(&self, cpu: CpuId) -> &T {
        &self.data[cpu as usize]
    }
}
