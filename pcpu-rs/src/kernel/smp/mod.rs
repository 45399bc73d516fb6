//! Physical core lifecycle: bring-up, boot state tracking, retirement and
//! remote register access.

use core::sync::atomic::AtomicU32;

use pcpu_defs::{BootState, CpuId, SmpError, SmpResult};
use spin::Once;

use crate::kernel::cpu::Cpu;
use crate::kernel::ipi::IpiController;
use crate::kernel::params::Params;
use crate::kernel::timer::Clock;
use crate::kernel::utils::{CpuMask, PerCpu};

pub use self::gate::SyncGate;
pub use self::registry::PcpuRegistry;
pub use self::remote::{RegisterOp, RemoteRegisterMessage};

mod boot;
pub mod gate;
pub mod registry;
pub mod remote;
mod shutdown;
mod startup;
mod topology;

#[cfg(test)]
pub mod testing;

pub const CPU_UP_TIMEOUT_MS: u64 = 100;
pub const CPU_DOWN_TIMEOUT_MS: u64 = 100;
pub const CPU_POLL_US: u64 = 10;

/// Provider of the shared AP entry code.
pub trait Trampoline: Sync {
    /// Install the trampoline and return its physical address.
    fn prepare(&self) -> u64;

    /// Point the trampoline's stack slot at `cpu`'s boot stack.
    fn write_stack(&self, cpu: CpuId);
}

pub trait SchedHook: Sync {
    /// Called once on a core that is being retired.
    fn deinit(&self, cpu: CpuId);
}

/// Collaborators the layer is wired to.
#[derive(Copy, Clone)]
pub struct Platform {
    pub ipi: &'static dyn IpiController,
    pub trampoline: &'static dyn Trampoline,
    pub sched: &'static dyn SchedHook,
    pub clock: &'static dyn Clock,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SmpConfig {
    pub up_timeout_us: u64,
    pub down_timeout_us: u64,
    pub poll_us: u64,
}

impl Default for SmpConfig {
    fn default() -> SmpConfig {
        SmpConfig {
            up_timeout_us: CPU_UP_TIMEOUT_MS * 1000,
            down_timeout_us: CPU_DOWN_TIMEOUT_MS * 1000,
            poll_us: CPU_POLL_US,
        }
    }
}

impl SmpConfig {
    /// Defaults overridden by `smp.up_timeout_ms`, `smp.down_timeout_ms` and
    /// `smp.poll_us`.
    pub fn from_params(params: &Params) -> SmpConfig {
        let mut cfg = SmpConfig::default();

        if let Some(us) = ms_param(params, "smp.up_timeout_ms") {
            cfg.up_timeout_us = us;
        }
        if let Some(us) = ms_param(params, "smp.down_timeout_ms") {
            cfg.down_timeout_us = us;
        }
        if let Some(us) = params.get_u64("smp.poll_us").filter(|us| *us > 0) {
            cfg.poll_us = us;
        }

        cfg
    }
}

/// Millisecond parameter converted to microseconds.
fn ms_param(params: &Params, key: &str) -> Option<u64> {
    let ms = params.get_u64(key)?;

    match ms.checked_mul(1000) {
        Some(us) => Some(us),
        None => {
            logln!("[ WARN ] ignoring kernel param {}={}: out of range", key, ms);
            None
        }
    }
}

pub struct Smp {
    registry: PcpuRegistry,
    gate: SyncGate,
    lapic_ids: PerCpu<AtomicU32>,
    startup_paddr: Once<u64>,
    platform: Platform,
    config: SmpConfig,
}

impl Smp {
    pub fn new(platform: Platform, config: SmpConfig) -> Smp {
        Smp {
            registry: PcpuRegistry::new(),
            gate: SyncGate::new(),
            lapic_ids: PerCpu::new_fn(|| AtomicU32::new(u32::MAX)),
            startup_paddr: Once::new(),
            platform,
            config,
        }
    }

    pub fn registry(&self) -> &PcpuRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SmpConfig {
        &self.config
    }

    pub fn pcpu_nums(&self) -> u16 {
        self.registry.pcpu_nums()
    }

    pub fn is_active(&self, cpu: CpuId) -> bool {
        self.registry.is_active(cpu)
    }

    pub fn active_mask(&self) -> CpuMask {
        self.registry.active_mask()
    }

    pub fn boot_state(&self, cpu: CpuId) -> BootState {
        self.registry.boot_state(cpu)
    }

    /// Bring the calling core into the registry: enter `Initializing`,
    /// record its id in the fast-lookup register, commit to `Running` and set
    /// its active bit.
    ///
    /// Fails with `AlreadyDead` if the startup sequencer gave up on the core
    /// at any point before the commit.
    pub fn init_pcpu_state(&self, cpu: &dyn Cpu, id: CpuId) -> SmpResult<()> {
        if let Err(state) = self.registry.enter_initializing(id) {
            dbgln!(smp, "pcpu{} cannot initialize from {:?}", id, state);

            if state.is_dead() {
                return Err(SmpError::AlreadyDead(id));
            }
        }

        cpu.set_id(id);

        if let Err(state) = self.registry.commit_running(id) {
            if state.is_dead() {
                dbgln!(smp, "pcpu{} given up on during init", id);
                return Err(SmpError::AlreadyDead(id));
            }
        }

        self.registry.mark_active(id);

        Ok(())
    }

    /// Park the calling core for good.
    pub(crate) fn halt_forever(&self, cpu: &dyn Cpu) -> ! {
        loop {
            cpu.halt();
        }
    }
}

static SMP: Once<Smp> = Once::new();

pub fn init(platform: Platform, config: SmpConfig) -> &'static Smp {
    SMP.call_once(|| Smp::new(platform, config))
}

pub fn try_smp() -> Option<&'static Smp> {
    SMP.get()
}

pub fn smp() -> &'static Smp {
    match SMP.get() {
        Some(smp) => smp,
        None => panic!("smp used before init"),
    }
}
