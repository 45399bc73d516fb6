//! Process-wide table of core boot state.
//!
//! Bit `i` of the active mask and slot `i` of the boot-state table are written
//! only by core `i`. The one exception is [`PcpuRegistry::force_dead`], used by
//! the startup sequencer on a core that missed its deadline. The core's
//! `commit_running` and the leader's `force_dead` race on the same byte, so
//! exactly one of them wins.

use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use pcpu_defs::{BootState, CpuId, PcpuFlags, MAX_PCPU_NUM};
use spin::Once;

use crate::kernel::utils::{CpuMask, PerCpu};

pub struct PcpuRegistry {
    pcpu_nums: Once<u16>,
    active: AtomicU64,
    boot_state: PerCpu<AtomicU8>,
    flags: PerCpu<AtomicU64>,
}

impl PcpuRegistry {
    pub fn new() -> PcpuRegistry {
        PcpuRegistry {
            pcpu_nums: Once::new(),
            active: AtomicU64::new(0),
            boot_state: PerCpu::new_fn(|| AtomicU8::new(BootState::NotStarted as u8)),
            flags: PerCpu::new_fn(|| AtomicU64::new(0)),
        }
    }

    /// Record the topology size. Only the first call has an effect.
    ///
    /// Callers must ensure `num <= MAX_PCPU_NUM`.
    pub fn set_pcpu_nums(&self, num: u16) {
        debug_assert!(num as usize <= MAX_PCPU_NUM);

        self.pcpu_nums.call_once(|| num);
    }

    pub fn pcpu_nums(&self) -> u16 {
        self.pcpu_nums.get().copied().unwrap_or(0)
    }

    pub fn mark_active(&self, cpu: CpuId) {
        self.active
            .fetch_or(CpuMask::single(cpu).bits(), Ordering::AcqRel);
    }

    pub fn clear_active(&self, cpu: CpuId) {
        self.active
            .fetch_and(!CpuMask::single(cpu).bits(), Ordering::AcqRel);
    }

    pub fn is_active(&self, cpu: CpuId) -> bool {
        self.active_mask().contains(cpu)
    }

    pub fn active_mask(&self) -> CpuMask {
        CpuMask::from_bits(self.active.load(Ordering::Acquire))
    }

    pub fn set_boot_state(&self, cpu: CpuId, state: BootState) {
        self.boot_state.cpu(cpu).store(state as u8, Ordering::Release);
    }

    pub fn boot_state(&self, cpu: CpuId) -> BootState {
        BootState::from_raw(self.boot_state.cpu(cpu).load(Ordering::Acquire))
    }

    /// Move `cpu` from `NotStarted` to `Initializing`. On failure returns the
    /// state the core was found in.
    pub fn enter_initializing(&self, cpu: CpuId) -> Result<(), BootState> {
        self.boot_state
            .cpu(cpu)
            .compare_exchange(
                BootState::NotStarted as u8,
                BootState::Initializing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(BootState::from_raw)
    }

    /// Move `cpu` from `Initializing` to `Running`. Must happen before the
    /// core sets its active bit. On failure returns the state the core was
    /// found in.
    pub fn commit_running(&self, cpu: CpuId) -> Result<(), BootState> {
        self.boot_state
            .cpu(cpu)
            .compare_exchange(
                BootState::Initializing as u8,
                BootState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(BootState::from_raw)
    }

    /// Declare a core that did not come up dead. Fails, returning false, if
    /// the core already committed to `Running`.
    pub fn force_dead(&self, cpu: CpuId) -> bool {
        self.boot_state
            .cpu(cpu)
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                match BootState::from_raw(state) {
                    BootState::Running => None,
                    _ => Some(BootState::Dead as u8),
                }
            })
            .is_ok()
    }

    pub fn set_flag(&self, cpu: CpuId, flags: PcpuFlags) {
        self.flags.cpu(cpu).fetch_or(flags.bits(), Ordering::AcqRel);
    }

    /// Clear `flags` on `cpu`, returning whether any of them were set.
    pub fn test_and_clear_flag(&self, cpu: CpuId, flags: PcpuFlags) -> bool {
        let old = self.flags.cpu(cpu).fetch_and(!flags.bits(), Ordering::AcqRel);

        PcpuFlags::from_bits_truncate(old).intersects(flags)
    }
}

impl Default for PcpuRegistry {
    fn default() -> PcpuRegistry {
        PcpuRegistry::new()
    }
}
