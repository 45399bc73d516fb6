#![no_std]

use core::fmt;

pub type CpuId = u16;

/// Width of the active bitmap. Topology discovery may report more cores than
/// this, in which case bring-up is refused.
pub const MAX_PCPU_NUM: usize = 64;

const _: () = assert!(MAX_PCPU_NUM <= u64::BITS as usize);

pub const BSP_CPU_ID: CpuId = 0;

pub const INVALID_CPU_ID: CpuId = 0xffff;

pub const IA32_TSC_AUX: u32 = 0xc000_0103;

pub const VECTOR_FIXED_START: u8 = 0xe0;
pub const TIMER_VECTOR: u8 = VECTOR_FIXED_START;
pub const NOTIFY_VCPU_VECTOR: u8 = VECTOR_FIXED_START + 1;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum BootState {
    NotStarted = 0,
    Initializing = 1,
    Running = 2,
    Dead = 3,
}

impl BootState {
    pub fn from_raw(v: u8) -> BootState {
        match v {
            0 => BootState::NotStarted,
            1 => BootState::Initializing,
            2 => BootState::Running,
            _ => BootState::Dead,
        }
    }

    pub fn is_dead(&self) -> bool {
        *self == BootState::Dead
    }
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct PcpuFlags: u64 {
        const NEED_OFFLINE = 1 << 0;
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SmpError {
    NoCpus,
    CapacityExceeded { found: usize, max: usize },
    InvalidLapicId(u32),
    AlreadyDead(CpuId),
    /// Bits of the cores that did not come up.
    SecondaryStartFailed(u64),
}

impl fmt::Display for SmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmpError::NoCpus => write!(f, "no cpus reported by topology"),
            SmpError::CapacityExceeded { found, max } => {
                write!(f, "{} cpus found, at most {} supported", found, max)
            }
            SmpError::InvalidLapicId(id) => write!(f, "lapic id {:#x} not in topology", id),
            SmpError::AlreadyDead(id) => write!(f, "pcpu{} already marked dead", id),
            SmpError::SecondaryStartFailed(missing) => {
                write!(f, "secondary cpus {:#x} failed to start", missing)
            }
        }
    }
}

pub type SmpResult<T> = Result<T, SmpError>;
