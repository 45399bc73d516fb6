#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
pub mod kernel;
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod arch;

pub use kernel::smp::{smp, try_smp, Platform, Smp, SmpConfig};
pub use pcpu_defs::{BootState, CpuId, SmpError, SmpResult, BSP_CPU_ID, MAX_PCPU_NUM};
