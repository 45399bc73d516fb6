//! Bare-metal x86_64 implementation of the hardware traits.

pub mod raw;
pub mod cpu;
pub mod tsc;

use crate::kernel::ipi::IpiController;
use crate::kernel::smp::{Platform, SchedHook, Smp, SmpConfig, Trampoline};

pub use self::cpu::CPU;
pub use self::tsc::TSC;

/// Wire the layer to this machine's collaborators. Call once on the BSP
/// after kernel parameters have been parsed.
pub fn init(
    ipi: &'static dyn IpiController,
    trampoline: &'static dyn Trampoline,
    sched: &'static dyn SchedHook,
) -> &'static Smp {
    tsc::init();

    let config = crate::kernel::params::params()
        .map(SmpConfig::from_params)
        .unwrap_or_default();

    crate::kernel::smp::init(
        Platform {
            ipi,
            trampoline,
            sched,
            clock: &TSC,
        },
        config,
    )
}
