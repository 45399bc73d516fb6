use core::arch::x86_64::_rdtsc;
use core::sync::atomic::{AtomicU64, Ordering};

use raw_cpuid::CpuId;

use crate::kernel::timer::Clock;

/// Used when neither CPUID nor `tsc_khz=` tell us the frequency.
const FALLBACK_TSC_KHZ: u64 = 1_000_000;

pub struct TscClock {
    khz: AtomicU64,
}

pub static TSC: TscClock = TscClock {
    khz: AtomicU64::new(FALLBACK_TSC_KHZ),
};

fn cpuid_tsc_khz() -> Option<u64> {
    let cpuid = CpuId::new();

    if let Some(hz) = cpuid.get_tsc_info().and_then(|t| t.tsc_frequency()) {
        return Some(hz / 1000);
    }

    cpuid
        .get_processor_frequency_info()
        .map(|f| f.processor_base_frequency() as u64 * 1000)
        .filter(|khz| *khz > 0)
}

/// Calibrate from the `tsc_khz` parameter or CPUID.
pub fn init() {
    let khz = crate::kernel::params::params()
        .and_then(|p| p.get_u64("tsc_khz"))
        .filter(|khz| *khz > 0)
        .or_else(cpuid_tsc_khz);

    match khz {
        Some(khz) => {
            TSC.khz.store(khz, Ordering::Relaxed);
            dbgln!(smp, "tsc: {} kHz", khz);
        }
        None => {
            logln!(
                "[ WARN ] tsc frequency unknown, assuming {} kHz",
                FALLBACK_TSC_KHZ
            );
        }
    }
}

impl Clock for TscClock {
    fn cycles(&self) -> u64 {
        unsafe { _rdtsc() }
    }

    fn us_to_cycles(&self, us: u64) -> u64 {
        us.saturating_mul(self.khz.load(Ordering::Relaxed)) / 1000
    }
}
