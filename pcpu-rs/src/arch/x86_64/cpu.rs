use core::arch::asm;
use core::sync::atomic::AtomicU64;

use pcpu_defs::CpuId;
use raw_cpuid::CpuId as CpuIdInstr;
use spin::Once;

use crate::arch::raw::ctrlregs::{self, Cr4};
use crate::arch::raw::msr::{rdmsr, wrmsr, IA32_TSC_AUX};
use crate::kernel::cpu::Cpu;

/// The core executing the call.
pub struct X86Cpu {
    monitor: Once<bool>,
}

pub static CPU: X86Cpu = X86Cpu::new();

impl X86Cpu {
    pub const fn new() -> X86Cpu {
        X86Cpu {
            monitor: Once::new(),
        }
    }
}

pub fn has_x2apic() -> bool {
    CpuIdInstr::new()
        .get_feature_info()
        .map_or(false, |f| f.has_x2apic())
}

impl Cpu for X86Cpu {
    fn id(&self) -> CpuId {
        unsafe { rdmsr(IA32_TSC_AUX) as CpuId }
    }

    fn set_id(&self, id: CpuId) {
        unsafe { wrmsr(IA32_TSC_AUX, id as u64) }
    }

    fn lapic_id(&self) -> u32 {
        let cpuid = CpuIdInstr::new();

        if has_x2apic() {
            if let Some(level) = cpuid
                .get_extended_topology_info()
                .and_then(|mut levels| levels.next())
            {
                return level.x2apic_id();
            }
        }

        cpuid
            .get_feature_info()
            .map_or(0, |f| f.initial_local_apic_id() as u32)
    }

    fn has_monitor(&self) -> bool {
        *self.monitor.call_once(|| {
            CpuIdInstr::new()
                .get_feature_info()
                .map_or(false, |f| f.has_monitor_mwait())
        })
    }

    fn monitor(&self, addr: &AtomicU64) {
        unsafe {
            asm!("monitor", in("rax") addr.as_ptr(), in("ecx") 0, in("edx") 0, options(nostack));
        }
    }

    fn mwait(&self) {
        unsafe {
            asm!("mwait", in("eax") 0, in("ecx") 0, options(nostack));
        }
    }

    fn relax(&self) {
        unsafe {
            asm!("pause", options(nomem, nostack));
        }
    }

    fn read_msr(&self, index: u32) -> u64 {
        unsafe { rdmsr(index) }
    }

    fn write_msr(&self, index: u32, value: u64) {
        unsafe { wrmsr(index, value) }
    }

    fn vmx_off(&self) {
        unsafe {
            let mut cr4 = ctrlregs::cr4();

            if cr4.contains(Cr4::CR4_ENABLE_VMX) {
                asm!("vmxoff", options(nostack));

                cr4.remove(Cr4::CR4_ENABLE_VMX);
                ctrlregs::cr4_write(cr4);
            }
        }
    }

    fn flush_caches(&self) {
        unsafe {
            asm!("wbinvd", options(nostack));
        }
    }

    fn halt(&self) {
        unsafe {
            asm!("cli", "hlt", options(nomem, nostack));
        }
    }
}
