use core::arch::asm;

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Cr4: usize {
        const CR4_ENABLE_SMX = 1 << 14;
        const CR4_ENABLE_VMX = 1 << 13;
        const CR4_ENABLE_SSE = 1 << 9;
        const CR4_ENABLE_GLOBAL_PAGES = 1 << 7;
        const CR4_ENABLE_PAE = 1 << 5;
    }
}

/// Read cr4
pub unsafe fn cr4() -> Cr4 {
    let ret: usize;
    asm!("mov {ret}, cr4", ret = lateout(reg) ret);
    Cr4::from_bits_retain(ret)
}

/// Write cr4.
pub unsafe fn cr4_write(val: Cr4) {
    asm!("mov cr4, {0}", in(reg) val.bits());
}
