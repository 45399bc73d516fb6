use crate::kernel::cpu::Cpu;
use crate::kernel::smp::Smp;

#[derive(Copy, Clone, Debug, Default)]
pub struct ExceptionContext {
    pub vector: u64,
    pub error_code: u64,
    pub rip: u64,
    pub rsp: u64,
    pub rflags: u64,
}

fn dump_exception(ctx: &ExceptionContext, cpu: pcpu_defs::CpuId) {
    logln!(
        "[ FATAL ] Exception {} (error {:#x}) on pcpu{}",
        ctx.vector,
        ctx.error_code,
        cpu
    );
    logln!(
        "          rip: {:#018x} rsp: {:#018x} rflags: {:#x}",
        ctx.rip,
        ctx.rsp,
        ctx.rflags
    );
}

/// Unrecoverable exception on the calling core: report it and retire the
/// core.
pub fn dispatch_exception(smp: &Smp, cpu: &dyn Cpu, ctx: &ExceptionContext) {
    dump_exception(ctx, cpu.id());

    smp.retire_self(cpu);
}
