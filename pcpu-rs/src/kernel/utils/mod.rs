pub use self::cpumask::CpuMask;
pub use self::percpu::PerCpu;
pub use self::stopwatch::StopWatch;

pub mod cpumask;
pub mod percpu;
pub mod stopwatch;
