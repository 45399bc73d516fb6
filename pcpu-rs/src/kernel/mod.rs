#[macro_use]
pub mod output;
pub mod cpu;
pub mod exception;
pub mod ipi;
pub mod params;
pub mod smp;
pub mod timer;
pub mod utils;
