pub mod ctrlregs;
pub mod msr;
