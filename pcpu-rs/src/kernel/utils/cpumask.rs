use core::ops::{BitAnd, Not};

use bit_field::BitField;
use pcpu_defs::{CpuId, MAX_PCPU_NUM};

/// Set of logical cores, bit `i` is core `i`.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct CpuMask(u64);

impl CpuMask {
    pub const fn empty() -> CpuMask {
        CpuMask(0)
    }

    pub const fn from_bits(bits: u64) -> CpuMask {
        CpuMask(bits)
    }

    pub fn single(cpu: CpuId) -> CpuMask {
        let mut m = CpuMask::empty();
        m.set(cpu);
        m
    }

    /// Cores `0..count`.
    pub fn first(count: usize) -> CpuMask {
        if count >= MAX_PCPU_NUM {
            CpuMask(u64::MAX)
        } else {
            CpuMask((1u64 << count) - 1)
        }
    }

    pub const fn bits(&self) -> u64 {
        self.0
    }

    pub fn set(&mut self, cpu: CpuId) {
        self.0.set_bit(cpu as usize, true);
    }

    pub fn clear(&mut self, cpu: CpuId) {
        self.0.set_bit(cpu as usize, false);
    }

    pub fn contains(&self, cpu: CpuId) -> bool {
        (cpu as usize) < MAX_PCPU_NUM && self.0.get_bit(cpu as usize)
    }

    pub fn contains_all(&self, other: CpuMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn count(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Lowest id first.
    pub fn iter(&self) -> CpuMaskIter {
        CpuMaskIter(self.0)
    }
}

pub struct CpuMaskIter(u64);

impl Iterator for CpuMaskIter {
    type Item = CpuId;

    fn next(&mut self) -> Option<CpuId> {
        if self.0 == 0 {
            return None;
        }

        let id = self.0.trailing_zeros();
        self.0.set_bit(id as usize, false);

        Some(id as CpuId)
    }
}

impl BitAnd for CpuMask {
    type Output = CpuMask;

    fn bitand(self, rhs: CpuMask) -> CpuMask {
        CpuMask(self.0 & rhs.0)
    }
}

impl Not for CpuMask {
    type Output = CpuMask;

    fn not(self) -> CpuMask {
        CpuMask(!self.0)
    }
}

impl core::fmt::Debug for CpuMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "CpuMask({:#b})", self.0)
    }
}
