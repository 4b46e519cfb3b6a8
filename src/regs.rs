//! Simulated MMIO register space
//!
//! Every primitive is atomic per call; nothing is atomic across calls.

use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Single-bit helper, `bit(3) == 0x8`
pub const fn bit(n: u32) -> u32 {
    1 << n
}

/// Read-modify-write access to one register window
pub trait RegisterSpace: Send + Sync {
    /// Read the register at `offset`
    fn read(&self, offset: u32) -> u32;

    /// Overwrite the register at `offset`
    fn write(&self, offset: u32, value: u32);

    /// Replace the bits selected by `mask` with the same bits of `value`
    fn mwr(&self, offset: u32, mask: u32, value: u32);

    /// OR `bits` into the register at `offset`
    fn owr(&self, offset: u32, bits: u32);

    /// Clear `bits` in the register at `offset`
    fn awr(&self, offset: u32, bits: u32) {
        self.mwr(offset, bits, 0);
    }
}

/// Sparse register file; unwritten registers read as zero
#[derive(Debug, Default)]
pub struct RegisterFile {
    regs: Mutex<BTreeMap<u32, u32>>,
}

impl RegisterFile {
    /// Empty register file
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every register written so far, in offset order
    pub fn snapshot(&self) -> Vec<(u32, u32)> {
        self.regs.lock().iter().map(|(&k, &v)| (k, v)).collect()
    }

    /// Forget every register value
    pub fn clear(&self) {
        self.regs.lock().clear();
    }
}

impl RegisterSpace for RegisterFile {
    fn read(&self, offset: u32) -> u32 {
        self.regs.lock().get(&offset).copied().unwrap_or(0)
    }

    fn write(&self, offset: u32, value: u32) {
        self.regs.lock().insert(offset, value);
    }

    fn mwr(&self, offset: u32, mask: u32, value: u32) {
        let mut regs = self.regs.lock();
        let reg = regs.entry(offset).or_insert(0);
        *reg = (*reg & !mask) | (value & mask);
    }

    fn owr(&self, offset: u32, bits: u32) {
        let mut regs = self.regs.lock();
        *regs.entry(offset).or_insert(0) |= bits;
    }
}

/// Register windows indexed by hardware instance id
#[derive(Debug)]
pub struct RegisterBank {
    instances: Vec<RegisterFile>,
}

impl RegisterBank {
    /// Bank with `count` independent instances
    pub fn new(count: usize) -> Self {
        Self {
            instances: (0..count).map(|_| RegisterFile::new()).collect(),
        }
    }

    /// Register window for instance `idx`, if it exists
    pub fn instance(&self, idx: usize) -> Option<&RegisterFile> {
        self.instances.get(idx)
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// True when the bank has no instances
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
