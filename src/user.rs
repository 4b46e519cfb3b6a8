//! User memory seam
//!
//! Ioctl arguments and ISP property payloads arrive as "user pointers".
//! [`UserMemory`] models the copy-in/copy-out primitives, including the
//! possibility that a copy faults.

use crate::error::{GspError, GspResult};
use std::ops::Range;

/// Copy primitives over a caller-owned memory region
#[cfg_attr(test, mockall::automock)]
pub trait UserMemory: Send + Sync {
    /// Size of the region in bytes
    fn len(&self) -> usize;

    /// Whether the region holds no bytes
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`
    fn copy_from_user(&self, offset: usize, dst: &mut [u8]) -> GspResult<()>;

    /// Copy `src` into the region starting at `offset`
    fn copy_to_user(&mut self, offset: usize, src: &[u8]) -> GspResult<()>;
}

/// Heap-backed user region with an optional faulting window
#[derive(Debug, Clone, Default)]
pub struct UserBuffer {
    data: Vec<u8>,
    fault: Option<Range<usize>>,
}

impl UserBuffer {
    /// Zero-filled region of `len` bytes
    pub fn zeroed(len: usize) -> Self {
        Self { data: vec![0u8; len], fault: None }
    }

    /// Region holding a copy of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self { data: bytes.to_vec(), fault: None }
    }

    /// Mark `range` as unmapped; any copy touching it faults
    pub fn with_fault(mut self, range: Range<usize>) -> Self {
        self.fault = Some(range);
        self
    }

    /// Current contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn check(&self, offset: usize, len: usize) -> GspResult<Range<usize>> {
        let end = offset
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                GspError::Fault(format!(
                    "access {}+{} beyond region of {} bytes",
                    offset,
                    len,
                    self.data.len()
                ))
            })?;
        if let Some(fault) = &self.fault {
            if offset < fault.end && fault.start < end {
                return Err(GspError::Fault(format!(
                    "access {}..{} hits unmapped {}..{}",
                    offset, end, fault.start, fault.end
                )));
            }
        }
        Ok(offset..end)
    }
}

impl UserMemory for UserBuffer {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn copy_from_user(&self, offset: usize, dst: &mut [u8]) -> GspResult<()> {
        let range = self.check(offset, dst.len())?;
        dst.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn copy_to_user(&mut self, offset: usize, src: &[u8]) -> GspResult<()> {
        let range = self.check(offset, src.len())?;
        self.data[range].copy_from_slice(src);
        Ok(())
    }
}

/// Copy exactly `len` bytes from the start of `mem`
pub fn copy_struct(mem: &dyn UserMemory, len: usize) -> GspResult<Vec<u8>> {
    let mut buf = vec![0u8; len];
    mem.copy_from_user(0, &mut buf)?;
    Ok(buf)
}
