//! ISP block configuration handlers
//!
//! Each handler copies one fixed-size property structure from user memory
//! and turns it into register writes on the instance selected by the
//! command index. Handlers keep no state between calls.

pub mod contrast;
pub mod pdaf;

pub use contrast::{cfg_contrast, ContrastInfo};
pub use pdaf::{cfg_pdaf, PdafInfo, PdafProperty, PpiInfo, RoiInfo, Vc2Control};

use bytes::{Buf, Bytes};
use log::error;

use crate::error::{GspError, GspResult};
use crate::regs::{RegisterBank, RegisterFile};
use crate::user::{copy_struct, UserMemory};

/// Hardware instance bits of a command index
pub const ISP_ID_MASK: u32 = 0xF;

/// Number of ISP/DCAM instances on the SoC
pub const ISP_INSTANCE_NUM: usize = 2;

/// One property request from user space
#[derive(Clone, Copy)]
pub struct IspIoParam<'a> {
    /// Property id, interpreted per block
    pub property: u32,
    /// Property structure; `None` models a null pointer
    pub property_param: Option<&'a dyn UserMemory>,
}

impl<'a> IspIoParam<'a> {
    /// Request for `property` reading its structure from `mem`
    pub fn new(property: u32, mem: &'a dyn UserMemory) -> Self {
        Self { property, property_param: Some(mem) }
    }
}

impl std::fmt::Debug for IspIoParam<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IspIoParam")
            .field("property", &self.property)
            .field("property_param", &self.property_param.map(|m| m.len()))
            .finish()
    }
}

/// Hardware instance encoded in a command index
pub fn isp_get_isp_id(com_idx: u32) -> usize {
    (com_idx & ISP_ID_MASK) as usize
}

/// Register bank sized for every ISP instance
pub fn isp_register_bank() -> RegisterBank {
    RegisterBank::new(ISP_INSTANCE_NUM)
}

pub(crate) fn instance(bank: &RegisterBank, idx: usize) -> GspResult<&RegisterFile> {
    bank.instance(idx).ok_or_else(|| {
        error!("no register instance {}", idx);
        GspError::InvalidArgument(format!("isp instance {} of {}", idx, bank.len()))
    })
}

/// Copy `len` bytes of the property structure
pub(crate) fn copy_param(param: &IspIoParam<'_>, len: usize) -> GspResult<Bytes> {
    let mem = param.property_param.ok_or_else(|| {
        error!("fail to get property_param");
        GspError::InvalidArgument("null property_param".to_string())
    })?;
    let buf = copy_struct(mem, len).map_err(|e| {
        error!("fail to copy from user: {}", e);
        e
    })?;
    Ok(Bytes::from(buf))
}

/// Read `N` little-endian words
pub(crate) fn get_words<const N: usize>(buf: &mut Bytes) -> [u32; N] {
    let mut out = [0u32; N];
    for word in out.iter_mut() {
        *word = buf.get_u32_le();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isp_id_uses_low_nibble() {
        assert_eq!(isp_get_isp_id(0x31), 1);
        assert_eq!(isp_get_isp_id(0x10), 0);
    }

    #[test]
    fn test_missing_instance() {
        let bank = isp_register_bank();
        assert!(instance(&bank, 1).is_ok());
        assert!(matches!(instance(&bank, 2), Err(GspError::InvalidArgument(_))));
    }
}
