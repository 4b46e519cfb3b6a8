//! Contrast block

use log::{debug, error};

use crate::error::{GspError, GspResult};
use crate::regs::{bit, RegisterBank, RegisterSpace};

use super::{copy_param, get_words, instance, IspIoParam};

/// Property id: full contrast block
pub const ISP_PRO_CONTRAST_BLOCK: u32 = 0;

/// Contrast parameter register of channel 0
pub const ISP_CONTRAST_PARAM: u32 = 0x3110;
/// Distance from a channel 0 register to its channel 1 twin
pub const ISP_CH1_ADDR_OFFSET: u32 = 0x8000;

const FACTOR_MASK: u32 = 0x1FE;

/// User structure of the contrast block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContrastInfo {
    /// Skip the block
    pub bypass: u32,
    /// 8-bit contrast factor
    pub factor: u32,
}

impl ContrastInfo {
    /// Encoded size
    pub const SIZE: usize = 8;

    /// Encode for tests and tools
    pub fn to_bytes(&self) -> Vec<u8> {
        [self.bypass, self.factor].iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}

fn contrast_block(param: &IspIoParam<'_>, bank: &RegisterBank, idx: usize) -> GspResult<()> {
    let mut buf = copy_param(param, ContrastInfo::SIZE)?;
    let [bypass, factor] = get_words::<2>(&mut buf);
    let info = ContrastInfo { bypass, factor };
    let regs = instance(bank, idx)?;

    for reg in [ISP_CONTRAST_PARAM, ISP_CONTRAST_PARAM + ISP_CH1_ADDR_OFFSET] {
        regs.mwr(reg, bit(0), info.bypass);
    }
    if info.bypass != 0 {
        debug!("isp[{}] contrast bypassed", idx);
        return Ok(());
    }
    for reg in [ISP_CONTRAST_PARAM, ISP_CONTRAST_PARAM + ISP_CH1_ADDR_OFFSET] {
        regs.mwr(reg, FACTOR_MASK, info.factor << 1);
    }
    Ok(())
}

/// Apply one contrast property to instance `idx`
pub fn cfg_contrast(param: &IspIoParam<'_>, bank: &RegisterBank, idx: usize) -> GspResult<()> {
    if param.property_param.is_none() {
        error!("cfg contrast: property_param is null");
        return Err(GspError::InvalidArgument("null property_param".to_string()));
    }
    match param.property {
        ISP_PRO_CONTRAST_BLOCK => contrast_block(param, bank, idx),
        other => {
            error!("contrast: id {} not supported", other);
            Ok(())
        }
    }
}
