//! PDAF (phase-detection autofocus) extraction on the DCAM side
//!
//! Besides the ROI and frame-skip control, the block owns a 256-word
//! pattern table. Every pattern pixel takes two bits: `is_pd` in the low
//! bit and `is_right` above it, packed MSB first, sixteen columns per word.

use bytes::Bytes;
use log::{debug, error, warn};

use crate::error::{GspError, GspResult};
use crate::regs::{bit, RegisterBank, RegisterFile, RegisterSpace};

use super::{copy_param, get_words, instance, isp_get_isp_id, IspIoParam};

/// DCAM global configuration
pub const DCAM_CFG: u32 = 0x0004;
/// DCAM control; holds the shadow force-copy bits
pub const DCAM_CONTROL: u32 = 0x0008;
/// PDAF enable
pub const DCAM_PDAF_CONTROL: u32 = 0x0120;
/// Virtual channel 2 control
pub const DCAM_VH2_CONTROL: u32 = 0x0124;
/// Extraction control; block size lives in bits 1..4
pub const DCAM_PDAF_EXTR_CTRL: u32 = 0x0128;
/// Frame skip, mode and single-shot bits
pub const DCAM_PDAF_SKIP_FRM: u32 = 0x012C;
/// Continuous-mode start
pub const DCAM_PDAF_SKIP_FRM1: u32 = 0x0130;
/// ROI start, `y << 13 | x`
pub const DCAM_PDAF_EXTR_ROI_ST: u32 = 0x0134;
/// ROI size, `h << 13 | w`
pub const DCAM_PDAF_EXTR_ROI_SIZE: u32 = 0x0138;
/// First word of the pattern table
pub const DCAM_PDAF_EXTR_POS: u32 = 0x0400;

/// Force-copy bit of the PDAF shadow registers
pub const PDAF_COPY: u32 = bit(10);
/// Force-copy bit of the VC2 shadow registers
pub const VCH2_COPY: u32 = bit(12);

/// Entries of each pattern pixel array
pub const PDAF_PPI_NUM: usize = 64;
/// Words in the pattern table
pub const PDAF_TABLE_WORDS: usize = 256;

const EXTR_BLOCK_MASK: u32 = 0x1E;
const ROI_FIELD_MASK: u32 = 0x1FFF;

/// PDAF property ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PdafProperty {
    /// Full block configuration
    Block = 0,
    /// Enable unless bypassed
    Bypass = 1,
    /// Single-shot or continuous mode
    SetMode = 2,
    /// Frame skip count
    SetSkipNum = 3,
    /// Extraction window
    SetRoi = 4,
    /// Block size and pattern table
    SetPpiInfo = 5,
    /// Type-1 sensor (VC2 output)
    Type1Block = 6,
    /// Type-2 sensor (VC2 output)
    Type2Block = 7,
}

impl PdafProperty {
    /// Map a raw property id
    pub fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::Block,
            1 => Self::Bypass,
            2 => Self::SetMode,
            3 => Self::SetSkipNum,
            4 => Self::SetRoi,
            5 => Self::SetPpiInfo,
            6 => Self::Type1Block,
            7 => Self::Type2Block,
            _ => return None,
        })
    }
}

/// Block size as enumerations (0..=3 selects 8, 16, 32 or 64)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockSize {
    /// Width enumeration
    pub width: u32,
    /// Height enumeration
    pub height: u32,
}

impl BlockSize {
    fn pixels(code: u32) -> Option<u32> {
        match code {
            0 => Some(8),
            1 => Some(16),
            2 => Some(32),
            3 => Some(64),
            _ => None,
        }
    }

    /// Field value for `DCAM_PDAF_EXTR_CTRL`, or `None` for an unknown code
    pub fn extr_ctrl(&self) -> Option<u32> {
        Self::pixels(self.width)?;
        Self::pixels(self.height)?;
        Some(((self.height & 0x3) << 3) | ((self.width & 0x3) << 1))
    }
}

/// Window in sensor pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    /// Left
    pub x: u32,
    /// Top
    pub y: u32,
    /// Width
    pub w: u32,
    /// Height
    pub h: u32,
}

impl Window {
    const SIZE: usize = 16;

    fn parse(buf: &mut Bytes) -> Self {
        let [x, y, w, h] = get_words::<4>(buf);
        Self { x, y, w, h }
    }

    fn start(&self) -> u32 {
        ((self.y & ROI_FIELD_MASK) << 13) | (self.x & ROI_FIELD_MASK)
    }

    fn size(&self) -> u32 {
        ((self.h & ROI_FIELD_MASK) << 13) | (self.w & ROI_FIELD_MASK)
    }
}

/// Pattern pixel description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpiInfo {
    /// Block size enumerations
    pub block_size: BlockSize,
    /// Number of pattern pixel pairs
    pub pd_pos_size: u32,
    /// Right-shielded flag per pixel
    pub pattern_pixel_is_right: [u32; PDAF_PPI_NUM],
    /// Row inside the block per pixel
    pub pattern_pixel_row: [u32; PDAF_PPI_NUM],
    /// Column inside the block per pixel
    pub pattern_pixel_col: [u32; PDAF_PPI_NUM],
}

impl Default for PpiInfo {
    fn default() -> Self {
        Self {
            block_size: BlockSize::default(),
            pd_pos_size: 0,
            pattern_pixel_is_right: [0; PDAF_PPI_NUM],
            pattern_pixel_row: [0; PDAF_PPI_NUM],
            pattern_pixel_col: [0; PDAF_PPI_NUM],
        }
    }
}

impl PpiInfo {
    /// Encoded size
    pub const SIZE: usize = 12 + 3 * PDAF_PPI_NUM * 4;

    fn parse(buf: &mut Bytes) -> Self {
        let [width, height, pd_pos_size] = get_words::<3>(buf);
        Self {
            block_size: BlockSize { width, height },
            pd_pos_size,
            pattern_pixel_is_right: get_words::<PDAF_PPI_NUM>(buf),
            pattern_pixel_row: get_words::<PDAF_PPI_NUM>(buf),
            pattern_pixel_col: get_words::<PDAF_PPI_NUM>(buf),
        }
    }

    fn put_arrays(&self, out: &mut Vec<u8>) {
        for array in [
            &self.pattern_pixel_is_right,
            &self.pattern_pixel_row,
            &self.pattern_pixel_col,
        ] {
            out.extend(array.iter().flat_map(|w| w.to_le_bytes()));
        }
    }

    /// Encode for tests and tools
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        for w in [self.block_size.width, self.block_size.height, self.pd_pos_size] {
            out.extend_from_slice(&w.to_le_bytes());
        }
        self.put_arrays(&mut out);
        out
    }

    /// Pattern table words, or `None` when the block height is unknown
    pub fn pattern_table(&self) -> Option<[u32; PDAF_TABLE_WORDS]> {
        let block = BlockSize::pixels(self.block_size.height)? as usize;
        let mut table = [0u32; PDAF_TABLE_WORDS];
        let pixels = (self.pd_pos_size as usize).saturating_mul(2).min(PDAF_PPI_NUM);

        for i in 0..pixels {
            let col = self.pattern_pixel_col[i] as usize;
            let row = self.pattern_pixel_row[i] as usize;
            let is_right = self.pattern_pixel_is_right[i] & 0x1;
            let index = row.saturating_mul(block / 16).saturating_add(col / 16);
            if index >= PDAF_TABLE_WORDS {
                warn!("pattern pixel {} at row {} col {} outside table", i, row, col);
                continue;
            }
            let bit_start = 30 - 2 * (col % 16) as u32;
            table[index] |= (1 | (is_right << 1)) << bit_start;
        }
        Some(table)
    }
}

/// Full PDAF block structure
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PdafInfo {
    /// Leave extraction disabled
    pub bypass: u32,
    /// Continuous (1) or single-shot (0)
    pub mode: u32,
    /// Frames skipped between extractions
    pub skip_num: u32,
    /// Extraction window
    pub win: Window,
    /// Block size and pattern pixels
    pub ppi: PpiInfo,
}

impl PdafInfo {
    /// Encoded size
    pub const SIZE: usize = 3 * 4 + 2 * 4 + Window::SIZE + 4 + 3 * PDAF_PPI_NUM * 4;

    fn parse(buf: &mut Bytes) -> Self {
        let [bypass, mode, skip_num, width, height] = get_words::<5>(buf);
        let win = Window::parse(buf);
        let [pd_pos_size] = get_words::<1>(buf);
        Self {
            bypass,
            mode,
            skip_num,
            win,
            ppi: PpiInfo {
                block_size: BlockSize { width, height },
                pd_pos_size,
                pattern_pixel_is_right: get_words::<PDAF_PPI_NUM>(buf),
                pattern_pixel_row: get_words::<PDAF_PPI_NUM>(buf),
                pattern_pixel_col: get_words::<PDAF_PPI_NUM>(buf),
            },
        }
    }

    /// Encode for tests and tools
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        for w in [
            self.bypass,
            self.mode,
            self.skip_num,
            self.ppi.block_size.width,
            self.ppi.block_size.height,
            self.win.x,
            self.win.y,
            self.win.w,
            self.win.h,
            self.ppi.pd_pos_size,
        ] {
            out.extend_from_slice(&w.to_le_bytes());
        }
        self.ppi.put_arrays(&mut out);
        out
    }
}

/// Extraction window only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoiInfo {
    /// Window
    pub win: Window,
}

impl RoiInfo {
    /// Encoded size
    pub const SIZE: usize = Window::SIZE;

    /// Encode for tests and tools
    pub fn to_bytes(&self) -> Vec<u8> {
        [self.win.x, self.win.y, self.win.w, self.win.h]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect()
    }
}

/// Virtual channel 2 routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vc2Control {
    /// Virtual channel id (2 bits)
    pub vch2_vc: u32,
    /// CSI data type (6 bits)
    pub vch2_data_type: u32,
    /// Output mode (2 bits)
    pub vch2_mode: u32,
}

impl Vc2Control {
    /// Encoded size
    pub const SIZE: usize = 12;

    /// Encode for tests and tools
    pub fn to_bytes(&self) -> Vec<u8> {
        [self.vch2_vc, self.vch2_data_type, self.vch2_mode]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect()
    }

    fn register(&self) -> u32 {
        ((self.vch2_vc & 0x03) << 16) | ((self.vch2_data_type & 0x3F) << 8) | (self.vch2_mode & 0x03)
    }
}

fn copy_u32(param: &IspIoParam<'_>) -> GspResult<u32> {
    let mut buf = copy_param(param, 4)?;
    let [value] = get_words::<1>(&mut buf);
    Ok(value)
}

/// Block size field plus pattern table; an unknown size leaves both alone
fn write_block_geometry(regs: &RegisterFile, ppi: &PpiInfo) {
    let (Some(ctrl), Some(table)) = (ppi.block_size.extr_ctrl(), ppi.pattern_table()) else {
        error!(
            "fail to check pd block size {}x{}, keeping previous",
            ppi.block_size.width, ppi.block_size.height
        );
        return;
    };
    regs.mwr(DCAM_PDAF_EXTR_CTRL, EXTR_BLOCK_MASK, ctrl);
    for (i, word) in table.iter().enumerate() {
        regs.write(DCAM_PDAF_EXTR_POS + (i as u32) * 4, *word);
    }
}

fn write_mode(regs: &RegisterFile, mode: u32) {
    regs.mwr(DCAM_PDAF_SKIP_FRM, bit(2), mode << 2);
    if mode != 0 {
        regs.mwr(DCAM_PDAF_SKIP_FRM, bit(3), 1 << 3);
    } else {
        regs.mwr(DCAM_PDAF_SKIP_FRM1, bit(0), 1);
    }
}

fn enable_extraction(regs: &RegisterFile) {
    regs.owr(DCAM_CFG, bit(3));
    regs.owr(DCAM_CFG, bit(4));
    regs.mwr(DCAM_PDAF_CONTROL, bit(1) | bit(0), 0x3);
    regs.mwr(DCAM_VH2_CONTROL, bit(1) | bit(0), 0);
}

fn pdaf_block(param: &IspIoParam<'_>, regs: &RegisterFile) -> GspResult<()> {
    let mut buf = copy_param(param, PdafInfo::SIZE)?;
    let info = PdafInfo::parse(&mut buf);

    let enable = (info.bypass == 0) as u32;
    regs.mwr(DCAM_CFG, bit(3), enable << 3);
    regs.mwr(DCAM_CFG, bit(4), enable << 4);

    regs.write(DCAM_PDAF_EXTR_ROI_ST, info.win.start());
    regs.write(DCAM_PDAF_EXTR_ROI_SIZE, info.win.size());
    write_block_geometry(regs, &info.ppi);

    regs.mwr(DCAM_PDAF_SKIP_FRM, 0xF0, info.skip_num << 4);
    write_mode(regs, info.mode);
    Ok(())
}

fn pdaf_bypass(param: &IspIoParam<'_>, regs: &RegisterFile) -> GspResult<()> {
    if copy_u32(param)? != 0 {
        return Ok(());
    }
    enable_extraction(regs);
    Ok(())
}

fn pdaf_set_mode(param: &IspIoParam<'_>, regs: &RegisterFile) -> GspResult<()> {
    write_mode(regs, copy_u32(param)?);
    Ok(())
}

fn pdaf_set_skip_num(param: &IspIoParam<'_>, regs: &RegisterFile) -> GspResult<()> {
    let skip_num = copy_u32(param)?;
    regs.mwr(DCAM_PDAF_SKIP_FRM, 0xF0, skip_num << 4);
    Ok(())
}

fn pdaf_set_roi(param: &IspIoParam<'_>, regs: &RegisterFile) -> GspResult<()> {
    let mut buf = copy_param(param, RoiInfo::SIZE)?;
    let roi = RoiInfo { win: Window::parse(&mut buf) };
    regs.write(DCAM_PDAF_EXTR_ROI_ST, roi.win.start());
    regs.write(DCAM_PDAF_EXTR_ROI_SIZE, roi.win.size());
    enable_extraction(regs);
    regs.owr(DCAM_CONTROL, PDAF_COPY);
    regs.owr(DCAM_CONTROL, VCH2_COPY);
    Ok(())
}

fn pdaf_set_ppi_info(param: &IspIoParam<'_>, regs: &RegisterFile) -> GspResult<()> {
    let mut buf = copy_param(param, PpiInfo::SIZE)?;
    write_block_geometry(regs, &PpiInfo::parse(&mut buf));
    Ok(())
}

fn pdaf_vc2_block(param: &IspIoParam<'_>, regs: &RegisterFile) -> GspResult<()> {
    let mut buf = copy_param(param, Vc2Control::SIZE)?;
    let [vch2_vc, vch2_data_type, vch2_mode] = get_words::<3>(&mut buf);
    let vc2 = Vc2Control { vch2_vc, vch2_data_type, vch2_mode };
    regs.owr(DCAM_CFG, bit(4));
    regs.write(DCAM_VH2_CONTROL, vc2.register());
    Ok(())
}

/// Apply one PDAF property to the instance encoded in `com_idx`
pub fn cfg_pdaf(param: &IspIoParam<'_>, bank: &RegisterBank, com_idx: u32) -> GspResult<()> {
    if param.property_param.is_none() {
        error!("fail to get property_param");
        return Err(GspError::InvalidArgument("null property_param".to_string()));
    }
    let idx = isp_get_isp_id(com_idx);
    let regs = instance(bank, idx)?;

    let Some(property) = PdafProperty::from_u32(param.property) else {
        error!("fail to support cmd id = {}", param.property);
        return Ok(());
    };
    debug!("dcam[{}] pdaf {:?}", idx, property);
    match property {
        PdafProperty::Block => pdaf_block(param, regs),
        PdafProperty::Bypass => pdaf_bypass(param, regs),
        PdafProperty::SetMode => pdaf_set_mode(param, regs),
        PdafProperty::SetSkipNum => pdaf_set_skip_num(param, regs),
        PdafProperty::SetRoi => pdaf_set_roi(param, regs),
        PdafProperty::SetPpiInfo => pdaf_set_ppi_info(param, regs),
        PdafProperty::Type1Block | PdafProperty::Type2Block => pdaf_vc2_block(param, regs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isp::isp_register_bank;
    use crate::user::UserBuffer;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn run(property: PdafProperty, bytes: &[u8], bank: &RegisterBank) -> GspResult<()> {
        let mem = UserBuffer::from_bytes(bytes);
        cfg_pdaf(&IspIoParam::new(property as u32, &mem), bank, 0)
    }

    fn ppi(height: u32) -> PpiInfo {
        let mut ppi = PpiInfo {
            block_size: BlockSize { width: 1, height },
            pd_pos_size: 1,
            ..Default::default()
        };
        // pixel 0: row 0 col 0 left, pixel 1: row 1 col 17 right
        ppi.pattern_pixel_row[1] = 1;
        ppi.pattern_pixel_col[1] = 17;
        ppi.pattern_pixel_is_right[1] = 1;
        ppi
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(2, 2)]
    #[case(3, 4)]
    fn test_pattern_table_row_stride(#[case] height: u32, #[case] words_per_row: usize) {
        let table = ppi(height).pattern_table().unwrap();
        assert_eq!(table[0], 1 << 30);
        let index = words_per_row + 1;
        assert_eq!(table[index], 0b11 << 28);
    }

    #[test]
    fn test_pattern_table_bounded() {
        let mut info = ppi(3);
        info.pd_pos_size = 1000;
        info.pattern_pixel_row = [200; PDAF_PPI_NUM];
        let table = info.pattern_table().unwrap();
        assert!(table.iter().all(|&w| w == 0));
    }

    #[test]
    fn test_set_ppi_info_writes_table() {
        let bank = isp_register_bank();
        run(PdafProperty::SetPpiInfo, &ppi(1).to_bytes(), &bank).unwrap();
        let regs = bank.instance(0).unwrap();
        assert_eq!(regs.read(DCAM_PDAF_EXTR_CTRL), (1 << 3) | (1 << 1));
        assert_eq!(regs.read(DCAM_PDAF_EXTR_POS), 1 << 30);
        assert_eq!(regs.read(DCAM_PDAF_EXTR_POS + 8), 0b11 << 28);
        assert_eq!(regs.read(DCAM_PDAF_EXTR_POS + 255 * 4), 0);
    }

    #[test]
    fn test_invalid_block_size_keeps_previous() {
        let bank = isp_register_bank();
        run(PdafProperty::SetPpiInfo, &ppi(2).to_bytes(), &bank).unwrap();
        let regs = bank.instance(0).unwrap();
        let ctrl = regs.read(DCAM_PDAF_EXTR_CTRL);
        let first = regs.read(DCAM_PDAF_EXTR_POS);

        let mut bad = ppi(7);
        bad.pattern_pixel_col[0] = 5;
        run(PdafProperty::SetPpiInfo, &bad.to_bytes(), &bank).unwrap();
        assert_eq!(regs.read(DCAM_PDAF_EXTR_CTRL), ctrl);
        assert_eq!(regs.read(DCAM_PDAF_EXTR_POS), first);
    }

    #[test]
    fn test_block_enables_and_packs_roi() {
        let bank = isp_register_bank();
        let info = PdafInfo {
            bypass: 0,
            mode: 1,
            skip_num: 3,
            win: Window { x: 100, y: 200, w: 0x2000 | 640, h: 480 },
            ppi: ppi(1),
        };
        assert_eq!(info.to_bytes().len(), PdafInfo::SIZE);
        run(PdafProperty::Block, &info.to_bytes(), &bank).unwrap();

        let regs = bank.instance(0).unwrap();
        assert_eq!(regs.read(DCAM_CFG), bit(3) | bit(4));
        assert_eq!(regs.read(DCAM_PDAF_EXTR_ROI_ST), (200 << 13) | 100);
        assert_eq!(regs.read(DCAM_PDAF_EXTR_ROI_SIZE), (480 << 13) | 640);
        assert_eq!(regs.read(DCAM_PDAF_SKIP_FRM), (3 << 4) | bit(2) | bit(3));
        assert_eq!(regs.read(DCAM_PDAF_SKIP_FRM1), 0);
    }

    #[test]
    fn test_block_bypass_clears_enable() {
        let bank = isp_register_bank();
        let regs = bank.instance(0).unwrap();
        regs.write(DCAM_CFG, 0xFF);
        let info = PdafInfo { bypass: 1, ppi: ppi(0), ..Default::default() };
        run(PdafProperty::Block, &info.to_bytes(), &bank).unwrap();
        assert_eq!(regs.read(DCAM_CFG), 0xFF & !(bit(3) | bit(4)));
        assert_eq!(regs.read(DCAM_PDAF_SKIP_FRM1), 1);
    }

    #[test]
    fn test_bypass_property() {
        let bank = isp_register_bank();
        run(PdafProperty::Bypass, &1u32.to_le_bytes(), &bank).unwrap();
        assert!(bank.instance(0).unwrap().snapshot().is_empty());

        run(PdafProperty::Bypass, &0u32.to_le_bytes(), &bank).unwrap();
        let regs = bank.instance(0).unwrap();
        assert_eq!(regs.read(DCAM_CFG), bit(3) | bit(4));
        assert_eq!(regs.read(DCAM_PDAF_CONTROL), 0x3);
        assert_eq!(regs.read(DCAM_VH2_CONTROL), 0);
    }

    #[test]
    fn test_set_roi_force_copies() {
        let bank = isp_register_bank();
        let roi = RoiInfo { win: Window { x: 1, y: 2, w: 3, h: 4 } };
        run(PdafProperty::SetRoi, &roi.to_bytes(), &bank).unwrap();
        let regs = bank.instance(0).unwrap();
        assert_eq!(regs.read(DCAM_PDAF_EXTR_ROI_ST), (2 << 13) | 1);
        assert_eq!(regs.read(DCAM_CONTROL), PDAF_COPY | VCH2_COPY);
    }

    #[test]
    fn test_mode_and_skip() {
        let bank = isp_register_bank();
        run(PdafProperty::SetSkipNum, &0x1Fu32.to_le_bytes(), &bank).unwrap();
        run(PdafProperty::SetMode, &0u32.to_le_bytes(), &bank).unwrap();
        let regs = bank.instance(0).unwrap();
        assert_eq!(regs.read(DCAM_PDAF_SKIP_FRM), 0xF0);
        assert_eq!(regs.read(DCAM_PDAF_SKIP_FRM1), 1);
    }

    #[rstest]
    #[case(PdafProperty::Type1Block)]
    #[case(PdafProperty::Type2Block)]
    fn test_vc2_blocks(#[case] property: PdafProperty) {
        let bank = isp_register_bank();
        let vc2 = Vc2Control { vch2_vc: 0x7, vch2_data_type: 0x2B, vch2_mode: 1 };
        run(property, &vc2.to_bytes(), &bank).unwrap();
        let regs = bank.instance(0).unwrap();
        assert_eq!(regs.read(DCAM_VH2_CONTROL), (0x3 << 16) | (0x2B << 8) | 1);
        assert_eq!(regs.read(DCAM_CFG), bit(4));
    }

    #[test]
    fn test_instance_from_command_index() {
        let bank = isp_register_bank();
        let mem = UserBuffer::from_bytes(&0u32.to_le_bytes());
        cfg_pdaf(&IspIoParam::new(PdafProperty::SetMode as u32, &mem), &bank, 0x21).unwrap();
        assert!(bank.instance(0).unwrap().snapshot().is_empty());
        assert_eq!(bank.instance(1).unwrap().read(DCAM_PDAF_SKIP_FRM1), 1);
    }

    #[test]
    fn test_unknown_and_null() {
        let bank = isp_register_bank();
        let mem = UserBuffer::zeroed(4);
        assert!(cfg_pdaf(&IspIoParam::new(42, &mem), &bank, 0).is_ok());
        let null = IspIoParam { property: 0, property_param: None };
        assert!(cfg_pdaf(&null, &bank, 0).is_err());
    }

    #[test]
    fn test_short_structure_faults() {
        let bank = isp_register_bank();
        let err = run(PdafProperty::Block, &[0u8; 16], &bank).unwrap_err();
        assert!(matches!(err, GspError::Fault(_)));
        assert!(bank.instance(0).unwrap().snapshot().is_empty());
    }
}
