//! Configure the PDAF and contrast blocks of ISP instance 0 and dump the registers

use sprdmm::isp::pdaf::{BlockSize, Window};
use sprdmm::isp::{contrast::ISP_PRO_CONTRAST_BLOCK, ContrastInfo, PdafInfo, PdafProperty, PpiInfo};
use sprdmm::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bank = isp_register_bank();

    let mut ppi = PpiInfo {
        block_size: BlockSize { width: 1, height: 1 },
        pd_pos_size: 2,
        ..Default::default()
    };
    for (i, (row, col)) in [(2, 3), (5, 3), (10, 12), (13, 12)].into_iter().enumerate() {
        ppi.pattern_pixel_row[i] = row;
        ppi.pattern_pixel_col[i] = col;
        ppi.pattern_pixel_is_right[i] = (i % 2) as u32;
    }
    let info = PdafInfo {
        bypass: 0,
        mode: 1,
        skip_num: 2,
        win: Window { x: 64, y: 32, w: 1920, h: 1080 },
        ppi,
    };
    let mem = UserBuffer::from_bytes(&info.to_bytes());
    cfg_pdaf(&IspIoParam::new(PdafProperty::Block as u32, &mem), &bank, 0)?;

    let contrast = UserBuffer::from_bytes(&ContrastInfo { bypass: 0, factor: 0x40 }.to_bytes());
    cfg_contrast(&IspIoParam::new(ISP_PRO_CONTRAST_BLOCK, &contrast), &bank, 0)?;

    if let Some(regs) = bank.instance(0) {
        for (offset, value) in regs.snapshot().into_iter().filter(|(_, v)| *v != 0) {
            println!("0x{:04x}: 0x{:08x}", offset, value);
        }
    }
    Ok(())
}
