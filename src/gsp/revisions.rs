//! GSP hardware revision database
//!
//! One entry per supported revision: the register layout used by the
//! operations table and the static capability reported to user space.

use serde::{Deserialize, Serialize};

/// Supported GSP hardware revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HwRevision {
    /// GSP r1p1 (sc9830)
    R1p1,
    /// GSP r3p0 (whale2)
    R3p0,
    /// GSP r4p0 (iwhale2)
    R4p0,
    /// GSP lite r1p0 (sc9833, sharklj1)
    LiteR1p0,
    /// GSP r5p0 (isharkl2)
    R5p0,
    /// GSP lite r2p0 (sharkle, pike2)
    LiteR2p0,
    /// GSP r6p0 (sharkl3)
    R6p0,
    /// GSP lite r3p0 (sharkl5)
    LiteR3p0,
}

impl std::fmt::Display for HwRevision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HwRevision::R1p1 => "r1p1",
            HwRevision::R3p0 => "r3p0",
            HwRevision::R4p0 => "r4p0",
            HwRevision::LiteR1p0 => "lite_r1p0",
            HwRevision::R5p0 => "r5p0",
            HwRevision::LiteR2p0 => "lite_r2p0",
            HwRevision::R6p0 => "r6p0",
            HwRevision::LiteR3p0 => "lite_r3p0",
        };
        write!(f, "{}", name)
    }
}

/// Register offsets of one core window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegLayout {
    /// Hardware version register
    pub version: u32,
    /// Global control: run, soft reset, clock enable
    pub glb_ctrl: u32,
    /// Interrupt control/status
    pub int_ctrl: u32,
    /// Layer enable mask
    pub layer_en: u32,
    /// First word of the configuration window
    pub cfg_base: u32,
    /// Number of 32-bit words in the configuration window
    pub cfg_words: u32,
}

/// Revision database entry
#[derive(Debug, Clone, Serialize)]
pub struct RevisionInfo {
    /// Revision
    pub revision: HwRevision,
    /// Value of the version register
    pub version: u32,
    /// Register layout
    pub layout: RegLayout,
    /// Layers blended per job
    pub max_layer: u32,
    /// Of which YUV/video layers
    pub max_video_layer: u32,
    /// Maximum output width in pixels
    pub max_width: u32,
    /// Maximum output height in pixels
    pub max_height: u32,
    /// Maximum upscale factor
    pub scale_up_max: u32,
    /// Maximum downscale divisor
    pub scale_down_max: u32,
    /// Whether the pipe can rotate
    pub rotation: bool,
}

const FULL_LAYOUT: RegLayout = RegLayout {
    version: 0x000,
    glb_ctrl: 0x004,
    int_ctrl: 0x008,
    layer_en: 0x010,
    cfg_base: 0x100,
    cfg_words: 64,
};

const LITE_LAYOUT: RegLayout = RegLayout {
    version: 0x000,
    glb_ctrl: 0x008,
    int_ctrl: 0x00C,
    layer_en: 0x014,
    cfg_base: 0x080,
    cfg_words: 32,
};

/// Complete table of supported revisions
pub const GSP_REVISIONS: &[RevisionInfo] = &[
    RevisionInfo { revision: HwRevision::R1p1,     version: 0x0101, layout: FULL_LAYOUT, max_layer: 2, max_video_layer: 1, max_width: 4095, max_height: 4095, scale_up_max: 4, scale_down_max: 16, rotation: true },
    RevisionInfo { revision: HwRevision::R3p0,     version: 0x0300, layout: FULL_LAYOUT, max_layer: 4, max_video_layer: 1, max_width: 4095, max_height: 4095, scale_up_max: 4, scale_down_max: 16, rotation: true },
    RevisionInfo { revision: HwRevision::R4p0,     version: 0x0400, layout: FULL_LAYOUT, max_layer: 4, max_video_layer: 1, max_width: 8191, max_height: 8191, scale_up_max: 4, scale_down_max: 16, rotation: true },
    RevisionInfo { revision: HwRevision::LiteR1p0, version: 0x1100, layout: LITE_LAYOUT, max_layer: 2, max_video_layer: 1, max_width: 2047, max_height: 2047, scale_up_max: 1, scale_down_max: 1,  rotation: true },
    RevisionInfo { revision: HwRevision::R5p0,     version: 0x0500, layout: FULL_LAYOUT, max_layer: 6, max_video_layer: 2, max_width: 8191, max_height: 8191, scale_up_max: 4, scale_down_max: 16, rotation: true },
    RevisionInfo { revision: HwRevision::LiteR2p0, version: 0x1200, layout: LITE_LAYOUT, max_layer: 3, max_video_layer: 1, max_width: 4095, max_height: 4095, scale_up_max: 4, scale_down_max: 8,  rotation: true },
    RevisionInfo { revision: HwRevision::R6p0,     version: 0x0600, layout: FULL_LAYOUT, max_layer: 4, max_video_layer: 2, max_width: 8191, max_height: 8191, scale_up_max: 4, scale_down_max: 16, rotation: true },
    RevisionInfo { revision: HwRevision::LiteR3p0, version: 0x1300, layout: LITE_LAYOUT, max_layer: 3, max_video_layer: 1, max_width: 4095, max_height: 4095, scale_up_max: 4, scale_down_max: 8,  rotation: false },
];

/// Look up the database entry of `revision`
pub fn revision_info(revision: HwRevision) -> Option<&'static RevisionInfo> {
    GSP_REVISIONS.iter().find(|info| info.revision == revision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_revision_has_one_entry() {
        for info in GSP_REVISIONS {
            let count = GSP_REVISIONS
                .iter()
                .filter(|other| other.revision == info.revision)
                .count();
            assert_eq!(count, 1, "{} listed {} times", info.revision, count);
        }
        assert_eq!(GSP_REVISIONS.len(), 8);
    }

    #[test]
    fn test_video_layers_fit_in_layers() {
        for info in GSP_REVISIONS {
            assert!(info.max_video_layer <= info.max_layer);
            assert!(info.max_layer <= 32);
        }
    }
}
