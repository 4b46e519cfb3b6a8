//! Per-revision core operations
//!
//! The set of operations tables is closed: one immutable [`CoreOps`] per
//! [`HwRevision`], picked once at bind time from the compatible string and
//! shared by every core of the device.

use bytes::{Buf, BufMut};
use log::{debug, error, warn};

use crate::dt::CoreNode;
use crate::error::{GspError, GspResult};
use crate::regs::{bit, RegisterFile, RegisterSpace};

use super::capability::Capability;
use super::revisions::{revision_info, HwRevision, RegLayout, RevisionInfo, GSP_REVISIONS};

/// Global control: start the pipe
pub const GLB_RUN: u32 = bit(0);
/// Global control: soft reset
pub const GLB_SOFT_RESET: u32 = bit(1);
/// Global control: core clock gate
pub const GLB_CLK_EN: u32 = bit(2);

/// Interrupt: job done raw status
pub const INT_DONE_RAW: u32 = bit(0);
/// Interrupt: job done enable
pub const INT_DONE_EN: u32 = bit(8);
/// Interrupt: write-one-to-clear for the done status
pub const INT_DONE_CLR: u32 = bit(16);

/// Size of the base configuration header every kcfg starts with
pub const BASE_CFG_SIZE: usize = 16;

/// Default kcfg slots per core when the node does not say
pub const DEFAULT_KCFG_NUM: u32 = 8;

/// Parsed base configuration header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseCfg {
    /// Number of enabled layers
    pub layer_num: u32,
    /// Soft-reset the pipe before loading
    pub init: bool,
    /// Declared payload size in bytes, header included
    pub size: u32,
    /// Caller tag, echoed in logs
    pub tag: u32,
}

impl BaseCfg {
    /// Parse the header at the start of `payload`
    pub fn parse(mut payload: &[u8]) -> GspResult<Self> {
        if payload.len() < BASE_CFG_SIZE {
            return Err(GspError::InvalidArgument(format!(
                "base cfg needs {} bytes, got {}",
                BASE_CFG_SIZE,
                payload.len()
            )));
        }
        Ok(Self {
            layer_num: payload.get_u32_le(),
            init: payload.get_u32_le() != 0,
            size: payload.get_u32_le(),
            tag: payload.get_u32_le(),
        })
    }

    /// Encode the header (used by tools and tests to build payloads)
    pub fn to_bytes(&self) -> [u8; BASE_CFG_SIZE] {
        let mut out = [0u8; BASE_CFG_SIZE];
        let mut buf = &mut out[..];
        buf.put_u32_le(self.layer_num);
        buf.put_u32_le(self.init as u32);
        buf.put_u32_le(self.size);
        buf.put_u32_le(self.tag);
        out
    }
}

/// Per-core parameters parsed from the core node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreParams {
    /// Core id
    pub id: u32,
    /// Kcfg slots owned by the core
    pub kcfg_num: u32,
}

/// Immutable operations table of one hardware revision
#[derive(Debug)]
pub struct CoreOps {
    revision: HwRevision,
}

static R1P1_OPS: CoreOps = CoreOps { revision: HwRevision::R1p1 };
static R3P0_OPS: CoreOps = CoreOps { revision: HwRevision::R3p0 };
static R4P0_OPS: CoreOps = CoreOps { revision: HwRevision::R4p0 };
static LITE_R1P0_OPS: CoreOps = CoreOps { revision: HwRevision::LiteR1p0 };
static R5P0_OPS: CoreOps = CoreOps { revision: HwRevision::R5p0 };
static LITE_R2P0_OPS: CoreOps = CoreOps { revision: HwRevision::LiteR2p0 };
static R6P0_OPS: CoreOps = CoreOps { revision: HwRevision::R6p0 };
static LITE_R3P0_OPS: CoreOps = CoreOps { revision: HwRevision::LiteR3p0 };

/// Compatible string to operations table
pub static GSP_DT_IDS: &[(&str, &CoreOps)] = &[
    ("sprd,gsp-r1p1-sc9830", &R1P1_OPS),
    ("sprd,gsp-r3p0-whale2", &R3P0_OPS),
    ("sprd,gsp-r4p0-iwhale2", &R4P0_OPS),
    ("sprd,gsp-lite_r1p0-sc9833", &LITE_R1P0_OPS),
    ("sprd,gsp-lite_r1p0-sharklj1", &LITE_R1P0_OPS),
    ("sprd,gsp-r5p0-isharkl2", &R5P0_OPS),
    ("sprd,gsp-lite_r2p0-sharkle", &LITE_R2P0_OPS),
    ("sprd,gsp-lite_r2p0-pike2", &LITE_R2P0_OPS),
    ("sprd,gsp-r6p0-sharkl3", &R6P0_OPS),
    ("sprd,gsp-lite_r3p0-sharkl5", &LITE_R3P0_OPS),
];

impl CoreOps {
    /// Resolve the operations table for a compatible string
    pub fn lookup(compatible: &str) -> Option<&'static CoreOps> {
        GSP_DT_IDS
            .iter()
            .find(|(id, _)| *id == compatible)
            .map(|(_, ops)| *ops)
    }

    /// Hardware revision served by this table
    pub fn revision(&self) -> HwRevision {
        self.revision
    }

    fn info(&self) -> &'static RevisionInfo {
        // every static table above has a database row
        revision_info(self.revision).unwrap_or(&GSP_REVISIONS[0])
    }

    /// Register layout of this revision
    pub fn layout(&self) -> &'static RegLayout {
        &self.info().layout
    }

    /// Static per-core capability
    pub fn capability(&self) -> Capability {
        Capability::from_revision(self.info())
    }

    /// Parse a core node into core parameters
    pub fn parse_dt(&self, node: &CoreNode) -> GspResult<CoreParams> {
        let id = node
            .id
            .ok_or_else(|| GspError::Config("core node without id".to_string()))?;
        let kcfg_num = node.kcfg_num.unwrap_or(DEFAULT_KCFG_NUM);
        if kcfg_num == 0 {
            return Err(GspError::Config(format!("core[{}] kcfg-num must be >= 1", id)));
        }
        if let Some(status) = &node.status {
            if status != "okay" {
                return Err(GspError::Config(format!("core[{}] status is {}", id, status)));
            }
        }
        debug!("{} core[{}] parsed, kcfg-num {}", self.revision, id, kcfg_num);
        Ok(CoreParams { id, kcfg_num })
    }

    /// Allocate the register window of one core
    pub fn alloc(&self, params: &CoreParams) -> GspResult<RegisterFile> {
        let regs = RegisterFile::new();
        regs.write(self.layout().version, self.info().version);
        debug!("{} core[{}] register window allocated", self.revision, params.id);
        Ok(regs)
    }

    /// Bring a freshly allocated window into its reset state
    pub fn init(&self, regs: &RegisterFile) -> GspResult<()> {
        let layout = self.layout();
        let version = regs.read(layout.version);
        if version != self.info().version {
            error!(
                "{} version mismatch: read 0x{:04x}, expected 0x{:04x}",
                self.revision,
                version,
                self.info().version
            );
            return Err(GspError::Hardware(format!("unexpected version 0x{:04x}", version)));
        }
        regs.write(layout.glb_ctrl, 0);
        regs.write(layout.int_ctrl, INT_DONE_EN);
        regs.write(layout.layer_en, 0);
        Ok(())
    }

    /// Load one kcfg payload into the configuration window
    pub fn copy_cfg(&self, regs: &RegisterFile, payload: &[u8]) -> GspResult<BaseCfg> {
        let layout = self.layout();
        let cfg = BaseCfg::parse(payload)?;
        if cfg.layer_num == 0 || cfg.layer_num > self.info().max_layer {
            return Err(GspError::InvalidArgument(format!(
                "layer_num {} outside 1..={}",
                cfg.layer_num,
                self.info().max_layer
            )));
        }
        if cfg.size as usize > payload.len() {
            return Err(GspError::InvalidArgument(format!(
                "declared size {} exceeds payload {}",
                cfg.size,
                payload.len()
            )));
        }
        if cfg.init {
            self.reset(regs);
        }

        let mut body = &payload[BASE_CFG_SIZE..cfg.size.max(BASE_CFG_SIZE as u32) as usize];
        let words = body.len() / 4;
        if words > layout.cfg_words as usize {
            warn!(
                "{} cfg body of {} words truncated to {}",
                self.revision, words, layout.cfg_words
            );
        }
        for i in 0..words.min(layout.cfg_words as usize) {
            regs.write(layout.cfg_base + (i as u32) * 4, body.get_u32_le());
        }
        regs.write(layout.layer_en, (1u32 << cfg.layer_num) - 1);
        Ok(cfg)
    }

    /// Kick the pipe
    pub fn trigger(&self, regs: &RegisterFile) {
        regs.owr(self.layout().glb_ctrl, GLB_RUN);
    }

    /// Return the pipe to idle after a finished job
    pub fn release(&self, regs: &RegisterFile) {
        let layout = self.layout();
        regs.awr(layout.glb_ctrl, GLB_RUN);
        regs.write(layout.layer_en, 0);
    }

    /// Ungate the core clock
    pub fn enable(&self, regs: &RegisterFile) {
        regs.owr(self.layout().glb_ctrl, GLB_CLK_EN);
    }

    /// Gate the core clock
    pub fn disable(&self, regs: &RegisterFile) {
        regs.awr(self.layout().glb_ctrl, GLB_CLK_EN);
    }

    /// Claim a pending done interrupt; false for a spurious one
    pub fn intercept(&self, regs: &RegisterFile) -> bool {
        let int_ctrl = self.layout().int_ctrl;
        let status = regs.read(int_ctrl);
        if status & INT_DONE_RAW == 0 || status & INT_DONE_EN == 0 {
            return false;
        }
        regs.owr(int_ctrl, INT_DONE_CLR);
        regs.mwr(int_ctrl, INT_DONE_RAW | INT_DONE_CLR, 0);
        true
    }

    /// Pulse the soft reset bit and clear the job state
    pub fn reset(&self, regs: &RegisterFile) {
        let layout = self.layout();
        regs.owr(layout.glb_ctrl, GLB_SOFT_RESET);
        regs.mwr(layout.glb_ctrl, GLB_SOFT_RESET | GLB_RUN, 0);
        regs.mwr(layout.int_ctrl, INT_DONE_RAW | INT_DONE_CLR, 0);
        regs.write(layout.layer_en, 0);
    }

    /// Significant register values, in offset order
    pub fn dump(&self, regs: &RegisterFile) -> Vec<(u32, u32)> {
        let layout = self.layout();
        [layout.version, layout.glb_ctrl, layout.int_ctrl, layout.layer_en]
            .iter()
            .map(|&offset| (offset, regs.read(offset)))
            .collect()
    }
}
