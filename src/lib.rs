//! # SPRDMM - Spreadtrum multimedia block drivers in user space
//!
//! A user-space model of the Spreadtrum GSP (Generic Scaler/rotator
//! Processor) platform driver and of the ISP contrast / PDAF block
//! configuration handlers.
//!
//! ## Features
//!
//! - **GSP driver model**: device and core lifecycle, per-revision
//!   operations tables, kcfg batching, suspend/resume sequencing
//! - **Ioctl surface** with the original command layout
//! - **Runtime PM** bookkeeping with autosuspend
//! - **ISP handlers** translating property structures into register writes
//! - **JSON device nodes** and embedded nodes for every supported SoC
//!
//! ## Quick Start
//!
//! ```no_run
//! use sprdmm::prelude::*;
//!
//! fn main() -> Result<(), GspError> {
//!     let driver = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", DriverConfig::default())?;
//!     let file = driver.open()?;
//!
//!     let mut buf = UserBuffer::zeroed(CAPABILITY_SIZE);
//!     file.ioctl(gsp_get_capability_cmd(CAPABILITY_SIZE), &mut buf)?;
//!     driver.remove()
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

#[cfg(feature = "gsp")]
pub mod api;
#[cfg(feature = "gsp")]
pub mod dt;
pub mod error;
#[cfg(feature = "gsp")]
pub mod gsp;
#[cfg(feature = "isp")]
pub mod isp;
pub mod regs;
pub mod sync;
pub mod user;

// Re-export main API for easy access
#[cfg(feature = "gsp")]
pub use api::{Driver, GspFile};
#[cfg(feature = "gsp")]
pub use dt::{builtin_node, load_builtin_nodes, CoreNode, DeviceNode};
pub use error::{GspError, GspResult};
#[cfg(feature = "gsp")]
pub use gsp::{Capability, Device, DriverConfig, HwRevision};
pub use regs::{RegisterBank, RegisterFile, RegisterSpace};
pub use user::{UserBuffer, UserMemory};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library entry point
///
/// Nothing needs global setup today; binaries install their own logger.
///
/// # Example
///
/// ```no_run
/// sprdmm::init();
/// ```
pub fn init() {}

/// Compatible strings with an operations table
///
/// # Example
///
/// ```no_run
/// for compatible in sprdmm::supported_compatibles() {
///     println!("{}", compatible);
/// }
/// ```
#[cfg(feature = "gsp")]
pub fn supported_compatibles() -> Vec<&'static str> {
    gsp::GSP_DT_IDS.iter().map(|(compatible, _)| *compatible).collect()
}

/// Get library information
///
/// # Example
///
/// ```no_run
/// println!("Using sprdmm v{}", sprdmm::version());
/// ```
pub fn version() -> &'static str {
    VERSION
}


/// Prelude module for convenient imports
///
/// # Example
///
/// ```no_run
/// use sprdmm::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "gsp")]
    pub use crate::api::{Driver, GspFile};
    #[cfg(feature = "gsp")]
    pub use crate::dt::{builtin_node, DeviceNode};
    pub use crate::error::{GspError, GspResult};
    #[cfg(feature = "gsp")]
    pub use crate::gsp::cmd::{gsp_get_capability_cmd, gsp_trigger_cmd};
    #[cfg(feature = "gsp")]
    pub use crate::gsp::{BaseCfg, Capability, DriverConfig, BASE_CFG_SIZE, CAPABILITY_SIZE};
    #[cfg(feature = "isp")]
    pub use crate::isp::{cfg_contrast, cfg_pdaf, isp_register_bank, IspIoParam};
    pub use crate::user::{UserBuffer, UserMemory};
    #[cfg(feature = "gsp")]
    pub use crate::supported_compatibles;
    pub use crate::{init, version};
}
