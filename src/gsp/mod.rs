//! GSP (Generic Scaler/rotator Processor) driver model
//!
//! A [`Device`] owns its [`Core`]s and an [`Interface`]; every core is bound
//! to one immutable [`CoreOps`] table chosen from the compatible string.
//! User requests enter through [`crate::api::GspFile::ioctl`].

pub mod capability;
pub mod cmd;
pub mod core;
pub mod dev;
pub mod interface;
pub mod kcfg;
pub mod ops;
pub mod pm;
pub mod revisions;

pub use self::capability::{Capability, CAPABILITY_MAGIC, CAPABILITY_SIZE};
pub use self::cmd::{GspRequest, IoctlCmd, TriggerRequest};
pub use self::core::{Core, CoreStatus, SuspendState};
pub use self::dev::{Device, DevicePhase, DeviceStatus};
pub use self::interface::Interface;
pub use self::kcfg::{Kcfg, KcfgList, KcfgStatus};
pub use self::ops::{BaseCfg, CoreOps, BASE_CFG_SIZE, GSP_DT_IDS};
pub use self::pm::{RuntimePm, RuntimeStatus};
pub use self::revisions::{HwRevision, RevisionInfo};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Expected `name` property of every GSP device node
pub const GSP_DEVICE_NAME: &str = "sprd-gsp";

/// Name of the misc device node
pub const GSP_MISC_NAME: &str = "gsp";

/// Largest `io-cnt` the 4-bit count field of the trigger command can carry
pub const GSP_MAX_IO_CNT: u32 = 15;

/// Runtime tuning of the driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Bound on each core's suspend-done wait
    pub suspend_wait: Duration,
    /// Bound on each core's resume-done wait
    pub resume_wait: Duration,
    /// Bound on a synchronous trigger
    pub kcfg_wait: Duration,
    /// Runtime PM autosuspend delay
    pub autosuspend_delay: Duration,
    /// Simulated time the hardware needs per job
    pub job_latency: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            suspend_wait: Duration::from_millis(500),
            resume_wait: Duration::from_millis(500),
            kcfg_wait: Duration::from_millis(2000),
            autosuspend_delay: Duration::from_millis(3000),
            job_latency: Duration::from_millis(1),
        }
    }
}

impl DriverConfig {
    /// Short bounds for tests and benchmarks
    pub fn quick() -> Self {
        Self {
            suspend_wait: Duration::from_millis(100),
            resume_wait: Duration::from_millis(100),
            kcfg_wait: Duration::from_millis(500),
            autosuspend_delay: Duration::from_millis(50),
            job_latency: Duration::ZERO,
        }
    }

    /// Generous bounds and a visible job latency for tracing
    pub fn debug() -> Self {
        Self {
            suspend_wait: Duration::from_secs(5),
            resume_wait: Duration::from_secs(5),
            kcfg_wait: Duration::from_secs(10),
            autosuspend_delay: Duration::from_secs(3),
            job_latency: Duration::from_millis(20),
        }
    }
}
