//! Platform driver and misc-device file surface
//!
//! [`Driver`] plays the probe/remove and power-management roles of the
//! platform driver; [`GspFile`] is one open handle on the misc device and
//! carries the ioctl entry point.

use log::{debug, error, info, warn};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dt::DeviceNode;
use crate::error::{GspError, GspResult};
use crate::gsp::cmd::{GspRequest, TriggerRequest};
use crate::gsp::{
    Capability, Device, DriverConfig, KcfgList, BASE_CFG_SIZE, CAPABILITY_SIZE, GSP_MISC_NAME,
};
use crate::user::UserMemory;

/// Bound GSP platform driver
#[derive(Debug)]
pub struct Driver {
    device: Arc<Device>,
    misc_registered: AtomicBool,
}

impl Driver {
    /// Allocate and initialize the device, register the misc node and
    /// enable runtime PM with autosuspend
    pub fn probe(node: &DeviceNode, config: DriverConfig) -> GspResult<Driver> {
        info!("probe {}", node.compatible);
        let autosuspend_delay = config.autosuspend_delay;
        let device = Device::alloc_and_init(node, config)?;

        let pm = device.pm();
        pm.set_active();
        pm.set_autosuspend_delay(autosuspend_delay);
        pm.use_autosuspend();
        pm.enable();

        info!("misc device /dev/{} registered", GSP_MISC_NAME);
        Ok(Driver { device, misc_registered: AtomicBool::new(true) })
    }

    /// Probe with the embedded node of `compatible`
    pub fn probe_builtin(compatible: &str, config: DriverConfig) -> GspResult<Driver> {
        let node = crate::dt::builtin_node(compatible)
            .ok_or_else(|| GspError::NoMatch(compatible.to_string()))?;
        Self::probe(&node, config)
    }

    /// Open a file handle on the misc device
    pub fn open(&self) -> GspResult<GspFile> {
        if !self.misc_registered.load(Ordering::Acquire) {
            error!("gsp has no misc device");
            return Err(GspError::InvalidArgument("misc device not registered".to_string()));
        }
        GspFile::open(Arc::clone(&self.device))
    }

    /// Bound device
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Whether the misc node is registered
    pub fn is_registered(&self) -> bool {
        self.misc_registered.load(Ordering::Acquire)
    }

    /// Deregister the misc node and tear the device down
    pub fn remove(self) -> GspResult<()> {
        info!("remove gsp device");
        self.device.verify()?;
        self.misc_registered.store(false, Ordering::Release);
        self.device.pm().disable();
        self.device.free_and_deinit();
        Ok(())
    }

    /// System sleep entry
    pub fn pm_suspend(&self) -> GspResult<()> {
        self.device.pm_suspend()
    }

    /// System sleep exit
    pub fn pm_resume(&self) -> GspResult<()> {
        self.device.pm_resume()
    }

    /// Runtime suspend callback
    pub fn runtime_suspend(&self) -> GspResult<()> {
        self.device.runtime_suspend()
    }

    /// Runtime resume callback
    pub fn runtime_resume(&self) -> GspResult<()> {
        self.device.runtime_resume()
    }

    /// Runtime idle callback
    pub fn runtime_idle(&self) -> i32 {
        self.device.runtime_idle()
    }
}

/// One open handle on `/dev/gsp`
#[derive(Debug, Clone)]
pub struct GspFile {
    device: Arc<Device>,
}

impl GspFile {
    /// Open a handle; the device must verify
    pub fn open(device: Arc<Device>) -> GspResult<GspFile> {
        info!("open gsp device");
        device.verify().map_err(|e| {
            error!("open error gsp device");
            GspError::InvalidArgument(e.to_string())
        })?;
        Ok(GspFile { device })
    }

    /// Device behind the handle
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Read stub
    pub fn read(&self, _buf: &mut [u8]) -> isize {
        1
    }

    /// Write stub
    pub fn write(&self, _buf: &[u8]) -> isize {
        1
    }

    /// Dispatch one ioctl; failures carry the negated errno via [`GspError::errno`]
    pub fn ioctl(&self, cmd: u32, arg: &mut dyn UserMemory) -> GspResult<i32> {
        let request = GspRequest::decode(cmd)?;
        if let Err(e) = self.device.verify() {
            error!("ioctl with err dev");
            return Err(GspError::BadDevice(e.to_string()));
        }

        match request {
            GspRequest::GetCapability { size } => self.get_capability(size, arg),
            GspRequest::Trigger(req) => self.trigger(req, arg),
            GspRequest::Unknown { opcode } => {
                warn!("unknown cmd, opcode 0x{:02x}", opcode);
                Ok(0)
            }
        }
    }

    fn get_capability(&self, size: usize, arg: &mut dyn UserMemory) -> GspResult<i32> {
        if size < CAPABILITY_SIZE {
            error!("size: {} less than request: {}", size, CAPABILITY_SIZE);
            return Err(GspError::InvalidArgument(format!(
                "capability buffer of {} bytes, need {}",
                size, CAPABILITY_SIZE
            )));
        }
        let capa: Capability = self.device.get_capability().map_err(|e| {
            error!("get capability error");
            e
        })?;
        arg.copy_to_user(0, &capa.to_bytes()).map_err(|e| {
            error!("get capability error: {}", e);
            GspError::Io(io::Error::new(io::ErrorKind::Other, e.to_string()))
        })?;
        Ok(0)
    }

    fn trigger(&self, req: TriggerRequest, arg: &mut dyn UserMemory) -> GspResult<i32> {
        let dev = &self.device;
        debug!("async: {}, split: {}, cnt: {}", req.is_async, req.split, req.cnt);
        if req.cnt < 1 || req.cnt > dev.io_cnt() {
            error!("request error number kcfgs");
            return Err(GspError::InvalidArgument(format!(
                "kcfg count {} outside 1..={}",
                req.cnt,
                dev.io_cnt()
            )));
        }
        if req.size < BASE_CFG_SIZE {
            error!("error base cfg size: {}", req.size);
            return Err(GspError::InvalidArgument(format!("base cfg size {}", req.size)));
        }

        let mut list = KcfgList::new(req.is_async, req.split, req.size, req.cnt as usize);

        if let Err(e) = list.acquire(dev) {
            error!("kcfg list acquire failed");
            if !list.is_empty() {
                list.put();
            }
            return Err(e);
        }

        if let Err(e) = list.fill(&*arg) {
            error!("kcfg list fill failed");
            list.put();
            return Err(e);
        }

        if let Err(e) = list.push() {
            error!("kcfg list push failed");
            list.release();
            list.put();
            return Err(e);
        }

        if dev.is_suspending() || dev.is_suspend() {
            let resumed = dev.pm_runtime_get_sync().and_then(|_| {
                let waited = dev.resume_wait();
                dev.pm_runtime_put_autosuspend();
                waited
            });
            if let Err(e) = resumed {
                error!("device did not resume for kcfg list: {}", e);
                list.release();
                list.put();
                return Err(e);
            }
        } else {
            dev.mark_last_busy();
        }

        if dev.is_suspend() {
            info!("no need to process kcfg at suspend state");
        }
        dev.start_work();

        if !list.is_async() {
            if let Err(e) = list.wait(dev.config().kcfg_wait) {
                error!("kcfg list wait failed: {}", e);
                list.release();
                list.put();
                return Err(e);
            }
        }
        Ok(0)
    }
}
