//! GSP device: core collection, interface and the suspend/resume sequences

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dt::DeviceNode;
use crate::error::{GspError, GspResult};

use super::capability::Capability;
use super::core::{Core, CoreStatus, SuspendState};
use super::interface::Interface;
use super::ops::CoreOps;
use super::pm::RuntimePm;
use super::{DriverConfig, GSP_DEVICE_NAME, GSP_MAX_IO_CNT};

/// Lifecycle phase of a [`Device`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DevicePhase {
    /// Cores constructed, nothing running
    Allocated,
    /// Cores running, interface prepared
    Initialized,
    /// Torn down
    Deinitialized,
}

/// Serializable snapshot of a device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    /// Device name
    pub name: String,
    /// Compatible string
    pub compatible: String,
    /// Lifecycle phase
    pub phase: DevicePhase,
    /// `core-cnt`
    pub core_cnt: u32,
    /// `io-cnt`
    pub io_cnt: u32,
    /// All cores idle
    pub idle: bool,
    /// Any core suspended
    pub suspended: bool,
    /// Interface clocks enabled
    pub prepared: bool,
    /// Runtime PM reports the device suspended
    pub runtime_suspended: bool,
    /// Per-core snapshots
    pub cores: Vec<CoreStatus>,
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
}

/// One GSP hardware instance
#[derive(Debug)]
pub struct Device {
    name: String,
    compatible: String,
    core_cnt: u32,
    io_cnt: u32,
    ops: &'static CoreOps,
    cores: Vec<Arc<Core>>,
    interface: Interface,
    config: DriverConfig,
    phase: Mutex<DevicePhase>,
    reporting: AtomicBool,
    pm: RuntimePm,
}

impl Device {
    /// Read the node, resolve the operations table and build every core
    pub fn alloc(node: &DeviceNode, config: DriverConfig) -> GspResult<Arc<Device>> {
        let core_cnt = node.read_core_cnt().map_err(|e| {
            error!("{}", e);
            e
        })?;
        info!("node count: {}", core_cnt);
        let name = node.read_name().map_err(|e| {
            error!("{}", e);
            e
        })?;
        info!("gsp device name: {}", name);
        let io_cnt = node.read_io_cnt().map_err(|e| {
            error!("{}", e);
            e
        })?;
        info!("io count: {}", io_cnt);

        if name != GSP_DEVICE_NAME {
            error!("unexpected device name {}", name);
            return Err(GspError::BadDevice(format!("unexpected device name {}", name)));
        }
        if core_cnt == 0 || core_cnt as usize != node.cores.len() {
            error!("core-cnt {} does not match {} core node(s)", core_cnt, node.cores.len());
            return Err(GspError::Config(format!(
                "core-cnt {} but {} core node(s)",
                core_cnt,
                node.cores.len()
            )));
        }
        if io_cnt == 0 || io_cnt > GSP_MAX_IO_CNT {
            error!("io count {} out of range", io_cnt);
            return Err(GspError::Config(format!("io-cnt {} out of range", io_cnt)));
        }

        let ops = CoreOps::lookup(&node.compatible).ok_or_else(|| {
            error!("find core ops failed for {}", node.compatible);
            GspError::NoMatch(node.compatible.clone())
        })?;

        let mut failure = None;
        let dev = Arc::new_cyclic(|weak| {
            let mut cores = Vec::with_capacity(core_cnt as usize);
            for i in 0..core_cnt as usize {
                let built = node
                    .parse_phandle(i)
                    .ok_or_else(|| GspError::Config(format!("parse core[{}] phandle failed", i)))
                    .and_then(|child| Core::alloc(ops, child, weak.clone(), config.job_latency));
                match built {
                    Ok(core) => {
                        info!("core[{}] allocate success", core.id());
                        cores.push(core);
                    }
                    Err(e) => {
                        error!("core[{}] allocate failed: {}", i, e);
                        failure = Some(e);
                        break;
                    }
                }
            }
            Device {
                name,
                compatible: node.compatible.clone(),
                core_cnt,
                io_cnt,
                ops,
                cores,
                interface: Interface::new(),
                pm: RuntimePm::new(config.autosuspend_delay),
                config,
                phase: Mutex::new(DevicePhase::Allocated),
                reporting: AtomicBool::new(false),
            }
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(dev),
        }
    }

    /// Bring up the reporting surface, the interface and every core
    pub fn init(&self) -> GspResult<()> {
        self.verify()?;
        self.reporting.store(true, Ordering::Release);
        self.interface.attach(&self.name)?;

        for (index, core) in self.cores.iter().enumerate() {
            core.init().map_err(|e| {
                error!("init core[{}] failed: {}", core.id(), e);
                GspError::Hardware(format!("init core at index {} failed: {}", index, e))
            })?;
            info!("initialize core[{}] success", core.id());
        }

        self.prepare()?;
        *self.phase.lock() = DevicePhase::Initialized;
        Ok(())
    }

    /// [`Device::alloc`] then [`Device::init`]; a failed init is torn down
    pub fn alloc_and_init(node: &DeviceNode, config: DriverConfig) -> GspResult<Arc<Device>> {
        let dev = Device::alloc(node, config).map_err(|e| {
            error!("dev alloc failed");
            e
        })?;
        if let Err(e) = dev.init() {
            error!("dev internal init failed: {}", e);
            dev.free_and_deinit();
            return Err(e);
        }
        Ok(dev)
    }

    /// Stop every core, detach the interface and drop the reporting surface
    pub fn deinit(&self) {
        for core in &self.cores {
            core.deinit();
        }
        self.interface.detach();
        self.reporting.store(false, Ordering::Release);
        *self.phase.lock() = DevicePhase::Deinitialized;
        debug!("{} deinitialized", self.name);
    }

    /// Full teardown; cores are released when the last handle drops
    pub fn free_and_deinit(&self) {
        self.deinit();
    }

    /// Check the device name
    pub fn verify(&self) -> GspResult<()> {
        if self.name != GSP_DEVICE_NAME {
            error!("device name {} does not verify", self.name);
            return Err(GspError::BadDevice(self.name.clone()));
        }
        Ok(())
    }

    /// Device name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compatible string the device was bound with
    pub fn compatible(&self) -> &str {
        &self.compatible
    }

    /// `core-cnt`
    pub fn core_cnt(&self) -> u32 {
        self.core_cnt
    }

    /// `io-cnt`: maximum kcfgs per trigger
    pub fn io_cnt(&self) -> u32 {
        self.io_cnt
    }

    /// Shared operations table
    pub fn ops(&self) -> &'static CoreOps {
        self.ops
    }

    /// Runtime tuning
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Lifecycle phase
    pub fn phase(&self) -> DevicePhase {
        *self.phase.lock()
    }

    /// Whether the auxiliary reporting surface is up
    pub fn is_reporting(&self) -> bool {
        self.reporting.load(Ordering::Acquire)
    }

    /// Clock/power interface
    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    pub(crate) fn pm(&self) -> &RuntimePm {
        &self.pm
    }

    /// Cores in node order
    pub fn cores(&self) -> &[Arc<Core>] {
        &self.cores
    }

    /// Core at `index`
    pub fn core(&self, index: usize) -> Option<&Arc<Core>> {
        self.cores.get(index)
    }

    /// Every core idle
    pub fn is_idle(&self) -> bool {
        self.cores.iter().all(|core| core.is_idle())
    }

    /// Any core suspended
    pub fn is_suspend(&self) -> bool {
        self.cores.iter().any(|core| core.is_suspend())
    }

    /// Every core suspended
    pub fn is_fully_suspended(&self) -> bool {
        !self.cores.is_empty() && self.cores.iter().all(|core| core.is_suspend())
    }

    /// Any core inside a suspend cycle
    pub fn is_suspending(&self) -> bool {
        self.cores.iter().any(|core| core.is_suspending())
    }

    /// Enable clocks and power domain
    pub fn prepare(&self) -> GspResult<()> {
        self.verify()?;
        if !self.interface.is_attached() {
            error!("gsp has not attached interface");
            return Err(GspError::BadDevice("interface not attached".to_string()));
        }
        self.interface.init().map_err(|e| {
            error!("gsp interface prepare failed");
            e
        })
    }

    /// Disable clocks and power domain
    pub fn unprepare(&self) {
        if self.verify().is_err() {
            return;
        }
        if !self.interface.is_attached() {
            error!("gsp has not attached interface");
            return;
        }
        if let Err(e) = self.interface.deinit() {
            error!("gsp interface unprepare failed: {}", e);
        }
    }

    /// Capability of core 0 with the device counts filled in
    pub fn get_capability(&self) -> GspResult<Capability> {
        self.verify()?;
        let core = self.core(0).ok_or_else(|| {
            error!("core ops has not been initialized");
            GspError::BadDevice("device has no core".to_string())
        })?;
        let mut capa = core.capability();
        capa.io_cnt = self.io_cnt;
        capa.core_cnt = self.core_cnt;
        Ok(capa)
    }

    /// Kick every idle core
    pub fn start_work(&self) {
        for core in &self.cores {
            if !core.is_idle() {
                continue;
            }
            debug!("gsp core[{}] is idle to start work", core.id());
            core.work();
        }
    }

    /// Block until every core in a suspend cycle has been resumed
    pub fn resume_wait(&self) -> GspResult<()> {
        for core in &self.cores {
            if !core.is_suspending() {
                continue;
            }
            core.resume_wait(self.config.resume_wait).map_err(|e| {
                error!("resume wait done fail!");
                e
            })?;
        }
        Ok(())
    }

    fn enter_suspending(&self) {
        for core in &self.cores {
            core.set_suspend_state(SuspendState::Begin);
        }
    }

    fn enter_suspend(&self) {
        for core in &self.cores {
            core.suspend();
        }
    }

    fn wait_suspend(&self) -> GspResult<()> {
        for core in &self.cores {
            let need_wait = !core.is_idle();
            core.set_suspend_state(SuspendState::Wait);
            if need_wait {
                core.suspend_wait(self.config.suspend_wait).map_err(|e| {
                    error!("gsp dev wait suspend fail: {}", e);
                    e
                })?;
            }
            core.suspend();
        }
        Ok(())
    }

    fn stop(&self) -> GspResult<()> {
        for core in &self.cores {
            core.stop()?;
        }
        if self.is_fully_suspended() {
            self.unprepare();
        }
        Ok(())
    }

    /// Return every core to normal operation after a failed suspend
    fn abort_suspend(&self) {
        for core in &self.cores {
            if core.is_suspend() {
                core.resume();
            }
            core.set_suspend_state(SuspendState::Exit);
            core.signal_resume_done();
        }
        self.start_work();
    }

    /// Quiesce every core; a second call while suspended is a no-op.
    ///
    /// A failed drain or stop aborts the cycle and leaves the device
    /// running, so later work is not blocked on a resume that never comes.
    pub fn suspend(&self) -> GspResult<()> {
        if self.is_suspend() {
            warn!("gsp dev already suspend, skip");
            return Ok(());
        }

        self.enter_suspending();
        if !self.is_idle() {
            if let Err(e) = self.wait_suspend() {
                warn!("{} suspend aborted: {}", self.name, e);
                self.abort_suspend();
                return Err(e);
            }
        } else {
            self.enter_suspend();
        }

        if let Err(e) = self.stop() {
            error!("stop device failed: {}", e);
            self.abort_suspend();
            return Err(e);
        }
        info!("{} suspended", self.name);
        Ok(())
    }

    /// Bring every core back and release threads blocked in [`Device::resume_wait`]
    pub fn resume(&self) -> GspResult<()> {
        let mut drained = true;
        for core in &self.cores {
            if core.is_suspend() {
                continue;
            }
            if let Err(e) = core.suspend_wait(self.config.suspend_wait) {
                error!("core[{}] suspend wait before resume: {}", core.id(), e);
                drained = false;
                break;
            }
        }
        if !drained {
            info!("resume wait not success, force exec resume");
        }

        self.prepare().map_err(|e| {
            error!("gsp dev resume prepare fail");
            e
        })?;

        for core in &self.cores {
            core.resume();
            core.set_suspend_state(SuspendState::Exit);
            core.signal_resume_done();
        }
        info!("{} resumed", self.name);

        self.start_work();
        Ok(())
    }

    /// Serializable snapshot
    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            name: self.name.clone(),
            compatible: self.compatible.clone(),
            phase: self.phase(),
            core_cnt: self.core_cnt,
            io_cnt: self.io_cnt,
            idle: self.is_idle(),
            suspended: self.is_suspend(),
            prepared: self.interface.is_prepared(),
            runtime_suspended: self.pm.is_runtime_suspended(),
            cores: self.cores.iter().map(|core| core.status()).collect(),
            timestamp: Utc::now(),
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        for core in &self.cores {
            core.deinit();
        }
    }
}
