//! One GSP execution pipe
//!
//! A core owns its register window, a queue of pending kcfgs, the idle
//! flag, the suspend state and the two completions used to rendezvous
//! with the power-management path. A worker thread stands in for the
//! hardware: it waits out the job latency, raises the done interrupt and
//! runs the interrupt handler.

use log::{debug, error, info, warn};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::dt::CoreNode;
use crate::error::{GspError, GspResult};
use crate::regs::{RegisterFile, RegisterSpace};
use crate::sync::{Completion, WaitError};

use super::capability::Capability;
use super::dev::Device;
use super::kcfg::{Kcfg, KcfgPool, KcfgStatus};
use super::ops::{CoreOps, INT_DONE_RAW};
use super::revisions::HwRevision;

/// Position of a core in the suspend/resume cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SuspendState {
    /// Running normally; also the state after resume
    Exit,
    /// Suspend requested, no new work is started
    Begin,
    /// Waiting for the running job to drain
    Wait,
}

impl SuspendState {
    fn rank(self) -> u8 {
        match self {
            SuspendState::Exit => 0,
            SuspendState::Begin => 1,
            SuspendState::Wait => 2,
        }
    }
}

#[derive(Debug)]
struct CoreState {
    suspend_state: SuspendState,
    suspended: bool,
    idle: bool,
    enabled: bool,
    initialized: bool,
    shutdown: bool,
    pending: VecDeque<Arc<Kcfg>>,
    running: Option<Arc<Kcfg>>,
    jobs_done: u64,
}

/// Serializable snapshot of a core
#[derive(Debug, Clone, Serialize)]
pub struct CoreStatus {
    /// Core id
    pub id: u32,
    /// Hardware revision
    pub revision: HwRevision,
    /// Suspend state
    pub suspend_state: SuspendState,
    /// Suspended flag
    pub suspended: bool,
    /// Idle flag
    pub idle: bool,
    /// Clock enabled
    pub enabled: bool,
    /// Kcfgs waiting to run
    pub pending: usize,
    /// Kcfgs executed since init
    pub jobs_done: u64,
    /// Free kcfg slots
    pub free_kcfgs: usize,
}

/// One hardware execution unit
#[derive(Debug)]
pub struct Core {
    id: u32,
    ops: &'static CoreOps,
    regs: RegisterFile,
    pool: Arc<KcfgPool>,
    parent: Weak<Device>,
    latency: Duration,
    state: Mutex<CoreState>,
    kick: Condvar,
    suspend_done: Completion,
    resume_done: Completion,
    worker: Mutex<Option<JoinHandle<()>>>,
}

fn wait_failure(err: WaitError, id: u32, what: &str) -> GspError {
    match err {
        WaitError::Timeout => {
            error!("core[{}] {} wait timeout", id, what);
            GspError::Timeout(format!("core[{}] {} wait", id, what))
        }
        WaitError::Interrupted => {
            error!("core[{}] interrupted in {} wait", id, what);
            GspError::Interrupted(format!("core[{}] {} wait", id, what))
        }
    }
}

impl Core {
    /// Parse `node` and allocate a core bound to `ops`
    pub fn alloc(
        ops: &'static CoreOps,
        node: &CoreNode,
        parent: Weak<Device>,
        latency: Duration,
    ) -> GspResult<Arc<Core>> {
        let params = ops.parse_dt(node)?;
        let regs = ops.alloc(&params)?;
        Ok(Arc::new(Core {
            id: params.id,
            ops,
            regs,
            pool: KcfgPool::new(params.kcfg_num as usize),
            parent,
            latency,
            state: Mutex::new(CoreState {
                suspend_state: SuspendState::Exit,
                suspended: false,
                idle: true,
                enabled: false,
                initialized: false,
                shutdown: false,
                pending: VecDeque::new(),
                running: None,
                jobs_done: 0,
            }),
            kick: Condvar::new(),
            suspend_done: Completion::new(),
            resume_done: Completion::new(),
            worker: Mutex::new(None),
        }))
    }

    /// Core id
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Shared operations table
    pub fn ops(&self) -> &'static CoreOps {
        self.ops
    }

    /// Register window
    pub fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    /// Kcfg slot pool
    pub fn pool(&self) -> &Arc<KcfgPool> {
        &self.pool
    }

    /// Owning device, while it is alive
    pub fn parent(&self) -> Option<Arc<Device>> {
        self.parent.upgrade()
    }

    /// Static capability of this core
    pub fn capability(&self) -> Capability {
        self.ops.capability()
    }

    /// Check that the core is initialized and not torn down
    pub fn verify(&self) -> GspResult<()> {
        let state = self.state.lock();
        if !state.initialized || state.shutdown {
            return Err(GspError::BadDevice(format!("core[{}] not initialized", self.id)));
        }
        Ok(())
    }

    /// Initialize the register window and start the hardware worker
    pub fn init(self: &Arc<Self>) -> GspResult<()> {
        self.ops.init(&self.regs)?;
        self.ops.enable(&self.regs);
        {
            let mut state = self.state.lock();
            state.initialized = true;
            state.enabled = true;
            state.shutdown = false;
        }

        let core = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(format!("gsp-core{}", self.id))
            .spawn(move || core.worker_loop())?;
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// Stop the worker and cancel every queued or running kcfg
    pub fn deinit(&self) {
        let (running, pending) = {
            let mut state = self.state.lock();
            if !state.initialized && state.shutdown {
                return;
            }
            state.shutdown = true;
            state.initialized = false;
            state.idle = true;
            self.kick.notify_all();
            (state.running.take(), std::mem::take(&mut state.pending))
        };
        for kcfg in running.into_iter().chain(pending) {
            kcfg.finish(KcfgStatus::Cancelled);
        }

        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                error!("core[{}] worker panicked", self.id);
            }
        }
        self.ops.disable(&self.regs);
        self.state.lock().enabled = false;
        debug!("core[{}] deinitialized", self.id);
    }

    /// Idle flag: no job on the hardware
    pub fn is_idle(&self) -> bool {
        self.state.lock().idle
    }

    /// Suspended flag
    pub fn is_suspend(&self) -> bool {
        self.state.lock().suspended
    }

    /// Current suspend state
    pub fn suspend_state(&self) -> SuspendState {
        self.state.lock().suspend_state
    }

    /// Whether a suspend cycle is in progress
    pub fn is_suspending(&self) -> bool {
        self.suspend_state() != SuspendState::Exit
    }

    /// Queued plus running kcfgs
    pub fn load(&self) -> usize {
        let state = self.state.lock();
        state.pending.len() + state.running.is_some() as usize
    }

    /// Move to `next`; a backward step inside one cycle is ignored
    pub fn set_suspend_state(&self, next: SuspendState) {
        let mut state = self.state.lock();
        let current = state.suspend_state;
        if next != SuspendState::Exit && next.rank() < current.rank() {
            warn!(
                "core[{}] refusing suspend state {:?} -> {:?}",
                self.id, current, next
            );
            return;
        }
        if current == SuspendState::Exit && next == SuspendState::Begin {
            // new cycle: drop signals left over from the previous one
            self.suspend_done.reinit();
            self.resume_done.reinit();
        }
        state.suspend_state = next;
        debug!("core[{}] suspend state {:?} -> {:?}", self.id, current, next);
    }

    /// Mark the core suspended
    pub fn suspend(&self) {
        self.state.lock().suspended = true;
        debug!("core[{}] suspended", self.id);
    }

    /// Block until the running job drained, then re-arm
    pub fn suspend_wait(&self, timeout: Duration) -> GspResult<()> {
        self.suspend_done
            .wait_timeout(timeout)
            .map_err(|e| wait_failure(e, self.id, "suspend"))?;
        self.suspend_done.reinit();
        debug!("core[{}] suspend wait success", self.id);
        Ok(())
    }

    /// Block until the resume path signalled, then re-arm
    pub fn resume_wait(&self, timeout: Duration) -> GspResult<()> {
        self.resume_done
            .wait_timeout(timeout)
            .map_err(|e| wait_failure(e, self.id, "resume"))?;
        self.resume_done.reinit();
        debug!("core[{}] resume wait success", self.id);
        Ok(())
    }

    /// Signal threads blocked in [`Core::resume_wait`]
    pub fn signal_resume_done(&self) {
        self.resume_done.complete();
    }

    /// Deliver a "signal" to every thread waiting on this core
    pub fn interrupt_waiters(&self) {
        self.suspend_done.interrupt();
        self.resume_done.interrupt();
    }

    /// Quiesce the hardware; fails while a job is still on the pipe
    pub fn stop(&self) -> GspResult<()> {
        let mut state = self.state.lock();
        if state.running.is_some() {
            error!("core[{}] stop with a job in flight", self.id);
            return Err(GspError::Busy(format!("core[{}] busy", self.id)));
        }
        self.ops.disable(&self.regs);
        state.enabled = false;
        Ok(())
    }

    /// Re-enable and reset the hardware after a suspend
    pub fn resume(&self) {
        let mut state = self.state.lock();
        self.ops.enable(&self.regs);
        self.ops.reset(&self.regs);
        state.enabled = true;
        state.suspended = false;
        debug!("core[{}] resumed", self.id);
    }

    /// Queue a kcfg for execution
    pub fn enqueue(&self, kcfg: Arc<Kcfg>) -> GspResult<()> {
        let mut state = self.state.lock();
        if !state.initialized || state.shutdown {
            error!("core[{}] rejects kcfg[{}], not running", self.id, kcfg.index());
            return Err(GspError::BadDevice(format!("core[{}] not running", self.id)));
        }
        state.pending.push_back(kcfg);
        Ok(())
    }

    /// Remove `kcfg` from the queue if it has not started
    pub fn withdraw(&self, kcfg: &Arc<Kcfg>) -> bool {
        let mut state = self.state.lock();
        let before = state.pending.len();
        state.pending.retain(|queued| !Arc::ptr_eq(queued, kcfg));
        before != state.pending.len()
    }

    /// Start the next pending kcfg if the core is idle and not suspending
    pub fn work(&self) {
        if let Some(dev) = self.parent() {
            if dev.is_suspend() {
                debug!("core[{}] device suspended, work deferred", self.id);
                return;
            }
        }

        let mut state = self.state.lock();
        loop {
            if !state.initialized
                || state.shutdown
                || state.suspended
                || state.suspend_state != SuspendState::Exit
                || !state.idle
            {
                return;
            }
            let Some(kcfg) = state.pending.pop_front() else {
                return;
            };
            if !kcfg.mark_started() {
                warn!("core[{}] kcfg[{}] already executed, skipped", self.id, kcfg.index());
                continue;
            }

            match self.ops.copy_cfg(&self.regs, &kcfg.payload()) {
                Ok(cfg) => {
                    debug!(
                        "core[{}] kcfg[{}] tag {} with {} layer(s) triggered",
                        self.id,
                        kcfg.index(),
                        cfg.tag,
                        cfg.layer_num
                    );
                    self.ops.trigger(&self.regs);
                    state.idle = false;
                    state.running = Some(kcfg);
                    self.kick.notify_one();
                    return;
                }
                Err(e) => {
                    error!("core[{}] kcfg[{}] copy failed: {}", self.id, kcfg.index(), e);
                    kcfg.finish(KcfgStatus::Failed(e.errno()));
                }
            }
        }
    }

    fn worker_loop(self: Arc<Self>) {
        loop {
            {
                let mut state = self.state.lock();
                while state.running.is_none() && !state.shutdown {
                    self.kick.wait(&mut state);
                }
                if state.shutdown {
                    return;
                }
            }
            if !self.latency.is_zero() {
                thread::sleep(self.latency);
            }
            self.regs.owr(self.ops.layout().int_ctrl, INT_DONE_RAW);
            self.irq_handler();
        }
    }

    fn irq_handler(&self) {
        if !self.ops.intercept(&self.regs) {
            warn!("core[{}] spurious interrupt", self.id);
            return;
        }
        let finished = {
            let mut state = self.state.lock();
            let finished = state.running.take();
            state.idle = true;
            if finished.is_some() {
                state.jobs_done += 1;
            }
            finished
        };
        self.ops.release(&self.regs);
        if let Some(kcfg) = finished {
            kcfg.finish(KcfgStatus::Done);
        }

        if self.is_suspending() {
            debug!("core[{}] drained for suspend", self.id);
            self.suspend_done.complete();
            return;
        }
        self.work();
    }

    /// Log and return the significant registers
    pub fn dump(&self) -> Vec<(u32, u32)> {
        let regs = self.ops.dump(&self.regs);
        for (offset, value) in &regs {
            info!("core[{}] 0x{:03x}: 0x{:08x}", self.id, offset, value);
        }
        regs
    }

    /// Serializable snapshot
    pub fn status(&self) -> CoreStatus {
        let state = self.state.lock();
        CoreStatus {
            id: self.id,
            revision: self.ops.revision(),
            suspend_state: state.suspend_state,
            suspended: state.suspended,
            idle: state.idle,
            enabled: state.enabled,
            pending: state.pending.len(),
            jobs_done: state.jobs_done,
            free_kcfgs: self.pool.available(),
        }
    }
}
