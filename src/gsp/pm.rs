//! Runtime power management and the system sleep callbacks

use log::{debug, error, info};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::error::GspResult;

use super::dev::Device;

/// Runtime PM status of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RuntimeStatus {
    /// Powered and usable
    Active,
    /// Runtime suspend callback in progress
    Suspending,
    /// Powered down by runtime PM
    Suspended,
    /// Runtime resume in progress
    Resuming,
}

impl RuntimeStatus {
    fn is_transition(self) -> bool {
        matches!(self, RuntimeStatus::Suspending | RuntimeStatus::Resuming)
    }
}

#[derive(Debug)]
struct PmState {
    enabled: bool,
    status: RuntimeStatus,
    usage: u32,
    last_busy: Instant,
    autosuspend_delay: Duration,
    use_autosuspend: bool,
}

/// Runtime PM bookkeeping of one device
#[derive(Debug)]
pub struct RuntimePm {
    state: Mutex<PmState>,
    changed: Condvar,
}

impl RuntimePm {
    /// Disabled, suspended bookkeeping with the given autosuspend delay
    pub fn new(autosuspend_delay: Duration) -> Self {
        Self {
            state: Mutex::new(PmState {
                enabled: false,
                status: RuntimeStatus::Suspended,
                usage: 0,
                last_busy: Instant::now(),
                autosuspend_delay,
                use_autosuspend: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Mark the device active without running a callback
    pub fn set_active(&self) {
        self.set_status(RuntimeStatus::Active);
    }

    /// Allow runtime transitions
    pub fn enable(&self) {
        self.state.lock().enabled = true;
    }

    /// Forbid runtime transitions
    pub fn disable(&self) {
        self.state.lock().enabled = false;
    }

    /// Whether runtime transitions are allowed
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Change the autosuspend delay
    pub fn set_autosuspend_delay(&self, delay: Duration) {
        self.state.lock().autosuspend_delay = delay;
    }

    /// Opt into delayed autosuspend
    pub fn use_autosuspend(&self) {
        self.state.lock().use_autosuspend = true;
    }

    /// Runtime status is suspended
    pub fn is_runtime_suspended(&self) -> bool {
        let state = self.state.lock();
        state.enabled && state.status == RuntimeStatus::Suspended
    }

    /// Current runtime status
    pub fn status(&self) -> RuntimeStatus {
        self.state.lock().status
    }

    /// Outstanding usage references
    pub fn usage(&self) -> u32 {
        self.state.lock().usage
    }

    /// Restart the autosuspend timer
    pub fn mark_last_busy(&self) {
        self.state.lock().last_busy = Instant::now();
    }

    fn set_status(&self, status: RuntimeStatus) {
        self.state.lock().status = status;
        self.changed.notify_all();
    }

    /// Claim the suspend transition; `false` when already suspended
    fn begin_suspend(&self) -> bool {
        let mut state = self.state.lock();
        while state.status.is_transition() {
            self.changed.wait(&mut state);
        }
        if state.status == RuntimeStatus::Suspended {
            return false;
        }
        state.status = RuntimeStatus::Suspending;
        true
    }

    /// Take a reference once no transition is in flight.
    ///
    /// Returns `true` when the caller must run the resume callback; the
    /// status is then already `Resuming`.
    fn get(&self) -> bool {
        let mut state = self.state.lock();
        state.usage += 1;
        while state.status.is_transition() {
            self.changed.wait(&mut state);
        }
        if state.enabled && state.status == RuntimeStatus::Suspended {
            state.status = RuntimeStatus::Resuming;
            return true;
        }
        false
    }

    fn put(&self) {
        let mut state = self.state.lock();
        state.usage = state.usage.saturating_sub(1);
    }

    fn autosuspend_due(&self) -> bool {
        let state = self.state.lock();
        state.enabled
            && state.status == RuntimeStatus::Active
            && state.use_autosuspend
            && state.usage == 0
            && state.last_busy.elapsed() >= state.autosuspend_delay
    }
}

impl Device {
    /// System sleep entry; skipped when runtime PM already suspended us
    pub fn pm_suspend(&self) -> GspResult<()> {
        if self.pm().is_runtime_suspended() {
            debug!("{} runtime suspended, skip system suspend", self.name());
            return Ok(());
        }
        self.suspend()
    }

    /// System sleep exit; re-marks the device active for runtime PM
    pub fn pm_resume(&self) -> GspResult<()> {
        if self.pm().is_runtime_suspended() {
            return Ok(());
        }
        let ret = self.resume();
        let pm = self.pm();
        pm.disable();
        pm.set_active();
        pm.enable();
        ret
    }

    /// Runtime status of the device
    pub fn runtime_status(&self) -> RuntimeStatus {
        self.pm().status()
    }

    /// Runtime suspend callback.
    ///
    /// The status reads `Suspending` for the whole drain, so a concurrent
    /// [`Device::pm_runtime_get_sync`] waits and resumes afterwards. A
    /// failed suspend leaves the device active.
    pub fn runtime_suspend(&self) -> GspResult<()> {
        let pm = self.pm();
        if !pm.begin_suspend() {
            debug!("{} already runtime suspended", self.name());
            return Ok(());
        }
        match self.suspend() {
            Ok(()) => {
                pm.set_status(RuntimeStatus::Suspended);
                Ok(())
            }
            Err(e) => {
                error!("runtime suspend failed: {}", e);
                pm.set_status(RuntimeStatus::Active);
                Err(e)
            }
        }
    }

    /// Runtime resume callback
    pub fn runtime_resume(&self) -> GspResult<()> {
        let pm = self.pm();
        pm.set_status(RuntimeStatus::Resuming);
        match self.resume() {
            Ok(()) => {
                pm.set_status(RuntimeStatus::Active);
                Ok(())
            }
            Err(e) => {
                pm.set_status(RuntimeStatus::Suspended);
                Err(e)
            }
        }
    }

    /// Runtime idle callback; always allows the suspend
    pub fn runtime_idle(&self) -> i32 {
        0
    }

    /// Take a usage reference and resume synchronously if needed.
    ///
    /// An in-flight runtime suspend is waited out first.
    pub fn pm_runtime_get_sync(&self) -> GspResult<()> {
        let pm = self.pm();
        pm.mark_last_busy();
        if pm.get() {
            info!("{} runtime resume on demand", self.name());
            if let Err(e) = self.runtime_resume() {
                error!("runtime resume failed: {}", e);
                pm.put();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Drop a usage reference and restart the autosuspend timer
    pub fn pm_runtime_put_autosuspend(&self) {
        let pm = self.pm();
        pm.mark_last_busy();
        pm.put();
    }

    /// Restart the autosuspend timer
    pub fn mark_last_busy(&self) {
        self.pm().mark_last_busy();
    }

    /// Runtime suspend when idle past the autosuspend delay.
    ///
    /// Returns whether a suspend happened.
    pub fn autosuspend_if_expired(&self) -> GspResult<bool> {
        if !self.pm().autosuspend_due() || !self.is_idle() {
            return Ok(false);
        }
        if self.runtime_idle() != 0 {
            return Ok(false);
        }
        self.runtime_suspend()?;
        info!("{} autosuspended", self.name());
        Ok(true)
    }
}
