//! Clock / power-domain attachment of a GSP device

use log::{debug, error};
use parking_lot::Mutex;

use crate::error::{GspError, GspResult};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct InterfaceState {
    attached: bool,
    prepared: bool,
    prepare_count: u32,
}

/// Power/clock interface of one device
#[derive(Debug, Default)]
pub struct Interface {
    owner: Mutex<String>,
    state: Mutex<InterfaceState>,
}

impl Interface {
    /// Detached interface
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to the named device
    pub fn attach(&self, owner: &str) -> GspResult<()> {
        let mut state = self.state.lock();
        if state.attached {
            error!("interface already attached to {}", self.owner.lock());
            return Err(GspError::Busy("interface already attached".to_string()));
        }
        *self.owner.lock() = owner.to_string();
        state.attached = true;
        debug!("interface attached to {}", owner);
        Ok(())
    }

    /// Detach; an enabled interface is disabled first
    pub fn detach(&self) {
        let mut state = self.state.lock();
        if state.prepared {
            debug!("detaching a prepared interface, gating clocks");
        }
        *state = InterfaceState::default();
        self.owner.lock().clear();
    }

    /// Whether [`Interface::attach`] succeeded
    pub fn is_attached(&self) -> bool {
        self.state.lock().attached
    }

    /// Whether clocks and power domain are currently enabled
    pub fn is_prepared(&self) -> bool {
        self.state.lock().prepared
    }

    /// How many times the interface has been enabled since attach
    pub fn prepare_count(&self) -> u32 {
        self.state.lock().prepare_count
    }

    /// Enable clocks and power domain
    pub fn init(&self) -> GspResult<()> {
        let mut state = self.state.lock();
        if !state.attached {
            return Err(GspError::BadDevice("interface not attached".to_string()));
        }
        state.prepared = true;
        state.prepare_count += 1;
        Ok(())
    }

    /// Disable clocks and power domain
    pub fn deinit(&self) -> GspResult<()> {
        let mut state = self.state.lock();
        if !state.attached {
            return Err(GspError::BadDevice("interface not attached".to_string()));
        }
        state.prepared = false;
        Ok(())
    }
}
