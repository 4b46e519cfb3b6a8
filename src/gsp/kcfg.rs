//! Kernel configuration entries and per-ioctl kcfg lists
//!
//! One trigger ioctl builds one [`KcfgList`] and walks it through
//! acquire → fill → push → (wait) → release/put. Each entry occupies one
//! slot of its core's [`KcfgPool`] until the last reference is dropped.

use log::{debug, error, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{GspError, GspResult};
use crate::sync::{Completion, WaitError};
use crate::user::UserMemory;

use super::core::Core;
use super::dev::Device;

/// Bounded pool of kcfg slots owned by one core
#[derive(Debug)]
pub struct KcfgPool {
    capacity: usize,
    free: Mutex<usize>,
}

impl KcfgPool {
    /// Pool with `capacity` free slots
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self { capacity, free: Mutex::new(capacity) })
    }

    /// Take one slot, or `None` when the pool is exhausted
    pub fn try_acquire(self: &Arc<Self>) -> Option<KcfgSlot> {
        let mut free = self.free.lock();
        if *free == 0 {
            return None;
        }
        *free -= 1;
        Some(KcfgSlot { pool: Arc::clone(self) })
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        *self.free.lock()
    }

    /// Total slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// One occupied pool slot; returned on drop
#[derive(Debug)]
pub struct KcfgSlot {
    pool: Arc<KcfgPool>,
}

impl Drop for KcfgSlot {
    fn drop(&mut self) {
        let mut free = self.pool.free.lock();
        *free = (*free + 1).min(self.pool.capacity);
    }
}

/// Completion state of one kcfg entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KcfgStatus {
    /// Not finished yet
    Pending,
    /// Executed by the hardware
    Done,
    /// Rejected by the core; negated errno
    Failed(i32),
    /// Withdrawn before execution
    Cancelled,
}

/// Shared countdown that fires once when every entry of a list finished
#[derive(Debug)]
struct ListTracker {
    remaining: AtomicUsize,
    fires: AtomicUsize,
    done: Completion,
}

impl ListTracker {
    fn entry_finished(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.fires.fetch_add(1, Ordering::AcqRel);
            self.done.complete();
        }
    }
}

/// One user-submitted job descriptor
#[derive(Debug)]
pub struct Kcfg {
    index: usize,
    core_id: u32,
    payload: Mutex<Vec<u8>>,
    started: AtomicBool,
    status: Mutex<KcfgStatus>,
    done: Completion,
    tracker: Arc<ListTracker>,
    _slot: KcfgSlot,
}

impl Kcfg {
    /// Position within the submitting list
    pub fn index(&self) -> usize {
        self.index
    }

    /// Core the entry was assigned to
    pub fn core_id(&self) -> u32 {
        self.core_id
    }

    /// Copy of the payload
    pub fn payload(&self) -> Vec<u8> {
        self.payload.lock().clone()
    }

    /// Current status
    pub fn status(&self) -> KcfgStatus {
        self.status.lock().clone()
    }

    /// Whether the entry has been handed to the hardware
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Claim the entry for execution; false if it was already claimed
    pub(crate) fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    /// Record the final status; only the first call has any effect
    pub(crate) fn finish(&self, status: KcfgStatus) -> bool {
        {
            let mut current = self.status.lock();
            if *current != KcfgStatus::Pending {
                warn!(
                    "kcfg[{}] on core[{}] already finished as {:?}",
                    self.index, self.core_id, *current
                );
                return false;
            }
            *current = status;
        }
        self.done.complete();
        self.tracker.entry_finished();
        true
    }

    /// Block until the entry finishes
    pub fn wait(&self, timeout: Duration) -> GspResult<KcfgStatus> {
        self.done
            .wait_timeout(timeout)
            .map_err(|e| wait_failure(e, &format!("kcfg[{}]", self.index)))?;
        Ok(self.status())
    }
}

fn wait_failure(err: WaitError, what: &str) -> GspError {
    match err {
        WaitError::Timeout => GspError::Timeout(format!("{} wait", what)),
        WaitError::Interrupted => GspError::Interrupted(format!("{} wait", what)),
    }
}

/// Batch of kcfg entries created by one trigger
#[derive(Debug)]
pub struct KcfgList {
    is_async: bool,
    split: bool,
    size: usize,
    cnt: usize,
    tracker: Arc<ListTracker>,
    entries: Vec<(Arc<Core>, Arc<Kcfg>)>,
    pushed: usize,
}

impl KcfgList {
    /// Empty list for `cnt` entries of `size` bytes
    pub fn new(is_async: bool, split: bool, size: usize, cnt: usize) -> Self {
        Self {
            is_async,
            split,
            size,
            cnt,
            tracker: Arc::new(ListTracker {
                remaining: AtomicUsize::new(cnt),
                fires: AtomicUsize::new(0),
                done: Completion::new(),
            }),
            entries: Vec::with_capacity(cnt),
            pushed: 0,
        }
    }

    /// Asynchronous submission
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Entries spread across cores
    pub fn is_split(&self) -> bool {
        self.split
    }

    /// Acquired entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entry acquired
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Acquired entries in submission order
    pub fn entries(&self) -> impl Iterator<Item = &Arc<Kcfg>> {
        self.entries.iter().map(|(_, kcfg)| kcfg)
    }

    /// How many times the whole-list completion has fired
    pub fn completion_fires(&self) -> usize {
        self.tracker.fires.load(Ordering::Acquire)
    }

    fn targets(&self, dev: &Device) -> GspResult<Vec<Arc<Core>>> {
        let cores = dev.cores();
        if cores.is_empty() {
            return Err(GspError::BadDevice("device has no core".to_string()));
        }
        if self.split {
            return Ok((0..self.cnt).map(|i| Arc::clone(&cores[i % cores.len()])).collect());
        }
        // a non-split list stays on one core, in order
        let core = cores
            .iter()
            .min_by_key(|core| core.load())
            .map(Arc::clone)
            .ok_or_else(|| GspError::BadDevice("device has no core".to_string()))?;
        Ok(vec![core; self.cnt])
    }

    /// Reserve one slot and one payload buffer per entry.
    ///
    /// On failure the entries acquired so far stay in the list; the
    /// caller returns them with [`KcfgList::put`].
    pub fn acquire(&mut self, dev: &Device) -> GspResult<()> {
        for (index, core) in self.targets(dev)?.into_iter().enumerate() {
            let slot = core.pool().try_acquire().ok_or_else(|| {
                error!("core[{}] has no free kcfg for entry {}", core.id(), index);
                GspError::Busy(format!("core[{}] kcfg pool exhausted", core.id()))
            })?;
            let mut payload = Vec::new();
            payload
                .try_reserve_exact(self.size)
                .map_err(|e| GspError::NoMemory(format!("kcfg payload: {}", e)))?;
            payload.resize(self.size, 0);

            let kcfg = Arc::new(Kcfg {
                index,
                core_id: core.id(),
                payload: Mutex::new(payload),
                started: AtomicBool::new(false),
                status: Mutex::new(KcfgStatus::Pending),
                done: Completion::new(),
                tracker: Arc::clone(&self.tracker),
                _slot: slot,
            });
            self.entries.push((core, kcfg));
        }
        debug!("acquired {} kcfg(s), split: {}", self.entries.len(), self.split);
        Ok(())
    }

    /// Copy every entry's payload from user memory
    pub fn fill(&mut self, user: &dyn UserMemory) -> GspResult<()> {
        for (_, kcfg) in &self.entries {
            let mut payload = kcfg.payload.lock();
            user.copy_from_user(kcfg.index * self.size, &mut payload[..])
                .map_err(|e| {
                    error!("kcfg[{}] copy from user failed: {}", kcfg.index, e);
                    e
                })?;
        }
        Ok(())
    }

    /// Queue every entry on its core
    pub fn push(&mut self) -> GspResult<()> {
        while self.pushed < self.entries.len() {
            let (core, kcfg) = &self.entries[self.pushed];
            core.enqueue(Arc::clone(kcfg))?;
            self.pushed += 1;
        }
        Ok(())
    }

    /// Block until every entry finished, then report the first failure
    pub fn wait(&self, timeout: Duration) -> GspResult<()> {
        self.tracker
            .done
            .wait_timeout(timeout)
            .map_err(|e| wait_failure(e, "kcfg list"))?;
        for kcfg in self.entries() {
            match kcfg.status() {
                KcfgStatus::Done => {}
                KcfgStatus::Failed(errno) => {
                    return Err(GspError::Hardware(format!(
                        "kcfg[{}] failed on core[{}] with {}",
                        kcfg.index, kcfg.core_id, errno
                    )))
                }
                status => {
                    return Err(GspError::Hardware(format!(
                        "kcfg[{}] ended as {:?}",
                        kcfg.index, status
                    )))
                }
            }
        }
        Ok(())
    }

    /// Withdraw pushed entries that have not started yet
    pub fn release(&mut self) {
        for (core, kcfg) in &self.entries[..self.pushed] {
            if core.withdraw(kcfg) {
                kcfg.finish(KcfgStatus::Cancelled);
            }
        }
        self.pushed = 0;
    }

    /// Drop every entry; slots return once no core references them
    pub fn put(&mut self) {
        self.entries.clear();
        self.pushed = 0;
    }
}
