//! Counted mutexes and semaphores (spec §4.5.2, §4.5.3): FIFO waiters with
//! direct ownership/permit handoff on release, so the next owner is decided
//! the instant the resource frees rather than by whoever next asks for it.

use std::collections::BTreeMap;
use std::collections::VecDeque;

use crate::error::{CoreError, CoreResult};
use crate::pcb::{Pid, MAX_NAME_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MutexId(pub u32);

impl std::fmt::Display for MutexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemId(pub u32);

impl std::fmt::Display for SemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One mutex. Like [`crate::ipc::Mailbox`], this holds only the data and the
/// FIFO waiter list; the actual OS-thread parking lives in
/// [`crate::kernel::Kernel`].
pub struct Mutex {
    pub id: MutexId,
    pub name: Option<heapless::String<MAX_NAME_LEN>>,
    owner_pid: Option<Pid>,
    waiters: VecDeque<Pid>,
    lock_count: u64,
    contention_count: u64,
}

impl Mutex {
    fn new(id: MutexId, name: Option<&str>) -> Self {
        Self {
            id,
            name: name.map(|n| heapless::String::try_from(n).unwrap_or_default()),
            owner_pid: None,
            waiters: VecDeque::new(),
            lock_count: 0,
            contention_count: 0,
        }
    }

    pub fn owner(&self) -> Option<Pid> {
        self.owner_pid
    }

    pub fn is_locked(&self) -> bool {
        self.owner_pid.is_some()
    }

    pub fn stats(&self) -> (u64, u64) {
        (self.lock_count, self.contention_count)
    }

    /// Non-blocking acquire. Succeeds only when unheld.
    pub fn try_lock(&mut self, pid: Pid) -> CoreResult<()> {
        if self.owner_pid.is_some() {
            return Err(CoreError::Busy);
        }
        self.owner_pid = Some(pid);
        self.lock_count += 1;
        Ok(())
    }

    /// Record that `pid` is about to block waiting for this mutex.
    pub fn push_waiter(&mut self, pid: Pid) {
        self.contention_count += 1;
        self.waiters.push_back(pid);
    }

    /// Release the mutex. If anyone was waiting, ownership is handed
    /// directly to the FIFO head — that PCB never re-contends for the lock,
    /// it simply wakes up already owning it.
    pub fn unlock(&mut self, pid: Pid) -> CoreResult<Option<Pid>> {
        if self.owner_pid != Some(pid) {
            return if self.owner_pid.is_none() {
                Err(CoreError::NotLocked)
            } else {
                Err(CoreError::NotOwner)
            };
        }
        match self.waiters.pop_front() {
            Some(next) => {
                self.owner_pid = Some(next);
                self.lock_count += 1;
                Ok(Some(next))
            }
            None => {
                self.owner_pid = None;
                Ok(None)
            }
        }
    }

    pub fn cancel_wait(&mut self, pid: Pid) {
        self.waiters.retain(|&p| p != pid);
    }
}

/// One counted semaphore: `value` can go negative while tracking how many
/// PCBs are parked on a zero permit count.
pub struct Semaphore {
    pub id: SemId,
    pub name: Option<heapless::String<MAX_NAME_LEN>>,
    value: i64,
    waiters: VecDeque<Pid>,
    waits: u64,
    posts: u64,
}

impl Semaphore {
    fn new(id: SemId, name: Option<&str>, initial: i64) -> Self {
        Self {
            id,
            name: name.map(|n| heapless::String::try_from(n).unwrap_or_default()),
            value: initial,
            waiters: VecDeque::new(),
            waits: 0,
            posts: 0,
        }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn stats(&self) -> (u64, u64) {
        (self.waits, self.posts)
    }

    /// Non-blocking acquire of one permit.
    pub fn try_wait(&mut self) -> CoreResult<()> {
        if self.value <= 0 {
            return Err(CoreError::WouldBlock);
        }
        self.value -= 1;
        self.waits += 1;
        Ok(())
    }

    pub fn push_waiter(&mut self, pid: Pid) {
        self.waiters.push_back(pid);
    }

    /// Release one permit. If anyone was waiting, the permit is handed
    /// directly to the FIFO head instead of being added back to `value`.
    pub fn post(&mut self) -> Option<Pid> {
        self.posts += 1;
        match self.waiters.pop_front() {
            Some(next) => {
                self.waits += 1;
                Some(next)
            }
            None => {
                self.value += 1;
                None
            }
        }
    }

    pub fn cancel_wait(&mut self, pid: Pid) {
        self.waiters.retain(|&p| p != pid);
    }
}

pub struct MutexRegistry {
    capacity: usize,
    mutexes: BTreeMap<MutexId, Mutex>,
    by_name: BTreeMap<String, MutexId>,
    next_id: u32,
}

impl MutexRegistry {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, mutexes: BTreeMap::new(), by_name: BTreeMap::new(), next_id: 1 }
    }

    pub fn create(&mut self, name: Option<&str>) -> CoreResult<MutexId> {
        if let Some(name) = name {
            if self.by_name.contains_key(name) {
                return Err(CoreError::NameExists);
            }
        }
        if self.mutexes.len() >= self.capacity {
            return Err(CoreError::TableFull);
        }
        let id = MutexId(self.next_id);
        self.next_id += 1;
        self.mutexes.insert(id, Mutex::new(id, name));
        if let Some(name) = name {
            self.by_name.insert(name.to_string(), id);
        }
        log::debug!("mutex registry: created mutex {}", id);
        Ok(id)
    }

    pub fn destroy(&mut self, id: MutexId) -> CoreResult<()> {
        let mtx = self.mutexes.remove(&id).ok_or(CoreError::NotFound)?;
        if let Some(name) = mtx.name {
            self.by_name.remove(name.as_str());
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<MutexId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: MutexId) -> Option<&Mutex> {
        self.mutexes.get(&id)
    }

    pub fn get_mut(&mut self, id: MutexId) -> Option<&mut Mutex> {
        self.mutexes.get_mut(&id)
    }

    pub fn list(&self) -> Vec<&Mutex> {
        self.mutexes.values().collect()
    }
}

pub struct SemaphoreRegistry {
    capacity: usize,
    semaphores: BTreeMap<SemId, Semaphore>,
    by_name: BTreeMap<String, SemId>,
    next_id: u32,
}

impl SemaphoreRegistry {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, semaphores: BTreeMap::new(), by_name: BTreeMap::new(), next_id: 1 }
    }

    pub fn create(&mut self, name: Option<&str>, initial: i64) -> CoreResult<SemId> {
        if let Some(name) = name {
            if self.by_name.contains_key(name) {
                return Err(CoreError::NameExists);
            }
        }
        if self.semaphores.len() >= self.capacity {
            return Err(CoreError::TableFull);
        }
        let id = SemId(self.next_id);
        self.next_id += 1;
        self.semaphores.insert(id, Semaphore::new(id, name, initial));
        if let Some(name) = name {
            self.by_name.insert(name.to_string(), id);
        }
        log::debug!("semaphore registry: created semaphore {}", id);
        Ok(id)
    }

    pub fn destroy(&mut self, id: SemId) -> CoreResult<()> {
        let sem = self.semaphores.remove(&id).ok_or(CoreError::NotFound)?;
        if let Some(name) = sem.name {
            self.by_name.remove(name.as_str());
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<SemId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: SemId) -> Option<&Semaphore> {
        self.semaphores.get(&id)
    }

    pub fn get_mut(&mut self, id: SemId) -> Option<&mut Semaphore> {
        self.semaphores.get_mut(&id)
    }

    pub fn list(&self) -> Vec<&Semaphore> {
        self.semaphores.values().collect()
    }
}
