//! The top-level facade (spec §6): the single entry point that wires the
//! process table, scheduler, tick source, and IPC/sync registries together
//! under one lock.
//!
//! Everything mutable lives behind `std::sync::Mutex<KernelState>`, modeling
//! the interrupt-disable discipline spec §9 describes: holding the mutex is
//! a critical section, and `Condvar::wait_while` is how a PCB gets parked
//! off the (virtual) CPU. A blocking call (`mailbox_send_blocking`,
//! `mutex_lock` when contended, `sem_wait` when the count is zero) is a real
//! blocking call on the caller's own OS thread — there is no separate
//! "dispatch the retry later" step, the calling thread *is* the PCB.

use std::sync::{Condvar, Mutex as StdMutex};

use crate::alloc_iface::StackAllocator;
use crate::config::KernelConfig;
use crate::error::{CoreError, CoreResult};
use crate::ipc::{MailboxId, MailboxRegistry, Message};
use crate::log_ring::LogEntry;
use crate::pcb::{BlockCause, Pcb, Pid, ProcessState, Tick};
use crate::scheduler::policies::{
    FcfsPolicy, MlfqPolicy, PriorityPolicy, RoundRobinPolicy, SjfPolicy, SrtfPolicy,
};
use crate::scheduler::{Scheduler, SchedulingPolicy};
use crate::sync::{MutexId, MutexRegistry, SemId, SemaphoreRegistry};
use crate::table::ProcessTable;
use crate::tick::TickSource;

struct KernelState {
    table: ProcessTable,
    scheduler: Scheduler,
    tick_source: TickSource,
    mailboxes: MailboxRegistry,
    mutexes: MutexRegistry,
    semaphores: SemaphoreRegistry,
    stack_alloc: Box<dyn StackAllocator>,
    config: KernelConfig,
}

pub struct Kernel {
    state: StdMutex<KernelState>,
    cv: Condvar,
}

fn make_policy(name: &str, config: &KernelConfig) -> CoreResult<Box<dyn SchedulingPolicy>> {
    match name {
        "fcfs" => Ok(Box::new(FcfsPolicy::new())),
        "rr" => Ok(Box::new(RoundRobinPolicy::new(config.round_robin_quantum))),
        "priority" => Ok(Box::new(PriorityPolicy::new(config.priority_quantum))),
        "sjf" => Ok(Box::new(SjfPolicy::new())),
        "srtf" => Ok(Box::new(SrtfPolicy::new())),
        "mlfq" => Ok(Box::new(MlfqPolicy::new(
            config.mlfq_levels,
            config.mlfq_quanta.clone(),
            config.mlfq_allotment,
            config.mlfq_boost_interval,
        ))),
        _ => Err(CoreError::BadArgs),
    }
}

impl Kernel {
    pub fn new(config: KernelConfig, stack_alloc: Box<dyn StackAllocator>) -> Self {
        let scheduler = Scheduler::new(
            make_policy("rr", &config).expect("rr is always a valid policy name"),
            config.execution_log_capacity,
        );
        let state = KernelState {
            table: ProcessTable::new(config.process_table_capacity),
            scheduler,
            tick_source: TickSource::new(),
            mailboxes: MailboxRegistry::new(config.mailbox_registry_capacity),
            mutexes: MutexRegistry::new(config.mutex_registry_capacity),
            semaphores: SemaphoreRegistry::new(config.semaphore_registry_capacity),
            stack_alloc,
            config,
        };
        Self { state: StdMutex::new(state), cv: Condvar::new() }
    }

    // ---- process lifecycle (spec §4.1, §4.2) ----------------------------

    pub fn create(&self, name: &str, entry_point: usize, priority: u8, stack_bytes: usize) -> CoreResult<Pid> {
        let mut guard = self.state.lock().unwrap();
        let region = guard.stack_alloc.alloc(stack_bytes).ok_or(CoreError::OutOfSlots)?;
        let now = guard.tick_source.now();
        match guard.table.insert(name, entry_point, priority, region, now) {
            Ok(pid) => Ok(pid),
            Err(e) => {
                guard.stack_alloc.free(region);
                Err(e)
            }
        }
    }

    /// `New -> Ready`, then place the PCB in the active policy's ready set.
    pub fn publish(&self, pid: Pid) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        guard.table.transition_ready(pid)?;
        guard.scheduler.enqueue_ready(&guard.table, pid);
        self.cv.notify_all();
        Ok(())
    }

    pub fn lookup(&self, pid: Pid) -> Option<Pcb> {
        self.state.lock().unwrap().table.lookup(pid).cloned()
    }

    pub fn list(&self) -> Vec<Pcb> {
        self.state.lock().unwrap().table.list().into_iter().cloned().collect()
    }

    /// Set the CPU-burst bookkeeping SJF/SRTF/MLFQ read (spec §3:
    /// `burst_estimate`, `remaining_work`). A no-op on the mechanism itself —
    /// callers (tests, `schedctl`) use this to set up a scenario before
    /// publishing the PCB.
    pub fn set_workload(&self, pid: Pid, burst_estimate: u32, remaining_work: u32) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        let pcb = guard.table.lookup_mut(pid).ok_or(CoreError::NotFound)?;
        pcb.burst_estimate = burst_estimate;
        pcb.remaining_work = remaining_work;
        Ok(())
    }

    /// Idempotent: killing an absent or already-dead PID is a no-op
    /// (law L2). A PCB blocked on a mailbox/mutex/semaphore is dropped from
    /// that primitive's waiter list first; its own blocked call then wakes
    /// with `Cancelled`.
    pub fn kill(&self, pid: Pid) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        self.terminate_locked(&mut guard, pid);
        self.cv.notify_all();
        Ok(())
    }

    /// A PCB's own voluntary exit; observably identical to `kill` of itself.
    pub fn exit(&self, pid: Pid) -> CoreResult<()> {
        self.kill(pid)
    }

    fn terminate_locked(&self, state: &mut KernelState, pid: Pid) {
        let Some(pcb_state) = state.table.lookup(pid).map(|pcb| pcb.state) else {
            return;
        };
        if let ProcessState::Blocked(cause) = pcb_state {
            match cause {
                BlockCause::None | BlockCause::Sleep => {}
                BlockCause::MboxFull(id) | BlockCause::MboxEmpty(id) => {
                    if let Some(mbox) = state.mailboxes.get_mut(id) {
                        mbox.cancel_wait(pid);
                    }
                }
                BlockCause::Mutex(id) => {
                    if let Some(mtx) = state.mutexes.get_mut(id) {
                        mtx.cancel_wait(pid);
                    }
                }
                BlockCause::Sem(id) => {
                    if let Some(sem) = state.semaphores.get_mut(id) {
                        sem.cancel_wait(pid);
                    }
                }
            }
        }
        let now = state.tick_source.now();
        state.scheduler.evict(&mut state.table, pid, now);
        state.table.remove(pid);
    }

    // ---- scheduling (spec §4.3, §4.4) ------------------------------------

    pub fn set_policy(&self, name: &str) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        let policy = make_policy(name, &guard.config)?;
        guard.scheduler.set_policy(policy, &guard.table);
        Ok(())
    }

    pub fn policy_name(&self) -> &'static str {
        self.state.lock().unwrap().scheduler.policy_name()
    }

    pub fn current(&self) -> Option<Pid> {
        self.state.lock().unwrap().scheduler.current()
    }

    pub fn log_snapshot(&self) -> Vec<LogEntry> {
        self.state.lock().unwrap().scheduler.log_snapshot()
    }

    pub fn configure_tick(&self, frequency_hz: u32) {
        self.state.lock().unwrap().tick_source.configure(frequency_hz);
    }

    pub fn now(&self) -> Tick {
        self.state.lock().unwrap().tick_source.now()
    }

    pub fn disable_scheduler(&self) {
        self.state.lock().unwrap().tick_source.disable_scheduler();
    }

    pub fn enable_scheduler(&self) {
        self.state.lock().unwrap().tick_source.enable_scheduler();
    }

    /// Advance the tick counter by one and, if the scheduler is enabled, run
    /// the per-tick algorithm (spec §4.3.1, §4.4).
    pub fn tick(&self) -> Tick {
        let mut guard = self.state.lock().unwrap();
        let now = guard.tick_source.advance();
        if guard.tick_source.scheduler_enabled() {
            guard.scheduler.tick(&mut guard.table, now);
        }
        self.cv.notify_all();
        now
    }

    /// Run `n` ticks back to back (spec §4.3.4, "simulate mode").
    pub fn simulate(&self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Voluntarily block a PCB with no associated resource (spec §4.3.3).
    pub fn sleep(&self, pid: Pid) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        if guard.table.lookup(pid).is_none() {
            return Err(CoreError::NotFound);
        }
        let now = guard.tick_source.now();
        guard.scheduler.block(&mut guard.table, pid, BlockCause::Sleep, now);
        Ok(())
    }

    pub fn wake(&self, pid: Pid) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        if guard.table.lookup(pid).is_none() {
            return Err(CoreError::NotFound);
        }
        guard.scheduler.unblock(&mut guard.table, pid);
        self.cv.notify_all();
        Ok(())
    }

    // ---- mailboxes (spec §4.5.1) -----------------------------------------

    pub fn mailbox_create(&self, name: Option<&str>, capacity: usize, msg_size: usize) -> CoreResult<MailboxId> {
        self.state.lock().unwrap().mailboxes.create(name, capacity, msg_size)
    }

    /// Wakes every sender and receiver waiting on this mailbox with an error
    /// return before the mailbox itself disappears (spec §4.5.1).
    pub fn mailbox_destroy(&self, id: MailboxId) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        let waiters = guard.mailboxes.destroy(id)?;
        for pid in waiters {
            guard.scheduler.unblock(&mut guard.table, pid);
        }
        self.cv.notify_all();
        Ok(())
    }

    pub fn mailbox_find(&self, name: &str) -> Option<MailboxId> {
        self.state.lock().unwrap().mailboxes.find(name)
    }

    pub fn mailbox_send(&self, id: MailboxId, sender: Pid, payload: &[u8]) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        let mbox = guard.mailboxes.get_mut(id).ok_or(CoreError::NotFound)?;
        let woken = mbox.try_send(sender, payload)?;
        if let Some(pid) = woken {
            guard.scheduler.unblock(&mut guard.table, pid);
            self.cv.notify_all();
        }
        Ok(())
    }

    pub fn mailbox_recv(&self, id: MailboxId) -> CoreResult<Message> {
        let mut guard = self.state.lock().unwrap();
        let mbox = guard.mailboxes.get_mut(id).ok_or(CoreError::NotFound)?;
        let (msg, woken) = mbox.try_recv()?;
        if let Some(pid) = woken {
            guard.scheduler.unblock(&mut guard.table, pid);
            self.cv.notify_all();
        }
        Ok(msg)
    }

    pub fn mailbox_send_blocking(&self, id: MailboxId, sender: Pid, payload: &[u8]) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        let mbox = guard.mailboxes.get_mut(id).ok_or(CoreError::NotFound)?;
        match mbox.try_send(sender, payload) {
            Ok(woken) => {
                if let Some(pid) = woken {
                    guard.scheduler.unblock(&mut guard.table, pid);
                    self.cv.notify_all();
                }
                Ok(())
            }
            Err(CoreError::Full) => {
                guard.mailboxes.get_mut(id).unwrap().push_sender_wait(sender, payload.to_vec());
                let now = guard.tick_source.now();
                guard.scheduler.block(&mut guard.table, sender, BlockCause::MboxFull(id), now);
                guard = self
                    .cv
                    .wait_while(guard, |s| match s.table.lookup(sender) {
                        None => false,
                        Some(pcb) => pcb.state.is_blocked_on(BlockCause::MboxFull(id)),
                    })
                    .unwrap();
                if guard.table.lookup(sender).is_none() {
                    return Err(CoreError::Cancelled);
                }
                if guard.mailboxes.get(id).is_none() {
                    return Err(CoreError::NotFound);
                }
                // Whoever unblocked us already placed our message in the
                // queue via direct handoff; nothing left to do.
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn mailbox_recv_blocking(&self, id: MailboxId, pid: Pid) -> CoreResult<Message> {
        let mut guard = self.state.lock().unwrap();
        let mbox = guard.mailboxes.get_mut(id).ok_or(CoreError::NotFound)?;
        match mbox.try_recv() {
            Ok((msg, woken)) => {
                if let Some(sender) = woken {
                    guard.scheduler.unblock(&mut guard.table, sender);
                    self.cv.notify_all();
                }
                Ok(msg)
            }
            Err(CoreError::Empty) => {
                guard.mailboxes.get_mut(id).unwrap().push_receiver_wait(pid);
                let now = guard.tick_source.now();
                guard.scheduler.block(&mut guard.table, pid, BlockCause::MboxEmpty(id), now);
                guard = self
                    .cv
                    .wait_while(guard, |s| match s.table.lookup(pid) {
                        None => false,
                        Some(pcb) => pcb.state.is_blocked_on(BlockCause::MboxEmpty(id)),
                    })
                    .unwrap();
                if guard.table.lookup(pid).is_none() {
                    return Err(CoreError::Cancelled);
                }
                let mbox = guard.mailboxes.get_mut(id).ok_or(CoreError::NotFound)?;
                mbox.take_delivered(pid).ok_or(CoreError::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    pub fn mailbox_stats(&self, id: MailboxId) -> Option<(u64, u64)> {
        self.state.lock().unwrap().mailboxes.get(id).map(|m| m.stats())
    }

    // ---- mutexes (spec §4.5.2) -------------------------------------------

    pub fn mutex_create(&self, name: Option<&str>) -> CoreResult<MutexId> {
        self.state.lock().unwrap().mutexes.create(name)
    }

    pub fn mutex_destroy(&self, id: MutexId) -> CoreResult<()> {
        self.state.lock().unwrap().mutexes.destroy(id)
    }

    pub fn mutex_trylock(&self, id: MutexId, pid: Pid) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        guard.mutexes.get_mut(id).ok_or(CoreError::NotFound)?.try_lock(pid)
    }

    pub fn mutex_lock(&self, id: MutexId, pid: Pid) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        let mtx = guard.mutexes.get_mut(id).ok_or(CoreError::NotFound)?;
        match mtx.try_lock(pid) {
            Ok(()) => Ok(()),
            Err(CoreError::Busy) => {
                guard.mutexes.get_mut(id).unwrap().push_waiter(pid);
                let now = guard.tick_source.now();
                guard.scheduler.block(&mut guard.table, pid, BlockCause::Mutex(id), now);
                guard = self
                    .cv
                    .wait_while(guard, |s| match s.table.lookup(pid) {
                        None => false,
                        Some(pcb) => pcb.state.is_blocked_on(BlockCause::Mutex(id)),
                    })
                    .unwrap();
                if guard.table.lookup(pid).is_none() {
                    return Err(CoreError::Cancelled);
                }
                // Direct handoff: ownership was already assigned to us by
                // whichever `unlock` woke us.
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn mutex_unlock(&self, id: MutexId, pid: Pid) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        let mtx = guard.mutexes.get_mut(id).ok_or(CoreError::NotFound)?;
        let woken = mtx.unlock(pid)?;
        if let Some(next) = woken {
            guard.scheduler.unblock(&mut guard.table, next);
            self.cv.notify_all();
        }
        Ok(())
    }

    pub fn mutex_stats(&self, id: MutexId) -> Option<(u64, u64)> {
        self.state.lock().unwrap().mutexes.get(id).map(|m| m.stats())
    }

    // ---- semaphores (spec §4.5.3) ----------------------------------------

    pub fn sem_create(&self, name: Option<&str>, initial: i64) -> CoreResult<SemId> {
        self.state.lock().unwrap().semaphores.create(name, initial)
    }

    pub fn sem_destroy(&self, id: SemId) -> CoreResult<()> {
        self.state.lock().unwrap().semaphores.destroy(id)
    }

    pub fn sem_trywait(&self, id: SemId) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        guard.semaphores.get_mut(id).ok_or(CoreError::NotFound)?.try_wait()
    }

    pub fn sem_wait(&self, id: SemId, pid: Pid) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        let sem = guard.semaphores.get_mut(id).ok_or(CoreError::NotFound)?;
        match sem.try_wait() {
            Ok(()) => Ok(()),
            Err(CoreError::WouldBlock) => {
                guard.semaphores.get_mut(id).unwrap().push_waiter(pid);
                let now = guard.tick_source.now();
                guard.scheduler.block(&mut guard.table, pid, BlockCause::Sem(id), now);
                guard = self
                    .cv
                    .wait_while(guard, |s| match s.table.lookup(pid) {
                        None => false,
                        Some(pcb) => pcb.state.is_blocked_on(BlockCause::Sem(id)),
                    })
                    .unwrap();
                if guard.table.lookup(pid).is_none() {
                    return Err(CoreError::Cancelled);
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub fn sem_post(&self, id: SemId) -> CoreResult<()> {
        let mut guard = self.state.lock().unwrap();
        let sem = guard.semaphores.get_mut(id).ok_or(CoreError::NotFound)?;
        let woken = sem.post();
        if let Some(next) = woken {
            guard.scheduler.unblock(&mut guard.table, next);
            self.cv.notify_all();
        }
        Ok(())
    }

    pub fn sem_stats(&self, id: SemId) -> Option<(u64, u64)> {
        self.state.lock().unwrap().semaphores.get(id).map(|s| s.stats())
    }
}
