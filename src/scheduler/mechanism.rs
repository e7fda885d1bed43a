//! The scheduler mechanism: the per-tick algorithm (spec §4.3.1) and the
//! block/unblock API (spec §4.3.3), identical for every policy.

use crate::log_ring::{ExecutionLog, LogEntry};
use crate::pcb::{BlockCause, Pid, ProcessState, Tick};
use crate::table::ProcessTable;

use super::traits::SchedulingPolicy;

pub struct Scheduler {
    policy: Box<dyn SchedulingPolicy>,
    running: Option<Pid>,
    log: ExecutionLog,
}

impl Scheduler {
    pub fn new(policy: Box<dyn SchedulingPolicy>, log_capacity: usize) -> Self {
        Self {
            policy,
            running: None,
            log: ExecutionLog::new(log_capacity),
        }
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn current(&self) -> Option<Pid> {
        self.running
    }

    /// Place an already-`Ready` PCB into the active policy's ready
    /// structure, used by `Kernel::publish` right after a PCB's first
    /// `New -> Ready` transition.
    pub fn enqueue_ready(&mut self, table: &ProcessTable, pid: Pid) {
        self.policy.enqueue(table, pid);
    }

    pub fn log_snapshot(&self) -> Vec<LogEntry> {
        self.log.snapshot()
    }

    /// Switch policies wholesale: every currently-`Ready` PCB is re-enqueued
    /// into the new policy's ready structure. The PCB that is `Running`, if
    /// any, keeps running under the new policy's accounting from the next
    /// tick onward.
    pub fn set_policy(&mut self, mut policy: Box<dyn SchedulingPolicy>, table: &ProcessTable) {
        for pcb in table.list() {
            if pcb.is_ready() {
                policy.enqueue(table, pcb.pid);
            }
        }
        self.policy = policy;
    }

    fn dispatch(&mut self, table: &mut ProcessTable, pid: Pid, now: Tick) {
        let quantum = self.policy.quantum_for(table, pid);
        if let Some(pcb) = table.lookup_mut(pid) {
            pcb.state = ProcessState::Running;
            pcb.time_slice = quantum;
            pcb.remaining_slice = quantum;
            if pcb.first_dispatch_tick.is_none() {
                pcb.first_dispatch_tick = Some(now);
            }
            pcb.last_dispatch_tick = Some(now);
        }
        self.running = Some(pid);
        self.policy.on_dispatch(table, pid);
        log::debug!("scheduler[{}]: dispatched pid {} at tick {}", self.policy.name(), pid, now);
    }

    fn log_dispatch_interval(&mut self, table: &ProcessTable, pid: Pid, now: Tick) {
        if let Some(pcb) = table.lookup(pid) {
            let start = pcb.last_dispatch_tick.unwrap_or(now);
            self.log.push(LogEntry {
                pid,
                name: pcb.name.clone(),
                start_tick: start,
                end_tick: now,
                duration: now.saturating_sub(start),
            });
        }
    }

    /// The per-tick algorithm, spec §4.3.1.
    pub fn tick(&mut self, table: &mut ProcessTable, now: Tick) {
        self.policy.on_tick(table, now);

        let running_pid = match self.running {
            None => {
                if let Some(pid) = self.policy.select(table) {
                    self.dispatch(table, pid, now);
                }
                return;
            }
            Some(pid) => pid,
        };

        match table.lookup_mut(running_pid) {
            Some(pcb) => {
                pcb.total_ticks += 1;
                pcb.remaining_slice = pcb.remaining_slice.saturating_sub(1);
                self.policy.account(pcb);
            }
            None => {
                // The running PCB was terminated through a path that didn't
                // go through `block`/`evict` (shouldn't happen, but don't
                // wedge the scheduler on a dangling pid).
                self.running = None;
                return;
            }
        }

        if !self.policy.should_preempt(table, running_pid) {
            return;
        }

        self.log_dispatch_interval(table, running_pid, now);
        self.policy.on_quantum_expired(table, running_pid);
        if let Some(pcb) = table.lookup_mut(running_pid) {
            pcb.state = ProcessState::Ready;
        }
        self.policy.enqueue(table, running_pid);
        self.running = None;

        if let Some(next) = self.policy.select(table) {
            self.dispatch(table, next, now);
        }
    }

    /// Block the running or a Ready PCB (spec §4.3.3). The caller is
    /// responsible for having already linked `pid` into the relevant
    /// primitive's waiter queue.
    pub fn block(&mut self, table: &mut ProcessTable, pid: Pid, cause: BlockCause, now: Tick) {
        if self.running == Some(pid) {
            self.log_dispatch_interval(table, pid, now);
            self.running = None;
        } else {
            self.policy.remove(pid);
        }
        if let Some(pcb) = table.lookup_mut(pid) {
            pcb.state = ProcessState::Blocked(cause);
        }
    }

    /// Unblock a PCB (spec §4.3.3). Requires `state = Blocked(_)`.
    pub fn unblock(&mut self, table: &mut ProcessTable, pid: Pid) {
        if let Some(pcb) = table.lookup_mut(pid) {
            debug_assert!(
                matches!(pcb.state, ProcessState::Blocked(_)),
                "unblock on a PCB that was not Blocked"
            );
            pcb.state = ProcessState::Ready;
        }
        self.policy.enqueue(table, pid);
    }

    /// Remove a PCB from wherever the scheduler currently holds it (running
    /// or ready), without touching its `state` — used by `kill`/`exit` to
    /// evict before the process table fully removes the PCB.
    pub fn evict(&mut self, table: &mut ProcessTable, pid: Pid, now: Tick) {
        if self.running == Some(pid) {
            self.log_dispatch_interval(table, pid, now);
            self.running = None;
        } else {
            self.policy.remove(pid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcb::StackRegion;
    use crate::scheduler::policies::RoundRobinPolicy;

    fn region() -> StackRegion {
        StackRegion { base: 0, len: 4096 }
    }

    fn spawn(table: &mut ProcessTable, name: &str, tick: Tick) -> Pid {
        let pid = table.insert(name, 0, 0, region(), tick).unwrap();
        table.transition_ready(pid).unwrap();
        pid
    }

    #[test]
    fn idle_scheduler_dispatches_nothing() {
        let mut table = ProcessTable::new(8);
        let mut sched = Scheduler::new(Box::new(RoundRobinPolicy::new(2)), 10);
        sched.tick(&mut table, 1);
        assert_eq!(sched.current(), None);
    }

    #[test]
    fn publishing_and_ticking_dispatches_the_ready_pcb() {
        let mut table = ProcessTable::new(8);
        let mut sched = Scheduler::new(Box::new(RoundRobinPolicy::new(2)), 10);
        let pid = spawn(&mut table, "a", 0);
        sched.enqueue_ready(&table, pid);
        sched.tick(&mut table, 0);
        assert_eq!(sched.current(), Some(pid));
    }

    #[test]
    fn block_then_unblock_round_trips_through_ready_again() {
        let mut table = ProcessTable::new(8);
        let mut sched = Scheduler::new(Box::new(RoundRobinPolicy::new(2)), 10);
        let pid = spawn(&mut table, "a", 0);
        sched.enqueue_ready(&table, pid);
        sched.tick(&mut table, 0);
        assert_eq!(sched.current(), Some(pid));

        sched.block(&mut table, pid, BlockCause::Sleep, 1);
        assert_eq!(sched.current(), None);
        assert_eq!(table.lookup(pid).unwrap().state, ProcessState::Blocked(BlockCause::Sleep));

        sched.unblock(&mut table, pid);
        assert_eq!(table.lookup(pid).unwrap().state, ProcessState::Ready);
        sched.tick(&mut table, 2);
        assert_eq!(sched.current(), Some(pid));
    }
}
