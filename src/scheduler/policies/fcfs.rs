//! First-Come-First-Served: non-preemptive, ordered by arrival (spec §4.3.2).

use std::collections::VecDeque;

use crate::pcb::Pid;
use crate::table::ProcessTable;

use super::SchedulingPolicy;

pub struct FcfsPolicy {
    ready: VecDeque<Pid>,
}

impl FcfsPolicy {
    pub fn new() -> Self {
        Self { ready: VecDeque::new() }
    }
}

impl Default for FcfsPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulingPolicy for FcfsPolicy {
    fn name(&self) -> &'static str {
        "fcfs"
    }

    fn enqueue(&mut self, _table: &ProcessTable, pid: Pid) {
        self.ready.push_back(pid);
    }

    fn select(&mut self, _table: &ProcessTable) -> Option<Pid> {
        self.ready.pop_front()
    }

    fn remove(&mut self, pid: Pid) {
        if let Some(idx) = self.ready.iter().position(|&p| p == pid) {
            self.ready.remove(idx);
        }
    }

    fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// FCFS is non-preemptive: once dispatched a PCB runs until it blocks or
    /// exits, never because of a tick.
    fn should_preempt(&self, _table: &ProcessTable, _running: Pid) -> bool {
        false
    }

    /// No time-slice ceiling.
    fn quantum_for(&self, _table: &ProcessTable, _pid: Pid) -> u32 {
        u32::MAX
    }
}
