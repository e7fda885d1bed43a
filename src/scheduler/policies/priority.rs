//! Priority: preemptive, selects the highest numeric priority value (31 =
//! highest), tie-broken by arrival tick then PID (spec §4.3.2).

use std::cmp::Reverse;
use std::collections::VecDeque;

use crate::pcb::Pid;
use crate::table::ProcessTable;

use super::{select_best, SchedulingPolicy};

pub struct PriorityPolicy {
    ready: VecDeque<Pid>,
    quantum: u32,
}

impl PriorityPolicy {
    pub fn new(quantum: u32) -> Self {
        Self { ready: VecDeque::new(), quantum: quantum.max(1) }
    }

    fn key(table: &ProcessTable, pid: Pid) -> (Reverse<u8>, u64, u32) {
        table
            .lookup(pid)
            .map(|pcb| (Reverse(pcb.priority), pcb.arrival_tick, pcb.pid.0))
            .unwrap_or((Reverse(0), u64::MAX, u32::MAX))
    }
}

impl SchedulingPolicy for PriorityPolicy {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn enqueue(&mut self, _table: &ProcessTable, pid: Pid) {
        self.ready.push_back(pid);
    }

    fn select(&mut self, table: &ProcessTable) -> Option<Pid> {
        select_best(&mut self.ready, |pid| Self::key(table, pid))
    }

    fn remove(&mut self, pid: Pid) {
        if let Some(idx) = self.ready.iter().position(|&p| p == pid) {
            self.ready.remove(idx);
        }
    }

    fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Preempt the running PCB as soon as a strictly higher-priority PCB
    /// (higher numeric value) sits in the ready set, or once its own quantum
    /// runs out.
    fn should_preempt(&self, table: &ProcessTable, running: Pid) -> bool {
        let Some(running_pcb) = table.lookup(running) else { return false };
        if running_pcb.remaining_slice == 0 {
            return true;
        }
        self.ready
            .iter()
            .filter_map(|&pid| table.lookup(pid))
            .any(|pcb| pcb.priority > running_pcb.priority)
    }

    fn quantum_for(&self, _table: &ProcessTable, _pid: Pid) -> u32 {
        self.quantum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcb::StackRegion;

    fn region() -> StackRegion {
        StackRegion { base: 0, len: 4096 }
    }

    #[test]
    fn selects_highest_priority_value_first() {
        let mut table = ProcessTable::new(4);
        let low = table.insert("low", 0, 1, region(), 0).unwrap();
        let high = table.insert("high", 0, 5, region(), 1).unwrap();
        let mut p = PriorityPolicy::new(4);
        p.enqueue(&table, low);
        p.enqueue(&table, high);
        assert_eq!(p.select(&table), Some(high));
    }

    #[test]
    fn higher_priority_arrival_forces_preemption() {
        let mut table = ProcessTable::new(4);
        let running = table.insert("running", 0, 1, region(), 0).unwrap();
        table.lookup_mut(running).unwrap().remaining_slice = 3;
        let newcomer = table.insert("newcomer", 0, 5, region(), 1).unwrap();
        let mut p = PriorityPolicy::new(4);
        p.enqueue(&table, newcomer);
        assert!(p.should_preempt(&table, running));
    }
}
