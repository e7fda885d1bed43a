//! Round-Robin: FIFO ready queue, fixed quantum, preempted on expiry (spec §4.3.2).

use std::collections::VecDeque;

use crate::pcb::Pid;
use crate::table::ProcessTable;

use super::SchedulingPolicy;

pub struct RoundRobinPolicy {
    ready: VecDeque<Pid>,
    quantum: u32,
}

impl RoundRobinPolicy {
    pub fn new(quantum: u32) -> Self {
        Self { ready: VecDeque::new(), quantum: quantum.max(1) }
    }
}

impl SchedulingPolicy for RoundRobinPolicy {
    fn name(&self) -> &'static str {
        "rr"
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

    fn should_preempt(&self, table: &ProcessTable, running: Pid) -> bool {
        table.lookup(running).map(|pcb| pcb.remaining_slice == 0).unwrap_or(false)
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
    fn rotates_in_fifo_order() {
        let mut table = ProcessTable::new(4);
        let a = table.insert("a", 0, 0, region(), 0).unwrap();
        let b = table.insert("b", 0, 0, region(), 0).unwrap();
        let mut p = RoundRobinPolicy::new(2);
        p.enqueue(&table, a);
        p.enqueue(&table, b);
        assert_eq!(p.select(&table), Some(a));
        p.enqueue(&table, a);
        assert_eq!(p.select(&table), Some(b));
    }

    #[test]
    fn preempts_only_once_slice_exhausted() {
        let mut table = ProcessTable::new(4);
        let a = table.insert("a", 0, 0, region(), 0).unwrap();
        table.lookup_mut(a).unwrap().remaining_slice = 1;
        let p = RoundRobinPolicy::new(2);
        assert!(!p.should_preempt(&table, a));
        table.lookup_mut(a).unwrap().remaining_slice = 0;
        assert!(p.should_preempt(&table, a));
    }
}
