//! Shortest-Job-First: non-preemptive, selects the smallest `burst_estimate`
//! (spec §4.3.2).

use std::collections::VecDeque;

use crate::pcb::Pid;
use crate::table::ProcessTable;

use super::{select_best, SchedulingPolicy};

pub struct SjfPolicy {
    ready: VecDeque<Pid>,
}

impl SjfPolicy {
    pub fn new() -> Self {
        Self { ready: VecDeque::new() }
    }

    fn key(table: &ProcessTable, pid: Pid) -> (u32, u64, u32) {
        table
            .lookup(pid)
            .map(|pcb| (pcb.burst_estimate, pcb.arrival_tick, pcb.pid.0))
            .unwrap_or((u32::MAX, u64::MAX, u32::MAX))
    }
}

impl Default for SjfPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulingPolicy for SjfPolicy {
    fn name(&self) -> &'static str {
        "sjf"
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

    /// Non-preemptive: the shortest job only gets picked at the next
    /// dispatch decision, never mid-burst.
    fn should_preempt(&self, _table: &ProcessTable, _running: Pid) -> bool {
        false
    }

    fn quantum_for(&self, _table: &ProcessTable, _pid: Pid) -> u32 {
        u32::MAX
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
    fn selects_smallest_burst_estimate() {
        let mut table = ProcessTable::new(4);
        let long = table.insert("long", 0, 0, region(), 0).unwrap();
        table.lookup_mut(long).unwrap().burst_estimate = 10;
        let short = table.insert("short", 0, 0, region(), 1).unwrap();
        table.lookup_mut(short).unwrap().burst_estimate = 2;
        let mut p = SjfPolicy::new();
        p.enqueue(&table, long);
        p.enqueue(&table, short);
        assert_eq!(p.select(&table), Some(short));
    }
}
