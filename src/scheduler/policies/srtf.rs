//! Shortest-Remaining-Time-First: the preemptive sibling of SJF. Selects on
//! `remaining_work`, which it decrements every tick the PCB runs (spec §4.3.2).

use std::collections::VecDeque;

use crate::pcb::{Pcb, Pid};
use crate::table::ProcessTable;

use super::{select_best, SchedulingPolicy};

pub struct SrtfPolicy {
    ready: VecDeque<Pid>,
}

impl SrtfPolicy {
    pub fn new() -> Self {
        Self { ready: VecDeque::new() }
    }

    fn key(table: &ProcessTable, pid: Pid) -> (u32, u64, u32) {
        table
            .lookup(pid)
            .map(|pcb| (pcb.remaining_work, pcb.arrival_tick, pcb.pid.0))
            .unwrap_or((u32::MAX, u64::MAX, u32::MAX))
    }
}

impl Default for SrtfPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulingPolicy for SrtfPolicy {
    fn name(&self) -> &'static str {
        "srtf"
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

    /// Preempt as soon as some ready PCB has strictly less remaining work
    /// than the one currently running.
    fn should_preempt(&self, table: &ProcessTable, running: Pid) -> bool {
        let Some(running_pcb) = table.lookup(running) else { return false };
        self.ready
            .iter()
            .filter_map(|&pid| table.lookup(pid))
            .any(|pcb| pcb.remaining_work < running_pcb.remaining_work)
    }

    fn quantum_for(&self, _table: &ProcessTable, _pid: Pid) -> u32 {
        u32::MAX
    }

    fn account(&self, pcb: &mut Pcb) {
        pcb.remaining_work = pcb.remaining_work.saturating_sub(1);
    }
}
