//! Multi-Level Feedback Queue (spec §4.3.1, §4.3.2).
//!
//! `L` levels, each with its own quantum from `quanta`; a PCB that exhausts
//! its quantum is demoted one level, and one that exhausts its per-level
//! `allotment` of ticks is also demoted even mid-quantum. Every
//! `boost_interval` ticks, every PCB above level 0 is promoted back to 0.

use std::collections::VecDeque;

use crate::pcb::{Pcb, Pid, Tick};
use crate::table::ProcessTable;

use super::SchedulingPolicy;

pub struct MlfqPolicy {
    levels: usize,
    quanta: Vec<u32>,
    allotment: u32,
    boost_interval: u64,
    ready: Vec<VecDeque<Pid>>,
}

impl MlfqPolicy {
    pub fn new(levels: usize, quanta: Vec<u32>, allotment: u32, boost_interval: u64) -> Self {
        let levels = levels.max(1);
        let mut quanta = quanta;
        quanta.resize(levels, quanta.last().copied().unwrap_or(2));
        Self {
            levels,
            quanta,
            allotment: allotment.max(1),
            boost_interval: boost_interval.max(1),
            ready: (0..levels).map(|_| VecDeque::new()).collect(),
        }
    }

    fn level_of(&self, table: &ProcessTable, pid: Pid) -> usize {
        table
            .lookup(pid)
            .map(|pcb| pcb.mlfq_level.min(self.levels - 1))
            .unwrap_or(0)
    }

    fn boost(&mut self, table: &mut ProcessTable) {
        for level in 1..self.levels {
            let demoted: Vec<Pid> = self.ready[level].drain(..).collect();
            self.ready[0].extend(demoted);
        }
        for pid in table.pids() {
            if let Some(pcb) = table.lookup_mut(pid) {
                if pcb.mlfq_level > 0 && (pcb.is_ready() || pcb.is_running()) {
                    pcb.mlfq_level = 0;
                    pcb.mlfq_allotment = self.allotment;
                    pcb.time_slice = self.quanta[0];
                    pcb.remaining_slice = self.quanta[0];
                }
            }
        }
    }
}

impl SchedulingPolicy for MlfqPolicy {
    fn name(&self) -> &'static str {
        "mlfq"
    }

    fn enqueue(&mut self, table: &ProcessTable, pid: Pid) {
        let level = self.level_of(table, pid);
        self.ready[level].push_back(pid);
    }

    fn select(&mut self, _table: &ProcessTable) -> Option<Pid> {
        for queue in self.ready.iter_mut() {
            if let Some(pid) = queue.pop_front() {
                return Some(pid);
            }
        }
        None
    }

    fn remove(&mut self, pid: Pid) {
        for queue in self.ready.iter_mut() {
            if let Some(idx) = queue.iter().position(|&p| p == pid) {
                queue.remove(idx);
                return;
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.ready.iter().all(|q| q.is_empty())
    }

    /// Demote on quantum exhaustion (`remaining_slice == 0`) or once the
    /// per-level allotment runs out, whichever comes first.
    fn should_preempt(&self, table: &ProcessTable, running: Pid) -> bool {
        table
            .lookup(running)
            .map(|pcb| pcb.remaining_slice == 0 || pcb.mlfq_allotment == 0)
            .unwrap_or(false)
    }

    fn quantum_for(&self, table: &ProcessTable, pid: Pid) -> u32 {
        self.quanta[self.level_of(table, pid)]
    }

    fn account(&self, pcb: &mut Pcb) {
        pcb.mlfq_allotment = pcb.mlfq_allotment.saturating_sub(1);
    }

    fn on_dispatch(&mut self, table: &mut ProcessTable, pid: Pid) {
        if let Some(pcb) = table.lookup_mut(pid) {
            if pcb.mlfq_allotment == 0 {
                pcb.mlfq_allotment = self.allotment;
            }
        }
    }

    /// Demotion only happens once the per-level `allotment` is spent; a
    /// preemption caused by quantum exhaustion alone re-enqueues the PCB at
    /// the same level, where the next dispatch hands it a fresh quantum.
    fn on_quantum_expired(&mut self, table: &mut ProcessTable, pid: Pid) {
        if let Some(pcb) = table.lookup_mut(pid) {
            if pcb.mlfq_allotment == 0 {
                pcb.mlfq_level = (pcb.mlfq_level + 1).min(self.levels - 1);
                pcb.mlfq_allotment = self.allotment;
            }
        }
    }

    fn on_tick(&mut self, table: &mut ProcessTable, now: Tick) {
        if now > 0 && now % self.boost_interval == 0 {
            self.boost(table);
        }
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
    fn selects_lower_levels_before_higher_ones() {
        let mut table = ProcessTable::new(4);
        let low_level = table.insert("a", 0, 0, region(), 0).unwrap();
        table.lookup_mut(low_level).unwrap().mlfq_level = 1;
        let top_level = table.insert("b", 0, 0, region(), 0).unwrap();

        let mut p = MlfqPolicy::new(3, vec![2, 4, 8], 6, 500);
        p.enqueue(&table, low_level);
        p.enqueue(&table, top_level);
        assert_eq!(p.select(&table), Some(top_level));
        assert_eq!(p.select(&table), Some(low_level));
    }

    #[test]
    fn quantum_expiry_alone_does_not_demote() {
        let mut table = ProcessTable::new(4);
        let pid = table.insert("a", 0, 0, region(), 0).unwrap();
        table.lookup_mut(pid).unwrap().mlfq_allotment = 3;
        let mut p = MlfqPolicy::new(3, vec![2, 4, 8], 6, 500);
        p.on_quantum_expired(&mut table, pid);
        assert_eq!(table.lookup(pid).unwrap().mlfq_level, 0);
    }

    #[test]
    fn exhausted_allotment_demotes_one_level() {
        let mut table = ProcessTable::new(4);
        let pid = table.insert("a", 0, 0, region(), 0).unwrap();
        table.lookup_mut(pid).unwrap().mlfq_allotment = 0;
        let mut p = MlfqPolicy::new(3, vec![2, 4, 8], 6, 500);
        p.on_quantum_expired(&mut table, pid);
        assert_eq!(table.lookup(pid).unwrap().mlfq_level, 1);
        assert_eq!(table.lookup(pid).unwrap().mlfq_allotment, 6);

        table.lookup_mut(pid).unwrap().mlfq_allotment = 0;
        p.on_quantum_expired(&mut table, pid);
        assert_eq!(table.lookup(pid).unwrap().mlfq_level, 2);
    }

    #[test]
    fn boost_resets_a_demoted_running_pcb_to_level_zero() {
        let mut table = ProcessTable::new(4);
        let pid = table.insert("a", 0, 0, region(), 0).unwrap();
        {
            let pcb = table.lookup_mut(pid).unwrap();
            pcb.mlfq_level = 2;
            pcb.state = crate::pcb::ProcessState::Running;
        }
        let mut p = MlfqPolicy::new(3, vec![2, 4, 8], 6, 20);
        p.on_tick(&mut table, 20);
        assert_eq!(table.lookup(pid).unwrap().mlfq_level, 0);
    }

    #[test]
    fn exhausting_allotment_preempts_even_mid_quantum() {
        let mut table = ProcessTable::new(4);
        let pid = table.insert("a", 0, 0, region(), 0).unwrap();
        {
            let pcb = table.lookup_mut(pid).unwrap();
            pcb.remaining_slice = 5;
            pcb.mlfq_allotment = 0;
        }
        let p = MlfqPolicy::new(3, vec![2, 4, 8], 6, 500);
        assert!(p.should_preempt(&table, pid));
    }
}
