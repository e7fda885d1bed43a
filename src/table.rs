//! The process table: fixed-capacity PCB registry (spec §4.1).

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::pcb::{Pcb, Pid, ProcessState, StackRegion, Tick};

/// Fixed-capacity registry of PCBs. The single owner of PCB storage; every
/// other component holds borrow-only references by [`Pid`].
pub struct ProcessTable {
    capacity: usize,
    pcbs: BTreeMap<Pid, Pcb>,
    insertion_order: Vec<Pid>,
    next_pid: u32,
    free_pids: Vec<u32>,
}

impl ProcessTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pcbs: BTreeMap::new(),
            insertion_order: Vec::new(),
            next_pid: 1,
            free_pids: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn live_count(&self) -> usize {
        self.pcbs.len()
    }

    fn allocate_pid(&mut self) -> Pid {
        if let Some(reused) = self.free_pids.pop() {
            Pid(reused)
        } else {
            let pid = Pid(self.next_pid);
            self.next_pid += 1;
            pid
        }
    }

    /// Insert a new `New`-state PCB. Does not place it in any ready structure.
    pub fn insert(
        &mut self,
        name: &str,
        entry_point: usize,
        priority: u8,
        stack_region: StackRegion,
        arrival_tick: Tick,
    ) -> CoreResult<Pid> {
        if name.is_empty() || priority > 31 {
            return Err(CoreError::BadArgs);
        }
        if self.pcbs.len() >= self.capacity {
            return Err(CoreError::TableFull);
        }
        let pid = self.allocate_pid();
        let pcb = Pcb {
            pid,
            name: Pcb::truncated_name(name),
            state: ProcessState::New,
            priority,
            entry_point,
            stack_region,
            saved_context: Default::default(),
            burst_estimate: 0,
            remaining_work: 0,
            arrival_tick,
            time_slice: u32::MAX,
            remaining_slice: 0,
            mlfq_level: 0,
            mlfq_allotment: 0,
            total_ticks: 0,
            first_dispatch_tick: None,
            last_dispatch_tick: None,
        };
        self.pcbs.insert(pid, pcb);
        self.insertion_order.push(pid);
        log::debug!("process table: inserted pid {} (\"{}\")", pid, name);
        Ok(pid)
    }

    /// Transition `New -> Ready`. Does not touch any scheduler ready structure
    /// — callers compose this with `SchedulingPolicy::enqueue` to realize the
    /// full `publish` contract (see `Kernel::publish`).
    pub fn transition_ready(&mut self, pid: Pid) -> CoreResult<()> {
        let pcb = self.pcbs.get_mut(&pid).ok_or(CoreError::NotFound)?;
        if pcb.state != ProcessState::New {
            return Err(CoreError::BadArgs);
        }
        pcb.state = ProcessState::Ready;
        Ok(())
    }

    pub fn lookup(&self, pid: Pid) -> Option<&Pcb> {
        self.pcbs.get(&pid).filter(|p| p.state != ProcessState::Terminated)
    }

    pub fn lookup_mut(&mut self, pid: Pid) -> Option<&mut Pcb> {
        self.pcbs
            .get_mut(&pid)
            .filter(|p| p.state != ProcessState::Terminated)
    }

    /// Marks the PCB `Terminated`, then immediately removes it: its slot and
    /// PID are freed for reuse. Idempotent — a PID no longer present is a
    /// no-op, which gives `kill(p); kill(p)` the same observable effect as
    /// `kill(p)` alone (law L2).
    pub fn remove(&mut self, pid: Pid) {
        if self.pcbs.remove(&pid).is_some() {
            self.insertion_order.retain(|&p| p != pid);
            self.free_pids.push(pid.0);
            log::debug!("process table: removed pid {}", pid);
        }
    }

    /// Snapshot of all non-`Terminated` PCBs in insertion order.
    pub fn list(&self) -> Vec<&Pcb> {
        self.insertion_order
            .iter()
            .filter_map(|pid| self.pcbs.get(pid))
            .collect()
    }

    /// PIDs of all live PCBs in insertion order, without borrowing any of
    /// them — lets a caller iterate and call `lookup_mut` per PID.
    pub fn pids(&self) -> Vec<Pid> {
        self.insertion_order
            .iter()
            .filter(|pid| self.pcbs.contains_key(pid))
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> StackRegion {
        StackRegion { base: 0x1000, len: 4096 }
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let mut t = ProcessTable::new(4);
        let pid = t.insert("a", 0, 5, region(), 0).unwrap();
        assert_eq!(t.lookup(pid).unwrap().name.as_str(), "a");
        assert_eq!(t.lookup(pid).unwrap().state, ProcessState::New);
    }

    #[test]
    fn insert_rejects_empty_name_and_bad_priority() {
        let mut t = ProcessTable::new(4);
        assert_eq!(t.insert("", 0, 0, region(), 0), Err(CoreError::BadArgs));
        assert_eq!(t.insert("a", 0, 32, region(), 0), Err(CoreError::BadArgs));
    }

    #[test]
    fn insert_fails_once_capacity_reached() {
        let mut t = ProcessTable::new(1);
        t.insert("a", 0, 0, region(), 0).unwrap();
        assert_eq!(t.insert("b", 0, 0, region(), 0), Err(CoreError::TableFull));
    }

    #[test]
    fn transition_ready_requires_new_state() {
        let mut t = ProcessTable::new(4);
        let pid = t.insert("a", 0, 0, region(), 0).unwrap();
        t.transition_ready(pid).unwrap();
        assert_eq!(t.transition_ready(pid), Err(CoreError::BadArgs));
    }

    #[test]
    fn lookup_returns_none_after_removal_and_pid_is_reused() {
        let mut t = ProcessTable::new(4);
        let pid = t.insert("a", 0, 0, region(), 0).unwrap();
        t.remove(pid);
        assert!(t.lookup(pid).is_none());
        t.remove(pid); // idempotent
        let reused = t.insert("b", 0, 0, region(), 0).unwrap();
        assert_eq!(reused, pid);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let mut t = ProcessTable::new(4);
        let a = t.insert("a", 0, 0, region(), 0).unwrap();
        let b = t.insert("b", 0, 0, region(), 0).unwrap();
        let pids: Vec<_> = t.list().iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![a, b]);
    }
}
