//! The policy/mechanism split (spec §9: "policy pluggability").
//!
//! Six scheduling disciplines share the same mechanism loop
//! ([`super::mechanism::Scheduler::tick`]); what differs is encapsulated
//! behind this trait so the mechanism never matches on "which policy am I".

use crate::pcb::{Pcb, Pid, Tick};
use crate::table::ProcessTable;

pub trait SchedulingPolicy: Send {
    /// Short lowercase name, matching the command-surface policy names
    /// (`fcfs`, `rr`, `priority`, `sjf`, `srtf`, `mlfq`).
    fn name(&self) -> &'static str;

    /// Place a `Ready` PCB into this policy's ready structure.
    fn enqueue(&mut self, table: &ProcessTable, pid: Pid);

    /// Remove and return the PCB this policy would dispatch next, or `None`.
    fn select(&mut self, table: &ProcessTable) -> Option<Pid>;

    /// Remove a PCB from the ready structure without dispatching it
    /// (used when a Ready PCB is blocked or killed).
    fn remove(&mut self, pid: Pid);

    fn is_empty(&self) -> bool;

    /// Whether the currently-running PCB should be preempted this tick.
    fn should_preempt(&self, table: &ProcessTable, running: Pid) -> bool;

    /// The quantum a PCB should be dispatched with under this policy.
    fn quantum_for(&self, table: &ProcessTable, pid: Pid) -> u32;

    /// Policy-specific per-tick accounting beyond the universal
    /// `total_ticks`/`remaining_slice` bookkeeping the mechanism always does
    /// (SRTF decrements `remaining_work`, MLFQ decrements `mlfq_allotment`).
    fn account(&self, _pcb: &mut Pcb) {}

    /// Called by the mechanism immediately before re-enqueuing a PCB whose
    /// quantum just expired, so MLFQ can demote it. A no-op for every other
    /// policy.
    fn on_quantum_expired(&mut self, _table: &mut ProcessTable, _pid: Pid) {}

    /// Called once per tick before dispatch decisions are made, so MLFQ can
    /// run its periodic boost. A no-op for every other policy.
    fn on_tick(&mut self, _table: &mut ProcessTable, _now: Tick) {}

    /// Called by the mechanism right after a PCB is dispatched, so MLFQ can
    /// initialize a fresh PCB's allotment on its first run. A no-op for
    /// every other policy.
    fn on_dispatch(&mut self, _table: &mut ProcessTable, _pid: Pid) {}
}
