//! One module per scheduling discipline (spec §4.3.2).

pub mod fcfs;
pub mod mlfq;
pub mod priority;
pub mod round_robin;
pub mod sjf;
pub mod srtf;

pub use fcfs::FcfsPolicy;
pub use mlfq::MlfqPolicy;
pub use priority::PriorityPolicy;
pub use round_robin::RoundRobinPolicy;
pub use sjf::SjfPolicy;
pub use srtf::SrtfPolicy;

use std::collections::VecDeque;

use crate::pcb::Pid;

/// Scan `ready`, remove and return the entry with the smallest `key_of`
/// value, preserving the relative order of everything left behind. Shared by
/// every policy whose selection rule is "best of the ready set" rather than
/// plain FIFO (Priority, SJF, SRTF) — the tie-break baked into each `key_of`
/// closure is "policy key, then arrival tick, then PID" per spec §4.3.2.
pub(crate) fn select_best<K: Ord>(ready: &mut VecDeque<Pid>, mut key_of: impl FnMut(Pid) -> K) -> Option<Pid> {
    let mut best_idx = None;
    let mut best_key: Option<K> = None;
    for (i, &pid) in ready.iter().enumerate() {
        let k = key_of(pid);
        if best_key.as_ref().map(|b| k < *b).unwrap_or(true) {
            best_key = Some(k);
            best_idx = Some(i);
        }
    }
    best_idx.and_then(|idx| ready.remove(idx))
}
