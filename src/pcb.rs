//! The Process Control Block and its state machine.

use crate::ipc::MailboxId;
use crate::sync::{MutexId, SemId};

/// Monotone tick count.
pub type Tick = u64;

/// Process identifier, unique over all non-`Terminated` PCBs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

impl std::fmt::Display for Pid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maximum bytes kept of a process name (§3: "bounded length (≤31 bytes)").
pub const MAX_NAME_LEN: usize = 31;

/// Opaque stack region handed out by a [`crate::alloc_iface::StackAllocator`].
///
/// The core never reads or writes through this; it is a bookkeeping handle
/// passed back verbatim to `free` on termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    pub base: usize,
    pub len: usize,
}

/// Opaque saved CPU context. The scheduler only ever swaps this; it never
/// inspects its contents, which is why it carries no fields here — a real
/// kernel on bare metal would store a register-save frame, a simulated host
/// stores nothing at all, and the PCB state machine does not care which.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavedContext;

/// Reason a PCB is `Blocked`, and which waiter queue it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCause {
    None,
    Sleep,
    MboxFull(MailboxId),
    MboxEmpty(MailboxId),
    Mutex(MutexId),
    Sem(SemId),
}

/// The PCB's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Blocked(BlockCause),
    Terminated,
}

impl ProcessState {
    pub fn is_blocked_on(&self, cause: BlockCause) -> bool {
        matches!(self, ProcessState::Blocked(c) if *c == cause)
    }
}

/// One process-management record.
#[derive(Debug, Clone)]
pub struct Pcb {
    pub pid: Pid,
    pub name: heapless::String<MAX_NAME_LEN>,
    pub state: ProcessState,
    pub priority: u8,
    pub entry_point: usize,
    pub stack_region: StackRegion,
    pub saved_context: SavedContext,

    pub burst_estimate: u32,
    pub remaining_work: u32,
    pub arrival_tick: Tick,
    pub time_slice: u32,
    pub remaining_slice: u32,
    pub mlfq_level: usize,
    pub mlfq_allotment: u32,

    pub total_ticks: u64,
    pub first_dispatch_tick: Option<Tick>,
    pub last_dispatch_tick: Option<Tick>,
}

impl Pcb {
    /// Truncate `name` to [`MAX_NAME_LEN`] bytes at a char boundary, matching
    /// the fixed-size, null-padded name buffer the source kernel used —
    /// see SPEC_FULL.md §9 for why truncation (not an error) is correct here.
    pub(crate) fn truncated_name(name: &str) -> heapless::String<MAX_NAME_LEN> {
        let mut end = name.len().min(MAX_NAME_LEN);
        while end > 0 && !name.is_char_boundary(end) {
            end -= 1;
        }
        heapless::String::try_from(&name[..end]).unwrap_or_default()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ProcessState::Ready)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ProcessState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_name_keeps_short_names_intact() {
        assert_eq!(Pcb::truncated_name("shell").as_str(), "shell");
    }

    #[test]
    fn truncated_name_clips_at_max_len() {
        let long = "x".repeat(64);
        let got = Pcb::truncated_name(&long);
        assert_eq!(got.len(), MAX_NAME_LEN);
    }

    #[test]
    fn truncated_name_does_not_split_a_multibyte_char() {
        // 31 copies of a 2-byte char would split mid-character at byte 31.
        let s: String = std::iter::repeat('é').take(20).collect();
        let got = Pcb::truncated_name(&s);
        assert!(got.is_char_boundary(got.len()));
        assert!(got.len() <= MAX_NAME_LEN);
    }

    #[test]
    fn is_blocked_on_matches_only_the_same_cause() {
        let s = ProcessState::Blocked(BlockCause::Sleep);
        assert!(s.is_blocked_on(BlockCause::Sleep));
        assert!(!s.is_blocked_on(BlockCause::None));
    }
}
