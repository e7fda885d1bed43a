//! Error kinds returned by the process-management core.
//!
//! Every fallible core entry point returns `Result<T, CoreError>`. None of
//! these are recovered internally — they are surfaced verbatim to the
//! immediate caller (a test, or the `schedctl` diagnostic binary).

use std::fmt;

/// The full catalog of error conditions the core can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// A PID, mailbox, mutex, or semaphore id does not refer to a live entity.
    NotFound,
    /// The process table is at capacity.
    TableFull,
    /// A registry (mailbox/mutex/semaphore) is at capacity.
    OutOfSlots,
    /// A named resource already exists under that name.
    NameExists,
    /// Null/empty name, zero-size buffer where one is required, negative quantum, or similar.
    BadArgs,
    /// Mailbox is at capacity (non-blocking send).
    Full,
    /// Mailbox has no messages (non-blocking recv).
    Empty,
    /// `trylock` found the mutex already held.
    Busy,
    /// `trywait` found the semaphore at zero.
    WouldBlock,
    /// `unlock` called by a PCB that is not the current owner.
    NotOwner,
    /// `unlock` called on a mutex that is not locked.
    NotLocked,
    /// A blocked operation was aborted because the waiting PCB was killed.
    Cancelled,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            CoreError::NotFound => "no such entity",
            CoreError::TableFull => "process table is full",
            CoreError::OutOfSlots => "registry has no free slots",
            CoreError::NameExists => "a resource with that name already exists",
            CoreError::BadArgs => "invalid arguments",
            CoreError::Full => "mailbox is full",
            CoreError::Empty => "mailbox is empty",
            CoreError::Busy => "resource is held by another process",
            CoreError::WouldBlock => "operation would block",
            CoreError::NotOwner => "caller does not own this mutex",
            CoreError::NotLocked => "mutex is not locked",
            CoreError::Cancelled => "wait was cancelled",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for CoreError {}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_text_is_nonempty_for_every_variant() {
        let variants = [
            CoreError::NotFound,
            CoreError::TableFull,
            CoreError::OutOfSlots,
            CoreError::NameExists,
            CoreError::BadArgs,
            CoreError::Full,
            CoreError::Empty,
            CoreError::Busy,
            CoreError::WouldBlock,
            CoreError::NotOwner,
            CoreError::NotLocked,
            CoreError::Cancelled,
        ];
        for v in variants {
            assert!(!v.to_string().is_empty());
        }
    }
}
