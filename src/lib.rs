//! Process-management core of a small teaching kernel: a PCB table, a
//! pluggable multi-algorithm scheduler driven by a tick source, and the
//! mailbox/mutex/semaphore primitives that block and wake PCBs.
//!
//! This crate has no hardware dependency and no global state — every test
//! (and `schedctl`) constructs its own [`kernel::Kernel`].

pub mod alloc_iface;
pub mod config;
pub mod error;
pub mod ipc;
pub mod kernel;
pub mod log_ring;
pub mod pcb;
pub mod scheduler;
pub mod sync;
pub mod table;
pub mod tick;

pub use config::KernelConfig;
pub use error::{CoreError, CoreResult};
pub use kernel::Kernel;
pub use pcb::{Pcb, Pid};
