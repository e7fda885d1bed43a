//! Bounded mailboxes (spec §4.5.1): fixed-capacity message queues with
//! blocking send/recv and FIFO-fair wakeup.
//!
//! A freed slot or an arriving message is handed directly to the
//! longest-waiting blocked sender/receiver rather than left for whoever asks
//! next — the same direct-handoff discipline [`crate::sync::Mutex`] and
//! [`crate::sync::Semaphore`] use, needed here too or a concurrent
//! non-blocking caller could steal a slot from ahead of a FIFO-blocked one.

use std::collections::BTreeMap;
use std::collections::VecDeque;

use crate::error::{CoreError, CoreResult};
use crate::pcb::{Pid, MAX_NAME_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MailboxId(pub u32);

impl std::fmt::Display for MailboxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub sender_pid: Pid,
    pub payload: Vec<u8>,
}

/// One bounded mailbox. Holds no blocking logic itself — that lives in
/// [`crate::kernel::Kernel`], which owns the condvar PCBs actually park on;
/// this struct is the queue, the FIFO waiter lists, and the handoff slots.
pub struct Mailbox {
    pub id: MailboxId,
    pub name: Option<heapless::String<MAX_NAME_LEN>>,
    capacity: usize,
    msg_size: usize,
    messages: VecDeque<Message>,
    sender_wait: VecDeque<(Pid, Vec<u8>)>,
    receiver_wait: VecDeque<Pid>,
    delivered: BTreeMap<Pid, Message>,
    sent: u64,
    received: u64,
}

impl Mailbox {
    fn new(id: MailboxId, name: Option<&str>, capacity: usize, msg_size: usize) -> Self {
        Self {
            id,
            name: name.map(|n| heapless::String::try_from(n).unwrap_or_default()),
            capacity,
            msg_size,
            messages: VecDeque::with_capacity(capacity),
            sender_wait: VecDeque::new(),
            receiver_wait: VecDeque::new(),
            delivered: BTreeMap::new(),
            sent: 0,
            received: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn msg_size(&self) -> usize {
        self.msg_size
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.messages.len() >= self.capacity
    }

    pub fn stats(&self) -> (u64, u64) {
        (self.sent, self.received)
    }

    /// A payload larger than `msg_size` is a caller error, not something to
    /// truncate or silently accept (spec §9: oversize send is an error).
    ///
    /// If a receiver is already parked waiting, the message bypasses the
    /// queue and is handed straight to them; `Ok(Some(pid))` tells the
    /// caller which PCB to wake. Otherwise the message is queued normally
    /// and `Ok(None)` is returned.
    pub fn try_send(&mut self, sender: Pid, payload: &[u8]) -> CoreResult<Option<Pid>> {
        if payload.len() > self.msg_size {
            return Err(CoreError::BadArgs);
        }
        if let Some(receiver) = self.receiver_wait.pop_front() {
            self.delivered.insert(receiver, Message { sender_pid: sender, payload: payload.to_vec() });
            self.sent += 1;
            self.received += 1;
            return Ok(Some(receiver));
        }
        if self.is_full() {
            return Err(CoreError::Full);
        }
        self.messages.push_back(Message { sender_pid: sender, payload: payload.to_vec() });
        self.sent += 1;
        Ok(None)
    }

    /// If a sender is parked waiting for room, their message is pushed into
    /// the slot this recv just freed and `Ok((msg, Some(pid)))` tells the
    /// caller which PCB to wake.
    pub fn try_recv(&mut self) -> CoreResult<(Message, Option<Pid>)> {
        match self.messages.pop_front() {
            Some(msg) => {
                self.received += 1;
                let woken = self.sender_wait.pop_front().map(|(pid, payload)| {
                    self.messages.push_back(Message { sender_pid: pid, payload });
                    self.sent += 1;
                    pid
                });
                Ok((msg, woken))
            }
            None => Err(CoreError::Empty),
        }
    }

    /// Collect the message a blocked `recv` was handed directly, after
    /// waking. Present iff `try_send` returned `Ok(Some(pid))` for this pid.
    pub fn take_delivered(&mut self, pid: Pid) -> Option<Message> {
        self.delivered.remove(&pid)
    }

    pub fn push_sender_wait(&mut self, pid: Pid, payload: Vec<u8>) {
        self.sender_wait.push_back((pid, payload));
    }

    pub fn push_receiver_wait(&mut self, pid: Pid) {
        self.receiver_wait.push_back(pid);
    }

    /// Drop `pid` from every waiter/delivery slot, used when a waiting PCB
    /// is killed out from under its blocked send/recv.
    pub fn cancel_wait(&mut self, pid: Pid) {
        self.sender_wait.retain(|(p, _)| *p != pid);
        self.receiver_wait.retain(|&p| p != pid);
        self.delivered.remove(&pid);
    }

    /// Every PCB currently parked on this mailbox, sender and receiver
    /// waiters alike — used by `destroy` to wake them all before the
    /// mailbox disappears out from under them.
    pub fn waiter_pids(&self) -> Vec<Pid> {
        self.sender_wait
            .iter()
            .map(|(pid, _)| *pid)
            .chain(self.receiver_wait.iter().copied())
            .collect()
    }
}

/// Fixed-capacity registry of mailboxes, mirroring [`crate::table::ProcessTable`]'s
/// id-allocation and name-lookup shape.
pub struct MailboxRegistry {
    capacity: usize,
    mailboxes: BTreeMap<MailboxId, Mailbox>,
    by_name: BTreeMap<String, MailboxId>,
    next_id: u32,
}

impl MailboxRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            mailboxes: BTreeMap::new(),
            by_name: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn create(&mut self, name: Option<&str>, capacity: usize, msg_size: usize) -> CoreResult<MailboxId> {
        if capacity == 0 || msg_size == 0 {
            return Err(CoreError::BadArgs);
        }
        if let Some(name) = name {
            if self.by_name.contains_key(name) {
                return Err(CoreError::NameExists);
            }
        }
        if self.mailboxes.len() >= self.capacity {
            return Err(CoreError::TableFull);
        }
        let id = MailboxId(self.next_id);
        self.next_id += 1;
        self.mailboxes.insert(id, Mailbox::new(id, name, capacity, msg_size));
        if let Some(name) = name {
            self.by_name.insert(name.to_string(), id);
        }
        log::debug!("mailbox registry: created mailbox {}", id);
        Ok(id)
    }

    /// Removes the mailbox and returns every PCB that was parked waiting on
    /// it; the caller (`Kernel::mailbox_destroy`) is responsible for waking
    /// each one with an error, since the registry has no access to the
    /// scheduler or condvar.
    pub fn destroy(&mut self, id: MailboxId) -> CoreResult<Vec<Pid>> {
        let mailbox = self.mailboxes.remove(&id).ok_or(CoreError::NotFound)?;
        if let Some(name) = &mailbox.name {
            self.by_name.remove(name.as_str());
        }
        log::debug!("mailbox registry: destroyed mailbox {}", id);
        Ok(mailbox.waiter_pids())
    }

    pub fn find(&self, name: &str) -> Option<MailboxId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: MailboxId) -> Option<&Mailbox> {
        self.mailboxes.get(&id)
    }

    pub fn get_mut(&mut self, id: MailboxId) -> Option<&mut Mailbox> {
        self.mailboxes.get_mut(&id)
    }

    pub fn list(&self) -> Vec<&Mailbox> {
        self.mailboxes.values().collect()
    }
}
