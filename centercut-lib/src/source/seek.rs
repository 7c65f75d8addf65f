//! Request/result handles for asynchronous seeks.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekStatus {
    Pending,
    /// Applied; the source now produces from this frame.
    Completed(u64),
    /// A newer seek replaced this one before it was applied.
    Superseded,
    Cancelled,
}

/// Handle returned by a seek request; poll it to learn the outcome.
#[derive(Debug, Clone)]
pub struct SeekTicket {
    frame: u64,
    status: Arc<Mutex<SeekStatus>>,
}

impl SeekTicket {
    fn new(frame: u64) -> Self {
        Self {
            frame,
            status: Arc::new(Mutex::new(SeekStatus::Pending)),
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn poll(&self) -> SeekStatus {
        *self.status.lock().unwrap()
    }

    pub fn is_pending(&self) -> bool {
        self.poll() == SeekStatus::Pending
    }

    /// Withdraw the request if it has not been applied yet.
    ///
    /// # Returns
    /// `true` if the seek was still pending and is now cancelled.
    pub fn cancel(&self) -> bool {
        self.transition(SeekStatus::Cancelled)
    }

    fn transition(&self, next: SeekStatus) -> bool {
        let mut status = self.status.lock().unwrap();
        if *status != SeekStatus::Pending {
            return false;
        }
        *status = next;
        true
    }
}

/// At most one outstanding seek; a new request supersedes the old one.
#[derive(Debug, Default)]
pub(crate) struct SeekRequests {
    pending: Option<SeekTicket>,
}

impl SeekRequests {
    pub(crate) fn request(&mut self, frame: u64) -> SeekTicket {
        if let Some(previous) = self.pending.take() {
            previous.transition(SeekStatus::Superseded);
        }
        let ticket = SeekTicket::new(frame);
        self.pending = Some(ticket.clone());
        ticket
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(SeekTicket::is_pending)
    }

    /// Take the outstanding request unless it was cancelled meanwhile.
    pub(crate) fn take(&mut self) -> Option<SeekTicket> {
        self.pending.take().filter(SeekTicket::is_pending)
    }

    /// Drop any outstanding request, marking it superseded.
    pub(crate) fn clear(&mut self) {
        if let Some(previous) = self.pending.take() {
            previous.transition(SeekStatus::Superseded);
        }
    }
}

impl SeekTicket {
    pub(crate) fn complete(&self) -> bool {
        self.transition(SeekStatus::Completed(self.frame))
    }
}
