//! Mutex-protected FIFO shared between the facade and one worker.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::lock;

/// FIFO of messages. The lock is held only for the append or the swap, never
/// while a message is serialized or written.
#[derive(Debug)]
pub(crate) struct MessageQueue<M> {
    inner: Mutex<VecDeque<M>>,
    side: &'static str,
    warning_level: usize,
}

impl<M> MessageQueue<M> {
    /// `warning_level` of 0 disables the backlog warning.
    pub(crate) fn new(side: &'static str, warning_level: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            side,
            warning_level,
        }
    }

    pub(crate) fn push(&self, msg: M) {
        let len = {
            let mut queue = lock(&self.inner);
            queue.push_back(msg);
            queue.len()
        };
        if self.warning_level > 0 && len % self.warning_level == 0 {
            tracing::warn!("{} queue reached {} pending messages", self.side, len);
        }
    }

    /// Swap the whole content out in one step.
    pub(crate) fn take_all(&self) -> VecDeque<M> {
        std::mem::take(&mut *lock(&self.inner))
    }

    pub(crate) fn drain_into<C: Extend<M>>(&self, collector: &mut C) {
        collector.extend(self.take_all());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.inner).len()
    }
}
