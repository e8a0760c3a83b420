//! Mutex-and-condvar work queues

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// A FIFO queue of tasks shared between producers and one or more
/// consumers.
///
/// All operations lock the same mutex; `dequeue` additionally parks on a
/// condition variable while the queue is empty. Values come out of the
/// front in insertion order, except for `try_steal`, which removes from
/// the back so that a thief and the owner work on opposite ends of the
/// queue and stay out of each other's cache lines.
pub struct WorkQueue<T> {
    queue: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> WorkQueue<T> {
    pub fn new() -> WorkQueue<T> {
        WorkQueue {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Inserts a value at the back of the queue, waking one waiter.
    pub fn enqueue(&self, value: T) {
        let mut queue = self.queue.lock().unwrap();
        queue.push_back(value);
        self.available.notify_one();
    }

    /// Removes the value at the front of the queue, blocking until one is
    /// available.
    pub fn dequeue(&self) -> T {
        let mut queue = self.queue.lock().unwrap();
        loop {
            if let Some(value) = queue.pop_front() {
                return value;
            }
            queue = self.available.wait(queue).unwrap();
        }
    }

    /// Attempts to remove the value at the front of the queue, returning
    /// `None` instead of blocking when the queue is empty.
    pub fn try_dequeue(&self) -> Option<T> {
        self.queue.lock().unwrap().pop_front()
    }

    /// Attempts to remove the value at the *back* of the queue.
    ///
    /// Callers must be prepared for this to fail; an empty queue is not an
    /// error.
    pub fn try_steal(&self) -> Option<T> {
        self.queue.lock().unwrap().pop_back()
    }

    /// Number of values currently queued.
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
