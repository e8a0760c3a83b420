//! Shared-mutation cells whose synchronization lives outside the type system

use std::cell::UnsafeCell;

/// A cell granting shared mutable access to its contents, on the promise
/// that the callers provide the synchronization themselves.
///
/// Two users in this crate uphold that promise in different ways: the
/// framebuffer serializes writes to each cell pair with a per-pixel mutex,
/// and the thread pool restricts each worker's local task deque to the one
/// thread that owns it.
///
/// `repr(transparent)` keeps the memory layout identical to a bare `T`, so
/// a plane of cells can be handed to the host as a plain byte buffer once
/// all writers have quiesced.
#[repr(transparent)]
pub struct SharedCell<T> {
    inner: UnsafeCell<T>,
}

impl<T> SharedCell<T> {
    pub fn new(value: T) -> SharedCell<T> {
        SharedCell { inner: UnsafeCell::new(value) }
    }

    /// Raw pointer to the contents. Dereferencing requires that no other
    /// access to this cell is in flight.
    #[inline(always)]
    pub fn get(&self) -> *mut T {
        self.inner.get()
    }

    /// Exclusive access through an exclusive reference; always safe.
    #[inline(always)]
    pub fn get_mut(&mut self) -> &mut T {
        unsafe { &mut *self.inner.get() }
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

unsafe impl<T: Send> Send for SharedCell<T> {}

unsafe impl<T: Send> Sync for SharedCell<T> {}
