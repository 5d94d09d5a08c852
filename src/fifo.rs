//! Byte ring shared between the application and transfer-completion contexts.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

/// Fixed-capacity byte FIFO.
///
/// Every cursor update happens inside a critical section, so one side may
/// run from an interrupt while the other runs from application code. What a
/// critical section costs is up to the platform implementation (a global
/// lock on hosted targets, masking interrupts on single-core MCUs).
///
/// Writes beyond the remaining capacity are truncated, never blocked.
pub struct StreamBuffer<const N: usize> {
    ring: Mutex<RefCell<Deque<u8, N>>>,
}

impl<const N: usize> Default for StreamBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> StreamBuffer<N> {
    pub const fn new() -> Self {
        StreamBuffer {
            ring: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Append as many of `bytes` as fit, return how many were accepted.
    pub fn enqueue(&self, bytes: &[u8]) -> usize {
        critical_section::with(|cs| {
            let mut ring = self.ring.borrow_ref_mut(cs);
            let count = bytes.len().min(N - ring.len());
            for byte in &bytes[..count] {
                // room was checked above
                let _ = ring.push_back(*byte);
            }
            count
        })
    }

    /// Move up to `out.len()` bytes out of the ring, oldest first.
    pub fn dequeue(&self, out: &mut [u8]) -> usize {
        critical_section::with(|cs| {
            let mut ring = self.ring.borrow_ref_mut(cs);
            let mut count = 0;
            while count < out.len() {
                match ring.pop_front() {
                    Some(byte) => out[count] = byte,
                    None => break,
                }
                count += 1;
            }
            count
        })
    }

    /// Copy up to `out.len()` bytes out of the ring without consuming them.
    pub fn peek(&self, out: &mut [u8]) -> usize {
        critical_section::with(|cs| {
            let ring = self.ring.borrow_ref(cs);
            let mut count = 0;
            for (slot, byte) in out.iter_mut().zip(ring.iter()) {
                *slot = *byte;
                count += 1;
            }
            count
        })
    }

    /// Drop up to `count` of the oldest bytes, return how many were dropped.
    pub fn discard(&self, count: usize) -> usize {
        critical_section::with(|cs| {
            let mut ring = self.ring.borrow_ref_mut(cs);
            let count = count.min(ring.len());
            for _ in 0..count {
                ring.pop_front();
            }
            count
        })
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.ring.borrow_ref(cs).len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn free(&self) -> usize {
        N - self.len()
    }

    pub fn clear(&self) {
        critical_section::with(|cs| self.ring.borrow_ref_mut(cs).clear())
    }
}
