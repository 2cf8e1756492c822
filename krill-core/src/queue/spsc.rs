//! Bounded lock-free single-producer single-consumer queues
//!
//! Every hand-off between workers goes through one of these rings. The
//! contract is enforced by ownership: `channel()` returns a `Producer` and
//! a `Consumer` half, neither of which is `Clone`, so exactly one thread
//! can ever touch each index.
//!
//! Memory ordering: the producer writes the payload slot first and then
//! publishes the tail with `Release`; the consumer reads the tail with
//! `Acquire` before touching the slot. Head and tail live on separate
//! cache lines (`CachePadded`) so the two threads never false-share.
//!
//! Overflow policy: the ring never overwrites. A full queue rejects the
//! message and `push_or_drop` counts it; oldest-wins is deliberately not
//! offered.

use crossbeam_utils::CachePadded;
use std::cell::{Cell, UnsafeCell};
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Snapshot of a queue's counters for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub capacity: usize,
    pub len: usize,
    pub dropped: u64,
}

struct Ring<T> {
    buf: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    /// Consumer index; only the consumer writes it
    head: CachePadded<AtomicUsize>,
    /// Producer index; only the producer writes it
    tail: CachePadded<AtomicUsize>,
    /// Messages rejected because the ring was full
    dropped: AtomicU64,
}

// The ring is shared between exactly two threads; slot access is
// serialized by the head/tail protocol.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two();
        let buf = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            buf,
            mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            dropped: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.mask + 1
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        // Both halves are gone; drain whatever is still in flight.
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        for i in head..tail {
            let slot = &self.buf[i & self.mask];
            unsafe { (*slot.get()).assume_init_drop() };
        }
    }
}

/// Producing half of an SPSC channel
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
    /// Head value last observed; refreshed only when the ring looks full
    cached_head: Cell<usize>,
}

/// Consuming half of an SPSC channel
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
    /// Tail value last observed; refreshed only when the ring looks empty
    cached_tail: Cell<usize>,
}

unsafe impl<T: Send> Send for Producer<T> {}
unsafe impl<T: Send> Send for Consumer<T> {}

/// Create a bounded SPSC channel
///
/// `capacity` is rounded up to the next power of two.
pub fn channel<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity > 0, "queue capacity must be non-zero");
    let ring = Arc::new(Ring::new(capacity));
    (
        Producer {
            ring: Arc::clone(&ring),
            cached_head: Cell::new(0),
        },
        Consumer {
            ring,
            cached_tail: Cell::new(0),
        },
    )
}

impl<T> Producer<T> {
    /// Enqueue without blocking; returns the item back when full
    #[inline(always)]
    pub fn push(&self, item: T) -> Result<(), T> {
        let ring = &*self.ring;
        let tail = ring.tail.load(Ordering::Relaxed);

        if tail.wrapping_sub(self.cached_head.get()) >= ring.capacity() {
            // Looks full on the cached view; refresh from the consumer
            self.cached_head.set(ring.head.load(Ordering::Acquire));
            if tail.wrapping_sub(self.cached_head.get()) >= ring.capacity() {
                return Err(item);
            }
        }

        let slot = &ring.buf[tail & ring.mask];
        unsafe { (*slot.get()).write(item) };
        ring.tail.store(tail.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Enqueue, dropping the message and counting it when full
    ///
    /// Returns `true` when the message was delivered.
    #[inline(always)]
    pub fn push_or_drop(&self, item: T) -> bool {
        match self.push(item) {
            Ok(()) => true,
            Err(_dropped) => {
                self.ring.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Messages dropped on this queue so far
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.ring.dropped.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> QueueStats {
        stats_of(&self.ring)
    }
}

impl<T> Consumer<T> {
    /// Dequeue without blocking; `None` when empty
    #[inline(always)]
    pub fn pop(&self) -> Option<T> {
        let ring = &*self.ring;
        let head = ring.head.load(Ordering::Relaxed);

        if head == self.cached_tail.get() {
            // Looks empty on the cached view; refresh from the producer
            self.cached_tail.set(ring.tail.load(Ordering::Acquire));
            if head == self.cached_tail.get() {
                return None;
            }
        }

        let slot = &ring.buf[head & ring.mask];
        let item = unsafe { (*slot.get()).assume_init_read() };
        ring.head.store(head.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    /// Current number of queued messages
    #[inline]
    pub fn len(&self) -> usize {
        let ring = &*self.ring;
        ring.tail
            .load(Ordering::Acquire)
            .wrapping_sub(ring.head.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages dropped on this queue so far
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.ring.dropped.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> QueueStats {
        stats_of(&self.ring)
    }
}

fn stats_of<T>(ring: &Ring<T>) -> QueueStats {
    let tail = ring.tail.load(Ordering::Acquire);
    let head = ring.head.load(Ordering::Acquire);
    QueueStats {
        capacity: ring.capacity(),
        len: tail.wrapping_sub(head),
        dropped: ring.dropped.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fifo_order() {
        let (tx, rx) = channel::<u32>(8);
        for i in 0..5 {
            tx.push(i).unwrap();
        }
        for i in 0..5 {
            assert_eq!(rx.pop(), Some(i));
        }
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn capacity_rounds_to_power_of_two() {
        let (tx, rx) = channel::<u8>(6);
        assert_eq!(tx.stats().capacity, 8);
        for _ in 0..8 {
            tx.push(0).unwrap();
        }
        assert!(tx.push(0).is_err());
        assert_eq!(rx.len(), 8);
    }

    #[test]
    fn full_queue_rejects_without_overwrite() {
        let (tx, rx) = channel::<u32>(4);
        for i in 0..4 {
            tx.push(i).unwrap();
        }
        assert_eq!(tx.push(99), Err(99));
        // Oldest message is still first out
        assert_eq!(rx.pop(), Some(0));
    }

    #[test]
    fn drop_counter() {
        let (tx, rx) = channel::<u32>(2);
        assert!(tx.push_or_drop(1));
        assert!(tx.push_or_drop(2));
        assert!(!tx.push_or_drop(3));
        assert!(!tx.push_or_drop(4));
        assert_eq!(tx.dropped(), 2);
        assert_eq!(rx.stats().dropped, 2);
        assert_eq!(rx.pop(), Some(1));
    }

    #[test]
    fn non_copy_payloads_are_dropped_cleanly() {
        let (tx, rx) = channel::<String>(4);
        tx.push("a".to_string()).unwrap();
        tx.push("b".to_string()).unwrap();
        assert_eq!(rx.pop().as_deref(), Some("a"));
        // "b" still queued when both halves drop; Ring::drop must free it
        drop(tx);
        drop(rx);
    }

    #[test]
    fn dequeued_is_prefix_of_enqueued() {
        const N: u64 = 200_000;
        let (tx, rx) = channel::<u64>(1024);

        let producer = thread::spawn(move || {
            let mut sent = 0u64;
            let mut next = 0u64;
            while next < N {
                if tx.push(next).is_ok() {
                    sent += 1;
                    next += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
            sent
        });

        let consumer = thread::spawn(move || {
            let mut expected = 0u64;
            while expected < N {
                match rx.pop() {
                    Some(v) => {
                        // No reordering, no duplicates, no gaps
                        assert_eq!(v, expected);
                        expected += 1;
                    }
                    None => std::hint::spin_loop(),
                }
            }
            expected
        });

        assert_eq!(producer.join().unwrap(), N);
        assert_eq!(consumer.join().unwrap(), N);
    }
}
