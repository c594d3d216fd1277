//! Bounded circular ring storage.
//!
//! The ring keeps one slot intentionally unused, so a ring built for `n`
//! user-visible elements allocates `n + 1` slots. Two modes share the same
//! storage:
//!
//! - [`RingMode::Lockless`]: the classic Lamport single-producer,
//!   single-consumer ring. The producer publishes `tail` with a release
//!   store, the consumer reads it with acquire, and vice versa for `head`.
//! - [`RingMode::Blocking`]: every mutation serializes on an internal mutex,
//!   which also makes head-of-line preemption safe under contention.
//!
//! The atomic element count is maintained in both modes so it can be read
//! without taking the lock.

use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Ring semantics selected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingMode {
    /// Lock-free fast path for exactly one producer thread and one consumer
    /// thread. Running more than one of either is undefined by contract.
    Lockless,
    /// Mutex-serialized; supports multiple producers and consumers and is
    /// the only mode in which preemption is allowed.
    Blocking,
}

/// Listener invoked whenever the element at the head of a queue changes.
///
/// Notifications run synchronously on the thread performing the triggering
/// push, preempt or pop; implementations must not block and must not
/// re-enter the queue that invoked them.
pub trait HeadMonitor: Send + Sync {
    /// Called with the queue's configured tag after a head change.
    fn on_new_head(&self, tag: u32);
}

/// Callback fired when the element count crosses a watermark.
///
/// Runs synchronously on the pushing or popping thread; must not block and
/// must not re-enter the same queue.
pub type WatermarkHandler = Box<dyn Fn() + Send>;

#[derive(Default)]
struct WatermarkHandlers {
    high: Option<WatermarkHandler>,
    low: Option<WatermarkHandler>,
}

/// Authoritative indices for [`RingMode::Blocking`].
struct Indices {
    head: usize,
    tail: usize,
}

/// Bounded in-place element storage with push-back, pop-front and preempt
/// (push-front).
///
/// Slot `tail` receives pushes, slot `head` serves pops; `preempt` steps
/// `head` backwards so the preempted element is the next one out.
pub(crate) struct Ring<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    /// Allocated slot count: user capacity + 1.
    cap: usize,
    mode: RingMode,

    /// Authoritative in Lockless mode; producer-owned.
    tail: AtomicUsize,
    /// Authoritative in Lockless mode; consumer-owned.
    head: AtomicUsize,
    /// Signed: in lockless mode a pop can race ahead of the matching
    /// push's increment and drive the count to −1 for an instant.
    count: AtomicI64,

    /// Authoritative in Blocking mode.
    indices: Mutex<Indices>,

    monitor: Option<Arc<dyn HeadMonitor>>,
    tag: u32,

    /// −1 disables the threshold.
    high_mark: AtomicI64,
    low_mark: AtomicI64,
    handlers: Mutex<WatermarkHandlers>,
}

// SAFETY: slots are only touched according to the mode discipline - under
// the indices mutex in Blocking mode, or by the single producer/consumer
// pair (synchronized through the release/acquire index stores) in Lockless
// mode. Elements are moved in and out whole, never aliased.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    /// Build a ring with `capacity` user-visible slots.
    pub(crate) fn new(
        capacity: usize,
        mode: RingMode,
        monitor: Option<Arc<dyn HeadMonitor>>,
        tag: u32,
    ) -> Self {
        let cap = capacity + 1;
        let slots = (0..cap)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            cap,
            mode,
            tail: AtomicUsize::new(0),
            head: AtomicUsize::new(0),
            count: AtomicI64::new(0),
            indices: Mutex::new(Indices { head: 0, tail: 0 }),
            monitor,
            tag,
            high_mark: AtomicI64::new(-1),
            low_mark: AtomicI64::new(-1),
            handlers: Mutex::new(WatermarkHandlers::default()),
        }
    }

    pub(crate) fn mode(&self) -> RingMode {
        self.mode
    }

    /// Current element count, readable without the lock.
    pub(crate) fn stored_count(&self) -> usize {
        self.count.load(Ordering::Relaxed).max(0) as usize
    }

    /// Install watermark thresholds and handlers. A threshold of −1
    /// disables its side.
    pub(crate) fn set_watermark_handlers(
        &self,
        high: i64,
        high_handler: Option<WatermarkHandler>,
        low: i64,
        low_handler: Option<WatermarkHandler>,
    ) {
        let mut handlers = self.handlers.lock();
        handlers.high = high_handler;
        handlers.low = low_handler;
        self.high_mark.store(high, Ordering::Relaxed);
        self.low_mark.store(low, Ordering::Relaxed);
    }

    fn next_index(&self, idx: usize) -> usize {
        (idx + 1) % self.cap
    }

    fn prev_index(&self, idx: usize) -> usize {
        (idx + self.cap - 1) % self.cap
    }

    fn notify_head(&self) {
        if let Some(monitor) = &self.monitor {
            monitor.on_new_head(self.tag);
        }
    }

    /// Post-push notifications: `prev` is the count before the push.
    /// The high watermark fires exactly when the push makes the count
    /// `high + 1`; the head listener fires when the ring went
    /// empty → non-empty.
    fn after_push(&self, prev: i64) {
        let high = self.high_mark.load(Ordering::Relaxed);
        if high >= 0 && prev == high {
            let handlers = self.handlers.lock();
            if let Some(handler) = &handlers.high {
                handler();
            }
        }
        if prev == 0 {
            self.notify_head();
        }
    }

    /// Post-pop notifications: `prev` is the count before the pop.
    /// The low watermark fires exactly when the pop makes the count
    /// `low − 1`; the head listener fires when the ring is still
    /// non-empty afterwards.
    fn after_pop(&self, prev: i64) {
        let low = self.low_mark.load(Ordering::Relaxed);
        if low >= 0 && prev == low {
            let handlers = self.handlers.lock();
            if let Some(handler) = &handlers.low {
                handler();
            }
        }
        if prev > 1 {
            self.notify_head();
        }
    }

    /// Append an element at the tail. Returns the element back if the ring
    /// is full.
    pub(crate) fn push(&self, item: T) -> std::result::Result<(), T> {
        match self.mode {
            RingMode::Lockless => {
                let tail = self.tail.load(Ordering::Relaxed);
                let next = self.next_index(tail);
                if next == self.head.load(Ordering::Acquire) {
                    return Err(item);
                }
                // SAFETY: the slot at `tail` is unoccupied (the ring is not
                // full) and only the single producer writes at `tail`.
                unsafe { (*self.slots[tail].get()).write(item) };
                self.tail.store(next, Ordering::Release);
                let prev = self.count.fetch_add(1, Ordering::AcqRel);
                self.after_push(prev);
                Ok(())
            }
            RingMode::Blocking => {
                let mut indices = self.indices.lock();
                let next = self.next_index(indices.tail);
                if next == indices.head {
                    return Err(item);
                }
                // SAFETY: slot unoccupied, and the indices mutex is held.
                unsafe { (*self.slots[indices.tail].get()).write(item) };
                indices.tail = next;
                let prev = self.count.fetch_add(1, Ordering::Relaxed);
                drop(indices);
                self.after_push(prev);
                Ok(())
            }
        }
    }

    /// Insert an element in front of the current head, making it the next
    /// one popped. Only valid in [`RingMode::Blocking`]; preemption mutates
    /// the consumer's index and is unsafe without the mutex.
    pub(crate) fn preempt(&self, item: T) -> std::result::Result<(), T> {
        debug_assert_eq!(self.mode, RingMode::Blocking);
        let mut indices = self.indices.lock();
        let new_head = self.prev_index(indices.head);
        if new_head == indices.tail {
            return Err(item);
        }
        // SAFETY: slot unoccupied, and the indices mutex is held.
        unsafe { (*self.slots[new_head].get()).write(item) };
        indices.head = new_head;
        self.count.fetch_add(1, Ordering::Relaxed);
        drop(indices);
        // The element at head changed, unconditionally. Preemption fires no
        // watermarks.
        self.notify_head();
        Ok(())
    }

    /// Remove and return the element at the head.
    pub(crate) fn pop(&self) -> Option<T> {
        match self.mode {
            RingMode::Lockless => {
                let head = self.head.load(Ordering::Relaxed);
                if head == self.tail.load(Ordering::Acquire) {
                    return None;
                }
                // SAFETY: the ring is non-empty, so the head slot holds an
                // initialized element; only the single consumer reads it.
                let item = unsafe { (*self.slots[head].get()).assume_init_read() };
                self.head.store(self.next_index(head), Ordering::Release);
                let prev = self.count.fetch_sub(1, Ordering::AcqRel);
                self.after_pop(prev);
                Some(item)
            }
            RingMode::Blocking => {
                let mut indices = self.indices.lock();
                if indices.head == indices.tail {
                    return None;
                }
                // SAFETY: non-empty, and the indices mutex is held.
                let item = unsafe { (*self.slots[indices.head].get()).assume_init_read() };
                indices.head = self.next_index(indices.head);
                let prev = self.count.fetch_sub(1, Ordering::Relaxed);
                drop(indices);
                self.after_pop(prev);
                Some(item)
            }
        }
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        // Silence the head listener, then destruct whatever is still queued.
        self.monitor = None;
        while self.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_push_pop_order() {
        let ring: Ring<u32> = Ring::new(4, RingMode::Blocking, None, 0);
        for v in 1..=4 {
            assert!(ring.push(v).is_ok());
        }
        assert_eq!(ring.push(5), Err(5));
        for v in 1..=4 {
            assert_eq!(ring.pop(), Some(v));
        }
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_wraparound() {
        let ring: Ring<u32> = Ring::new(2, RingMode::Blocking, None, 0);
        for round in 0..10 {
            assert!(ring.push(round).is_ok());
            assert!(ring.push(round + 100).is_ok());
            assert_eq!(ring.pop(), Some(round));
            assert_eq!(ring.pop(), Some(round + 100));
        }
        assert_eq!(ring.stored_count(), 0);
    }

    #[test]
    fn test_preempt_jumps_queue() {
        let ring: Ring<&str> = Ring::new(8, RingMode::Blocking, None, 0);
        ring.push("a").unwrap();
        ring.push("b").unwrap();
        assert!(ring.preempt("z").is_ok());
        assert_eq!(ring.pop(), Some("z"));
        assert_eq!(ring.pop(), Some("a"));
        assert_eq!(ring.pop(), Some("b"));
    }

    #[test]
    fn test_preempt_full_ring() {
        let ring: Ring<u32> = Ring::new(1, RingMode::Blocking, None, 0);
        ring.push(1).unwrap();
        assert_eq!(ring.preempt(2), Err(2));
    }

    #[test]
    fn test_count_tracks_operations() {
        let ring: Ring<u32> = Ring::new(3, RingMode::Blocking, None, 0);
        assert_eq!(ring.stored_count(), 0);
        ring.push(1).unwrap();
        ring.push(2).unwrap();
        assert_eq!(ring.stored_count(), 2);
        ring.pop();
        assert_eq!(ring.stored_count(), 1);
    }

    #[test]
    fn test_high_watermark_fires_once_per_crossing() {
        let ring: Ring<u32> = Ring::new(8, RingMode::Blocking, None, 0);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        ring.set_watermark_handlers(
            3,
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            })),
            -1,
            None,
        );
        for v in 0..6 {
            ring.push(v).unwrap();
        }
        // Fires exactly at the 3 -> 4 transition.
        assert_eq!(fired.load(Ordering::Relaxed), 1);

        // Drain below and cross again.
        while ring.pop().is_some() {}
        for v in 0..6 {
            ring.push(v).unwrap();
        }
        assert_eq!(fired.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_low_watermark_fires_once_per_crossing() {
        let ring: Ring<u32> = Ring::new(8, RingMode::Blocking, None, 0);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        ring.set_watermark_handlers(
            -1,
            None,
            2,
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            })),
        );
        for v in 0..4 {
            ring.push(v).unwrap();
        }
        ring.pop();
        ring.pop();
        assert_eq!(fired.load(Ordering::Relaxed), 0);
        // 2 -> 1 crossing.
        ring.pop();
        assert_eq!(fired.load(Ordering::Relaxed), 1);
        ring.pop();
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_preempt_fires_no_watermarks() {
        let ring: Ring<u32> = Ring::new(8, RingMode::Blocking, None, 0);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        ring.set_watermark_handlers(
            0,
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            })),
            -1,
            None,
        );
        ring.preempt(1).unwrap();
        assert_eq!(fired.load(Ordering::Relaxed), 0);
    }

    struct CountingMonitor {
        events: AtomicUsize,
    }

    impl HeadMonitor for CountingMonitor {
        fn on_new_head(&self, _tag: u32) {
            self.events.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_head_notifications() {
        let monitor = Arc::new(CountingMonitor {
            events: AtomicUsize::new(0),
        });
        let ring: Ring<u32> = Ring::new(4, RingMode::Blocking, Some(monitor.clone()), 7);

        // empty -> non-empty
        ring.push(1).unwrap();
        assert_eq!(monitor.events.load(Ordering::Relaxed), 1);
        // non-empty push: no notification
        ring.push(2).unwrap();
        assert_eq!(monitor.events.load(Ordering::Relaxed), 1);
        // preempt: always a notification
        ring.preempt(3).unwrap();
        assert_eq!(monitor.events.load(Ordering::Relaxed), 2);
        // pop leaving a non-empty ring: notification
        ring.pop();
        assert_eq!(monitor.events.load(Ordering::Relaxed), 3);
        ring.pop();
        assert_eq!(monitor.events.load(Ordering::Relaxed), 4);
        // pop emptying the ring: none
        ring.pop();
        assert_eq!(monitor.events.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_drop_releases_queued_elements() {
        let ring: Ring<Arc<u32>> = Ring::new(4, RingMode::Blocking, None, 0);
        let value = Arc::new(42u32);
        ring.push(Arc::clone(&value)).unwrap();
        ring.push(Arc::clone(&value)).unwrap();
        assert_eq!(Arc::strong_count(&value), 3);
        drop(ring);
        assert_eq!(Arc::strong_count(&value), 1);
    }

    #[test]
    fn test_lockless_spsc_transfer() {
        let ring: Arc<Ring<u32>> = Arc::new(Ring::new(4, RingMode::Lockless, None, 0));
        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for v in 0..10_000u32 {
                    loop {
                        if ring.push(v).is_ok() {
                            break;
                        }
                        thread::yield_now();
                    }
                }
            })
        };
        let consumer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for expected in 0..10_000u32 {
                    loop {
                        if let Some(v) = ring.pop() {
                            assert_eq!(v, expected);
                            break;
                        }
                        thread::yield_now();
                    }
                }
            })
        };
        producer.join().unwrap();
        consumer.join().unwrap();
        assert_eq!(ring.stored_count(), 0);
    }
}
