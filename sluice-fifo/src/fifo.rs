//! The waitable bounded FIFO.
//!
//! [`Fifo`] pairs a circular ring with two counting semaphores: `write_sem`
//! starts at the queue capacity (one resource per free slot) and `read_sem`
//! starts at zero (one resource per queued element). Producers wait for
//! write space, write, and thereby post read data; consumers wait for read
//! data, read, and thereby post write space.
//!
//! Flow control is the shutdown mechanism: disabling flow refuses all
//! subsequent writes and wakes every parked waiter, which re-checks the
//! flag and returns [`FifoError::FlowDisabled`].

use crate::error::{FifoError, Result, WriteError};
use crate::ring::{HeadMonitor, Ring, RingMode, WatermarkHandler};
use crate::semaphore::Semaphore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Construction parameters for a [`Fifo`].
#[derive(Debug, Clone)]
pub struct FifoConfig {
    /// Number of user-visible slots (the ring allocates one more).
    pub capacity: usize,
    /// Ring semantics; preemption requires [`RingMode::Blocking`].
    pub mode: RingMode,
    /// Whether a read-side semaphore is instantiated. Without one, waiting
    /// for read data is refused with [`FifoError::FlowDisabled`].
    pub read_signaling: bool,
    /// Opaque tag echoed to the head monitor.
    pub tag: u32,
}

impl Default for FifoConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            mode: RingMode::Lockless,
            read_signaling: true,
            tag: 0,
        }
    }
}

impl FifoConfig {
    /// Create a config with the given capacity and defaults otherwise.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set the ring mode.
    pub fn with_mode(mut self, mode: RingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable the read-side semaphore.
    pub fn with_read_signaling(mut self, read_signaling: bool) -> Self {
        self.read_signaling = read_signaling;
        self
    }

    /// Set the tag echoed to the head monitor.
    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = tag;
        self
    }
}

/// A bounded FIFO with blocking waits, flow control and preemption.
///
/// Elements transfer ownership across the queue: `write` moves in, `read`
/// moves out, and the queue performs no reference counting of its own.
///
/// A new FIFO has flow disabled; call [`set_flow_enabled`] to start
/// accepting writes.
///
/// [`set_flow_enabled`]: Self::set_flow_enabled
pub struct Fifo<T> {
    ring: Ring<T>,
    write_sem: Semaphore,
    read_sem: Option<Semaphore>,
    flow_enabled: AtomicBool,
    has_been_read: AtomicBool,
    capacity: usize,
    tag: u32,
}

impl<T> Fifo<T> {
    /// Build a FIFO from `config` with no head monitor.
    pub fn new(config: FifoConfig) -> Self {
        Self::with_head_monitor(config, None)
    }

    /// Build a FIFO whose head monitor is notified on every change of the
    /// element at the front of the queue.
    pub fn with_head_monitor(config: FifoConfig, monitor: Option<Arc<dyn HeadMonitor>>) -> Self {
        debug!(
            "creating fifo (capacity {}, mode {:?}, tag {})",
            config.capacity, config.mode, config.tag
        );
        Self {
            ring: Ring::new(config.capacity, config.mode, monitor, config.tag),
            write_sem: Semaphore::new(config.capacity as u32),
            read_sem: config.read_signaling.then(|| Semaphore::new(0)),
            flow_enabled: AtomicBool::new(false),
            has_been_read: AtomicBool::new(false),
            capacity: config.capacity,
            tag: config.tag,
        }
    }

    /// The tag this FIFO was configured with.
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Number of user-visible slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The ring mode this FIFO was configured with.
    pub fn mode(&self) -> RingMode {
        self.ring.mode()
    }

    /// Current number of queued elements (unsynchronized read).
    pub fn stored_count(&self) -> usize {
        self.ring.stored_count()
    }

    /// Whether at least one element has ever been read from this FIFO.
    pub fn has_been_read(&self) -> bool {
        self.has_been_read.load(Ordering::Relaxed)
    }

    /// Whether flow is currently enabled.
    pub fn flow_enabled(&self) -> bool {
        self.flow_enabled.load(Ordering::Relaxed)
    }

    /// Turn the stream on or off.
    ///
    /// Disabling flow refuses all subsequent writes and unsticks waiters:
    /// if the ring is full the write semaphore is posted once and reset, and
    /// if it is empty the read semaphore is posted once and reset, so that
    /// at least one parked thread wakes, re-checks the flag and returns
    /// [`FifoError::FlowDisabled`]. Enabling twice or disabling twice is a
    /// no-op.
    pub fn set_flow_enabled(&self, enabled: bool) {
        if self.flow_enabled.load(Ordering::Relaxed) == enabled {
            return;
        }
        if enabled {
            self.flow_enabled.store(true, Ordering::Relaxed);
            debug!("fifo {} flow enabled", self.tag);
            return;
        }

        self.flow_enabled.store(false, Ordering::Relaxed);

        let count = self.ring.stored_count();
        if count == self.capacity {
            // Writers may be parked on a full queue.
            self.write_sem.post();
            self.write_sem.reset();
        }
        if count == 0 {
            if let Some(read_sem) = &self.read_sem {
                // Readers may be parked on an empty queue.
                read_sem.post();
                read_sem.reset();
            }
        }
        debug!("fifo {} flow disabled", self.tag);
    }

    /// Block until a write slot is reserved.
    pub fn wait_for_write_space(&self) -> Result<()> {
        if !self.flow_enabled() {
            return Err(FifoError::FlowDisabled);
        }
        self.write_sem.acquire();
        if self.flow_enabled() {
            Ok(())
        } else {
            Err(FifoError::FlowDisabled)
        }
    }

    /// Block until a write slot is reserved or `ms` milliseconds elapse.
    /// `ms < 1` degenerates to an untimed wait.
    pub fn wait_for_write_space_timed(&self, ms: i64) -> Result<()> {
        if ms < 1 {
            return self.wait_for_write_space();
        }
        if !self.flow_enabled() {
            return Err(FifoError::FlowDisabled);
        }
        let acquired = self.write_sem.acquire_timed(ms);
        if !self.flow_enabled() {
            return Err(FifoError::FlowDisabled);
        }
        if acquired {
            Ok(())
        } else {
            Err(FifoError::Timeout)
        }
    }

    /// Reserve a write slot without blocking.
    pub fn try_acquire_write_space(&self) -> Result<()> {
        if !self.flow_enabled() {
            return Err(FifoError::FlowDisabled);
        }
        let acquired = self.write_sem.try_acquire();
        if !self.flow_enabled() {
            return Err(FifoError::FlowDisabled);
        }
        if acquired {
            Ok(())
        } else {
            Err(FifoError::Timeout)
        }
    }

    /// Append an element, transferring ownership into the queue.
    ///
    /// Pairs with [`wait_for_write_space`]: the wait reserves a slot, the
    /// write consumes it. On failure the element is handed back in the
    /// [`WriteError`].
    ///
    /// [`wait_for_write_space`]: Self::wait_for_write_space
    pub fn write(&self, item: T) -> std::result::Result<(), WriteError<T>> {
        if !self.flow_enabled() {
            return Err(WriteError::new(item, FifoError::FlowDisabled));
        }
        match self.ring.push(item) {
            Ok(()) => {
                self.signal_read();
                Ok(())
            }
            Err(item) => Err(WriteError::new(item, FifoError::FifoFull)),
        }
    }

    /// Insert an element at the front of the queue, making it the next one
    /// read. Used to slip control messages ahead of queued data.
    ///
    /// Preemption does not consume a write-space reservation, and it is only
    /// permitted in [`RingMode::Blocking`]; in lockless mode it would mutate
    /// the consumer's index from the producer side, so it is refused with
    /// [`FifoError::InvalidParams`].
    pub fn preempt(&self, item: T) -> std::result::Result<(), WriteError<T>> {
        if self.ring.mode() != RingMode::Blocking {
            return Err(WriteError::new(item, FifoError::InvalidParams));
        }
        if !self.flow_enabled() {
            return Err(WriteError::new(item, FifoError::FlowDisabled));
        }
        match self.ring.preempt(item) {
            Ok(()) => {
                self.signal_read();
                Ok(())
            }
            Err(item) => Err(WriteError::new(item, FifoError::FifoFull)),
        }
    }

    /// Block until read data is available.
    ///
    /// A FIFO built without read signaling cannot be waited on and returns
    /// [`FifoError::FlowDisabled`].
    pub fn wait_for_read_data(&self) -> Result<()> {
        let Some(read_sem) = &self.read_sem else {
            return Err(FifoError::FlowDisabled);
        };
        if !self.flow_enabled() {
            return Err(FifoError::FlowDisabled);
        }
        read_sem.acquire();
        if self.flow_enabled() {
            Ok(())
        } else {
            Err(FifoError::FlowDisabled)
        }
    }

    /// Block until read data is available or `ms` milliseconds elapse.
    /// `ms < 1` degenerates to an untimed wait.
    pub fn wait_for_read_data_timed(&self, ms: i64) -> Result<()> {
        let Some(read_sem) = &self.read_sem else {
            return Err(FifoError::FlowDisabled);
        };
        if ms < 1 {
            return self.wait_for_read_data();
        }
        if !self.flow_enabled() {
            return Err(FifoError::FlowDisabled);
        }
        let acquired = read_sem.acquire_timed(ms);
        if !self.flow_enabled() {
            return Err(FifoError::FlowDisabled);
        }
        if acquired {
            Ok(())
        } else {
            Err(FifoError::Timeout)
        }
    }

    /// Take a read-data reservation without blocking.
    ///
    /// Deliberately performs no flow check: the teardown drain relies on
    /// try-acquiring leftover read permits after flow has been disabled.
    pub fn try_wait_for_read_data(&self) -> Result<()> {
        let Some(read_sem) = &self.read_sem else {
            return Err(FifoError::FlowDisabled);
        };
        if read_sem.try_acquire() {
            Ok(())
        } else {
            Err(FifoError::Timeout)
        }
    }

    /// Remove and return the element at the front of the queue, transferring
    /// ownership to the caller.
    ///
    /// Pairs with [`wait_for_read_data`]: callers wait first unless they
    /// know data is available. A successful read reposts one unit of write
    /// space and latches [`has_been_read`].
    ///
    /// [`wait_for_read_data`]: Self::wait_for_read_data
    /// [`has_been_read`]: Self::has_been_read
    pub fn read(&self) -> Option<T> {
        let item = self.ring.pop();
        if item.is_some() {
            self.write_sem.post();
            self.has_been_read.store(true, Ordering::Relaxed);
        }
        item
    }

    /// Install watermark thresholds and handlers on the underlying ring.
    ///
    /// The high handler fires when a push raises the count to `high + 1`;
    /// the low handler fires when a pop lowers it to `low − 1`. A threshold
    /// of −1 disables its side. Handlers run on the pushing/popping thread
    /// and must neither block nor re-enter this FIFO.
    pub fn set_watermark_handlers(
        &self,
        high: i64,
        high_handler: Option<WatermarkHandler>,
        low: i64,
        low_handler: Option<WatermarkHandler>,
    ) {
        self.ring
            .set_watermark_handlers(high, high_handler, low, low_handler);
    }

    fn signal_read(&self) {
        if let Some(read_sem) = &self.read_sem {
            read_sem.post();
        }
    }
}

impl<T> Drop for Fifo<T> {
    fn drop(&mut self) {
        // Shut the stream down, then drain whatever was left queued. The
        // ring destructs any elements the permit loop does not cover.
        self.set_flow_enabled(false);
        let mut drained = 0usize;
        while self.try_wait_for_read_data().is_ok() {
            if self.read().is_none() {
                break;
            }
            drained += 1;
        }
        if drained > 0 {
            trace!("fifo {} dropped {} queued elements", self.tag, drained);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_fifo(capacity: usize, mode: RingMode) -> Fifo<u32> {
        let fifo = Fifo::new(FifoConfig::new(capacity).with_mode(mode));
        fifo.set_flow_enabled(true);
        fifo
    }

    #[test]
    fn test_flow_disabled_on_construction() {
        let fifo: Fifo<u32> = Fifo::new(FifoConfig::new(4));
        assert!(!fifo.flow_enabled());
        let err = fifo.write(1).unwrap_err();
        assert_eq!(err.code, FifoError::FlowDisabled);
        assert_eq!(err.into_item(), 1);
    }

    #[test]
    fn test_write_read_roundtrip() {
        let fifo = enabled_fifo(4, RingMode::Blocking);
        fifo.write(10).unwrap();
        fifo.write(20).unwrap();
        assert_eq!(fifo.stored_count(), 2);
        assert!(!fifo.has_been_read());
        assert_eq!(fifo.read(), Some(10));
        assert!(fifo.has_been_read());
        assert_eq!(fifo.read(), Some(20));
        assert_eq!(fifo.read(), None);
        assert_eq!(fifo.stored_count(), 0);
    }

    #[test]
    fn test_full_queue_returns_item() {
        let fifo = enabled_fifo(2, RingMode::Blocking);
        fifo.write(1).unwrap();
        fifo.write(2).unwrap();
        let err = fifo.write(3).unwrap_err();
        assert_eq!(err.code, FifoError::FifoFull);
        assert_eq!(err.into_item(), 3);
    }

    #[test]
    fn test_preempt_head_of_line() {
        let fifo = enabled_fifo(8, RingMode::Blocking);
        fifo.write(1).unwrap();
        fifo.write(2).unwrap();
        fifo.preempt(99).unwrap();
        assert_eq!(fifo.read(), Some(99));
        assert_eq!(fifo.read(), Some(1));
        assert_eq!(fifo.read(), Some(2));
    }

    #[test]
    fn test_preempt_rejected_in_lockless_mode() {
        let fifo = enabled_fifo(8, RingMode::Lockless);
        let err = fifo.preempt(1).unwrap_err();
        assert_eq!(err.code, FifoError::InvalidParams);
    }

    #[test]
    fn test_try_acquire_write_space() {
        let fifo = enabled_fifo(1, RingMode::Blocking);
        assert!(fifo.try_acquire_write_space().is_ok());
        assert_eq!(
            fifo.try_acquire_write_space(),
            Err(FifoError::Timeout)
        );
        fifo.write(1).unwrap();
        assert_eq!(fifo.read(), Some(1));
        // The read reposted write space.
        assert!(fifo.try_acquire_write_space().is_ok());
    }

    #[test]
    fn test_timed_write_wait_expires_on_full_queue() {
        let fifo = enabled_fifo(1, RingMode::Blocking);
        fifo.wait_for_write_space().unwrap();
        fifo.write(1).unwrap();
        assert_eq!(fifo.wait_for_write_space_timed(30), Err(FifoError::Timeout));
    }

    #[test]
    fn test_timed_read_wait_expires_on_empty_queue() {
        let fifo = enabled_fifo(4, RingMode::Blocking);
        assert_eq!(fifo.wait_for_read_data_timed(30), Err(FifoError::Timeout));
    }

    #[test]
    fn test_no_read_signaling_refuses_read_waits() {
        let fifo: Fifo<u32> =
            Fifo::new(FifoConfig::new(4).with_read_signaling(false).with_mode(RingMode::Blocking));
        fifo.set_flow_enabled(true);
        assert_eq!(fifo.wait_for_read_data(), Err(FifoError::FlowDisabled));
        assert_eq!(fifo.wait_for_read_data_timed(10), Err(FifoError::FlowDisabled));
        assert_eq!(fifo.try_wait_for_read_data(), Err(FifoError::FlowDisabled));
        // Writes still work; they just signal nobody.
        fifo.write(1).unwrap();
        assert_eq!(fifo.read(), Some(1));
    }

    #[test]
    fn test_flow_disable_refuses_writes() {
        let fifo = enabled_fifo(4, RingMode::Blocking);
        fifo.write(1).unwrap();
        fifo.set_flow_enabled(false);
        assert_eq!(fifo.write(2).unwrap_err().code, FifoError::FlowDisabled);
        assert_eq!(fifo.preempt(3).unwrap_err().code, FifoError::FlowDisabled);
        assert_eq!(fifo.wait_for_write_space(), Err(FifoError::FlowDisabled));
        assert_eq!(fifo.wait_for_read_data(), Err(FifoError::FlowDisabled));
        // The timed variant refuses immediately too, not after the timeout.
        assert_eq!(fifo.wait_for_read_data_timed(5000), Err(FifoError::FlowDisabled));
        // Data already queued can still be drained directly.
        assert_eq!(fifo.read(), Some(1));
    }

    #[test]
    fn test_flow_toggle_is_idempotent() {
        let fifo = enabled_fifo(2, RingMode::Blocking);
        fifo.set_flow_enabled(true);
        assert!(fifo.flow_enabled());
        fifo.set_flow_enabled(false);
        fifo.set_flow_enabled(false);
        assert!(!fifo.flow_enabled());
    }

    #[test]
    fn test_drop_drains_elements() {
        let value = std::sync::Arc::new(0u32);
        let fifo: Fifo<std::sync::Arc<u32>> =
            Fifo::new(FifoConfig::new(4).with_mode(RingMode::Blocking));
        fifo.set_flow_enabled(true);
        fifo.write(std::sync::Arc::clone(&value)).unwrap();
        fifo.write(std::sync::Arc::clone(&value)).unwrap();
        assert_eq!(std::sync::Arc::strong_count(&value), 3);
        drop(fifo);
        assert_eq!(std::sync::Arc::strong_count(&value), 1);
    }

    #[test]
    fn test_capacity_and_tag_accessors() {
        let fifo: Fifo<u32> = Fifo::new(FifoConfig::new(5).with_tag(42));
        assert_eq!(fifo.capacity(), 5);
        assert_eq!(fifo.tag(), 42);
        assert_eq!(fifo.mode(), RingMode::Lockless);
    }
}
