//! Clone-on-write convenience queues for media payloads.
//!
//! Where [`Fifo`] transfers ownership, a [`MediaFifo`] clones on write: the
//! caller keeps its frame or packet, and the queue owns a cheap refcounted
//! clone. A write the ring rejects drops the clone again, and tearing the
//! queue down drops whatever clones are still inside. This is the value-
//! carrying ownership policy; use [`CmdFifo`](crate::CmdFifo) when strict
//! transfer is wanted.

use crate::error::Result;
use crate::fifo::{Fifo, FifoConfig};
use crate::ring::{HeadMonitor, RingMode, WatermarkHandler};
use sluice_core::{Frame, Packet};
use std::sync::Arc;

/// A clone-on-write queue for frames.
pub type FrameFifo = MediaFifo<Frame>;

/// A clone-on-write queue for packets.
pub type PacketFifo = MediaFifo<Packet>;

/// Bounded waitable queue that clones elements on write.
pub struct MediaFifo<T: Clone> {
    inner: Fifo<T>,
}

impl<T: Clone> MediaFifo<T> {
    /// Build a queue from `config` with no head monitor.
    pub fn new(config: FifoConfig) -> Self {
        Self {
            inner: Fifo::new(config),
        }
    }

    /// Build a queue with a head monitor.
    pub fn with_head_monitor(config: FifoConfig, monitor: Option<Arc<dyn HeadMonitor>>) -> Self {
        Self {
            inner: Fifo::with_head_monitor(config, monitor),
        }
    }

    /// Append a clone of `item`. The caller keeps its reference; a rejected
    /// write drops the clone.
    pub fn write(&self, item: &T) -> Result<()> {
        self.inner.write(item.clone()).map_err(|err| err.code)
    }

    /// Insert a clone of `item` at the front of the queue.
    pub fn preempt(&self, item: &T) -> Result<()> {
        self.inner.preempt(item.clone()).map_err(|err| err.code)
    }

    /// Remove and return the element at the front of the queue. The caller
    /// owns the returned clone and is responsible for dropping it.
    pub fn read(&self) -> Option<T> {
        self.inner.read()
    }

    /// See [`Fifo::set_flow_enabled`].
    pub fn set_flow_enabled(&self, enabled: bool) {
        self.inner.set_flow_enabled(enabled);
    }

    /// See [`Fifo::flow_enabled`].
    pub fn flow_enabled(&self) -> bool {
        self.inner.flow_enabled()
    }

    /// See [`Fifo::wait_for_write_space`].
    pub fn wait_for_write_space(&self) -> Result<()> {
        self.inner.wait_for_write_space()
    }

    /// See [`Fifo::wait_for_write_space_timed`].
    pub fn wait_for_write_space_timed(&self, ms: i64) -> Result<()> {
        self.inner.wait_for_write_space_timed(ms)
    }

    /// See [`Fifo::try_acquire_write_space`].
    pub fn try_acquire_write_space(&self) -> Result<()> {
        self.inner.try_acquire_write_space()
    }

    /// See [`Fifo::wait_for_read_data`].
    pub fn wait_for_read_data(&self) -> Result<()> {
        self.inner.wait_for_read_data()
    }

    /// See [`Fifo::wait_for_read_data_timed`].
    pub fn wait_for_read_data_timed(&self, ms: i64) -> Result<()> {
        self.inner.wait_for_read_data_timed(ms)
    }

    /// See [`Fifo::try_wait_for_read_data`].
    pub fn try_wait_for_read_data(&self) -> Result<()> {
        self.inner.try_wait_for_read_data()
    }

    /// See [`Fifo::stored_count`].
    pub fn stored_count(&self) -> usize {
        self.inner.stored_count()
    }

    /// See [`Fifo::has_been_read`].
    pub fn has_been_read(&self) -> bool {
        self.inner.has_been_read()
    }

    /// See [`Fifo::capacity`].
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// See [`Fifo::tag`].
    pub fn tag(&self) -> u32 {
        self.inner.tag()
    }

    /// See [`Fifo::mode`].
    pub fn mode(&self) -> RingMode {
        self.inner.mode()
    }

    /// See [`Fifo::set_watermark_handlers`].
    pub fn set_watermark_handlers(
        &self,
        high: i64,
        high_handler: Option<WatermarkHandler>,
        low: i64,
        low_handler: Option<WatermarkHandler>,
    ) {
        self.inner
            .set_watermark_handlers(high, high_handler, low, low_handler);
    }
}
