//! Bounded waitable FIFOs for producer/consumer media pipelines.
//!
//! This crate is the plumbing that stitches demux → decode → scale stages
//! together: bounded queues with backpressure, a flow kill-switch that
//! unblocks every waiter, head-of-line preemption for control messages, and
//! a pooled refcounted command object that rides on the queues.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  write   ┌──────────────────────────┐  read   ┌──────────┐
//! │ Producer │─────────▶│  Fifo<T>                 │────────▶│ Consumer │
//! └──────────┘          │  ┌────────────────────┐  │         └──────────┘
//!      │ wait_for_      │  │ Ring (SPSC or      │  │  wait_for_ │
//!      │ write_space    │  │ mutex-serialized)  │  │  read_data │
//!      ▼                │  └────────────────────┘  │            ▼
//!  write_sem ◀──────────│  write_sem / read_sem    │──────▶ read_sem
//!                       └──────────────────────────┘
//! ```
//!
//! # Key Components
//!
//! - [`Fifo`] - The waitable bounded queue; ownership transfers across it
//! - [`MediaFifo`] - Clone-on-write convenience queue for frames/packets
//! - [`CmdPool`] / [`CmdRef`] - Pooled, refcounted pipeline commands
//! - [`Semaphore`] - The counting gate backing all blocking waits
//!
//! # Flow control
//!
//! A freshly built FIFO has flow *disabled*: writes are refused until
//! [`Fifo::set_flow_enabled`] turns the stream on. Disabling flow again is
//! the shutdown path - it wakes every thread parked in a `wait_for_*` call,
//! which then observes the flag and returns [`FifoError::FlowDisabled`].
//!
//! # Ownership policies
//!
//! Two queue flavors coexist, distinguished at the type level:
//!
//! - [`Fifo<T>`] (including [`CmdFifo`]) transfers ownership: `write` moves
//!   the element in, `read` moves it out, and no reference counts are
//!   touched at the queue boundary.
//! - [`MediaFifo<T>`] clones on write: the queue owns a cheap refcounted
//!   clone, and tearing the queue down drops whatever clones are still
//!   queued.
//!
//! # Modules
//!
//! - [`error`] - Status codes shared by all queue and pool operations
//! - [`semaphore`] - Counting semaphore (blocking/timed/try waits)
//! - [`fifo`] - The waitable bounded FIFO
//! - [`cmd`] - Command records and payload attachment
//! - [`pool`] - The command pool and its refcounted handle
//! - [`media`] - Clone-on-write frame/packet queues

pub mod cmd;
pub mod error;
pub mod fifo;
pub mod media;
pub mod pool;
mod ring;
pub mod semaphore;

pub use cmd::{Cmd, CmdPayload, CmdType, PayloadRc, SeekParams};
pub use error::{FifoError, Result, WriteError, STATUS_OK};
pub use fifo::{Fifo, FifoConfig};
pub use media::{FrameFifo, MediaFifo, PacketFifo};
pub use pool::{CmdPool, CmdRef};
pub use ring::{HeadMonitor, RingMode, WatermarkHandler};
pub use semaphore::Semaphore;

/// A command queue: ownership of each [`CmdRef`] transfers across the FIFO.
pub type CmdFifo = Fifo<CmdRef>;
