//! # Sluice Core
//!
//! Payload types for the sluice media FIFO substrate.
//!
//! This crate provides the media objects that ride through the queues in
//! [`sluice-fifo`]: decoded video frames, encoded packets, and the timestamp
//! types they carry. Frames and packets share their data through an internal
//! reference count, so cloning one is a cheap ref bump rather than a copy of
//! the underlying pixels or bytes.
//!
//! [`sluice-fifo`]: ../sluice_fifo/index.html

pub mod frame;
pub mod packet;
pub mod timestamp;

pub use frame::{Frame, FrameBuffer, FrameFlags, PixelFormat};
pub use packet::{Packet, PacketFlags};
pub use timestamp::{TimeBase, Timestamp};
