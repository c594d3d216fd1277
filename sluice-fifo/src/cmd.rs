//! Pipeline command records.
//!
//! A [`Cmd`] is the message that rides through a [`CmdFifo`]: a type tag, an
//! attached payload, timestamps and routing metadata. Commands live in
//! pooled cells (see [`pool`]) and are handled through the refcounted
//! [`CmdRef`] handle.
//!
//! Payloads of the known kinds (frames, packets, seek requests) are plain
//! enum arms whose attach/detach is a clone/drop of the payload's own
//! reference count. User payloads that maintain an external reference count
//! go through the [`PayloadRc`] escape hatch: `retain` is called when the
//! payload is attached and `release` when it is detached or when the
//! command's final reference goes away.
//!
//! [`CmdFifo`]: crate::CmdFifo
//! [`CmdRef`]: crate::pool::CmdRef
//! [`pool`]: crate::pool

use sluice_core::{Frame, Packet};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Externally refcounted payload.
///
/// `retain`/`release` calls are balanced: one `retain` at attach, one
/// `release` at detach or at the owning command's final release. They must
/// not panic.
pub trait PayloadRc: Send + Sync {
    /// Take one reference on the payload.
    fn retain(&self);
    /// Drop one reference on the payload.
    fn release(&self);
}

/// What a command means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CmdType {
    /// Empty/invalid.
    None,
    /// Carries a decoded video frame.
    Frame,
    /// Carries an encoded packet.
    Packet,
    /// Flush buffers; no payload.
    Flush,
    /// End of stream; no payload.
    Eos,
    /// Seek request; payload is [`SeekParams`].
    Seek,
    /// Configuration change; payload is user-defined.
    Config,
    /// User-defined command type.
    User(u32),
}

impl CmdType {
    /// A sentinel carries no payload and marks a stream boundary.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Eos | Self::Flush)
    }

    /// Whether this command carries media data.
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Frame | Self::Packet)
    }
}

/// Seek request payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekParams {
    /// Seek position in seconds.
    pub position: f64,
    /// Seek flags.
    pub flags: u32,
}

/// Payload attached to a command.
pub enum CmdPayload {
    /// No payload.
    None,
    /// A decoded video frame; the command holds one buffer reference.
    Frame(Frame),
    /// An encoded packet; the command holds one data reference.
    Packet(Packet),
    /// Seek parameters.
    Seek(SeekParams),
    /// Opaque configuration payload.
    Config(Arc<dyn Any + Send + Sync>),
    /// User payload with an external reference count.
    User(Arc<dyn PayloadRc>),
}

impl CmdPayload {
    /// Whether there is no payload attached.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Debug for CmdPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Frame(frame) => f.debug_tuple("Frame").field(frame).finish(),
            Self::Packet(packet) => f.debug_tuple("Packet").field(packet).finish(),
            Self::Seek(params) => f.debug_tuple("Seek").field(params).finish(),
            Self::Config(_) => write!(f, "Config(..)"),
            Self::User(_) => write!(f, "User(..)"),
        }
    }
}

/// A pipeline command: type tag, payload, timestamps and routing metadata.
pub struct Cmd {
    cmd_type: CmdType,
    payload: CmdPayload,
    /// Presentation timestamp in stream ticks.
    pub pts: i64,
    /// Decode timestamp in stream ticks.
    pub dts: i64,
    /// Command-specific flags.
    pub flags: u32,
    /// Stream index, for frame and packet commands.
    pub stream_index: u32,
    /// Opaque user context.
    pub user_data: Option<Arc<dyn Any + Send + Sync>>,
}

impl Cmd {
    pub(crate) fn new() -> Self {
        Self {
            cmd_type: CmdType::None,
            payload: CmdPayload::None,
            pts: 0,
            dts: 0,
            flags: 0,
            stream_index: 0,
            user_data: None,
        }
    }

    /// The command's type tag.
    pub fn cmd_type(&self) -> CmdType {
        self.cmd_type
    }

    /// Re-initialize for a new use: detaches any payload (releasing it),
    /// sets the type and zeroes all metadata. Does not touch the command's
    /// own reference count.
    pub fn init(&mut self, cmd_type: CmdType) {
        self.clear_payload();
        self.cmd_type = cmd_type;
        self.pts = 0;
        self.dts = 0;
        self.flags = 0;
        self.stream_index = 0;
        self.user_data = None;
    }

    /// Attach a payload, detaching (and releasing) any existing one first.
    /// A [`CmdPayload::User`] payload is retained on attach.
    pub fn set_payload(&mut self, payload: CmdPayload) {
        self.clear_payload();
        if let CmdPayload::User(rc) = &payload {
            rc.retain();
        }
        self.payload = payload;
    }

    /// Detach the payload. A [`CmdPayload::User`] payload is released; the
    /// known kinds drop their reference.
    pub fn clear_payload(&mut self) {
        if let CmdPayload::User(rc) = &self.payload {
            rc.release();
        }
        self.payload = CmdPayload::None;
    }

    /// The attached payload.
    pub fn payload(&self) -> &CmdPayload {
        &self.payload
    }

    /// The attached frame, if this command carries one.
    pub fn frame(&self) -> Option<&Frame> {
        match &self.payload {
            CmdPayload::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// The attached packet, if this command carries one.
    pub fn packet(&self) -> Option<&Packet> {
        match &self.payload {
            CmdPayload::Packet(packet) => Some(packet),
            _ => None,
        }
    }

    /// The attached seek parameters, if this command carries them.
    pub fn seek_params(&self) -> Option<SeekParams> {
        match &self.payload {
            CmdPayload::Seek(params) => Some(*params),
            _ => None,
        }
    }

    /// Whether this command is a stream-boundary sentinel (EOS or FLUSH).
    pub fn is_sentinel(&self) -> bool {
        self.cmd_type.is_sentinel()
    }

    /// Whether this command carries media data (a frame or a packet).
    pub fn is_media(&self) -> bool {
        self.cmd_type.is_media()
    }
}

impl Drop for Cmd {
    fn drop(&mut self) {
        self.clear_payload();
    }
}

impl fmt::Debug for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cmd")
            .field("cmd_type", &self.cmd_type)
            .field("payload", &self.payload)
            .field("pts", &self.pts)
            .field("dts", &self.dts)
            .field("stream_index", &self.stream_index)
            .finish_non_exhaustive()
    }
}
