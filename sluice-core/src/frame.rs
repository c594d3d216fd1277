//! Video frame payloads.
//!
//! A [`Frame`] is the decoded-picture object that flows through frame FIFOs.
//! The pixel data lives in a shared [`FrameBuffer`]; cloning a frame bumps
//! the buffer's reference count instead of copying planes, which is what the
//! clone-on-write FIFOs rely on.

use crate::timestamp::Timestamp;
use bitflags::bitflags;
use std::fmt;
use std::sync::Arc;

/// Pixel format for video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, 12bpp.
    Yuv420p,
    /// Planar YUV 4:2:2, 16bpp.
    Yuv422p,
    /// Planar YUV 4:4:4, 24bpp.
    Yuv444p,
    /// Y plane plus interleaved UV plane.
    Nv12,
    /// Packed RGB, 24bpp.
    Rgb24,
    /// Packed RGBA, 32bpp.
    Rgba,
    /// Grayscale, 8bpp.
    Gray8,
}

impl PixelFormat {
    /// Get the number of planes for this pixel format.
    pub fn num_planes(&self) -> usize {
        match self {
            Self::Yuv420p | Self::Yuv422p | Self::Yuv444p => 3,
            Self::Nv12 => 2,
            Self::Rgb24 | Self::Rgba | Self::Gray8 => 1,
        }
    }

    /// Calculate the size in bytes of a plane for the given dimensions.
    pub fn plane_size(&self, plane: usize, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            Self::Yuv420p => {
                if plane == 0 {
                    w * h
                } else {
                    (w / 2) * (h / 2)
                }
            }
            Self::Yuv422p => {
                if plane == 0 {
                    w * h
                } else {
                    (w / 2) * h
                }
            }
            Self::Yuv444p => w * h,
            Self::Nv12 => {
                if plane == 0 {
                    w * h
                } else {
                    w * (h / 2)
                }
            }
            Self::Rgb24 => w * h * 3,
            Self::Rgba => w * h * 4,
            Self::Gray8 => w * h,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yuv420p => write!(f, "yuv420p"),
            Self::Yuv422p => write!(f, "yuv422p"),
            Self::Yuv444p => write!(f, "yuv444p"),
            Self::Nv12 => write!(f, "nv12"),
            Self::Rgb24 => write!(f, "rgb24"),
            Self::Rgba => write!(f, "rgba"),
            Self::Gray8 => write!(f, "gray8"),
        }
    }
}

bitflags! {
    /// Flags indicating frame properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FrameFlags: u32 {
        /// This is a keyframe (I-frame).
        const KEYFRAME = 0x0001;
        /// Frame is corrupted or incomplete.
        const CORRUPT = 0x0002;
        /// Frame should be discarded after decoding.
        const DISCARD = 0x0004;
        /// Interlaced frame.
        const INTERLACED = 0x0008;
    }
}

/// Pixel storage for one decoded frame.
pub struct FrameBuffer {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: PixelFormat,
    /// Plane data, one buffer per plane.
    planes: Vec<Vec<u8>>,
}

impl FrameBuffer {
    /// Allocate a zeroed buffer for the given dimensions and format.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let planes = (0..format.num_planes())
            .map(|i| vec![0u8; format.plane_size(i, width, height)])
            .collect();
        Self {
            width,
            height,
            format,
            planes,
        }
    }

    /// Get a plane's data.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.planes.get(index).map(|p| p.as_slice())
    }

    /// Get mutable access to a plane's data.
    pub fn plane_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.planes.get_mut(index).map(|p| p.as_mut_slice())
    }
}

/// A decoded video frame.
///
/// Cloning a frame shares the underlying [`FrameBuffer`]; the pixel data is
/// reference counted, never copied.
#[derive(Clone)]
pub struct Frame {
    /// Shared pixel storage.
    buffer: Arc<FrameBuffer>,
    /// Presentation timestamp.
    pub pts: Timestamp,
    /// Decode timestamp.
    pub dts: Timestamp,
    /// Frame flags.
    pub flags: FrameFlags,
}

impl Frame {
    /// Create a new frame with freshly allocated storage.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self::from_buffer(FrameBuffer::new(width, height, format))
    }

    /// Create a frame from an existing buffer.
    pub fn from_buffer(buffer: FrameBuffer) -> Self {
        Self {
            buffer: Arc::new(buffer),
            pts: Timestamp::none(),
            dts: Timestamp::none(),
            flags: FrameFlags::empty(),
        }
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.buffer.height
    }

    /// Pixel format.
    pub fn format(&self) -> PixelFormat {
        self.buffer.format
    }

    /// Get a plane's data.
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.buffer.plane(index)
    }

    /// Get mutable access to a plane, if this frame is the sole owner of its
    /// buffer.
    pub fn plane_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        Arc::get_mut(&mut self.buffer).and_then(|b| b.plane_mut(index))
    }

    /// Check whether this frame is a keyframe.
    pub fn is_keyframe(&self) -> bool {
        self.flags.contains(FrameFlags::KEYFRAME)
    }

    /// Check whether two frames share the same underlying buffer.
    pub fn shares_buffer(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }

    /// Number of references to the underlying buffer.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.buffer)
    }

    /// Set the presentation timestamp.
    pub fn with_pts(mut self, pts: i64) -> Self {
        self.pts = Timestamp::new(pts);
        self
    }

    /// Set the frame flags.
    pub fn with_flags(mut self, flags: FrameFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format())
            .field("pts", &self.pts)
            .field("flags", &self.flags)
            .finish()
    }
}
