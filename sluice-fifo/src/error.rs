//! Status codes shared by FIFO and pool operations.

use std::fmt;
use thiserror::Error;

/// Wire-stable status code for success.
///
/// Fallible operations return `Result`; this constant exists because the
/// integer values are part of the external contract alongside
/// [`FifoError::code`].
pub const STATUS_OK: i32 = 0;

/// Error returned by FIFO and pool operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FifoError {
    /// An argument was invalid for the operation.
    #[error("invalid parameters")]
    InvalidParams,

    /// The operation was refused because flow is off, or the caller woke
    /// from a wait to find flow off.
    #[error("flow is disabled")]
    FlowDisabled,

    /// The ring could not accept another element.
    #[error("fifo is full")]
    FifoFull,

    /// A timed or try wait did not acquire the resource.
    #[error("timed wait expired")]
    Timeout,
}

impl FifoError {
    /// Wire-stable status code for this error.
    ///
    /// | Code | Meaning |
    /// |------|---------|
    /// | 0    | success (see [`STATUS_OK`]) |
    /// | 1    | invalid parameters |
    /// | 13   | flow disabled |
    /// | 29   | fifo full |
    /// | −1   | timeout |
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidParams => 1,
            Self::FlowDisabled => 13,
            Self::FifoFull => 29,
            Self::Timeout => -1,
        }
    }
}

/// Result type alias using [`FifoError`].
pub type Result<T> = std::result::Result<T, FifoError>;

/// Error returned when a queue rejects an element.
///
/// The rejected element is handed back so the caller keeps ownership and can
/// retry, re-route, or drop it.
pub struct WriteError<T> {
    /// The element the queue refused.
    pub item: T,
    /// Why it was refused.
    pub code: FifoError,
}

impl<T> WriteError<T> {
    pub(crate) fn new(item: T, code: FifoError) -> Self {
        Self { item, code }
    }

    /// Recover the rejected element.
    pub fn into_item(self) -> T {
        self.item
    }
}

impl<T> fmt::Debug for WriteError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteError")
            .field("code", &self.code)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for WriteError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "write rejected: {}", self.code)
    }
}

impl<T> std::error::Error for WriteError<T> {}
