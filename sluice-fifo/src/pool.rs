//! The command pool and its refcounted handle.
//!
//! Commands are allocated once and recycled through a free list. A
//! [`CmdRef`] is the only way to hold a command: cloning it takes a
//! reference, dropping it releases one, and the final release detaches the
//! payload and hands the cell back to its pool. Cells are never freed while
//! their pool is alive.

use crate::cmd::{Cmd, CmdType};
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::atomic::{fence, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// One pooled command cell.
struct CmdCell {
    refcount: AtomicU32,
    /// Back-link to the owning pool; dead once the pool is dropped.
    pool: Weak<PoolShared>,
    cmd: UnsafeCell<Cmd>,
}

impl CmdCell {
    fn new(pool: Weak<PoolShared>) -> Self {
        Self {
            refcount: AtomicU32::new(0),
            pool,
            cmd: UnsafeCell::new(Cmd::new()),
        }
    }
}

struct PoolState {
    free: Vec<Box<CmdCell>>,
    total: u32,
}

struct PoolShared {
    /// Hard ceiling on allocated cells; 0 means unlimited.
    max_size: u32,
    state: Mutex<PoolState>,
}

/// A fixed-ceiling allocator that recycles command cells.
///
/// `acquire` pops a cell from the free list, or allocates a new one while
/// `total_count` is below `max_size`. Exhausted pools return `None` and the
/// caller must back off. Clones of the pool handle share the same cells.
#[derive(Clone)]
pub struct CmdPool {
    shared: Arc<PoolShared>,
}

impl CmdPool {
    /// Create a pool, pre-allocating `initial_size` cells. `max_size`
    /// bounds the total allocated cells; 0 means unlimited.
    pub fn new(initial_size: u32, max_size: u32) -> Self {
        let shared = Arc::new(PoolShared {
            max_size,
            state: Mutex::new(PoolState {
                free: Vec::with_capacity(initial_size as usize),
                total: 0,
            }),
        });
        {
            let mut state = shared.state.lock();
            for _ in 0..initial_size {
                state.free.push(Box::new(CmdCell::new(Arc::downgrade(&shared))));
                state.total += 1;
            }
        }
        debug!(
            "command pool created (initial {}, max {})",
            initial_size, max_size
        );
        Self { shared }
    }

    /// Take a command from the pool, cleanly initialized with reference
    /// count 1 and type [`CmdType::None`].
    ///
    /// Returns `None` when the free list is empty and the pool is at its
    /// ceiling.
    pub fn acquire(&self) -> Option<CmdRef> {
        let mut state = self.shared.state.lock();
        let mut cell = if let Some(cell) = state.free.pop() {
            cell
        } else if self.shared.max_size == 0 || state.total < self.shared.max_size {
            state.total += 1;
            Box::new(CmdCell::new(Arc::downgrade(&self.shared)))
        } else {
            return None;
        };
        drop(state);

        // The cell came off the free list (or is brand new), so this handle
        // is its only owner until into_raw below.
        *cell.refcount.get_mut() = 1;
        cell.cmd.get_mut().init(CmdType::None);

        // SAFETY: Box::into_raw never returns null.
        let cell = unsafe { NonNull::new_unchecked(Box::into_raw(cell)) };
        Some(CmdRef { cell })
    }

    /// Total cells ever allocated by this pool.
    pub fn total_count(&self) -> u32 {
        self.shared.state.lock().total
    }

    /// Cells currently on the free list.
    pub fn free_count(&self) -> u32 {
        self.shared.state.lock().free.len() as u32
    }

    /// Cells currently held by live command handles.
    pub fn in_use_count(&self) -> u32 {
        let state = self.shared.state.lock();
        state.total - state.free.len() as u32
    }

    /// The pool's allocation ceiling (0 = unlimited).
    pub fn max_size(&self) -> u32 {
        self.shared.max_size
    }
}

/// A counted reference to a pooled command.
///
/// `Clone` takes a reference, `Drop` releases one. When the last reference
/// goes away the payload is detached (releasing it) and the cell returns to
/// its pool's free list. If the pool itself is already gone, the cell is
/// freed instead.
///
/// Shared access to the command goes through `Deref`; exclusive access via
/// [`get_mut`] is only granted to a sole holder, so a command is only ever
/// mutated by its current owner.
///
/// [`get_mut`]: Self::get_mut
pub struct CmdRef {
    cell: NonNull<CmdCell>,
}

// SAFETY: the cell is shared across threads only through the atomic
// reference count, and `Cmd` itself contains only Send + Sync payloads.
// Mutation requires refcount == 1 (see `get_mut`), so no data races on the
// command body are possible.
unsafe impl Send for CmdRef {}
unsafe impl Sync for CmdRef {}

impl CmdRef {
    fn cell(&self) -> &CmdCell {
        // SAFETY: the cell outlives every handle; it is only reclaimed by
        // the final `drop`.
        unsafe { self.cell.as_ref() }
    }

    /// Current reference count.
    pub fn ref_count(&self) -> u32 {
        self.cell().refcount.load(Ordering::Acquire)
    }

    /// Address of the underlying cell, stable for the cell's lifetime.
    /// Useful to observe pool recycling.
    pub fn as_ptr(&self) -> *const () {
        self.cell.as_ptr() as *const ()
    }

    /// Exclusive access to the command, granted only when this handle is
    /// the sole reference.
    pub fn get_mut(&mut self) -> Option<&mut Cmd> {
        if self.cell().refcount.load(Ordering::Acquire) == 1 {
            // SAFETY: refcount == 1 means no other handle exists, and `self`
            // is borrowed mutably for the lifetime of the returned borrow.
            Some(unsafe { &mut *self.cell().cmd.get() })
        } else {
            None
        }
    }
}

impl Deref for CmdRef {
    type Target = Cmd;

    fn deref(&self) -> &Cmd {
        // SAFETY: shared reads are safe; mutation requires an exclusive
        // handle (refcount == 1), which cannot coexist with another handle.
        unsafe { &*self.cell().cmd.get() }
    }
}

impl Clone for CmdRef {
    fn clone(&self) -> Self {
        self.cell().refcount.fetch_add(1, Ordering::Relaxed);
        Self { cell: self.cell }
    }
}

impl Drop for CmdRef {
    fn drop(&mut self) {
        if self.cell().refcount.fetch_sub(1, Ordering::Release) != 1 {
            return;
        }
        fence(Ordering::Acquire);

        // Final release: reclaim the cell, detach its payload, and hand it
        // back to the owning pool.
        // SAFETY: refcount hit zero, so this is the only remaining handle.
        let mut cell = unsafe { Box::from_raw(self.cell.as_ptr()) };
        cell.cmd.get_mut().init(CmdType::None);
        if let Some(shared) = cell.pool.upgrade() {
            shared.state.lock().free.push(cell);
        }
        // Without a surviving pool the box simply drops here.
    }
}

impl fmt::Debug for CmdRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmdRef")
            .field("cmd_type", &self.cmd_type())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
