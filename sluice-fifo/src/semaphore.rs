//! Counting semaphore.
//!
//! The semaphore is the counting gate behind every blocking FIFO wait: write
//! space and queued elements are both modeled as semaphore resources. It is
//! safe for any number of posters and waiters; waiters are not guaranteed to
//! wake in FIFO order.
//!
//! [`reset`](Semaphore::reset) drains the count to zero and also releases
//! every parked waiter empty-handed. The flow-disable shutdown path depends
//! on this: it posts once (releasing a waiter with a resource) and then
//! resets (releasing the rest without one); all of them re-check the flow
//! flag after waking.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

struct SemState {
    count: u32,
    /// Bumped by `reset` so parked waiters can tell they were flushed out
    /// rather than handed a resource.
    epoch: u64,
}

/// A counting semaphore with blocking, timed and non-blocking waits.
pub struct Semaphore {
    state: Mutex<SemState>,
    cond: Condvar,
}

impl Semaphore {
    /// Create a semaphore holding `initial` resources.
    pub fn new(initial: u32) -> Self {
        Self {
            state: Mutex::new(SemState {
                count: initial,
                epoch: 0,
            }),
            cond: Condvar::new(),
        }
    }

    /// Release one resource, waking at most one waiter.
    pub fn post(&self) {
        let mut state = self.state.lock();
        state.count += 1;
        drop(state);
        self.cond.notify_one();
    }

    /// Block until a resource is available, then take it.
    ///
    /// Also returns, without taking anything, if the semaphore is reset
    /// while waiting.
    pub fn acquire(&self) {
        let mut state = self.state.lock();
        let epoch = state.epoch;
        while state.count == 0 && state.epoch == epoch {
            self.cond.wait(&mut state);
        }
        if state.count > 0 {
            state.count -= 1;
        }
    }

    /// Block until a resource is available or `ms` milliseconds elapse.
    ///
    /// Returns `true` if a resource was taken; `false` on timeout or if the
    /// semaphore was reset while waiting. `ms < 1` degenerates to an untimed
    /// [`acquire`](Self::acquire) and returns `true`.
    pub fn acquire_timed(&self, ms: i64) -> bool {
        if ms < 1 {
            self.acquire();
            return true;
        }
        let deadline = Instant::now() + Duration::from_millis(ms as u64);
        let mut state = self.state.lock();
        let epoch = state.epoch;
        while state.count == 0 && state.epoch == epoch {
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        if state.count > 0 {
            state.count -= 1;
            true
        } else {
            false
        }
    }

    /// Take a resource if one is immediately available.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock();
        if state.count > 0 {
            state.count -= 1;
            true
        } else {
            false
        }
    }

    /// Drain the semaphore to zero resources and release every parked
    /// waiter empty-handed.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.count = 0;
        state.epoch += 1;
        drop(state);
        self.cond.notify_all();
    }

    /// Number of resources currently available.
    pub fn available(&self) -> u32 {
        self.state.lock().count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_initial_count() {
        let sem = Semaphore::new(3);
        assert_eq!(sem.available(), 3);
        assert!(sem.try_acquire());
        assert!(sem.try_acquire());
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
    }

    #[test]
    fn test_post_wakes_waiter() {
        let sem = Arc::new(Semaphore::new(0));
        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.acquire())
        };
        thread::sleep(Duration::from_millis(20));
        sem.post();
        waiter.join().unwrap();
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_timed_wait_expires() {
        let sem = Semaphore::new(0);
        let start = Instant::now();
        assert!(!sem.acquire_timed(30));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_timed_wait_acquires() {
        let sem = Semaphore::new(1);
        assert!(sem.acquire_timed(1000));
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_zero_timeout_degenerates_to_untimed() {
        let sem = Semaphore::new(1);
        assert!(sem.acquire_timed(0));
    }

    #[test]
    fn test_reset_drains() {
        let sem = Semaphore::new(5);
        sem.reset();
        assert_eq!(sem.available(), 0);
        assert!(!sem.try_acquire());
    }

    #[test]
    fn test_reset_releases_parked_waiters() {
        let sem = Arc::new(Semaphore::new(0));
        let mut waiters = Vec::new();
        for _ in 0..3 {
            let sem = Arc::clone(&sem);
            waiters.push(thread::spawn(move || sem.acquire()));
        }
        thread::sleep(Duration::from_millis(30));
        sem.reset();
        for waiter in waiters {
            waiter.join().unwrap();
        }
        assert_eq!(sem.available(), 0);
    }

    #[test]
    fn test_reset_releases_timed_waiter_early() {
        let sem = Arc::new(Semaphore::new(0));
        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.acquire_timed(10_000))
        };
        thread::sleep(Duration::from_millis(30));
        let start = Instant::now();
        sem.reset();
        assert!(!waiter.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_many_posters_many_waiters() {
        let sem = Arc::new(Semaphore::new(0));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let sem = Arc::clone(&sem);
            handles.push(thread::spawn(move || sem.acquire()));
        }
        for _ in 0..4 {
            let sem = Arc::clone(&sem);
            handles.push(thread::spawn(move || sem.post()));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sem.available(), 0);
    }
}
