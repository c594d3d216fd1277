//! Property-based tests for queue ordering and counting.
//!
//! Runs random operation sequences against a `VecDeque` reference model:
//! writes append at the back, preempts insert at the front, reads pop the
//! front. The queue must agree with the model on every returned element and
//! on the stored count after every step.

use proptest::prelude::*;
use sluice_fifo::{Fifo, FifoConfig, FifoError, RingMode};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    Write(u32),
    Preempt(u32),
    Read,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u32>().prop_map(Op::Write),
        1 => any::<u32>().prop_map(Op::Preempt),
        3 => Just(Op::Read),
    ]
}

proptest! {
    /// Elements come out in write order, except that a preempted element
    /// jumps to the front; the count always matches writes − reads and
    /// never exceeds the capacity.
    #[test]
    fn blocking_fifo_matches_deque_model(
        capacity in 1usize..8,
        ops in proptest::collection::vec(op_strategy(), 1..256),
    ) {
        let fifo: Fifo<u32> = Fifo::new(FifoConfig::new(capacity).with_mode(RingMode::Blocking));
        fifo.set_flow_enabled(true);
        let mut model: VecDeque<u32> = VecDeque::new();
        let mut accepted = 0usize;
        let mut read_out = 0usize;

        for op in ops {
            match op {
                Op::Write(value) => match fifo.write(value) {
                    Ok(()) => {
                        model.push_back(value);
                        accepted += 1;
                    }
                    Err(err) => {
                        prop_assert_eq!(err.code, FifoError::FifoFull);
                        prop_assert_eq!(model.len(), capacity);
                        prop_assert_eq!(err.into_item(), value);
                    }
                },
                Op::Preempt(value) => match fifo.preempt(value) {
                    Ok(()) => {
                        model.push_front(value);
                        accepted += 1;
                    }
                    Err(err) => {
                        prop_assert_eq!(err.code, FifoError::FifoFull);
                        prop_assert_eq!(model.len(), capacity);
                    }
                },
                Op::Read => {
                    let got = fifo.read();
                    if got.is_some() {
                        read_out += 1;
                    }
                    prop_assert_eq!(got, model.pop_front());
                }
            }

            prop_assert_eq!(fifo.stored_count(), model.len());
            prop_assert!(fifo.stored_count() <= capacity);
            prop_assert_eq!(fifo.stored_count(), accepted - read_out);
        }

        // Drain and compare the tails.
        while let Some(expected) = model.pop_front() {
            prop_assert_eq!(fifo.read(), Some(expected));
        }
        prop_assert_eq!(fifo.read(), None);
        prop_assert_eq!(fifo.stored_count(), 0);
    }

    /// The lockless ring preserves FIFO order for a single producer and
    /// consumer (exercised sequentially here; the threaded case lives in
    /// the crate's unit tests).
    #[test]
    fn lockless_fifo_preserves_order(
        capacity in 1usize..8,
        values in proptest::collection::vec(any::<u32>(), 1..128),
    ) {
        let fifo: Fifo<u32> = Fifo::new(FifoConfig::new(capacity).with_mode(RingMode::Lockless));
        fifo.set_flow_enabled(true);
        let mut model: VecDeque<u32> = VecDeque::new();

        for value in values {
            match fifo.write(value) {
                Ok(()) => model.push_back(value),
                Err(err) => {
                    prop_assert_eq!(err.code, FifoError::FifoFull);
                    // Make room and retry once.
                    prop_assert_eq!(fifo.read(), model.pop_front());
                    prop_assert!(fifo.write(err.into_item()).is_ok());
                    model.push_back(value);
                }
            }
        }

        while let Some(expected) = model.pop_front() {
            prop_assert_eq!(fifo.read(), Some(expected));
        }
        prop_assert_eq!(fifo.read(), None);
    }
}
