//! Reentrant per-engine dispatch gate.
//!
//! Submissions on one engine are serialized so filters and renderers observe
//! actions in submission order. The thread already holding the gate may enter
//! again: a filter that calls `submit` dispatches the nested action
//! depth-first, before its own action is published.

use std::sync::{Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

#[derive(Default)]
struct Owner {
    thread: Option<ThreadId>,
    depth: usize,
}

#[derive(Default)]
pub(super) struct DispatchGate {
    owner: Mutex<Owner>,
    released: Condvar,
}

impl DispatchGate {
    /// Blocks until the gate is free or already held by this thread.
    pub fn enter(&self) -> GateGuard<'_> {
        let me = thread::current().id();
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match owner.thread {
                None => {
                    owner.thread = Some(me);
                    owner.depth = 1;
                    break;
                }
                Some(t) if t == me => {
                    owner.depth += 1;
                    break;
                }
                Some(_) => {
                    owner = self
                        .released
                        .wait(owner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        GateGuard { gate: self }
    }
}

pub(super) struct GateGuard<'a> {
    gate: &'a DispatchGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        let mut owner = self.gate.owner.lock().unwrap_or_else(PoisonError::into_inner);
        owner.depth -= 1;
        if owner.depth == 0 {
            owner.thread = None;
            drop(owner);
            self.gate.released.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_same_thread_reenters() {
        let gate = DispatchGate::default();
        let outer = gate.enter();
        let inner = gate.enter();
        drop(inner);
        drop(outer);
        let _again = gate.enter();
    }

    #[test]
    fn test_other_thread_waits_for_release() {
        let gate = Arc::new(DispatchGate::default());
        let entered = Arc::new(AtomicBool::new(false));

        let guard = gate.enter();
        let handle = {
            let gate = Arc::clone(&gate);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                let _g = gate.enter();
                entered.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));
        drop(guard);
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }
}
