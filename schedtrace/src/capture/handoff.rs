//! Binary handoff between producer and consumer.
//!
//! A one-token signal meaning "a buffer swap has completed". The token
//! carries the index of the buffer that swap froze, so the consumer reads
//! exactly the window it was promised even if the roles have moved again by
//! the time it wakes. The producer side must never block, so signalling is a
//! `try_send` into a bounded(1) channel: if a token is already pending the
//! new signal is dropped and the earlier, still-undelivered swap wins. The
//! consumer side waits with an explicit timeout, never indefinitely.

use crate::domain::CaptureError;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

pub struct Handoff {
    tx: Sender<usize>,
    rx: Receiver<usize>,
}

impl Handoff {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { tx, rx }
    }

    /// Producer side: post a completion token naming the frozen buffer.
    /// Non-blocking; a token already pending keeps its place.
    pub fn signal(&self, frozen: usize) {
        let _ = self.tx.try_send(frozen);
    }

    /// Consumer side: wait for a completion token, at most `timeout`, and
    /// return the index of the buffer the swap froze.
    ///
    /// # Errors
    /// `CaptureError::Timeout` if no token arrives in time;
    /// `CaptureError::Resource` if the handoff object was destroyed.
    pub fn wait(&self, timeout: Duration) -> Result<usize, CaptureError> {
        match self.rx.recv_timeout(timeout) {
            Ok(frozen) => Ok(frozen),
            Err(RecvTimeoutError::Timeout) => Err(CaptureError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(CaptureError::Resource("handoff channel disconnected".into()))
            }
        }
    }

    /// Discard any stale token so a fresh wait observes only swaps completed
    /// after this point.
    pub fn drain(&self) {
        while self.rx.try_recv().is_ok() {}
    }
}

impl Default for Handoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_then_wait_delivers_the_frozen_index() {
        let handoff = Handoff::new();
        handoff.signal(1);
        assert_eq!(handoff.wait(Duration::from_millis(10)).unwrap(), 1);
    }

    #[test]
    fn wait_without_signal_times_out() {
        let handoff = Handoff::new();
        match handoff.wait(Duration::from_millis(5)) {
            Err(CaptureError::Timeout(_)) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn redundant_signals_keep_the_first_token() {
        let handoff = Handoff::new();
        handoff.signal(0);
        handoff.signal(1);
        handoff.signal(1);
        assert_eq!(handoff.wait(Duration::from_millis(10)).unwrap(), 0);
        assert!(handoff.wait(Duration::from_millis(5)).is_err());
    }

    #[test]
    fn drain_discards_stale_token() {
        let handoff = Handoff::new();
        handoff.signal(0);
        handoff.drain();
        assert!(handoff.wait(Duration::from_millis(5)).is_err());
    }
}
