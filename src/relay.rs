//! Frame handoff from the render thread to the control task.
//!
//! Bounded tokio mpsc channel: the render side only ever calls `try_send`,
//! the control side awaits `recv`. Frames move by value; the render thread
//! keeps no handle to a frame once posted.

use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::ProcessError;

pub type FrameReceiver = mpsc::Receiver<Bytes>;

pub fn channel(capacity: usize) -> (FrameRelay, FrameReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let relay = FrameRelay {
        tx,
        overflowed: Arc::new(AtomicU64::new(0)),
    };
    (relay, rx)
}

/// Render-thread end of the relay.
pub struct FrameRelay {
    tx: mpsc::Sender<Bytes>,
    // 与会话共享，render 线程退出后仍可读取
    overflowed: Arc<AtomicU64>,
}

impl FrameRelay {
    /// Post a frame without blocking.
    ///
    /// Returns `Ok(false)` when the channel was full and the frame dropped.
    /// A closed channel is reported so the render thread can stop.
    pub fn post(&mut self, frame: Bytes) -> Result<bool, ProcessError> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                self.overflowed.fetch_add(1, Ordering::Relaxed);
                Ok(false)
            }
            Err(TrySendError::Closed(_)) => Err(ProcessError::RelayClosed),
        }
    }

    pub fn overflowed(&self) -> u64 {
        self.overflowed.load(Ordering::Relaxed)
    }

    /// Shared handle to the drop counter.
    pub fn overflow_counter(&self) -> Arc<AtomicU64> {
        self.overflowed.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_send_order() {
        let (mut relay, mut rx) = channel(8);
        for i in 0..5u8 {
            assert!(relay.post(Bytes::from(vec![i; 3])).unwrap());
        }
        for i in 0..5u8 {
            assert_eq!(rx.recv().await.unwrap(), Bytes::from(vec![i; 3]));
        }
    }

    #[tokio::test]
    async fn full_channel_drops_without_blocking() {
        let (mut relay, mut rx) = channel(1);
        let counter = relay.overflow_counter();
        assert!(relay.post(Bytes::from_static(b"a")).unwrap());
        assert!(!relay.post(Bytes::from_static(b"b")).unwrap());
        assert_eq!(relay.overflowed(), 1);
        drop(relay);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"a"));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn closed_channel_is_reported() {
        let (mut relay, rx) = channel(4);
        drop(rx);
        assert_eq!(
            relay.post(Bytes::from_static(b"x")),
            Err(ProcessError::RelayClosed)
        );
    }
}
