//! One recording session: owns the socket, the audio graph and the relay.
//!
//! The control task drives everything here. The render thread only ever
//! sees its `FrameRelay`; nothing else crosses the thread boundary.

use bytes::Bytes;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::audio::{AudioGraph, CaptureStream};
use crate::config::Config;
use crate::error::{CaptureError, Error, Result};
use crate::net_link::{LinkState, NetEvent, NetLink};
use crate::relay::{self, FrameReceiver, FrameRelay};

/// Frame counters reported when the session stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub sent: u64,
    /// Dropped because the socket was not OPEN or the write failed
    pub link_dropped: u64,
    /// Dropped on the render thread because the relay was full
    pub relay_dropped: u64,
}

pub struct Session {
    id: Uuid,
    config: Config,
    link: NetLink,
    rx_net_event: mpsc::Receiver<NetEvent>,
    graph: Option<AudioGraph>,
    // Taken by `start`; the graph can only be built once per session.
    relay: Option<FrameRelay>,
    frames: FrameReceiver,
    relay_dropped: Arc<AtomicU64>,
    stopped: bool,
}

impl Session {
    /// Create a session in the CONNECTING state. `config` is validated here
    /// so nothing downstream sees an unusable ratio or frame size.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let id = Uuid::new_v4();
        let (tx_net_event, rx_net_event) = mpsc::channel::<NetEvent>(8);
        let link = NetLink::new(
            id,
            config.ws_url.clone(),
            config.connect_timeout(),
            tx_net_event,
        );
        let (relay, frames) = relay::channel(config.audio.relay_capacity);
        let relay_dropped = relay.overflow_counter();
        log::info!("[{}] session created for {}", id, config.ws_url);

        Ok(Self {
            id,
            config,
            link,
            rx_net_event,
            graph: None,
            relay: Some(relay),
            frames,
            relay_dropped,
            stopped: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> LinkState {
        self.link.state()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            sent: self.link.sent(),
            link_dropped: self.link.dropped(),
            relay_dropped: self.relay_dropped.load(Ordering::Relaxed),
        }
    }

    /// Open the socket. A failure leaves the session CLOSED; there is no retry.
    pub async fn connect(&mut self) -> Result<()> {
        self.link.connect().await.map_err(Error::from)?;
        log::info!("[{}] handshake succeeded", self.id);
        Ok(())
    }

    /// Build the audio graph around `stream`.
    ///
    /// Only the first call builds anything. Later calls release the offered
    /// stream and return `Ok`.
    pub fn start(&mut self, stream: CaptureStream) -> Result<()> {
        let Some(relay) = self.relay.take() else {
            log::debug!("[{}] audio graph already built, ignoring start", self.id);
            return Ok(());
        };
        let graph = AudioGraph::start(self.id, &self.config.audio, stream, relay)
            .map_err(|e| CaptureError::Device(format!("failed to start audio graph: {e}")))?;
        self.graph = Some(graph);
        log::info!("[{}] recording started", self.id);
        Ok(())
    }

    /// Send one frame if the socket is open; otherwise it is dropped.
    pub async fn send(&mut self, frame: Bytes) -> bool {
        self.link.send(frame).await
    }

    /// Forward relayed frames to the socket until `shutdown` resolves or the
    /// session has nothing left to do.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("[{}] shutdown requested", self.id);
                    break;
                }
                Some(event) = self.rx_net_event.recv() => {
                    self.link.handle_event(event);
                }
                frame = self.frames.recv() => match frame {
                    Some(frame) => {
                        self.send(frame).await;
                    }
                    None => {
                        log::info!("[{}] audio graph finished", self.id);
                        break;
                    }
                },
            }
        }
    }

    /// True once the render thread has exited (or was never started).
    #[cfg(test)]
    pub fn capture_finished(&self) -> bool {
        self.graph.as_ref().is_none_or(|g| g.is_finished())
    }

    /// Tear the session down: disconnect the graph, flush frames that were
    /// already relayed, close the socket. Safe to call in any state, any
    /// number of times.
    pub async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        // join 会阻塞到当前采集读完成，放到阻塞线程池上等待
        if let Some(mut graph) = self.graph.take() {
            if let Err(e) = tokio::task::spawn_blocking(move || graph.stop()).await {
                log::error!("[{}] failed to join audio graph: {}", self.id, e);
            }
        }
        // Nothing will be produced from here on.
        self.relay = None;

        while let Ok(frame) = self.frames.try_recv() {
            self.send(frame).await;
        }
        self.link.close().await;
        let stats = self.stats();
        log::info!(
            "[{}] recording stopped ({:?}): {} frames sent, {} dropped at the link, {} dropped at the relay",
            self.id,
            self.state(),
            stats.sent,
            stats.link_dropped,
            stats.relay_dropped
        );
    }
}
