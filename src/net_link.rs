use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};

use url::Url;
use uuid::Uuid;

use crate::error::TransportError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

#[derive(Debug)]
pub enum NetEvent {
    /// 服务端关闭或连接出错，附带原因
    Disconnected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// One WebSocket connection to the recorder service.
///
/// Only binary frames are written. The read half runs in its own task and is
/// only watched for close and error signals, which arrive as `NetEvent`s.
pub struct NetLink {
    id: Uuid,
    url: String,
    connect_timeout: Option<Duration>,
    state: LinkState,
    write: Option<WsSink>,
    reader: Option<JoinHandle<()>>,
    tx: mpsc::Sender<NetEvent>,
    sent: u64,
    dropped: u64,
}

impl NetLink {
    pub fn new(
        id: Uuid,
        url: impl Into<String>,
        connect_timeout: Option<Duration>,
        tx: mpsc::Sender<NetEvent>,
    ) -> Self {
        Self {
            id,
            url: url.into(),
            connect_timeout,
            state: LinkState::Connecting,
            write: None,
            reader: None,
            tx,
            sent: 0,
            dropped: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    // 执行握手，成功后进入 Open 状态；失败则直接进入 Closed，不重试
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        match self.state {
            LinkState::Connecting => {}
            LinkState::Open => return Ok(()),
            LinkState::Closing | LinkState::Closed => {
                return Err(TransportError::Connect("link already closed".into()));
            }
        }

        if let Err(e) = Url::parse(&self.url) {
            self.state = LinkState::Closed;
            return Err(TransportError::InvalidUrl(format!("{}: {}", self.url, e)));
        }

        log::info!("[{}] Connecting to {}...", self.id, self.url);
        let handshake = connect_async(self.url.as_str());
        let result = match self.connect_timeout {
            Some(limit) => match tokio::time::timeout(limit, handshake).await {
                Ok(r) => r,
                Err(_) => {
                    self.state = LinkState::Closed;
                    return Err(TransportError::Timeout(limit.as_millis() as u64));
                }
            },
            None => handshake.await,
        };

        let ws_stream = match result {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                self.state = LinkState::Closed;
                return Err(TransportError::Connect(e.to_string()));
            }
        };
        log::info!("[{}] Connected!", self.id);

        let (write, mut read) = ws_stream.split();
        let tx = self.tx.clone();
        let id = self.id;
        self.reader = Some(tokio::spawn(async move {
            let reason = loop {
                match read.next().await {
                    Some(Ok(Message::Close(frame))) => {
                        break format!("server closed connection: {:?}", frame);
                    }
                    Some(Ok(Message::Text(text))) => {
                        log::info!("[{}] Ignoring text message: {}", id, text.as_str());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        log::info!("[{}] Ignoring binary message: {} bytes", id, data.len());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break e.to_string(),
                    None => break "connection closed".to_string(),
                }
            };
            let _ = tx.send(NetEvent::Disconnected(reason)).await;
        }));

        self.write = Some(write);
        self.state = LinkState::Open;
        Ok(())
    }

    /// Send one frame if the link is open; otherwise drop it.
    ///
    /// Returns whether the frame was written. A write failure closes the link.
    pub async fn send(&mut self, frame: Bytes) -> bool {
        if self.state != LinkState::Open {
            self.dropped += 1;
            log::info!("[{}] ws is {:?}, ignore data: {}", self.id, self.state, frame.len());
            return false;
        }
        let Some(write) = self.write.as_mut() else {
            self.dropped += 1;
            return false;
        };

        match write.send(Message::Binary(frame)).await {
            Ok(()) => {
                self.sent += 1;
                true
            }
            Err(e) => {
                log::warn!("[{}] {}", self.id, TransportError::Send(e.to_string()));
                self.dropped += 1;
                self.shutdown_io();
                false
            }
        }
    }

    pub fn handle_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::Disconnected(reason) => {
                if self.state != LinkState::Closed {
                    log::info!("[{}] WebSocket disconnected: {}", self.id, reason);
                    self.shutdown_io();
                }
            }
        }
    }

    /// Close the socket. Idempotent.
    pub async fn close(&mut self) {
        if self.state == LinkState::Closed {
            return;
        }
        if let Some(mut write) = self.write.take() {
            self.state = LinkState::Closing;
            if let Err(e) = write.close().await {
                log::debug!("[{}] WebSocket close: {}", self.id, e);
            }
        }
        self.shutdown_io();
        log::info!(
            "[{}] WebSocket closed ({} frames sent, {} dropped)",
            self.id,
            self.sent,
            self.dropped
        );
    }

    fn shutdown_io(&mut self) {
        self.write = None;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.state = LinkState::Closed;
    }
}

impl Drop for NetLink {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
