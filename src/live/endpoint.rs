//! Production transport: dials the hosted bidirectional endpoint over
//! WebSocket and completes the setup handshake.

use crate::error::AppError;
use crate::live::session::{LiveConnection, LiveSender, LiveTransport};
use crate::live::wire::{ClientSetup, RealtimeInput, ServerMessage};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct EndpointTransport {
    url: String,
}

impl EndpointTransport {
    /// `url` carries the endpoint path and API key query parameter.
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

#[async_trait::async_trait]
impl LiveTransport for EndpointTransport {
    async fn connect(&self, setup: ClientSetup) -> Result<LiveConnection, AppError> {
        let (stream, _response) = connect_async(&self.url)
            .await
            .map_err(|e| AppError::ConnectionFailure(format!("websocket dial failed: {e}")))?;

        let (mut write, mut read) = stream.split();

        let setup_json = serde_json::to_string(&setup)
            .map_err(|e| AppError::Internal(format!("setup serialization failed: {e}")))?;
        write
            .send(Message::Text(setup_json))
            .await
            .map_err(|e| AppError::ConnectionFailure(format!("setup send failed: {e}")))?;

        // The endpoint acknowledges setup before any content flows.
        let ack = read_server_message(&mut read).await?.ok_or_else(|| {
            AppError::ConnectionFailure("endpoint closed before setup acknowledgement".to_string())
        })?;
        if ack.setup_complete.is_none() {
            return Err(AppError::ConnectionFailure(
                "endpoint did not acknowledge setup".to_string(),
            ));
        }
        debug!("live endpoint setup acknowledged");

        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        tokio::spawn(async move {
            loop {
                match read_server_message(&mut read).await {
                    Ok(Some(msg)) => {
                        if inbound_tx.send(Ok(msg)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = inbound_tx.send(Err(e)).await;
                        break;
                    }
                }
            }
        });

        Ok(LiveConnection {
            sender: Box::new(EndpointSender { write }),
            inbound: inbound_rx,
        })
    }
}

/// Pull the next content-bearing frame; `None` once the peer closes.
/// The endpoint frames JSON as either text or binary messages.
async fn read_server_message(
    read: &mut SplitStream<WsStream>,
) -> Result<Option<ServerMessage>, AppError> {
    while let Some(frame) = read.next().await {
        let frame =
            frame.map_err(|e| AppError::ConnectionFailure(format!("websocket read failed: {e}")))?;
        let payload = match frame {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(bytes) => bytes,
            Message::Close(_) => return Ok(None),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };
        let msg: ServerMessage = serde_json::from_slice(&payload)
            .map_err(|e| AppError::ConnectionFailure(format!("unparseable endpoint frame: {e}")))?;
        return Ok(Some(msg));
    }
    Ok(None)
}

struct EndpointSender {
    write: SplitSink<WsStream, Message>,
}

#[async_trait::async_trait]
impl LiveSender for EndpointSender {
    async fn send(&mut self, frame: RealtimeInput) -> Result<(), AppError> {
        let json = serde_json::to_string(&frame)
            .map_err(|e| AppError::Internal(format!("frame serialization failed: {e}")))?;
        self.write
            .send(Message::Text(json))
            .await
            .map_err(|e| AppError::ConnectionFailure(format!("websocket send failed: {e}")))
    }

    async fn close(&mut self) -> Result<(), AppError> {
        if let Err(e) = self.write.send(Message::Close(None)).await {
            warn!("websocket close frame not delivered: {e}");
        }
        Ok(())
    }
}
