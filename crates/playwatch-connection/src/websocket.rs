//! WebSocket connector.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tracing::{debug, trace, warn};

use playwatch_config::Config;
use playwatch_protocols::{DecodeError, TransportError};

use crate::connector::{Connector, Link};

/// Connects to the realtime endpoint over WebSocket.
///
/// Each established socket is driven by a spawned pump task that bridges it
/// to the [`Link`] queues. The pump exits, closing the socket, as soon as
/// either side goes away.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    authorization: Option<String>,
    buffer: usize,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            authorization: None,
            buffer: 64,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.server.ws_url.clone(),
            authorization: config.server.authorization.clone(),
            buffer: config.connection.outbound_buffer,
        }
    }

    /// Send an `Authorization` header with the handshake.
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Link, TransportError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", self.url, e)))?;

        if let Some(auth) = &self.authorization {
            let value = HeaderValue::from_str(auth)
                .map_err(|e| TransportError::ConnectionFailed(format!("authorization: {}", e)))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        debug!("Opening WebSocket to {}", self.url);
        let (ws_stream, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", self.url, e)))?;

        let (link, remote) = Link::pair(self.buffer);
        let to_client = remote.to_client;
        let mut from_client = remote.from_client;
        let (mut ws_sink, mut ws_source) = ws_stream.split();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outgoing = from_client.recv() => {
                        let Some(text) = outgoing else {
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break;
                        };
                        trace!("ws send: {}", text);
                        if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                            warn!("WebSocket send failed: {}", e);
                            break;
                        }
                    }
                    incoming = ws_source.next() => {
                        match classify(incoming) {
                            Inbound::Text(text) => {
                                trace!("ws recv: {}", text);
                                if forward(&to_client, text).await.is_err() {
                                    break;
                                }
                            }
                            Inbound::Unsupported(e) => warn!("Dropping frame: {}", e),
                            Inbound::Control => {}
                            Inbound::Closed => {
                                debug!("WebSocket closed by server");
                                break;
                            }
                            Inbound::Failed(e) => {
                                warn!("{}", e);
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(link)
    }
}

/// What the pump does with one read from the socket.
#[derive(Debug)]
enum Inbound {
    Text(String),
    Unsupported(DecodeError),
    /// Ping/pong handled by tungstenite itself.
    Control,
    Closed,
    Failed(TransportError),
}

fn classify(incoming: Option<Result<Message, tungstenite::Error>>) -> Inbound {
    match incoming {
        Some(Ok(Message::Text(text))) => Inbound::Text(text.as_str().to_owned()),
        Some(Ok(Message::Binary(data))) => Inbound::Unsupported(DecodeError::UnsupportedFrame(
            format!("binary ({} bytes)", data.len()),
        )),
        Some(Ok(Message::Frame(_))) => {
            Inbound::Unsupported(DecodeError::UnsupportedFrame("raw frame".to_string()))
        }
        Some(Ok(Message::Ping(_) | Message::Pong(_))) => Inbound::Control,
        Some(Ok(Message::Close(_))) | None => Inbound::Closed,
        Some(Err(e)) => Inbound::Failed(TransportError::WebSocket(e.to_string())),
    }
}

async fn forward(to_client: &mpsc::Sender<String>, text: String) -> Result<(), TransportError> {
    to_client.send(text).await.map_err(|_| TransportError::Closed)
}
