use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use super::constants::CONNECTION_TIMEOUT;
use super::error::{RealtimeError, RealtimeResult};
use crate::domain::entities::{BearerToken, UserId};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Where and as whom a single connection attempt connects.
#[derive(Debug, Clone)]
pub struct ConnectTarget {
    pub base_url: String,
    pub user_id: UserId,
    pub token: BearerToken,
}

impl ConnectTarget {
    /// Builds `<base>/ws/<user_id>?token=<access>`.
    ///
    /// # Errors
    /// Returns `RealtimeError::InvalidUrl` if the base URL cannot carry a path.
    pub fn url(&self) -> RealtimeResult<Url> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| RealtimeError::invalid_url(e.to_string()))?;

        url.path_segments_mut()
            .map_err(|()| RealtimeError::invalid_url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push("ws")
            .push(&self.user_id.to_string());

        url.query_pairs_mut()
            .append_pair("token", self.token.as_str());

        Ok(url)
    }
}

/// Opens push connections.
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    async fn connect(&self, target: &ConnectTarget) -> RealtimeResult<Box<dyn RealtimeStream>>;
}

/// An open push connection.
#[async_trait]
pub trait RealtimeStream: Send {
    /// Waits for the next data frame.
    ///
    /// Returns an error once the connection is closed or broken.
    async fn next_frame(&mut self) -> RealtimeResult<String>;

    async fn close(&mut self);
}

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl RealtimeConnector for WebSocketConnector {
    async fn connect(&self, target: &ConnectTarget) -> RealtimeResult<Box<dyn RealtimeStream>> {
        let url = target.url()?;
        debug!(path = url.path(), token = %target.token, "Opening realtime connection");

        let (ws_stream, _) = timeout(CONNECTION_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| RealtimeError::timeout("connection"))?
            .map_err(|e| RealtimeError::connection_failed(e.to_string()))?;

        let (writer, reader) = ws_stream.split();
        Ok(Box::new(WebSocketConnection { writer, reader }))
    }
}

struct WebSocketConnection {
    writer: WsWriter,
    reader: WsReader,
}

#[async_trait]
impl RealtimeStream for WebSocketConnection {
    async fn next_frame(&mut self) -> RealtimeResult<String> {
        loop {
            match self.reader.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(WsMessage::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return Ok(text),
                    Err(e) => warn!(error = %e, "Dropping non UTF-8 binary frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    let (code, reason) = frame.map_or_else(
                        || (1000, "Normal closure".to_string()),
                        |f| (f.code.into(), f.reason.to_string()),
                    );

                    return Err(RealtimeError::closed(code, reason));
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    let _ = self.writer.send(WsMessage::Pong(data)).await;
                }
                Some(Ok(WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(e)) => return Err(RealtimeError::websocket(e.to_string())),
                None => return Err(RealtimeError::closed(1000, "Stream ended")),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.writer.close().await;
        debug!("WebSocket connection closed");
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn target(base_url: &str) -> ConnectTarget {
        ConnectTarget {
            base_url: base_url.to_string(),
            user_id: 7,
            token: BearerToken::new("A1").unwrap(),
        }
    }

    #[test]
    fn test_target_url() {
        let url = target("ws://localhost:8000").url().unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws/7?token=A1");
    }

    #[test]
    fn test_target_url_keeps_base_path() {
        let url = target("wss://stock.example.com/api/").url().unwrap();
        assert_eq!(url.as_str(), "wss://stock.example.com/api/ws/7?token=A1");
    }

    #[test]
    fn test_target_url_rejects_garbage() {
        assert!(matches!(
            target("not a url").url(),
            Err(RealtimeError::InvalidUrl { .. })
        ));
    }
}
