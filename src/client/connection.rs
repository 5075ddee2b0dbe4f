use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::models::{ReceivedMessage, SendMessage};
use super::ClientError;

/// One logical connection to the relay. Reconnecting means opening a new one.
pub struct Connection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection {
    pub async fn open(url: &str) -> Result<Self, ClientError> {
        let (stream, response) = connect_async(url).await?;
        info!("Connected to {} ({})", url, response.status());
        Ok(Self { stream })
    }

    pub async fn send(&mut self, msg: &ReceivedMessage) -> Result<(), ClientError> {
        let text = serde_json::to_string(msg)?;
        debug!("Sending {}", text);
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Next frame from the relay; `None` once the connection is closed.
    pub async fn recv(&mut self) -> Option<Result<SendMessage, ClientError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(text.as_str()).map_err(ClientError::from));
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    pub async fn close(mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("Error while closing connection: {}", e);
        }
    }
}
