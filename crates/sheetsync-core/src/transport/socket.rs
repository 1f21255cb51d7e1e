//! WebSocket transport
//!
//! Intents are serialized to JSON text frames by a writer task; a reader task
//! parses incoming text or binary frames as UTF-8 JSON events and publishes
//! them on the hub. Only the reader of the current connection may publish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{EventHub, Transport, TransportError};
use crate::config::TransportMode;
use crate::sync::{Intent, ServerEvent};

/// Transport backed by a WebSocket server
pub struct SocketTransport {
    url: String,
    hub: EventHub,
    /// Inbox of the writer task while connected
    outgoing: Option<mpsc::UnboundedSender<String>>,
    /// Cleared by the reader when the socket goes away
    open: Arc<AtomicBool>,
    /// Reader task of the current connection
    reader: Option<JoinHandle<()>>,
}

impl SocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            hub: EventHub::new(),
            outgoing: None,
            open: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_open(&self) -> bool {
        self.outgoing.is_some() && self.open.load(Ordering::SeqCst)
    }

    fn outgoing(&self) -> Result<&mpsc::UnboundedSender<String>, TransportError> {
        match self.outgoing {
            Some(ref outgoing) if self.open.load(Ordering::SeqCst) => Ok(outgoing),
            _ => Err(TransportError::NotConnected),
        }
    }

    fn try_send(&self, intent: &Intent) -> Result<(), TransportError> {
        let outgoing = self.outgoing()?;
        let frame = intent
            .encode()
            .map_err(|e| TransportError::Send(e.to_string()))?;
        outgoing
            .send(frame)
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    /// Stop the reader of the previous connection so it cannot publish again
    fn stop_reader(&mut self) -> bool {
        self.open.store(false, Ordering::SeqCst);
        match self.reader.take() {
            Some(reader) if !reader.is_finished() => {
                reader.abort();
                true
            }
            _ => false,
        }
    }
}

fn decode_frame(msg: Message) -> Option<Result<ServerEvent, String>> {
    match msg {
        Message::Text(text) => Some(ServerEvent::decode(&text).map_err(|e| e.to_string())),
        Message::Binary(bytes) => Some(
            String::from_utf8(bytes)
                .map_err(|e| e.to_string())
                .and_then(|text| ServerEvent::decode(&text).map_err(|e| e.to_string())),
        ),
        _ => None,
    }
}

#[async_trait]
impl Transport for SocketTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::Socket
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.is_open() {
            return Ok(());
        }

        self.stop_reader();
        debug!("Connecting to {}", self.url);
        let (ws_stream, _response) =
            connect_async(self.url.as_str())
                .await
                .map_err(|source| TransportError::Connect {
                    url: self.url.clone(),
                    source,
                })?;
        info!("Connected to {}", self.url);

        let (mut write, mut read) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = write.send(Message::Text(frame)).await {
                    warn!("Failed to send intent frame: {}", e);
                    break;
                }
            }
            // Sender dropped: disconnect requested
            write.close().await.ok();
        });

        // Fresh flag per connection so a stale reader cannot close a new one
        self.open = Arc::new(AtomicBool::new(true));
        let hub = self.hub.clone();
        let open = Arc::clone(&self.open);
        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                let msg = match msg {
                    Ok(Message::Close(_)) => {
                        info!("Server closed connection");
                        break;
                    }
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                };
                // Ping, pong and raw frames carry no events
                match decode_frame(msg) {
                    Some(Ok(event)) => {
                        debug!("Received event (request {:?})", event.request_id());
                        hub.emit(event);
                    }
                    Some(Err(e)) => {
                        warn!("Failed to parse server payload: {}", e);
                        hub.emit(ServerEvent::transport_error("Invalid server payload"));
                    }
                    None => {}
                }
            }

            open.store(false, Ordering::SeqCst);
            hub.emit(ServerEvent::transport_error("Connection closed"));
        });

        self.reader = Some(reader);
        self.outgoing = Some(tx);
        Ok(())
    }

    fn disconnect(&mut self) {
        // Dropping the sender lets the writer send a close frame
        if let Some(outgoing) = self.outgoing.take() {
            info!("Disconnecting from {}", self.url);
            drop(outgoing);
        }
        // The reader is stopped here, so the close is reported here as well
        if self.stop_reader() {
            self.hub.emit(ServerEvent::transport_error("Connection closed"));
        }
    }

    fn send_intent(&mut self, intent: Intent) {
        if let Err(e) = self.try_send(&intent) {
            warn!("Dropping intent {}: {}", intent.intent_id, e);
            self.hub.emit(ServerEvent::rejected(
                intent.intent_id,
                "Cannot send intent while disconnected",
            ));
        }
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ServerEvent> {
        self.hub.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::{accept_async, WebSocketStream};

    use crate::sync::AppSnapshot;

    /// Accept one client on a random local port and hand it to `handler`
    async fn serve_once<F, Fut>(handler: F) -> String
    where
        F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = accept_async(stream).await.unwrap();
            handler(ws).await;
        });
        format!("ws://{}", addr)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_text_frames_become_events() {
        let url = serve_once(|mut ws| async move {
            let snapshot = ServerEvent::Snapshot {
                snapshot: AppSnapshot::default(),
            };
            ws.send(Message::Text(snapshot.encode().unwrap())).await.unwrap();
            ws.send(Message::Text("{not json".to_string())).await.unwrap();
            // Keep the socket open until the client is done
            while ws.next().await.is_some() {}
        })
        .await;

        let mut transport = SocketTransport::new(url);
        let mut rx = transport.subscribe();
        transport.connect().await.unwrap();

        assert!(matches!(next_event(&mut rx).await, ServerEvent::Snapshot { .. }));
        assert_eq!(
            next_event(&mut rx).await,
            ServerEvent::transport_error("Invalid server payload")
        );
    }

    #[tokio::test]
    async fn test_binary_frames_are_decoded_as_json() {
        let url = serve_once(|mut ws| async move {
            let ack = ServerEvent::ack("intent-3").encode().unwrap();
            ws.send(Message::Binary(ack.into_bytes())).await.unwrap();
            ws.send(Message::Binary(vec![0xff, 0xfe])).await.unwrap();
            while ws.next().await.is_some() {}
        })
        .await;

        let mut transport = SocketTransport::new(url);
        let mut rx = transport.subscribe();
        transport.connect().await.unwrap();

        assert_eq!(next_event(&mut rx).await, ServerEvent::ack("intent-3"));
        assert_eq!(
            next_event(&mut rx).await,
            ServerEvent::transport_error("Invalid server payload")
        );
    }

    #[tokio::test]
    async fn test_reconnect_does_not_hear_the_old_reader() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for _ in 0..2 {
                let (stream, _) = listener.accept().await.unwrap();
                tokio::spawn(async move {
                    let mut ws = accept_async(stream).await.unwrap();
                    while let Some(Ok(msg)) = ws.next().await {
                        if let Message::Text(text) = msg {
                            let intent = Intent::decode(&text).unwrap();
                            let ack = ServerEvent::ack(intent.intent_id);
                            ws.send(Message::Text(ack.encode().unwrap())).await.ok();
                        }
                    }
                });
            }
        });

        let mut transport = SocketTransport::new(format!("ws://{}", addr));
        let mut rx = transport.subscribe();
        transport.connect().await.unwrap();

        transport.disconnect();
        assert_eq!(
            next_event(&mut rx).await,
            ServerEvent::transport_error("Connection closed")
        );
        assert!(!transport.is_open());

        transport.connect().await.unwrap();
        assert!(transport.is_open());
        transport.send_intent(Intent::spawn_encounter("intent-8", "enc1"));
        assert_eq!(next_event(&mut rx).await, ServerEvent::ack("intent-8"));

        // Nothing from the first connection arrives late
        let late = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
        assert!(late.is_err());
        assert!(transport.is_open());
    }

    #[tokio::test]
    async fn test_intents_are_sent_as_json_text() {
        let url = serve_once(|mut ws| async move {
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(text) = msg {
                    let intent = Intent::decode(&text).unwrap();
                    let ack = ServerEvent::ack(intent.intent_id);
                    ws.send(Message::Text(ack.encode().unwrap())).await.unwrap();
                }
            }
        })
        .await;

        let mut transport = SocketTransport::new(url);
        let mut rx = transport.subscribe();
        transport.connect().await.unwrap();
        transport.send_intent(Intent::spawn_encounter("intent-7", "enc1"));

        assert_eq!(next_event(&mut rx).await, ServerEvent::ack("intent-7"));
    }

    #[tokio::test]
    async fn test_send_while_disconnected_is_rejected() {
        let mut transport = SocketTransport::new("ws://127.0.0.1:1/ws");
        let mut rx = transport.subscribe();
        transport.send_intent(Intent::authenticate_gm("auth-1", "secret"));

        assert_eq!(
            next_event(&mut rx).await,
            ServerEvent::rejected("auth-1", "Cannot send intent while disconnected")
        );
    }

    #[tokio::test]
    async fn test_connect_failure_is_an_error() {
        // Grab a free port, then close it so nothing is listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut transport = SocketTransport::new(format!("ws://{}", addr));
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_server_close_reports_connection_closed() {
        let url = serve_once(|mut ws| async move {
            ws.close(None).await.ok();
        })
        .await;

        let mut transport = SocketTransport::new(url);
        let mut rx = transport.subscribe();
        transport.connect().await.unwrap();

        assert_eq!(
            next_event(&mut rx).await,
            ServerEvent::transport_error("Connection closed")
        );
        assert!(!transport.is_open());

        transport.send_intent(Intent::remove_instance("rm-1", "i1"));
        assert_eq!(
            next_event(&mut rx).await,
            ServerEvent::rejected("rm-1", "Cannot send intent while disconnected")
        );
    }
}
