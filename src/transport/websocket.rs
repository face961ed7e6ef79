//! Controller push socket and event loop.
//!
//! The socket URL is derived from the REST base: the scheme switches from
//! `http`/`https` to `ws`/`wss` and the path becomes
//! `/sockjs/<NNN>/<uuid>/websocket`, with a fresh random segment and id per
//! connection.
//!
//! # Event Loop
//!
//! [`Connection::open`] spawns a task that owns the socket and handles:
//!
//! - inbound text frames, decoded with [`decode_events`] and forwarded in
//!   order on the event channel
//! - outbound control frames queued through [`ConnectionCommand::Send`]
//! - shutdown and fatal errors raised by the event consumer
//!
//! Decoding never waits on event handling. A slow consumer only grows the
//! event channel.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::{ControllerEvent, decode_events};

// ============================================================================
// Types
// ============================================================================

/// Sender half of the event loop's command channel.
pub type CommandSender = mpsc::UnboundedSender<ConnectionCommand>;

/// Receiver of decoded controller events, in arrival order.
pub type EventReceiver = mpsc::UnboundedReceiver<ControllerEvent>;

// ============================================================================
// URL Derivation
// ============================================================================

/// Derives the push socket URL from the controller's REST base URL.
///
/// # Errors
///
/// Returns [`Error::Config`] if the base URL is not `http` or `https`.
pub fn websocket_url(base: &Url) -> Result<Url> {
    let scheme = match base.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(Error::config(format!(
                "controller URL must be http or https, got {other}"
            )));
        }
    };

    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|()| Error::config(format!("cannot switch {base} to {scheme}")))?;

    let segment: u16 = rand::rng().random_range(0..1000);
    url.set_path(&format!("/sockjs/{segment:03}/{}/websocket", Uuid::new_v4()));
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Commands for the event loop.
#[derive(Debug)]
pub enum ConnectionCommand {
    /// Send an encoded frame.
    Send(String),
    /// Close the socket and end the loop with this error.
    Fail(Error),
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Live push socket to the controller.
#[derive(Debug)]
pub struct Connection {
    /// Channel to the event loop.
    command_tx: CommandSender,
    /// Event loop task; taken by [`Connection::closed`].
    task: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl Connection {
    /// Connects to `url` and spawns the event loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`] if the handshake fails.
    pub async fn open(url: &Url) -> Result<(Self, EventReceiver)> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        info!(host = url.host_str().unwrap_or_default(), "Controller socket connected");
        Ok(Self::spawn(ws_stream))
    }

    /// Wraps an established stream and spawns the event loop.
    fn spawn<S>(ws_stream: WebSocketStream<S>) -> (Self, EventReceiver)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(Self::run_event_loop(ws_stream, command_rx, event_tx));

        let connection = Self {
            command_tx,
            task: Mutex::new(Some(task)),
        };
        (connection, event_rx)
    }

    /// Returns a sender for queuing commands from other tasks.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> CommandSender {
        self.command_tx.clone()
    }

    /// Queues an encoded frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the loop has ended.
    pub fn send(&self, frame: impl Into<String>) -> Result<()> {
        self.command_tx
            .send(ConnectionCommand::Send(frame.into()))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns `true` once the event loop has ended.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    /// Closes the socket. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Waits for the event loop to end and returns why it ended.
    ///
    /// `Ok(())` after a local shutdown. Returns immediately with `Ok(())` if
    /// already awaited.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the controller closed the socket
    /// - [`Error::WebSocket`] on a socket failure
    /// - the error passed with [`ConnectionCommand::Fail`]
    pub async fn closed(&self) -> Result<()> {
        let task = self.task.lock().take();
        match task {
            Some(task) => task
                .await
                .map_err(|e| Error::connection(format!("event loop panicked: {e}")))?,
            None => Ok(()),
        }
    }

    /// Event loop that owns the socket.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        event_tx: mpsc::UnboundedSender<ControllerEvent>,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        let outcome = loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(len = text.len(), "Frame received");
                            for event in decode_events(text.as_str()) {
                                // Receiver gone means teardown is under way.
                                let _ = event_tx.send(event);
                            }
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("Socket closed by controller");
                            break Err(Error::ConnectionClosed);
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "Socket error");
                            break Err(Error::WebSocket(e));
                        }

                        None => {
                            debug!("Socket stream ended");
                            break Err(Error::ConnectionClosed);
                        }

                        // Binary, ping and pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(frame)) => {
                            trace!(frame = %frame, "Sending frame");
                            if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                                warn!(error = %e, "Failed to send frame");
                                break Err(Error::WebSocket(e));
                            }
                        }

                        Some(ConnectionCommand::Fail(e)) => {
                            warn!(error = %e, "Closing socket after fatal error");
                            let _ = ws_write.close().await;
                            break Err(e);
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break Ok(());
                        }

                        None => {
                            debug!("Command channel closed");
                            let _ = ws_write.close().await;
                            break Ok(());
                        }
                    }
                }
            }
        };

        debug!("Event loop terminated");
        outcome
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[test]
    fn test_websocket_url_switches_scheme() {
        let url = websocket_url(&Url::parse("http://printer.local:5000/").unwrap()).unwrap();
        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.port(), Some(5000));

        let url = websocket_url(&Url::parse("https://printer.example/").unwrap()).unwrap();
        assert_eq!(url.scheme(), "wss");
    }

    #[test]
    fn test_websocket_url_path_shape() {
        let base = Url::parse("http://printer.local/?x=1").unwrap();
        let url = websocket_url(&base).unwrap();

        let segments: Vec<_> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], "sockjs");
        assert_eq!(segments[1].len(), 3);
        assert!(segments[1].chars().all(|c| c.is_ascii_digit()));
        assert!(Uuid::parse_str(segments[2]).is_ok());
        assert_eq!(segments[3], "websocket");
        assert!(url.query().is_none());
    }

    #[test]
    fn test_websocket_url_is_fresh_per_call() {
        let base = Url::parse("http://printer.local/").unwrap();
        assert_ne!(websocket_url(&base).unwrap(), websocket_url(&base).unwrap());
    }

    #[test]
    fn test_websocket_url_rejects_other_schemes() {
        let base = Url::parse("ftp://printer.local/").unwrap();
        assert!(matches!(websocket_url(&base), Err(Error::Config { .. })));
    }

    async fn loopback() -> (TcpListener, Url) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/sockjs/000/x/websocket")).unwrap();
        (listener, url)
    }

    #[tokio::test]
    async fn test_frames_decode_in_order_and_sends_arrive() -> anyhow::Result<()> {
        let (listener, url) = loopback().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await?;
            let mut ws = accept_async(stream).await?;
            ws.send(Message::Text("o".into())).await?;
            ws.send(Message::Text(r#"a[{"connected":{}},{"history":{}}]"#.into()))
                .await?;
            ws.send(Message::Text("not a frame".into())).await?;
            ws.send(Message::Text(r#"m{"event":{"type":"PrintDone"}}"#.into()))
                .await?;

            match ws.next().await {
                Some(Ok(Message::Text(text))) => Ok(text.as_str().to_string()),
                other => Err(anyhow::anyhow!("unexpected {other:?}")),
            }
        });

        let (connection, mut events) = Connection::open(&url).await?;

        let mut kinds = Vec::new();
        for _ in 0..3 {
            kinds.push(events.recv().await.map(|e| e.kind));
        }
        assert_eq!(
            kinds,
            [
                Some("connected".to_string()),
                Some("history".to_string()),
                Some("event".to_string())
            ]
        );

        connection.send(r#"["{\"throttle\":10}"]"#)?;
        assert_eq!(server.await??, r#"["{\"throttle\":10}"]"#);

        connection.shutdown();
        connection.closed().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_close_is_connection_closed() {
        let (listener, url) = loopback().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let (connection, _events) = Connection::open(&url).await.unwrap();
        let err = connection.closed().await.unwrap_err();
        assert!(err.is_transport_error());
        assert!(connection.is_closed());
    }

    #[tokio::test]
    async fn test_fail_command_surfaces_error() {
        let (listener, url) = loopback().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            while ws.next().await.is_some() {}
        });

        let (connection, _events) = Connection::open(&url).await.unwrap();
        connection
            .sender()
            .send(ConnectionCommand::Fail(Error::auth("rejected")))
            .unwrap();

        assert!(connection.closed().await.unwrap_err().is_auth_error());
        assert!(connection.send("late").is_err());
    }
}
