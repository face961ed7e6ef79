//! Bridge lifecycle and shared context.
//!
//! The [`Bridge`] owns every long-lived component and wires them together:
//!
//! ```text
//! Connection ──events──► worker ──► Dispatcher ──► MessageComposer ──► ChatGateway
//!      ▲                                │
//!      └────────── control frames ──────┘
//! ```
//!
//! Events are handled one at a time on a worker task, in arrival order, so a
//! slow handler never stalls socket decoding.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::chat::ChatGateway;
use crate::compose::MessageComposer;
use crate::dispatch::{ConnectionState, Dispatcher};
use crate::error::Result;
use crate::identifiers::RoomId;
use crate::session::{Credentials, SessionManager};
use crate::transport::{Connection, ControllerApi, websocket_url};

use super::builder::BridgeBuilder;

// ============================================================================
// Types
// ============================================================================

/// Validated configuration handed over by the builder.
pub(crate) struct BridgeConfig {
    pub base_url: Url,
    pub credentials: Credentials,
    pub api: Arc<dyn ControllerApi>,
    pub gateway: Arc<dyn ChatGateway>,
    pub room: Option<RoomId>,
    pub poll_interval: Duration,
    pub throttle: u32,
    pub reconnect_delay: Duration,
}

/// Internal shared state for the bridge.
struct BridgeInner {
    /// Controller REST base URL.
    base_url: Url,

    /// Session owner.
    session: Arc<SessionManager>,

    /// Event routing context.
    dispatcher: Arc<Dispatcher>,

    /// Open socket, if any.
    connection: Mutex<Option<Arc<Connection>>>,

    /// Task feeding events to the dispatcher.
    worker: Mutex<Option<JoinHandle<()>>>,

    /// Delay between reconnect attempts.
    reconnect_delay: Duration,
}

// ============================================================================
// Bridge
// ============================================================================

/// Controller to chat bridge.
///
/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct Bridge {
    /// Shared inner state.
    inner: Arc<BridgeInner>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("base_url", &self.inner.base_url.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bridge - Public API
// ============================================================================

impl Bridge {
    /// Creates a configuration builder for the bridge.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Assembles the bridge from validated configuration.
    pub(crate) fn new(config: BridgeConfig) -> Self {
        let session = Arc::new(SessionManager::new(config.api, config.credentials));
        let composer = Arc::new(MessageComposer::new(config.gateway, config.room));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&session),
            composer,
            config.poll_interval,
            config.throttle,
        ));

        Self {
            inner: Arc::new(BridgeInner {
                base_url: config.base_url,
                session,
                dispatcher,
                connection: Mutex::new(None),
                worker: Mutex::new(None),
                reconnect_delay: config.reconnect_delay,
            }),
        }
    }

    /// Returns the controller base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.dispatcher.state()
    }

    /// Logs in, opens the socket and starts handling events.
    ///
    /// Does nothing if already connected. A socket the controller has
    /// dropped is cleared first.
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`](crate::Error::Auth) if the login is rejected
    /// - a transport error if the controller is unreachable
    pub async fn connect(&self) -> Result<()> {
        let live = self.inner.connection.lock().as_ref().map(|c| !c.is_closed());
        match live {
            Some(true) => {
                debug!("Already connected");
                return Ok(());
            }
            Some(false) => {
                if let Err(e) = self.closed().await {
                    debug!(error = %e, "Clearing dropped connection");
                }
            }
            None => {}
        }

        self.inner.dispatcher.set_state(ConnectionState::Connecting);
        info!(url = %self.inner.base_url, "Connecting to controller");

        if let Err(e) = self.open().await {
            self.inner.session.logout().await;
            self.inner.dispatcher.set_state(ConnectionState::Disconnected);
            return Err(e);
        }

        Ok(())
    }

    /// Waits until the socket closes and returns why.
    ///
    /// Returns `Ok(())` at once if not connected, or after a local
    /// [`disconnect`](Self::disconnect). Events received before the close
    /// are fully handled before this returns. Once the socket is gone the
    /// poll is cancelled, correlation state is dropped and the bridge
    /// reports [`ConnectionState::Disconnected`]. The session stays logged
    /// in until [`disconnect`](Self::disconnect).
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`](crate::Error::Auth) if reauthentication failed
    /// - a transport error if the controller dropped the socket
    pub async fn closed(&self) -> Result<()> {
        let connection = self.inner.connection.lock().clone();
        let Some(connection) = connection else {
            return Ok(());
        };

        let outcome = connection.closed().await;

        let worker = self.inner.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }

        let released = {
            let mut slot = self.inner.connection.lock();
            let current = slot.as_ref().is_some_and(|c| Arc::ptr_eq(c, &connection));
            if current {
                slot.take();
            }
            current
        };
        if released {
            self.inner.dispatcher.detach();
        }

        outcome
    }

    /// Closes the socket, cancels the poll, drops correlation state and
    /// logs out. Idempotent.
    pub async fn disconnect(&self) {
        let connection = self.inner.connection.lock().take();
        if let Some(connection) = connection {
            connection.shutdown();
            let _ = connection.closed().await;
        }

        let worker = self.inner.worker.lock().take();
        if let Some(worker) = worker {
            worker.abort();
        }

        self.inner.dispatcher.detach();
        self.inner.session.logout().await;
        info!("Disconnected from controller");
    }

    /// Keeps the bridge connected until a local disconnect or an auth
    /// failure.
    ///
    /// Transport failures are retried after the configured reconnect delay.
    ///
    /// # Errors
    ///
    /// Returns the first non-recoverable error, typically
    /// [`Error::Auth`](crate::Error::Auth).
    pub async fn run(&self) -> Result<()> {
        loop {
            let outcome = match self.connect().await {
                Ok(()) => {
                    let outcome = self.closed().await;
                    self.disconnect().await;
                    outcome
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => return Ok(()),
                Err(e) if e.is_recoverable() => {
                    warn!(
                        error = %e,
                        delay_ms = self.inner.reconnect_delay.as_millis() as u64,
                        "Controller connection lost, reconnecting"
                    );
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.inner.reconnect_delay).await;
        }
    }
}

// ============================================================================
// Bridge - Internal
// ============================================================================

impl Bridge {
    /// Logs in, opens the socket and spawns the event worker.
    async fn open(&self) -> Result<()> {
        self.inner.session.login().await?;

        let url = websocket_url(&self.inner.base_url)?;
        let (connection, mut events) = Connection::open(&url).await?;

        self.inner.dispatcher.attach(connection.sender());

        let dispatcher = Arc::clone(&self.inner.dispatcher);
        let worker = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                dispatcher.dispatch(event).await;
            }
            debug!("Event worker finished");
        });

        *self.inner.connection.lock() = Some(Arc::new(connection));
        *self.inner.worker.lock() = Some(worker);

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
