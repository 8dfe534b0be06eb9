use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::debug;

use crate::banner;
use crate::state::SessionState;
use crate::surface::TerminalSurface;

/// Everything that can happen to a session, from either side.
///
/// All of it funnels through [`SessionBridge::on_event`], so banner writing,
/// state transitions, and the close notification live in exactly one place
/// and cannot be skipped on any path.
enum BridgeEvent {
    /// The connection handshake completed.
    Opened,
    /// A remote payload arrived.
    Output(Vec<u8>),
    /// Local input bytes were captured.
    Input(Vec<u8>),
    /// Local geometry changed.
    Refit(u16, u16),
    /// The remote side closed the connection.
    RemoteClosed(u16),
    /// The transport failed.
    TransportError(String),
}

/// Binds a terminal surface to one lab instance's WebSocket byte stream.
///
/// A bridge owns at most one connection over its whole life:
/// `Unopened -> Open -> Closed(code) | Errored`, each terminal state
/// reachable only once. A new session handle means a new bridge.
pub struct SessionBridge<S: TerminalSurface> {
    surface: S,
    state: SessionState,
    on_close: Option<Box<dyn FnOnce(u16) + Send>>,
}

impl<S: TerminalSurface> SessionBridge<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            state: SessionState::Unopened,
            on_close: None,
        }
    }

    /// Register a notification fired exactly once, when the remote side
    /// closes the session. Not fired on transport errors or local teardown.
    pub fn on_close(mut self, notify: impl FnOnce(u16) + Send + 'static) -> Self {
        self.on_close = Some(Box::new(notify));
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mark the session as failed before it ever opened (endpoint
    /// unreachable, handshake rejected). Writes the error banner; the
    /// surface stays usable but permanently non-interactive.
    pub fn fail_open(&mut self, reason: &str) {
        self.on_event(BridgeEvent::TransportError(reason.to_string()));
    }

    /// Apply one event. Returns bytes to forward to the remote, if any.
    fn on_event(&mut self, event: BridgeEvent) -> Option<Vec<u8>> {
        match event {
            BridgeEvent::Opened => {
                if matches!(self.state, SessionState::Unopened) {
                    self.surface.write(banner::CONNECTED);
                    self.state = SessionState::Open;
                }
                None
            }
            BridgeEvent::Output(bytes) => {
                if self.state.is_open() {
                    self.surface.write(&bytes);
                }
                None
            }
            // Input is forwarded only while open; otherwise dropped, not queued.
            BridgeEvent::Input(bytes) => self.state.is_open().then_some(bytes),
            BridgeEvent::Refit(rows, cols) => {
                self.surface.fit(rows, cols);
                None
            }
            BridgeEvent::RemoteClosed(code) => {
                if !self.state.is_terminal() {
                    self.surface.write(&banner::disconnected(code));
                    self.state = SessionState::Closed(code);
                    if let Some(notify) = self.on_close.take() {
                        notify(code);
                    }
                }
                None
            }
            BridgeEvent::TransportError(reason) => {
                if !self.state.is_terminal() {
                    self.surface.write(&banner::error(&reason));
                    self.state = SessionState::Errored(reason);
                }
                None
            }
        }
    }

    /// Drive a connected transport until the session ends.
    ///
    /// Returns when the remote closes, the transport errors, or the `input`
    /// channel is closed (local teardown). Whichever way the loop ends, the
    /// transport is closed before returning; dropping the returned future
    /// mid-flight drops the transport and with it the socket.
    pub async fn run<T>(
        &mut self,
        mut transport: T,
        mut input: mpsc::Receiver<Vec<u8>>,
        mut refit: mpsc::Receiver<(u16, u16)>,
    ) -> SessionState
    where
        T: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
    {
        self.on_event(BridgeEvent::Opened);
        let mut refit_live = true;

        loop {
            tokio::select! {
                msg = transport.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        self.on_event(BridgeEvent::Output(text.as_bytes().to_vec()));
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        self.on_event(BridgeEvent::Output(bytes.to_vec()));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        // 1005: the close frame carried no status code.
                        let code = frame.map(|f| u16::from(f.code)).unwrap_or(1005);
                        self.on_event(BridgeEvent::RemoteClosed(code));
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        self.on_event(BridgeEvent::TransportError(err.to_string()));
                        break;
                    }
                    // Stream ended without a close handshake.
                    None => {
                        self.on_event(BridgeEvent::RemoteClosed(1006));
                        break;
                    }
                },
                data = input.recv() => match data {
                    Some(bytes) => {
                        if let Some(out) = self.on_event(BridgeEvent::Input(bytes)) {
                            let text = String::from_utf8_lossy(&out).into_owned();
                            if let Err(err) = transport.send(Message::Text(text.into())).await {
                                self.on_event(BridgeEvent::TransportError(err.to_string()));
                                break;
                            }
                        }
                    }
                    // The caller hung up: local teardown.
                    None => break,
                },
                geometry = refit.recv(), if refit_live => match geometry {
                    Some((rows, cols)) => {
                        self.on_event(BridgeEvent::Refit(rows, cols));
                    }
                    None => refit_live = false,
                },
            }
        }

        // Single teardown path, no matter how the loop ended.
        let _ = transport.close().await;
        debug!(state = %self.state, "session bridge ended");
        self.state.clone()
    }
}
