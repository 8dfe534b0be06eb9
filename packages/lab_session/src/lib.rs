//! Lab Session - terminal session bridge for remote lab shells
//!
//! This crate binds a terminal surface to a lab instance's WebSocket byte
//! stream and owns the connection's lifecycle: one connection per bridge,
//! lifecycle banners written into the surface, raw bytes forwarded verbatim
//! in both directions, and teardown on every exit path. It has no HTTP
//! dependencies and no knowledge of how instances are provisioned.
//!
//! # Example
//!
//! ```no_run
//! use lab_session::{Scrollback, SessionBridge};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (input_tx, input_rx) = mpsc::channel(64);
//!     let (_refit_tx, refit_rx) = mpsc::channel(8);
//!
//!     let mut bridge = SessionBridge::new(Scrollback::new(24, 80))
//!         .on_close(|code| println!("session closed with code {code}"));
//!
//!     let (ws, _) = tokio_tungstenite::connect_async("ws://127.0.0.1:8000/api/labs/ws/7")
//!         .await
//!         .unwrap();
//!
//!     input_tx.send(b"whoami\n".to_vec()).await.unwrap();
//!     let state = bridge.run(ws, input_rx, refit_rx).await;
//!     println!("session ended: {state}");
//! }
//! ```

mod banner;
mod bridge;
mod state;
mod surface;

pub use bridge::SessionBridge;
pub use state::SessionState;
pub use surface::{Scrollback, TerminalSurface};
