use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::debug;

use lab_session::{SessionBridge, SessionState};

use crate::api::ApiClient;
use crate::tty::{self, RawModeGuard, StdoutSurface};

const DETACH_BYTE: u8 = 0x1D; // Ctrl-]

/// What happened when an attach session ended.
pub enum AttachOutcome {
    /// User pressed Ctrl-] or stdin closed; the instance keeps running.
    Detached,
    /// The remote side closed the session with the given code.
    Closed(u16),
    /// The transport failed, before or during the session.
    Errored,
}

/// Attach the local terminal to a running instance's shell.
///
/// Connection failures come back as `Errored` with a banner already written
/// to the terminal, never as `Err` - the command keeps its prompt-friendly
/// exit either way.
pub async fn attach(api: &ApiClient, instance_id: u64) -> Result<AttachOutcome> {
    let url = api.server().ws_url(instance_id);
    debug!(%url, instance_id, "opening lab session");

    let mut bridge = SessionBridge::new(StdoutSurface::new())
        .on_close(|code| debug!(code, "remote closed the session"));

    let ws = match tokio_tungstenite::connect_async(&url).await {
        Ok((ws, _)) => ws,
        Err(err) => {
            bridge.fail_open(&err.to_string());
            return Ok(AttachOutcome::Errored);
        }
    };

    let (input_tx, input_rx) = mpsc::channel::<Vec<u8>>(64);
    let (refit_tx, refit_rx) = mpsc::channel::<(u16, u16)>(8);

    let guard = RawModeGuard::enter();
    let shutdown = Arc::new(AtomicBool::new(false));
    let stdin_rx = tty::spawn_stdin_reader(shutdown.clone());

    let forwarder = tokio::spawn(forward_local(stdin_rx, input_tx, refit_tx));

    let state = bridge.run(ws, input_rx, refit_rx).await;

    shutdown.store(true, Ordering::Relaxed);
    forwarder.abort();
    drop(guard);

    Ok(match state {
        SessionState::Open | SessionState::Unopened => AttachOutcome::Detached,
        SessionState::Closed(code) => AttachOutcome::Closed(code),
        SessionState::Errored(_) => AttachOutcome::Errored,
    })
}

/// Forward local input and window-size changes into the bridge. Ends on
/// Ctrl-], stdin EOF, or when the bridge stops taking input; dropping the
/// senders is the bridge's teardown signal.
async fn forward_local(
    mut stdin_rx: mpsc::Receiver<Vec<u8>>,
    input_tx: mpsc::Sender<Vec<u8>>,
    refit_tx: mpsc::Sender<(u16, u16)>,
) {
    let mut sigwinch =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::window_change()).ok();

    // Fit once on entry, then again on every window change.
    if let Some((rows, cols)) = tty::window_size() {
        let _ = refit_tx.send((rows, cols)).await;
    }

    loop {
        tokio::select! {
            chunk = stdin_rx.recv() => match chunk {
                Some(data) => {
                    if let Some(pos) = data.iter().position(|&b| b == DETACH_BYTE) {
                        // Send everything before the detach byte, then hang up.
                        if pos > 0 {
                            let _ = input_tx.send(data[..pos].to_vec()).await;
                        }
                        break;
                    }
                    if input_tx.send(data).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = async {
                match sigwinch.as_mut() {
                    Some(signal) => { signal.recv().await; }
                    None => std::future::pending().await,
                }
            } => {
                if let Some((rows, cols)) = tty::window_size() {
                    if refit_tx.send((rows, cols)).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}
