use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lab_session::TerminalSurface;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::termios::{self, SetArg, Termios};
use tokio::sync::mpsc;
use tracing::debug;

/// Terminal surface that writes straight to the controlling terminal.
/// Geometry is the terminal's own business, so `fit` has nothing to do.
pub struct StdoutSurface;

impl StdoutSurface {
    pub fn new() -> Self {
        Self
    }
}

impl TerminalSurface for StdoutSurface {
    fn write(&mut self, bytes: &[u8]) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }

    fn fit(&mut self, _rows: u16, _cols: u16) {}
}

/// Saves terminal settings on entry, switches to raw mode, restores on drop.
/// When stdin is not a terminal this is a no-op both ways.
pub struct RawModeGuard {
    saved: Option<Termios>,
}

impl RawModeGuard {
    pub fn enter() -> Self {
        let stdin = io::stdin();
        let saved = termios::tcgetattr(&stdin).ok();
        if let Some(saved) = &saved {
            let mut raw = saved.clone();
            termios::cfmakeraw(&mut raw);
            let _ = termios::tcsetattr(&stdin, SetArg::TCSANOW, &raw);
        }
        Self { saved }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Some(saved) = &self.saved {
            let stdin = io::stdin();
            let _ = termios::tcsetattr(&stdin, SetArg::TCSANOW, saved);
        }
    }
}

/// Current terminal size as (rows, cols), if stdout is a terminal.
pub fn window_size() -> Option<(u16, u16)> {
    let mut ws = nix::libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let ret = unsafe { nix::libc::ioctl(nix::libc::STDOUT_FILENO, nix::libc::TIOCGWINSZ, &mut ws) };
    (ret == 0).then_some((ws.ws_row, ws.ws_col))
}

/// Read stdin on a dedicated thread. Polls with a 100ms timeout so the
/// thread notices `shutdown` instead of blocking forever on a quiet
/// terminal.
pub fn spawn_stdin_reader(shutdown: Arc<AtomicBool>) -> mpsc::Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel::<Vec<u8>>(64);
    std::thread::spawn(move || {
        let stdin = io::stdin();
        let mut buf = [0u8; 4096];
        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            let mut fds = [PollFd::new(stdin.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(100u8)) {
                Ok(n) if n > 0 => {}
                _ => continue,
            }
            match stdin.lock().read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.blocking_send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        debug!("stdin reader stopped");
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_mode_guard_is_safe_without_a_terminal() {
        // Under a test runner stdin is a pipe; enter/drop must both no-op.
        let guard = RawModeGuard::enter();
        drop(guard);
    }

    #[test]
    fn stdout_surface_fit_is_side_effect_free() {
        let mut surface = StdoutSurface::new();
        surface.fit(24, 80);
        surface.fit(24, 80);
    }
}
