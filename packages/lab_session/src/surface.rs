use tracing::trace;

/// Where bridge output lands: the seam between the session bridge and
/// whatever is rendering the terminal.
///
/// The bridge appends remote payloads and lifecycle banners through `write`
/// and forwards local geometry changes through `fit`. Implementations own
/// their buffer exclusively; nothing is shared across bridges.
pub trait TerminalSurface: Send {
    /// Append raw bytes to the buffer, verbatim and in call order. Payloads
    /// may be partial lines and may contain ANSI escape sequences.
    fn write(&mut self, bytes: &[u8]);

    /// Recompute geometry for the given dimensions. Idempotent, with no
    /// effect beyond the row/column change.
    fn fit(&mut self, rows: u16, cols: u16);
}

/// In-memory terminal surface backed by a `vt100` screen.
///
/// Keeps two views of the session: the rendered screen (cursor movement and
/// escape sequences applied) and the verbatim byte log in arrival order.
pub struct Scrollback {
    parser: vt100::Parser,
    raw: Vec<u8>,
}

impl Scrollback {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            parser: vt100::Parser::new(rows, cols, 0),
            raw: Vec::new(),
        }
    }

    /// Every byte ever written, in arrival order.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The rendered screen contents, escape sequences applied.
    pub fn contents(&self) -> String {
        self.parser.screen().contents()
    }

    /// Current (rows, cols).
    pub fn size(&self) -> (u16, u16) {
        self.parser.screen().size()
    }
}

impl TerminalSurface for Scrollback {
    fn write(&mut self, bytes: &[u8]) {
        self.parser.process(bytes);
        self.raw.extend_from_slice(bytes);
    }

    fn fit(&mut self, rows: u16, cols: u16) {
        trace!(rows, cols, "refit scrollback");
        self.parser.set_size(rows, cols);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_renders_through_vt100() {
        let mut sb = Scrollback::new(24, 80);
        sb.write(b"hello \x1b[32mlab\x1b[0m");
        assert_eq!(sb.contents(), "hello lab");
    }

    #[test]
    fn raw_log_keeps_escapes_and_order() {
        let mut sb = Scrollback::new(24, 80);
        sb.write(b"a\x1b[31m");
        sb.write(b"b");
        sb.write(b"c");
        assert_eq!(sb.raw(), b"a\x1b[31mbc");
    }

    #[test]
    fn partial_lines_append_without_reordering() {
        let mut sb = Scrollback::new(24, 80);
        sb.write(b"$ nm");
        sb.write(b"ap -sV");
        assert_eq!(sb.contents(), "$ nmap -sV");
    }

    #[test]
    fn fit_changes_dimensions_and_is_idempotent() {
        let mut sb = Scrollback::new(24, 80);
        sb.fit(40, 120);
        assert_eq!(sb.size(), (40, 120));
        sb.fit(40, 120);
        assert_eq!(sb.size(), (40, 120));
    }
}
