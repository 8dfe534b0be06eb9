//! Status lines written into the terminal buffer on lifecycle transitions.
//! Every transition produces one; nothing about connection health is silent.

pub(crate) const CONNECTED: &[u8] = b"\r\n\x1b[32m[+] Connected to lab environment\x1b[0m\r\n";

pub(crate) fn disconnected(code: u16) -> Vec<u8> {
    format!("\r\n\x1b[31m[-] Disconnected (code {code})\x1b[0m\r\n").into_bytes()
}

pub(crate) fn error(reason: &str) -> Vec<u8> {
    format!("\r\n\x1b[31m[!] Connection error: {reason}\x1b[0m\r\n").into_bytes()
}
