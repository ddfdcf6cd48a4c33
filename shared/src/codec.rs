//! Newline-delimited message framing.
//!
//! Sockets hand us arbitrary byte chunks; a single read may carry half
//! a message or several at once. [`LineFramer`] buffers bytes across
//! reads and yields complete messages in arrival order, never dropping
//! a complete message and never merging two.

use std::fmt::Display;

/// Accumulates raw socket bytes and splits out complete
/// newline-terminated messages.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a freshly read chunk to the internal buffer.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pops the next complete message, without its terminator, or
    /// `None` if only a partial message is buffered. A trailing `\r`
    /// is stripped so telnet-style clients work too.
    pub fn next_message(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop(); // the newline itself
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}

/// Serializes one outbound message, appending the single trailing
/// newline the protocol requires.
pub fn frame(message: &impl Display) -> String {
    format!("{}\n", message)
}
