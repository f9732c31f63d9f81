//! Output buffer that accumulates decoded shell output for one command.
//!
//! Chunks arrive split at arbitrary byte positions, so a UTF-8 sequence
//! cut at the end of a chunk is held back until the rest arrives. Bytes
//! that can never decode are replaced, never fatal.

use std::fmt;

use memchr::memmem;

/// Decoded text for a single command execution.
///
/// Grows monotonically while reading, except for pager markers which are
/// cut out with [`strip_marker`](Self::strip_marker).
#[derive(Debug)]
pub struct OutputBuffer {
    /// Decoded output so far.
    text: String,

    /// Trailing bytes of an incomplete UTF-8 sequence.
    partial: Vec<u8>,

    /// Escape-sequence filter, when enabled.
    ansi: Option<AnsiStripper>,
}

impl OutputBuffer {
    /// Create an empty buffer that keeps output exactly as produced.
    pub fn new() -> Self {
        Self {
            text: String::with_capacity(4096),
            partial: Vec::new(),
            ansi: None,
        }
    }

    /// Create an empty buffer that drops ANSI escape sequences.
    pub fn with_ansi_stripping() -> Self {
        Self {
            ansi: Some(AnsiStripper::new()),
            ..Self::new()
        }
    }

    /// Decode a chunk and append it.
    pub fn extend(&mut self, data: &[u8]) {
        match self.ansi.as_mut() {
            Some(stripper) => stripper.feed(data, &mut self.text),
            None => self.decode(data),
        }
    }

    fn decode(&mut self, data: &[u8]) {
        let mut bytes = std::mem::take(&mut self.partial);
        bytes.extend_from_slice(data);

        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.text.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete sequence at the end of the chunk.
                            self.partial = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Remove every occurrence of `marker`, returning how many were removed.
    pub fn strip_marker(&mut self, marker: &str) -> usize {
        if marker.is_empty() {
            return 0;
        }
        let count = memmem::find_iter(self.text.as_bytes(), marker.as_bytes()).count();
        if count > 0 {
            self.text = self.text.replace(marker, "");
        }
        count
    }

    /// Check whether the decoded text ends with `suffix`.
    pub fn ends_with(&self, suffix: &str) -> bool {
        self.text.ends_with(suffix)
    }

    /// The last line of the buffer (text after the final line break).
    pub fn last_line(&self) -> &str {
        match self.text.rfind(['\n', '\r']) {
            Some(pos) => &self.text[pos + 1..],
            None => &self.text,
        }
    }

    /// Get the decoded text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Get the current text length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Consume the buffer, returning its text.
    pub fn into_string(self) -> String {
        self.text
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateful ANSI escape filter built on the `vte` parser.
///
/// The parser keeps its own UTF-8 and escape state between chunks.
struct AnsiStripper {
    parser: vte::Parser,
}

impl AnsiStripper {
    fn new() -> Self {
        Self {
            parser: vte::Parser::new(),
        }
    }

    fn feed(&mut self, data: &[u8], out: &mut String) {
        let mut printer = Printer { out };
        self.parser.advance(&mut printer, data);
    }
}

impl fmt::Debug for AnsiStripper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AnsiStripper")
    }
}

/// Collects printable text and line control characters.
struct Printer<'a> {
    out: &'a mut String,
}

impl vte::Perform for Printer<'_> {
    fn print(&mut self, c: char) {
        self.out.push(c);
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte as char);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_extend() {
        let mut buffer = OutputBuffer::new();
        buffer.extend(b"Hello, ");
        buffer.extend(b"world!");
        assert_eq!(buffer.as_str(), "Hello, world!");
    }

    #[test]
    fn test_split_utf8_sequence_is_carried() {
        let mut buffer = OutputBuffer::new();
        let bytes = "caf\u{e9}".as_bytes();
        buffer.extend(&bytes[..4]);
        assert_eq!(buffer.as_str(), "caf");
        buffer.extend(&bytes[4..]);
        assert_eq!(buffer.as_str(), "caf\u{e9}");
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut buffer = OutputBuffer::new();
        buffer.extend(b"ok\xff\xfeok");
        assert_eq!(buffer.as_str(), "ok\u{fffd}\u{fffd}ok");
    }

    #[test]
    fn test_strip_marker_removes_all() {
        let mut buffer = OutputBuffer::new();
        buffer.extend(b"a-- more --b-- more --c");
        assert_eq!(buffer.strip_marker("-- more --"), 2);
        assert_eq!(buffer.as_str(), "abc");
        assert_eq!(buffer.strip_marker("-- more --"), 0);
    }

    #[test]
    fn test_marker_split_across_chunks() {
        let mut buffer = OutputBuffer::new();
        buffer.extend(b"line\r\n-- mo");
        assert_eq!(buffer.strip_marker("-- more --"), 0);
        buffer.extend(b"re --");
        assert_eq!(buffer.strip_marker("-- more --"), 1);
        assert_eq!(buffer.as_str(), "line\r\n");
    }

    #[test]
    fn test_prompt_suffix_is_exact() {
        let mut buffer = OutputBuffer::new();
        buffer.extend(b"[admin@MikroTik] >");
        assert!(!buffer.ends_with("> "));
        buffer.extend(b" ");
        assert!(buffer.ends_with("> "));
    }

    #[test]
    fn test_last_line() {
        let mut buffer = OutputBuffer::new();
        buffer.extend(b"output\r\n[admin@MikroTik] > ");
        assert_eq!(buffer.last_line(), "[admin@MikroTik] > ");
    }

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = OutputBuffer::with_ansi_stripping();
        buffer.extend(b"\x1b[32mGreen\x1b[0m text\r\n[admin@MikroTik] > ");
        assert_eq!(buffer.as_str(), "Green text\r\n[admin@MikroTik] > ");
    }

    #[test]
    fn test_ansi_sequence_split_across_chunks() {
        let mut buffer = OutputBuffer::with_ansi_stripping();
        buffer.extend(b"a\x1b[3");
        buffer.extend(b"2mb");
        assert_eq!(buffer.as_str(), "ab");
    }
}
