//! Incremental line framing for streamed response bodies
//!
//! Bytes arrive in arbitrary chunks; a line is only handed out once its
//! terminating `\n` has been received (or the body has ended). The buffer
//! holds at most one partial line, bounded by `max_line_size`.

use crate::errors::{ClientError, Result};

/// Maximum size of a single pending line (1MB)
pub const MAX_LINE_SIZE: usize = 1_048_576;

/// Incremental line splitter
#[derive(Debug)]
pub struct LineParser {
    /// Accumulation buffer
    buffer: Vec<u8>,

    /// Maximum size of the unterminated tail of the buffer
    max_line_size: usize,
}

impl LineParser {
    /// Create new parser with default limits
    pub fn new() -> Self {
        Self::with_capacity(MAX_LINE_SIZE)
    }

    /// Create parser with custom line size limit
    pub fn with_capacity(max_line_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_line_size,
        }
    }

    /// Append a chunk of bytes
    ///
    /// Fails when the unterminated tail grows past the line size limit.
    pub fn add_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(bytes);

        let pending = match self.buffer.iter().rposition(|&b| b == b'\n') {
            Some(pos) => self.buffer.len() - pos - 1,
            None => self.buffer.len(),
        };

        if pending > self.max_line_size {
            let err = ClientError::DecodeFailed {
                reason: format!(
                    "line exceeds maximum size: {} bytes > {} bytes",
                    pending, self.max_line_size
                ),
                snippet: crate::errors::snippet(&String::from_utf8_lossy(
                    &self.buffer[..self.buffer.len().min(64)],
                )),
            };
            self.clear();
            return Err(err);
        }

        Ok(())
    }

    /// Take the next complete, non-blank line without its terminator
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if !is_blank(&line) {
                return Some(line);
            }
        }
        None
    }

    /// Take whatever remains once the body has ended
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if let Some(line) = self.next_line() {
            return Some(line);
        }
        let rest = std::mem::take(&mut self.buffer);
        if is_blank(&rest) {
            None
        } else {
            Some(rest)
        }
    }

    /// Get current buffer size
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| b.is_ascii_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let mut parser = LineParser::new();
        parser.add_bytes(b"{\"status\":\"success\"}\n").unwrap();

        assert_eq!(parser.next_line().unwrap(), b"{\"status\":\"success\"}");
        assert!(parser.next_line().is_none());
        assert!(parser.is_empty());
    }

    #[test]
    fn test_incremental_line() {
        let mut parser = LineParser::new();

        parser.add_bytes(br#"{"status":"#).unwrap();
        assert!(parser.next_line().is_none());

        parser.add_bytes(br#" "pulling manifest"}"#).unwrap();
        assert!(parser.next_line().is_none());

        parser.add_bytes(b"\n").unwrap();
        assert_eq!(
            parser.next_line().unwrap(),
            br#"{"status": "pulling manifest"}"#
        );
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut parser = LineParser::new();
        parser.add_bytes(b"{\"a\":1}\n{\"b\":2}\n{\"c\"").unwrap();

        assert_eq!(parser.next_line().unwrap(), b"{\"a\":1}");
        assert_eq!(parser.next_line().unwrap(), b"{\"b\":2}");
        assert!(parser.next_line().is_none());
        assert_eq!(parser.buffer_size(), 4);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let mut parser = LineParser::new();
        parser.add_bytes(b"\r\n  \n{\"a\":1}\r\n\n").unwrap();

        assert_eq!(parser.next_line().unwrap(), b"{\"a\":1}");
        assert!(parser.next_line().is_none());
    }

    #[test]
    fn test_finish_returns_unterminated_tail() {
        let mut parser = LineParser::new();
        parser.add_bytes(b"{\"a\":1}\n{\"status\":\"success\"}").unwrap();

        assert_eq!(parser.next_line().unwrap(), b"{\"a\":1}");
        assert_eq!(parser.finish().unwrap(), b"{\"status\":\"success\"}");
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_finish_ignores_whitespace() {
        let mut parser = LineParser::new();
        parser.add_bytes(b"   \n  ").unwrap();
        assert!(parser.finish().is_none());
    }

    #[test]
    fn test_line_overflow() {
        let mut parser = LineParser::with_capacity(100);

        let result = parser.add_bytes(&vec![b'a'; 150]);

        assert!(matches!(result, Err(ClientError::DecodeFailed { .. })));
        assert!(parser.is_empty());
    }

    #[test]
    fn test_long_body_of_short_lines_is_fine() {
        let mut parser = LineParser::with_capacity(16);
        let body = "{\"n\":1}\n".repeat(100);

        assert!(parser.add_bytes(body.as_bytes()).is_ok());
        let mut count = 0;
        while parser.next_line().is_some() {
            count += 1;
        }
        assert_eq!(count, 100);
    }
}
