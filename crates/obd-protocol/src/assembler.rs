//! Response Assembler
//!
//! Accumulates transport chunks until the adapter prompt arrives.

use tracing::{debug, warn};

/// Prompt printed by the adapter when it is ready for the next command
pub const PROMPT: char = '>';

/// One complete adapter response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Everything received for the exchange, prompt included
    pub raw: String,
    /// `raw` with CR removed, LF as space, prompt removed, trimmed
    pub cleaned: String,
}

impl Response {
    fn new(raw: String) -> Self {
        let cleaned = clean_response(&raw);
        Self { raw, cleaned }
    }
}

/// Buffers chunks of one exchange
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    buffer: String,
}

impl ResponseAssembler {
    /// Create an empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk; returns the response once the prompt has been seen.
    ///
    /// Bytes outside ASCII are line noise and are skipped; the rest of the
    /// chunk, prompt included, is kept.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<Response> {
        let noise = push_ascii(&mut self.buffer, chunk);
        if noise > 0 {
            warn!("Skipped {} non-ASCII bytes in a {} byte chunk", noise, chunk.len());
        }
        debug!("Buffered {} bytes", self.buffer.len());

        if !self.buffer.contains(PROMPT) {
            return None;
        }

        Some(Response::new(std::mem::take(&mut self.buffer)))
    }

    /// Discard any partial response
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Bytes buffered for the current exchange
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Append the ASCII bytes of `chunk`; returns how many were skipped
fn push_ascii(buffer: &mut String, chunk: &[u8]) -> usize {
    let before = buffer.len();
    buffer.extend(chunk.iter().filter(|b| b.is_ascii()).map(|&b| char::from(b)));
    chunk.len() - (buffer.len() - before)
}

/// Normalize a raw response for parsing
pub fn clean_response(raw: &str) -> String {
    raw.replace('\r', "")
        .replace('\n', " ")
        .replace(PROMPT, "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chunk() {
        let mut assembler = ResponseAssembler::new();
        let response = assembler.feed(b"7E803410D32\r\r>").unwrap();
        assert_eq!(response.raw, "7E803410D32\r\r>");
        assert_eq!(response.cleaned, "7E803410D32");
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_split_chunks() {
        let mut assembler = ResponseAssembler::new();
        assert!(assembler.feed(b"ELM32").is_none());
        assert!(assembler.feed(b"7 v1.5\r").is_none());
        let response = assembler.feed(b"\r>").unwrap();
        assert_eq!(response.cleaned, "ELM327 v1.5");
    }

    #[test]
    fn test_buffer_cleared_after_prompt() {
        let mut assembler = ResponseAssembler::new();
        assembler.feed(b"OK\r\r>").unwrap();
        let next = assembler.feed(b"6\r\r>").unwrap();
        assert_eq!(next.cleaned, "6");
    }

    #[test]
    fn test_noise_bytes_skipped() {
        let mut assembler = ResponseAssembler::new();
        assert!(assembler.feed(b"OK").is_none());
        assert!(assembler.feed(&[0xFF, 0xFE]).is_none());
        assert_eq!(assembler.feed(b">").unwrap().cleaned, "OK");
    }

    #[test]
    fn test_prompt_survives_noise_in_same_chunk() {
        let mut assembler = ResponseAssembler::new();
        let response = assembler.feed(b"OK\r\xff>").unwrap();
        assert_eq!(response.raw, "OK\r>");
        assert_eq!(response.cleaned, "OK");
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_clean_response() {
        assert_eq!(clean_response("\r\n41 0D\n32 \r>"), "41 0D 32");
        assert_eq!(clean_response(">"), "");
    }

    #[test]
    fn test_reset_discards_partial() {
        let mut assembler = ResponseAssembler::new();
        assembler.feed(b"7E80341");
        assembler.reset();
        assert_eq!(assembler.feed(b"OK>").unwrap().cleaned, "OK");
    }
}
