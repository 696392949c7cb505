//! Incremental UTF-8 decoding across chunk boundaries.

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Stream-mode UTF-8 decoder.
///
/// Bytes of a multi-byte character cut off at the end of a chunk are held
/// back and completed by the next chunk. Invalid sequences decode to U+FFFD
/// instead of failing the stream. A byte order mark at the very start of the
/// stream is dropped, even when it arrives split across chunks.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
    started: bool,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, keeping any trailing incomplete sequence for later.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        if !self.started {
            if bytes.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(&bytes) {
                self.pending = bytes;
                return String::new();
            }
            self.started = true;
            if bytes.starts_with(&UTF8_BOM) {
                bytes.drain(..UTF8_BOM.len());
            }
        }

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));

                    match err.error_len() {
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.pending = rest[valid..].to_vec();
                            break;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + len..];
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush at end of input. A dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Whether bytes are being held back for an unfinished character.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_byte_char_split() {
        let bytes = "sambal é".as_bytes();
        let (head, tail) = bytes.split_at(bytes.len() - 1);

        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(head), "sambal ");
        assert!(decoder.has_pending());
        assert_eq!(decoder.decode(tail), "é");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_four_byte_char_every_split() {
        let bytes = "🍲".as_bytes();
        for cut in 1..bytes.len() {
            let mut decoder = Utf8Decoder::new();
            let mut text = decoder.decode(&bytes[..cut]);
            text.push_str(&decoder.decode(&bytes[cut..]));
            text.push_str(&decoder.finish());
            assert_eq!(text, "🍲", "cut at {}", cut);
        }
    }

    #[test]
    fn test_byte_by_byte() {
        let source = "nasi goreng 🍳 enak";
        let mut decoder = Utf8Decoder::new();
        let text: String = source
            .as_bytes()
            .iter()
            .map(|b| decoder.decode(std::slice::from_ref(b)))
            .collect();
        assert_eq!(text, source);
    }

    #[test]
    fn test_leading_bom_dropped() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"\xEF\xBB\xBFdata: x"), "data: x");
        assert_eq!(decoder.decode(b"\xEF\xBB\xBF"), "\u{FEFF}");
    }

    #[test]
    fn test_leading_bom_split_across_chunks() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b""), "");
        assert_eq!(decoder.decode(b"\xEF"), "");
        assert_eq!(decoder.decode(b"\xBB"), "");
        assert_eq!(decoder.decode(b"\xBFok"), "ok");
    }

    #[test]
    fn test_invalid_byte_replaced() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xFFb"), "a\u{FFFD}b");
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_truncated_sequence_at_end() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xF0, 0x9F]), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }
}
