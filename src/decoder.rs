//! Incremental UTF-8 decoding of raw deliveries.
//!
//! The transport hands over bytes in arbitrarily sized chunks, so a
//! multi-byte character can straddle two deliveries. [`TextDecoder`] keeps
//! the incomplete tail of one delivery and prepends it to the next.

/// Stateful UTF-8 decoder owned by exactly one session.
///
/// Invalid sequences decode to U+FFFD instead of failing, which keeps a
/// single bad byte from tearing down a whole answer.
///
/// # Example
/// ```
/// use askstream::decoder::TextDecoder;
///
/// let mut decoder = TextDecoder::new();
/// let bytes = "héllo".as_bytes();
/// let mut text = decoder.decode(&bytes[..2]);
/// text.push_str(&decoder.decode(&bytes[2..]));
/// text.push_str(&decoder.finish());
/// assert_eq!(text, "héllo");
/// ```
#[derive(Debug, Default)]
pub struct TextDecoder {
    /// Leading bytes of a character whose remaining bytes have not arrived yet
    pending: Vec<u8>,
}

impl TextDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one delivery, carrying an incomplete trailing character over
    /// to the next call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let input = if self.pending.is_empty() {
            bytes.to_vec()
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(bytes);
            joined
        };

        let mut out = String::with_capacity(input.len());
        let mut rest = input.as_slice();

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
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + len..];
                        }
                        None => {
                            // Truncated sequence at the end of the delivery
                            self.pending = rest[valid..].to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush at end of input. A character that never completed becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }

    /// Number of bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passes_through() {
        let mut decoder = TextDecoder::new();
        assert_eq!(decoder.decode(b"hello\n"), "hello\n");
        assert_eq!(decoder.pending_len(), 0);
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_split_inside_multibyte_character() {
        // U+1F980 is four bytes long
        let bytes = "a🦀b".as_bytes();
        for split in 1..bytes.len() {
            let mut decoder = TextDecoder::new();
            let mut text = decoder.decode(&bytes[..split]);
            text.push_str(&decoder.decode(&bytes[split..]));
            text.push_str(&decoder.finish());
            assert_eq!(text, "a🦀b", "split at {}", split);
        }
    }

    #[test]
    fn test_one_byte_at_a_time() {
        let source = "日本語 ünïcödé";
        let mut decoder = TextDecoder::new();
        let mut text = String::new();
        for byte in source.as_bytes() {
            text.push_str(&decoder.decode(std::slice::from_ref(byte)));
        }
        text.push_str(&decoder.finish());
        assert_eq!(text, source);
    }

    #[test]
    fn test_invalid_byte_is_replaced() {
        let mut decoder = TextDecoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_truncated_character_flushed_on_finish() {
        let mut decoder = TextDecoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xE6, 0x97]), "x");
        assert_eq!(decoder.pending_len(), 2);
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.pending_len(), 0);
    }
}
