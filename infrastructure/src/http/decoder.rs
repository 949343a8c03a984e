//! Incremental UTF-8 decoding of a byte stream.
//!
//! Network chunk boundaries do not respect character boundaries: a multi-byte
//! character may arrive split over two reads. The decoder holds back an
//! incomplete trailing sequence until the rest of it arrives.

use parley_application::ports::query_client::QueryError;

/// Decoder state carried between chunks of one response body.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
    offset: usize,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next byte range, returning all text that is now complete.
    ///
    /// The result may be empty when `bytes` only continues an unfinished
    /// character. Invalid sequences are a [`QueryError::Decode`].
    pub fn decode(&mut self, bytes: &[u8]) -> Result<String, QueryError> {
        self.pending.extend_from_slice(bytes);

        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                return Err(QueryError::Decode(format!(
                    "invalid UTF-8 sequence at byte {}",
                    self.offset + e.valid_up_to()
                )));
            }
        };

        let text = std::str::from_utf8(&self.pending[..valid])
            .map_err(|e| QueryError::Decode(e.to_string()))?
            .to_string();
        self.pending.drain(..valid);
        self.offset += valid;
        Ok(text)
    }

    /// Bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Check that the body did not end inside a character.
    pub fn finish(&self) -> Result<(), QueryError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(QueryError::Decode(format!(
                "response ended inside a UTF-8 sequence ({} trailing bytes)",
                self.pending.len()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passes_through() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"Hi there").unwrap(), "Hi there");
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_character_split_across_chunks() {
        // "é" is 0xC3 0xA9
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"caf\xC3").unwrap(), "caf");
        assert_eq!(decoder.pending_len(), 1);
        assert_eq!(decoder.decode(b"\xA9 noir").unwrap(), "é noir");
        assert_eq!(decoder.pending_len(), 0);
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_four_byte_character_one_byte_at_a_time() {
        let bytes = "🤖".as_bytes();
        let mut decoder = Utf8StreamDecoder::new();
        let mut out = String::new();
        for b in bytes {
            out.push_str(&decoder.decode(std::slice::from_ref(b)).unwrap());
        }
        assert_eq!(out, "🤖");
    }

    #[test]
    fn test_invalid_sequence_is_decode_error() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"ok").unwrap(), "ok");
        let err = decoder.decode(b"\xFF").unwrap_err();
        assert_eq!(
            err,
            QueryError::Decode("invalid UTF-8 sequence at byte 2".to_string())
        );
    }

    #[test]
    fn test_truncated_tail_fails_on_finish() {
        let mut decoder = Utf8StreamDecoder::new();
        assert_eq!(decoder.decode(b"a\xE2\x82").unwrap(), "a");
        assert!(matches!(decoder.finish(), Err(QueryError::Decode(_))));
    }
}
