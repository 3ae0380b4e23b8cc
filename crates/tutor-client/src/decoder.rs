//! Incremental text decoding and line framing for a chunked byte stream.
//!
//! Network chunks may end in the middle of a UTF-8 sequence or in the middle
//! of a line. [`LineDecoder`] carries both kinds of remainder over to the
//! next chunk so callers only ever see whole lines of correctly decoded text.

use std::char::REPLACEMENT_CHARACTER;

#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Bytes of a UTF-8 sequence cut off at the end of the previous chunk.
    pending_bytes: Vec<u8>,
    /// Decoded text after the last newline seen so far.
    partial_line: String,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every line it completed, without the line
    /// terminator. Both `\n` and `\r\n` endings are accepted.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode(chunk);
        self.partial_line.push_str(&text);

        let Some(last_newline) = self.partial_line.rfind('\n') else {
            return Vec::new();
        };
        let rest = self.partial_line.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial_line, rest);

        complete[..last_newline]
            .split('\n')
            .map(|line| strip_cr(line).to_owned())
            .collect()
    }

    /// Flush whatever is left once the stream has closed.
    ///
    /// A dangling partial UTF-8 sequence becomes U+FFFD.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending_bytes.is_empty() {
            self.pending_bytes.clear();
            self.partial_line.push(REPLACEMENT_CHARACTER);
        }
        let line = std::mem::take(&mut self.partial_line);
        let line = strip_cr(&line);
        (!line.is_empty()).then(|| line.to_owned())
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending_bytes);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut input = bytes.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        // Invalid sequence: substitute and keep going.
                        Some(len) => {
                            out.push(REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        // Truncated sequence: wait for the next chunk.
                        None => {
                            self.pending_bytes = rest.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}
