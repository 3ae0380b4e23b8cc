use tracing::debug;
use tutor_types::{ChatChunk, DATA_PREFIX, DONE_SENTINEL};

/// One decoded SSE data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// The producer's `[DONE]` sentinel.
    Done,
    /// A chunk envelope and its first delta, if it carried one.
    Delta(Option<String>),
}

impl StreamFrame {
    /// Parse a complete line.
    ///
    /// Returns `None` for lines that are not `data: ` lines and for data
    /// lines whose payload is not a decodable chunk; both are skipped.
    pub fn parse(line: &str) -> Option<Self> {
        let payload = line.strip_prefix(DATA_PREFIX)?.trim();
        if payload == DONE_SENTINEL {
            return Some(Self::Done);
        }
        match serde_json::from_str::<ChatChunk>(payload) {
            Ok(chunk) => Some(Self::Delta(chunk.first_delta().map(str::to_owned))),
            Err(e) => {
                debug!(error = %e, "skipping undecodable stream frame");
                None
            }
        }
    }
}
