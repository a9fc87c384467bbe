//! Newline-delimited JSON framing.
//!
//! Streaming endpoints send one serialized record per line. Chunks coming off
//! the wire do not respect line boundaries, so `LineDecoder` buffers partial
//! lines until their newline arrives.

use serde::Serialize;

/// Splits a byte stream into complete, non-blank lines
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and take every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            if let Some(line) = trimmed(&line[..end]) {
                lines.push(line.to_vec());
            }
        }
        lines
    }

    /// Whatever is left once the stream ends without a final newline
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.pending);
        trimmed(&rest).map(<[u8]>::to_vec)
    }
}

fn trimmed(line: &[u8]) -> Option<&[u8]> {
    let line = line.trim_ascii();
    (!line.is_empty()).then_some(line)
}

/// Serialize one record as a line of NDJSON
pub fn encode_line<T: Serialize>(record: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    Ok(line)
}
