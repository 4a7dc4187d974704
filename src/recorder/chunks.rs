//! Encoded chunk buffer

/// Append-only list of encoded chunks, joined once at the end
#[derive(Debug, Default, Clone)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
    byte_len: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Empty chunks are dropped.
    pub fn push(&mut self, chunk: Vec<u8>) -> bool {
        if chunk.is_empty() {
            return false;
        }
        self.byte_len += chunk.len();
        self.chunks.push(chunk);
        true
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total bytes across all chunks
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Concatenate every chunk in arrival order
    pub fn concat(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.byte_len = 0;
    }
}
