//! Fixed-size-chunk storage, the building block behind the registries (§4.A) and the
//! command/usage streams (§4.C).
//!
//! Each chunk is a `Vec<T>` capped at `chunk_size`; once full, a new chunk is allocated.
//! Addressing an element by `(chunk_index, index_in_chunk)` gives a stable logical
//! address that survives later appends (new chunks never move existing ones), which is
//! the property the bit-packed handle's `chunk_coordinates` split relies on.

/// An append-only sequence of fixed-capacity chunks.
pub struct ChunkedBuffer<T> {
    chunk_size: usize,
    chunks: Vec<Vec<T>>,
}

impl<T> ChunkedBuffer<T> {
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        ChunkedBuffer {
            chunk_size,
            chunks: Vec::new(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn len(&self) -> usize {
        let full = self.chunks.len().saturating_sub(1) * self.chunk_size;
        full + self.chunks.last().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a value, returning its `(chunk_index, index_in_chunk)` address.
    pub fn push(&mut self, value: T) -> (u32, u32) {
        if self.chunks.is_empty() || self.chunks.last().unwrap().len() == self.chunk_size {
            self.chunks.push(Vec::with_capacity(self.chunk_size));
        }
        let chunk_index = self.chunks.len() - 1;
        let chunk = self.chunks.last_mut().unwrap();
        let index_in_chunk = chunk.len();
        chunk.push(value);
        (chunk_index as u32, index_in_chunk as u32)
    }

    pub fn get(&self, chunk_index: u32, index_in_chunk: u32) -> Option<&T> {
        self.chunks
            .get(chunk_index as usize)
            .and_then(|c| c.get(index_in_chunk as usize))
    }

    pub fn get_mut(&mut self, chunk_index: u32, index_in_chunk: u32) -> Option<&mut T> {
        self.chunks
            .get_mut(chunk_index as usize)
            .and_then(|c| c.get_mut(index_in_chunk as usize))
    }

    /// Converts a flat index to `(chunk_index, index_in_chunk)` for this buffer's chunk size.
    pub fn address_of(&self, flat_index: usize) -> (u32, u32) {
        (
            (flat_index / self.chunk_size) as u32,
            (flat_index % self.chunk_size) as u32,
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.chunks.iter().flat_map(|c| c.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.chunks.iter_mut().flat_map(|c| c.iter_mut())
    }

    /// Drops every chunk's contents, as if the buffer were newly constructed. Used by
    /// transient registries at end-of-frame reset.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_survive_new_chunks() {
        let mut b = ChunkedBuffer::new(2);
        let a0 = b.push(10);
        let a1 = b.push(20);
        let a2 = b.push(30);
        assert_eq!(a0, (0, 0));
        assert_eq!(a1, (0, 1));
        assert_eq!(a2, (1, 0));
        assert_eq!(*b.get(a0.0, a0.1).unwrap(), 10);
        assert_eq!(*b.get(a1.0, a1.1).unwrap(), 20);
        assert_eq!(*b.get(a2.0, a2.1).unwrap(), 30);
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn clear_empties_all_chunks() {
        let mut b = ChunkedBuffer::new(4);
        b.push(1);
        b.push(2);
        b.clear();
        assert!(b.is_empty());
        assert_eq!(b.len(), 0);
    }
}
