//! Byte-offset counter for a single encode or decode pass

/// Mutable offset into the buffer of one encode or decode pass.
///
/// A cursor never looks at the buffer it indexes. Every codec advances it by
/// exactly the number of bytes it writes or reads, so after a pass the offset
/// equals the sum of all advances. Create one per pass and do not share it
/// between concurrent passes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    offset: usize,
}

impl Cursor {
    /// Create a cursor at offset zero
    #[inline]
    pub const fn new() -> Self {
        Self { offset: 0 }
    }

    /// Current offset
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Move forward by `n` bytes, returning the offset before the move
    #[inline]
    pub fn advance(&mut self, n: usize) -> usize {
        let before = self.offset;
        self.offset += n;
        before
    }

    /// Move forward by one byte, returning the offset before the move
    #[inline]
    pub fn advance_one(&mut self) -> usize {
        self.advance(1)
    }

    /// Rewind to offset zero once a pass is complete
    #[inline]
    pub fn reset(&mut self) {
        self.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_returns_previous_offset() {
        let mut cursor = Cursor::new();
        assert_eq!(cursor.advance(4), 0);
        assert_eq!(cursor.advance_one(), 4);
        assert_eq!(cursor.advance(0), 5);
        assert_eq!(cursor.advance(10), 5);
        assert_eq!(cursor.offset(), 15);
    }

    #[test]
    fn test_reset() {
        let mut cursor = Cursor::new();
        cursor.advance(42);
        cursor.reset();
        assert_eq!(cursor.offset(), 0);
        assert_eq!(cursor, Cursor::default());
    }
}
