#![forbid(unsafe_code)]

/// A compact bit vector used for column validity.
///
/// Bits are stored little-endian within each `u64` word:
/// - bit 0 is the LSB of word 0
/// - bit 63 is the MSB of word 0
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
    ones: usize,
}

impl BitVec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_bits(bits: usize) -> Self {
        Self {
            words: Vec::with_capacity(bits.div_ceil(64)),
            len: 0,
            ones: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, value: bool) {
        let bit = self.len % 64;
        if bit == 0 {
            self.words.push(0);
        }

        if value {
            let word = self.len / 64;
            self.words[word] |= 1u64 << bit;
            self.ones += 1;
        }

        self.len += 1;
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "BitVec index out of bounds");
        let word = self.words[index / 64];
        ((word >> (index % 64)) & 1) == 1
    }

    pub fn count_ones(&self) -> usize {
        self.ones
    }

    pub fn all_true(&self) -> bool {
        self.ones == self.len
    }

    /// Copy the bits at `indices` into a new vector, in order.
    pub fn gather(&self, indices: &[usize]) -> BitVec {
        let mut out = BitVec::with_capacity_bits(indices.len());
        for &idx in indices {
            out.push(self.get(idx));
        }
        out
    }
}

impl FromIterator<bool> for BitVec {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut out = BitVec::new();
        for bit in iter {
            out.push(bit);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_get_across_word_boundary() {
        let bits: BitVec = (0..130).map(|i| i % 3 == 0).collect();
        assert_eq!(bits.len(), 130);
        assert!(bits.get(0));
        assert!(!bits.get(64));
        assert!(bits.get(129));
        assert_eq!(bits.count_ones(), (0..130).filter(|i| i % 3 == 0).count());
        assert!(!bits.all_true());
    }

    #[test]
    fn gather_preserves_order() {
        let bits: BitVec = [true, false, true, false].into_iter().collect();
        let picked = bits.gather(&[3, 2, 2]);
        assert_eq!(picked, [false, true, true].into_iter().collect());
    }
}
