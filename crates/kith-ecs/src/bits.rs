//! Growable bit set used for component masks, family masks and listener masks.
//!
//! A [`Bitset`] is logically infinite: reads past the stored words return
//! `false` and writes grow the backing storage. Bits are packed into 64-bit
//! words; the word for bit `i` is `i >> 6` and the bit within that word is
//! `i & 0x3f`. Every method uses the same constants.
//!
//! Equality and hashing are defined over the *logical* content, so two sets
//! that differ only in trailing zero words compare equal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

const WORD_BITS: usize = 64;
const WORD_SHIFT: u32 = 6;
const BIT_MASK: usize = 0x3f;

#[inline]
fn word_of(index: usize) -> usize {
    index >> WORD_SHIFT
}

#[inline]
fn mask_of(index: usize) -> u64 {
    1u64 << (index & BIT_MASK)
}

// ---------------------------------------------------------------------------
// Bitset
// ---------------------------------------------------------------------------

/// A dynamically growing vector of bits with boolean algebra and scans.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Bitset {
    words: Vec<u64>,
}

impl Bitset {
    /// Create an empty bit set.
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Create an empty bit set with room for at least `nbits` bits.
    pub fn with_capacity(nbits: usize) -> Self {
        Self {
            words: vec![0; nbits.div_ceil(WORD_BITS)],
        }
    }

    /// Make sure `word` is a valid index into `words`.
    fn ensure_word(&mut self, word: usize) {
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
    }

    /// Whether bit `index` is set.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.words
            .get(word_of(index))
            .is_some_and(|w| w & mask_of(index) != 0)
    }

    /// Set bit `index`, growing the set if needed.
    #[inline]
    pub fn set(&mut self, index: usize) {
        let word = word_of(index);
        self.ensure_word(word);
        self.words[word] |= mask_of(index);
    }

    /// Clear bit `index`. Clearing a bit past the stored range is a no-op.
    #[inline]
    pub fn clear(&mut self, index: usize) {
        if let Some(w) = self.words.get_mut(word_of(index)) {
            *w &= !mask_of(index);
        }
    }

    /// Invert bit `index`, growing the set if needed.
    pub fn flip(&mut self, index: usize) {
        let word = word_of(index);
        self.ensure_word(word);
        self.words[word] ^= mask_of(index);
    }

    /// Set bit `index` and return whether it was already set.
    pub fn get_and_set(&mut self, index: usize) -> bool {
        let word = word_of(index);
        self.ensure_word(word);
        let old = self.words[word];
        self.words[word] |= mask_of(index);
        old == self.words[word]
    }

    /// Clear bit `index` and return whether it was set.
    pub fn get_and_clear(&mut self, index: usize) -> bool {
        match self.words.get_mut(word_of(index)) {
            Some(w) => {
                let old = *w;
                *w &= !mask_of(index);
                old != *w
            }
            None => false,
        }
    }

    /// Clear every bit. Storage is kept.
    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    /// Number of bits currently backed by storage (not the highest set bit).
    pub fn num_bits(&self) -> usize {
        self.words.len() << WORD_SHIFT
    }

    /// The logical length: index of the highest set bit plus one, or 0.
    pub fn length(&self) -> usize {
        for (i, &w) in self.words.iter().enumerate().rev() {
            if w != 0 {
                return (i << WORD_SHIFT) + (WORD_BITS - w.leading_zeros() as usize);
            }
        }
        0
    }

    /// `true` when no bit is set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// `true` when at least one bit is set.
    pub fn not_empty(&self) -> bool {
        !self.is_empty()
    }

    /// First set bit at or after `from`, if any.
    pub fn next_set_bit(&self, from: usize) -> Option<usize> {
        let mut word = word_of(from);
        let mut bits = *self.words.get(word)? & (!0u64 << (from & BIT_MASK));
        loop {
            if bits != 0 {
                return Some((word << WORD_SHIFT) + bits.trailing_zeros() as usize);
            }
            word += 1;
            bits = *self.words.get(word)?;
        }
    }

    /// First clear bit at or after `from`. Always exists since the set is
    /// logically infinite.
    pub fn next_clear_bit(&self, from: usize) -> usize {
        let mut word = word_of(from);
        let Some(&first) = self.words.get(word) else {
            return from;
        };
        let mut bits = !first & (!0u64 << (from & BIT_MASK));
        loop {
            if bits != 0 {
                return (word << WORD_SHIFT) + bits.trailing_zeros() as usize;
            }
            word += 1;
            match self.words.get(word) {
                Some(&w) => bits = !w,
                None => return word << WORD_SHIFT,
            }
        }
    }

    /// Iterate over the indices of all set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.next_set_bit(0), move |&i| self.next_set_bit(i + 1))
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Raw word storage, lowest word first.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    // -- boolean algebra ----------------------------------------------------

    /// In-place AND. Words beyond `other`'s range become zero.
    pub fn and(&mut self, other: &Bitset) {
        let common = self.words.len().min(other.words.len());
        for (w, o) in self.words[..common].iter_mut().zip(&other.words) {
            *w &= o;
        }
        for w in &mut self.words[common..] {
            *w = 0;
        }
    }

    /// In-place AND-NOT: clear every bit that is set in `other`.
    pub fn and_not(&mut self, other: &Bitset) {
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w &= !o;
        }
    }

    /// In-place OR. Grows the receiver when `other` is longer.
    pub fn or(&mut self, other: &Bitset) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= o;
        }
    }

    /// In-place XOR. Grows the receiver when `other` is longer.
    pub fn xor(&mut self, other: &Bitset) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w ^= o;
        }
    }

    /// `true` if some bit is set in both sets.
    pub fn intersects(&self, other: &Bitset) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .any(|(w, o)| w & o != 0)
    }

    /// `true` if every bit set in `other` is also set in `self`.
    pub fn contains_all(&self, other: &Bitset) -> bool {
        let common = self.words.len().min(other.words.len());
        if other.words[common..].iter().any(|&o| o != 0) {
            return false;
        }
        self.words[..common]
            .iter()
            .zip(&other.words[..common])
            .all(|(w, o)| w & o == *o)
    }

    /// Significant words, with trailing zero words trimmed.
    fn significant_words(&self) -> &[u64] {
        let len = self
            .words
            .iter()
            .rposition(|&w| w != 0)
            .map_or(0, |i| i + 1);
        &self.words[..len]
    }
}

impl PartialEq for Bitset {
    fn eq(&self, other: &Self) -> bool {
        self.significant_words() == other.significant_words()
    }
}

impl Eq for Bitset {}

impl Hash for Bitset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_words().hash(state);
    }
}

impl fmt::Debug for Bitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter_ones()).finish()
    }
}

impl FromIterator<usize> for Bitset {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bits = Bitset::new();
        for i in iter {
            bits.set(i);
        }
        bits
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn bits(indices: &[usize]) -> Bitset {
        indices.iter().copied().collect()
    }

    fn hash_of(b: &Bitset) -> u64 {
        let mut h = DefaultHasher::new();
        b.hash(&mut h);
        h.finish()
    }

    #[test]
    fn reads_past_storage_are_false() {
        let b = Bitset::new();
        assert!(!b.get(0));
        assert!(!b.get(10_000));
        assert_eq!(b.num_bits(), 0);
    }

    #[test]
    fn set_grows_and_clear_is_local() {
        let mut b = Bitset::new();
        b.set(130);
        assert!(b.get(130));
        assert_eq!(b.num_bits(), 192);
        b.clear(130);
        assert!(!b.get(130));
        // Clearing out of range must not grow.
        b.clear(5_000);
        assert_eq!(b.num_bits(), 192);
    }

    #[test]
    fn word_boundaries_use_64_bit_words() {
        let mut b = Bitset::new();
        b.set(63);
        b.set(64);
        assert_eq!(b.words(), &[1u64 << 63, 1]);
        assert_eq!(b.length(), 65);
    }

    #[test]
    fn flip_toggles() {
        let mut b = Bitset::new();
        b.flip(7);
        assert!(b.get(7));
        b.flip(7);
        assert!(!b.get(7));
    }

    #[test]
    fn get_and_set_reports_previous_value() {
        let mut b = Bitset::new();
        assert!(!b.get_and_set(3));
        assert!(b.get_and_set(3));
        assert!(b.get_and_clear(3));
        assert!(!b.get_and_clear(3));
        assert!(!b.get_and_clear(999));
    }

    #[test]
    fn length_is_highest_bit_plus_one() {
        assert_eq!(Bitset::new().length(), 0);
        assert_eq!(bits(&[0]).length(), 1);
        assert_eq!(bits(&[2, 200]).length(), 201);
        let mut b = bits(&[2, 200]);
        b.clear(200);
        assert_eq!(b.length(), 3);
    }

    #[test]
    fn emptiness() {
        let mut b = Bitset::with_capacity(256);
        assert!(b.is_empty());
        b.set(255);
        assert!(b.not_empty());
        b.clear_all();
        assert!(b.is_empty());
        assert_eq!(b.num_bits(), 256);
    }

    #[test]
    fn next_set_bit_scans_across_words() {
        let b = bits(&[1, 64, 300]);
        assert_eq!(b.next_set_bit(0), Some(1));
        assert_eq!(b.next_set_bit(2), Some(64));
        assert_eq!(b.next_set_bit(65), Some(300));
        assert_eq!(b.next_set_bit(301), None);
        assert_eq!(b.next_set_bit(10_000), None);
        assert_eq!(b.iter_ones().collect::<Vec<_>>(), vec![1, 64, 300]);
    }

    #[test]
    fn next_clear_bit_scans_across_words() {
        let mut b = Bitset::new();
        for i in 0..70 {
            b.set(i);
        }
        assert_eq!(b.next_clear_bit(0), 70);
        assert_eq!(b.next_clear_bit(100), 100);
        let full: Bitset = (0..128).collect();
        assert_eq!(full.next_clear_bit(5), 128);
    }

    #[test]
    fn and_zeroes_words_beyond_operand() {
        let mut a = bits(&[1, 2, 100]);
        a.and(&bits(&[2, 3]));
        assert_eq!(a, bits(&[2]));
    }

    #[test]
    fn or_and_xor_grow_receiver() {
        let mut a = bits(&[1]);
        a.or(&bits(&[1, 150]));
        assert_eq!(a, bits(&[1, 150]));

        let mut x = bits(&[1, 2]);
        x.xor(&bits(&[2, 129]));
        assert_eq!(x, bits(&[1, 129]));
    }

    #[test]
    fn and_not_clears_common_bits() {
        let mut a = bits(&[1, 2, 70]);
        a.and_not(&bits(&[2, 70, 500]));
        assert_eq!(a, bits(&[1]));
    }

    #[test]
    fn intersects_only_on_common_bits() {
        assert!(bits(&[3, 80]).intersects(&bits(&[80])));
        assert!(!bits(&[3]).intersects(&bits(&[4, 80])));
        assert!(!Bitset::new().intersects(&bits(&[0])));
    }

    #[test]
    fn contains_all_is_superset_test() {
        let a = bits(&[1, 2, 3]);
        assert!(a.contains_all(&bits(&[1, 3])));
        assert!(a.contains_all(&Bitset::new()));
        assert!(a.contains_all(&a));
        assert!(!a.contains_all(&bits(&[4])));
        // Set bits beyond the receiver's storage make it false.
        assert!(!a.contains_all(&bits(&[1, 500])));
        // Trailing zero words on the operand are fine.
        let mut padded = bits(&[1]);
        padded.set(500);
        padded.clear(500);
        assert!(a.contains_all(&padded));
    }

    #[test]
    fn equality_and_hash_ignore_trailing_zero_words() {
        let a = bits(&[5]);
        let mut b = Bitset::with_capacity(1024);
        b.set(5);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, bits(&[6]));
    }

    #[test]
    fn debug_lists_set_bits() {
        assert_eq!(format!("{:?}", bits(&[0, 65])), "{0, 65}");
    }
}
