//! Packed two-state bit-vectors used for every signal value.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// Number of bits stored per backing word.
const BITS_PER_WORD: u32 = 64;

/// An unsigned bit-vector of fixed width, packed 64 bits per `u64` word.
///
/// Bit 0 is the least significant bit. Bits at or above `width` are always
/// zero, so two vectors of the same width compare equal exactly when their
/// bit patterns match. Sign interpretation is left to the caller.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitVec {
    width: u32,
    data: Vec<u64>,
}

impl BitVec {
    /// Creates an all-zero vector of the given width.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            data: vec![0; word_count(width)],
        }
    }

    /// Creates an all-zero vector of the given width.
    pub fn zero(width: u32) -> Self {
        Self::new(width)
    }

    /// Creates a vector with every bit set.
    pub fn all_one(width: u32) -> Self {
        let mut v = Self {
            width,
            data: vec![u64::MAX; word_count(width)],
        };
        v.mask();
        v
    }

    /// Creates a single-bit vector.
    pub fn from_bool(value: bool) -> Self {
        Self::from_u64(value as u64, 1)
    }

    /// Creates a vector from a `u64`, truncated to `width` bits.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        if let Some(word) = v.data.first_mut() {
            *word = value;
        }
        v.mask();
        v
    }

    /// Creates a vector from a `u128`, truncated to `width` bits.
    pub fn from_u128(value: u128, width: u32) -> Self {
        let mut v = Self::new(width);
        for (i, word) in v.data.iter_mut().take(2).enumerate() {
            *word = (value >> (i as u32 * BITS_PER_WORD)) as u64;
        }
        v.mask();
        v
    }

    /// Returns the declared width in bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the packed backing words, least significant first.
    pub fn words(&self) -> &[u64] {
        &self.data
    }

    /// Returns the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> bool {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word = self.data[(index / BITS_PER_WORD) as usize];
        (word >> (index % BITS_PER_WORD)) & 1 == 1
    }

    /// Sets the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: bool) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word = &mut self.data[(index / BITS_PER_WORD) as usize];
        let bit = 1u64 << (index % BITS_PER_WORD);
        if value {
            *word |= bit;
        } else {
            *word &= !bit;
        }
    }

    /// Returns the value as a `u64` if no bit at or above position 64 is set.
    pub fn to_u64(&self) -> Option<u64> {
        if self.data.iter().skip(1).any(|w| *w != 0) {
            return None;
        }
        Some(self.low_u64())
    }

    /// Returns the value as a `u128` if no bit at or above position 128 is set.
    pub fn to_u128(&self) -> Option<u128> {
        if self.data.iter().skip(2).any(|w| *w != 0) {
            return None;
        }
        let lo = self.low_u64() as u128;
        let hi = self.data.get(1).copied().unwrap_or(0) as u128;
        Some(lo | (hi << BITS_PER_WORD))
    }

    /// Returns the least significant 64 bits, zero-extended.
    pub fn low_u64(&self) -> u64 {
        self.data.first().copied().unwrap_or(0)
    }

    /// Returns `true` if every bit is zero.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|w| *w == 0)
    }

    /// Returns `true` if every bit is one. A zero-width vector is all-one.
    pub fn is_all_one(&self) -> bool {
        *self == Self::all_one(self.width)
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.data.iter().map(|w| w.count_ones()).sum()
    }

    /// Returns the minimum number of bits needed to hold this value.
    pub fn significant_bits(&self) -> u32 {
        for (i, word) in self.data.iter().enumerate().rev() {
            if *word != 0 {
                return i as u32 * BITS_PER_WORD + (BITS_PER_WORD - word.leading_zeros());
            }
        }
        0
    }

    /// Returns `true` if the value can be stored in `width` bits without loss.
    pub fn fits_in(&self, width: u32) -> bool {
        self.significant_bits() <= width
    }

    /// Returns a copy zero-extended or truncated to `width` bits.
    pub fn resize(&self, width: u32) -> Self {
        let mut v = Self::new(width);
        for (dst, src) in v.data.iter_mut().zip(self.data.iter()) {
            *dst = *src;
        }
        v.mask();
        v
    }

    /// Extracts `width` bits starting at bit `low`. Bits past the end read as zero.
    pub fn slice(&self, low: u32, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in 0..width {
            let src = low.saturating_add(i);
            if src < self.width && self.get(src) {
                v.set(i, true);
            }
        }
        v
    }

    /// Concatenates `parts`, the first part being the most significant.
    pub fn concat(parts: &[BitVec]) -> Self {
        let total: u32 = parts.iter().map(|p| p.width).sum();
        let mut v = Self::new(total);
        let mut offset = 0u32;
        for part in parts.iter().rev() {
            for i in 0..part.width {
                if part.get(i) {
                    v.set(offset + i, true);
                }
            }
            offset += part.width;
        }
        v
    }

    /// Adds `rhs`, wrapping to `width` bits.
    pub fn wrapping_add(&self, rhs: &BitVec, width: u32) -> Self {
        let a = self.resize(width);
        let b = rhs.resize(width);
        let mut out = Self::new(width);
        let mut carry = false;
        for i in 0..out.data.len() {
            let (s1, c1) = a.data[i].overflowing_add(b.data[i]);
            let (s2, c2) = s1.overflowing_add(carry as u64);
            out.data[i] = s2;
            carry = c1 || c2;
        }
        out.mask();
        out
    }

    /// Subtracts `rhs`, wrapping to `width` bits.
    pub fn wrapping_sub(&self, rhs: &BitVec, width: u32) -> Self {
        let a = self.resize(width);
        let b = rhs.resize(width);
        let mut out = Self::new(width);
        let mut borrow = false;
        for i in 0..out.data.len() {
            let (d1, b1) = a.data[i].overflowing_sub(b.data[i]);
            let (d2, b2) = d1.overflowing_sub(borrow as u64);
            out.data[i] = d2;
            borrow = b1 || b2;
        }
        out.mask();
        out
    }

    /// Two's-complement negation within the current width.
    pub fn wrapping_neg(&self) -> Self {
        Self::new(self.width).wrapping_sub(self, self.width)
    }

    /// Logical left shift; bits shifted past the top are discarded.
    pub fn shl(&self, amount: u64) -> Self {
        let mut v = Self::new(self.width);
        if amount >= self.width as u64 {
            return v;
        }
        let amount = amount as u32;
        for i in amount..self.width {
            if self.get(i - amount) {
                v.set(i, true);
            }
        }
        v
    }

    /// Logical right shift, filling with zeros.
    pub fn shr(&self, amount: u64) -> Self {
        let mut v = Self::new(self.width);
        if amount >= self.width as u64 {
            return v;
        }
        let amount = amount as u32;
        for i in 0..self.width - amount {
            if self.get(i + amount) {
                v.set(i, true);
            }
        }
        v
    }

    /// Compares two vectors as unsigned integers, ignoring width.
    pub fn cmp_unsigned(&self, other: &BitVec) -> Ordering {
        let len = self.data.len().max(other.data.len());
        for i in (0..len).rev() {
            let a = self.data.get(i).copied().unwrap_or(0);
            let b = other.data.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }

    /// Returns `true` if both vectors hold the same unsigned value.
    pub fn value_eq(&self, other: &BitVec) -> bool {
        self.cmp_unsigned(other) == Ordering::Equal
    }

    /// Iterates over the indices of bits that differ between `self` and `other`.
    ///
    /// Both vectors must have the same width.
    pub fn changed_bits<'a>(&'a self, other: &'a BitVec) -> ChangedBits<'a> {
        debug_assert_eq!(self.width, other.width, "BitVec width mismatch");
        ChangedBits {
            a: &self.data,
            b: &other.data,
            word: 0,
            pending: self.data.first().copied().unwrap_or(0)
                ^ other.data.first().copied().unwrap_or(0),
        }
    }

    /// Parses a binary string like `"1010"`; the leftmost digit is the MSB.
    ///
    /// Underscores are ignored. Returns `None` on any other character.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let digits: Vec<char> = s.chars().filter(|c| *c != '_').collect();
        let mut v = Self::new(digits.len() as u32);
        for (i, c) in digits.iter().rev().enumerate() {
            match c {
                '0' => {}
                '1' => v.set(i as u32, true),
                _ => return None,
            }
        }
        Some(v)
    }

    /// Parses a hex string; each digit contributes four bits.
    pub fn from_hex_str(s: &str) -> Option<Self> {
        let digits: Vec<char> = s.chars().filter(|c| *c != '_').collect();
        let mut v = Self::new(digits.len() as u32 * 4);
        for (idx, c) in digits.iter().rev().enumerate() {
            let nibble = c.to_digit(16)?;
            for bit in 0..4 {
                if nibble & (1 << bit) != 0 {
                    v.set(idx as u32 * 4 + bit, true);
                }
            }
        }
        Some(v)
    }

    /// Clears any bits at or above `width` in the last word.
    fn mask(&mut self) {
        let rem = self.width % BITS_PER_WORD;
        if rem != 0 {
            if let Some(last) = self.data.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }
}

/// Iterator returned by [`BitVec::changed_bits`].
pub struct ChangedBits<'a> {
    a: &'a [u64],
    b: &'a [u64],
    word: usize,
    pending: u64,
}

impl Iterator for ChangedBits<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            if self.pending != 0 {
                let bit = self.pending.trailing_zeros();
                self.pending &= self.pending - 1;
                return Some(self.word as u32 * BITS_PER_WORD + bit);
            }
            self.word += 1;
            if self.word >= self.a.len().max(self.b.len()) {
                return None;
            }
            self.pending = self.a.get(self.word).copied().unwrap_or(0)
                ^ self.b.get(self.word).copied().unwrap_or(0);
        }
    }
}

impl fmt::Display for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", if self.get(i) { '1' } else { '0' })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVec({}'b{self})", self.width)
    }
}

impl BitAnd for &BitVec {
    type Output = BitVec;

    fn bitand(self, rhs: Self) -> BitVec {
        let width = self.width.max(rhs.width);
        let (a, b) = (self.resize(width), rhs.resize(width));
        let mut out = a;
        for (w, r) in out.data.iter_mut().zip(b.data.iter()) {
            *w &= *r;
        }
        out
    }
}

impl BitOr for &BitVec {
    type Output = BitVec;

    fn bitor(self, rhs: Self) -> BitVec {
        let width = self.width.max(rhs.width);
        let (a, b) = (self.resize(width), rhs.resize(width));
        let mut out = a;
        for (w, r) in out.data.iter_mut().zip(b.data.iter()) {
            *w |= *r;
        }
        out
    }
}

impl BitXor for &BitVec {
    type Output = BitVec;

    fn bitxor(self, rhs: Self) -> BitVec {
        let width = self.width.max(rhs.width);
        let (a, b) = (self.resize(width), rhs.resize(width));
        let mut out = a;
        for (w, r) in out.data.iter_mut().zip(b.data.iter()) {
            *w ^= *r;
        }
        out
    }
}

impl Not for &BitVec {
    type Output = BitVec;

    fn not(self) -> BitVec {
        let mut out = self.clone();
        for w in out.data.iter_mut() {
            *w = !*w;
        }
        out.mask();
        out
    }
}

/// Returns the number of words needed to store `width` bits.
fn word_count(width: u32) -> usize {
    width.div_ceil(BITS_PER_WORD) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_zero() {
        let v = BitVec::new(70);
        assert_eq!(v.width(), 70);
        assert!(v.is_zero());
        assert_eq!(v.words().len(), 2);
    }

    #[test]
    fn from_u64_masks_to_width() {
        let v = BitVec::from_u64(0xFF, 4);
        assert_eq!(v.to_u64(), Some(0xF));
        assert_eq!(v, BitVec::all_one(4));
    }

    #[test]
    fn set_get_roundtrip() {
        let mut v = BitVec::new(100);
        v.set(0, true);
        v.set(64, true);
        v.set(99, true);
        assert!(v.get(0));
        assert!(v.get(64));
        assert!(v.get(99));
        assert!(!v.get(1));
        v.set(64, false);
        assert!(!v.get(64));
        assert_eq!(v.count_ones(), 2);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn get_out_of_bounds_panics() {
        BitVec::new(4).get(4);
    }

    #[test]
    fn from_binary_and_display() {
        let v = BitVec::from_binary_str("1010_0001").unwrap();
        assert_eq!(v.width(), 8);
        assert_eq!(v.to_u64(), Some(0xA1));
        assert_eq!(v.to_string(), "10100001");
        assert!(BitVec::from_binary_str("10x1").is_none());
    }

    #[test]
    fn from_hex() {
        let v = BitVec::from_hex_str("A5").unwrap();
        assert_eq!(v.width(), 8);
        assert_eq!(v.to_string(), "10100101");
        assert!(BitVec::from_hex_str("GG").is_none());
    }

    #[test]
    fn significant_bits_and_fits() {
        let v = BitVec::from_u64(5, 16);
        assert_eq!(v.significant_bits(), 3);
        assert!(v.fits_in(3));
        assert!(!v.fits_in(2));
        assert!(BitVec::new(8).fits_in(0));
    }

    #[test]
    fn add_wraps_and_carries_across_words() {
        let a = BitVec::from_u64(u64::MAX, 65);
        let b = BitVec::from_u64(1, 65);
        let sum = a.wrapping_add(&b, 65);
        assert!(sum.get(64));
        assert_eq!(sum.low_u64(), 0);

        let c = BitVec::from_u64(3, 2);
        let d = BitVec::from_u64(1, 2);
        assert_eq!(c.wrapping_add(&d, 2).to_u64(), Some(0));
        assert_eq!(c.wrapping_add(&d, 3).to_u64(), Some(4));
    }

    #[test]
    fn sub_wraps() {
        let zero = BitVec::new(4);
        let one = BitVec::from_u64(1, 4);
        assert_eq!(zero.wrapping_sub(&one, 4).to_u64(), Some(0xF));
        assert_eq!(one.wrapping_neg().to_u64(), Some(0xF));
    }

    #[test]
    fn shifts() {
        let v = BitVec::from_u64(0b0110, 4);
        assert_eq!(v.shl(1).to_u64(), Some(0b1100));
        assert_eq!(v.shl(2).to_u64(), Some(0b1000));
        assert_eq!(v.shr(1).to_u64(), Some(0b0011));
        assert!(v.shl(4).is_zero());
        assert!(v.shr(u64::MAX).is_zero());
    }

    #[test]
    fn slice_and_concat() {
        let v = BitVec::from_u64(0b1101_0110, 8);
        assert_eq!(v.slice(4, 4).to_u64(), Some(0b1101));
        assert_eq!(v.slice(6, 4).to_u64(), Some(0b0011));
        let hi = BitVec::from_u64(0b10, 2);
        let lo = BitVec::from_u64(0b011, 3);
        let cat = BitVec::concat(&[hi, lo]);
        assert_eq!(cat.width(), 5);
        assert_eq!(cat.to_string(), "10011");
    }

    #[test]
    fn bitwise_ops_extend_to_wider_operand() {
        let a = BitVec::from_binary_str("1100").unwrap();
        let b = BitVec::from_binary_str("10").unwrap();
        assert_eq!((&a & &b).to_string(), "0000");
        assert_eq!((&a | &b).to_string(), "1110");
        assert_eq!((&a ^ &b).to_string(), "1110");
        assert_eq!((!&a).to_string(), "0011");
    }

    #[test]
    fn unsigned_compare_ignores_width() {
        let a = BitVec::from_u64(5, 3);
        let b = BitVec::from_u64(5, 100);
        assert!(a.value_eq(&b));
        assert_ne!(a, b);
        assert_eq!(
            BitVec::from_u64(2, 8).cmp_unsigned(&BitVec::from_u64(9, 4)),
            Ordering::Less
        );
    }

    #[test]
    fn changed_bits_across_words() {
        let mut a = BitVec::new(130);
        let mut b = BitVec::new(130);
        a.set(3, true);
        b.set(70, true);
        b.set(129, true);
        let changed: Vec<u32> = a.changed_bits(&b).collect();
        assert_eq!(changed, vec![3, 70, 129]);
        assert_eq!(a.changed_bits(&a).count(), 0);
    }

    #[test]
    fn u128_roundtrip() {
        let v = BitVec::from_u128(1u128 << 100 | 7, 101);
        assert_eq!(v.to_u128(), Some(1u128 << 100 | 7));
        assert_eq!(v.to_u64(), None);
    }

    #[test]
    fn serde_roundtrip() {
        let v = BitVec::from_u64(0b1011, 4);
        let json = serde_json::to_string(&v).unwrap();
        let back: BitVec = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
