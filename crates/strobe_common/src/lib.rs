//! Shared foundational types for the Strobe hardware simulation toolkit.
//!
//! Provides packed two-state bit-vectors, interned identifiers, content
//! hashing for trace digests, and clock frequency values.

#![warn(missing_docs)]

pub mod bitvec;
pub mod frequency;
pub mod hash;
pub mod ident;

pub use bitvec::{BitVec, ChangedBits};
pub use frequency::{Frequency, ParseFrequencyError};
pub use hash::{ContentHash, StreamHasher};
pub use ident::{Ident, Interner};
