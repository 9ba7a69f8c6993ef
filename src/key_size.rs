//! Key-size policy shared by every keyed algorithm.

use alloc::vec::Vec;
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::errors::{Error, Result};

/// Set of key lengths, in bytes, accepted by an algorithm.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeySizeSpecifier {
    /// Exactly one length.
    Fixed(usize),
    /// One of an explicit list of lengths.
    Enum(&'static [usize]),
    /// Any length within the inclusive range.
    Range(usize, usize),
}

impl KeySizeSpecifier {
    /// Largest accepted length.
    pub fn max(&self) -> usize {
        match *self {
            KeySizeSpecifier::Fixed(n) => n,
            KeySizeSpecifier::Enum(sizes) => sizes.iter().copied().max().unwrap_or(0),
            KeySizeSpecifier::Range(_, max) => max,
        }
    }

    /// Smallest accepted length.
    pub fn min(&self) -> usize {
        match *self {
            KeySizeSpecifier::Fixed(n) => n,
            KeySizeSpecifier::Enum(sizes) => sizes.iter().copied().min().unwrap_or(0),
            KeySizeSpecifier::Range(min, _) => min,
        }
    }

    /// Is `len` an accepted length?
    pub fn contains(&self, len: usize) -> bool {
        match *self {
            KeySizeSpecifier::Fixed(n) => n == len,
            KeySizeSpecifier::Enum(sizes) => sizes.contains(&len),
            KeySizeSpecifier::Range(min, max) => (min..=max).contains(&len),
        }
    }
}

/// Algorithms which are keyed and know which key lengths they accept.
pub trait HasKeySize {
    /// Accepted key lengths.
    fn key_size_specifier(&self) -> KeySizeSpecifier;

    /// Largest accepted key length, which is also the length of generated keys.
    fn max_key_size(&self) -> usize {
        self.key_size_specifier().max()
    }

    /// Checks a key length against [`HasKeySize::key_size_specifier`].
    fn validate_key_size(&self, len: usize) -> Result<()> {
        if self.key_size_specifier().contains(len) {
            Ok(())
        } else {
            Err(Error::InvalidKeyLength)
        }
    }

    /// Generates a random key of [`HasKeySize::max_key_size`] bytes.
    fn generate_key<R: CryptoRngCore + ?Sized>(&self, rng: &mut R) -> Zeroizing<Vec<u8>> {
        let mut key = Zeroizing::new(vec![0u8; self.max_key_size()]);
        rng.fill_bytes(&mut key);
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    struct RangeKeyed;

    impl HasKeySize for RangeKeyed {
        fn key_size_specifier(&self) -> KeySizeSpecifier {
            KeySizeSpecifier::Range(5, 16)
        }
    }

    #[test]
    fn test_range_boundaries() {
        let spec = KeySizeSpecifier::Range(5, 16);
        assert!(!spec.contains(4));
        assert!(spec.contains(5));
        assert!(spec.contains(16));
        assert!(!spec.contains(17));
        assert_eq!(spec.max(), 16);
        assert_eq!(spec.min(), 5);
    }

    #[test]
    fn test_enum_and_fixed() {
        let spec = KeySizeSpecifier::Enum(&[16, 24, 32]);
        assert!(spec.contains(24));
        assert!(!spec.contains(20));
        assert_eq!(spec.max(), 32);

        let spec = KeySizeSpecifier::Fixed(8);
        assert!(spec.contains(8));
        assert!(!spec.contains(7));
        assert!(!spec.contains(9));
    }

    #[test]
    fn test_generate_key_uses_max_size() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);
        let key = RangeKeyed.generate_key(&mut rng);
        assert_eq!(key.len(), 16);
        assert!(RangeKeyed.validate_key_size(key.len()).is_ok());
        assert_eq!(RangeKeyed.validate_key_size(17), Err(Error::InvalidKeyLength));
    }
}
