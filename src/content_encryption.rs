//! Content encryption: a block cipher in ECB, CBC, CFB or CTR mode with
//! PKCS#7 padding, identified by an `AlgorithmIdentifier` whose parameters
//! carry the IV.
//!
//! # Usage
//!
//! ```
//! use cms_crypto::content_encryption::{ContentEncryptionAlgorithm, ContentEncryptionParams};
//! use cms_crypto::key_size::HasKeySize;
//! use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
//!
//! let mut rng = ChaCha8Rng::from_seed([7; 32]);
//! let params = ContentEncryptionParams::generate(ContentEncryptionAlgorithm::AES_128_CBC, &mut rng);
//! let key = params.generate_key(&mut rng);
//!
//! let ciphertext = params.encrypt(&key, b"hello world").unwrap();
//! assert_eq!(params.decrypt(&key, &ciphertext).unwrap(), b"hello world");
//! ```

use alloc::vec::Vec;
use cipher::{
    crypto_common::InnerInit, generic_array::GenericArray, Block, BlockDecryptMut,
    BlockEncryptMut, InnerIvInit, KeyInit, StreamCipherCore,
};
use core::fmt;
use der::asn1::ObjectIdentifier;
use rand_core::CryptoRngCore;
use spki::{AlgorithmIdentifierOwned, AlgorithmIdentifierRef};

use crate::{
    algorithms::{
        cipher::with_cipher,
        expect_null_or_absent, impl_algorithm_identifier, octet_string_from,
        octet_string_parameters,
        pad::{pkcs7_pad, pkcs7_unpad},
        AlgorithmParameters, CipherKind,
    },
    errors::{Error, Result},
    key_size::{HasKeySize, KeySizeSpecifier},
};

/// Block cipher mode of operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BlockCipherMode {
    /// Electronic codebook. Carries no IV.
    Ecb,
    /// Cipher block chaining.
    Cbc,
    /// Full-block cipher feedback.
    Cfb,
    /// Counter mode; the IV is the initial big-endian counter block.
    Ctr,
}

impl BlockCipherMode {
    /// Every mode.
    pub const ALL: &'static [BlockCipherMode] = &[
        BlockCipherMode::Ecb,
        BlockCipherMode::Cbc,
        BlockCipherMode::Cfb,
        BlockCipherMode::Ctr,
    ];

    /// Does this mode take an IV?
    pub fn has_iv(self) -> bool {
        self != BlockCipherMode::Ecb
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            BlockCipherMode::Ecb => "ECB",
            BlockCipherMode::Cbc => "CBC",
            BlockCipherMode::Cfb => "CFB",
            BlockCipherMode::Ctr => "CTR",
        }
    }
}

/// A cipher in a mode. Only some pairs have a registered OID; the others can
/// be used for encryption but fail to serialize with
/// [`Error::UnsupportedContentEncryption`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ContentEncryptionAlgorithm {
    /// Mode of operation.
    pub mode: BlockCipherMode,
    /// Block cipher.
    pub cipher: CipherKind,
}

macro_rules! oid_table {
    ($($name:ident => ($mode:ident, $cipher:ident, $oid:literal)),+ $(,)?) => {
        impl ContentEncryptionAlgorithm {
            $(
                #[doc = concat!("`", $oid, "`")]
                pub const $name: Self = Self {
                    mode: BlockCipherMode::$mode,
                    cipher: CipherKind::$cipher,
                };
            )+
        }

        const OID_TABLE: &[(ContentEncryptionAlgorithm, ObjectIdentifier)] = &[
            $((ContentEncryptionAlgorithm::$name, ObjectIdentifier::new_unwrap($oid)),)+
        ];
    };
}

oid_table! {
    DES_ECB => (Ecb, Des, "1.3.14.3.2.6"),
    DES_CBC => (Cbc, Des, "1.3.14.3.2.7"),
    DES_CFB => (Cfb, Des, "1.3.14.3.2.9"),
    DES_EDE3_CBC => (Cbc, DesEde3, "1.2.840.113549.3.7"),
    AES_128_ECB => (Ecb, Aes128, "2.16.840.1.101.3.4.1.1"),
    AES_128_CBC => (Cbc, Aes128, "2.16.840.1.101.3.4.1.2"),
    AES_128_CFB => (Cfb, Aes128, "2.16.840.1.101.3.4.1.4"),
    AES_192_ECB => (Ecb, Aes192, "2.16.840.1.101.3.4.1.21"),
    AES_192_CBC => (Cbc, Aes192, "2.16.840.1.101.3.4.1.22"),
    AES_192_CFB => (Cfb, Aes192, "2.16.840.1.101.3.4.1.24"),
    AES_256_ECB => (Ecb, Aes256, "2.16.840.1.101.3.4.1.41"),
    AES_256_CBC => (Cbc, Aes256, "2.16.840.1.101.3.4.1.42"),
    AES_256_CFB => (Cfb, Aes256, "2.16.840.1.101.3.4.1.44"),
    CAST5_CBC => (Cbc, Cast5, "1.2.840.113533.7.66.10"),
    CAMELLIA_128_CBC => (Cbc, Camellia128, "1.2.392.200011.61.1.1.1.2"),
    CAMELLIA_128_ECB => (Ecb, Camellia128, "0.3.4401.5.3.1.9.1"),
    CAMELLIA_128_CFB => (Cfb, Camellia128, "0.3.4401.5.3.1.9.4"),
    CAMELLIA_128_CTR => (Ctr, Camellia128, "0.3.4401.5.3.1.9.9"),
}

impl ContentEncryptionAlgorithm {
    /// Pairs `mode` with `cipher`.
    pub const fn new(mode: BlockCipherMode, cipher: CipherKind) -> Self {
        Self { mode, cipher }
    }

    /// Every (mode, cipher) pair, whether or not it has an OID.
    pub fn iter() -> impl Iterator<Item = ContentEncryptionAlgorithm> {
        BlockCipherMode::ALL.iter().flat_map(|&mode| {
            CipherKind::ALL
                .iter()
                .map(move |&cipher| ContentEncryptionAlgorithm { mode, cipher })
        })
    }

    /// Pairs which have a registered OID.
    pub fn registered() -> impl Iterator<Item = ContentEncryptionAlgorithm> {
        OID_TABLE.iter().map(|(alg, _)| *alg)
    }

    /// Registered OID, if any.
    pub fn oid(self) -> Option<ObjectIdentifier> {
        OID_TABLE
            .iter()
            .find(|(alg, _)| *alg == self)
            .map(|(_, oid)| *oid)
    }

    /// Look up an algorithm by OID.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        OID_TABLE
            .iter()
            .find(|(_, candidate)| *candidate == oid)
            .map(|(alg, _)| *alg)
            .ok_or(Error::UnsupportedAlgorithm { oid })
    }

    /// Block size of the underlying cipher.
    pub fn block_size(self) -> usize {
        self.cipher.block_size()
    }
}

impl HasKeySize for ContentEncryptionAlgorithm {
    fn key_size_specifier(&self) -> KeySizeSpecifier {
        self.cipher.key_size_specifier()
    }
}

impl fmt::Display for ContentEncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.cipher.name(), self.mode.name())
    }
}

/// Content-encryption algorithm together with its IV.
///
/// The IV is exactly one block long for every mode except ECB, where it is
/// absent. The fields are private so that this cannot be broken.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContentEncryptionParams {
    alg: ContentEncryptionAlgorithm,
    iv: Option<Vec<u8>>,
}

impl ContentEncryptionParams {
    /// Builds parameters from an explicit IV, validating its length.
    pub fn new(alg: ContentEncryptionAlgorithm, iv: Option<&[u8]>) -> Result<Self> {
        match (alg.mode.has_iv(), iv) {
            (false, None) => Ok(Self { alg, iv: None }),
            (true, Some(iv)) if iv.len() == alg.block_size() => Ok(Self {
                alg,
                iv: Some(iv.to_vec()),
            }),
            _ => Err(Error::InvalidParameters("IV length must equal the block size")),
        }
    }

    /// Draws a fresh random IV for `alg`.
    pub fn generate<R: CryptoRngCore + ?Sized>(alg: ContentEncryptionAlgorithm, rng: &mut R) -> Self {
        let iv = alg.mode.has_iv().then(|| {
            let mut iv = vec![0u8; alg.block_size()];
            rng.fill_bytes(&mut iv);
            iv
        });

        Self { alg, iv }
    }

    /// Algorithm.
    pub fn algorithm(&self) -> ContentEncryptionAlgorithm {
        self.alg
    }

    /// IV, absent for ECB.
    pub fn iv(&self) -> Option<&[u8]> {
        self.iv.as_deref()
    }

    /// Pads `plaintext` and encrypts it under `key`.
    pub fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut buf = pkcs7_pad(plaintext, self.alg.block_size());
        self.encrypt_blocks(key, &mut buf)?;
        Ok(core::mem::take(&mut *buf))
    }

    /// Decrypts `ciphertext` under `key` and strips the padding.
    pub fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() % self.alg.block_size() != 0 {
            return Err(Error::Decryption);
        }

        let mut buf = ciphertext.to_vec();
        self.decrypt_blocks(key, &mut buf)?;
        pkcs7_unpad(&mut buf, self.alg.block_size())?;
        Ok(buf)
    }

    /// Same algorithm with a different IV.
    pub(crate) fn with_iv(&self, iv: &[u8]) -> Result<Self> {
        Self::new(self.alg, Some(iv))
    }

    /// Encrypts whole blocks in place, without padding.
    pub(crate) fn encrypt_blocks(&self, key: &[u8], buf: &mut [u8]) -> Result<()> {
        self.check(key, buf)?;
        let iv = self.iv.as_deref().unwrap_or_default();

        with_cipher!(self.alg.cipher, C, Flavor => {
            let cipher = C::new_from_slice(key).map_err(|_| Error::InvalidKey)?;
            match self.alg.mode {
                BlockCipherMode::Ecb => {
                    encrypt_with(ecb::Encryptor::<C>::inner_init(cipher), buf)
                }
                BlockCipherMode::Cbc => encrypt_with(
                    cbc::Encryptor::<C>::inner_iv_slice_init(cipher, iv).map_err(|_| INVALID_IV)?,
                    buf,
                ),
                BlockCipherMode::Cfb => encrypt_with(
                    cfb_mode::Encryptor::<C>::inner_iv_slice_init(cipher, iv)
                        .map_err(|_| INVALID_IV)?,
                    buf,
                ),
                BlockCipherMode::Ctr => apply_keystream(
                    ctr::CtrCore::<C, Flavor>::inner_iv_slice_init(cipher, iv)
                        .map_err(|_| INVALID_IV)?,
                    buf,
                ),
            }
        });

        Ok(())
    }

    /// Decrypts whole blocks in place, leaving any padding.
    pub(crate) fn decrypt_blocks(&self, key: &[u8], buf: &mut [u8]) -> Result<()> {
        self.check(key, buf)?;
        let iv = self.iv.as_deref().unwrap_or_default();

        with_cipher!(self.alg.cipher, C, Flavor => {
            let cipher = C::new_from_slice(key).map_err(|_| Error::InvalidKey)?;
            match self.alg.mode {
                BlockCipherMode::Ecb => {
                    decrypt_with(ecb::Decryptor::<C>::inner_init(cipher), buf)
                }
                BlockCipherMode::Cbc => decrypt_with(
                    cbc::Decryptor::<C>::inner_iv_slice_init(cipher, iv).map_err(|_| INVALID_IV)?,
                    buf,
                ),
                BlockCipherMode::Cfb => decrypt_with(
                    cfb_mode::Decryptor::<C>::inner_iv_slice_init(cipher, iv)
                        .map_err(|_| INVALID_IV)?,
                    buf,
                ),
                BlockCipherMode::Ctr => apply_keystream(
                    ctr::CtrCore::<C, Flavor>::inner_iv_slice_init(cipher, iv)
                        .map_err(|_| INVALID_IV)?,
                    buf,
                ),
            }
        });

        Ok(())
    }

    fn check(&self, key: &[u8], buf: &[u8]) -> Result<()> {
        self.alg
            .validate_key_size(key.len())
            .map_err(|_| Error::InvalidKey)?;

        if buf.len() % self.alg.block_size() != 0 {
            return Err(Error::InvalidParameters("input is not a whole number of blocks"));
        }

        Ok(())
    }
}

const INVALID_IV: Error = Error::InvalidParameters("IV length must equal the block size");

fn encrypt_with<M: BlockEncryptMut>(mut mode: M, buf: &mut [u8]) {
    for block in buf.chunks_exact_mut(M::block_size()) {
        mode.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

fn decrypt_with<M: BlockDecryptMut>(mut mode: M, buf: &mut [u8]) {
    for block in buf.chunks_exact_mut(M::block_size()) {
        mode.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

fn apply_keystream<M: StreamCipherCore>(mut core: M, buf: &mut [u8]) {
    let mut keystream = Block::<M>::default();

    for chunk in buf.chunks_mut(M::block_size()) {
        core.write_keystream_block(&mut keystream);
        for (byte, k) in chunk.iter_mut().zip(keystream.iter()) {
            *byte ^= k;
        }
    }
}

impl HasKeySize for ContentEncryptionParams {
    fn key_size_specifier(&self) -> KeySizeSpecifier {
        self.alg.key_size_specifier()
    }
}

impl AlgorithmParameters for ContentEncryptionParams {
    fn to_algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        let oid = self.alg.oid().ok_or(Error::UnsupportedContentEncryption)?;
        let parameters = match &self.iv {
            Some(iv) => Some(octet_string_parameters(iv)?),
            None => None,
        };

        Ok(AlgorithmIdentifierOwned { oid, parameters })
    }

    fn from_algorithm_identifier(alg: &AlgorithmIdentifierRef<'_>) -> Result<Self> {
        let algorithm = ContentEncryptionAlgorithm::from_oid(alg.oid)?;

        if algorithm.mode.has_iv() {
            Self::new(algorithm, Some(octet_string_from(alg)?))
        } else {
            expect_null_or_absent(alg)?;
            Self::new(algorithm, None)
        }
    }
}

impl_algorithm_identifier!(ContentEncryptionParams);

#[cfg(test)]
mod tests {
    use super::*;
    use der::{Decode, Encode};
    use hex_literal::hex;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    #[test]
    fn test_registered_pairs() {
        assert_eq!(ContentEncryptionAlgorithm::registered().count(), 18);
        assert_eq!(ContentEncryptionAlgorithm::iter().count(), 32);

        for alg in ContentEncryptionAlgorithm::registered() {
            let oid = alg.oid().unwrap();
            assert_eq!(ContentEncryptionAlgorithm::from_oid(oid).unwrap(), alg);
        }
    }

    #[test]
    fn test_round_trip_every_registered_pair() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);

        for alg in ContentEncryptionAlgorithm::registered() {
            let params = ContentEncryptionParams::generate(alg, &mut rng);
            let key = params.generate_key(&mut rng);

            for len in 0..(3 * alg.block_size() + 1) {
                let plaintext = vec![len as u8; len];
                let ciphertext = params.encrypt(&key, &plaintext).unwrap();
                assert_eq!(ciphertext.len() % alg.block_size(), 0, "{}", alg);
                assert!(ciphertext.len() > plaintext.len(), "{}", alg);
                assert_eq!(params.decrypt(&key, &ciphertext).unwrap(), plaintext, "{}", alg);
            }
        }
    }

    #[test]
    fn test_round_trip_unregistered_pairs() {
        let mut rng = ChaCha8Rng::from_seed([1; 32]);

        for alg in ContentEncryptionAlgorithm::iter().filter(|alg| alg.oid().is_none()) {
            let params = ContentEncryptionParams::generate(alg, &mut rng);
            let key = params.generate_key(&mut rng);
            let ciphertext = params.encrypt(&key, b"unregistered").unwrap();
            assert_eq!(params.decrypt(&key, &ciphertext).unwrap(), b"unregistered");
            assert_eq!(
                params.to_algorithm_identifier(),
                Err(Error::UnsupportedContentEncryption)
            );
            assert!(params.to_der().is_err());
        }
    }

    #[test]
    fn test_nist_aes128_cbc_vector() {
        // NIST SP 800-38A F.2.1, first block, followed by the padding block.
        let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
        let iv = hex!("000102030405060708090a0b0c0d0e0f");
        let plaintext = hex!("6bc1bee22e409f96e93d7e117393172a");

        let params =
            ContentEncryptionParams::new(ContentEncryptionAlgorithm::AES_128_CBC, Some(&iv)).unwrap();
        let ciphertext = params.encrypt(&key, &plaintext).unwrap();
        assert_eq!(ciphertext.len(), 32);
        assert_eq!(ciphertext[..16], hex!("7649abac8119b246cee98e9b12e9197d"));
    }

    #[test]
    fn test_nist_aes128_ecb_vector() {
        // NIST SP 800-38A F.1.1, first block.
        let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
        let params = ContentEncryptionParams::new(ContentEncryptionAlgorithm::AES_128_ECB, None).unwrap();
        let ciphertext = params.encrypt(&key, &hex!("6bc1bee22e409f96e93d7e117393172a")).unwrap();
        assert_eq!(ciphertext[..16], hex!("3ad77bb40d7a3660a89ecaf32466ef97"));
    }

    #[test]
    fn test_invalid_key() {
        let mut rng = ChaCha8Rng::from_seed([2; 32]);
        let params = ContentEncryptionParams::generate(ContentEncryptionAlgorithm::AES_256_CBC, &mut rng);
        assert_eq!(params.encrypt(&[0u8; 16], b"data"), Err(Error::InvalidKey));

        let params = ContentEncryptionParams::generate(ContentEncryptionAlgorithm::CAST5_CBC, &mut rng);
        assert_eq!(params.encrypt(&[0u8; 4], b"data"), Err(Error::InvalidKey));
        let ciphertext = params.encrypt(&[9u8; 5], b"data").unwrap();
        assert_eq!(params.decrypt(&[9u8; 5], &ciphertext).unwrap(), b"data");
    }

    #[test]
    fn test_wrong_key_or_length_fails_decryption() {
        let mut rng = ChaCha8Rng::from_seed([3; 32]);
        let params = ContentEncryptionParams::generate(ContentEncryptionAlgorithm::AES_128_CBC, &mut rng);
        let key = params.generate_key(&mut rng);
        let ciphertext = params.encrypt(&key, b"attack at dawn").unwrap();

        assert_eq!(params.decrypt(&key, &ciphertext[1..]), Err(Error::Decryption));
        assert_eq!(params.decrypt(&key, &[]), Err(Error::Decryption));
    }

    #[test]
    fn test_iv_invariant() {
        assert!(ContentEncryptionParams::new(ContentEncryptionAlgorithm::AES_128_CBC, Some(&[0u8; 8])).is_err());
        assert!(ContentEncryptionParams::new(ContentEncryptionAlgorithm::AES_128_CBC, None).is_err());
        assert!(ContentEncryptionParams::new(ContentEncryptionAlgorithm::AES_128_ECB, Some(&[0u8; 16])).is_err());
        assert!(ContentEncryptionParams::new(ContentEncryptionAlgorithm::DES_CBC, Some(&[0u8; 8])).is_ok());
    }

    #[test]
    fn test_der_round_trip() {
        let mut rng = ChaCha8Rng::from_seed([4; 32]);

        for alg in ContentEncryptionAlgorithm::registered() {
            let params = ContentEncryptionParams::generate(alg, &mut rng);
            let der = params.to_der().unwrap();
            assert_eq!(ContentEncryptionParams::from_der(&der).unwrap(), params, "{}", alg);
        }
    }

    #[test]
    fn test_aes128_cbc_encoding() {
        let iv = [0x11u8; 16];
        let params =
            ContentEncryptionParams::new(ContentEncryptionAlgorithm::AES_128_CBC, Some(&iv)).unwrap();
        assert_eq!(
            params.to_der().unwrap(),
            hex!("301d0609608648016503040102041011111111111111111111111111111111")
        );
    }

    #[test]
    fn test_wrong_iv_length_keeps_reason() {
        // AES-128-CBC with an 8 byte IV
        let der = hex!("301506096086480165030401020408" "1111111111111111");
        let alg = AlgorithmIdentifierRef::from_der(&der).unwrap();
        assert_eq!(
            ContentEncryptionParams::from_algorithm_identifier(&alg),
            Err(INVALID_IV)
        );
    }

    #[test]
    fn test_unknown_oid() {
        // SEQUENCE { OID 1.2.3.4 }
        let der = hex!("300506032a0304");
        let err = ContentEncryptionParams::from_der(&der).unwrap_err();
        assert_eq!(
            Error::from(err),
            Error::UnsupportedAlgorithm {
                oid: ObjectIdentifier::new_unwrap("1.2.3.4")
            }
        );
    }
}
