//! Key wrap algorithms used by KEK and password recipient infos.
//!
//! - AES key wrap ([RFC 3394]) and AES key wrap with padding ([RFC 5649])
//! - Triple-DES key wrap ([RFC 3217])
//! - the password-based key-encryption key wrap `id-alg-PWRI-KEK` ([RFC 3211])
//!
//! [RFC 3394]: https://datatracker.ietf.org/doc/html/rfc3394
//! [RFC 5649]: https://datatracker.ietf.org/doc/html/rfc5649
//! [RFC 3217]: https://datatracker.ietf.org/doc/html/rfc3217
//! [RFC 3211]: https://datatracker.ietf.org/doc/html/rfc3211

mod pwri;
mod triple_des;

pub use self::pwri::PWRI_MIN_BLOCKS;

use aes_kw::Kek;
use alloc::vec::Vec;
use cipher::{consts::U16, BlockCipher, BlockDecrypt, BlockEncrypt, BlockSizeUser, KeyInit};
use core::fmt;
use der::asn1::ObjectIdentifier;
use rand_core::CryptoRngCore;
use spki::{AlgorithmIdentifierOwned, AlgorithmIdentifierRef};
use zeroize::Zeroizing;

use crate::{
    algorithms::{
        any_from, expect_null_or_absent, impl_algorithm_identifier, null_parameters, parameters,
        AlgorithmParameters,
    },
    content_encryption::ContentEncryptionParams,
    errors::{Error, Result},
    key_size::{HasKeySize, KeySizeSpecifier},
};

/// `id-alg-PWRI-KEK`
pub const PWRI_KEK_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.3.9");

/// `id-aes128-wrap`
pub const AES_128_WRAP_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.5");
/// `id-aes192-wrap`
pub const AES_192_WRAP_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.25");
/// `id-aes256-wrap`
pub const AES_256_WRAP_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.45");

/// `id-aes128-wrap-pad`
pub const AES_128_WRAP_PAD_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.8");
/// `id-aes192-wrap-pad`
pub const AES_192_WRAP_PAD_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.28");
/// `id-aes256-wrap-pad`
pub const AES_256_WRAP_PAD_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.48");

/// `id-alg-CMS3DESwrap`
pub const TRIPLE_DES_WRAP_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.3.6");

/// Shortest key any variant will wrap.
pub const MIN_WRAPPED_KEY_LEN: usize = 3;

/// Longest key any variant will wrap. The PWRI length prefix is one byte.
pub const MAX_WRAPPED_KEY_LEN: usize = 255;

/// Key wrap algorithm.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeyWrapAlgorithm {
    /// Password-based KEK wrap over a content-encryption algorithm.
    PwriKek(ContentEncryptionParams),
    /// AES-128 key wrap
    Aes128Wrap,
    /// AES-192 key wrap
    Aes192Wrap,
    /// AES-256 key wrap
    Aes256Wrap,
    /// AES-128 key wrap with padding
    Aes128WrapPad,
    /// AES-192 key wrap with padding
    Aes192WrapPad,
    /// AES-256 key wrap with padding
    Aes256WrapPad,
    /// Triple-DES key wrap
    TripleDesWrap,
}

impl KeyWrapAlgorithm {
    /// Every variant that carries no parameters.
    pub const FIXED: &'static [KeyWrapAlgorithm] = &[
        KeyWrapAlgorithm::Aes128Wrap,
        KeyWrapAlgorithm::Aes192Wrap,
        KeyWrapAlgorithm::Aes256Wrap,
        KeyWrapAlgorithm::Aes128WrapPad,
        KeyWrapAlgorithm::Aes192WrapPad,
        KeyWrapAlgorithm::Aes256WrapPad,
        KeyWrapAlgorithm::TripleDesWrap,
    ];

    /// Get the [`ObjectIdentifier`] (a.k.a OID) for this algorithm.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            KeyWrapAlgorithm::PwriKek(_) => PWRI_KEK_OID,
            KeyWrapAlgorithm::Aes128Wrap => AES_128_WRAP_OID,
            KeyWrapAlgorithm::Aes192Wrap => AES_192_WRAP_OID,
            KeyWrapAlgorithm::Aes256Wrap => AES_256_WRAP_OID,
            KeyWrapAlgorithm::Aes128WrapPad => AES_128_WRAP_PAD_OID,
            KeyWrapAlgorithm::Aes192WrapPad => AES_192_WRAP_PAD_OID,
            KeyWrapAlgorithm::Aes256WrapPad => AES_256_WRAP_PAD_OID,
            KeyWrapAlgorithm::TripleDesWrap => TRIPLE_DES_WRAP_OID,
        }
    }

    /// Human readable name.
    pub fn name(&self) -> &'static str {
        match self {
            KeyWrapAlgorithm::PwriKek(_) => "PWRI-KEK",
            KeyWrapAlgorithm::Aes128Wrap => "AES128-WRAP",
            KeyWrapAlgorithm::Aes192Wrap => "AES192-WRAP",
            KeyWrapAlgorithm::Aes256Wrap => "AES256-WRAP",
            KeyWrapAlgorithm::Aes128WrapPad => "AES128-WRAP-PAD",
            KeyWrapAlgorithm::Aes192WrapPad => "AES192-WRAP-PAD",
            KeyWrapAlgorithm::Aes256WrapPad => "AES256-WRAP-PAD",
            KeyWrapAlgorithm::TripleDesWrap => "TripleDES-WRAP",
        }
    }

    /// Wraps `key` under the key-encryption key `kek`.
    ///
    /// Key lengths outside of what the variant accepts are rejected before
    /// any cryptographic operation runs.
    pub fn wrap<R: CryptoRngCore + ?Sized>(
        &self,
        rng: &mut R,
        kek: &[u8],
        key: &[u8],
    ) -> Result<Vec<u8>> {
        check_key_length(key.len())?;

        match self {
            KeyWrapAlgorithm::PwriKek(params) => pwri::wrap(params, rng, kek, key),
            KeyWrapAlgorithm::Aes128Wrap => aes_wrap::<aes::Aes128>(kek, key),
            KeyWrapAlgorithm::Aes192Wrap => aes_wrap::<aes::Aes192>(kek, key),
            KeyWrapAlgorithm::Aes256Wrap => aes_wrap::<aes::Aes256>(kek, key),
            KeyWrapAlgorithm::Aes128WrapPad => aes_wrap_pad::<aes::Aes128>(kek, key),
            KeyWrapAlgorithm::Aes192WrapPad => aes_wrap_pad::<aes::Aes192>(kek, key),
            KeyWrapAlgorithm::Aes256WrapPad => aes_wrap_pad::<aes::Aes256>(kek, key),
            KeyWrapAlgorithm::TripleDesWrap => triple_des::wrap(rng, kek, key),
        }
    }

    /// Recovers a key wrapped with [`KeyWrapAlgorithm::wrap`].
    pub fn unwrap(&self, kek: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            KeyWrapAlgorithm::PwriKek(params) => pwri::unwrap(params, kek, wrapped),
            KeyWrapAlgorithm::Aes128Wrap => aes_unwrap::<aes::Aes128>(kek, wrapped),
            KeyWrapAlgorithm::Aes192Wrap => aes_unwrap::<aes::Aes192>(kek, wrapped),
            KeyWrapAlgorithm::Aes256Wrap => aes_unwrap::<aes::Aes256>(kek, wrapped),
            KeyWrapAlgorithm::Aes128WrapPad => aes_unwrap_pad::<aes::Aes128>(kek, wrapped),
            KeyWrapAlgorithm::Aes192WrapPad => aes_unwrap_pad::<aes::Aes192>(kek, wrapped),
            KeyWrapAlgorithm::Aes256WrapPad => aes_unwrap_pad::<aes::Aes256>(kek, wrapped),
            KeyWrapAlgorithm::TripleDesWrap => triple_des::unwrap(kek, wrapped),
        }
    }
}

fn check_key_length(len: usize) -> Result<()> {
    if len < MIN_WRAPPED_KEY_LEN {
        Err(Error::KeyTooShort)
    } else if len > MAX_WRAPPED_KEY_LEN {
        Err(Error::KeyTooLong)
    } else {
        Ok(())
    }
}

fn aes_kek<A>(kek: &[u8]) -> Result<Kek<A>>
where
    A: KeyInit + BlockCipher + BlockSizeUser<BlockSize = U16> + BlockEncrypt + BlockDecrypt,
{
    Kek::try_from(kek).map_err(|_| Error::InvalidKey)
}

fn aes_wrap<A>(kek: &[u8], key: &[u8]) -> Result<Vec<u8>>
where
    A: KeyInit + BlockCipher + BlockSizeUser<BlockSize = U16> + BlockEncrypt + BlockDecrypt,
{
    // RFC 3394 needs at least two 64-bit semiblocks.
    if key.len() < 16 || key.len() % aes_kw::SEMIBLOCK_SIZE != 0 {
        return Err(Error::InvalidKeyLength);
    }

    aes_kek::<A>(kek)?
        .wrap_vec(key)
        .map_err(|_| Error::InvalidKeyLength)
}

fn aes_unwrap<A>(kek: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>>
where
    A: KeyInit + BlockCipher + BlockSizeUser<BlockSize = U16> + BlockEncrypt + BlockDecrypt,
{
    aes_kek::<A>(kek)?
        .unwrap_vec(wrapped)
        .map(Zeroizing::new)
        .map_err(|_| Error::InvalidWrappedKey)
}

fn aes_wrap_pad<A>(kek: &[u8], key: &[u8]) -> Result<Vec<u8>>
where
    A: KeyInit + BlockCipher + BlockSizeUser<BlockSize = U16> + BlockEncrypt + BlockDecrypt,
{
    aes_kek::<A>(kek)?
        .wrap_with_padding_vec(key)
        .map_err(|_| Error::InvalidKeyLength)
}

fn aes_unwrap_pad<A>(kek: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>>
where
    A: KeyInit + BlockCipher + BlockSizeUser<BlockSize = U16> + BlockEncrypt + BlockDecrypt,
{
    aes_kek::<A>(kek)?
        .unwrap_with_padding_vec(wrapped)
        .map(Zeroizing::new)
        .map_err(|_| Error::InvalidWrappedKey)
}

impl HasKeySize for KeyWrapAlgorithm {
    fn key_size_specifier(&self) -> KeySizeSpecifier {
        match self {
            KeyWrapAlgorithm::PwriKek(params) => params.key_size_specifier(),
            KeyWrapAlgorithm::Aes128Wrap | KeyWrapAlgorithm::Aes128WrapPad => {
                KeySizeSpecifier::Fixed(16)
            }
            KeyWrapAlgorithm::Aes192Wrap | KeyWrapAlgorithm::Aes192WrapPad => {
                KeySizeSpecifier::Fixed(24)
            }
            KeyWrapAlgorithm::Aes256Wrap | KeyWrapAlgorithm::Aes256WrapPad => {
                KeySizeSpecifier::Fixed(32)
            }
            KeyWrapAlgorithm::TripleDesWrap => KeySizeSpecifier::Fixed(24),
        }
    }
}

impl fmt::Display for KeyWrapAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyWrapAlgorithm::PwriKek(params) => {
                write!(f, "{}({})", self.name(), params.algorithm())
            }
            _ => f.write_str(self.name()),
        }
    }
}

impl AlgorithmParameters for KeyWrapAlgorithm {
    fn to_algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        let parameters = match self {
            KeyWrapAlgorithm::PwriKek(params) => Some(any_from(params)?),
            KeyWrapAlgorithm::TripleDesWrap => Some(null_parameters()),
            _ => None,
        };

        Ok(AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters,
        })
    }

    fn from_algorithm_identifier(alg: &AlgorithmIdentifierRef<'_>) -> Result<Self> {
        if alg.oid == PWRI_KEK_OID {
            let params = parameters(alg)?.decode_as::<ContentEncryptionParams>()?;
            return Ok(KeyWrapAlgorithm::PwriKek(params));
        }

        let wrap = Self::FIXED
            .iter()
            .find(|wrap| wrap.oid() == alg.oid)
            .cloned()
            .ok_or(Error::UnsupportedAlgorithm { oid: alg.oid })?;

        expect_null_or_absent(alg)?;
        Ok(wrap)
    }
}

impl_algorithm_identifier!(KeyWrapAlgorithm);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_encryption::ContentEncryptionAlgorithm;
    use der::{Decode, Encode};
    use hex_literal::hex;
    use rand_chacha::{
        rand_core::{RngCore, SeedableRng},
        ChaCha8Rng,
    };

    fn all_variants(rng: &mut ChaCha8Rng) -> Vec<KeyWrapAlgorithm> {
        let mut variants = KeyWrapAlgorithm::FIXED.to_vec();
        for alg in [
            ContentEncryptionAlgorithm::AES_128_CBC,
            ContentEncryptionAlgorithm::AES_256_CFB,
            ContentEncryptionAlgorithm::DES_EDE3_CBC,
            ContentEncryptionAlgorithm::CAMELLIA_128_ECB,
        ] {
            variants.push(KeyWrapAlgorithm::PwriKek(ContentEncryptionParams::generate(
                alg, rng,
            )));
        }
        variants
    }

    /// Valid input lengths of a variant within the common 3..=255 range.
    fn accepts(wrap: &KeyWrapAlgorithm, len: usize) -> bool {
        match wrap {
            KeyWrapAlgorithm::Aes128Wrap
            | KeyWrapAlgorithm::Aes192Wrap
            | KeyWrapAlgorithm::Aes256Wrap => len >= 16 && len % 8 == 0,
            KeyWrapAlgorithm::TripleDesWrap => len % 8 == 0,
            _ => true,
        }
    }

    #[test]
    fn test_rfc3394_vector() {
        let kek = hex!("000102030405060708090A0B0C0D0E0F");
        let key = hex!("00112233445566778899AABBCCDDEEFF");
        let mut rng = ChaCha8Rng::from_seed([0; 32]);

        let wrapped = KeyWrapAlgorithm::Aes128Wrap.wrap(&mut rng, &kek, &key).unwrap();
        assert_eq!(wrapped, hex!("1FA68B0A8112B447AEF34BD8FB5A7B829D3E862371D2CFE5"));

        let unwrapped = KeyWrapAlgorithm::Aes128Wrap.unwrap(&kek, &wrapped).unwrap();
        assert_eq!(unwrapped[..], key);
    }

    #[test]
    fn test_rfc5649_vector() {
        let kek = hex!("5840df6e29b02af1ab493b705bf16ea1ae8338f4dcc176a8");
        let key = hex!("c37b7e6492584340bed12207808941155068f738");
        let mut rng = ChaCha8Rng::from_seed([0; 32]);

        let wrapped = KeyWrapAlgorithm::Aes192WrapPad
            .wrap(&mut rng, &kek, &key)
            .unwrap();
        assert_eq!(
            wrapped,
            hex!("138bdeaa9b8fa7fc61f97742e72248ee5ae6ae5360d1ae6a5f54f373fa543b6a")
        );
    }

    #[test]
    fn test_round_trip_every_variant() {
        let mut rng = ChaCha8Rng::from_seed([42; 32]);

        for wrap in all_variants(&mut rng) {
            let kek = wrap.generate_key(&mut rng);
            for len in MIN_WRAPPED_KEY_LEN..=MAX_WRAPPED_KEY_LEN {
                let mut key = vec![0u8; len];
                rng.fill_bytes(&mut key);

                if !accepts(&wrap, len) {
                    assert_eq!(
                        wrap.wrap(&mut rng, &kek, &key),
                        Err(Error::InvalidKeyLength),
                        "{} {}",
                        wrap,
                        len
                    );
                    continue;
                }

                let wrapped = wrap.wrap(&mut rng, &kek, &key).unwrap();
                let unwrapped = wrap.unwrap(&kek, &wrapped).unwrap();
                assert_eq!(unwrapped[..], key[..], "{} {}", wrap, len);
            }
        }
    }

    #[test]
    fn test_length_errors() {
        let mut rng = ChaCha8Rng::from_seed([1; 32]);

        for wrap in all_variants(&mut rng) {
            let kek = wrap.generate_key(&mut rng);
            for len in 0..MIN_WRAPPED_KEY_LEN {
                assert_eq!(wrap.wrap(&mut rng, &kek, &vec![1; len]), Err(Error::KeyTooShort));
            }
            for len in [256, 257, 1024] {
                assert_eq!(wrap.wrap(&mut rng, &kek, &vec![1; len]), Err(Error::KeyTooLong));
            }
        }
    }

    #[test]
    fn test_wrong_kek() {
        let mut rng = ChaCha8Rng::from_seed([2; 32]);
        let key = [7u8; 16];

        for wrap in KeyWrapAlgorithm::FIXED {
            let kek = wrap.generate_key(&mut rng);
            assert_eq!(wrap.wrap(&mut rng, &kek[1..], &key), Err(Error::InvalidKey));

            let wrapped = wrap.wrap(&mut rng, &kek, &key).unwrap();
            let mut other = kek.clone();
            other[0] ^= 0x80;
            assert_eq!(wrap.unwrap(&other, &wrapped), Err(Error::InvalidWrappedKey), "{}", wrap);
        }
    }

    #[test]
    fn test_der_round_trip() {
        let mut rng = ChaCha8Rng::from_seed([3; 32]);

        for wrap in all_variants(&mut rng) {
            let der = wrap.to_der().unwrap();
            assert_eq!(KeyWrapAlgorithm::from_der(&der).unwrap(), wrap, "{}", wrap);
        }
    }

    #[test]
    fn test_aes_wrap_encoding() {
        // AlgorithmIdentifier { id-aes128-wrap } with absent parameters
        let der = KeyWrapAlgorithm::Aes128Wrap.to_der().unwrap();
        assert_eq!(der, hex!("300b0609608648016503040105"));
    }

    #[test]
    fn test_triple_des_wrap_encoding() {
        let der = KeyWrapAlgorithm::TripleDesWrap.to_der().unwrap();
        assert_eq!(der, hex!("300f060b2a864886f70d0109100306" "0500"));
    }
}
