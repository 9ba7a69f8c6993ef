//! HMAC message authentication codes.

use alloc::vec::Vec;
use core::fmt;
use der::asn1::ObjectIdentifier;
use hmac::{Hmac, Mac};
use spki::{AlgorithmIdentifierOwned, AlgorithmIdentifierRef};
use subtle::ConstantTimeEq;

use super::{
    expect_null_or_absent, impl_algorithm_identifier, AlgorithmParameters, DigestAlgorithm,
};
use crate::{
    errors::{Error, Result},
    key_size::{HasKeySize, KeySizeSpecifier},
};

/// `hMAC-MD5` ([RFC 2104], registered in `1.3.6.1.5.5.8.1`)
///
/// [RFC 2104]: https://datatracker.ietf.org/doc/html/rfc2104
pub const HMAC_MD5_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.8.1.1");

/// `hMAC-SHA1` ([RFC 3370 § 4.2.1])
///
/// [RFC 3370 § 4.2.1]: https://datatracker.ietf.org/doc/html/rfc3370#section-4.2.1
pub const HMAC_SHA1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.8.1.2");

/// `id-hmacWithSHA224` ([RFC 4231 § 3.1])
///
/// [RFC 4231 § 3.1]: https://datatracker.ietf.org/doc/html/rfc4231#section-3.1
pub const HMAC_SHA224_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.8");

/// `id-hmacWithSHA256`
pub const HMAC_SHA256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.9");

/// `id-hmacWithSHA384`
pub const HMAC_SHA384_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.2.10");

/// `id-hmacWithSHA512`
pub const HMAC_SHA512_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.2.11");

/// HMAC keyed by one of the supported digests.
///
/// The key size is fixed to the output size of the digest.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MacAlgorithm {
    digest: DigestAlgorithm,
}

impl MacAlgorithm {
    /// HMAC over every supported digest.
    pub const ALL: &'static [MacAlgorithm] = &[
        MacAlgorithm::hmac(DigestAlgorithm::Md5),
        MacAlgorithm::hmac(DigestAlgorithm::Sha1),
        MacAlgorithm::hmac(DigestAlgorithm::Sha224),
        MacAlgorithm::hmac(DigestAlgorithm::Sha256),
        MacAlgorithm::hmac(DigestAlgorithm::Sha384),
        MacAlgorithm::hmac(DigestAlgorithm::Sha512),
    ];

    /// HMAC over `digest`.
    pub const fn hmac(digest: DigestAlgorithm) -> Self {
        Self { digest }
    }

    /// Underlying digest.
    pub fn digest(self) -> DigestAlgorithm {
        self.digest
    }

    /// Get the [`ObjectIdentifier`] (a.k.a OID) for this algorithm.
    pub fn oid(self) -> ObjectIdentifier {
        match self.digest {
            DigestAlgorithm::Md5 => HMAC_MD5_OID,
            DigestAlgorithm::Sha1 => HMAC_SHA1_OID,
            DigestAlgorithm::Sha224 => HMAC_SHA224_OID,
            DigestAlgorithm::Sha256 => HMAC_SHA256_OID,
            DigestAlgorithm::Sha384 => HMAC_SHA384_OID,
            DigestAlgorithm::Sha512 => HMAC_SHA512_OID,
        }
    }

    /// Look up a MAC algorithm by OID.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|alg| alg.oid() == oid)
            .ok_or(Error::UnsupportedAlgorithm { oid })
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self.digest {
            DigestAlgorithm::Md5 => "HMAC-MD5",
            DigestAlgorithm::Sha1 => "HMAC-SHA1",
            DigestAlgorithm::Sha224 => "HMAC-SHA224",
            DigestAlgorithm::Sha256 => "HMAC-SHA256",
            DigestAlgorithm::Sha384 => "HMAC-SHA384",
            DigestAlgorithm::Sha512 => "HMAC-SHA512",
        }
    }

    /// Computes the MAC of `data` under `key`.
    pub fn compute(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        self.validate_key_size(key.len())?;

        Ok(match self.digest {
            DigestAlgorithm::Md5 => hmac_vec::<Hmac<md5::Md5>>(key, data)?,
            DigestAlgorithm::Sha1 => hmac_vec::<Hmac<sha1::Sha1>>(key, data)?,
            DigestAlgorithm::Sha224 => hmac_vec::<Hmac<sha2::Sha224>>(key, data)?,
            DigestAlgorithm::Sha256 => hmac_vec::<Hmac<sha2::Sha256>>(key, data)?,
            DigestAlgorithm::Sha384 => hmac_vec::<Hmac<sha2::Sha384>>(key, data)?,
            DigestAlgorithm::Sha512 => hmac_vec::<Hmac<sha2::Sha512>>(key, data)?,
        })
    }

    /// Recomputes the MAC and compares it with `tag` in constant time.
    pub fn verify(self, key: &[u8], data: &[u8], tag: &[u8]) -> Result<()> {
        let expected = self.compute(key, data)?;

        if expected.ct_eq(tag).into() {
            Ok(())
        } else {
            Err(Error::Authentication)
        }
    }
}

fn hmac_vec<M: Mac + hmac::digest::KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as hmac::digest::KeyInit>::new_from_slice(key).map_err(|_| Error::InvalidKey)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

impl HasKeySize for MacAlgorithm {
    fn key_size_specifier(&self) -> KeySizeSpecifier {
        KeySizeSpecifier::Fixed(self.digest.output_size())
    }
}

impl fmt::Display for MacAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl AlgorithmParameters for MacAlgorithm {
    fn to_algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        Ok(AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: None,
        })
    }

    fn from_algorithm_identifier(alg: &AlgorithmIdentifierRef<'_>) -> Result<Self> {
        let mac = Self::from_oid(alg.oid)?;
        expect_null_or_absent(alg)?;
        Ok(mac)
    }
}

impl_algorithm_identifier!(MacAlgorithm);
