//! Password-based key derivation functions: PBKDF2 ([RFC 8018]) and scrypt
//! ([RFC 7914]).
//!
//! [RFC 8018]: https://datatracker.ietf.org/doc/html/rfc8018
//! [RFC 7914]: https://datatracker.ietf.org/doc/html/rfc7914

use alloc::vec::Vec;
use core::fmt;
use der::{
    asn1::{AnyRef, ObjectIdentifier, OctetStringRef},
    Decode, DecodeValue, Encode, EncodeValue, Header, Length, Reader, Sequence, Tag, Writer,
};
use rand_core::CryptoRngCore;
use spki::{AlgorithmIdentifierOwned, AlgorithmIdentifierRef};
use zeroize::Zeroizing;

use crate::{
    algorithms::{
        any_from, expect_null_or_absent, impl_algorithm_identifier, null_parameters, parameters,
        AlgorithmParameters,
    },
    errors::{Error, Result},
};

/// Password-Based Key Derivation Function (PBKDF2) OID.
pub const PBKDF2_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.5.12");

/// `id-scrypt` ([RFC 7914 § 7])
///
/// [RFC 7914 § 7]: https://datatracker.ietf.org/doc/html/rfc7914#section-7
pub const SCRYPT_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.11591.4.11");

/// HMAC-SHA1 (for use with PBKDF2)
pub const HMAC_WITH_SHA1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.2.7");

/// HMAC-SHA-256 (for use with PBKDF2)
pub const HMAC_WITH_SHA256_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.2.9");

/// HMAC-SHA-512 (for use with PBKDF2)
pub const HMAC_WITH_SHA512_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.2.11");

/// Generates `len` random bytes of salt. Use at least 8.
pub fn generate_salt<R: CryptoRngCore + ?Sized>(rng: &mut R, len: usize) -> Vec<u8> {
    let mut salt = vec![0u8; len];
    rng.fill_bytes(&mut salt);
    salt
}

/// Password-based key derivation function.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Kdf {
    /// Password-Based Key Derivation Function 2 (PBKDF2).
    Pbkdf2(Pbkdf2Params),

    /// scrypt sequential memory-hard password hashing function.
    Scrypt(ScryptParams),
}

impl Kdf {
    /// Get the [`ObjectIdentifier`] (a.k.a OID) for this algorithm.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            Kdf::Pbkdf2(_) => PBKDF2_OID,
            Kdf::Scrypt(_) => SCRYPT_OID,
        }
    }

    /// Preferred derived key length in bytes, if the parameters carry one.
    ///
    /// This is advisory: an explicit length passed to [`Kdf::derive`] wins.
    pub fn key_length(&self) -> Option<u16> {
        match self {
            Kdf::Pbkdf2(params) => params.key_length,
            Kdf::Scrypt(params) => params.key_length,
        }
    }

    /// Derives a `len` byte key from `password`.
    pub fn derive(&self, password: &[u8], len: usize) -> Result<Zeroizing<Vec<u8>>> {
        if len == 0 {
            return Err(Error::InvalidKeyLength);
        }

        let mut key = Zeroizing::new(vec![0u8; len]);
        match self {
            Kdf::Pbkdf2(params) => params.derive_into(password, &mut key)?,
            Kdf::Scrypt(params) => params.derive_into(password, &mut key)?,
        }

        Ok(key)
    }
}

impl fmt::Display for Kdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kdf::Pbkdf2(params) => write!(f, "PBKDF2-{}", params.prf),
            Kdf::Scrypt(_) => f.write_str("scrypt"),
        }
    }
}

impl From<Pbkdf2Params> for Kdf {
    fn from(params: Pbkdf2Params) -> Self {
        Kdf::Pbkdf2(params)
    }
}

impl From<ScryptParams> for Kdf {
    fn from(params: ScryptParams) -> Self {
        Kdf::Scrypt(params)
    }
}

impl AlgorithmParameters for Kdf {
    fn to_algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        let parameters = match self {
            Kdf::Pbkdf2(params) => any_from(params)?,
            Kdf::Scrypt(params) => any_from(params)?,
        };

        Ok(AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: Some(parameters),
        })
    }

    fn from_algorithm_identifier(alg: &AlgorithmIdentifierRef<'_>) -> Result<Self> {
        match alg.oid {
            PBKDF2_OID => Ok(Kdf::Pbkdf2(parameters(alg)?.decode_as()?)),
            SCRYPT_OID => Ok(Kdf::Scrypt(parameters(alg)?.decode_as()?)),
            oid => Err(Error::UnsupportedAlgorithm { oid }),
        }
    }
}

impl_algorithm_identifier!(Kdf);

/// Password-Based Key Derivation Scheme 2 parameters as defined in
/// [RFC 8018 Appendix A.2].
///
/// ```text
/// PBKDF2-params ::= SEQUENCE {
///     salt CHOICE {
///         specified OCTET STRING,
///         otherSource AlgorithmIdentifier {{PBKDF2-SaltSources}}
///     },
///     iterationCount INTEGER (1..MAX),
///     keyLength INTEGER (1..MAX) OPTIONAL,
///     prf AlgorithmIdentifier {{PBKDF2-PRFs}} DEFAULT
///     algid-hmacWithSHA1 }
/// ```
///
/// [RFC 8018 Appendix A.2]: https://tools.ietf.org/html/rfc8018#appendix-A.2
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pbkdf2Params {
    /// PBKDF2 salt
    pub salt: Vec<u8>,

    /// PBKDF2 iteration count
    pub iteration_count: u32,

    /// PBKDF2 output length
    pub key_length: Option<u16>,

    /// Pseudo-random function to use with PBKDF2
    pub prf: Pbkdf2Prf,
}

impl Pbkdf2Params {
    /// Implementation defined maximum iteration count of 100,000,000.
    ///
    /// See [RFC 8018, §4.2](https://datatracker.ietf.org/doc/html/rfc8018#section-4.2).
    pub const MAX_ITERATION_COUNT: u32 = 100_000_000;

    /// PBKDF2 with the given PRF, iteration count and salt.
    pub fn new(prf: Pbkdf2Prf, iteration_count: u32, salt: &[u8]) -> Result<Self> {
        let params = Self {
            salt: salt.to_vec(),
            iteration_count,
            key_length: None,
            prf,
        };
        params.validate()?;
        Ok(params)
    }

    /// Records a preferred output length.
    pub fn with_key_length(mut self, key_length: u16) -> Self {
        self.key_length = Some(key_length);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.iteration_count == 0 || self.iteration_count > Self::MAX_ITERATION_COUNT {
            return Err(Error::InvalidParameters("PBKDF2 iteration count out of range"));
        }

        Ok(())
    }

    fn derive_into(&self, password: &[u8], out: &mut [u8]) -> Result<()> {
        self.validate()?;

        let (salt, rounds) = (&self.salt, self.iteration_count);
        match self.prf {
            Pbkdf2Prf::HmacWithSha1 => pbkdf2::pbkdf2_hmac::<sha1::Sha1>(password, salt, rounds, out),
            Pbkdf2Prf::HmacWithSha256 => {
                pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password, salt, rounds, out)
            }
            Pbkdf2Prf::HmacWithSha512 => {
                pbkdf2::pbkdf2_hmac::<sha2::Sha512>(password, salt, rounds, out)
            }
        }

        Ok(())
    }
}

impl<'a> DecodeValue<'a> for Pbkdf2Params {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        AnyRef::decode_value(reader, header)?.try_into()
    }
}

impl EncodeValue for Pbkdf2Params {
    fn value_len(&self) -> der::Result<Length> {
        let len = OctetStringRef::new(&self.salt)?.encoded_len()?
            + self.iteration_count.encoded_len()?
            + self.key_length.encoded_len()?;

        if self.prf == Pbkdf2Prf::default() {
            len
        } else {
            len + self.prf.encoded_len()?
        }
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        OctetStringRef::new(&self.salt)?.encode(writer)?;
        self.iteration_count.encode(writer)?;
        self.key_length.encode(writer)?;

        if self.prf == Pbkdf2Prf::default() {
            Ok(())
        } else {
            self.prf.encode(writer)
        }
    }
}

impl<'a> Sequence<'a> for Pbkdf2Params {}

impl<'a> TryFrom<AnyRef<'a>> for Pbkdf2Params {
    type Error = der::Error;

    fn try_from(any: AnyRef<'a>) -> der::Result<Self> {
        let params = any.sequence(|reader| {
            Ok(Self {
                salt: OctetStringRef::decode(reader)?.as_bytes().to_vec(),
                iteration_count: reader.decode()?,
                key_length: reader.decode()?,
                prf: Option::<Pbkdf2Prf>::decode(reader)?.unwrap_or_default(),
            })
        })?;

        params
            .validate()
            .map_err(|_| Tag::Integer.value_error())?;
        Ok(params)
    }
}

/// Pseudo-random function used by PBKDF2.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Pbkdf2Prf {
    /// HMAC with SHA1
    ///
    /// This is the DER `DEFAULT` and what an absent `prf` field means.
    #[default]
    HmacWithSha1,

    /// HMAC with SHA-256
    HmacWithSha256,

    /// HMAC with SHA-512
    HmacWithSha512,
}

impl Pbkdf2Prf {
    /// Get the [`ObjectIdentifier`] (a.k.a OID) for this algorithm.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            Pbkdf2Prf::HmacWithSha1 => HMAC_WITH_SHA1_OID,
            Pbkdf2Prf::HmacWithSha256 => HMAC_WITH_SHA256_OID,
            Pbkdf2Prf::HmacWithSha512 => HMAC_WITH_SHA512_OID,
        }
    }
}

impl fmt::Display for Pbkdf2Prf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pbkdf2Prf::HmacWithSha1 => "HMAC-SHA1",
            Pbkdf2Prf::HmacWithSha256 => "HMAC-SHA256",
            Pbkdf2Prf::HmacWithSha512 => "HMAC-SHA512",
        })
    }
}

impl AlgorithmParameters for Pbkdf2Prf {
    fn to_algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        Ok(AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: Some(null_parameters()),
        })
    }

    fn from_algorithm_identifier(alg: &AlgorithmIdentifierRef<'_>) -> Result<Self> {
        let prf = match alg.oid {
            HMAC_WITH_SHA1_OID => Pbkdf2Prf::HmacWithSha1,
            HMAC_WITH_SHA256_OID => Pbkdf2Prf::HmacWithSha256,
            HMAC_WITH_SHA512_OID => Pbkdf2Prf::HmacWithSha512,
            oid => return Err(Error::UnsupportedAlgorithm { oid }),
        };

        expect_null_or_absent(alg)?;
        Ok(prf)
    }
}

impl_algorithm_identifier!(Pbkdf2Prf);

/// scrypt parameters as defined in [RFC 7914 Section 7.1].
///
/// ```text
/// scrypt-params ::= SEQUENCE {
///     salt OCTET STRING,
///     costParameter INTEGER (1..MAX),
///     blockSize INTEGER (1..MAX),
///     parallelizationParameter INTEGER (1..MAX),
///     keyLength INTEGER (1..MAX) OPTIONAL
/// }
/// ```
///
/// [RFC 7914 Section 7.1]: https://datatracker.ietf.org/doc/html/rfc7914#section-7.1
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScryptParams {
    /// scrypt salt
    pub salt: Vec<u8>,

    /// CPU/Memory cost parameter `N`.
    pub cost_parameter: u64,

    /// Block size parameter `r`.
    pub block_size: u32,

    /// Parallelization parameter `p`.
    pub parallelization: u32,

    /// scrypt output length
    pub key_length: Option<u16>,
}

impl ScryptParams {
    /// Largest amount of working memory, in bytes, a parameter set may
    /// require: `128 * r * N` for the scratch vector plus `128 * r * p` for
    /// the blocks being mixed.
    pub const MAX_MEMORY: u64 = 1 << 30;

    /// scrypt with cost `n`, block size `r` and parallelization `p`.
    pub fn new(n: u64, r: u32, p: u32, salt: &[u8]) -> Result<Self> {
        let params = Self {
            salt: salt.to_vec(),
            cost_parameter: n,
            block_size: r,
            parallelization: p,
            key_length: None,
        };
        params.to_scrypt_params()?;
        Ok(params)
    }

    /// Records a preferred output length.
    pub fn with_key_length(mut self, key_length: u16) -> Self {
        self.key_length = Some(key_length);
        self
    }

    fn to_scrypt_params(&self) -> Result<scrypt::Params> {
        let n = self.cost_parameter;
        if n < 2 || !n.is_power_of_two() {
            return Err(Error::InvalidParameters("scrypt cost must be a power of two"));
        }

        let block_len = 128 * u64::from(self.block_size);
        let memory = block_len.checked_mul(n).and_then(|v| {
            block_len
                .checked_mul(u64::from(self.parallelization))
                .and_then(|b| v.checked_add(b))
        });
        if !matches!(memory, Some(memory) if memory <= Self::MAX_MEMORY) {
            return Err(Error::InvalidParameters("scrypt parameters exceed the memory limit"));
        }

        let log_n = n.trailing_zeros() as u8;
        scrypt::Params::new(
            log_n,
            self.block_size,
            self.parallelization,
            scrypt::Params::RECOMMENDED_LEN,
        )
        .map_err(|_| Error::InvalidParameters("scrypt parameters out of range"))
    }

    fn derive_into(&self, password: &[u8], out: &mut [u8]) -> Result<()> {
        let params = self.to_scrypt_params()?;
        scrypt::scrypt(password, &self.salt, &params, out).map_err(|_| Error::InvalidKeyLength)
    }
}

impl<'a> DecodeValue<'a> for ScryptParams {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        AnyRef::decode_value(reader, header)?.try_into()
    }
}

impl EncodeValue for ScryptParams {
    fn value_len(&self) -> der::Result<Length> {
        OctetStringRef::new(&self.salt)?.encoded_len()?
            + self.cost_parameter.encoded_len()?
            + self.block_size.encoded_len()?
            + self.parallelization.encoded_len()?
            + self.key_length.encoded_len()?
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        OctetStringRef::new(&self.salt)?.encode(writer)?;
        self.cost_parameter.encode(writer)?;
        self.block_size.encode(writer)?;
        self.parallelization.encode(writer)?;
        self.key_length.encode(writer)?;
        Ok(())
    }
}

impl<'a> Sequence<'a> for ScryptParams {}

impl<'a> TryFrom<AnyRef<'a>> for ScryptParams {
    type Error = der::Error;

    fn try_from(any: AnyRef<'a>) -> der::Result<Self> {
        let params = any.sequence(|reader| {
            Ok(Self {
                salt: OctetStringRef::decode(reader)?.as_bytes().to_vec(),
                cost_parameter: reader.decode()?,
                block_size: reader.decode()?,
                parallelization: reader.decode()?,
                key_length: reader.decode()?,
            })
        })?;

        params
            .to_scrypt_params()
            .map_err(|_| Tag::Integer.value_error())?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn pbkdf2_sha1(iterations: u32) -> Kdf {
        Pbkdf2Params::new(Pbkdf2Prf::HmacWithSha1, iterations, b"salt")
            .unwrap()
            .into()
    }

    #[test]
    fn test_rfc6070_vectors() {
        assert_eq!(
            pbkdf2_sha1(1).derive(b"password", 20).unwrap()[..],
            hex!("0c60c80f961f0e71f3a9b524af6012062fe037a6")
        );
        assert_eq!(
            pbkdf2_sha1(2).derive(b"password", 20).unwrap()[..],
            hex!("ea6c014dc72d6f8ccd1ed92ace1d41f0d8de8957")
        );
        assert_eq!(
            pbkdf2_sha1(4096).derive(b"password", 20).unwrap()[..],
            hex!("4b007901b765489abead49d926f721d065a429c1")
        );
    }

    #[test]
    fn test_pbkdf2_sha256_vector() {
        let kdf: Kdf = Pbkdf2Params::new(Pbkdf2Prf::HmacWithSha256, 1, b"salt")
            .unwrap()
            .into();
        assert_eq!(
            kdf.derive(b"password", 32).unwrap()[..],
            hex!("120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b")
        );
    }

    #[test]
    fn test_rfc7914_vector() {
        let kdf: Kdf = ScryptParams::new(16, 1, 1, b"").unwrap().into();
        assert_eq!(
            kdf.derive(b"", 64).unwrap()[..],
            hex!(
                "77d6576238657b203b19ca42c18a0497f16b4844e3074ae8dfdffa3fede21442"
                "fcd0069ded0948f8326a753a0fc81f17e8d3e0fb2e0d3628cf35e20c38d18906"
            )
        );
    }

    #[test]
    fn test_explicit_length_wins() {
        let kdf: Kdf = Pbkdf2Params::new(Pbkdf2Prf::HmacWithSha1, 1, b"salt")
            .unwrap()
            .with_key_length(16)
            .into();
        assert_eq!(kdf.key_length(), Some(16));

        let key = kdf.derive(b"password", 20).unwrap();
        assert_eq!(key[..], hex!("0c60c80f961f0e71f3a9b524af6012062fe037a6"));
    }

    #[test]
    fn test_parameter_validation() {
        assert!(Pbkdf2Params::new(Pbkdf2Prf::HmacWithSha1, 0, b"salt").is_err());
        assert!(Pbkdf2Params::new(
            Pbkdf2Prf::HmacWithSha1,
            Pbkdf2Params::MAX_ITERATION_COUNT + 1,
            b"salt"
        )
        .is_err());
        assert!(ScryptParams::new(1, 1, 1, b"salt").is_err());
        assert!(ScryptParams::new(24, 1, 1, b"salt").is_err());
        assert!(ScryptParams::new(16, 0, 1, b"salt").is_err());
        assert!(ScryptParams::new(16, 1, 0, b"salt").is_err());
        assert!(pbkdf2_sha1(1).derive(b"password", 0).is_err());
    }

    #[test]
    fn test_default_prf_omitted() {
        let params = Pbkdf2Params::new(Pbkdf2Prf::HmacWithSha1, 2048, b"salt").unwrap();
        let der = params.to_der().unwrap();
        assert_eq!(der, hex!("300a040473616c7402020800"));
        assert_eq!(Pbkdf2Params::from_der(&der).unwrap().prf, Pbkdf2Prf::HmacWithSha1);
    }

    #[test]
    fn test_explicit_prf_encoded() {
        let params = Pbkdf2Params::new(Pbkdf2Prf::HmacWithSha256, 2048, b"salt")
            .unwrap()
            .with_key_length(32);
        let der = params.to_der().unwrap();
        assert_eq!(
            der,
            hex!("301b040473616c740202080002012030" "0c06082a864886f70d02090500")
        );
        assert_eq!(Pbkdf2Params::from_der(&der).unwrap(), params);
    }

    #[test]
    fn test_kdf_round_trip() {
        let kdfs: [Kdf; 3] = [
            pbkdf2_sha1(1000),
            Pbkdf2Params::new(Pbkdf2Prf::HmacWithSha512, 10, &[1, 2, 3, 4, 5, 6, 7, 8])
                .unwrap()
                .with_key_length(24)
                .into(),
            ScryptParams::new(1024, 8, 1, b"NaCl").unwrap().with_key_length(16).into(),
        ];

        for kdf in kdfs {
            let der = kdf.to_der().unwrap();
            assert_eq!(Kdf::from_der(&der).unwrap(), kdf, "{}", kdf);
        }
    }

    #[test]
    fn test_scrypt_memory_limit() {
        // 128 * 8 * 2^20 is exactly the limit, leaving no room for the blocks.
        assert!(ScryptParams::new(1 << 19, 8, 1, b"salt").is_ok());
        assert!(ScryptParams::new(1 << 20, 8, 1, b"salt").is_err());
        assert!(ScryptParams::new(1 << 40, 8, 1, b"saltsalt").is_err());
        assert!(ScryptParams::new(2, u32::MAX, 1, b"salt").is_err());
        assert!(ScryptParams::new(2, 1, u32::MAX, b"salt").is_err());
    }

    #[test]
    fn test_scrypt_memory_limit_enforced_on_decode_and_derive() {
        let params = ScryptParams {
            salt: b"saltsalt".to_vec(),
            cost_parameter: 1 << 40,
            block_size: 8,
            parallelization: 1,
            key_length: None,
        };

        let der = params.to_der().unwrap();
        assert!(ScryptParams::from_der(&der).is_err());
        assert_eq!(
            Kdf::Scrypt(params).derive(b"pw", 16).err(),
            Some(Error::InvalidParameters("scrypt parameters exceed the memory limit"))
        );
    }

    #[test]
    fn test_zero_iterations_rejected_on_decode() {
        // PBKDF2-params with iterationCount 0
        assert!(Pbkdf2Params::from_der(&hex!("3009040473616c74020100")).is_err());
    }

    #[test]
    fn test_generate_salt() {
        use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

        let mut rng = ChaCha8Rng::from_seed([0; 32]);
        let a = generate_salt(&mut rng, 16);
        let b = generate_salt(&mut rng, 16);
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }
}
