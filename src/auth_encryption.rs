//! Authenticated content encryption for `AuthEnvelopedData`: AES-GCM
//! ([RFC 5084]) and ChaCha20-Poly1305 ([RFC 8103]).
//!
//! [RFC 5084]: https://datatracker.ietf.org/doc/html/rfc5084
//! [RFC 8103]: https://datatracker.ietf.org/doc/html/rfc8103

use aes_gcm::{
    aead::{
        consts::U12,
        generic_array::{typenum::Unsigned, GenericArray},
        AeadCore, AeadInPlace, KeyInit,
    },
    AesGcm,
};
use alloc::vec::Vec;
use chacha20poly1305::ChaCha20Poly1305;
use core::fmt;
use der::{
    asn1::{ObjectIdentifier, OctetStringRef},
    Sequence,
};
use rand_core::CryptoRngCore;
use spki::{AlgorithmIdentifierOwned, AlgorithmIdentifierRef};

use crate::{
    algorithms::{
        any_from, impl_algorithm_identifier, octet_string_from, octet_string_parameters,
        parameters, AlgorithmParameters,
    },
    errors::{Error, Result},
    key_size::{HasKeySize, KeySizeSpecifier},
};

/// `id-aes128-GCM`
pub const AES_128_GCM_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.6");
/// `id-aes192-GCM`
pub const AES_192_GCM_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.26");
/// `id-aes256-GCM`
pub const AES_256_GCM_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.46");

/// `id-alg-AEADChaCha20Poly1305`
pub const CHACHA20_POLY1305_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.3.18");

/// Nonce length shared by every supported AEAD.
pub const AEAD_NONCE_LEN: usize = 12;

/// `aes-ICVlen` when the field is omitted.
pub const DEFAULT_GCM_TAG_LEN: usize = 12;

/// Authenticated encryption algorithm.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AeadAlgorithm {
    /// AES-128 in Galois/Counter Mode
    Aes128Gcm,
    /// AES-192 in Galois/Counter Mode
    Aes192Gcm,
    /// AES-256 in Galois/Counter Mode
    Aes256Gcm,
    /// ChaCha20 with a Poly1305 authenticator
    ChaCha20Poly1305,
}

impl AeadAlgorithm {
    /// Every supported AEAD.
    pub const ALL: &'static [AeadAlgorithm] = &[
        AeadAlgorithm::Aes128Gcm,
        AeadAlgorithm::Aes192Gcm,
        AeadAlgorithm::Aes256Gcm,
        AeadAlgorithm::ChaCha20Poly1305,
    ];

    /// Get the [`ObjectIdentifier`] (a.k.a OID) for this algorithm.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            AeadAlgorithm::Aes128Gcm => AES_128_GCM_OID,
            AeadAlgorithm::Aes192Gcm => AES_192_GCM_OID,
            AeadAlgorithm::Aes256Gcm => AES_256_GCM_OID,
            AeadAlgorithm::ChaCha20Poly1305 => CHACHA20_POLY1305_OID,
        }
    }

    /// Look up an AEAD by OID.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|alg| alg.oid() == oid)
            .ok_or(Error::UnsupportedAlgorithm { oid })
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            AeadAlgorithm::Aes128Gcm => "AES-128-GCM",
            AeadAlgorithm::Aes192Gcm => "AES-192-GCM",
            AeadAlgorithm::Aes256Gcm => "AES-256-GCM",
            AeadAlgorithm::ChaCha20Poly1305 => "ChaCha20-Poly1305",
        }
    }

    fn is_gcm(self) -> bool {
        self != AeadAlgorithm::ChaCha20Poly1305
    }

    /// Tag lengths this algorithm can produce.
    fn accepts_tag_len(self, len: usize) -> bool {
        match self {
            AeadAlgorithm::ChaCha20Poly1305 => len == 16,
            _ => len == 12 || len == 16,
        }
    }
}

impl HasKeySize for AeadAlgorithm {
    fn key_size_specifier(&self) -> KeySizeSpecifier {
        match self {
            AeadAlgorithm::Aes128Gcm => KeySizeSpecifier::Fixed(16),
            AeadAlgorithm::Aes192Gcm => KeySizeSpecifier::Fixed(24),
            AeadAlgorithm::Aes256Gcm => KeySizeSpecifier::Fixed(32),
            AeadAlgorithm::ChaCha20Poly1305 => KeySizeSpecifier::Fixed(32),
        }
    }
}

impl fmt::Display for AeadAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ```text
/// GCMParameters ::= SEQUENCE {
///   aes-nonce        OCTET STRING, -- recommended size is 12 octets
///   aes-ICVlen       AES-GCM-ICVlen DEFAULT 12 }
/// ```
#[derive(Sequence)]
struct GcmParameters<'a> {
    nonce: OctetStringRef<'a>,
    #[asn1(default = "default_icv_len")]
    icv_len: u8,
}

fn default_icv_len() -> u8 {
    DEFAULT_GCM_TAG_LEN as u8
}

/// Runs `$body` with `$a` bound to the AEAD implementation for `$params`.
macro_rules! with_aead {
    ($params:expr, $a:ident => $body:expr) => {
        match ($params.alg, $params.tag_len) {
            (AeadAlgorithm::Aes128Gcm, 12) => {
                type $a = AesGcm<aes::Aes128, U12, U12>;
                $body
            }
            (AeadAlgorithm::Aes128Gcm, _) => {
                type $a = AesGcm<aes::Aes128, U12>;
                $body
            }
            (AeadAlgorithm::Aes192Gcm, 12) => {
                type $a = AesGcm<aes::Aes192, U12, U12>;
                $body
            }
            (AeadAlgorithm::Aes192Gcm, _) => {
                type $a = AesGcm<aes::Aes192, U12>;
                $body
            }
            (AeadAlgorithm::Aes256Gcm, 12) => {
                type $a = AesGcm<aes::Aes256, U12, U12>;
                $body
            }
            (AeadAlgorithm::Aes256Gcm, _) => {
                type $a = AesGcm<aes::Aes256, U12>;
                $body
            }
            (AeadAlgorithm::ChaCha20Poly1305, _) => {
                type $a = ChaCha20Poly1305;
                $body
            }
        }
    };
}

/// AEAD algorithm with its nonce and tag length.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AeadParams {
    alg: AeadAlgorithm,
    nonce: [u8; AEAD_NONCE_LEN],
    tag_len: usize,
}

impl AeadParams {
    /// Builds parameters from an explicit nonce and tag length.
    pub fn new(alg: AeadAlgorithm, nonce: &[u8], tag_len: usize) -> Result<Self> {
        let nonce = nonce
            .try_into()
            .map_err(|_| Error::InvalidParameters("AEAD nonce must be 12 bytes"))?;

        if !alg.accepts_tag_len(tag_len) {
            return Err(Error::InvalidParameters("unsupported AEAD tag length"));
        }

        Ok(Self {
            alg,
            nonce,
            tag_len,
        })
    }

    /// Draws a fresh random nonce and uses a full 16-byte tag.
    pub fn generate<R: CryptoRngCore + ?Sized>(alg: AeadAlgorithm, rng: &mut R) -> Self {
        let mut nonce = [0u8; AEAD_NONCE_LEN];
        rng.fill_bytes(&mut nonce);

        Self {
            alg,
            nonce,
            tag_len: 16,
        }
    }

    /// Algorithm.
    pub fn algorithm(&self) -> AeadAlgorithm {
        self.alg
    }

    /// Nonce.
    pub fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    /// Tag length in bytes.
    pub fn tag_len(&self) -> usize {
        self.tag_len
    }

    /// Encrypts `plaintext` and authenticates it together with `aad`.
    ///
    /// Returns the ciphertext and the detached tag.
    pub fn encrypt(&self, key: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        self.alg
            .validate_key_size(key.len())
            .map_err(|_| Error::InvalidKey)?;

        let mut buf = plaintext.to_vec();
        let tag = with_aead!(self, A => seal::<A>(key, &self.nonce, aad, &mut buf)?);
        Ok((buf, tag))
    }

    /// Checks `tag` over `ciphertext` and `aad`, then decrypts.
    ///
    /// Nothing is returned unless the tag verifies.
    pub fn decrypt(&self, key: &[u8], aad: &[u8], ciphertext: &[u8], tag: &[u8]) -> Result<Vec<u8>> {
        self.alg
            .validate_key_size(key.len())
            .map_err(|_| Error::InvalidKey)?;

        let mut buf = ciphertext.to_vec();
        with_aead!(self, A => open::<A>(key, &self.nonce, aad, &mut buf, tag)?);
        Ok(buf)
    }
}

fn seal<A: AeadInPlace + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    buf: &mut [u8],
) -> Result<Vec<u8>> {
    let cipher = A::new_from_slice(key).map_err(|_| Error::InvalidKey)?;
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), aad, buf)
        .map_err(|_| Error::InvalidParameters("AEAD input too long"))?;
    Ok(tag.to_vec())
}

fn open<A: AeadInPlace + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    buf: &mut [u8],
    tag: &[u8],
) -> Result<()> {
    if tag.len() != <<A as AeadCore>::TagSize as Unsigned>::USIZE {
        return Err(Error::Authentication);
    }

    let cipher = A::new_from_slice(key).map_err(|_| Error::InvalidKey)?;
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            aad,
            buf,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| Error::Authentication)
}

impl HasKeySize for AeadParams {
    fn key_size_specifier(&self) -> KeySizeSpecifier {
        self.alg.key_size_specifier()
    }
}

impl AlgorithmParameters for AeadParams {
    fn to_algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
        let parameters = if self.alg.is_gcm() {
            any_from(&GcmParameters {
                nonce: OctetStringRef::new(&self.nonce)?,
                icv_len: self.tag_len as u8,
            })?
        } else {
            octet_string_parameters(&self.nonce)?
        };

        Ok(AlgorithmIdentifierOwned {
            oid: self.alg.oid(),
            parameters: Some(parameters),
        })
    }

    fn from_algorithm_identifier(alg: &AlgorithmIdentifierRef<'_>) -> Result<Self> {
        let algorithm = AeadAlgorithm::from_oid(alg.oid)?;

        if algorithm.is_gcm() {
            let params = parameters(alg)?.decode_as::<GcmParameters<'_>>()?;
            Self::new(algorithm, params.nonce.as_bytes(), params.icv_len as usize)
        } else {
            Self::new(algorithm, octet_string_from(alg)?, 16)
        }
    }
}

impl_algorithm_identifier!(AeadParams);
