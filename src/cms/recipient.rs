//! Recipient infos: how the content-encryption key reaches each recipient.

use alloc::{boxed::Box, vec::Vec};
use core::fmt;
use der::{
    asn1::{Any, GeneralizedTime, ObjectIdentifier, OctetString},
    Choice, Sequence,
};
use rand_core::CryptoRngCore;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use super::{CmsVersion, OrderedSet};
use crate::{
    errors::{Error, Result},
    kdf::Kdf,
    key_size::HasKeySize,
    key_wrap::KeyWrapAlgorithm,
};

/// `RecipientInfo` ([RFC 5652 § 6.2]), restricted to the symmetric kinds.
///
/// ```text
///   RecipientInfo ::= CHOICE {
///       ktri KeyTransRecipientInfo,
///       kari [1] KeyAgreeRecipientInfo,
///       kekri [2] KEKRecipientInfo,
///       pwri [3] PasswordRecipientinfo,
///       ori [4] OtherRecipientInfo }
/// ```
///
/// [RFC 5652 § 6.2]: https://www.rfc-editor.org/rfc/rfc5652#section-6.2
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub enum RecipientInfo {
    /// Key wrapped under a previously distributed key-encryption key.
    #[asn1(context_specific = "2", tag_mode = "IMPLICIT", constructed = "true")]
    Kekri(KekRecipientInfo),
    /// Key wrapped under a key derived from a password.
    #[asn1(context_specific = "3", tag_mode = "IMPLICIT", constructed = "true")]
    Pwri(PasswordRecipientInfo),
}

impl RecipientInfo {
    /// Short name of the recipient kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            RecipientInfo::Kekri(_) => "kekri",
            RecipientInfo::Pwri(_) => "pwri",
        }
    }

    /// Key wrap algorithm protecting the content-encryption key.
    pub fn key_enc_alg(&self) -> &KeyWrapAlgorithm {
        match self {
            RecipientInfo::Kekri(info) => &info.key_enc_alg,
            RecipientInfo::Pwri(info) => &info.key_enc_alg,
        }
    }
}

impl fmt::Display for RecipientInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.key_enc_alg())
    }
}

/// `RecipientInfos ::= SET SIZE (1..MAX) OF RecipientInfo`, in caller order.
pub type RecipientInfos = OrderedSet<RecipientInfo>;

/// `KEKRecipientInfo` ([RFC 5652 § 6.2.3])
///
/// ```text
///   KEKRecipientInfo ::= SEQUENCE {
///       version CMSVersion,  -- always set to 4
///       kekid KEKIdentifier,
///       keyEncryptionAlgorithm KeyEncryptionAlgorithmIdentifier,
///       encryptedKey EncryptedKey }
/// ```
///
/// [RFC 5652 § 6.2.3]: https://www.rfc-editor.org/rfc/rfc5652#section-6.2.3
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct KekRecipientInfo {
    pub version: CmsVersion,
    pub kek_id: KekIdentifier,
    pub key_enc_alg: KeyWrapAlgorithm,
    pub encrypted_key: OctetString,
}

/// `KEKIdentifier` ([RFC 5652 § 6.2.3])
///
/// ```text
///   KEKIdentifier ::= SEQUENCE {
///       keyIdentifier OCTET STRING,
///       date GeneralizedTime OPTIONAL,
///       other OtherKeyAttribute OPTIONAL }
/// ```
///
/// [RFC 5652 § 6.2.3]: https://www.rfc-editor.org/rfc/rfc5652#section-6.2.3
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct KekIdentifier {
    pub kek_identifier: OctetString,
    pub date: Option<GeneralizedTime>,
    pub other: Option<OtherKeyAttribute>,
}

impl KekIdentifier {
    /// Identifier with neither date nor other attribute.
    pub fn new(kek_identifier: &[u8]) -> Result<Self> {
        Ok(Self {
            kek_identifier: OctetString::new(kek_identifier)?,
            date: None,
            other: None,
        })
    }
}

/// `OtherKeyAttribute` ([RFC 5652 § 10.2.7])
///
/// ```text
///   OtherKeyAttribute ::= SEQUENCE {
///       keyAttrId OBJECT IDENTIFIER,
///       keyAttr ANY DEFINED BY keyAttrId OPTIONAL }
/// ```
///
/// [RFC 5652 § 10.2.7]: https://www.rfc-editor.org/rfc/rfc5652#section-10.2.7
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct OtherKeyAttribute {
    pub key_attr_id: ObjectIdentifier,
    pub key_attr: Option<Any>,
}

/// `PasswordRecipientInfo` ([RFC 5652 § 6.2.4])
///
/// ```text
///   PasswordRecipientInfo ::= SEQUENCE {
///       version CMSVersion,   -- always set to 0
///       keyDerivationAlgorithm [0] KeyDerivationAlgorithmIdentifier
///                               OPTIONAL,
///       keyEncryptionAlgorithm KeyEncryptionAlgorithmIdentifier,
///       encryptedKey EncryptedKey }
/// ```
///
/// [RFC 5652 § 6.2.4]: https://www.rfc-editor.org/rfc/rfc5652#section-6.2.4
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
#[allow(missing_docs)]
pub struct PasswordRecipientInfo {
    pub version: CmsVersion,
    #[asn1(
        context_specific = "0",
        tag_mode = "IMPLICIT",
        constructed = "true",
        optional = "true"
    )]
    pub key_derivation_alg: Option<Kdf>,
    pub key_enc_alg: KeyWrapAlgorithm,
    pub encrypted_key: OctetString,
}

/// Length of the key-encryption key derived for a password recipient.
fn derived_kek_len(kdf: &Kdf, key_enc_alg: &KeyWrapAlgorithm) -> usize {
    kdf.key_length()
        .map(usize::from)
        .unwrap_or_else(|| key_enc_alg.max_key_size())
}

fn password_kek(
    password: &[u8],
    kdf: Option<&Kdf>,
    key_enc_alg: &KeyWrapAlgorithm,
) -> Result<Zeroizing<Vec<u8>>> {
    match kdf {
        Some(kdf) => kdf.derive(password, derived_kek_len(kdf, key_enc_alg)),
        None => Ok(Zeroizing::new(password.to_vec())),
    }
}

/// Produces one [`RecipientInfo`] carrying the content-encryption key.
///
/// Implemented by [`KekRecipientInfoBuilder`], [`PasswordRecipientInfoBuilder`]
/// and by any closure with the same shape as [`RecipientInfoBuilder::build`].
pub trait RecipientInfoBuilder {
    /// Wraps `cek` for this recipient.
    fn build(&mut self, rng: &mut dyn CryptoRngCore, cek: &[u8]) -> Result<RecipientInfo>;
}

impl<F> RecipientInfoBuilder for F
where
    F: FnMut(&mut dyn CryptoRngCore, &[u8]) -> Result<RecipientInfo>,
{
    fn build(&mut self, rng: &mut dyn CryptoRngCore, cek: &[u8]) -> Result<RecipientInfo> {
        self(rng, cek)
    }
}

/// Builds a [`KekRecipientInfo`] from a key-encryption key.
pub struct KekRecipientInfoBuilder {
    kek_id: KekIdentifier,
    kek: Zeroizing<Vec<u8>>,
    key_enc_alg: KeyWrapAlgorithm,
}

impl KekRecipientInfoBuilder {
    /// Recipient identified by `kek_id` who holds `kek`.
    pub fn new(kek_id: KekIdentifier, kek: &[u8], key_enc_alg: KeyWrapAlgorithm) -> Self {
        Self {
            kek_id,
            kek: Zeroizing::new(kek.to_vec()),
            key_enc_alg,
        }
    }
}

impl RecipientInfoBuilder for KekRecipientInfoBuilder {
    fn build(&mut self, rng: &mut dyn CryptoRngCore, cek: &[u8]) -> Result<RecipientInfo> {
        let encrypted_key = self.key_enc_alg.wrap(rng, &self.kek, cek)?;

        Ok(RecipientInfo::Kekri(KekRecipientInfo {
            version: CmsVersion::V4,
            kek_id: self.kek_id.clone(),
            key_enc_alg: self.key_enc_alg.clone(),
            encrypted_key: OctetString::new(encrypted_key)?,
        }))
    }
}

/// Builds a [`PasswordRecipientInfo`].
///
/// With a key derivation algorithm the key-encryption key is derived from
/// the password, otherwise the password is used as the key-encryption key
/// directly.
pub struct PasswordRecipientInfoBuilder {
    password: Zeroizing<Vec<u8>>,
    kdf: Option<Kdf>,
    key_enc_alg: KeyWrapAlgorithm,
}

impl PasswordRecipientInfoBuilder {
    /// Recipient who knows `password`.
    pub fn new(password: &[u8], kdf: Option<Kdf>, key_enc_alg: KeyWrapAlgorithm) -> Self {
        Self {
            password: Zeroizing::new(password.to_vec()),
            kdf,
            key_enc_alg,
        }
    }
}

impl RecipientInfoBuilder for PasswordRecipientInfoBuilder {
    fn build(&mut self, rng: &mut dyn CryptoRngCore, cek: &[u8]) -> Result<RecipientInfo> {
        let kek = password_kek(&self.password, self.kdf.as_ref(), &self.key_enc_alg)?;
        let encrypted_key = self.key_enc_alg.wrap(rng, &kek, cek)?;

        Ok(RecipientInfo::Pwri(PasswordRecipientInfo {
            version: CmsVersion::V0,
            key_derivation_alg: self.kdf.clone(),
            key_enc_alg: self.key_enc_alg.clone(),
            encrypted_key: OctetString::new(encrypted_key)?,
        }))
    }
}

/// Runs every builder in order, collecting the recipient infos in that order.
pub(crate) fn build_recipient_infos<R: CryptoRngCore>(
    builders: &mut [Box<dyn RecipientInfoBuilder + '_>],
    rng: &mut R,
    cek: &[u8],
) -> Result<RecipientInfos> {
    builders
        .iter_mut()
        .map(|builder| builder.build(&mut *rng, cek))
        .collect()
}

/// Consumer unwrapping with a key-encryption key.
///
/// Accepts KEK recipients and password recipients without a key derivation
/// algorithm.
pub fn with_recipient_key(
    kek: &[u8],
) -> impl FnMut(&RecipientInfo) -> Result<Zeroizing<Vec<u8>>> + '_ {
    move |info| match info {
        RecipientInfo::Kekri(info) => info.key_enc_alg.unwrap(kek, info.encrypted_key.as_bytes()),
        RecipientInfo::Pwri(info) if info.key_derivation_alg.is_none() => {
            info.key_enc_alg.unwrap(kek, info.encrypted_key.as_bytes())
        }
        RecipientInfo::Pwri(_) => Err(Error::NoRecipientInfoMatched),
    }
}

/// Consumer unwrapping password recipients with `password`.
pub fn with_recipient_password(
    password: &[u8],
) -> impl FnMut(&RecipientInfo) -> Result<Zeroizing<Vec<u8>>> + '_ {
    move |info| match info {
        RecipientInfo::Pwri(info) => {
            let kek = password_kek(password, info.key_derivation_alg.as_ref(), &info.key_enc_alg)?;
            info.key_enc_alg.unwrap(&kek, info.encrypted_key.as_bytes())
        }
        RecipientInfo::Kekri(_) => Err(Error::NoRecipientInfoMatched),
    }
}

/// Recovers the content-encryption key by offering each recipient info to
/// `consumer` in order, stopping at the first success.
pub(crate) fn recover_key<F>(infos: &[RecipientInfo], mut consumer: F) -> Result<Zeroizing<Vec<u8>>>
where
    F: FnMut(&RecipientInfo) -> Result<Zeroizing<Vec<u8>>>,
{
    if infos.is_empty() {
        return Err(Error::NoRecipientInfoFound);
    }

    for (index, info) in infos.iter().enumerate() {
        match consumer(info) {
            Ok(cek) => {
                trace!(index, kind = info.kind(), "recipient info matched");
                return Ok(cek);
            }
            Err(err) => trace!(index, kind = info.kind(), %err, "recipient info rejected"),
        }
    }

    debug!(count = infos.len(), "no recipient info matched");
    Err(Error::NoRecipientInfoMatched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_encryption::{ContentEncryptionAlgorithm, ContentEncryptionParams};
    use crate::kdf::{Pbkdf2Params, Pbkdf2Prf};
    use der::{Decode, Encode};
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

    const CEK: [u8; 16] = [0x5a; 16];

    fn kekri(rng: &mut ChaCha8Rng, kek: &[u8]) -> RecipientInfo {
        let kek_id = KekIdentifier::new(b"kek-1").unwrap();
        KekRecipientInfoBuilder::new(kek_id, kek, KeyWrapAlgorithm::Aes128Wrap)
            .build(rng, &CEK)
            .unwrap()
    }

    fn pwri(rng: &mut ChaCha8Rng, password: &[u8]) -> RecipientInfo {
        let kdf = Pbkdf2Params::new(Pbkdf2Prf::HmacWithSha256, 10, b"saltsalt").unwrap();
        let wrap =
            ContentEncryptionParams::generate(ContentEncryptionAlgorithm::AES_128_CBC, rng);
        PasswordRecipientInfoBuilder::new(password, Some(kdf.into()), KeyWrapAlgorithm::PwriKek(wrap))
            .build(rng, &CEK)
            .unwrap()
    }

    #[test]
    fn test_kekri_round_trip() {
        let mut rng = ChaCha8Rng::from_seed([1; 32]);
        let info = kekri(&mut rng, &[7; 16]);

        let der = info.to_der().unwrap();
        assert_eq!(der[0], 0xa2);
        let decoded = RecipientInfo::from_der(&der).unwrap();
        assert_eq!(decoded, info);

        let cek = with_recipient_key(&[7; 16])(&decoded).unwrap();
        assert_eq!(cek[..], CEK);
        assert!(with_recipient_key(&[8; 16])(&decoded).is_err());
        assert!(with_recipient_password(b"pw")(&decoded).is_err());
    }

    #[test]
    fn test_pwri_round_trip() {
        let mut rng = ChaCha8Rng::from_seed([2; 32]);
        let info = pwri(&mut rng, b"secret");

        let der = info.to_der().unwrap();
        assert_eq!(der[0], 0xa3);
        let decoded = RecipientInfo::from_der(&der).unwrap();
        assert_eq!(decoded, info);

        let cek = with_recipient_password(b"secret")(&decoded).unwrap();
        assert_eq!(cek[..], CEK);
        assert!(with_recipient_password(b"wrong")(&decoded).is_err());
    }

    #[test]
    fn test_pwri_without_kdf() {
        let mut rng = ChaCha8Rng::from_seed([3; 32]);
        let kek = [9u8; 32];
        let info = PasswordRecipientInfoBuilder::new(&kek, None, KeyWrapAlgorithm::Aes256Wrap)
            .build(&mut rng, &CEK)
            .unwrap();

        assert_eq!(with_recipient_key(&kek)(&info).unwrap()[..], CEK);
        assert_eq!(with_recipient_password(&kek)(&info).unwrap()[..], CEK);
    }

    #[test]
    fn test_closure_builder() {
        let mut rng = ChaCha8Rng::from_seed([4; 32]);
        let mut builder = |rng: &mut dyn CryptoRngCore, cek: &[u8]| -> Result<RecipientInfo> {
            KekRecipientInfoBuilder::new(
                KekIdentifier::new(b"closure")?,
                &[3; 24],
                KeyWrapAlgorithm::Aes192WrapPad,
            )
            .build(rng, cek)
        };

        let info = RecipientInfoBuilder::build(&mut builder, &mut rng, &CEK).unwrap();
        assert_eq!(info.kind(), "kekri");
        assert_eq!(with_recipient_key(&[3; 24])(&info).unwrap()[..], CEK);
    }

    #[test]
    fn test_recover_key_order() {
        let mut rng = ChaCha8Rng::from_seed([5; 32]);
        let infos = vec![
            kekri(&mut rng, &[1; 16]),
            kekri(&mut rng, &[2; 16]),
            kekri(&mut rng, &[3; 16]),
        ];

        let mut attempts = 0;
        let mut consumer = with_recipient_key(&[2; 16]);
        let cek = recover_key(&infos, |info| {
            attempts += 1;
            consumer(info)
        })
        .unwrap();

        assert_eq!(cek[..], CEK);
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_recover_key_failures() {
        let mut rng = ChaCha8Rng::from_seed([6; 32]);
        assert_eq!(
            recover_key(&[], with_recipient_key(&[1; 16])),
            Err(Error::NoRecipientInfoFound)
        );

        let infos = vec![kekri(&mut rng, &[1; 16]), pwri(&mut rng, b"pw")];
        assert_eq!(
            recover_key(&infos, with_recipient_key(&[4; 16])),
            Err(Error::NoRecipientInfoMatched)
        );
    }
}
